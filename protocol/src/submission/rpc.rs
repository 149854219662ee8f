//! # JSON-RPC Submission
//!
//! JSON-RPC 2.0 envelope types and an HTTP [`SubmissionEndpoint`] for a
//! remote node.
//!
//! ## Method Index
//!
//! | Method       | Params                        | Result              |
//! |--------------|-------------------------------|---------------------|
//! | `sendZkapp`  | `{"zkappCommand": "<text>"}`  | `{"hash": "<hex>"}` |
//! | `networkId`  | none                          | `"devnet"`, ...     |
//!
//! ## Application Error Codes
//!
//! | Code     | Meaning                 | Maps to                     |
//! |----------|-------------------------|-----------------------------|
//! | `-32010` | nonce mismatch          | `InvalidNonce`              |
//! | `-32011` | insufficient funds      | `InsufficientFunds`         |
//! | `-32012` | already submitted       | `DuplicateSubmission`       |
//! | `-32000` | node temporarily unable | `NetworkError`              |
//! | other    | anything else           | `ProtocolError`             |

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::result::{Receipt, SubmissionError};
use super::SubmissionEndpoint;
use crate::codec::CanonicalText;
use crate::config::{NetworkId, UnknownNetwork, DEFAULT_SUBMIT_TIMEOUT};
use crate::crypto::hash::blake3_hex;

pub const CODE_INVALID_NONCE: i32 = -32010;
pub const CODE_INSUFFICIENT_FUNDS: i32 = -32011;
pub const CODE_DUPLICATE: i32 = -32012;
pub const CODE_SERVER_BUSY: i32 = -32000;

// ---------------------------------------------------------------------------
// RPC Method Enumeration
// ---------------------------------------------------------------------------

/// Methods the submission endpoint calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RpcMethod {
    /// Submit a signed transaction.
    #[serde(rename = "sendZkapp")]
    SendZkapp,
    /// Ask the node which network it serves.
    #[serde(rename = "networkId")]
    GetNetworkId,
}

// ---------------------------------------------------------------------------
// RPC Request / Response
// ---------------------------------------------------------------------------

/// A JSON-RPC 2.0 request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcRequest {
    /// Always "2.0".
    pub jsonrpc: String,
    pub id: serde_json::Value,
    pub method: RpcMethod,
    #[serde(default)]
    pub params: serde_json::Value,
}

impl RpcRequest {
    pub fn new(id: serde_json::Value, method: RpcMethod, params: serde_json::Value) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            method,
            params,
        }
    }

    /// A `sendZkapp` request carrying `text` verbatim.
    pub fn send_zkapp(id: u64, text: &CanonicalText) -> Self {
        Self::new(
            serde_json::json!(id),
            RpcMethod::SendZkapp,
            serde_json::json!({ "zkappCommand": text.as_str() }),
        )
    }
}

/// A JSON-RPC 2.0 response. Exactly one of `result` and `error` is set by a
/// conforming node.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcResponse {
    pub jsonrpc: String,
    pub id: serde_json::Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcError>,
}

/// Result body of a successful `sendZkapp`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendZkappResult {
    pub hash: String,
}

// ---------------------------------------------------------------------------
// RPC Errors
// ---------------------------------------------------------------------------

/// JSON-RPC 2.0 error object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcError {
    pub code: i32,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

/// Map an application error from `sendZkapp` to a reason class.
pub fn map_rpc_error(error: &RpcError, tx_hash: &str) -> SubmissionError {
    let nonce_field = |name: &str| {
        error
            .data
            .as_ref()
            .and_then(|d| d.get(name))
            .and_then(serde_json::Value::as_u64)
    };
    match error.code {
        CODE_INVALID_NONCE => SubmissionError::InvalidNonce {
            expected: nonce_field("expected"),
            got: nonce_field("got"),
        },
        CODE_INSUFFICIENT_FUNDS => SubmissionError::InsufficientFunds {
            reason: error.message.clone(),
        },
        CODE_DUPLICATE => SubmissionError::DuplicateSubmission {
            tx_hash: tx_hash.to_string(),
        },
        CODE_SERVER_BUSY => SubmissionError::network(error.message.clone()),
        code => SubmissionError::protocol(format!("rpc error {}: {}", code, error.message)),
    }
}

// ---------------------------------------------------------------------------
// HttpEndpoint
// ---------------------------------------------------------------------------

/// Submits over HTTP to a JSON-RPC node.
#[derive(Debug)]
pub struct HttpEndpoint {
    client: reqwest::Client,
    url: String,
    network: NetworkId,
    next_id: AtomicU64,
}

impl HttpEndpoint {
    /// An endpoint for `url` that claims to serve `network`. Use
    /// [`query_network`](Self::query_network) to ask the node.
    pub fn new(url: impl Into<String>, network: NetworkId) -> Result<Self, SubmissionError> {
        Self::with_timeout(url, network, DEFAULT_SUBMIT_TIMEOUT)
    }

    pub fn with_timeout(
        url: impl Into<String>,
        network: NetworkId,
        timeout: Duration,
    ) -> Result<Self, SubmissionError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SubmissionError::network(format!("http client: {}", e)))?;
        Ok(Self {
            client,
            url: url.into(),
            network,
            next_id: AtomicU64::new(1),
        })
    }

    /// Ask the node which network it serves.
    pub async fn query_network(&self) -> Result<NetworkId, SubmissionError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let request = RpcRequest::new(
            serde_json::json!(id),
            RpcMethod::GetNetworkId,
            serde_json::Value::Null,
        );
        let response = self.call(&request).await?;
        if let Some(error) = response.error {
            return Err(map_rpc_error(&error, ""));
        }
        let name = response
            .result
            .as_ref()
            .and_then(serde_json::Value::as_str)
            .ok_or_else(|| SubmissionError::protocol("networkId result is not a string"))?;
        name.parse()
            .map_err(|e: UnknownNetwork| SubmissionError::protocol(e.to_string()))
    }

    async fn call(&self, request: &RpcRequest) -> Result<RpcResponse, SubmissionError> {
        debug!(url = %self.url, method = ?request.method, "rpc call");
        let response = self
            .client
            .post(&self.url)
            .json(request)
            .send()
            .await
            .map_err(|e| SubmissionError::network(e.to_string()))?;

        let status = response.status();
        if status.is_server_error() {
            return Err(SubmissionError::network(format!("http status {}", status)));
        }
        if status.is_client_error() {
            return Err(SubmissionError::protocol(format!("http status {}", status)));
        }

        response
            .json::<RpcResponse>()
            .await
            .map_err(|e| SubmissionError::protocol(format!("bad rpc response: {}", e)))
    }
}

#[async_trait]
impl SubmissionEndpoint for HttpEndpoint {
    fn network(&self) -> NetworkId {
        self.network
    }

    async fn send(&self, text: &CanonicalText) -> Result<Receipt, SubmissionError> {
        let local_hash = blake3_hex(text.as_bytes());
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let response = self.call(&RpcRequest::send_zkapp(id, text)).await?;

        if let Some(error) = response.error {
            warn!(code = error.code, message = %error.message, "node rejected transaction");
            return Err(map_rpc_error(&error, &local_hash));
        }

        let result: SendZkappResult = response
            .result
            .ok_or_else(|| SubmissionError::protocol("response has neither result nor error"))
            .and_then(|value| {
                serde_json::from_value(value)
                    .map_err(|e| SubmissionError::protocol(format!("bad sendZkapp result: {}", e)))
            })?;
        Ok(Receipt::new(result.hash, self.network))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
