//! # Denominations
//!
//! Exact conversion between integer amounts in the smallest unit and the
//! decimal strings that appear in canonical text and signer requests.
//!
//! All arithmetic is done on decimal digit strings, so there is no scaling
//! factor to overflow and no floating point anywhere. A conversion that
//! would drop a fractional digit fails with
//! [`EncodingError::PrecisionLoss`] instead of rounding.
//!
//! ```text
//! WHOLE  (exponent 9):  150_000_000  <->  "0.15"
//! NATIVE (exponent 0):  150_000_000  <->  "150000000"
//! ```

use super::error::EncodingError;
use crate::config::NATIVE_DECIMALS;

/// A decimal unit: `1 unit = 10^exponent` smallest units.
///
/// `max_fraction_digits` caps how many fractional digits the unit may carry.
/// A signer that only understands, say, milli-units is modelled as
/// `Denomination::new(9, 3)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Denomination {
    pub exponent: u32,
    pub max_fraction_digits: u32,
}

impl Denomination {
    /// The whole unit used by canonical text (`10^9` smallest units).
    pub const WHOLE: Self = Self::new(NATIVE_DECIMALS, NATIVE_DECIMALS);

    /// The smallest unit itself.
    pub const NATIVE: Self = Self::new(0, 0);

    pub const fn new(exponent: u32, max_fraction_digits: u32) -> Self {
        Self {
            exponent,
            max_fraction_digits,
        }
    }

    /// Render `amount` (smallest units) in this denomination.
    ///
    /// Trailing fractional zeros are trimmed and a bare integer has no
    /// decimal point, so every amount has exactly one rendering.
    pub fn format(&self, amount: u64) -> Result<String, EncodingError> {
        let (whole, fraction) = self.split(amount);
        if fraction.len() > self.max_fraction_digits as usize {
            return Err(self.precision_loss(amount.to_string()));
        }
        if fraction.is_empty() {
            Ok(whole)
        } else {
            Ok(format!("{}.{}", whole, fraction))
        }
    }

    /// Render without the fraction cap. Used where the denomination is known
    /// to carry every digit.
    pub(crate) fn render(&self, amount: u64) -> String {
        let (whole, fraction) = self.split(amount);
        if fraction.is_empty() {
            whole
        } else {
            format!("{}.{}", whole, fraction)
        }
    }

    /// Parse a decimal string in this denomination into smallest units.
    ///
    /// Accepts `digits` or `digits.digits`. Signs, exponents, whitespace and
    /// bare points (`"1."`, `".5"`) are malformed. Trailing fractional zeros
    /// are insignificant.
    pub fn parse(&self, text: &str) -> Result<u64, EncodingError> {
        let (whole, fraction) = match text.split_once('.') {
            Some((w, f)) => (w, Some(f)),
            None => (text, None),
        };

        let is_digits = |s: &str| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit());
        if !is_digits(whole) || fraction.is_some_and(|f| !is_digits(f)) {
            return Err(EncodingError::malformed(format!(
                "invalid decimal amount {:?}",
                text
            )));
        }

        let fraction = fraction.unwrap_or("").trim_end_matches('0');
        if fraction.len() > self.exponent as usize
            || fraction.len() > self.max_fraction_digits as usize
        {
            return Err(self.precision_loss(text.to_string()));
        }

        let mut digits = String::with_capacity(whole.len() + self.exponent as usize);
        digits.push_str(whole);
        digits.push_str(fraction);
        for _ in fraction.len()..self.exponent as usize {
            digits.push('0');
        }

        let significant = digits.trim_start_matches('0');
        if significant.is_empty() {
            return Ok(0);
        }
        // Only digits remain, so the only way to fail is overflow.
        significant
            .parse::<u64>()
            .map_err(|_| EncodingError::AmountOutOfRange {
                text: text.to_string(),
            })
    }

    /// Whole part and trimmed fractional part, as digit strings.
    fn split(&self, amount: u64) -> (String, String) {
        let exponent = self.exponent as usize;
        let digits = amount.to_string();
        if exponent == 0 {
            return (digits, String::new());
        }

        let padded = if digits.len() <= exponent {
            format!("{}{}", "0".repeat(exponent + 1 - digits.len()), digits)
        } else {
            digits
        };
        let cut = padded.len() - exponent;
        let whole = padded[..cut].to_string();
        let fraction = padded[cut..].trim_end_matches('0').to_string();
        (whole, fraction)
    }

    fn precision_loss(&self, value: String) -> EncodingError {
        EncodingError::PrecisionLoss {
            value,
            exponent: self.exponent,
            max_fraction_digits: self.max_fraction_digits,
        }
    }
}

impl Default for Denomination {
    fn default() -> Self {
        Self::WHOLE
    }
}
