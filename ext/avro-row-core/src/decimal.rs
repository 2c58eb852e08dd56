use crate::error::{ConversionError, Result};
use num::{BigInt, Integer, Signed, Zero};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Arbitrary-precision decimal: an unscaled integer and a base-10 scale
///
/// `Decimal::new(12345, 2)` is `123.45`. Equality compares both parts, so
/// `123.45` and `123.450` are different values; use [`Decimal::rescale`] to
/// bring two values to a common scale first.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Decimal {
    unscaled: BigInt,
    scale: u32,
}

impl Decimal {
    pub fn new<I: Into<BigInt>>(unscaled: I, scale: u32) -> Self {
        Self {
            unscaled: unscaled.into(),
            scale,
        }
    }

    pub fn unscaled(&self) -> &BigInt {
        &self.unscaled
    }

    pub fn scale(&self) -> u32 {
        self.scale
    }

    /// Number of decimal digits in the unscaled value (at least 1)
    pub fn precision(&self) -> u32 {
        if self.unscaled.is_zero() {
            return 1;
        }
        self.unscaled.abs().to_string().len() as u32
    }

    /// Change the scale without altering the numeric value.
    ///
    /// Increasing the scale always succeeds. Decreasing it fails with a
    /// precision-loss error when a nonzero digit would be dropped.
    pub fn rescale(&self, scale: u32) -> Result<Decimal> {
        if scale == self.scale {
            return Ok(self.clone());
        }

        if self.unscaled.is_zero() {
            return Ok(Decimal::new(0, scale));
        }

        if scale > self.scale {
            let factor = num::pow(BigInt::from(10u8), (scale - self.scale) as usize);
            return Ok(Decimal::new(&self.unscaled * factor, scale));
        }

        // A nonzero value below 10^digits always leaves a remainder
        let reduction = self.scale - scale;
        if reduction >= self.precision() {
            return Err(ConversionError::precision_loss(format!(
                "rescaling {} digits from scale {} to scale {} would drop nonzero digits",
                self.precision(),
                self.scale,
                scale
            )));
        }

        let factor = num::pow(BigInt::from(10u8), reduction as usize);
        let (quotient, remainder) = self.unscaled.div_rem(&factor);
        if !remainder.is_zero() {
            return Err(ConversionError::precision_loss(format!(
                "rescaling {} from scale {} to scale {} would drop nonzero digits",
                self, self.scale, scale
            )));
        }
        Ok(Decimal::new(quotient, scale))
    }

    /// Rescale to `scale` and check the result fits in `precision` digits
    pub fn fit(&self, precision: u32, scale: u32) -> Result<Decimal> {
        let widened = u64::from(self.precision()) + u64::from(scale.saturating_sub(self.scale));
        if !self.unscaled.is_zero() && widened > u64::from(precision) {
            return Err(ConversionError::precision_loss(format!(
                "a {}-digit value at scale {} needs {} digits at scale {}, declared precision is {}",
                self.precision(),
                self.scale,
                widened,
                scale,
                precision
            )));
        }

        let rescaled = self.rescale(scale)?;
        if rescaled.precision() > precision {
            return Err(ConversionError::precision_loss(format!(
                "{} needs {} digits, declared precision is {}",
                rescaled,
                rescaled.precision(),
                precision
            )));
        }
        Ok(rescaled)
    }

    /// Two's-complement big-endian bytes of the unscaled value
    pub fn to_be_bytes(&self) -> Vec<u8> {
        self.unscaled.to_signed_bytes_be()
    }

    /// Rebuild a decimal from two's-complement big-endian bytes
    pub fn from_be_bytes(bytes: &[u8], scale: u32) -> Self {
        Decimal::new(BigInt::from_signed_bytes_be(bytes), scale)
    }
}

impl fmt::Display for Decimal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let digits = self.unscaled.abs().to_string();
        let sign = if self.unscaled.is_negative() { "-" } else { "" };
        let scale = self.scale as usize;

        if scale == 0 {
            return write!(f, "{}{}", sign, digits);
        }

        let padded = if digits.len() <= scale {
            format!("{}{}", "0".repeat(scale + 1 - digits.len()), digits)
        } else {
            digits
        };
        let (int_part, frac_part) = padded.split_at(padded.len() - scale);
        write!(f, "{}{}.{}", sign, int_part, frac_part)
    }
}

impl FromStr for Decimal {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        let (negative, body) = match trimmed.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, trimmed.strip_prefix('+').unwrap_or(trimmed)),
        };

        let (int_part, frac_part) = match body.split_once('.') {
            Some((i, f)) => (i, f),
            None => (body, ""),
        };

        let all_digits = |part: &str| part.bytes().all(|b| b.is_ascii_digit());
        if (int_part.is_empty() && frac_part.is_empty())
            || !all_digits(int_part)
            || !all_digits(frac_part)
        {
            return Err(ConversionError::invalid_value(format!(
                "'{}' is not a decimal number",
                s
            )));
        }

        let digits = format!("{}{}", int_part, frac_part);
        let magnitude = BigInt::parse_bytes(digits.as_bytes(), 10).ok_or_else(|| {
            ConversionError::invalid_value(format!("'{}' is not a decimal number", s))
        })?;
        let unscaled = if negative { -magnitude } else { magnitude };

        Ok(Decimal::new(unscaled, frac_part.len() as u32))
    }
}

impl Serialize for Decimal {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Decimal {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_and_parse() {
        let d = Decimal::new(12345, 2);
        assert_eq!(d.to_string(), "123.45");
        assert_eq!("123.45".parse::<Decimal>().unwrap(), d);

        assert_eq!(Decimal::new(-5, 3).to_string(), "-0.005");
        assert_eq!(Decimal::new(7, 0).to_string(), "7");
        assert_eq!("-0.005".parse::<Decimal>().unwrap(), Decimal::new(-5, 3));
        assert_eq!(".5".parse::<Decimal>().unwrap(), Decimal::new(5, 1));

        assert!("12a.3".parse::<Decimal>().is_err());
        assert!("".parse::<Decimal>().is_err());
        assert!("1.2.3".parse::<Decimal>().is_err());
    }

    #[test]
    fn test_rescale() {
        let d = Decimal::new(1234, 1);
        assert_eq!(d.rescale(3).unwrap(), Decimal::new(123400, 3));
        assert_eq!(Decimal::new(12300, 4).rescale(2).unwrap(), Decimal::new(123, 2));

        let err = Decimal::new(12345, 3).rescale(2).unwrap_err();
        assert!(matches!(err, ConversionError::PrecisionLoss { .. }));

        let negative = Decimal::new(-12300, 4).rescale(2).unwrap();
        assert_eq!(negative, Decimal::new(-123, 2));
    }

    #[test]
    fn test_rescale_from_huge_scale() {
        let err = Decimal::new(1, 3_000_000_000).rescale(2).unwrap_err();
        assert!(matches!(err, ConversionError::PrecisionLoss { .. }));

        let err = Decimal::new(12345, 5).rescale(0).unwrap_err();
        assert!(matches!(err, ConversionError::PrecisionLoss { .. }));

        assert_eq!(
            Decimal::new(0, 3_000_000_000).rescale(2).unwrap(),
            Decimal::new(0, 2)
        );

        let err = Decimal::new(1, 0).fit(10, 3_000_000_000).unwrap_err();
        assert!(matches!(err, ConversionError::PrecisionLoss { .. }));
    }

    #[test]
    fn test_fit_checks_precision() {
        assert_eq!(Decimal::new(12345, 2).fit(10, 2).unwrap().precision(), 5);
        let err = Decimal::new(123456, 0).fit(6, 2).unwrap_err();
        assert!(matches!(err, ConversionError::PrecisionLoss { .. }));
    }

    #[test]
    fn test_big_endian_bytes() {
        let d = Decimal::new(12345, 2);
        assert_eq!(d.to_be_bytes(), vec![0x30, 0x39]);
        assert_eq!(Decimal::from_be_bytes(&[0x30, 0x39], 2), d);

        let negative = Decimal::new(-1, 2);
        assert_eq!(negative.to_be_bytes(), vec![0xff]);
        assert_eq!(Decimal::from_be_bytes(&[0xff, 0xff], 2), negative);
    }

    #[test]
    fn test_serde_as_string() {
        let d = Decimal::new(12345, 2);
        let json = serde_json::to_string(&d).unwrap();
        assert_eq!(json, "\"123.45\"");
        let back: Decimal = serde_json::from_str(&json).unwrap();
        assert_eq!(back, d);
    }
}
