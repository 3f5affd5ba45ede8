use std::fmt;

/// A positive whole-pound price
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Clone, Copy)]
pub struct PriceGbp(i32);

impl PriceGbp {
    /// Round a candidate amount to whole pounds, rejecting anything that is
    /// not finite or would not be a positive price
    pub fn from_amount(amount: f64) -> Result<Self, String> {
        if !amount.is_finite() || amount <= 0.0 {
            return Err("must be a positive number".into());
        }
        let rounded = amount.round();
        if rounded < 1.0 || rounded > f64::from(i32::MAX) {
            return Err("must be a positive number".into());
        }
        Ok(Self(rounded as i32))
    }

    /// Parse an amount from an untyped JSON value, accepting numbers and
    /// numeric strings
    pub fn from_json(value: &serde_json::Value) -> Result<Self, String> {
        let amount = match value {
            serde_json::Value::Number(n) => n.as_f64(),
            serde_json::Value::String(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        };
        amount
            .ok_or_else(|| "must be a positive number".to_string())
            .and_then(Self::from_amount)
    }

    pub fn value(&self) -> i32 {
        self.0
    }
}

impl TryFrom<i32> for PriceGbp {
    type Error = String;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        if value <= 0 {
            return Err("must be a positive number".into());
        }
        Ok(Self(value))
    }
}

impl fmt::Display for PriceGbp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "£{}", self.0)
    }
}
