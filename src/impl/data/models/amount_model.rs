use std::str::FromStr;

use fractic_server_error::ServerError;
use serde_json::Value;

use crate::errors::InvalidAmount;

/// Monetary amount as reported upstream: a JSON number, or a string such as
/// `"1,234.50"`, `"$80"` or `"(12.00)"` (accounting negative).
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct AmountModel(pub f64);

impl FromStr for AmountModel {
    type Err = ServerError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw: String = s
            .trim()
            .chars()
            .filter(|c| !matches!(c, ',' | '$' | '€' | '£' | ' '))
            .collect();
        let is_negative = raw.starts_with('(') && raw.ends_with(')');
        let numeric_part = raw.trim_matches(|c| c == '(' || c == ')');
        let amount = numeric_part
            .parse::<f64>()
            .ok()
            .filter(|a| a.is_finite())
            .ok_or_else(|| InvalidAmount::new(s))?;
        Ok(AmountModel(if is_negative { -amount } else { amount }))
    }
}

impl AmountModel {
    /// `None` for anything that does not hold a finite number (null, empty
    /// string, free text, NaN).
    pub(crate) fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Number(n) => n.as_f64().filter(|f| f.is_finite()).map(AmountModel),
            Value::String(s) => AmountModel::from_str(s).ok(),
            _ => None,
        }
    }
}

impl From<AmountModel> for f64 {
    fn from(amount: AmountModel) -> f64 {
        amount.0
    }
}
