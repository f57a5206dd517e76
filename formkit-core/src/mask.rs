//! Mask cleaning for locale-formatted numbers

use crate::value::Value;
use serde::{Deserialize, Serialize};

/// Separators a masked number input renders with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NumberMask {
    pub thousands_separator: char,
    pub decimal_separator: char,
}

impl Default for NumberMask {
    fn default() -> Self {
        Self {
            thousands_separator: ',',
            decimal_separator: '.',
        }
    }
}

impl NumberMask {
    /// Parse masked text such as `"1,234.50 %"` into a number. Thousands
    /// separators, whitespace, prefixes and suffixes are dropped. Returns
    /// `None` when no digits remain.
    pub fn clean(&self, text: &str) -> Option<f64> {
        let mut cleaned = String::with_capacity(text.len());
        for c in text.chars() {
            if c.is_ascii_digit() {
                cleaned.push(c);
            } else if c == self.decimal_separator {
                cleaned.push('.');
            } else if c == '-' && cleaned.is_empty() {
                cleaned.push('-');
            }
        }
        if !cleaned.chars().any(|c| c.is_ascii_digit()) {
            return None;
        }
        cleaned.parse().ok()
    }

    /// Clean a control value headed for a numeric field. Text that does not
    /// parse becomes `Empty`; non-text values pass through.
    pub fn clean_value(&self, value: &Value) -> Value {
        match value {
            Value::Text(s) if s.trim().is_empty() => Value::Empty,
            Value::Text(s) => self.clean(s).map(Value::Number).unwrap_or_default(),
            other => other.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_strips_thousands_separators() {
        let mask = NumberMask::default();
        assert_eq!(mask.clean("1,234,567.25"), Some(1_234_567.25));
        assert_eq!(mask.clean("-1,000"), Some(-1000.0));
        assert_eq!(mask.clean("12.5 %"), Some(12.5));
        assert_eq!(mask.clean("CHF 7"), Some(7.0));
        assert_eq!(mask.clean("abc"), None);
    }

    #[test]
    fn test_clean_with_continental_mask() {
        let mask = NumberMask {
            thousands_separator: '.',
            decimal_separator: ',',
        };
        assert_eq!(mask.clean("1.234,5"), Some(1234.5));
    }

    #[test]
    fn test_clean_value_passes_numbers_through() {
        let mask = NumberMask::default();
        assert_eq!(mask.clean_value(&Value::Number(3.0)), Value::Number(3.0));
        assert_eq!(mask.clean_value(&Value::from(" ")), Value::Empty);
        assert_eq!(mask.clean_value(&Value::from("2,000")), Value::Number(2000.0));
    }
}
