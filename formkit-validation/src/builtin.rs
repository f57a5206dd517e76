//! Built-in validation kinds.
//!
//! Every built-in passes on an empty value: emptiness is the business of
//! the "required" predicate.

use chrono::Local;
use formkit_core::{CheckFn, ErrorRule, NumberMask, TriggerEvents, Value};
use once_cell::sync::Lazy;
use regex::Regex;
use std::sync::Arc;

use crate::registry::{Param, ValidationKind, ValidationRegistry};

static EMAIL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z0-9._%+-]+@[A-Za-z0-9-]+(\.[A-Za-z0-9-]+)*\.[A-Za-z]{2,}$")
        .expect("email pattern compiles")
});

static WEB_URL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(https?://)?[A-Za-z0-9-]+(\.[A-Za-z0-9-]+)*\.[A-Za-z]{2,}(:\d{1,5})?(/\S*)?$")
        .expect("web-url pattern compiles")
});

/// Register every built-in kind.
pub fn register_all(registry: &mut ValidationRegistry) {
    registry
        .register_predicate(
            ValidationKind::EMAIL,
            |v| matches_pattern(&EMAIL, v),
            ErrorRule::new("email", "INVALID_EMAIL", TriggerEvents::FOCUS_OUT),
        )
        .register_predicate(
            ValidationKind::WEB_URL,
            |v| matches_pattern(&WEB_URL, v),
            ErrorRule::new("webUrl", "INVALID_URL", TriggerEvents::FOCUS_OUT),
        )
        .register_factory(
            ValidationKind::GT_WITH_MASK,
            greater_than,
            ErrorRule::new(
                "gtWithMask",
                "GT_WITH_MASK",
                TriggerEvents::DIRTY | TriggerEvents::FOCUS_OUT,
            ),
        )
        .register_factory(
            ValidationKind::NOT_CONTAINS,
            not_contains,
            ErrorRule::new("notContains", "NOT_CONTAINS", TriggerEvents::DIRTY),
        )
        .register_predicate(
            ValidationKind::NOT_ZERO,
            |v| numeric(v).is_none_or(|n| n != 0.0),
            ErrorRule::new(
                "notZero",
                "NOT_ZERO",
                TriggerEvents::DIRTY | TriggerEvents::TOUCHED,
            ),
        )
        .register_predicate(
            ValidationKind::DATE_NOT_PAST,
            |v| v.as_date().is_none_or(|d| d >= Local::now().date_naive()),
            ErrorRule::new(
                "dateNotPast",
                "DATE_NOT_PAST",
                TriggerEvents::DIRTY | TriggerEvents::TOUCHED,
            ),
        );
}

fn matches_pattern(pattern: &Regex, value: &Value) -> bool {
    match value {
        Value::Text(s) => s.is_empty() || pattern.is_match(s),
        _ => true,
    }
}

/// Numeric reading of a value; masked text is cleaned with the default mask.
fn numeric(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => Some(*n),
        Value::Text(s) => NumberMask::default().clean(s),
        _ => None,
    }
}

/// `params[0]` is the exclusive lower bound; `params[1]` (the formatted
/// bound) only feeds the message.
fn greater_than(params: &[Param]) -> CheckFn {
    let bound = match params.first() {
        Some(Param::Number(n)) => *n,
        Some(Param::Text(s)) => NumberMask::default().clean(s).unwrap_or(f64::NEG_INFINITY),
        _ => f64::NEG_INFINITY,
    };
    Arc::new(move |v: &Value| numeric(v).is_none_or(|n| n > bound))
}

/// Rejects values whose string form is in the denylist.
fn not_contains(params: &[Param]) -> CheckFn {
    let denied: Vec<String> = params
        .iter()
        .flat_map(|p| match p {
            Param::List(items) => items.clone(),
            Param::Text(s) => vec![s.clone()],
            Param::Number(n) => vec![formkit_core::format_number(*n)],
        })
        .collect();
    Arc::new(move |v: &Value| v.is_empty() || !denied.contains(&v.to_key_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate};

    #[test]
    fn test_email_pattern() {
        assert!(matches_pattern(&EMAIL, &Value::from("ops@example.com")));
        assert!(matches_pattern(&EMAIL, &Value::from("")));
        assert!(!matches_pattern(&EMAIL, &Value::from("ops@example")));
        assert!(!matches_pattern(&EMAIL, &Value::from("not an email")));
    }

    #[test]
    fn test_web_url_pattern() {
        assert!(matches_pattern(&WEB_URL, &Value::from("https://www.six-group.com/en")));
        assert!(matches_pattern(&WEB_URL, &Value::from("example.org")));
        assert!(!matches_pattern(&WEB_URL, &Value::from("http://")));
        assert!(!matches_pattern(&WEB_URL, &Value::from("ftp:/x y")));
    }

    #[test]
    fn test_not_contains_denylist() {
        let check = not_contains(&[Param::List(vec!["USD".into(), "EUR".into()])]);
        assert!(!check(&Value::from("USD")));
        assert!(check(&Value::from("CHF")));
        assert!(check(&Value::Empty));
    }

    #[test]
    fn test_greater_than_with_text_bound() {
        let check = greater_than(&[Param::Text("1,000".into())]);
        assert!(!check(&Value::Number(1000.0)));
        assert!(check(&Value::Number(1000.01)));
        assert!(check(&Value::Empty));
    }

    #[test]
    fn test_date_not_past() {
        let mut registry = ValidationRegistry::new(formkit_core::tracing_sink());
        register_all(&mut registry);
        let mut d = formkit_core::FieldDescriptor::new(
            "expires",
            formkit_core::DataType::DateString,
            formkit_core::InputKind::Calendar,
        );
        registry.apply(&mut d, &ValidationKind::DATE_NOT_PAST, &[]);
        let today = Local::now().date_naive();
        assert!(d.failing(&Value::Date(today)).is_empty());
        assert!(!d.failing(&Value::Date(today - Duration::days(1))).is_empty());
        assert!(d
            .failing(&Value::Date(NaiveDate::from_ymd_opt(2999, 1, 1).unwrap()))
            .is_empty());
    }
}
