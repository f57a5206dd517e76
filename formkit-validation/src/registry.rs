//! Validation registry
//!
//! Maps a validation-kind key to a predicate (or a parameterized predicate
//! factory) plus the error rule explaining its failure. The process-wide
//! instance is installed once at start-up and is read-only afterwards.

use formkit_core::{
    format_number, tracing_sink, CheckFn, ConfigError, ConfigIssue, ErrorRule, FieldDescriptor,
    Predicate, SharedSink,
};
use once_cell::sync::OnceCell;
use std::borrow::Cow;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::builtin;

static GLOBAL: OnceCell<ValidationRegistry> = OnceCell::new();

/// Stable key of a validation kind.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ValidationKind(Cow<'static, str>);

impl ValidationKind {
    pub const EMAIL: ValidationKind = ValidationKind(Cow::Borrowed("email"));
    pub const WEB_URL: ValidationKind = ValidationKind(Cow::Borrowed("webUrl"));
    pub const GT_WITH_MASK: ValidationKind = ValidationKind(Cow::Borrowed("gtWithMask"));
    pub const NOT_CONTAINS: ValidationKind = ValidationKind(Cow::Borrowed("notContains"));
    pub const NOT_ZERO: ValidationKind = ValidationKind(Cow::Borrowed("notZero"));
    pub const DATE_NOT_PAST: ValidationKind = ValidationKind(Cow::Borrowed("dateNotPast"));

    /// Key for an application-defined kind.
    pub fn new(name: impl Into<String>) -> Self {
        Self(Cow::Owned(name.into()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ValidationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Parameter handed to a predicate factory; its display form is also
/// interpolated into the error message.
#[derive(Debug, Clone, PartialEq)]
pub enum Param {
    Number(f64),
    Text(String),
    List(Vec<String>),
}

impl fmt::Display for Param {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Param::Number(n) => f.write_str(&format_number(*n)),
            Param::Text(s) => f.write_str(s),
            Param::List(items) => f.write_str(&items.join(", ")),
        }
    }
}

/// Builds a concrete predicate from parameters.
pub type PredicateFactory = Arc<dyn Fn(&[Param]) -> CheckFn + Send + Sync>;

/// How a registered kind produces its predicate.
#[derive(Clone)]
pub enum Check {
    Predicate(CheckFn),
    Factory(PredicateFactory),
}

impl fmt::Debug for Check {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Check::Predicate(_) => f.write_str("Check::Predicate"),
            Check::Factory(_) => f.write_str("Check::Factory"),
        }
    }
}

#[derive(Debug, Clone)]
struct RegistryEntry {
    check: Check,
    rule: ErrorRule,
}

/// Validation-kind table.
pub struct ValidationRegistry {
    entries: HashMap<ValidationKind, RegistryEntry>,
    sink: SharedSink,
}

impl fmt::Debug for ValidationRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut kinds: Vec<&str> = self.entries.keys().map(|k| k.as_str()).collect();
        kinds.sort_unstable();
        f.debug_struct("ValidationRegistry")
            .field("kinds", &kinds)
            .finish_non_exhaustive()
    }
}

impl ValidationRegistry {
    /// Empty registry reporting to `sink`.
    pub fn new(sink: SharedSink) -> Self {
        Self {
            entries: HashMap::new(),
            sink,
        }
    }

    /// Registry with every built-in kind, reporting through `tracing`.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new(tracing_sink());
        builtin::register_all(&mut registry);
        registry
    }

    /// Replace the diagnostic sink.
    pub fn with_sink(mut self, sink: SharedSink) -> Self {
        self.sink = sink;
        self
    }

    pub fn sink(&self) -> &SharedSink {
        &self.sink
    }

    /// Register (or replace) a kind. Meant for start-up only.
    pub fn register(&mut self, kind: ValidationKind, check: Check, rule: ErrorRule) -> &mut Self {
        if self.entries.contains_key(&kind) {
            tracing::debug!(kind = %kind, "replacing validation kind");
        }
        self.entries.insert(kind, RegistryEntry { check, rule });
        self
    }

    pub fn register_predicate(
        &mut self,
        kind: ValidationKind,
        check: impl Fn(&formkit_core::Value) -> bool + Send + Sync + 'static,
        rule: ErrorRule,
    ) -> &mut Self {
        self.register(kind, Check::Predicate(Arc::new(check)), rule)
    }

    pub fn register_factory(
        &mut self,
        kind: ValidationKind,
        factory: impl Fn(&[Param]) -> CheckFn + Send + Sync + 'static,
        rule: ErrorRule,
    ) -> &mut Self {
        self.register(kind, Check::Factory(Arc::new(factory)), rule)
    }

    pub fn contains(&self, kind: &ValidationKind) -> bool {
        self.entries.contains_key(kind)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Attach the predicate registered under `kind` to `descriptor`, with a
    /// copy of its error rule carrying `params` for message interpolation.
    ///
    /// An unregistered kind is reported to the diagnostic sink and leaves
    /// the descriptor untouched. Returns whether anything was attached.
    pub fn apply(
        &self,
        descriptor: &mut FieldDescriptor,
        kind: &ValidationKind,
        params: &[Param],
    ) -> bool {
        let Some(entry) = self.entries.get(kind) else {
            self.sink.report(ConfigIssue::UnregisteredValidation {
                field: descriptor.field.clone(),
                kind: kind.to_string(),
            });
            return false;
        };

        let check = match &entry.check {
            Check::Predicate(check) => Arc::clone(check),
            Check::Factory(factory) => factory(params),
        };
        let rule = entry
            .rule
            .clone()
            .with_params(params.iter().map(ToString::to_string).collect());
        descriptor.add_validation(Predicate::from_fn(entry.rule.name.clone(), check), rule);
        true
    }

    // ------------------------------------------------------------------------
    // Process-wide instance
    // ------------------------------------------------------------------------

    /// Install the process-wide registry. Only the first call succeeds.
    pub fn install(
        registry: ValidationRegistry,
    ) -> Result<&'static ValidationRegistry, ConfigError> {
        GLOBAL
            .set(registry)
            .map_err(|_| ConfigError::RegistryAlreadyInstalled)?;
        tracing::info!(
            kinds = GLOBAL.get().map_or(0, |r| r.len()),
            "validation registry installed"
        );
        GLOBAL.get().ok_or(ConfigError::RegistryAlreadyInstalled)
    }

    /// The process-wide registry; installs the built-ins on first use when
    /// nothing was installed explicitly.
    pub fn global() -> &'static ValidationRegistry {
        GLOBAL.get_or_init(ValidationRegistry::with_builtins)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use formkit_core::{DataType, InputKind, RecordingSink, TriggerEvents, Value};

    fn field() -> FieldDescriptor {
        FieldDescriptor::new("amount", DataType::Numeric, InputKind::Number)
    }

    #[test]
    fn test_apply_attaches_predicate_and_rule() {
        let registry = ValidationRegistry::with_builtins();
        let mut d = field();
        assert!(registry.apply(&mut d, &ValidationKind::NOT_ZERO, &[]));
        assert_eq!(d.validators.len(), 1);
        assert_eq!(d.error_rules[0].name, "notZero");
        assert_eq!(d.failing(&Value::Number(0.0)), vec!["notZero".to_string()]);
    }

    #[test]
    fn test_apply_unregistered_reports_and_noops() {
        let sink = RecordingSink::new();
        let registry = ValidationRegistry::new(sink.clone());
        let mut d = field();
        assert!(!registry.apply(&mut d, &ValidationKind::new("isinChecksum"), &[]));
        assert!(d.validators.is_empty());
        assert_eq!(
            sink.issues(),
            vec![ConfigIssue::UnregisteredValidation {
                field: "amount".to_string(),
                kind: "isinChecksum".to_string(),
            }]
        );
    }

    #[test]
    fn test_factory_params_are_interpolated() {
        let registry = ValidationRegistry::with_builtins();
        let mut d = field();
        registry.apply(
            &mut d,
            &ValidationKind::GT_WITH_MASK,
            &[Param::Number(1000.0), Param::Text("1,000.00".to_string())],
        );
        assert_eq!(d.error_rules[0].params, vec!["1000", "1,000.00"]);
        assert!(d.failing(&Value::Number(999.0)).contains(&"gtWithMask".to_string()));
        assert!(d.failing(&Value::from("1,000.50")).is_empty());
    }

    #[test]
    fn test_custom_kind_registration() {
        let mut registry = ValidationRegistry::new(tracing_sink());
        registry.register_predicate(
            ValidationKind::new("upper"),
            |v| v.as_text().is_none_or(|s| s == s.to_uppercase()),
            ErrorRule::new("upper", "UPPERCASE_ONLY", TriggerEvents::DIRTY),
        );
        let mut d = field();
        assert!(registry.apply(&mut d, &ValidationKind::new("upper"), &[]));
        assert!(!d.failing(&Value::from("abc")).is_empty());
    }

    #[test]
    fn test_global_registry_has_builtins() {
        let registry = ValidationRegistry::global();
        assert!(registry.contains(&ValidationKind::EMAIL));
        assert!(registry.contains(&ValidationKind::DATE_NOT_PAST));
    }
}
