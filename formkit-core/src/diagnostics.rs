//! Diagnostic channel for form configuration issues.
//!
//! Wiring mistakes (an unregistered validation key, an option list missing a
//! stored value, a constraint naming a field that does not exist) are found
//! at form-construction or transfer time, far from anyone who could notice a
//! silently missing rule. They are reported here and the operation degrades
//! instead of failing the form.

use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// A configuration issue detected while building or filling a form.
#[derive(Debug, Clone, Error, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfigIssue {
    #[error("validation kind '{kind}' is not registered (field '{field}')")]
    UnregisteredValidation { field: String, kind: String },

    #[error("field '{field}' has no option keyed '{value}'")]
    MissingOption { field: String, value: String },

    #[error("constraint '{constraint}' references unknown field '{field}'")]
    DanglingConstraint { constraint: String, field: String },

    #[error("unknown constraint kind '{kind}'")]
    UnknownConstraintKind { kind: String },

    #[error("unknown property hint '{hint}' on field '{field}'")]
    UnknownPropertyHint { field: String, hint: String },
}

impl ConfigIssue {
    /// Short machine-readable tag for log filtering.
    pub fn tag(&self) -> &'static str {
        match self {
            ConfigIssue::UnregisteredValidation { .. } => "unregistered_validation",
            ConfigIssue::MissingOption { .. } => "missing_option",
            ConfigIssue::DanglingConstraint { .. } => "dangling_constraint",
            ConfigIssue::UnknownConstraintKind { .. } => "unknown_constraint_kind",
            ConfigIssue::UnknownPropertyHint { .. } => "unknown_property_hint",
        }
    }
}

/// Receiver for configuration issues.
pub trait DiagnosticSink: Send + Sync {
    fn report(&self, issue: ConfigIssue);
}

/// Shared handle to a sink.
pub type SharedSink = Arc<dyn DiagnosticSink>;

/// Forwards every issue to `tracing` at warn level.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl DiagnosticSink for TracingSink {
    fn report(&self, issue: ConfigIssue) {
        tracing::warn!(tag = issue.tag(), issue = %issue, "form configuration issue");
    }
}

/// Default sink.
pub fn tracing_sink() -> SharedSink {
    Arc::new(TracingSink)
}

/// Keeps issues in memory (operator panels, tests) and still logs them.
#[derive(Debug, Default)]
pub struct RecordingSink {
    issues: Mutex<Vec<ConfigIssue>>,
}

impl RecordingSink {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Snapshot of everything reported so far.
    pub fn issues(&self) -> Vec<ConfigIssue> {
        self.issues
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Drain the recorded issues.
    pub fn take(&self) -> Vec<ConfigIssue> {
        std::mem::take(
            &mut *self
                .issues
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner()),
        )
    }
}

impl DiagnosticSink for RecordingSink {
    fn report(&self, issue: ConfigIssue) {
        TracingSink.report(issue.clone());
        self.issues
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(issue);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_sink_keeps_order() {
        let sink = RecordingSink::new();
        sink.report(ConfigIssue::UnknownConstraintKind {
            kind: "between".to_string(),
        });
        sink.report(ConfigIssue::MissingOption {
            field: "currency".to_string(),
            value: "XAU".to_string(),
        });
        let issues = sink.issues();
        assert_eq!(issues.len(), 2);
        assert_eq!(issues[0].tag(), "unknown_constraint_kind");
        assert_eq!(sink.take().len(), 2);
        assert!(sink.issues().is_empty());
    }

    #[test]
    fn test_issue_display_names_field() {
        let issue = ConfigIssue::UnregisteredValidation {
            field: "isin".to_string(),
            kind: "isinChecksum".to_string(),
        };
        let msg = issue.to_string();
        assert!(msg.contains("isinChecksum"));
        assert!(msg.contains("isin"));
    }
}
