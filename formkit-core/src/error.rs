//! Error types for formkit operations
//!
//! Local validation failures never appear here: they live on the controls.
//! Configuration slips that must not crash a form are reported through
//! [`crate::diagnostics`] instead.

use thiserror::Error;

/// Configuration errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },

    #[error("Failed to parse configuration: {reason}")]
    Parse { reason: String },

    #[error("Failed to read configuration file: {reason}")]
    Io { reason: String },

    #[error("Validation registry is already installed")]
    RegistryAlreadyInstalled,
}

/// Runtime form tree errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TreeError {
    #[error("Unknown field: {field}")]
    UnknownField { field: String },

    #[error("Unknown group: {group}")]
    UnknownGroup { group: String },

    #[error("Duplicate field name in form: {field}")]
    DuplicateField { field: String },

    #[error("Control handle belongs to another form")]
    ForeignHandle,

    #[error("Submission blocked, invalid controls: {invalid:?}")]
    SubmitBlocked { invalid: Vec<String> },

    #[error("Submission already in flight")]
    SubmitInFlight,
}

/// Server-descriptor translation errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TranslateError {
    #[error("Malformed descriptor payload: {reason}")]
    Malformed { reason: String },

    #[error("Duplicate field name: {field}")]
    DuplicateField { field: String },
}

/// Failures reported by the entity-update collaborator.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ServiceError {
    /// The principal exhausted its direct-change allowance; the caller
    /// should continue with a change request instead.
    #[error("Entity change limit exceeded for {entity}")]
    ChangeLimitExceeded { entity: String },

    #[error("Domain error {code}: {message}")]
    Domain { code: String, message: String },

    #[error("Transport failure: {reason}")]
    Transport { reason: String },
}

impl ServiceError {
    /// Domain errors the workflow recovers from without an error toast.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, ServiceError::ChangeLimitExceeded { .. })
    }
}

/// Change-proposal workflow errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum WorkflowError {
    #[error("Form is missing the '{field}' descriptor required by the workflow")]
    MissingWorkflowField { field: String },

    #[error("Operation {operation} is not available in state {state}")]
    InvalidState { operation: String, state: String },
}

/// Master error type for all formkit errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FormkitError {
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("Tree error: {0}")]
    Tree(#[from] TreeError),

    #[error("Translate error: {0}")]
    Translate(#[from] TranslateError),

    #[error("Service error: {0}")]
    Service(#[from] ServiceError),

    #[error("Workflow error: {0}")]
    Workflow(#[from] WorkflowError),
}

/// Result type alias for formkit operations.
pub type FormkitResult<T> = Result<T, FormkitError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tree_error_display_unknown_field() {
        let err = TreeError::UnknownField {
            field: "isin".to_string(),
        };
        assert!(format!("{}", err).contains("isin"));
    }

    #[test]
    fn test_master_error_wraps_service_error() {
        let err: FormkitError = ServiceError::Transport {
            reason: "timeout".to_string(),
        }
        .into();
        assert!(matches!(err, FormkitError::Service(_)));
        assert!(format!("{}", err).contains("timeout"));
    }

    #[test]
    fn test_only_change_limit_is_recoverable() {
        assert!(ServiceError::ChangeLimitExceeded {
            entity: "Security".to_string()
        }
        .is_recoverable());
        assert!(!ServiceError::Transport {
            reason: "down".to_string()
        }
        .is_recoverable());
    }
}
