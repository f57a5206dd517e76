//! formkit Core - Field Descriptor Model
//!
//! Pure data describing forms: field and group descriptors, error rules,
//! control values, records, configuration and the error taxonomy. All other
//! formkit crates depend on this one. Behavior beyond small helpers lives in
//! the downstream crates:
//!
//! ```text
//! formkit-core (model)
//!     ↓
//! formkit-validation (registry + descriptor factory)
//!     ↓
//! formkit-dsl (server metadata → descriptors)
//!     ↓
//! formkit-runtime (form tree, transfer, error display)
//!     ↓
//! formkit-workflow (change-proposal controller)
//! ```

pub mod config;
pub mod descriptor;
pub mod diagnostics;
pub mod enums;
pub mod error;
pub mod label;
pub mod mask;
pub mod value;

pub use config::FormkitConfig;
pub use descriptor::{
    leaf_fields, CheckFn, ControlHandle, ErrorRule, FieldDescriptor, FieldGroupDescriptor,
    FormId, FormItem, GroupCheckFn, GroupPredicate, Predicate, SelectOption, REQUIRED,
    REQUIRED_KEY,
};
pub use diagnostics::{
    tracing_sink, ConfigIssue, DiagnosticSink, RecordingSink, SharedSink, TracingSink,
};
pub use enums::{DataType, InputKind, ParseEnumError, TriggerEvents};
pub use error::{
    ConfigError, FormkitError, FormkitResult, ServiceError, TranslateError, TreeError,
    WorkflowError,
};
pub use label::{derive_label_key, is_translation_key, literal_text, to_label};
pub use mask::NumberMask;
pub use value::{format_number, Record, Value, DATE_FORMAT, DATE_TIME_FORMAT};
