//! formkit DSL - Server Descriptor Translation
//!
//! Turns the language-neutral field metadata a server sends into field and
//! field-group descriptors the runtime can materialize.
//!
//! ```text
//! JSON payload (array or envelope)
//!     ↓
//! wire types (FieldMetadata, ConstraintDecl)
//!     ↓
//! Translator (dispatch on data type + hints)
//!     ↓
//! Vec<FormItem> (date ranges folded into groups)
//! ```

pub mod translator;
pub mod wire;

pub use translator::{date_of, Translator, DATE_RANGE_KEY};
pub use wire::{ConstraintDecl, ConstraintKind, FieldMetadata, FormDescriptorEnvelope, PropertyHint};
