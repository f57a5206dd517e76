//! formkit Validation - Registry & Descriptor Factory
//!
//! The registry maps validation-kind keys to predicates (or parameterized
//! predicate factories) plus the error rule explaining a failure. The
//! descriptor factory builds fully populated descriptors on top of it.
//!
//! ```text
//! ValidationRegistry::install(..)   (once, at start-up)
//!     ↓
//! DescriptorFactory::new(registry, config)
//!     ↓
//! text / min_max_number / select / ... → FieldDescriptor
//! ```

pub mod builtin;
pub mod factory;
pub mod registry;

pub use factory::{DescriptorFactory, FieldHints, NumberRange, SUBMIT_FIELD};
pub use registry::{Check, Param, PredicateFactory, ValidationKind, ValidationRegistry};
