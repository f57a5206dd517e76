//! Live control state

use formkit_core::{TriggerEvents, Value};

/// Live counterpart of one leaf descriptor.
///
/// Interaction state is kept as the set of trigger events that have
/// occurred, which is exactly what error rules are matched against.
#[derive(Debug, Clone, PartialEq)]
pub struct Control {
    pub(crate) field: String,
    pub(crate) slot: usize,
    pub(crate) value: Value,
    pub(crate) interaction: TriggerEvents,
    pub(crate) disabled: bool,
    /// Names of failing predicates, in predicate order
    pub(crate) errors: Vec<String>,
    /// Index of the owning group, if any
    pub(crate) group: Option<usize>,
}

impl Control {
    pub(crate) fn new(field: &str, slot: usize, value: Value, disabled: bool) -> Self {
        Self {
            field: field.to_string(),
            slot,
            value,
            interaction: TriggerEvents::empty(),
            disabled,
            errors: Vec::new(),
            group: None,
        }
    }

    pub fn field(&self) -> &str {
        &self.field
    }

    pub fn slot(&self) -> usize {
        self.slot
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    pub fn interaction(&self) -> TriggerEvents {
        self.interaction
    }

    pub fn is_dirty(&self) -> bool {
        self.interaction.contains(TriggerEvents::DIRTY)
    }

    pub fn is_touched(&self) -> bool {
        self.interaction.contains(TriggerEvents::TOUCHED)
    }

    pub fn is_blurred(&self) -> bool {
        self.interaction.contains(TriggerEvents::FOCUS_OUT)
    }

    pub fn is_disabled(&self) -> bool {
        self.disabled
    }

    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    pub fn has_error(&self, name: &str) -> bool {
        self.errors.iter().any(|e| e == name)
    }

    /// Disabled controls never count as invalid.
    pub fn is_valid(&self) -> bool {
        self.disabled || self.errors.is_empty()
    }

    pub fn group(&self) -> Option<usize> {
        self.group
    }
}
