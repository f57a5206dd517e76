//! Change proposals and the original/proposed entity pair.

use formkit_core::{Record, Value};
use serde::{Deserialize, Serialize};

/// One proposed field value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProposedChange {
    pub field: String,
    pub value: Value,
}

impl ProposedChange {
    pub fn new(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            field: field.into(),
            value: value.into(),
        }
    }
}

/// A pending, unapplied edit awaiting approval.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProposalTask {
    pub id: String,
    pub entity_name: String,
    /// Requester's note
    pub note_request: Option<String>,
    pub changes: Vec<ProposedChange>,
}

impl ProposalTask {
    pub fn new(id: impl Into<String>, entity_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            entity_name: entity_name.into(),
            note_request: None,
            changes: Vec::new(),
        }
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note_request = Some(note.into());
        self
    }

    pub fn with_change(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.changes.push(ProposedChange::new(field, value));
        self
    }
}

/// Original entity, proposed entity and the proposal they came from. The
/// proposed entity is a copy of the original with the proposal's values
/// laid over it.
#[derive(Debug, Clone, PartialEq)]
pub struct ProposalContext {
    original: Record,
    proposed: Record,
    task: ProposalTask,
}

impl ProposalContext {
    pub fn new(original: Record, task: ProposalTask) -> Self {
        let mut proposed = original.clone();
        for change in &task.changes {
            proposed.set(change.field.clone(), change.value.clone());
        }
        Self {
            original,
            proposed,
            task,
        }
    }

    pub fn original(&self) -> &Record {
        &self.original
    }

    pub fn proposed(&self) -> &Record {
        &self.proposed
    }

    pub fn task(&self) -> &ProposalTask {
        &self.task
    }

    /// Fields whose proposed value differs from the original.
    pub fn changed_fields(&self) -> Vec<String> {
        self.original.diff_keys(&self.proposed)
    }

    /// Original value of `field`, empty when the original lacks it.
    pub fn previous_value(&self, field: &str) -> Value {
        self.original.get(field).cloned().unwrap_or_default()
    }
}
