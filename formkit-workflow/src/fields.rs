//! Workflow-specific descriptors appended to a form.

use formkit_core::{FormItem, InputKind};
use formkit_validation::{DescriptorFactory, FieldHints, SUBMIT_FIELD};

use crate::controller::SAVE_KEY;

/// Length limit of the request and accept/reject notes.
pub const NOTE_MAX_LENGTH: usize = 1000;

/// Field names the controller drives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProposalFieldNames {
    pub note_request: String,
    pub note_accept_reject: String,
    pub reject: String,
    pub submit: String,
}

impl Default for ProposalFieldNames {
    fn default() -> Self {
        Self {
            note_request: "noteRequest".to_string(),
            note_accept_reject: "noteAcceptReject".to_string(),
            reject: "reject".to_string(),
            submit: SUBMIT_FIELD.to_string(),
        }
    }
}

impl ProposalFieldNames {
    /// Names that never belong to the business object.
    pub fn all(&self) -> [&str; 4] {
        [
            self.note_request.as_str(),
            self.note_accept_reject.as_str(),
            self.reject.as_str(),
            self.submit.as_str(),
        ]
    }

    pub fn is_workflow_field(&self, field: &str) -> bool {
        self.all().contains(&field)
    }
}

/// Append the note fields and the reject button, hidden and disabled, and
/// keep the submit button last (creating one when the form has none).
pub fn append_proposal_fields(
    factory: &DescriptorFactory<'_>,
    items: &mut Vec<FormItem>,
    names: &ProposalFieldNames,
) {
    let submit_at = items.iter().position(|item| {
        item.as_field()
            .is_some_and(|f| f.input_kind == InputKind::SubmitButton)
    });
    let submit = match submit_at {
        Some(at) => items.remove(at),
        None => {
            let mut submit = factory.submit_button(SAVE_KEY);
            submit.field = names.submit.clone();
            submit.into()
        }
    };

    let hidden = || FieldHints::new().invisible().disabled();
    items.push(
        factory
            .textarea(&names.note_request, NOTE_MAX_LENGTH, false, hidden())
            .into(),
    );
    items.push(
        factory
            .textarea(&names.note_accept_reject, NOTE_MAX_LENGTH, false, hidden())
            .into(),
    );
    items.push(factory.button(&names.reject, "reject", hidden()).into());
    items.push(submit);
}

#[cfg(test)]
mod tests {
    use super::*;
    use formkit_core::FormkitConfig;
    use formkit_validation::ValidationRegistry;

    #[test]
    fn test_appends_notes_and_keeps_submit_last() {
        let registry = ValidationRegistry::with_builtins();
        let config = FormkitConfig::standard();
        let factory = DescriptorFactory::new(&registry, &config);
        let mut items: Vec<FormItem> = vec![
            factory.text("name", 40, true, FieldHints::new()).into(),
            factory.submit_button(SAVE_KEY).into(),
        ];
        let names = ProposalFieldNames::default();
        append_proposal_fields(&factory, &mut items, &names);

        let order: Vec<&str> = items.iter().map(FormItem::name).collect();
        assert_eq!(
            order,
            vec!["name", "noteRequest", "noteAcceptReject", "reject", "submit"]
        );
        let note = items[1].as_field().unwrap();
        assert!(note.invisible && note.disabled);
        assert_eq!(note.label_key, "NOTE_REQUEST");
    }

    #[test]
    fn test_creates_submit_when_missing() {
        let registry = ValidationRegistry::with_builtins();
        let config = FormkitConfig::standard();
        let factory = DescriptorFactory::new(&registry, &config);
        let mut items = Vec::new();
        append_proposal_fields(&factory, &mut items, &ProposalFieldNames::default());
        assert_eq!(items.last().map(FormItem::name), Some("submit"));
        assert!(items.last().and_then(FormItem::as_field).is_some_and(|f| f.is_button()));
    }
}
