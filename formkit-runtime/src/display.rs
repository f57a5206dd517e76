//! Error-display rules
//!
//! A failing validation is shown only after one of its rule's trigger
//! events happened on the control. Rules are shown in descriptor order and
//! are not deduplicated.

use crate::control::Control;
use crate::tree::{FormTree, GroupState};
use formkit_core::{ErrorRule, TreeError};

/// Whether `rule`'s message is visible on `control` right now.
pub fn should_display(control: &Control, rule: &ErrorRule) -> bool {
    !control.is_disabled()
        && control.has_error(&rule.name)
        && control.interaction().intersects(rule.triggers)
}

/// Whether the group's error is visible: its predicate fails and any
/// member saw one of the rule's trigger events.
pub fn should_display_group<'a>(
    group: &GroupState,
    members: impl IntoIterator<Item = &'a Control>,
) -> bool {
    let (Some(error), Some(rule)) = (group.error(), group.error_rule()) else {
        return false;
    };
    error == rule.name
        && members
            .into_iter()
            .any(|c| c.interaction().intersects(rule.triggers))
}

impl FormTree {
    /// Visible error rules of `field`, in descriptor order.
    pub fn displayed_errors(&self, field: &str) -> Result<Vec<&ErrorRule>, TreeError> {
        let slot = self.slot_of(field)?;
        let control = &self.controls[slot];
        Ok(self.descriptors[slot]
            .error_rules
            .iter()
            .filter(|rule| should_display(control, rule))
            .collect())
    }

    /// Visible group-level rule of `group`, if any.
    pub fn displayed_group_error(&self, group: &str) -> Result<Option<&ErrorRule>, TreeError> {
        let state = self.group(group)?;
        let members = state.slots().iter().map(|&s| &self.controls[s]);
        Ok(should_display_group(state, members)
            .then(|| state.error_rule())
            .flatten())
    }
}
