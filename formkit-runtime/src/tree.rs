//! Runtime form tree
//!
//! The tree owns every descriptor and every control. Descriptors keep a
//! [`ControlHandle`] back-reference that is only good for lookups here.
//! Group members live in the same flat slot space as top-level fields; the
//! group itself only carries the cross-field predicate and its state.

use crate::control::Control;
use crate::subscription::{Handler, Subscription};
use formkit_core::{
    ControlHandle, ErrorRule, FieldDescriptor, FormId, FormItem, FormkitConfig, GroupPredicate,
    InputKind, NumberMask, Record, SelectOption, SharedSink, TreeError, TriggerEvents, Value,
};
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::fmt;

// ============================================================================
// LAYOUT
// ============================================================================

/// One top-level entry, in form order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Entry {
    /// Slot of a top-level field
    Field(usize),
    /// Index of a group
    Group(usize),
}

/// Materialized field group.
#[derive(Debug, Clone)]
pub struct GroupState {
    pub(crate) name: String,
    pub(crate) slots: Vec<usize>,
    pub(crate) validator: Option<GroupPredicate>,
    pub(crate) error_rule: Option<ErrorRule>,
    /// Name of the failing group predicate
    pub(crate) error: Option<String>,
}

impl GroupState {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Slots of the member controls.
    pub fn slots(&self) -> &[usize] {
        &self.slots
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn error_rule(&self) -> Option<&ErrorRule> {
        self.error_rule.as_ref()
    }

    pub fn is_valid(&self) -> bool {
        self.error.is_none()
    }
}

// ============================================================================
// FORM TREE
// ============================================================================

/// Live, validated control tree materialized from a descriptor list.
pub struct FormTree {
    pub(crate) id: FormId,
    pub(crate) layout: Vec<Entry>,
    pub(crate) descriptors: Vec<FieldDescriptor>,
    pub(crate) controls: Vec<Control>,
    pub(crate) groups: Vec<GroupState>,
    index: HashMap<String, usize>,
    group_index: HashMap<String, usize>,
    pub(crate) mask: NumberMask,
    pub(crate) sink: SharedSink,
    handlers: BTreeMap<u64, Option<Handler>>,
    next_subscription: u64,
    pending: VecDeque<(usize, Value)>,
    dispatching: bool,
    submitting: bool,
}

impl fmt::Debug for FormTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FormTree")
            .field("id", &self.id)
            .field("layout", &self.layout)
            .field("controls", &self.controls)
            .field("groups", &self.groups)
            .field("subscriptions", &self.handlers.len())
            .field("submitting", &self.submitting)
            .finish_non_exhaustive()
    }
}

impl FormTree {
    /// Allocate one control per leaf descriptor, wire its predicates and
    /// set the descriptors' control handles.
    pub fn materialize(items: Vec<FormItem>, config: &FormkitConfig) -> Result<Self, TreeError> {
        let id = FormId::new();
        let mut tree = Self {
            id,
            layout: Vec::with_capacity(items.len()),
            descriptors: Vec::new(),
            controls: Vec::new(),
            groups: Vec::new(),
            index: HashMap::new(),
            group_index: HashMap::new(),
            mask: config.number_mask,
            sink: formkit_core::tracing_sink(),
            handlers: BTreeMap::new(),
            next_subscription: 0,
            pending: VecDeque::new(),
            dispatching: false,
            submitting: false,
        };

        for item in items {
            match item {
                FormItem::Field(descriptor) => {
                    let slot = tree.attach(descriptor, None)?;
                    tree.layout.push(Entry::Field(slot));
                }
                FormItem::Group(group) => {
                    let group_at = tree.groups.len();
                    if tree.group_index.insert(group.name.clone(), group_at).is_some() {
                        return Err(TreeError::DuplicateField { field: group.name });
                    }
                    let mut slots = Vec::with_capacity(group.fields.len());
                    for descriptor in group.fields {
                        slots.push(tree.attach(descriptor, Some(group_at))?);
                    }
                    tree.groups.push(GroupState {
                        name: group.name,
                        slots,
                        validator: group.validator,
                        error_rule: group.error_rule,
                        error: None,
                    });
                    tree.layout.push(Entry::Group(group_at));
                }
            }
        }

        for slot in 0..tree.controls.len() {
            tree.revalidate(slot);
        }
        tracing::debug!(
            form = %id.as_uuid(),
            controls = tree.controls.len(),
            groups = tree.groups.len(),
            "form tree materialized"
        );
        Ok(tree)
    }

    fn attach(
        &mut self,
        mut descriptor: FieldDescriptor,
        group: Option<usize>,
    ) -> Result<usize, TreeError> {
        let slot = self.controls.len();
        if self.index.insert(descriptor.field.clone(), slot).is_some() {
            return Err(TreeError::DuplicateField {
                field: descriptor.field,
            });
        }
        descriptor.control = Some(ControlHandle {
            form: self.id,
            slot,
        });
        let mut control = Control::new(
            &descriptor.field,
            slot,
            descriptor.default_value.clone(),
            descriptor.disabled,
        );
        control.group = group;
        self.controls.push(control);
        self.descriptors.push(descriptor);
        Ok(slot)
    }

    /// Report configuration issues to `sink` instead of `tracing`.
    pub fn with_sink(mut self, sink: SharedSink) -> Self {
        self.sink = sink;
        self
    }

    pub fn id(&self) -> FormId {
        self.id
    }

    // ------------------------------------------------------------------------
    // Lookups
    // ------------------------------------------------------------------------

    pub(crate) fn slot_of(&self, field: &str) -> Result<usize, TreeError> {
        self.index
            .get(field)
            .copied()
            .ok_or_else(|| TreeError::UnknownField {
                field: field.to_string(),
            })
    }

    fn group_at(&self, name: &str) -> Result<usize, TreeError> {
        self.group_index
            .get(name)
            .copied()
            .ok_or_else(|| TreeError::UnknownGroup {
                group: name.to_string(),
            })
    }

    pub fn layout(&self) -> &[Entry] {
        &self.layout
    }

    pub fn contains(&self, field: &str) -> bool {
        self.index.contains_key(field)
    }

    pub fn descriptor(&self, field: &str) -> Result<&FieldDescriptor, TreeError> {
        Ok(&self.descriptors[self.slot_of(field)?])
    }

    /// Leaf descriptors in form order.
    pub fn descriptors(&self) -> impl Iterator<Item = &FieldDescriptor> {
        self.descriptors.iter()
    }

    pub fn control(&self, field: &str) -> Result<&Control, TreeError> {
        Ok(&self.controls[self.slot_of(field)?])
    }

    /// Resolve a descriptor back-reference.
    pub fn control_by_handle(&self, handle: ControlHandle) -> Result<&Control, TreeError> {
        if handle.form != self.id {
            return Err(TreeError::ForeignHandle);
        }
        self.controls.get(handle.slot).ok_or(TreeError::ForeignHandle)
    }

    pub fn controls(&self) -> &[Control] {
        &self.controls
    }

    pub fn group(&self, name: &str) -> Result<&GroupState, TreeError> {
        Ok(&self.groups[self.group_at(name)?])
    }

    pub fn groups(&self) -> &[GroupState] {
        &self.groups
    }

    pub fn value(&self, field: &str) -> Result<&Value, TreeError> {
        Ok(&self.control(field)?.value)
    }

    pub fn valid(&self, field: &str) -> Result<bool, TreeError> {
        Ok(self.control(field)?.is_valid())
    }

    /// Current raw control values keyed by field name.
    pub fn values(&self) -> Record {
        self.controls
            .iter()
            .map(|c| (c.field.clone(), c.value.clone()))
            .collect()
    }

    pub fn is_valid(&self) -> bool {
        self.controls.iter().all(Control::is_valid) && self.groups.iter().all(GroupState::is_valid)
    }

    /// Names of invalid controls followed by names of invalid groups.
    pub fn invalid_fields(&self) -> Vec<String> {
        self.controls
            .iter()
            .filter(|c| !c.is_valid())
            .map(|c| c.field.clone())
            .chain(
                self.groups
                    .iter()
                    .filter(|g| !g.is_valid())
                    .map(|g| g.name.clone()),
            )
            .collect()
    }

    // ------------------------------------------------------------------------
    // Values and interaction
    // ------------------------------------------------------------------------

    /// Programmatic set; does not mark the control dirty.
    pub fn set_value(&mut self, field: &str, value: impl Into<Value>) -> Result<(), TreeError> {
        let slot = self.slot_of(field)?;
        self.assign(slot, value.into());
        Ok(())
    }

    /// User input; marks the control dirty.
    pub fn input(&mut self, field: &str, value: impl Into<Value>) -> Result<(), TreeError> {
        let slot = self.slot_of(field)?;
        self.controls[slot].interaction |= TriggerEvents::DIRTY;
        self.assign(slot, value.into());
        Ok(())
    }

    /// The control lost focus: touched and blurred.
    pub fn focus_out(&mut self, field: &str) -> Result<(), TreeError> {
        let slot = self.slot_of(field)?;
        self.controls[slot].interaction |= TriggerEvents::TOUCHED | TriggerEvents::FOCUS_OUT;
        Ok(())
    }

    pub fn mark_touched(&mut self, field: &str) -> Result<(), TreeError> {
        let slot = self.slot_of(field)?;
        self.controls[slot].interaction |= TriggerEvents::TOUCHED;
        Ok(())
    }

    pub fn mark_all_touched(&mut self) {
        for control in &mut self.controls {
            control.interaction |= TriggerEvents::TOUCHED;
        }
    }

    /// Write `value` into `slot`, revalidate and, when the value changed,
    /// notify subscribers.
    pub(crate) fn assign(&mut self, slot: usize, value: Value) {
        if self.controls[slot].value == value {
            return;
        }
        self.controls[slot].value = value.clone();
        self.revalidate(slot);
        self.emit(slot, value);
    }

    pub(crate) fn revalidate(&mut self, slot: usize) {
        let errors = self.descriptors[slot].failing(&self.controls[slot].value);
        self.controls[slot].errors = errors;
        if let Some(group) = self.controls[slot].group {
            self.revalidate_group(group);
        }
    }

    fn revalidate_group(&mut self, group: usize) {
        let state = &self.groups[group];
        let all_disabled = state.slots.iter().all(|&s| self.controls[s].disabled);
        let error = if all_disabled {
            None
        } else {
            let values: Record = state
                .slots
                .iter()
                .map(|&s| (self.controls[s].field.clone(), self.controls[s].value.clone()))
                .collect();
            state
                .validator
                .as_ref()
                .filter(|v| !v.holds(&values))
                .map(|v| v.name().to_string())
        };
        self.groups[group].error = error;
    }

    // ------------------------------------------------------------------------
    // Descriptor mutation
    // ------------------------------------------------------------------------

    /// Mutate a descriptor in place. The control's disabled state follows
    /// the descriptor and the control is revalidated.
    pub fn update_descriptor(
        &mut self,
        field: &str,
        update: impl FnOnce(&mut FieldDescriptor),
    ) -> Result<(), TreeError> {
        let slot = self.slot_of(field)?;
        update(&mut self.descriptors[slot]);
        self.controls[slot].disabled = self.descriptors[slot].disabled;
        self.revalidate(slot);
        Ok(())
    }

    pub fn set_disabled(&mut self, field: &str, disabled: bool) -> Result<(), TreeError> {
        self.update_descriptor(field, |d| d.disabled = disabled)
    }

    pub fn set_invisible(&mut self, field: &str, invisible: bool) -> Result<(), TreeError> {
        self.update_descriptor(field, |d| d.invisible = invisible)
    }

    pub fn set_label_key(&mut self, field: &str, label_key: &str) -> Result<(), TreeError> {
        self.update_descriptor(field, |d| d.label_key = label_key.to_string())
    }

    pub fn set_annotation(
        &mut self,
        field: &str,
        annotation: Option<String>,
    ) -> Result<(), TreeError> {
        self.update_descriptor(field, |d| d.annotation = annotation)
    }

    pub fn clear_annotations(&mut self) {
        for descriptor in &mut self.descriptors {
            descriptor.annotation = None;
        }
    }

    pub fn set_required(
        &mut self,
        field: &str,
        required: bool,
        triggers: TriggerEvents,
    ) -> Result<(), TreeError> {
        self.update_descriptor(field, |d| d.set_required(required, triggers))
    }

    /// Replace the option list of a select-like field. A selection that is
    /// no longer offered is cleared.
    pub fn set_options(
        &mut self,
        field: &str,
        options: Vec<SelectOption>,
    ) -> Result<(), TreeError> {
        let slot = self.slot_of(field)?;
        let offered = |display: &str| options.iter().any(|o| o.display == display);
        let kept = match &self.controls[slot].value {
            Value::Text(display) if !offered(display) => Value::Empty,
            Value::List(items) => Value::List(
                items
                    .iter()
                    .filter(|display| offered(display))
                    .cloned()
                    .collect(),
            ),
            other => other.clone(),
        };
        self.descriptors[slot].options = Some(options);
        self.revalidate(slot);
        self.assign(slot, kept);
        Ok(())
    }

    /// Enable or disable every non-button control together with its
    /// descriptor's `disabled` flag.
    pub fn set_tree_enabled(&mut self, enabled: bool) {
        for slot in 0..self.controls.len() {
            if self.descriptors[slot].is_button() {
                continue;
            }
            self.descriptors[slot].disabled = !enabled;
            self.controls[slot].disabled = !enabled;
        }
        for group in 0..self.groups.len() {
            self.revalidate_group(group);
        }
        tracing::debug!(form = %self.id.as_uuid(), enabled, "tree enabled state changed");
    }

    /// Restore every control to its descriptor default with a clean
    /// interaction state, and re-enable submission.
    pub fn reset_to_defaults(&mut self) {
        for slot in 0..self.controls.len() {
            self.controls[slot].interaction = TriggerEvents::empty();
            let default = self.descriptors[slot].default_value.clone();
            self.assign(slot, default);
            self.revalidate(slot);
        }
        self.release_submit();
    }

    // ------------------------------------------------------------------------
    // Submission
    // ------------------------------------------------------------------------

    /// Name of the first submit button, if the form has one.
    pub fn submit_field(&self) -> Option<&str> {
        self.descriptors
            .iter()
            .find(|d| d.input_kind == InputKind::SubmitButton)
            .map(|d| d.field.as_str())
    }

    fn set_submit_enabled(&mut self, enabled: bool) {
        for slot in 0..self.descriptors.len() {
            if self.descriptors[slot].input_kind == InputKind::SubmitButton {
                self.descriptors[slot].disabled = !enabled;
                self.controls[slot].disabled = !enabled;
            }
        }
    }

    pub fn is_submitting(&self) -> bool {
        self.submitting
    }

    /// Start a submission: an invalid tree marks every control touched and
    /// is blocked; otherwise the submit control is disabled until
    /// [`FormTree::release_submit`].
    pub fn begin_submit(&mut self) -> Result<(), TreeError> {
        if self.submitting {
            return Err(TreeError::SubmitInFlight);
        }
        if !self.is_valid() {
            self.mark_all_touched();
            let invalid = self.invalid_fields();
            tracing::debug!(form = %self.id.as_uuid(), invalid = ?invalid, "submission blocked");
            return Err(TreeError::SubmitBlocked { invalid });
        }
        self.submitting = true;
        self.set_submit_enabled(false);
        Ok(())
    }

    /// End a submission and re-enable the submit control.
    pub fn release_submit(&mut self) {
        self.submitting = false;
        self.set_submit_enabled(true);
    }

    /// Run `handler` as one submission. The submit control stays disabled
    /// after success and is re-enabled whenever the handler fails.
    pub fn submit<T, E>(
        &mut self,
        handler: impl FnOnce(&mut FormTree) -> Result<T, E>,
    ) -> Result<Result<T, E>, TreeError> {
        self.begin_submit()?;
        let outcome = handler(self);
        if outcome.is_err() {
            self.release_submit();
        }
        Ok(outcome)
    }

    // ------------------------------------------------------------------------
    // Change subscriptions
    // ------------------------------------------------------------------------

    fn subscribe(&mut self, handler: Handler) -> Subscription {
        let id = self.next_subscription;
        self.next_subscription += 1;
        self.handlers.insert(id, Some(handler));
        Subscription(id)
    }

    /// Call `handler` after every change of `field`'s value.
    pub fn watch(
        &mut self,
        field: &str,
        handler: impl FnMut(&mut FormTree, &Value) + 'static,
    ) -> Result<Subscription, TreeError> {
        let slot = self.slot_of(field)?;
        Ok(self.subscribe(Handler::Field {
            slot,
            handler: Box::new(handler),
        }))
    }

    /// Call `handler` after every value change in the form.
    pub fn watch_form(
        &mut self,
        handler: impl FnMut(&mut FormTree, &str, &Value) + 'static,
    ) -> Subscription {
        self.subscribe(Handler::Form(Box::new(handler)))
    }

    /// Detach a handler. Returns false when it was already detached.
    pub fn unsubscribe(&mut self, subscription: Subscription) -> bool {
        self.handlers.remove(&subscription.0).is_some()
    }

    pub fn subscription_count(&self) -> usize {
        self.handlers.len()
    }

    /// Detach every handler and drop queued notifications.
    pub fn teardown(&mut self) -> usize {
        let detached = self.handlers.len();
        self.handlers.clear();
        self.pending.clear();
        tracing::debug!(form = %self.id.as_uuid(), detached, "form tree torn down");
        detached
    }

    /// Queue a change and, unless a dispatch is already running, deliver
    /// queued changes in order. Handlers are taken out of the table while
    /// they run so they can borrow the tree mutably.
    fn emit(&mut self, slot: usize, value: Value) {
        self.pending.push_back((slot, value));
        if self.dispatching {
            return;
        }
        self.dispatching = true;
        while let Some((slot, value)) = self.pending.pop_front() {
            let field = self.controls[slot].field.clone();
            let listeners: Vec<u64> = self
                .handlers
                .iter()
                .filter(|(_, h)| h.as_ref().is_some_and(|h| h.listens_to(slot)))
                .map(|(id, _)| *id)
                .collect();
            for id in listeners {
                let Some(mut handler) = self.handlers.get_mut(&id).and_then(Option::take) else {
                    continue;
                };
                handler.call(self, &field, &value);
                if let Some(entry) = self.handlers.get_mut(&id) {
                    *entry = Some(handler);
                }
            }
        }
        self.dispatching = false;
    }
}
