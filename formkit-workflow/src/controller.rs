//! Change-proposal workflow controller
//!
//! Owns the form tree for the lifetime of the dialog. Every subscription it
//! installs goes into one [`SubscriptionBag`] that [`ProposalController::close`]
//! disposes, whatever state the controller ended in.

use formkit_core::{Record, ServiceError, TreeError, TriggerEvents, Value, WorkflowError};
use formkit_runtime::{FormTree, SubscriptionBag};
use futures_util::stream::BoxStream;
use std::cell::Cell;
use std::fmt;
use std::rc::Rc;

use crate::fields::ProposalFieldNames;
use crate::proposal::{ProposalContext, ProposalTask};
use crate::services::{EntityService, NotificationLevel, NotificationSink, TranslationService};

/// Submit label outside change-request submission.
pub const SAVE_KEY: &str = "SAVE";

/// Submit label while submitting a change request.
pub const SAVE_CHANGE_REQUEST_KEY: &str = "SAVE_CHANGE_REQUEST";

/// Prefix of previous-value annotations.
pub const PREVIOUS_VALUE_KEY: &str = "PREVIOUS_VALUE";

const SAVED_KEY: &str = "MSG_RECORD_SAVED";
const SAVE_FAILED_KEY: &str = "MSG_SAVE_FAILED";
const CHANGE_LIMIT_KEY: &str = "MSG_CHANGE_LIMIT_USE_REQUEST";
const REJECTED_KEY: &str = "MSG_PROPOSAL_REJECTED";

// ============================================================================
// STATE AND OUTCOMES
// ============================================================================

/// Mode the form is shown in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WorkflowState {
    /// The principal edits the entity directly
    DirectEdit,
    /// The principal lacks edit rights and submits a change request
    ChangeRequestSubmit,
    /// A rights holder reviews a pending change request
    ChangeRequestReview,
}

impl fmt::Display for WorkflowState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            WorkflowState::DirectEdit => "DirectEdit",
            WorkflowState::ChangeRequestSubmit => "ChangeRequestSubmit",
            WorkflowState::ChangeRequestReview => "ChangeRequestReview",
        };
        f.write_str(s)
    }
}

/// Rights of the acting principal on the entity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Rights {
    pub can_edit: bool,
}

impl Rights {
    pub fn editor() -> Self {
        Self { can_edit: true }
    }

    pub fn requester() -> Self {
        Self { can_edit: false }
    }
}

/// Terminal outcome of the dialog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Outcome {
    Created,
    Updated,
    Rejected,
    NoChange,
}

/// The single terminal event emitted when the dialog closes.
#[derive(Debug, Clone, PartialEq)]
pub struct Closed {
    pub outcome: Outcome,
    pub payload: Option<Record>,
}

/// Result of a save or reject attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum SaveResult {
    /// Finished; the dialog may close with this outcome
    Done(Outcome),
    /// The change limit was hit; the form now collects a change request
    Redirected,
    /// The collaborator failed; submission is enabled again
    Failed(ServiceError),
    /// Local validation blocked the attempt
    Blocked(TreeError),
}

/// Inputs for [`ProposalController::open`].
#[derive(Debug, Clone, Default)]
pub struct OpenOptions {
    /// Existing entity; `None` creates a new one
    pub entity: Option<Record>,
    pub proposal: Option<ProposalTask>,
    pub rights: Rights,
    pub names: ProposalFieldNames,
}

impl OpenOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entity(mut self, entity: Record) -> Self {
        self.entity = Some(entity);
        self
    }

    pub fn with_proposal(mut self, proposal: ProposalTask) -> Self {
        self.proposal = Some(proposal);
        self
    }

    pub fn with_rights(mut self, rights: Rights) -> Self {
        self.rights = rights;
        self
    }

    pub fn with_names(mut self, names: ProposalFieldNames) -> Self {
        self.names = names;
        self
    }
}

// ============================================================================
// CONTROLLER
// ============================================================================

/// Drives one form through the change-proposal workflow.
pub struct ProposalController {
    tree: FormTree,
    state: WorkflowState,
    names: ProposalFieldNames,
    original: Record,
    context: Option<ProposalContext>,
    is_new: bool,
    changed: Rc<Cell<bool>>,
    subscriptions: SubscriptionBag,
    finished: Option<Closed>,
}

impl fmt::Debug for ProposalController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProposalController")
            .field("form", &self.tree.id())
            .field("state", &self.state)
            .field("is_new", &self.is_new)
            .field("changed", &self.changed.get())
            .finish_non_exhaustive()
    }
}

impl ProposalController {
    /// Pick the initial state, lay the form out for it and fill the tree:
    /// with the proposed entity when reviewing, with the original otherwise.
    pub async fn open(
        mut tree: FormTree,
        options: OpenOptions,
        translator: &dyn TranslationService,
    ) -> Result<Self, WorkflowError> {
        let OpenOptions {
            entity,
            proposal,
            rights,
            names,
        } = options;
        for field in names.all() {
            if !tree.contains(field) {
                return Err(WorkflowError::MissingWorkflowField {
                    field: field.to_string(),
                });
            }
        }

        let state = match (rights.can_edit, &proposal) {
            (false, _) => WorkflowState::ChangeRequestSubmit,
            (true, Some(_)) => WorkflowState::ChangeRequestReview,
            (true, None) => WorkflowState::DirectEdit,
        };
        let is_new = entity.is_none();
        let original = entity.unwrap_or_default();
        let context = match (state, proposal) {
            (WorkflowState::ChangeRequestReview, Some(task)) => {
                if is_new {
                    return Err(WorkflowError::InvalidState {
                        operation: "review a proposal without its entity".to_string(),
                        state: state.to_string(),
                    });
                }
                Some(ProposalContext::new(original.clone(), task))
            }
            _ => None,
        };

        layout(&mut tree, &names, state);
        match &context {
            Some(ctx) => {
                tree.transfer_object_to_tree(ctx.proposed());
                let note = ctx.task().note_request.clone().unwrap_or_default();
                set_field(&mut tree, &names.note_request, Value::from(note));
                annotate(&mut tree, ctx, translator).await;
            }
            None if !is_new => tree.transfer_object_to_tree(&original),
            None => {}
        }

        let mut controller = Self {
            tree,
            state,
            names,
            original,
            context,
            is_new,
            changed: Rc::new(Cell::new(false)),
            subscriptions: SubscriptionBag::new(),
            finished: None,
        };
        controller.install_tracker();
        if state == WorkflowState::ChangeRequestReview {
            controller.install_reject_guard();
        }
        tracing::info!(
            form = %controller.tree.id().as_uuid(),
            state = %state,
            is_new,
            "proposal workflow opened"
        );
        Ok(controller)
    }

    pub fn current_state(&self) -> WorkflowState {
        self.state
    }

    pub fn tree(&self) -> &FormTree {
        &self.tree
    }

    /// Mutable access for presentation events (input, focus out, ...).
    pub fn tree_mut(&mut self) -> &mut FormTree {
        &mut self.tree
    }

    pub fn context(&self) -> Option<&ProposalContext> {
        self.context.as_ref()
    }

    pub fn names(&self) -> &ProposalFieldNames {
        &self.names
    }

    /// Whether any value changed since the form was opened.
    pub fn has_changes(&self) -> bool {
        self.changed.get()
    }

    pub fn submit_label_key(&self) -> &'static str {
        submit_label(self.state)
    }

    /// Submit label, re-translated whenever the language changes.
    pub fn submit_label(&self, translator: &dyn TranslationService) -> BoxStream<'static, String> {
        translator.watch(self.submit_label_key())
    }

    fn install_tracker(&mut self) {
        let changed = Rc::clone(&self.changed);
        let names = self.names.clone();
        let sub = self.tree.watch_form(move |_, field, _| {
            if !names.is_workflow_field(field) {
                changed.set(true);
            }
        });
        self.subscriptions.add(sub);
    }

    /// The reject button follows the accept/reject note: enabled only while
    /// the note has text.
    fn install_reject_guard(&mut self) {
        let reject = self.names.reject.clone();
        let watched = self.tree.watch(&self.names.note_accept_reject, move |tree, value| {
            let blank = value.as_text().is_none_or(|s| s.trim().is_empty());
            if let Err(e) = tree.set_disabled(&reject, blank) {
                tracing::warn!(error = %e, "reject button missing");
            }
        });
        match watched {
            Ok(sub) => self.subscriptions.add(sub),
            Err(e) => tracing::warn!(error = %e, "accept/reject note missing"),
        }
    }

    fn transition(&mut self, next: WorkflowState) {
        tracing::info!(
            form = %self.tree.id().as_uuid(),
            from = %self.state,
            to = %next,
            "workflow state changed"
        );
        self.state = next;
        layout(&mut self.tree, &self.names, next);
    }

    /// Entity sent to the service: the base record with the tree written
    /// over it, carrying only the note that belongs to the current state.
    fn payload(&self) -> Record {
        let mut record = match (&self.context, self.state) {
            (Some(ctx), WorkflowState::ChangeRequestReview) => ctx.proposed().clone(),
            _ => self.original.clone(),
        };
        self.tree.transfer_tree_to_object(&mut record, true);
        let carried = match self.state {
            WorkflowState::DirectEdit => None,
            WorkflowState::ChangeRequestSubmit => Some(self.names.note_request.as_str()),
            WorkflowState::ChangeRequestReview => Some(self.names.note_accept_reject.as_str()),
        };
        for field in [&self.names.note_request, &self.names.note_accept_reject] {
            if carried != Some(field.as_str()) {
                record.remove(field);
            }
        }
        record
    }

    /// Validate and persist the form.
    ///
    /// A direct edit without changes finishes as [`Outcome::NoChange`]
    /// without calling the service. An exceeded change limit switches the
    /// form to change-request submission; any other failure is shown and
    /// submission is enabled again.
    pub async fn save(
        &mut self,
        service: &dyn EntityService,
        notifications: &dyn NotificationSink,
    ) -> SaveResult {
        if let Err(e) = self.tree.begin_submit() {
            return SaveResult::Blocked(e);
        }
        if self.state == WorkflowState::DirectEdit && !self.is_new && !self.has_changes() {
            self.finished = Some(Closed {
                outcome: Outcome::NoChange,
                payload: None,
            });
            return SaveResult::Done(Outcome::NoChange);
        }

        let payload = self.payload();
        match service.update(payload).await {
            Ok(saved) => {
                let outcome = if self.is_new {
                    Outcome::Created
                } else {
                    Outcome::Updated
                };
                notifications.show(NotificationLevel::Success, SAVED_KEY, &[]);
                tracing::info!(
                    form = %self.tree.id().as_uuid(),
                    state = %self.state,
                    outcome = ?outcome,
                    "entity saved"
                );
                self.finished = Some(Closed {
                    outcome,
                    payload: Some(saved),
                });
                SaveResult::Done(outcome)
            }
            Err(e) if e.is_recoverable() => {
                self.tree.release_submit();
                self.transition(WorkflowState::ChangeRequestSubmit);
                let entity = match &e {
                    ServiceError::ChangeLimitExceeded { entity } => entity.clone(),
                    _ => String::new(),
                };
                notifications.show(NotificationLevel::Info, CHANGE_LIMIT_KEY, &[entity]);
                SaveResult::Redirected
            }
            Err(e) => {
                self.tree.release_submit();
                tracing::warn!(form = %self.tree.id().as_uuid(), error = %e, "save failed");
                notifications.show(NotificationLevel::Error, SAVE_FAILED_KEY, &[e.to_string()]);
                SaveResult::Failed(e)
            }
        }
    }

    /// Reject the reviewed proposal with the accept/reject note.
    pub async fn reject(
        &mut self,
        service: &dyn EntityService,
        notifications: &dyn NotificationSink,
    ) -> Result<SaveResult, WorkflowError> {
        let Some(ctx) = &self.context else {
            return Err(WorkflowError::InvalidState {
                operation: "reject".to_string(),
                state: self.state.to_string(),
            });
        };
        let note_field = self.names.note_accept_reject.clone();
        let note = self
            .tree
            .value(&note_field)
            .map(Value::to_key_string)
            .unwrap_or_default();
        if note.trim().is_empty() {
            if let Err(e) = self.tree.mark_touched(&note_field) {
                tracing::warn!(field = %note_field, error = %e, "workflow field missing");
            }
            return Ok(SaveResult::Blocked(TreeError::SubmitBlocked {
                invalid: vec![note_field],
            }));
        }

        let proposal_id = ctx.task().id.clone();
        let reject = self.names.reject.clone();
        set_enabled(&mut self.tree, &reject, false);
        match service.reject_proposal(&proposal_id, &note).await {
            Ok(()) => {
                notifications.show(NotificationLevel::Success, REJECTED_KEY, &[]);
                tracing::info!(proposal = %proposal_id, "proposal rejected");
                self.finished = Some(Closed {
                    outcome: Outcome::Rejected,
                    payload: None,
                });
                Ok(SaveResult::Done(Outcome::Rejected))
            }
            Err(e) => {
                set_enabled(&mut self.tree, &reject, true);
                notifications.show(NotificationLevel::Error, SAVE_FAILED_KEY, &[e.to_string()]);
                Ok(SaveResult::Failed(e))
            }
        }
    }

    /// Close the dialog: detach every installed subscription and emit the
    /// terminal event. The tree is handed back for inspection or reuse.
    pub fn close(mut self) -> (Closed, FormTree) {
        let detached = self.subscriptions.dispose(&mut self.tree);
        let closed = self.finished.take().unwrap_or(Closed {
            outcome: Outcome::NoChange,
            payload: None,
        });
        tracing::info!(
            form = %self.tree.id().as_uuid(),
            state = %self.state,
            outcome = ?closed.outcome,
            detached,
            "proposal workflow closed"
        );
        (closed, self.tree)
    }
}

// ============================================================================
// LAYOUT
// ============================================================================

fn submit_label(state: WorkflowState) -> &'static str {
    match state {
        WorkflowState::ChangeRequestSubmit => SAVE_CHANGE_REQUEST_KEY,
        WorkflowState::DirectEdit | WorkflowState::ChangeRequestReview => SAVE_KEY,
    }
}

/// Visibility, enablement and validators of the workflow fields per state.
fn layout(tree: &mut FormTree, names: &ProposalFieldNames, state: WorkflowState) {
    let triggers = TriggerEvents::TOUCHED | TriggerEvents::FOCUS_OUT;
    let (request_visible, request_enabled, review_visible) = match state {
        WorkflowState::DirectEdit => (false, false, false),
        WorkflowState::ChangeRequestSubmit => (true, true, false),
        WorkflowState::ChangeRequestReview => (true, false, true),
    };
    let review_note_blank = tree
        .value(&names.note_accept_reject)
        .map(|v| v.as_text().is_none_or(|s| s.trim().is_empty()))
        .unwrap_or(true);

    let updates: [(&str, Box<dyn FnOnce(&mut formkit_core::FieldDescriptor)>); 4] = [
        (
            names.note_request.as_str(),
            Box::new(move |d| {
                d.invisible = !request_visible;
                d.disabled = !request_enabled;
                d.readonly = state == WorkflowState::ChangeRequestReview;
                d.set_required(state == WorkflowState::ChangeRequestSubmit, triggers);
            }),
        ),
        (
            names.note_accept_reject.as_str(),
            Box::new(move |d| {
                d.invisible = !review_visible;
                d.disabled = !review_visible;
            }),
        ),
        (
            names.reject.as_str(),
            Box::new(move |d| {
                d.invisible = !review_visible;
                d.disabled = !review_visible || review_note_blank;
            }),
        ),
        (
            names.submit.as_str(),
            Box::new(move |d| d.label_key = submit_label(state).to_string()),
        ),
    ];
    for (field, update) in updates {
        if let Err(e) = tree.update_descriptor(field, update) {
            tracing::warn!(field, error = %e, "workflow field missing");
        }
    }
}

fn set_enabled(tree: &mut FormTree, field: &str, enabled: bool) {
    if let Err(e) = tree.set_disabled(field, !enabled) {
        tracing::warn!(field, error = %e, "workflow field missing");
    }
}

fn set_field(tree: &mut FormTree, field: &str, value: Value) {
    if let Err(e) = tree.set_value(field, value) {
        tracing::warn!(field, error = %e, "workflow field missing");
    }
}

/// Previous-value annotations on every field the proposal changes. The old
/// value is coerced the way inbound transfer would show it, so dates read
/// as dates and selects show the translated option display. A select
/// key with no matching option falls back to the raw key.
async fn annotate(
    tree: &mut FormTree,
    ctx: &ProposalContext,
    translator: &dyn TranslationService,
) {
    tree.clear_annotations();
    let prefix = translator.lookup(PREVIOUS_VALUE_KEY).await;
    for field in ctx.changed_fields() {
        let Ok(descriptor) = tree.descriptor(&field) else {
            continue;
        };
        let is_select = descriptor.input_kind.is_select();
        let previous = ctx.previous_value(&field);
        let Ok(coerced) = tree.coerce_inbound(&field, &previous) else {
            continue;
        };
        let shown = if is_select {
            let displays = match coerced {
                Value::List(items) => items,
                Value::Empty if previous.is_truthy() => vec![previous.to_key_string()],
                Value::Empty => Vec::new(),
                other => vec![other.to_key_string()],
            };
            let mut translated = Vec::with_capacity(displays.len());
            for display in &displays {
                translated.push(translator.lookup(display).await);
            }
            translated.join(", ")
        } else {
            coerced.to_key_string()
        };
        let annotation = format!("{} {}", prefix, shown);
        if let Err(e) = tree.set_annotation(&field, Some(annotation)) {
            tracing::warn!(field = %field, error = %e, "annotation failed");
        }
    }
}
