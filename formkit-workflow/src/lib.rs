//! formkit Workflow - Change-Proposal Controller
//!
//! Overlays an approval workflow on a materialized form tree. Depending on
//! the principal's rights and whether a proposal is pending, the form is
//! shown for direct editing, for submitting a change request, or for
//! reviewing someone else's request.
//!
//! ```text
//!                  can edit? ── no ──→ ChangeRequestSubmit
//!                     │ yes                   ↑ change limit exceeded
//! pending proposal? ──┼── no ──→ DirectEdit ──┘
//!                     │ yes
//!                     ↓
//!            ChangeRequestReview
//! ```
//!
//! Entity persistence, translation and notifications are collaborators
//! behind the traits in [`services`].

pub mod controller;
pub mod fields;
pub mod proposal;
pub mod services;

pub use controller::{
    Closed, OpenOptions, Outcome, ProposalController, Rights, SaveResult, WorkflowState,
    PREVIOUS_VALUE_KEY, SAVE_CHANGE_REQUEST_KEY, SAVE_KEY,
};
pub use fields::{append_proposal_fields, ProposalFieldNames};
pub use proposal::{ProposalContext, ProposalTask, ProposedChange};
pub use services::{EntityService, NotificationLevel, NotificationSink, TranslationService};
