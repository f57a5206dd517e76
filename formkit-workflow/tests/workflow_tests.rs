//! Proposal controller scenarios against mock collaborators.

use formkit_core::{Record, ServiceError, TreeError, Value, WorkflowError};
use formkit_test_utils::{
    fixtures, init_test_tracing, MockEntityService, MockTranslator, RecordingNotifications,
};
use formkit_workflow::{
    Closed, NotificationLevel, OpenOptions, Outcome, ProposalController, ProposalTask, Rights,
    SaveResult, WorkflowState, SAVE_CHANGE_REQUEST_KEY, SAVE_KEY,
};
use futures_util::StreamExt;

fn translator() -> MockTranslator {
    MockTranslator::new()
        .with_entry("PREVIOUS_VALUE", "Previous value:")
        .with_entry("CURRENCY_CHF", "Swiss franc")
}

async fn open(options: OpenOptions) -> ProposalController {
    init_test_tracing();
    ProposalController::open(fixtures::workflow_tree(), options, &translator())
        .await
        .unwrap()
}

fn editing() -> OpenOptions {
    OpenOptions::new()
        .with_entity(fixtures::stored_entity())
        .with_rights(Rights::editor())
}

fn proposal() -> ProposalTask {
    ProposalTask::new("p-1", "Security")
        .with_note("please raise units")
        .with_change("units", 12i64)
        .with_change("currency", "USD")
}

fn reviewing() -> OpenOptions {
    editing().with_proposal(proposal())
}

// ============================================================================
// OPENING
// ============================================================================

#[tokio::test]
async fn test_requester_gets_change_request_layout() {
    let controller = open(
        OpenOptions::new()
            .with_entity(fixtures::stored_entity())
            .with_rights(Rights::requester()),
    )
    .await;
    assert_eq!(controller.current_state(), WorkflowState::ChangeRequestSubmit);

    let tree = controller.tree();
    let note = tree.descriptor("noteRequest").unwrap();
    assert!(!note.invisible && !note.disabled && note.required);
    assert!(tree.descriptor("noteAcceptReject").unwrap().invisible);
    assert!(tree.descriptor("reject").unwrap().invisible);
    assert_eq!(tree.descriptor("submit").unwrap().label_key, SAVE_CHANGE_REQUEST_KEY);
    assert_eq!(tree.value("name").unwrap(), &Value::from("Acme"));

    let mut label = controller.submit_label(&translator());
    assert_eq!(label.next().await, Some(SAVE_CHANGE_REQUEST_KEY.to_string()));
}

#[tokio::test]
async fn test_editor_gets_direct_edit_layout() {
    let controller = open(editing()).await;
    assert_eq!(controller.current_state(), WorkflowState::DirectEdit);
    let tree = controller.tree();
    for field in ["noteRequest", "noteAcceptReject", "reject"] {
        let d = tree.descriptor(field).unwrap();
        assert!(d.invisible && d.disabled, "{field} hidden in direct edit");
    }
    assert_eq!(controller.submit_label_key(), SAVE_KEY);
    assert_eq!(tree.value("currency").unwrap(), &Value::from("CURRENCY_CHF"));
}

#[tokio::test]
async fn test_missing_workflow_field_rejected() {
    let err = ProposalController::open(fixtures::sample_tree(), editing(), &translator())
        .await
        .unwrap_err();
    assert_eq!(
        err,
        WorkflowError::MissingWorkflowField {
            field: "noteRequest".to_string()
        }
    );
}

#[tokio::test]
async fn test_review_requires_entity() {
    let options = OpenOptions::new()
        .with_rights(Rights::editor())
        .with_proposal(proposal());
    let err = ProposalController::open(fixtures::workflow_tree(), options, &translator())
        .await
        .unwrap_err();
    assert!(matches!(err, WorkflowError::InvalidState { .. }));
}

// ============================================================================
// DIRECT EDIT
// ============================================================================

#[tokio::test]
async fn test_unchanged_direct_edit_skips_service() {
    let mut controller = open(editing()).await;
    let service = MockEntityService::new();
    let notes = RecordingNotifications::new();

    controller.tree_mut().set_value("noteRequest", "ignored").unwrap();
    assert!(!controller.has_changes());
    assert_eq!(
        controller.save(&service, &notes).await,
        SaveResult::Done(Outcome::NoChange)
    );
    assert!(service.updates().is_empty());

    let (closed, _) = controller.close();
    assert_eq!(
        closed,
        Closed {
            outcome: Outcome::NoChange,
            payload: None
        }
    );
}

#[tokio::test]
async fn test_direct_edit_saves_changed_entity() {
    let mut controller = open(editing()).await;
    let service = MockEntityService::new();
    let notes = RecordingNotifications::new();

    controller.tree_mut().input("name", "Acme Corp").unwrap();
    assert!(controller.has_changes());
    assert_eq!(
        controller.save(&service, &notes).await,
        SaveResult::Done(Outcome::Updated)
    );

    let sent = service.updates();
    assert_eq!(sent.len(), 1);
    let payload = &sent[0];
    assert_eq!(payload.get("id"), Some(&Value::from("sec-1")));
    assert_eq!(payload.get("name"), Some(&Value::from("Acme Corp")));
    assert_eq!(payload.get("currency"), Some(&Value::from("CHF")));
    assert_eq!(payload.get("tags"), Some(&Value::from("A")));
    assert!(!payload.contains("noteRequest"));
    assert!(!payload.contains("noteAcceptReject"));
    assert!(!payload.contains("reject"));
    assert_eq!(notes.levels(), vec![NotificationLevel::Success]);

    let (closed, _) = controller.close();
    assert_eq!(closed.outcome, Outcome::Updated);
    assert_eq!(closed.payload.as_ref(), Some(payload));
}

#[tokio::test]
async fn test_numeric_select_key_saved_as_number() {
    let entity = fixtures::stored_entity().with("idCountry", 5i64);
    let mut controller = open(editing().with_entity(entity)).await;
    let service = MockEntityService::new();
    let notes = RecordingNotifications::new();

    controller.tree_mut().input("idCountry", "COUNTRY_US").unwrap();
    assert_eq!(
        controller.save(&service, &notes).await,
        SaveResult::Done(Outcome::Updated)
    );
    let payload = service.updates().pop().unwrap();
    assert_eq!(payload.get("idCountry"), Some(&Value::Number(7.0)));
}

#[tokio::test]
async fn test_new_entity_is_created() {
    let mut controller = open(OpenOptions::new().with_rights(Rights::editor())).await;
    let service = MockEntityService::new();
    let notes = RecordingNotifications::new();

    controller.tree_mut().input("name", "Fresh").unwrap();
    assert_eq!(
        controller.save(&service, &notes).await,
        SaveResult::Done(Outcome::Created)
    );
    let (closed, _) = controller.close();
    assert_eq!(closed.outcome, Outcome::Created);
    assert_eq!(
        closed.payload.and_then(|p| p.get("name").cloned()),
        Some(Value::from("Fresh"))
    );
}

#[tokio::test]
async fn test_invalid_form_blocks_save() {
    let mut controller = open(editing()).await;
    let service = MockEntityService::new();
    let notes = RecordingNotifications::new();

    controller.tree_mut().input("name", "").unwrap();
    assert_eq!(
        controller.save(&service, &notes).await,
        SaveResult::Blocked(TreeError::SubmitBlocked {
            invalid: vec!["name".to_string()]
        })
    );
    assert!(service.updates().is_empty());
    assert!(!controller.tree().displayed_errors("name").unwrap().is_empty());
}

#[tokio::test]
async fn test_transport_failure_reenables_submit() {
    let mut controller = open(editing()).await;
    let service = MockEntityService::new().with_response(Err(ServiceError::Transport {
        reason: "connection reset".to_string(),
    }));
    let notes = RecordingNotifications::new();

    controller.tree_mut().input("name", "Acme Corp").unwrap();
    let result = controller.save(&service, &notes).await;
    assert!(matches!(result, SaveResult::Failed(ServiceError::Transport { .. })));
    assert_eq!(controller.current_state(), WorkflowState::DirectEdit);
    assert!(!controller.tree().control("submit").unwrap().is_disabled());
    assert_eq!(notes.levels(), vec![NotificationLevel::Error]);

    assert_eq!(
        controller.save(&service, &notes).await,
        SaveResult::Done(Outcome::Updated)
    );
}

// ============================================================================
// CHANGE LIMIT
// ============================================================================

#[tokio::test]
async fn test_change_limit_redirects_to_change_request() {
    let mut controller = open(editing()).await;
    let service = MockEntityService::new().with_response(Err(ServiceError::ChangeLimitExceeded {
        entity: "Security".to_string(),
    }));
    let notes = RecordingNotifications::new();

    controller.tree_mut().input("name", "Acme Corp").unwrap();
    assert_eq!(controller.save(&service, &notes).await, SaveResult::Redirected);
    assert_eq!(controller.current_state(), WorkflowState::ChangeRequestSubmit);
    assert_eq!(controller.submit_label_key(), SAVE_CHANGE_REQUEST_KEY);
    assert_eq!(
        notes.shown().first().map(|(level, _, params)| (*level, params.clone())),
        Some((NotificationLevel::Info, vec!["Security".to_string()]))
    );

    let note = controller.tree().descriptor("noteRequest").unwrap();
    assert!(note.required && !note.invisible);
    assert!(!controller.tree().control("submit").unwrap().is_disabled());
    assert_eq!(controller.tree().value("name").unwrap(), &Value::from("Acme Corp"));

    assert!(matches!(
        controller.save(&service, &notes).await,
        SaveResult::Blocked(TreeError::SubmitBlocked { .. })
    ));

    controller
        .tree_mut()
        .input("noteRequest", "rename after merger")
        .unwrap();
    assert_eq!(
        controller.save(&service, &notes).await,
        SaveResult::Done(Outcome::Updated)
    );
    let last = service.updates().pop().unwrap();
    assert_eq!(last.get("noteRequest"), Some(&Value::from("rename after merger")));
    assert!(!last.contains("noteAcceptReject"));
}

// ============================================================================
// REVIEW
// ============================================================================

#[tokio::test]
async fn test_review_shows_proposal_with_previous_values() {
    let controller = open(reviewing()).await;
    assert_eq!(controller.current_state(), WorkflowState::ChangeRequestReview);

    let tree = controller.tree();
    assert_eq!(tree.value("units").unwrap(), &Value::Number(12.0));
    assert_eq!(tree.value("currency").unwrap(), &Value::from("CURRENCY_USD"));
    assert_eq!(
        tree.value("noteRequest").unwrap(),
        &Value::from("please raise units")
    );

    assert_eq!(
        tree.descriptor("units").unwrap().annotation.as_deref(),
        Some("Previous value: 10")
    );
    assert_eq!(
        tree.descriptor("currency").unwrap().annotation.as_deref(),
        Some("Previous value: Swiss franc")
    );
    assert_eq!(tree.descriptor("name").unwrap().annotation, None);

    let request = tree.descriptor("noteRequest").unwrap();
    assert!(!request.invisible && request.disabled);
    let verdict = tree.descriptor("noteAcceptReject").unwrap();
    assert!(!verdict.invisible && !verdict.disabled);
    assert!(tree.control("reject").unwrap().is_disabled());
}

#[tokio::test]
async fn test_review_annotates_dates_and_numeric_keys_readably() {
    let entity = fixtures::stored_entity()
        .with("validFrom", 1_704_067_200_000i64)
        .with("idCountry", 5i64);
    let task = ProposalTask::new("p-2", "Security")
        .with_change("validFrom", 1_706_745_600_000i64)
        .with_change("idCountry", 7i64);
    let controller = open(editing().with_entity(entity).with_proposal(task)).await;

    let tree = controller.tree();
    assert_eq!(
        tree.descriptor("validFrom").unwrap().annotation.as_deref(),
        Some("Previous value: 2024-01-01")
    );
    assert_eq!(
        tree.descriptor("idCountry").unwrap().annotation.as_deref(),
        Some("Previous value: COUNTRY_CH")
    );
    assert_eq!(tree.value("idCountry").unwrap(), &Value::from("COUNTRY_US"));
}

#[tokio::test]
async fn test_reject_follows_review_note() {
    let mut controller = open(reviewing()).await;
    controller
        .tree_mut()
        .input("noteAcceptReject", "numbers unverified")
        .unwrap();
    assert!(!controller.tree().control("reject").unwrap().is_disabled());

    controller.tree_mut().input("noteAcceptReject", "  ").unwrap();
    assert!(controller.tree().control("reject").unwrap().is_disabled());
    assert!(!controller.has_changes());
}

#[tokio::test]
async fn test_accepting_review_sends_proposed_entity() {
    let mut controller = open(reviewing()).await;
    let service = MockEntityService::new();
    let notes = RecordingNotifications::new();

    controller.tree_mut().input("noteAcceptReject", "ok").unwrap();
    assert_eq!(
        controller.save(&service, &notes).await,
        SaveResult::Done(Outcome::Updated)
    );
    let payload = service.updates().pop().unwrap();
    assert_eq!(payload.get("units"), Some(&Value::Number(12.0)));
    assert_eq!(payload.get("currency"), Some(&Value::from("USD")));
    assert_eq!(payload.get("noteAcceptReject"), Some(&Value::from("ok")));
    assert!(!payload.contains("noteRequest"));
}

#[tokio::test]
async fn test_reject_proposal() {
    let mut controller = open(reviewing()).await;
    let service = MockEntityService::new();
    let notes = RecordingNotifications::new();

    controller
        .tree_mut()
        .input("noteAcceptReject", "not plausible")
        .unwrap();
    assert_eq!(
        controller.reject(&service, &notes).await,
        Ok(SaveResult::Done(Outcome::Rejected))
    );
    assert_eq!(
        service.rejections(),
        vec![("p-1".to_string(), "not plausible".to_string())]
    );
    assert!(service.updates().is_empty());

    let (closed, _) = controller.close();
    assert_eq!(closed.outcome, Outcome::Rejected);
}

#[tokio::test]
async fn test_failed_reject_reenables_button() {
    let mut controller = open(reviewing()).await;
    let service = MockEntityService::new().with_reject_response(Err(ServiceError::Domain {
        code: "TASK_CLOSED".to_string(),
        message: "task already closed".to_string(),
    }));
    let notes = RecordingNotifications::new();

    controller.tree_mut().input("noteAcceptReject", "no").unwrap();
    let result = controller.reject(&service, &notes).await.unwrap();
    assert!(matches!(result, SaveResult::Failed(ServiceError::Domain { .. })));
    assert!(!controller.tree().control("reject").unwrap().is_disabled());
    assert_eq!(notes.levels(), vec![NotificationLevel::Error]);
}

#[tokio::test]
async fn test_reject_outside_review_is_invalid() {
    let mut controller = open(editing()).await;
    let service = MockEntityService::new();
    let notes = RecordingNotifications::new();
    assert!(matches!(
        controller.reject(&service, &notes).await,
        Err(WorkflowError::InvalidState { .. })
    ));
}

// ============================================================================
// CLOSING
// ============================================================================

#[tokio::test]
async fn test_close_detaches_every_subscription() {
    let controller = open(reviewing()).await;
    assert_eq!(controller.tree().subscription_count(), 2);

    let (closed, mut tree) = controller.close();
    assert_eq!(closed.outcome, Outcome::NoChange);
    assert_eq!(tree.subscription_count(), 0);

    tree.input("noteAcceptReject", "late").unwrap();
    assert!(tree.control("reject").unwrap().is_disabled());
}

#[tokio::test]
async fn test_proposed_record_not_written_into_original() {
    let controller = open(reviewing()).await;
    let ctx = controller.context().unwrap();
    assert_eq!(ctx.original(), &fixtures::stored_entity());
    assert_eq!(ctx.proposed().get("units"), Some(&Value::Number(12.0)));
    let expected: Record = fixtures::stored_entity();
    assert_eq!(ctx.original().get("units"), expected.get("units"));
}
