//! formkit Test Utilities
//!
//! Shared test infrastructure for the formkit workspace:
//! - Tracing setup for test binaries
//! - Fixtures for a representative business form
//! - Proptest generators for values and records
//! - Mock collaborators for the workflow controller

pub use formkit_core::{
    FieldDescriptor, FormItem, FormkitConfig, Record, SelectOption, ServiceError, Value,
};
pub use formkit_runtime::FormTree;
pub use formkit_workflow::{
    EntityService, NotificationLevel, NotificationSink, ProposalFieldNames, TranslationService,
};

use async_trait::async_trait;
use futures_util::stream::{self, BoxStream, StreamExt};
use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, Once};

static TRACING: Once = Once::new();

/// Install a test-writer fmt subscriber once per test binary. Honors
/// `RUST_LOG`, defaulting to `warn`.
pub fn init_test_tracing() {
    TRACING.call_once(|| {
        let filter = tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .try_init();
    });
}

// ============================================================================
// PROPTEST GENERATORS
// ============================================================================

pub mod generators {
    use super::*;
    use chrono::NaiveDate;
    use proptest::prelude::*;

    /// Any scalar value a business object may carry.
    pub fn arb_value() -> impl Strategy<Value = Value> {
        prop_oneof![
            Just(Value::Empty),
            "[a-zA-Z0-9 ]{0,20}".prop_map(Value::Text),
            (-10_000i64..10_000).prop_map(Value::from),
            any::<bool>().prop_map(Value::Bool),
            arb_date().prop_map(Value::Date),
            prop::collection::vec("[A-Z]{1,3}", 0..4).prop_map(Value::List),
        ]
    }

    /// Date between 2000-01-01 and roughly 2050.
    pub fn arb_date() -> impl Strategy<Value = NaiveDate> {
        (0i64..18_000).prop_map(|days| {
            NaiveDate::from_ymd_opt(2000, 1, 1)
                .and_then(|d| d.checked_add_signed(chrono::Duration::days(days)))
                .unwrap_or_default()
        })
    }

    /// Record over arbitrary keys and values.
    pub fn arb_record() -> impl Strategy<Value = Record> {
        prop::collection::btree_map("[a-z]{1,8}", arb_value(), 0..8)
            .prop_map(|entries| entries.into_iter().collect())
    }

    /// Record that fits [`fixtures::sample_items`]: every field set to a
    /// value the form accepts and can hand back unchanged.
    pub fn arb_sample_record() -> impl Strategy<Value = Record> {
        (
            "[A-Za-z]{1,40}",
            1i64..100_000,
            prop_oneof![Just("CHF"), Just("USD"), Just("")],
            prop_oneof![Just(5i64), Just(7i64)],
            any::<bool>(),
            arb_date(),
            prop::sample::subsequence(vec!["A", "B", "C"], 1..=3),
        )
            .prop_map(|(name, units, currency, country, active, valid_from, tags)| {
                Record::new()
                    .with("name", name)
                    .with("units", units)
                    .with("currency", currency)
                    .with("idCountry", country)
                    .with("active", active)
                    .with("validFrom", valid_from)
                    .with("tags", tags.join(","))
            })
    }
}

// ============================================================================
// TEST FIXTURES
// ============================================================================

pub mod fixtures {
    use super::*;
    use formkit_core::DataType;
    use formkit_validation::{DescriptorFactory, FieldHints};

    pub fn currency_options() -> Vec<SelectOption> {
        vec![
            SelectOption::new("", ""),
            SelectOption::new("CHF", "CURRENCY_CHF"),
            SelectOption::new("USD", "CURRENCY_USD"),
        ]
    }

    /// Options keyed by numeric ids.
    pub fn country_options() -> Vec<SelectOption> {
        vec![
            SelectOption::new("5", "COUNTRY_CH"),
            SelectOption::new("7", "COUNTRY_US"),
        ]
    }

    pub fn tag_options() -> Vec<SelectOption> {
        vec![
            SelectOption::new("A", "TAG_A"),
            SelectOption::new("B", "TAG_B"),
            SelectOption::new("C", "TAG_C"),
        ]
    }

    /// A small business form: required name, units, currency select,
    /// country select over numeric ids, active flag, valid-from date, tag
    /// multi-select and submit.
    pub fn sample_items(config: &FormkitConfig) -> Vec<FormItem> {
        let factory = DescriptorFactory::global(config);
        vec![
            factory.text("name", 40, true, FieldHints::new()).into(),
            factory.number("units", false, FieldHints::new()).into(),
            factory
                .select("currency", false, currency_options(), FieldHints::new())
                .into(),
            factory
                .select(
                    "idCountry",
                    false,
                    country_options(),
                    FieldHints::new().with_data_type(DataType::NumericInteger),
                )
                .into(),
            factory.checkbox("active", FieldHints::new()).into(),
            factory.date("validFrom", false, FieldHints::new()).into(),
            factory
                .multi_select("tags", false, tag_options(), FieldHints::new())
                .into(),
            factory.submit_button("SAVE").into(),
        ]
    }

    /// The sample form with the proposal workflow fields appended.
    pub fn workflow_items(config: &FormkitConfig) -> Vec<FormItem> {
        let factory = DescriptorFactory::global(config);
        let mut items = sample_items(config);
        formkit_workflow::append_proposal_fields(
            &factory,
            &mut items,
            &ProposalFieldNames::default(),
        );
        items
    }

    pub fn sample_tree() -> FormTree {
        let config = FormkitConfig::standard();
        match FormTree::materialize(sample_items(&config), &config) {
            Ok(tree) => tree,
            Err(e) => panic!("sample form materializes: {e}"),
        }
    }

    pub fn workflow_tree() -> FormTree {
        let config = FormkitConfig::standard();
        match FormTree::materialize(workflow_items(&config), &config) {
            Ok(tree) => tree,
            Err(e) => panic!("workflow form materializes: {e}"),
        }
    }

    /// A stored entity matching the sample form.
    pub fn stored_entity() -> Record {
        Record::new()
            .with("id", "sec-1")
            .with("name", "Acme")
            .with("units", 10i64)
            .with("currency", "CHF")
            .with("active", true)
            .with("tags", "A")
    }
}

// ============================================================================
// MOCK COLLABORATORS
// ============================================================================

/// Entity service answering from a queue of scripted responses. With an
/// empty queue `update` echoes the entity back.
#[derive(Debug, Default)]
pub struct MockEntityService {
    responses: Mutex<VecDeque<Result<Record, ServiceError>>>,
    reject_responses: Mutex<VecDeque<Result<(), ServiceError>>>,
    updates: Mutex<Vec<Record>>,
    rejections: Mutex<Vec<(String, String)>>,
}

impl MockEntityService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_response(self, response: Result<Record, ServiceError>) -> Self {
        self.responses.lock().unwrap_or_else(|p| p.into_inner()).push_back(response);
        self
    }

    pub fn with_reject_response(self, response: Result<(), ServiceError>) -> Self {
        self.reject_responses
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .push_back(response);
        self
    }

    /// Entities passed to `update`, in call order.
    pub fn updates(&self) -> Vec<Record> {
        self.updates.lock().unwrap_or_else(|p| p.into_inner()).clone()
    }

    /// `(proposal id, note)` pairs passed to `reject_proposal`.
    pub fn rejections(&self) -> Vec<(String, String)> {
        self.rejections.lock().unwrap_or_else(|p| p.into_inner()).clone()
    }
}

#[async_trait]
impl EntityService for MockEntityService {
    async fn update(&self, entity: Record) -> Result<Record, ServiceError> {
        self.updates
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .push(entity.clone());
        self.responses
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .pop_front()
            .unwrap_or(Ok(entity))
    }

    async fn reject_proposal(&self, proposal_id: &str, note: &str) -> Result<(), ServiceError> {
        self.rejections
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .push((proposal_id.to_string(), note.to_string()));
        self.reject_responses
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .pop_front()
            .unwrap_or(Ok(()))
    }
}

/// Dictionary-backed translator; unknown keys come back unchanged.
#[derive(Debug, Clone, Default)]
pub struct MockTranslator {
    entries: HashMap<String, String>,
}

impl MockTranslator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entry(mut self, key: impl Into<String>, text: impl Into<String>) -> Self {
        self.entries.insert(key.into(), text.into());
        self
    }

    pub fn translate(&self, key: &str) -> String {
        self.entries
            .get(key)
            .cloned()
            .unwrap_or_else(|| key.to_string())
    }
}

#[async_trait]
impl TranslationService for MockTranslator {
    async fn lookup(&self, key: &str) -> String {
        self.translate(key)
    }

    fn watch(&self, key: &str) -> BoxStream<'static, String> {
        stream::iter(vec![self.translate(key)]).boxed()
    }
}

/// Notification sink that records what was shown.
#[derive(Debug, Default)]
pub struct RecordingNotifications {
    shown: Mutex<Vec<(NotificationLevel, String, Vec<String>)>>,
}

impl RecordingNotifications {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shown(&self) -> Vec<(NotificationLevel, String, Vec<String>)> {
        self.shown.lock().unwrap_or_else(|p| p.into_inner()).clone()
    }

    pub fn levels(&self) -> Vec<NotificationLevel> {
        self.shown().into_iter().map(|(level, _, _)| level).collect()
    }
}

impl NotificationSink for RecordingNotifications {
    fn show(&self, level: NotificationLevel, message_key: &str, params: &[String]) {
        self.shown
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .push((level, message_key.to_string(), params.to_vec()));
    }
}
