//! Translation of server payloads into descriptors, including date-range
//! grouping and configuration-issue reporting.

use formkit_core::{
    ConfigIssue, DataType, FormItem, FormkitConfig, InputKind, Record, RecordingSink,
};
use formkit_dsl::{ConstraintDecl, FieldMetadata, Translator, DATE_RANGE_KEY};
use formkit_test_utils::init_test_tracing;
use formkit_validation::{DescriptorFactory, ValidationRegistry};
use proptest::prelude::*;
use std::collections::BTreeMap;
use std::sync::Arc;

fn run(
    fields: &[FieldMetadata],
    constraints: &BTreeMap<String, ConstraintDecl>,
) -> (Vec<FormItem>, Arc<RecordingSink>) {
    init_test_tracing();
    let sink = RecordingSink::new();
    let registry = ValidationRegistry::with_builtins().with_sink(sink.clone());
    let config = FormkitConfig::standard();
    let translator = Translator::new(DescriptorFactory::new(&registry, &config));
    let items = translator
        .translate(fields, constraints)
        .expect("translation succeeds");
    (items, sink)
}

fn date_range(start: &str, end: &str) -> BTreeMap<String, ConstraintDecl> {
    let mut map = BTreeMap::new();
    map.insert(DATE_RANGE_KEY.to_string(), ConstraintDecl::new(start, end));
    map
}

fn range_fields() -> Vec<FieldMetadata> {
    vec![
        FieldMetadata::new("name", DataType::String).required(),
        FieldMetadata::new("start", DataType::DateString),
        FieldMetadata::new("amount", DataType::Numeric),
        FieldMetadata::new("end", DataType::DateString),
    ]
}

#[test]
fn test_date_range_group_rejects_reversed_dates() {
    let (items, sink) = run(&range_fields(), &date_range("start", "end"));
    assert!(sink.issues().is_empty());
    assert_eq!(items.len(), 3);

    let group = items[1].as_group().expect("group at the start position");
    assert_eq!(group.fields.len(), 2);
    assert_eq!(group.fields[0].field, "start");
    assert_eq!(group.fields[1].field, "end");

    let reversed = Record::new()
        .with("start", "2024-01-01")
        .with("end", "2023-01-01");
    assert_eq!(group.failing(&reversed), Some(DATE_RANGE_KEY.to_string()));

    let ordered = Record::new()
        .with("start", "2023-01-01")
        .with("end", "2024-01-01");
    assert_eq!(group.failing(&ordered), None);

    let partial = Record::new().with("start", "2024-01-01");
    assert_eq!(group.failing(&partial), None);
}

#[test]
fn test_group_takes_start_position_when_end_comes_first() {
    let fields = vec![
        FieldMetadata::new("until", DataType::DateNumeric),
        FieldMetadata::new("note", DataType::String),
        FieldMetadata::new("from", DataType::DateNumeric),
    ];
    let (items, _) = run(&fields, &date_range("from", "until"));
    assert_eq!(items.len(), 2);
    assert_eq!(items[0].name(), "note");
    let group = items[1].as_group().expect("group");
    assert_eq!(group.fields[0].field, "from");
    assert_eq!(group.fields[1].field, "until");
}

#[test]
fn test_dangling_constraint_reported_and_skipped() {
    let (items, sink) = run(&range_fields(), &date_range("start", "finish"));
    assert_eq!(items.len(), 4);
    assert!(items.iter().all(|item| item.as_group().is_none()));
    assert_eq!(
        sink.issues(),
        vec![ConfigIssue::DanglingConstraint {
            constraint: DATE_RANGE_KEY.to_string(),
            field: "finish".to_string(),
        }]
    );
}

#[test]
fn test_unknown_constraint_kind_reported() {
    let mut constraints = BTreeMap::new();
    constraints.insert("numberRange".to_string(), ConstraintDecl::new("a", "b"));
    let (items, sink) = run(&range_fields(), &constraints);
    assert_eq!(items.len(), 4);
    assert_eq!(sink.issues()[0].tag(), "unknown_constraint_kind");
}

#[test]
fn test_translate_json_payload() {
    init_test_tracing();
    let registry = ValidationRegistry::with_builtins();
    let config = FormkitConfig::standard();
    let translator = Translator::new(DescriptorFactory::new(&registry, &config));
    let items = translator
        .translate_json(
            r#"{
                "fieldDescriptors": [
                    {"fieldName": "email", "dataType": "String", "required": true,
                     "max": 120, "dynamicFormPropertyHelps": ["EMAIL"]},
                    {"fieldName": "share", "dataType": "Numeric", "min": 0, "max": 100,
                     "dynamicFormPropertyHelps": ["PERCENTAGE"]},
                    {"fieldName": "active", "dataType": "Boolean"},
                    {"fieldName": "description", "dataType": "String", "max": 1000,
                     "description": "Free text", "descriptionHelp": "HELP_DESCRIPTION"}
                ]
            }"#,
        )
        .expect("payload translates");

    let email = items[0].as_field().expect("field");
    assert_eq!(email.data_type, DataType::Email);
    assert!(email.required_invariant_holds());
    assert_eq!(items[1].as_field().and_then(|f| f.suffix.as_deref()), Some("%"));
    assert_eq!(items[2].as_field().map(|f| f.input_kind), Some(InputKind::Checkbox));
    let text = items[3].as_field().expect("field");
    assert_eq!(text.input_kind, InputKind::Textarea);
    assert_eq!(text.label_key, "*Free text");
    assert_eq!(text.help_key.as_deref(), Some("HELP_DESCRIPTION"));
}

fn arb_data_type() -> impl Strategy<Value = DataType> {
    prop::sample::select(DataType::ALL.to_vec())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Without constraints the output is 1:1 with the input, in order, and
    /// every descriptor keeps the required invariant.
    #[test]
    fn prop_translation_is_one_to_one(
        specs in prop::collection::vec((arb_data_type(), any::<bool>()), 1..12)
    ) {
        let fields: Vec<FieldMetadata> = specs
            .iter()
            .enumerate()
            .map(|(i, (data_type, required))| {
                let meta = FieldMetadata::new(format!("field{}", i), *data_type);
                if *required { meta.required() } else { meta }
            })
            .collect();
        let (items, _) = run(&fields, &BTreeMap::new());
        prop_assert_eq!(items.len(), fields.len());
        for (item, meta) in items.iter().zip(&fields) {
            let d = item.as_field().expect("scalar descriptor");
            prop_assert_eq!(&d.field, &meta.field_name);
            prop_assert!(d.required_invariant_holds());
        }
    }
}
