//! Server-descriptor translator
//!
//! Dispatch is one exhaustive match over [`DataType`]; hints refine the
//! choice for strings, numbers and dates. Constraint declarations fold two
//! scalar descriptors into one [`FieldGroupDescriptor`] placed where the
//! start field was.

use chrono::{DateTime, Local, NaiveDate};
use formkit_core::{
    derive_label_key, to_label, ConfigIssue, DataType, ErrorRule, FieldDescriptor,
    FieldGroupDescriptor, FormItem, GroupPredicate, Predicate, Record, SelectOption, SharedSink,
    TranslateError, TriggerEvents, Value, DATE_FORMAT,
};
use formkit_validation::{DescriptorFactory, FieldHints, NumberRange, ValidationKind};
use std::collections::{BTreeMap, HashSet};

use crate::wire::{
    ConstraintDecl, ConstraintKind, FieldMetadata, FormDescriptorEnvelope, PropertyHint,
};

/// Name of the date-range group predicate and its error rule.
pub const DATE_RANGE_KEY: &str = "dateRange";

/// Fraction digits assumed for `Numeric` fields.
const NUMERIC_PRECISION: u32 = 2;

/// Length used for text-like fields the server sends without a maximum.
const DEFAULT_TEXT_LENGTH: usize = 255;

/// Translates server metadata through a descriptor factory.
pub struct Translator<'a> {
    factory: DescriptorFactory<'a>,
    sink: SharedSink,
}

impl<'a> Translator<'a> {
    /// Translator reporting to the registry's diagnostic sink.
    pub fn new(factory: DescriptorFactory<'a>) -> Self {
        let sink = factory.registry().sink().clone();
        Self { factory, sink }
    }

    pub fn with_sink(mut self, sink: SharedSink) -> Self {
        self.sink = sink;
        self
    }

    /// Parse and translate a JSON payload.
    pub fn translate_json(&self, json: &str) -> Result<Vec<FormItem>, TranslateError> {
        let envelope = FormDescriptorEnvelope::from_json_str(json)?;
        self.translate_envelope(&envelope)
    }

    pub fn translate_envelope(
        &self,
        envelope: &FormDescriptorEnvelope,
    ) -> Result<Vec<FormItem>, TranslateError> {
        self.translate(&envelope.field_descriptors, &envelope.constraints)
    }

    /// Translate an ordered metadata list. Output is 1:1 with the input
    /// except for fields consumed by a constraint group.
    pub fn translate(
        &self,
        fields: &[FieldMetadata],
        constraints: &BTreeMap<String, ConstraintDecl>,
    ) -> Result<Vec<FormItem>, TranslateError> {
        let mut seen = HashSet::new();
        let mut items: Vec<FormItem> = Vec::with_capacity(fields.len());
        for meta in fields {
            if !seen.insert(meta.field_name.as_str()) {
                return Err(TranslateError::DuplicateField {
                    field: meta.field_name.clone(),
                });
            }
            items.push(FormItem::Field(self.translate_field(meta)));
        }

        for (kind, decl) in constraints {
            match kind.parse::<ConstraintKind>() {
                Ok(ConstraintKind::DateRange) => self.fold_date_range(&mut items, kind, decl),
                Err(_) => self
                    .sink
                    .report(ConfigIssue::UnknownConstraintKind { kind: kind.clone() }),
            }
        }

        tracing::debug!(
            fields = fields.len(),
            items = items.len(),
            constraints = constraints.len(),
            "translated server descriptors"
        );
        Ok(items)
    }

    /// Translate one metadata record.
    pub fn translate_field(&self, meta: &FieldMetadata) -> FieldDescriptor {
        let (known, unknown) = meta.hints();
        for hint in unknown {
            self.sink.report(ConfigIssue::UnknownPropertyHint {
                field: meta.field_name.clone(),
                hint: hint.to_string(),
            });
        }
        let has = |hint: PropertyHint| known.contains(&hint);
        let name = meta.field_name.as_str();
        let required = meta.required;
        let hints = self.hints_for(meta);
        let f = &self.factory;

        let descriptor = match meta.data_type {
            DataType::Boolean => {
                // A checkbox always holds true or false.
                if required {
                    tracing::debug!(field = %name, "required flag ignored on checkbox");
                }
                f.checkbox(name, hints)
            }
            DataType::String => {
                let max_length = length_of(meta.max);
                let mut d = if has(PropertyHint::Email) {
                    f.email(name, max_length.unwrap_or(DEFAULT_TEXT_LENGTH), required, hints)
                } else if has(PropertyHint::Password) {
                    f.password(name, max_length.unwrap_or(DEFAULT_TEXT_LENGTH), required, hints)
                } else if has(PropertyHint::SelectOptions) {
                    f.select(name, required, options_of(meta), hints)
                } else if has(PropertyHint::Textarea)
                    || max_length.is_some_and(|len| len > f.config().textarea_threshold)
                {
                    f.textarea(name, max_length.unwrap_or(DEFAULT_TEXT_LENGTH), required, hints)
                } else {
                    f.assign_base(
                        name,
                        DataType::String,
                        formkit_core::InputKind::Text,
                        required,
                        max_length,
                        hints,
                    )
                };
                if let Some(min) = length_of(meta.min).filter(|&m| m > 0) {
                    d.add_validation(
                        Predicate::new("minLength", move |v| {
                            v.as_text().is_none_or(|s| s.is_empty() || s.chars().count() >= min)
                        }),
                        ErrorRule::new("minLength", "MIN_LENGTH", TriggerEvents::FOCUS_OUT)
                            .with_params(vec![min.to_string()]),
                    );
                }
                d
            }
            DataType::Numeric | DataType::NumericInteger => {
                let precision = if meta.data_type == DataType::Numeric {
                    NUMERIC_PRECISION
                } else {
                    0
                };
                let allow_negative = meta.min.is_some_and(|m| m < 0.0);
                let hints = if has(PropertyHint::Percentage) {
                    hints.with_suffix("%")
                } else {
                    hints
                };
                f.min_max_number(
                    name,
                    required,
                    NumberRange::new(meta.min, meta.max, precision, allow_negative),
                    hints,
                )
            }
            DataType::Email => f.email(name, text_length(meta), required, hints),
            DataType::Password => f.password(name, text_length(meta), required, hints),
            DataType::UrlString => f.url(name, text_length(meta), required, hints),
            DataType::EnumSet => f.multi_select(name, required, options_of(meta), hints),
            DataType::DateString | DataType::DateNumeric | DataType::DateTimeNumeric => {
                let future = has(PropertyHint::DateFuture);
                let hints = if future {
                    hints.with_min_date(Local::now().date_naive())
                } else {
                    hints
                };
                let mut d = match meta.data_type {
                    DataType::DateString => f.date_string(name, required, hints),
                    DataType::DateTimeNumeric => f.date_time(name, required, hints),
                    _ => f.date(name, required, hints),
                };
                if future {
                    f.apply(&mut d, &ValidationKind::DATE_NOT_PAST, &[]);
                }
                d
            }
            DataType::File => f.file_upload(name, None, false, required, hints),
            DataType::Files => f.file_upload(name, None, true, required, hints),
            DataType::None => f.assign_base(
                name,
                DataType::None,
                formkit_core::InputKind::Text,
                required,
                None,
                hints,
            ),
        };
        tracing::trace!(
            field = %descriptor.field,
            data_type = %meta.data_type,
            input_kind = %descriptor.input_kind,
            "translated field"
        );
        descriptor
    }

    fn hints_for(&self, meta: &FieldMetadata) -> FieldHints {
        let sentinel = self.factory.config().literal_sentinel;
        let label = match &meta.description {
            Some(text) => to_label(text, sentinel),
            None => derive_label_key(&meta.field_name, self.factory.config()),
        };
        let mut hints = FieldHints::new().with_label_key(label);
        if let Some(help) = &meta.description_help {
            hints = hints.with_help_key(to_label(help, sentinel));
        }
        hints
    }

    /// Replace the start and end descriptors with one group at the start's
    /// position. A missing field is reported and the constraint skipped.
    fn fold_date_range(&self, items: &mut Vec<FormItem>, kind: &str, decl: &ConstraintDecl) {
        let position = |name: &str| {
            items
                .iter()
                .position(|item| matches!(item, FormItem::Field(f) if f.field == name))
        };
        let (start_at, end_at) = match (position(&decl.start_field), position(&decl.end_field)) {
            (Some(s), Some(e)) if s != e => (s, e),
            (start, _) => {
                let missing = if start.is_none() {
                    &decl.start_field
                } else {
                    &decl.end_field
                };
                self.sink.report(ConfigIssue::DanglingConstraint {
                    constraint: kind.to_string(),
                    field: missing.clone(),
                });
                return;
            }
        };

        let FormItem::Field(end) = items.remove(end_at) else {
            return;
        };
        let start_at = if start_at > end_at { start_at - 1 } else { start_at };
        let FormItem::Field(start) = items.remove(start_at) else {
            return;
        };

        let start_name = start.field.clone();
        let end_name = end.field.clone();
        let group = FieldGroupDescriptor::new(kind, vec![start, end]).with_validator(
            GroupPredicate::new(DATE_RANGE_KEY, move |values: &Record| {
                let start = values.get(&start_name).and_then(date_of);
                let end = values.get(&end_name).and_then(date_of);
                match (start, end) {
                    (Some(s), Some(e)) => s <= e,
                    _ => true,
                }
            }),
            ErrorRule::new(
                DATE_RANGE_KEY,
                "DATE_RANGE",
                TriggerEvents::TOUCHED | TriggerEvents::DIRTY,
            ),
        );
        items.insert(start_at, FormItem::Group(group));
    }
}

/// Calendar date behind a control value: a date, an ISO date string or
/// epoch milliseconds.
pub fn date_of(value: &Value) -> Option<NaiveDate> {
    match value {
        Value::Date(_) | Value::DateTime(_) => value.as_date(),
        Value::Text(s) => {
            NaiveDate::parse_from_str(s.get(..10).unwrap_or(s.as_str()), DATE_FORMAT).ok()
        }
        Value::Number(ms) => DateTime::from_timestamp_millis(*ms as i64).map(|dt| dt.date_naive()),
        _ => None,
    }
}

fn length_of(bound: Option<f64>) -> Option<usize> {
    bound.filter(|b| *b >= 0.0).map(|b| b as usize)
}

fn text_length(meta: &FieldMetadata) -> usize {
    length_of(meta.max).unwrap_or(DEFAULT_TEXT_LENGTH)
}

/// Options from the enum values, displayed as `EnumType.Value` keys.
fn options_of(meta: &FieldMetadata) -> Vec<SelectOption> {
    let values = meta.enum_values.as_deref().unwrap_or_default();
    values
        .iter()
        .map(|value| {
            let display = match &meta.enum_type {
                Some(enum_type) => format!("{}.{}", enum_type, value),
                None => value.clone(),
            };
            SelectOption::new(value.clone(), display)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use formkit_core::{FormkitConfig, InputKind, RecordingSink};
    use formkit_validation::ValidationRegistry;

    fn translate_with(
        fields: &[FieldMetadata],
        constraints: &BTreeMap<String, ConstraintDecl>,
    ) -> (Result<Vec<FormItem>, TranslateError>, Vec<ConfigIssue>) {
        let sink = RecordingSink::new();
        let registry = ValidationRegistry::with_builtins().with_sink(sink.clone());
        let config = FormkitConfig::standard();
        let translator = Translator::new(DescriptorFactory::new(&registry, &config));
        let result = translator.translate(fields, constraints);
        (result, sink.take())
    }

    fn single(meta: FieldMetadata) -> FieldDescriptor {
        let (items, _) = translate_with(&[meta], &BTreeMap::new());
        match items.unwrap().remove(0) {
            FormItem::Field(f) => f,
            FormItem::Group(g) => panic!("unexpected group {}", g.name),
        }
    }

    #[test]
    fn test_boolean_is_checkbox() {
        let d = single(FieldMetadata::new("active", DataType::Boolean));
        assert_eq!(d.input_kind, InputKind::Checkbox);
    }

    #[test]
    fn test_required_checkbox_stays_optional() {
        let d = single(FieldMetadata::new("active", DataType::Boolean).required());
        assert!(!d.required);
        assert!(d.failing(&d.default_value).is_empty());
        assert_eq!(d.default_value, Value::Bool(false));
    }

    #[test]
    fn test_long_string_becomes_textarea() {
        let d = single(FieldMetadata::new("note", DataType::String).with_range(None, Some(500.0)));
        assert_eq!(d.input_kind, InputKind::Textarea);
        let d = single(FieldMetadata::new("code", DataType::String).with_range(None, Some(80.0)));
        assert_eq!(d.input_kind, InputKind::Text);
        assert_eq!(d.max_length, Some(80));
    }

    #[test]
    fn test_string_hints_pick_input() {
        let d = single(
            FieldMetadata::new("mail", DataType::String).with_hint(PropertyHint::Email),
        );
        assert_eq!(d.data_type, DataType::Email);
        assert!(!d.failing(&Value::from("nope")).is_empty());

        let d = single(
            FieldMetadata::new("secret", DataType::String).with_hint(PropertyHint::Password),
        );
        assert_eq!(d.data_type, DataType::Password);

        let d = single(
            FieldMetadata::new("kind", DataType::String)
                .with_enum("AssetKind", vec!["BOND".into(), "EQUITY".into()])
                .with_hint(PropertyHint::SelectOptions),
        );
        assert_eq!(d.input_kind, InputKind::Select);
        assert_eq!(d.option_display("BOND"), Some("AssetKind.BOND"));
    }

    #[test]
    fn test_percentage_suffix() {
        let d = single(
            FieldMetadata::new("rate", DataType::Numeric)
                .with_range(Some(0.0), Some(100.0))
                .with_hint(PropertyHint::Percentage),
        );
        assert_eq!(d.suffix.as_deref(), Some("%"));
        assert_eq!(d.min, Some(0.0));
        assert_eq!(d.max, Some(100.0));
    }

    #[test]
    fn test_enum_set_options() {
        let d = single(
            FieldMetadata::new("days", DataType::EnumSet)
                .with_enum("Weekday", vec!["MON".into(), "TUE".into()]),
        );
        assert_eq!(d.input_kind, InputKind::MultiSelect);
        assert_eq!(d.option_display("TUE"), Some("Weekday.TUE"));
    }

    #[test]
    fn test_future_date_hint() {
        let d = single(
            FieldMetadata::new("expires", DataType::DateString).with_hint(PropertyHint::DateFuture),
        );
        assert_eq!(d.input_kind, InputKind::Calendar);
        assert_eq!(d.min_date, Some(Local::now().date_naive()));
        let yesterday = Local::now().date_naive() - chrono::Duration::days(1);
        assert!(!d.failing(&Value::Date(yesterday)).is_empty());
    }

    #[test]
    fn test_literal_labels_get_sentinel() {
        let d = single(FieldMetadata::new("name", DataType::String).with_description("Full name"));
        assert_eq!(d.label_key, "*Full name");
        let d = single(FieldMetadata::new("name", DataType::String).with_description("FULL_NAME"));
        assert_eq!(d.label_key, "FULL_NAME");
        let d = single(FieldMetadata::new("tickerSymbol", DataType::String));
        assert_eq!(d.label_key, "TICKER_SYMBOL");
    }

    #[test]
    fn test_duplicate_field_rejected() {
        let fields = [
            FieldMetadata::new("a", DataType::String),
            FieldMetadata::new("a", DataType::Numeric),
        ];
        let (result, _) = translate_with(&fields, &BTreeMap::new());
        assert_eq!(
            result.unwrap_err(),
            TranslateError::DuplicateField {
                field: "a".to_string()
            }
        );
    }

    #[test]
    fn test_unknown_hint_reported() {
        let mut meta = FieldMetadata::new("x", DataType::String);
        meta.dynamic_form_property_helps.push("GLITTER".into());
        let (_, issues) = translate_with(&[meta], &BTreeMap::new());
        assert_eq!(issues[0].tag(), "unknown_property_hint");
    }

    #[test]
    fn test_date_of_sources() {
        let d = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        assert_eq!(date_of(&Value::from("2024-01-01")), Some(d));
        assert_eq!(date_of(&Value::Number(1_704_067_200_000.0)), Some(d));
        assert_eq!(date_of(&Value::Empty), None);
    }
}
