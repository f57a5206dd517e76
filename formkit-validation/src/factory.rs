//! Descriptor factory
//!
//! Builds fully populated field descriptors for concrete input kinds with
//! consistent defaults: derived label keys, auto-sized widths and
//! required-state-derived minimums. Every factory funnels through
//! [`DescriptorFactory::assign_base`], which attaches the required
//! predicate/rule pair before merging caller overrides. Overrides win.

use chrono::NaiveDate;
use formkit_core::{
    derive_label_key, DataType, ErrorRule, FieldDescriptor, FormkitConfig, InputKind, Predicate,
    SelectOption, TriggerEvents, Value,
};

use crate::registry::{Param, ValidationKind, ValidationRegistry};

/// Name of the submit button descriptor created by [`DescriptorFactory::submit_button`].
pub const SUBMIT_FIELD: &str = "submit";

/// Optional overrides applied after the factory defaults.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldHints {
    pub label_key: Option<String>,
    pub help_key: Option<String>,
    pub default_value: Option<Value>,
    pub input_width: Option<usize>,
    pub used_layout_columns: Option<u8>,
    pub disabled: Option<bool>,
    pub invisible: Option<bool>,
    pub readonly: Option<bool>,
    pub suffix: Option<String>,
    pub treat_zero_as_empty: Option<bool>,
    pub min_date: Option<NaiveDate>,
    /// Triggers for the auto-attached "required" rule
    pub required_triggers: Option<TriggerEvents>,
    /// Storage type of the bound value, e.g. numeric ids behind a select
    pub data_type: Option<DataType>,
}

impl FieldHints {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_label_key(mut self, key: impl Into<String>) -> Self {
        self.label_key = Some(key.into());
        self
    }

    pub fn with_help_key(mut self, key: impl Into<String>) -> Self {
        self.help_key = Some(key.into());
        self
    }

    pub fn with_default(mut self, value: impl Into<Value>) -> Self {
        self.default_value = Some(value.into());
        self
    }

    pub fn with_input_width(mut self, width: usize) -> Self {
        self.input_width = Some(width);
        self
    }

    pub fn with_layout_columns(mut self, columns: u8) -> Self {
        self.used_layout_columns = Some(columns);
        self
    }

    pub fn disabled(mut self) -> Self {
        self.disabled = Some(true);
        self
    }

    pub fn invisible(mut self) -> Self {
        self.invisible = Some(true);
        self
    }

    pub fn readonly(mut self) -> Self {
        self.readonly = Some(true);
        self
    }

    pub fn with_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.suffix = Some(suffix.into());
        self
    }

    pub fn zero_as_empty(mut self) -> Self {
        self.treat_zero_as_empty = Some(true);
        self
    }

    pub fn with_min_date(mut self, date: NaiveDate) -> Self {
        self.min_date = Some(date);
        self
    }

    pub fn with_required_triggers(mut self, triggers: TriggerEvents) -> Self {
        self.required_triggers = Some(triggers);
        self
    }

    pub fn with_data_type(mut self, data_type: DataType) -> Self {
        self.data_type = Some(data_type);
        self
    }
}

/// Range of a numeric input.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NumberRange {
    pub min: Option<f64>,
    pub max: Option<f64>,
    /// Fraction digits
    pub precision: u32,
    pub allow_negative: bool,
}

impl NumberRange {
    pub fn new(min: Option<f64>, max: Option<f64>, precision: u32, allow_negative: bool) -> Self {
        Self {
            min,
            max,
            precision,
            allow_negative,
        }
    }

    /// Range holding `integer_digits` digits before and `precision` after the
    /// decimal point.
    pub fn from_digits(integer_digits: u32, precision: u32, allow_negative: bool) -> Self {
        let max = 10f64.powi(integer_digits as i32) - 10f64.powi(-(precision as i32));
        let max = round_to(max, precision);
        Self {
            min: allow_negative.then_some(-max),
            max: Some(max),
            precision,
            allow_negative,
        }
    }

    /// Effective minimum. A required field without negatives and without an
    /// explicit minimum gets `1 / 10^precision`, which rejects zero.
    pub fn effective_min(&self, required: bool) -> Option<f64> {
        match self.min {
            Some(min) => Some(min),
            None if self.allow_negative => self.max.map(|max| -max),
            None if required => Some(round_to(
                10f64.powi(-(self.precision as i32)),
                self.precision,
            )),
            None => Some(0.0),
        }
    }

    /// Characters needed to type the largest value.
    fn max_length(&self) -> Option<usize> {
        let max = self.max?;
        let integer_digits = format!("{}", max.abs().trunc() as i64).len();
        let fraction = if self.precision > 0 {
            self.precision as usize + 1
        } else {
            0
        };
        let sign = usize::from(self.allow_negative);
        Some(integer_digits + fraction + sign)
    }
}

fn round_to(value: f64, precision: u32) -> f64 {
    let factor = 10f64.powi(precision as i32);
    (value * factor).round() / factor
}

/// Builds descriptors against a registry and configuration.
#[derive(Debug, Clone, Copy)]
pub struct DescriptorFactory<'a> {
    registry: &'a ValidationRegistry,
    config: &'a FormkitConfig,
}

impl<'a> DescriptorFactory<'a> {
    pub fn new(registry: &'a ValidationRegistry, config: &'a FormkitConfig) -> Self {
        Self { registry, config }
    }

    /// Factory over the process-wide registry.
    pub fn global(config: &'a FormkitConfig) -> Self {
        Self::new(ValidationRegistry::global(), config)
    }

    pub fn registry(&self) -> &'a ValidationRegistry {
        self.registry
    }

    pub fn config(&self) -> &'a FormkitConfig {
        self.config
    }

    /// Attach a registered validation kind to `descriptor`.
    pub fn apply(
        &self,
        descriptor: &mut FieldDescriptor,
        kind: &ValidationKind,
        params: &[Param],
    ) -> bool {
        self.registry.apply(descriptor, kind, params)
    }

    /// Shared base assignment for every factory.
    pub fn assign_base(
        &self,
        field: &str,
        data_type: DataType,
        input_kind: InputKind,
        required: bool,
        max_length: Option<usize>,
        hints: FieldHints,
    ) -> FieldDescriptor {
        let mut d = FieldDescriptor::new(field, data_type, input_kind);
        d.label_key = derive_label_key(field, self.config);
        d.max_length = max_length;
        if let Some(len) = max_length {
            if auto_sizes(input_kind) && len < self.config.auto_width_threshold {
                d.input_width = Some(len);
            }
        }
        let triggers = hints
            .required_triggers
            .unwrap_or(self.config.required_triggers);
        d.set_required(required, triggers);
        merge_hints(&mut d, hints);
        d
    }

    // ------------------------------------------------------------------------
    // Text-like inputs
    // ------------------------------------------------------------------------

    pub fn text(
        &self,
        field: &str,
        max_length: usize,
        required: bool,
        hints: FieldHints,
    ) -> FieldDescriptor {
        self.assign_base(
            field,
            DataType::String,
            InputKind::Text,
            required,
            Some(max_length),
            hints,
        )
    }

    pub fn textarea(
        &self,
        field: &str,
        max_length: usize,
        required: bool,
        hints: FieldHints,
    ) -> FieldDescriptor {
        self.assign_base(
            field,
            DataType::String,
            InputKind::Textarea,
            required,
            Some(max_length),
            hints,
        )
    }

    pub fn email(
        &self,
        field: &str,
        max_length: usize,
        required: bool,
        hints: FieldHints,
    ) -> FieldDescriptor {
        let mut d = self.assign_base(
            field,
            DataType::Email,
            InputKind::Text,
            required,
            Some(max_length),
            hints,
        );
        self.apply(&mut d, &ValidationKind::EMAIL, &[]);
        d
    }

    pub fn url(
        &self,
        field: &str,
        max_length: usize,
        required: bool,
        hints: FieldHints,
    ) -> FieldDescriptor {
        let mut d = self.assign_base(
            field,
            DataType::UrlString,
            InputKind::Text,
            required,
            Some(max_length),
            hints,
        );
        self.apply(&mut d, &ValidationKind::WEB_URL, &[]);
        d
    }

    pub fn password(
        &self,
        field: &str,
        max_length: usize,
        required: bool,
        hints: FieldHints,
    ) -> FieldDescriptor {
        self.assign_base(
            field,
            DataType::Password,
            InputKind::Text,
            required,
            Some(max_length),
            hints,
        )
    }

    pub fn suggestion(
        &self,
        field: &str,
        max_length: usize,
        required: bool,
        hints: FieldHints,
    ) -> FieldDescriptor {
        self.assign_base(
            field,
            DataType::String,
            InputKind::Suggestion,
            required,
            Some(max_length),
            hints,
        )
    }

    // ------------------------------------------------------------------------
    // Numbers
    // ------------------------------------------------------------------------

    /// Unbounded decimal input.
    pub fn number(&self, field: &str, required: bool, hints: FieldHints) -> FieldDescriptor {
        self.assign_base(
            field,
            DataType::Numeric,
            InputKind::Number,
            required,
            None,
            hints,
        )
    }

    /// Unbounded integer input.
    pub fn integer(&self, field: &str, required: bool, hints: FieldHints) -> FieldDescriptor {
        self.assign_base(
            field,
            DataType::NumericInteger,
            InputKind::Number,
            required,
            None,
            hints,
        )
    }

    /// Ranged number input; attaches `min`/`max` predicates.
    pub fn min_max_number(
        &self,
        field: &str,
        required: bool,
        range: NumberRange,
        hints: FieldHints,
    ) -> FieldDescriptor {
        let data_type = if range.precision > 0 {
            DataType::Numeric
        } else {
            DataType::NumericInteger
        };
        let mut d = self.assign_base(
            field,
            data_type,
            InputKind::Number,
            required,
            range.max_length(),
            hints,
        );
        d.min = range.effective_min(required);
        d.max = range.max;

        let mask = self.config.number_mask;
        if let Some(min) = d.min {
            d.add_validation(
                Predicate::new("min", move |v| number_of(v, &mask).is_none_or(|n| n >= min)),
                ErrorRule::new("min", "MIN_VALUE", TriggerEvents::DIRTY | TriggerEvents::FOCUS_OUT)
                    .with_params(vec![formkit_core::format_number(min)]),
            );
        }
        if let Some(max) = d.max {
            d.add_validation(
                Predicate::new("max", move |v| number_of(v, &mask).is_none_or(|n| n <= max)),
                ErrorRule::new("max", "MAX_VALUE", TriggerEvents::DIRTY | TriggerEvents::FOCUS_OUT)
                    .with_params(vec![formkit_core::format_number(max)]),
            );
        }
        d
    }

    /// Ranged number input sized by digit counts.
    pub fn number_digits(
        &self,
        field: &str,
        required: bool,
        integer_digits: u32,
        precision: u32,
        allow_negative: bool,
        hints: FieldHints,
    ) -> FieldDescriptor {
        self.min_max_number(
            field,
            required,
            NumberRange::from_digits(integer_digits, precision, allow_negative),
            hints,
        )
    }

    // ------------------------------------------------------------------------
    // Dates
    // ------------------------------------------------------------------------

    /// Calendar bound to epoch milliseconds.
    pub fn date(&self, field: &str, required: bool, hints: FieldHints) -> FieldDescriptor {
        self.assign_base(
            field,
            DataType::DateNumeric,
            InputKind::Calendar,
            required,
            None,
            hints,
        )
    }

    /// Calendar bound to an ISO date string.
    pub fn date_string(&self, field: &str, required: bool, hints: FieldHints) -> FieldDescriptor {
        self.assign_base(
            field,
            DataType::DateString,
            InputKind::Calendar,
            required,
            None,
            hints,
        )
    }

    pub fn date_time(&self, field: &str, required: bool, hints: FieldHints) -> FieldDescriptor {
        self.assign_base(
            field,
            DataType::DateTimeNumeric,
            InputKind::Calendar,
            required,
            None,
            hints,
        )
    }

    // ------------------------------------------------------------------------
    // Selections
    // ------------------------------------------------------------------------

    pub fn select(
        &self,
        field: &str,
        required: bool,
        options: Vec<SelectOption>,
        hints: FieldHints,
    ) -> FieldDescriptor {
        let mut d = self.assign_base(
            field,
            DataType::String,
            InputKind::Select,
            required,
            None,
            hints,
        );
        d.options = Some(options);
        d
    }

    pub fn dropdown(
        &self,
        field: &str,
        required: bool,
        options: Vec<SelectOption>,
        hints: FieldHints,
    ) -> FieldDescriptor {
        let mut d = self.assign_base(
            field,
            DataType::String,
            InputKind::Dropdown,
            required,
            None,
            hints,
        );
        d.options = Some(options);
        d
    }

    pub fn multi_select(
        &self,
        field: &str,
        required: bool,
        options: Vec<SelectOption>,
        hints: FieldHints,
    ) -> FieldDescriptor {
        let mut d = self.assign_base(
            field,
            DataType::EnumSet,
            InputKind::MultiSelect,
            required,
            None,
            hints,
        );
        d.options = Some(options);
        d
    }

    pub fn checkbox(&self, field: &str, hints: FieldHints) -> FieldDescriptor {
        let hints = FieldHints {
            default_value: hints.default_value.clone().or(Some(Value::Bool(false))),
            ..hints
        };
        self.assign_base(
            field,
            DataType::Boolean,
            InputKind::Checkbox,
            false,
            None,
            hints,
        )
    }

    /// Checkbox with an indeterminate (empty) third state.
    pub fn tri_state_checkbox(&self, field: &str, hints: FieldHints) -> FieldDescriptor {
        self.assign_base(
            field,
            DataType::Boolean,
            InputKind::TriStateCheckbox,
            false,
            None,
            hints,
        )
    }

    // ------------------------------------------------------------------------
    // Files and buttons
    // ------------------------------------------------------------------------

    pub fn file_upload(
        &self,
        field: &str,
        accept: Option<&str>,
        multiple: bool,
        required: bool,
        hints: FieldHints,
    ) -> FieldDescriptor {
        let data_type = if multiple {
            DataType::Files
        } else {
            DataType::File
        };
        let mut d = self.assign_base(
            field,
            data_type,
            InputKind::FileUpload,
            required,
            None,
            hints,
        );
        d.accept = accept.map(str::to_string);
        d.multiple = multiple;
        d
    }

    /// Plain button dispatching `action`.
    pub fn button(&self, field: &str, action: &str, hints: FieldHints) -> FieldDescriptor {
        let mut d = self.assign_base(
            field,
            DataType::None,
            InputKind::Button,
            false,
            None,
            hints,
        );
        d.button_action = Some(action.to_string());
        d
    }

    pub fn submit_button(&self, label_key: &str) -> FieldDescriptor {
        let mut d = self.assign_base(
            SUBMIT_FIELD,
            DataType::None,
            InputKind::SubmitButton,
            false,
            None,
            FieldHints::new().with_label_key(label_key),
        );
        d.button_action = Some(SUBMIT_FIELD.to_string());
        d
    }
}

fn auto_sizes(kind: InputKind) -> bool {
    matches!(
        kind,
        InputKind::Text | InputKind::Number | InputKind::Suggestion
    )
}

fn number_of(value: &Value, mask: &formkit_core::NumberMask) -> Option<f64> {
    match value {
        Value::Number(n) => Some(*n),
        Value::Text(s) => mask.clean(s),
        _ => None,
    }
}

fn merge_hints(d: &mut FieldDescriptor, hints: FieldHints) {
    if let Some(key) = hints.label_key {
        d.label_key = key;
    }
    if let Some(key) = hints.help_key {
        d.help_key = Some(key);
    }
    if let Some(value) = hints.default_value {
        d.default_value = value;
    }
    if let Some(width) = hints.input_width {
        d.input_width = Some(width);
    }
    if let Some(columns) = hints.used_layout_columns {
        d.used_layout_columns = Some(columns);
    }
    if let Some(disabled) = hints.disabled {
        d.disabled = disabled;
    }
    if let Some(invisible) = hints.invisible {
        d.invisible = invisible;
    }
    if let Some(readonly) = hints.readonly {
        d.readonly = readonly;
    }
    if let Some(suffix) = hints.suffix {
        d.suffix = Some(suffix);
    }
    if let Some(zero) = hints.treat_zero_as_empty {
        d.treat_zero_as_empty = zero;
    }
    if let Some(date) = hints.min_date {
        d.min_date = Some(date);
    }
    if let Some(data_type) = hints.data_type {
        d.data_type = data_type;
    }
}


#[cfg(test)]
mod prop_tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        /// Every factory keeps required state, predicate and rule in step.
        #[test]
        fn prop_required_invariant(
            required in any::<bool>(),
            max_length in 1usize..200,
            name in "[a-z][a-zA-Z]{0,12}",
        ) {
            let registry = ValidationRegistry::with_builtins();
            let config = FormkitConfig::standard();
            let factory = DescriptorFactory::new(&registry, &config);
            let built = vec![
                factory.text(&name, max_length, required, FieldHints::new()),
                factory.email(&name, max_length, required, FieldHints::new()),
                factory.date(&name, required, FieldHints::new()),
                factory.select(&name, required, vec![], FieldHints::new()),
                factory.number_digits(&name, required, 3, 2, false, FieldHints::new()),
            ];
            for d in built {
                prop_assert!(d.required_invariant_holds());
                prop_assert_eq!(d.required, required);
            }
        }

        /// A required, non-negative range never accepts zero and always
        /// accepts its smallest step.
        #[test]
        fn prop_required_min_rejects_zero(precision in 0u32..5, digits in 1u32..6) {
            let registry = ValidationRegistry::with_builtins();
            let config = FormkitConfig::standard();
            let factory = DescriptorFactory::new(&registry, &config);
            let d = factory.number_digits(
                "amount",
                true,
                digits,
                precision,
                false,
                FieldHints::new(),
            );
            let min = d.min.unwrap_or_default();
            prop_assert!(min > 0.0);
            prop_assert!(!d.failing(&Value::Number(0.0)).is_empty());
            prop_assert!(d.failing(&Value::Number(min)).is_empty());
        }
    }
}
