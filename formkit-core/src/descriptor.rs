//! Field descriptors: the data description of one form input, its
//! validation and its layout.

use crate::enums::{DataType, InputKind, TriggerEvents};
use crate::value::{Record, Value};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

/// Name shared by the "required" predicate and its error rule.
pub const REQUIRED: &str = "required";

/// Translation key of the auto-attached "required" error rule.
pub const REQUIRED_KEY: &str = "REQUIRED";

/// Predicate over a single control value.
pub type CheckFn = Arc<dyn Fn(&Value) -> bool + Send + Sync>;

/// Predicate over the values of a field group, keyed by field name.
pub type GroupCheckFn = Arc<dyn Fn(&Record) -> bool + Send + Sync>;

// ============================================================================
// PREDICATES
// ============================================================================

/// Named validation predicate. A failing predicate reports its name, which
/// is matched against the descriptor's error rules.
#[derive(Clone)]
pub struct Predicate {
    name: String,
    check: CheckFn,
}

impl Predicate {
    pub fn new(
        name: impl Into<String>,
        check: impl Fn(&Value) -> bool + Send + Sync + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            check: Arc::new(check),
        }
    }

    pub fn from_fn(name: impl Into<String>, check: CheckFn) -> Self {
        Self {
            name: name.into(),
            check,
        }
    }

    /// Rejects empty values.
    pub fn required() -> Self {
        Self::new(REQUIRED, |v| !v.is_empty())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn holds(&self, value: &Value) -> bool {
        (self.check)(value)
    }
}

impl fmt::Debug for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Predicate")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// Named predicate over a whole field group.
#[derive(Clone)]
pub struct GroupPredicate {
    name: String,
    check: GroupCheckFn,
}

impl GroupPredicate {
    pub fn new(
        name: impl Into<String>,
        check: impl Fn(&Record) -> bool + Send + Sync + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            check: Arc::new(check),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn holds(&self, values: &Record) -> bool {
        (self.check)(values)
    }
}

impl fmt::Debug for GroupPredicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GroupPredicate")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// ERROR RULES
// ============================================================================

/// Binds a validation-failure name to a translated message and the
/// interaction events after which the message may be shown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorRule {
    /// Name of the predicate this rule explains
    pub name: String,
    pub translation_key: String,
    pub triggers: TriggerEvents,
    /// Values interpolated into `{0}`, `{1}`, ... of the message
    pub params: Vec<String>,
}

impl ErrorRule {
    pub fn new(
        name: impl Into<String>,
        translation_key: impl Into<String>,
        triggers: TriggerEvents,
    ) -> Self {
        Self {
            name: name.into(),
            translation_key: translation_key.into(),
            triggers,
            params: Vec::new(),
        }
    }

    pub fn required(triggers: TriggerEvents) -> Self {
        Self::new(REQUIRED, REQUIRED_KEY, triggers)
    }

    pub fn with_params(mut self, params: Vec<String>) -> Self {
        self.params = params;
        self
    }

    /// Fill the placeholders of a translated message template.
    pub fn render(&self, template: &str) -> String {
        self.params
            .iter()
            .enumerate()
            .fold(template.to_string(), |msg, (i, p)| {
                msg.replace(&format!("{{{}}}", i), p)
            })
    }
}

// ============================================================================
// OPTIONS AND HANDLES
// ============================================================================

/// One entry of a select-like option list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectOption {
    /// Raw value stored in the business object
    pub key: String,
    /// Text (or translation key) shown to the user
    pub display: String,
}

impl SelectOption {
    pub fn new(key: impl Into<String>, display: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            display: display.into(),
        }
    }
}

/// Identifies one materialized form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FormId(Uuid);

impl FormId {
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for FormId {
    fn default() -> Self {
        Self::new()
    }
}

/// Back-reference from a descriptor to its live control. The tree owns the
/// control; the handle is only good for lookups in that tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ControlHandle {
    pub form: FormId,
    pub slot: usize,
}

// ============================================================================
// FIELD DESCRIPTOR
// ============================================================================

/// Data description of one form input.
///
/// `required == true` always comes with a "required" predicate and a
/// matching error rule; use [`FieldDescriptor::set_required`] to keep the
/// two in step.
#[derive(Debug, Clone)]
pub struct FieldDescriptor {
    /// Unique name within the form or group
    pub field: String,
    pub data_type: DataType,
    pub input_kind: InputKind,
    pub required: bool,
    pub validators: Vec<Predicate>,
    pub error_rules: Vec<ErrorRule>,
    pub default_value: Value,
    pub min: Option<f64>,
    pub max: Option<f64>,
    /// Calendar lower bound
    pub min_date: Option<NaiveDate>,
    pub max_length: Option<usize>,
    pub used_layout_columns: Option<u8>,
    pub input_width: Option<usize>,
    pub disabled: bool,
    pub invisible: bool,
    pub readonly: bool,
    pub options: Option<Vec<SelectOption>>,
    /// Translation key, or sentinel-prefixed literal text
    pub label_key: String,
    pub help_key: Option<String>,
    /// Unit rendered after the input, e.g. `%`
    pub suffix: Option<String>,
    /// Transfer maps a stored `0` to an empty control
    pub treat_zero_as_empty: bool,
    /// File-type filter for uploads
    pub accept: Option<String>,
    /// Multiple files for uploads
    pub multiple: bool,
    /// Previous-value annotation shown while a change proposal is reviewed
    pub annotation: Option<String>,
    pub button_action: Option<String>,
    pub control: Option<ControlHandle>,
}

impl FieldDescriptor {
    pub fn new(field: impl Into<String>, data_type: DataType, input_kind: InputKind) -> Self {
        let field = field.into();
        Self {
            label_key: field.to_uppercase(),
            field,
            data_type,
            input_kind,
            required: false,
            validators: Vec::new(),
            error_rules: Vec::new(),
            default_value: Value::Empty,
            min: None,
            max: None,
            min_date: None,
            max_length: None,
            used_layout_columns: None,
            input_width: None,
            disabled: false,
            invisible: false,
            readonly: false,
            options: None,
            help_key: None,
            suffix: None,
            treat_zero_as_empty: false,
            accept: None,
            multiple: false,
            annotation: None,
            button_action: None,
            control: None,
        }
    }

    pub fn is_button(&self) -> bool {
        self.input_kind.is_button()
    }

    /// Switch the required state, adding or removing the "required"
    /// predicate and error rule together.
    pub fn set_required(&mut self, required: bool, triggers: TriggerEvents) {
        self.validators.retain(|p| p.name() != REQUIRED);
        self.error_rules.retain(|r| r.name != REQUIRED);
        self.required = required;
        if required {
            self.validators.insert(0, Predicate::required());
            self.error_rules.insert(0, ErrorRule::required(triggers));
        }
    }

    pub fn add_validation(&mut self, predicate: Predicate, rule: ErrorRule) {
        self.validators.push(predicate);
        self.error_rules.push(rule);
    }

    /// Names of the predicates `value` fails, in predicate order.
    pub fn failing(&self, value: &Value) -> Vec<String> {
        self.validators
            .iter()
            .filter(|p| !p.holds(value))
            .map(|p| p.name().to_string())
            .collect()
    }

    pub fn has_options(&self) -> bool {
        self.options.is_some()
    }

    /// Display text of the option keyed `key`, if the list has one.
    pub fn option_display(&self, key: &str) -> Option<&str> {
        self.options
            .as_ref()?
            .iter()
            .find(|o| o.key == key)
            .map(|o| o.display.as_str())
    }

    /// Key of the option shown as `display`, if the list has one.
    pub fn option_key(&self, display: &str) -> Option<&str> {
        self.options
            .as_ref()?
            .iter()
            .find(|o| o.display == display)
            .map(|o| o.key.as_str())
    }

    /// True when required state, predicates and error rules agree.
    pub fn required_invariant_holds(&self) -> bool {
        let has_predicate = self.validators.iter().any(|p| p.name() == REQUIRED);
        let has_rule = self
            .error_rules
            .iter()
            .any(|r| r.name == REQUIRED && !r.triggers.is_empty());
        if self.required {
            has_predicate && has_rule
        } else {
            !has_predicate
        }
    }

    pub fn with_default(mut self, value: impl Into<Value>) -> Self {
        self.default_value = value.into();
        self
    }

    pub fn with_options(mut self, options: Vec<SelectOption>) -> Self {
        self.options = Some(options);
        self
    }

    pub fn with_label_key(mut self, label_key: impl Into<String>) -> Self {
        self.label_key = label_key.into();
        self
    }
}

// ============================================================================
// FIELD GROUP DESCRIPTOR
// ============================================================================

/// Named collection of descriptors sharing a group-level validator, e.g.
/// "start ≤ end" over two dates rendered independently.
#[derive(Debug, Clone)]
pub struct FieldGroupDescriptor {
    pub name: String,
    pub fields: Vec<FieldDescriptor>,
    pub validator: Option<GroupPredicate>,
    pub error_rule: Option<ErrorRule>,
    pub control: Option<ControlHandle>,
}

impl FieldGroupDescriptor {
    pub fn new(name: impl Into<String>, fields: Vec<FieldDescriptor>) -> Self {
        Self {
            name: name.into(),
            fields,
            validator: None,
            error_rule: None,
            control: None,
        }
    }

    pub fn with_validator(mut self, validator: GroupPredicate, rule: ErrorRule) -> Self {
        self.validator = Some(validator);
        self.error_rule = Some(rule);
        self
    }

    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.field == name)
    }

    /// Name of the group predicate when `values` fail it.
    pub fn failing(&self, values: &Record) -> Option<String> {
        self.validator
            .as_ref()
            .filter(|v| !v.holds(values))
            .map(|v| v.name().to_string())
    }
}

// ============================================================================
// FORM ITEMS
// ============================================================================

/// One entry of a form definition.
#[derive(Debug, Clone)]
pub enum FormItem {
    Field(FieldDescriptor),
    Group(FieldGroupDescriptor),
}

impl FormItem {
    pub fn name(&self) -> &str {
        match self {
            FormItem::Field(f) => &f.field,
            FormItem::Group(g) => &g.name,
        }
    }

    pub fn as_field(&self) -> Option<&FieldDescriptor> {
        match self {
            FormItem::Field(f) => Some(f),
            FormItem::Group(_) => None,
        }
    }

    pub fn as_group(&self) -> Option<&FieldGroupDescriptor> {
        match self {
            FormItem::Group(g) => Some(g),
            FormItem::Field(_) => None,
        }
    }
}

impl From<FieldDescriptor> for FormItem {
    fn from(f: FieldDescriptor) -> Self {
        FormItem::Field(f)
    }
}

impl From<FieldGroupDescriptor> for FormItem {
    fn from(g: FieldGroupDescriptor) -> Self {
        FormItem::Group(g)
    }
}

/// Every leaf descriptor, groups flattened in place.
pub fn leaf_fields(items: &[FormItem]) -> Vec<&FieldDescriptor> {
    items
        .iter()
        .flat_map(|item| match item {
            FormItem::Field(f) => vec![f],
            FormItem::Group(g) => g.fields.iter().collect(),
        })
        .collect()
}
