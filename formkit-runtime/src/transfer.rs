//! Object ⇄ tree transfer with type coercion.

use crate::tree::FormTree;
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use formkit_core::{
    ConfigIssue, DataType, FieldDescriptor, InputKind, Record, TreeError, Value, DATE_FORMAT,
    DATE_TIME_FORMAT,
};

impl FormTree {
    /// Copy `object` into the controls, descriptor by descriptor. Fields the
    /// object does not carry and buttons are left alone.
    ///
    /// - date fields take a date built from a truthy source, otherwise empty
    /// - `treat_zero_as_empty` maps a stored `0` to empty
    /// - option fields show the display text of the option keyed by the
    ///   stored value (the `""` option for falsy values); a miss is reported
    ///   and leaves the control empty
    pub fn transfer_object_to_tree(&mut self, object: &Record) {
        for slot in 0..self.descriptors.len() {
            let descriptor = &self.descriptors[slot];
            if descriptor.is_button() {
                continue;
            }
            let Some(source) = object.get(&descriptor.field) else {
                continue;
            };
            let value = self.inbound(descriptor, source);
            self.assign(slot, value);
        }
        tracing::trace!(
            form = %self.id.as_uuid(),
            fields = object.len(),
            "object transferred to tree"
        );
    }

    /// Write control values into `target`. Fields `target` lacks are only
    /// written when `create_missing` is set. Numeric values are mask
    /// cleaned, option displays are mapped back to keys and multi-selections
    /// are comma-joined unless the target field already holds a list.
    pub fn transfer_tree_to_object(&self, target: &mut Record, create_missing: bool) {
        for (descriptor, control) in self.descriptors.iter().zip(&self.controls) {
            if descriptor.is_button() {
                continue;
            }
            if !create_missing && !target.contains(&descriptor.field) {
                continue;
            }
            let value = self.outbound(descriptor, control.value(), target.get(&descriptor.field));
            target.set(descriptor.field.clone(), value);
        }
    }

    /// New record holding every field of the tree.
    pub fn to_record(&self) -> Record {
        let mut record = Record::new();
        self.transfer_tree_to_object(&mut record, true);
        record
    }

    /// `value` as `field`'s control would hold it after an inbound
    /// transfer: dates parsed, zero mapped to empty, option keys shown as
    /// their display text.
    pub fn coerce_inbound(&self, field: &str, value: &Value) -> Result<Value, TreeError> {
        let descriptor = &self.descriptors[self.slot_of(field)?];
        Ok(self.inbound(descriptor, value))
    }

    fn inbound(&self, descriptor: &FieldDescriptor, source: &Value) -> Value {
        if descriptor.data_type.is_date() {
            return if source.is_truthy() {
                inbound_date(descriptor, source)
            } else {
                Value::Empty
            };
        }
        if descriptor.treat_zero_as_empty && source.as_number() == Some(0.0) {
            return Value::Empty;
        }
        if descriptor.has_options() {
            return self.inbound_option(descriptor, source);
        }
        source.clone()
    }

    fn inbound_option(&self, descriptor: &FieldDescriptor, source: &Value) -> Value {
        if descriptor.input_kind == InputKind::MultiSelect {
            let keys: Vec<String> = match source {
                Value::Empty => return Value::Empty,
                Value::List(items) => items.clone(),
                Value::Text(joined) => joined
                    .split(',')
                    .map(str::trim)
                    .filter(|k| !k.is_empty())
                    .map(str::to_string)
                    .collect(),
                other => vec![other.to_key_string()],
            };
            return Value::List(
                keys.iter()
                    .filter_map(|key| self.display_of(descriptor, key))
                    .collect(),
            );
        }

        if !source.is_truthy() {
            return descriptor
                .option_display("")
                .filter(|display| !display.is_empty())
                .map(Value::from)
                .unwrap_or_default();
        }
        self.display_of(descriptor, &source.to_key_string())
            .map(Value::Text)
            .unwrap_or_default()
    }

    fn display_of(&self, descriptor: &FieldDescriptor, key: &str) -> Option<String> {
        let display = descriptor.option_display(key).map(str::to_string);
        if display.is_none() {
            self.sink.report(ConfigIssue::MissingOption {
                field: descriptor.field.clone(),
                value: key.to_string(),
            });
        }
        display
    }

    fn outbound(
        &self,
        descriptor: &FieldDescriptor,
        value: &Value,
        existing: Option<&Value>,
    ) -> Value {
        let value = if descriptor.has_options() {
            outbound_option(descriptor, value, existing)
        } else {
            value.clone()
        };
        if descriptor.data_type.is_numeric() {
            return self.mask.clean_value(&value);
        }
        if descriptor.data_type.is_date() {
            return outbound_date(descriptor.data_type, value);
        }
        value
    }
}

/// Map option displays back to keys. The stored value's shape is kept: a
/// numeric target gets the key back as a number, a blank text target keeps
/// its `""` for the empty key.
fn outbound_option(descriptor: &FieldDescriptor, value: &Value, existing: Option<&Value>) -> Value {
    let key_of = |display: &str| {
        descriptor
            .option_key(display)
            .unwrap_or(display)
            .to_string()
    };
    let blank = || match existing {
        Some(Value::Text(s)) if s.is_empty() => Value::Text(String::new()),
        _ => Value::Empty,
    };
    match value {
        Value::List(displays) => {
            let keys: Vec<String> = displays.iter().map(|d| key_of(d)).collect();
            match existing {
                None | Some(Value::List(_)) => Value::List(keys),
                Some(_) => Value::Text(keys.join(",")),
            }
        }
        Value::Text(display) => {
            let key = key_of(display);
            if key.is_empty() {
                return blank();
            }
            match (existing, key.parse::<f64>()) {
                (Some(Value::Number(_)), Ok(n)) => Value::Number(n),
                _ => Value::Text(key),
            }
        }
        Value::Empty => blank(),
        other => other.clone(),
    }
}

fn inbound_date(descriptor: &FieldDescriptor, source: &Value) -> Value {
    let parsed = match source {
        Value::Date(d) => d.and_hms_opt(0, 0, 0),
        Value::DateTime(dt) => Some(*dt),
        Value::Number(ms) => DateTime::from_timestamp_millis(*ms as i64).map(|dt| dt.naive_utc()),
        Value::Text(s) => parse_date_text(s),
        _ => None,
    };
    match (descriptor.data_type, parsed) {
        (DataType::DateTimeNumeric, Some(dt)) => Value::DateTime(dt),
        (_, Some(dt)) => Value::Date(dt.date()),
        (_, None) => {
            tracing::warn!(
                field = %descriptor.field,
                source = %source.to_key_string(),
                "date field received an unparseable value"
            );
            Value::Empty
        }
    }
}

fn parse_date_text(text: &str) -> Option<NaiveDateTime> {
    let text = text.trim();
    text.get(..19)
        .and_then(|s| NaiveDateTime::parse_from_str(s, DATE_TIME_FORMAT).ok())
        .or_else(|| {
            text.get(..10)
                .and_then(|s| NaiveDate::parse_from_str(s, DATE_FORMAT).ok())
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

fn outbound_date(data_type: DataType, value: Value) -> Value {
    match (data_type, value) {
        (DataType::DateTimeNumeric, Value::Date(d)) => {
            d.and_hms_opt(0, 0, 0).map(Value::DateTime).unwrap_or_default()
        }
        (DataType::DateTimeNumeric, value) => value,
        (_, Value::DateTime(dt)) => Value::Date(dt.date()),
        (_, value) => value,
    }
}
