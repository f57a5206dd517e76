//! Enum types for field descriptors

use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

// ============================================================================
// DATA TYPES
// ============================================================================

/// Data type carried by a field. Decides transfer coercions and, for
/// server-supplied descriptors, which input kind is rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataType {
    String,
    Numeric,
    NumericInteger,
    Boolean,
    /// Date kept as an ISO string in the business object
    DateString,
    /// Date kept as epoch milliseconds in the business object
    DateNumeric,
    /// Date and time kept as epoch milliseconds in the business object
    DateTimeNumeric,
    Email,
    Password,
    #[serde(rename = "URLString")]
    UrlString,
    EnumSet,
    File,
    Files,
    None,
}

impl DataType {
    /// Every variant, in declaration order.
    pub const ALL: [DataType; 14] = [
        DataType::String,
        DataType::Numeric,
        DataType::NumericInteger,
        DataType::Boolean,
        DataType::DateString,
        DataType::DateNumeric,
        DataType::DateTimeNumeric,
        DataType::Email,
        DataType::Password,
        DataType::UrlString,
        DataType::EnumSet,
        DataType::File,
        DataType::Files,
        DataType::None,
    ];

    pub fn is_date(self) -> bool {
        matches!(
            self,
            DataType::DateString | DataType::DateNumeric | DataType::DateTimeNumeric
        )
    }

    pub fn is_numeric(self) -> bool {
        matches!(self, DataType::Numeric | DataType::NumericInteger)
    }

    /// Wire name used by the server metadata.
    pub fn as_str(self) -> &'static str {
        match self {
            DataType::String => "String",
            DataType::Numeric => "Numeric",
            DataType::NumericInteger => "NumericInteger",
            DataType::Boolean => "Boolean",
            DataType::DateString => "DateString",
            DataType::DateNumeric => "DateNumeric",
            DataType::DateTimeNumeric => "DateTimeNumeric",
            DataType::Email => "Email",
            DataType::Password => "Password",
            DataType::UrlString => "URLString",
            DataType::EnumSet => "EnumSet",
            DataType::File => "File",
            DataType::Files => "Files",
            DataType::None => "None",
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DataType {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DataType::ALL
            .iter()
            .copied()
            .find(|dt| dt.as_str() == s)
            .ok_or_else(|| ParseEnumError {
                kind: "DataType",
                value: s.to_string(),
            })
    }
}

// ============================================================================
// INPUT KINDS
// ============================================================================

/// Kind of input control a descriptor is rendered as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InputKind {
    Text,
    Number,
    Select,
    MultiSelect,
    Dropdown,
    Calendar,
    Checkbox,
    TriStateCheckbox,
    Textarea,
    Suggestion,
    FileUpload,
    Button,
    SubmitButton,
}

impl InputKind {
    pub fn is_button(self) -> bool {
        matches!(self, InputKind::Button | InputKind::SubmitButton)
    }

    /// Kinds whose stored value is looked up in an option list.
    pub fn is_select(self) -> bool {
        matches!(
            self,
            InputKind::Select | InputKind::Dropdown | InputKind::MultiSelect
        )
    }
}

impl fmt::Display for InputKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

// ============================================================================
// TRIGGER EVENTS
// ============================================================================

bitflags! {
    /// Interaction events that make a failing rule eligible for display.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct TriggerEvents: u8 {
        /// Control received focus at least once
        const TOUCHED = 0b0000_0001;
        /// User changed the value
        const DIRTY = 0b0000_0010;
        /// Control lost focus at least once
        const FOCUS_OUT = 0b0000_0100;
    }
}

impl Default for TriggerEvents {
    fn default() -> Self {
        TriggerEvents::TOUCHED | TriggerEvents::FOCUS_OUT
    }
}

/// Error for unknown enum names.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown {kind}: '{value}'")]
pub struct ParseEnumError {
    pub kind: &'static str,
    pub value: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_type_round_trips_through_wire_name() {
        for dt in DataType::ALL {
            assert_eq!(dt.as_str().parse::<DataType>().unwrap(), dt);
        }
    }

    #[test]
    fn test_url_string_wire_name() {
        let dt: DataType = serde_json::from_str("\"URLString\"").unwrap();
        assert_eq!(dt, DataType::UrlString);
        assert!("UrlString".parse::<DataType>().is_err());
    }

    #[test]
    fn test_button_kinds() {
        assert!(InputKind::SubmitButton.is_button());
        assert!(InputKind::Button.is_button());
        assert!(!InputKind::Text.is_button());
    }

    #[test]
    fn test_default_triggers_are_touch_and_blur() {
        let t = TriggerEvents::default();
        assert!(t.contains(TriggerEvents::TOUCHED));
        assert!(t.contains(TriggerEvents::FOCUS_OUT));
        assert!(!t.contains(TriggerEvents::DIRTY));
    }
}
