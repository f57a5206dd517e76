//! Wire types of the server descriptor payload.

use formkit_core::{DataType, TranslateError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

// ============================================================================
// FIELD METADATA
// ============================================================================

/// One remote field-metadata record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldMetadata {
    pub field_name: String,
    pub data_type: DataType,
    #[serde(default)]
    pub required: bool,
    /// Minimum value, or minimum length for strings
    #[serde(default)]
    pub min: Option<f64>,
    /// Maximum value, or maximum length for strings
    #[serde(default)]
    pub max: Option<f64>,
    #[serde(default)]
    pub enum_type: Option<String>,
    #[serde(default)]
    pub enum_values: Option<Vec<String>>,
    /// Raw hint strings, see [`PropertyHint`]
    #[serde(default)]
    pub dynamic_form_property_helps: Vec<String>,
    /// Label: translation key or literal text
    #[serde(default)]
    pub description: Option<String>,
    /// Help text: translation key or literal text
    #[serde(default)]
    pub description_help: Option<String>,
}

impl FieldMetadata {
    pub fn new(field_name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            field_name: field_name.into(),
            data_type,
            required: false,
            min: None,
            max: None,
            enum_type: None,
            enum_values: None,
            dynamic_form_property_helps: Vec::new(),
            description: None,
            description_help: None,
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn with_range(mut self, min: Option<f64>, max: Option<f64>) -> Self {
        self.min = min;
        self.max = max;
        self
    }

    pub fn with_enum(mut self, enum_type: impl Into<String>, values: Vec<String>) -> Self {
        self.enum_type = Some(enum_type.into());
        self.enum_values = Some(values);
        self
    }

    pub fn with_hint(mut self, hint: PropertyHint) -> Self {
        self.dynamic_form_property_helps.push(hint.as_str().to_string());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Parsed hints plus the raw strings no hint matched.
    pub fn hints(&self) -> (Vec<PropertyHint>, Vec<&str>) {
        let mut known = Vec::new();
        let mut unknown = Vec::new();
        for raw in &self.dynamic_form_property_helps {
            match raw.parse::<PropertyHint>() {
                Ok(hint) => known.push(hint),
                Err(_) => unknown.push(raw.as_str()),
            }
        }
        (known, unknown)
    }
}

// ============================================================================
// PROPERTY HINTS
// ============================================================================

/// Rendering hints attached to a field by the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PropertyHint {
    Email,
    Password,
    SelectOptions,
    Textarea,
    Percentage,
    DateFuture,
}

impl PropertyHint {
    pub fn as_str(self) -> &'static str {
        match self {
            PropertyHint::Email => "EMAIL",
            PropertyHint::Password => "PASSWORD",
            PropertyHint::SelectOptions => "SELECT_OPTIONS",
            PropertyHint::Textarea => "TEXTAREA",
            PropertyHint::Percentage => "PERCENTAGE",
            PropertyHint::DateFuture => "DATE_FUTURE",
        }
    }
}

impl fmt::Display for PropertyHint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PropertyHint {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "EMAIL" => Ok(PropertyHint::Email),
            "PASSWORD" => Ok(PropertyHint::Password),
            "SELECT_OPTIONS" => Ok(PropertyHint::SelectOptions),
            "TEXTAREA" => Ok(PropertyHint::Textarea),
            "PERCENTAGE" => Ok(PropertyHint::Percentage),
            "DATE_FUTURE" => Ok(PropertyHint::DateFuture),
            other => Err(other.to_string()),
        }
    }
}

// ============================================================================
// CONSTRAINTS
// ============================================================================

/// Cross-field constraint kinds the translator understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConstraintKind {
    DateRange,
}

impl FromStr for ConstraintKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "dateRange" => Ok(ConstraintKind::DateRange),
            other => Err(other.to_string()),
        }
    }
}

/// Pair of fields tied by a cross-field constraint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConstraintDecl {
    pub start_field: String,
    pub end_field: String,
}

impl ConstraintDecl {
    pub fn new(start_field: impl Into<String>, end_field: impl Into<String>) -> Self {
        Self {
            start_field: start_field.into(),
            end_field: end_field.into(),
        }
    }
}

// ============================================================================
// ENVELOPE
// ============================================================================

/// Field list plus the sibling constraint map.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormDescriptorEnvelope {
    pub field_descriptors: Vec<FieldMetadata>,
    #[serde(default)]
    pub constraints: BTreeMap<String, ConstraintDecl>,
}

impl FormDescriptorEnvelope {
    /// Parse either a bare metadata array or a full envelope object.
    pub fn from_json_str(json: &str) -> Result<Self, TranslateError> {
        let value: serde_json::Value = serde_json::from_str(json).map_err(malformed)?;
        match value {
            serde_json::Value::Array(_) => Ok(Self {
                field_descriptors: serde_json::from_value(value).map_err(malformed)?,
                constraints: BTreeMap::new(),
            }),
            serde_json::Value::Object(_) => serde_json::from_value(value).map_err(malformed),
            other => Err(TranslateError::Malformed {
                reason: format!("expected array or object, got {}", other),
            }),
        }
    }
}

fn malformed(e: serde_json::Error) -> TranslateError {
    TranslateError::Malformed {
        reason: e.to_string(),
    }
}
