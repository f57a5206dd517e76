//! Configuration types

use crate::enums::TriggerEvents;
use crate::error::ConfigError;
use crate::mask::NumberMask;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Engine-wide settings shared by the factory, translator and runtime.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct FormkitConfig {
    /// String/number fields with a max length below this get the length as
    /// their input width.
    pub auto_width_threshold: usize,
    /// Server String fields longer than this become textareas.
    pub textarea_threshold: usize,
    /// Leading character marking a label as literal text.
    pub literal_sentinel: char,
    /// Prefixes stripped from field names before label-key derivation.
    pub label_noise_prefixes: Vec<String>,
    /// Suffixes stripped from field names before label-key derivation.
    pub label_noise_suffixes: Vec<String>,
    pub number_mask: NumberMask,
    /// Triggers attached to auto-generated "required" error rules.
    pub required_triggers: TriggerEvents,
}

impl Default for FormkitConfig {
    fn default() -> Self {
        Self {
            auto_width_threshold: 25,
            textarea_threshold: 80,
            literal_sentinel: '*',
            label_noise_prefixes: vec!["rand".to_string(), "year".to_string()],
            label_noise_suffixes: vec!["DiffMC".to_string(), "MC".to_string()],
            number_mask: NumberMask::default(),
            required_triggers: TriggerEvents::TOUCHED | TriggerEvents::FOCUS_OUT,
        }
    }
}

impl FormkitConfig {
    /// The settings every screen uses unless told otherwise.
    pub fn standard() -> Self {
        Self::default()
    }

    /// Parse and validate TOML.
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let config: FormkitConfig = toml::from_str(source).map_err(|e| ConfigError::Parse {
            reason: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            reason: format!("{}: {}", path.display(), e),
        })?;
        Self::from_toml_str(&contents)
    }

    /// Validate the configuration.
    ///
    /// Validates:
    /// - thresholds > 0
    /// - sentinel is not an uppercase letter or underscore (it would look
    ///   like a translation key)
    /// - mask separators differ
    /// - required triggers are non-empty
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.auto_width_threshold == 0 {
            return Err(ConfigError::InvalidValue {
                field: "auto_width_threshold".to_string(),
                reason: "must be > 0".to_string(),
            });
        }
        if self.textarea_threshold == 0 {
            return Err(ConfigError::InvalidValue {
                field: "textarea_threshold".to_string(),
                reason: "must be > 0".to_string(),
            });
        }
        if self.literal_sentinel.is_ascii_uppercase() || self.literal_sentinel == '_' {
            return Err(ConfigError::InvalidValue {
                field: "literal_sentinel".to_string(),
                reason: "must not be a translation-key character".to_string(),
            });
        }
        if self.number_mask.thousands_separator == self.number_mask.decimal_separator {
            return Err(ConfigError::InvalidValue {
                field: "number_mask".to_string(),
                reason: "separators must differ".to_string(),
            });
        }
        if self.required_triggers.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "required_triggers".to_string(),
                reason: "must contain at least one trigger event".to_string(),
            });
        }
        if self
            .label_noise_prefixes
            .iter()
            .chain(&self.label_noise_suffixes)
            .any(|s| s.is_empty())
        {
            return Err(ConfigError::InvalidValue {
                field: "label_noise".to_string(),
                reason: "entries must not be empty".to_string(),
            });
        }
        Ok(())
    }
}
