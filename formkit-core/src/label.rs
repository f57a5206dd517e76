//! Label-key derivation and literal-text marking

use crate::config::FormkitConfig;
use once_cell::sync::Lazy;
use regex::Regex;

static TRANSLATION_KEY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Z_]+$").expect("translation-key pattern compiles"));

/// True when `text` looks like a translation key (`^[A-Z_]+$`).
pub fn is_translation_key(text: &str) -> bool {
    TRANSLATION_KEY.is_match(text)
}

/// Keep translation keys as they are, prefix everything else with the
/// literal sentinel so the rendering layer skips the lookup.
pub fn to_label(text: &str, sentinel: char) -> String {
    if is_translation_key(text) {
        text.to_string()
    } else {
        format!("{}{}", sentinel, text)
    }
}

/// Literal text behind a sentinel-marked label, `None` for translation keys.
pub fn literal_text(label: &str, sentinel: char) -> Option<&str> {
    label.strip_prefix(sentinel)
}

/// Derive a translation key from a field name.
///
/// `security.idSecuritycurrency` becomes `ID_SECURITYCURRENCY`,
/// `URLAddress` becomes `URL_ADDRESS` and `yearGainMC` becomes `GAIN`.
pub fn derive_label_key(field: &str, config: &FormkitConfig) -> String {
    let name = field.rsplit('.').next().unwrap_or(field);
    let name = strip_noise(name, config);
    split_words(name)
        .iter()
        .map(|w| w.to_uppercase())
        .collect::<Vec<_>>()
        .join("_")
}

fn strip_noise<'a>(name: &'a str, config: &FormkitConfig) -> &'a str {
    let mut name = name;
    for prefix in &config.label_noise_prefixes {
        if let Some(rest) = name.strip_prefix(prefix.as_str()) {
            if rest.starts_with(|c: char| c.is_uppercase()) {
                name = rest;
                break;
            }
        }
    }
    // Longest suffix first so "DiffMC" wins over "MC".
    let mut suffixes: Vec<&String> = config.label_noise_suffixes.iter().collect();
    suffixes.sort_by_key(|s| std::cmp::Reverse(s.len()));
    for suffix in suffixes {
        if let Some(rest) = name.strip_suffix(suffix.as_str()) {
            if !rest.is_empty() {
                name = rest;
                break;
            }
        }
    }
    name
}

/// Split on case boundaries, keeping runs of capitals together.
fn split_words(name: &str) -> Vec<String> {
    let chars: Vec<char> = name.chars().collect();
    let mut words = Vec::new();
    let mut current = String::new();

    for (i, &c) in chars.iter().enumerate() {
        if c == '_' || c == '-' || c == ' ' {
            if !current.is_empty() {
                words.push(std::mem::take(&mut current));
            }
            continue;
        }
        if c.is_uppercase() && !current.is_empty() {
            let prev = chars[i - 1];
            let next_is_lower = chars.get(i + 1).is_some_and(|n| n.is_lowercase());
            if !prev.is_uppercase() || next_is_lower {
                words.push(std::mem::take(&mut current));
            }
        }
        current.push(c);
    }
    if !current.is_empty() {
        words.push(current);
    }
    words
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(field: &str) -> String {
        derive_label_key(field, &FormkitConfig::standard())
    }

    #[test]
    fn test_camel_case_split() {
        assert_eq!(key("noteRequest"), "NOTE_REQUEST");
        assert_eq!(key("idSecuritycurrency"), "ID_SECURITYCURRENCY");
        assert_eq!(key("isin"), "ISIN");
    }

    #[test]
    fn test_consecutive_capitals_grouped() {
        assert_eq!(key("URLAddress"), "URL_ADDRESS");
        assert_eq!(key("tickerSymbolISO"), "TICKER_SYMBOL_ISO");
    }

    #[test]
    fn test_qualifier_discarded() {
        assert_eq!(key("security.name"), "NAME");
        assert_eq!(key("a.b.activeFromDate"), "ACTIVE_FROM_DATE");
    }

    #[test]
    fn test_noise_stripped() {
        assert_eq!(key("yearGainMC"), "GAIN");
        assert_eq!(key("randRating"), "RATING");
        assert_eq!(key("gainDiffMC"), "GAIN");
        // only at a case boundary
        assert_eq!(key("random"), "RANDOM");
        assert_eq!(key("yearly"), "YEARLY");
    }

    #[test]
    fn test_literal_marking() {
        assert_eq!(to_label("ISIN", '*'), "ISIN");
        assert_eq!(to_label("Valid from", '*'), "*Valid from");
        assert_eq!(literal_text("*Valid from", '*'), Some("Valid from"));
        assert_eq!(literal_text("ISIN", '*'), None);
        assert!(!is_translation_key("Isin"));
        assert!(!is_translation_key(""));
    }
}
