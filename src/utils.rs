//! Shared utility functions for the marine weather service
use regex::Regex;
use std::sync::OnceLock;

fn leading_number() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[0-9]+\.?[0-9]*").expect("numeric pattern is valid"))
}

/// Extract the first numeric run from a free-text table cell
///
/// Station pages mix values with unit symbols ("8m", "1.5m/s") and use a
/// lone dash for missing data. Only the first run of digits (with at most
/// one decimal point) is read; anything malformed yields `None`.
///
/// # Examples
///
/// ```
/// use marine_weather_service::utils::extract_number;
///
/// assert_eq!(extract_number("8m"), Some(8.0));
/// assert_eq!(extract_number(" 1.5m/s "), Some(1.5));
/// assert_eq!(extract_number("-"), None);
/// assert_eq!(extract_number("calm"), None);
/// ```
pub fn extract_number(text: &str) -> Option<f64> {
    let trimmed = text.trim();
    if trimmed.is_empty() || trimmed == "-" {
        return None;
    }

    leading_number()
        .find(trimmed)
        .and_then(|m| m.as_str().parse::<f64>().ok())
}

/// Cell text with the missing-data markers ("" and "-") mapped to `None`
pub fn non_missing(text: &str) -> Option<&str> {
    let trimmed = text.trim();
    if trimmed.is_empty() || trimmed == "-" {
        None
    } else {
        Some(trimmed)
    }
}
