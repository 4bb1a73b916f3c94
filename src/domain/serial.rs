//! Serial number extraction from recognized text.

use crate::domain::models::{RecognizedText, SerialNumber};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;
use thiserror::Error;

/// Substring that marks the line carrying the serial number
pub const SERIAL_MARKER: &str = "SN";

/// Vendor prefixes a serial may start with
pub const VENDOR_PREFIXES: [&str; 10] = [
    "5CG", "5CD", "CND", "CNC", "CZC", "SCG", "SCD", "CNU", "8CC", "2CE",
];

/// Characters that follow the prefix
pub const SERIAL_SUFFIX_LEN: usize = 7;

// "SN", one separator character, one whitespace, then prefix + 7 characters.
static SERIAL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    let pattern = format!(
        r"SN.\s(?P<serial>(?:{}).{{{}}})",
        VENDOR_PREFIXES.join("|"),
        SERIAL_SUFFIX_LEN
    );
    Regex::new(&pattern).expect("serial pattern is valid")
});

/// Rewrite applied to an extracted serial
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SerialNormalization {
    /// Keep the token exactly as read
    #[default]
    Preserve,
    /// Read a leading 'S' as the digit '5'
    LeadingSToFive,
}

impl SerialNormalization {
    pub fn apply(self, token: &str) -> String {
        match self {
            Self::Preserve => token.to_string(),
            Self::LeadingSToFive => match token.strip_prefix('S') {
                Some(rest) => format!("5{}", rest),
                None => token.to_string(),
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ExtractionError {
    #[error("no line contains the serial marker")]
    NoMarkerLine,
    #[error("marker line does not contain a serial number")]
    NoMatch,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SerialExtractor {
    normalization: SerialNormalization,
}

impl SerialExtractor {
    pub fn new(normalization: SerialNormalization) -> Self {
        Self { normalization }
    }

    /// Find the serial number in recognized text.
    ///
    /// Only the first line containing [`SERIAL_MARKER`] is examined, and only
    /// the first match within it is used.
    pub fn extract(&self, text: &RecognizedText) -> Result<SerialNumber, ExtractionError> {
        let line = text
            .lines
            .iter()
            .find(|line| line.contains(SERIAL_MARKER))
            .ok_or(ExtractionError::NoMarkerLine)?;

        let token = SERIAL_PATTERN
            .captures(line)
            .and_then(|caps| caps.name("serial"))
            .ok_or(ExtractionError::NoMatch)?
            .as_str();

        Ok(SerialNumber::new_unchecked(self.normalization.apply(token)))
    }

    /// True if `value` has the shape of a serial number
    pub fn is_serial_shaped(value: &str) -> bool {
        VENDOR_PREFIXES.iter().any(|prefix| {
            value.starts_with(prefix) && value.chars().count() == prefix.len() + SERIAL_SUFFIX_LEN
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extract(lines: &[&str]) -> Result<SerialNumber, ExtractionError> {
        SerialExtractor::default().extract(&RecognizedText::new(lines.iter().copied()))
    }

    #[test]
    fn test_extracts_serial_from_marker_line() {
        let serial = extract(&["Model X200", "SN: 5CG1234567", "Other"]).unwrap();
        assert_eq!(serial.as_str(), "5CG1234567");
    }

    #[test]
    fn test_no_marker_line() {
        assert_eq!(
            extract(&["No serial here"]),
            Err(ExtractionError::NoMarkerLine)
        );
    }

    #[test]
    fn test_marker_line_without_serial() {
        assert_eq!(extract(&["SN: unknown"]), Err(ExtractionError::NoMatch));
        // unknown vendor prefix
        assert_eq!(extract(&["SN: ABC1234567"]), Err(ExtractionError::NoMatch));
        // missing separator and whitespace
        assert_eq!(extract(&["SN5CG1234567"]), Err(ExtractionError::NoMatch));
    }

    #[test]
    fn test_only_first_marker_line_is_considered() {
        // First "SN" line has no serial; the second one is never looked at.
        assert_eq!(
            extract(&["SNMP enabled", "SN: 5CG1234567"]),
            Err(ExtractionError::NoMatch)
        );
    }

    #[test]
    fn test_first_match_within_line() {
        let serial = extract(&["SN: CND7654321 SN: 5CG1234567"]).unwrap();
        assert_eq!(serial.as_str(), "CND7654321");
    }

    #[test]
    fn test_suffix_is_any_seven_characters() {
        let serial = extract(&["S/N# 2CEab-_x!9tail"]);
        // "S/" is not "SN", so no marker
        assert_eq!(serial, Err(ExtractionError::NoMarkerLine));

        let serial = extract(&["SN- 2CEab-_x!9tail"]).unwrap();
        assert_eq!(serial.as_str(), "2CEab-_x!9");
    }

    #[test]
    fn test_every_vendor_prefix() {
        for prefix in VENDOR_PREFIXES {
            let line = format!("SN: {}ABCDEFG", prefix);
            let serial = extract(&[line.as_str()]).unwrap();
            assert_eq!(serial.as_str(), format!("{}ABCDEFG", prefix));
            assert!(SerialExtractor::is_serial_shaped(serial.as_str()));
        }
    }

    #[test]
    fn test_normalization() {
        let text = RecognizedText::new(["SN: SCG1234567"]);

        let preserved = SerialExtractor::new(SerialNormalization::Preserve)
            .extract(&text)
            .unwrap();
        assert_eq!(preserved.as_str(), "SCG1234567");

        let normalized = SerialExtractor::new(SerialNormalization::LeadingSToFive)
            .extract(&text)
            .unwrap();
        assert_eq!(normalized.as_str(), "5CG1234567");
    }

    #[test]
    fn test_normalization_leaves_other_prefixes() {
        assert_eq!(
            SerialNormalization::LeadingSToFive.apply("CND1234567"),
            "CND1234567"
        );
    }

    #[test]
    fn test_is_serial_shaped() {
        assert!(SerialExtractor::is_serial_shaped("5CG1234567"));
        assert!(!SerialExtractor::is_serial_shaped("5CG123456"));
        assert!(!SerialExtractor::is_serial_shaped("XYZ1234567"));
    }
}
