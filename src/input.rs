#![forbid(unsafe_code)]

use crate::error::{BoardError, Result};

/// Trimmed value of a required text field.
pub(crate) fn required(field: &str, value: Option<String>) -> Result<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_owned)
        .ok_or_else(|| BoardError::validation(format!("{field} is required")))
}

/// Optional text field; blank input means "no value".
pub(crate) fn optional(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn required_fields_reject_missing_and_blank() {
        assert!(required("name", None).is_err());
        assert!(required("name", Some("  ".to_owned())).is_err());
        assert_eq!(required("name", Some(" Website ".to_owned())).unwrap(), "Website");
    }

    #[test]
    fn blank_optional_fields_are_dropped() {
        assert_eq!(optional(Some(String::new())), None);
        assert_eq!(optional(Some("x".to_owned())).as_deref(), Some("x"));
    }
}
