//! Training sample records.
//!
//! Datasets are JSON arrays of loosely-shaped objects; every field is
//! tolerated as missing or null. Accessors apply the defaulting rules:
//! missing text becomes the empty string, a missing importance flag is
//! `false`, and an absent or empty target label falls back to
//! [`DEFAULT_LABEL`].

use serde::Deserialize;

use crate::catalog::DEFAULT_LABEL;

/// One training row for the binary importance head.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ImportanceSample {
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    important: Option<bool>,
}

impl ImportanceSample {
    pub fn new(text: impl Into<String>, important: bool) -> Self {
        Self {
            text: Some(text.into()),
            important: Some(important),
        }
    }

    pub fn text(&self) -> &str {
        self.text.as_deref().unwrap_or("")
    }

    pub fn important(&self) -> bool {
        self.important.unwrap_or(false)
    }
}

/// One training row for the multi-class label router head.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RouterSample {
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    target_label: Option<String>,
}

impl RouterSample {
    pub fn new(text: impl Into<String>, target_label: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            target_label: Some(target_label.into()),
        }
    }

    pub fn text(&self) -> &str {
        self.text.as_deref().unwrap_or("")
    }

    /// The target label, defaulting absent/empty values to [`DEFAULT_LABEL`].
    pub fn label(&self) -> &str {
        match self.target_label.as_deref() {
            Some(label) if !label.is_empty() => label,
            _ => DEFAULT_LABEL,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn importance_defaults() {
        let rows: Vec<ImportanceSample> =
            serde_json::from_str(r#"[{}, {"text": null, "important": null}]"#).unwrap();
        for row in &rows {
            assert_eq!(row.text(), "");
            assert!(!row.important());
        }
    }

    #[test]
    fn importance_full_row() {
        let row: ImportanceSample =
            serde_json::from_str(r#"{"text": "disk full on prod", "important": true}"#).unwrap();
        assert_eq!(row.text(), "disk full on prod");
        assert!(row.important());
    }

    #[test]
    fn router_label_defaults_to_other() {
        let rows: Vec<RouterSample> =
            serde_json::from_str(r#"[{}, {"target_label": null}, {"target_label": ""}]"#).unwrap();
        for row in &rows {
            assert_eq!(row.label(), DEFAULT_LABEL);
        }
    }

    #[test]
    fn router_explicit_label() {
        let row: RouterSample =
            serde_json::from_str(r#"{"text": "card declined", "target_label": "billing"}"#)
                .unwrap();
        assert_eq!(row.text(), "card declined");
        assert_eq!(row.label(), "billing");
    }

    #[test]
    fn unknown_fields_are_ignored() {
        let row: RouterSample =
            serde_json::from_str(r#"{"text": "t", "target_label": "x", "extra": 1}"#).unwrap();
        assert_eq!(row.label(), "x");
    }
}
