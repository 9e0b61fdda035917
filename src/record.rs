use std::collections::HashMap;

use serde::Deserialize;

use crate::validator::{FormErrors, RecordReader};

/// A submitted form record: field values plus the errors attached while
/// validating it.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormRecord {
    pub form_id: String,
    /// Primary key; absent or empty for a record that has not been saved.
    #[serde(default, rename = "id")]
    pub primary_key: Option<String>,
    #[serde(default)]
    pub values: HashMap<String, String>,
    #[serde(skip)]
    errors: HashMap<String, Vec<String>>,
}

impl FormRecord {
    pub fn new(form_id: impl Into<String>) -> Self {
        Self {
            form_id: form_id.into(),
            ..Self::default()
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.primary_key = Some(id.into());
        self
    }

    pub fn with_value(mut self, field_id: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.insert(field_id.into(), value.into());
        self
    }

    pub fn errors(&self, field_id: &str) -> &[String] {
        self.errors.get(field_id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn has_errors(&self) -> bool {
        self.errors.values().any(|e| !e.is_empty())
    }
}

impl RecordReader for FormRecord {
    fn form_id(&self) -> &str {
        &self.form_id
    }

    fn primary_key(&self) -> Option<&str> {
        self.primary_key.as_deref()
    }

    fn value(&self, field_id: &str) -> Option<&str> {
        self.values.get(field_id).map(String::as_str)
    }
}

impl FormErrors for FormRecord {
    fn add_error(&mut self, field_id: &str, message: String) {
        self.errors.entry(field_id.to_string()).or_default().push(message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_and_reader() {
        let record = FormRecord::new("booking")
            .with_id("r1")
            .with_value("room", "Room1");
        assert_eq!(record.form_id(), "booking");
        assert_eq!(record.primary_key(), Some("r1"));
        assert_eq!(record.value("room"), Some("Room1"));
        assert_eq!(record.value("missing"), None);
    }

    #[test]
    fn errors_accumulate_per_field() {
        let mut record = FormRecord::new("booking");
        assert!(!record.has_errors());
        record.add_error("start", "first".into());
        record.add_error("start", "second".into());
        assert_eq!(record.errors("start"), ["first", "second"]);
        assert!(record.errors("end").is_empty());
        assert!(record.has_errors());
    }

    #[test]
    fn deserializes_from_json() {
        let record: FormRecord = serde_json::from_str(
            r#"{"formId": "booking", "id": "abc", "values": {"start": "2024-01-01 09:00"}}"#,
        )
        .unwrap();
        assert_eq!(record.primary_key(), Some("abc"));
        assert_eq!(record.value("start"), Some("2024-01-01 09:00"));

        let new: FormRecord = serde_json::from_str(r#"{"formId": "booking"}"#).unwrap();
        assert_eq!(new.primary_key(), None);
    }
}
