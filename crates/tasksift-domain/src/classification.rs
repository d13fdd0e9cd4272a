//! Classifier output correlated back to a single item

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One classifier verdict for one item.
///
/// The classifier's own field names vary (`type` vs `ad_type`, `minutes` vs
/// `effort_minutes`); aliases accept both and anything unrecognised is kept in
/// `extra`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ClassificationResult {
    /// Item identity; empty when the classifier omitted it
    #[serde(default, alias = "gid", alias = "task_id")]
    pub id: String,

    /// Work category (e.g. Drafting, Editing, Publishing, Planning)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,

    /// Work type (e.g. Article, Text Ad)
    #[serde(
        default,
        rename = "type",
        alias = "ad_type",
        alias = "kind",
        skip_serializing_if = "Option::is_none"
    )]
    pub kind: Option<String>,

    /// Effort estimate in minutes
    #[serde(
        default,
        alias = "minutes",
        alias = "effort",
        skip_serializing_if = "Option::is_none"
    )]
    pub effort_minutes: Option<f64>,

    /// Unrecognised classifier fields
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ClassificationResult {
    /// Create a result for the given item id
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Default::default()
        }
    }

    /// Set the category
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    /// Set the work type
    pub fn with_kind(mut self, kind: impl Into<String>) -> Self {
        self.kind = Some(kind.into());
        self
    }

    /// Set the effort estimate
    pub fn with_effort_minutes(mut self, minutes: f64) -> Self {
        self.effort_minutes = Some(minutes);
        self
    }

    /// Whether the result can be attributed to an item
    pub fn is_attributable(&self) -> bool {
        !self.id.trim().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aliases() {
        let result: ClassificationResult = serde_json::from_str(
            r#"{"gid": "55", "category": "Drafting", "ad_type": "Article", "minutes": 90, "confidence": "high"}"#,
        )
        .unwrap();

        assert_eq!(result.id, "55");
        assert_eq!(result.category.as_deref(), Some("Drafting"));
        assert_eq!(result.kind.as_deref(), Some("Article"));
        assert_eq!(result.effort_minutes, Some(90.0));
        assert_eq!(result.extra.get("confidence"), Some(&Value::from("high")));
    }

    #[test]
    fn test_missing_id_is_not_attributable() {
        let result: ClassificationResult = serde_json::from_str(r#"{"category": "Editing"}"#).unwrap();
        assert!(!result.is_attributable());
    }

    #[test]
    fn test_serialize_uses_type_field() {
        let result = ClassificationResult::new("1").with_kind("Text Ad");
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["type"], "Text Ad");
    }
}
