//! Item module - the unit of work pulled from the task tracker

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A work item as returned by the remote source.
///
/// `id` is assigned by the source system and is the only field trusted for
/// identity comparison. Everything the core does not interpret lives in
/// `attributes`.
///
/// # Examples
///
/// ```
/// use tasksift_domain::Item;
///
/// let item = Item::new("1201", "Writer: Acme newsletter draft")
///     .with_owner("Julia")
///     .as_subunit();
///
/// assert_eq!(item.id, "1201");
/// assert!(item.is_subunit);
/// assert_eq!(item.owner.as_deref(), Some("Julia"));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    /// Source-assigned identifier (merge and de-duplication key)
    pub id: String,

    /// Human-readable label
    #[serde(default)]
    pub title: String,

    /// Responsible party, if assigned
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,

    /// Due date, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due: Option<NaiveDate>,

    /// True for leaf work items, false for grouping/parent items
    #[serde(default)]
    pub is_subunit: bool,

    /// Auxiliary fields carried through untouched
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub attributes: Map<String, Value>,
}

impl Item {
    /// Create an item with the given identity and title
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            owner: None,
            due: None,
            is_subunit: false,
            attributes: Map::new(),
        }
    }

    /// Set the owner
    pub fn with_owner(mut self, owner: impl Into<String>) -> Self {
        self.owner = Some(owner.into());
        self
    }

    /// Set the due date
    pub fn with_due(mut self, due: NaiveDate) -> Self {
        self.due = Some(due);
        self
    }

    /// Mark the item as a subunit (leaf work item)
    pub fn as_subunit(mut self) -> Self {
        self.is_subunit = true;
        self
    }

    /// Attach an auxiliary attribute
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    /// Read a string attribute
    pub fn attribute_str(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).and_then(Value::as_str)
    }

    /// Whether the item carries a usable identity
    pub fn has_identity(&self) -> bool {
        !self.id.trim().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_item_serde_skips_empty_optionals() {
        let item = Item::new("1", "Plan Q3");
        let json = serde_json::to_value(&item).unwrap();

        assert_eq!(json["id"], "1");
        assert!(json.get("owner").is_none());
        assert!(json.get("due").is_none());
        assert!(json.get("attributes").is_none());
    }

    #[test]
    fn test_item_deserialize_with_defaults() {
        let item: Item = serde_json::from_str(r#"{"id": "42", "due": "2025-05-01"}"#).unwrap();

        assert_eq!(item.title, "");
        assert!(!item.is_subunit);
        assert_eq!(item.due, NaiveDate::from_ymd_opt(2025, 5, 1));
    }

    #[test]
    fn test_attributes() {
        let item = Item::new("7", "Edit copy").with_attribute("permalink_url", "https://x/7");

        assert_eq!(item.attribute_str("permalink_url"), Some("https://x/7"));
        assert_eq!(item.attribute_str("missing"), None);
    }

    #[test]
    fn test_identity() {
        assert!(Item::new("9", "").has_identity());
        assert!(!Item::new("  ", "untitled").has_identity());
    }

    proptest! {
        #[test]
        fn prop_identity_requires_visible_id(id in "[ \t]{0,4}[a-z0-9]{0,6}[ \t]{0,4}") {
            let item = Item::new(id.clone(), "x");
            prop_assert_eq!(item.has_identity(), !id.trim().is_empty());
        }
    }
}
