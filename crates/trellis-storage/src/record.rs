//! Persisted page and part records.
//!
//! These are plain data types. Validation, the status lifecycle and path
//! computation live in `trellis-site`; a backend only stores what it is given.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Opaque unique key of a page, assigned when the record is created.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PageKey(Uuid);

impl PageKey {
    /// Generate a fresh random key.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Wrap an existing UUID (e.g. one read back from a database).
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for PageKey {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for PageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Persisted page node.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRecord {
    /// Unique key.
    pub key: PageKey,
    /// Parent page, `None` for the root.
    pub parent: Option<PageKey>,
    /// Page title.
    pub title: String,
    /// URL segment of this page (`/` for the root).
    pub slug: String,
    /// Short label used in breadcrumb trails.
    pub breadcrumb: String,
    /// Lifecycle status id.
    pub status_id: u16,
    /// Publication timestamp; a future value schedules the page.
    pub published_at: Option<DateTime<Utc>>,
    /// Virtual pages never match a path directly.
    #[serde(rename = "virtual")]
    pub is_virtual: bool,
    /// Node-kind tag. `None`, `""` and `"Page"` all mean the base kind.
    pub kind: Option<String>,
    /// Optimistic lock counter, bumped by the store on every update.
    pub lock_version: u32,
    /// Set by the store on insert.
    pub created_at: Option<DateTime<Utc>>,
    /// Set by the store on insert and update.
    pub updated_at: Option<DateTime<Utc>>,
}

impl PageRecord {
    /// Status id given to records that don't set one: Published in the
    /// standard status table. Callers with a custom table set it themselves.
    pub const DEFAULT_STATUS_ID: u16 = 100;

    /// Create an unsaved root-level record with a fresh key.
    ///
    /// The breadcrumb defaults to the title.
    #[must_use]
    pub fn new(title: impl Into<String>, slug: impl Into<String>) -> Self {
        let title = title.into();
        Self {
            key: PageKey::new(),
            parent: None,
            breadcrumb: title.clone(),
            title,
            slug: slug.into(),
            status_id: Self::DEFAULT_STATUS_ID,
            published_at: None,
            is_virtual: false,
            kind: None,
            lock_version: 0,
            created_at: None,
            updated_at: None,
        }
    }

    #[must_use]
    pub fn with_parent(mut self, parent: PageKey) -> Self {
        self.parent = Some(parent);
        self
    }

    #[must_use]
    pub fn with_breadcrumb(mut self, breadcrumb: impl Into<String>) -> Self {
        self.breadcrumb = breadcrumb.into();
        self
    }

    #[must_use]
    pub fn with_status_id(mut self, status_id: u16) -> Self {
        self.status_id = status_id;
        self
    }

    #[must_use]
    pub fn with_published_at(mut self, published_at: DateTime<Utc>) -> Self {
        self.published_at = Some(published_at);
        self
    }

    #[must_use]
    pub fn with_kind(mut self, kind: impl Into<String>) -> Self {
        self.kind = Some(kind.into());
        self
    }

    #[must_use]
    pub fn with_virtual(mut self, is_virtual: bool) -> Self {
        self.is_virtual = is_virtual;
        self
    }
}

/// Persisted named content fragment of a page.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartRecord {
    /// Part name (e.g. `body`, `sidebar`).
    pub name: String,
    /// Raw content, never interpreted by the engine.
    #[serde(default)]
    pub content: String,
    /// Name of an external content filter.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter_id: Option<String>,
}

impl PartRecord {
    #[must_use]
    pub fn new(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            content: content.into(),
            filter_id: None,
        }
    }

    #[must_use]
    pub fn with_filter(mut self, filter_id: impl Into<String>) -> Self {
        self.filter_id = Some(filter_id.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_record_defaults() {
        let record = PageRecord::new("About", "about");

        assert_eq!(record.title, "About");
        assert_eq!(record.slug, "about");
        assert_eq!(record.breadcrumb, "About");
        assert_eq!(record.status_id, PageRecord::DEFAULT_STATUS_ID);
        assert!(record.parent.is_none());
        assert!(record.published_at.is_none());
        assert!(!record.is_virtual);
        assert!(record.kind.is_none());
        assert_eq!(record.lock_version, 0);
    }

    #[test]
    fn test_new_records_get_distinct_keys() {
        let a = PageRecord::new("A", "a");
        let b = PageRecord::new("B", "b");

        assert_ne!(a.key, b.key);
    }

    #[test]
    fn test_builder_methods() {
        let parent = PageKey::new();
        let record = PageRecord::new("Missing", "missing")
            .with_parent(parent)
            .with_breadcrumb("404")
            .with_status_id(1)
            .with_kind("FileNotFoundPage")
            .with_virtual(true);

        assert_eq!(record.parent, Some(parent));
        assert_eq!(record.breadcrumb, "404");
        assert_eq!(record.status_id, 1);
        assert_eq!(record.kind.as_deref(), Some("FileNotFoundPage"));
        assert!(record.is_virtual);
    }

    #[test]
    fn test_page_key_serializes_as_plain_uuid() {
        let key = PageKey::new();
        let json = serde_json::to_string(&key).unwrap();

        assert_eq!(json, format!("\"{key}\""));
    }

    #[test]
    fn test_virtual_field_renamed() {
        let record = PageRecord::new("Home", "/").with_virtual(true);
        let json = serde_json::to_value(&record).unwrap();

        assert_eq!(json["virtual"], serde_json::json!(true));
    }

    #[test]
    fn test_part_with_filter() {
        let part = PartRecord::new("body", "Hello").with_filter("markdown");

        assert_eq!(part.name, "body");
        assert_eq!(part.content, "Hello");
        assert_eq!(part.filter_id.as_deref(), Some("markdown"));
    }
}
