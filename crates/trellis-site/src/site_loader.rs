//! Page tree loading from YAML.
//!
//! A tree file describes the root page with its children nested below it:
//!
//! ```yaml
//! title: Home
//! slug: /
//! parts:
//!   - name: body
//!     content: Welcome!
//! children:
//!   - title: About
//!     slug: about
//!     status: draft
//!   - title: Not Found
//!     slug: missing
//!     kind: FileNotFoundPage
//! ```
//!
//! Every page goes through [`Page::save`], so the status rule and validation
//! apply exactly as they would for an editor's save. `status` accepts a
//! symbol (`draft`) or a numeric id (`1`); pages without one get the
//! registry's published status.

use std::path::{Path, PathBuf};
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use trellis_storage::{PartRecord, Storage, StorageError};

use crate::node_kind::NodeKindRegistry;
use crate::page::{Page, SaveError, join};
use crate::status::{Status, StatusRegistry};
use crate::validation::ValidationErrors;

/// Convert Duration to milliseconds as f64.
fn elapsed_ms(start: Instant) -> f64 {
    start.elapsed().as_secs_f64() * 1000.0
}

/// Error loading a tree file.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("Failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Invalid page tree: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("Unknown status {status:?} at {location}")]
    UnknownStatus { location: String, status: String },
    #[error("Invalid page at {location}: {source}")]
    Invalid {
        location: String,
        source: ValidationErrors,
    },
    #[error(transparent)]
    Storage(#[from] StorageError),
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum StatusRef {
    Id(u16),
    Symbol(String),
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct PartEntry {
    name: String,
    #[serde(default)]
    content: String,
    filter: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct PageEntry {
    title: String,
    slug: String,
    breadcrumb: Option<String>,
    status: Option<StatusRef>,
    published_at: Option<DateTime<Utc>>,
    #[serde(default, rename = "virtual")]
    is_virtual: bool,
    kind: Option<String>,
    #[serde(default)]
    parts: Vec<PartEntry>,
    #[serde(default)]
    children: Vec<PageEntry>,
}

/// Loads YAML page trees into a [`Storage`].
pub struct SiteLoader<'a> {
    storage: &'a dyn Storage,
    statuses: &'a StatusRegistry,
    kinds: &'a NodeKindRegistry,
}

impl<'a> SiteLoader<'a> {
    #[must_use]
    pub fn new(
        storage: &'a dyn Storage,
        statuses: &'a StatusRegistry,
        kinds: &'a NodeKindRegistry,
    ) -> Self {
        Self {
            storage,
            statuses,
            kinds,
        }
    }

    /// Load a tree file. Returns the saved root page.
    pub fn load_file(&self, path: &Path) -> Result<Page, LoadError> {
        let source = std::fs::read_to_string(path).map_err(|source| LoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        tracing::info!(path = %path.display(), "Loading page tree");
        self.load_str(&source)
    }

    /// Load a tree from YAML text. Returns the saved root page.
    ///
    /// Pages are saved parent first, so a failure part way leaves the pages
    /// saved so far in storage.
    pub fn load_str(&self, source: &str) -> Result<Page, LoadError> {
        let start = Instant::now();
        let entry: PageEntry = serde_yaml::from_str(source)?;

        let mut count = 0;
        let root = self.save_entry(entry, None, "", &mut count)?;

        tracing::info!(
            pages = count,
            elapsed_ms = elapsed_ms(start),
            "Loaded page tree"
        );
        Ok(root)
    }

    fn save_entry(
        &self,
        entry: PageEntry,
        parent: Option<&Page>,
        parent_location: &str,
        count: &mut usize,
    ) -> Result<Page, LoadError> {
        let location = join(parent_location, &entry.slug);

        let mut page =
            Page::new_in(self.statuses, entry.title, entry.slug).with_virtual(entry.is_virtual);
        if let Some(parent) = parent {
            page = page.with_parent(parent.key());
        }
        if let Some(breadcrumb) = entry.breadcrumb {
            page = page.with_breadcrumb(breadcrumb);
        }
        if let Some(status) = &entry.status {
            page.set_status(self.status(status, &location)?);
        }
        page.set_published_at(entry.published_at);
        if let Some(kind) = entry.kind {
            page = page.with_kind(kind);
        }

        let mut seen = Vec::new();
        for part in entry.parts {
            if seen.contains(&part.name) {
                tracing::warn!(page = %location, part = %part.name, "Duplicate part name, first one wins");
            } else {
                seen.push(part.name.clone());
            }
            let mut record = PartRecord::new(part.name, part.content);
            record.filter_id = part.filter;
            page = page.with_part(record);
        }

        page.save(self.storage, self.statuses, self.kinds)
            .map_err(|e| match e {
                SaveError::Invalid(source) => LoadError::Invalid {
                    location: location.clone(),
                    source,
                },
                SaveError::Storage(e) => LoadError::Storage(e),
            })?;
        *count += 1;
        tracing::debug!(page = %location, key = %page.key(), "Loaded page");

        for child in entry.children {
            self.save_entry(child, Some(&page), &location, count)?;
        }
        Ok(page)
    }

    fn status(&self, status: &StatusRef, location: &str) -> Result<&'a Status, LoadError> {
        let found = match status {
            StatusRef::Id(id) => self.statuses.find(*id),
            StatusRef::Symbol(symbol) => self
                .statuses
                .lookup(symbol)
                .or_else(|| self.statuses.find_str(symbol)),
        };
        found.ok_or_else(|| LoadError::UnknownStatus {
            location: location.to_owned(),
            status: match status {
                StatusRef::Id(id) => id.to_string(),
                StatusRef::Symbol(symbol) => symbol.clone(),
            },
        })
    }
}
