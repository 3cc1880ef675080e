//! Storage trait and error types.
//!
//! Provides the core [`Storage`] trait for tree traversal and persistence,
//! along with [`StorageError`] for unified error handling across backends.
//!
//! # Ordering
//!
//! `children()` must return children in a stable, meaningful order (creation
//! order for [`MemoryStorage`](crate::MemoryStorage)). Path resolution uses it
//! as its tie-break order, so a backend that shuffles children changes which
//! page answers a request.

use std::collections::HashSet;

use crate::record::{PageKey, PageRecord, PartRecord};

/// Semantic error categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum StorageErrorKind {
    /// Page does not exist.
    NotFound,
    /// A page with the same key already exists.
    AlreadyExists,
    /// Update carried a stale `lock_version`.
    Conflict,
    /// Parent links loop back on themselves.
    Cycle,
    /// Backend is temporarily unavailable.
    Unavailable,
    /// Other/unknown error category.
    Other,
}

/// Storage error with semantic kind and backend-specific source.
#[derive(Debug)]
pub struct StorageError {
    kind: StorageErrorKind,
    key: Option<PageKey>,
    backend: Option<&'static str>,
    message: Option<String>,
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl StorageError {
    /// Create a new storage error.
    #[must_use]
    pub fn new(kind: StorageErrorKind) -> Self {
        Self {
            kind,
            key: None,
            backend: None,
            message: None,
            source: None,
        }
    }

    /// Create a not found error for a page key.
    #[must_use]
    pub fn not_found(key: PageKey) -> Self {
        Self::new(StorageErrorKind::NotFound).with_key(key)
    }

    /// Attach page key context.
    #[must_use]
    pub fn with_key(mut self, key: PageKey) -> Self {
        self.key = Some(key);
        self
    }

    /// Attach backend identifier.
    #[must_use]
    pub fn with_backend(mut self, backend: &'static str) -> Self {
        self.backend = Some(backend);
        self
    }

    /// Attach a human-readable detail message.
    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Attach the underlying error source.
    #[must_use]
    pub fn with_source(mut self, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    #[must_use]
    pub fn kind(&self) -> StorageErrorKind {
        self.kind
    }

    #[must_use]
    pub fn key(&self) -> Option<PageKey> {
        self.key
    }

    #[must_use]
    pub fn backend(&self) -> Option<&'static str> {
        self.backend
    }
}

impl std::fmt::Display for StorageError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Format: "[Backend] Kind: message (key: ...)"
        if let Some(backend) = self.backend {
            write!(f, "[{backend}] ")?;
        }

        let kind_str = match self.kind {
            StorageErrorKind::NotFound => "Not found",
            StorageErrorKind::AlreadyExists => "Already exists",
            StorageErrorKind::Conflict => "Conflict",
            StorageErrorKind::Cycle => "Cycle in parent links",
            StorageErrorKind::Unavailable => "Unavailable",
            StorageErrorKind::Other => "Error",
        };

        write!(f, "{kind_str}")?;

        if let Some(message) = &self.message {
            write!(f, ": {message}")?;
        } else if let Some(source) = &self.source {
            write!(f, ": {source}")?;
        }

        if let Some(key) = &self.key {
            write!(f, " (key: {key})")?;
        }

        Ok(())
    }
}

impl std::error::Error for StorageError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|s| s.as_ref() as &(dyn std::error::Error + 'static))
    }
}

/// Page tree access and persistence.
///
/// Read methods return snapshots; callers must not assume two calls observe
/// the same tree if another writer is active. Write methods implement the
/// persistence contract: `insert` and `update` store parts alongside the page,
/// `delete` cascades to parts and descendants.
pub trait Storage: Send + Sync {
    /// The first parentless page in creation order.
    fn root(&self) -> Result<Option<PageRecord>, StorageError>;

    /// Look up a page by key.
    fn get(&self, key: PageKey) -> Result<Option<PageRecord>, StorageError>;

    /// Direct children of a page in stored order.
    fn children(&self, key: PageKey) -> Result<Vec<PageRecord>, StorageError>;

    /// The direct child whose slug equals `slug` exactly.
    fn child_by_slug(&self, key: PageKey, slug: &str) -> Result<Option<PageRecord>, StorageError> {
        Ok(self
            .children(key)?
            .into_iter()
            .find(|child| child.slug == slug))
    }

    /// Ancestors of a page, from the immediate parent up to the root.
    ///
    /// # Errors
    ///
    /// Returns `StorageErrorKind::NotFound` if the page or a linked parent is
    /// missing, and `StorageErrorKind::Cycle` if parent links loop.
    fn ancestors(&self, key: PageKey) -> Result<Vec<PageRecord>, StorageError> {
        let page = self.get(key)?.ok_or_else(|| StorageError::not_found(key))?;

        let mut seen = HashSet::from([key]);
        let mut chain = Vec::new();
        let mut next = page.parent;
        while let Some(parent_key) = next {
            if !seen.insert(parent_key) {
                return Err(StorageError::new(StorageErrorKind::Cycle).with_key(parent_key));
            }
            let parent = self
                .get(parent_key)?
                .ok_or_else(|| StorageError::not_found(parent_key))?;
            next = parent.parent;
            chain.push(parent);
        }

        Ok(chain)
    }

    /// Parts of a page in creation order.
    fn parts(&self, key: PageKey) -> Result<Vec<PartRecord>, StorageError>;

    /// First part of a page with the given name.
    fn part(&self, key: PageKey, name: &str) -> Result<Option<PartRecord>, StorageError> {
        Ok(self.parts(key)?.into_iter().find(|part| part.name == name))
    }

    /// Whether a sibling under `parent` (or among parentless pages) already
    /// uses `slug`, ignoring the page `except`.
    fn slug_taken(
        &self,
        parent: Option<PageKey>,
        slug: &str,
        except: Option<PageKey>,
    ) -> Result<bool, StorageError>;

    /// Store a new page with its parts. Returns the stored record.
    fn insert(&self, page: &PageRecord, parts: &[PartRecord]) -> Result<PageRecord, StorageError>;

    /// Update an existing page. `parts`, when given, replaces the stored set.
    ///
    /// # Errors
    ///
    /// Returns `StorageErrorKind::Conflict` when `page.lock_version` does not
    /// match the stored version.
    fn update(
        &self,
        page: &PageRecord,
        parts: Option<&[PartRecord]>,
    ) -> Result<PageRecord, StorageError>;

    /// Delete a page, its parts and all of its descendants.
    fn delete(&self, key: PageKey) -> Result<(), StorageError>;
}
