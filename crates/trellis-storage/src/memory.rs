//! In-memory storage backend.
//!
//! Provides [`MemoryStorage`], used by tests, benchmarks and the CLI (which
//! loads a YAML tree into it).

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::Utc;

use crate::record::{PageKey, PageRecord, PartRecord};
use crate::storage::{Storage, StorageError, StorageErrorKind};

/// Backend identifier for error messages.
const BACKEND: &str = "Memory";

#[derive(Debug, Default)]
struct Tree {
    /// Pages in creation order.
    pages: Vec<PageRecord>,
    parts: HashMap<PageKey, Vec<PartRecord>>,
}

impl Tree {
    fn position(&self, key: PageKey) -> Option<usize> {
        self.pages.iter().position(|page| page.key == key)
    }

    fn find(&self, key: PageKey) -> Option<&PageRecord> {
        self.pages.iter().find(|page| page.key == key)
    }

    /// Fail if attaching `key` under `parent` would leave a dangling or
    /// looping parent link.
    fn check_parent(&self, key: PageKey, parent: Option<PageKey>) -> Result<(), StorageError> {
        let mut seen = HashSet::new();
        let mut next = parent;
        while let Some(current) = next {
            if current == key || !seen.insert(current) {
                return Err(StorageError::new(StorageErrorKind::Cycle)
                    .with_backend(BACKEND)
                    .with_key(key));
            }
            let Some(page) = self.find(current) else {
                return Err(StorageError::new(StorageErrorKind::NotFound)
                    .with_backend(BACKEND)
                    .with_message(format!("parent {current} does not exist"))
                    .with_key(key));
            };
            next = page.parent;
        }
        Ok(())
    }
}

/// Page tree held in memory.
///
/// Children are returned in insertion order, which makes the resolution
/// tie-break order the order pages were created in.
///
/// # Example
///
/// ```
/// use trellis_storage::{MemoryStorage, PageRecord, PartRecord, Storage};
///
/// let home = PageRecord::new("Home", "/");
/// let about = PageRecord::new("About", "about").with_parent(home.key);
/// let storage = MemoryStorage::new()
///     .with_page(home.clone(), vec![PartRecord::new("body", "Welcome")])
///     .with_page(about, vec![]);
///
/// assert_eq!(storage.children(home.key)?.len(), 1);
/// # Ok::<(), trellis_storage::StorageError>(())
/// ```
#[derive(Debug, Default)]
pub struct MemoryStorage {
    tree: RwLock<Tree>,
}

impl MemoryStorage {
    /// Create a new empty storage.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a page with its parts.
    ///
    /// # Panics
    ///
    /// Panics if the page cannot be inserted (duplicate key or missing parent).
    #[must_use]
    pub fn with_page(self, page: PageRecord, parts: Vec<PartRecord>) -> Self {
        if let Err(e) = self.insert(&page, &parts) {
            panic!("MemoryStorage::with_page: {e}");
        }
        self
    }

    /// Number of stored pages.
    #[must_use]
    pub fn len(&self) -> usize {
        self.read().map_or(0, |tree| tree.pages.len())
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Overwrite a stored parent link without any checks.
    ///
    /// Only meant for exercising corrupted trees in tests.
    #[doc(hidden)]
    pub fn force_parent(&self, key: PageKey, parent: Option<PageKey>) -> Result<(), StorageError> {
        let mut tree = self.write()?;
        let idx = tree.position(key).ok_or_else(|| not_found(key))?;
        tree.pages[idx].parent = parent;
        Ok(())
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Tree>, StorageError> {
        self.tree.read().map_err(|_| poisoned())
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Tree>, StorageError> {
        self.tree.write().map_err(|_| poisoned())
    }
}

fn not_found(key: PageKey) -> StorageError {
    StorageError::not_found(key).with_backend(BACKEND)
}

fn poisoned() -> StorageError {
    StorageError::new(StorageErrorKind::Unavailable)
        .with_backend(BACKEND)
        .with_message("lock poisoned")
}

impl Storage for MemoryStorage {
    fn root(&self) -> Result<Option<PageRecord>, StorageError> {
        Ok(self
            .read()?
            .pages
            .iter()
            .find(|page| page.parent.is_none())
            .cloned())
    }

    fn get(&self, key: PageKey) -> Result<Option<PageRecord>, StorageError> {
        Ok(self.read()?.find(key).cloned())
    }

    fn children(&self, key: PageKey) -> Result<Vec<PageRecord>, StorageError> {
        Ok(self
            .read()?
            .pages
            .iter()
            .filter(|page| page.parent == Some(key))
            .cloned()
            .collect())
    }

    fn parts(&self, key: PageKey) -> Result<Vec<PartRecord>, StorageError> {
        let tree = self.read()?;
        if tree.find(key).is_none() {
            return Err(not_found(key));
        }
        Ok(tree.parts.get(&key).cloned().unwrap_or_default())
    }

    fn slug_taken(
        &self,
        parent: Option<PageKey>,
        slug: &str,
        except: Option<PageKey>,
    ) -> Result<bool, StorageError> {
        Ok(self
            .read()?
            .pages
            .iter()
            .any(|page| page.parent == parent && page.slug == slug && Some(page.key) != except))
    }

    fn insert(&self, page: &PageRecord, parts: &[PartRecord]) -> Result<PageRecord, StorageError> {
        let mut tree = self.write()?;
        if tree.find(page.key).is_some() {
            return Err(StorageError::new(StorageErrorKind::AlreadyExists)
                .with_backend(BACKEND)
                .with_key(page.key));
        }
        tree.check_parent(page.key, page.parent)?;

        let now = Utc::now();
        let mut stored = page.clone();
        stored.created_at.get_or_insert(now);
        stored.updated_at = Some(now);

        tree.parts.insert(stored.key, parts.to_vec());
        tree.pages.push(stored.clone());
        tracing::debug!(key = %stored.key, slug = %stored.slug, "Inserted page");
        Ok(stored)
    }

    fn update(
        &self,
        page: &PageRecord,
        parts: Option<&[PartRecord]>,
    ) -> Result<PageRecord, StorageError> {
        let mut tree = self.write()?;
        let idx = tree.position(page.key).ok_or_else(|| not_found(page.key))?;

        let current = &tree.pages[idx];
        if current.lock_version != page.lock_version {
            return Err(StorageError::new(StorageErrorKind::Conflict)
                .with_backend(BACKEND)
                .with_message(format!(
                    "stale lock_version {} (stored {})",
                    page.lock_version, current.lock_version
                ))
                .with_key(page.key));
        }
        if current.parent != page.parent {
            tree.check_parent(page.key, page.parent)?;
        }

        let mut stored = page.clone();
        stored.created_at = tree.pages[idx].created_at;
        stored.updated_at = Some(Utc::now());
        stored.lock_version += 1;
        tree.pages[idx] = stored.clone();

        if let Some(parts) = parts {
            tree.parts.insert(stored.key, parts.to_vec());
        }
        tracing::debug!(key = %stored.key, version = stored.lock_version, "Updated page");
        Ok(stored)
    }

    fn delete(&self, key: PageKey) -> Result<(), StorageError> {
        let mut tree = self.write()?;
        if tree.find(key).is_none() {
            return Err(not_found(key));
        }

        let mut doomed = HashSet::from([key]);
        let mut queue = VecDeque::from([key]);
        while let Some(current) = queue.pop_front() {
            for page in &tree.pages {
                if page.parent == Some(current) && doomed.insert(page.key) {
                    queue.push_back(page.key);
                }
            }
        }

        tree.pages.retain(|page| !doomed.contains(&page.key));
        tree.parts.retain(|page_key, _| !doomed.contains(page_key));
        tracing::debug!(key = %key, removed = doomed.len(), "Deleted page subtree");
        Ok(())
    }
}
