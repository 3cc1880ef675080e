//! Path resolution over the page tree.
//!
//! [`Resolver`] walks down from the root, matching path segments against
//! child slugs. A page matches when its computed path equals the target and,
//! in live mode, it is published. When nothing below a page matches, the
//! page's first published file-not-found child answers instead (live mode),
//! or simply its first child (preview mode).
//!
//! Virtual pages never match, and nothing below them is reachable through
//! them.

use std::collections::HashSet;

use trellis_storage::{PageKey, PageRecord, Storage, StorageError};

use crate::node_kind::NodeKindRegistry;
use crate::page::{join, normalize};
use crate::status::StatusRegistry;

/// Default bound on descent depth.
pub const DEFAULT_MAX_DEPTH: usize = 64;

/// Visibility rules for resolution.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ResolveMode {
    /// Public traffic: only published pages match.
    #[default]
    Live,
    /// Editorial access: publish state is ignored.
    Preview,
}

/// Error resolving a path.
#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    #[error("Page tree has no root")]
    MissingRoot,
    #[error("Page tree loops back to page {0}")]
    Cycle(PageKey),
    #[error("Page tree is deeper than {0} levels")]
    DepthExceeded(usize),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Resolves URL paths to pages.
pub struct Resolver<'a> {
    storage: &'a dyn Storage,
    statuses: &'a StatusRegistry,
    kinds: &'a NodeKindRegistry,
    max_depth: usize,
}

struct Descent {
    mode: ResolveMode,
    visited: HashSet<PageKey>,
}

impl<'a> Resolver<'a> {
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
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    #[must_use]
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Find the page answering `target`, starting at `root`.
    ///
    /// Returns `Ok(None)` when nothing matches and no fallback page exists.
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError::MissingRoot`] when `root` is `None`, and
    /// [`ResolveError::Cycle`] or [`ResolveError::DepthExceeded`] when the
    /// stored tree is malformed.
    pub fn resolve(
        &self,
        root: Option<&PageRecord>,
        target: &str,
        mode: ResolveMode,
        normalize_target: bool,
    ) -> Result<Option<PageRecord>, ResolveError> {
        let root = root.ok_or(ResolveError::MissingRoot)?;
        let target = if normalize_target {
            normalize(target)
        } else {
            target.to_owned()
        };

        let mut descent = Descent {
            mode,
            visited: HashSet::new(),
        };
        let root_path = normalize(&root.slug);
        let found = self.descend(&mut descent, root, &root_path, &target, 0)?;

        match &found {
            Some(page) => tracing::debug!(path = %target, key = %page.key, ?mode, "Resolved path"),
            None => tracing::debug!(path = %target, ?mode, "No page for path"),
        }
        Ok(found)
    }

    fn descend(
        &self,
        descent: &mut Descent,
        node: &PageRecord,
        node_path: &str,
        path: &str,
        depth: usize,
    ) -> Result<Option<PageRecord>, ResolveError> {
        if depth > self.max_depth {
            return Err(ResolveError::DepthExceeded(self.max_depth));
        }
        if !descent.visited.insert(node.key) {
            return Err(ResolveError::Cycle(node.key));
        }
        if self.kinds.is_virtual(node) {
            return Ok(None);
        }

        if node_path == path && self.is_visible(node, descent.mode) {
            return Ok(Some(node.clone()));
        }

        let Some(rest) = path.strip_prefix(node_path) else {
            return Ok(None);
        };
        let segment = rest.split('/').next().unwrap_or_default();

        let slug_child = self.storage.child_by_slug(node.key, segment)?;
        if let Some(child) = &slug_child {
            let child_path = join(node_path, &child.slug);
            if let Some(found) = self.descend(descent, child, &child_path, path, depth + 1)? {
                return Ok(Some(found));
            }
        }

        let children = self.storage.children(node.key)?;
        let tried = slug_child.map(|child| child.key);
        for child in children.iter().filter(|child| Some(child.key) != tried) {
            let child_path = join(node_path, &child.slug);
            if let Some(found) = self.descend(descent, child, &child_path, path, depth + 1)? {
                return Ok(Some(found));
            }
        }

        Ok(self.fallback(node, children, descent.mode))
    }

    /// The child answering for a path nothing below `node` matched.
    fn fallback(
        &self,
        node: &PageRecord,
        children: Vec<PageRecord>,
        mode: ResolveMode,
    ) -> Option<PageRecord> {
        let fallback = match mode {
            ResolveMode::Live => children.into_iter().find(|child| {
                child.status_id == self.statuses.published().id()
                    && self.kinds.is_file_not_found(child.kind.as_deref())
            }),
            ResolveMode::Preview => children.into_iter().next(),
        };
        if let Some(child) = &fallback {
            tracing::debug!(parent = %node.key, fallback = %child.key, ?mode, "Using fallback page");
        }
        fallback
    }

    fn is_visible(&self, node: &PageRecord, mode: ResolveMode) -> bool {
        match mode {
            ResolveMode::Preview => true,
            ResolveMode::Live => node.status_id == self.statuses.published().id(),
        }
    }
}
