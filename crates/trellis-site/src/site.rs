//! Site facade: path resolution and rendering behind one type.
//!
//! [`Site`] owns the storage handle and the status and node-kind registries,
//! and exposes the operations an HTTP layer needs:
//!
//! - [`Site::resolve_path`] finds the page for a path, distinguishing a tree
//!   without a root from a path nothing answers.
//! - [`Site::render`] turns a page into a [`Response`].
//! - [`Site::serve`] does both for one request.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use trellis_site::{RequestContext, Site};
//! use trellis_storage::{MemoryStorage, PageRecord, PartRecord};
//!
//! let home = PageRecord::new("Home", "/");
//! let storage = MemoryStorage::new()
//!     .with_page(home, vec![PartRecord::new("body", "Hello world!")]);
//! let site = Site::new(Arc::new(storage));
//!
//! let response = site.serve(&RequestContext::new("/"))?;
//! assert_eq!(response.body, "Hello world!");
//! assert_eq!(response.status_code, 200);
//! # Ok::<(), trellis_site::SiteError>(())
//! ```

use std::collections::HashSet;
use std::sync::Arc;

use serde::Serialize;
use trellis_storage::{PageKey, PageRecord, Storage, StorageError};

use crate::node_kind::{Headers, NodeKindRegistry};
use crate::page::{Page, join, normalize};
use crate::renderer::{RenderPipeline, RequestContext, Response};
use crate::resolver::{DEFAULT_MAX_DEPTH, ResolveError, ResolveMode, Resolver};
use crate::status::StatusRegistry;

/// Configuration for [`Site`].
#[derive(Clone, Debug)]
pub struct SiteConfig {
    /// Bound on resolution depth.
    pub max_depth: usize,
    /// Normalize request paths before resolving.
    pub normalize: bool,
    /// Render parts inherited from ancestors when a page lacks its own.
    pub inherit_parts: bool,
    /// Headers added to every response.
    pub default_headers: Headers,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            normalize: true,
            inherit_parts: false,
            default_headers: Headers::new(),
        }
    }
}

/// Error returned by [`Site`] operations.
#[derive(Debug, thiserror::Error)]
pub enum SiteError {
    /// The tree has no root page.
    #[error("Page tree has no root")]
    MissingRoot,
    /// No page answers the path and no fallback page exists.
    #[error("Page not found: {0}")]
    NotFound(String),
    #[error(transparent)]
    Resolve(ResolveError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl From<ResolveError> for SiteError {
    fn from(e: ResolveError) -> Self {
        match e {
            ResolveError::MissingRoot => Self::MissingRoot,
            ResolveError::Storage(e) => Self::Storage(e),
            e => Self::Resolve(e),
        }
    }
}

/// Breadcrumb navigation item.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct BreadcrumbItem {
    /// Display title.
    pub title: String,
    /// Link target path.
    pub path: String,
}

/// One page in a tree outline.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct OutlineItem {
    pub title: String,
    pub path: String,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(rename = "virtual")]
    pub is_virtual: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<OutlineItem>,
}

/// Page tree with resolution and rendering.
pub struct Site {
    storage: Arc<dyn Storage>,
    statuses: StatusRegistry,
    kinds: NodeKindRegistry,
    pipeline: RenderPipeline,
    max_depth: usize,
    normalize: bool,
}

impl Site {
    /// Site over `storage` with the standard registries and default config.
    #[must_use]
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self::with_config(storage, SiteConfig::default())
    }

    #[must_use]
    pub fn with_config(storage: Arc<dyn Storage>, config: SiteConfig) -> Self {
        Self {
            storage,
            statuses: StatusRegistry::standard(),
            kinds: NodeKindRegistry::standard(),
            pipeline: RenderPipeline::new()
                .with_default_headers(config.default_headers)
                .with_inherit_parts(config.inherit_parts),
            max_depth: config.max_depth,
            normalize: config.normalize,
        }
    }

    /// Replace the status registry.
    #[must_use]
    pub fn with_statuses(mut self, statuses: StatusRegistry) -> Self {
        self.statuses = statuses;
        self
    }

    /// Replace the node-kind registry.
    #[must_use]
    pub fn with_kinds(mut self, kinds: NodeKindRegistry) -> Self {
        self.kinds = kinds;
        self
    }

    #[must_use]
    pub fn storage(&self) -> &dyn Storage {
        self.storage.as_ref()
    }

    #[must_use]
    pub fn statuses(&self) -> &StatusRegistry {
        &self.statuses
    }

    #[must_use]
    pub fn kinds(&self) -> &NodeKindRegistry {
        &self.kinds
    }

    /// Find the page answering `path`.
    ///
    /// # Errors
    ///
    /// Returns [`SiteError::MissingRoot`] if the tree is empty and
    /// [`SiteError::NotFound`] if nothing answers the path.
    pub fn resolve_path(&self, path: &str, mode: ResolveMode) -> Result<Page, SiteError> {
        let root = self.storage.root()?;
        let record = Resolver::new(self.storage.as_ref(), &self.statuses, &self.kinds)
            .with_max_depth(self.max_depth)
            .resolve(root.as_ref(), path, mode, self.normalize)?
            .ok_or_else(|| SiteError::NotFound(path.to_owned()))?;

        let parts = self.storage.parts(record.key)?;
        Ok(Page::from_record(record, parts))
    }

    /// Render a resolved page.
    #[must_use]
    pub fn render(&self, page: &Page, request: &RequestContext) -> Response {
        let behavior = self.kinds.behavior(page.kind());
        self.pipeline
            .render(self.storage.as_ref(), page, behavior.as_ref(), request)
    }

    /// Resolve the request path and render the page.
    pub fn serve(&self, request: &RequestContext) -> Result<Response, SiteError> {
        let page = self.resolve_path(request.path(), request.mode())?;
        Ok(self.render(&page, request))
    }

    /// Breadcrumb trail from the root down to `page`, inclusive.
    pub fn breadcrumbs(&self, page: &Page) -> Result<Vec<BreadcrumbItem>, SiteError> {
        let ancestors = page.ancestors(self.storage.as_ref())?;

        let mut items = Vec::with_capacity(ancestors.len() + 1);
        let mut path = String::new();
        for record in ancestors.iter().rev() {
            path = next_path(&path, &record.slug, items.is_empty());
            items.push(BreadcrumbItem {
                title: record.breadcrumb.clone(),
                path: path.clone(),
            });
        }
        items.push(BreadcrumbItem {
            title: page.breadcrumb().to_owned(),
            path: next_path(&path, page.slug(), items.is_empty()),
        });
        Ok(items)
    }

    /// The whole tree below the root, depth first in stored order.
    ///
    /// # Errors
    ///
    /// Returns [`SiteError::MissingRoot`] if the tree is empty.
    pub fn outline(&self) -> Result<OutlineItem, SiteError> {
        let root = self.storage.root()?.ok_or(SiteError::MissingRoot)?;
        let mut visited = HashSet::new();
        self.outline_item(&root, normalize(&root.slug), &mut visited, 0)
    }

    fn outline_item(
        &self,
        record: &PageRecord,
        path: String,
        visited: &mut HashSet<PageKey>,
        depth: usize,
    ) -> Result<OutlineItem, SiteError> {
        if depth > self.max_depth {
            return Err(SiteError::Resolve(ResolveError::DepthExceeded(self.max_depth)));
        }
        if !visited.insert(record.key) {
            return Err(SiteError::Resolve(ResolveError::Cycle(record.key)));
        }

        let mut children = Vec::new();
        for child in self.storage.children(record.key)? {
            let child_path = join(&path, &child.slug);
            children.push(self.outline_item(&child, child_path, visited, depth + 1)?);
        }

        let status = self.statuses.find(record.status_id).map_or_else(
            || record.status_id.to_string(),
            |status| status.symbol().to_owned(),
        );
        Ok(OutlineItem {
            title: record.title.clone(),
            path,
            status,
            kind: record.kind.clone().filter(|kind| !kind.is_empty()),
            is_virtual: self.kinds.is_virtual(record),
            children,
        })
    }
}

fn next_path(parent_path: &str, slug: &str, is_root: bool) -> String {
    if is_root {
        normalize(slug)
    } else {
        join(parent_path, slug)
    }
}
