//! Page tree resolution, lifecycle and rendering for Trellis.
//!
//! This crate provides:
//! - [`Site`]: path resolution and rendering over a [`Storage`](trellis_storage::Storage)
//! - [`Page`]: a page node with its parts, path, status rule and validation
//! - [`Resolver`]: the recursive path lookup with live and preview modes
//! - [`RenderPipeline`]: headers, body and status code for a resolved page
//! - [`StatusRegistry`] and [`NodeKindRegistry`]: lifecycle statuses and
//!   per-kind page behavior
//! - [`SiteLoader`]: loading a page tree from YAML
//!
//! # Quick Start
//!
//! ```
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! use std::sync::Arc;
//! use trellis_site::{ResolveMode, Site, SiteLoader};
//! use trellis_storage::MemoryStorage;
//!
//! let storage = Arc::new(MemoryStorage::new());
//! let site = Site::new(storage.clone());
//! SiteLoader::new(storage.as_ref(), site.statuses(), site.kinds()).load_str(
//!     "
//! title: Home
//! slug: /
//! children:
//!   - title: About
//!     slug: about
//! ",
//! )?;
//!
//! let page = site.resolve_path("/about/", ResolveMode::Live)?;
//! assert_eq!(page.title(), "About");
//! # Ok(())
//! # }
//! ```

mod node_kind;
mod page;
mod part;
mod renderer;
mod resolver;
mod site;
mod site_loader;
mod status;
mod validation;

pub use node_kind::{
    BasePage, DEFAULT_RESPONSE_CODE, FileNotFoundPage, Headers, KindError, NodeKindRegistry,
    PageBehavior,
};
pub use page::{Page, SaveError, normalize};
pub use part::{Part, PartState, PartStore};
pub use renderer::{BODY_PART, RenderPipeline, RequestContext, Response};
pub use resolver::{DEFAULT_MAX_DEPTH, ResolveError, ResolveMode, Resolver};
pub use site::{BreadcrumbItem, OutlineItem, Site, SiteConfig, SiteError};
pub use site_loader::{LoadError, SiteLoader};
pub use status::{RegistryError, Status, StatusRegistry};
pub use validation::{FieldError, ValidationErrors, is_valid_slug, validate_part};
