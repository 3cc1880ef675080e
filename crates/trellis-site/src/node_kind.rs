//! Node kinds: per-page behavior selected by a stored tag.
//!
//! Each page record carries an optional kind tag. The [`NodeKindRegistry`]
//! maps tags to a [`PageBehavior`] and records which kind each one extends,
//! so "is this a file-not-found page?" is answered by walking registered
//! parents rather than by inspecting types.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use trellis_storage::PageRecord;

use crate::page::Page;
use crate::renderer::RequestContext;

/// Response headers, kept sorted for stable output.
pub type Headers = BTreeMap<String, String>;

/// Status code of a page whose kind chain sets none.
pub const DEFAULT_RESPONSE_CODE: u16 = 200;

/// Behavior hooks a node kind can override.
///
/// Hooks returning `None` defer to the kind this one extends, so a kind
/// registered under `FileNotFoundPage` answers 404 and stays virtual unless
/// it says otherwise.
pub trait PageBehavior: Send + Sync {
    /// Headers this kind adds to every response, on top of those of the
    /// kinds it extends.
    fn headers(&self, _page: &Page) -> Headers {
        Headers::new()
    }

    /// HTTP status code for a rendered page of this kind.
    fn response_code(&self) -> Option<u16> {
        None
    }

    /// Replace the body rendering entirely. `None` renders the `body` part.
    fn render(&self, _page: &Page, _request: &RequestContext) -> Option<String> {
        None
    }

    /// Pages of a virtual kind never match a path directly, whatever their
    /// own `virtual` flag says.
    fn is_virtual(&self) -> Option<bool> {
        None
    }
}

/// Behavior of plain pages.
#[derive(Debug, Default)]
pub struct BasePage;

impl PageBehavior for BasePage {
    fn response_code(&self) -> Option<u16> {
        Some(DEFAULT_RESPONSE_CODE)
    }

    fn is_virtual(&self) -> Option<bool> {
        Some(false)
    }
}

/// Behavior of the fallback page returned when nothing else matches.
#[derive(Debug, Default)]
pub struct FileNotFoundPage;

impl PageBehavior for FileNotFoundPage {
    fn headers(&self, _page: &Page) -> Headers {
        Headers::from([("Status".to_owned(), "404 Not Found".to_owned())])
    }

    fn response_code(&self) -> Option<u16> {
        Some(404)
    }

    fn is_virtual(&self) -> Option<bool> {
        Some(true)
    }
}

/// A kind's hooks layered over those of the kinds it extends, nearest first.
struct Inherited {
    chain: Vec<Arc<dyn PageBehavior>>,
}

impl PageBehavior for Inherited {
    fn headers(&self, page: &Page) -> Headers {
        let mut headers = Headers::new();
        for behavior in self.chain.iter().rev() {
            headers.extend(behavior.headers(page));
        }
        headers
    }

    fn response_code(&self) -> Option<u16> {
        self.chain.iter().find_map(|behavior| behavior.response_code())
    }

    fn render(&self, page: &Page, request: &RequestContext) -> Option<String> {
        self.chain
            .iter()
            .find_map(|behavior| behavior.render(page, request))
    }

    fn is_virtual(&self) -> Option<bool> {
        self.chain.iter().find_map(|behavior| behavior.is_virtual())
    }
}

/// Error registering a node kind.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum KindError {
    #[error("Node kind already registered: {0}")]
    Duplicate(String),
    #[error("Node kind {tag} extends unknown kind {parent}")]
    UnknownParent { tag: String, parent: String },
    #[error("Node kind tag cannot be empty")]
    EmptyTag,
}

struct NodeKind {
    parent: Option<String>,
    behavior: Arc<dyn PageBehavior>,
}

/// Registry of node kinds keyed by tag.
pub struct NodeKindRegistry {
    kinds: HashMap<String, NodeKind>,
}

impl NodeKindRegistry {
    /// Tag of the base kind.
    pub const BASE: &'static str = "Page";
    /// Tag of the built-in fallback kind.
    pub const FILE_NOT_FOUND: &'static str = "FileNotFoundPage";

    /// Registry with the base kind and the file-not-found kind.
    #[must_use]
    pub fn standard() -> Self {
        let mut kinds = HashMap::new();
        kinds.insert(
            Self::BASE.to_owned(),
            NodeKind {
                parent: None,
                behavior: Arc::new(BasePage),
            },
        );
        kinds.insert(
            Self::FILE_NOT_FOUND.to_owned(),
            NodeKind {
                parent: Some(Self::BASE.to_owned()),
                behavior: Arc::new(FileNotFoundPage),
            },
        );
        Self { kinds }
    }

    /// Register a kind extending an already registered one.
    ///
    /// Hooks `behavior` leaves at their defaults are answered by the kind it
    /// extends. Parents must exist before children, so the extends chain
    /// can't loop.
    pub fn register(
        &mut self,
        tag: impl Into<String>,
        extends: &str,
        behavior: impl PageBehavior + 'static,
    ) -> Result<(), KindError> {
        let tag = tag.into();
        if tag.is_empty() {
            return Err(KindError::EmptyTag);
        }
        if self.kinds.contains_key(&tag) {
            return Err(KindError::Duplicate(tag));
        }
        let parent = Self::canonical(Some(extends));
        if !self.kinds.contains_key(parent) {
            return Err(KindError::UnknownParent {
                tag,
                parent: parent.to_owned(),
            });
        }
        tracing::debug!(kind = %tag, extends = %parent, "Registered node kind");
        self.kinds.insert(
            tag,
            NodeKind {
                parent: Some(parent.to_owned()),
                behavior: Arc::new(behavior),
            },
        );
        Ok(())
    }

    /// Normalize a stored tag: `None` and `""` mean the base kind.
    #[must_use]
    pub fn canonical(tag: Option<&str>) -> &str {
        match tag {
            None | Some("") => Self::BASE,
            Some(tag) => tag,
        }
    }

    #[must_use]
    pub fn is_registered(&self, tag: Option<&str>) -> bool {
        self.kinds.contains_key(Self::canonical(tag))
    }

    /// Behavior for a tag, with hooks the kind leaves unset taken from the
    /// kinds it extends. Unknown tags fall back to the base behavior.
    #[must_use]
    pub fn behavior(&self, tag: Option<&str>) -> Arc<dyn PageBehavior> {
        let tag = Self::canonical(tag);
        let Some(kind) = self.kinds.get(tag) else {
            tracing::warn!(kind = %tag, "Unknown node kind, using base behavior");
            return Arc::new(BasePage);
        };
        if kind.parent.is_none() {
            return Arc::clone(&kind.behavior);
        }

        let mut chain = vec![Arc::clone(&kind.behavior)];
        let mut parent = kind.parent.as_deref();
        while let Some(parent_kind) = parent.and_then(|tag| self.kinds.get(tag)) {
            chain.push(Arc::clone(&parent_kind.behavior));
            parent = parent_kind.parent.as_deref();
        }
        Arc::new(Inherited { chain })
    }

    /// Whether a page never matches a path directly: its own flag is set or
    /// its kind is virtual.
    #[must_use]
    pub fn is_virtual(&self, record: &PageRecord) -> bool {
        record.is_virtual
            || self
                .behavior(record.kind.as_deref())
                .is_virtual()
                .unwrap_or(false)
    }

    /// Whether `tag` is `ancestor` or registered as one of its descendants.
    #[must_use]
    pub fn is_kind_of(&self, tag: Option<&str>, ancestor: &str) -> bool {
        let mut current = Some(Self::canonical(tag));
        while let Some(tag) = current {
            if tag == ancestor {
                return true;
            }
            current = self.kinds.get(tag).and_then(|kind| kind.parent.as_deref());
        }
        false
    }

    #[must_use]
    pub fn is_file_not_found(&self, tag: Option<&str>) -> bool {
        self.is_kind_of(tag, Self::FILE_NOT_FOUND)
    }

    /// Registered tags, sorted.
    #[must_use]
    pub fn tags(&self) -> Vec<&str> {
        let mut tags: Vec<_> = self.kinds.keys().map(String::as_str).collect();
        tags.sort_unstable();
        tags
    }
}

impl Default for NodeKindRegistry {
    fn default() -> Self {
        Self::standard()
    }
}

impl std::fmt::Debug for NodeKindRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NodeKindRegistry")
            .field("kinds", &self.tags())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Gone;

    impl PageBehavior for Gone {
        fn response_code(&self) -> Option<u16> {
            Some(410)
        }
    }

    #[test]
    fn test_standard_kinds() {
        let kinds = NodeKindRegistry::standard();

        assert_eq!(kinds.tags(), vec!["FileNotFoundPage", "Page"]);
    }

    #[test]
    fn test_base_aliases_registered() {
        let kinds = NodeKindRegistry::standard();

        assert!(kinds.is_registered(None));
        assert!(kinds.is_registered(Some("")));
        assert!(kinds.is_registered(Some("Page")));
        assert!(!kinds.is_registered(Some("Object")));
    }

    #[test]
    fn test_file_not_found_behavior() {
        let kinds = NodeKindRegistry::standard();
        let behavior = kinds.behavior(Some(NodeKindRegistry::FILE_NOT_FOUND));

        assert_eq!(behavior.response_code(), Some(404));
        assert_eq!(behavior.is_virtual(), Some(true));
    }

    #[test]
    fn test_base_behavior_defaults() {
        let kinds = NodeKindRegistry::standard();
        let behavior = kinds.behavior(None);

        assert_eq!(behavior.response_code(), Some(DEFAULT_RESPONSE_CODE));
        assert_eq!(behavior.is_virtual(), Some(false));
    }

    #[test]
    fn test_unknown_kind_uses_base_behavior() {
        let kinds = NodeKindRegistry::standard();

        assert_eq!(kinds.behavior(Some("Object")).response_code(), Some(200));
    }

    #[test]
    fn test_is_kind_of_walks_parents() {
        let mut kinds = NodeKindRegistry::standard();
        kinds
            .register("GonePage", NodeKindRegistry::FILE_NOT_FOUND, Gone)
            .unwrap();

        assert!(kinds.is_file_not_found(Some("GonePage")));
        assert!(kinds.is_file_not_found(Some("FileNotFoundPage")));
        assert!(kinds.is_kind_of(Some("GonePage"), "Page"));
        assert!(!kinds.is_file_not_found(None));
        assert!(!kinds.is_file_not_found(Some("Object")));
        assert_eq!(kinds.behavior(Some("GonePage")).response_code(), Some(410));
    }

    #[test]
    fn test_register_errors() {
        let mut kinds = NodeKindRegistry::standard();

        assert_eq!(
            kinds.register("Page", "Page", Gone),
            Err(KindError::Duplicate("Page".to_owned()))
        );
        assert_eq!(
            kinds.register("GonePage", "Missing", Gone),
            Err(KindError::UnknownParent {
                tag: "GonePage".to_owned(),
                parent: "Missing".to_owned(),
            })
        );
        assert_eq!(kinds.register("", "Page", Gone), Err(KindError::EmptyTag));
    }

    #[test]
    fn test_register_with_empty_extends_means_base() {
        let mut kinds = NodeKindRegistry::standard();
        kinds.register("GonePage", "", Gone).unwrap();

        assert!(kinds.is_kind_of(Some("GonePage"), "Page"));
        assert!(!kinds.is_file_not_found(Some("GonePage")));
    }

    struct Branded;

    impl PageBehavior for Branded {
        fn headers(&self, _page: &Page) -> Headers {
            Headers::from([("X-Brand".to_owned(), "trellis".to_owned())])
        }
    }

    #[test]
    fn test_descendant_of_file_not_found_inherits_hooks() {
        let mut kinds = NodeKindRegistry::standard();
        kinds
            .register("BrandedNotFound", NodeKindRegistry::FILE_NOT_FOUND, Branded)
            .unwrap();
        let page = Page::new("Missing", "missing");

        let behavior = kinds.behavior(Some("BrandedNotFound"));

        assert_eq!(behavior.response_code(), Some(404));
        assert_eq!(behavior.is_virtual(), Some(true));
        assert_eq!(
            behavior.headers(&page),
            Headers::from([
                ("Status".to_owned(), "404 Not Found".to_owned()),
                ("X-Brand".to_owned(), "trellis".to_owned()),
            ])
        );
    }

    #[test]
    fn test_override_wins_over_parent() {
        let mut kinds = NodeKindRegistry::standard();
        kinds
            .register("GonePage", NodeKindRegistry::FILE_NOT_FOUND, Gone)
            .unwrap();

        let behavior = kinds.behavior(Some("GonePage"));

        assert_eq!(behavior.response_code(), Some(410));
        assert_eq!(behavior.is_virtual(), Some(true));
    }

    #[test]
    fn test_is_virtual_by_flag_or_kind() {
        let kinds = NodeKindRegistry::standard();

        assert!(!kinds.is_virtual(&PageRecord::new("Home", "/")));
        assert!(kinds.is_virtual(&PageRecord::new("Group", "group").with_virtual(true)));
        assert!(kinds.is_virtual(
            &PageRecord::new("Missing", "missing").with_kind(NodeKindRegistry::FILE_NOT_FOUND)
        ));
    }
}
