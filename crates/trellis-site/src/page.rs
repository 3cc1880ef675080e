//! Page nodes.
//!
//! A [`Page`] is a [`PageRecord`] together with its [`PartStore`]. It knows
//! how to compute its URL path, which parts it owns or inherits, how its
//! status follows `published_at`, and how to validate and persist itself
//! through a [`Storage`].

use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use trellis_storage::{PageKey, PageRecord, PartRecord, Storage, StorageError, StorageErrorKind};

use crate::node_kind::NodeKindRegistry;
use crate::part::{Part, PartStore};
use crate::status::{Status, StatusRegistry};
use crate::validation::{
    self, BREADCRUMB_MAX, SLUG_MAX, TITLE_MAX, ValidationErrors, check_required,
};

static SLASHES_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"/+").unwrap());

/// Normalize a URL path: trim whitespace, wrap in `/` and collapse
/// repeated slashes.
///
/// The result always starts and ends with `/`, and normalizing twice gives
/// the same result as normalizing once.
///
/// # Example
///
/// ```
/// use trellis_site::normalize;
///
/// assert_eq!(normalize(" about//team "), "/about/team/");
/// assert_eq!(normalize(""), "/");
/// ```
#[must_use]
pub fn normalize(path: &str) -> String {
    let wrapped = format!("/{}/", path.trim());
    SLASHES_RE.replace_all(&wrapped, "/").into_owned()
}

/// Path of a child with `slug` below a page whose path is `parent_path`.
pub(crate) fn join(parent_path: &str, slug: &str) -> String {
    normalize(&format!("{parent_path}/{slug}"))
}

/// Derive the status of `record` from its publish date as of `now`.
fn derive_status(record: &mut PageRecord, statuses: &StatusRegistry, now: DateTime<Utc>) {
    let published = statuses.published().id();
    let scheduled = statuses.scheduled().id();
    let current = record.status_id;

    if current == published && record.published_at.is_none() {
        record.published_at = Some(now);
    }

    let Some(published_at) = record.published_at else {
        return;
    };
    if current != published && current != scheduled {
        return;
    }

    let next = if published_at > now { scheduled } else { published };
    if next != current {
        tracing::debug!(
            key = %record.key,
            from = current,
            to = next,
            %published_at,
            "Status derived from publish date"
        );
    }
    record.status_id = next;
}

/// Error saving a page.
#[derive(Debug, thiserror::Error)]
pub enum SaveError {
    #[error(transparent)]
    Invalid(#[from] ValidationErrors),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// A page node with its parts.
#[derive(Clone, Debug)]
pub struct Page {
    record: PageRecord,
    parts: PartStore,
    persisted: bool,
}

impl Page {
    /// Unsaved page with the given title and slug. The breadcrumb defaults
    /// to the title and the status to the standard table's published id
    /// ([`PageRecord::DEFAULT_STATUS_ID`]); with a custom [`StatusRegistry`]
    /// use [`with_status`](Self::with_status) or [`new_in`](Self::new_in).
    #[must_use]
    pub fn new(title: impl Into<String>, slug: impl Into<String>) -> Self {
        Self {
            record: PageRecord::new(title, slug),
            parts: PartStore::new(),
            persisted: false,
        }
    }

    /// Unsaved page whose status is the registry's published status.
    #[must_use]
    pub fn new_in(
        statuses: &StatusRegistry,
        title: impl Into<String>,
        slug: impl Into<String>,
    ) -> Self {
        Self::new(title, slug).with_status(statuses.published())
    }

    /// Page read back from storage.
    #[must_use]
    pub fn from_record(record: PageRecord, parts: Vec<PartRecord>) -> Self {
        Self {
            record,
            parts: PartStore::persisted(parts),
            persisted: true,
        }
    }

    /// Load a page and its parts.
    pub fn load(storage: &dyn Storage, key: PageKey) -> Result<Option<Self>, StorageError> {
        let Some(record) = storage.get(key)? else {
            return Ok(None);
        };
        let parts = storage.parts(key)?;
        Ok(Some(Self::from_record(record, parts)))
    }

    #[must_use]
    pub fn with_parent(mut self, parent: PageKey) -> Self {
        self.record.parent = Some(parent);
        self
    }

    #[must_use]
    pub fn with_breadcrumb(mut self, breadcrumb: impl Into<String>) -> Self {
        self.record.breadcrumb = breadcrumb.into();
        self
    }

    #[must_use]
    pub fn with_status(mut self, status: &Status) -> Self {
        self.record.status_id = status.id();
        self
    }

    #[must_use]
    pub fn with_published_at(mut self, published_at: DateTime<Utc>) -> Self {
        self.record.published_at = Some(published_at);
        self
    }

    #[must_use]
    pub fn with_kind(mut self, kind: impl Into<String>) -> Self {
        self.record.kind = Some(kind.into());
        self
    }

    #[must_use]
    pub fn with_virtual(mut self, is_virtual: bool) -> Self {
        self.record.is_virtual = is_virtual;
        self
    }

    #[must_use]
    pub fn with_part(mut self, part: PartRecord) -> Self {
        self.parts.add(part);
        self
    }

    #[must_use]
    pub fn key(&self) -> PageKey {
        self.record.key
    }

    #[must_use]
    pub fn parent(&self) -> Option<PageKey> {
        self.record.parent
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.record.title
    }

    #[must_use]
    pub fn slug(&self) -> &str {
        &self.record.slug
    }

    #[must_use]
    pub fn breadcrumb(&self) -> &str {
        &self.record.breadcrumb
    }

    #[must_use]
    pub fn status_id(&self) -> u16 {
        self.record.status_id
    }

    #[must_use]
    pub fn published_at(&self) -> Option<DateTime<Utc>> {
        self.record.published_at
    }

    /// The page's own `virtual` flag. Kinds may force virtuality on top of
    /// this, see [`PageBehavior::is_virtual`](crate::PageBehavior::is_virtual).
    #[must_use]
    pub fn is_virtual(&self) -> bool {
        self.record.is_virtual
    }

    #[must_use]
    pub fn kind(&self) -> Option<&str> {
        self.record.kind.as_deref()
    }

    #[must_use]
    pub fn record(&self) -> &PageRecord {
        &self.record
    }

    /// Whether the page has been stored at least once.
    #[must_use]
    pub fn is_persisted(&self) -> bool {
        self.persisted
    }

    #[must_use]
    pub fn parts(&self) -> &PartStore {
        &self.parts
    }

    /// Pending part edits are kept until the next [`save`](Self::save).
    pub fn parts_mut(&mut self) -> &mut PartStore {
        &mut self.parts
    }

    pub fn set_title(&mut self, title: impl Into<String>) {
        self.record.title = title.into();
    }

    pub fn set_slug(&mut self, slug: impl Into<String>) {
        self.record.slug = slug.into();
    }

    pub fn set_status(&mut self, status: &Status) {
        self.record.status_id = status.id();
    }

    pub fn set_published_at(&mut self, published_at: Option<DateTime<Utc>>) {
        self.record.published_at = published_at;
    }

    #[must_use]
    pub fn status<'a>(&self, statuses: &'a StatusRegistry) -> Option<&'a Status> {
        statuses.find(self.record.status_id)
    }

    #[must_use]
    pub fn is_published(&self, statuses: &StatusRegistry) -> bool {
        self.record.status_id == statuses.published().id()
    }

    /// Derive the status from `published_at` as of `now`.
    ///
    /// A published page without a date is stamped with `now`. A published
    /// or scheduled page with a date becomes scheduled when the date is in
    /// the future and published otherwise. Every other status is left alone.
    pub fn apply_status_transition(&mut self, statuses: &StatusRegistry, now: DateTime<Utc>) {
        derive_status(&mut self.record, statuses, now);
    }

    /// Ancestors from the immediate parent up to the root.
    ///
    /// Works for unsaved pages as long as the parent is stored.
    pub fn ancestors(&self, storage: &dyn Storage) -> Result<Vec<PageRecord>, StorageError> {
        let Some(parent_key) = self.record.parent else {
            return Ok(Vec::new());
        };
        let parent = storage
            .get(parent_key)?
            .ok_or_else(|| StorageError::not_found(parent_key))?;
        let mut chain = vec![parent];
        chain.extend(storage.ancestors(parent_key)?);

        if chain.iter().any(|page| page.key == self.record.key) {
            return Err(StorageError::new(StorageErrorKind::Cycle).with_key(self.record.key));
        }
        Ok(chain)
    }

    /// URL path of this page, e.g. `/parent/child/`.
    ///
    /// A parentless page's path is its normalized slug, so a root with slug
    /// `/` lives at `/`.
    pub fn path(&self, storage: &dyn Storage) -> Result<String, StorageError> {
        let ancestors = self.ancestors(storage)?;
        let Some((root, below_root)) = ancestors.split_last() else {
            return Ok(normalize(&self.record.slug));
        };
        let parent_path = below_root
            .iter()
            .rev()
            .fold(normalize(&root.slug), |path, page| join(&path, &page.slug));
        Ok(join(&parent_path, &self.record.slug))
    }

    /// Path a child of this page would have.
    pub fn child_path(&self, storage: &dyn Storage, child: &Page) -> Result<String, StorageError> {
        Ok(join(&self.path(storage)?, child.slug()))
    }

    /// Whether this page owns a part named `name`, saved or not.
    #[must_use]
    pub fn has_part(&self, name: &str) -> bool {
        self.parts.has(name)
    }

    #[must_use]
    pub fn part(&self, name: &str) -> Option<&Part> {
        self.parts.find(name)
    }

    /// Nearest ancestor's definition of a part this page does not own.
    ///
    /// Returns `None` when the page owns the part itself.
    pub fn inherited_part(
        &self,
        storage: &dyn Storage,
        name: &str,
    ) -> Result<Option<PartRecord>, StorageError> {
        if self.has_part(name) {
            return Ok(None);
        }
        for ancestor in self.ancestors(storage)? {
            if let Some(part) = storage.part(ancestor.key, name)? {
                return Ok(Some(part));
            }
        }
        Ok(None)
    }

    /// Whether some ancestor defines a part this page lacks.
    pub fn inherits_part(&self, storage: &dyn Storage, name: &str) -> Result<bool, StorageError> {
        Ok(self.inherited_part(storage, name)?.is_some())
    }

    pub fn has_or_inherits_part(
        &self,
        storage: &dyn Storage,
        name: &str,
    ) -> Result<bool, StorageError> {
        Ok(self.has_part(name) || self.inherits_part(storage, name)?)
    }

    /// Check every field of the page and its parts.
    ///
    /// Only storage failures are errors; validation failures are returned
    /// in the collection.
    pub fn validate(
        &self,
        storage: &dyn Storage,
        statuses: &StatusRegistry,
        kinds: &NodeKindRegistry,
    ) -> Result<ValidationErrors, StorageError> {
        let record = &self.record;
        let mut errors = ValidationErrors::new();

        check_required(&mut errors, "title", &record.title, TITLE_MAX);
        check_required(&mut errors, "slug", &record.slug, SLUG_MAX);
        if !validation::is_valid_slug(&record.slug) {
            errors.add("slug", "is invalid");
        }
        check_required(&mut errors, "breadcrumb", &record.breadcrumb, BREADCRUMB_MAX);

        if statuses.find(record.status_id).is_none() {
            errors.add("status_id", "is not a valid status");
        }
        if !kinds.is_registered(record.kind.as_deref()) {
            errors.add("kind", "must be set to a valid descendant of Page");
        }

        if !record.slug.is_empty()
            && storage.slug_taken(record.parent, &record.slug, Some(record.key))?
        {
            errors.add("slug", "has already been taken");
        }

        for (i, part) in self.parts.iter().enumerate() {
            errors.merge_scoped(&format!("parts[{i}]"), validation::validate_part(part.record()));
        }

        Ok(errors)
    }

    /// Validate, derive the status and persist the page with its parts.
    ///
    /// Nothing changes on the page when validation or storage fails.
    pub fn save(
        &mut self,
        storage: &dyn Storage,
        statuses: &StatusRegistry,
        kinds: &NodeKindRegistry,
    ) -> Result<(), SaveError> {
        self.save_at(storage, statuses, kinds, Utc::now())
    }

    /// [`save`](Self::save) with an explicit clock.
    pub fn save_at(
        &mut self,
        storage: &dyn Storage,
        statuses: &StatusRegistry,
        kinds: &NodeKindRegistry,
        now: DateTime<Utc>,
    ) -> Result<(), SaveError> {
        self.validate(storage, statuses, kinds)?.into_result()?;

        // The derived status only sticks once storage accepts the record.
        let mut record = self.record.clone();
        derive_status(&mut record, statuses, now);

        let stored = if self.persisted {
            let parts = self
                .parts
                .is_dirty()
                .then(|| self.parts.pending_records());
            storage.update(&record, parts.as_deref())?
        } else {
            storage.insert(&record, &self.parts.pending_records())?
        };

        tracing::info!(
            key = %stored.key,
            slug = %stored.slug,
            status = stored.status_id,
            parts = self.parts.len(),
            "Saved page"
        );

        self.record = stored;
        self.parts.commit();
        self.persisted = true;
        Ok(())
    }
}
