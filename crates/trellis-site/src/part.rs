//! Named content fragments of a page.
//!
//! A [`PartStore`] is the in-memory view of one page's parts: the persisted
//! set with pending additions, edits and removals layered on top. Name
//! lookups always go through this buffer, so unsaved parts are found and
//! parts pending removal are not.
//!
//! When several parts share a name, the first one in held order wins.

use trellis_storage::PartRecord;

/// Lifecycle of a part relative to the backing store.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PartState {
    /// Matches what the store holds.
    Persisted,
    /// Added since the last save.
    New,
    /// Persisted, with unsaved edits.
    Modified,
    /// Persisted, scheduled for removal on the next save.
    Removed,
}

/// A named content fragment.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Part {
    record: PartRecord,
    state: PartState,
}

impl Part {
    #[must_use]
    pub fn name(&self) -> &str {
        &self.record.name
    }

    #[must_use]
    pub fn content(&self) -> &str {
        &self.record.content
    }

    #[must_use]
    pub fn filter_id(&self) -> Option<&str> {
        self.record.filter_id.as_deref()
    }

    #[must_use]
    pub fn state(&self) -> PartState {
        self.state
    }

    #[must_use]
    pub fn record(&self) -> &PartRecord {
        &self.record
    }

    fn is_live(&self) -> bool {
        self.state != PartState::Removed
    }
}

/// Parts of one page in creation order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PartStore {
    parts: Vec<Part>,
}

impl PartStore {
    /// Empty store for a page that has never been saved.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store holding parts read back from storage.
    #[must_use]
    pub fn persisted(records: Vec<PartRecord>) -> Self {
        let parts = records
            .into_iter()
            .map(|record| Part {
                record,
                state: PartState::Persisted,
            })
            .collect();
        Self { parts }
    }

    /// First part named `name` (case-sensitive), ignoring pending removals.
    #[must_use]
    pub fn find(&self, name: &str) -> Option<&Part> {
        self.iter().find(|part| part.name() == name)
    }

    #[must_use]
    pub fn has(&self, name: &str) -> bool {
        self.find(name).is_some()
    }

    /// Live parts in held order.
    pub fn iter(&self) -> impl Iterator<Item = &Part> {
        self.parts.iter().filter(|part| part.is_live())
    }

    /// Every held part, including pending removals.
    pub fn iter_all(&self) -> impl Iterator<Item = &Part> {
        self.parts.iter()
    }

    /// Append a new part.
    pub fn add(&mut self, record: PartRecord) {
        self.parts.push(Part {
            record,
            state: PartState::New,
        });
    }

    /// Replace the content of the first part named `name`.
    ///
    /// Returns `false` if there is no such part.
    pub fn set_content(&mut self, name: &str, content: impl Into<String>) -> bool {
        let Some(part) = self
            .parts
            .iter_mut()
            .find(|part| part.is_live() && part.record.name == name)
        else {
            return false;
        };
        part.record.content = content.into();
        if part.state == PartState::Persisted {
            part.state = PartState::Modified;
        }
        true
    }

    /// Remove every part named `name`.
    ///
    /// Unsaved parts are dropped at once; persisted ones are marked and
    /// disappear from lookups until the next save deletes them. Returns the
    /// number of parts affected.
    pub fn remove(&mut self, name: &str) -> usize {
        let mut affected = 0;
        self.parts.retain_mut(|part| {
            if !part.is_live() || part.record.name != name {
                return true;
            }
            affected += 1;
            if part.state == PartState::New {
                false
            } else {
                part.state = PartState::Removed;
                true
            }
        });
        affected
    }

    /// Whether any part differs from the stored set.
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.parts
            .iter()
            .any(|part| part.state != PartState::Persisted)
    }

    /// Records to persist, in order, without touching the buffer.
    #[must_use]
    pub fn pending_records(&self) -> Vec<PartRecord> {
        self.iter().map(|part| part.record.clone()).collect()
    }

    /// Mark the buffer as saved: removals are dropped and every remaining
    /// part becomes persisted.
    pub fn commit(&mut self) {
        self.parts.retain(Part::is_live);
        for part in &mut self.parts {
            part.state = PartState::Persisted;
        }
    }

    /// Number of live parts.
    #[must_use]
    pub fn len(&self) -> usize {
        self.iter().count()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn names(store: &PartStore) -> Vec<&str> {
        store.iter().map(Part::name).collect()
    }

    #[test]
    fn test_find_persisted() {
        let store = PartStore::persisted(vec![
            PartRecord::new("body", "Hello"),
            PartRecord::new("sidebar", "Links"),
        ]);

        assert_eq!(store.find("sidebar").unwrap().content(), "Links");
        assert!(store.has("body"));
        assert!(!store.is_dirty());
    }

    #[test]
    fn test_find_is_case_sensitive() {
        let store = PartStore::persisted(vec![PartRecord::new("body", "Hello")]);

        assert!(store.find("Body").is_none());
    }

    #[test]
    fn test_find_unsaved_part() {
        let mut store = PartStore::persisted(vec![PartRecord::new("body", "Hello")]);
        store.add(PartRecord::new("extended", "More"));

        let part = store.find("extended").unwrap();
        assert_eq!(part.state(), PartState::New);
        assert!(store.is_dirty());
    }

    #[test]
    fn test_find_on_new_store() {
        let mut store = PartStore::new();
        store.add(PartRecord::new("body", "Draft body"));

        assert_eq!(store.find("body").unwrap().content(), "Draft body");
    }

    #[test]
    fn test_duplicate_names_first_wins() {
        let mut store = PartStore::persisted(vec![PartRecord::new("body", "first")]);
        store.add(PartRecord::new("body", "second"));

        assert_eq!(store.find("body").unwrap().content(), "first");
    }

    #[test]
    fn test_set_content_marks_modified() {
        let mut store = PartStore::persisted(vec![PartRecord::new("body", "Hello")]);

        assert!(store.set_content("body", "Bye"));
        let part = store.find("body").unwrap();
        assert_eq!(part.content(), "Bye");
        assert_eq!(part.state(), PartState::Modified);
        assert!(!store.set_content("missing", "x"));
    }

    #[test]
    fn test_remove_persisted_hides_from_lookup() {
        let mut store = PartStore::persisted(vec![
            PartRecord::new("body", "Hello"),
            PartRecord::new("sidebar", "Links"),
        ]);

        assert_eq!(store.remove("body"), 1);

        assert!(!store.has("body"));
        assert_eq!(names(&store), vec!["sidebar"]);
        assert_eq!(store.iter_all().count(), 2);
        assert!(store.is_dirty());
    }

    #[test]
    fn test_remove_unsaved_drops_immediately() {
        let mut store = PartStore::new();
        store.add(PartRecord::new("body", "Hello"));

        assert_eq!(store.remove("body"), 1);

        assert_eq!(store.iter_all().count(), 0);
        assert!(!store.is_dirty());
    }

    #[test]
    fn test_removed_part_can_be_readded() {
        let mut store = PartStore::persisted(vec![PartRecord::new("body", "Old")]);
        store.remove("body");
        store.add(PartRecord::new("body", "New"));

        assert_eq!(store.find("body").unwrap().content(), "New");
    }

    #[test]
    fn test_commit() {
        let mut store = PartStore::persisted(vec![
            PartRecord::new("body", "Hello"),
            PartRecord::new("sidebar", "Links"),
        ]);
        store.remove("sidebar");
        store.add(PartRecord::new("footer", "(c)"));

        assert_eq!(
            store.pending_records(),
            vec![PartRecord::new("body", "Hello"), PartRecord::new("footer", "(c)")]
        );

        store.commit();

        assert!(!store.is_dirty());
        assert_eq!(names(&store), vec!["body", "footer"]);
        assert_eq!(store.iter_all().count(), 2);
        assert_eq!(store.len(), 2);
    }
}
