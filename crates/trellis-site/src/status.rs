//! Page lifecycle statuses.
//!
//! The set of statuses is fixed when a [`StatusRegistry`] is built and never
//! changes afterwards. Build one at startup and hand it to whatever needs
//! status lookups.

/// A lifecycle status.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Status {
    id: u16,
    name: String,
    symbol: String,
}

impl Status {
    #[must_use]
    pub fn new(id: u16, name: impl Into<String>) -> Self {
        let name = name.into();
        let symbol = name
            .split_whitespace()
            .collect::<Vec<_>>()
            .join("_")
            .to_lowercase();
        Self { id, name, symbol }
    }

    #[must_use]
    pub fn id(&self) -> u16 {
        self.id
    }

    /// Display name (e.g. `Published`).
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Lowercase lookup symbol (e.g. `published`).
    #[must_use]
    pub fn symbol(&self) -> &str {
        &self.symbol
    }
}

/// Error building a custom [`StatusRegistry`].
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("Duplicate status id: {0}")]
    DuplicateId(u16),
    #[error("Duplicate status symbol: {0}")]
    DuplicateSymbol(String),
    #[error("Missing required status: {0}")]
    MissingStatus(&'static str),
}

/// Immutable table of statuses.
#[derive(Clone, Debug)]
pub struct StatusRegistry {
    statuses: Vec<Status>,
    draft: usize,
    scheduled: usize,
    published: usize,
}

impl StatusRegistry {
    pub const DRAFT: &'static str = "draft";
    pub const SCHEDULED: &'static str = "scheduled";
    pub const PUBLISHED: &'static str = "published";

    /// The standard table: Draft, Reviewed, Scheduled, Published, Hidden.
    #[must_use]
    pub fn standard() -> Self {
        let statuses = vec![
            Status::new(1, "Draft"),
            Status::new(50, "Reviewed"),
            Status::new(90, "Scheduled"),
            Status::new(100, "Published"),
            Status::new(101, "Hidden"),
        ];
        Self {
            statuses,
            draft: 0,
            scheduled: 2,
            published: 3,
        }
    }

    /// Build a custom table.
    ///
    /// The table must contain `draft`, `scheduled` and `published`, and ids
    /// and symbols must be unique.
    pub fn with_statuses(statuses: Vec<Status>) -> Result<Self, RegistryError> {
        for (i, status) in statuses.iter().enumerate() {
            let earlier = &statuses[..i];
            if earlier.iter().any(|s| s.id == status.id) {
                return Err(RegistryError::DuplicateId(status.id));
            }
            if earlier.iter().any(|s| s.symbol == status.symbol) {
                return Err(RegistryError::DuplicateSymbol(status.symbol.clone()));
            }
        }

        let index_of = |symbol: &'static str| {
            statuses
                .iter()
                .position(|s| s.symbol == symbol)
                .ok_or(RegistryError::MissingStatus(symbol))
        };
        let draft = index_of(Self::DRAFT)?;
        let scheduled = index_of(Self::SCHEDULED)?;
        let published = index_of(Self::PUBLISHED)?;

        Ok(Self {
            statuses,
            draft,
            scheduled,
            published,
        })
    }

    /// Find a status by numeric id.
    #[must_use]
    pub fn find(&self, id: u16) -> Option<&Status> {
        self.statuses.iter().find(|s| s.id == id)
    }

    /// Find a status by an id given as a string of digits (e.g. `"100"`).
    #[must_use]
    pub fn find_str(&self, id: &str) -> Option<&Status> {
        id.trim().parse::<u16>().ok().and_then(|id| self.find(id))
    }

    /// Find a status by its symbol (e.g. `"draft"`).
    #[must_use]
    pub fn lookup(&self, symbol: &str) -> Option<&Status> {
        self.statuses.iter().find(|s| s.symbol == symbol)
    }

    /// Statuses an editor may pick directly. `scheduled` is only ever
    /// derived from a future `published_at`, so it is left out.
    pub fn selectable(&self) -> impl Iterator<Item = &Status> {
        let scheduled = self.scheduled;
        self.statuses
            .iter()
            .enumerate()
            .filter(move |(i, _)| *i != scheduled)
            .map(|(_, s)| s)
    }

    #[must_use]
    pub fn all(&self) -> &[Status] {
        &self.statuses
    }

    #[must_use]
    pub fn draft(&self) -> &Status {
        &self.statuses[self.draft]
    }

    #[must_use]
    pub fn scheduled(&self) -> &Status {
        &self.statuses[self.scheduled]
    }

    #[must_use]
    pub fn published(&self) -> &Status {
        &self.statuses[self.published]
    }
}

impl Default for StatusRegistry {
    fn default() -> Self {
        Self::standard()
    }
}
