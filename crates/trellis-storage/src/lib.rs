//! Storage abstraction for the Trellis page tree.
//!
//! This crate provides a [`Storage`] trait that separates tree traversal and
//! persistence from the resolution engine. This enables:
//!
//! - **Unit testing** against an in-memory tree
//! - **Backend flexibility** (SQL, key-value stores, flat files)
//! - **Clean separation** between resolution logic and I/O operations
//!
//! # Architecture
//!
//! The crate provides:
//! - [`PageRecord`] and [`PartRecord`], the persisted shape of pages and parts
//! - [`Storage`] trait with tree queries (`root()`, `children()`,
//!   `child_by_slug()`, `ancestors()`) and persistence (`insert()`,
//!   `update()`, `delete()`)
//! - [`MemoryStorage`], an in-memory backend honoring the whole contract
//!
//! # Example
//!
//! ```
//! use trellis_storage::{MemoryStorage, PageRecord, Storage};
//!
//! let storage = MemoryStorage::new();
//! let home = PageRecord::new("Home", "/");
//! storage.insert(&home, &[])?;
//!
//! let root = storage.root()?.expect("root page");
//! assert_eq!(root.title, "Home");
//! # Ok::<(), trellis_storage::StorageError>(())
//! ```

mod memory;
mod record;
mod storage;

pub use memory::MemoryStorage;
pub use record::{PageKey, PageRecord, PartRecord};
pub use storage::{Storage, StorageError, StorageErrorKind};
