//! Storage traits and implementations
//!
//! The trait-based design lets the actions and queries run unchanged
//! against SQLite in production and an in-memory store in tests.

mod memory;
mod sqlite;
mod traits;

pub use memory::InMemoryCrmStore;
pub use sqlite::SqliteCrmStore;
pub use traits::CrmStore;
