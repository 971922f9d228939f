//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define natural-key data access over the `posts` table.
//! - Isolate SQLite query details from the service handlers.
//!
//! # Invariants
//! - Repository APIs return `Option` for absence, never placeholder rows.
//! - Uniqueness is the caller's responsibility; `insert` does not check it.

pub mod post_repo;
