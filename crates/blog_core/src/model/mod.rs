//! Blog domain model.
//!
//! # Invariants
//! - Every stored post has a server-assigned `PostId` that is never reused.
//! - Deletion is a hard delete; there are no tombstones.

pub mod post;
