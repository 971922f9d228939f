//! Blog post domain model.
//!
//! # Responsibility
//! - Define the stored `BlogPost` record and the `NewPost` write shape.
//! - Validate natural-key input before it reaches storage.
//!
//! # Invariants
//! - `id` is assigned by storage on insert and immutable afterwards.
//! - `title` and `author` are never blank on a validated input.

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Storage-assigned numeric identifier.
pub type PostId = i64;

/// A persisted blog post.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlogPost {
    pub id: PostId,
    /// Stable global ID generated on insert. Not exposed over the wire.
    pub uuid: Uuid,
    pub title: String,
    pub author: String,
    pub content: String,
    /// Unix epoch milliseconds.
    pub created_at: i64,
    /// Unix epoch milliseconds, bumped on every content update.
    pub updated_at: i64,
}

/// Input for creating a post.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewPost {
    pub title: String,
    pub author: String,
    pub content: String,
}

impl NewPost {
    pub fn new(
        title: impl Into<String>,
        author: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            author: author.into(),
            content: content.into(),
        }
    }

    /// Validates the natural key carried by this input.
    pub fn validate(&self) -> Result<(), PostValidationError> {
        validate_key(&self.title, &self.author)
    }
}

/// Natural-key validation failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostValidationError {
    BlankTitle,
    BlankAuthor,
}

impl Display for PostValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BlankTitle => write!(f, "title must not be blank"),
            Self::BlankAuthor => write!(f, "author must not be blank"),
        }
    }
}

impl Error for PostValidationError {}

/// Checks that both halves of the (title, author) key carry text.
///
/// Empty keys were historically the "no such post" placeholder, so they are
/// rejected up front rather than stored.
pub fn validate_key(title: &str, author: &str) -> Result<(), PostValidationError> {
    if title.trim().is_empty() {
        return Err(PostValidationError::BlankTitle);
    }
    if author.trim().is_empty() {
        return Err(PostValidationError::BlankAuthor);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{validate_key, NewPost, PostValidationError};

    #[test]
    fn validate_rejects_blank_title_before_author() {
        assert_eq!(
            validate_key("  ", ""),
            Err(PostValidationError::BlankTitle)
        );
    }

    #[test]
    fn validate_rejects_blank_author() {
        let post = NewPost::new("Life", "\t", "body");
        assert_eq!(post.validate(), Err(PostValidationError::BlankAuthor));
    }

    #[test]
    fn validate_accepts_empty_content() {
        assert!(NewPost::new("Life", "Alice", "").validate().is_ok());
    }
}
