//! Blog service handlers: create, read, update, delete, list.
//!
//! # Responsibility
//! - Validate request keys and check repository state before mutating.
//! - Translate repository results into service results and typed errors.
//! - Push list results into a caller-supplied sink one post at a time.
//!
//! # Invariants
//! - Create checks title uniqueness before inserting and aborts on conflict.
//! - Read/update/delete address posts by the (title, author) key.
//! - Delete succeeds whether or not a post matched.
//! - A failing sink stops enumeration immediately.

use crate::model::post::{validate_key, BlogPost, NewPost, PostId, PostValidationError};
use crate::repo::post_repo::{PostRepository, RepoError};
use log::{debug, info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::ops::ControlFlow;

/// Service error for blog handlers.
#[derive(Debug)]
pub enum BlogServiceError {
    /// Request key is blank.
    InvalidArgument(PostValidationError),
    /// A post with the requested title already exists.
    AlreadyExists { title: String },
    /// No post is addressed by the requested key.
    NotFound { title: String, author: String },
    /// The list stream consumer refused a post.
    Internal(String),
    /// Persistence-layer failure.
    Repo(RepoError),
}

impl Display for BlogServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidArgument(err) => write!(f, "invalid argument: {err}"),
            Self::AlreadyExists { title } => {
                write!(f, "blog post with title `{title}` already exists")
            }
            Self::NotFound { title, author } => write!(
                f,
                "no blog post with title `{title}` and author `{author}`"
            ),
            Self::Internal(details) => write!(f, "internal error: {details}"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for BlogServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::InvalidArgument(err) => Some(err),
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<PostValidationError> for BlogServiceError {
    fn from(value: PostValidationError) -> Self {
        Self::InvalidArgument(value)
    }
}

impl From<RepoError> for BlogServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::NotFound { title, author } => Self::NotFound { title, author },
            other => Self::Repo(other),
        }
    }
}

pub type ServiceResult<T> = Result<T, BlogServiceError>;

/// Consumer refused a streamed post (closed or broken channel).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SinkClosed(pub String);

impl Display for SinkClosed {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "stream consumer closed: {}", self.0)
    }
}

impl Error for SinkClosed {}

impl From<SinkClosed> for BlogServiceError {
    fn from(value: SinkClosed) -> Self {
        Self::Internal(format!("could not deliver list stream: {value}"))
    }
}

/// Receiver side of a list stream.
///
/// `send` may block until the consumer accepts the post.
pub trait PostSink {
    fn send(&mut self, post: BlogPost) -> Result<(), SinkClosed>;
}

impl PostSink for Vec<BlogPost> {
    fn send(&mut self, post: BlogPost) -> Result<(), SinkClosed> {
        self.push(post);
        Ok(())
    }
}

/// Blog service facade over a repository implementation.
pub struct BlogService<R: PostRepository> {
    repo: R,
}

impl<R: PostRepository> BlogService<R> {
    /// Creates a service using the provided repository implementation.
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Creates a post unless its title is already taken.
    pub fn create_blog(&self, post: NewPost) -> ServiceResult<BlogPost> {
        post.validate()?;

        if self.repo.find_by_title(&post.title)?.is_some() {
            warn!(
                "event=blog_create module=service status=rejected reason=already_exists title={:?}",
                post.title
            );
            return Err(BlogServiceError::AlreadyExists { title: post.title });
        }

        let stored = self.repo.insert(&post)?;
        info!(
            "event=blog_create module=service status=ok id={} title={:?} author={:?}",
            stored.id, stored.title, stored.author
        );
        Ok(stored)
    }

    /// Returns the post addressed by (title, author).
    pub fn read_blog(&self, title: &str, author: &str) -> ServiceResult<BlogPost> {
        validate_key(title, author)?;

        let post = self
            .repo
            .find_by_title_and_author(title, author)?
            .ok_or_else(|| not_found(title, author))?;
        debug!("event=blog_read module=service status=ok id={}", post.id);
        Ok(post)
    }

    /// Replaces the content of the post addressed by (title, author).
    ///
    /// A missing key surfaces as `NotFound` from the repository lookup.
    pub fn update_blog(&self, title: &str, author: &str, content: &str) -> ServiceResult<BlogPost> {
        validate_key(title, author)?;

        let updated = self.repo.update(title, author, content)?;
        info!(
            "event=blog_update module=service status=ok id={} title={:?} author={:?}",
            updated.id, title, author
        );
        Ok(updated)
    }

    /// Deletes every post addressed by (title, author) and confirms.
    ///
    /// The confirmation is returned even when nothing matched.
    pub fn delete_blog(&self, title: &str, author: &str) -> ServiceResult<String> {
        validate_key(title, author)?;

        let removed = self.repo.delete(title, author)?;
        info!(
            "event=blog_delete module=service status=ok removed={} title={:?} author={:?}",
            removed, title, author
        );
        Ok(format!(
            "Blog with title {title} and author {author} was successfully deleted."
        ))
    }

    /// Pushes every stored post into `sink`; returns how many were delivered.
    ///
    /// # Errors
    /// - `Internal` when the sink refuses a post; no further rows are read.
    /// - `Repo` when enumeration itself fails.
    pub fn list_blogs(&self, sink: &mut dyn PostSink) -> ServiceResult<usize> {
        let mut delivered = 0usize;
        let mut refused: Option<SinkClosed> = None;

        self.repo.list_all(&mut |post| match sink.send(post) {
            Ok(()) => {
                delivered += 1;
                ControlFlow::Continue(())
            }
            Err(err) => {
                refused = Some(err);
                ControlFlow::Break(())
            }
        })?;

        if let Some(err) = refused {
            warn!(
                "event=blog_list module=service status=aborted delivered={} error={}",
                delivered, err
            );
            return Err(err.into());
        }

        info!(
            "event=blog_list module=service status=ok delivered={}",
            delivered
        );
        Ok(delivered)
    }

    /// Returns one id-ordered page of posts after `after`.
    ///
    /// Lets a caller stream the table in batches without holding the
    /// connection between them.
    pub fn list_page(&self, after: Option<PostId>, limit: usize) -> ServiceResult<Vec<BlogPost>> {
        Ok(self.repo.list_page(after, limit)?)
    }
}

fn not_found(title: &str, author: &str) -> BlogServiceError {
    BlogServiceError::NotFound {
        title: title.to_string(),
        author: author.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::{BlogServiceError, PostSink, SinkClosed};
    use crate::model::post::BlogPost;
    use crate::repo::post_repo::RepoError;
    use uuid::Uuid;

    fn sample_post() -> BlogPost {
        BlogPost {
            id: 7,
            uuid: Uuid::new_v4(),
            title: "Life".to_string(),
            author: "Alice".to_string(),
            content: "body".to_string(),
            created_at: 0,
            updated_at: 0,
        }
    }

    #[test]
    fn repo_not_found_maps_to_service_not_found() {
        let err = BlogServiceError::from(RepoError::NotFound {
            title: "Life".to_string(),
            author: "Alice".to_string(),
        });
        assert!(matches!(err, BlogServiceError::NotFound { .. }));
        assert!(err.to_string().contains("Alice"));
    }

    #[test]
    fn vec_sink_accepts_every_post() {
        let mut sink: Vec<BlogPost> = Vec::new();
        sink.send(sample_post()).unwrap();
        sink.send(sample_post()).unwrap();
        assert_eq!(sink.len(), 2);
    }

    #[test]
    fn sink_closed_message_carries_reason() {
        let err = SinkClosed("peer reset".to_string());
        assert!(err.to_string().contains("peer reset"));
    }

    #[test]
    fn sink_closed_maps_to_internal() {
        let err = BlogServiceError::from(SinkClosed("peer reset".to_string()));
        assert!(matches!(err, BlogServiceError::Internal(ref details) if details.contains("peer reset")));
    }
}
