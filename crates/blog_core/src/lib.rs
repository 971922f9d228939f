//! Core domain logic for the blog post service.
//! This crate owns the post model, its storage and the five RPC handlers.

pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use model::post::{validate_key, BlogPost, NewPost, PostId, PostValidationError};
pub use repo::post_repo::{PostRepository, RepoError, RepoResult, SqlitePostRepository};
pub use service::blog_service::{
    BlogService, BlogServiceError, PostSink, ServiceResult, SinkClosed,
};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
