//! Wire messages for the blog RPC surface.
//!
//! # Responsibility
//! - Define request/response shapes for the five blog RPCs.
//! - Frame messages as newline-delimited JSON.
//!
//! # Invariants
//! - One frame per line; frames never contain a raw newline.
//! - A list call answers with zero or more `StreamItem` frames followed by
//!   exactly one `StreamEnd` or `Error` frame.

use blog_core::{BlogPost, BlogServiceError};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// A blog post as seen by RPC callers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Blog {
    /// Absent in update and list responses.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub title: String,
    pub author: String,
    pub content: String,
}

impl Blog {
    pub fn new(
        title: impl Into<String>,
        author: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            id: None,
            title: title.into(),
            author: author.into(),
            content: content.into(),
        }
    }

    /// Full projection including the storage id.
    pub fn with_id(post: BlogPost) -> Self {
        Self {
            id: Some(post.id),
            ..Self::without_id(post)
        }
    }

    /// Projection used by update and list responses.
    pub fn without_id(post: BlogPost) -> Self {
        Self {
            id: None,
            title: post.title,
            author: post.author,
            content: post.content,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateBlogRequest {
    pub blog: Blog,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateBlogResponse {
    pub blog: Blog,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadBlogRequest {
    pub title: String,
    pub author: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadBlogResponse {
    pub blog: Blog,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateBlogRequest {
    pub title: String,
    pub author: String,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateBlogResponse {
    pub blog: Blog,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteBlogRequest {
    pub title: String,
    pub author: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteBlogResponse {
    pub confirmation: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListBlogsRequest {}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListBlogsResponse {
    pub blog: Blog,
}

/// Client-to-server envelope, tagged by RPC name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "method", content = "params")]
pub enum Request {
    CreateBlog(CreateBlogRequest),
    ReadBlog(ReadBlogRequest),
    UpdateBlog(UpdateBlogRequest),
    DeleteBlog(DeleteBlogRequest),
    ListBlogs(ListBlogsRequest),
}

impl Request {
    /// RPC name used in logs.
    pub fn method(&self) -> &'static str {
        match self {
            Self::CreateBlog(_) => "CreateBlog",
            Self::ReadBlog(_) => "ReadBlog",
            Self::UpdateBlog(_) => "UpdateBlog",
            Self::DeleteBlog(_) => "DeleteBlog",
            Self::ListBlogs(_) => "ListBlogs",
        }
    }
}

/// Single-message replies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "method", content = "result")]
pub enum Response {
    CreateBlog(CreateBlogResponse),
    ReadBlog(ReadBlogResponse),
    UpdateBlog(UpdateBlogResponse),
    DeleteBlog(DeleteBlogResponse),
}

/// Server-to-client envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "frame", content = "body", rename_all = "snake_case")]
pub enum Frame {
    Unary(Response),
    StreamItem(ListBlogsResponse),
    StreamEnd,
    Error(Status),
}

/// Distinguishable failure kinds reported to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Code {
    AlreadyExists,
    NotFound,
    InvalidArgument,
    Internal,
}

impl Code {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::AlreadyExists => "already_exists",
            Self::NotFound => "not_found",
            Self::InvalidArgument => "invalid_argument",
            Self::Internal => "internal",
        }
    }
}

/// RPC failure: a code plus a human-readable message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Status {
    pub code: Code,
    pub message: String,
}

impl Status {
    pub fn new(code: Code, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl Display for Status {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code.as_str(), self.message)
    }
}

impl Error for Status {}

impl From<BlogServiceError> for Status {
    fn from(value: BlogServiceError) -> Self {
        let code = match &value {
            BlogServiceError::InvalidArgument(_) => Code::InvalidArgument,
            BlogServiceError::AlreadyExists { .. } => Code::AlreadyExists,
            BlogServiceError::NotFound { .. } => Code::NotFound,
            BlogServiceError::Internal(_) | BlogServiceError::Repo(_) => Code::Internal,
        };
        Self::new(code, value.to_string())
    }
}

/// Serializes `value` as one newline-terminated frame.
pub fn encode_line<T: Serialize>(value: &T) -> serde_json::Result<String> {
    let mut line = serde_json::to_string(value)?;
    line.push('\n');
    Ok(line)
}

/// Parses one frame; surrounding whitespace (including the newline) is ignored.
pub fn decode_line<T: DeserializeOwned>(line: &str) -> serde_json::Result<T> {
    serde_json::from_str(line.trim())
}

#[cfg(test)]
mod tests {
    use super::*;
    use blog_core::PostValidationError;
    use serde_json::json;

    #[test]
    fn request_is_tagged_by_method_name() {
        let request = Request::ReadBlog(ReadBlogRequest {
            title: "Life".to_string(),
            author: "Alice".to_string(),
        });
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(
            value,
            json!({"method": "ReadBlog", "params": {"title": "Life", "author": "Alice"}})
        );
    }

    #[test]
    fn list_request_parses_with_empty_params() {
        let request: Request = decode_line("{\"method\":\"ListBlogs\",\"params\":{}}\n").unwrap();
        assert_eq!(request.method(), "ListBlogs");
    }

    #[test]
    fn blog_without_id_omits_the_field() {
        let line = encode_line(&Frame::StreamItem(ListBlogsResponse {
            blog: Blog::new("Life", "Alice", "body"),
        }))
        .unwrap();
        assert!(line.ends_with('\n'));
        assert!(!line.contains("\"id\""));

        let value: serde_json::Value = decode_line(&line).unwrap();
        assert_eq!(value["frame"], "stream_item");
    }

    #[test]
    fn stream_end_has_no_body() {
        let line = encode_line(&Frame::StreamEnd).unwrap();
        assert_eq!(line, "{\"frame\":\"stream_end\"}\n");
        assert_eq!(decode_line::<Frame>(&line).unwrap(), Frame::StreamEnd);
    }

    #[test]
    fn service_errors_map_to_distinct_codes() {
        let invalid = Status::from(BlogServiceError::InvalidArgument(
            PostValidationError::BlankTitle,
        ));
        assert_eq!(invalid.code, Code::InvalidArgument);

        let exists = Status::from(BlogServiceError::AlreadyExists {
            title: "Life".to_string(),
        });
        assert_eq!(exists.code, Code::AlreadyExists);
        assert!(exists.message.contains("Life"));

        let internal = Status::from(BlogServiceError::Internal("closed".to_string()));
        assert_eq!(internal.code, Code::Internal);
        assert_eq!(internal.to_string(), "internal: internal error: closed");
    }
}
