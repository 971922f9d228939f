//! Post repository contract and SQLite implementation.
//!
//! # Responsibility
//! - Look up, insert, update, delete and enumerate posts by natural key.
//! - Keep SQL details inside the core persistence boundary.
//!
//! # Invariants
//! - Lookups by key return the lowest-id match when several rows share it.
//! - `delete` is idempotent: zero matched rows is not an error.
//! - `list_all` hands rows to the visitor one at a time; it never
//!   materializes the whole table.
//! - `list_page` is keyset-paged by id, so pages stay disjoint while rows are
//!   inserted or deleted between calls.

use crate::db::DbError;
use crate::model::post::{BlogPost, NewPost, PostId};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::ops::ControlFlow;
use uuid::Uuid;

const POST_SELECT_SQL: &str = "SELECT
    id,
    uuid,
    title,
    author,
    content,
    created_at,
    updated_at
FROM posts";

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error for post persistence and query operations.
#[derive(Debug)]
pub enum RepoError {
    Db(DbError),
    NotFound { title: String, author: String },
    InvalidData(String),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound { title, author } => {
                write!(f, "post not found: title `{title}` author `{author}`")
            }
            Self::InvalidData(message) => write!(f, "invalid persisted post data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::NotFound { .. } | Self::InvalidData(_) => None,
        }
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Repository interface over the canonical post collection.
pub trait PostRepository {
    /// Returns the first post with this title, regardless of author.
    fn find_by_title(&self, title: &str) -> RepoResult<Option<BlogPost>>;
    /// Returns the first post with this exact (title, author) key.
    fn find_by_title_and_author(&self, title: &str, author: &str)
        -> RepoResult<Option<BlogPost>>;
    /// Persists a new post and returns it with its assigned id.
    fn insert(&self, post: &NewPost) -> RepoResult<BlogPost>;
    /// Overwrites the content of the post addressed by key.
    fn update(&self, title: &str, author: &str, content: &str) -> RepoResult<BlogPost>;
    /// Removes every post addressed by key; returns the removed row count.
    fn delete(&self, title: &str, author: &str) -> RepoResult<usize>;
    /// Feeds every stored post to `visit` until it returns `Break`.
    fn list_all(&self, visit: &mut dyn FnMut(BlogPost) -> ControlFlow<()>) -> RepoResult<()>;
    /// Returns up to `limit` posts with an id above `after`, lowest id first.
    fn list_page(&self, after: Option<PostId>, limit: usize) -> RepoResult<Vec<BlogPost>>;
}

/// SQLite-backed post repository.
pub struct SqlitePostRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqlitePostRepository<'conn> {
    /// Wraps a connection returned by `db::open_db*` (migrations applied).
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }

    fn get_by_id(&self, id: PostId) -> RepoResult<Option<BlogPost>> {
        let mut stmt = self
            .conn
            .prepare_cached(&format!("{POST_SELECT_SQL} WHERE id = ?1;"))?;
        let row = stmt
            .query_row([id], |row| Ok(parse_post_row(row)))
            .optional()?;
        row.transpose()
    }
}

impl PostRepository for SqlitePostRepository<'_> {
    fn find_by_title(&self, title: &str) -> RepoResult<Option<BlogPost>> {
        let mut stmt = self.conn.prepare_cached(&format!(
            "{POST_SELECT_SQL}
             WHERE title = ?1
             ORDER BY id ASC
             LIMIT 1;"
        ))?;

        let mut rows = stmt.query([title])?;
        match rows.next()? {
            Some(row) => Ok(Some(parse_post_row(row)?)),
            None => Ok(None),
        }
    }

    fn find_by_title_and_author(
        &self,
        title: &str,
        author: &str,
    ) -> RepoResult<Option<BlogPost>> {
        let mut stmt = self.conn.prepare_cached(&format!(
            "{POST_SELECT_SQL}
             WHERE title = ?1 AND author = ?2
             ORDER BY id ASC
             LIMIT 1;"
        ))?;

        let mut rows = stmt.query(params![title, author])?;
        match rows.next()? {
            Some(row) => Ok(Some(parse_post_row(row)?)),
            None => Ok(None),
        }
    }

    fn insert(&self, post: &NewPost) -> RepoResult<BlogPost> {
        let uuid = Uuid::new_v4();
        self.conn.execute(
            "INSERT INTO posts (uuid, title, author, content)
             VALUES (?1, ?2, ?3, ?4);",
            params![
                uuid.to_string(),
                post.title.as_str(),
                post.author.as_str(),
                post.content.as_str(),
            ],
        )?;

        let id = self.conn.last_insert_rowid();
        self.get_by_id(id)?.ok_or_else(|| {
            RepoError::InvalidData(format!("inserted post {id} missing on read-back"))
        })
    }

    fn update(&self, title: &str, author: &str, content: &str) -> RepoResult<BlogPost> {
        let existing = self
            .find_by_title_and_author(title, author)?
            .ok_or_else(|| RepoError::NotFound {
                title: title.to_string(),
                author: author.to_string(),
            })?;

        self.conn.execute(
            "UPDATE posts
             SET
                content = ?1,
                updated_at = (strftime('%s', 'now') * 1000)
             WHERE id = ?2;",
            params![content, existing.id],
        )?;

        self.get_by_id(existing.id)?.ok_or_else(|| {
            RepoError::InvalidData(format!("updated post {} missing on read-back", existing.id))
        })
    }

    fn delete(&self, title: &str, author: &str) -> RepoResult<usize> {
        let removed = self.conn.execute(
            "DELETE FROM posts WHERE title = ?1 AND author = ?2;",
            params![title, author],
        )?;
        Ok(removed)
    }

    fn list_all(&self, visit: &mut dyn FnMut(BlogPost) -> ControlFlow<()>) -> RepoResult<()> {
        let mut stmt = self
            .conn
            .prepare(&format!("{POST_SELECT_SQL} ORDER BY id ASC;"))?;
        let mut rows = stmt.query([])?;

        while let Some(row) = rows.next()? {
            if visit(parse_post_row(row)?).is_break() {
                break;
            }
        }

        Ok(())
    }

    fn list_page(&self, after: Option<PostId>, limit: usize) -> RepoResult<Vec<BlogPost>> {
        let limit = i64::try_from(limit)
            .map_err(|_| RepoError::InvalidData(format!("page size {limit} out of range")))?;
        let mut stmt = self.conn.prepare_cached(&format!(
            "{POST_SELECT_SQL}
             WHERE id > ?1
             ORDER BY id ASC
             LIMIT ?2;"
        ))?;

        let mut rows = stmt.query(params![after.unwrap_or(0), limit])?;
        let mut page = Vec::new();
        while let Some(row) = rows.next()? {
            page.push(parse_post_row(row)?);
        }
        Ok(page)
    }
}

fn parse_post_row(row: &Row<'_>) -> RepoResult<BlogPost> {
    let uuid_text: String = row.get("uuid")?;
    let uuid = Uuid::parse_str(&uuid_text).map_err(|_| {
        RepoError::InvalidData(format!("invalid uuid value `{uuid_text}` in posts.uuid"))
    })?;

    Ok(BlogPost {
        id: row.get("id")?,
        uuid,
        title: row.get("title")?,
        author: row.get("author")?,
        content: row.get("content")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}
