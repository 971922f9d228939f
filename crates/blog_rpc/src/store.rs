//! Owned store handle shared by all request workers.
//!
//! # Responsibility
//! - Own the single migrated SQLite connection for the server process.
//! - Lend a ready `BlogService` to one handler call at a time.
//!
//! # Invariants
//! - The connection lock is held for exactly one unary handler call, so a
//!   create's title check and its insert are never interleaved with another
//!   write.
//! - List streaming holds the lock only while reading one batch; pushing a
//!   batch to a sink happens with the lock released.

use blog_core::db::{open_db, open_db_in_memory, DbResult};
use blog_core::{BlogService, PostSink, ServiceResult, SqlitePostRepository};
use log::{info, warn};
use parking_lot::Mutex;
use rusqlite::Connection;
use std::path::Path;

/// Posts read per lock acquisition while streaming a list.
pub const LIST_BATCH_SIZE: usize = 64;

/// Service type lent to handler closures.
pub type SqliteBlogService<'conn> = BlogService<SqlitePostRepository<'conn>>;

pub struct Store {
    conn: Mutex<Connection>,
}

impl Store {
    /// Opens (and migrates) the database file at `path`.
    pub fn open(path: impl AsRef<Path>) -> DbResult<Self> {
        Ok(Self::from_connection(open_db(path)?))
    }

    pub fn open_in_memory() -> DbResult<Self> {
        Ok(Self::from_connection(open_db_in_memory()?))
    }

    /// Wraps a connection already returned by `blog_core::db::open_db*`.
    pub fn from_connection(conn: Connection) -> Self {
        Self {
            conn: Mutex::new(conn),
        }
    }

    /// Runs `f` with exclusive access to a service over the store.
    ///
    /// Blocks while another call holds the connection; call from a
    /// blocking-capable thread.
    pub fn with_service<T>(&self, f: impl FnOnce(&SqliteBlogService<'_>) -> T) -> T {
        let conn = self.conn.lock();
        let service = BlogService::new(SqlitePostRepository::new(&conn));
        f(&service)
    }

    /// Pushes every stored post into `sink`; returns how many were delivered.
    ///
    /// Rows are read in id-ordered batches of [`LIST_BATCH_SIZE`]. A slow or
    /// blocked sink never holds the connection, so other calls proceed while
    /// a batch is being delivered. Posts written mid-stream may or may not be
    /// included.
    ///
    /// # Errors
    /// - `Internal` when the sink refuses a post; no further batches are read.
    pub fn list_blogs(&self, sink: &mut dyn PostSink) -> ServiceResult<usize> {
        let mut delivered = 0usize;
        let mut after = None;

        loop {
            let page = self.with_service(|service| service.list_page(after, LIST_BATCH_SIZE))?;
            let Some(last) = page.last() else {
                break;
            };
            after = Some(last.id);
            let full = page.len() == LIST_BATCH_SIZE;

            for post in page {
                if let Err(err) = sink.send(post) {
                    warn!(
                        "event=blog_list module=store status=aborted delivered={} error={}",
                        delivered, err
                    );
                    return Err(err.into());
                }
                delivered += 1;
            }

            if !full {
                break;
            }
        }

        info!(
            "event=blog_list module=store status=ok delivered={}",
            delivered
        );
        Ok(delivered)
    }
}

#[cfg(test)]
mod tests {
    use super::{Store, LIST_BATCH_SIZE};
    use blog_core::{BlogPost, BlogServiceError, NewPost, PostSink, SinkClosed};

    fn seeded(count: usize) -> Store {
        let store = Store::open_in_memory().unwrap();
        for n in 0..count {
            store
                .with_service(|service| {
                    service.create_blog(NewPost::new(format!("post-{n}"), "Alice", "body"))
                })
                .unwrap();
        }
        store
    }

    #[test]
    fn file_store_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("blog.db");

        let store = Store::open(&path).unwrap();
        store
            .with_service(|service| service.create_blog(NewPost::new("Life", "Alice", "body")))
            .unwrap();
        drop(store);

        let reopened = Store::open(&path).unwrap();
        let post = reopened
            .with_service(|service| service.read_blog("Life", "Alice"))
            .unwrap();
        assert_eq!(post.content, "body");
    }

    #[test]
    fn list_spans_several_batches() {
        let store = seeded(LIST_BATCH_SIZE * 2 + 3);
        let mut sink: Vec<BlogPost> = Vec::new();

        let delivered = store.list_blogs(&mut sink).unwrap();
        assert_eq!(delivered, LIST_BATCH_SIZE * 2 + 3);
        assert!(sink.windows(2).all(|pair| pair[0].id < pair[1].id));
    }

    #[test]
    fn list_exactly_one_full_batch_ends_cleanly() {
        let store = seeded(LIST_BATCH_SIZE);
        let mut sink: Vec<BlogPost> = Vec::new();
        assert_eq!(store.list_blogs(&mut sink).unwrap(), LIST_BATCH_SIZE);
    }

    /// Issues a write from inside every `send`; deadlocks if the lock is held.
    struct WritingSink<'a> {
        store: &'a Store,
        seen: usize,
    }

    impl PostSink for WritingSink<'_> {
        fn send(&mut self, post: BlogPost) -> Result<(), SinkClosed> {
            self.seen += 1;
            self.store
                .with_service(|service| service.update_blog(&post.title, &post.author, "seen"))
                .map(|_| ())
                .map_err(|err| SinkClosed(err.to_string()))
        }
    }

    #[test]
    fn sink_runs_without_the_connection_lock() {
        let store = seeded(LIST_BATCH_SIZE + 1);
        let mut sink = WritingSink {
            store: &store,
            seen: 0,
        };

        assert_eq!(store.list_blogs(&mut sink).unwrap(), LIST_BATCH_SIZE + 1);
        assert_eq!(sink.seen, LIST_BATCH_SIZE + 1);
        let post = store
            .with_service(|service| service.read_blog("post-0", "Alice"))
            .unwrap();
        assert_eq!(post.content, "seen");
    }

    /// Refuses every post after the first.
    struct OneShotSink {
        attempts: usize,
    }

    impl PostSink for OneShotSink {
        fn send(&mut self, _post: BlogPost) -> Result<(), SinkClosed> {
            self.attempts += 1;
            if self.attempts > 1 {
                return Err(SinkClosed("receiver dropped".to_string()));
            }
            Ok(())
        }
    }

    #[test]
    fn refused_send_aborts_with_internal() {
        let store = seeded(LIST_BATCH_SIZE + 1);
        let mut sink = OneShotSink { attempts: 0 };

        let err = store.list_blogs(&mut sink).unwrap_err();
        assert!(matches!(err, BlogServiceError::Internal(_)));
        assert_eq!(sink.attempts, 2);
    }
}
