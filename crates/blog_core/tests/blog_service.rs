use blog_core::db::open_db_in_memory;
use blog_core::{
    BlogPost, BlogService, BlogServiceError, NewPost, PostSink, PostValidationError, SinkClosed,
    SqlitePostRepository,
};
use rusqlite::Connection;
use std::collections::BTreeSet;

fn with_service<T>(
    conn: &Connection,
    f: impl FnOnce(&BlogService<SqlitePostRepository<'_>>) -> T,
) -> T {
    let service = BlogService::new(SqlitePostRepository::new(conn));
    f(&service)
}

fn row_count(conn: &Connection) -> i64 {
    conn.query_row("SELECT COUNT(*) FROM posts;", [], |row| row.get(0))
        .unwrap()
}

/// Accepts `capacity` posts, then refuses everything.
struct ClosingSink {
    accepted: Vec<BlogPost>,
    capacity: usize,
    attempts: usize,
}

impl PostSink for ClosingSink {
    fn send(&mut self, post: BlogPost) -> Result<(), SinkClosed> {
        self.attempts += 1;
        if self.accepted.len() == self.capacity {
            return Err(SinkClosed("peer went away".to_string()));
        }
        self.accepted.push(post);
        Ok(())
    }
}

#[test]
fn create_returns_post_with_assigned_id_and_inputs() {
    let conn = open_db_in_memory().unwrap();
    let post = with_service(&conn, |service| {
        service
            .create_blog(NewPost::new("Life", "Alice", "body1"))
            .unwrap()
    });

    assert!(post.id > 0);
    assert_eq!(post.title, "Life");
    assert_eq!(post.author, "Alice");
    assert_eq!(post.content, "body1");
}

#[test]
fn create_with_taken_title_is_rejected_without_insert() {
    let conn = open_db_in_memory().unwrap();
    with_service(&conn, |service| {
        service
            .create_blog(NewPost::new("Life", "Alice", "body1"))
            .unwrap();
        let err = service
            .create_blog(NewPost::new("Life", "Bob", "body2"))
            .unwrap_err();
        assert!(matches!(err, BlogServiceError::AlreadyExists { ref title } if title == "Life"));
    });

    assert_eq!(row_count(&conn), 1);
}

#[test]
fn blank_keys_are_invalid_arguments() {
    let conn = open_db_in_memory().unwrap();
    with_service(&conn, |service| {
        let create = service
            .create_blog(NewPost::new(" ", "Alice", "body"))
            .unwrap_err();
        assert!(matches!(
            create,
            BlogServiceError::InvalidArgument(PostValidationError::BlankTitle)
        ));

        let read = service.read_blog("Life", "").unwrap_err();
        assert!(matches!(
            read,
            BlogServiceError::InvalidArgument(PostValidationError::BlankAuthor)
        ));

        assert!(service.update_blog("", "", "x").is_err());
        assert!(service.delete_blog("", "Alice").is_err());
    });

    assert_eq!(row_count(&conn), 0);
}

#[test]
fn read_unknown_key_is_not_found() {
    let conn = open_db_in_memory().unwrap();
    with_service(&conn, |service| {
        service
            .create_blog(NewPost::new("Life", "Alice", "body1"))
            .unwrap();
        let err = service.read_blog("Life", "Bob").unwrap_err();
        assert!(matches!(err, BlogServiceError::NotFound { .. }));
    });
}

#[test]
fn update_changes_only_content() {
    let conn = open_db_in_memory().unwrap();
    with_service(&conn, |service| {
        let created = service
            .create_blog(NewPost::new("Life", "Alice", "body1"))
            .unwrap();
        let updated = service.update_blog("Life", "Alice", "edited").unwrap();

        assert_eq!(updated.id, created.id);
        assert_eq!(updated.title, created.title);
        assert_eq!(updated.author, created.author);
        assert_eq!(updated.content, "edited");
        assert_eq!(service.read_blog("Life", "Alice").unwrap().content, "edited");
    });
}

#[test]
fn update_unknown_key_is_not_found() {
    let conn = open_db_in_memory().unwrap();
    with_service(&conn, |service| {
        let err = service.update_blog("Life", "Alice", "x").unwrap_err();
        assert!(matches!(err, BlogServiceError::NotFound { .. }));
    });
    assert_eq!(row_count(&conn), 0);
}

#[test]
fn update_with_other_author_is_not_found_and_leaves_post_untouched() {
    let conn = open_db_in_memory().unwrap();
    with_service(&conn, |service| {
        service
            .create_blog(NewPost::new("Life", "Alice", "body1"))
            .unwrap();

        let err = service.update_blog("Life", "Bob", "x").unwrap_err();
        match err {
            BlogServiceError::NotFound { title, author } => {
                assert_eq!(title, "Life");
                assert_eq!(author, "Bob");
            }
            other => panic!("expected NotFound, got {other:?}"),
        }
        assert_eq!(service.read_blog("Life", "Alice").unwrap().content, "body1");
    });
    assert_eq!(row_count(&conn), 1);
}

#[test]
fn list_page_serves_batches_in_id_order() {
    let conn = open_db_in_memory().unwrap();
    with_service(&conn, |service| {
        for title in ["P1", "P2", "P3"] {
            service
                .create_blog(NewPost::new(title, "Alice", "body"))
                .unwrap();
        }

        let first = service.list_page(None, 2).unwrap();
        assert_eq!(first.len(), 2);
        let rest = service.list_page(Some(first[1].id), 2).unwrap();
        assert_eq!(rest.len(), 1);
        assert_eq!(rest[0].title, "P3");
    });
}

#[test]
fn delete_missing_key_still_confirms() {
    let conn = open_db_in_memory().unwrap();
    with_service(&conn, |service| {
        service
            .create_blog(NewPost::new("Life", "Alice", "body1"))
            .unwrap();
        let confirmation = service.delete_blog("Ghost", "Nobody").unwrap();
        assert_eq!(
            confirmation,
            "Blog with title Ghost and author Nobody was successfully deleted."
        );
    });
    assert_eq!(row_count(&conn), 1);
}

#[test]
fn list_yields_exactly_created_posts() {
    let conn = open_db_in_memory().unwrap();
    with_service(&conn, |service| {
        for title in ["P1", "P2", "P3"] {
            service
                .create_blog(NewPost::new(title, "Alice", format!("{title} body")))
                .unwrap();
        }

        let mut sink: Vec<BlogPost> = Vec::new();
        let delivered = service.list_blogs(&mut sink).unwrap();

        assert_eq!(delivered, 3);
        let titles: BTreeSet<_> = sink.into_iter().map(|post| post.title).collect();
        let expected: BTreeSet<String> = ["P1", "P2", "P3"].map(String::from).into();
        assert_eq!(titles, expected);
    });
}

#[test]
fn list_on_empty_table_is_empty_not_error() {
    let conn = open_db_in_memory().unwrap();
    with_service(&conn, |service| {
        let mut sink: Vec<BlogPost> = Vec::new();
        assert_eq!(service.list_blogs(&mut sink).unwrap(), 0);
        assert!(sink.is_empty());
    });
}

#[test]
fn list_aborts_with_internal_when_sink_closes() {
    let conn = open_db_in_memory().unwrap();
    with_service(&conn, |service| {
        for title in ["P1", "P2", "P3", "P4"] {
            service
                .create_blog(NewPost::new(title, "Alice", "body"))
                .unwrap();
        }

        let mut sink = ClosingSink {
            accepted: Vec::new(),
            capacity: 1,
            attempts: 0,
        };
        let err = service.list_blogs(&mut sink).unwrap_err();

        assert!(matches!(err, BlogServiceError::Internal(_)));
        assert_eq!(sink.accepted.len(), 1);
        assert_eq!(sink.attempts, 2, "enumeration must stop at the first refusal");
    });
}

#[test]
fn life_alice_bob_scenario() {
    let conn = open_db_in_memory().unwrap();
    with_service(&conn, |service| {
        let created = service
            .create_blog(NewPost::new("Life", "Alice", "body1"))
            .unwrap();
        assert_eq!(created.id, 1);

        let conflict = service
            .create_blog(NewPost::new("Life", "Bob", "body2"))
            .unwrap_err();
        assert!(matches!(conflict, BlogServiceError::AlreadyExists { .. }));

        assert_eq!(service.read_blog("Life", "Alice").unwrap().content, "body1");

        let updated = service
            .update_blog("Life", "Alice", "body1-edited")
            .unwrap();
        assert_eq!(updated.content, "body1-edited");

        let confirmation = service.delete_blog("Life", "Alice").unwrap();
        assert!(confirmation.contains("Life"));
        assert!(confirmation.contains("Alice"));

        let gone = service.read_blog("Life", "Alice").unwrap_err();
        assert!(matches!(gone, BlogServiceError::NotFound { .. }));
    });
}
