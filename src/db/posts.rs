use rusqlite::{params, Connection, OptionalExtension, Row};

use super::models::{Post, PostWithAuthor};
use super::pagination::{offset, Page};

const POST_WITH_AUTHOR: &str = "SELECT p.id, p.user_id, p.title, p.content, p.created_at,
            u.username, u.image_file
     FROM posts p
     JOIN users u ON u.id = p.user_id";

fn map_post_with_author(row: &Row<'_>) -> rusqlite::Result<PostWithAuthor> {
    Ok(PostWithAuthor {
        post: Post {
            id: row.get(0)?,
            user_id: row.get(1)?,
            title: row.get(2)?,
            content: row.get(3)?,
            created_at: row.get(4)?,
        },
        author_username: row.get(5)?,
        author_image_file: row.get(6)?,
    })
}

pub fn insert(conn: &Connection, user_id: i64, title: &str, content: &str) -> rusqlite::Result<i64> {
    conn.execute(
        "INSERT INTO posts (user_id, title, content) VALUES (?1, ?2, ?3)",
        params![user_id, title, content],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn find_with_author(conn: &Connection, id: i64) -> rusqlite::Result<Option<PostWithAuthor>> {
    conn.query_row(
        &format!("{} WHERE p.id = ?1", POST_WITH_AUTHOR),
        params![id],
        map_post_with_author,
    )
    .optional()
}

/// Title and content only; author and timestamp never change.
pub fn update(conn: &Connection, id: i64, title: &str, content: &str) -> rusqlite::Result<()> {
    conn.execute(
        "UPDATE posts SET title = ?1, content = ?2 WHERE id = ?3",
        params![title, content, id],
    )?;
    Ok(())
}

pub fn delete(conn: &Connection, id: i64) -> rusqlite::Result<()> {
    conn.execute("DELETE FROM posts WHERE id = ?1", params![id])?;
    Ok(())
}

/// Every post, newest first.
pub fn list_recent(
    conn: &Connection,
    page: u32,
    per_page: u32,
) -> rusqlite::Result<Page<PostWithAuthor>> {
    let total: i64 = conn.query_row("SELECT COUNT(*) FROM posts", [], |row| row.get(0))?;

    let mut stmt = conn.prepare(&format!(
        "{} ORDER BY p.created_at DESC, p.id DESC LIMIT ?1 OFFSET ?2",
        POST_WITH_AUTHOR
    ))?;
    let items = stmt
        .query_map(
            params![i64::from(per_page), offset(page, per_page)],
            map_post_with_author,
        )?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    Ok(Page {
        items,
        page,
        per_page,
        total,
    })
}

/// One author's posts, newest first.
pub fn list_by_author(
    conn: &Connection,
    user_id: i64,
    page: u32,
    per_page: u32,
) -> rusqlite::Result<Page<PostWithAuthor>> {
    let total: i64 = conn.query_row(
        "SELECT COUNT(*) FROM posts WHERE user_id = ?1",
        params![user_id],
        |row| row.get(0),
    )?;

    let mut stmt = conn.prepare(&format!(
        "{} WHERE p.user_id = ?1 ORDER BY p.created_at DESC, p.id DESC LIMIT ?2 OFFSET ?3",
        POST_WITH_AUTHOR
    ))?;
    let items = stmt
        .query_map(
            params![user_id, i64::from(per_page), offset(page, per_page)],
            map_post_with_author,
        )?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    Ok(Page {
        items,
        page,
        per_page,
        total,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::pagination::PER_PAGE;
    use crate::db::{test_pool, users};

    fn titles(page: &Page<PostWithAuthor>) -> Vec<String> {
        page.items.iter().map(|p| p.post.title.clone()).collect()
    }

    #[test]
    fn find_with_author_joins_username() {
        let (_tmp, pool) = test_pool();
        let conn = pool.get().unwrap();
        let uid = users::insert(&conn, "alice", "alice@example.com", "h").unwrap();
        let pid = insert(&conn, uid, "Hello", "World").unwrap();

        let found = find_with_author(&conn, pid).unwrap().unwrap();
        assert_eq!(found.post.user_id, uid);
        assert_eq!(found.author_username, "alice");
        assert!(find_with_author(&conn, pid + 1).unwrap().is_none());
    }

    #[test]
    fn update_keeps_author_and_timestamp() {
        let (_tmp, pool) = test_pool();
        let conn = pool.get().unwrap();
        let uid = users::insert(&conn, "alice", "alice@example.com", "h").unwrap();
        let pid = insert(&conn, uid, "Hello", "World").unwrap();
        let before = find_with_author(&conn, pid).unwrap().unwrap();

        update(&conn, pid, "Hi", "There").unwrap();

        let after = find_with_author(&conn, pid).unwrap().unwrap();
        assert_eq!(after.post.title, "Hi");
        assert_eq!(after.post.content, "There");
        assert_eq!(after.post.user_id, uid);
        assert_eq!(after.post.created_at, before.post.created_at);
    }

    #[test]
    fn delete_removes_row() {
        let (_tmp, pool) = test_pool();
        let conn = pool.get().unwrap();
        let uid = users::insert(&conn, "alice", "alice@example.com", "h").unwrap();
        let pid = insert(&conn, uid, "Hello", "World").unwrap();
        delete(&conn, pid).unwrap();
        assert!(find_with_author(&conn, pid).unwrap().is_none());
    }

    #[test]
    fn twelve_posts_paginate_newest_first() {
        let (_tmp, pool) = test_pool();
        let conn = pool.get().unwrap();
        let uid = users::insert(&conn, "alice", "alice@example.com", "h").unwrap();
        for n in 1..=12 {
            insert(&conn, uid, &format!("post {}", n), "body").unwrap();
        }

        let first = list_recent(&conn, 1, PER_PAGE).unwrap();
        assert_eq!(first.total, 12);
        assert_eq!(
            titles(&first),
            vec!["post 12", "post 11", "post 10", "post 9", "post 8"]
        );

        let third = list_recent(&conn, 3, PER_PAGE).unwrap();
        assert_eq!(titles(&third), vec!["post 2", "post 1"]);

        let fourth = list_recent(&conn, 4, PER_PAGE).unwrap();
        assert!(fourth.items.is_empty());
    }

    #[test]
    fn newer_timestamps_sort_before_higher_ids() {
        let (_tmp, pool) = test_pool();
        let conn = pool.get().unwrap();
        let uid = users::insert(&conn, "alice", "alice@example.com", "h").unwrap();
        let old = insert(&conn, uid, "old", "body").unwrap();
        insert(&conn, uid, "older", "body").unwrap();
        conn.execute(
            "UPDATE posts SET created_at = '2020-01-01 00:00:00' WHERE title = 'older'",
            [],
        )
        .unwrap();
        conn.execute(
            "UPDATE posts SET created_at = '2021-01-01 00:00:00' WHERE id = ?1",
            params![old],
        )
        .unwrap();

        let page = list_recent(&conn, 1, PER_PAGE).unwrap();
        assert_eq!(titles(&page), vec!["old", "older"]);
    }

    #[test]
    fn list_by_author_filters() {
        let (_tmp, pool) = test_pool();
        let conn = pool.get().unwrap();
        let alice = users::insert(&conn, "alice", "alice@example.com", "h").unwrap();
        let bob = users::insert(&conn, "bob", "bob@example.com", "h").unwrap();
        insert(&conn, alice, "a1", "x").unwrap();
        insert(&conn, bob, "b1", "x").unwrap();
        insert(&conn, alice, "a2", "x").unwrap();

        let page = list_by_author(&conn, alice, 1, PER_PAGE).unwrap();
        assert_eq!(page.total, 2);
        assert_eq!(titles(&page), vec!["a2", "a1"]);
        assert!(page.items.iter().all(|p| p.author_username == "alice"));
    }
}
