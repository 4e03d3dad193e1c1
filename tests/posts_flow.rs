mod common;

use axum::http::StatusCode;
use common::{body_text, location, TestApp};

#[tokio::test]
async fn created_post_belongs_to_author_and_lists_newest_first() {
    let app = TestApp::new();
    let mut alice = app.signed_in("alice").await;

    let response = alice.create_post("First thoughts", "Hello there").await;
    assert_eq!(location(&response), "/");
    alice.create_post("Second thoughts", "General Kenobi").await;

    let conn = app.pool.get().unwrap();
    let author: i64 = conn
        .query_row(
            "SELECT user_id FROM posts WHERE title = 'First thoughts'",
            [],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(author, app.user_id("alice"));
    drop(conn);

    let home = alice.page("/").await;
    assert!(home.contains("Your post has been created!"));
    let first = home.find("First thoughts").unwrap();
    let second = home.find("Second thoughts").unwrap();
    assert!(second < first, "newest post should come first");

    let listing = alice.page("/user/alice").await;
    assert!(listing.contains("Posts by alice (2)"));
    assert!(listing.find("Second thoughts").unwrap() < listing.find("First thoughts").unwrap());
}

#[tokio::test]
async fn blank_post_is_rerendered_with_errors() {
    let app = TestApp::new();
    let mut alice = app.signed_in("alice").await;

    let response = alice.create_post("", "body").await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_text(response).await;
    assert!(body.contains("New Post"));
    assert!(body.contains("This field is required."));
    assert_eq!(app.count("SELECT COUNT(*) FROM posts"), 0);
}

#[tokio::test]
async fn post_page_shows_title_and_owner_controls() {
    let app = TestApp::new();
    let mut alice = app.signed_in("alice").await;
    alice.create_post("Mine", "Contents").await;

    let page = alice.page("/post/1").await;
    assert!(page.contains("<title>Pahina - Mine by alice</title>"));
    assert!(page.contains("/post/1/edit"));

    let mut visitor = app.browser();
    let page = visitor.page("/post/1").await;
    assert!(page.contains("Contents"));
    assert!(!page.contains("/post/1/edit"));
}

#[tokio::test]
async fn owner_can_update_and_delete() {
    let app = TestApp::new();
    let mut alice = app.signed_in("alice").await;
    alice.create_post("Draft", "v1").await;

    let form = alice.page("/post/1/edit").await;
    assert!(form.contains("Update Post"));
    assert!(form.contains("value=\"Draft\""));

    let response = alice
        .post_form("/post/1/edit", &[("title", "Final"), ("content", "v2")])
        .await;
    assert_eq!(location(&response), "/post/1");
    let page = alice.page("/post/1").await;
    assert!(page.contains("Your post has been updated!"));
    assert!(page.contains("Final"));

    let response = alice.post_form("/post/1/delete", &[]).await;
    assert_eq!(location(&response), "/");
    assert_eq!(app.count("SELECT COUNT(*) FROM posts"), 0);
    assert_eq!(alice.get("/post/1").await.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn non_owner_cannot_touch_a_post() {
    let app = TestApp::new();
    let mut alice = app.signed_in("alice").await;
    alice.create_post("Alice's post", "original").await;
    let mut bob = app.signed_in("bob").await;

    assert_eq!(bob.get("/post/1/edit").await.status(), StatusCode::FORBIDDEN);

    let response = bob
        .post_form("/post/1/edit", &[("title", "pwned"), ("content", "pwned")])
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = bob.post_form("/post/1/delete", &[]).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let conn = app.pool.get().unwrap();
    let (title, content): (String, String) = conn
        .query_row("SELECT title, content FROM posts WHERE id = 1", [], |row| {
            Ok((row.get(0)?, row.get(1)?))
        })
        .unwrap();
    assert_eq!(title, "Alice's post");
    assert_eq!(content, "original");
}

#[tokio::test]
async fn missing_posts_and_users_are_404() {
    let app = TestApp::new();
    let mut alice = app.signed_in("alice").await;

    assert_eq!(alice.get("/post/99").await.status(), StatusCode::NOT_FOUND);
    assert_eq!(alice.get("/post/abc").await.status(), StatusCode::NOT_FOUND);
    assert_eq!(alice.get("/post/99/edit").await.status(), StatusCode::NOT_FOUND);
    assert_eq!(
        alice.post_form("/post/99/delete", &[]).await.status(),
        StatusCode::NOT_FOUND
    );
    assert_eq!(alice.get("/user/nobody").await.status(), StatusCode::NOT_FOUND);
    assert_eq!(alice.get("/no/such/page").await.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn twelve_posts_paginate_by_five() {
    let app = TestApp::new();
    let mut alice = app.signed_in("alice").await;
    for n in 1..=12 {
        alice
            .create_post(&format!("Entry {:02}", n), "body")
            .await;
    }

    let entries = |page: &str| -> Vec<String> {
        (1..=12)
            .map(|n| format!("Entry {:02}", n))
            .filter(|title| page.contains(title.as_str()))
            .collect()
    };

    let first = alice.page("/").await;
    assert_eq!(
        entries(&first),
        vec!["Entry 08", "Entry 09", "Entry 10", "Entry 11", "Entry 12"]
    );
    assert!(first.find("Entry 12").unwrap() < first.find("Entry 08").unwrap());

    let third = alice.page("/?page=3").await;
    assert_eq!(entries(&third), vec!["Entry 01", "Entry 02"]);

    let fourth = alice.page("/?page=4").await;
    assert!(entries(&fourth).is_empty());

    let junk = alice.page("/?page=abc").await;
    assert_eq!(entries(&junk), entries(&first));

    let by_author = alice.page("/user/alice?page=2").await;
    assert_eq!(
        entries(&by_author),
        vec!["Entry 03", "Entry 04", "Entry 05", "Entry 06", "Entry 07"]
    );
    assert!(by_author.contains("Posts by alice (12)"));
}
