//! E2E tests for timeline assembly

mod common;

use common::{TestServer, post_ids};
use serde_json::json;

#[tokio::test]
async fn test_empty_timeline() {
    let server = TestServer::new().await;

    let body = server.get_json("/api/timeline", None).await;
    assert_eq!(body["posts"], json!([]));
    assert_eq!(body["has_more"], false);
}

#[tokio::test]
async fn test_anonymous_viewer_sees_only_public_posts() {
    let server = TestServer::new().await;
    let author = server.signup("author").await;

    let public = server.create_post(&author, "hello world", false).await;
    let private = server.create_post(&author, "friends only", true).await;

    let anonymous = server.get_json("/api/timeline", None).await;
    assert_eq!(post_ids(&anonymous["posts"]), vec![public.clone()]);

    let own = server.get_json("/api/timeline", Some(&author)).await;
    assert_eq!(post_ids(&own["posts"]), vec![private, public]);
}

#[tokio::test]
async fn test_has_more_reflects_raw_page_length() {
    let server = TestServer::new().await;
    let author = server.signup("author").await;

    server.create_post(&author, "one", false).await;
    server.create_post(&author, "two", true).await;
    server.create_post(&author, "three", false).await;

    // Newest two are "three" (public) and "two" (private): one survives
    let first = server.get_json("/api/timeline?limit=2", None).await;
    assert_eq!(first["posts"].as_array().unwrap().len(), 1);
    assert_eq!(first["posts"][0]["comment"], "three");
    assert_eq!(first["has_more"], true);

    let second = server
        .get_json("/api/timeline?offset=2&limit=2", None)
        .await;
    assert_eq!(second["posts"][0]["comment"], "one");
    assert_eq!(second["has_more"], false);
}

#[tokio::test]
async fn test_scope_filter() {
    let server = TestServer::new().await;
    let author = server.signup("author").await;

    let public = server.create_post(&author, "public", false).await;
    let private = server.create_post(&author, "private", true).await;

    let only_private = server
        .get_json("/api/timeline?scope=private", Some(&author))
        .await;
    assert_eq!(post_ids(&only_private["posts"]), vec![private]);

    let only_public = server
        .get_json("/api/timeline?scope=public", Some(&author))
        .await;
    assert_eq!(post_ids(&only_public["posts"]), vec![public]);
}

#[tokio::test]
async fn test_timeline_posts_carry_stats_and_actions() {
    let server = TestServer::new().await;
    let author = server.signup("author").await;
    let reader = server.signup("reader").await;
    let post = server.create_post(&author, "likeable", false).await;

    let like = server
        .post(&format!("/api/posts/{post}/like"), Some(&reader), json!({}))
        .await;
    assert_eq!(like.status(), 200);

    let quote = server
        .post(
            &format!("/api/posts/{post}/quotes"),
            Some(&reader),
            json!({ "comment": "so true" }),
        )
        .await;
    assert_eq!(quote.status(), 200);

    let timeline = server.get_json("/api/timeline", Some(&reader)).await;
    let posts = timeline["posts"].as_array().unwrap();
    assert_eq!(posts.len(), 2);

    // Newest first: the quote, then the original
    assert_eq!(posts[0]["comment"], "so true");
    assert_eq!(posts[0]["quoted_post"]["id"], post.as_str());
    assert_eq!(posts[0]["quoted_post"]["author"]["nickname"], "author");
    assert!(posts[0]["quoted_post"].get("stats").is_none());

    assert_eq!(posts[1]["stats"]["like_count"], 1);
    assert_eq!(posts[1]["stats"]["repost_count"], 1);
    assert_eq!(posts[1]["actions"]["is_liked"], true);

    let anonymous = server.get_json("/api/timeline", None).await;
    assert_eq!(anonymous["posts"][1]["actions"]["is_liked"], false);
}

#[tokio::test]
async fn test_limit_is_clamped() {
    let server = TestServer::new().await;
    let author = server.signup("author").await;
    server.create_post(&author, "only", false).await;

    let response = server.get("/api/timeline?limit=100000", None).await;
    assert_eq!(response.status(), 200);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["has_more"], false);
}
