mod common;

use axum::http::StatusCode;
use common::{TestApp, SMALL_GIF};
use yt_core::models::{FeedScope, Post};
use yt_core::traits::ContentRepo;

async fn only_post(app: &TestApp) -> Post {
    let mut posts = app.repo.list_posts(FeedScope::All, 10, 0).await.unwrap();
    assert_eq!(posts.len(), 1);
    posts.remove(0)
}

#[tokio::test]
async fn create_with_group_and_image() {
    let app = TestApp::new().await;
    let group = app.group("cats").await;
    let mut leo = app.user("leo").await;

    let group_id = group.id.to_string();
    leo.post_multipart(
        "/create/",
        &[("text", "A cat picture"), ("group", group_id.as_str())],
        Some(("cat.gif", SMALL_GIF)),
    )
    .await
    .assert_redirect("/profile/leo/");

    let post = only_post(&app).await;
    assert_eq!(post.text, "A cat picture");
    assert_eq!(post.group.as_ref().map(|g| g.slug.as_str()), Some("cats"));
    let image = post.image.clone().expect("image stored");
    assert!(image.starts_with("posts/"));

    let group_page = app.client().get("/group/cats/").await;
    assert_eq!(group_page.status, StatusCode::OK);
    assert!(group_page.body.contains("A cat picture"));
    assert!(group_page.body.contains(".webp"));

    let detail = app.client().get(&format!("/posts/{}/", post.id)).await;
    assert!(detail.body.contains(&format!("/media/{image}")));
    assert_eq!(
        app.client().get(&format!("/media/{image}")).await.status,
        StatusCode::OK
    );
}

#[tokio::test]
async fn invalid_post_form_is_rerendered() {
    let app = TestApp::new().await;
    let mut leo = app.user("leo").await;

    let empty = leo
        .post_multipart("/create/", &[("text", "   "), ("group", "")], None)
        .await;
    assert_eq!(empty.status, StatusCode::OK);
    assert!(empty.body.contains("This field is required."));

    let bad_group = leo
        .post_multipart("/create/", &[("text", "hi"), ("group", "999")], None)
        .await;
    assert_eq!(bad_group.status, StatusCode::OK);
    assert!(bad_group.body.contains("Select a valid choice."));
    assert!(bad_group.body.contains(">hi</textarea>"));

    let bad_image = leo
        .post_multipart(
            "/create/",
            &[("text", "hi"), ("group", "")],
            Some(("notes.txt", b"plain text, not pixels")),
        )
        .await;
    assert_eq!(bad_image.status, StatusCode::OK);
    assert!(bad_image.body.contains("Upload a valid image."));

    assert!(app.repo.list_posts(FeedScope::All, 10, 0).await.unwrap().is_empty());
}

#[tokio::test]
async fn author_edits_post_and_keeps_image() {
    let app = TestApp::new().await;
    let group = app.group("dogs").await;
    let mut leo = app.user("leo").await;
    leo.post_multipart("/create/", &[("text", "draft")], Some(("dog.gif", SMALL_GIF)))
        .await;
    let post = only_post(&app).await;
    let edit_url = format!("/posts/{}/edit/", post.id);

    let form = leo.get(&edit_url).await;
    assert_eq!(form.status, StatusCode::OK);
    assert!(form.body.contains(">draft</textarea>"));
    assert!(form.body.contains("Edit post"));

    let group_id = group.id.to_string();
    leo.post_multipart(&edit_url, &[("text", "final"), ("group", group_id.as_str())], None)
        .await
        .assert_redirect(&format!("/posts/{}/", post.id));

    let edited = only_post(&app).await;
    assert_eq!(edited.text, "final");
    assert_eq!(edited.group.map(|g| g.id), Some(group.id));
    assert_eq!(edited.image, post.image);
    assert_eq!(edited.pub_date, post.pub_date);
}

#[tokio::test]
async fn author_clears_the_image() {
    let app = TestApp::new().await;
    let mut leo = app.user("leo").await;
    leo.post_multipart("/create/", &[("text", "with a picture")], Some(("cat.gif", SMALL_GIF)))
        .await;
    let post = only_post(&app).await;
    let edit_url = format!("/posts/{}/edit/", post.id);
    assert!(leo.get(&edit_url).await.body.contains(r#"name="image-clear""#));

    let both = leo
        .post_multipart(
            &edit_url,
            &[("text", "with a picture"), ("image-clear", "on")],
            Some(("dog.gif", SMALL_GIF)),
        )
        .await;
    assert_eq!(both.status, StatusCode::OK);
    assert!(both.body.contains("not both"));
    assert_eq!(only_post(&app).await.image, post.image);

    leo.post_multipart(&edit_url, &[("text", "no picture"), ("image-clear", "on")], None)
        .await
        .assert_redirect(&format!("/posts/{}/", post.id));
    let edited = only_post(&app).await;
    assert_eq!(edited.text, "no picture");
    assert_eq!(edited.image, None);
}

#[tokio::test]
async fn non_author_cannot_edit() {
    let app = TestApp::new().await;
    let mut leo = app.user("leo").await;
    let mut anna = app.user("anna").await;
    leo.post_multipart("/create/", &[("text", "mine")], None).await;
    let post = only_post(&app).await;
    let edit_url = format!("/posts/{}/edit/", post.id);
    let detail_url = format!("/posts/{}/", post.id);

    anna.get(&edit_url).await.assert_redirect(&detail_url);
    anna.post_multipart(&edit_url, &[("text", "hijacked")], None)
        .await
        .assert_redirect(&detail_url);
    assert_eq!(only_post(&app).await.text, "mine");

    app.client()
        .get(&edit_url)
        .await
        .assert_redirect(&format!("/auth/login/?next={edit_url}"));

    let detail = anna.get(&detail_url).await;
    assert!(!detail.body.contains(&edit_url));
    let detail = leo.get(&detail_url).await;
    assert!(detail.body.contains(&edit_url));
}

#[tokio::test]
async fn unknown_posts_are_not_found() {
    let app = TestApp::new().await;
    let mut client = app.client();
    assert_eq!(client.get("/posts/12345/").await.status, StatusCode::NOT_FOUND);
    assert_eq!(client.get("/posts/abc/").await.status, StatusCode::NOT_FOUND);
    assert_eq!(client.get("/group/nope/").await.status, StatusCode::NOT_FOUND);
    assert_eq!(client.get("/profile/nobody/").await.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn comments_need_an_account_and_text() {
    let app = TestApp::new().await;
    let mut leo = app.user("leo").await;
    leo.post_multipart("/create/", &[("text", "discuss")], None).await;
    let post = only_post(&app).await;
    let comment_url = format!("/posts/{}/comment/", post.id);
    let detail_url = format!("/posts/{}/", post.id);

    app.client()
        .post_form(&comment_url, &[("text", "drive-by")])
        .await
        .assert_redirect(&format!("/auth/login/?next={comment_url}"));

    leo.post_form(&comment_url, &[("text", "  ")])
        .await
        .assert_redirect(&detail_url);
    assert!(app.repo.list_comments(post.id).await.unwrap().is_empty());

    leo.get(&comment_url).await.assert_redirect(&detail_url);

    leo.post_form(&comment_url, &[("text", "first")]).await;
    leo.post_form(&comment_url, &[("text", "second")]).await;
    let comments = app.repo.list_comments(post.id).await.unwrap();
    let texts: Vec<_> = comments.iter().map(|c| c.text.as_str()).collect();
    assert_eq!(texts, ["second", "first"]);
}

#[tokio::test]
async fn feeds_paginate() {
    let app = TestApp::new().await;
    let mut leo = app.user("leo").await;
    for n in 0..13 {
        leo.post_multipart("/create/", &[("text", format!("post number {n}").as_str())], None)
            .await;
    }

    let mut reader = app.client();
    let count = |body: &str| body.matches("<article>").count();
    assert_eq!(count(&reader.get("/profile/leo/").await.body), 10);
    assert_eq!(count(&reader.get("/profile/leo/?page=2").await.body), 3);
    assert_eq!(count(&reader.get("/profile/leo/?page=99").await.body), 3);
    assert_eq!(count(&reader.get("/profile/leo/?page=0").await.body), 3);
    assert_eq!(count(&reader.get("/profile/leo/?page=abc").await.body), 10);

    let first = reader.get("/").await.body;
    assert_eq!(count(&first), 10);
    assert!(first.contains("post number 12"));
    assert!(!first.contains("post number 2<"));
    assert_eq!(count(&reader.get("/?page=2").await.body), 3);
}

#[tokio::test]
async fn repeated_page_parameter_uses_the_last_value() {
    let app = TestApp::new().await;
    let group = app.group("cats").await;
    let mut leo = app.user("leo").await;
    let group_id = group.id.to_string();
    for n in 0..12 {
        leo.post_multipart(
            "/create/",
            &[("text", format!("cat fact {n}").as_str()), ("group", group_id.as_str())],
            None,
        )
        .await;
    }

    let mut reader = app.client();
    let count = |body: &str| body.matches("<article>").count();
    for uri in ["/?page=1&page=2", "/group/cats/?page=1&page=2", "/profile/leo/?page=1&page=2"] {
        let response = reader.get(uri).await;
        assert_eq!(response.status, StatusCode::OK, "{uri}");
        assert_eq!(count(&response.body), 2, "{uri}");
    }

    let mut follower = app.user("anna").await;
    follower.get("/profile/leo/follow/").await;
    let response = follower.get("/follow/?page=2&page=1").await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(count(&response.body), 10);
}
