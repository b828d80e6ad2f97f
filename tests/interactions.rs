mod common;

use agora::application::comments::CreateCommentCommand;
use agora::application::content::CreateContentCommand;
use agora::application::error::AppError;
use agora::application::repos::CommentsRepo;
use agora::domain::error::DomainError;
use agora::domain::types::{ContentKind, NotificationKind};
use common::TestApp;
use serde_json::Value;

fn post(title: &str) -> CreateContentCommand {
    CreateContentCommand {
        title: title.to_string(),
        body: "body".to_string(),
        ..Default::default()
    }
}

#[tokio::test]
async fn liking_twice_restores_the_original_membership() {
    let app = TestApp::new();
    let author = app.register("author").await;
    let reader = app.register("reader").await;
    let created = app
        .state
        .content
        .create(&author, ContentKind::Post, post("hello"))
        .await
        .expect("create");

    let first = app
        .state
        .content
        .like(&reader, ContentKind::Post, created.id)
        .await
        .expect("like");
    assert!(first.liked);
    assert_eq!(first.likes, vec![reader.user_id]);

    let second = app
        .state
        .content
        .like(&reader, ContentKind::Post, created.id)
        .await
        .expect("unlike");
    assert!(!second.liked);
    assert!(second.likes.is_empty());

    let detail = app
        .state
        .content
        .get_detail(None, ContentKind::Post, created.id)
        .await
        .expect("detail");
    assert!(detail.likes.is_empty());
}

#[tokio::test]
async fn second_view_is_rejected_and_leaves_views_unchanged() {
    let app = TestApp::new();
    let author = app.register("author").await;
    let reader = app.register("reader").await;
    let created = app
        .state
        .content
        .create(&author, ContentKind::News, post("news"))
        .await
        .expect("create");

    let views = app
        .state
        .content
        .view(&reader, ContentKind::News, created.id)
        .await
        .expect("first view");
    assert_eq!(views.views, vec![reader.user_id]);

    let err = app
        .state
        .content
        .view(&reader, ContentKind::News, created.id)
        .await
        .expect_err("second view");
    assert!(matches!(err, AppError::Domain(DomainError::Conflict { .. })));
    assert_eq!(err.status_code().as_u16(), 409);

    let detail = app
        .state
        .content
        .get_detail(None, ContentKind::News, created.id)
        .await
        .expect("detail");
    assert_eq!(detail.views, vec![reader.user_id]);
}

#[tokio::test]
async fn like_patches_a_cached_detail_in_place() {
    let app = TestApp::new();
    let author = app.register("author").await;
    let reader = app.register("reader").await;
    let created = app
        .state
        .content
        .create(&author, ContentKind::Post, post("cached"))
        .await
        .expect("create");

    app.state
        .content
        .get_detail(None, ContentKind::Post, created.id)
        .await
        .expect("warm detail");
    let key = format!("post:{}", created.id);
    assert!(app.cached(&key).await.is_some());

    app.state
        .content
        .like(&reader, ContentKind::Post, created.id)
        .await
        .expect("like");

    let raw = app.cached(&key).await.expect("detail stays cached");
    let snapshot: Value = serde_json::from_str(&raw).expect("json snapshot");
    assert_eq!(
        snapshot["likes"],
        serde_json::json!([reader.user_id.to_string()])
    );
    assert_eq!(snapshot["title"], "cached");

    app.state
        .content
        .like(&reader, ContentKind::Post, created.id)
        .await
        .expect("unlike");
    let detail = app
        .state
        .content
        .get_detail(None, ContentKind::Post, created.id)
        .await
        .expect("detail after unlike");
    assert!(detail.likes.is_empty());
}

#[tokio::test]
async fn listing_key_is_absent_after_a_write() {
    let app = TestApp::new();
    let author = app.register("author").await;

    let listed = app
        .state
        .content
        .list_all(ContentKind::Post)
        .await
        .expect("list");
    assert!(listed.is_empty());
    assert!(app.cached("allPosts").await.is_some());

    let created = app
        .state
        .content
        .create(&author, ContentKind::Post, post("fresh"))
        .await
        .expect("create");
    assert!(app.cached("allPosts").await.is_none());

    let listed = app
        .state
        .content
        .list_all(ContentKind::Post)
        .await
        .expect("relist");
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].id, created.id);

    app.state
        .content
        .delete(&author, ContentKind::Post, created.id)
        .await
        .expect("delete");
    assert!(app.cached("allPosts").await.is_none());
    assert!(app.cached(&format!("post:{}", created.id)).await.is_none());
}

#[tokio::test]
async fn reply_notifies_parent_and_content_authors() {
    let app = TestApp::new();
    let author = app.register("author").await;
    let parent_author = app.register("parent").await;
    let replier = app.register("replier").await;
    let created = app
        .state
        .content
        .create(&author, ContentKind::Post, post("thread"))
        .await
        .expect("create");

    let parent = app
        .state
        .comments
        .create(
            &parent_author,
            CreateCommentCommand {
                content_id: created.id,
                body: "first".to_string(),
                reply_to: None,
            },
        )
        .await
        .expect("parent comment");

    let mut inbox = app.subscribe_notifications(parent_author.user_id);
    app.state
        .comments
        .create(
            &replier,
            CreateCommentCommand {
                content_id: created.id,
                body: "second".to_string(),
                reply_to: Some(parent.id),
            },
        )
        .await
        .expect("reply");

    let parent_inbox = app
        .state
        .notifications
        .list(&parent_author)
        .await
        .expect("parent inbox");
    assert_eq!(parent_inbox.len(), 1);
    assert_eq!(parent_inbox[0].kind, NotificationKind::Reply);
    assert_eq!(parent_inbox[0].link, format!("/posts/{}", created.id));

    // One for the parent comment, one for the reply.
    let author_inbox = app
        .state
        .notifications
        .list(&author)
        .await
        .expect("author inbox");
    assert_eq!(author_inbox.len(), 2);
    assert!(
        author_inbox
            .iter()
            .all(|notification| notification.kind == NotificationKind::Comment)
    );

    let pushed = inbox.try_recv().expect("reply pushed to the parent author");
    assert_eq!(pushed.event, "notification");
    assert_eq!(pushed.payload["kind"], "reply");
}

#[tokio::test]
async fn commenting_on_own_thread_notifies_nobody() {
    let app = TestApp::new();
    let author = app.register("author").await;
    let created = app
        .state
        .content
        .create(&author, ContentKind::Event, post("own"))
        .await
        .expect("create");

    let parent = app
        .state
        .comments
        .create(
            &author,
            CreateCommentCommand {
                content_id: created.id,
                body: "note".to_string(),
                reply_to: None,
            },
        )
        .await
        .expect("comment");
    app.state
        .comments
        .create(
            &author,
            CreateCommentCommand {
                content_id: created.id,
                body: "follow-up".to_string(),
                reply_to: Some(parent.id),
            },
        )
        .await
        .expect("reply");

    let inbox = app
        .state
        .notifications
        .list(&author)
        .await
        .expect("inbox");
    assert!(inbox.is_empty());
}

#[tokio::test]
async fn comment_writes_drop_the_cached_thread() {
    let app = TestApp::new();
    let author = app.register("author").await;
    let reader = app.register("reader").await;
    let created = app
        .state
        .content
        .create(&author, ContentKind::Post, post("comments"))
        .await
        .expect("create");

    let thread = app.state.comments.list(None, created.id).await.expect("list");
    assert!(thread.is_empty());
    let key = format!("comments:{}", created.id);
    assert!(app.cached(&key).await.is_some());

    let comment = app
        .state
        .comments
        .create(
            &reader,
            CreateCommentCommand {
                content_id: created.id,
                body: "hi".to_string(),
                reply_to: None,
            },
        )
        .await
        .expect("comment");
    assert!(app.cached(&key).await.is_none());

    let thread = app.state.comments.list(None, created.id).await.expect("relist");
    assert_eq!(thread.len(), 1);
    assert_eq!(thread[0].id, comment.id);
    assert_eq!(
        thread[0].author.as_ref().map(|author| author.nickname.as_str()),
        Some("reader")
    );
}

#[tokio::test]
async fn reply_to_a_comment_on_other_content_is_rejected() {
    let app = TestApp::new();
    let author = app.register("author").await;
    let first = app
        .state
        .content
        .create(&author, ContentKind::Post, post("first"))
        .await
        .expect("create");
    let second = app
        .state
        .content
        .create(&author, ContentKind::Post, post("second"))
        .await
        .expect("create");

    let parent = app
        .state
        .comments
        .create(
            &author,
            CreateCommentCommand {
                content_id: first.id,
                body: "on first".to_string(),
                reply_to: None,
            },
        )
        .await
        .expect("comment");

    let err = app
        .state
        .comments
        .create(
            &author,
            CreateCommentCommand {
                content_id: second.id,
                body: "misplaced".to_string(),
                reply_to: Some(parent.id),
            },
        )
        .await
        .expect_err("cross-content reply");
    assert_eq!(err.status_code().as_u16(), 400);
}

#[tokio::test]
async fn deleting_content_removes_its_comments() {
    let app = TestApp::new();
    let author = app.register("author").await;
    let reader = app.register("reader").await;
    let created = app
        .state
        .content
        .create(&author, ContentKind::News, post("doomed"))
        .await
        .expect("create");

    let parent = app
        .state
        .comments
        .create(
            &reader,
            CreateCommentCommand {
                content_id: created.id,
                body: "first".to_string(),
                reply_to: None,
            },
        )
        .await
        .expect("comment");
    app.state
        .comments
        .create(
            &author,
            CreateCommentCommand {
                content_id: created.id,
                body: "answer".to_string(),
                reply_to: Some(parent.id),
            },
        )
        .await
        .expect("reply");

    let thread = app
        .state
        .comments
        .list(None, created.id)
        .await
        .expect("list");
    assert_eq!(thread.len(), 2);
    let key = format!("comments:{}", created.id);
    assert!(app.cached(&key).await.is_some());

    app.state
        .content
        .delete(&author, ContentKind::News, created.id)
        .await
        .expect("delete");

    assert!(
        app.repos
            .list_for_content(created.id)
            .await
            .expect("stored comments")
            .is_empty()
    );
    assert!(app.cached(&key).await.is_none());
    assert!(app.cached(&format!("news:{}", created.id)).await.is_none());
    let err = app
        .state
        .comments
        .list(None, created.id)
        .await
        .expect_err("thread is gone");
    assert_eq!(err.status_code().as_u16(), 404);
}
