mod common;

use agora::application::content::{CreateContentCommand, TopicRef};
use agora::application::error::AppError;
use agora::domain::types::ContentKind;
use common::TestApp;

fn event(title: &str, topic_id: Option<uuid::Uuid>) -> CreateContentCommand {
    CreateContentCommand {
        title: title.to_string(),
        body: "meet at noon".to_string(),
        topic_id,
        place: Some("Town hall".to_string()),
        ..Default::default()
    }
}

#[tokio::test]
async fn unaccepted_events_stay_hidden_until_accepted() {
    let app = TestApp::new();
    let admin = app.register_admin("moderator").await;
    let organizer = app.register("organizer").await;
    let stranger = app.register("stranger").await;
    let topic = app
        .state
        .taxonomy
        .create_topic(&admin, "Meetups", None)
        .await
        .expect("topic");

    let created = app
        .state
        .content
        .create(&organizer, ContentKind::Event, event("Picnic", Some(topic.id)))
        .await
        .expect("create event");
    assert_eq!(created.accepted, Some(false));

    assert!(
        app.state
            .content
            .list_all(ContentKind::Event)
            .await
            .expect("events")
            .is_empty()
    );
    assert!(
        app.state
            .content
            .list_for_topic(ContentKind::Event, TopicRef::Id(topic.id))
            .await
            .expect("topic events")
            .is_empty()
    );

    for viewer in [None, Some(&stranger)] {
        let err = app
            .state
            .content
            .get_detail(viewer, ContentKind::Event, created.id)
            .await
            .expect_err("hidden from the public");
        assert_eq!(err.status_code().as_u16(), 404);
    }
    app.state
        .content
        .get_detail(Some(&organizer), ContentKind::Event, created.id)
        .await
        .expect("organizer sees own event");

    let err = app
        .state
        .content
        .list_unaccepted(&stranger)
        .await
        .expect_err("queue is admin-only");
    assert!(matches!(err, AppError::Forbidden(_)));
    let queue = app
        .state
        .content
        .list_unaccepted(&admin)
        .await
        .expect("queue");
    assert_eq!(queue.len(), 1);
    assert!(app.cached("allUnacceptedEvents").await.is_some());
    assert!(app.cached("allEvents").await.is_some());

    app.state
        .content
        .accept_event(&admin, created.id)
        .await
        .expect("accept");
    assert!(app.cached("allUnacceptedEvents").await.is_none());
    assert!(app.cached("allEvents").await.is_none());
    assert!(
        app.cached(&format!("topicEvents:{}", topic.id))
            .await
            .is_none()
    );

    let listed = app
        .state
        .content
        .list_all(ContentKind::Event)
        .await
        .expect("events after accept");
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].id, created.id);
    assert_eq!(
        app.state
            .content
            .list_for_topic(ContentKind::Event, TopicRef::Id(topic.id))
            .await
            .expect("topic events after accept")
            .len(),
        1
    );
    assert!(
        app.state
            .content
            .list_unaccepted(&admin)
            .await
            .expect("queue after accept")
            .is_empty()
    );
    app.state
        .content
        .get_detail(Some(&stranger), ContentKind::Event, created.id)
        .await
        .expect("public after accept");
}

#[tokio::test]
async fn hidden_events_cannot_be_liked_viewed_or_read() {
    let app = TestApp::new();
    let admin = app.register_admin("moderator").await;
    let organizer = app.register("organizer").await;
    let stranger = app.register("stranger").await;
    let created = app
        .state
        .content
        .create(&organizer, ContentKind::Event, event("Secret", None))
        .await
        .expect("create event");

    let err = app
        .state
        .content
        .like(&stranger, ContentKind::Event, created.id)
        .await
        .expect_err("like hidden event");
    assert_eq!(err.status_code().as_u16(), 404);
    let err = app
        .state
        .content
        .view(&stranger, ContentKind::Event, created.id)
        .await
        .expect_err("view hidden event");
    assert_eq!(err.status_code().as_u16(), 404);
    let err = app
        .state
        .comments
        .list(Some(&stranger), created.id)
        .await
        .expect_err("thread of hidden event");
    assert_eq!(err.status_code().as_u16(), 404);
    assert!(app.cached(&format!("comments:{}", created.id)).await.is_none());

    app.state
        .content
        .like(&organizer, ContentKind::Event, created.id)
        .await
        .expect("organizer likes own event");
    app.state
        .comments
        .list(Some(&admin), created.id)
        .await
        .expect("admin reads the thread");
    let err = app
        .state
        .comments
        .list(None, created.id)
        .await
        .expect_err("cached thread still gated");
    assert_eq!(err.status_code().as_u16(), 404);
}
