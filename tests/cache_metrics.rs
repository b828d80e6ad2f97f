mod common;

use std::collections::HashSet;
use std::time::Duration;

use agora::application::content::CreateContentCommand;
use agora::application::realtime::{RealtimeChannel, notification_room};
use agora::cache::{CacheConfig, CacheStore, MemoryCacheStore};
use agora::domain::types::ContentKind;
use agora::infra::http::build_router;
use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use common::TestApp;
use metrics_util::debugging::DebuggingRecorder;
use serde_json::json;
use tower::ServiceExt;

#[tokio::test]
async fn cache_paths_emit_expected_metric_keys() {
    let recorder = DebuggingRecorder::new();
    let snapshotter = recorder.snapshotter();
    recorder
        .install()
        .expect("debug metrics recorder should install in this test process");

    let app = TestApp::new();
    let author = app.register("metrics").await;
    let created = app
        .state
        .content
        .create(
            &author,
            ContentKind::Post,
            CreateContentCommand {
                title: "Metrics".to_string(),
                body: "body".to_string(),
                ..Default::default()
            },
        )
        .await
        .expect("create");

    // miss, then hit
    for _ in 0..2 {
        app.state
            .content
            .get_detail(None, ContentKind::Post, created.id)
            .await
            .expect("detail");
    }
    // patch in place
    app.state
        .content
        .like(&author, ContentKind::Post, created.id)
        .await
        .expect("like");
    // invalidation
    app.state
        .content
        .create(
            &author,
            ContentKind::Post,
            CreateContentCommand {
                title: "Second".to_string(),
                body: "body".to_string(),
                ..Default::default()
            },
        )
        .await
        .expect("second create");

    // eviction in a single-slot store
    let tiny = MemoryCacheStore::new(&CacheConfig {
        capacity: 1,
        ..Default::default()
    });
    tiny.set("a", "1".to_string(), Duration::from_secs(60))
        .await
        .expect("set a");
    tiny.set("b", "2".to_string(), Duration::from_secs(60))
        .await
        .expect("set b");

    // realtime fan-out and room gauge
    let room = notification_room(author.user_id);
    let _subscriber = app.realtime.join(&room);
    app.realtime
        .publish(
            &room,
            "notification",
            json!({ "ping": true }),
        )
        .await
        .expect("publish");

    let router = build_router(app.state.clone());
    let response = router
        .oneshot(
            Request::builder()
                .uri("/_health")
                .body(Body::empty())
                .expect("request should build"),
        )
        .await
        .expect("router should respond");
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let names: HashSet<String> = snapshotter
        .snapshot()
        .into_vec()
        .into_iter()
        .map(|(composite_key, _, _, _)| composite_key.key().name().to_string())
        .collect();

    let expected = [
        "agora_cache_hit_total",
        "agora_cache_miss_total",
        "agora_cache_patch_total",
        "agora_cache_invalidate_total",
        "agora_cache_evict_total",
        "agora_realtime_rooms",
        "agora_http_request_ms",
    ];

    for metric in expected {
        assert!(names.contains(metric), "missing metric: {metric}");
    }
}
