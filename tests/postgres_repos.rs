//! Repository checks against a live Postgres. Run with
//! `DATABASE_URL=postgres://... cargo test -- --ignored`.

use agora::application::repos::{
    ContentRepo, CreateContentParams, CreateItemParams, CreateUserParams, MarketRepo, UsersRepo,
    ViewOutcome,
};
use agora::domain::entities::UserRecord;
use agora::domain::types::{ContentKind, Role};
use agora::infra::db::PostgresRepositories;
use sqlx::PgPool;

async fn user(repos: &PostgresRepositories, nickname: &str) -> UserRecord {
    repos
        .create_user(CreateUserParams {
            email: format!("{nickname}@example.com"),
            nickname: nickname.to_string(),
            name: "Db".to_string(),
            last_name: "Tester".to_string(),
            password_hash: "not-a-real-hash".to_string(),
            role: Role::User,
        })
        .await
        .expect("create user")
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn like_toggle_and_view_once_are_atomic(pool: PgPool) {
    let repos = PostgresRepositories::new(pool);
    let author = user(&repos, "author").await;
    let reader = user(&repos, "reader").await;

    let content = repos
        .create_content(CreateContentParams {
            kind: ContentKind::Post,
            author_id: author.id,
            title: "Atomic".to_string(),
            body: "body".to_string(),
            tag_ids: Vec::new(),
            topic_id: None,
            image: None,
            markdown: None,
            accepted: None,
            event_date: None,
            place: None,
        })
        .await
        .expect("create content");

    let liked = repos
        .toggle_like(ContentKind::Post, content.id, reader.id)
        .await
        .expect("like");
    assert_eq!(liked, Some(vec![reader.id]));
    let unliked = repos
        .toggle_like(ContentKind::Post, content.id, reader.id)
        .await
        .expect("unlike");
    assert_eq!(unliked, Some(Vec::new()));

    assert_eq!(
        repos
            .record_view(ContentKind::Post, content.id, reader.id)
            .await
            .expect("view"),
        ViewOutcome::Recorded(vec![reader.id])
    );
    assert_eq!(
        repos
            .record_view(ContentKind::Post, content.id, reader.id)
            .await
            .expect("second view"),
        ViewOutcome::AlreadyViewed
    );
    assert_eq!(
        repos
            .record_view(ContentKind::News, content.id, reader.id)
            .await
            .expect("wrong kind"),
        ViewOutcome::Missing
    );
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn items_sell_exactly_once(pool: PgPool) {
    let repos = PostgresRepositories::new(pool);
    let seller = user(&repos, "seller").await;
    let buyer = user(&repos, "buyer").await;
    let late = user(&repos, "late").await;

    let item = repos
        .create_item(CreateItemParams {
            seller_id: seller.id,
            title: "Bike".to_string(),
            description: "Barely used".to_string(),
            price_cents: 12_500,
            photos: Vec::new(),
        })
        .await
        .expect("create item");

    let sold = repos
        .mark_sold(item.id, buyer.id)
        .await
        .expect("sell")
        .expect("first purchase wins");
    assert_eq!(sold.buyer_id, Some(buyer.id));
    assert!(
        repos
            .mark_sold(item.id, late.id)
            .await
            .expect("second purchase")
            .is_none()
    );
    assert!(
        repos
            .list_available()
            .await
            .expect("available")
            .is_empty()
    );
}
