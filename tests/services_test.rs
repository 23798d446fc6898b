// Service-level tests against an in-memory SQLite database.
// Run with: cargo test --test services_test

use chrono::Utc;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, Set};
use social_connect::{
    auth::MIN_HASH_COST,
    config::Config,
    db::{self, DbPool},
    entities::{comment, like, post, user},
    models::{NewAccount, NewPost, PageRequest, ProfileEdit},
    services::{accounts, engagement, feed, follows, posts, search, FeedPolicy, ImageStore, ServiceError},
};

fn temp_dir() -> std::path::PathBuf {
    std::env::temp_dir().join(format!("social-connect-test-{}", uuid::Uuid::new_v4()))
}

async fn setup() -> (DbPool, ImageStore) {
    let config = Config::for_tests(temp_dir());
    let pool = db::create_pool(&config)
        .await
        .expect("Failed to create in-memory database");
    (pool, ImageStore::new(config.uploads.folder))
}

async fn register(pool: &DbPool, username: &str) -> user::Model {
    accounts::register(
        pool,
        NewAccount {
            username: username.to_string(),
            email: format!("{}@example.com", username),
            password: "password123".to_string(),
        },
        MIN_HASH_COST,
    )
    .await
    .expect("Failed to register user")
}

async fn post(pool: &DbPool, images: &ImageStore, author: i64, content: &str) -> i64 {
    posts::create_post(
        pool,
        images,
        author,
        NewPost {
            content: content.to_string(),
            image: None,
        },
    )
    .await
    .expect("Failed to create post")
    .id
}

fn first_page() -> PageRequest {
    PageRequest::new(None, 10)
}

#[actix_rt::test]
async fn test_follow_is_idempotent() {
    let (pool, _) = setup().await;
    let alice = register(&pool, "alice").await;
    let bob = register(&pool, "bobby").await;

    let state = follows::follow(&pool, alice.id, bob.id).await.unwrap();
    assert!(state.following);
    assert_eq!(state.follower_count, 1);
    assert!(follows::is_following(&pool, alice.id, bob.id).await.unwrap());
    assert!(!follows::is_following(&pool, bob.id, alice.id).await.unwrap());

    let again = follows::follow(&pool, alice.id, bob.id).await.unwrap();
    assert_eq!(again.follower_count, 1);
    assert_eq!(follows::following_count(&pool, alice.id).await.unwrap(), 1);
}

#[actix_rt::test]
async fn test_self_follow_is_rejected() {
    let (pool, _) = setup().await;
    let alice = register(&pool, "alice").await;

    let result = follows::follow(&pool, alice.id, alice.id).await;
    assert!(matches!(result, Err(ServiceError::SelfFollow)));
    let result = follows::unfollow(&pool, alice.id, alice.id).await;
    assert!(matches!(result, Err(ServiceError::SelfUnfollow)));
    assert_eq!(follows::follower_count(&pool, alice.id).await.unwrap(), 0);
    assert!(!follows::is_following(&pool, alice.id, alice.id).await.unwrap());
}

#[actix_rt::test]
async fn test_unfollow_without_edge_is_noop() {
    let (pool, _) = setup().await;
    let alice = register(&pool, "alice").await;
    let bob = register(&pool, "bobby").await;

    let state = follows::unfollow(&pool, alice.id, bob.id).await.unwrap();
    assert!(!state.following);
    assert_eq!(state.follower_count, 0);
}

#[actix_rt::test]
async fn test_toggle_like_alternates_and_counts_distinct_likers() {
    let (pool, images) = setup().await;
    let alice = register(&pool, "alice").await;
    let bob = register(&pool, "bobby").await;
    let post_id = post(&pool, &images, alice.id, "Hello").await;

    let first = engagement::toggle_like(&pool, bob.id, post_id).await.unwrap();
    assert!(first.liked);
    assert_eq!(first.like_count, 1);

    let other = engagement::toggle_like(&pool, alice.id, post_id).await.unwrap();
    assert_eq!(other.like_count, 2);

    let second = engagement::toggle_like(&pool, bob.id, post_id).await.unwrap();
    assert!(!second.liked);
    assert_eq!(second.like_count, 1);
    assert!(!engagement::has_liked(&pool, bob.id, post_id).await.unwrap());
    assert!(engagement::has_liked(&pool, alice.id, post_id).await.unwrap());
    assert_eq!(engagement::like_count(&pool, post_id).await.unwrap(), 1);
}

#[actix_rt::test]
async fn test_liking_own_post_twice() {
    let (pool, images) = setup().await;
    let alice = register(&pool, "alice").await;
    let post_id = post(&pool, &images, alice.id, "Mine").await;

    let state = engagement::toggle_like(&pool, alice.id, post_id).await.unwrap();
    assert_eq!((state.liked, state.like_count), (true, 1));
    let state = engagement::toggle_like(&pool, alice.id, post_id).await.unwrap();
    assert_eq!((state.liked, state.like_count), (false, 0));
}

#[actix_rt::test]
async fn test_like_missing_post_is_not_found() {
    let (pool, _) = setup().await;
    let alice = register(&pool, "alice").await;

    let result = engagement::toggle_like(&pool, alice.id, 999).await;
    assert!(matches!(result, Err(ServiceError::NotFound(_))));
}

#[actix_rt::test]
async fn test_comments_are_validated_and_listed_newest_first() {
    let (pool, images) = setup().await;
    let alice = register(&pool, "alice").await;
    let bob = register(&pool, "bobby").await;
    let post_id = post(&pool, &images, alice.id, "Discuss").await;

    let empty = engagement::add_comment(&pool, bob.id, post_id, "   ").await;
    assert!(matches!(empty, Err(ServiceError::Validation(_))));
    let too_long = engagement::add_comment(&pool, bob.id, post_id, &"x".repeat(201)).await;
    assert!(matches!(too_long, Err(ServiceError::Validation(_))));
    let missing = engagement::add_comment(&pool, bob.id, 999, "Hi").await;
    assert!(matches!(missing, Err(ServiceError::NotFound(_))));

    engagement::add_comment(&pool, bob.id, post_id, "First").await.unwrap();
    engagement::add_comment(&pool, alice.id, post_id, "Second").await.unwrap();

    let comments = engagement::comments_for(&pool, post_id).await.unwrap();
    let contents: Vec<&str> = comments.iter().map(|c| c.content.as_str()).collect();
    assert_eq!(contents, vec!["Second", "First"]);
    assert_eq!(comments[0].author.username, "alice");
    assert_eq!(engagement::comment_count(&pool, post_id).await.unwrap(), 2);
}

#[actix_rt::test]
async fn test_delete_post_cascades_to_likes_and_comments() {
    let (pool, images) = setup().await;
    let alice = register(&pool, "alice").await;
    let bob = register(&pool, "bobby").await;
    let post_id = post(&pool, &images, alice.id, "Short-lived").await;
    engagement::toggle_like(&pool, bob.id, post_id).await.unwrap();
    engagement::add_comment(&pool, bob.id, post_id, "Nice").await.unwrap();

    let denied = posts::delete_post(&pool, &images, bob.id, post_id).await;
    assert!(matches!(denied, Err(ServiceError::Authorization)));
    assert!(posts::find_post(&pool, post_id).await.is_ok());

    posts::delete_post(&pool, &images, alice.id, post_id).await.unwrap();
    assert!(matches!(
        posts::find_post(&pool, post_id).await,
        Err(ServiceError::NotFound(_))
    ));
    let likes = like::Entity::find()
        .filter(like::Column::PostId.eq(post_id))
        .count(&pool)
        .await
        .unwrap();
    let comments = comment::Entity::find()
        .filter(comment::Column::PostId.eq(post_id))
        .count(&pool)
        .await
        .unwrap();
    assert_eq!((likes, comments), (0, 0));

    let again = posts::delete_post(&pool, &images, alice.id, post_id).await;
    assert!(matches!(again, Err(ServiceError::NotFound(_))));
}

#[actix_rt::test]
async fn test_personalized_feed_follows_the_graph() {
    let (pool, images) = setup().await;
    let alice = register(&pool, "alice").await;
    let bob = register(&pool, "bobby").await;
    let carol = register(&pool, "carol").await;
    let policy = FeedPolicy::default();

    let empty = feed::personalized_feed(&pool, alice.id, policy, first_page())
        .await
        .unwrap();
    assert!(empty.is_empty());

    let older = post(&pool, &images, bob.id, "Bob one").await;
    let newer = post(&pool, &images, bob.id, "Bob two").await;
    post(&pool, &images, carol.id, "Carol").await;

    follows::follow(&pool, alice.id, bob.id).await.unwrap();
    let page = feed::personalized_feed(&pool, alice.id, policy, first_page())
        .await
        .unwrap();
    let ids: Vec<i64> = page.items.iter().map(|p| p.id).collect();
    assert_eq!(ids, vec![newer, older]);
    assert_eq!(page.total, 2);

    follows::unfollow(&pool, alice.id, bob.id).await.unwrap();
    let page = feed::personalized_feed(&pool, alice.id, policy, first_page())
        .await
        .unwrap();
    assert!(page.is_empty());
}

#[actix_rt::test]
async fn test_own_posts_in_feed_follow_policy() {
    let (pool, images) = setup().await;
    let alice = register(&pool, "alice").await;
    let own = post(&pool, &images, alice.id, "My own").await;

    let with_own = feed::personalized_feed(&pool, alice.id, FeedPolicy::default(), first_page())
        .await
        .unwrap();
    assert_eq!(with_own.items.len(), 1);
    assert_eq!(with_own.items[0].id, own);
    assert!(with_own.items[0].is_author);

    let policy = FeedPolicy {
        include_own_posts: false,
    };
    let without = feed::personalized_feed(&pool, alice.id, policy, first_page())
        .await
        .unwrap();
    assert!(without.is_empty());
}

#[actix_rt::test]
async fn test_feed_pages_past_the_end_are_empty() {
    let (pool, images) = setup().await;
    let alice = register(&pool, "alice").await;
    for i in 0..15 {
        post(&pool, &images, alice.id, &format!("Post {}", i)).await;
    }

    let second = feed::global_feed(&pool, None, PageRequest::new(Some(2), 10))
        .await
        .unwrap();
    assert_eq!(second.items.len(), 5);
    assert!(second.has_prev);
    assert!(!second.has_next);
    assert_eq!(second.items.last().map(|p| p.content.as_str()), Some("Post 0"));

    let beyond = feed::global_feed(&pool, None, PageRequest::new(Some(7), 10))
        .await
        .unwrap();
    assert!(beyond.is_empty());
    assert_eq!(beyond.total, 15);

    let profile = feed::user_posts(&pool, alice.id, None, PageRequest::new(Some(1), 10))
        .await
        .unwrap();
    assert_eq!(profile.items.len(), 10);
    assert_eq!(feed::post_count(&pool, alice.id).await.unwrap(), 15);
}

#[actix_rt::test]
async fn test_huge_page_numbers_give_empty_pages() {
    let (pool, images) = setup().await;
    let alice = register(&pool, "alice").await;
    post(&pool, &images, alice.id, "Only post").await;

    let feed_page = feed::global_feed(&pool, None, PageRequest::new(Some(2_000_000_000_000_000_000), 10))
        .await
        .unwrap();
    assert!(feed_page.is_empty());
    assert_eq!(feed_page.total, 1);

    let own = feed::personalized_feed(&pool, alice.id, FeedPolicy::default(), PageRequest::new(Some(u64::MAX), 10))
        .await
        .unwrap();
    assert!(own.is_empty());

    let users = search::search_users(&pool, "a", PageRequest::new(Some(u64::MAX), 20))
        .await
        .unwrap();
    assert!(users.is_empty());
    assert_eq!(users.total, 1);
}

#[actix_rt::test]
async fn test_equal_timestamps_order_by_descending_id() {
    let (pool, _) = setup().await;
    let alice = register(&pool, "alice").await;
    let created_at = Utc::now();

    let mut ids = Vec::new();
    for i in 0..5 {
        let inserted = post::ActiveModel {
            content: Set(format!("Same instant {}", i)),
            image: Set(None),
            user_id: Set(alice.id),
            created_at: Set(created_at),
            ..Default::default()
        }
        .insert(&pool)
        .await
        .unwrap();
        ids.push(inserted.id);
    }
    ids.reverse();

    let first = feed::global_feed(&pool, None, PageRequest::new(Some(1), 3))
        .await
        .unwrap();
    let second = feed::global_feed(&pool, None, PageRequest::new(Some(2), 3))
        .await
        .unwrap();
    let seen: Vec<i64> = first
        .items
        .iter()
        .chain(second.items.iter())
        .map(|p| p.id)
        .collect();
    assert_eq!(seen, ids);

    let profile = feed::user_posts(&pool, alice.id, None, PageRequest::new(Some(1), 10))
        .await
        .unwrap();
    let profile_ids: Vec<i64> = profile.items.iter().map(|p| p.id).collect();
    assert_eq!(profile_ids, ids);
}

#[actix_rt::test]
async fn test_feed_decorations_reflect_viewer() {
    let (pool, images) = setup().await;
    let alice = register(&pool, "alice").await;
    let bob = register(&pool, "bobby").await;
    let post_id = post(&pool, &images, alice.id, "Decorated").await;
    engagement::toggle_like(&pool, bob.id, post_id).await.unwrap();
    engagement::add_comment(&pool, bob.id, post_id, "One").await.unwrap();
    engagement::add_comment(&pool, alice.id, post_id, "Two").await.unwrap();

    let as_bob = posts::post_view(&pool, post_id, Some(bob.id)).await.unwrap();
    assert!(as_bob.liked);
    assert!(!as_bob.is_author);
    assert_eq!(as_bob.like_count, 1);
    assert_eq!(as_bob.comment_count, 2);
    assert_eq!(as_bob.author.username, "alice");

    let anonymous = posts::post_view(&pool, post_id, None).await.unwrap();
    assert!(!anonymous.liked);
    assert!(!anonymous.is_author);
}

#[actix_rt::test]
async fn test_duplicate_registration_keeps_first_user() {
    let (pool, _) = setup().await;
    let first = register(&pool, "alice").await;

    let same_email = accounts::register(
        &pool,
        NewAccount {
            username: "alice2".to_string(),
            email: "alice@example.com".to_string(),
            password: "password123".to_string(),
        },
        MIN_HASH_COST,
    )
    .await;
    assert!(matches!(same_email, Err(ServiceError::DuplicateEmail)));

    let same_name = accounts::register(
        &pool,
        NewAccount {
            username: "alice".to_string(),
            email: "other@example.com".to_string(),
            password: "password123".to_string(),
        },
        MIN_HASH_COST,
    )
    .await;
    assert!(matches!(same_name, Err(ServiceError::DuplicateUsername)));

    let stored = accounts::find_by_username(&pool, "alice").await.unwrap();
    assert_eq!(stored.id, first.id);
    assert_eq!(stored.email, "alice@example.com");
    assert_eq!(user::Entity::find().count(&pool).await.unwrap(), 1);
}

#[actix_rt::test]
async fn test_register_validates_account_fields() {
    let (pool, _) = setup().await;

    let invalid = accounts::register(
        &pool,
        NewAccount {
            username: "a".to_string(),
            email: "not-an-email".to_string(),
            password: "123".to_string(),
        },
        MIN_HASH_COST,
    )
    .await;
    match invalid {
        Err(ServiceError::Validation(errors)) => {
            let fields: Vec<&str> = errors.iter().map(|e| e.field).collect();
            assert_eq!(fields, vec!["username", "email", "password"]);
        }
        other => panic!("expected validation errors, got {:?}", other.map(|u| u.id)),
    }
    assert_eq!(user::Entity::find().count(&pool).await.unwrap(), 0);
}

#[actix_rt::test]
async fn test_authenticate() {
    let (pool, _) = setup().await;
    let alice = register(&pool, "alice").await;
    assert_ne!(alice.password_hash, "password123");

    let user = accounts::authenticate(&pool, "alice", "password123").await.unwrap();
    assert_eq!(user.id, alice.id);

    let wrong = accounts::authenticate(&pool, "alice", "nope-nope").await;
    assert!(matches!(wrong, Err(ServiceError::InvalidCredentials)));
    let unknown = accounts::authenticate(&pool, "nobody", "password123").await;
    assert!(matches!(unknown, Err(ServiceError::InvalidCredentials)));
}

#[actix_rt::test]
async fn test_edit_profile_checks_only_changed_fields() {
    let (pool, images) = setup().await;
    let alice = register(&pool, "alice").await;
    register(&pool, "bobby").await;

    let unchanged = accounts::edit_profile(
        &pool,
        &images,
        &alice,
        ProfileEdit {
            username: "alice".to_string(),
            email: "alice@example.com".to_string(),
            bio: Some("Hello there".to_string()),
            avatar: None,
        },
    )
    .await
    .unwrap();
    assert_eq!(unchanged.bio.as_deref(), Some("Hello there"));
    assert_eq!(unchanged.avatar, user::DEFAULT_AVATAR);

    let taken = accounts::edit_profile(
        &pool,
        &images,
        &unchanged,
        ProfileEdit {
            username: "bobby".to_string(),
            email: "alice@example.com".to_string(),
            bio: None,
            avatar: None,
        },
    )
    .await;
    assert!(matches!(taken, Err(ServiceError::DuplicateUsername)));

    let renamed = accounts::edit_profile(
        &pool,
        &images,
        &unchanged,
        ProfileEdit {
            username: "alicia".to_string(),
            email: "alicia@example.com".to_string(),
            bio: Some(String::new()),
            avatar: None,
        },
    )
    .await
    .unwrap();
    assert_eq!(renamed.username, "alicia");
    assert_eq!(renamed.bio, None);
    assert!(matches!(
        accounts::find_by_username(&pool, "alice").await,
        Err(ServiceError::NotFound(_))
    ));
}

#[actix_rt::test]
async fn test_search_is_case_sensitive_substring() {
    let (pool, _) = setup().await;
    register(&pool, "alice").await;
    register(&pool, "Malice").await;
    register(&pool, "bobby").await;

    let found = search::search_users(&pool, "lice", first_page()).await.unwrap();
    let names: Vec<&str> = found.items.iter().map(|u| u.username.as_str()).collect();
    assert_eq!(names, vec!["alice", "Malice"]);

    let upper = search::search_users(&pool, "ALICE", first_page()).await.unwrap();
    assert!(upper.is_empty());

    let blank = search::search_users(&pool, "", first_page()).await.unwrap();
    assert!(blank.is_empty());
    assert_eq!(blank.total, 0);

    let spaces = search::search_users(&pool, "  ", first_page()).await.unwrap();
    assert!(spaces.is_empty());

    let padded = search::search_users(&pool, " alice", first_page()).await.unwrap();
    assert!(padded.is_empty());
}

#[actix_rt::test]
async fn test_search_paginates() {
    let (pool, _) = setup().await;
    for i in 0..25 {
        register(&pool, &format!("searchuser{}", i)).await;
    }

    let first = search::search_users(&pool, "searchuser", PageRequest::new(None, 20))
        .await
        .unwrap();
    assert_eq!(first.items.len(), 20);
    assert_eq!(first.total, 25);
    assert!(first.has_next);

    let second = search::search_users(&pool, "searchuser", PageRequest::new(Some(2), 20))
        .await
        .unwrap();
    assert_eq!(second.items.len(), 5);
}

#[actix_rt::test]
async fn test_post_validation() {
    let (pool, images) = setup().await;
    let alice = register(&pool, "alice").await;

    let empty = posts::create_post(&pool, &images, alice.id, NewPost::default()).await;
    assert!(matches!(empty, Err(ServiceError::Validation(_))));

    let long = posts::create_post(
        &pool,
        &images,
        alice.id,
        NewPost {
            content: "x".repeat(501),
            image: None,
        },
    )
    .await;
    assert!(matches!(long, Err(ServiceError::Validation(_))));
    assert_eq!(feed::post_count(&pool, alice.id).await.unwrap(), 0);
}
