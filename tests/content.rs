mod common;

use common::{count, harness, list, seed_user};
use social_graph::infrastructure::collections::users::{self, ProfileUpdate};
use social_graph::models::AssocType;
use social_graph::services::BookmarkOutcome;
use social_graph::AppError;

#[tokio::test]
async fn test_create_post_appends_to_author() {
    let h = harness().await;
    let alice = seed_user(&h.store, "alice").await;

    let post = h
        .content
        .create_post(alice, "sunset", "https://cdn.example.com/a.jpg")
        .await
        .unwrap();
    assert_eq!(post.author.id, alice);
    assert_eq!(post.caption, "sunset");
    assert!(post.likes.is_empty());
    assert_eq!(list(&h.store, alice, AssocType::Posts).await, vec![post.id]);

    let err = h.content.create_post(alice, "no image", "  ").await.unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));
}

#[tokio::test]
async fn test_like_twice_keeps_one_entry() {
    let h = harness().await;
    let alice = seed_user(&h.store, "alice").await;
    let bob = seed_user(&h.store, "bob").await;
    let post = h.content.create_post(alice, "", "https://img/1").await.unwrap();

    h.content.like(bob, post.id).await.unwrap();
    h.content.like(bob, post.id).await.unwrap();
    assert_eq!(list(&h.store, post.id, AssocType::Likes).await, vec![bob]);

    h.content.unlike(bob, post.id).await.unwrap();
    h.content.unlike(bob, post.id).await.unwrap();
    assert!(list(&h.store, post.id, AssocType::Likes).await.is_empty());
}

#[tokio::test]
async fn test_like_notifies_author_but_not_self() {
    let h = harness().await;
    let alice = seed_user(&h.store, "alice").await;
    let bob = seed_user(&h.store, "bob").await;
    let post = h.content.create_post(alice, "", "https://img/1").await.unwrap();

    h.content.like(alice, post.id).await.unwrap();
    assert!(h.sink.events().is_empty());

    h.content.like(bob, post.id).await.unwrap();
    let events = h.sink.events_for(alice);
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].payload["type"], "like");
    assert_eq!(events[0].payload["postId"], post.id);
}

#[tokio::test]
async fn test_like_missing_post() {
    let h = harness().await;
    let alice = seed_user(&h.store, "alice").await;

    assert!(matches!(h.content.like(alice, 77).await.unwrap_err(), AppError::NotFound(_)));
    assert!(matches!(h.content.unlike(alice, 77).await.unwrap_err(), AppError::NotFound(_)));
}

#[tokio::test]
async fn test_blocked_comment_is_rejected_in_any_case() {
    let h = harness().await;
    let alice = seed_user(&h.store, "alice").await;
    let post = h.content.create_post(alice, "", "https://img/1").await.unwrap();

    for text in ["this is a BadWord", "NUDE", "   "] {
        let err = h.content.add_comment(alice, post.id, text).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)), "accepted {:?}", text);
    }

    assert_eq!(count(&h.store, "SELECT COUNT(*) FROM comments").await, 0);
    assert!(list(&h.store, post.id, AssocType::Comments).await.is_empty());
}

#[tokio::test]
async fn test_comment_is_appended_and_author_notified() {
    let h = harness().await;
    let alice = seed_user(&h.store, "alice").await;
    let bob = seed_user(&h.store, "bob").await;
    let post = h.content.create_post(alice, "", "https://img/1").await.unwrap();

    let first = h.content.add_comment(bob, post.id, "nice shot").await.unwrap();
    let second = h.content.add_comment(alice, post.id, "thanks").await.unwrap();
    assert_eq!(first.author.username, "bob");
    assert_eq!(
        list(&h.store, post.id, AssocType::Comments).await,
        vec![first.id, second.id]
    );

    let comments = h.content.comments_of_post(post.id).await.unwrap();
    let texts: Vec<_> = comments.iter().map(|c| c.text.as_str()).collect();
    assert_eq!(texts, vec!["nice shot", "thanks"]);

    let events = h.sink.events_for(alice);
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].payload["type"], "comment");

    let err = h.content.add_comment(bob, 404, "hello").await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}

#[tokio::test]
async fn test_only_author_or_owner_deletes_post() {
    let h = harness().await;
    let alice = seed_user(&h.store, "alice").await;
    let bob = seed_user(&h.store, "bob").await;
    let first = h.content.create_post(alice, "", "https://img/1").await.unwrap();
    let second = h.content.create_post(alice, "", "https://img/2").await.unwrap();

    let err = h.content.delete_post(bob, first.id).await.unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)));
    assert_eq!(count(&h.store, "SELECT COUNT(*) FROM posts").await, 2);

    h.content.delete_post(alice, first.id).await.unwrap();
    h.content.delete_post(h.owner, second.id).await.unwrap();
    assert_eq!(count(&h.store, "SELECT COUNT(*) FROM posts").await, 0);
    assert!(list(&h.store, alice, AssocType::Posts).await.is_empty());

    let err = h.content.delete_post(alice, first.id).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}

#[tokio::test]
async fn test_delete_post_cleans_comments_likes_and_bookmarks() {
    let h = harness().await;
    let alice = seed_user(&h.store, "alice").await;
    let bob = seed_user(&h.store, "bob").await;
    let post = h.content.create_post(alice, "", "https://img/1").await.unwrap();
    let kept = h.content.create_post(alice, "", "https://img/2").await.unwrap();

    h.content.add_comment(bob, post.id, "first").await.unwrap();
    h.content.like(bob, post.id).await.unwrap();
    h.content.bookmark_toggle(bob, post.id).await.unwrap();
    h.content.bookmark_toggle(bob, kept.id).await.unwrap();

    h.content.delete_post(alice, post.id).await.unwrap();

    assert_eq!(count(&h.store, "SELECT COUNT(*) FROM comments").await, 0);
    assert_eq!(list(&h.store, bob, AssocType::Bookmarks).await, vec![kept.id]);
    assert_eq!(list(&h.store, alice, AssocType::Posts).await, vec![kept.id]);
    let dangling = format!(
        "SELECT COUNT(*) FROM associations WHERE id1 = {0} OR id2 = {0}",
        post.id
    );
    assert_eq!(count(&h.store, &dangling).await, 0);
}

#[tokio::test]
async fn test_bookmark_toggle() {
    let h = harness().await;
    let alice = seed_user(&h.store, "alice").await;
    let post = h.content.create_post(alice, "", "https://img/1").await.unwrap();

    assert_eq!(
        h.content.bookmark_toggle(alice, post.id).await.unwrap(),
        BookmarkOutcome::Saved
    );
    assert_eq!(list(&h.store, alice, AssocType::Bookmarks).await, vec![post.id]);
    assert_eq!(
        h.content.bookmark_toggle(alice, post.id).await.unwrap(),
        BookmarkOutcome::Unsaved
    );
    assert!(list(&h.store, alice, AssocType::Bookmarks).await.is_empty());

    let err = h.content.bookmark_toggle(alice, 31337).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}

#[tokio::test]
async fn test_feed_hides_private_accounts_not_followed() {
    let h = harness().await;
    let viewer = seed_user(&h.store, "viewer").await;
    let public = seed_user(&h.store, "public").await;
    let hidden = seed_user(&h.store, "hidden").await;
    let friend = seed_user(&h.store, "friend").await;

    {
        let mut conn = h.store.acquire().await.unwrap();
        let private = ProfileUpdate {
            is_private: Some(true),
            ..Default::default()
        };
        users::update_profile(&mut conn, hidden, &private).await.unwrap();
        users::update_profile(&mut conn, friend, &private).await.unwrap();
        users::update_profile(&mut conn, viewer, &private).await.unwrap();
    }
    h.graph.follow(viewer, friend).await.unwrap();

    let own = h.content.create_post(viewer, "mine", "https://img/v").await.unwrap();
    let open = h.content.create_post(public, "open", "https://img/p").await.unwrap();
    h.content.create_post(hidden, "secret", "https://img/h").await.unwrap();
    let close = h.content.create_post(friend, "close", "https://img/f").await.unwrap();

    let feed = h.content.feed(viewer).await.unwrap();
    let mut ids: Vec<_> = feed.iter().map(|p| p.id).collect();
    ids.sort();
    let mut expected = vec![own.id, open.id, close.id];
    expected.sort();
    assert_eq!(ids, expected);

    let created: Vec<_> = feed.iter().map(|p| p.created_at).collect();
    assert!(created.windows(2).all(|w| w[0] >= w[1]));
}

#[tokio::test]
async fn test_posts_by_author_newest_first() {
    let h = harness().await;
    let alice = seed_user(&h.store, "alice").await;
    let older = h.content.create_post(alice, "one", "https://img/1").await.unwrap();
    let newer = h.content.create_post(alice, "two", "https://img/2").await.unwrap();

    let posts = h.content.posts_by_author(alice).await.unwrap();
    assert_eq!(posts.len(), 2);
    assert!(posts[0].created_at >= posts[1].created_at);
    assert!(posts.iter().any(|p| p.id == older.id));
    assert!(posts.iter().any(|p| p.id == newer.id));
}
