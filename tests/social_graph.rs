mod common;

use common::{harness, list, seed_user, snapshot};
use social_graph::models::AssocType;
use social_graph::services::FollowOutcome;
use social_graph::AppError;

#[tokio::test]
async fn test_follow_then_unfollow_is_symmetric() {
    let h = harness().await;
    let alice = seed_user(&h.store, "alice").await;
    let bob = seed_user(&h.store, "bob").await;

    h.graph.follow(alice, bob).await.unwrap();
    assert_eq!(list(&h.store, alice, AssocType::Following).await, vec![bob]);
    assert_eq!(list(&h.store, bob, AssocType::Followers).await, vec![alice]);

    h.graph.unfollow(alice, bob).await.unwrap();
    assert!(list(&h.store, alice, AssocType::Following).await.is_empty());
    assert!(list(&h.store, bob, AssocType::Followers).await.is_empty());
}

#[tokio::test]
async fn test_toggle_routes_on_current_state() {
    let h = harness().await;
    let alice = seed_user(&h.store, "alice").await;
    let bob = seed_user(&h.store, "bob").await;

    assert_eq!(h.graph.toggle_follow(alice, bob).await.unwrap(), FollowOutcome::Followed);
    assert_eq!(h.graph.toggle_follow(alice, bob).await.unwrap(), FollowOutcome::Unfollowed);
    assert_eq!(h.graph.toggle_follow(alice, bob).await.unwrap(), FollowOutcome::Followed);
    assert_eq!(list(&h.store, bob, AssocType::Followers).await, vec![alice]);
}

#[tokio::test]
async fn test_follow_twice_keeps_one_edge() {
    let h = harness().await;
    let alice = seed_user(&h.store, "alice").await;
    let bob = seed_user(&h.store, "bob").await;

    h.graph.follow(alice, bob).await.unwrap();
    h.graph.follow(alice, bob).await.unwrap();

    assert_eq!(list(&h.store, alice, AssocType::Following).await, vec![bob]);
    assert_eq!(list(&h.store, bob, AssocType::Followers).await, vec![alice]);
    assert_eq!(h.sink.events_for(bob).len(), 1);
}

#[tokio::test]
async fn test_self_follow_is_rejected() {
    let h = harness().await;
    let alice = seed_user(&h.store, "alice").await;

    let err = h.graph.toggle_follow(alice, alice).await.unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));
    assert!(list(&h.store, alice, AssocType::Following).await.is_empty());
}

#[tokio::test]
async fn test_follow_missing_user() {
    let h = harness().await;
    let alice = seed_user(&h.store, "alice").await;

    let err = h.graph.follow(alice, 999).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
    let err = h.graph.follow(999, alice).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
    assert!(list(&h.store, alice, AssocType::Following).await.is_empty());
    assert!(list(&h.store, alice, AssocType::Followers).await.is_empty());
}

#[tokio::test]
async fn test_owner_cannot_be_unfollowed() {
    let h = harness().await;
    let alice = seed_user(&h.store, "alice").await;

    assert_eq!(
        h.graph.toggle_follow(alice, h.owner).await.unwrap(),
        FollowOutcome::Followed
    );
    let before = snapshot(&h.store).await;

    let err = h.graph.toggle_follow(alice, h.owner).await.unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)));
    let err = h.graph.unfollow(alice, h.owner).await.unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)));

    assert_eq!(snapshot(&h.store).await, before);
    assert_eq!(list(&h.store, alice, AssocType::Following).await, vec![h.owner]);
}

#[tokio::test]
async fn test_follow_notifies_target_after_commit() {
    let h = harness().await;
    let alice = seed_user(&h.store, "alice").await;
    let bob = seed_user(&h.store, "bob").await;

    h.graph.follow(alice, bob).await.unwrap();

    let events = h.sink.events_for(bob);
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].event, "notification");
    assert_eq!(events[0].payload["type"], "follow");
    assert_eq!(events[0].payload["userId"], alice);
    assert_eq!(events[0].payload["userDetails"]["username"], "alice");

    h.graph.unfollow(alice, bob).await.unwrap();
    assert_eq!(h.sink.events_for(bob).len(), 1);
}

#[tokio::test]
async fn test_lists_resolve_summaries_in_storage_order() {
    let h = harness().await;
    let target = seed_user(&h.store, "target").await;
    let first = seed_user(&h.store, "first").await;
    let second = seed_user(&h.store, "second").await;

    h.graph.follow(second, target).await.unwrap();
    h.graph.follow(first, target).await.unwrap();
    h.graph.follow(target, first).await.unwrap();

    let followers = h.graph.list_followers(target).await.unwrap();
    let names: Vec<_> = followers.iter().map(|u| u.username.as_str()).collect();
    assert_eq!(names, vec!["second", "first"]);

    let following = h.graph.list_following(target).await.unwrap();
    assert_eq!(following.len(), 1);
    assert_eq!(following[0].id, first);

    let err = h.graph.list_followers(12345).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}
