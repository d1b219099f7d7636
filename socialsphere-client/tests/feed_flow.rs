//! End-to-end journeys over a shared in-memory store: account lifecycle
//! feeding into posting, liking, commenting and saving.

use socialsphere_client::{
    feed::{FeedClient, FeedError, SaveToggle},
    provider::MemoryIdentityProvider,
    session::SessionGateway,
};
use socialsphere_common::{
    model::{SocialsphereSnowflakeGenerator, user::UserIdentity},
    snowflake::NodeId,
};
use socialsphere_store::memory::MemoryStore;
use std::sync::Arc;

struct Harness {
    gateway: SessionGateway,
    feed: FeedClient,
}

fn harness() -> Harness {
    let store = Arc::new(MemoryStore::default());
    Harness {
        gateway: SessionGateway::new(Arc::new(MemoryIdentityProvider::default()), store.clone()),
        feed: FeedClient::new(
            store,
            SocialsphereSnowflakeGenerator::new(NodeId::new_unchecked(1)),
        ),
    }
}

async fn register(harness: &Harness, email: &str, name: &str) -> UserIdentity {
    harness
        .gateway
        .register_account(email, name, "hunter2hunter2", "hunter2hunter2")
        .await
        .unwrap()
        .identity
}

#[tokio::test]
async fn registered_user_posts_and_owns_the_post() {
    let harness = harness();
    let alice = register(&harness, "alice@example.com", "alice").await;

    let post_id = harness
        .feed
        .create_post("https://img.example/sunset.png", Some(&alice))
        .await
        .unwrap();

    let owned = harness.feed.list_owned_posts(alice.uid).await.unwrap();
    assert_eq!(owned.len(), 1);
    assert_eq!(owned[0].id, post_id);
    assert_eq!(owned[0].username, "alice");

    // A second user owns nothing yet.
    let bob = register(&harness, "bob@example.com", "bob").await;
    assert!(harness.feed.list_owned_posts(bob.uid).await.unwrap().is_empty());
}

#[tokio::test]
async fn like_comment_reply_round_trip_between_users() {
    let harness = harness();
    let alice = register(&harness, "alice@example.com", "alice").await;
    let bob = register(&harness, "bob@example.com", "bob").await;

    let post_id = harness
        .feed
        .create_post("https://img.example/sunset.png", Some(&alice))
        .await
        .unwrap();

    let likes = harness.feed.toggle_like(post_id, bob.uid).await.unwrap();
    assert_eq!(likes, vec![bob.uid]);

    let comment = harness
        .feed
        .add_comment(post_id, "great shot", &bob)
        .await
        .unwrap();
    assert_eq!(comment.username, "bob");

    let reply = harness
        .feed
        .add_reply(post_id, comment.id, "thanks!", &alice)
        .await
        .unwrap();
    assert_eq!(reply.username, "alice");

    let post = harness.feed.get_post(post_id).await.unwrap();
    assert!(post.liked_by(bob.uid));
    assert!(!post.liked_by(alice.uid));
    let stored_comment = post.comment(comment.id).unwrap();
    assert_eq!(stored_comment.text, "great shot");
    assert_eq!(stored_comment.replies, vec![reply]);
}

#[tokio::test]
async fn only_the_owner_edits_or_the_post_stays_put() {
    let harness = harness();
    let alice = register(&harness, "alice@example.com", "alice").await;
    let bob = register(&harness, "bob@example.com", "bob").await;

    let post_id = harness
        .feed
        .create_post("https://img.example/original.png", Some(&alice))
        .await
        .unwrap();

    let error = harness
        .feed
        .update_post(post_id, "https://img.example/hijacked.png", bob.uid)
        .await
        .unwrap_err();
    assert!(matches!(error, FeedError::NotOwner));

    harness
        .feed
        .update_post(post_id, "https://img.example/edited.png", alice.uid)
        .await
        .unwrap();
    assert_eq!(
        harness.feed.get_post(post_id).await.unwrap().image_url,
        "https://img.example/edited.png"
    );
}

#[tokio::test]
async fn saved_posts_survive_sign_out_and_back_in() {
    let harness = harness();
    let alice = register(&harness, "alice@example.com", "alice").await;
    let bob = register(&harness, "bob@example.com", "bob").await;

    let post_id = harness
        .feed
        .create_post("https://img.example/sunset.png", Some(&alice))
        .await
        .unwrap();
    assert_eq!(
        harness.feed.toggle_save(post_id, bob.uid).await.unwrap(),
        SaveToggle::Saved
    );

    harness.gateway.sign_out(None).await.unwrap();
    let signed_in = harness
        .gateway
        .sign_in_with_credentials("bob@example.com", "hunter2hunter2")
        .await
        .unwrap();
    assert_eq!(signed_in.identity.uid, bob.uid);

    let saved = harness.feed.list_saved_posts(bob.uid).await.unwrap();
    assert_eq!(saved.len(), 1);
    assert_eq!(saved[0].post_id, post_id);
}

#[tokio::test]
async fn deleting_a_post_empties_the_feed_and_orphans_its_saves() {
    let harness = harness();
    let alice = register(&harness, "alice@example.com", "alice").await;
    let bob = register(&harness, "bob@example.com", "bob").await;

    let post_id = harness
        .feed
        .create_post("https://img.example/sunset.png", Some(&alice))
        .await
        .unwrap();
    harness.feed.toggle_save(post_id, bob.uid).await.unwrap();

    harness.feed.delete_post(post_id).await.unwrap();

    assert!(harness.feed.list_posts().await.unwrap().is_empty());
    assert!(harness.feed.list_saved_posts(bob.uid).await.unwrap().is_empty());

    let error = harness.feed.delete_post(post_id).await.unwrap_err();
    assert!(matches!(error, FeedError::PostNotFound(id) if id == post_id));
}
