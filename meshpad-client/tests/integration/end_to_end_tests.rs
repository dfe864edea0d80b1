use meshpad_client::{MeshEvent, Session, SessionHandle, SessionState, YrsDocument};
use std::sync::Arc;
use std::time::Duration;

use crate::integration::init_tracing;
use crate::utils::{CONVERGENCE_TIMEOUT_MS, TestRelay, local_config, wait_for_text};

async fn wait_for_presence(handle: &SessionHandle, count: usize) {
    let mut presence = handle.presence_watch();
    tokio::time::timeout(Duration::from_secs(5), presence.wait_for(|n| *n == count))
        .await
        .unwrap_or_else(|_| panic!("presence never reached {}", count))
        .unwrap();
}

#[tokio::test]
async fn test_two_sessions_share_a_document_through_the_relay() {
    init_tracing();
    let relay = TestRelay::start().await.expect("Failed to start relay");
    let alice_doc = Arc::new(YrsDocument::new());
    let bob_doc = Arc::new(YrsDocument::new());

    let alice = Session::join(local_config(&relay.url), "demo123", alice_doc.clone()).unwrap();
    alice
        .wait_for_state(SessionState::Joined, Duration::from_secs(5))
        .await
        .unwrap();
    let mut bob = Session::join(local_config(&relay.url), "demo123", bob_doc.clone()).unwrap();
    let mut bob_events = bob.take_events().unwrap();
    assert!(bob.take_events().is_none());

    wait_for_presence(&alice, 2).await;
    wait_for_presence(&bob, 2).await;

    alice_doc.push("hi");
    assert!(
        wait_for_text(&bob_doc, "hi", CONVERGENCE_TIMEOUT_MS).await,
        "bob sees {:?}",
        bob_doc.text()
    );

    bob_doc.push("!");
    assert!(
        wait_for_text(&alice_doc, "hi!", CONVERGENCE_TIMEOUT_MS).await,
        "alice sees {:?}",
        alice_doc.text()
    );

    let mut seen = Vec::new();
    while let Ok(event) = bob_events.try_recv() {
        seen.push(event);
    }
    assert!(seen.contains(&MeshEvent::PresenceChanged(2)));
    assert!(seen.contains(&MeshEvent::PeerConnected(alice.peer_id().clone())));
    assert!(seen.contains(&MeshEvent::StateChanged(SessionState::Joined)));

    alice.leave().await;
    wait_for_presence(&bob, 1).await;
    bob.leave().await;
}

#[tokio::test]
async fn test_late_joiner_receives_existing_content() {
    init_tracing();
    let relay = TestRelay::start().await.expect("Failed to start relay");
    let alice_doc = Arc::new(YrsDocument::new());
    alice_doc.push("written before anyone else arrived");

    let alice = Session::join(local_config(&relay.url), "notes", alice_doc).unwrap();
    alice
        .wait_for_state(SessionState::Joined, Duration::from_secs(5))
        .await
        .unwrap();

    let carol_doc = Arc::new(YrsDocument::new());
    let carol = Session::join(local_config(&relay.url), "notes", carol_doc.clone()).unwrap();

    assert!(
        wait_for_text(
            &carol_doc,
            "written before anyone else arrived",
            CONVERGENCE_TIMEOUT_MS
        )
        .await
    );
    assert_eq!(relay.service.registry().peer_count(), 2);

    carol.leave().await;
    alice.leave().await;
}
