use meshpad_core::Envelope;

use crate::integration::{init_tracing, wait_for_peer_count};
use crate::utils::{TestClient, TestServer};

#[tokio::test]
async fn test_second_peer_is_announced_to_the_first() {
    init_tracing();
    let server = TestServer::start().await.expect("Failed to start relay");

    let mut alice = TestClient::join(&server.ws_url(), "demo123").await.unwrap();
    let mut bob = TestClient::connect(&server.ws_url()).await.unwrap();
    bob.send_join("demo123").await.unwrap();

    match alice.recv_envelope().await.unwrap() {
        Envelope::NewPeer { peer_id, room } => {
            assert_eq!(peer_id, bob.peer_id);
            assert_eq!(room.as_str(), "demo123");
        }
        other => panic!("expected new-peer, got {:?}", other),
    }
    assert_eq!(
        alice.recv_json().await.unwrap(),
        serde_json::json!({ "type": "active-users", "count": 2, "room": "demo123" })
    );
    assert!(matches!(
        bob.recv_envelope().await.unwrap(),
        Envelope::ActiveUsers { count: 2, .. }
    ));
    bob.expect_silence().await.unwrap();

    server.stop().await.unwrap();
}

#[tokio::test]
async fn test_repeated_join_on_same_connection_is_silent() {
    init_tracing();
    let server = TestServer::start().await.expect("Failed to start relay");

    let mut alice = TestClient::join(&server.ws_url(), "demo123").await.unwrap();
    alice.send_join("demo123").await.unwrap();

    alice.expect_silence().await.unwrap();
    assert_eq!(server.service.registry().peer_count(), 1);

    server.stop().await.unwrap();
}

#[tokio::test]
async fn test_disconnect_updates_occupancy_and_deletes_empty_room() {
    init_tracing();
    let server = TestServer::start().await.expect("Failed to start relay");

    let mut alice = TestClient::join(&server.ws_url(), "demo123").await.unwrap();
    let bob = TestClient::join(&server.ws_url(), "demo123").await.unwrap();
    assert!(matches!(alice.recv_envelope().await.unwrap(), Envelope::NewPeer { .. }));
    assert!(matches!(
        alice.recv_envelope().await.unwrap(),
        Envelope::ActiveUsers { count: 2, .. }
    ));

    bob.close().await.unwrap();
    assert!(matches!(
        alice.recv_envelope().await.unwrap(),
        Envelope::ActiveUsers { count: 1, .. }
    ));

    alice.close().await.unwrap();
    assert!(wait_for_peer_count(&server.service, 0, 2000).await);
    assert_eq!(server.service.registry().room_count(), 0);

    server.stop().await.unwrap();
}

#[tokio::test]
async fn test_reconnect_with_same_peer_id_replaces_the_slot() {
    init_tracing();
    let server = TestServer::start().await.expect("Failed to start relay");

    let mut alice = TestClient::join(&server.ws_url(), "demo123").await.unwrap();
    let bob = TestClient::join(&server.ws_url(), "demo123").await.unwrap();
    alice.recv_envelope().await.unwrap();
    alice.recv_envelope().await.unwrap();

    let mut bob_again = TestClient::connect(&server.ws_url()).await.unwrap();
    bob_again.peer_id = bob.peer_id.clone();
    bob_again.send_join("demo123").await.unwrap();

    match alice.recv_envelope().await.unwrap() {
        Envelope::NewPeer { peer_id, .. } => assert_eq!(peer_id, bob.peer_id),
        other => panic!("expected new-peer, got {:?}", other),
    }
    assert!(matches!(
        alice.recv_envelope().await.unwrap(),
        Envelope::ActiveUsers { count: 2, .. }
    ));

    // The stale connection going away must not evict the new one.
    bob.close().await.unwrap();
    alice.expect_silence().await.unwrap();
    assert_eq!(server.service.registry().peer_count(), 2);

    server.stop().await.unwrap();
}

#[tokio::test]
async fn test_rooms_are_isolated() {
    init_tracing();
    let server = TestServer::start().await.expect("Failed to start relay");

    let mut alice = TestClient::join(&server.ws_url(), "one").await.unwrap();
    let _bob = TestClient::join(&server.ws_url(), "two").await.unwrap();

    alice.expect_silence().await.unwrap();
    assert_eq!(server.service.registry().room_count(), 2);

    server.stop().await.unwrap();
}
