use serde_json::json;

use crate::integration::init_tracing;
use crate::utils::{TestClient, TestServer};

async fn three_in_room(server: &TestServer) -> (TestClient, TestClient, TestClient) {
    let mut a = TestClient::join(&server.ws_url(), "demo123").await.unwrap();
    let mut b = TestClient::join(&server.ws_url(), "demo123").await.unwrap();
    let c = TestClient::join(&server.ws_url(), "demo123").await.unwrap();

    // a: new-peer(b), count 2, new-peer(c), count 3; b: new-peer(c), count 3
    for _ in 0..4 {
        a.recv_envelope().await.unwrap();
    }
    for _ in 0..2 {
        b.recv_envelope().await.unwrap();
    }
    (a, b, c)
}

#[tokio::test]
async fn test_offer_reaches_only_its_target_unchanged() {
    init_tracing();
    let server = TestServer::start().await.expect("Failed to start relay");
    let (mut a, mut b, mut c) = three_in_room(&server).await;

    let offer = json!({
        "type": "offer",
        "offer": { "type": "offer", "sdp": "v=0\r\n" },
        "room": "demo123",
        "to": b.peer_id.as_str(),
        "from": a.peer_id.as_str(),
        "extra": { "kept": true }
    });
    a.send_json(&offer).await.unwrap();

    assert_eq!(b.recv_json().await.unwrap(), offer);
    c.expect_silence().await.unwrap();
    a.expect_silence().await.unwrap();

    server.stop().await.unwrap();
}

#[tokio::test]
async fn test_answer_and_candidate_are_forwarded() {
    init_tracing();
    let server = TestServer::start().await.expect("Failed to start relay");
    let (mut a, mut b, _c) = three_in_room(&server).await;

    let answer = json!({
        "type": "answer",
        "answer": { "type": "answer", "sdp": "v=0\r\n" },
        "room": "demo123",
        "to": a.peer_id.as_str(),
        "from": b.peer_id.as_str()
    });
    let candidate = json!({
        "type": "candidate",
        "candidate": {
            "candidate": "candidate:1 1 udp 2122260223 192.0.2.1 54321 typ host",
            "sdpMid": "0",
            "sdpMLineIndex": 0
        },
        "room": "demo123",
        "to": a.peer_id.as_str(),
        "from": b.peer_id.as_str()
    });
    b.send_json(&answer).await.unwrap();
    b.send_json(&candidate).await.unwrap();

    assert_eq!(a.recv_json().await.unwrap(), answer);
    assert_eq!(a.recv_json().await.unwrap(), candidate);

    server.stop().await.unwrap();
}

#[tokio::test]
async fn test_message_for_absent_peer_is_dropped() {
    init_tracing();
    let server = TestServer::start().await.expect("Failed to start relay");
    let (mut a, mut b, _c) = three_in_room(&server).await;

    let to_ghost = json!({
        "type": "offer",
        "offer": { "type": "offer", "sdp": "v=0\r\n" },
        "room": "demo123",
        "to": "ghost",
        "from": a.peer_id.as_str()
    });
    a.send_json(&to_ghost).await.unwrap();
    a.expect_silence().await.unwrap();
    b.expect_silence().await.unwrap();

    let to_b = json!({
        "type": "offer",
        "offer": { "type": "offer", "sdp": "v=0\r\n" },
        "room": "demo123",
        "to": b.peer_id.as_str(),
        "from": a.peer_id.as_str()
    });
    a.send_json(&to_b).await.unwrap();
    assert_eq!(b.recv_json().await.unwrap(), to_b);

    server.stop().await.unwrap();
}

#[tokio::test]
async fn test_malformed_frames_do_not_break_the_connection() {
    init_tracing();
    let server = TestServer::start().await.expect("Failed to start relay");
    let mut a = TestClient::join(&server.ws_url(), "demo123").await.unwrap();
    let mut b = TestClient::join(&server.ws_url(), "demo123").await.unwrap();
    a.recv_envelope().await.unwrap();
    a.recv_envelope().await.unwrap();

    a.send_text("not json").await.unwrap();
    a.send_json(&json!({ "type": "bogus" })).await.unwrap();
    a.send_json(&json!({ "type": "offer", "room": "demo123" }))
        .await
        .unwrap();
    a.expect_silence().await.unwrap();

    let offer = json!({
        "type": "offer",
        "offer": { "type": "offer", "sdp": "v=0\r\n" },
        "room": "demo123",
        "to": b.peer_id.as_str(),
        "from": a.peer_id.as_str()
    });
    a.send_json(&offer).await.unwrap();
    assert_eq!(b.recv_json().await.unwrap(), offer);
    assert_eq!(server.service.registry().peer_count(), 2);

    server.stop().await.unwrap();
}

#[tokio::test]
async fn test_root_path_accepts_websocket_clients() {
    init_tracing();
    let server = TestServer::start().await.expect("Failed to start relay");

    let mut a = TestClient::join(&server.root_url(), "demo123").await.unwrap();
    let _b = TestClient::join(&server.ws_url(), "demo123").await.unwrap();

    assert!(matches!(
        a.recv_envelope().await.unwrap(),
        meshpad_core::Envelope::NewPeer { .. }
    ));

    server.stop().await.unwrap();
}
