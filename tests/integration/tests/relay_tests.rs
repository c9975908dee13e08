//! Relay integration tests
//!
//! Each test starts its own relay on an ephemeral port; no external
//! services are needed.
//!
//! Run with: cargo test -p integration-tests --test relay_tests

use std::time::Duration;

use encore_relay::room_key_for;
use integration_tests::{assert_json, assert_status, test_config, TestServer, WsClient};
use reqwest::StatusCode;
use serde_json::{json, Value};

// ============================================================================
// Connection lifecycle
// ============================================================================

#[tokio::test]
async fn test_hello_announces_connection() {
    let server = TestServer::start().await.unwrap();
    let client = WsClient::connect(&server).await.unwrap();

    assert!(!client.connection_id.is_empty());
    assert_eq!(client.heartbeat_interval, 25_000);
}

#[tokio::test]
async fn test_gateway_path_is_an_alias() {
    let server = TestServer::start().await.unwrap();
    let client = WsClient::connect_url(&server.ws_url("/gateway"), None)
        .await
        .unwrap();

    assert!(!client.connection_id.is_empty());
}

#[tokio::test]
async fn test_heartbeat_is_acknowledged() {
    let server = TestServer::start().await.unwrap();
    let mut client = WsClient::connect(&server).await.unwrap();

    client.heartbeat(None).await.unwrap();
    let ack = client.recv_frame().await.unwrap();
    assert_eq!(ack["op"], 11);
}

#[tokio::test]
async fn test_malformed_frame_keeps_connection_open() {
    let server = TestServer::start().await.unwrap();
    let mut client = WsClient::connect(&server).await.unwrap();

    client.send_text("{not json").await.unwrap();
    client.send_text(r#"{"op":10,"d":{}}"#).await.unwrap();
    client.heartbeat(Some(0)).await.unwrap();

    let ack = client.recv_frame().await.unwrap();
    assert_eq!(ack["op"], 11);
}

#[tokio::test]
async fn test_idle_connection_is_closed_with_session_timeout() {
    let server = TestServer::start_with(&[
        ("RELAY_HEARTBEAT_INTERVAL_MS", "100"),
        ("RELAY_HEARTBEAT_TIMEOUT_MS", "300"),
    ])
    .await
    .unwrap();
    let mut client = WsClient::connect(&server).await.unwrap();
    assert_eq!(client.heartbeat_interval, 100);

    let code = client.expect_close(Duration::from_secs(3)).await.unwrap();
    assert_eq!(code, 4009);

    server
        .wait_for_stats(|stats| stats.connections == 0)
        .await
        .unwrap();
}

#[tokio::test]
async fn test_heartbeats_keep_connection_alive() {
    let server = TestServer::start_with(&[
        ("RELAY_HEARTBEAT_INTERVAL_MS", "100"),
        ("RELAY_HEARTBEAT_TIMEOUT_MS", "400"),
    ])
    .await
    .unwrap();
    let mut client = WsClient::connect(&server).await.unwrap();

    for _ in 0..8 {
        client.heartbeat(None).await.unwrap();
        assert_eq!(client.recv_frame().await.unwrap()["op"], 11);
        tokio::time::sleep(Duration::from_millis(100)).await;
    }

    assert_eq!(server.stats().await.unwrap().connections, 1);
}

#[tokio::test]
async fn test_disconnect_removes_memberships() {
    let server = TestServer::start().await.unwrap();
    let mut c1 = WsClient::connect(&server).await.unwrap();
    let mut c2 = WsClient::connect(&server).await.unwrap();
    c1.join("lobby").await.unwrap();
    c2.join("lobby").await.unwrap();
    c2.join("solo").await.unwrap();

    c2.close().await.unwrap();
    let stats = server
        .wait_for_stats(|stats| stats.connections == 1)
        .await
        .unwrap();
    assert_eq!(stats.rooms, 1);

    c1.emit("chat_message", json!({"room": "lobby", "text": "anyone?"}))
        .await
        .unwrap();
    c1.expect_silence().await.unwrap();
}

#[tokio::test]
async fn test_graceful_shutdown_closes_sockets() {
    let server = TestServer::start().await.unwrap();
    let mut client = WsClient::connect(&server).await.unwrap();

    let shutdown = tokio::spawn(server.shutdown());
    let code = client.expect_close(Duration::from_secs(3)).await.unwrap();
    assert_eq!(code, 4001);

    drop(client);
    shutdown.await.unwrap().unwrap();
}

// ============================================================================
// Rooms
// ============================================================================

#[tokio::test]
async fn test_direct_chat_between_two_users() {
    let server = TestServer::start().await.unwrap();
    let mut alice = WsClient::connect(&server).await.unwrap();
    let mut bob = WsClient::connect(&server).await.unwrap();
    let mut carol = WsClient::connect(&server).await.unwrap();

    let room = room_key_for("2", "1");
    assert_eq!(room.as_str(), "1-2");

    alice.join(room.as_str()).await.unwrap();
    bob.join(room.as_str()).await.unwrap();

    let message = json!({"room": "1-2", "from": "1", "to": "2", "text": "hey"});
    alice.emit("chat_message", message.clone()).await.unwrap();

    let received = bob.expect_event("chat_message").await.unwrap();
    assert_eq!(received.payload, message);

    alice.expect_silence().await.unwrap();
    carol.expect_silence().await.unwrap();
}

#[tokio::test]
async fn test_chat_echo_when_enabled() {
    let server = TestServer::start_with(&[("RELAY_CHAT_ECHO", "true")])
        .await
        .unwrap();
    let mut alice = WsClient::connect(&server).await.unwrap();
    alice.join("1-2").await.unwrap();

    alice
        .emit("chat_message", json!({"room": "1-2", "text": "echo"}))
        .await
        .unwrap();

    let echoed = alice.expect_event("chat_message").await.unwrap();
    assert_eq!(echoed.payload["text"], "echo");
}

#[tokio::test]
async fn test_typing_indicators_arrive_in_order() {
    let server = TestServer::start().await.unwrap();
    let mut alice = WsClient::connect(&server).await.unwrap();
    let mut bob = WsClient::connect(&server).await.unwrap();
    alice.join("1-2").await.unwrap();
    bob.join("1-2").await.unwrap();

    let payload = json!({"room": "1-2", "from": "1"});
    alice.emit("typing", payload.clone()).await.unwrap();
    alice.emit("stop_typing", payload).await.unwrap();

    let first = bob.expect_event("typing").await.unwrap();
    let second = bob.expect_event("stop_typing").await.unwrap();
    assert!(second.seq > first.seq);
    alice.expect_silence().await.unwrap();
}

#[tokio::test]
async fn test_sequence_numbers_increase_per_connection() {
    let server = TestServer::start().await.unwrap();
    let mut alice = WsClient::connect(&server).await.unwrap();
    let mut bob = WsClient::connect(&server).await.unwrap();
    alice.join("r").await.unwrap();
    bob.join("r").await.unwrap();

    for i in 0..5 {
        alice
            .emit("chat_message", json!({"room": "r", "n": i}))
            .await
            .unwrap();
    }

    let mut last = 0;
    for i in 0..5 {
        let event = bob.expect_event("chat_message").await.unwrap();
        assert_eq!(event.payload["n"], i);
        assert!(event.seq > last);
        last = event.seq;
    }
}

#[tokio::test]
async fn test_double_join_delivers_once() {
    let server = TestServer::start().await.unwrap();
    let mut alice = WsClient::connect(&server).await.unwrap();
    let mut bob = WsClient::connect(&server).await.unwrap();
    alice.join("station-4").await.unwrap();
    bob.join("station-4").await.unwrap();
    bob.join("station-4").await.unwrap();

    alice
        .emit("chat_message", json!({"room": "station-4", "text": "once"}))
        .await
        .unwrap();

    bob.expect_event("chat_message").await.unwrap();
    bob.expect_silence().await.unwrap();
}

#[tokio::test]
async fn test_leave_room_stops_delivery() {
    let server = TestServer::start().await.unwrap();
    let mut alice = WsClient::connect(&server).await.unwrap();
    let mut bob = WsClient::connect(&server).await.unwrap();
    alice.join("r").await.unwrap();
    bob.join("r").await.unwrap();
    bob.leave("r").await.unwrap();

    alice
        .emit("chat_message", json!({"room": "r", "text": "gone?"}))
        .await
        .unwrap();
    bob.expect_silence().await.unwrap();
}

#[tokio::test]
async fn test_hundred_listeners_all_receive() {
    let server = TestServer::start().await.unwrap();
    let mut clients = Vec::new();
    for _ in 0..100 {
        let mut client = WsClient::connect(&server).await.unwrap();
        client.join("station-1").await.unwrap();
        clients.push(client);
    }

    clients[0]
        .emit("chat_message", json!({"room": "station-1", "text": "drop"}))
        .await
        .unwrap();

    for client in clients.iter_mut().skip(1) {
        let event = client.expect_event("chat_message").await.unwrap();
        assert_eq!(event.payload["text"], "drop");
    }
    clients[0].expect_silence().await.unwrap();

    let stats = server.stats().await.unwrap();
    assert_eq!(stats.connections, 100);
    assert_eq!(stats.rooms, 1);
}

// ============================================================================
// Global events
// ============================================================================

#[tokio::test]
async fn test_live_status_reaches_everyone_under_station_topic() {
    let server = TestServer::start().await.unwrap();
    let mut dj = WsClient::connect(&server).await.unwrap();
    let mut listener = WsClient::connect(&server).await.unwrap();
    dj.join("station-9").await.unwrap();

    dj.emit("live-status", json!({"stationId": 9, "live": true}))
        .await
        .unwrap();

    for client in [&mut dj, &mut listener] {
        let event = client.expect_event("station-9-live-status").await.unwrap();
        assert_eq!(event.payload["live"], true);
    }
}

// ============================================================================
// HTTP surface
// ============================================================================

#[tokio::test]
async fn test_health_check() {
    let server = TestServer::start().await.unwrap();
    let response = server.get("/health").await.unwrap();
    assert_status(response, StatusCode::OK).await.unwrap();
}

#[tokio::test]
async fn test_stats_counts_connections_and_rooms() {
    let server = TestServer::start().await.unwrap();
    let stats = server.stats().await.unwrap();
    assert_eq!((stats.connections, stats.rooms), (0, 0));

    let mut c1 = WsClient::connect(&server).await.unwrap();
    let mut c2 = WsClient::connect(&server).await.unwrap();
    c1.join("a").await.unwrap();
    c2.join("b").await.unwrap();

    let stats = server.stats().await.unwrap();
    assert_eq!((stats.connections, stats.rooms), (2, 2));
}

#[tokio::test]
async fn test_publish_to_room() {
    let server = TestServer::start().await.unwrap();
    let mut member = WsClient::connect(&server).await.unwrap();
    let mut outsider = WsClient::connect(&server).await.unwrap();
    member.join("station-2").await.unwrap();

    let response = server
        .post(
            "/publish",
            &json!({"event": "now_playing", "room": "station-2", "payload": {"track": "intro"}}),
        )
        .await
        .unwrap();
    let body: Value = assert_json(response, StatusCode::ACCEPTED).await.unwrap();
    assert_eq!(body["delivered"], 1);

    let event = member.expect_event("now_playing").await.unwrap();
    assert_eq!(event.payload["track"], "intro");
    outsider.expect_silence().await.unwrap();
}

#[tokio::test]
async fn test_publish_global_uses_topic() {
    let server = TestServer::start().await.unwrap();
    let mut client = WsClient::connect(&server).await.unwrap();

    let response = server
        .post(
            "/publish",
            &json!({"event": "new-follower", "payload": {"userId": "u7", "by": "u9"}}),
        )
        .await
        .unwrap();
    let body: Value = assert_json(response, StatusCode::ACCEPTED).await.unwrap();
    assert_eq!(body["delivered"], 1);

    let event = client.expect_event("user-u7-new-follower").await.unwrap();
    assert_eq!(event.payload["by"], "u9");
}

#[tokio::test]
async fn test_publish_rejects_empty_event() {
    let server = TestServer::start().await.unwrap();
    let response = server
        .post("/publish", &json!({"event": "  ", "payload": {}}))
        .await
        .unwrap();

    let body: Value = assert_json(response, StatusCode::BAD_REQUEST).await.unwrap();
    assert_eq!(body["error"]["code"], "INVALID_INPUT");
}

#[tokio::test]
async fn test_publish_requires_configured_token() {
    let server = TestServer::start_with(&[("RELAY_PUBLISH_TOKEN", "s3cret")])
        .await
        .unwrap();
    let body = json!({"event": "track-update", "payload": {"trackId": 3}});

    let response = server.post("/publish", &body).await.unwrap();
    assert_status(response, StatusCode::UNAUTHORIZED).await.unwrap();

    let response = server.post_auth("/publish", "wrong", &body).await.unwrap();
    assert_status(response, StatusCode::UNAUTHORIZED).await.unwrap();

    let response = server.post_auth("/publish", "s3cret", &body).await.unwrap();
    assert_status(response, StatusCode::ACCEPTED).await.unwrap();
}

// ============================================================================
// Origin policy
// ============================================================================

#[tokio::test]
async fn test_origin_allow_list() {
    let server = TestServer::start_with(&[("CORS_ALLOWED_ORIGINS", "https://encore.example")])
        .await
        .unwrap();

    let allowed = WsClient::connect_with_origin(&server, "https://encore.example").await;
    assert!(allowed.is_ok());

    let rejected = WsClient::connect_with_origin(&server, "https://evil.example").await;
    let err = rejected.err().unwrap().to_string();
    assert!(err.contains("403"), "unexpected error: {err}");

    // Non-browser clients send no Origin
    assert!(WsClient::connect(&server).await.is_ok());
}

#[tokio::test]
async fn test_production_without_allow_list_rejects_browsers() {
    let config = test_config(&[("APP_ENV", "production")]).unwrap();
    let server = TestServer::start_with_config(config).await.unwrap();

    assert!(WsClient::connect_with_origin(&server, "https://encore.example")
        .await
        .is_err());
    assert!(WsClient::connect(&server).await.is_ok());
}
