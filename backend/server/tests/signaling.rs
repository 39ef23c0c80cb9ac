use std::{net::SocketAddr, time::Duration};

use futures::{SinkExt, StreamExt};
use protocol::{events::ServerEvent, id::ConnId};
use serde_json::{Value, json};
use server::{config::Config, fallback::FallbackConfig, router, state::AppState};
use tokio::{net::TcpStream, time::timeout};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async, tungstenite::Message};

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

const FALLBACK_DELAY: Duration = Duration::from_millis(300);
const WAIT: Duration = Duration::from_secs(5);

async fn spawn_server() -> SocketAddr {
    let state = AppState::new(Config {
        fallback: FallbackConfig {
            delay: FALLBACK_DELAY,
            message: "demo".to_string(),
        },
        ..Config::default()
    });

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        axum::serve(listener, router(state)).await.unwrap();
    });

    addr
}

async fn open(addr: SocketAddr) -> (Socket, ConnId) {
    let (mut socket, _) = connect_async(format!("ws://{addr}/ws")).await.unwrap();

    match next_event(&mut socket).await {
        ServerEvent::Connected { id } => (socket, id),
        other => panic!("Expected connected, got {other:?}"),
    }
}

async fn send(socket: &mut Socket, frame: Value) {
    socket.send(Message::Text(frame.to_string())).await.unwrap();
}

async fn next_event(socket: &mut Socket) -> ServerEvent {
    loop {
        let message = timeout(WAIT, socket.next())
            .await
            .expect("timed out")
            .expect("stream ended")
            .unwrap();

        if let Message::Text(text) = message {
            return serde_json::from_str(&text).unwrap();
        }
    }
}

async fn assert_silent(socket: &mut Socket, wait: Duration) {
    if let Ok(Some(Ok(Message::Text(text)))) = timeout(wait, socket.next()).await {
        panic!("Unexpected event: {text}");
    }
}

async fn online(addr: SocketAddr) -> u64 {
    let body: Value = reqwest::get(format!("http://{addr}/api/online-count"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    body["online"].as_u64().unwrap()
}

#[tokio::test]
async fn test_pair_and_relay() {
    let addr = spawn_server().await;
    let (mut x, x_id) = open(addr).await;
    let (mut y, y_id) = open(addr).await;

    send(&mut x, json!({ "event": "find-partner", "data": {} })).await;
    send(&mut y, json!({ "event": "find-partner" })).await;

    assert_eq!(next_event(&mut x).await, ServerEvent::PartnerFound { id: y_id });
    assert_eq!(next_event(&mut y).await, ServerEvent::PartnerFound { id: x_id });

    let candidate = json!({ "candidate": "candidate:1 1 UDP 2122252543 10.0.0.2 54321 typ host", "sdpMid": "0" });
    send(
        &mut x,
        json!({ "event": "signal", "data": { "to": y_id, "data": candidate } }),
    )
    .await;

    assert_eq!(
        next_event(&mut y).await,
        ServerEvent::Signal {
            from: x_id,
            data: candidate
        }
    );
}

#[tokio::test]
async fn test_partner_disconnected() {
    let addr = spawn_server().await;
    let (mut x, _) = open(addr).await;
    let (mut y, _) = open(addr).await;
    send(&mut x, json!({ "event": "find-partner" })).await;
    send(&mut y, json!({ "event": "find-partner" })).await;
    next_event(&mut x).await;
    next_event(&mut y).await;

    y.close(None).await.unwrap();

    assert_eq!(next_event(&mut x).await, ServerEvent::PartnerDisconnected);
    assert_silent(&mut x, FALLBACK_DELAY * 2).await;
}

#[tokio::test]
async fn test_fallback_for_lonely_search() {
    let addr = spawn_server().await;
    let (mut x, _) = open(addr).await;
    let (mut z, _) = open(addr).await;

    send(&mut x, json!({ "event": "find-partner", "data": { "country": "dk" } })).await;
    send(&mut z, json!({ "event": "find-partner", "data": { "country": "se" } })).await;

    assert_eq!(
        next_event(&mut x).await,
        ServerEvent::PartnerDummy {
            message: "demo".to_string()
        }
    );
    assert!(matches!(next_event(&mut z).await, ServerEvent::PartnerDummy { .. }));
    assert_silent(&mut x, FALLBACK_DELAY * 2).await;
}

#[tokio::test]
async fn test_next_tells_old_partner() {
    let addr = spawn_server().await;
    let (mut x, _) = open(addr).await;
    let (mut y, _) = open(addr).await;
    let (mut w, w_id) = open(addr).await;

    send(&mut x, json!({ "event": "find-partner" })).await;
    send(&mut y, json!({ "event": "find-partner" })).await;
    next_event(&mut x).await;
    next_event(&mut y).await;

    send(&mut w, json!({ "event": "find-partner", "data": { "gender": "f" } })).await;
    send(&mut x, json!({ "event": "find-partner", "data": { "gender": "f" } })).await;

    assert_eq!(next_event(&mut y).await, ServerEvent::PartnerLeft);
    assert_eq!(next_event(&mut x).await, ServerEvent::PartnerFound { id: w_id });
}

#[tokio::test]
async fn test_malformed_frames_are_ignored() {
    let addr = spawn_server().await;
    let (mut x, x_id) = open(addr).await;
    let (mut y, y_id) = open(addr).await;

    x.send(Message::Text("garbage".to_string())).await.unwrap();
    send(&mut x, json!({ "event": "dance" })).await;
    send(&mut x, json!({ "event": "signal", "data": { "to": "nobody" } })).await;
    send(&mut x, json!({ "event": "signal", "data": { "to": ConnId::new(), "data": 1 } })).await;
    x.send(Message::Binary(vec![1, 2, 3])).await.unwrap();

    // session is still usable afterwards
    send(&mut x, json!({ "event": "find-partner" })).await;
    send(&mut y, json!({ "event": "find-partner" })).await;

    assert_eq!(next_event(&mut x).await, ServerEvent::PartnerFound { id: y_id });
    assert_eq!(next_event(&mut y).await, ServerEvent::PartnerFound { id: x_id });
}

#[tokio::test]
async fn test_online_count_follows_sessions() {
    let addr = spawn_server().await;
    assert_eq!(online(addr).await, 0);

    let (x, _) = open(addr).await;
    let (mut y, _) = open(addr).await;
    assert_eq!(online(addr).await, 2);

    drop(x);
    y.close(None).await.unwrap();

    let mut remaining = online(addr).await;
    for _ in 0..50 {
        if remaining == 0 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
        remaining = online(addr).await;
    }
    assert_eq!(remaining, 0);
}

#[tokio::test]
async fn test_admin_routes() {
    let addr = spawn_server().await;
    let client = reqwest::Client::new();

    let health: Value = client
        .get(format!("http://{addr}/health"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(health, json!({ "ok": true }));

    let missing = client
        .post(format!("http://{addr}/api/login"))
        .json(&json!({ "username": "anna" }))
        .send()
        .await
        .unwrap();
    assert_eq!(missing.status(), reqwest::StatusCode::BAD_REQUEST);

    let login = client
        .post(format!("http://{addr}/api/login"))
        .json(&json!({ "username": "anna", "age": 24, "distance_km": 25 }))
        .send()
        .await
        .unwrap();
    assert!(login.status().is_success());

    let loose = client
        .post(format!("http://{addr}/api/login"))
        .json(&json!({ "username": 42, "age": 20, "distance_km": "25" }))
        .send()
        .await
        .unwrap();
    assert!(loose.status().is_success());

    client
        .post(format!("http://{addr}/api/admin/rules"))
        .json(&json!({ "text": "Be kind." }))
        .send()
        .await
        .unwrap();
    let rules: Value = client
        .get(format!("http://{addr}/api/admin/rules"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(rules, json!({ "text": "Be kind." }));
}
