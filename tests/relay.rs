//! End-to-end tests over real WebSocket connections

use std::net::SocketAddr;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use serde_json::{json, Value};
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};

use survival_relay::app::AppState;
use survival_relay::config::Config;
use survival_relay::http::build_router;

type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

async fn start_server() -> SocketAddr {
    let config = Config::from_lookup(|key| match key {
        "ROUND_SEED" => Some("3".to_string()),
        "SERVER_ADDR" => Some("127.0.0.1:0".to_string()),
        _ => None,
    })
    .unwrap();

    let (state, world) = AppState::new(config);
    tokio::spawn(world.run());

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, build_router(state)).await.unwrap();
    });
    addr
}

async fn connect(addr: SocketAddr) -> Client {
    let (client, _) = connect_async(format!("ws://{addr}/ws")).await.unwrap();
    client
}

async fn send_event(client: &mut Client, event: &str, data: Value) {
    let frame = json!({ "event": event, "data": data }).to_string();
    client.send(Message::Text(frame)).await.unwrap();
}

async fn recv_event(client: &mut Client) -> Value {
    loop {
        let frame = tokio::time::timeout(Duration::from_secs(3), client.next())
            .await
            .expect("timed out waiting for a frame")
            .expect("connection closed")
            .unwrap();
        if let Message::Text(text) = frame {
            return serde_json::from_str(&text).unwrap();
        }
    }
}

/// Skip frames until one with the given event name arrives
async fn recv_until(client: &mut Client, event: &str) -> Value {
    loop {
        let frame = recv_event(client).await;
        if frame["event"] == event {
            return frame;
        }
    }
}

/// Connect and spawn a player; returns the client and its assigned id
async fn join(addr: SocketAddr) -> (Client, String) {
    let mut client = connect(addr).await;
    send_event(&mut client, "new player", json!({ "x": 0.0, "y": 300.0 })).await;
    let frame = recv_until(&mut client, "your id").await;
    let id = frame["data"]["id"].as_str().unwrap().to_string();
    (client, id)
}

#[tokio::test]
async fn test_second_claim_on_held_object_is_rejected() {
    let addr = start_server().await;
    let (mut a, _a_id) = join(addr).await;
    let (mut b, b_id) = join(addr).await;

    let announced = recv_until(&mut a, "new player").await;
    assert_eq!(announced["data"]["id"], b_id.as_str());

    send_event(&mut a, "catch object", json!({ "objectId": "G0" })).await;
    let caught = recv_until(&mut b, "catch object").await;
    assert_eq!(caught["data"]["objectId"], "G0");

    send_event(&mut b, "catch object", json!({ "objectId": "G0" })).await;
    send_event(&mut b, "low level", json!({ "kind": "oxygen" })).await;

    // B's rejected claim emits nothing, so A's next event is B's warning
    let next = recv_event(&mut a).await;
    assert_eq!(next["event"], "low level");
    assert_eq!(next["data"]["id"], b_id.as_str());
    assert_eq!(next["data"]["kind"], "oxygen");
}

#[tokio::test]
async fn test_late_joiner_gets_roster_and_snapshot() {
    let addr = start_server().await;
    let (mut a, a_id) = join(addr).await;
    send_event(&mut a, "move player", json!({ "x": 42.0, "y": 310.0 })).await;
    // Let A's move land before B subscribes
    tokio::time::sleep(Duration::from_millis(100)).await;

    let mut b = connect(addr).await;
    send_event(&mut b, "new player", json!({ "x": 0.0, "y": 300.0 })).await;

    assert_eq!(recv_event(&mut b).await["event"], "your id");
    let roster = recv_event(&mut b).await;
    assert_eq!(roster["event"], "new player");
    assert_eq!(roster["data"]["id"], a_id.as_str());
    assert_eq!(roster["data"]["x"], 42.0);

    let first_object = recv_event(&mut b).await;
    assert_eq!(first_object["event"], "new object");
    assert_eq!(first_object["data"]["id"], "BR0");
    assert_eq!(first_object["data"]["onPlayer"], false);
}

#[tokio::test]
async fn test_disconnect_drops_carried_object() {
    let addr = start_server().await;
    let (mut a, a_id) = join(addr).await;
    let (mut b, _) = join(addr).await;

    send_event(&mut a, "catch object", json!({ "objectId": "C0" })).await;
    send_event(&mut a, "move player", json!({ "x": -75.0, "y": 500.0 })).await;
    recv_until(&mut b, "move player").await;

    a.close(None).await.unwrap();

    let dropped = recv_until(&mut b, "drop object").await;
    assert_eq!(dropped["data"]["objectId"], "C0");
    assert_eq!(dropped["data"]["x"], -75.0);
    assert_eq!(dropped["data"]["y"], 500.0);

    let removed = recv_event(&mut b).await;
    assert_eq!(removed["event"], "remove player");
    assert_eq!(removed["data"]["id"], a_id.as_str());
}

#[tokio::test]
async fn test_malformed_frames_keep_connection_open() {
    let addr = start_server().await;
    let (mut a, _) = join(addr).await;

    a.send(Message::Text("{not json".to_string())).await.unwrap();
    send_event(&mut a, "teleport", json!({ "x": 1.0 })).await;
    send_event(&mut a, "player score", json!({ "playerName": "ada" })).await;

    let scores = recv_until(&mut a, "highscores").await;
    assert_eq!(scores["data"]["stats"]["name"], "ada");
    assert_eq!(scores["data"]["scores"][0]["name"], "ada");
}
