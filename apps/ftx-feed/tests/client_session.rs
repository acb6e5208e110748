//! Client Session Integration Tests
//!
//! Runs `FtxClient` against a local WebSocket server speaking the FTX
//! protocol.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message;
use tokio_util::sync::CancellationToken;

use ftx_feed::infrastructure::ftx::KeepAliveConfig;
use ftx_feed::{BookKind, FeedEvent, FtxClient, FtxClientConfig, FtxClientError, Selection};

const SNAPSHOT: &str = r#"{"channel":"orderbook","market":"BTC-PERP","type":"partial","data":{"time":1700000000.5,"bids":[[100,1]],"asks":[[101,2]]}}"#;
const VIOLATION: &str = r#"{"channel":"orderbook","market":"BTC-PERP","type":"update","data":{"time":1700000001,"bids":[[100,1,7]]}}"#;
const TRADES: &str = r#"{"channel":"trades","market":"BTC-PERP","type":"update","data":[{"price":100.5,"size":2,"time":"2023-01-01T00:00:00Z"}]}"#;

async fn bind() -> (TcpListener, String) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("ws://{}", listener.local_addr().unwrap());
    (listener, url)
}

fn client_config(url: String, ping: Duration, idle: Duration) -> FtxClientConfig {
    FtxClientConfig::new(url, vec!["BTC-PERP".to_string()], Selection::new(false, true, true))
        .with_keep_alive(KeepAliveConfig::new(ping, idle))
}

async fn next_event(rx: &mut mpsc::Receiver<FeedEvent>) -> FeedEvent {
    timeout(Duration::from_secs(2), rx.recv())
        .await
        .expect("timed out waiting for event")
        .expect("event channel closed")
}

#[tokio::test]
async fn full_session_subscribes_translates_and_unsubscribes() {
    let (listener, url) = bind().await;

    let server = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();

        let mut received = Vec::new();
        for _ in 0..2 {
            if let Some(Ok(Message::Text(text))) = ws.next().await {
                received.push(text.to_string());
            }
        }

        for message in [SNAPSHOT, VIOLATION, TRADES] {
            ws.send(Message::Text(message.into())).await.unwrap();
        }

        while let Some(Ok(message)) = ws.next().await {
            if let Message::Text(text) = message {
                received.push(text.to_string());
            }
        }
        received
    });

    let (event_tx, mut event_rx) = mpsc::channel(64);
    let cancel = CancellationToken::new();
    let client = FtxClient::new(
        client_config(url, Duration::from_millis(30), Duration::from_secs(5)),
        event_tx,
        cancel.clone(),
    );
    let client_task = tokio::spawn(async move { client.run().await });

    assert_eq!(next_event(&mut event_rx).await, FeedEvent::Connected);

    let FeedEvent::Book(book) = next_event(&mut event_rx).await else {
        panic!("expected book snapshot");
    };
    assert_eq!(book.kind, BookKind::Snapshot);
    assert_eq!(book.timestamp_ms, 1_700_000_000_500);
    assert_eq!(book.levels.len(), 2);

    let FeedEvent::Error(msg) = next_event(&mut event_rx).await else {
        panic!("expected error for malformed update");
    };
    assert_eq!(msg, "unexpected size of a bid quote: 3");

    let FeedEvent::Trade(trade) = next_event(&mut event_rx).await else {
        panic!("expected trade after the malformed message");
    };
    assert_eq!(trade.timestamp_ms, 1_672_531_200_000);

    // Let at least one keep-alive go out.
    tokio::time::sleep(Duration::from_millis(100)).await;
    cancel.cancel();

    timeout(Duration::from_secs(2), client_task)
        .await
        .unwrap()
        .unwrap()
        .unwrap();
    assert_eq!(next_event(&mut event_rx).await, FeedEvent::Disconnected);

    let received = server.await.unwrap();
    assert_eq!(
        received[..2],
        [
            r#"{"op":"subscribe","channel":"orderbook","market":"BTC-PERP"}"#,
            r#"{"op":"subscribe","channel":"trades","market":"BTC-PERP"}"#,
        ]
    );
    assert!(received.iter().any(|m| m == r#"{"op":"ping"}"#));

    let unsubscribes: Vec<_> = received
        .iter()
        .filter(|m| m.contains(r#""op":"unsubscribe""#))
        .collect();
    assert_eq!(unsubscribes.len(), 2);
}

#[tokio::test]
async fn server_close_ends_session() {
    let (listener, url) = bind().await;

    tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();
        ws.send(Message::Text(r#"{"type":"subscribed","channel":"trades","market":"BTC-PERP"}"#.into()))
            .await
            .unwrap();
        ws.close(None).await.unwrap();
        while ws.next().await.is_some() {}
    });

    let (event_tx, mut event_rx) = mpsc::channel(64);
    let client = FtxClient::new(
        client_config(url, Duration::from_secs(5), Duration::from_secs(15)),
        event_tx,
        CancellationToken::new(),
    );

    let result = timeout(Duration::from_secs(2), client.run()).await.unwrap();
    assert!(matches!(result, Err(FtxClientError::ConnectionClosed)));

    assert_eq!(next_event(&mut event_rx).await, FeedEvent::Connected);
    assert_eq!(next_event(&mut event_rx).await, FeedEvent::Disconnected);
}

#[tokio::test]
async fn silent_server_trips_idle_timeout() {
    let (listener, url) = bind().await;

    tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();
        // Read without ever answering.
        while ws.next().await.is_some() {}
    });

    let (event_tx, _event_rx) = mpsc::channel(64);
    let client = FtxClient::new(
        client_config(url, Duration::from_millis(20), Duration::from_millis(100)),
        event_tx,
        CancellationToken::new(),
    );

    let result = timeout(Duration::from_secs(2), client.run()).await.unwrap();
    assert!(matches!(result, Err(FtxClientError::IdleTimeout(_))));
}
