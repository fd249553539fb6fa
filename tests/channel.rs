//! Channel Client Integration Tests
//!
//! Exercises the per-call message stream against a local WebSocket
//! server: in-order delivery, tolerant decoding, and close handling.

use std::net::SocketAddr;

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpListener;
use tokio_tungstenite::tungstenite::Message;

use outcall::adapters::channel::{ChannelClient, ChannelMessage};
use outcall::domain::ChannelEvent;

/// Spawn a one-connection WebSocket server that sends the given text
/// frames, then closes cleanly.
async fn spawn_server(frames: Vec<&'static str>) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();
        for frame in frames {
            ws.send(Message::Text(frame.to_string())).await.unwrap();
        }
        ws.close(None).await.ok();
        while ws.next().await.is_some() {}
    });

    addr
}

#[tokio::test]
async fn test_events_delivered_in_order() {
    let addr = spawn_server(vec![
        r#"{"type":"transcript","text":"one","speaker":"agent"}"#,
        r#"{"type":"transcript","text":"two","speaker":"customer"}"#,
        r#"{"type":"call_ended"}"#,
    ])
    .await;

    let mut handle = ChannelClient::open(&format!("ws://{addr}/ws/call/abc123"))
        .await
        .unwrap();

    let mut texts = Vec::new();
    while let Some(msg) = handle.recv().await {
        match msg {
            ChannelMessage::Event(ChannelEvent::Transcript { text, .. }) => texts.push(text),
            ChannelMessage::Event(ChannelEvent::CallEnded) => break,
            other => panic!("unexpected message: {other:?}"),
        }
    }

    assert_eq!(texts, vec!["one", "two"]);
}

#[tokio::test]
async fn test_malformed_payload_becomes_error_event() {
    let addr = spawn_server(vec![
        "{definitely not json",
        r#"{"type":"transcript","text":"after","speaker":"agent"}"#,
    ])
    .await;

    let mut handle = ChannelClient::open(&format!("ws://{addr}/ws/call/abc123"))
        .await
        .unwrap();

    // The malformed frame is surfaced as an error event, not a fault,
    // and the stream keeps going
    match handle.recv().await.unwrap() {
        ChannelMessage::Event(ChannelEvent::Error { message }) => {
            assert!(message.contains("Malformed"));
        }
        other => panic!("expected error event, got {other:?}"),
    }

    match handle.recv().await.unwrap() {
        ChannelMessage::Event(ChannelEvent::Transcript { text, .. }) => {
            assert_eq!(text, "after");
        }
        other => panic!("expected transcript, got {other:?}"),
    }
}

#[tokio::test]
async fn test_unknown_type_is_skipped() {
    let addr = spawn_server(vec![
        r#"{"type":"heartbeat","seq":1}"#,
        r#"{"type":"call_ended"}"#,
    ])
    .await;

    let mut handle = ChannelClient::open(&format!("ws://{addr}/ws/call/abc123"))
        .await
        .unwrap();

    // The heartbeat never reaches the consumer
    assert_eq!(
        handle.recv().await,
        Some(ChannelMessage::Event(ChannelEvent::CallEnded))
    );
}

#[tokio::test]
async fn test_clean_close_delivers_closed() {
    let addr = spawn_server(vec![]).await;

    let mut handle = ChannelClient::open(&format!("ws://{addr}/ws/call/abc123"))
        .await
        .unwrap();

    assert_eq!(handle.recv().await, Some(ChannelMessage::Closed));
    assert_eq!(handle.recv().await, None);
}

#[tokio::test]
async fn test_abrupt_disconnect_is_a_transport_error() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let ws = tokio_tungstenite::accept_async(stream).await.unwrap();
        // Drop the connection without a closing handshake
        drop(ws);
    });

    let mut handle = ChannelClient::open(&format!("ws://{addr}/ws/call/abc123"))
        .await
        .unwrap();

    match handle.recv().await.unwrap() {
        ChannelMessage::TransportError(_) => {}
        other => panic!("expected transport error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_connect_refused() {
    // Bind and immediately drop to get a port nothing listens on
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let result = ChannelClient::open(&format!("ws://{addr}/ws/call/abc123")).await;
    assert!(result.is_err());
}
