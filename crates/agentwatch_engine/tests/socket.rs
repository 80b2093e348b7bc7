use std::sync::Arc;
use std::time::Duration;

use agentwatch_engine::{run_socket, EngineEvent, EventSink, SocketCommand};
use futures_util::{SinkExt, StreamExt};
use pretty_assertions::assert_eq;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::Message;

struct TestSink {
    tx: mpsc::UnboundedSender<EngineEvent>,
}

impl EventSink for TestSink {
    fn emit(&self, event: EngineEvent) {
        let _ = self.tx.send(event);
    }
}

fn sink() -> (Arc<dyn EventSink>, mpsc::UnboundedReceiver<EngineEvent>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (Arc::new(TestSink { tx }), rx)
}

async fn next_event(rx: &mut mpsc::UnboundedReceiver<EngineEvent>) -> EngineEvent {
    tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .expect("event in time")
        .expect("sink open")
}

async fn listen() -> (TcpListener, String) {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    (listener, format!("ws://{addr}/ws"))
}

#[tokio::test]
async fn frames_flow_both_ways_until_server_closes() {
    let (listener, url) = listen().await;
    let server = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.expect("accept");
        let mut ws = tokio_tungstenite::accept_async(stream).await.expect("handshake");
        ws.send(Message::Text(
            r#"{"type":"connection_established","message":"WebSocket connected successfully"}"#
                .to_string(),
        ))
        .await
        .expect("greet");

        let received = match ws.next().await {
            Some(Ok(Message::Text(text))) => text,
            other => panic!("expected text frame, got {other:?}"),
        };
        ws.send(Message::Text(
            r#"{"type":"server_shutdown","message":"Server is shutting down"}"#.to_string(),
        ))
        .await
        .expect("shutdown notice");
        ws.close(Some(CloseFrame {
            code: CloseCode::Away,
            reason: "Server shutdown".into(),
        }))
        .await
        .expect("close");
        received
    });

    let (sink, mut events) = sink();
    let (commands, commands_rx) = mpsc::unbounded_channel();
    let client = tokio::spawn(run_socket(4, url, commands_rx, sink));

    assert_eq!(next_event(&mut events).await, EngineEvent::SocketOpened { socket: 4 });
    match next_event(&mut events).await {
        EngineEvent::FrameReceived { socket, text } => {
            assert_eq!(socket, 4);
            assert!(text.contains("connection_established"));
        }
        other => panic!("expected frame, got {other:?}"),
    }

    commands
        .send(SocketCommand::Send(r#"{"type":"ping","timestamp":"t"}"#.into()))
        .expect("send");
    assert_eq!(
        server.await.expect("server task"),
        r#"{"type":"ping","timestamp":"t"}"#
    );

    match next_event(&mut events).await {
        EngineEvent::FrameReceived { text, .. } => assert!(text.contains("server_shutdown")),
        other => panic!("expected frame, got {other:?}"),
    }
    assert_eq!(
        next_event(&mut events).await,
        EngineEvent::SocketClosed {
            socket: 4,
            code: Some(1001),
        }
    );
    client.await.expect("client task");
}

#[tokio::test]
async fn client_close_reports_no_server_code() {
    let (listener, url) = listen().await;
    let server = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.expect("accept");
        let mut ws = tokio_tungstenite::accept_async(stream).await.expect("handshake");
        while let Some(Ok(message)) = ws.next().await {
            if let Message::Close(frame) = message {
                return frame.map(|frame| u16::from(frame.code));
            }
        }
        None
    });

    let (sink, mut events) = sink();
    let (commands, commands_rx) = mpsc::unbounded_channel();
    let client = tokio::spawn(run_socket(1, url, commands_rx, sink));
    assert_eq!(next_event(&mut events).await, EngineEvent::SocketOpened { socket: 1 });

    commands.send(SocketCommand::Close).expect("close");
    assert_eq!(
        next_event(&mut events).await,
        EngineEvent::SocketClosed {
            socket: 1,
            code: None,
        }
    );
    assert_eq!(server.await.expect("server task"), Some(1000));
    client.await.expect("client task");
}

#[tokio::test]
async fn refused_connection_reports_error_then_close() {
    let (listener, url) = listen().await;
    drop(listener);

    let (sink, mut events) = sink();
    let (_commands, commands_rx) = mpsc::unbounded_channel();
    run_socket(2, url, commands_rx, sink).await;

    assert!(matches!(
        next_event(&mut events).await,
        EngineEvent::SocketError { socket: 2, .. }
    ));
    assert_eq!(
        next_event(&mut events).await,
        EngineEvent::SocketClosed {
            socket: 2,
            code: None,
        }
    );
    assert!(events.try_recv().is_err());
}

#[tokio::test]
async fn close_before_handshake_abandons_attempt() {
    // Accepts TCP but never answers the upgrade.
    let (listener, url) = listen().await;
    let _server = tokio::spawn(async move {
        let (_stream, _) = listener.accept().await.expect("accept");
        tokio::time::sleep(Duration::from_secs(10)).await;
    });

    let (sink, mut events) = sink();
    let (commands, commands_rx) = mpsc::unbounded_channel();
    let client = tokio::spawn(run_socket(3, url, commands_rx, sink));
    tokio::time::sleep(Duration::from_millis(50)).await;
    commands.send(SocketCommand::Close).expect("close");

    assert_eq!(
        next_event(&mut events).await,
        EngineEvent::SocketClosed {
            socket: 3,
            code: None,
        }
    );
    client.await.expect("client task");
}
