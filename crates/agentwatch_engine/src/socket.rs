use std::sync::Arc;
use std::time::Duration;

use agentwatch_logging::{sync_debug, sync_info, sync_trace, sync_warn};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::Message;

use crate::{EngineEvent, EventSink, SocketId};

/// How long a client-initiated close waits for the server's close reply.
const CLOSE_GRACE: Duration = Duration::from_secs(2);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SocketCommand {
    Send(String),
    Close,
}

/// Drives one connection attempt from handshake to close.
///
/// Exactly one `SocketClosed` is emitted per call, always last. `SocketOpened`
/// is emitted only after a completed handshake. Dropping the command sender
/// counts as `Close`.
pub async fn run_socket(
    socket: SocketId,
    url: String,
    mut commands: mpsc::UnboundedReceiver<SocketCommand>,
    sink: Arc<dyn EventSink>,
) {
    sync_debug!("socket #{} connecting to {}", socket, url);
    let connect = tokio_tungstenite::connect_async(url.as_str());
    tokio::pin!(connect);

    let stream = loop {
        tokio::select! {
            result = &mut connect => match result {
                Ok((stream, _response)) => break stream,
                Err(err) => {
                    sync_warn!("socket #{} handshake failed: {}", socket, err);
                    sink.emit(EngineEvent::SocketError {
                        socket,
                        message: err.to_string(),
                    });
                    sink.emit(EngineEvent::SocketClosed { socket, code: None });
                    return;
                }
            },
            command = commands.recv() => match command {
                Some(SocketCommand::Send(_)) => {
                    sync_warn!("socket #{} not open yet; dropping frame", socket);
                }
                Some(SocketCommand::Close) | None => {
                    sync_debug!("socket #{} abandoned before handshake", socket);
                    sink.emit(EngineEvent::SocketClosed { socket, code: None });
                    return;
                }
            },
        }
    };

    sync_info!("socket #{} open", socket);
    sink.emit(EngineEvent::SocketOpened { socket });
    let (mut write, mut read) = stream.split();

    loop {
        tokio::select! {
            command = commands.recv() => match command {
                Some(SocketCommand::Send(text)) => {
                    sync_trace!("socket #{} -> {}", socket, text);
                    if let Err(err) = write.send(Message::Text(text)).await {
                        sink.emit(EngineEvent::SocketError {
                            socket,
                            message: err.to_string(),
                        });
                        sink.emit(EngineEvent::SocketClosed { socket, code: None });
                        return;
                    }
                }
                Some(SocketCommand::Close) | None => {
                    let close = CloseFrame {
                        code: CloseCode::Normal,
                        reason: "client closing".into(),
                    };
                    let _ = write.send(Message::Close(Some(close))).await;
                    let reply = tokio::time::timeout(CLOSE_GRACE, async {
                        while let Some(Ok(message)) = read.next().await {
                            if let Message::Close(frame) = message {
                                return frame.map(|frame| u16::from(frame.code));
                            }
                        }
                        None
                    })
                    .await;
                    // The echoed code only acknowledges our own close.
                    sync_info!(
                        "socket #{} closed by client (peer replied {:?})",
                        socket,
                        reply.ok().flatten()
                    );
                    sink.emit(EngineEvent::SocketClosed { socket, code: None });
                    return;
                }
            },
            frame = read.next() => match frame {
                Some(Ok(Message::Text(text))) => {
                    sync_trace!("socket #{} <- {}", socket, text);
                    sink.emit(EngineEvent::FrameReceived { socket, text });
                }
                Some(Ok(Message::Close(frame))) => {
                    let code = frame.map(|frame| u16::from(frame.code));
                    sync_info!("socket #{} closed by server (code {:?})", socket, code);
                    let _ = write.close().await;
                    sink.emit(EngineEvent::SocketClosed { socket, code });
                    return;
                }
                Some(Ok(Message::Binary(bytes))) => {
                    sync_debug!("socket #{} ignoring {} byte binary frame", socket, bytes.len());
                }
                Some(Ok(_)) => {}
                Some(Err(err)) => {
                    sync_warn!("socket #{} read failed: {}", socket, err);
                    sink.emit(EngineEvent::SocketError {
                        socket,
                        message: err.to_string(),
                    });
                    sink.emit(EngineEvent::SocketClosed { socket, code: None });
                    return;
                }
                None => {
                    sink.emit(EngineEvent::SocketClosed { socket, code: None });
                    return;
                }
            },
        }
    }
}
