use std::collections::HashMap;
use std::sync::{mpsc, Arc, Mutex};
use std::thread;
use std::time::Duration;

use agentwatch_logging::{sync_debug, sync_info, sync_warn};
use thiserror::Error;
use tokio::runtime::{Handle, Runtime};
use tokio::sync::mpsc as tokio_mpsc;

use crate::api::{ApiClient, ReqwestApiClient};
use crate::sink::{ChannelEventSink, EventSink};
use crate::socket::{run_socket, SocketCommand};
use crate::timers::Timers;
use crate::{EngineEvent, EngineSettings, FetchError, OutboundFrame, SocketId, TimerKey};

const SHUTDOWN_GRACE: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, PartialEq)]
pub enum EngineCommand {
    OpenSocket {
        socket: SocketId,
    },
    CloseSocket {
        socket: SocketId,
    },
    SendFrame {
        socket: SocketId,
        frame: OutboundFrame,
    },
    StartTimer {
        key: TimerKey,
        after: Duration,
    },
    CancelTimer {
        key: TimerKey,
    },
    FetchReport {
        ticker: String,
        date: String,
        key: String,
    },
    FetchFinalAnalysis {
        ticker: String,
        date: String,
    },
    StartAnalysis {
        body: serde_json::Value,
    },
    Shutdown,
}

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("failed to start engine runtime: {0}")]
    Runtime(#[from] std::io::Error),
    #[error("failed to build http client: {0}")]
    Client(#[from] FetchError),
}

/// Owns a tokio runtime on a background thread. Commands go in over one
/// channel and every observation comes back as an `EngineEvent`.
#[derive(Clone)]
pub struct EngineHandle {
    cmd_tx: mpsc::Sender<EngineCommand>,
    event_rx: Arc<Mutex<mpsc::Receiver<EngineEvent>>>,
}

impl EngineHandle {
    pub fn new(settings: EngineSettings) -> Result<Self, EngineError> {
        let api = Arc::new(ReqwestApiClient::new(settings.clone())?);
        Self::with_api(settings, api)
    }

    /// Same as `new` with a caller-provided HTTP client.
    pub fn with_api(
        settings: EngineSettings,
        api: Arc<dyn ApiClient>,
    ) -> Result<Self, EngineError> {
        let (cmd_tx, cmd_rx) = mpsc::channel();
        let (event_tx, event_rx) = mpsc::channel();
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .thread_name("agentwatch-io")
            .build()?;

        let worker = Worker {
            settings,
            api,
            sink: Arc::new(ChannelEventSink::new(event_tx)),
            sockets: HashMap::new(),
            timers: Timers::default(),
        };
        thread::Builder::new()
            .name("agentwatch-engine".to_string())
            .spawn(move || worker.run(runtime, cmd_rx))?;

        Ok(Self {
            cmd_tx,
            event_rx: Arc::new(Mutex::new(event_rx)),
        })
    }

    pub fn send(&self, command: EngineCommand) {
        if self.cmd_tx.send(command).is_err() {
            sync_warn!("engine stopped; command dropped");
        }
    }

    pub fn try_recv(&self) -> Option<EngineEvent> {
        self.event_rx.lock().ok()?.try_recv().ok()
    }

    /// Blocks for the next event. `None` once the engine has stopped.
    pub fn recv(&self) -> Option<EngineEvent> {
        self.event_rx.lock().ok()?.recv().ok()
    }

    /// Waits up to `timeout` for the next event.
    pub fn recv_timeout(&self, timeout: Duration) -> Option<EngineEvent> {
        self.event_rx.lock().ok()?.recv_timeout(timeout).ok()
    }

    pub fn shutdown(&self) {
        let _ = self.cmd_tx.send(EngineCommand::Shutdown);
    }
}

struct Worker {
    settings: EngineSettings,
    api: Arc<dyn ApiClient>,
    sink: Arc<dyn EventSink>,
    sockets: HashMap<SocketId, tokio_mpsc::UnboundedSender<SocketCommand>>,
    timers: Timers,
}

impl Worker {
    fn run(mut self, runtime: Runtime, cmd_rx: mpsc::Receiver<EngineCommand>) {
        sync_info!("engine started for {}", self.settings.server_url);
        while let Ok(command) = cmd_rx.recv() {
            if command == EngineCommand::Shutdown {
                break;
            }
            self.handle(runtime.handle(), command);
        }

        self.timers.cancel_all();
        for (_, socket) in self.sockets.drain() {
            let _ = socket.send(SocketCommand::Close);
        }
        runtime.shutdown_timeout(SHUTDOWN_GRACE);
        sync_info!("engine stopped");
    }

    fn handle(&mut self, runtime: &Handle, command: EngineCommand) {
        self.sockets.retain(|_, socket| !socket.is_closed());
        match command {
            EngineCommand::OpenSocket { socket } => self.open_socket(runtime, socket),
            EngineCommand::CloseSocket { socket } => match self.sockets.remove(&socket) {
                Some(commands) => {
                    let _ = commands.send(SocketCommand::Close);
                }
                None => sync_debug!("close for finished socket #{} ignored", socket),
            },
            EngineCommand::SendFrame { socket, frame } => {
                let text = frame.to_json(&(self.settings.timestamp)());
                let delivered = self
                    .sockets
                    .get(&socket)
                    .is_some_and(|commands| commands.send(SocketCommand::Send(text)).is_ok());
                if !delivered {
                    sync_warn!("socket #{} gone; {:?} dropped", socket, frame);
                }
            }
            EngineCommand::StartTimer { key, after } => {
                self.timers.start(runtime, key, after, self.sink.clone());
            }
            EngineCommand::CancelTimer { key } => {
                self.timers.cancel(key);
            }
            EngineCommand::FetchReport { ticker, date, key } => {
                let api = self.api.clone();
                let sink = self.sink.clone();
                runtime.spawn(async move {
                    let result = api.fetch_report(&ticker, &date, &key).await;
                    sink.emit(EngineEvent::ReportFetched {
                        ticker,
                        date,
                        key,
                        result,
                    });
                });
            }
            EngineCommand::FetchFinalAnalysis { ticker, date } => {
                let api = self.api.clone();
                let sink = self.sink.clone();
                runtime.spawn(async move {
                    let result = api.fetch_final_analysis(&ticker, &date).await;
                    sink.emit(EngineEvent::FinalAnalysisFetched {
                        ticker,
                        date,
                        result,
                    });
                });
            }
            EngineCommand::StartAnalysis { body } => {
                let api = self.api.clone();
                let sink = self.sink.clone();
                runtime.spawn(async move {
                    let result = api.start_analysis(&body).await;
                    sink.emit(EngineEvent::AnalysisRequested(result));
                });
            }
            EngineCommand::Shutdown => {}
        }
    }

    fn open_socket(&mut self, runtime: &Handle, socket: SocketId) {
        let url = match self.settings.websocket_url() {
            Ok(url) => url,
            Err(err) => {
                self.sink.emit(EngineEvent::SocketError {
                    socket,
                    message: err.to_string(),
                });
                self.sink.emit(EngineEvent::SocketClosed { socket, code: None });
                return;
            }
        };
        let (commands_tx, commands_rx) = tokio_mpsc::unbounded_channel();
        self.sockets.insert(socket, commands_tx);
        runtime.spawn(run_socket(
            socket,
            url.to_string(),
            commands_rx,
            self.sink.clone(),
        ));
    }
}
