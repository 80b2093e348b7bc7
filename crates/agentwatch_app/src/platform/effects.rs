use std::sync::mpsc;
use std::thread;

use agentwatch_core::{
    Context, Effect, FinalAnalysis, Msg, Outbound, ReportKey, ReportRequest, Timer,
};
use agentwatch_engine::{EngineCommand, EngineEvent, EngineHandle, OutboundFrame, TimerKey};
use agentwatch_logging::{sync_debug, sync_warn};
use anyhow::Context as _;

use super::app::AppEvent;
use super::config::AppConfig;

/// Executes core effects on the engine and feeds engine events back as `Msg`.
pub struct EffectRunner {
    engine: EngineHandle,
    event_tx: mpsc::Sender<AppEvent>,
}

impl EffectRunner {
    pub fn new(config: &AppConfig, event_tx: mpsc::Sender<AppEvent>) -> anyhow::Result<Self> {
        let engine =
            EngineHandle::new(config.engine_settings()).context("failed to start the engine")?;
        let runner = Self { engine, event_tx };
        runner.spawn_event_loop()?;
        Ok(runner)
    }

    pub fn run(&self, effects: Vec<Effect>) {
        for effect in effects {
            sync_debug!("effect {:?}", effect);
            match map_effect(effect) {
                Ok(command) => self.engine.send(command),
                Err(msg) => {
                    let _ = self.event_tx.send(AppEvent::Core(msg));
                }
            }
        }
    }

    pub fn shutdown(&self) {
        self.engine.shutdown();
    }

    fn spawn_event_loop(&self) -> anyhow::Result<()> {
        let engine = self.engine.clone();
        let event_tx = self.event_tx.clone();
        thread::Builder::new()
            .name("agentwatch-events".to_string())
            .spawn(move || {
                while let Some(event) = engine.recv() {
                    let Some(msg) = map_event(event) else {
                        continue;
                    };
                    if event_tx.send(AppEvent::Core(msg)).is_err() {
                        break;
                    }
                }
            })
            .context("failed to spawn the event thread")?;
        Ok(())
    }
}

/// Effects the engine cannot execute come back as the `Msg` that reports the
/// failure.
fn map_effect(effect: Effect) -> Result<EngineCommand, Msg> {
    let command = match effect {
        Effect::OpenSocket { conn } => EngineCommand::OpenSocket { socket: conn },
        Effect::CloseSocket { conn } => EngineCommand::CloseSocket { socket: conn },
        Effect::SendFrame { conn, frame } => EngineCommand::SendFrame {
            socket: conn,
            frame: match frame {
                Outbound::Ping => OutboundFrame::Ping,
                Outbound::Pong => OutboundFrame::Pong,
            },
        },
        Effect::StartTimer { timer, after } => EngineCommand::StartTimer {
            key: map_timer(timer),
            after,
        },
        Effect::CancelTimer { timer } => EngineCommand::CancelTimer {
            key: map_timer(timer),
        },
        Effect::FetchReport(request) => EngineCommand::FetchReport {
            ticker: request.context.ticker,
            date: request.context.date,
            key: request.key.as_str().to_string(),
        },
        Effect::FetchFinalAnalysis(context) => EngineCommand::FetchFinalAnalysis {
            ticker: context.ticker,
            date: context.date,
        },
        Effect::StartAnalysis(request) => match serde_json::to_value(&request) {
            Ok(body) => EngineCommand::StartAnalysis { body },
            Err(err) => return Err(Msg::AnalysisRequestAnswered(Err(err.to_string()))),
        },
    };
    Ok(command)
}

fn map_event(event: EngineEvent) -> Option<Msg> {
    let msg = match event {
        EngineEvent::SocketOpened { socket } => Msg::SocketOpened { conn: socket },
        EngineEvent::FrameReceived { socket, text } => Msg::FrameReceived { conn: socket, text },
        EngineEvent::SocketClosed { socket, code } => Msg::SocketClosed { conn: socket, code },
        EngineEvent::SocketError { socket, message } => Msg::SocketError {
            conn: socket,
            message,
        },
        EngineEvent::TimerFired(key) => Msg::TimerFired(unmap_timer(key)),
        EngineEvent::ReportFetched {
            ticker,
            date,
            key,
            result,
        } => {
            let Some(key) = ReportKey::parse(&key) else {
                sync_warn!("engine returned unknown report key {:?}", key);
                return None;
            };
            Msg::ReportFetched {
                request: ReportRequest {
                    context: Context::new(ticker, date),
                    key,
                },
                result: result.map_err(|err| err.message),
            }
        }
        EngineEvent::FinalAnalysisFetched {
            ticker,
            date,
            result,
        } => Msg::FinalAnalysisFetched {
            context: Context::new(ticker, date),
            result: result
                .map(|body| FinalAnalysis {
                    final_analysis: body.final_analysis,
                    recommendation: body.recommendation,
                })
                .map_err(|err| err.message),
        },
        EngineEvent::AnalysisRequested(result) => {
            Msg::AnalysisRequestAnswered(result.map_err(|err| err.to_string()))
        }
    };
    Some(msg)
}

fn map_timer(timer: Timer) -> TimerKey {
    match timer {
        Timer::ConnectTimeout(conn) => TimerKey::ConnectTimeout(conn),
        Timer::Reconnect => TimerKey::Reconnect,
        Timer::Heartbeat => TimerKey::Heartbeat,
    }
}

fn unmap_timer(key: TimerKey) -> Timer {
    match key {
        TimerKey::ConnectTimeout(socket) => Timer::ConnectTimeout(socket),
        TimerKey::Reconnect => Timer::Reconnect,
        TimerKey::Heartbeat => Timer::Heartbeat,
    }
}
