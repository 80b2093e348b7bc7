use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::mpsc;
use std::thread;

use agentwatch_core::{update, AppState, Msg};
use agentwatch_logging::{sync_info, sync_warn};
use anyhow::Context as _;

use super::config::AppConfig;
use super::effects::EffectRunner;
use super::logging;
use super::ui::{commands, render};

/// Everything the dispatch loop reacts to.
#[derive(Debug)]
pub enum AppEvent {
    Core(Msg),
    Show,
    Quit,
}

pub fn run_app(config_path: Option<PathBuf>) -> anyhow::Result<()> {
    let config = AppConfig::load(config_path.as_deref()).context("failed to load configuration")?;
    logging::initialize(config.log_destination, config.log_level_filter()?);
    sync_info!("agentwatch starting against {}", config.server_url);

    let (event_tx, event_rx) = mpsc::channel::<AppEvent>();
    let runner = EffectRunner::new(&config, event_tx.clone())?;
    spawn_input_reader(event_tx.clone())?;

    let mut state = AppState::with_settings(config.connection_settings(), config.analysis_form());
    println!("{}", commands::HELP);
    let _ = event_tx.send(AppEvent::Core(Msg::Connect));

    // Single dispatch loop: every state transition happens on this thread.
    while let Ok(event) = event_rx.recv() {
        match event {
            AppEvent::Core(msg) => {
                let (next, effects) = update(state, msg);
                state = next;
                runner.run(effects);
                present(&mut state);
            }
            AppEvent::Show => print_lines(&render::render(&state.view())),
            AppEvent::Quit => break,
        }
    }

    let (_, effects) = update(state, Msg::Disconnect);
    runner.run(effects);
    runner.shutdown();
    sync_info!("agentwatch stopped");
    Ok(())
}

/// Drains notifications and status changes, then redraws when dirty.
fn present(state: &mut AppState) {
    for change in state.take_status_changes() {
        sync_info!(
            "status change: {} -> {} (available: {})",
            change.agent,
            change.status,
            change.available
        );
    }
    for notice in state.take_notices() {
        println!("{}", render::notice_line(&notice));
    }
    if state.consume_dirty() {
        print_lines(&render::render(&state.view()));
    }
}

fn print_lines(lines: &[String]) {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    for line in lines {
        let _ = writeln!(out, "{line}");
    }
    let _ = out.flush();
}

fn spawn_input_reader(event_tx: mpsc::Sender<AppEvent>) -> anyhow::Result<()> {
    thread::Builder::new()
        .name("agentwatch-input".to_string())
        .spawn(move || {
            for line in io::stdin().lock().lines() {
                let Ok(line) = line else {
                    break;
                };
                let event = match commands::parse(&line) {
                    Ok(None) => continue,
                    Ok(Some(commands::Command::Help)) => {
                        println!("{}", commands::HELP);
                        continue;
                    }
                    Ok(Some(commands::Command::Show)) => AppEvent::Show,
                    Ok(Some(commands::Command::Quit)) => AppEvent::Quit,
                    Ok(Some(commands::Command::Core(msg))) => AppEvent::Core(msg),
                    Err(err) => {
                        println!("{err}");
                        continue;
                    }
                };
                if event_tx.send(event).is_err() {
                    return;
                }
            }
            sync_warn!("stdin closed; shutting down");
            let _ = event_tx.send(AppEvent::Quit);
        })
        .context("failed to spawn the input thread")?;
    Ok(())
}
