mod cli;
mod constants;
mod format;
mod shutdown;
mod terminal;
mod ui;

use std::io::IsTerminal;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{Level, debug, warn};
use tracing_subscriber::{filter::EnvFilter, fmt, prelude::*};

use vidnotes_client_core::settings::{ClientSettings, load_settings, save_settings, settings_path};
use vidnotes_client_core::{AdoptionPolicy, JobId};
use vidnotes_client_engine::{
    EngineConfig, EngineController, EngineEvent, HttpJobBackend, JobBackend, RefreshMode,
    start_engine,
};

use crate::cli::{Cli, Command, Resolved, resolve};
use crate::format::{format_job_line, format_stable_url};
use crate::shutdown::{ShutdownController, ShutdownEvent, spawn_ctrl_c_handler};
use crate::terminal::{KeyAction, TuiTerminal};
use crate::ui::Ui;

fn init_logging(verbose: bool, tui: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        let default = if tui { Level::WARN } else { Level::INFO };
        EnvFilter::builder()
            .with_default_directive(default.into())
            .from_env_lossy()
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .init();
}

fn build_backend(resolved: &Resolved) -> anyhow::Result<HttpJobBackend> {
    HttpJobBackend::new(
        resolved.backend_url.clone(),
        resolved.token.clone(),
        HttpJobBackend::DEFAULT_TIMEOUT,
    )
}

async fn run_action(resolved: &Resolved, command: Command) -> anyhow::Result<()> {
    let backend = build_backend(resolved)?;
    match command {
        Command::Watch => anyhow::bail!("watch is not a one-shot action"),
        Command::Generate { id } => {
            backend
                .generate_summary(&JobId::new(id.clone()))
                .await
                .with_context(|| format!("generate summary for {id}"))?;
            println!("Summary generation queued for {id}.");
        }
        Command::Transcript { id, file } => {
            let text = std::fs::read_to_string(&file)
                .with_context(|| format!("read transcript {}", file.display()))?;
            if text.trim().is_empty() {
                anyhow::bail!("transcript file {} is empty", file.display());
            }
            backend
                .save_transcript(&JobId::new(id.clone()), &text)
                .await
                .with_context(|| format!("save transcript for {id}"))?;
            println!("Transcript saved for {id}.");
        }
        Command::Delete { id } => {
            backend
                .delete_job(&JobId::new(id.clone()))
                .await
                .with_context(|| format!("delete job {id}"))?;
            println!("Deleted {id}.");
        }
        Command::SaveNote { id } => {
            let note = backend
                .save_as_note(&JobId::new(id.clone()))
                .await
                .with_context(|| format!("save {id} as a note"))?;
            println!("Saved \"{}\" as note {}.", note.title, note.note_id);
        }
    }
    Ok(())
}

fn print_plain(ctl: &EngineController) {
    let snap = ctl.snapshot();
    for (idx, job) in snap.jobs.iter().enumerate() {
        let selected = snap.selected.as_ref() == Some(&job.id);
        println!("{}", format_job_line(idx, job, selected));
    }
}

fn handle_key(
    ctl: &EngineController,
    ui: Option<&mut Ui>,
    notice_tx: &UnboundedSender<String>,
    action: KeyAction,
) -> bool {
    match action {
        KeyAction::Select(row) => {
            let jobs = ctl.jobs();
            match jobs.get(row) {
                Some(job) => ctl.select(Some(job.id.clone())),
                None => debug!(row, "no job at selection key"),
            }
        }
        KeyAction::ClearSelection => ctl.select(None),
        KeyAction::Refresh => ctl.refresh(RefreshMode::Foreground),
        KeyAction::GenerateSelected => {
            let Some(id) = ctl.selected() else {
                if let Some(ui) = ui {
                    ui.set_notice("Select a video job first.");
                }
                return true;
            };
            let ctl = ctl.clone();
            let notice_tx = notice_tx.clone();
            tokio::spawn(async move {
                let notice = match ctl.generate_summary(&id).await {
                    Ok(()) => format!("Summary generation started for {id}."),
                    Err(err) => {
                        warn!("generate summary for {id} failed: {err}");
                        format!("Summary generation failed for {id}: {err}")
                    }
                };
                let _ = notice_tx.send(notice);
            });
        }
        KeyAction::Quit => return false,
    }
    true
}

async fn run_watch(cli: &Cli, resolved: &Resolved) -> anyhow::Result<()> {
    let tui_enabled = !cli.no_tui && std::io::stdout().is_terminal();
    let backend: Arc<dyn JobBackend> = Arc::new(build_backend(resolved)?);

    let engine = start_engine(
        EngineConfig {
            poll_interval: resolved.interval,
            poll_on_start: true,
            adoption: if cli.hold_url {
                AdoptionPolicy::HoldUntilReselect
            } else {
                AdoptionPolicy::ReadoptOnResourceChange
            },
        },
        backend,
    );
    let ctl = engine.controller();
    let mut events = engine.subscribe();
    let mut snapshots = ctl.watch();
    let (notice_tx, mut notice_rx) = tokio::sync::mpsc::unbounded_channel::<String>();
    if let Some(id) = &cli.select {
        ctl.select(Some(JobId::new(id.clone())));
    }

    let shutdown = Arc::new(ShutdownController::new());
    let (shutdown_tx, mut shutdown_rx) = tokio::sync::mpsc::unbounded_channel::<ShutdownEvent>();
    let (key_tx, mut key_rx) = tokio::sync::mpsc::unbounded_channel::<KeyAction>();
    let tui_terminal = if tui_enabled && std::io::stdin().is_terminal() {
        Some(TuiTerminal::enter(shutdown.clone(), shutdown_tx.clone(), key_tx)?)
    } else {
        drop(key_tx);
        None
    };
    if tui_terminal.is_none() {
        spawn_ctrl_c_handler(shutdown.clone(), shutdown_tx);
    }

    let startup = format!(
        "vidnotes {} backend={} interval={}ms",
        env!("CARGO_PKG_VERSION"),
        resolved.backend_url,
        resolved.interval.as_millis()
    );
    let mut ui = if tui_enabled { Some(Ui::new()) } else { None };
    if let Some(ui) = &ui {
        ui.println(&startup);
    } else {
        println!("{startup}");
    }

    let mut immediate_exit = false;

    loop {
        tokio::select! {
            ev_opt = shutdown_rx.recv() => {
                match ev_opt {
                    Some(ShutdownEvent::Graceful) => break,
                    Some(ShutdownEvent::Immediate) => {
                        immediate_exit = true;
                        break;
                    }
                    None => {}
                }
            }
            action = key_rx.recv(), if tui_terminal.is_some() => {
                let Some(action) = action else { continue };
                if !handle_key(&ctl, ui.as_mut(), &notice_tx, action) {
                    break;
                }
            }
            Some(notice) = notice_rx.recv() => {
                if let Some(ui) = &mut ui {
                    ui.set_notice(notice);
                } else {
                    println!("{notice}");
                }
            }
            changed = snapshots.changed(), if ui.is_some() => {
                if changed.is_err() {
                    break;
                }
                let snap = snapshots.borrow_and_update().clone();
                if let Some(ui) = &mut ui {
                    ui.render(&snap);
                }
            }
            evt = events.recv() => {
                let evt = match evt {
                    Ok(v) => v,
                    Err(tokio::sync::broadcast::error::RecvError::Lagged(_)) => continue,
                    Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
                };

                match evt {
                    EngineEvent::Started | EngineEvent::SelectionChanged { .. } => {}
                    EngineEvent::JobsUpdated { .. } => {
                        if ui.is_none() {
                            print_plain(&ctl);
                        }
                    }
                    EngineEvent::StableUrlChanged { url } => {
                        let line = format_stable_url(url.as_deref());
                        if let Some(ui) = &ui {
                            ui.println(&line);
                        } else {
                            println!("{line}");
                        }
                    }
                    EngineEvent::Error { message } => {
                        if ui.is_none() {
                            eprintln!("{message}");
                        }
                    }
                    EngineEvent::ErrorCleared => {
                        if ui.is_none() {
                            eprintln!("Jobs loaded again.");
                        }
                    }
                    EngineEvent::Stopped => break,
                }
            }
        }
    }

    if let Some(ui) = &ui {
        ui.freeze();
    }

    if immediate_exit {
        drop(tui_terminal);
        std::process::exit(130);
    }

    drop(tui_terminal);
    engine.shutdown();
    tokio::time::timeout(Duration::from_secs(5), engine.wait())
        .await
        .context("engine did not stop in time")??;
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let command = cli.command.clone().unwrap_or(Command::Watch);
    let tui = command == Command::Watch && !cli.no_tui && std::io::stdout().is_terminal();
    init_logging(cli.verbose, tui);

    let file_settings = match load_settings() {
        Ok(Some(settings)) => settings,
        Ok(None) => ClientSettings::default(),
        Err(err) => {
            warn!("failed to read config file (using defaults): {err:#}");
            ClientSettings::default()
        }
    };
    let resolved = resolve(&cli, &file_settings)?;

    if cli.save_config {
        save_settings(&resolved.to_settings())?;
        println!("Saved settings to {}.", settings_path()?.display());
    }

    match command {
        Command::Watch => run_watch(&cli, &resolved).await,
        action => run_action(&resolved, action).await,
    }
}
