// src/lib.rs

pub mod api;
pub mod cli;
pub mod compiler;
pub mod config;
pub mod dag;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod logging;
pub mod registry;

use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::{debug, info};

use crate::cli::{CliArgs, Command};
use crate::compiler::compile;
use crate::config::loader::load_and_validate;
use crate::config::model::ConfigFile;
use crate::engine::{DispatchSettings, Dispatcher, spawn_lease_sweeper};
use crate::errors::CalcdagError;
use crate::exec::{
    HttpOrchestratorClient, LocalOrchestratorClient, OrchestratorClient, WorkerSettings,
    spawn_agent,
};

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config loading
/// - dispatcher + lease sweeper + HTTP API (`serve`)
/// - worker pool (`agent`, or `serve --local-workers`)
/// - Ctrl-C handling
pub async fn run(args: CliArgs) -> Result<()> {
    let cfg = load_and_validate(args.config.as_deref().map(Path::new))?;

    match args.command {
        Command::Serve {
            bind,
            local_workers,
        } => serve(cfg, bind, local_workers).await,
        Command::Agent {
            orchestrator,
            computing_power,
        } => agent(cfg, orchestrator, computing_power).await,
        Command::Check { expression } => check(&expression),
    }
}

async fn serve(cfg: ConfigFile, bind: Option<SocketAddr>, local_workers: usize) -> Result<()> {
    let dispatcher = Arc::new(Dispatcher::new(DispatchSettings::from_config(&cfg)));
    let shutdown = shutdown_on_ctrl_c();

    let sweeper = spawn_lease_sweeper(
        Arc::clone(&dispatcher),
        cfg.orchestrator.sweep_interval,
        shutdown.clone(),
    );

    let workers = if local_workers > 0 {
        let client: Arc<dyn OrchestratorClient> =
            Arc::new(LocalOrchestratorClient::new(Arc::clone(&dispatcher)));
        spawn_agent(
            client,
            local_workers,
            WorkerSettings::from_config(&cfg.agent),
            shutdown.clone(),
        )
    } else {
        Vec::new()
    };

    let addr = bind.unwrap_or(cfg.orchestrator.bind);
    let listener = TcpListener::bind(addr).await?;
    api::serve(listener, dispatcher, wait_for_shutdown(shutdown)).await?;

    sweeper.await?;
    for worker in workers {
        worker.await?;
    }
    info!("orchestrator stopped");
    Ok(())
}

async fn agent(
    cfg: ConfigFile,
    orchestrator: Option<String>,
    computing_power: Option<usize>,
) -> Result<()> {
    let url = orchestrator.unwrap_or_else(|| cfg.agent.orchestrator_url.clone());
    let computing_power = computing_power.unwrap_or(cfg.agent.computing_power);
    if computing_power == 0 {
        anyhow::bail!("computing power must be >= 1");
    }

    info!(%url, computing_power, "agent connecting to orchestrator");
    let client: Arc<dyn OrchestratorClient> = Arc::new(HttpOrchestratorClient::new(&url));
    let workers = spawn_agent(
        client,
        computing_power,
        WorkerSettings::from_config(&cfg.agent),
        shutdown_on_ctrl_c(),
    );

    for worker in workers {
        worker.await?;
    }
    info!("agent stopped");
    Ok(())
}

/// Dry run: print the compiled task graph without executing anything.
fn check(expression: &str) -> Result<()> {
    let compiled = compile(expression).map_err(CalcdagError::from)?;

    println!("calcdag check");
    println!("  expression = {expression}");
    println!("  tasks = {}", compiled.task_count());
    println!();
    println!("{compiled}");

    debug!("check complete (no execution)");
    Ok(())
}

/// Ctrl-C flips the returned channel to `true`.
fn shutdown_on_ctrl_c() -> watch::Receiver<bool> {
    let (tx, rx) = watch::channel(false);
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("shutdown requested");
                let _ = tx.send(true);
            }
            Err(e) => eprintln!("failed to listen for Ctrl+C: {e}"),
        }
        // A dropped sender also reads as shutdown, so hold it until every
        // receiver is gone.
        tx.closed().await;
    });
    rx
}

async fn wait_for_shutdown(mut shutdown: watch::Receiver<bool>) {
    let _ = shutdown.wait_for(|stop| *stop).await;
}
