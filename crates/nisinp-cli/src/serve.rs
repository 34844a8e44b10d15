//! # Daemon
//!
//! `nisinp serve` runs the sweep scheduler and the probe endpoint until
//! SIGINT/SIGTERM. Shutdown is one `watch` channel: the scheduler loops
//! and the HTTP server both stop when it turns true.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use tokio::net::TcpListener;
use tokio::sync::watch;

use nisinp_engine::Scheduler;

use crate::http::{self, ProbeState};
use crate::{config, runtime};

/// Serve subcommand arguments.
#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Configuration file.
    #[arg(long, short)]
    pub config: PathBuf,
}

/// Execute the serve subcommand.
pub async fn run_serve(args: &ServeArgs) -> Result<u8> {
    let app = config::load(&args.config)?;
    let repository = runtime::open_repository()
        .await
        .context("cannot open the incident repository")?;
    let ctx = runtime::build_context(&app, repository.clone())?;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        shutdown_signal().await;
        tracing::info!("shutdown requested");
        let _ = shutdown_tx.send(true);
    });

    let scheduler = Scheduler::from_config(&ctx, &app.scheduler);
    tracing::info!(sweeps = ?scheduler.names(), "starting scheduler");
    let scheduler = tokio::spawn(scheduler.run(shutdown_rx.clone()));

    let listener = TcpListener::bind(app.bind)
        .await
        .with_context(|| format!("cannot bind {}", app.bind))?;
    tracing::info!("probes listening on {}", app.bind);
    let probes = http::router(ProbeState {
        repository,
        metrics: ctx.metrics.clone(),
    });
    serve_until(listener, probes, shutdown_rx).await?;

    scheduler.await.context("scheduler task panicked")?;
    Ok(0)
}

/// Serve `app` on `listener` until `shutdown` turns true or its sender is
/// dropped.
pub async fn serve_until(
    listener: TcpListener,
    app: axum::Router,
    mut shutdown: watch::Receiver<bool>,
) -> std::io::Result<()> {
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            while !*shutdown.borrow() {
                if shutdown.changed().await.is_err() {
                    break;
                }
            }
        })
        .await
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("cannot listen for ctrl-c: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("cannot listen for SIGTERM: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    use nisinp_engine::SweepMetrics;
    use nisinp_store::MemoryRepository;

    #[tokio::test]
    async fn stops_on_shutdown_signal() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let app = http::router(ProbeState {
            repository: Arc::new(MemoryRepository::new()),
            metrics: SweepMetrics::new(),
        });
        let (tx, rx) = watch::channel(false);
        let server = tokio::spawn(serve_until(listener, app, rx));

        tx.send(true).unwrap();
        let result = tokio::time::timeout(Duration::from_secs(5), server)
            .await
            .expect("server stops")
            .unwrap();
        assert!(result.is_ok());
    }
}
