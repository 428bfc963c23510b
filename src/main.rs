//! Leak simulator entry point.
//!
//! Starts the leak generator, the sampler and the debug endpoint, then runs
//! until Ctrl-C. Exit code is 0 on graceful shutdown and nonzero on any
//! startup failure (bad config, port already bound).

use anyhow::{Context, Result};
use clap::Parser;
use leaksim::{AppContext, SimConfig, spawn_leak_generator, spawn_sampler};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Deliberately leak memory and watch it happen.
#[derive(Debug, Parser)]
#[command(name = "leaksim", version, about)]
struct Args {
    /// Milliseconds between leaked blocks
    #[arg(long, default_value_t = 5000)]
    leak_interval_ms: u64,

    /// Size of each leaked block in bytes
    #[arg(long, default_value_t = 1024 * 1024)]
    block_size: usize,

    /// Milliseconds between memory samples
    #[arg(long, default_value_t = 10_000)]
    sample_interval_ms: u64,

    /// Local port for the debug endpoint
    #[arg(long, default_value_t = 6060)]
    port: u16,
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let args = Args::parse();
    let config = SimConfig::new(
        Duration::from_millis(args.leak_interval_ms),
        args.block_size,
        Duration::from_millis(args.sample_interval_ms),
        args.port,
    )
    .context("invalid command line options")?;

    info!("memory leak simulator starting");
    info!(
        port = config.debug_port(),
        "debug endpoint: http://localhost:{}/debug/pprof/",
        config.debug_port()
    );

    let ctx = Arc::new(AppContext::new(config));

    let leak_handle = spawn_leak_generator(Arc::clone(&ctx));
    let sampler_handle = spawn_sampler(Arc::clone(&ctx));

    let server_ctx = Arc::clone(&ctx);
    let server = tokio::spawn(async move { leaksim::server::run_server(server_ctx).await });

    tokio::select! {
        _ = wait_for_shutdown() => {
            info!("shutdown signal received");
        }
        result = server => {
            // The server only returns on failure; surface it as a fatal
            // startup error with a nonzero exit.
            match result {
                Ok(Err(e)) => {
                    error!(error = %e, "debug server failed");
                    return Err(e).context("debug server failed");
                }
                Ok(Ok(())) => {}
                Err(e) => return Err(e).context("debug server task panicked"),
            }
        }
    }

    leak_handle.shutdown().await;
    sampler_handle.shutdown().await;

    info!(
        retained_blocks = ctx.retention().len(),
        retained_mb = ctx.retention().retained_bytes() / (1024 * 1024),
        samples = ctx.history().len(),
        "leak simulator stopped gracefully"
    );

    Ok(())
}

/// Initialize tracing subscriber with environment filter.
fn init_tracing() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Wait for Ctrl-C.
async fn wait_for_shutdown() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "failed to listen for shutdown signal");
        // Without a signal handler there is no graceful exit path; park
        // forever like the original demo's main loop.
        std::future::pending::<()>().await;
    }
}
