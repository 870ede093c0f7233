use anyhow::{Context, Result};
use clap::Parser;
use lurker_common::observability::{LogConfig, LogFormat, init_logging};
use lurker_config::{LurkerConfig, LurkerConfigLoader};
use std::net::SocketAddr;
use std::path::PathBuf;

mod server;
mod sync;
mod tether;
#[cfg(test)]
mod test_support;

/// Caches a public account's recent posts and serves them by id.
#[derive(Debug, Parser)]
#[command(name = "lurker", version)]
struct Args {
    /// YAML config file; skipped when missing.
    #[arg(short, long, env = "LURKER_CONFIG", default_value = "lurker.yaml")]
    config: PathBuf,
    /// Listen port, overriding `server.port`.
    #[arg(short, long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // env wins over the file
    let cfg: LurkerConfig = LurkerConfigLoader::new()
        .with_optional_file(&args.config)
        .load()
        .with_context(|| format!("failed to load config from {}", args.config.display()))?;

    let log_path = init_logging(LogConfig {
        app_name: "lurker",
        log_dir: cfg.logging.dir.as_ref().map(PathBuf::from),
        emit_stderr: cfg.logging.stderr,
        format: LogFormat::parse(&cfg.logging.format),
        default_filter: cfg.logging.filter.clone(),
    })?;
    tracing::info!(log_path = %log_path.display(), config = %args.config.display(), "lurker.start");

    let state = tether::build_from_config(&cfg)?;
    tokio::spawn(sync::refresh_logged(state.clone()));

    let port = args.port.unwrap_or(cfg.server.port);
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    tracing::info!(%addr, "lurker.listening");

    axum::serve(listener, server::router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("lurker.stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %err, "ctrl_c handler failed");
    }
}
