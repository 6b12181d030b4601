use anyhow::Context;
use clap::Parser;
use elif_ignitor::logging::{init_logging, LoggingConfig};
use elif_ignitor::Ignitor;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "elif-ignite")]
#[command(about = "Bootstrap an elif.rs application and start its HTTP server")]
#[command(version)]
struct Cli {
    /// Application root directory
    #[arg(default_value = ".")]
    app_root: PathBuf,

    /// Directory holding the entry module, relative to the app root
    #[arg(long)]
    start_dir: Option<PathBuf>,

    /// Log level
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Emit JSON logs
    #[arg(long)]
    json_logs: bool,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let logging = LoggingConfig::default()
        .with_level(cli.log_level.clone())
        .with_json(cli.json_logs);
    if let Err(e) = init_logging(&logging) {
        eprintln!("Failed to initialize logging: {}", e);
    }

    if let Err(error) = run(cli).await {
        tracing::error!("{:#}", error);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let app_root = cli
        .app_root
        .canonicalize()
        .with_context(|| format!("Application root {} is not accessible", cli.app_root.display()))?;

    let mut ignitor = Ignitor::new(app_root);
    if let Some(start_dir) = cli.start_dir {
        ignitor = ignitor.with_start_dir(start_dir);
    }

    let state = ignitor.fire_http_server(None).await?;
    if let Some(server) = state.into_server() {
        server.join().await.context("HTTP server stopped with an error")?;
    }

    Ok(())
}
