//! tvrpc - HbbTV terminal control plane
//!
//! Serves the terminal's JSON-RPC endpoint over WebSocket.
//!
//! **Default** (no subcommand, or `tvrpc serve`): loads the config file,
//! applies command-line overrides and serves until Ctrl+C.
//!
//! **`tvrpc init-config`**: writes a config file with every default spelled
//! out.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context};
use clap::{Args, Parser as ClapParser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use tvrpc::{
    app::{host::ApplicationHost, LoggingApplicationCallback},
    config::{self, Config},
    rpc::{JsonRpcService, LoggingSessionCallback, ServiceConfig},
    server::{self, AppState, WsSinks},
};

/// tvrpc - HbbTV terminal control plane
#[derive(ClapParser, Debug)]
#[command(name = "tvrpc", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    #[command(flatten)]
    serve: ServeArgs,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Serve the JSON-RPC endpoint (the default)
    Serve(ServeArgs),

    /// Write a config file populated with the defaults
    InitConfig {
        /// Where to write (defaults to the user config dir)
        #[arg(long)]
        path: Option<PathBuf>,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

#[derive(Args, Debug, Default)]
struct ServeArgs {
    /// Config file (defaults to <config dir>/tvrpc/config.toml)
    #[arg(long, env = "TVRPC_CONFIG")]
    config: Option<PathBuf>,

    /// Address to bind the WebSocket server
    #[arg(long, env = "TVRPC_BIND")]
    bind: Option<String>,

    /// Path applications connect on
    #[arg(long, env = "TVRPC_ENDPOINT")]
    endpoint: Option<String>,

    /// Path operator applications connect on
    #[arg(long, env = "TVRPC_OPAPP_ENDPOINT")]
    opapp_endpoint: Option<String>,

    /// Default log filter when RUST_LOG is unset
    #[arg(long, env = "TVRPC_LOG")]
    log_level: Option<String>,

    /// Only send intents to voice-ready connections (true or false)
    #[arg(long, env = "TVRPC_REQUIRE_VOICE_READY")]
    require_voice_ready: Option<bool>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Serve(args)) => run_serve(args).await,
        Some(Commands::InitConfig { path, force }) => init_config(path, force),
        None => run_serve(cli.serve).await,
    }
}

fn init_tracing(default_filter: &str) {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| default_filter.to_string()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn load_config(args: &ServeArgs) -> anyhow::Result<Config> {
    let path = args.config.clone().or_else(config::default_path);
    let mut config = match &path {
        Some(path) => Config::load(path)?.unwrap_or_default(),
        None => Config::default(),
    };

    if let Some(bind) = &args.bind {
        config.bind = bind.clone();
    }
    if let Some(endpoint) = &args.endpoint {
        config.endpoint = endpoint.clone();
    }
    if let Some(opapp_endpoint) = &args.opapp_endpoint {
        config.opapp_endpoint = Some(opapp_endpoint.clone());
    }
    if let Some(log_level) = &args.log_level {
        config.log_level = log_level.clone();
    }
    if let Some(require) = args.require_voice_ready {
        config.intents.require_voice_ready = require;
    }
    Ok(config)
}

async fn run_serve(args: ServeArgs) -> anyhow::Result<()> {
    let config = load_config(&args)?;
    init_tracing(&config.log_level);
    tracing::info!(bind = %config.bind, endpoint = %config.endpoint, "tvrpc starting");

    let sinks = WsSinks::new();
    let service = Arc::new(JsonRpcService::new(
        ServiceConfig {
            endpoint: config.endpoint.clone(),
            opapp_endpoint: config.opapp_endpoint.clone(),
            require_voice_ready: config.intents.require_voice_ready,
        },
        Arc::new(LoggingSessionCallback),
        Arc::new(sinks.clone()),
    ));
    let applications = ApplicationHost::new(Arc::new(LoggingApplicationCallback), config.countdown());

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("shutting down");
        }
        on_signal.cancel();
    });

    let router = server::router(AppState::new(service, sinks, applications));
    server::bind_and_serve(&config.bind, router, cancel).await?;
    Ok(())
}

fn init_config(path: Option<PathBuf>, force: bool) -> anyhow::Result<()> {
    let Some(path) = path.or_else(config::default_path) else {
        bail!("no config directory on this platform; pass --path");
    };
    if path.exists() && !force {
        bail!("{} already exists (use --force to overwrite)", path.display());
    }
    Config::default()
        .save(&path)
        .with_context(|| format!("writing {}", path.display()))?;
    println!("{}", path.display());
    Ok(())
}
