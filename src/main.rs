use std::net::SocketAddr;
use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use connectors::app::{build_router, AppState};
use connectors::cli::{Cli, Commands};
use connectors::config;
use connectors::connectors::ConnectorKind;
use connectors::discovery;
use connectors::settings::{ConnectorSettings, SettingsHandle};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let args = Cli::parse();

    match args.command {
        Commands::Serve { connector, port } => {
            let cfg = match config::load() {
                Ok(cfg) => cfg,
                Err(e) => {
                    tracing::error!("Configuration error: {:#}", e);
                    eprintln!("Error: {:#}", e);
                    std::process::exit(1);
                }
            };
            run_server(cfg, connector, port).await
        }
        Commands::Discovery {
            connector,
            base_url,
        } => {
            let doc = discovery::discovery_document(
                connector,
                base_url.trim_end_matches('/'),
                &ConnectorSettings::default(),
            );
            println!("{}", serde_json::to_string_pretty(&doc)?);
            Ok(())
        }
        Commands::List => {
            println!("{:<20} {:<22} STYLE", "ID", "NAME");
            for kind in ConnectorKind::ALL {
                let id = clap::ValueEnum::to_possible_value(&kind)
                    .map(|v| v.get_name().to_string())
                    .unwrap_or_default();
                println!("{:<20} {:<22} {:?}", id, kind.display_name(), kind.style());
            }
            Ok(())
        }
    }
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::new(
        std::env::var("RUST_LOG").unwrap_or_else(|_| "connectors=debug,tower_http=info".into()),
    );

    let json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}

async fn run_server(
    cfg: config::Config,
    kind: ConnectorKind,
    port: Option<u16>,
) -> anyhow::Result<()> {
    let port = port.unwrap_or(cfg.port);

    tracing::info!("Loading connector settings...");
    let settings = SettingsHandle::load(cfg.settings_path.as_deref())?;
    // Keep the watcher alive for the lifetime of the server.
    let _watcher = settings.watch()?;

    let state = Arc::new(AppState::new(cfg, kind, settings)?);
    tracing::info!(
        connector = %kind,
        key_uri = %state.config.jwt_pub_key_uri,
        "connector configured"
    );

    let app = build_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("{} connector listening on {}", kind, addr);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("failed to listen for shutdown signal: {}", e);
    }
    tracing::info!("shutting down");
}
