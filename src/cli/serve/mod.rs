//! Serve command - runs the gateway until SIGINT/SIGTERM

use std::net::SocketAddr;
use std::time::Duration;

use clap::Args;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{info, warn};

use crate::api::create_router_with_metrics;
use crate::config::AppConfig;
use crate::infrastructure::logging::init_logging;
use crate::infrastructure::observability::init_metrics;
use crate::infrastructure::usage::spawn_retention_task;

#[derive(Debug, Clone, Default, Args)]
pub struct ServeArgs {
    /// Seed an admin key with this secret (overrides auth.admin_key)
    #[arg(long)]
    pub admin_key: Option<String>,

    /// Trusted local mode: admit every request without a key
    #[arg(long)]
    pub no_auth: bool,

    #[arg(long)]
    pub host: Option<String>,

    #[arg(long)]
    pub port: Option<u16>,
}

impl ServeArgs {
    /// Command line flags win over file and environment configuration
    pub fn apply(&self, config: &mut AppConfig) {
        if let Some(admin_key) = &self.admin_key {
            config.auth.admin_key = Some(admin_key.clone());
        }
        if self.no_auth {
            config.auth.required = false;
        }
        if let Some(host) = &self.host {
            config.server.host = host.clone();
        }
        if let Some(port) = self.port {
            config.server.port = port;
        }
    }
}

pub async fn run(args: ServeArgs) -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let loaded = AppConfig::load();
    let mut config = loaded.as_ref().cloned().unwrap_or_default();
    args.apply(&mut config);

    init_logging(&config.logging);
    if let Err(e) = &loaded {
        warn!(error = %e, "Failed to load configuration, using defaults");
    }

    let metrics = init_metrics(&config.metrics);
    let state = crate::create_app_state_with_config(&config).await?;

    let retention = (config.usage.retention_days > 0).then(|| {
        spawn_retention_task(
            state.usage.clone(),
            chrono::Duration::days(i64::from(config.usage.retention_days)),
            Duration::from_secs(config.usage.retention_interval_secs.max(1)),
        )
    });

    let app = create_router_with_metrics(state.clone(), metrics, &config.metrics.path);

    let addr = build_socket_addr(&config)?;
    info!(
        auth_required = config.auth.required,
        default_engine = %config.engines.default_engine,
        "Starting speech gateway on {}",
        addr
    );

    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Some(handle) = retention {
        handle.abort();
    }
    state.usage.flush().await;
    info!("Speech gateway shutdown complete");

    Ok(())
}

fn build_socket_addr(config: &AppConfig) -> anyhow::Result<SocketAddr> {
    Ok(SocketAddr::from((
        config.server.host.parse::<std::net::IpAddr>()?,
        config.server.port,
    )))
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, initiating graceful shutdown"),
        _ = terminate => info!("Received SIGTERM, initiating graceful shutdown"),
    }
}
