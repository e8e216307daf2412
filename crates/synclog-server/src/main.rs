mod api;
mod middleware;

use std::{sync::Arc, time::Duration};

use synclog_core::AppConfig;
use synclog_engine::{PgEventLog, SessionLimits};
use tracing_subscriber::EnvFilter;

use crate::{
    api::{build_app, default_rate_limit_state, AppState},
    middleware::AuthState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = synclog_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let pool_config = synclog_db::PoolConfig::from_app_config(&config);
    let pool = synclog_db::connect_pool(&config.database_url, pool_config).await?;
    synclog_db::run_migrations(&pool).await?;

    let auth = AuthState::from_env(matches!(
        config.env,
        synclog_core::Environment::Development
    ))?;
    let state = AppState::new(
        Arc::new(PgEventLog::new(pool)),
        config.runs_page_size,
        session_limits(&config),
    );
    let app = build_app(state, auth, default_rate_limit_state());

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    tracing::info!(addr = %config.bind_addr, env = %config.env, "synclog-server listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

fn session_limits(config: &AppConfig) -> SessionLimits {
    SessionLimits {
        cache_runs: usize::try_from(config.session_cache_runs).unwrap_or(usize::MAX),
        idle_ttl: Duration::from_secs(config.session_idle_secs),
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(error) = tokio::signal::ctrl_c().await {
            tracing::error!(%error, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(error) => {
                tracing::error!(%error, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("received shutdown signal, starting graceful shutdown");
}
