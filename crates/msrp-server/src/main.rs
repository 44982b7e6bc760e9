mod api;
mod middleware;
mod token;

use tracing_subscriber::EnvFilter;

use crate::{
    api::{build_app, default_rate_limit_state, AppState, PresenterSettings},
    middleware::AuthState,
    token::TokenKeeper,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = msrp_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let pool_config = msrp_db::PoolConfig::from_app_config(&config);
    let pool = msrp_db::connect_pool(&config.database_url, pool_config).await?;
    msrp_db::run_migrations(&pool).await?;

    let is_development = matches!(config.env, msrp_core::Environment::Development);
    let auth = AuthState::from_env(is_development)?;
    let tokens = TokenKeeper::from_env(is_development)?;
    let presenter = PresenterSettings {
        currency_symbol: config.currency_symbol.clone(),
        price_decimals: config.price_decimals,
    };

    let app = build_app(
        AppState {
            pool,
            tokens,
            presenter,
        },
        auth,
        default_rate_limit_state(),
    );

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    tracing::info!(addr = %config.bind_addr, env = %config.env, "server listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to listen for ctrl-c");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("received shutdown signal, starting graceful shutdown");
}
