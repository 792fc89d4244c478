mod catalog;
mod config;
mod evaluation;
mod overrides;
mod routes;
mod state;

use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use crate::config::{Config, ConfigError};
use crate::evaluation::{FlagEnvironment, FlagError, Resolver};
use crate::overrides::{OverrideSources, OverrideSourcesError};

#[derive(Debug, thiserror::Error)]
enum StartupError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Flags(#[from] FlagError),

    #[error(transparent)]
    Overrides(#[from] OverrideSourcesError),

    #[error("server error: {0}")]
    Io(#[from] std::io::Error),
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    if let Err(e) = run().await {
        tracing::error!(error = %e, "Flag service stopped");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), StartupError> {
    let config = Config::from_env()?;

    let registry = catalog::registry()?;
    let flag_env = FlagEnvironment::capture(&config.flag_env_prefix);
    let source =
        OverrideSources::try_new(config.overrides_url.as_deref(), config.overrides_timeout).await?;

    tracing::info!(
        environment = config.environment.as_str(),
        flags = registry.len(),
        env_overrides = flag_env.len(),
        override_source = source.kind(),
        "Flag catalog loaded"
    );

    let resolver = Resolver::new(registry, flag_env, source, config.environment)
        .with_timeout(config.overrides_timeout);

    let state = state::AppState {
        resolver,
        jwt_secret: config.jwt_secret.as_deref().map(Arc::from),
    };

    let app = routes::routes(state);

    let listener = tokio::net::TcpListener::bind(config.addr()).await?;

    tracing::info!("server is chilling at http://{}", config.addr());

    axum::serve(listener, app).await?;

    Ok(())
}
