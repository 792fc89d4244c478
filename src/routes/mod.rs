use axum::{
    http::Method,
    middleware,
    routing::get,
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

mod flags;
mod health;
mod identity;

pub use health::health;

use crate::state::AppState;

pub fn routes(state: AppState) -> Router {
    let flag_router = Router::new()
        .route("/", get(flags::routes::list))
        .route("/{key}", get(flags::routes::get))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            identity::attach_identity,
        ));

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET]);

    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/.well-known/feature-flags", get(flags::routes::discovery))
        .nest("/api/feature-flags", flag_router)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn root() -> &'static str {
    "Feature flag service"
}

#[cfg(test)]
pub(crate) fn test_state(
    source: crate::overrides::OverrideSources,
    env: &[(&str, &str)],
) -> AppState {
    use crate::evaluation::{AppEnvironment, FlagEnvironment, Resolver, DEFAULT_PREFIX};

    let registry = crate::catalog::registry().unwrap();
    let env = FlagEnvironment::from_vars(DEFAULT_PREFIX, env.iter().copied());

    AppState {
        resolver: Resolver::new(registry, env, source, AppEnvironment::Development),
        jwt_secret: Some(std::sync::Arc::from("test-secret")),
    }
}
