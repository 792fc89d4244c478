use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};

use crate::evaluation::FlagSet;
use crate::routes::identity::CurrentUser;
use crate::state::AppState;
use super::{
    DiscoveryResponse, FlagDetail, CACHE_NONE, CACHE_PRIVATE, CACHE_PUBLIC, VARY_AUTHORIZATION,
};

async fn resolve_for(state: &AppState, user_id: Option<String>) -> FlagSet {
    match user_id {
        Some(_) => {
            let context = state.resolver.context_for(user_id);
            state.resolver.resolve(&context).await
        }
        None => state.resolver.resolve_client(),
    }
}

/// Every flag (and alias) resolved for the caller
pub async fn list(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
) -> impl IntoResponse {
    // Per-user answers must not land in shared caches
    let cache = if user_id.is_some() { CACHE_PRIVATE } else { CACHE_PUBLIC };

    let flags = resolve_for(&state, user_id).await;
    tracing::debug!(flags = flags.len(), cache, "Serving resolved flags");

    (
        [(header::CACHE_CONTROL, cache), (header::VARY, VARY_AUTHORIZATION)],
        Json(flags),
    )
}

/// A single flag by key or alias, with the layer that produced it
pub async fn get(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Path(key): Path<String>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    if state.resolver.registry().find(&key).is_none() {
        return Err((StatusCode::NOT_FOUND, format!("Flag '{}' not found", key)));
    }

    let flags = resolve_for(&state, user_id).await;
    let flag = flags
        .lookup(&key)
        .map_err(|e| (StatusCode::NOT_FOUND, e.to_string()))?;

    Ok((
        [
            (header::CACHE_CONTROL, CACHE_PRIVATE),
            (header::VARY, VARY_AUTHORIZATION),
        ],
        Json(FlagDetail::from(flag)),
    ))
}

/// Versioned description of every declared flag for external tooling
pub async fn discovery(State(state): State<AppState>) -> impl IntoResponse {
    let descriptor = DiscoveryResponse::describe(state.resolver.registry(), state.resolver.flag_env());

    ([(header::CACHE_CONTROL, CACHE_NONE)], Json(descriptor))
}
