use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header::AUTHORIZATION, request::Parts, HeaderMap, StatusCode},
    middleware::Next,
    response::Response,
};
use jsonwebtoken::{decode, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use std::convert::Infallible;

use crate::state::AppState;

#[derive(Clone, Debug)]
pub struct UserId(pub String);

/// Caller identity, `None` for anonymous requests.
pub struct CurrentUser(pub Option<String>);

impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(CurrentUser(
            parts.extensions.get::<UserId>().map(|u| u.0.clone()),
        ))
    }
}

#[derive(Serialize, Deserialize)]
struct Claims {
    sub: String,
    exp: usize,
}

/// Attach the bearer token's subject to the request when one is sent.
///
/// Requests without an `Authorization` header pass through as anonymous.
pub async fn attach_identity(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, (StatusCode, &'static str)> {
    let token = match bearer_token(req.headers()) {
        Ok(Some(token)) => token,
        Ok(None) => return Ok(next.run(req).await),
        Err(rejection) => return Err(rejection),
    };

    let Some(secret) = state.jwt_secret.as_deref() else {
        tracing::debug!("Ignoring bearer token, no JWT_SECRET configured");
        return Ok(next.run(req).await);
    };

    match user_from_token(&token, secret) {
        Ok(user_id) => {
            req.extensions_mut().insert(UserId(user_id));
            Ok(next.run(req).await)
        }
        Err(e) => {
            tracing::debug!(error = %e, "Rejecting bearer token");
            Err((StatusCode::UNAUTHORIZED, "invalid token"))
        }
    }
}

fn bearer_token(headers: &HeaderMap) -> Result<Option<String>, (StatusCode, &'static str)> {
    let Some(value) = headers.get(AUTHORIZATION) else {
        return Ok(None);
    };

    // The auth scheme is case-insensitive (RFC 9110 section 11.1)
    value
        .to_str()
        .ok()
        .and_then(|h| h.split_once(' '))
        .filter(|(scheme, _)| scheme.eq_ignore_ascii_case("Bearer"))
        .map(|(_, token)| token.trim())
        .filter(|token| !token.is_empty())
        .map(|token| Some(token.to_string()))
        .ok_or((StatusCode::UNAUTHORIZED, "malformed authorization header"))
}

fn user_from_token(token: &str, secret: &str) -> Result<String, jsonwebtoken::errors::Error> {
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )?;

    Ok(token_data.claims.sub)
}

#[cfg(test)]
pub(crate) fn issue_token(sub: &str, secret: &str, ttl: chrono::Duration) -> String {
    use jsonwebtoken::{encode, EncodingKey, Header};

    let exp = (chrono::Utc::now() + ttl).timestamp() as usize;
    encode(
        &Header::default(),
        &Claims {
            sub: sub.to_string(),
            exp,
        },
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .unwrap()
}
