use std::sync::Arc;

use crate::evaluation::Resolver;

#[derive(Clone)]
pub struct AppState {
    pub resolver: Resolver,
    /// HS256 secret for bearer tokens; without it every request is anonymous.
    pub jwt_secret: Option<Arc<str>>,
}
