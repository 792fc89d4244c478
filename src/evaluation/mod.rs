use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use crate::overrides::{OverrideSource, OverrideSources, Overrides};

mod definition;
mod environment;
mod flag_set;

pub use definition::{FlagDefinition, FlagError, FlagRegistry, FlagValue, Layer};
pub use environment::{FlagEnvironment, DEFAULT_PREFIX};
pub use flag_set::{FlagSet, FlagSource, ResolvedFlag};

pub const DEFAULT_REMOTE_TIMEOUT: Duration = Duration::from_millis(250);

// Deployment tier the service runs in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AppEnvironment {
    #[default]
    Development,
    Preview,
    Production,
}

impl AppEnvironment {
    pub fn as_str(&self) -> &'static str {
        match self {
            AppEnvironment::Development => "development",
            AppEnvironment::Preview => "preview",
            AppEnvironment::Production => "production",
        }
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("unknown environment `{0}` (expected development, preview, or production)")]
pub struct UnknownEnvironment(pub String);

impl FromStr for AppEnvironment {
    type Err = UnknownEnvironment;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "development" => Ok(AppEnvironment::Development),
            "preview" => Ok(AppEnvironment::Preview),
            "production" => Ok(AppEnvironment::Production),
            _ => Err(UnknownEnvironment(s.to_string())),
        }
    }
}

// Who the flags are being resolved for
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EvaluationContext {
    pub user_id: Option<String>,
    pub environment: AppEnvironment,
}

impl EvaluationContext {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn for_user(user_id: impl Into<String>) -> Self {
        Self {
            user_id: Some(user_id.into()),
            ..Self::default()
        }
    }

    pub fn in_environment(mut self, environment: AppEnvironment) -> Self {
        self.environment = environment;
        self
    }
}

/// Merges remote overrides, environment overrides, and static defaults into a [`FlagSet`].
///
/// Resolution never fails: a remote source that errors or exceeds its timeout is treated as
/// having no overrides, and malformed values at any layer fall through to the next one.
#[derive(Clone)]
pub struct Resolver<S = OverrideSources> {
    registry: Arc<FlagRegistry>,
    env: Arc<FlagEnvironment>,
    source: S,
    timeout: Duration,
    environment: AppEnvironment,
}

impl<S: OverrideSource> Resolver<S> {
    pub fn new(
        registry: FlagRegistry,
        env: FlagEnvironment,
        source: S,
        environment: AppEnvironment,
    ) -> Self {
        Self {
            registry: Arc::new(registry),
            env: Arc::new(env),
            source,
            timeout: DEFAULT_REMOTE_TIMEOUT,
            environment,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn registry(&self) -> &FlagRegistry {
        &self.registry
    }

    pub fn flag_env(&self) -> &FlagEnvironment {
        &self.env
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn context_for(&self, user_id: Option<String>) -> EvaluationContext {
        let context = match user_id {
            Some(id) => EvaluationContext::for_user(id),
            None => EvaluationContext::anonymous(),
        };
        context.in_environment(self.environment)
    }

    /// Resolve every flag for `context`, consulting the override source when a user is known.
    pub async fn resolve(&self, context: &EvaluationContext) -> FlagSet {
        let remote = match context.user_id {
            Some(_) => self.fetch_remote(context).await,
            None => None,
        };

        self.merge(remote.as_ref())
    }

    /// Resolve without an identity: environment and defaults only.
    pub fn resolve_client(&self) -> FlagSet {
        self.merge(None)
    }

    async fn fetch_remote(&self, context: &EvaluationContext) -> Option<Overrides> {
        match tokio::time::timeout(self.timeout, self.source.fetch_overrides(context)).await {
            Ok(Ok(overrides)) => Some(overrides),
            Ok(Err(e)) => {
                tracing::warn!(error = %e, "Override source failed, using environment and defaults");
                None
            }
            Err(_) => {
                tracing::warn!(
                    timeout_ms = self.timeout.as_millis() as u64,
                    "Override source timed out, using environment and defaults"
                );
                None
            }
        }
    }

    fn merge(&self, remote: Option<&Overrides>) -> FlagSet {
        if let Some(overrides) = remote {
            for key in overrides.keys() {
                if self.registry.find(key).is_none() {
                    tracing::debug!(flag = %key, "Dropping override for undeclared flag");
                }
            }
        }

        let flags = self
            .registry
            .definitions()
            .iter()
            .map(|def| resolve_definition(def, remote, &self.env))
            .collect();

        FlagSet::new(flags)
    }
}

/// Walk the layers for one flag, highest precedence first.
pub fn resolve_definition(
    def: &FlagDefinition,
    remote: Option<&Overrides>,
    env: &FlagEnvironment,
) -> ResolvedFlag {
    let resolved = |value, source| ResolvedFlag {
        key: def.key,
        alias: def.alias,
        value,
        source,
    };

    let remote_layer = remote
        .and_then(|o| o.get(def.key).or_else(|| def.alias.and_then(|a| o.get(a))))
        .map_or(Layer::NotSet, |raw| def.from_remote(raw));
    if let Some(value) = accept(def, FlagSource::Remote, remote_layer) {
        return resolved(value, FlagSource::Remote);
    }

    let env_layer = env.lookup(def).map_or(Layer::NotSet, |raw| def.from_env(raw));
    if let Some(value) = accept(def, FlagSource::Environment, env_layer) {
        return resolved(value, FlagSource::Environment);
    }

    resolved(def.default_value(), FlagSource::Default)
}

fn accept(def: &FlagDefinition, source: FlagSource, layer: Layer) -> Option<FlagValue> {
    match layer {
        Layer::Value(value) => Some(value),
        Layer::NotSet => None,
        Layer::Failed(reason) => {
            tracing::warn!(flag = def.key, ?source, %reason, "Ignoring malformed flag value");
            None
        }
    }
}
