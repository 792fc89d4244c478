pub mod routes;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::evaluation::{FlagEnvironment, FlagRegistry, FlagSource, FlagValue, ResolvedFlag};

pub const DISCOVERY_VERSION: u32 = 1;

// Cache directives
pub const CACHE_PUBLIC: &str = "public, max-age=60, s-maxage=60";
pub const CACHE_PRIVATE: &str = "private, max-age=60";
pub const CACHE_NONE: &str = "no-store";
/// Responses differ by caller identity, so shared caches must key on the token.
pub const VARY_AUTHORIZATION: &str = "Authorization";

#[derive(Debug, Serialize)]
pub struct FlagDetail {
    pub key: &'static str,
    pub value: FlagValue,
    pub source: FlagSource,
}

impl From<&ResolvedFlag> for FlagDetail {
    fn from(flag: &ResolvedFlag) -> Self {
        FlagDetail {
            key: flag.key,
            value: flag.value.clone(),
            source: flag.source,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct FlagDescriptor {
    pub key: &'static str,
    pub description: &'static str,
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub default: FlagValue,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<FlagValue>,
    pub aliases: Vec<&'static str>,
    pub env_var: String,
}

#[derive(Debug, Serialize)]
pub struct DiscoveryResponse {
    pub version: u32,
    pub generated_at: DateTime<Utc>,
    pub definitions: Vec<FlagDescriptor>,
}

impl DiscoveryResponse {
    pub fn describe(registry: &FlagRegistry, env: &FlagEnvironment) -> Self {
        let definitions = registry
            .definitions()
            .iter()
            .map(|def| FlagDescriptor {
                key: def.key,
                description: def.description,
                kind: def.type_name(),
                default: def.default_value(),
                options: def.options(),
                aliases: def.alias.into_iter().collect(),
                env_var: env.var_name(def),
            })
            .collect();

        DiscoveryResponse {
            version: DISCOVERY_VERSION,
            generated_at: Utc::now(),
            definitions,
        }
    }
}
