use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use super::environment::env_var_name;

// Resolved value of a single flag
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FlagValue {
    Bool(bool),
    Number(i64),
    Text(String),
}

impl FlagValue {
    pub fn type_name(&self) -> &'static str {
        match self {
            FlagValue::Bool(_) => "boolean",
            FlagValue::Number(_) => "number",
            FlagValue::Text(_) => "string",
        }
    }
}

// Declared type of a flag, carrying its default
#[derive(Debug, Clone, Copy)]
pub enum FlagKind {
    Bool {
        default: bool,
    },
    Text {
        default: &'static str,
        choices: &'static [&'static str],
    },
    Number {
        default: i64,
        choices: &'static [i64],
    },
}

/// Outcome of evaluating one precedence layer for one flag.
#[derive(Debug, Clone, PartialEq)]
pub enum Layer {
    Value(FlagValue),
    NotSet,
    Failed(String),
}

#[derive(Debug, Clone, Copy)]
pub struct FlagDefinition {
    pub key: &'static str,
    pub description: &'static str,
    pub kind: FlagKind,
    /// Secondary name emitted next to `key` for older clients.
    pub alias: Option<&'static str>,
}

impl FlagDefinition {
    pub const fn boolean(key: &'static str, default: bool, description: &'static str) -> Self {
        Self {
            key,
            description,
            kind: FlagKind::Bool { default },
            alias: None,
        }
    }

    pub const fn text(
        key: &'static str,
        default: &'static str,
        choices: &'static [&'static str],
        description: &'static str,
    ) -> Self {
        Self {
            key,
            description,
            kind: FlagKind::Text { default, choices },
            alias: None,
        }
    }

    pub const fn number(
        key: &'static str,
        default: i64,
        choices: &'static [i64],
        description: &'static str,
    ) -> Self {
        Self {
            key,
            description,
            kind: FlagKind::Number { default, choices },
            alias: None,
        }
    }

    pub const fn with_alias(mut self, alias: &'static str) -> Self {
        self.alias = Some(alias);
        self
    }

    pub fn answers_to(&self, name: &str) -> bool {
        self.key == name || self.alias == Some(name)
    }

    pub fn type_name(&self) -> &'static str {
        match self.kind {
            FlagKind::Bool { .. } => "boolean",
            FlagKind::Text { .. } => "string",
            FlagKind::Number { .. } => "number",
        }
    }

    pub fn default_value(&self) -> FlagValue {
        match self.kind {
            FlagKind::Bool { default } => FlagValue::Bool(default),
            FlagKind::Text { default, .. } => FlagValue::Text(default.to_string()),
            FlagKind::Number { default, .. } => FlagValue::Number(default),
        }
    }

    /// Allowed values for enum-like flags, empty when any value of the type is accepted.
    pub fn options(&self) -> Vec<FlagValue> {
        match self.kind {
            FlagKind::Bool { .. } => vec![FlagValue::Bool(false), FlagValue::Bool(true)],
            FlagKind::Text { choices, .. } => choices
                .iter()
                .map(|c| FlagValue::Text(c.to_string()))
                .collect(),
            FlagKind::Number { choices, .. } => {
                choices.iter().copied().map(FlagValue::Number).collect()
            }
        }
    }

    /// Coerce a raw environment string into this flag's type.
    pub fn from_env(&self, raw: &str) -> Layer {
        let raw = raw.trim();
        if raw.is_empty() {
            return Layer::NotSet;
        }

        match self.kind {
            FlagKind::Bool { .. } => {
                let enabled = raw.eq_ignore_ascii_case("true") || raw == "1";
                Layer::Value(FlagValue::Bool(enabled))
            }
            FlagKind::Text { choices, .. } => self.accept_text(raw, choices),
            FlagKind::Number { choices, .. } => match raw.parse::<i64>() {
                Ok(n) => self.accept_number(n, choices),
                Err(_) => Layer::Failed(format!("'{}' is not an integer", raw)),
            },
        }
    }

    /// Check a remote JSON value against this flag's type.
    pub fn from_remote(&self, raw: &serde_json::Value) -> Layer {
        use serde_json::Value;

        match (self.kind, raw) {
            (_, Value::Null) => Layer::NotSet,
            (FlagKind::Bool { .. }, Value::Bool(b)) => Layer::Value(FlagValue::Bool(*b)),
            (FlagKind::Text { choices, .. }, Value::String(s)) => self.accept_text(s, choices),
            (FlagKind::Number { choices, .. }, Value::Number(n)) => match n.as_i64() {
                Some(n) => self.accept_number(n, choices),
                None => Layer::Failed(format!("{} is not an integer", n)),
            },
            (_, other) => Layer::Failed(format!(
                "expected a {}, got {}",
                self.type_name(),
                other
            )),
        }
    }

    fn accept_text(&self, raw: &str, choices: &[&str]) -> Layer {
        if choices.is_empty() || choices.iter().any(|c| *c == raw) {
            Layer::Value(FlagValue::Text(raw.to_string()))
        } else {
            Layer::Failed(format!("'{}' is not one of {:?}", raw, choices))
        }
    }

    fn accept_number(&self, n: i64, choices: &[i64]) -> Layer {
        if choices.is_empty() || choices.contains(&n) {
            Layer::Value(FlagValue::Number(n))
        } else {
            Layer::Failed(format!("{} is not one of {:?}", n, choices))
        }
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum FlagError {
    #[error("unknown flag `{0}`")]
    UnknownFlag(String),

    #[error("flag `{key}` is a {actual}, not a {requested}")]
    WrongType {
        key: String,
        requested: &'static str,
        actual: &'static str,
    },

    #[error("invalid flag definition `{key}`: {reason}")]
    InvalidDefinition { key: String, reason: String },
}

/// Validated, ordered set of flag declarations.
#[derive(Debug, Clone)]
pub struct FlagRegistry {
    definitions: Vec<FlagDefinition>,
}

impl FlagRegistry {
    pub fn new(definitions: &[FlagDefinition]) -> Result<Self, FlagError> {
        let mut names = HashSet::new();
        // The prefix is shared, so comparing the unprefixed names is enough.
        let mut env_names = HashSet::new();

        for def in definitions {
            let invalid = |reason: &str| FlagError::InvalidDefinition {
                key: def.key.to_string(),
                reason: reason.to_string(),
            };

            if def.key.is_empty() {
                return Err(invalid("key cannot be empty"));
            }

            if !names.insert(def.key) {
                return Err(invalid("key is declared twice"));
            }

            if let Some(alias) = def.alias {
                if alias.is_empty() || !names.insert(alias) {
                    return Err(invalid("alias is empty or collides with another name"));
                }
            }

            if !env_names.insert(env_var_name("", def.key)) {
                return Err(invalid(
                    "maps to the same environment variable as another flag",
                ));
            }

            let default_ok = match def.kind {
                FlagKind::Bool { .. } => true,
                FlagKind::Text { default, choices } => {
                    choices.is_empty() || choices.contains(&default)
                }
                FlagKind::Number { default, choices } => {
                    choices.is_empty() || choices.contains(&default)
                }
            };
            if !default_ok {
                return Err(invalid("default is not one of the allowed choices"));
            }
        }

        Ok(Self {
            definitions: definitions.to_vec(),
        })
    }

    pub fn definitions(&self) -> &[FlagDefinition] {
        &self.definitions
    }

    pub fn find(&self, name: &str) -> Option<&FlagDefinition> {
        self.definitions.iter().find(|d| d.answers_to(name))
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const LAYOUT: FlagDefinition = FlagDefinition::text(
        "pricing_layout",
        "standard",
        &["standard", "compact"],
        "Pricing page layout",
    );
    const SAMPLE_RATE: FlagDefinition =
        FlagDefinition::number("sample_rate", 100, &[0, 50, 100], "Analytics sampling");
    const TIPPING: FlagDefinition = FlagDefinition::boolean("tipping_mvp", false, "Tipping");

    #[test]
    fn test_boolean_env_coercion() {
        assert_eq!(TIPPING.from_env("true"), Layer::Value(FlagValue::Bool(true)));
        assert_eq!(TIPPING.from_env("TRUE"), Layer::Value(FlagValue::Bool(true)));
        assert_eq!(TIPPING.from_env("1"), Layer::Value(FlagValue::Bool(true)));
        assert_eq!(TIPPING.from_env("false"), Layer::Value(FlagValue::Bool(false)));
        assert_eq!(TIPPING.from_env("yes"), Layer::Value(FlagValue::Bool(false)));
        assert_eq!(TIPPING.from_env("   "), Layer::NotSet);
    }

    #[test]
    fn test_text_env_must_match_choices() {
        assert_eq!(
            LAYOUT.from_env(" compact "),
            Layer::Value(FlagValue::Text("compact".into()))
        );
        assert!(matches!(LAYOUT.from_env("fancy"), Layer::Failed(_)));
    }

    #[test]
    fn test_number_env_parsing() {
        assert_eq!(SAMPLE_RATE.from_env("50"), Layer::Value(FlagValue::Number(50)));
        assert!(matches!(SAMPLE_RATE.from_env("fifty"), Layer::Failed(_)));
        assert!(matches!(SAMPLE_RATE.from_env("75"), Layer::Failed(_)));
    }

    #[test]
    fn test_remote_values_are_type_checked() {
        assert_eq!(TIPPING.from_remote(&json!(true)), Layer::Value(FlagValue::Bool(true)));
        assert!(matches!(TIPPING.from_remote(&json!("true")), Layer::Failed(_)));
        assert_eq!(TIPPING.from_remote(&json!(null)), Layer::NotSet);
        assert!(matches!(SAMPLE_RATE.from_remote(&json!(0.5)), Layer::Failed(_)));
        assert_eq!(
            LAYOUT.from_remote(&json!("compact")),
            Layer::Value(FlagValue::Text("compact".into()))
        );
    }

    #[test]
    fn test_registry_rejects_duplicates() {
        let err = FlagRegistry::new(&[TIPPING, TIPPING]).unwrap_err();
        assert!(matches!(err, FlagError::InvalidDefinition { .. }));

        let clash = FlagDefinition::boolean("tippingMvp", false, "").with_alias("tipping_mvp");
        assert!(FlagRegistry::new(&[TIPPING, clash]).is_err());
    }

    #[test]
    fn test_registry_rejects_env_var_collisions() {
        let camel = FlagDefinition::boolean("tippingMvp", false, "");
        let err = FlagRegistry::new(&[TIPPING, camel]).unwrap_err();
        assert!(matches!(
            err,
            FlagError::InvalidDefinition { ref key, .. } if key == "tippingMvp"
        ));

        let dashed = FlagDefinition::boolean("tipping-mvp", false, "");
        assert!(FlagRegistry::new(&[dashed, TIPPING]).is_err());
    }

    #[test]
    fn test_registry_rejects_default_outside_choices() {
        let bad = FlagDefinition::text("layout", "wide", &["standard"], "");
        assert!(FlagRegistry::new(&[bad]).is_err());
    }

    #[test]
    fn test_registry_finds_by_alias() {
        let search = FlagDefinition::boolean("artistSearch", true, "").with_alias("artist_search");
        let registry = FlagRegistry::new(&[TIPPING, search]).unwrap();

        assert_eq!(registry.find("artist_search").map(|d| d.key), Some("artistSearch"));
        assert!(registry.find("missing").is_none());
        assert_eq!(registry.len(), 2);
    }
}
