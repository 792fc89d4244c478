use serde::ser::{Serialize, SerializeMap, Serializer};

use super::definition::{FlagError, FlagValue};

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FlagSource {
    Remote,
    Environment,
    Default,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedFlag {
    pub key: &'static str,
    pub alias: Option<&'static str>,
    pub value: FlagValue,
    pub source: FlagSource,
}

/// Flags resolved for one evaluation context, one entry per definition in declaration order.
///
/// Serializes as a flat object; flags with an alias appear under both names.
#[derive(Debug, Clone, PartialEq)]
pub struct FlagSet {
    flags: Vec<ResolvedFlag>,
}

impl FlagSet {
    pub(crate) fn new(flags: Vec<ResolvedFlag>) -> Self {
        Self { flags }
    }

    pub fn lookup(&self, name: &str) -> Result<&ResolvedFlag, FlagError> {
        self.flags
            .iter()
            .find(|f| f.key == name || f.alias == Some(name))
            .ok_or_else(|| FlagError::UnknownFlag(name.to_string()))
    }

    pub fn get(&self, name: &str) -> Result<&FlagValue, FlagError> {
        self.lookup(name).map(|f| &f.value)
    }

    pub fn len(&self) -> usize {
        self.flags.len()
    }
}

// Typed reads for in-process callers; the HTTP handlers only serialize the set.
#[allow(dead_code)]
impl FlagSet {
    pub fn is_enabled(&self, name: &str) -> Result<bool, FlagError> {
        match self.get(name)? {
            FlagValue::Bool(b) => Ok(*b),
            other => Err(wrong_type(name, "boolean", other)),
        }
    }

    pub fn text(&self, name: &str) -> Result<&str, FlagError> {
        match self.get(name)? {
            FlagValue::Text(s) => Ok(s.as_str()),
            other => Err(wrong_type(name, "string", other)),
        }
    }

    pub fn number(&self, name: &str) -> Result<i64, FlagError> {
        match self.get(name)? {
            FlagValue::Number(n) => Ok(*n),
            other => Err(wrong_type(name, "number", other)),
        }
    }
}

fn wrong_type(name: &str, requested: &'static str, actual: &FlagValue) -> FlagError {
    FlagError::WrongType {
        key: name.to_string(),
        requested,
        actual: actual.type_name(),
    }
}

impl Serialize for FlagSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let aliases = self.flags.iter().filter(|f| f.alias.is_some()).count();
        let mut map = serializer.serialize_map(Some(self.flags.len() + aliases))?;

        for flag in &self.flags {
            map.serialize_entry(flag.key, &flag.value)?;
            if let Some(alias) = flag.alias {
                map.serialize_entry(alias, &flag.value)?;
            }
        }

        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> FlagSet {
        FlagSet::new(vec![
            ResolvedFlag {
                key: "artistSearch",
                alias: Some("artist_search"),
                value: FlagValue::Bool(true),
                source: FlagSource::Default,
            },
            ResolvedFlag {
                key: "pricing_layout",
                alias: None,
                value: FlagValue::Text("compact".into()),
                source: FlagSource::Environment,
            },
        ])
    }

    #[test]
    fn test_serializes_aliases_with_same_value() {
        let value = serde_json::to_value(sample()).unwrap();
        assert_eq!(
            value,
            json!({
                "artistSearch": true,
                "artist_search": true,
                "pricing_layout": "compact",
            })
        );
    }

    #[test]
    fn test_lookup_by_alias_and_unknown() {
        let flags = sample();
        assert_eq!(flags.is_enabled("artist_search"), Ok(true));
        assert_eq!(flags.text("pricing_layout"), Ok("compact"));
        assert_eq!(
            flags.get("nope"),
            Err(FlagError::UnknownFlag("nope".to_string()))
        );
    }

    #[test]
    fn test_wrong_type_lookup() {
        let err = sample().number("pricing_layout").unwrap_err();
        assert_eq!(
            err,
            FlagError::WrongType {
                key: "pricing_layout".to_string(),
                requested: "number",
                actual: "string",
            }
        );
    }
}
