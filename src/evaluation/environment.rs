use std::collections::HashMap;
use std::ffi::OsString;

use super::definition::FlagDefinition;

pub const DEFAULT_PREFIX: &str = "FEATURE_";

/// Snapshot of the flag override variables, taken once at startup.
#[derive(Debug, Clone, Default)]
pub struct FlagEnvironment {
    prefix: String,
    vars: HashMap<String, String>,
}

impl FlagEnvironment {
    pub fn capture(prefix: &str) -> Self {
        Self::from_vars(prefix, std::env::vars_os())
    }

    /// Keep the prefixed variables; pairs that are not valid UTF-8 are skipped.
    pub fn from_vars<I, K, V>(prefix: &str, vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<OsString>,
        V: Into<OsString>,
    {
        let vars = vars
            .into_iter()
            .filter_map(|(k, v)| match (k.into().into_string(), v.into().into_string()) {
                (Ok(k), Ok(v)) => Some((k, v)),
                (k, _) => {
                    let name = match k {
                        Ok(k) => k,
                        Err(raw) => raw.to_string_lossy().into_owned(),
                    };
                    tracing::debug!(var = %name, "Skipping environment variable that is not valid UTF-8");
                    None
                }
            })
            .filter(|(k, _)| k.starts_with(prefix))
            .collect();

        Self {
            prefix: prefix.to_string(),
            vars,
        }
    }

    pub fn var_name(&self, def: &FlagDefinition) -> String {
        env_var_name(&self.prefix, def.key)
    }

    pub fn lookup(&self, def: &FlagDefinition) -> Option<&str> {
        self.vars.get(&self.var_name(def)).map(|v| v.as_str())
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }
}

/// `artistSearch` -> `FEATURE_ARTIST_SEARCH`, `tipping_mvp` -> `FEATURE_TIPPING_MVP`
pub fn env_var_name(prefix: &str, key: &str) -> String {
    let mut name = String::with_capacity(prefix.len() + key.len() + 4);
    name.push_str(prefix);

    let mut prev_lower = false;
    for c in key.chars() {
        if c.is_ascii_uppercase() && prev_lower {
            name.push('_');
        }
        if c == '-' || c == '.' {
            name.push('_');
        } else {
            name.push(c.to_ascii_uppercase());
        }
        prev_lower = c.is_ascii_lowercase() || c.is_ascii_digit();
    }

    name
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_var_names() {
        assert_eq!(env_var_name("FEATURE_", "tipping_mvp"), "FEATURE_TIPPING_MVP");
        assert_eq!(env_var_name("FEATURE_", "artistSearch"), "FEATURE_ARTIST_SEARCH");
        assert_eq!(env_var_name("FF_", "v2-checkout"), "FF_V2_CHECKOUT");
    }

    #[test]
    fn test_snapshot_keeps_only_prefixed_vars() {
        let env = FlagEnvironment::from_vars(
            DEFAULT_PREFIX,
            [("FEATURE_TIPPING_MVP", "true"), ("DATABASE_URL", "postgres://x")],
        );
        assert_eq!(env.len(), 1);

        let tipping = FlagDefinition::boolean("tipping_mvp", false, "");
        assert_eq!(env.lookup(&tipping), Some("true"));

        let other = FlagDefinition::boolean("venmo_tipping", false, "");
        assert_eq!(env.lookup(&other), None);
    }

    #[cfg(unix)]
    #[test]
    fn test_non_utf8_pairs_are_skipped() {
        use std::os::unix::ffi::OsStringExt;

        let env = FlagEnvironment::from_vars(
            DEFAULT_PREFIX,
            [
                (OsString::from("UNRELATED_BYTES"), OsString::from_vec(vec![0xff, 0xfe])),
                (OsString::from("FEATURE_VENMO_TIPPING"), OsString::from_vec(vec![0xff])),
                (OsString::from("FEATURE_TIPPING_MVP"), OsString::from("1")),
            ],
        );
        assert_eq!(env.len(), 1);

        let tipping = FlagDefinition::boolean("tipping_mvp", false, "");
        assert_eq!(env.lookup(&tipping), Some("1"));

        let venmo = FlagDefinition::boolean("venmo_tipping", false, "");
        assert_eq!(env.lookup(&venmo), None);
    }

    #[test]
    fn test_capture_reads_process_environment() {
        let env = FlagEnvironment::capture("FLAGSHIP_CAPTURE_TEST_");
        assert_eq!(env.len(), 0);
    }
}
