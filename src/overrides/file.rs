use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::evaluation::EvaluationContext;

use super::{OverrideSource, Overrides};

/// Overrides kept in a local JSON document, `{ "<user id>": { "<flag>": <value> } }`.
///
/// The file is re-read on every fetch so edits show up without a restart.
#[derive(Clone, Debug)]
pub struct FileOverrideSource {
    path: Arc<PathBuf>,
}

impl FileOverrideSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Arc::new(path.into()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl OverrideSource for FileOverrideSource {
    type Error = FileOverrideError;

    async fn fetch_overrides(&self, context: &EvaluationContext) -> Result<Overrides, Self::Error> {
        let Some(user_id) = context.user_id.as_deref() else {
            return Ok(Overrides::new());
        };

        let path: &PathBuf = &self.path;
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| FileOverrideError::Read(path.clone(), e))?;

        let mut by_user: HashMap<String, Overrides> = serde_json::from_slice(&bytes)?;

        Ok(by_user.remove(user_id).unwrap_or_default())
    }
}

#[derive(thiserror::Error, Debug)]
pub enum FileOverrideError {
    #[error("Read path `{0}`")]
    Read(PathBuf, #[source] std::io::Error),

    #[error(transparent)]
    Serde(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn scratch_file(name: &str, contents: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!("{}-{}.json", name, std::process::id()));
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[tokio::test]
    async fn test_reads_overrides_for_user() {
        let path = scratch_file(
            "flag-overrides-user",
            r#"{ "u1": { "tipping_mvp": true }, "u2": { "tipping_mvp": false } }"#,
        );
        let source = FileOverrideSource::new(&path);

        let overrides = source
            .fetch_overrides(&EvaluationContext::for_user("u1"))
            .await
            .unwrap();
        assert_eq!(overrides.get("tipping_mvp"), Some(&json!(true)));

        let missing = source
            .fetch_overrides(&EvaluationContext::for_user("u3"))
            .await
            .unwrap();
        assert!(missing.is_empty());

        std::fs::remove_file(path).unwrap();
    }

    #[tokio::test]
    async fn test_malformed_file_is_an_error() {
        let path = scratch_file("flag-overrides-bad", "not json");
        let source = FileOverrideSource::new(&path);

        let result = source
            .fetch_overrides(&EvaluationContext::for_user("u1"))
            .await;
        assert!(matches!(result, Err(FileOverrideError::Serde(_))));

        std::fs::remove_file(path).unwrap();
    }

    #[tokio::test]
    async fn test_missing_file_is_an_error() {
        let source = FileOverrideSource::new("/definitely/not/here.json");
        let result = source
            .fetch_overrides(&EvaluationContext::for_user("u1"))
            .await;
        assert!(matches!(result, Err(FileOverrideError::Read(..))));
    }
}
