use std::collections::HashMap;
use std::future::Future;
use std::path::PathBuf;
use std::time::Duration;

use url::Url;

use crate::evaluation::EvaluationContext;

mod file;
mod http;
mod postgres;

pub use file::{FileOverrideError, FileOverrideSource};
pub use http::{HttpOverrideError, HttpOverrideSource};
pub use postgres::{PgOverrideError, PgOverrideSource};

/// Partial flag key -> value mapping for one user.
pub type Overrides = HashMap<String, serde_json::Value>;

/// Something that can return per-user flag overrides.
pub trait OverrideSource: Send + Sync + Clone + 'static {
    type Error: std::error::Error;

    fn fetch_overrides(
        &self,
        context: &EvaluationContext,
    ) -> impl Future<Output = Result<Overrides, Self::Error>> + Send;
}

#[derive(Clone)]
pub enum OverrideSources {
    None,
    File(FileOverrideSource),
    Http(HttpOverrideSource),
    Postgres(PgOverrideSource),
}

impl OverrideSources {
    pub fn none() -> Self {
        OverrideSources::None
    }

    /// Pick a source from `FLAG_OVERRIDES_URL`: http(s), postgres, or a file path.
    pub async fn try_new(
        opt_value: Option<&str>,
        timeout: Duration,
    ) -> Result<Self, OverrideSourcesError> {
        let Some(value) = opt_value else {
            return Ok(Self::none());
        };

        let url = match Url::parse(value) {
            Ok(url) => url,
            Err(url::ParseError::RelativeUrlWithoutBase) => {
                return Ok(Self::file(PathBuf::from(value)));
            }
            Err(e) => return Err(e.into()),
        };

        match url.scheme() {
            "https" | "http" => Ok(Self::Http(HttpOverrideSource::new(url, timeout)?)),
            "postgres" | "postgresql" => {
                Ok(Self::Postgres(PgOverrideSource::connect(value).await?))
            }
            "file" => {
                let path = url
                    .to_file_path()
                    .map_err(|()| OverrideSourcesError::InvalidFilePath(value.to_string()))?;
                Ok(Self::file(path))
            }
            scheme => Err(OverrideSourcesError::UnknownUrlScheme(scheme.to_string())),
        }
    }

    fn file(path: PathBuf) -> Self {
        let source = FileOverrideSource::new(path);
        tracing::debug!(path = %source.path().display(), "Reading overrides from a local file");
        Self::File(source)
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::File(_) => "file",
            Self::Http(_) => "http",
            Self::Postgres(_) => "postgres",
        }
    }
}

impl OverrideSource for OverrideSources {
    type Error = OverrideSourcesError;

    async fn fetch_overrides(&self, context: &EvaluationContext) -> Result<Overrides, Self::Error> {
        match self {
            Self::None => Ok(Overrides::new()),
            Self::File(s) => Ok(s.fetch_overrides(context).await?),
            Self::Http(s) => Ok(s.fetch_overrides(context).await?),
            Self::Postgres(s) => Ok(s.fetch_overrides(context).await?),
        }
    }
}

#[derive(thiserror::Error, Debug)]
pub enum OverrideSourcesError {
    #[error(transparent)]
    File(#[from] FileOverrideError),

    #[error(transparent)]
    Http(#[from] HttpOverrideError),

    #[error(transparent)]
    Postgres(#[from] PgOverrideError),

    #[error("Override source scheme `{0}` is not supported (use http, https, postgres, or file)")]
    UnknownUrlScheme(String),

    #[error("Override source `{0}` is not a usable local file path")]
    InvalidFilePath(String),

    #[error(transparent)]
    Parse(#[from] url::ParseError),
}
