use serde::{Deserialize, Serialize};
use url::Url;

use crate::evaluation::EvaluationContext;

use super::{OverrideSource, Overrides};

#[derive(Clone, Debug)]
pub struct HttpOverrideSource {
    endpoint: Url,
    timeout: std::time::Duration,
    client: reqwest::Client,
}

#[derive(Serialize)]
struct OverrideRequest<'a> {
    user_id: &'a str,
    environment: &'a str,
}

#[derive(Deserialize)]
struct OverrideResponse {
    #[serde(default)]
    overrides: Overrides,
}

impl HttpOverrideSource {
    pub fn new(endpoint: Url, timeout: std::time::Duration) -> Result<Self, HttpOverrideError> {
        let client = reqwest::ClientBuilder::new().timeout(timeout).build()?;

        Ok(HttpOverrideSource {
            endpoint,
            timeout,
            client,
        })
    }
}

impl OverrideSource for HttpOverrideSource {
    type Error = HttpOverrideError;

    async fn fetch_overrides(&self, context: &EvaluationContext) -> Result<Overrides, Self::Error> {
        let Some(user_id) = context.user_id.as_deref() else {
            return Ok(Overrides::new());
        };

        let res = self
            .client
            .post(self.endpoint.clone())
            .json(&OverrideRequest {
                user_id,
                environment: context.environment.as_str(),
            })
            .timeout(self.timeout)
            .send()
            .await;

        let resp = match res {
            Ok(resp) => resp,
            Err(err) => {
                tracing::debug!("Failed to fetch overrides from `{}`", self.endpoint);
                return Err(err.into());
            }
        };

        if !resp.status().is_success() {
            return Err(HttpOverrideError::Status(resp.status().as_u16()));
        }

        let body: OverrideResponse = resp.json().await?;
        Ok(body.overrides)
    }
}

#[derive(thiserror::Error, Debug)]
pub enum HttpOverrideError {
    #[error(transparent)]
    Reqwest(#[from] reqwest::Error),

    #[error("Override service responded with status {0}")]
    Status(u16),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_response_without_overrides_is_empty() {
        let body: OverrideResponse = serde_json::from_str("{}").unwrap();
        assert!(body.overrides.is_empty());

        let body: OverrideResponse =
            serde_json::from_str(r#"{ "overrides": { "tipping_mvp": true } }"#).unwrap();
        assert_eq!(body.overrides.len(), 1);
    }

    #[tokio::test]
    async fn test_anonymous_context_skips_request() {
        // Nothing listens here; an anonymous fetch must not try.
        let source = HttpOverrideSource::new(
            Url::parse("http://127.0.0.1:9/overrides").unwrap(),
            Duration::from_millis(50),
        )
        .unwrap();

        let overrides = source
            .fetch_overrides(&EvaluationContext::anonymous())
            .await
            .unwrap();
        assert!(overrides.is_empty());
    }

    #[tokio::test]
    async fn test_unreachable_service_is_an_error() {
        let source = HttpOverrideSource::new(
            Url::parse("http://127.0.0.1:9/overrides").unwrap(),
            Duration::from_millis(50),
        )
        .unwrap();

        let result = source
            .fetch_overrides(&EvaluationContext::for_user("u1"))
            .await;
        assert!(matches!(result, Err(HttpOverrideError::Reqwest(_))));
    }
}
