use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

use crate::evaluation::EvaluationContext;

use super::{OverrideSource, Overrides};

/// Overrides stored in the `flag_overrides` table.
#[derive(Clone, Debug)]
pub struct PgOverrideSource {
    pool: PgPool,
}

#[derive(Debug, sqlx::FromRow)]
struct OverrideRow {
    flag_key: String,
    value: serde_json::Value,
    environment: Option<String>,
}

impl PgOverrideSource {
    pub async fn connect(database_url: &str) -> Result<Self, PgOverrideError> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await?;

        sqlx::migrate!().run(&pool).await?;

        Ok(Self { pool })
    }
}

impl OverrideSource for PgOverrideSource {
    type Error = PgOverrideError;

    async fn fetch_overrides(&self, context: &EvaluationContext) -> Result<Overrides, Self::Error> {
        let Some(user_id) = context.user_id.as_deref() else {
            return Ok(Overrides::new());
        };

        let rows: Vec<OverrideRow> = sqlx::query_as(
            r#"
            SELECT flag_key, value, environment
            FROM flag_overrides
            WHERE user_id = $1 AND (environment = $2 OR environment IS NULL)
            "#,
        )
        .bind(user_id)
        .bind(context.environment.as_str())
        .fetch_all(&self.pool)
        .await?;

        Ok(collect_overrides(rows))
    }
}

// Environment-scoped rows win over rows that apply to every environment
fn collect_overrides(rows: Vec<OverrideRow>) -> Overrides {
    let (scoped, global): (Vec<_>, Vec<_>) =
        rows.into_iter().partition(|r| r.environment.is_some());

    let mut overrides = Overrides::new();
    for row in global.into_iter().chain(scoped) {
        overrides.insert(row.flag_key, row.value);
    }
    overrides
}

#[derive(thiserror::Error, Debug)]
pub enum PgOverrideError {
    #[error(transparent)]
    Database(#[from] sqlx::Error),

    #[error(transparent)]
    Migrate(#[from] sqlx::migrate::MigrateError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(key: &str, value: serde_json::Value, environment: Option<&str>) -> OverrideRow {
        OverrideRow {
            flag_key: key.to_string(),
            value,
            environment: environment.map(str::to_string),
        }
    }

    #[test]
    fn test_scoped_rows_win() {
        let overrides = collect_overrides(vec![
            row("tipping_mvp", json!(true), Some("production")),
            row("tipping_mvp", json!(false), None),
            row("pricing_layout", json!("compact"), None),
        ]);

        assert_eq!(overrides.get("tipping_mvp"), Some(&json!(true)));
        assert_eq!(overrides.get("pricing_layout"), Some(&json!("compact")));
    }
}
