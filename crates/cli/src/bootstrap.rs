use aquabill_core::config::{AppConfig, ConfigError, LoadOptions};
use aquabill_db::{connect_with_config, migrations, DbPool};
use thiserror::Error;
use tracing::info;

pub struct Application {
    pub config: AppConfig,
    pub db_pool: DbPool,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("database connection failed: {0}")]
    DatabaseConnect(#[source] sqlx::Error),
    #[error("database migration failed: {0}")]
    Migration(#[source] sqlx::migrate::MigrateError),
}

impl BootstrapError {
    pub fn error_class(&self) -> &'static str {
        match self {
            Self::Config(_) => "config_validation",
            Self::DatabaseConnect(_) => "db_connectivity",
            Self::Migration(_) => "migration",
        }
    }

    pub fn exit_code(&self) -> u8 {
        match self {
            Self::Config(_) => 2,
            Self::DatabaseConnect(_) => 4,
            Self::Migration(_) => 5,
        }
    }
}

pub async fn bootstrap(options: LoadOptions) -> Result<Application, BootstrapError> {
    let config = AppConfig::load(options)?;
    bootstrap_with_config(config).await
}

/// Opens the store named by `config` and brings its schema up to date.
pub async fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    let db_pool =
        connect_with_config(&config.database).await.map_err(BootstrapError::DatabaseConnect)?;
    info!(
        event_name = "system.bootstrap.database_connected",
        database_url = %config.database.url,
        "database connection established"
    );

    migrations::run_pending(&db_pool).await.map_err(BootstrapError::Migration)?;
    info!(event_name = "system.bootstrap.migrations_applied", "database migrations applied");

    Ok(Application { config, db_pool })
}

#[cfg(test)]
mod tests {
    use aquabill_core::config::{ConfigOverrides, LoadOptions};
    use rust_decimal::Decimal;

    use super::{bootstrap, BootstrapError};

    fn options(database_url: &str) -> LoadOptions {
        LoadOptions {
            config_path: Some("does-not-exist.toml".into()),
            overrides: ConfigOverrides {
                database_url: Some(database_url.to_string()),
                ..ConfigOverrides::default()
            },
            ..LoadOptions::default()
        }
    }

    #[tokio::test]
    async fn bootstrap_rejects_invalid_rate() {
        let mut options = options("sqlite::memory:");
        options.overrides.rate_per_hour = Some(Decimal::ZERO);

        let error = bootstrap(options).await.err().expect("invalid rate must fail");

        assert!(matches!(error, BootstrapError::Config(_)));
        assert_eq!(error.exit_code(), 2);
        assert!(error.to_string().contains("rate_per_hour"));
    }

    #[tokio::test]
    async fn bootstrap_opens_store_with_schema() {
        let app = bootstrap(options("sqlite::memory:")).await.expect("bootstrap");

        let (table_count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM sqlite_master \
             WHERE type = 'table' AND name IN ('customer', 'supply_record', 'bill')",
        )
        .fetch_one(&app.db_pool)
        .await
        .expect("query schema");
        assert_eq!(table_count, 3);

        app.db_pool.close().await;
    }
}
