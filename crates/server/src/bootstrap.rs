use std::sync::Arc;

use staffbot_core::auth::AuthGate;
use staffbot_core::config::{AppConfig, ConfigError};
use staffbot_core::stores::SystemClock;
use staffbot_db::{connect_with_config, migrations, DbPool, SqlActivityLogRepository, SqlIdentityRepository};
use staffbot_integrations::{HttpExchangeRateProvider, SheetsRecordStore};
use staffbot_telegram::events::EventPipeline;
use staffbot_telegram::menu::{standard_menu, MenuServices};
use staffbot_telegram::polling::{PollingRunner, ReconnectPolicy};
use staffbot_telegram::HttpBotApi;
use thiserror::Error;
use tracing::info;

pub struct Application {
    pub config: AppConfig,
    pub db_pool: DbPool,
    pub polling_runner: PollingRunner,
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

pub async fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(
        event_name = "system.bootstrap.start",
        correlation_id = "bootstrap",
        "starting application bootstrap"
    );

    let db_pool =
        connect_with_config(&config.database).await.map_err(BootstrapError::DatabaseConnect)?;
    info!(
        event_name = "system.bootstrap.database_connected",
        correlation_id = "bootstrap",
        "database connection established"
    );

    migrations::run_pending(&db_pool).await.map_err(BootstrapError::Migration)?;
    info!(
        event_name = "system.bootstrap.migrations_applied",
        correlation_id = "bootstrap",
        "database migrations applied"
    );

    let clock = Arc::new(SystemClock);
    let records = Arc::new(SheetsRecordStore::new(&config.spreadsheet));
    let identities = Arc::new(SqlIdentityRepository::new(db_pool.clone()));
    let activity = Arc::new(SqlActivityLogRepository::new(db_pool.clone()));
    let api = Arc::new(HttpBotApi::new(&config.telegram));

    let gate = Arc::new(AuthGate::new(records.clone(), identities, clock.clone()));
    let menu = standard_menu(MenuServices {
        records,
        rates: Arc::new(HttpExchangeRateProvider::new(&config.exchange_rate)),
        clock,
        content: config.content.clone(),
    });
    info!(
        event_name = "system.bootstrap.menu_registered",
        correlation_id = "bootstrap",
        handlers = menu.handler_count(),
        "menu handlers registered"
    );

    let pipeline = Arc::new(EventPipeline::new(api.clone(), gate, activity, menu));
    let polling_runner = PollingRunner::new(
        api,
        pipeline,
        ReconnectPolicy::default(),
        config.telegram.poll_timeout_secs,
        config.telegram.drop_pending_updates,
    );

    Ok(Application { config, db_pool, polling_runner })
}
