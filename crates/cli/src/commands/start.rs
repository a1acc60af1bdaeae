use secrecy::ExposeSecret;

use crate::commands::{load_config, open_pool, runtime, CommandResult, StepFailure};
use staffbot_db::{migrations, SqlIdentityRepository};

/// Preflight for `staffbot-server`: config, database and schema must all be
/// usable before polling starts.
pub fn run() -> CommandResult {
    let config = match load_config("start") {
        Ok(config) => config,
        Err(failure) => return failure,
    };
    let runtime = match runtime("start") {
        Ok(runtime) => runtime,
        Err(failure) => return failure,
    };

    let result = runtime.block_on(async {
        let pool = open_pool(&config).await?;
        migrations::run_pending(&pool)
            .await
            .map_err(|error| ("migration", error.to_string(), 5u8))?;
        let registered = SqlIdentityRepository::new(pool.clone())
            .count()
            .await
            .map_err(|error| ("db_connectivity", error.to_string(), 4u8))?;
        pool.close().await;
        Ok::<i64, StepFailure>(registered)
    });

    match result {
        Ok(registered) => {
            let bot_id = config
                .telegram
                .bot_token
                .expose_secret()
                .split_once(':')
                .map(|(bot_id, _)| bot_id.to_owned())
                .unwrap_or_default();
            CommandResult::success(
                "start",
                format!(
                    "preflight passed for bot {bot_id}: schema current, {registered} registered users; run staffbot-server to begin polling"
                ),
            )
        }
        Err((error_class, message, exit_code)) => {
            CommandResult::failure("start", error_class, message, exit_code)
        }
    }
}
