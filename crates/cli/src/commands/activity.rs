use serde::Serialize;

use crate::commands::{load_config, open_pool, runtime, CommandResult, StepFailure};
use staffbot_db::SqlActivityLogRepository;

#[derive(Debug, Serialize)]
struct ActivityRow {
    user_id: Option<i64>,
    callback: String,
    message: String,
    created_at: String,
}

/// Prints the newest activity log rows, most recent first.
pub fn run(limit: u32) -> CommandResult {
    let config = match load_config("activity") {
        Ok(config) => config,
        Err(failure) => return failure,
    };
    let runtime = match runtime("activity") {
        Ok(runtime) => runtime,
        Err(failure) => return failure,
    };

    let result = runtime.block_on(async {
        let pool = open_pool(&config).await?;
        let entries = SqlActivityLogRepository::new(pool.clone())
            .recent(limit)
            .await
            .map_err(|error| ("activity_query", error.to_string(), 5u8))?;
        pool.close().await;
        Ok::<_, StepFailure>(entries)
    });

    let entries = match result {
        Ok(entries) => entries,
        Err((error_class, message, exit_code)) => {
            return CommandResult::failure("activity", error_class, message, exit_code);
        }
    };

    let rows: Vec<ActivityRow> = entries
        .into_iter()
        .map(|entry| ActivityRow {
            user_id: entry.user_id.map(|user_id| user_id.0),
            callback: entry.callback,
            message: entry.message,
            created_at: entry.created_at.to_rfc3339(),
        })
        .collect();

    match serde_json::to_string_pretty(&rows) {
        Ok(output) => CommandResult { exit_code: 0, output },
        Err(error) => CommandResult::failure("activity", "serialization", error.to_string(), 3),
    }
}
