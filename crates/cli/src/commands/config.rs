use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use secrecy::ExposeSecret;
use staffbot_core::config::{AppConfig, LoadOptions};
use toml::Value;

struct Field {
    key: &'static str,
    value: String,
    env_keys: &'static [&'static str],
}

fn field(key: &'static str, value: impl Into<String>, env_keys: &'static [&'static str]) -> Field {
    Field { key, value: value.into(), env_keys }
}

pub fn run() -> String {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => return format!("config validation failed: {error}"),
    };

    let config_file_path = detect_config_path();
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());

    let mut lines = vec!["effective config (source precedence: env > file > default):".to_string()];
    for field in effective_fields(&config) {
        let source = field_source(
            field.key,
            field.env_keys,
            config_file_doc.as_ref(),
            config_file_path.as_deref(),
        );
        lines.push(render_line(field.key, &field.value, source));
    }

    lines.join("\n")
}

fn effective_fields(config: &AppConfig) -> Vec<Field> {
    let columns = &config.spreadsheet.columns;
    vec![
        field("database.url", &config.database.url, &["STAFFBOT_DATABASE_URL"]),
        field(
            "database.max_connections",
            config.database.max_connections.to_string(),
            &["STAFFBOT_DATABASE_MAX_CONNECTIONS"],
        ),
        field(
            "database.timeout_secs",
            config.database.timeout_secs.to_string(),
            &["STAFFBOT_DATABASE_TIMEOUT_SECS"],
        ),
        field(
            "telegram.bot_token",
            redact_bot_token(config.telegram.bot_token.expose_secret()),
            &["STAFFBOT_TELEGRAM_BOT_TOKEN"],
        ),
        field(
            "telegram.api_base_url",
            &config.telegram.api_base_url,
            &["STAFFBOT_TELEGRAM_API_BASE_URL"],
        ),
        field(
            "telegram.poll_timeout_secs",
            config.telegram.poll_timeout_secs.to_string(),
            &["STAFFBOT_TELEGRAM_POLL_TIMEOUT_SECS"],
        ),
        field(
            "telegram.drop_pending_updates",
            config.telegram.drop_pending_updates.to_string(),
            &["STAFFBOT_TELEGRAM_DROP_PENDING_UPDATES"],
        ),
        field(
            "spreadsheet.spreadsheet_id",
            &config.spreadsheet.spreadsheet_id,
            &["STAFFBOT_SPREADSHEET_ID"],
        ),
        field("spreadsheet.range", &config.spreadsheet.range, &["STAFFBOT_SPREADSHEET_RANGE"]),
        field(
            "spreadsheet.api_key",
            redact_secret(config.spreadsheet.api_key.expose_secret()),
            &["STAFFBOT_SPREADSHEET_API_KEY"],
        ),
        field(
            "spreadsheet.base_url",
            &config.spreadsheet.base_url,
            &["STAFFBOT_SPREADSHEET_BASE_URL"],
        ),
        field(
            "spreadsheet.columns",
            format!(
                "{} | {} | {} | {}",
                columns.name, columns.phone_number, columns.salary, columns.day_offs
            ),
            &[],
        ),
        field(
            "exchange_rate.base_url",
            &config.exchange_rate.base_url,
            &["STAFFBOT_EXCHANGE_RATE_BASE_URL"],
        ),
        field(
            "exchange_rate.base_currency",
            &config.exchange_rate.base_currency,
            &["STAFFBOT_EXCHANGE_RATE_BASE_CURRENCY"],
        ),
        field(
            "exchange_rate.quote_currency",
            &config.exchange_rate.quote_currency,
            &["STAFFBOT_EXCHANGE_RATE_QUOTE_CURRENCY"],
        ),
        field(
            "content.about_website",
            or_unset(&config.content.about_website),
            &["STAFFBOT_CONTENT_ABOUT_WEBSITE"],
        ),
        field(
            "content.logo_path",
            config.content.logo_path.display().to_string(),
            &["STAFFBOT_CONTENT_LOGO_PATH"],
        ),
        field(
            "content.paid_holidays",
            format!("{} entries", config.content.paid_holidays.len()),
            &[],
        ),
        field(
            "server.bind_address",
            &config.server.bind_address,
            &["STAFFBOT_SERVER_BIND_ADDRESS"],
        ),
        field(
            "server.health_check_port",
            config.server.health_check_port.to_string(),
            &["STAFFBOT_SERVER_HEALTH_CHECK_PORT"],
        ),
        field(
            "logging.level",
            &config.logging.level,
            &["STAFFBOT_LOGGING_LEVEL", "STAFFBOT_LOG_LEVEL"],
        ),
        field(
            "logging.format",
            format!("{:?}", config.logging.format),
            &["STAFFBOT_LOGGING_FORMAT", "STAFFBOT_LOG_FORMAT"],
        ),
    ]
}

fn detect_config_path() -> Option<PathBuf> {
    ["staffbot.toml", "config/staffbot.toml"].into_iter().map(PathBuf::from).find(|path| path.exists())
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(
    key_path: &str,
    env_keys: &[&str],
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    if let Some(env_key) = env_keys.iter().find(|env_key| env::var_os(env_key).is_some()) {
        return format!("env ({env_key})");
    }

    if let Some(doc) = config_file_doc {
        if contains_path(doc, key_path) {
            let file_path = config_file_path
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "config file".to_string());
            return format!("file ({file_path})");
        }
    }

    "default".to_string()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}

fn render_line(key: &str, value: &str, source: String) -> String {
    format!("- {key} = {value} (source: {source})")
}

fn or_unset(value: &str) -> String {
    if value.trim().is_empty() {
        "<unset>".to_string()
    } else {
        value.to_string()
    }
}

/// Keeps the public bot id, hides the secret half.
fn redact_bot_token(token: &str) -> String {
    let trimmed = token.trim();
    if trimmed.is_empty() {
        return "<empty>".to_string();
    }

    if let Some((bot_id, _)) = trimmed.split_once(':') {
        return format!("{bot_id}:***");
    }

    "<redacted>".to_string()
}

fn redact_secret(secret: &str) -> String {
    if secret.trim().is_empty() {
        "<empty>".to_string()
    } else {
        "<redacted>".to_string()
    }
}
