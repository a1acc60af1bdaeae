use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub telegram: TelegramConfig,
    pub spreadsheet: SpreadsheetConfig,
    pub exchange_rate: ExchangeRateConfig,
    pub content: ContentConfig,
    pub server: ServerConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct TelegramConfig {
    pub bot_token: SecretString,
    pub api_base_url: String,
    pub poll_timeout_secs: u64,
    pub drop_pending_updates: bool,
}

#[derive(Clone, Debug)]
pub struct SpreadsheetConfig {
    pub spreadsheet_id: String,
    pub range: String,
    pub api_key: SecretString,
    pub base_url: String,
    pub timeout_secs: u64,
    pub columns: SpreadsheetColumns,
}

/// Header cells of the employee sheet.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SpreadsheetColumns {
    pub name: String,
    pub phone_number: String,
    pub salary: String,
    pub day_offs: String,
}

#[derive(Clone, Debug)]
pub struct ExchangeRateConfig {
    pub base_url: String,
    pub base_currency: String,
    pub quote_currency: String,
    pub timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct ContentConfig {
    pub about_info: String,
    pub about_website: String,
    pub logo_path: PathBuf,
    pub help_text: String,
    pub paid_holidays: Vec<PaidHoliday>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaidHoliday {
    pub name: String,
    pub date: String,
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub bind_address: String,
    pub health_check_port: u16,
    pub graceful_shutdown_secs: u64,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub database_url: Option<String>,
    pub log_level: Option<String>,
    pub telegram_bot_token: Option<String>,
    pub telegram_api_base_url: Option<String>,
    pub spreadsheet_id: Option<String>,
    pub spreadsheet_api_key: Option<String>,
    pub spreadsheet_base_url: Option<String>,
    pub exchange_rate_base_url: Option<String>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("environment variable interpolation failed for `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated environment interpolation expression")]
    UnterminatedInterpolation,
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

pub const DEFAULT_HELP_TEXT: &str = "*Help*\n\
Use the menu buttons to check your day-offs, salary and the current exchange rate.\n\
Send /start and share your contact again whenever the bot asks you to authenticate.";

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig {
                url: "sqlite://staffbot.db".to_string(),
                max_connections: 5,
                timeout_secs: 30,
            },
            telegram: TelegramConfig {
                bot_token: String::new().into(),
                api_base_url: "https://api.telegram.org".to_string(),
                poll_timeout_secs: 30,
                drop_pending_updates: true,
            },
            spreadsheet: SpreadsheetConfig {
                spreadsheet_id: String::new(),
                range: "Sheet1".to_string(),
                api_key: String::new().into(),
                base_url: "https://sheets.googleapis.com".to_string(),
                timeout_secs: 15,
                columns: SpreadsheetColumns {
                    name: "Name".to_string(),
                    phone_number: "Phone number".to_string(),
                    salary: "Salary".to_string(),
                    day_offs: "Day-offs".to_string(),
                },
            },
            exchange_rate: ExchangeRateConfig {
                base_url: "https://api.frankfurter.app".to_string(),
                base_currency: "EUR".to_string(),
                quote_currency: "MDL".to_string(),
                timeout_secs: 10,
            },
            content: ContentConfig {
                about_info: "Company information has not been configured yet.".to_string(),
                about_website: String::new(),
                logo_path: PathBuf::from("assets/logo.png"),
                help_text: DEFAULT_HELP_TEXT.to_string(),
                paid_holidays: Vec::new(),
            },
            server: ServerConfig {
                bind_address: "127.0.0.1".to_string(),
                health_check_port: 8080,
                graceful_shutdown_secs: 15,
            },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

fn secret_value(value: String) -> SecretString {
    value.into()
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected = options.config_path.unwrap_or_else(|| PathBuf::from("staffbot.toml"));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(database) = patch.database {
            if let Some(url) = database.url {
                self.database.url = url;
            }
            if let Some(max_connections) = database.max_connections {
                self.database.max_connections = max_connections;
            }
            if let Some(timeout_secs) = database.timeout_secs {
                self.database.timeout_secs = timeout_secs;
            }
        }

        if let Some(telegram) = patch.telegram {
            if let Some(bot_token_value) = telegram.bot_token {
                self.telegram.bot_token = secret_value(bot_token_value);
            }
            if let Some(api_base_url) = telegram.api_base_url {
                self.telegram.api_base_url = api_base_url;
            }
            if let Some(poll_timeout_secs) = telegram.poll_timeout_secs {
                self.telegram.poll_timeout_secs = poll_timeout_secs;
            }
            if let Some(drop_pending_updates) = telegram.drop_pending_updates {
                self.telegram.drop_pending_updates = drop_pending_updates;
            }
        }

        if let Some(spreadsheet) = patch.spreadsheet {
            if let Some(spreadsheet_id) = spreadsheet.spreadsheet_id {
                self.spreadsheet.spreadsheet_id = spreadsheet_id;
            }
            if let Some(range) = spreadsheet.range {
                self.spreadsheet.range = range;
            }
            if let Some(api_key_value) = spreadsheet.api_key {
                self.spreadsheet.api_key = secret_value(api_key_value);
            }
            if let Some(base_url) = spreadsheet.base_url {
                self.spreadsheet.base_url = base_url;
            }
            if let Some(timeout_secs) = spreadsheet.timeout_secs {
                self.spreadsheet.timeout_secs = timeout_secs;
            }
            if let Some(columns) = spreadsheet.columns {
                if let Some(name) = columns.name {
                    self.spreadsheet.columns.name = name;
                }
                if let Some(phone_number) = columns.phone_number {
                    self.spreadsheet.columns.phone_number = phone_number;
                }
                if let Some(salary) = columns.salary {
                    self.spreadsheet.columns.salary = salary;
                }
                if let Some(day_offs) = columns.day_offs {
                    self.spreadsheet.columns.day_offs = day_offs;
                }
            }
        }

        if let Some(exchange_rate) = patch.exchange_rate {
            if let Some(base_url) = exchange_rate.base_url {
                self.exchange_rate.base_url = base_url;
            }
            if let Some(base_currency) = exchange_rate.base_currency {
                self.exchange_rate.base_currency = base_currency;
            }
            if let Some(quote_currency) = exchange_rate.quote_currency {
                self.exchange_rate.quote_currency = quote_currency;
            }
            if let Some(timeout_secs) = exchange_rate.timeout_secs {
                self.exchange_rate.timeout_secs = timeout_secs;
            }
        }

        if let Some(content) = patch.content {
            if let Some(about_info) = content.about_info {
                self.content.about_info = about_info;
            }
            if let Some(about_website) = content.about_website {
                self.content.about_website = about_website;
            }
            if let Some(logo_path) = content.logo_path {
                self.content.logo_path = logo_path;
            }
            if let Some(help_text) = content.help_text {
                self.content.help_text = help_text;
            }
            if let Some(paid_holidays) = content.paid_holidays {
                self.content.paid_holidays = paid_holidays;
            }
        }

        if let Some(server) = patch.server {
            if let Some(bind_address) = server.bind_address {
                self.server.bind_address = bind_address;
            }
            if let Some(health_check_port) = server.health_check_port {
                self.server.health_check_port = health_check_port;
            }
            if let Some(graceful_shutdown_secs) = server.graceful_shutdown_secs {
                self.server.graceful_shutdown_secs = graceful_shutdown_secs;
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("STAFFBOT_DATABASE_URL") {
            self.database.url = value;
        }
        if let Some(value) = read_env("STAFFBOT_DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections =
                parse_u32("STAFFBOT_DATABASE_MAX_CONNECTIONS", &value)?;
        }
        if let Some(value) = read_env("STAFFBOT_DATABASE_TIMEOUT_SECS") {
            self.database.timeout_secs = parse_u64("STAFFBOT_DATABASE_TIMEOUT_SECS", &value)?;
        }

        if let Some(value) = read_env("STAFFBOT_TELEGRAM_BOT_TOKEN") {
            self.telegram.bot_token = secret_value(value);
        }
        if let Some(value) = read_env("STAFFBOT_TELEGRAM_API_BASE_URL") {
            self.telegram.api_base_url = value;
        }
        if let Some(value) = read_env("STAFFBOT_TELEGRAM_POLL_TIMEOUT_SECS") {
            self.telegram.poll_timeout_secs =
                parse_u64("STAFFBOT_TELEGRAM_POLL_TIMEOUT_SECS", &value)?;
        }
        if let Some(value) = read_env("STAFFBOT_TELEGRAM_DROP_PENDING_UPDATES") {
            self.telegram.drop_pending_updates =
                parse_bool("STAFFBOT_TELEGRAM_DROP_PENDING_UPDATES", &value)?;
        }

        if let Some(value) = read_env("STAFFBOT_SPREADSHEET_ID") {
            self.spreadsheet.spreadsheet_id = value;
        }
        if let Some(value) = read_env("STAFFBOT_SPREADSHEET_RANGE") {
            self.spreadsheet.range = value;
        }
        if let Some(value) = read_env("STAFFBOT_SPREADSHEET_API_KEY") {
            self.spreadsheet.api_key = secret_value(value);
        }
        if let Some(value) = read_env("STAFFBOT_SPREADSHEET_BASE_URL") {
            self.spreadsheet.base_url = value;
        }
        if let Some(value) = read_env("STAFFBOT_SPREADSHEET_TIMEOUT_SECS") {
            self.spreadsheet.timeout_secs = parse_u64("STAFFBOT_SPREADSHEET_TIMEOUT_SECS", &value)?;
        }

        if let Some(value) = read_env("STAFFBOT_EXCHANGE_RATE_BASE_URL") {
            self.exchange_rate.base_url = value;
        }
        if let Some(value) = read_env("STAFFBOT_EXCHANGE_RATE_BASE_CURRENCY") {
            self.exchange_rate.base_currency = value;
        }
        if let Some(value) = read_env("STAFFBOT_EXCHANGE_RATE_QUOTE_CURRENCY") {
            self.exchange_rate.quote_currency = value;
        }

        if let Some(value) = read_env("STAFFBOT_CONTENT_ABOUT_WEBSITE") {
            self.content.about_website = value;
        }
        if let Some(value) = read_env("STAFFBOT_CONTENT_LOGO_PATH") {
            self.content.logo_path = PathBuf::from(value);
        }

        if let Some(value) = read_env("STAFFBOT_SERVER_BIND_ADDRESS") {
            self.server.bind_address = value;
        }
        if let Some(value) = read_env("STAFFBOT_SERVER_HEALTH_CHECK_PORT") {
            self.server.health_check_port =
                parse_u16("STAFFBOT_SERVER_HEALTH_CHECK_PORT", &value)?;
        }
        if let Some(value) = read_env("STAFFBOT_SERVER_GRACEFUL_SHUTDOWN_SECS") {
            self.server.graceful_shutdown_secs =
                parse_u64("STAFFBOT_SERVER_GRACEFUL_SHUTDOWN_SECS", &value)?;
        }

        let log_level =
            read_env("STAFFBOT_LOGGING_LEVEL").or_else(|| read_env("STAFFBOT_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("STAFFBOT_LOGGING_FORMAT").or_else(|| read_env("STAFFBOT_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(database_url) = overrides.database_url {
            self.database.url = database_url;
        }
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
        if let Some(bot_token) = overrides.telegram_bot_token {
            self.telegram.bot_token = secret_value(bot_token);
        }
        if let Some(api_base_url) = overrides.telegram_api_base_url {
            self.telegram.api_base_url = api_base_url;
        }
        if let Some(spreadsheet_id) = overrides.spreadsheet_id {
            self.spreadsheet.spreadsheet_id = spreadsheet_id;
        }
        if let Some(api_key) = overrides.spreadsheet_api_key {
            self.spreadsheet.api_key = secret_value(api_key);
        }
        if let Some(base_url) = overrides.spreadsheet_base_url {
            self.spreadsheet.base_url = base_url;
        }
        if let Some(base_url) = overrides.exchange_rate_base_url {
            self.exchange_rate.base_url = base_url;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_database(&self.database)?;
        validate_telegram(&self.telegram)?;
        validate_spreadsheet(&self.spreadsheet)?;
        validate_exchange_rate(&self.exchange_rate)?;
        validate_content(&self.content)?;
        validate_server(&self.server)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from("staffbot.toml"), PathBuf::from("config/staffbot.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    let interpolated = interpolate_env_vars(&raw)?;
    toml::from_str::<ConfigPatch>(&interpolated)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next();
            let mut key = String::new();

            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(next) => key.push(next),
                    None => return Err(ConfigError::UnterminatedInterpolation),
                }
            }

            let value = env::var(&key)
                .map_err(|_| ConfigError::MissingEnvInterpolation { var: key.clone() })?;
            output.push_str(&value);
            continue;
        }

        output.push(ch);
    }

    Ok(output)
}

fn is_http_url(value: &str) -> bool {
    value.starts_with("http://") || value.starts_with("https://")
}

fn validate_database(database: &DatabaseConfig) -> Result<(), ConfigError> {
    let url = database.url.trim();
    let sqlite_url =
        url.starts_with("sqlite://") || url.starts_with("sqlite::") || url == ":memory:";
    if !sqlite_url {
        return Err(ConfigError::Validation(
            "database.url must be a sqlite URL (`sqlite://...`, `sqlite::...`, or `:memory:`)"
                .to_string(),
        ));
    }

    if database.max_connections == 0 {
        return Err(ConfigError::Validation(
            "database.max_connections must be greater than zero".to_string(),
        ));
    }

    if database.timeout_secs == 0 || database.timeout_secs > 300 {
        return Err(ConfigError::Validation(
            "database.timeout_secs must be in range 1..=300".to_string(),
        ));
    }

    Ok(())
}

fn validate_telegram(telegram: &TelegramConfig) -> Result<(), ConfigError> {
    let bot_token = telegram.bot_token.expose_secret();
    if bot_token.is_empty() {
        return Err(ConfigError::Validation(
            "telegram.bot_token is required. Create a bot with @BotFather and copy the token it returns".to_string(),
        ));
    }
    let well_formed = bot_token.split_once(':').is_some_and(|(bot_id, secret)| {
        !bot_id.is_empty() && bot_id.chars().all(|ch| ch.is_ascii_digit()) && !secret.is_empty()
    });
    if !well_formed {
        return Err(ConfigError::Validation(
            "telegram.bot_token must look like `<bot id>:<secret>` as issued by @BotFather"
                .to_string(),
        ));
    }

    if !is_http_url(&telegram.api_base_url) {
        return Err(ConfigError::Validation(
            "telegram.api_base_url must start with http:// or https://".to_string(),
        ));
    }

    if telegram.poll_timeout_secs > 50 {
        return Err(ConfigError::Validation(
            "telegram.poll_timeout_secs must be in range 0..=50".to_string(),
        ));
    }

    Ok(())
}

fn validate_spreadsheet(spreadsheet: &SpreadsheetConfig) -> Result<(), ConfigError> {
    if spreadsheet.spreadsheet_id.trim().is_empty() {
        return Err(ConfigError::Validation(
            "spreadsheet.spreadsheet_id is required (the id segment of the sheet URL)".to_string(),
        ));
    }
    if spreadsheet.api_key.expose_secret().trim().is_empty() {
        return Err(ConfigError::Validation(
            "spreadsheet.api_key is required for the Google Sheets values API".to_string(),
        ));
    }
    if spreadsheet.range.trim().is_empty() {
        return Err(ConfigError::Validation("spreadsheet.range must not be empty".to_string()));
    }
    if !is_http_url(&spreadsheet.base_url) {
        return Err(ConfigError::Validation(
            "spreadsheet.base_url must start with http:// or https://".to_string(),
        ));
    }
    if spreadsheet.timeout_secs == 0 || spreadsheet.timeout_secs > 120 {
        return Err(ConfigError::Validation(
            "spreadsheet.timeout_secs must be in range 1..=120".to_string(),
        ));
    }

    let columns = &spreadsheet.columns;
    let headers = [&columns.name, &columns.phone_number, &columns.salary, &columns.day_offs];
    if headers.iter().any(|header| header.trim().is_empty()) {
        return Err(ConfigError::Validation(
            "spreadsheet.columns entries must not be empty".to_string(),
        ));
    }

    Ok(())
}

fn validate_exchange_rate(exchange_rate: &ExchangeRateConfig) -> Result<(), ConfigError> {
    if !is_http_url(&exchange_rate.base_url) {
        return Err(ConfigError::Validation(
            "exchange_rate.base_url must start with http:// or https://".to_string(),
        ));
    }

    for (key, code) in [
        ("exchange_rate.base_currency", &exchange_rate.base_currency),
        ("exchange_rate.quote_currency", &exchange_rate.quote_currency),
    ] {
        let valid = code.len() == 3 && code.chars().all(|ch| ch.is_ascii_uppercase());
        if !valid {
            return Err(ConfigError::Validation(format!(
                "{key} must be a three-letter ISO 4217 code such as `EUR`"
            )));
        }
    }

    if exchange_rate.timeout_secs == 0 || exchange_rate.timeout_secs > 120 {
        return Err(ConfigError::Validation(
            "exchange_rate.timeout_secs must be in range 1..=120".to_string(),
        ));
    }

    Ok(())
}

fn validate_content(content: &ContentConfig) -> Result<(), ConfigError> {
    if !content.about_website.is_empty() && !is_http_url(&content.about_website) {
        return Err(ConfigError::Validation(
            "content.about_website must start with http:// or https://".to_string(),
        ));
    }

    if content.paid_holidays.iter().any(|holiday| holiday.name.trim().is_empty()) {
        return Err(ConfigError::Validation(
            "content.paid_holidays entries must have a name".to_string(),
        ));
    }

    Ok(())
}

fn validate_server(server: &ServerConfig) -> Result<(), ConfigError> {
    if server.health_check_port == 0 {
        return Err(ConfigError::Validation(
            "server.health_check_port must be greater than zero".to_string(),
        ));
    }

    if server.graceful_shutdown_secs == 0 {
        return Err(ConfigError::Validation(
            "server.graceful_shutdown_secs must be greater than zero".to_string(),
        ));
    }

    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    let level = logging.level.trim().to_ascii_lowercase();
    match level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ConfigError::Validation(
            "logging.level must be one of trace|debug|info|warn|error".to_string(),
        )),
    }
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_u16(key: &str, value: &str) -> Result<u16, ConfigError> {
    value.parse::<u16>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_u32(key: &str, value: &str) -> Result<u32, ConfigError> {
    value.parse::<u32>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_u64(key: &str, value: &str) -> Result<u64, ConfigError> {
    value.parse::<u64>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    value.parse::<bool>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    database: Option<DatabasePatch>,
    telegram: Option<TelegramPatch>,
    spreadsheet: Option<SpreadsheetPatch>,
    exchange_rate: Option<ExchangeRatePatch>,
    content: Option<ContentPatch>,
    server: Option<ServerPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct DatabasePatch {
    url: Option<String>,
    max_connections: Option<u32>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct TelegramPatch {
    bot_token: Option<String>,
    api_base_url: Option<String>,
    poll_timeout_secs: Option<u64>,
    drop_pending_updates: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
struct SpreadsheetPatch {
    spreadsheet_id: Option<String>,
    range: Option<String>,
    api_key: Option<String>,
    base_url: Option<String>,
    timeout_secs: Option<u64>,
    columns: Option<ColumnsPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct ColumnsPatch {
    name: Option<String>,
    phone_number: Option<String>,
    salary: Option<String>,
    day_offs: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ExchangeRatePatch {
    base_url: Option<String>,
    base_currency: Option<String>,
    quote_currency: Option<String>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct ContentPatch {
    about_info: Option<String>,
    about_website: Option<String>,
    logo_path: Option<PathBuf>,
    help_text: Option<String>,
    paid_holidays: Option<Vec<PaidHoliday>>,
}

#[derive(Debug, Default, Deserialize)]
struct ServerPatch {
    bind_address: Option<String>,
    health_check_port: Option<u16>,
    graceful_shutdown_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}
