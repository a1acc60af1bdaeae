//! Telegram Bot API wire types and the HTTP client behind [`BotApi`].

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use staffbot_core::config::TelegramConfig;

use crate::keyboards::{InlineKeyboardMarkup, ReplyMarkup};

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Update {
    pub update_id: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<Message>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub callback_query: Option<CallbackQuery>,
    /// Update exactly as received, kept for the activity log.
    #[serde(skip)]
    pub raw_json: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub message_id: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<User>,
    pub chat: Chat,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact: Option<Contact>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chat {
    pub id: i64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    #[serde(default)]
    pub first_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
    pub phone_number: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<i64>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallbackQuery {
    pub id: String,
    pub from: User,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<Message>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum ParseMode {
    Markdown,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChatAction {
    Typing,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SendMessage {
    pub chat_id: i64,
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parse_mode: Option<ParseMode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply_markup: Option<ReplyMarkup>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct EditMessageText {
    pub chat_id: i64,
    pub message_id: i64,
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parse_mode: Option<ParseMode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply_markup: Option<InlineKeyboardMarkup>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct AnswerCallbackQuery {
    pub callback_query_id: String,
    pub text: String,
    pub show_alert: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SendPhoto {
    pub chat_id: i64,
    pub photo: PathBuf,
    pub caption: Option<String>,
    pub reply_markup: Option<InlineKeyboardMarkup>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SendChatAction {
    pub chat_id: i64,
    pub action: ChatAction,
}

/// One outbound Bot API call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Outbound {
    SendMessage(SendMessage),
    EditMessageText(EditMessageText),
    AnswerCallbackQuery(AnswerCallbackQuery),
    SendPhoto(SendPhoto),
    SendChatAction(SendChatAction),
}

impl Outbound {
    pub fn text(chat_id: i64, text: impl Into<String>) -> Self {
        Self::SendMessage(SendMessage {
            chat_id,
            text: text.into(),
            parse_mode: None,
            reply_markup: None,
        })
    }

    pub fn typing(chat_id: i64) -> Self {
        Self::SendChatAction(SendChatAction { chat_id, action: ChatAction::Typing })
    }

    pub fn alert(callback_query_id: impl Into<String>, text: impl Into<String>) -> Self {
        Self::AnswerCallbackQuery(AnswerCallbackQuery {
            callback_query_id: callback_query_id.into(),
            text: text.into(),
            show_alert: true,
        })
    }

    pub fn method(&self) -> &'static str {
        match self {
            Self::SendMessage(_) => "sendMessage",
            Self::EditMessageText(_) => "editMessageText",
            Self::AnswerCallbackQuery(_) => "answerCallbackQuery",
            Self::SendPhoto(_) => "sendPhoto",
            Self::SendChatAction(_) => "sendChatAction",
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ApiError {
    #[error("unauthorized: {0}")]
    Unauthorized(String),
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("timed out: {0}")]
    TimedOut(String),
    #[error("network error: {0}")]
    Network(String),
    #[error("chat migrated to {new_chat_id}")]
    ChatMigrated { new_chat_id: i64 },
    #[error("telegram error: {0}")]
    Telegram(String),
}

impl ApiError {
    /// Short label sent back to the chat as `"error: <label>"`.
    pub fn label(&self) -> String {
        match self {
            Self::Unauthorized(_) => "Unauthorized".to_owned(),
            Self::BadRequest(_) => "BadRequest".to_owned(),
            Self::TimedOut(_) => "TimedOut".to_owned(),
            Self::Network(_) => "NetworkError".to_owned(),
            Self::ChatMigrated { new_chat_id } => {
                format!("Group migrated to supergroup. New chat id: {new_chat_id}")
            }
            Self::Telegram(_) => "TelegramError".to_owned(),
        }
    }

    /// Maps a failed Bot API response onto an error category.
    pub fn from_response(
        status: u16,
        description: impl Into<String>,
        migrate_to_chat_id: Option<i64>,
    ) -> Self {
        let description = description.into();
        if let Some(new_chat_id) = migrate_to_chat_id {
            return Self::ChatMigrated { new_chat_id };
        }
        match status {
            401 | 403 => Self::Unauthorized(description),
            400 => Self::BadRequest(description),
            404 | 409 => Self::Telegram(description),
            _ => Self::Network(description),
        }
    }

    fn from_transport(error: &reqwest::Error) -> Self {
        if error.is_timeout() {
            Self::TimedOut(error.to_string())
        } else {
            Self::Network(error.to_string())
        }
    }
}

#[async_trait]
pub trait BotApi: Send + Sync {
    async fn get_updates(&self, offset: Option<i64>, timeout_secs: u64)
        -> Result<Vec<Update>, ApiError>;

    async fn execute(&self, request: &Outbound) -> Result<(), ApiError>;
}

#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    result: Option<T>,
    #[serde(default)]
    error_code: Option<u16>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    parameters: Option<ResponseParameters>,
}

#[derive(Debug, Deserialize)]
struct ResponseParameters {
    #[serde(default)]
    migrate_to_chat_id: Option<i64>,
}

pub struct HttpBotApi {
    client: reqwest::Client,
    api_base_url: String,
    bot_token: SecretString,
}

impl HttpBotApi {
    pub fn new(config: &TelegramConfig) -> Self {
        // Long polls must outlive the server-side wait.
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.poll_timeout_secs + 15))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            client,
            api_base_url: config.api_base_url.trim_end_matches('/').to_owned(),
            bot_token: config.bot_token.clone(),
        }
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/bot{}/{method}", self.api_base_url, self.bot_token.expose_secret())
    }

    async fn read_response<T: DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, ApiError> {
        let status = response.status().as_u16();
        let payload: ApiResponse<T> =
            response.json().await.map_err(|error| ApiError::from_transport(&error))?;

        if payload.ok {
            return payload
                .result
                .ok_or_else(|| ApiError::Telegram("response has no result".to_owned()));
        }

        Err(ApiError::from_response(
            payload.error_code.unwrap_or(status),
            payload.description.unwrap_or_default(),
            payload.parameters.and_then(|parameters| parameters.migrate_to_chat_id),
        ))
    }

    async fn post_json<B: Serialize + Sync>(&self, method: &str, body: &B) -> Result<(), ApiError> {
        let response = self
            .client
            .post(self.method_url(method))
            .json(body)
            .send()
            .await
            .map_err(|error| ApiError::from_transport(&error))?;

        Self::read_response::<Value>(response).await.map(|_| ())
    }

    async fn send_photo(&self, request: &SendPhoto) -> Result<(), ApiError> {
        let bytes = tokio::fs::read(&request.photo).await.map_err(|error| {
            ApiError::BadRequest(format!("cannot read photo `{}`: {error}", request.photo.display()))
        })?;
        let file_name = request
            .photo
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "photo".to_owned());

        let mut form = reqwest::multipart::Form::new()
            .text("chat_id", request.chat_id.to_string())
            .part("photo", reqwest::multipart::Part::bytes(bytes).file_name(file_name));
        if let Some(caption) = &request.caption {
            form = form.text("caption", caption.clone());
        }
        if let Some(markup) = &request.reply_markup {
            let encoded = serde_json::to_string(markup)
                .map_err(|error| ApiError::BadRequest(error.to_string()))?;
            form = form.text("reply_markup", encoded);
        }

        let response = self
            .client
            .post(self.method_url("sendPhoto"))
            .multipart(form)
            .send()
            .await
            .map_err(|error| ApiError::from_transport(&error))?;

        Self::read_response::<Value>(response).await.map(|_| ())
    }
}

#[async_trait]
impl BotApi for HttpBotApi {
    async fn get_updates(
        &self,
        offset: Option<i64>,
        timeout_secs: u64,
    ) -> Result<Vec<Update>, ApiError> {
        let mut body = serde_json::json!({
            "timeout": timeout_secs,
            "allowed_updates": ["message", "callback_query"],
        });
        if let Some(offset) = offset {
            body["offset"] = Value::from(offset);
        }

        let response = self
            .client
            .post(self.method_url("getUpdates"))
            .json(&body)
            .send()
            .await
            .map_err(|error| ApiError::from_transport(&error))?;

        let raw_updates = Self::read_response::<Vec<Value>>(response).await?;
        debug!(count = raw_updates.len(), "received updates");
        Ok(raw_updates.into_iter().filter_map(parse_update).collect())
    }

    async fn execute(&self, request: &Outbound) -> Result<(), ApiError> {
        match request {
            Outbound::SendMessage(body) => self.post_json(request.method(), body).await,
            Outbound::EditMessageText(body) => self.post_json(request.method(), body).await,
            Outbound::AnswerCallbackQuery(body) => self.post_json(request.method(), body).await,
            Outbound::SendChatAction(body) => self.post_json(request.method(), body).await,
            Outbound::SendPhoto(body) => self.send_photo(body).await,
        }
    }
}

/// Decodes one raw update, keeping its original JSON. Shapes this bot does
/// not model still carry an `update_id` and decode with no payload.
pub fn parse_update(raw: Value) -> Option<Update> {
    let raw_json = raw.to_string();
    let mut update = match serde_json::from_value::<Update>(raw.clone()) {
        Ok(update) => update,
        Err(_) => Update { update_id: raw.get("update_id")?.as_i64()?, ..Update::default() },
    };
    update.raw_json = raw_json;
    Some(update)
}
