use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, info, warn};

use staffbot_core::audit::{ActivityEntry, ActivityLog};
use staffbot_core::auth::{AccessDecision, AccessDenial, AuthGate, AuthOutcome};
use staffbot_core::domain::{Identity, ProofEvent, UserId};
use staffbot_core::errors::ApplicationError;

use crate::api::{ApiError, BotApi, CallbackQuery, Contact, Message, Outbound, SendMessage, Update};
use crate::keyboards::{authenticate_keyboard, main_menu_keyboard};
use crate::menu::{MenuAction, MenuDispatcher, MenuError, MenuRequest, MENU_PROMPT};

pub const AUTHENTICATION_REQUIRED: &str = "Authentication required";
pub const REGISTERED: &str = "You have been registered";
pub const DIRECT_MESSAGING_UNSUPPORTED: &str = "Direct messaging doesn't work yet";

/// What an update asks the bot to do.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BotEvent<'a> {
    Start(&'a Message),
    Contact { message: &'a Message, contact: &'a Contact },
    Text(&'a Message),
    Callback(&'a CallbackQuery),
    Unsupported,
}

impl BotEvent<'_> {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Start(_) => "start",
            Self::Contact { .. } => "contact",
            Self::Text(_) => "text",
            Self::Callback(_) => "callback",
            Self::Unsupported => "unsupported",
        }
    }
}

pub fn classify(update: &Update) -> BotEvent<'_> {
    if let Some(callback) = &update.callback_query {
        return BotEvent::Callback(callback);
    }
    let Some(message) = &update.message else {
        return BotEvent::Unsupported;
    };
    if let Some(contact) = &message.contact {
        return BotEvent::Contact { message, contact };
    }
    match message.text.as_deref() {
        Some(text) if is_start_command(text) => BotEvent::Start(message),
        Some(text) if text.starts_with('/') => BotEvent::Unsupported,
        Some(_) => BotEvent::Text(message),
        None => BotEvent::Unsupported,
    }
}

fn is_start_command(text: &str) -> bool {
    let command = text.split_whitespace().next().unwrap_or_default();
    command == "/start" || command.starts_with("/start@")
}

/// Chat the update belongs to: the callback's originating message when there
/// is one, otherwise the message itself.
pub fn chat_id(update: &Update) -> Option<i64> {
    update
        .callback_query
        .as_ref()
        .and_then(|callback| callback.message.as_ref())
        .or(update.message.as_ref())
        .map(|message| message.chat.id)
        .or_else(|| update.callback_query.as_ref().map(|callback| callback.from.id))
}

fn callback_tag(update: &Update) -> &str {
    update.callback_query.as_ref().and_then(|callback| callback.data.as_deref()).unwrap_or("")
}

fn message_text(update: &Update) -> &str {
    update.message.as_ref().and_then(|message| message.text.as_deref()).unwrap_or("")
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PipelineOutcome {
    Prompted,
    Registered,
    Refreshed,
    AuthRejected(&'static str),
    AccessDenied(AccessDenial),
    Replied,
    Menu(MenuAction),
    Unavailable,
    Ignored,
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("delivery of `{method}` failed: {source}")]
    Transport {
        method: &'static str,
        #[source]
        source: ApiError,
    },
}

/// Runs one update through activity logging, the auth gate and the menu.
pub struct EventPipeline {
    api: Arc<dyn BotApi>,
    gate: Arc<AuthGate>,
    activity: Arc<dyn ActivityLog>,
    menu: MenuDispatcher,
}

impl EventPipeline {
    pub fn new(
        api: Arc<dyn BotApi>,
        gate: Arc<AuthGate>,
        activity: Arc<dyn ActivityLog>,
        menu: MenuDispatcher,
    ) -> Self {
        Self { api, gate, activity, menu }
    }

    pub async fn process(&self, update: &Update) -> Result<PipelineOutcome, PipelineError> {
        let correlation_id = format!("upd-{}", update.update_id);
        let Some(chat_id) = chat_id(update) else {
            debug!(correlation_id = %correlation_id, "update without chat ignored");
            return Ok(PipelineOutcome::Ignored);
        };
        let event = classify(update);

        info!(
            event_name = "ingress.telegram.update_received",
            correlation_id = %correlation_id,
            user_id = chat_id,
            event_kind = event.kind(),
            callback = callback_tag(update),
            "received telegram update"
        );

        self.record_activity(update, chat_id, &correlation_id).await;

        let (outcome, replies) = match event {
            BotEvent::Start(_) => (PipelineOutcome::Prompted, authentication_prompt(chat_id, true)),
            BotEvent::Contact { message, contact } => {
                self.handle_contact(chat_id, message, contact, &correlation_id).await
            }
            BotEvent::Text(_) => match self.check_access(chat_id, &correlation_id).await {
                Ok(_) => (
                    PipelineOutcome::Replied,
                    vec![Outbound::typing(chat_id), Outbound::text(chat_id, DIRECT_MESSAGING_UNSUPPORTED)],
                ),
                Err(denied) => denied,
            },
            BotEvent::Callback(callback) => {
                self.handle_callback(chat_id, callback, &correlation_id).await
            }
            BotEvent::Unsupported => (PipelineOutcome::Ignored, Vec::new()),
        };

        self.deliver(chat_id, &replies, &correlation_id).await?;

        info!(
            event_name = "ingress.telegram.update_processed",
            correlation_id = %correlation_id,
            user_id = chat_id,
            outcome = ?outcome,
            replies = replies.len(),
            "processed telegram update"
        );
        Ok(outcome)
    }

    async fn record_activity(&self, update: &Update, chat_id: i64, correlation_id: &str) {
        let entry = ActivityEntry::new(
            Some(UserId(chat_id)),
            callback_tag(update),
            message_text(update),
            update.raw_json.clone(),
        );
        if let Err(error) = self.activity.append(entry).await {
            warn!(
                event_name = "audit.activity_append_failed",
                correlation_id = %correlation_id,
                user_id = chat_id,
                error = %error,
                "failed to append activity log entry"
            );
        }
    }

    /// `Err` carries the replies to send when the caller may not proceed.
    async fn check_access(
        &self,
        chat_id: i64,
        correlation_id: &str,
    ) -> Result<Identity, (PipelineOutcome, Vec<Outbound>)> {
        match self.gate.check_access(UserId(chat_id)).await {
            Ok(AccessDecision::Allow(identity)) => {
                debug!(
                    event_name = "auth.access_checked",
                    correlation_id = %correlation_id,
                    user_id = chat_id,
                    decision = "allow",
                    "access granted"
                );
                Ok(identity)
            }
            Ok(AccessDecision::Deny(denial)) => {
                info!(
                    event_name = "auth.access_checked",
                    correlation_id = %correlation_id,
                    user_id = chat_id,
                    decision = "deny",
                    reason = denial.code(),
                    "access denied; prompting for contact"
                );
                Err((PipelineOutcome::AccessDenied(denial), authentication_prompt(chat_id, false)))
            }
            Err(error) => Err(unavailable(chat_id, ApplicationError::from(error), correlation_id)),
        }
    }

    async fn handle_contact(
        &self,
        chat_id: i64,
        message: &Message,
        contact: &Contact,
        correlation_id: &str,
    ) -> (PipelineOutcome, Vec<Outbound>) {
        let asserted_name = match contact.last_name.as_deref() {
            Some(last_name) => format!("{} {last_name}", contact.first_name),
            None => contact.first_name.clone(),
        };
        let proof = ProofEvent {
            user_id: UserId(chat_id),
            phone_number: contact.phone_number.clone(),
            contact_user_id: contact.user_id.map(UserId),
            asserted_name: Some(asserted_name),
        };
        let mut replies = vec![Outbound::typing(chat_id)];

        let outcome = match self.gate.authenticate(&proof).await {
            Ok(outcome) => outcome,
            Err(error) => {
                let (outcome, mut apology) =
                    unavailable(chat_id, ApplicationError::from(error), correlation_id);
                replies.append(&mut apology);
                return (outcome, replies);
            }
        };

        let outcome_code = match &outcome {
            AuthOutcome::Registered(_) => "registered",
            AuthOutcome::Refreshed(_) => "refreshed",
            AuthOutcome::Denied(denial) => denial.code(),
        };
        info!(
            event_name = "auth.proof_processed",
            correlation_id = %correlation_id,
            user_id = chat_id,
            message_id = message.message_id,
            asserted_name = proof.asserted_name.as_deref().unwrap_or_default(),
            outcome = outcome_code,
            "phone number proof processed"
        );

        match outcome {
            AuthOutcome::Registered(_) => {
                replies.push(Outbound::text(chat_id, REGISTERED));
                replies.push(main_menu(chat_id));
                (PipelineOutcome::Registered, replies)
            }
            AuthOutcome::Refreshed(_) => {
                replies.push(main_menu(chat_id));
                (PipelineOutcome::Refreshed, replies)
            }
            AuthOutcome::Denied(denial) => {
                if let Some(text) = denial.user_message() {
                    replies.push(Outbound::text(chat_id, text));
                }
                (PipelineOutcome::AuthRejected(denial.code()), replies)
            }
        }
    }

    async fn handle_callback(
        &self,
        chat_id: i64,
        callback: &CallbackQuery,
        correlation_id: &str,
    ) -> (PipelineOutcome, Vec<Outbound>) {
        let identity = match self.check_access(chat_id, correlation_id).await {
            Ok(identity) => identity,
            Err(denied) => return denied,
        };

        let tag = callback.data.as_deref().unwrap_or_default();
        let Some(action) = MenuAction::from_tag(tag) else {
            info!(
                event_name = "menu.unknown_callback",
                correlation_id = %correlation_id,
                user_id = chat_id,
                callback = tag,
                "ignoring unknown callback tag"
            );
            return (PipelineOutcome::Ignored, Vec::new());
        };

        let request = MenuRequest {
            identity,
            callback_query_id: callback.id.clone(),
            chat_id,
            message_id: callback.message.as_ref().map(|message| message.message_id),
        };

        match self.menu.dispatch(action, &request).await {
            Ok(replies) => (PipelineOutcome::Menu(action), replies),
            Err(MenuError::RecordMissing(phone_number)) => {
                info!(
                    event_name = "menu.record_missing",
                    correlation_id = %correlation_id,
                    user_id = chat_id,
                    callback = tag,
                    phone_number = %phone_number,
                    "caller record vanished; prompting for contact"
                );
                (
                    PipelineOutcome::AccessDenied(AccessDenial::RecordMissing),
                    authentication_prompt(chat_id, false),
                )
            }
            Err(MenuError::Store(error)) => {
                unavailable(chat_id, ApplicationError::from(error), correlation_id)
            }
        }
    }

    /// Sends replies in order. The first failure is reported to the chat as
    /// `"error: <label>"` and stops the rest.
    async fn deliver(
        &self,
        chat_id: i64,
        replies: &[Outbound],
        correlation_id: &str,
    ) -> Result<(), PipelineError> {
        for reply in replies {
            let Err(error) = self.api.execute(reply).await else {
                continue;
            };

            warn!(
                event_name = "egress.telegram.delivery_failed",
                correlation_id = %correlation_id,
                user_id = chat_id,
                method = reply.method(),
                error = %error,
                "telegram rejected outbound call"
            );
            let report = Outbound::text(chat_id, format!("error: {}", error.label()));
            if let Err(report_error) = self.api.execute(&report).await {
                warn!(
                    correlation_id = %correlation_id,
                    user_id = chat_id,
                    error = %report_error,
                    "failed to report delivery error to chat"
                );
            }
            return Err(PipelineError::Transport { method: reply.method(), source: error });
        }
        Ok(())
    }
}

fn authentication_prompt(chat_id: i64, with_typing: bool) -> Vec<Outbound> {
    let prompt = Outbound::SendMessage(SendMessage {
        chat_id,
        text: AUTHENTICATION_REQUIRED.to_owned(),
        parse_mode: None,
        reply_markup: Some(authenticate_keyboard().into()),
    });
    if with_typing {
        vec![Outbound::typing(chat_id), prompt]
    } else {
        vec![prompt]
    }
}

fn main_menu(chat_id: i64) -> Outbound {
    Outbound::SendMessage(SendMessage {
        chat_id,
        text: MENU_PROMPT.to_owned(),
        parse_mode: None,
        reply_markup: Some(main_menu_keyboard().into()),
    })
}

fn unavailable(
    chat_id: i64,
    error: ApplicationError,
    correlation_id: &str,
) -> (PipelineOutcome, Vec<Outbound>) {
    let interface = error.into_interface(correlation_id);
    warn!(
        event_name = "ingress.telegram.backend_unavailable",
        correlation_id = %correlation_id,
        user_id = chat_id,
        error = %interface,
        "backing store failed; replying with apology"
    );
    (PipelineOutcome::Unavailable, vec![Outbound::text(chat_id, interface.user_message())])
}
