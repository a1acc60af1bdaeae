use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Duration, NaiveDate, TimeZone, Utc};
use rust_decimal::Decimal;
use serde_json::json;
use tokio::sync::Mutex;

use staffbot_core::audit::ActivityLog;
use staffbot_core::auth::{AccessDenial, AuthGate};
use staffbot_core::config::AppConfig;
use staffbot_core::domain::{Record, UserId};
use staffbot_core::rates::{ExchangeRateProvider, RateError};
use staffbot_core::stores::{IdentityStore, InMemoryRecordStore, ManualClock};
use staffbot_db::{connect_with_settings, migrations, SqlActivityLogRepository, SqlIdentityRepository};
use staffbot_telegram::api::{parse_update, ApiError, BotApi, Outbound, Update};
use staffbot_telegram::events::{
    EventPipeline, PipelineError, PipelineOutcome, AUTHENTICATION_REQUIRED,
    DIRECT_MESSAGING_UNSUPPORTED, REGISTERED,
};
use staffbot_telegram::keyboards::ReplyMarkup;
use staffbot_telegram::menu::{standard_menu, MenuAction, MenuServices, MENU_PROMPT};

#[derive(Default)]
struct RecordingBotApi {
    sent: Mutex<Vec<Outbound>>,
    fail_next: Mutex<Option<ApiError>>,
}

impl RecordingBotApi {
    async fn take(&self) -> Vec<Outbound> {
        std::mem::take(&mut *self.sent.lock().await)
    }

    async fn fail_next_call(&self, error: ApiError) {
        *self.fail_next.lock().await = Some(error);
    }
}

#[async_trait]
impl BotApi for RecordingBotApi {
    async fn get_updates(
        &self,
        _offset: Option<i64>,
        _timeout_secs: u64,
    ) -> Result<Vec<Update>, ApiError> {
        Ok(Vec::new())
    }

    async fn execute(&self, call: &Outbound) -> Result<(), ApiError> {
        if let Some(error) = self.fail_next.lock().await.take() {
            return Err(error);
        }
        self.sent.lock().await.push(call.clone());
        Ok(())
    }
}

struct SteadyRates;

#[async_trait]
impl ExchangeRateProvider for SteadyRates {
    async fn rate_on(&self, _date: NaiveDate) -> Result<Decimal, RateError> {
        Ok(Decimal::new(1985, 2))
    }
}

struct Harness {
    pipeline: EventPipeline,
    api: Arc<RecordingBotApi>,
    clock: Arc<ManualClock>,
    records: Arc<InMemoryRecordStore>,
    identities: Arc<SqlIdentityRepository>,
    activity: Arc<SqlActivityLogRepository>,
    next_update_id: i64,
}

fn record(full_name: &str, phone_number: &str, salary: &str, day_offs: &str) -> Record {
    Record {
        full_name: full_name.to_owned(),
        phone_number: phone_number.to_owned(),
        salary: salary.to_owned(),
        day_off_balance: day_offs.to_owned(),
    }
}

impl Harness {
    async fn new(records: Vec<Record>) -> Self {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrations");

        let api = Arc::new(RecordingBotApi::default());
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2026, 3, 2, 9, 0, 0).single().expect("valid time"),
        ));
        let records = Arc::new(InMemoryRecordStore::with_records(records));
        let identities = Arc::new(SqlIdentityRepository::new(pool.clone()));
        let activity = Arc::new(SqlActivityLogRepository::new(pool));

        let gate = Arc::new(AuthGate::new(records.clone(), identities.clone(), clock.clone()));
        let menu = standard_menu(MenuServices {
            records: records.clone(),
            rates: Arc::new(SteadyRates),
            clock: clock.clone(),
            content: AppConfig::default().content,
        });
        let pipeline = EventPipeline::new(api.clone(), gate, activity.clone(), menu);

        Self { pipeline, api, clock, records, identities, activity, next_update_id: 1 }
    }

    fn next_id(&mut self) -> i64 {
        let id = self.next_update_id;
        self.next_update_id += 1;
        id
    }

    async fn send(&mut self, update: serde_json::Value) -> PipelineOutcome {
        let update = parse_update(update).expect("update");
        self.pipeline.process(&update).await.expect("pipeline")
    }

    async fn start(&mut self, chat_id: i64) -> PipelineOutcome {
        let id = self.next_id();
        self.send(json!({
            "update_id": id,
            "message": {"message_id": id, "chat": {"id": chat_id}, "text": "/start"}
        }))
        .await
    }

    async fn share_contact(
        &mut self,
        chat_id: i64,
        phone_number: &str,
        owner: i64,
        first_name: &str,
    ) -> PipelineOutcome {
        let id = self.next_id();
        self.send(json!({
            "update_id": id,
            "message": {
                "message_id": id,
                "chat": {"id": chat_id},
                "contact": {"phone_number": phone_number, "first_name": first_name, "user_id": owner}
            }
        }))
        .await
    }

    async fn share_unlinked_contact(&mut self, chat_id: i64, phone_number: &str) -> PipelineOutcome {
        let id = self.next_id();
        self.send(json!({
            "update_id": id,
            "message": {
                "message_id": id,
                "chat": {"id": chat_id},
                "contact": {"phone_number": phone_number, "first_name": "Jane", "last_name": "Doe"}
            }
        }))
        .await
    }

    async fn text(&mut self, chat_id: i64, text: &str) -> PipelineOutcome {
        let id = self.next_id();
        self.send(json!({
            "update_id": id,
            "message": {"message_id": id, "chat": {"id": chat_id}, "text": text}
        }))
        .await
    }

    async fn press(&mut self, chat_id: i64, action: MenuAction) -> PipelineOutcome {
        let id = self.next_id();
        self.send(json!({
            "update_id": id,
            "callback_query": {
                "id": format!("cb-{id}"),
                "from": {"id": chat_id, "first_name": "Jane"},
                "message": {"message_id": 500, "chat": {"id": chat_id}},
                "data": action.tag()
            }
        }))
        .await
    }
}

fn jane_doe() -> Record {
    record("Jane Doe", "+32123", "1500 EUR", "5")
}

fn texts(sent: &[Outbound]) -> Vec<&str> {
    sent.iter()
        .filter_map(|call| match call {
            Outbound::SendMessage(message) => Some(message.text.as_str()),
            Outbound::EditMessageText(edit) => Some(edit.text.as_str()),
            Outbound::AnswerCallbackQuery(answer) => Some(answer.text.as_str()),
            _ => None,
        })
        .collect()
}

fn is_authentication_prompt(call: &Outbound) -> bool {
    matches!(
        call,
        Outbound::SendMessage(message)
            if message.text == AUTHENTICATION_REQUIRED
                && matches!(&message.reply_markup, Some(ReplyMarkup::Keyboard(keyboard))
                    if keyboard.keyboard[0][0].request_contact)
    )
}

#[tokio::test]
async fn start_prompts_for_contact() {
    let mut harness = Harness::new(vec![jane_doe()]).await;

    assert_eq!(harness.start(42).await, PipelineOutcome::Prompted);

    let sent = harness.api.take().await;
    assert_eq!(sent.len(), 2);
    assert_eq!(sent[0], Outbound::typing(42));
    assert!(is_authentication_prompt(&sent[1]));
}

#[tokio::test]
async fn registration_then_day_offs_balance() {
    let mut harness = Harness::new(vec![jane_doe()]).await;

    assert_eq!(harness.share_contact(42, "+32123", 42, "Jane").await, PipelineOutcome::Registered);
    let sent = harness.api.take().await;
    assert_eq!(sent[0], Outbound::typing(42));
    assert_eq!(texts(&sent), vec![REGISTERED, MENU_PROMPT]);

    let identity = harness.identities.find_by_user_id(UserId(42)).await.expect("lookup");
    let identity = identity.expect("identity stored");
    assert_eq!(identity.full_name(), "Jane Doe");
    assert_eq!(identity.phone_number, "+32123");

    assert_eq!(
        harness.press(42, MenuAction::DayOffsMine).await,
        PipelineOutcome::Menu(MenuAction::DayOffsMine)
    );
    assert_eq!(texts(&harness.api.take().await), vec!["You have 5 day-offs left"]);
}

#[tokio::test]
async fn second_share_refreshes_without_registration_notice() {
    let mut harness = Harness::new(vec![jane_doe()]).await;
    harness.share_contact(42, "+32123", 42, "Jane").await;
    harness.api.take().await;

    harness.clock.advance(Duration::days(10));
    assert_eq!(harness.share_contact(42, "+32123", 42, "Jane").await, PipelineOutcome::Refreshed);
    assert_eq!(texts(&harness.api.take().await), vec![MENU_PROMPT]);

    assert_eq!(harness.press(42, MenuAction::Salary).await, PipelineOutcome::Menu(MenuAction::Salary));
    assert_eq!(texts(&harness.api.take().await), vec!["1500 EUR"]);
}

#[tokio::test]
async fn stale_session_is_prompted_again() {
    let mut harness = Harness::new(vec![jane_doe()]).await;
    harness.share_contact(42, "+32123", 42, "Jane").await;
    harness.api.take().await;

    harness.clock.advance(Duration::days(8));

    assert_eq!(
        harness.press(42, MenuAction::Salary).await,
        PipelineOutcome::AccessDenied(AccessDenial::SessionExpired)
    );
    let sent = harness.api.take().await;
    assert_eq!(sent.len(), 1);
    assert!(is_authentication_prompt(&sent[0]));
}

#[tokio::test]
async fn claimed_phone_cannot_be_taken_by_another_chat() {
    let mut harness = Harness::new(vec![jane_doe()]).await;
    harness.share_contact(42, "+32123", 42, "Jane").await;
    harness.api.take().await;

    assert_eq!(
        harness.share_contact(99, "+32123", 99, "Mallory").await,
        PipelineOutcome::AuthRejected("phone_claimed")
    );
    assert_eq!(texts(&harness.api.take().await), vec!["Access denied"]);
    assert_eq!(harness.identities.count().await.expect("count"), 1);

    assert_eq!(
        harness.press(99, MenuAction::Salary).await,
        PipelineOutcome::AccessDenied(AccessDenial::NotRegistered)
    );
}

#[tokio::test]
async fn forwarded_contact_of_someone_else_is_rejected() {
    let mut harness = Harness::new(vec![jane_doe()]).await;

    assert_eq!(
        harness.share_contact(99, "+32123", 42, "Jane").await,
        PipelineOutcome::AuthRejected("contact_not_owned")
    );
    assert_eq!(texts(&harness.api.take().await), vec!["Access denied"]);
    assert_eq!(harness.identities.count().await.expect("count"), 0);
}

#[tokio::test]
async fn typed_in_contact_without_account_link_is_rejected() {
    let mut harness = Harness::new(vec![jane_doe()]).await;

    assert_eq!(
        harness.share_unlinked_contact(666, "+32123").await,
        PipelineOutcome::AuthRejected("contact_not_owned")
    );
    assert_eq!(texts(&harness.api.take().await), vec!["Access denied"]);
    assert_eq!(harness.identities.count().await.expect("count"), 0);

    assert_eq!(
        harness.press(666, MenuAction::Salary).await,
        PipelineOutcome::AccessDenied(AccessDenial::NotRegistered)
    );
    assert!(!texts(&harness.api.take().await).contains(&"1500 EUR"));
}

#[tokio::test]
async fn single_word_name_is_rejected_with_format_hint() {
    let mut harness = Harness::new(vec![record("Madonna", "+111", "900 EUR", "3")]).await;

    assert_eq!(
        harness.share_contact(7, "+111", 7, "Madonna").await,
        PipelineOutcome::AuthRejected("invalid_name_format")
    );
    assert_eq!(
        texts(&harness.api.take().await),
        vec!["Invalid name format. Expected <Name Surname>, got <Madonna>"]
    );
}

#[tokio::test]
async fn removed_record_revokes_access() {
    let mut harness = Harness::new(vec![jane_doe()]).await;
    harness.share_contact(42, "+32123", 42, "Jane").await;
    harness.api.take().await;

    harness.records.remove_by_name("Jane Doe").await;

    assert_eq!(
        harness.press(42, MenuAction::DayOffsMine).await,
        PipelineOutcome::AccessDenied(AccessDenial::RecordMissing)
    );
    assert!(is_authentication_prompt(&harness.api.take().await[0]));
}

#[tokio::test]
async fn text_messages_depend_on_access() {
    let mut harness = Harness::new(vec![jane_doe()]).await;

    assert_eq!(
        harness.text(42, "hello").await,
        PipelineOutcome::AccessDenied(AccessDenial::NotRegistered)
    );
    assert!(is_authentication_prompt(&harness.api.take().await[0]));

    harness.share_contact(42, "+32123", 42, "Jane").await;
    harness.api.take().await;

    assert_eq!(harness.text(42, "hello").await, PipelineOutcome::Replied);
    assert_eq!(texts(&harness.api.take().await), vec![DIRECT_MESSAGING_UNSUPPORTED]);
}

#[tokio::test]
async fn unknown_commands_and_callbacks_are_ignored() {
    let mut harness = Harness::new(vec![jane_doe()]).await;
    harness.share_contact(42, "+32123", 42, "Jane").await;
    harness.api.take().await;

    assert_eq!(harness.text(42, "/settings").await, PipelineOutcome::Ignored);

    let id = harness.next_id();
    let outcome = harness
        .send(json!({
            "update_id": id,
            "callback_query": {
                "id": "cb-x",
                "from": {"id": 42, "first_name": "Jane"},
                "message": {"message_id": 500, "chat": {"id": 42}},
                "data": "bonus"
            }
        }))
        .await;
    assert_eq!(outcome, PipelineOutcome::Ignored);
    assert!(harness.api.take().await.is_empty());
}

#[tokio::test]
async fn every_update_is_logged_before_authentication() {
    let mut harness = Harness::new(vec![jane_doe()]).await;

    harness.start(42).await;
    harness.press(42, MenuAction::Salary).await;
    harness.share_contact(42, "+32123", 42, "Jane").await;

    let entries = harness.activity.recent(10).await.expect("recent");
    assert_eq!(entries.len(), 3);
    assert_eq!(entries[2].message, "/start");
    assert_eq!(entries[1].callback, "salary");
    assert!(entries.iter().all(|entry| entry.user_id == Some(UserId(42))));
    assert!(entries[0].raw_update.contains("+32123"));
}

#[tokio::test]
async fn delivery_failure_is_reported_to_chat() {
    let mut harness = Harness::new(vec![jane_doe()]).await;
    harness.api.fail_next_call(ApiError::BadRequest("message is not modified".to_owned())).await;

    let id = harness.next_id();
    let update = parse_update(json!({
        "update_id": id,
        "message": {"message_id": id, "chat": {"id": 42}, "text": "/start"}
    }))
    .expect("update");
    let result = harness.pipeline.process(&update).await;

    assert!(matches!(
        result,
        Err(PipelineError::Transport { method: "sendChatAction", source: ApiError::BadRequest(_) })
    ));
    assert_eq!(texts(&harness.api.take().await), vec!["error: BadRequest"]);
}

#[tokio::test]
async fn activity_log_accepts_entries_without_user() {
    let harness = Harness::new(Vec::new()).await;
    harness
        .activity
        .append(staffbot_core::audit::ActivityEntry::new(None, "", "", "{}"))
        .await
        .expect("append");

    let entries = harness.activity.recent(1).await.expect("recent");
    assert_eq!(entries[0].user_id, None);
}
