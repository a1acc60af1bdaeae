use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tracing::debug;

use staffbot_core::config::{ContentConfig, PaidHoliday};
use staffbot_core::domain::{Identity, Record, RecordField};
use staffbot_core::rates::{rate_change_summary, ExchangeRateProvider};
use staffbot_core::stores::{Clock, RecordStore, StoreError};

use crate::api::{EditMessageText, Outbound, ParseMode, SendMessage, SendPhoto};
use crate::keyboards::{
    back_to_main_keyboard, day_offs_menu_keyboard, main_menu_keyboard, website_keyboard,
    InlineKeyboardMarkup,
};

pub const MENU_PROMPT: &str = "Choose an option:";

/// Callback tags carried by inline keyboard buttons.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MenuAction {
    Main,
    DayOffsMenu,
    DayOffsMine,
    DayOffsPaid,
    Salary,
    Currency,
    AboutUs,
    Help,
}

impl MenuAction {
    pub const ALL: [Self; 8] = [
        Self::Main,
        Self::DayOffsMenu,
        Self::DayOffsMine,
        Self::DayOffsPaid,
        Self::Salary,
        Self::Currency,
        Self::AboutUs,
        Self::Help,
    ];

    pub fn tag(&self) -> &'static str {
        match self {
            Self::Main => "main",
            Self::DayOffsMenu => "day_offs_menu",
            Self::DayOffsMine => "day_offs_mine",
            Self::DayOffsPaid => "day_offs_paid",
            Self::Salary => "salary",
            Self::Currency => "currency",
            Self::AboutUs => "about_us",
            Self::Help => "help",
        }
    }

    pub fn from_tag(tag: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|action| action.tag() == tag)
    }
}

/// The callback being answered and the identity the gate let through.
#[derive(Clone, Debug)]
pub struct MenuRequest {
    pub identity: Identity,
    pub callback_query_id: String,
    pub chat_id: i64,
    pub message_id: Option<i64>,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MenuError {
    #[error("no record is bound to phone number `{0}`")]
    RecordMissing(String),
    #[error(transparent)]
    Store(#[from] StoreError),
}

#[async_trait]
pub trait MenuHandler: Send + Sync {
    fn action(&self) -> MenuAction;
    async fn handle(&self, request: &MenuRequest) -> Result<Vec<Outbound>, MenuError>;
}

#[derive(Default)]
pub struct MenuDispatcher {
    handlers: HashMap<MenuAction, Arc<dyn MenuHandler>>,
}

impl MenuDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<H>(&mut self, handler: H)
    where
        H: MenuHandler + 'static,
    {
        self.handlers.insert(handler.action(), Arc::new(handler));
    }

    pub async fn dispatch(
        &self,
        action: MenuAction,
        request: &MenuRequest,
    ) -> Result<Vec<Outbound>, MenuError> {
        let Some(handler) = self.handlers.get(&action) else {
            debug!(callback = action.tag(), "no handler registered for menu action");
            return Ok(Vec::new());
        };

        handler.handle(request).await
    }

    pub fn handler_count(&self) -> usize {
        self.handlers.len()
    }
}

/// Collaborators the standard menu reads from.
#[derive(Clone)]
pub struct MenuServices {
    pub records: Arc<dyn RecordStore>,
    pub rates: Arc<dyn ExchangeRateProvider>,
    pub clock: Arc<dyn Clock>,
    pub content: ContentConfig,
}

pub fn standard_menu(services: MenuServices) -> MenuDispatcher {
    let mut dispatcher = MenuDispatcher::new();
    dispatcher.register(KeyboardScreenHandler { action: MenuAction::Main, keyboard: main_menu_keyboard });
    dispatcher.register(KeyboardScreenHandler {
        action: MenuAction::DayOffsMenu,
        keyboard: day_offs_menu_keyboard,
    });
    dispatcher.register(DayOffsMineHandler { records: services.records.clone() });
    dispatcher.register(PaidHolidaysHandler { holidays: services.content.paid_holidays.clone() });
    dispatcher.register(SalaryHandler { records: services.records });
    dispatcher.register(CurrencyHandler { rates: services.rates, clock: services.clock });
    dispatcher.register(AboutUsHandler {
        about_info: services.content.about_info.clone(),
        website: services.content.about_website.clone(),
        logo_path: services.content.logo_path.clone(),
    });
    dispatcher.register(HelpHandler { help_text: services.content.help_text });
    dispatcher
}

/// Replaces the callback's message, or sends a fresh one when Telegram did not
/// include the original message.
fn replace_screen(
    request: &MenuRequest,
    text: String,
    parse_mode: Option<ParseMode>,
    keyboard: InlineKeyboardMarkup,
) -> Outbound {
    match request.message_id {
        Some(message_id) => Outbound::EditMessageText(EditMessageText {
            chat_id: request.chat_id,
            message_id,
            text,
            parse_mode,
            reply_markup: Some(keyboard),
        }),
        None => Outbound::SendMessage(SendMessage {
            chat_id: request.chat_id,
            text,
            parse_mode,
            reply_markup: Some(keyboard.into()),
        }),
    }
}

async fn caller_record(
    records: &dyn RecordStore,
    identity: &Identity,
) -> Result<Record, MenuError> {
    records
        .get_record_by_condition(RecordField::PhoneNumber, &identity.phone_number)
        .await?
        .ok_or_else(|| MenuError::RecordMissing(identity.phone_number.clone()))
}

struct KeyboardScreenHandler {
    action: MenuAction,
    keyboard: fn() -> InlineKeyboardMarkup,
}

#[async_trait]
impl MenuHandler for KeyboardScreenHandler {
    fn action(&self) -> MenuAction {
        self.action
    }

    async fn handle(&self, request: &MenuRequest) -> Result<Vec<Outbound>, MenuError> {
        Ok(vec![replace_screen(request, MENU_PROMPT.to_owned(), None, (self.keyboard)())])
    }
}

pub struct DayOffsMineHandler {
    records: Arc<dyn RecordStore>,
}

#[async_trait]
impl MenuHandler for DayOffsMineHandler {
    fn action(&self) -> MenuAction {
        MenuAction::DayOffsMine
    }

    async fn handle(&self, request: &MenuRequest) -> Result<Vec<Outbound>, MenuError> {
        let record = caller_record(self.records.as_ref(), &request.identity).await?;
        let text = format!("You have {} day-offs left", record.day_off_balance);
        Ok(vec![Outbound::alert(&request.callback_query_id, text)])
    }
}

pub struct PaidHolidaysHandler {
    holidays: Vec<PaidHoliday>,
}

pub fn paid_holidays_text(holidays: &[PaidHoliday]) -> String {
    let lines: Vec<String> =
        holidays.iter().map(|holiday| format!("{} - {}", holiday.name, holiday.date)).collect();
    format!("*Paid day-offs:*\n{}", lines.join("\n"))
}

#[async_trait]
impl MenuHandler for PaidHolidaysHandler {
    fn action(&self) -> MenuAction {
        MenuAction::DayOffsPaid
    }

    async fn handle(&self, request: &MenuRequest) -> Result<Vec<Outbound>, MenuError> {
        Ok(vec![
            Outbound::typing(request.chat_id),
            replace_screen(
                request,
                paid_holidays_text(&self.holidays),
                Some(ParseMode::Markdown),
                back_to_main_keyboard(),
            ),
        ])
    }
}

pub struct SalaryHandler {
    records: Arc<dyn RecordStore>,
}

#[async_trait]
impl MenuHandler for SalaryHandler {
    fn action(&self) -> MenuAction {
        MenuAction::Salary
    }

    async fn handle(&self, request: &MenuRequest) -> Result<Vec<Outbound>, MenuError> {
        let record = caller_record(self.records.as_ref(), &request.identity).await?;
        Ok(vec![Outbound::alert(&request.callback_query_id, record.salary)])
    }
}

pub struct CurrencyHandler {
    rates: Arc<dyn ExchangeRateProvider>,
    clock: Arc<dyn Clock>,
}

#[async_trait]
impl MenuHandler for CurrencyHandler {
    fn action(&self) -> MenuAction {
        MenuAction::Currency
    }

    async fn handle(&self, request: &MenuRequest) -> Result<Vec<Outbound>, MenuError> {
        let today = self.clock.now().date_naive();
        let text = match rate_change_summary(self.rates.as_ref(), today).await {
            Ok(summary) => summary,
            Err(error) => {
                tracing::warn!(error = %error, "exchange rate lookup failed");
                error.user_message().to_owned()
            }
        };
        Ok(vec![Outbound::alert(&request.callback_query_id, text)])
    }
}

pub struct AboutUsHandler {
    about_info: String,
    website: String,
    logo_path: PathBuf,
}

#[async_trait]
impl MenuHandler for AboutUsHandler {
    fn action(&self) -> MenuAction {
        MenuAction::AboutUs
    }

    async fn handle(&self, request: &MenuRequest) -> Result<Vec<Outbound>, MenuError> {
        let keyboard = website_keyboard(&self.website);
        let reply = if self.logo_path.is_file() {
            Outbound::SendPhoto(SendPhoto {
                chat_id: request.chat_id,
                photo: self.logo_path.clone(),
                caption: Some(self.about_info.clone()),
                reply_markup: keyboard,
            })
        } else {
            debug!(logo_path = %self.logo_path.display(), "logo missing; sending about text only");
            Outbound::SendMessage(SendMessage {
                chat_id: request.chat_id,
                text: self.about_info.clone(),
                parse_mode: None,
                reply_markup: keyboard.map(Into::into),
            })
        };
        Ok(vec![Outbound::typing(request.chat_id), reply])
    }
}

pub struct HelpHandler {
    help_text: String,
}

#[async_trait]
impl MenuHandler for HelpHandler {
    fn action(&self) -> MenuAction {
        MenuAction::Help
    }

    async fn handle(&self, request: &MenuRequest) -> Result<Vec<Outbound>, MenuError> {
        Ok(vec![
            Outbound::typing(request.chat_id),
            replace_screen(
                request,
                self.help_text.clone(),
                Some(ParseMode::Markdown),
                back_to_main_keyboard(),
            ),
        ])
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;
    use chrono::{Datelike, NaiveDate, TimeZone, Utc};
    use rust_decimal::Decimal;

    use staffbot_core::config::{AppConfig, PaidHoliday};
    use staffbot_core::domain::{Identity, Record, UserId};
    use staffbot_core::rates::{ExchangeRateProvider, RateError};
    use staffbot_core::stores::{InMemoryRecordStore, ManualClock};

    use super::{
        paid_holidays_text, standard_menu, MenuAction, MenuDispatcher, MenuError, MenuRequest,
        MenuServices,
    };
    use crate::api::{Outbound, ParseMode};

    struct FixedRates(Result<(Decimal, Decimal), RateError>);

    #[async_trait]
    impl ExchangeRateProvider for FixedRates {
        async fn rate_on(&self, date: NaiveDate) -> Result<Decimal, RateError> {
            let (previous, today) = self.0.clone()?;
            Ok(if date.day0() == 17 { today } else { previous })
        }
    }

    fn jane() -> Identity {
        Identity {
            user_id: UserId(42),
            phone_number: "+32123".to_owned(),
            first_name: "Jane".to_owned(),
            last_name: "Doe".to_owned(),
            authorized_at: None,
        }
    }

    fn request(message_id: Option<i64>) -> MenuRequest {
        MenuRequest {
            identity: jane(),
            callback_query_id: "cb-1".to_owned(),
            chat_id: 42,
            message_id,
        }
    }

    fn menu(rates: Result<(Decimal, Decimal), RateError>) -> MenuDispatcher {
        let records = InMemoryRecordStore::with_records(vec![Record {
            full_name: "Jane Doe".to_owned(),
            phone_number: "+32123".to_owned(),
            salary: "1500 EUR".to_owned(),
            day_off_balance: "5".to_owned(),
        }]);
        let mut content = AppConfig::default().content;
        content.paid_holidays = vec![
            PaidHoliday { name: "New Year's Day".to_owned(), date: "1/1".to_owned() },
            PaidHoliday { name: "Labor Day".to_owned(), date: "1/5".to_owned() },
        ];
        content.logo_path = "does/not/exist.png".into();
        content.about_website = "https://example.com".to_owned();

        standard_menu(MenuServices {
            records: Arc::new(records),
            rates: Arc::new(FixedRates(rates)),
            clock: Arc::new(ManualClock::new(
                Utc.with_ymd_and_hms(2026, 10, 18, 9, 0, 0).single().expect("valid time"),
            )),
            content,
        })
    }

    fn ok_rates() -> Result<(Decimal, Decimal), RateError> {
        Ok((Decimal::new(19_85, 2), Decimal::new(19_912, 3)))
    }

    #[test]
    fn every_tag_round_trips() {
        for action in MenuAction::ALL {
            assert_eq!(MenuAction::from_tag(action.tag()), Some(action));
        }
        assert_eq!(MenuAction::from_tag("authenticate"), None);
    }

    #[test]
    fn standard_menu_registers_all_actions() {
        assert_eq!(menu(ok_rates()).handler_count(), MenuAction::ALL.len());
    }

    #[tokio::test]
    async fn day_offs_mine_alerts_balance_from_record() {
        let replies =
            menu(ok_rates()).dispatch(MenuAction::DayOffsMine, &request(Some(7))).await.expect("ok");
        assert_eq!(replies, vec![Outbound::alert("cb-1", "You have 5 day-offs left")]);
    }

    #[tokio::test]
    async fn salary_alerts_salary_cell() {
        let replies =
            menu(ok_rates()).dispatch(MenuAction::Salary, &request(Some(7))).await.expect("ok");
        assert_eq!(replies, vec![Outbound::alert("cb-1", "1500 EUR")]);
    }

    #[tokio::test]
    async fn missing_record_is_reported() {
        let mut caller = request(Some(7));
        caller.identity.phone_number = "+999".to_owned();
        let error =
            menu(ok_rates()).dispatch(MenuAction::Salary, &caller).await.expect_err("no record");
        assert_eq!(error, MenuError::RecordMissing("+999".to_owned()));
    }

    #[tokio::test]
    async fn main_and_day_offs_menus_edit_the_message() {
        let dispatcher = menu(ok_rates());
        for action in [MenuAction::Main, MenuAction::DayOffsMenu] {
            let replies = dispatcher.dispatch(action, &request(Some(7))).await.expect("ok");
            let [Outbound::EditMessageText(edit)] = replies.as_slice() else {
                panic!("expected a single edit for {action:?}");
            };
            assert_eq!(edit.text, "Choose an option:");
            assert_eq!(edit.message_id, 7);
        }

        let replies = dispatcher.dispatch(MenuAction::Main, &request(None)).await.expect("ok");
        assert!(matches!(replies.as_slice(), [Outbound::SendMessage(_)]));
    }

    #[tokio::test]
    async fn paid_day_offs_render_markdown_list() {
        let replies =
            menu(ok_rates()).dispatch(MenuAction::DayOffsPaid, &request(Some(7))).await.expect("ok");
        assert_eq!(replies[0], Outbound::typing(42));
        let Outbound::EditMessageText(edit) = &replies[1] else {
            panic!("expected edit");
        };
        assert_eq!(edit.text, "*Paid day-offs:*\nNew Year's Day - 1/1\nLabor Day - 1/5");
        assert_eq!(edit.parse_mode, Some(ParseMode::Markdown));
        assert_eq!(paid_holidays_text(&[]), "*Paid day-offs:*\n");
    }

    #[tokio::test]
    async fn currency_formats_previous_then_today() {
        let replies =
            menu(ok_rates()).dispatch(MenuAction::Currency, &request(Some(7))).await.expect("ok");
        assert_eq!(replies, vec![Outbound::alert("cb-1", "19.85 -> 19.912")]);
    }

    #[tokio::test]
    async fn currency_failures_degrade_to_static_text() {
        let cases = [
            (RateError::Unavailable("refused".to_owned()), "Could not connect to server. Try again later"),
            (
                RateError::UnexpectedResponse("no MDL".to_owned()),
                "Error: unexpected API response. Please, contact responsible IT rep to fix this problem",
            ),
            (
                RateError::Other("tls".to_owned()),
                "Error. Please, contact responsible IT rep to fix this problem",
            ),
        ];
        for (error, text) in cases {
            let replies =
                menu(Err(error)).dispatch(MenuAction::Currency, &request(Some(7))).await.expect("ok");
            assert_eq!(replies, vec![Outbound::alert("cb-1", text)]);
        }
    }

    #[tokio::test]
    async fn about_us_falls_back_to_text_without_logo() {
        let replies =
            menu(ok_rates()).dispatch(MenuAction::AboutUs, &request(Some(7))).await.expect("ok");
        let Outbound::SendMessage(message) = &replies[1] else {
            panic!("expected text fallback");
        };
        assert_eq!(message.text, AppConfig::default().content.about_info);
        assert!(message.reply_markup.is_some());
    }

    #[tokio::test]
    async fn help_shows_configured_text_with_back_button() {
        let replies =
            menu(ok_rates()).dispatch(MenuAction::Help, &request(Some(7))).await.expect("ok");
        let Outbound::EditMessageText(edit) = &replies[1] else {
            panic!("expected edit");
        };
        assert_eq!(edit.text, AppConfig::default().content.help_text);
        let keyboard = edit.reply_markup.as_ref().expect("keyboard");
        assert_eq!(keyboard.inline_keyboard[0][0].callback_data.as_deref(), Some("main"));
    }
}
