use serde::{Deserialize, Serialize};

use crate::menu::MenuAction;

pub mod emoji {
    pub const PALM_TREE: &str = "\u{1F334}";
    pub const EURO_BANKNOTE: &str = "\u{1F4B6}";
    pub const CHART_UPWARDS: &str = "\u{1F4C8}";
    pub const ABOUT: &str = "\u{2139}\u{FE0F}";
    pub const RAISED_HAND: &str = "\u{270B}";
    pub const AIRPLANE: &str = "\u{2708}\u{FE0F}";
    pub const SNOWMAN: &str = "\u{2603}\u{FE0F}";
    pub const BACK: &str = "\u{1F519}";
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InlineKeyboardButton {
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub callback_data: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl InlineKeyboardButton {
    pub fn callback(text: impl Into<String>, action: MenuAction) -> Self {
        Self { text: text.into(), callback_data: Some(action.tag().to_owned()), url: None }
    }

    pub fn link(text: impl Into<String>, url: impl Into<String>) -> Self {
        Self { text: text.into(), callback_data: None, url: Some(url.into()) }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InlineKeyboardMarkup {
    pub inline_keyboard: Vec<Vec<InlineKeyboardButton>>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyboardButton {
    pub text: String,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub request_contact: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplyKeyboardMarkup {
    pub keyboard: Vec<Vec<KeyboardButton>>,
    pub resize_keyboard: bool,
    pub one_time_keyboard: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ReplyMarkup {
    Inline(InlineKeyboardMarkup),
    Keyboard(ReplyKeyboardMarkup),
}

impl From<InlineKeyboardMarkup> for ReplyMarkup {
    fn from(value: InlineKeyboardMarkup) -> Self {
        Self::Inline(value)
    }
}

impl From<ReplyKeyboardMarkup> for ReplyMarkup {
    fn from(value: ReplyKeyboardMarkup) -> Self {
        Self::Keyboard(value)
    }
}

/// Lays `buttons` out in rows of `n_cols`, with an optional single header row
/// above and footer row below.
pub fn build_menu<T>(
    buttons: Vec<T>,
    n_cols: usize,
    header_buttons: Vec<T>,
    footer_buttons: Vec<T>,
) -> Vec<Vec<T>> {
    let n_cols = n_cols.max(1);
    let mut rows = Vec::new();
    if !header_buttons.is_empty() {
        rows.push(header_buttons);
    }

    let mut row = Vec::with_capacity(n_cols);
    for button in buttons {
        row.push(button);
        if row.len() == n_cols {
            rows.push(std::mem::replace(&mut row, Vec::with_capacity(n_cols)));
        }
    }
    if !row.is_empty() {
        rows.push(row);
    }

    if !footer_buttons.is_empty() {
        rows.push(footer_buttons);
    }
    rows
}

pub fn authenticate_keyboard() -> ReplyKeyboardMarkup {
    ReplyKeyboardMarkup {
        keyboard: vec![vec![KeyboardButton {
            text: "Authenticate".to_owned(),
            request_contact: true,
        }]],
        resize_keyboard: true,
        one_time_keyboard: true,
    }
}

pub fn main_menu_button() -> InlineKeyboardButton {
    InlineKeyboardButton::callback(format!("{} Main menu", emoji::BACK), MenuAction::Main)
}

pub fn main_menu_keyboard() -> InlineKeyboardMarkup {
    let header = vec![InlineKeyboardButton::callback(
        format!("{} Day-offs", emoji::PALM_TREE),
        MenuAction::DayOffsMenu,
    )];
    let buttons = vec![
        InlineKeyboardButton::callback(format!("{} Salary", emoji::EURO_BANKNOTE), MenuAction::Salary),
        InlineKeyboardButton::callback(
            format!("{} Currency", emoji::CHART_UPWARDS),
            MenuAction::Currency,
        ),
        InlineKeyboardButton::callback(format!("{} About us", emoji::ABOUT), MenuAction::AboutUs),
        InlineKeyboardButton::callback(format!("{} Help", emoji::RAISED_HAND), MenuAction::Help),
    ];

    InlineKeyboardMarkup { inline_keyboard: build_menu(buttons, 2, header, Vec::new()) }
}

pub fn day_offs_menu_keyboard() -> InlineKeyboardMarkup {
    let buttons = vec![
        InlineKeyboardButton::callback(
            format!("{} My day-offs", emoji::AIRPLANE),
            MenuAction::DayOffsMine,
        ),
        InlineKeyboardButton::callback(
            format!("{} Paid day-offs", emoji::SNOWMAN),
            MenuAction::DayOffsPaid,
        ),
    ];

    InlineKeyboardMarkup {
        inline_keyboard: build_menu(buttons, 2, Vec::new(), vec![main_menu_button()]),
    }
}

pub fn back_to_main_keyboard() -> InlineKeyboardMarkup {
    InlineKeyboardMarkup { inline_keyboard: build_menu(vec![main_menu_button()], 1, Vec::new(), Vec::new()) }
}

/// `None` when no website is configured; Telegram rejects empty URL buttons.
pub fn website_keyboard(url: &str) -> Option<InlineKeyboardMarkup> {
    if url.trim().is_empty() {
        return None;
    }
    Some(InlineKeyboardMarkup {
        inline_keyboard: build_menu(
            vec![InlineKeyboardButton::link("Website", url)],
            1,
            Vec::new(),
            Vec::new(),
        ),
    })
}
