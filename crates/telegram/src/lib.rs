//! Telegram interface for staffbot
//!
//! - **Polling** (`polling`) - `getUpdates` long-poll loop with backoff
//! - **Events** (`events`) - activity logging, auth gate and routing per update
//! - **Menu** (`menu`) - inline keyboard callbacks and their handlers
//! - **Keyboards** (`keyboards`) - reply and inline keyboard builders
//! - **Api** (`api`) - Bot API wire types and the HTTP client
//!
//! # Architecture
//!
//! ```text
//! getUpdates → PollingRunner → EventPipeline → AuthGate
//!                                   ↓             ↓
//!                             ActivityLog    MenuDispatcher → handlers
//!                                                 ↓
//!                                   BotApi ← Outbound replies
//! ```

pub mod api;
pub mod events;
pub mod keyboards;
pub mod menu;
pub mod polling;

pub use api::{ApiError, BotApi, HttpBotApi, Outbound, Update};
pub use events::{EventPipeline, PipelineError, PipelineOutcome};
pub use menu::{standard_menu, MenuAction, MenuDispatcher, MenuServices};
pub use polling::{PollingError, PollingRunner, ReconnectPolicy};
