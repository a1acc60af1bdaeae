pub mod audit;
pub mod auth;
pub mod config;
pub mod domain;
pub mod errors;
pub mod rates;
pub mod stores;

pub use audit::{ActivityEntry, ActivityLog, InMemoryActivityLog};
pub use auth::{AccessDecision, AccessDenial, AuthDenial, AuthGate, AuthOutcome, GateError};
pub use domain::{Identity, ProofEvent, Record, RecordField, UserId};
pub use errors::{ApplicationError, InterfaceError};
pub use rates::{ExchangeRateProvider, RateError};
pub use stores::{
    Clock, IdentityStore, InMemoryIdentityStore, InMemoryRecordStore, ManualClock, RecordStore,
    StoreError, SystemClock,
};
