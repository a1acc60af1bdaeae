pub mod identity;
pub mod record;

pub use identity::{Identity, ProofEvent, UserId};
pub use record::{Record, RecordField};
