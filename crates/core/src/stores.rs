use std::collections::BTreeMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use thiserror::Error;
use tokio::sync::RwLock;

use crate::domain::{Identity, Record, RecordField, UserId};

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),
    #[error("store returned malformed data: {0}")]
    Malformed(String),
}

/// Authoritative employee rows (the shared spreadsheet).
#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn get_record_by_condition(
        &self,
        field: RecordField,
        value: &str,
    ) -> Result<Option<Record>, StoreError>;
}

/// Locally cached identities of users who proved their phone number.
#[async_trait]
pub trait IdentityStore: Send + Sync {
    async fn find_by_user_id(&self, user_id: UserId) -> Result<Option<Identity>, StoreError>;

    async fn find_by_phone(&self, phone_number: &str) -> Result<Option<Identity>, StoreError>;

    async fn find_by_name(
        &self,
        first_name: &str,
        last_name: &str,
    ) -> Result<Option<Identity>, StoreError>;

    /// Inserts the identity, or refreshes `phone_number` and `authorized_at`
    /// when a row for the same user id already exists. Names are kept.
    async fn upsert_authorization(&self, identity: Identity) -> Result<(), StoreError>;
}

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Test clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self { now: Mutex::new(now) }
    }

    pub fn advance(&self, by: Duration) {
        match self.now.lock() {
            Ok(mut now) => *now += by,
            Err(poisoned) => *poisoned.into_inner() += by,
        }
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        match self.now.lock() {
            Ok(now) => *now,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }
}

#[derive(Default)]
pub struct InMemoryRecordStore {
    records: RwLock<Vec<Record>>,
}

impl InMemoryRecordStore {
    pub fn with_records(records: Vec<Record>) -> Self {
        Self { records: RwLock::new(records) }
    }

    pub async fn insert(&self, record: Record) {
        self.records.write().await.push(record);
    }

    pub async fn remove_by_name(&self, full_name: &str) {
        self.records.write().await.retain(|record| record.full_name != full_name);
    }
}

#[async_trait]
impl RecordStore for InMemoryRecordStore {
    async fn get_record_by_condition(
        &self,
        field: RecordField,
        value: &str,
    ) -> Result<Option<Record>, StoreError> {
        let records = self.records.read().await;
        Ok(records.iter().find(|record| record.field(field) == value).cloned())
    }
}

#[derive(Default)]
pub struct InMemoryIdentityStore {
    identities: RwLock<BTreeMap<UserId, Identity>>,
}

impl InMemoryIdentityStore {
    pub async fn all(&self) -> Vec<Identity> {
        self.identities.read().await.values().cloned().collect()
    }
}

#[async_trait]
impl IdentityStore for InMemoryIdentityStore {
    async fn find_by_user_id(&self, user_id: UserId) -> Result<Option<Identity>, StoreError> {
        Ok(self.identities.read().await.get(&user_id).cloned())
    }

    async fn find_by_phone(&self, phone_number: &str) -> Result<Option<Identity>, StoreError> {
        let identities = self.identities.read().await;
        Ok(identities.values().find(|identity| identity.phone_number == phone_number).cloned())
    }

    async fn find_by_name(
        &self,
        first_name: &str,
        last_name: &str,
    ) -> Result<Option<Identity>, StoreError> {
        let identities = self.identities.read().await;
        Ok(identities
            .values()
            .find(|identity| identity.first_name == first_name && identity.last_name == last_name)
            .cloned())
    }

    async fn upsert_authorization(&self, identity: Identity) -> Result<(), StoreError> {
        let mut identities = self.identities.write().await;
        match identities.get_mut(&identity.user_id) {
            Some(existing) => {
                existing.phone_number = identity.phone_number;
                existing.authorized_at = identity.authorized_at;
            }
            None => {
                identities.insert(identity.user_id, identity);
            }
        }
        Ok(())
    }
}
