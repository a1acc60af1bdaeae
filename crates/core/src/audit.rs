use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::UserId;
use crate::stores::StoreError;

/// One row of the activity log, appended for every inbound update before the
/// auth gate runs.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityEntry {
    pub user_id: Option<UserId>,
    pub callback: String,
    pub message: String,
    pub raw_update: String,
    pub created_at: DateTime<Utc>,
}

impl ActivityEntry {
    pub fn new(
        user_id: Option<UserId>,
        callback: impl Into<String>,
        message: impl Into<String>,
        raw_update: impl Into<String>,
    ) -> Self {
        Self {
            user_id,
            callback: callback.into(),
            message: message.into(),
            raw_update: raw_update.into(),
            created_at: Utc::now(),
        }
    }
}

#[async_trait]
pub trait ActivityLog: Send + Sync {
    async fn append(&self, entry: ActivityEntry) -> Result<(), StoreError>;
}

#[derive(Clone, Default)]
pub struct InMemoryActivityLog {
    entries: Arc<Mutex<Vec<ActivityEntry>>>,
}

impl InMemoryActivityLog {
    pub fn entries(&self) -> Vec<ActivityEntry> {
        match self.entries.lock() {
            Ok(entries) => entries.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

#[async_trait]
impl ActivityLog for InMemoryActivityLog {
    async fn append(&self, entry: ActivityEntry) -> Result<(), StoreError> {
        match self.entries.lock() {
            Ok(mut entries) => entries.push(entry),
            Err(poisoned) => poisoned.into_inner().push(entry),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::audit::{ActivityEntry, ActivityLog, InMemoryActivityLog};
    use crate::domain::UserId;

    #[tokio::test]
    async fn in_memory_log_keeps_append_order() {
        let log = InMemoryActivityLog::default();
        log.append(ActivityEntry::new(Some(UserId(42)), "", "/start", "{}")).await.expect("append");
        log.append(ActivityEntry::new(Some(UserId(42)), "salary", "", "{}"))
            .await
            .expect("append");

        let entries = log.entries();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].message, "/start");
        assert_eq!(entries[1].callback, "salary");
        assert!(entries[0].created_at <= entries[1].created_at);
    }
}
