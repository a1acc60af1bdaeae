use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Chat-platform user id. For private chats this is also the chat id.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UserId(pub i64);

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub user_id: UserId,
    pub phone_number: String,
    pub first_name: String,
    pub last_name: String,
    pub authorized_at: Option<DateTime<Utc>>,
}

impl Identity {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    /// Fresh iff authorized strictly within `window` of `now`.
    pub fn is_fresh(&self, now: DateTime<Utc>, window: Duration) -> bool {
        self.authorized_at.is_some_and(|authorized_at| authorized_at > now - window)
    }
}

/// One-shot phone-number assertion taken from a shared contact card.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProofEvent {
    pub user_id: UserId,
    pub phone_number: String,
    pub contact_user_id: Option<UserId>,
    pub asserted_name: Option<String>,
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone, Utc};

    use super::{Identity, UserId};

    fn identity(authorized_at: Option<chrono::DateTime<Utc>>) -> Identity {
        Identity {
            user_id: UserId(42),
            phone_number: "+32123".to_owned(),
            first_name: "Jane".to_owned(),
            last_name: "Doe".to_owned(),
            authorized_at,
        }
    }

    #[test]
    fn freshness_is_strict_at_window_edge() {
        let now = Utc.with_ymd_and_hms(2026, 3, 10, 12, 0, 0).single().expect("valid time");
        let window = Duration::days(7);

        assert!(identity(Some(now - window + Duration::seconds(1))).is_fresh(now, window));
        assert!(!identity(Some(now - window)).is_fresh(now, window));
        assert!(!identity(Some(now - window - Duration::seconds(1))).is_fresh(now, window));
    }

    #[test]
    fn never_authorized_identity_is_stale() {
        let now = Utc::now();
        assert!(!identity(None).is_fresh(now, Duration::days(7)));
    }

    #[test]
    fn full_name_joins_first_and_last() {
        assert_eq!(identity(None).full_name(), "Jane Doe");
    }
}
