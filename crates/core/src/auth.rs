//! Authentication gate.
//!
//! Every inbound update except `/start` and a shared contact passes through
//! [`AuthGate::check_access`]. A contact card is a proof event and goes to
//! [`AuthGate::authenticate`], which cross-checks it against the record store
//! before provisioning or refreshing the local identity.

use std::sync::Arc;

use chrono::Duration;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::{Identity, ProofEvent, RecordField, UserId};
use crate::stores::{Clock, IdentityStore, RecordStore, StoreError};

pub const SESSION_WINDOW_DAYS: i64 = 7;

pub fn session_window() -> Duration {
    Duration::days(SESSION_WINDOW_DAYS)
}

/// Which step of the access predicate failed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum AccessDenial {
    NotRegistered,
    SessionExpired,
    RecordMissing,
    RecordUnbound,
}

impl AccessDenial {
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotRegistered => "not_registered",
            Self::SessionExpired => "session_expired",
            Self::RecordMissing => "record_missing",
            Self::RecordUnbound => "record_unbound",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AccessDecision {
    Allow(Identity),
    Deny(AccessDenial),
}

impl AccessDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allow(_))
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum AuthDenial {
    NoMatchingRecord,
    PhoneClaimed,
    ContactNotOwned,
    InvalidNameFormat { name: String },
    PhoneMismatch,
}

impl AuthDenial {
    pub fn code(&self) -> &'static str {
        match self {
            Self::NoMatchingRecord => "no_matching_record",
            Self::PhoneClaimed => "phone_claimed",
            Self::ContactNotOwned => "contact_not_owned",
            Self::InvalidNameFormat { .. } => "invalid_name_format",
            Self::PhoneMismatch => "phone_mismatch",
        }
    }

    /// Text shown to the user, `None` when the denial is silent.
    pub fn user_message(&self) -> Option<String> {
        match self {
            Self::NoMatchingRecord | Self::PhoneClaimed | Self::ContactNotOwned => {
                Some("Access denied".to_owned())
            }
            Self::InvalidNameFormat { name } => {
                Some(format!("Invalid name format. Expected <Name Surname>, got <{name}>"))
            }
            Self::PhoneMismatch => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AuthOutcome {
    Registered(Identity),
    Refreshed(Identity),
    Denied(AuthDenial),
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum GateError {
    #[error("record store lookup failed: {0}")]
    RecordStore(#[source] StoreError),
    #[error("identity store operation failed: {0}")]
    IdentityStore(#[source] StoreError),
}

pub struct AuthGate {
    records: Arc<dyn RecordStore>,
    identities: Arc<dyn IdentityStore>,
    clock: Arc<dyn Clock>,
    window: Duration,
}

impl AuthGate {
    pub fn new(
        records: Arc<dyn RecordStore>,
        identities: Arc<dyn IdentityStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self { records, identities, clock, window: session_window() }
    }

    pub fn identities(&self) -> &Arc<dyn IdentityStore> {
        &self.identities
    }

    pub fn records(&self) -> &Arc<dyn RecordStore> {
        &self.records
    }

    /// Composite predicate: registered, fresh, and still backed by a record
    /// whose phone number is bound to a local identity. Stops at the first
    /// failing step.
    pub async fn check_access(&self, user_id: UserId) -> Result<AccessDecision, GateError> {
        let Some(identity) =
            self.identities.find_by_user_id(user_id).await.map_err(GateError::IdentityStore)?
        else {
            return Ok(AccessDecision::Deny(AccessDenial::NotRegistered));
        };

        if !identity.is_fresh(self.clock.now(), self.window) {
            return Ok(AccessDecision::Deny(AccessDenial::SessionExpired));
        }

        let Some(record) = self
            .records
            .get_record_by_condition(RecordField::FullName, &identity.full_name())
            .await
            .map_err(GateError::RecordStore)?
        else {
            return Ok(AccessDecision::Deny(AccessDenial::RecordMissing));
        };

        let bound = self
            .identities
            .find_by_phone(&record.phone_number)
            .await
            .map_err(GateError::IdentityStore)?;
        if bound.is_none() {
            return Ok(AccessDecision::Deny(AccessDenial::RecordUnbound));
        }

        Ok(AccessDecision::Allow(identity))
    }

    pub async fn authenticate(&self, proof: &ProofEvent) -> Result<AuthOutcome, GateError> {
        let Some(record) = self
            .records
            .get_record_by_condition(RecordField::PhoneNumber, &proof.phone_number)
            .await
            .map_err(GateError::RecordStore)?
        else {
            return Ok(AuthOutcome::Denied(AuthDenial::NoMatchingRecord));
        };

        let claimed = self
            .identities
            .find_by_phone(&proof.phone_number)
            .await
            .map_err(GateError::IdentityStore)?;
        if claimed.is_some_and(|owner| owner.user_id != proof.user_id) {
            return Ok(AuthOutcome::Denied(AuthDenial::PhoneClaimed));
        }

        // A card without an account link proves nothing about the sender.
        if proof.contact_user_id != Some(proof.user_id) {
            return Ok(AuthOutcome::Denied(AuthDenial::ContactNotOwned));
        }

        let Some((first_name, last_name)) = record.split_name() else {
            return Ok(AuthOutcome::Denied(AuthDenial::InvalidNameFormat {
                name: record.full_name.trim().to_owned(),
            }));
        };

        let record_phone = record.phone_number.trim();
        if record_phone != proof.phone_number.trim() {
            return Ok(AuthOutcome::Denied(AuthDenial::PhoneMismatch));
        }

        let known_by_name = self
            .identities
            .find_by_name(&first_name, &last_name)
            .await
            .map_err(GateError::IdentityStore)?
            .is_some();

        self.identities
            .upsert_authorization(Identity {
                user_id: proof.user_id,
                phone_number: record_phone.to_owned(),
                first_name,
                last_name,
                authorized_at: Some(self.clock.now()),
            })
            .await
            .map_err(GateError::IdentityStore)?;

        let identity = self
            .identities
            .find_by_user_id(proof.user_id)
            .await
            .map_err(GateError::IdentityStore)?
            .ok_or_else(|| {
                GateError::IdentityStore(StoreError::Malformed(format!(
                    "identity {} missing right after upsert",
                    proof.user_id
                )))
            })?;

        Ok(if known_by_name {
            AuthOutcome::Refreshed(identity)
        } else {
            AuthOutcome::Registered(identity)
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::{Duration, TimeZone, Utc};

    use super::{AccessDecision, AccessDenial, AuthDenial, AuthGate, AuthOutcome};
    use crate::domain::{Identity, ProofEvent, Record, UserId};
    use crate::stores::{
        Clock, IdentityStore, InMemoryIdentityStore, InMemoryRecordStore, ManualClock,
    };

    struct Harness {
        gate: AuthGate,
        records: Arc<InMemoryRecordStore>,
        identities: Arc<InMemoryIdentityStore>,
        clock: Arc<ManualClock>,
    }

    fn harness(records: Vec<Record>) -> Harness {
        let records = Arc::new(InMemoryRecordStore::with_records(records));
        let identities = Arc::new(InMemoryIdentityStore::default());
        let start = Utc.with_ymd_and_hms(2026, 5, 4, 9, 30, 0).single().expect("valid time");
        let clock = Arc::new(ManualClock::new(start));
        let gate = AuthGate::new(records.clone(), identities.clone(), clock.clone());
        Harness { gate, records, identities, clock }
    }

    fn jane() -> Record {
        Record {
            full_name: "Jane Doe".to_owned(),
            phone_number: "+32123".to_owned(),
            salary: "1500 EUR".to_owned(),
            day_off_balance: "5".to_owned(),
        }
    }

    fn proof(user_id: i64, phone_number: &str) -> ProofEvent {
        ProofEvent {
            user_id: UserId(user_id),
            phone_number: phone_number.to_owned(),
            contact_user_id: Some(UserId(user_id)),
            asserted_name: Some("Jane".to_owned()),
        }
    }

    #[tokio::test]
    async fn unknown_user_is_denied() {
        let h = harness(vec![jane()]);
        let decision = h.gate.check_access(UserId(404)).await.expect("check");
        assert_eq!(decision, AccessDecision::Deny(AccessDenial::NotRegistered));
    }

    #[tokio::test]
    async fn first_valid_proof_registers_identity() {
        let h = harness(vec![jane()]);
        let now = h.clock.now();

        let outcome = h.gate.authenticate(&proof(42, "+32123")).await.expect("authenticate");

        let expected = Identity {
            user_id: UserId(42),
            phone_number: "+32123".to_owned(),
            first_name: "Jane".to_owned(),
            last_name: "Doe".to_owned(),
            authorized_at: Some(now),
        };
        assert_eq!(outcome, AuthOutcome::Registered(expected));
        assert!(h.gate.check_access(UserId(42)).await.expect("check").is_allowed());
    }

    #[tokio::test]
    async fn repeated_proofs_refresh_with_increasing_timestamps() {
        let h = harness(vec![jane()]);
        h.gate.authenticate(&proof(42, "+32123")).await.expect("register");

        h.clock.advance(Duration::seconds(1));
        let first = h.gate.authenticate(&proof(42, "+32123")).await.expect("first refresh");
        h.clock.advance(Duration::seconds(1));
        let second = h.gate.authenticate(&proof(42, "+32123")).await.expect("second refresh");

        let (AuthOutcome::Refreshed(first), AuthOutcome::Refreshed(second)) = (first, second)
        else {
            panic!("both proofs should refresh the identity");
        };
        assert!(second.authorized_at > first.authorized_at);
    }

    #[tokio::test]
    async fn session_window_boundary_is_enforced() {
        let h = harness(vec![jane()]);
        h.gate.authenticate(&proof(42, "+32123")).await.expect("register");

        h.clock.advance(Duration::days(7) - Duration::seconds(1));
        assert!(h.gate.check_access(UserId(42)).await.expect("check").is_allowed());

        h.clock.advance(Duration::seconds(2));
        assert_eq!(
            h.gate.check_access(UserId(42)).await.expect("check"),
            AccessDecision::Deny(AccessDenial::SessionExpired)
        );
    }

    #[tokio::test]
    async fn removed_record_revokes_fresh_session() {
        let h = harness(vec![jane()]);
        h.gate.authenticate(&proof(42, "+32123")).await.expect("register");

        h.records.remove_by_name("Jane Doe").await;

        assert_eq!(
            h.gate.check_access(UserId(42)).await.expect("check"),
            AccessDecision::Deny(AccessDenial::RecordMissing)
        );
    }

    #[tokio::test]
    async fn record_with_new_phone_is_unbound_until_reproved() {
        let h = harness(vec![jane()]);
        h.gate.authenticate(&proof(42, "+32123")).await.expect("register");

        h.records.remove_by_name("Jane Doe").await;
        h.records.insert(Record { phone_number: "+32999".to_owned(), ..jane() }).await;

        assert_eq!(
            h.gate.check_access(UserId(42)).await.expect("check"),
            AccessDecision::Deny(AccessDenial::RecordUnbound)
        );
    }

    #[tokio::test]
    async fn never_authorized_identity_is_expired() {
        let h = harness(vec![jane()]);
        h.identities
            .upsert_authorization(Identity {
                user_id: UserId(42),
                phone_number: "+32123".to_owned(),
                first_name: "Jane".to_owned(),
                last_name: "Doe".to_owned(),
                authorized_at: None,
            })
            .await
            .expect("seed");

        assert_eq!(
            h.gate.check_access(UserId(42)).await.expect("check"),
            AccessDecision::Deny(AccessDenial::SessionExpired)
        );
    }

    #[tokio::test]
    async fn unknown_phone_is_denied() {
        let h = harness(vec![jane()]);
        let outcome = h.gate.authenticate(&proof(42, "+10000")).await.expect("authenticate");
        assert_eq!(outcome, AuthOutcome::Denied(AuthDenial::NoMatchingRecord));
        assert!(h.identities.all().await.is_empty());
    }

    #[tokio::test]
    async fn phone_claimed_by_other_user_is_denied_without_mutation() {
        let h = harness(vec![jane()]);
        h.gate.authenticate(&proof(1, "+32123")).await.expect("register A");

        let outcome = h.gate.authenticate(&proof(2, "+32123")).await.expect("authenticate B");

        assert_eq!(outcome, AuthOutcome::Denied(AuthDenial::PhoneClaimed));
        assert!(h.identities.find_by_user_id(UserId(2)).await.expect("find").is_none());
    }

    #[tokio::test]
    async fn foreign_contact_card_is_denied() {
        let h = harness(vec![jane()]);
        let forwarded = ProofEvent { contact_user_id: Some(UserId(99)), ..proof(42, "+32123") };

        let outcome = h.gate.authenticate(&forwarded).await.expect("authenticate");

        assert_eq!(outcome, AuthOutcome::Denied(AuthDenial::ContactNotOwned));
        assert!(h.identities.all().await.is_empty());
    }

    #[tokio::test]
    async fn contact_card_without_account_link_is_denied() {
        let h = harness(vec![jane()]);
        let typed_in = ProofEvent { contact_user_id: None, ..proof(666, "+32123") };

        let outcome = h.gate.authenticate(&typed_in).await.expect("authenticate");

        assert_eq!(outcome, AuthOutcome::Denied(AuthDenial::ContactNotOwned));
        assert!(h.identities.all().await.is_empty());
        assert_eq!(
            h.gate.check_access(UserId(666)).await.expect("check"),
            AccessDecision::Deny(AccessDenial::NotRegistered)
        );
    }

    #[tokio::test]
    async fn single_token_name_is_rejected_with_offending_value() {
        let h = harness(vec![Record { full_name: "Madonna".to_owned(), ..jane() }]);

        let outcome = h.gate.authenticate(&proof(42, "+32123")).await.expect("authenticate");

        let AuthOutcome::Denied(denial) = outcome else {
            panic!("malformed name must be denied");
        };
        assert_eq!(denial, AuthDenial::InvalidNameFormat { name: "Madonna".to_owned() });
        assert_eq!(
            denial.user_message().as_deref(),
            Some("Invalid name format. Expected <Name Surname>, got <Madonna>")
        );
    }

    #[tokio::test]
    async fn whitespace_padded_phone_finds_no_record() {
        let h = harness(vec![jane()]);

        let outcome = h.gate.authenticate(&proof(42, " +32123")).await.expect("authenticate");

        assert_eq!(outcome, AuthOutcome::Denied(AuthDenial::NoMatchingRecord));
        assert!(h.identities.all().await.is_empty());
    }

    #[tokio::test]
    async fn mismatched_phone_after_trim_is_denied_silently() {
        struct LooseRecords(Record);

        #[async_trait::async_trait]
        impl crate::stores::RecordStore for LooseRecords {
            async fn get_record_by_condition(
                &self,
                _field: crate::domain::RecordField,
                _value: &str,
            ) -> Result<Option<Record>, crate::stores::StoreError> {
                Ok(Some(self.0.clone()))
            }
        }

        let identities = Arc::new(InMemoryIdentityStore::default());
        let gate = AuthGate::new(
            Arc::new(LooseRecords(Record { phone_number: "+32124".to_owned(), ..jane() })),
            identities.clone(),
            Arc::new(ManualClock::new(Utc::now())),
        );

        let outcome = gate.authenticate(&proof(42, "+32123")).await.expect("authenticate");

        assert_eq!(outcome, AuthOutcome::Denied(AuthDenial::PhoneMismatch));
        assert_eq!(AuthDenial::PhoneMismatch.user_message(), None);
        assert!(identities.all().await.is_empty());
    }
}
