//! Reminder eligibility for the scheduled path.
//!
//! A candidate gets the reminder only if they have no activity record today,
//! where "today" starts at midnight in the configured reference timezone —
//! never in the invoker's local zone. The boundary is inclusive: activity
//! stamped exactly at local midnight counts as today.

use chrono::{DateTime, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;

use courier_common::error::AppError;
use courier_common::types::Recipient;

use crate::store::RecipientStore;

/// The start of the current calendar day in `tz`, as a UTC instant.
pub fn start_of_reference_day(now: DateTime<Utc>, tz: Tz) -> DateTime<Utc> {
    let midnight = now.with_timezone(&tz).date_naive().and_time(NaiveTime::MIN);
    // Zones that skip midnight at a DST jump have no local midnight at all;
    // the naive instant read as UTC is the fallback.
    midnight
        .and_local_timezone(tz)
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|| Utc.from_utc_datetime(&midnight))
}

/// Select the recipients eligible for today's reminder.
///
/// The reachable-set lookup is a shared prerequisite and fails the whole
/// cycle; per-candidate activity lookups are skip-and-continue, since a
/// missed reminder is low-stakes. Every candidate is checked before the
/// caller builds any message.
pub async fn eligible_candidates(
    store: &dyn RecipientStore,
    tz: Tz,
    now: DateTime<Utc>,
) -> Result<Vec<Recipient>, AppError> {
    let candidates = store.list_reachable().await?;
    let since = start_of_reference_day(now, tz);

    tracing::debug!(
        candidates = candidates.len(),
        start_of_day = %since,
        "Checking reminder eligibility"
    );

    let mut eligible = Vec::new();
    for candidate in candidates {
        match store.has_activity_since(candidate.id, since).await {
            Ok(true) => {}
            Ok(false) => eligible.push(candidate),
            Err(e) => {
                tracing::warn!(
                    user_id = %candidate.id,
                    error = %e,
                    "Activity lookup failed, skipping candidate"
                );
            }
        }
    }

    Ok(eligible)
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::collections::{HashMap, HashSet};

    use async_trait::async_trait;
    use chrono::Duration;
    use chrono_tz::Europe::Rome;
    use uuid::Uuid;

    struct FakeStore {
        recipients: Vec<Recipient>,
        activity: HashMap<Uuid, Vec<DateTime<Utc>>>,
        failing_lookups: HashSet<Uuid>,
        fail_list: bool,
    }

    impl FakeStore {
        fn new(recipients: Vec<Recipient>) -> Self {
            Self {
                recipients,
                activity: HashMap::new(),
                failing_lookups: HashSet::new(),
                fail_list: false,
            }
        }
    }

    #[async_trait]
    impl RecipientStore for FakeStore {
        async fn resolve(&self, ids: &[Uuid]) -> Result<Vec<Recipient>, AppError> {
            Ok(self
                .recipients
                .iter()
                .filter(|r| ids.contains(&r.id))
                .cloned()
                .collect())
        }

        async fn list_reachable(&self) -> Result<Vec<Recipient>, AppError> {
            if self.fail_list {
                return Err(AppError::Lookup("store unreachable".to_string()));
            }
            Ok(self.recipients.clone())
        }

        async fn has_activity_since(
            &self,
            user_id: Uuid,
            since: DateTime<Utc>,
        ) -> Result<bool, AppError> {
            if self.failing_lookups.contains(&user_id) {
                return Err(AppError::Lookup("row decode failed".to_string()));
            }
            Ok(self
                .activity
                .get(&user_id)
                .is_some_and(|stamps| stamps.iter().any(|t| *t >= since)))
        }
    }

    fn recipient() -> Recipient {
        Recipient {
            id: Uuid::new_v4(),
            fcm_token: "token".to_string(),
            name: None,
        }
    }

    #[test]
    fn test_start_of_day_in_reference_zone() {
        // 10:00 in Rome (CEST, UTC+2) on 2025-05-10.
        let now = Utc.with_ymd_and_hms(2025, 5, 10, 8, 0, 0).unwrap();
        let start = start_of_reference_day(now, Rome);
        assert_eq!(start, Utc.with_ymd_and_hms(2025, 5, 9, 22, 0, 0).unwrap());
    }

    #[test]
    fn test_start_of_day_on_dst_transition() {
        // Rome switched to CEST on 2025-03-30 at 02:00; midnight that day
        // was still UTC+1.
        let now = Utc.with_ymd_and_hms(2025, 3, 30, 8, 0, 0).unwrap();
        let start = start_of_reference_day(now, Rome);
        assert_eq!(start, Utc.with_ymd_and_hms(2025, 3, 29, 23, 0, 0).unwrap());
    }

    #[tokio::test]
    async fn test_activity_at_midnight_is_not_eligible() {
        let candidate = recipient();
        let midnight_utc = Utc.with_ymd_and_hms(2025, 5, 9, 22, 0, 0).unwrap();
        let mut store = FakeStore::new(vec![candidate.clone()]);
        store.activity.insert(candidate.id, vec![midnight_utc]);

        let now = Utc.with_ymd_and_hms(2025, 5, 10, 8, 0, 0).unwrap();
        let eligible = eligible_candidates(&store, Rome, now).await.unwrap();
        assert!(eligible.is_empty());
    }

    #[tokio::test]
    async fn test_activity_just_before_midnight_is_eligible() {
        let candidate = recipient();
        let just_before = Utc.with_ymd_and_hms(2025, 5, 9, 21, 59, 59).unwrap()
            + Duration::milliseconds(999);
        let mut store = FakeStore::new(vec![candidate.clone()]);
        store.activity.insert(candidate.id, vec![just_before]);

        let now = Utc.with_ymd_and_hms(2025, 5, 10, 8, 0, 0).unwrap();
        let eligible = eligible_candidates(&store, Rome, now).await.unwrap();
        assert_eq!(eligible.len(), 1);
        assert_eq!(eligible[0].id, candidate.id);
    }

    #[tokio::test]
    async fn test_lookup_failure_skips_only_that_candidate() {
        let healthy = recipient();
        let broken = recipient();
        let active = recipient();

        let mut store = FakeStore::new(vec![healthy.clone(), broken.clone(), active.clone()]);
        store.failing_lookups.insert(broken.id);
        store
            .activity
            .insert(active.id, vec![Utc.with_ymd_and_hms(2025, 5, 10, 6, 0, 0).unwrap()]);

        let now = Utc.with_ymd_and_hms(2025, 5, 10, 8, 0, 0).unwrap();
        let eligible = eligible_candidates(&store, Rome, now).await.unwrap();
        assert_eq!(eligible.len(), 1);
        assert_eq!(eligible[0].id, healthy.id);
    }

    #[tokio::test]
    async fn test_reachable_set_failure_is_fatal() {
        let mut store = FakeStore::new(vec![recipient()]);
        store.fail_list = true;

        let now = Utc.with_ymd_and_hms(2025, 5, 10, 8, 0, 0).unwrap();
        let result = eligible_candidates(&store, Rome, now).await;
        assert!(matches!(result, Err(AppError::Lookup(_))));
    }
}
