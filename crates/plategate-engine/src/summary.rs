//! Daily passage summary.

use chrono::{DateTime, Duration, Utc};
use plategate_core::{NotificationKind, Severity};
use plategate_notify::Notification;
use plategate_storage::models::PassageCounts;
use plategate_storage::repositories::PassageRepository;

use crate::error::Result;

/// Totals for the 24 hours before `now`.
pub async fn daily_counts(passages: &impl PassageRepository, now: DateTime<Utc>) -> Result<PassageCounts> {
    Ok(passages.count_by_outcome_since(now - Duration::hours(24)).await?)
}

pub fn compose(counts: &PassageCounts) -> Notification {
    let message = format!(
        "Passages in the last 24 hours: {}\n\
         Allowed: {}\n\
         Denied: {}\n\
         Manual opens: {}\n\
         Blacklist hits: {}",
        counts.total, counts.allowed, counts.denied, counts.manual_opens, counts.blacklist_hits
    );
    Notification::new(NotificationKind::DailySummary, message).with_severity(Severity::Low)
}

#[cfg(test)]
mod tests {
    use super::*;
    use plategate_core::Plate;
    use plategate_storage::Database;
    use plategate_storage::models::NewPassage;
    use plategate_storage::repositories::SqlitePassageRepository;

    #[tokio::test]
    async fn test_daily_summary_counts() {
        let db = Database::in_memory().await.unwrap();
        let passages = SqlitePassageRepository::new(db.pool().clone());
        let plate = || Some(Plate::new("A123BC777").unwrap());

        passages.record(&NewPassage::recognition(plate(), 90, "system").allowed(true)).await.unwrap();
        passages.record(&NewPassage::recognition(plate(), 90, "system")).await.unwrap();
        passages
            .record(
                &NewPassage::recognition(plate(), 90, "system")
                    .with_notes(Some("BLACKLISTED: Stolen".into())),
            )
            .await
            .unwrap();
        passages.record(&NewPassage::manual_open("guard")).await.unwrap();

        let counts = daily_counts(&passages, Utc::now()).await.unwrap();
        assert_eq!(
            counts,
            PassageCounts {
                total: 4,
                allowed: 1,
                denied: 2,
                manual_opens: 1,
                blacklist_hits: 1,
            }
        );

        let notification = compose(&counts);
        assert_eq!(notification.kind, NotificationKind::DailySummary);
        assert!(notification.message.contains("Blacklist hits: 1"));
        assert_eq!(notification.severity(), Severity::Low);
    }
}
