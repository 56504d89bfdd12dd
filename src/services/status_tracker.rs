use chrono::{DateTime, Days, NaiveDate, Utc};

use crate::models::{
    candidature::CandidatureStatus,
    notification::{Notification, NotificationKind, NotificationStatus},
    status_history::StatusHistoryEntry,
};
use crate::services::record_store::Table;

/// Days after submission before a sent candidature deserves a follow-up.
pub const FOLLOW_UP_AFTER_DAYS: u64 = 7;

/// Appends a history entry when `next` differs from `previous`.
///
/// `previous` is `None` only when the candidature is being created, which
/// always yields an entry.
pub fn record_transition(
    history: &mut Table<StatusHistoryEntry>,
    candidature_id: i64,
    previous: Option<CandidatureStatus>,
    next: CandidatureStatus,
    at: DateTime<Utc>,
) -> Option<StatusHistoryEntry> {
    if previous == Some(next) {
        return None;
    }

    let id = history.insert_with(|id| StatusHistoryEntry {
        id,
        candidature_id,
        previous_status: previous,
        new_status: next,
        changed_at: at,
    });
    tracing::debug!(candidature_id, ?previous, %next, "Status transition recorded");
    history.get(id).cloned()
}

pub fn follow_up_date(submitted_on: NaiveDate) -> NaiveDate {
    submitted_on
        .checked_add_days(Days::new(FOLLOW_UP_AFTER_DAYS))
        .unwrap_or(submitted_on)
}

pub fn schedule_follow_up(
    notifications: &mut Table<Notification>,
    candidature_id: i64,
    submitted_on: NaiveDate,
    at: DateTime<Utc>,
) -> i64 {
    notifications.insert_with(|id| Notification {
        id,
        candidature_id,
        kind: NotificationKind::FollowUp,
        scheduled_for: follow_up_date(submitted_on),
        status: NotificationStatus::Active,
        created_at: at,
    })
}
