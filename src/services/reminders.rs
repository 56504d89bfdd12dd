use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::Mutex;

use crate::models::candidature::{Candidature, CandidatureStatus};
use crate::utils::time;

pub const RECOMMENDED_AFTER_DAYS: i64 = 7;
pub const OVERDUE_AFTER_DAYS: i64 = 14;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReminderKind {
    FollowUpRecommended,
    FollowUpOverdue,
}

impl ReminderKind {
    fn key_prefix(&self) -> &'static str {
        match self {
            ReminderKind::FollowUpRecommended => "follow-up",
            ReminderKind::FollowUpOverdue => "overdue",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Reminder {
    /// Same candidature and kind always give the same key.
    pub key: String,
    pub kind: ReminderKind,
    pub candidature_id: i64,
    pub title: String,
    pub message: String,
    pub age_days: i64,
    pub generated_at: DateTime<Utc>,
    pub read: bool,
}

pub fn reminder_key(kind: ReminderKind, candidature_id: i64) -> String {
    format!("{}-{}", kind.key_prefix(), candidature_id)
}

/// Follow-up notices for sent candidatures that have waited too long.
pub fn derive(candidatures: &[Candidature], now: DateTime<Utc>) -> Vec<Reminder> {
    candidatures
        .iter()
        .filter(|c| c.status == CandidatureStatus::Sent)
        .filter_map(|c| {
            let age_days = time::days_between(time::start_of_day(c.submitted_on), now).floor() as i64;
            let (kind, title, message) = if (RECOMMENDED_AFTER_DAYS..=OVERDUE_AFTER_DAYS)
                .contains(&age_days)
            {
                (
                    ReminderKind::FollowUpRecommended,
                    "Follow-up recommended".to_string(),
                    format!(
                        "Time to follow up with {} about the {} position",
                        c.company, c.job_title
                    ),
                )
            } else if age_days > OVERDUE_AFTER_DAYS {
                (
                    ReminderKind::FollowUpOverdue,
                    "Follow-up overdue".to_string(),
                    format!("No answer from {} for {} days", c.company, age_days),
                )
            } else {
                return None;
            };

            Some(Reminder {
                key: reminder_key(kind, c.id),
                kind,
                candidature_id: c.id,
                title,
                message,
                age_days,
                generated_at: now,
                read: false,
            })
        })
        .collect()
}

#[derive(Debug, Default)]
struct SessionState {
    reminders: BTreeMap<String, Reminder>,
    dismissed: HashSet<String>,
}

/// Read and dismissed flags for the lifetime of the process only.
#[derive(Clone, Default)]
pub struct ReminderSession {
    state: Arc<Mutex<SessionState>>,
}

impl ReminderSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds reminders not seen yet, keeping the flags of known ones.
    pub async fn refresh(&self, derived: Vec<Reminder>) -> Vec<Reminder> {
        let mut state = self.state.lock().await;
        for reminder in derived {
            if state.dismissed.contains(&reminder.key) {
                continue;
            }
            state
                .reminders
                .entry(reminder.key.clone())
                .or_insert(reminder);
        }
        state.reminders.values().cloned().collect()
    }

    pub async fn mark_read(&self, key: &str) -> bool {
        let mut state = self.state.lock().await;
        match state.reminders.get_mut(key) {
            Some(reminder) => {
                reminder.read = true;
                true
            }
            None => false,
        }
    }

    pub async fn dismiss(&self, key: &str) -> bool {
        let mut state = self.state.lock().await;
        let removed = state.reminders.remove(key).is_some();
        if removed {
            state.dismissed.insert(key.to_string());
        }
        removed
    }

    pub async fn unread_count(&self) -> usize {
        self.state
            .lock()
            .await
            .reminders
            .values()
            .filter(|r| !r.read)
            .count()
    }
}
