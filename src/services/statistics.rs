//! Dashboard figures, recomputed from the full candidature list on every
//! request. Nothing here is cached or stored.

use std::collections::BTreeMap;

use chrono::{DateTime, Datelike, Duration, Months, NaiveDate, Utc};
use serde::Serialize;

use crate::models::candidature::{Candidature, CandidatureStatus};
use crate::utils::time;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthCount {
    pub label: String,
    pub year: i32,
    pub month: u32,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthTrend {
    pub current_month: usize,
    pub previous_month: usize,
    pub change_percent: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Statistics {
    pub total: usize,
    pub by_status: BTreeMap<CandidatureStatus, usize>,
    /// Chronological, labelled in French.
    pub by_month: Vec<MonthCount>,
    pub by_company: BTreeMap<String, usize>,
    pub success_rate: i64,
    pub mean_response_days: i64,
    /// Oldest week first; the last bucket ends now.
    pub last_four_weeks: [usize; 4],
    pub trend: MonthTrend,
}

pub fn compute(candidatures: &[Candidature], now: DateTime<Utc>) -> Statistics {
    Statistics {
        total: candidatures.len(),
        by_status: count_by_status(candidatures),
        by_month: count_by_month(candidatures),
        by_company: count_by_company(candidatures),
        success_rate: success_rate(candidatures),
        mean_response_days: mean_response_days(candidatures),
        last_four_weeks: last_four_weeks(candidatures, now),
        trend: month_trend(candidatures, now),
    }
}

pub fn count_by_status(candidatures: &[Candidature]) -> BTreeMap<CandidatureStatus, usize> {
    let mut counts: BTreeMap<CandidatureStatus, usize> =
        CandidatureStatus::ALL.iter().map(|s| (*s, 0)).collect();
    for c in candidatures {
        *counts.entry(c.status).or_default() += 1;
    }
    counts
}

pub fn count_by_month(candidatures: &[Candidature]) -> Vec<MonthCount> {
    let mut counts: BTreeMap<(i32, u32), usize> = BTreeMap::new();
    for c in candidatures {
        *counts
            .entry((c.submitted_on.year(), c.submitted_on.month()))
            .or_default() += 1;
    }

    counts
        .into_iter()
        .filter_map(|((year, month), count)| {
            let first = NaiveDate::from_ymd_opt(year, month, 1)?;
            Some(MonthCount {
                label: time::month_label(first),
                year,
                month,
                count,
            })
        })
        .collect()
}

pub fn count_by_company(candidatures: &[Candidature]) -> BTreeMap<String, usize> {
    let mut counts = BTreeMap::new();
    for c in candidatures.iter().filter(|c| !c.company.is_empty()) {
        *counts.entry(c.company.clone()).or_default() += 1;
    }
    counts
}

/// Accepted plus interview offers, as a whole percent of all candidatures.
pub fn success_rate(candidatures: &[Candidature]) -> i64 {
    if candidatures.is_empty() {
        return 0;
    }
    let successes = candidatures.iter().filter(|c| c.status.is_success()).count();
    time::round_half_up(successes as f64 / candidatures.len() as f64 * 100.0)
}

/// Average days between submission and the last modification, over the
/// candidatures the company has answered.
pub fn mean_response_days(candidatures: &[Candidature]) -> i64 {
    let days: Vec<f64> = candidatures
        .iter()
        .filter(|c| c.status.has_response())
        .map(|c| {
            time::days_between(time::start_of_day(c.submitted_on), c.updated_at)
                .abs()
                .ceil()
        })
        .collect();

    if days.is_empty() {
        return 0;
    }
    time::round_half_up(days.iter().sum::<f64>() / days.len() as f64)
}

pub fn last_four_weeks(candidatures: &[Candidature], now: DateTime<Utc>) -> [usize; 4] {
    let mut weeks = [0usize; 4];
    for (slot, weeks_back) in (0..4i64).rev().enumerate() {
        let end = now - Duration::days(weeks_back * 7);
        let start = now - Duration::days(weeks_back * 7 + 7);
        weeks[slot] = candidatures
            .iter()
            .filter(|c| {
                let submitted = time::start_of_day(c.submitted_on);
                submitted >= start && submitted < end
            })
            .count();
    }
    weeks
}

pub fn month_trend(candidatures: &[Candidature], now: DateTime<Utc>) -> MonthTrend {
    let today = now.date_naive();
    let previous = today.checked_sub_months(Months::new(1)).unwrap_or(today);

    let in_month = |month: NaiveDate| {
        candidatures
            .iter()
            .filter(|c| {
                c.submitted_on.year() == month.year() && c.submitted_on.month() == month.month()
            })
            .count()
    };

    let current_month = in_month(today);
    let previous_month = in_month(previous);
    let change_percent = if previous_month > 0 {
        time::round_half_up(
            (current_month as f64 - previous_month as f64) / previous_month as f64 * 100.0,
        )
    } else {
        0
    };

    MonthTrend {
        current_month,
        previous_month,
        change_percent,
    }
}
