use chrono::{DateTime, Datelike, NaiveDate, Utc};

const SECONDS_PER_DAY: f64 = 86_400.0;

const MONTHS_FR: [&str; 12] = [
    "janvier",
    "février",
    "mars",
    "avril",
    "mai",
    "juin",
    "juillet",
    "août",
    "septembre",
    "octobre",
    "novembre",
    "décembre",
];

pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// Midnight UTC of `date`, the instant a bare submission date stands for.
pub fn start_of_day(date: NaiveDate) -> DateTime<Utc> {
    date.and_hms_opt(0, 0, 0)
        .unwrap_or_default()
        .and_utc()
}

/// Fractional days from `from` to `to`; negative when `to` is earlier.
pub fn days_between(from: DateTime<Utc>, to: DateTime<Utc>) -> f64 {
    (to - from).num_milliseconds() as f64 / 1000.0 / SECONDS_PER_DAY
}

/// Month-year label as shown to the user, e.g. `janvier 2024`.
pub fn month_label(date: NaiveDate) -> String {
    format!("{} {}", MONTHS_FR[date.month0() as usize], date.year())
}

/// Rounds halves toward positive infinity, so `-2.5` becomes `-2`.
pub fn round_half_up(value: f64) -> i64 {
    (value + 0.5).floor() as i64
}

pub fn parse_date(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").ok()
}
