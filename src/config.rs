use std::env;
use std::time::Duration as StdDuration;

use chrono::Duration;

use crate::error::AppError;

#[derive(Debug, Clone)]
pub struct Config {
    pub http_port: u16,
    pub log_level: String,
    pub poll_interval_secs: u64,
    pub assignment_window_start_mins: i64,
    pub assignment_window_end_mins: i64,
    pub reminder_window_start_mins: i64,
    pub reminder_window_end_mins: i64,
    pub min_reschedule_lead_mins: i64,
    pub min_booking_lead_mins: i64,
    pub max_booking_lead_days: i64,
    pub notify_timeout_ms: u64,
    pub event_buffer_size: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            http_port: 3000,
            log_level: "info".to_string(),
            poll_interval_secs: 60,
            assignment_window_start_mins: 15,
            assignment_window_end_mins: 20,
            reminder_window_start_mins: 58,
            reminder_window_end_mins: 62,
            min_reschedule_lead_mins: 30,
            min_booking_lead_mins: 30,
            max_booking_lead_days: 7,
            notify_timeout_ms: 2_000,
            event_buffer_size: 1024,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, AppError> {
        let _ = dotenvy::dotenv();
        let defaults = Config::default();

        Ok(Self {
            http_port: parse_or_default("HTTP_PORT", defaults.http_port)?,
            log_level: env::var("LOG_LEVEL").unwrap_or(defaults.log_level),
            poll_interval_secs: parse_or_default("POLL_INTERVAL_SECS", defaults.poll_interval_secs)?,
            assignment_window_start_mins: parse_or_default(
                "ASSIGNMENT_WINDOW_START_MINS",
                defaults.assignment_window_start_mins,
            )?,
            assignment_window_end_mins: parse_or_default(
                "ASSIGNMENT_WINDOW_END_MINS",
                defaults.assignment_window_end_mins,
            )?,
            reminder_window_start_mins: parse_or_default(
                "REMINDER_WINDOW_START_MINS",
                defaults.reminder_window_start_mins,
            )?,
            reminder_window_end_mins: parse_or_default(
                "REMINDER_WINDOW_END_MINS",
                defaults.reminder_window_end_mins,
            )?,
            min_reschedule_lead_mins: parse_or_default(
                "MIN_RESCHEDULE_LEAD_MINS",
                defaults.min_reschedule_lead_mins,
            )?,
            min_booking_lead_mins: parse_or_default(
                "MIN_BOOKING_LEAD_MINS",
                defaults.min_booking_lead_mins,
            )?,
            max_booking_lead_days: parse_or_default(
                "MAX_BOOKING_LEAD_DAYS",
                defaults.max_booking_lead_days,
            )?,
            notify_timeout_ms: parse_or_default("NOTIFY_TIMEOUT_MS", defaults.notify_timeout_ms)?,
            event_buffer_size: parse_or_default("EVENT_BUFFER_SIZE", defaults.event_buffer_size)?,
        })
    }

    pub fn poll_interval(&self) -> StdDuration {
        StdDuration::from_secs(self.poll_interval_secs)
    }

    pub fn notify_timeout(&self) -> StdDuration {
        StdDuration::from_millis(self.notify_timeout_ms)
    }

    pub fn min_reschedule_lead(&self) -> Duration {
        Duration::minutes(self.min_reschedule_lead_mins)
    }

    pub fn min_booking_lead(&self) -> Duration {
        Duration::minutes(self.min_booking_lead_mins)
    }

    pub fn max_booking_lead(&self) -> Duration {
        Duration::days(self.max_booking_lead_days)
    }
}

fn parse_or_default<T>(key: &str, default: T) -> Result<T, AppError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) => raw
            .parse::<T>()
            .map_err(|err| AppError::Internal(format!("invalid {key}: {err}"))),
        Err(_) => Ok(default),
    }
}
