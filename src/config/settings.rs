use anyhow::{anyhow, Result};
use chrono_tz::Tz;
use cron::Schedule;
use serde::{Deserialize, Serialize};
use std::env;
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    pub telegram_bot_token: String,
    pub database_url: String,
    pub bot_name: String,
    /// IANA timezone used for every month/week/quarter boundary.
    pub reporting_timezone: String,
    /// Cron expression (seconds field included) for the weekly summary job.
    pub weekly_summary_cron: String,
    /// Cron expression for the monthly alert job.
    pub monthly_report_cron: String,
    pub store_timeout_ms: u64,
    pub max_retry_attempts: u32,
    /// When a command arrives mid-flow: cancel the active flow (true) or
    /// ignore the command (false).
    pub commands_cancel_flow: bool,
    pub log_level: String,
}

impl Settings {
    pub fn new() -> Result<Self> {
        let telegram_bot_token = env::var("TELEGRAM_BOT_TOKEN")
            .map_err(|_| anyhow!("TELEGRAM_BOT_TOKEN must be set"))?;

        let database_url = env::var("DATABASE_URL").unwrap_or_else(|_| "gastobot.db".to_string());

        let bot_name = env::var("BOT_NAME").unwrap_or_else(|_| "GastoBot".to_string());

        let reporting_timezone =
            env::var("REPORTING_TIMEZONE").unwrap_or_else(|_| "America/Bogota".to_string());

        // Sundays 11:00 local time.
        let weekly_summary_cron =
            env::var("WEEKLY_SUMMARY_CRON").unwrap_or_else(|_| "0 0 11 * * Sun".to_string());

        // 1st of the month, 10:00 local time.
        let monthly_report_cron =
            env::var("MONTHLY_REPORT_CRON").unwrap_or_else(|_| "0 0 10 1 * *".to_string());

        let store_timeout_ms = env::var("STORE_TIMEOUT_MS")
            .unwrap_or_else(|_| "5000".to_string())
            .parse::<u64>()
            .unwrap_or(5000);

        let max_retry_attempts = env::var("MAX_RETRY_ATTEMPTS")
            .unwrap_or_else(|_| "3".to_string())
            .parse::<u32>()
            .unwrap_or(3);

        let commands_cancel_flow = env::var("COMMANDS_CANCEL_FLOW")
            .unwrap_or_else(|_| "true".to_string())
            .parse::<bool>()
            .unwrap_or(true);

        let log_level = env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

        Ok(Settings {
            telegram_bot_token,
            database_url,
            bot_name,
            reporting_timezone,
            weekly_summary_cron,
            monthly_report_cron,
            store_timeout_ms,
            max_retry_attempts,
            commands_cancel_flow,
            log_level,
        })
    }

    pub fn validate(&self) -> Result<()> {
        if self.telegram_bot_token.is_empty() {
            return Err(anyhow!("Telegram bot token cannot be empty"));
        }

        if self.database_url.is_empty() {
            return Err(anyhow!("Database URL cannot be empty"));
        }

        if self.reporting_timezone.parse::<Tz>().is_err() {
            return Err(anyhow!(
                "Unknown reporting timezone: {}",
                self.reporting_timezone
            ));
        }

        if Schedule::from_str(&self.weekly_summary_cron).is_err() {
            return Err(anyhow!(
                "Invalid weekly summary cron: {}",
                self.weekly_summary_cron
            ));
        }

        if Schedule::from_str(&self.monthly_report_cron).is_err() {
            return Err(anyhow!(
                "Invalid monthly report cron: {}",
                self.monthly_report_cron
            ));
        }

        if self.store_timeout_ms == 0 {
            return Err(anyhow!("Store timeout must be greater than 0"));
        }

        if self.max_retry_attempts == 0 {
            return Err(anyhow!("Max retry attempts must be greater than 0"));
        }

        Ok(())
    }

    /// Parsed reporting timezone. `validate()` must have passed.
    pub fn timezone(&self) -> Tz {
        self.reporting_timezone
            .parse::<Tz>()
            .unwrap_or(chrono_tz::America::Bogota)
    }

    pub fn store_timeout(&self) -> Duration {
        Duration::from_millis(self.store_timeout_ms)
    }
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            telegram_bot_token: String::new(),
            database_url: "gastobot.db".to_string(),
            bot_name: "GastoBot".to_string(),
            reporting_timezone: "America/Bogota".to_string(),
            weekly_summary_cron: "0 0 11 * * Sun".to_string(),
            monthly_report_cron: "0 0 10 1 * *".to_string(),
            store_timeout_ms: 5000,
            max_retry_attempts: 3,
            commands_cancel_flow: true,
            log_level: "info".to_string(),
        }
    }
}
