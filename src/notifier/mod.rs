pub mod detect;
pub mod monthly;
pub mod quarterly;
pub mod scheduler;
pub mod weekly;

use crate::bot::Gateway;
use crate::database::DatabaseOperations;
use crate::retry::RetryConfig;
use chrono_tz::Tz;
use std::sync::Arc;
use teloxide::types::ChatId;

pub use scheduler::spawn_cron_job;

/// Per-run outcome of a scheduled job.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct JobReport {
    pub notified: usize,
    pub skipped: usize,
}

/// Scheduled reporting over every known user. Each job iterates
/// `all_users()` and isolates failures per user.
#[derive(Clone)]
pub struct Notifier {
    db: DatabaseOperations,
    gateway: Arc<dyn Gateway>,
    tz: Tz,
    retry: RetryConfig,
}

impl Notifier {
    pub fn new(
        db: DatabaseOperations,
        gateway: Arc<dyn Gateway>,
        tz: Tz,
        retry: RetryConfig,
    ) -> Self {
        Self {
            db,
            gateway,
            tz,
            retry,
        }
    }

    /// Private chats share the user's Telegram id.
    fn chat_of(user_id: &str) -> Option<ChatId> {
        user_id.parse::<i64>().ok().map(ChatId)
    }
}
