use crate::error::{GastoBotError, Result};
use crate::notifier::JobReport;
use chrono::Utc;
use chrono_tz::Tz;
use cron::Schedule;
use log::{error, info, warn};
use std::future::Future;
use std::str::FromStr;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::sleep;

/// Spawn a task that fires `job` at every occurrence of the cron
/// expression, evaluated in `tz`. The expression is validated up front;
/// job failures are logged and the loop keeps going.
pub fn spawn_cron_job<F, Fut>(
    name: &'static str,
    expression: &str,
    tz: Tz,
    job: F,
) -> Result<JoinHandle<()>>
where
    F: Fn() -> Fut + Send + 'static,
    Fut: Future<Output = Result<JobReport>> + Send,
{
    let schedule = Schedule::from_str(expression)
        .map_err(|e| GastoBotError::Config(anyhow::anyhow!("invalid cron '{expression}': {e}")))?;

    info!("Scheduling job '{name}' with cron '{expression}' in {tz}");

    Ok(tokio::spawn(async move {
        loop {
            let now = Utc::now().with_timezone(&tz);
            let Some(next) = schedule.after(&now).next() else {
                warn!("Job '{name}' has no future occurrence, stopping");
                return;
            };

            let wait = (next - now).to_std().unwrap_or(Duration::ZERO);
            info!("Job '{name}' sleeping until {next}");
            sleep(wait).await;

            match job().await {
                Ok(report) => info!(
                    "Job '{name}' done: {} notified, {} skipped",
                    report.notified, report.skipped
                ),
                Err(e) => error!("Job '{name}' failed: {e}"),
            }
        }
    }))
}
