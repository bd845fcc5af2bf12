use anyhow::Result;
use dotenv::dotenv;
use log::{error, info};
use std::sync::Arc;
use std::time::Duration;
use teloxide::Bot;

use gastobot::bot::{start_bot, ConversationEngine, TelegramGateway};
use gastobot::config::Settings;
use gastobot::database::DatabaseOperations;
use gastobot::notifier::{spawn_cron_job, Notifier};
use gastobot::retry::RetryConfig;

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    env_logger::init();

    info!("💸 GastoBot starting up");

    let settings = Settings::new()?;
    settings.validate()?;
    let tz = settings.timezone();

    let db = match DatabaseOperations::new(&settings.database_url).await {
        Ok(db) => {
            info!("✅ Database ready at {}", settings.database_url);
            db
        }
        Err(e) => {
            error!("❌ Database initialization failed: {e}");
            return Err(e.into());
        }
    };

    let bot = Bot::new(&settings.telegram_bot_token);
    let gateway = Arc::new(TelegramGateway::new(bot.clone()));

    let engine = Arc::new(ConversationEngine::new(
        db.clone(),
        gateway.clone(),
        tz,
        settings.store_timeout(),
        settings.commands_cancel_flow,
    ));

    let retry = RetryConfig {
        max_attempts: settings.max_retry_attempts,
        base_delay: Duration::from_millis(500),
        ..RetryConfig::default()
    };
    let notifier = Notifier::new(db, gateway, tz, retry);

    let weekly = notifier.clone();
    spawn_cron_job("weekly_summary", &settings.weekly_summary_cron, tz, move || {
        let notifier = weekly.clone();
        async move { notifier.run_weekly(chrono::Utc::now()).await }
    })?;

    let monthly = notifier.clone();
    spawn_cron_job("monthly_report", &settings.monthly_report_cron, tz, move || {
        let notifier = monthly.clone();
        async move { notifier.run_monthly(chrono::Utc::now()).await }
    })?;

    info!("📊 Configuration:");
    info!("  - Bot Name: {}", settings.bot_name);
    info!("  - Timezone: {}", settings.reporting_timezone);
    info!("  - Weekly cron: {}", settings.weekly_summary_cron);
    info!("  - Monthly cron: {}", settings.monthly_report_cron);

    start_bot(&settings.telegram_bot_token, engine, &settings.bot_name).await?;

    Ok(())
}
