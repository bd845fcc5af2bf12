use crate::error::Result;
use crate::ledger::{month_bounds, month_start};
use crate::notifier::{detect, JobReport, Notifier};
use crate::retry::retry_with_backoff;
use crate::utils::Formatter;
use chrono::{DateTime, Utc};
use log::{info, warn};
use std::collections::HashMap;

impl Notifier {
    /// Monthly report: current month-to-date against the prior full month,
    /// plus recurring budget excesses over the last 3 full months. Silent
    /// for users with nothing flagged.
    pub async fn run_monthly(&self, now: DateTime<Utc>) -> Result<JobReport> {
        let mut report = JobReport::default();

        for user in self.db.all_users().await? {
            match self.monthly_for_user(&user.user_id, now).await {
                Ok(true) => report.notified += 1,
                Ok(false) => report.skipped += 1,
                Err(e) => {
                    warn!("Monthly report failed for user {}: {e}", user.user_id);
                    report.skipped += 1;
                }
            }
        }

        info!(
            "Monthly report: {} notified, {} skipped",
            report.notified, report.skipped
        );
        Ok(report)
    }

    async fn monthly_for_user(&self, user_id: &str, now: DateTime<Utc>) -> Result<bool> {
        let Some(chat) = Self::chat_of(user_id) else {
            warn!("User id '{user_id}' is not a chat id, skipping");
            return Ok(false);
        };

        let current = self
            .db
            .totals_by_category(user_id, Some(month_start(self.tz, now)), None)
            .await?;
        let (prior_start, prior_end) = month_bounds(self.tz, now, 1);
        let previous = self
            .db
            .totals_by_category(user_id, Some(prior_start), Some(prior_end))
            .await?;

        let increases = detect::unusual_increases(&previous, &current);

        let budgets = self.db.list_budgets(user_id).await?;
        let mut months: Vec<HashMap<String, i64>> = Vec::with_capacity(3);
        for back in 1..=3 {
            let (from, to) = month_bounds(self.tz, now, back);
            months.push(
                self.db
                    .totals_by_category(user_id, Some(from), Some(to))
                    .await?,
            );
        }
        let excesses = detect::frequent_excesses(&months, &budgets);

        if increases.is_empty() && excesses.is_empty() {
            return Ok(false);
        }

        let mut text = String::from("📈 *Informe mensual de gastos:*\n");

        if !increases.is_empty() {
            text.push_str("\n🔺 *Aumentos inusuales frente al mes pasado:*\n");
            for hit in &increases {
                text.push_str(&format!(
                    "• {}: {} → {} ({})\n",
                    Formatter::capitalize(&hit.category),
                    Formatter::pesos(hit.previous),
                    Formatter::pesos(hit.current),
                    Formatter::percent_variation(hit.previous, hit.current),
                ));
            }
        }

        if !excesses.is_empty() {
            text.push_str(&format!(
                "\n🚨 *Presupuesto superado con frecuencia (últimos 3 meses):*\n• {}\n\
                 \nConsidera ajustar esos límites con /presupuesto.",
                excesses
                    .iter()
                    .map(|c| Formatter::capitalize(c))
                    .collect::<Vec<_>>()
                    .join("\n• ")
            ));
        }

        let gateway = self.gateway.clone();
        retry_with_backoff(
            || gateway.send_message(chat, &text, None),
            self.retry.clone(),
            "monthly_report_send",
        )
        .await?;

        Ok(true)
    }
}
