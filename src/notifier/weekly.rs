use crate::notifier::{detect, JobReport, Notifier};
use crate::retry::retry_with_backoff;
use crate::utils::Formatter;
use chrono::{DateTime, Datelike, Utc};
use log::{info, warn};

use crate::error::Result;
use crate::ledger::months_between;

impl Notifier {
    /// Weekly summary: all-time totals per category with their budget
    /// standing. On the 1st of a month that completes a quarter since the
    /// user's first interaction, the quarterly evaluation runs too.
    pub async fn run_weekly(&self, now: DateTime<Utc>) -> Result<JobReport> {
        let mut report = JobReport::default();

        for user in self.db.all_users().await? {
            match self.weekly_for_user(&user.user_id, user.start_date, now).await {
                Ok(true) => report.notified += 1,
                Ok(false) => report.skipped += 1,
                Err(e) => {
                    warn!("Weekly summary failed for user {}: {e}", user.user_id);
                    report.skipped += 1;
                }
            }
        }

        info!(
            "Weekly summary: {} notified, {} skipped",
            report.notified, report.skipped
        );
        Ok(report)
    }

    async fn weekly_for_user(
        &self,
        user_id: &str,
        start_date: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> Result<bool> {
        let Some(chat) = Self::chat_of(user_id) else {
            warn!("User id '{user_id}' is not a chat id, skipping");
            return Ok(false);
        };
        let Some(start) = start_date else {
            warn!("User {user_id} has no start date, skipping");
            return Ok(false);
        };

        let totals = self.db.totals_by_category(user_id, None, None).await?;
        if totals.is_empty() {
            return Ok(false);
        }
        let budgets = self.db.list_budgets(user_id).await?;

        let mut lines: Vec<String> = Vec::with_capacity(totals.len());
        let mut categories: Vec<&String> = totals.keys().collect();
        categories.sort();

        for category in categories {
            let spent = totals[category];
            let line = match budgets.iter().find(|b| &b.category == category) {
                Some(budget) if spent > budget.limit => format!(
                    "• {}: {} — 🚨 superaste el límite de {} por {}",
                    Formatter::capitalize(category),
                    Formatter::pesos(spent),
                    Formatter::pesos(budget.limit),
                    Formatter::pesos(spent - budget.limit),
                ),
                Some(budget) => format!(
                    "• {}: {} — te quedan {} de {}",
                    Formatter::capitalize(category),
                    Formatter::pesos(spent),
                    Formatter::pesos(budget.limit - spent),
                    Formatter::pesos(budget.limit),
                ),
                None => format!(
                    "• {}: {} — ⚠️ sin límite asignado",
                    Formatter::capitalize(category),
                    Formatter::pesos(spent),
                ),
            };
            lines.push(line);
        }

        let mut text = format!(
            "📋 *Resumen semanal de tus gastos:*\n\n{}\n",
            lines.join("\n")
        );

        let unbudgeted = detect::categories_without_limit(&totals, &budgets);
        if !unbudgeted.is_empty() {
            text.push_str(&format!(
                "\n💡 Podrías optimizar tu control de gastos asignando un presupuesto a: {}.\n\
                 Usa /presupuesto para configurarlo.",
                unbudgeted.join(", ")
            ));
        }

        let gateway = self.gateway.clone();
        retry_with_backoff(
            || gateway.send_message(chat, &text, None),
            self.retry.clone(),
            "weekly_summary_send",
        )
        .await?;

        // Quarter boundary check rides on the weekly schedule.
        let local_now = now.with_timezone(&self.tz);
        if local_now.day() == 1 && months_between(self.tz, start, now) % 3 == 0 {
            self.quarterly_for_user(user_id, chat, now).await?;
        }

        Ok(true)
    }
}
