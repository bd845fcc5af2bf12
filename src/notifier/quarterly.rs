use crate::error::Result;
use crate::ledger::month_bounds;
use crate::notifier::{detect, Notifier};
use crate::retry::retry_with_backoff;
use crate::utils::Formatter;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use teloxide::types::ChatId;

impl Notifier {
    /// Quarterly evaluation over the 3 preceding full months. A category
    /// qualifies only with spending in every month of the quarter, all
    /// three sums within 10% of their mean. Silent when nothing qualifies.
    pub(super) async fn quarterly_for_user(
        &self,
        user_id: &str,
        chat: ChatId,
        now: DateTime<Utc>,
    ) -> Result<bool> {
        let mut points: BTreeMap<String, Vec<i64>> = BTreeMap::new();

        // back = 3 first so each category's points run oldest to newest
        for back in (1..=3).rev() {
            let (from, to) = month_bounds(self.tz, now, back);
            let totals = self.db.totals_by_category(user_id, Some(from), Some(to)).await?;
            for (category, amount) in totals {
                if amount > 0 {
                    points.entry(category).or_default().push(amount);
                }
            }
        }

        let stable: Vec<(String, i64)> = points
            .into_iter()
            .filter(|(_, sums)| detect::stable_pattern(sums))
            .map(|(category, sums)| {
                let mean = sums.iter().sum::<i64>() / sums.len() as i64;
                (category, mean)
            })
            .collect();

        if stable.is_empty() {
            return Ok(false);
        }

        let mut text = String::from(
            "📊 *Evaluación trimestral:*\n\n\
             Estas categorías muestran un patrón de gasto estable:\n",
        );
        for (category, mean) in &stable {
            text.push_str(&format!(
                "• {}: alrededor de {} al mes\n",
                Formatter::capitalize(category),
                Formatter::pesos(*mean),
            ));
        }
        text.push_str("\n✅ Buen trabajo manteniendo un gasto constante.");

        let gateway = self.gateway.clone();
        retry_with_backoff(
            || gateway.send_message(chat, &text, None),
            self.retry.clone(),
            "quarterly_report_send",
        )
        .await?;

        Ok(true)
    }
}
