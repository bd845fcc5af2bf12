use crate::database::DatabaseOperations;
use crate::error::Result;
use chrono::{DateTime, Datelike, TimeZone, Utc};
use chrono_tz::Tz;
use log::debug;

/// Month-to-date standing of one budgeted category. `remaining` is negative
/// when the limit is exceeded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BudgetStatus {
    pub category: String,
    pub limit: i64,
    pub spent: i64,
    pub remaining: i64,
}

/// Walk a calendar month backwards. `back = 0` is the month itself.
pub fn shift_month(year: i32, month: u32, back: u32) -> (i32, u32) {
    let total = year * 12 + month as i32 - 1 - back as i32;
    (total.div_euclid(12), total.rem_euclid(12) as u32 + 1)
}

fn first_midnight(tz: Tz, year: i32, month: u32) -> DateTime<Utc> {
    // Midnight on the 1st always exists in real timezones; the fallback
    // covers pathological DST edges.
    tz.with_ymd_and_hms(year, month, 1, 0, 0, 0)
        .earliest()
        .or_else(|| tz.with_ymd_and_hms(year, month, 1, 1, 0, 0).earliest())
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(Utc::now)
}

/// Start of the calendar month containing `now`, in the reporting timezone.
pub fn month_start(tz: Tz, now: DateTime<Utc>) -> DateTime<Utc> {
    let local = now.with_timezone(&tz);
    first_midnight(tz, local.year(), local.month())
}

/// `[start, end)` of the calendar month `months_back` months before the one
/// containing `now`.
pub fn month_bounds(tz: Tz, now: DateTime<Utc>, months_back: u32) -> (DateTime<Utc>, DateTime<Utc>) {
    let local = now.with_timezone(&tz);
    let (start_y, start_m) = shift_month(local.year(), local.month(), months_back);
    let (end_y, end_m) = shift_month(start_y, start_m + 1, 0);
    (
        first_midnight(tz, start_y, start_m),
        first_midnight(tz, end_y, end_m),
    )
}

/// Whole calendar months elapsed between two instants, in the reporting
/// timezone. Used for the quarterly cadence check.
pub fn months_between(tz: Tz, start: DateTime<Utc>, now: DateTime<Utc>) -> i32 {
    let start = start.with_timezone(&tz);
    let now = now.with_timezone(&tz);
    (now.year() - start.year()) * 12 + now.month() as i32 - start.month() as i32
}

/// Per-user, per-category budget limits plus monthly aggregation queries.
#[derive(Clone)]
pub struct BudgetLedger {
    db: DatabaseOperations,
    tz: Tz,
}

impl BudgetLedger {
    pub fn new(db: DatabaseOperations, tz: Tz) -> Self {
        Self { db, tz }
    }

    pub fn timezone(&self) -> Tz {
        self.tz
    }

    pub async fn get_limit(&self, user_id: &str, category: &str) -> Result<Option<i64>> {
        self.db.get_budget(user_id, category).await
    }

    /// Upsert; also registers the category in the user's category set.
    /// Limits must be validated as positive before the call.
    pub async fn set_limit(
        &self,
        user_id: &str,
        category: &str,
        limit: i64,
        now: DateTime<Utc>,
    ) -> Result<()> {
        self.db.set_budget(user_id, category, limit, now).await
    }

    /// Sum of the category's expenses with timestamp >= `from` (month to
    /// date when `from` is the month start).
    pub async fn month_total(
        &self,
        user_id: &str,
        category: &str,
        from: DateTime<Utc>,
    ) -> Result<i64> {
        self.db
            .sum_category_between(user_id, category, Some(from), None)
            .await
    }

    /// Month-to-date standing for a category, or `None` when no budget is
    /// set for it.
    pub async fn evaluate(
        &self,
        user_id: &str,
        category: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<BudgetStatus>> {
        let Some(limit) = self.db.get_budget(user_id, category).await? else {
            return Ok(None);
        };

        let from = month_start(self.tz, now);
        let spent = self.month_total(user_id, category, from).await?;
        debug!("Budget check: user={user_id} category={category} limit={limit} spent={spent}");

        Ok(Some(BudgetStatus {
            category: category.to_string(),
            limit,
            spent,
            remaining: limit - spent,
        }))
    }

    /// Every other budgeted category with positive remaining headroom this
    /// month; complete and duplicate-free, no particular order.
    pub async fn suggest_reallocations(
        &self,
        user_id: &str,
        excluding: &str,
        now: DateTime<Utc>,
    ) -> Result<Vec<BudgetStatus>> {
        let from = month_start(self.tz, now);
        let mut suggestions = Vec::new();

        for budget in self.db.list_budgets(user_id).await? {
            if budget.category == excluding {
                continue;
            }

            let spent = self.month_total(user_id, &budget.category, from).await?;
            let remaining = budget.limit - spent;
            if remaining > 0 {
                suggestions.push(BudgetStatus {
                    category: budget.category,
                    limit: budget.limit,
                    spent,
                    remaining,
                });
            }
        }

        Ok(suggestions)
    }
}
