use crate::database::models::{BudgetRecord, ExpenseRecord, UserRecord};
use crate::error::Result;
use chrono::{DateTime, TimeZone, Utc};
use log::{debug, info};
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Document-store facade over SQLite. Per-user "collections" map to tables
/// keyed by `user_id`; expense timestamps are stored as unix seconds so
/// range queries compare numerically.
#[derive(Clone)]
pub struct DatabaseOperations {
    conn: Arc<Mutex<Connection>>,
}

impl DatabaseOperations {
    pub async fn new(database_url: &str) -> Result<Self> {
        let conn = Connection::open(database_url)?;
        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };

        db.init_schema().await?;
        Ok(db)
    }

    async fn init_schema(&self) -> Result<()> {
        let conn = self.conn.lock().await;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS users (
                user_id TEXT PRIMARY KEY,
                start_date DATETIME
            )",
            [],
        )?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS categories (
                user_id TEXT NOT NULL,
                name TEXT NOT NULL,
                PRIMARY KEY (user_id, name)
            )",
            [],
        )?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS budgets (
                user_id TEXT NOT NULL,
                category TEXT NOT NULL,
                limit_amount INTEGER NOT NULL,
                updated_at DATETIME,
                PRIMARY KEY (user_id, category)
            )",
            [],
        )?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS expenses (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id TEXT NOT NULL,
                category TEXT NOT NULL,
                amount INTEGER NOT NULL,
                created_at INTEGER NOT NULL
            )",
            [],
        )?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_expenses_user_date
             ON expenses (user_id, created_at)",
            [],
        )?;

        info!("Database schema initialized successfully");
        Ok(())
    }

    /// Create the user lazily; `start_date` is written once and never
    /// overwritten.
    pub async fn ensure_user(&self, user_id: &str, now: DateTime<Utc>) -> Result<()> {
        let conn = self.conn.lock().await;
        conn.execute(
            "INSERT INTO users (user_id, start_date) VALUES (?1, ?2)
             ON CONFLICT(user_id) DO UPDATE SET
                 start_date = COALESCE(start_date, excluded.start_date)",
            params![user_id, now],
        )?;
        Ok(())
    }

    pub async fn all_users(&self) -> Result<Vec<UserRecord>> {
        let conn = self.conn.lock().await;
        let mut stmt = conn.prepare("SELECT user_id, start_date FROM users ORDER BY user_id")?;
        let rows = stmt.query_map([], |row| {
            Ok(UserRecord {
                user_id: row.get(0)?,
                start_date: row.get(1).ok(),
            })
        })?;

        let mut users = Vec::new();
        for user in rows {
            users.push(user?);
        }
        Ok(users)
    }

    pub async fn list_categories(&self, user_id: &str) -> Result<Vec<String>> {
        let conn = self.conn.lock().await;
        let mut stmt =
            conn.prepare("SELECT name FROM categories WHERE user_id = ?1 ORDER BY name")?;
        let rows = stmt.query_map(params![user_id], |row| row.get::<_, String>(0))?;

        let mut names = Vec::new();
        for name in rows {
            names.push(name?);
        }
        Ok(names)
    }

    /// Upsert a budget limit and register the category for the user.
    pub async fn set_budget(
        &self,
        user_id: &str,
        category: &str,
        limit: i64,
        now: DateTime<Utc>,
    ) -> Result<()> {
        let conn = self.conn.lock().await;
        Self::register_category_sync(&conn, user_id, category)?;
        conn.execute(
            "INSERT INTO budgets (user_id, category, limit_amount, updated_at)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(user_id, category) DO UPDATE SET
                 limit_amount = excluded.limit_amount,
                 updated_at = excluded.updated_at",
            params![user_id, category, limit, now],
        )?;

        info!("Budget set: user={user_id} category={category} limit={limit}");
        Ok(())
    }

    pub async fn get_budget(&self, user_id: &str, category: &str) -> Result<Option<i64>> {
        let conn = self.conn.lock().await;
        let limit = conn
            .query_row(
                "SELECT limit_amount FROM budgets WHERE user_id = ?1 AND category = ?2",
                params![user_id, category],
                |row| row.get::<_, i64>(0),
            )
            .optional()?;
        Ok(limit)
    }

    pub async fn list_budgets(&self, user_id: &str) -> Result<Vec<BudgetRecord>> {
        let conn = self.conn.lock().await;
        let mut stmt = conn.prepare(
            "SELECT category, limit_amount, updated_at FROM budgets
             WHERE user_id = ?1 ORDER BY category",
        )?;
        let rows = stmt.query_map(params![user_id], |row| {
            Ok(BudgetRecord {
                category: row.get(0)?,
                limit: row.get(1)?,
                updated_at: row.get(2).ok(),
            })
        })?;

        let mut budgets = Vec::new();
        for budget in rows {
            budgets.push(budget?);
        }
        Ok(budgets)
    }

    /// Append an expense, registering its category, and return the new id.
    pub async fn add_expense(
        &self,
        user_id: &str,
        category: &str,
        amount: i64,
        at: DateTime<Utc>,
    ) -> Result<i64> {
        let conn = self.conn.lock().await;
        Self::register_category_sync(&conn, user_id, category)?;
        conn.execute(
            "INSERT INTO expenses (user_id, category, amount, created_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![user_id, category, amount, at.timestamp()],
        )?;

        let id = conn.last_insert_rowid();
        debug!("Expense recorded: user={user_id} category={category} amount={amount} id={id}");
        Ok(id)
    }

    /// Sum of one category's expenses within `[from, to)`; open bounds when
    /// `None`.
    pub async fn sum_category_between(
        &self,
        user_id: &str,
        category: &str,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
    ) -> Result<i64> {
        let conn = self.conn.lock().await;
        let total = conn.query_row(
            "SELECT COALESCE(SUM(amount), 0) FROM expenses
             WHERE user_id = ?1 AND category = ?2
               AND (?3 IS NULL OR created_at >= ?3)
               AND (?4 IS NULL OR created_at < ?4)",
            params![
                user_id,
                category,
                from.map(|t| t.timestamp()),
                to.map(|t| t.timestamp())
            ],
            |row| row.get::<_, i64>(0),
        )?;
        Ok(total)
    }

    /// Per-category totals within `[from, to)`; all-time when both bounds
    /// are `None`.
    pub async fn totals_by_category(
        &self,
        user_id: &str,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
    ) -> Result<HashMap<String, i64>> {
        let conn = self.conn.lock().await;
        let mut stmt = conn.prepare(
            "SELECT category, SUM(amount) FROM expenses
             WHERE user_id = ?1
               AND (?2 IS NULL OR created_at >= ?2)
               AND (?3 IS NULL OR created_at < ?3)
             GROUP BY category",
        )?;
        let rows = stmt.query_map(
            params![
                user_id,
                from.map(|t| t.timestamp()),
                to.map(|t| t.timestamp())
            ],
            |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)),
        )?;

        let mut totals = HashMap::new();
        for row in rows {
            let (category, total) = row?;
            totals.insert(category, total);
        }
        Ok(totals)
    }

    /// Most recent expense, newest insertion winning timestamp ties.
    pub async fn latest_expense(&self, user_id: &str) -> Result<Option<ExpenseRecord>> {
        let conn = self.conn.lock().await;
        let record = conn
            .query_row(
                "SELECT id, category, amount, created_at FROM expenses
                 WHERE user_id = ?1
                 ORDER BY created_at DESC, id DESC LIMIT 1",
                params![user_id],
                Self::expense_from_row,
            )
            .optional()?;
        Ok(record)
    }

    /// Delete by id; returns false when the id no longer resolves.
    pub async fn delete_expense(&self, user_id: &str, expense_id: i64) -> Result<bool> {
        let conn = self.conn.lock().await;
        let affected = conn.execute(
            "DELETE FROM expenses WHERE user_id = ?1 AND id = ?2",
            params![user_id, expense_id],
        )?;

        if affected > 0 {
            info!("Expense deleted: user={user_id} id={expense_id}");
        }
        Ok(affected > 0)
    }

    fn register_category_sync(conn: &Connection, user_id: &str, name: &str) -> Result<()> {
        conn.execute(
            "INSERT OR IGNORE INTO categories (user_id, name) VALUES (?1, ?2)",
            params![user_id, name],
        )?;
        Ok(())
    }

    fn expense_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<ExpenseRecord> {
        let ts: i64 = row.get(3)?;
        Ok(ExpenseRecord {
            id: row.get(0)?,
            category: row.get(1)?,
            amount: row.get(2)?,
            created_at: Utc
                .timestamp_opt(ts, 0)
                .single()
                .unwrap_or_else(Utc::now),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    async fn open() -> (DatabaseOperations, NamedTempFile) {
        let tmp = NamedTempFile::new().unwrap();
        let db = DatabaseOperations::new(tmp.path().to_str().unwrap())
            .await
            .unwrap();
        (db, tmp)
    }

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).single().unwrap()
    }

    #[tokio::test]
    async fn start_date_is_written_once() {
        let (db, _tmp) = open().await;
        let first = at(1_000_000);
        db.ensure_user("u1", first).await.unwrap();
        db.ensure_user("u1", at(2_000_000)).await.unwrap();

        let users = db.all_users().await.unwrap();
        assert_eq!(users.len(), 1);
        assert_eq!(users[0].start_date, Some(first));
    }

    #[tokio::test]
    async fn budget_upsert_replaces_limit() {
        let (db, _tmp) = open().await;
        db.set_budget("u1", "comida", 100, at(0)).await.unwrap();
        db.set_budget("u1", "comida", 250, at(10)).await.unwrap();

        assert_eq!(db.get_budget("u1", "comida").await.unwrap(), Some(250));
        assert_eq!(db.list_budgets("u1").await.unwrap().len(), 1);
        // The category was registered as a side effect, exactly once.
        assert_eq!(db.list_categories("u1").await.unwrap(), vec!["comida"]);
    }

    #[tokio::test]
    async fn sum_range_is_half_open() {
        let (db, _tmp) = open().await;
        db.add_expense("u1", "comida", 1, at(100)).await.unwrap();
        db.add_expense("u1", "comida", 10, at(200)).await.unwrap();
        db.add_expense("u1", "comida", 100, at(300)).await.unwrap();

        // [100, 300): the lower bound is included, the upper excluded.
        let total = db
            .sum_category_between("u1", "comida", Some(at(100)), Some(at(300)))
            .await
            .unwrap();
        assert_eq!(total, 11);

        let all = db
            .sum_category_between("u1", "comida", None, None)
            .await
            .unwrap();
        assert_eq!(all, 111);
    }

    #[tokio::test]
    async fn totals_group_per_category_and_user() {
        let (db, _tmp) = open().await;
        db.add_expense("u1", "comida", 5, at(100)).await.unwrap();
        db.add_expense("u1", "comida", 7, at(200)).await.unwrap();
        db.add_expense("u1", "ocio", 3, at(200)).await.unwrap();
        db.add_expense("u2", "comida", 99, at(200)).await.unwrap();

        let totals = db.totals_by_category("u1", None, None).await.unwrap();
        assert_eq!(totals.get("comida"), Some(&12));
        assert_eq!(totals.get("ocio"), Some(&3));
        assert_eq!(totals.len(), 2);
    }

    #[tokio::test]
    async fn latest_expense_breaks_timestamp_ties_by_id() {
        let (db, _tmp) = open().await;
        db.add_expense("u1", "comida", 1, at(100)).await.unwrap();
        let second = db.add_expense("u1", "ocio", 2, at(100)).await.unwrap();

        let latest = db.latest_expense("u1").await.unwrap().unwrap();
        assert_eq!(latest.id, second);
        assert_eq!(latest.category, "ocio");
    }

    #[tokio::test]
    async fn delete_expense_reports_misses() {
        let (db, _tmp) = open().await;
        let id = db.add_expense("u1", "comida", 1, at(100)).await.unwrap();

        assert!(db.delete_expense("u1", id).await.unwrap());
        assert!(!db.delete_expense("u1", id).await.unwrap());
        // Another user's id never deletes.
        let id2 = db.add_expense("u1", "comida", 1, at(100)).await.unwrap();
        assert!(!db.delete_expense("u2", id2).await.unwrap());
    }
}
