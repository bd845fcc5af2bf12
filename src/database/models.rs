use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Built-in category names offered to every user; custom ones are stored
/// per user in the `categories` table.
pub const BUILTIN_CATEGORIES: &[&str] = &[
    "comida",
    "transporte",
    "salud",
    "ocio",
    "educación",
    "hogar",
    "servicios",
];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserRecord {
    /// Platform-assigned opaque id.
    pub user_id: String,
    /// First-interaction timestamp, set once and never overwritten.
    pub start_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BudgetRecord {
    pub category: String,
    /// Monthly limit in the smallest currency unit, always > 0.
    pub limit: i64,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExpenseRecord {
    pub id: i64,
    pub category: String,
    pub amount: i64,
    pub created_at: DateTime<Utc>,
}
