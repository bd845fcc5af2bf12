pub mod models;
pub mod operations;

pub use models::{BudgetRecord, ExpenseRecord, UserRecord, BUILTIN_CATEGORIES};
pub use operations::DatabaseOperations;
