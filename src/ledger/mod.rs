pub mod budget;

pub use budget::{month_bounds, month_start, months_between, shift_month, BudgetLedger, BudgetStatus};
