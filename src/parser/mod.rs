pub mod message;
pub mod regex;

pub use message::{ExpenseParser, ParsedExpense};
pub use regex::ExpensePatterns;
