use regex::Regex;
use std::sync::OnceLock;

/// Compiled patterns for the accepted expense surface forms. Word characters
/// cover the accented Spanish alphabet.
#[derive(Debug)]
pub struct ExpensePatterns {
    /// "5000 comida" (amount first, optional space)
    pub amount_first: Regex,
    /// "comida 5000" (description first)
    pub amount_last: Regex,
    /// "comida: 5000"
    pub colon_separated: Regex,
    /// "comida5000" (single word glued to digits)
    pub glued: Regex,
    /// Pure digits, used for budget-limit input
    pub digits_only: Regex,
}

impl ExpensePatterns {
    pub fn new() -> Self {
        Self {
            amount_first: Regex::new(r"^(\d+)\s*([a-záéíóúñ ]+)$").unwrap(),
            amount_last: Regex::new(r"^([a-záéíóúñ ]+?)\s*(\d+)$").unwrap(),
            colon_separated: Regex::new(r"^([a-záéíóúñ ]+):\s*(\d+)$").unwrap(),
            glued: Regex::new(r"^([a-záéíóúñ]+)(\d+)$").unwrap(),
            digits_only: Regex::new(r"^\d+$").unwrap(),
        }
    }

    pub fn get_instance() -> &'static Self {
        static INSTANCE: OnceLock<ExpensePatterns> = OnceLock::new();
        INSTANCE.get_or_init(ExpensePatterns::new)
    }
}

impl Default for ExpensePatterns {
    fn default() -> Self {
        Self::new()
    }
}
