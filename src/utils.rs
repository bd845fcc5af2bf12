use chrono::{DateTime, Utc};
use chrono_tz::Tz;

/// Formatting helpers for user-facing messages.
pub struct Formatter;

impl Formatter {
    /// Colombian-style peso formatting: 1234567 → "$1.234.567".
    pub fn pesos(amount: i64) -> String {
        let negative = amount < 0;
        let digits = amount.unsigned_abs().to_string();
        let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);

        for (i, c) in digits.chars().enumerate() {
            if i > 0 && (digits.len() - i) % 3 == 0 {
                grouped.push('.');
            }
            grouped.push(c);
        }

        if negative {
            format!("-${grouped}")
        } else {
            format!("${grouped}")
        }
    }

    /// Timestamp rendered in the reporting timezone.
    pub fn datetime(at: DateTime<Utc>, tz: Tz) -> String {
        at.with_timezone(&tz).format("%Y-%m-%d %H:%M").to_string()
    }

    /// "Comida" from "comida".
    pub fn capitalize(word: &str) -> String {
        let mut chars = word.chars();
        match chars.next() {
            Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
            None => String::new(),
        }
    }

    /// Signed percent variation between two totals, e.g. "🔺 25.0%".
    pub fn percent_variation(previous: i64, current: i64) -> String {
        if previous <= 0 {
            return "🔹 Sin dato anterior".to_string();
        }
        let change = (current - previous) as f64 / previous as f64 * 100.0;
        let arrow = if change > 0.0 { "🔺" } else { "🔻" };
        format!("{arrow} {:.1}%", change.abs())
    }
}

/// Input validation for user-provided names.
pub struct Validator;

impl Validator {
    /// Custom category names: non-empty, single line, reasonable length.
    pub fn is_valid_category_name(name: &str) -> bool {
        let name = name.trim();
        !name.is_empty() && name.len() <= 60 && !name.contains('\n')
    }
}
