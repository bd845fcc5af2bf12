use crate::parser::regex::ExpensePatterns;
use log::debug;

/// Amount/description pair extracted from a free-text expense message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedExpense {
    /// Smallest currency unit, always > 0.
    pub amount: i64,
    /// Lowercased, trimmed description (becomes the category suggestion).
    pub description: String,
}

#[derive(Clone, Debug)]
pub struct ExpenseParser {
    patterns: &'static ExpensePatterns,
}

impl ExpenseParser {
    pub fn new() -> Self {
        Self {
            patterns: ExpensePatterns::get_instance(),
        }
    }

    /// Lowercase, trim and strip thousands separators so that "12.000",
    /// "12,000" and "12000" all read the same.
    pub fn normalize(text: &str) -> String {
        text.trim().to_lowercase().replace(['.', ','], "")
    }

    /// Extract `(amount, description)` from free text. Pure function: the
    /// four surface forms are tried in order and the first match wins.
    /// Returns `None` when no form matches or the amount is not positive.
    pub fn parse(&self, text: &str) -> Option<ParsedExpense> {
        let normalized = Self::normalize(text);
        debug!("Parsing expense text: {normalized}");

        let (amount_str, description) = if let Some(cap) = self.patterns.amount_first.captures(&normalized) {
            (cap.get(1)?.as_str(), cap.get(2)?.as_str())
        } else if let Some(cap) = self.patterns.amount_last.captures(&normalized) {
            (cap.get(2)?.as_str(), cap.get(1)?.as_str())
        } else if let Some(cap) = self.patterns.colon_separated.captures(&normalized) {
            (cap.get(2)?.as_str(), cap.get(1)?.as_str())
        } else if let Some(cap) = self.patterns.glued.captures(&normalized) {
            (cap.get(2)?.as_str(), cap.get(1)?.as_str())
        } else {
            return None;
        };

        let amount = amount_str.parse::<i64>().ok().filter(|a| *a > 0)?;
        let description = description.trim().to_string();
        if description.is_empty() {
            return None;
        }

        Some(ParsedExpense {
            amount,
            description,
        })
    }

    /// Parse a budget-limit reply. Accepts the same separator conventions
    /// ("50.000" → 50000) but only pure digits; must be positive.
    pub fn parse_limit(&self, text: &str) -> Option<i64> {
        let normalized = Self::normalize(text);
        if !self.patterns.digits_only.is_match(&normalized) {
            return None;
        }
        normalized.parse::<i64>().ok().filter(|v| *v > 0)
    }
}

impl Default for ExpenseParser {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(text: &str) -> Option<ParsedExpense> {
        ExpenseParser::new().parse(text)
    }

    #[test]
    fn amount_then_description() {
        assert_eq!(
            parse("5000 comida"),
            Some(ParsedExpense {
                amount: 5000,
                description: "comida".to_string()
            })
        );
    }

    #[test]
    fn description_then_amount() {
        assert_eq!(
            parse("comida 5000"),
            Some(ParsedExpense {
                amount: 5000,
                description: "comida".to_string()
            })
        );
    }

    #[test]
    fn colon_separated() {
        assert_eq!(
            parse("comida: 5000"),
            Some(ParsedExpense {
                amount: 5000,
                description: "comida".to_string()
            })
        );
    }

    #[test]
    fn glued_word_and_digits() {
        assert_eq!(
            parse("banano2000"),
            Some(ParsedExpense {
                amount: 2000,
                description: "banano".to_string()
            })
        );
    }

    #[test]
    fn thousands_separators_normalize_to_same_amount() {
        for text in ["12.000 comida", "12,000 comida", "12000 comida"] {
            assert_eq!(parse(text).unwrap().amount, 12000, "input: {text}");
        }
    }

    #[test]
    fn accented_descriptions_are_accepted() {
        assert_eq!(parse("educación 999999").unwrap().description, "educación");
        assert_eq!(parse("año nuevo 1").unwrap().description, "año nuevo");
        assert_eq!(parse("1 café").unwrap().description, "café");
    }

    #[test]
    fn uppercase_and_padding_are_normalized() {
        assert_eq!(
            parse("  COMIDA 5000  "),
            Some(ParsedExpense {
                amount: 5000,
                description: "comida".to_string()
            })
        );
    }

    #[test]
    fn rejects_unrecognized_forms() {
        assert_eq!(parse(""), None);
        assert_eq!(parse("12345"), None);
        assert_eq!(parse("solo palabras"), None);
        assert_eq!(parse("5000 comida extra 99"), None);
        assert_eq!(parse("!! 5000"), None);
    }

    #[test]
    fn rejects_zero_amount() {
        assert_eq!(parse("0 comida"), None);
    }

    #[test]
    fn limit_parsing() {
        let parser = ExpenseParser::new();
        assert_eq!(parser.parse_limit("20000"), Some(20000));
        assert_eq!(parser.parse_limit("50.000"), Some(50000));
        assert_eq!(parser.parse_limit(" 12,000 "), Some(12000));
        assert_eq!(parser.parse_limit("0"), None);
        assert_eq!(parser.parse_limit("abc"), None);
        assert_eq!(parser.parse_limit("20000 pesos"), None);
    }
}
