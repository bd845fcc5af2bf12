use crate::database::BudgetRecord;
use std::collections::HashMap;

/// A category whose month-to-date spending grew at least 50% over the
/// prior full month.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryIncrease {
    pub category: String,
    pub previous: i64,
    pub current: i64,
}

/// Categories with `current >= 1.5 * previous` where the prior month had
/// actual spending. New categories (prior == 0) never alert. Sorted by
/// category name so reports are deterministic.
pub fn unusual_increases(
    previous: &HashMap<String, i64>,
    current: &HashMap<String, i64>,
) -> Vec<CategoryIncrease> {
    let mut increases: Vec<CategoryIncrease> = current
        .iter()
        .filter_map(|(category, &now)| {
            let before = *previous.get(category)?;
            if before > 0 && now * 2 >= before * 3 {
                Some(CategoryIncrease {
                    category: category.clone(),
                    previous: before,
                    current: now,
                })
            } else {
                None
            }
        })
        .collect();
    increases.sort_by(|a, b| a.category.cmp(&b.category));
    increases
}

/// Budgeted categories that exceeded their limit in at least 2 of the
/// given monthly totals (one map per month).
pub fn frequent_excesses(
    months: &[HashMap<String, i64>],
    budgets: &[BudgetRecord],
) -> Vec<String> {
    let mut flagged: Vec<String> = budgets
        .iter()
        .filter(|budget| {
            let exceeded = months
                .iter()
                .filter(|totals| totals.get(&budget.category).copied().unwrap_or(0) > budget.limit)
                .count();
            exceeded >= 2
        })
        .map(|budget| budget.category.clone())
        .collect();
    flagged.sort();
    flagged
}

/// True when there are exactly 3 monthly data points, all within 10% of
/// their mean. Months without spending do not contribute a point, so a
/// category missing a month can never qualify.
pub fn stable_pattern(points: &[i64]) -> bool {
    if points.len() != 3 {
        return false;
    }
    let sum: i64 = points.iter().sum();
    if sum <= 0 {
        return false;
    }
    let mean = sum as f64 / points.len() as f64;
    points
        .iter()
        .all(|&p| (p as f64 - mean).abs() <= mean * 0.10)
}

/// Categories with recorded spending but no monthly limit, sorted.
pub fn categories_without_limit(
    totals: &HashMap<String, i64>,
    budgets: &[BudgetRecord],
) -> Vec<String> {
    let mut unbudgeted: Vec<String> = totals
        .keys()
        .filter(|category| !budgets.iter().any(|b| &b.category == *category))
        .cloned()
        .collect();
    unbudgeted.sort();
    unbudgeted
}

#[cfg(test)]
mod tests {
    use super::*;

    fn totals(pairs: &[(&str, i64)]) -> HashMap<String, i64> {
        pairs
            .iter()
            .map(|(c, v)| (c.to_string(), *v))
            .collect()
    }

    fn budget(category: &str, limit: i64) -> BudgetRecord {
        BudgetRecord {
            category: category.to_string(),
            limit,
            updated_at: None,
        }
    }

    #[test]
    fn increase_at_exactly_fifty_percent_alerts() {
        let prev = totals(&[("comida", 100_000)]);
        let curr = totals(&[("comida", 150_000)]);
        let hits = unusual_increases(&prev, &curr);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].category, "comida");
    }

    #[test]
    fn increase_below_threshold_is_quiet() {
        let prev = totals(&[("comida", 100_000)]);
        let curr = totals(&[("comida", 149_999)]);
        assert!(unusual_increases(&prev, &curr).is_empty());
    }

    #[test]
    fn new_category_never_alerts() {
        let prev = totals(&[]);
        let curr = totals(&[("viajes", 900_000)]);
        assert!(unusual_increases(&prev, &curr).is_empty());
    }

    #[test]
    fn zero_prior_never_alerts() {
        let prev = totals(&[("ocio", 0)]);
        let curr = totals(&[("ocio", 500_000)]);
        assert!(unusual_increases(&prev, &curr).is_empty());
    }

    #[test]
    fn increases_are_sorted_by_category() {
        let prev = totals(&[("zapatos", 10), ("arte", 10)]);
        let curr = totals(&[("zapatos", 100), ("arte", 100)]);
        let hits = unusual_increases(&prev, &curr);
        assert_eq!(hits[0].category, "arte");
        assert_eq!(hits[1].category, "zapatos");
    }

    #[test]
    fn excess_in_two_of_three_months_flags() {
        let months = vec![
            totals(&[("comida", 120_000)]),
            totals(&[("comida", 80_000)]),
            totals(&[("comida", 130_000)]),
        ];
        let budgets = vec![budget("comida", 100_000)];
        assert_eq!(frequent_excesses(&months, &budgets), vec!["comida"]);
    }

    #[test]
    fn excess_in_one_month_does_not_flag() {
        let months = vec![
            totals(&[("comida", 120_000)]),
            totals(&[("comida", 80_000)]),
            totals(&[("comida", 90_000)]),
        ];
        let budgets = vec![budget("comida", 100_000)];
        assert!(frequent_excesses(&months, &budgets).is_empty());
    }

    #[test]
    fn spending_exactly_at_limit_is_not_excess() {
        let months = vec![
            totals(&[("hogar", 100_000)]),
            totals(&[("hogar", 100_000)]),
            totals(&[("hogar", 100_000)]),
        ];
        let budgets = vec![budget("hogar", 100_000)];
        assert!(frequent_excesses(&months, &budgets).is_empty());
    }

    #[test]
    fn stable_pattern_within_ten_percent() {
        assert!(stable_pattern(&[100_000, 105_000, 95_000]));
    }

    #[test]
    fn stable_pattern_rejects_outlier() {
        assert!(!stable_pattern(&[100_000, 100_000, 130_000]));
    }

    #[test]
    fn stable_pattern_needs_exactly_three_points() {
        assert!(!stable_pattern(&[100_000, 100_000]));
        assert!(!stable_pattern(&[100_000, 100_000, 100_000, 100_000]));
        assert!(!stable_pattern(&[]));
    }

    #[test]
    fn stable_pattern_rejects_all_zero() {
        assert!(!stable_pattern(&[0, 0, 0]));
    }

    #[test]
    fn without_limit_excludes_budgeted() {
        let spent = totals(&[("comida", 50_000), ("viajes", 80_000)]);
        let budgets = vec![budget("comida", 100_000)];
        assert_eq!(categories_without_limit(&spent, &budgets), vec!["viajes"]);
    }
}
