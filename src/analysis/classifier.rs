//! Column Classifier: assigns each column exactly one semantic role.
//!
//! Ranking is explicit and deterministic: name-match score first, then a
//! value-based rate, then column position.

use crate::analysis::role::ColumnRole;
use crate::analysis::role::RoleMapping;
use crate::config::ClassifierConfig;
use crate::table::ColumnType;
use crate::table::Scalar;
use crate::table::Table;
use std::cmp::Ordering;
use std::collections::HashSet;
use tracing::debug;

/// What the classifier knows about one column.
struct ColumnProfile<'a> {
    index: usize,
    name: &'a str,
    column_type: ColumnType,
    time_score: u8,
    revenue_score: u8,
    margin_score: u8,
    /// Share of non-null values that denote a date
    date_rate: f64,
    /// Share of non-null values that are numbers
    numeric_rate: f64,
    abs_sum: f64,
    distinct: usize,
}

impl<'a> ColumnProfile<'a> {
    fn new(table: &'a Table, index: usize, config: &ClassifierConfig) -> Self {
        let column = &table.columns()[index];
        let mut non_null = 0usize;
        let mut dates = 0usize;
        let mut numbers = 0usize;
        let mut abs_sum = 0f64;
        let mut labels = HashSet::<String>::new();
        for value in table.values(index) {
            if value.is_null() {
                continue;
            }
            non_null += 1;
            if value.as_date().is_some() {
                dates += 1;
            }
            if let Scalar::Number(number) = value {
                numbers += 1;
                abs_sum += number.abs();
            }
            if let Some(label) = value.to_label() {
                labels.insert(label);
            }
        }
        let rate = |count: usize| if non_null == 0 { 0.0 } else { count as f64 / non_null as f64 };
        ColumnProfile {
            index,
            name: &column.name,
            column_type: column.column_type,
            time_score: name_score(&column.name, &config.time_vocabulary),
            revenue_score: name_score(&column.name, &config.revenue_vocabulary),
            margin_score: name_score(&column.name, &config.margin_vocabulary),
            date_rate: rate(dates),
            numeric_rate: rate(numbers),
            abs_sum,
            distinct: labels.len(),
        }
    }
}

/// Scores how well a column name matches a vocabulary:
/// 2 for a whole-word match, 1 for a substring match, 0 otherwise.
pub(crate) fn name_score(name: &str, vocabulary: &[String]) -> u8 {
    let normalized = name.trim().to_lowercase();
    let words: Vec<&str> = normalized
        .split(|c: char| c == '_' || c == '-' || c.is_whitespace())
        .filter(|word| !word.is_empty())
        .collect();
    vocabulary
        .iter()
        .map(|term| term.to_lowercase())
        .map(|term| {
            if normalized == term || words.iter().any(|word| *word == term) {
                2
            } else if !term.is_empty() && normalized.contains(&term) {
                1
            } else {
                0
            }
        })
        .max()
        .unwrap_or(0)
}

/// Picks the best candidate by (score desc, rate desc); ties keep the leftmost.
fn best<'p, 'a>(candidates: impl Iterator<Item = (&'p ColumnProfile<'a>, u8, f64)>) -> Option<&'p ColumnProfile<'a>> {
    let mut best: Option<(&ColumnProfile, u8, f64)> = None;
    for (profile, score, rate) in candidates {
        let better = match best {
            None => true,
            Some((_, best_score, best_rate)) => {
                score > best_score || (score == best_score && rate.partial_cmp(&best_rate) == Some(Ordering::Greater))
            }
        };
        if better {
            best = Some((profile, score, rate));
        }
    }
    best.map(|(profile, _, _)| profile)
}

/// Classifies every column of `table` using the default vocabularies.
pub fn classify(table: &Table) -> RoleMapping {
    classify_with(table, &ClassifierConfig::default())
}

pub fn classify_with(table: &Table, config: &ClassifierConfig) -> RoleMapping {
    let profiles: Vec<ColumnProfile> = (0..table.column_count())
        .map(|index| ColumnProfile::new(table, index, config))
        .collect();

    let time_axis = best(profiles.iter()
        .filter(|profile| {
            profile.date_rate >= config.date_parse_threshold || (profile.time_score > 0 && profile.date_rate > 0.0)
        })
        .map(|profile| (profile, profile.time_score, profile.date_rate)))
        .map(|profile| profile.index);

    let numeric = || profiles.iter()
        .filter(|profile| profile.column_type == ColumnType::Number && Some(profile.index) != time_axis);
    let revenue = best(numeric()
        .filter(|profile| profile.revenue_score > 0)
        .map(|profile| (profile, profile.revenue_score, profile.numeric_rate)))
        .or_else(|| best(numeric().map(|profile| (profile, 0, profile.abs_sum))))
        .map(|profile| profile.index);

    let mut categories: Vec<&ColumnProfile> = profiles.iter()
        .filter(|profile| {
            profile.column_type == ColumnType::Text
                && Some(profile.index) != time_axis
                && profile.distinct >= 1
                && profile.distinct < table.row_count()
        })
        .collect();
    categories.sort_by_key(|profile| (profile.distinct, profile.index));

    let assignments: Vec<(String, ColumnRole)> = profiles.iter()
        .map(|profile| {
            let role = if Some(profile.index) == time_axis {
                ColumnRole::TimeAxis
            } else if Some(profile.index) == revenue {
                ColumnRole::Revenue
            } else if categories.iter().any(|category| category.index == profile.index) {
                ColumnRole::Category
            } else if profile.column_type == ColumnType::Number {
                ColumnRole::GenericNumeric
            } else {
                ColumnRole::GenericText
            };
            debug!(column = profile.name, ?role, time_score = profile.time_score, date_rate = profile.date_rate, "classified column");
            (profile.name.to_owned(), role)
        })
        .collect();

    let margin = profiles.iter()
        .find(|profile| {
            profile.margin_score > 0
                && assignments[profile.index].1 == ColumnRole::GenericNumeric
        })
        .map(|profile| profile.name.to_owned());

    RoleMapping::new(
        assignments,
        categories.iter().map(|profile| profile.name.to_owned()).collect(),
        margin,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn text(value: &str) -> Scalar {
        Scalar::Text(value.to_owned())
    }

    fn date(y: i32, m: u32, d: u32) -> Scalar {
        Scalar::Date(NaiveDate::from_ymd_opt(y, m, d).unwrap())
    }

    fn sales_table() -> Table {
        Table::new(
            vec!["date".into(), "revenue".into(), "product".into(), "region".into(), "units".into(), "profit".into(), "note".into()],
            vec![
                vec![date(2024, 1, 1), Scalar::Number(100.0), text("A"), text("North"), Scalar::Number(1.0), Scalar::Number(10.0), text("x")],
                vec![date(2024, 2, 1), Scalar::Number(150.0), text("A"), text("North"), Scalar::Number(2.0), Scalar::Number(20.0), text("y")],
                vec![date(2024, 3, 1), Scalar::Number(90.0), text("B"), text("South"), Scalar::Number(3.0), Scalar::Number(5.0), text("z")],
                vec![date(2024, 3, 2), Scalar::Number(60.0), text("C"), text("South"), Scalar::Number(4.0), Scalar::Number(6.0), text("w")],
            ],
        ).unwrap()
    }

    #[test]
    fn name_scores() {
        let vocabulary = vec!["date".to_owned(), "time".to_owned()];
        assert_eq!(name_score("Order Date", &vocabulary), 2);
        assert_eq!(name_score("order_date", &vocabulary), 2);
        assert_eq!(name_score("OrderDate", &vocabulary), 1);
        assert_eq!(name_score("timestamp", &vocabulary), 1);
        assert_eq!(name_score("product", &vocabulary), 0);
    }

    #[test]
    fn assigns_every_role() {
        let roles = classify(&sales_table());
        assert_eq!(roles.len(), 7);
        assert_eq!(roles.time_axis(), Some("date"));
        assert_eq!(roles.revenue(), Some("revenue"));
        assert_eq!(roles.role("product"), Some(ColumnRole::Category));
        assert_eq!(roles.role("region"), Some(ColumnRole::Category));
        // region has 2 distinct values, product 3
        assert_eq!(roles.categories(), &["region".to_owned(), "product".to_owned()]);
        assert_eq!(roles.primary_category(), Some("region"));
        assert_eq!(roles.role("units"), Some(ColumnRole::GenericNumeric));
        assert_eq!(roles.role("note"), Some(ColumnRole::GenericText));
        assert_eq!(roles.margin_column(), Some("profit"));
    }

    #[test]
    fn is_deterministic() {
        let table = sales_table();
        assert_eq!(classify(&table), classify(&table));
    }

    #[test]
    fn revenue_falls_back_to_largest_absolute_sum() {
        let table = Table::new(
            vec!["qty".into(), "value".into()],
            vec![
                vec![Scalar::Number(1.0), Scalar::Number(-500.0)],
                vec![Scalar::Number(2.0), Scalar::Number(100.0)],
            ],
        ).unwrap();
        let roles = classify(&table);
        assert_eq!(roles.revenue(), Some("value"));
        assert_eq!(roles.role("qty"), Some(ColumnRole::GenericNumeric));
    }

    #[test]
    fn no_numeric_column_means_no_revenue() {
        let table = Table::new(
            vec!["product".into()],
            vec![vec![text("A")], vec![text("A")]],
        ).unwrap();
        let roles = classify(&table);
        assert_eq!(roles.revenue(), None);
        assert_eq!(roles.primary_category(), Some("product"));
    }

    #[test]
    fn time_axis_prefers_name_then_rate_then_position() {
        let table = Table::new(
            vec!["created".into(), "ship_date".into(), "order_date".into()],
            vec![
                vec![date(2024, 1, 1), date(2024, 1, 3), date(2024, 1, 1)],
                vec![date(2024, 1, 2), text("pending"), date(2024, 1, 2)],
            ],
        ).unwrap();
        let roles = classify(&table);
        // order_date and ship_date share score 2; order_date parses fully
        assert_eq!(roles.time_axis(), Some("order_date"));
        assert_eq!(roles.role("created"), Some(ColumnRole::GenericText));
    }

    #[test]
    fn unique_text_is_not_a_category() {
        let table = Table::new(
            vec!["id".into(), "amount".into()],
            vec![vec![text("a"), Scalar::Number(1.0)], vec![text("b"), Scalar::Number(2.0)]],
        ).unwrap();
        let roles = classify(&table);
        assert_eq!(roles.role("id"), Some(ColumnRole::GenericText));
        assert!(roles.categories().is_empty());
    }
}
