use crate::analysis::result::Trend;
use crate::config::AnalyzerConfig;

/// Aggregates of one dated period bucket.
#[derive(Clone, Debug, Default)]
pub(crate) struct PeriodStats {
    pub(crate) revenue: f64,
    pub(crate) transactions: u64,
    /// (sum, count) of non-null values per generic numeric column
    pub(crate) numeric: Vec<(f64, usize)>,
}

/// Totals of one half of the chronological series.
#[derive(Default)]
struct Half {
    revenue: f64,
    transactions: u64,
    buckets: usize,
    numeric: Vec<(f64, usize)>,
}

impl Half {
    fn of(periods: &[PeriodStats], numeric_columns: usize) -> Half {
        let mut half = Half { numeric: vec![(0.0, 0); numeric_columns], ..Half::default() };
        for period in periods {
            half.revenue += period.revenue;
            half.transactions += period.transactions;
            half.buckets += 1;
            for (total, (sum, count)) in half.numeric.iter_mut().zip(&period.numeric) {
                total.0 += sum;
                total.1 += count;
            }
        }
        half
    }

    fn per_bucket(&self, value: f64) -> Option<f64> {
        (self.buckets > 0).then(|| value / self.buckets as f64)
    }

    fn deal_size(&self) -> Option<f64> {
        (self.transactions > 0).then(|| self.revenue / self.transactions as f64)
    }

    fn mean(&self, column: usize) -> Option<f64> {
        self.numeric
            .get(column)
            .and_then(|(sum, count)| (*count > 0).then(|| sum / *count as f64))
    }
}

/// Compares the first ⌊n/2⌋ periods against the rest. Revenue and transaction
/// growth compare per-bucket averages so an odd split is not skewed.
pub(crate) fn compute_trends(periods: &[PeriodStats], numeric_names: &[&str], config: &AnalyzerConfig) -> Vec<Trend> {
    if periods.len() < 2 {
        return vec![];
    }
    let (first, second) = periods.split_at(periods.len() / 2);
    let first = Half::of(first, numeric_names.len());
    let second = Half::of(second, numeric_names.len());

    let mut candidates = vec![
        ("Revenue Growth".to_owned(), first.per_bucket(first.revenue), second.per_bucket(second.revenue)),
        (
            "Transaction Growth".to_owned(),
            first.per_bucket(first.transactions as f64),
            second.per_bucket(second.transactions as f64),
        ),
        ("Average Deal Size Growth".to_owned(), first.deal_size(), second.deal_size()),
    ];
    for (index, name) in numeric_names.iter().enumerate().take(config.numeric_trend_limit) {
        candidates.push((title_case(name), first.mean(index), second.mean(index)));
    }

    candidates
        .into_iter()
        .filter_map(|(metric, before, after)| match (before, after) {
            (Some(before), Some(after)) if before != 0.0 => {
                let change_percent = (after - before) / before.abs() * 100.0;
                Some(Trend {
                    is_favorable: config.polarity_of(&metric).is_favorable(change_percent),
                    direction: direction(change_percent).to_owned(),
                    metric,
                    change_percent,
                })
            }
            _ => None,
        })
        .collect()
}

fn direction(change_percent: f64) -> &'static str {
    if change_percent > 0.0 {
        "up"
    } else if change_percent < 0.0 {
        "down"
    } else {
        "flat"
    }
}

/// `unit_cost` -> `Unit Cost`
pub(crate) fn title_case(name: &str) -> String {
    let mut title = String::with_capacity(name.len());
    let mut after_letter = false;
    for c in name.chars().map(|c| if c == '_' { ' ' } else { c }) {
        if after_letter {
            title.extend(c.to_lowercase());
        } else {
            title.extend(c.to_uppercase());
        }
        after_letter = c.is_alphabetic();
    }
    title
}
