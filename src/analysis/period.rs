use chrono::Datelike;
use chrono::Months;
use chrono::NaiveDate;
use serde::Deserialize;
use serde::Serialize;
use std::collections::BTreeSet;

/// Size of the time buckets revenue is grouped into.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Granularity {
    Year,
    Month,
    Day,
}

impl Granularity {
    /// Levels tried when picking a granularity, coarsest first.
    pub const ESCALATION: [Granularity; 3] = [Granularity::Year, Granularity::Month, Granularity::Day];

    /// Human-readable name, used in visual titles.
    pub const fn as_title(&self) -> &'static str {
        match self {
            Granularity::Year => "Year",
            Granularity::Month => "Month",
            Granularity::Day => "Day",
        }
    }

    /// Picks the coarsest level that splits `dates` into at least two buckets.
    /// Falls back to `Day` when none does (all dates equal, or no dates).
    pub fn choose(dates: &[NaiveDate]) -> Granularity {
        Self::ESCALATION
            .into_iter()
            .find(|granularity| {
                let buckets: BTreeSet<NaiveDate> = dates.iter().map(|date| granularity.bucket(*date)).collect();
                buckets.len() >= 2
            })
            .unwrap_or(Granularity::Day)
    }

    /// First day of the bucket containing `date`.
    pub fn bucket(self, date: NaiveDate) -> NaiveDate {
        match self {
            Granularity::Year => date.with_ordinal(1).unwrap_or(date),
            Granularity::Month => date.with_day(1).unwrap_or(date),
            Granularity::Day => date,
        }
    }

    /// First day of the bucket after the one starting at `bucket`.
    pub fn next(self, bucket: NaiveDate) -> Option<NaiveDate> {
        match self {
            Granularity::Year => bucket.checked_add_months(Months::new(12)),
            Granularity::Month => bucket.checked_add_months(Months::new(1)),
            Granularity::Day => bucket.succ_opt(),
        }
    }

    /// Period label: `2024`, `2024-01` or `2024-01-15`.
    pub fn label(self, bucket: NaiveDate) -> String {
        match self {
            Granularity::Year => bucket.format("%Y").to_string(),
            Granularity::Month => bucket.format("%Y-%m").to_string(),
            Granularity::Day => bucket.format("%Y-%m-%d").to_string(),
        }
    }

    /// Inverse of [`Granularity::label`].
    pub fn parse_label(self, label: &str) -> Option<NaiveDate> {
        let label = label.trim();
        match self {
            Granularity::Year => label.parse::<i32>().ok().and_then(|year| NaiveDate::from_ymd_opt(year, 1, 1)),
            Granularity::Month => NaiveDate::parse_from_str(&format!("{label}-01"), "%Y-%m-%d").ok(),
            Granularity::Day => NaiveDate::parse_from_str(label, "%Y-%m-%d").ok(),
        }
    }
}
