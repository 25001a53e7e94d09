//! The Analyzer turns a classified table into an [`AnalysisResult`].
//!
//! Classification fallbacks never fail the analysis: they are recorded as
//! [`Degradation`]s in the summary instead. Only structurally empty input and,
//! when configured, an impossible forecast are errors.

use crate::analysis::forecast::forecast;
use crate::analysis::period::Granularity;
use crate::analysis::result::AnalysisResult;
use crate::analysis::result::Degradation;
use crate::analysis::result::Metadata;
use crate::analysis::result::ProductPerformance;
use crate::analysis::result::RevenuePoint;
use crate::analysis::result::RoleAssignment;
use crate::analysis::result::Summary;
use crate::analysis::role::RoleMapping;
use crate::analysis::trends::compute_trends;
use crate::analysis::trends::PeriodStats;
use crate::config::AnalyzerConfig;
use crate::error::RustyPbixError;
use crate::table::Scalar;
use crate::table::Table;
use chrono::NaiveDate;
use std::collections::BTreeMap;
use tracing::debug;
use tracing::info;

/// Label of the bucket holding rows without a usable time value.
pub const UNDATED_PERIOD: &str = "(Undated)";
/// Entity name of rows whose category value is missing.
pub const BLANK_ENTITY: &str = "(Blank)";

#[derive(Clone, Debug, Default)]
pub struct Analyzer {
    config: AnalyzerConfig,
}

/// Per-entity accumulator for product performance.
#[derive(Default)]
struct EntityStats {
    value: f64,
    transactions: u64,
    margin_sum: f64,
    margin_count: usize,
}

impl Analyzer {
    pub fn new(config: AnalyzerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AnalyzerConfig {
        &self.config
    }

    pub fn analyze(&self, table: &Table, roles: &RoleMapping) -> Result<AnalysisResult, RustyPbixError> {
        if table.row_count() == 0 || table.column_count() == 0 {
            Err(RustyPbixError::MalformedInputError("cannot analyze an empty table".to_owned()))?
        }

        let mut degradations = Vec::<Degradation>::new();
        let column = |name: Option<&str>| name.and_then(|name| table.column_index(name));

        let revenue_index = column(roles.revenue());
        if revenue_index.is_none() {
            degradations.push(Degradation::SyntheticRevenue);
        }
        let revenues: Vec<f64> = table
            .rows()
            .iter()
            .map(|row| match revenue_index.map(|index| &row[index]) {
                Some(Scalar::Number(value)) => *value,
                _ => 0.0,
            })
            .collect();

        let time_index = column(roles.time_axis());
        if time_index.is_none() {
            degradations.push(Degradation::NoTimeAxis);
        }
        let dates: Vec<Option<NaiveDate>> = table
            .rows()
            .iter()
            .map(|row| time_index.and_then(|index| row[index].as_date()))
            .collect();
        let observed: Vec<NaiveDate> = dates.iter().flatten().copied().collect();
        let granularity = self.config.granularity.unwrap_or_else(|| Granularity::choose(&observed));
        if time_index.is_some() && observed.len() < dates.len() {
            degradations.push(Degradation::UndatedRows);
        }

        let numeric_names: Vec<&str> = roles.generic_numeric();
        let numeric_indexes: Vec<usize> = numeric_names.iter().filter_map(|name| table.column_index(name)).collect();

        let mut dated = BTreeMap::<NaiveDate, PeriodStats>::new();
        let mut undated: Option<PeriodStats> = None;
        for ((row, revenue), date) in table.rows().iter().zip(&revenues).zip(&dates) {
            let stats = match date {
                Some(date) => dated.entry(granularity.bucket(*date)).or_default(),
                None => undated.get_or_insert_with(PeriodStats::default),
            };
            stats.revenue += revenue;
            stats.transactions += 1;
            stats.numeric.resize(numeric_indexes.len(), (0.0, 0));
            for (slot, index) in stats.numeric.iter_mut().zip(&numeric_indexes) {
                if let Some(value) = row[*index].as_number() {
                    slot.0 += value;
                    slot.1 += 1;
                }
            }
        }
        info!(?granularity, periods = dated.len(), undated = undated.is_some(), "bucketed revenue");

        let dated_series: Vec<RevenuePoint> = dated
            .iter()
            .map(|(bucket, stats)| RevenuePoint { period: granularity.label(*bucket), value: stats.revenue })
            .collect();
        let mut revenue_analysis = dated_series.clone();
        if let Some(stats) = &undated {
            revenue_analysis.push(RevenuePoint { period: UNDATED_PERIOD.to_owned(), value: stats.revenue });
        }
        let total_revenue = revenue_analysis.iter().map(|point| point.value).sum::<f64>();

        let growth_rate = match (dated_series.first(), dated_series.last()) {
            (Some(first), Some(last)) if dated_series.len() >= 2 => {
                if first.value == 0.0 {
                    degradations.push(Degradation::ZeroBaseGrowth);
                    0.0
                } else {
                    (last.value - first.value) / first.value * 100.0
                }
            }
            _ => {
                if time_index.is_some() {
                    degradations.push(Degradation::SinglePeriod);
                }
                0.0
            }
        };

        let (product_performance, top_entity) = self.product_performance(table, roles, &revenues, &mut degradations);

        let periods: Vec<PeriodStats> = dated.into_values().collect();
        let trends = compute_trends(&periods, &numeric_names, &self.config);

        let forecasts = match forecast(&dated_series, granularity, self.config.forecast_horizon) {
            Ok(forecasts) => forecasts,
            Err(e) if e.is_recoverable() && !self.config.require_forecast => {
                degradations.push(Degradation::ForecastUnavailable);
                vec![]
            }
            Err(e) => Err(e)?,
        };

        degradations.sort();
        degradations.dedup();
        if !degradations.is_empty() {
            info!(?degradations, "analysis degraded");
        }

        let rows = table.row_count();
        let summary = Summary {
            total_revenue,
            growth_rate,
            total_transactions: rows as u64,
            top_entity,
            average_transaction: total_revenue / rows as f64,
            max_transaction: revenues.iter().copied().fold(f64::NEG_INFINITY, f64::max),
            degraded: !degradations.is_empty(),
            degradations,
        };
        let metadata = Metadata {
            rows: rows as u64,
            columns: table.column_count() as u64,
            column_names: table.column_names(),
            roles: roles
                .iter()
                .map(|(column, role)| RoleAssignment { column: column.to_owned(), role })
                .collect(),
            granularity: (!dated_series.is_empty()).then_some(granularity),
        };

        Ok(AnalysisResult { summary, revenue_analysis, product_performance, trends, forecasts, metadata })
    }

    /// Groups revenue by the primary category; returns the ranked entries and the top entity.
    fn product_performance(
        &self,
        table: &Table,
        roles: &RoleMapping,
        revenues: &[f64],
        degradations: &mut Vec<Degradation>,
    ) -> (Vec<ProductPerformance>, String) {
        let Some(category_index) = roles.primary_category().and_then(|name| table.column_index(name)) else {
            degradations.push(Degradation::NoCategory);
            return (vec![], String::new());
        };
        let margin = roles.margin_column().and_then(|name| {
            let lower = name.to_lowercase();
            let is_percent = ["percent", "pct", "%"].iter().any(|marker| lower.contains(marker));
            table.column_index(name).map(|index| (index, is_percent))
        });

        let mut entities = BTreeMap::<String, EntityStats>::new();
        for (row, revenue) in table.rows().iter().zip(revenues) {
            let entity = row[category_index].to_label().unwrap_or_else(|| BLANK_ENTITY.to_owned());
            let stats = entities.entry(entity).or_default();
            stats.value += revenue;
            stats.transactions += 1;
            if let Some(value) = margin.and_then(|(index, _)| row[index].as_number()) {
                stats.margin_sum += value;
                stats.margin_count += 1;
            }
        }

        let mut performance: Vec<ProductPerformance> = entities
            .into_iter()
            .map(|(entity, stats)| {
                let margin_percent = match margin {
                    None => self.config.default_margin_percent,
                    Some(_) if stats.margin_count == 0 => self.config.default_margin_percent,
                    Some((_, true)) => stats.margin_sum / stats.margin_count as f64,
                    Some((_, false)) if stats.value == 0.0 => 0.0,
                    Some((_, false)) => stats.margin_sum / stats.value * 100.0,
                };
                ProductPerformance {
                    average_value: stats.value / stats.transactions as f64,
                    entity,
                    value: stats.value,
                    margin_percent,
                    transactions: stats.transactions,
                }
            })
            .collect();
        // BTreeMap iteration already orders names ascending; the stable sort keeps that for ties
        performance.sort_by(|a, b| b.value.total_cmp(&a.value));

        let top_entity = performance.first().map(|entry| entry.entity.clone()).unwrap_or_default();
        debug!(entities = performance.len(), top_entity = top_entity.as_str(), "grouped product performance");
        if let Some(limit) = self.config.product_limit {
            performance.truncate(limit);
        }
        (performance, top_entity)
    }
}

/// Analyzes with the default [`AnalyzerConfig`].
pub fn analyze(table: &Table, roles: &RoleMapping) -> Result<AnalysisResult, RustyPbixError> {
    Analyzer::default().analyze(table, roles)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::classifier::classify;
    use crate::error::ErrorKind;

    fn text(value: &str) -> Scalar {
        Scalar::Text(value.to_owned())
    }

    fn date(y: i32, m: u32, d: u32) -> Scalar {
        Scalar::Date(NaiveDate::from_ymd_opt(y, m, d).unwrap())
    }

    fn run(names: &[&str], rows: Vec<Vec<Scalar>>) -> AnalysisResult {
        let table = Table::new(names.iter().map(|name| name.to_string()).collect(), rows).unwrap();
        analyze(&table, &classify(&table)).unwrap()
    }

    #[test]
    fn monthly_sales() {
        let result = run(
            &["date", "revenue", "product"],
            vec![
                vec![date(2024, 1, 1), Scalar::Number(100.0), text("A")],
                vec![date(2024, 2, 1), Scalar::Number(150.0), text("A")],
                vec![date(2024, 3, 1), Scalar::Number(90.0), text("B")],
            ],
        );
        assert_eq!(result.summary.total_revenue, 340.0);
        assert_eq!(result.summary.total_transactions, 3);
        assert_eq!(result.summary.top_entity, "A");
        assert_eq!(result.summary.max_transaction, 150.0);
        assert!((result.summary.growth_rate - -10.0).abs() < 1e-9);
        let periods: Vec<&str> = result.revenue_analysis.iter().map(|point| point.period.as_str()).collect();
        assert_eq!(periods, ["2024-01", "2024-02", "2024-03"]);
        assert_eq!(result.product_performance[0].entity, "A");
        assert_eq!(result.product_performance[0].value, 250.0);
        assert_eq!(result.product_performance[0].transactions, 2);
        assert_eq!(result.forecasts.len(), 3);
        assert_eq!(result.forecasts[0].period, "2024-04");
        assert_eq!(result.metadata.granularity, Some(Granularity::Month));
        assert!(!result.summary.degraded);
    }

    #[test]
    fn growth_examples() {
        let result = run(
            &["date", "revenue"],
            vec![vec![date(2023, 5, 1), Scalar::Number(100.0)], vec![date(2024, 5, 1), Scalar::Number(150.0)]],
        );
        assert_eq!(result.summary.growth_rate, 50.0);

        let result = run(
            &["date", "revenue"],
            vec![vec![date(2023, 5, 1), Scalar::Number(0.0)], vec![date(2024, 5, 1), Scalar::Number(100.0)]],
        );
        assert_eq!(result.summary.growth_rate, 0.0);
        assert!(result.summary.degraded);
        assert!(result.summary.degradations.contains(&Degradation::ZeroBaseGrowth));
    }

    #[test]
    fn missing_roles_degrade() {
        let result = run(&["note"], vec![vec![text("x")], vec![text("y")]]);
        assert_eq!(result.summary.total_revenue, 0.0);
        assert_eq!(result.summary.top_entity, "");
        assert!(result.product_performance.is_empty());
        assert!(result.forecasts.is_empty());
        assert_eq!(result.revenue_analysis, vec![RevenuePoint { period: UNDATED_PERIOD.to_owned(), value: 0.0 }]);
        for degradation in [
            Degradation::SyntheticRevenue,
            Degradation::NoTimeAxis,
            Degradation::NoCategory,
            Degradation::ForecastUnavailable,
        ] {
            assert!(result.summary.degradations.contains(&degradation), "{degradation:?}");
        }
    }

    #[test]
    fn undated_rows_keep_totals_exact() {
        let result = run(
            &["date", "revenue", "region"],
            vec![
                vec![date(2024, 1, 5), Scalar::Number(0.1), text("N")],
                vec![date(2024, 2, 5), Scalar::Number(0.2), text("N")],
                vec![text("unknown"), Scalar::Number(0.3), Scalar::Null],
            ],
        );
        let series_sum = result.revenue_analysis.iter().map(|point| point.value).sum::<f64>();
        assert_eq!(series_sum, result.summary.total_revenue);
        assert_eq!(result.revenue_analysis.last().unwrap().period, UNDATED_PERIOD);
        assert!(result.summary.degradations.contains(&Degradation::UndatedRows));
        assert!(result.product_performance.iter().any(|entry| entry.entity == BLANK_ENTITY));
    }

    #[test]
    fn margins() {
        let rows = vec![
            vec![text("A"), Scalar::Number(200.0), Scalar::Number(50.0)],
            vec![text("A"), Scalar::Number(200.0), Scalar::Number(30.0)],
            vec![text("B"), Scalar::Number(100.0), Scalar::Number(10.0)],
        ];
        let result = run(&["product", "sales", "profit"], rows.clone());
        assert_eq!(result.product_performance[0].margin_percent, 20.0);
        assert_eq!(result.product_performance[1].margin_percent, 10.0);

        let result = run(&["product", "sales", "margin_pct"], rows);
        assert_eq!(result.product_performance[0].margin_percent, 40.0);

        let table = Table::new(
            vec!["product".into(), "sales".into()],
            vec![vec![text("A"), Scalar::Number(1.0)], vec![text("A"), Scalar::Number(2.0)]],
        ).unwrap();
        let config = AnalyzerConfig { default_margin_percent: 12.5, ..AnalyzerConfig::default() };
        let result = Analyzer::new(config).analyze(&table, &classify(&table)).unwrap();
        assert_eq!(result.product_performance[0].margin_percent, 12.5);
    }

    #[test]
    fn ties_and_limits() {
        let table = Table::new(
            vec!["product".into(), "sales".into()],
            vec![
                vec![text("B"), Scalar::Number(5.0)],
                vec![text("A"), Scalar::Number(5.0)],
                vec![text("C"), Scalar::Number(1.0)],
                vec![text("C"), Scalar::Number(1.0)],
            ],
        ).unwrap();
        let config = AnalyzerConfig { product_limit: Some(2), ..AnalyzerConfig::default() };
        let result = Analyzer::new(config).analyze(&table, &classify(&table)).unwrap();
        assert_eq!(result.summary.top_entity, "A");
        let entities: Vec<&str> = result.product_performance.iter().map(|entry| entry.entity.as_str()).collect();
        assert_eq!(entities, ["A", "B"]);
    }

    #[test]
    fn required_forecast_fails() {
        let table = Table::new(
            vec!["date".into(), "revenue".into()],
            vec![vec![date(2024, 1, 1), Scalar::Number(1.0)], vec![date(2024, 1, 1), Scalar::Number(2.0)]],
        ).unwrap();
        let config = AnalyzerConfig { require_forecast: true, ..AnalyzerConfig::default() };
        let error = Analyzer::new(config).analyze(&table, &classify(&table)).unwrap_err();
        assert_eq!(error.kind(), ErrorKind::InsufficientData);
    }

    #[test]
    fn forced_granularity() {
        let table = Table::new(
            vec!["date".into(), "revenue".into()],
            vec![vec![date(2024, 1, 1), Scalar::Number(1.0)], vec![date(2024, 1, 2), Scalar::Number(2.0)]],
        ).unwrap();
        let config = AnalyzerConfig { granularity: Some(Granularity::Month), ..AnalyzerConfig::default() };
        let result = Analyzer::new(config).analyze(&table, &classify(&table)).unwrap();
        assert_eq!(result.revenue_analysis, vec![RevenuePoint { period: "2024-01".to_owned(), value: 3.0 }]);
        assert!(result.summary.degradations.contains(&Degradation::SinglePeriod));
    }
}
