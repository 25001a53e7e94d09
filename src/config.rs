//! TOML-based configuration for loading, classification and analysis.
//!
//! Every section is optional; a file only needs the keys it overrides.
//!
//! Example configuration:
//! ```toml
//! [load]
//! null_literals = ["", "n/a", "-"]
//! csv_delimiter = ";"
//!
//! [classifier]
//! revenue_vocabulary = ["revenue", "turnover"]
//!
//! [analyzer]
//! forecast_horizon = 6
//! default_margin_percent = 25.0
//! granularity = "month"
//!
//! [analyzer.polarity]
//! "Average Deal Size Growth" = "lower_is_better"
//! ```

use crate::analysis::Granularity;
use crate::error::RustyPbixError;
use serde::Deserialize;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// Root configuration structure.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub load: LoadOptions,
    pub classifier: ClassifierConfig,
    pub analyzer: AnalyzerConfig,
}

impl Config {
    pub fn from_toml_str(text: &str) -> Result<Config, RustyPbixError> {
        let config: Config = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Config, RustyPbixError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .map_err(|e| RustyPbixError::ConfigError(format!("{}: {}", path.display(), e)))?;
        Self::from_toml_str(&text)
    }

    fn validate(&self) -> Result<(), RustyPbixError> {
        let threshold = self.classifier.date_parse_threshold;
        if !(threshold > 0.0 && threshold <= 1.0) {
            Err(RustyPbixError::ConfigError(format!("date_parse_threshold must be in (0, 1], got {threshold}")))?
        }
        if !self.analyzer.default_margin_percent.is_finite() {
            Err(RustyPbixError::ConfigError("default_margin_percent must be finite".to_owned()))?
        }
        if !self.load.csv_delimiter.is_ascii() {
            Err(RustyPbixError::ConfigError(format!("csv_delimiter '{}' is not an ASCII character", self.load.csv_delimiter)))?
        }
        Ok(())
    }
}

/// How raw cells become table values.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct LoadOptions {
    /// The first row (or first Excel row) holds the column names
    pub header: bool,
    /// Cell texts that denote a missing value, compared after trimming
    pub null_literals: Vec<String>,
    /// Excel error cells (`#DIV/0!`, ...) load as nulls instead of failing
    pub error_as_null: bool,
    /// Rows whose cells are all null are dropped
    pub skip_empty_rows: bool,
    pub csv_delimiter: char,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            header: true,
            null_literals: ["", "NA", "N/A", "null", "NULL", "None", "-"].map(String::from).to_vec(),
            error_as_null: true,
            skip_empty_rows: true,
            csv_delimiter: ',',
        }
    }
}

/// Vocabularies and thresholds used to assign column roles.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct ClassifierConfig {
    pub time_vocabulary: Vec<String>,
    pub revenue_vocabulary: Vec<String>,
    pub margin_vocabulary: Vec<String>,
    /// Minimum share of non-null values that must parse as dates
    pub date_parse_threshold: f64,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            time_vocabulary: ["date", "period", "month", "time"].map(String::from).to_vec(),
            revenue_vocabulary: ["revenue", "sales", "amount", "price", "total"].map(String::from).to_vec(),
            margin_vocabulary: ["margin", "profit"].map(String::from).to_vec(),
            date_parse_threshold: 0.9,
        }
    }
}

/// Whether an increase of a metric is good news.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Polarity {
    HigherIsBetter,
    LowerIsBetter,
}

impl Polarity {
    /// Decides favorability of a percent change under this polarity.
    pub fn is_favorable(self, change_percent: f64) -> bool {
        match self {
            Polarity::HigherIsBetter => change_percent >= 0.0,
            Polarity::LowerIsBetter => change_percent <= 0.0,
        }
    }
}

/// Tunables of the Analyzer. Nothing here is hard-coded in the analysis itself.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct AnalyzerConfig {
    /// Number of periods to forecast
    pub forecast_horizon: usize,
    /// Margin reported for every entity when the table has no margin column
    pub default_margin_percent: f64,
    /// Polarity per trend metric name
    pub polarity: BTreeMap<String, Polarity>,
    /// Polarity of metrics missing from `polarity`
    pub default_polarity: Polarity,
    /// Maximum number of product performance entries, after sorting
    pub product_limit: Option<usize>,
    /// Maximum number of generic numeric columns reported as trends
    pub numeric_trend_limit: usize,
    /// Forces a period granularity instead of automatic escalation
    pub granularity: Option<Granularity>,
    /// Fail the analysis when forecasting is impossible instead of degrading
    pub require_forecast: bool,
}

impl AnalyzerConfig {
    pub fn polarity_of(&self, metric: &str) -> Polarity {
        self.polarity.get(metric).copied().unwrap_or(self.default_polarity)
    }
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        let polarity = [
            ("Revenue Growth", Polarity::HigherIsBetter),
            ("Transaction Growth", Polarity::HigherIsBetter),
            ("Average Deal Size Growth", Polarity::HigherIsBetter),
            ("Cost", Polarity::LowerIsBetter),
            ("Costs", Polarity::LowerIsBetter),
            ("Expense", Polarity::LowerIsBetter),
            ("Expenses", Polarity::LowerIsBetter),
            ("Discount", Polarity::LowerIsBetter),
            ("Returns", Polarity::LowerIsBetter),
        ]
        .into_iter()
        .map(|(metric, polarity)| (metric.to_owned(), polarity))
        .collect();
        Self {
            forecast_horizon: 3,
            default_margin_percent: 0.0,
            polarity,
            default_polarity: Polarity::HigherIsBetter,
            product_limit: Some(10),
            numeric_trend_limit: 5,
            granularity: None,
            require_forecast: false,
        }
    }
}
