use crate::analysis::period::Granularity;
use crate::analysis::role::ColumnRole;
use serde::Deserialize;
use serde::Serialize;

/// A documented fallback the Analyzer applied instead of failing.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Degradation {
    /// No revenue column; every row counted as zero revenue
    SyntheticRevenue,
    /// No time axis; all rows fall in the undated bucket
    NoTimeAxis,
    /// Fewer than two dated periods; growth rate is zero
    SinglePeriod,
    /// The first period's revenue is zero; growth rate is zero
    ZeroBaseGrowth,
    /// Some rows had no parseable time value
    UndatedRows,
    /// No category column; product performance is empty
    NoCategory,
    /// Forecasting needs at least two dated periods
    ForecastUnavailable,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub total_revenue: f64,
    /// Percent change from the first to the last dated period
    pub growth_rate: f64,
    pub total_transactions: u64,
    pub top_entity: String,
    #[serde(default)]
    pub average_transaction: f64,
    #[serde(default)]
    pub max_transaction: f64,
    #[serde(default)]
    pub degraded: bool,
    #[serde(default)]
    pub degradations: Vec<Degradation>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RevenuePoint {
    pub period: String,
    pub value: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProductPerformance {
    pub entity: String,
    pub value: f64,
    pub margin_percent: f64,
    #[serde(default)]
    pub transactions: u64,
    #[serde(default)]
    pub average_value: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Trend {
    pub metric: String,
    pub change_percent: f64,
    pub is_favorable: bool,
    /// `up`, `down` or `flat`
    #[serde(default)]
    pub direction: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Forecast {
    pub period: String,
    pub predicted_value: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RoleAssignment {
    pub column: String,
    pub role: ColumnRole,
}

/// Shape of the analyzed table; carries no timestamp so results stay reproducible.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Metadata {
    pub rows: u64,
    pub columns: u64,
    pub column_names: Vec<String>,
    pub roles: Vec<RoleAssignment>,
    pub granularity: Option<Granularity>,
}

/// Everything one analysis produces. Field names are the JSON contract
/// consumed by the presentation layer and accepted back for packaging.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub summary: Summary,
    pub revenue_analysis: Vec<RevenuePoint>,
    pub product_performance: Vec<ProductPerformance>,
    pub trends: Vec<Trend>,
    pub forecasts: Vec<Forecast>,
    #[serde(default)]
    pub metadata: Metadata,
}

impl AnalysisResult {
    pub fn to_json(&self, pretty: bool) -> Result<String, crate::error::RustyPbixError> {
        let json = if pretty {
            serde_json::to_string_pretty(self)?
        } else {
            serde_json::to_string(self)?
        };
        Ok(json)
    }

    pub fn from_json(text: &str) -> Result<AnalysisResult, crate::error::RustyPbixError> {
        Ok(serde_json::from_str(text)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_contract_without_supplements() {
        let json = r#"{
            "summary": {"total_revenue": 340, "growth_rate": -10, "total_transactions": 3, "top_entity": "A"},
            "revenue_analysis": [{"period": "2024-01", "value": 100}],
            "product_performance": [{"entity": "A", "value": 250, "margin_percent": 0}],
            "trends": [{"metric": "Revenue Growth", "change_percent": 5.5, "is_favorable": true}],
            "forecasts": [{"period": "2024-02", "predicted_value": 110}]
        }"#;
        let result = AnalysisResult::from_json(json).unwrap();
        assert_eq!(result.summary.total_revenue, 340.0);
        assert_eq!(result.summary.top_entity, "A");
        assert_eq!(result.product_performance[0].transactions, 0);
        assert!(result.metadata.column_names.is_empty());
    }

    #[test]
    fn serializes_contract_names() {
        let mut result = AnalysisResult::default();
        result.summary.degradations.push(Degradation::ZeroBaseGrowth);
        let value: serde_json::Value = serde_json::from_str(&result.to_json(false).unwrap()).unwrap();
        for key in ["summary", "revenue_analysis", "product_performance", "trends", "forecasts"] {
            assert!(value.get(key).is_some(), "missing {key}");
        }
        assert_eq!(value["summary"]["degradations"][0], "zero_base_growth");
        assert!(value["summary"].get("growth_rate").is_some());
    }
}
