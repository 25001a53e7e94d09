//! Column classification and business analysis of a loaded [`Table`](crate::table::Table).

mod analyzer;
mod classifier;
mod forecast;
mod period;
mod result;
mod role;
mod trends;

pub use analyzer::analyze;
pub use analyzer::Analyzer;
pub use analyzer::BLANK_ENTITY;
pub use analyzer::UNDATED_PERIOD;
pub use classifier::classify;
pub use classifier::classify_with;
pub use forecast::forecast;
pub use period::Granularity;
pub use result::AnalysisResult;
pub use result::Degradation;
pub use result::Forecast;
pub use result::Metadata;
pub use result::ProductPerformance;
pub use result::RevenuePoint;
pub use result::RoleAssignment;
pub use result::Summary;
pub use result::Trend;
pub use role::ColumnRole;
pub use role::RoleMapping;
