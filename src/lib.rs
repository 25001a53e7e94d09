//! # Rusty PBIX
//!
//! Turns uploaded tabular business data into a structured analysis and, on
//! request, into a BI project archive.
//!
//! ## Pipeline
//!
//! - **Table Loader** ([`loader`]): CSV, Excel (`.xlsx`, `.xlsm`, `.xls`) or a
//!   JSON array of objects becomes a uniform [`Table`]. Only the first
//!   worksheet of a workbook is read.
//! - **Column Classifier** ([`analysis::classify`]): every column gets exactly
//!   one [`ColumnRole`], chosen by explicit, ranked rules.
//! - **Analyzer** ([`analysis::analyze`]): summary, revenue series, product
//!   performance, trends and a linear forecast. Classification fallbacks are
//!   reported as degradations instead of failures.
//! - **Model Builder**, **Report Layout Builder** and **Package Assembler**
//!   ([`package`]): the analysis becomes a data model, an overview page and the
//!   nine archive entries, written as a reproducible zip.
//!
//! Every stage is a pure function of its inputs. Nothing is shared between
//! calls, so the pipeline can run concurrently without locking.
//!
//! ## Example
//!
//! ```no_run
//! use rusty_pbix::Config;
//!
//! let csv = b"date,revenue,product\n2024-01-01,100,A\n2024-02-01,150,A\n2024-03-01,90,B\n";
//! let result = rusty_pbix::analyze_bytes(csv, "csv", &Config::default())?;
//! assert_eq!(result.summary.top_entity, "A");
//! let archive = rusty_pbix::export_bytes(&result)?;
//! # Ok::<(), rusty_pbix::RustyPbixError>(())
//! ```

pub mod analysis;
pub mod config;
pub mod error;
mod helpers;
pub mod loader;
pub mod package;
mod spreadsheet;
pub mod table;

pub use crate::analysis::AnalysisResult;
pub use crate::analysis::ColumnRole;
pub use crate::analysis::RoleMapping;
pub use crate::config::Config;
pub use crate::error::ErrorKind;
pub use crate::error::RustyPbixError;
pub use crate::loader::InputFormat;
pub use crate::package::Package;
pub use crate::table::Table;

use crate::analysis::Analyzer;
use tracing::info;

/// Loads, classifies and analyzes `bytes` declared as `format`.
pub fn analyze_bytes(bytes: &[u8], format: &str, config: &Config) -> Result<AnalysisResult, RustyPbixError> {
    let format = format.parse::<InputFormat>()?;
    let table = loader::load_with(bytes, format, &config.load)?;
    let roles = analysis::classify_with(&table, &config.classifier);
    let result = Analyzer::new(config.analyzer.clone()).analyze(&table, &roles)?;
    info!(
        rows = table.row_count(),
        columns = table.column_count(),
        degraded = result.summary.degraded,
        "analysis complete"
    );
    Ok(result)
}

/// Builds the model and layout of `result` and returns the archive bytes.
pub fn export_bytes(result: &AnalysisResult) -> Result<Vec<u8>, RustyPbixError> {
    let package = export_package(result)?;
    package.to_bytes()
}

/// Builds the package of `result` without writing the archive.
pub fn export_package(result: &AnalysisResult) -> Result<Package, RustyPbixError> {
    let model = package::build_model(result)?;
    let layout = package::build_layout(result);
    package::assemble(&model, &layout)
}
