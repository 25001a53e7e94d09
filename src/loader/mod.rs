//! Table Loader: turns uploaded bytes of a declared format into a [`Table`].
//!
//! The declared format is checked before the bytes are touched. Any parse
//! failure below this boundary surfaces as `MalformedInputError`.

mod csv;
mod excel;
mod json;

use crate::config::LoadOptions;
use crate::error::ResultMessage;
use crate::error::RustyPbixError;
use crate::table::Table;
use std::fmt::Display;
use std::path::Path;
use std::str::FromStr;
use tracing::debug;

/// Input formats the loader understands.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum InputFormat {
    Csv,
    /// XLSX, XLSM or XLS; the container is detected from the bytes
    Excel,
    /// A JSON array of objects
    Json,
}

impl InputFormat {
    /// Maps a file extension to a format.
    pub fn from_path(path: impl AsRef<Path>) -> Result<InputFormat, RustyPbixError> {
        let path = path.as_ref();
        let extension = path
            .extension()
            .and_then(|extension| extension.to_str())
            .ok_or_else(|| RustyPbixError::UnsupportedFormatError(path.display().to_string()))?;
        extension.parse()
    }

    pub const fn as_str(&self) -> &'static str {
        match self {
            InputFormat::Csv => "csv",
            InputFormat::Excel => "excel",
            InputFormat::Json => "json",
        }
    }
}

impl FromStr for InputFormat {
    type Err = RustyPbixError;

    /// Accepts `csv`, `excel`, `xlsx`, `xlsm`, `xls` and `json`, in any case, with an optional leading dot.
    fn from_str(name: &str) -> Result<Self, Self::Err> {
        let normalized = name.trim().trim_start_matches('.').to_ascii_lowercase();
        match normalized.as_str() {
            "csv" => Ok(InputFormat::Csv),
            "excel" | "xlsx" | "xlsm" | "xls" => Ok(InputFormat::Excel),
            "json" => Ok(InputFormat::Json),
            _ => Err(RustyPbixError::UnsupportedFormatError(name.to_owned())),
        }
    }
}

impl Display for InputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Loads `bytes` declared as `declared_format` with default options.
pub fn load(bytes: &[u8], declared_format: &str) -> Result<Table, RustyPbixError> {
    let format = declared_format.parse::<InputFormat>()?;
    load_with(bytes, format, &LoadOptions::default())
}

pub fn load_with(bytes: &[u8], format: InputFormat, options: &LoadOptions) -> Result<Table, RustyPbixError> {
    if bytes.is_empty() {
        Err(RustyPbixError::MalformedInputError(format!("empty {format} input")))?
    }
    debug!(%format, size = bytes.len(), "loading table");
    let (names, rows) = match format {
        InputFormat::Csv => csv::read_csv(bytes, options),
        InputFormat::Excel => excel::read_excel(bytes, options),
        InputFormat::Json => json::read_json(bytes, options),
    }
    .or_malformed(format.as_str())?;

    let rows = if options.skip_empty_rows {
        rows.into_iter().filter(|row| row.iter().any(|value| !value.is_null())).collect()
    } else {
        rows
    };
    let table = Table::new(names, rows)?;
    debug!(rows = table.row_count(), columns = table.column_count(), "loaded table");
    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn format_names() {
        assert_eq!("CSV".parse::<InputFormat>().unwrap(), InputFormat::Csv);
        assert_eq!(".xlsx".parse::<InputFormat>().unwrap(), InputFormat::Excel);
        assert_eq!("xls".parse::<InputFormat>().unwrap(), InputFormat::Excel);
        assert_eq!("Json".parse::<InputFormat>().unwrap(), InputFormat::Json);
        assert_eq!(InputFormat::from_path("data/sales.XLSM").unwrap(), InputFormat::Excel);
        assert_eq!(InputFormat::from_path("report.pdf").unwrap_err().kind(), ErrorKind::UnsupportedFormat);
        assert_eq!(InputFormat::from_path("README").unwrap_err().kind(), ErrorKind::UnsupportedFormat);
    }

    #[test]
    fn unsupported_format_is_rejected_first() {
        let error = load(b"", "pdf").unwrap_err();
        assert_eq!(error.kind(), ErrorKind::UnsupportedFormat);
    }

    #[test]
    fn empty_or_broken_input_is_malformed() {
        assert_eq!(load(b"", "csv").unwrap_err().kind(), ErrorKind::MalformedInput);
        assert_eq!(load(b"date,revenue\n", "csv").unwrap_err().kind(), ErrorKind::MalformedInput);
        assert_eq!(load(b"{\"a\": ", "json").unwrap_err().kind(), ErrorKind::MalformedInput);
        assert_eq!(load(b"PK\x03\x04 truncated", "xlsx").unwrap_err().kind(), ErrorKind::MalformedInput);
        assert_eq!(load(b"not a workbook", "excel").unwrap_err().kind(), ErrorKind::MalformedInput);
    }

    #[test]
    fn blank_rows_are_skipped() {
        let table = load(b"a,b\n1,2\n,\n3,4\n", "csv").unwrap();
        assert_eq!(table.row_count(), 2);

        let options = LoadOptions { skip_empty_rows: false, ..LoadOptions::default() };
        let table = load_with(b"a,b\n1,2\n,\n3,4\n", InputFormat::Csv, &options).unwrap();
        assert_eq!(table.row_count(), 3);
    }
}
