//! Workbook readers for the Excel input formats.
//!
//! Both readers work on the uploaded bytes held in memory. The container is
//! picked from the byte signature rather than the declared extension, so an
//! `.xls` upload that is really an `.xlsx` still loads.

pub(crate) mod cell;
mod excel;
pub(crate) mod reference;
pub(crate) mod sheet;
pub(crate) mod xls;
mod xlsx;

use crate::error::RustyPbixError;
use crate::helpers::cfb::is_compound_file;
use crate::spreadsheet::sheet::Sheet;
use crate::spreadsheet::xls::XlsSpreadsheet;
use crate::spreadsheet::xlsx::XlsxSpreadsheet;
use thiserror::Error;
use tracing::debug;

const ZIP_SIGNATURE: &[u8] = b"PK\x03\x04";

/// Errors raised while reading a workbook
#[derive(Error, Debug)]
pub enum SpreadsheetError {
    #[error("Missing workbook part '{0}'")]
    FileError(String),

    #[error("Workbook has no worksheets")]
    SpreadsheetEmptyError,

    #[error("Workbook is password protected")]
    SpreadsheetPasswordProtectedError,

    #[error("Invalid cell value at {0}: '{1}'")]
    CellValueError(String, String),

    #[error("Not an Excel workbook (unknown signature)")]
    SignatureError,
}

/// A workbook whose worksheets can be read one at a time.
pub(crate) trait Spreadsheet {
    /// Names of the worksheets in workbook order
    fn sheet_names(&self) -> Vec<String>;

    /// Reads every cell of the worksheet at `index`
    fn read_sheet(&mut self, index: usize, error_as_null: bool) -> Result<Sheet, RustyPbixError>;
}

/// Opens a workbook after sniffing its container signature.
pub(crate) fn open_spreadsheet(bytes: Vec<u8>) -> Result<Box<dyn Spreadsheet>, RustyPbixError> {
    if bytes.starts_with(ZIP_SIGNATURE) {
        debug!(size = bytes.len(), "reading workbook as xlsx");
        Ok(Box::new(XlsxSpreadsheet::open(bytes)?))
    } else if is_compound_file(&bytes) {
        debug!(size = bytes.len(), "reading workbook as xls");
        Ok(Box::new(XlsSpreadsheet::open(&bytes)?))
    } else {
        Err(SpreadsheetError::SignatureError)?
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_unknown_signature() {
        let error = open_spreadsheet(b"date,revenue\n".to_vec()).err().expect("not a workbook");
        assert!(error.to_string().contains("unknown signature"));
    }

    #[test]
    fn rejects_truncated_zip() {
        assert!(open_spreadsheet(b"PK\x03\x04\x14\x00".to_vec()).is_err());
    }
}
