use crate::error::ResultOptionChain;
use crate::error::RustyPbixError;
use crate::helpers::biff8::Biff8Reader;
use crate::helpers::cfb::Cfb;
use crate::match_biff8_record;
use crate::spreadsheet::cell::to_error_value;
use crate::spreadsheet::cell::Cell;
use crate::spreadsheet::cell::CellType;
use crate::spreadsheet::excel::load_number_formats;
use crate::spreadsheet::reference::index_to_reference;
use crate::spreadsheet::sheet::Sheet;
use crate::spreadsheet::Spreadsheet;
use crate::spreadsheet::SpreadsheetError;
use either::Either;
use std::collections::HashMap;
use thiserror::Error;

// BIFF8 record type identifiers
const FORMULA: u16 = 6;        // Formula record with its cached result
const EOF: u16 = 10;           // End of a substream
const DATE1904: u16 = 34;      // Date system flag (1904 vs 1900 base)
const FILE_PASS: u16 = 47;     // File password protection record
const CODE_PAGE: u16 = 66;     // Character encoding specification
const BOUND_SHEET8: u16 = 133; // Sheet name, type and stream position
const MUL_RK: u16 = 189;       // Run of RK numbers in one row
const XF: u16 = 224;           // Extended format record for cell styling
const SST: u16 = 252;          // Shared string table
const LABEL_SST: u16 = 253;    // Label referencing shared string table
const NUMBER: u16 = 515;       // Numeric cell value
const LABEL: u16 = 516;        // Text label cell value
const BOOL_ERR: u16 = 517;     // Boolean or error cell value
const STRING: u16 = 519;       // String result of the preceding formula
const ARRAY: u16 = 545;        // Array formula, may sit between FORMULA and STRING
const RK: u16 = 638;           // Compressed numeric cell value
const FORMAT: u16 = 1054;      // Custom number format definition
const SHARED_FORMULA: u16 = 1212; // Shared formula, may sit between FORMULA and STRING
const BOF: u16 = 2057;         // Beginning of a substream

/// Error types specific to XLS file parsing
#[derive(Error, Debug)]
pub enum XlsError {
    #[error("Invalid Code page '{0}'")]
    CodePageError(u16),

    #[error("Invalid Formula value '{0}'")]
    FormulaValueError(u64),
}

/// An Excel 97-2003 workbook held in memory
pub(crate) struct XlsSpreadsheet {
    reader: Biff8Reader,
    shared_strings: Vec<String>,
    /// Cell type per XF index
    number_formats: Vec<CellType>,
    /// Worksheets with their BOF offsets in the workbook stream
    sheets: Vec<(String, usize)>,
}

impl XlsSpreadsheet {
    /// Reads the workbook globals substream: code page, formats, shared strings and sheet offsets
    pub(crate) fn open(bytes: &[u8]) -> Result<XlsSpreadsheet, RustyPbixError> {
        let cfb = Cfb::new(bytes)?;
        if cfb.exists("EncryptedPackage") {
            Err(SpreadsheetError::SpreadsheetPasswordProtectedError)?
        }
        let mut reader = cfb.read("Workbook")
            .ok_none_else(|| cfb.read("Book"))?
            .map(Biff8Reader::new)
            .ok_or(SpreadsheetError::SpreadsheetEmptyError)?;
        let mut is_1904 = false;
        let mut shared_strings = Vec::new();
        let mut custom_formats: HashMap<String, CellType> = HashMap::new();
        let mut format_indexes: Vec<String> = Vec::new();
        let mut sheets: Vec<(String, usize)> = Vec::new();
        match_biff8_record!(reader => {
            EOF => break,
            FILE_PASS => Err(SpreadsheetError::SpreadsheetPasswordProtectedError)?,
            DATE1904 if reader.read_u16()? == 1 => is_1904 = true,
            CODE_PAGE => {
                let code_page = reader.read_u16()?;
                reader.encoding = codepage::to_encoding(code_page).ok_or(XlsError::CodePageError(code_page))?;
            }
            FORMAT => {
                let id = reader.read_u16()?;
                let format = reader.read_string()?;
                custom_formats.insert(
                    id.to_string(),
                    CellType::parse_custom_number_format(&format, is_1904),
                );
            }
            XF => {
                reader.skip(2)?;
                let id = reader.read_u16()?;
                format_indexes.push(id.to_string());
            }
            SST => shared_strings = load_shared_strings(&mut reader)?,
            BOUND_SHEET8 => {
                let pointer = reader.read_u32()? as usize;
                let _visibility = reader.read_u8()?;
                let sheet_type = reader.read_u8()?;
                let sheet_name = reader.read_short_string()?;
                // 0 = worksheet; macro sheets, charts and VB modules carry no table
                if sheet_type == 0 {
                    sheets.push((sheet_name, pointer));
                }
            }
        });
        if sheets.is_empty() {
            Err(SpreadsheetError::SpreadsheetEmptyError)?
        }

        let number_formats = load_number_formats(format_indexes, custom_formats, is_1904);

        Ok(XlsSpreadsheet {
            reader,
            shared_strings,
            number_formats,
            sheets,
        })
    }

    fn format(&self, index: usize) -> CellType {
        self.number_formats.get(index).copied().unwrap_or(CellType::Number)
    }
}

impl Spreadsheet for XlsSpreadsheet {
    fn sheet_names(&self) -> Vec<String> {
        self.sheets.iter().map(|(name, _)| name.to_owned()).collect()
    }

    /// Reads the cell records of one worksheet substream
    fn read_sheet(&mut self, index: usize, error_as_null: bool) -> Result<Sheet, RustyPbixError> {
        let (sheet_name, pointer) = self.sheets.get(index)
            .cloned()
            .ok_or(SpreadsheetError::SpreadsheetEmptyError)?;
        self.reader.seek(pointer);
        if self.reader.next()? != Some(BOF) {
            Err(SpreadsheetError::FileError(sheet_name.to_owned()))?
        }

        let mut sheet = Sheet::new(&sheet_name);
        while let Some(tag) = self.reader.next()? {
            match tag {
                BOF | EOF => break,
                MUL_RK => {
                    let row = self.reader.read_u16()? as usize;
                    let col_lower_bound = self.reader.read_u16()? as usize;
                    let col_upper_bound = self.reader.peek_u16_from_end(2)? as usize;
                    for col in col_lower_bound..=col_upper_bound {
                        let format = self.reader.read_u16()? as usize;
                        let kind = self.format(format);
                        let value = self.reader.read_rk()?;
                        sheet.push(Cell {
                            row,
                            col,
                            kind,
                            value: value.to_string(),
                        });
                    }
                }
                BOOL_ERR | NUMBER | RK | LABEL_SST | LABEL | FORMULA => {
                    let row = self.reader.read_u16()? as usize;
                    let col = self.reader.read_u16()? as usize;
                    let (either, value) = match tag {
                        BOOL_ERR => read_bool_or_error_cell(&mut self.reader)?,
                        NUMBER => read_number_cell(&mut self.reader)?,
                        RK => read_rk_cell(&mut self.reader)?,
                        LABEL_SST => read_label_sst_cell(&mut self.reader, &self.shared_strings)?,
                        LABEL => read_label_cell(&mut self.reader)?,
                        _ => read_formula_cell(&mut self.reader)?,
                    };
                    let kind = match either {
                        Either::Left(kind) => kind,
                        Either::Right(index) => self.format(index),
                    };
                    if kind != CellType::Error {
                        if !value.is_empty() {
                            sheet.push(Cell {
                                row,
                                col,
                                kind,
                                value,
                            });
                        }
                    } else if !error_as_null {
                        Err(SpreadsheetError::CellValueError(index_to_reference(row, col), value))?
                    }
                }
                _ => (),
            }
        }
        Ok(sheet)
    }
}

/// Loads the shared string table from the SST record
fn load_shared_strings(reader: &mut Biff8Reader) -> Result<Vec<String>, RustyPbixError> {
    reader.skip(4)?;
    let count = reader.read_u32()? as usize;
    // The count comes from the file; cap the preallocation
    let mut shared_strings: Vec<String> = Vec::with_capacity(count.min(65_536));
    for _ in 0..count {
        shared_strings.push(reader.read_rich_string()?);
    }
    Ok(shared_strings)
}

/// BOOL_ERR stores either a boolean or an error code, told apart by a flag byte
fn read_bool_or_error_cell(reader: &mut Biff8Reader) -> Result<(Either<CellType, usize>, String), RustyPbixError> {
    reader.skip(2)?;
    let value = reader.read_u8()?;
    let flag = reader.read_u8()?;
    if flag == 0 {
        Ok((Either::Left(CellType::Boolean), value.to_string()))
    } else {
        Ok((Either::Left(CellType::Error), to_error_value(value).to_owned()))
    }
}

fn read_number_cell(reader: &mut Biff8Reader) -> Result<(Either<CellType, usize>, String), RustyPbixError> {
    let index = reader.read_u16()? as usize;
    let value = reader.read_f64()?;
    Ok((Either::Right(index), value.to_string()))
}

fn read_rk_cell(reader: &mut Biff8Reader) -> Result<(Either<CellType, usize>, String), RustyPbixError> {
    let index = reader.read_u16()? as usize;
    let value = reader.read_rk()?;
    Ok((Either::Right(index), value.to_string()))
}

fn read_label_sst_cell(reader: &mut Biff8Reader, shared_strings: &[String]) -> Result<(Either<CellType, usize>, String), RustyPbixError> {
    reader.skip(2)?;
    let index = reader.read_u32()? as usize;
    let value = shared_strings.get(index)
        .cloned()
        .ok_or_else(|| SpreadsheetError::CellValueError(format!("sst#{index}"), index.to_string()))?;
    Ok((Either::Left(CellType::Text), value))
}

fn read_label_cell(reader: &mut Biff8Reader) -> Result<(Either<CellType, usize>, String), RustyPbixError> {
    reader.skip(2)?;
    let value = reader.read_string()?;
    Ok((Either::Left(CellType::Text), value))
}

/// Reads the cached result of a FORMULA record.
/// A string result lives in the STRING record that follows.
fn read_formula_cell(reader: &mut Biff8Reader) -> Result<(Either<CellType, usize>, String), RustyPbixError> {
    let index = reader.read_u16()? as usize;
    let formula = reader.read_u64()?;
    let is_number = (formula & 0xFFFF000000000000) != 0xFFFF000000000000;
    let flag = formula & 0xFF;
    if is_number {
        Ok((Either::Right(index), f64::from_bits(formula).to_string()))
    } else if flag == 0 {
        loop {
            match reader.next()? {
                Some(STRING) => {
                    let value = reader.read_string()?;
                    return Ok((Either::Left(CellType::Text), value));
                }
                Some(SHARED_FORMULA) | Some(ARRAY) => continue,
                _ => Err(XlsError::FormulaValueError(formula))?,
            }
        }
    } else if flag == 1 {
        let value = if (formula & 0xFF0000) > 0 { "1" } else { "0" };
        Ok((Either::Left(CellType::Boolean), value.to_owned()))
    } else if flag == 2 {
        let code = ((formula >> 16) & 0xFF) as u8;
        Ok((Either::Left(CellType::Error), to_error_value(code).to_owned()))
    } else if flag == 3 {
        Ok((Either::Left(CellType::Text), "".to_owned()))
    } else {
        Err(XlsError::FormulaValueError(formula))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(kind: u16, payload: &[u8]) -> Vec<u8> {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&kind.to_le_bytes());
        bytes.extend_from_slice(&(payload.len() as u16).to_le_bytes());
        bytes.extend_from_slice(payload);
        bytes
    }

    fn formula(result: u64) -> Vec<u8> {
        let mut payload = vec![0u8; 6]; // row, col, xf
        payload.extend_from_slice(&result.to_le_bytes());
        payload.extend_from_slice(&[0u8; 6]);
        payload
    }

    #[test]
    fn formula_string_result_follows_in_string_record() {
        let mut stream = record(FORMULA, &formula(0xFFFF_0000_0000_0000));
        stream.extend(record(SHARED_FORMULA, &[0u8; 4]));
        stream.extend(record(STRING, &[2, 0, 0, b'o', b'k']));
        let mut reader = Biff8Reader::new(stream);
        assert_eq!(reader.next().unwrap(), Some(FORMULA));
        reader.skip(4).unwrap();
        let (kind, value) = read_formula_cell(&mut reader).unwrap();
        assert_eq!(kind, Either::Left(CellType::Text));
        assert_eq!(value, "ok");
    }

    #[test]
    fn formula_boolean_and_number_results() {
        let stream = record(FORMULA, &formula(0xFFFF_0000_0001_0001));
        let mut reader = Biff8Reader::new(stream);
        reader.next().unwrap();
        reader.skip(4).unwrap();
        let (kind, value) = read_formula_cell(&mut reader).unwrap();
        assert_eq!(kind, Either::Left(CellType::Boolean));
        assert_eq!(value, "1");

        let stream = record(FORMULA, &formula(2.5f64.to_bits()));
        let mut reader = Biff8Reader::new(stream);
        reader.next().unwrap();
        reader.skip(4).unwrap();
        let (kind, value) = read_formula_cell(&mut reader).unwrap();
        assert_eq!(kind, Either::Right(0));
        assert_eq!(value, "2.5");
    }

    #[test]
    fn rejects_non_compound_bytes() {
        assert!(XlsSpreadsheet::open(b"not an ole file").is_err());
    }
}
