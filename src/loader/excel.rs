use crate::config::LoadOptions;
use crate::error::RustyPbixError;
use crate::spreadsheet::cell::Cell;
use crate::spreadsheet::cell::CellType;
use crate::spreadsheet::open_spreadsheet;
use crate::spreadsheet::SpreadsheetError;
use crate::table::infer_scalar;
use crate::table::Scalar;
use tracing::debug;

/// Reads the first worksheet of an XLSX or XLS workbook. Other sheets are ignored.
pub(super) fn read_excel(bytes: &[u8], options: &LoadOptions) -> Result<(Vec<String>, Vec<Vec<Scalar>>), RustyPbixError> {
    let mut spreadsheet = open_spreadsheet(bytes.to_vec())?;
    let sheet_names = spreadsheet.sheet_names();
    if sheet_names.is_empty() {
        Err(SpreadsheetError::SpreadsheetEmptyError)?
    }
    if sheet_names.len() > 1 {
        debug!(ignored = sheet_names.len() - 1, "only the first worksheet is loaded");
    }

    let sheet = spreadsheet.read_sheet(0, options.error_as_null)?;
    if sheet.is_empty() {
        Err(RustyPbixError::MalformedInputError(format!("worksheet '{}' is empty", sheet.name)))?
    }
    let grid = sheet.rows(options.skip_empty_rows);
    let mut grid = grid.into_iter();

    let mut rows = Vec::<Vec<Scalar>>::new();
    let names = match grid.next() {
        Some(header) if options.header => header
            .iter()
            .map(|cell| cell.map(|cell| cell.value.trim().to_owned()).unwrap_or_default())
            .collect(),
        Some(first) => {
            let names = (1..=first.len()).map(|index| format!("column{index}")).collect();
            rows.push(to_row(&first, options)?);
            names
        }
        None => vec![],
    };
    for row in grid {
        rows.push(to_row(&row, options)?);
    }
    Ok((names, rows))
}

fn to_row(row: &[Option<&Cell>], options: &LoadOptions) -> Result<Vec<Scalar>, RustyPbixError> {
    row.iter()
        .map(|cell| match cell {
            Some(cell) => to_scalar(cell, options),
            None => Ok(Scalar::Null),
        })
        .collect()
}

/// Converts a typed cell; date-formatted numbers become dates directly and
/// text cells go through the same inference as CSV fields.
fn to_scalar(cell: &Cell, options: &LoadOptions) -> Result<Scalar, RustyPbixError> {
    let mapper = |message: String| SpreadsheetError::CellValueError(cell.reference(), message);
    let scalar = match cell.kind {
        CellType::Empty | CellType::Error => Scalar::Null,
        CellType::Boolean => Scalar::Text(cell.to_boolean().to_string()),
        CellType::Number => Scalar::Number(cell.to_double().map_err(mapper)?),
        CellType::NumberDate1900 | CellType::NumberDate1904 | CellType::IsoDateTime => {
            Scalar::Date(cell.to_date().map_err(mapper)?)
        }
        CellType::NumberTime => Scalar::Text(cell.to_time_string().map_err(mapper)?),
        CellType::Text => infer_scalar(&cell.value, options),
    };
    Ok(scalar)
}
