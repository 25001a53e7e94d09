use crate::spreadsheet::reference::index_to_reference;
use chrono::Duration;
use chrono::NaiveDate;
use chrono::NaiveDateTime;

/// Types of cell data in spreadsheet files.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub(crate) enum CellType {
    #[default]
    Empty,
    /// Boolean values (true/false)
    Boolean,
    /// Numeric values
    Number,
    /// Date or date/time values stored as serial numbers from the 1900 epoch
    NumberDate1900,
    /// Date or date/time values stored as serial numbers from the 1904 epoch
    NumberDate1904,
    /// Time-of-day values stored as day fractions
    NumberTime,
    /// ISO 8601 date/time strings
    IsoDateTime,
    /// Text stored in the cell or resolved from the shared string table
    Text,
    /// Error values
    Error,
}

impl CellType {
    fn date(is_1904: bool) -> Self {
        if is_1904 {
            Self::NumberDate1904
        } else {
            Self::NumberDate1900
        }
    }

    /// Maps built-in Excel number format IDs to a cell type.
    pub(crate) fn parse_builtin_number_format_id(id: &str, is_1904: bool) -> Option<Self> {
        match id {
            "14" | "15" | "16" | "17" | "22" => Some(Self::date(is_1904)),
            "18" | "19" | "20" | "21" | "45" | "46" | "47" => Some(Self::NumberTime),
            _ => None,
        }
    }

    /// Determines the cell type of a custom number format code.
    /// Literal sections, escapes and bracketed colors are ignored; any
    /// year or day token marks a date.
    pub(crate) fn parse_custom_number_format(format: &str, is_1904: bool) -> Self {
        let mut is_escaped = false;
        let mut is_literal = false;
        let mut is_date = false;
        let mut is_time = false;
        let mut is_color = false;
        for character in format.chars() {
            match character {
                _ if is_escaped => is_escaped = false,
                '_' | '\\' => is_escaped = true,

                '"' if is_literal => is_literal = false,
                '"' if !is_color => is_literal = true,

                ']' if is_color => is_color = false,
                '[' if !is_literal => is_color = true,
                _ if is_literal || is_color => (),

                'Y' | 'y' | 'D' | 'd' => is_date = true,
                'H' | 'h' | 'S' | 's' => is_time = true,
                _ => (),
            }
        }

        if is_date {
            Self::date(is_1904)
        } else if is_time {
            Self::NumberTime
        } else {
            Self::Number
        }
    }
}

/// Converts Excel error codes to their display strings.
pub(crate) fn to_error_value(value: u8) -> &'static str {
    match value {
        0x00 => "#NULL!",
        0x07 => "#DIV/0!",
        0x0F => "#VALUE!",
        0x17 => "#REF!",
        0x1D => "#NAME?",
        0x24 => "#NUM!",
        0x2A => "#N/A",
        0x2B => "#GETTING_DATA",
        _ => "#ERROR!",
    }
}

/// A single non-empty cell with its position, type and raw value.
#[derive(Clone, Debug)]
pub(crate) struct Cell {
    /// Row index (0-based)
    pub(crate) row: usize,
    /// Column index (0-based)
    pub(crate) col: usize,
    pub(crate) kind: CellType,
    /// Raw value as stored in the file
    pub(crate) value: String,
}

impl Cell {
    /// Returns the A1-style reference of this cell.
    pub(crate) fn reference(&self) -> String {
        index_to_reference(self.row, self.col)
    }

    pub(crate) fn to_boolean(&self) -> bool {
        self.value == "1" || self.value.eq_ignore_ascii_case("true")
    }

    pub(crate) fn to_double(&self) -> Result<f64, String> {
        self.value.parse::<f64>().map_err(|_| format!("parse '{}' at {} to double failed", self.value, self.reference()))
    }

    /// Converts a date-typed cell to a calendar date, dropping any time part.
    pub(crate) fn to_date(&self) -> Result<NaiveDate, String> {
        match self.kind {
            CellType::NumberDate1900 | CellType::NumberDate1904 => {
                let days = self.to_double()?.trunc() as i64;
                to_excel_date(days, self.kind == CellType::NumberDate1904)
                    .ok_or_else(|| format!("serial '{}' at {} is out of the date range", self.value, self.reference()))
            }
            CellType::IsoDateTime => {
                let value = self.value.as_str();
                NaiveDate::parse_from_str(value, "%Y-%m-%d")
                    .or_else(|_| NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f").map(|datetime| datetime.date()))
                    .map_err(|_| format!("parse '{}' at {} to date failed", value, self.reference()))
            }
            _ => Err(format!("cell {} is not a date", self.reference())),
        }
    }

    /// Formats a time-of-day cell as `HH:MM:SS`.
    pub(crate) fn to_time_string(&self) -> Result<String, String> {
        let fraction = self.to_double()?.fract();
        let mut seconds = (fraction * 86_400f64).round() as i64;
        let hours = seconds / 3600;
        seconds %= 3600;
        let minutes = seconds / 60;
        seconds %= 60;
        Ok(format!("{hours:02}:{minutes:02}:{seconds:02}"))
    }
}

/// Converts an Excel day serial to a date.
/// The 1900 system counts the nonexistent 1900-02-29 (the Lotus 1-2-3 leap year bug),
/// so serials below 60 are shifted by one day.
fn to_excel_date(days: i64, is_1904: bool) -> Option<NaiveDate> {
    let offset = if is_1904 {
        1462
    } else if days < 60 {
        1
    } else {
        0
    };
    let epoch = NaiveDate::from_ymd_opt(1899, 12, 30).expect("Hardcode epoch date");
    epoch.checked_add_signed(Duration::try_days(days.checked_add(offset)?)?)
}
