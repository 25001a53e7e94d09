//! The uniform in-memory table every loader produces.

mod scalar;

pub use self::scalar::infer_scalar;
pub use self::scalar::parse_date;
pub use self::scalar::parse_number;
pub use self::scalar::Scalar;

use crate::error::RustyPbixError;
use serde::Deserialize;
use serde::Serialize;
use std::collections::HashSet;

/// Declared type of a column: the majority type of its non-null values.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    Number,
    Date,
    Text,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Column {
    pub name: String,
    pub column_type: ColumnType,
}

/// Ordered, uniquely named columns and rows of scalars.
///
/// Every row holds exactly one value per column, in column order.
#[derive(Clone, Debug, PartialEq)]
pub struct Table {
    columns: Vec<Column>,
    rows: Vec<Vec<Scalar>>,
}

impl Table {
    /// Builds a table from a header and rows.
    ///
    /// Blank names become `column{n}` and repeated names get a `_2`, `_3` suffix.
    /// Short rows are padded with nulls. A row longer than the header, an empty
    /// header or no rows at all is malformed input.
    pub fn new(names: Vec<String>, rows: Vec<Vec<Scalar>>) -> Result<Table, RustyPbixError> {
        if names.is_empty() {
            Err(RustyPbixError::MalformedInputError("no columns found".to_owned()))?
        }
        if rows.is_empty() {
            Err(RustyPbixError::MalformedInputError("no data rows found".to_owned()))?
        }

        let width = names.len();
        let mut padded = Vec::with_capacity(rows.len());
        for (index, mut row) in rows.into_iter().enumerate() {
            if row.len() > width {
                Err(RustyPbixError::MalformedInputError(format!(
                    "row {} has {} values but the header declares {} columns",
                    index + 1,
                    row.len(),
                    width
                )))?
            }
            row.resize(width, Scalar::Null);
            padded.push(row);
        }

        let columns = unique_names(names)
            .into_iter()
            .enumerate()
            .map(|(index, name)| Column {
                name,
                column_type: majority_type(padded.iter().map(|row| &row[index])),
            })
            .collect();
        Ok(Table { columns, rows: padded })
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|column| column.name.to_owned()).collect()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|column| column.name == name)
    }

    pub fn rows(&self) -> &[Vec<Scalar>] {
        &self.rows
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// Values of one column, top to bottom.
    pub fn values(&self, index: usize) -> impl Iterator<Item = &Scalar> + '_ {
        self.rows.iter().map(move |row| &row[index])
    }

    /// Value of the named column in one row.
    pub fn get(&self, row: usize, name: &str) -> Option<&Scalar> {
        let index = self.column_index(name)?;
        self.rows.get(row).map(|values| &values[index])
    }
}

/// Makes header names unique and non-blank, keeping their order.
fn unique_names(names: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::<String>::new();
    names
        .into_iter()
        .enumerate()
        .map(|(index, name)| {
            let name = name.trim();
            let base = if name.is_empty() { format!("column{}", index + 1) } else { name.to_owned() };
            let mut candidate = base.to_owned();
            let mut suffix = 2;
            while seen.contains(&candidate) {
                candidate = format!("{base}_{suffix}");
                suffix += 1;
            }
            seen.insert(candidate.to_owned());
            candidate
        })
        .collect()
}

/// Majority type of the non-null values; ties go to the more general type.
fn majority_type<'a>(values: impl Iterator<Item = &'a Scalar>) -> ColumnType {
    let (mut numbers, mut dates, mut texts) = (0usize, 0usize, 0usize);
    for value in values {
        match value {
            Scalar::Number(_) => numbers += 1,
            Scalar::Date(_) => dates += 1,
            Scalar::Text(_) => texts += 1,
            Scalar::Null => (),
        }
    }
    if numbers + dates + texts == 0 || (texts >= dates && texts >= numbers) {
        ColumnType::Text
    } else if dates >= numbers {
        ColumnType::Date
    } else {
        ColumnType::Number
    }
}
