use crate::spreadsheet::cell::Cell;

/// Cells of one worksheet, collected in file order, plus the bounds they occupy.
pub(crate) struct Sheet {
    /// Sheet name
    pub(crate) name: String,
    /// All non-empty cells in the sheet
    pub(crate) cells: Vec<Cell>,
    /// Actual data range (determined from cell data)
    pub(crate) row_lower_bound: Option<usize>,
    pub(crate) row_upper_bound: Option<usize>,
    pub(crate) col_lower_bound: Option<usize>,
    pub(crate) col_upper_bound: Option<usize>,
}

impl Sheet {
    pub(super) fn new(name: &str) -> Self {
        Self {
            name: name.to_owned(),
            cells: Vec::new(),
            row_lower_bound: None,
            row_upper_bound: None,
            col_lower_bound: None,
            col_upper_bound: None,
        }
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Adds a cell to the sheet, widening the data range.
    pub(super) fn push(&mut self, cell: Cell) {
        self.update_bound(cell.row, cell.col);
        self.cells.push(cell);
    }

    fn update_bound(&mut self, row: usize, col: usize) {
        if self.row_lower_bound.map(|row_lower_bound| row < row_lower_bound).unwrap_or(true) {
            self.row_lower_bound = Some(row);
        }
        if self.row_upper_bound.map(|row_upper_bound| row_upper_bound < row).unwrap_or(true) {
            self.row_upper_bound = Some(row);
        }
        if self.col_lower_bound.map(|col_lower_bound| col < col_lower_bound).unwrap_or(true) {
            self.col_lower_bound = Some(col);
        }
        if self.col_upper_bound.map(|col_upper_bound| col_upper_bound < col).unwrap_or(true) {
            self.col_upper_bound = Some(col);
        }
    }

    /// Arranges the cells as a dense grid spanning the data range.
    /// Rows with no cells are left out when `skip_empty_rows` is set.
    /// When a position holds several cells, the last one read wins.
    pub(crate) fn rows(&self, skip_empty_rows: bool) -> Vec<Vec<Option<&Cell>>> {
        let (row_lower, row_upper, col_lower, col_upper) = match (
            self.row_lower_bound,
            self.row_upper_bound,
            self.col_lower_bound,
            self.col_upper_bound,
        ) {
            (Some(row_lower), Some(row_upper), Some(col_lower), Some(col_upper)) => (row_lower, row_upper, col_lower, col_upper),
            _ => return Vec::new(),
        };

        let mut ordered: Vec<&Cell> = self.cells.iter().collect();
        ordered.sort_by_key(|cell| (cell.row, cell.col));

        let width = col_upper - col_lower + 1;
        let mut table = Vec::<Vec<Option<&Cell>>>::new();
        let mut next_row = row_lower;
        let mut index = 0usize;
        while index < ordered.len() {
            let row = ordered[index].row;
            if !skip_empty_rows {
                while next_row < row {
                    table.push(vec![None; width]);
                    next_row += 1;
                }
            }
            let mut record = vec![None; width];
            while index < ordered.len() && ordered[index].row == row {
                let cell = ordered[index];
                record[cell.col - col_lower] = Some(cell);
                index += 1;
            }
            table.push(record);
            next_row = row + 1;
        }
        debug_assert!(next_row == row_upper + 1);
        table
    }
}
