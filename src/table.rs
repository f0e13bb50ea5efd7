//! In-memory tabular model shared by ingestion, column detection and the
//! cleaning pipeline.
//!
//! Tables are stored column-major. Every column of a table has the same
//! number of cells, so a row index addresses the same record in every column.

use std::fmt;

/// A single cell value.
///
/// `Missing` is distinct from an empty string: ingestion only produces
/// `Missing` for fields that carried no text at all.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Cell {
    Present(String),
    Missing,
}

impl Cell {
    /// Build a cell from a raw field. Exactly-empty fields are `Missing`.
    pub fn from_raw(raw: &str) -> Self {
        if raw.is_empty() {
            Cell::Missing
        } else {
            Cell::Present(raw.to_string())
        }
    }

    pub fn present(value: impl Into<String>) -> Self {
        Cell::Present(value.into())
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Cell::Present(s) => Some(s.as_str()),
            Cell::Missing => None,
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, Cell::Missing)
    }
}

impl From<Option<&str>> for Cell {
    fn from(value: Option<&str>) -> Self {
        match value {
            Some(s) => Cell::Present(s.to_string()),
            None => Cell::Missing,
        }
    }
}

/// The outcome of normalizing one cell.
///
/// `Unusable` covers input that normalizes to nothing meaningful (a domain
/// without a usable label, a name that is empty after cleanup). The pipeline
/// turns it into a missing cell and drops the row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Normalized {
    Value(String),
    Unusable,
}

impl Normalized {
    pub fn value(&self) -> Option<&str> {
        match self {
            Normalized::Value(v) => Some(v.as_str()),
            Normalized::Unusable => None,
        }
    }

    pub fn into_cell(self) -> Cell {
        match self {
            Normalized::Value(v) => Cell::Present(v),
            Normalized::Unusable => Cell::Missing,
        }
    }
}

/// What kind of company identifier a column holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColumnClassification {
    Name,
    Domain,
}

impl ColumnClassification {
    /// Tag used in output file names and the report `Type` column.
    pub fn as_str(&self) -> &'static str {
        match self {
            ColumnClassification::Name => "name",
            ColumnClassification::Domain => "domain",
        }
    }
}

impl fmt::Display for ColumnClassification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A named column of cells.
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    /// Header label, `None` when the source had no header row
    pub header: Option<String>,
    pub cells: Vec<Cell>,
}

impl Column {
    pub fn new(header: Option<String>, cells: Vec<Cell>) -> Self {
        Self { header, cells }
    }

    pub fn non_missing_count(&self) -> usize {
        self.cells.iter().filter(|c| !c.is_missing()).count()
    }

    /// Header text for logs; positional label when there is no header.
    pub fn display_name(&self, index: usize) -> String {
        match &self.header {
            Some(h) => h.clone(),
            None => format!("#{}", index),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    columns: Vec<Column>,
}

impl Table {
    /// Build a table from columns, padding short columns with `Missing`.
    pub fn new(mut columns: Vec<Column>) -> Self {
        let rows = columns.iter().map(|c| c.cells.len()).max().unwrap_or(0);
        for column in &mut columns {
            column.cells.resize(rows, Cell::Missing);
        }
        Self { columns }
    }

    /// Build a table from row-major data.
    ///
    /// When `header` is given its entries become column headers; ragged rows
    /// are padded with `Missing` up to the widest row (or header).
    pub fn from_rows(header: Option<Vec<String>>, rows: Vec<Vec<Cell>>) -> Self {
        let width = rows
            .iter()
            .map(|r| r.len())
            .chain(header.as_ref().map(|h| h.len()))
            .max()
            .unwrap_or(0);

        let mut columns: Vec<Column> = (0..width)
            .map(|i| {
                let label = header.as_ref().and_then(|h| h.get(i)).cloned();
                Column::new(label, Vec::with_capacity(rows.len()))
            })
            .collect();

        for row in rows {
            let mut cells = row.into_iter();
            for column in &mut columns {
                column.cells.push(cells.next().unwrap_or(Cell::Missing));
            }
        }

        Self { columns }
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column(&self, index: usize) -> Option<&Column> {
        self.columns.get(index)
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn row_count(&self) -> usize {
        self.columns.first().map(|c| c.cells.len()).unwrap_or(0)
    }

    /// True when there are no columns or no data rows.
    pub fn is_empty(&self) -> bool {
        self.column_count() == 0 || self.row_count() == 0
    }

    pub fn non_missing_count(&self, column: usize) -> usize {
        self.columns
            .get(column)
            .map(|c| c.non_missing_count())
            .unwrap_or(0)
    }

    /// Replace the cells of one column. Length must match the row count.
    pub fn replace_cells(&mut self, column: usize, cells: Vec<Cell>) {
        debug_assert_eq!(cells.len(), self.row_count());
        if let Some(col) = self.columns.get_mut(column) {
            col.cells = cells;
        }
    }

    /// Keep only the rows for which `keep(row_index)` is true, in every column.
    pub fn retain_rows<F>(&mut self, mut keep: F)
    where
        F: FnMut(usize) -> bool,
    {
        let mask: Vec<bool> = (0..self.row_count()).map(&mut keep).collect();
        for column in &mut self.columns {
            let mut idx = 0;
            column.cells.retain(|_| {
                let kept = mask[idx];
                idx += 1;
                kept
            });
        }
    }

    /// Single-column projection, preserving row order.
    pub fn project(&self, column: usize) -> Table {
        Table {
            columns: self.columns.get(column).cloned().into_iter().collect(),
        }
    }

    /// Present values of a column in row order.
    pub fn values(&self, column: usize) -> Vec<&str> {
        self.columns
            .get(column)
            .map(|c| c.cells.iter().filter_map(|cell| cell.as_str()).collect())
            .unwrap_or_default()
    }
}
