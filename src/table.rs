use std::fmt;

use crate::error::{PipelineError, Result};

/// A single spreadsheet cell. `Empty` is the null value.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Empty,
    Text(String),
    Number(f64),
    Bool(bool),
}

/// Hashable view of a non-empty cell, used as a dedup key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CellKey<'a> {
    Text(&'a str),
    Number(u64),
    Bool(bool),
}

impl Cell {
    pub fn text(value: impl Into<String>) -> Self {
        Cell::Text(value.into())
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Cell::Empty)
    }

    pub fn key(&self) -> Option<CellKey<'_>> {
        match self {
            Cell::Empty => None,
            Cell::Text(s) => Some(CellKey::Text(s)),
            // -0.0 and 0.0 compare equal, so they must share a key
            Cell::Number(n) if *n == 0.0 => Some(CellKey::Number(0f64.to_bits())),
            Cell::Number(n) => Some(CellKey::Number(n.to_bits())),
            Cell::Bool(b) => Some(CellKey::Bool(*b)),
        }
    }

    /// String form of the cell; `None` for empty cells.
    pub fn as_string(&self) -> Option<String> {
        match self {
            Cell::Empty => None,
            other => Some(other.to_string()),
        }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Empty => Ok(()),
            Cell::Text(s) => f.write_str(s),
            Cell::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => write!(f, "{}", *n as i64),
            Cell::Number(n) => write!(f, "{}", n),
            Cell::Bool(b) => write!(f, "{}", b),
        }
    }
}

/// Column-named rows of cells. `origin` names where the data came from and
/// shows up in error messages.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    origin: String,
    columns: Vec<String>,
    rows: Vec<Vec<Cell>>,
}

impl Table {
    pub fn new(columns: Vec<String>) -> Self {
        Table {
            origin: "memory".to_string(),
            columns,
            rows: Vec::new(),
        }
    }

    pub fn single_column<I>(name: &str, values: I) -> Self
    where
        I: IntoIterator<Item = Cell>,
    {
        let mut table = Table::new(vec![name.to_string()]);
        for v in values {
            table.rows.push(vec![v]);
        }
        table
    }

    pub fn with_origin(mut self, origin: impl Into<String>) -> Self {
        self.origin = origin.into();
        self
    }

    /// Appends a row, padding or truncating it to the column count.
    pub fn push_row(&mut self, mut row: Vec<Cell>) {
        row.resize(self.columns.len(), Cell::Empty);
        self.rows.push(row);
    }

    pub fn origin(&self) -> &str {
        &self.origin
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Cell>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn require_column(&self, name: &str) -> Result<usize> {
        self.column_index(name)
            .ok_or_else(|| PipelineError::missing_column(name, &self.origin))
    }

    /// Projects the table down to one named column.
    pub fn select(&self, name: &str) -> Result<Table> {
        let idx = self.require_column(name)?;
        let values = self.rows.iter().map(|r| r[idx].clone());
        Ok(Table::single_column(name, values).with_origin(self.origin.clone()))
    }

    /// Cells of one column, in row order.
    pub fn column(&self, name: &str) -> Result<Vec<&Cell>> {
        let idx = self.require_column(name)?;
        Ok(self.rows.iter().map(|r| &r[idx]).collect())
    }

    /// Keeps the rows at the given (ascending) indices.
    pub fn retain_indices(self, keep: &[usize]) -> Table {
        let mut rows: Vec<Option<Vec<Cell>>> = self.rows.into_iter().map(Some).collect();
        let kept = keep.iter().filter_map(|&i| rows.get_mut(i).and_then(Option::take)).collect();
        Table {
            origin: self.origin,
            columns: self.columns,
            rows: kept,
        }
    }

    /// Rewrites every cell of one column.
    pub fn map_column<F>(mut self, name: &str, mut f: F) -> Result<Table>
    where
        F: FnMut(&Cell) -> Cell,
    {
        let idx = self.require_column(name)?;
        for row in self.rows.iter_mut() {
            row[idx] = f(&row[idx]);
        }
        Ok(self)
    }
}
