use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::state::column_type::{ColumnMetadata, ColumnType};

pub type TableId = String;
pub type ColumnId = String;
pub type RowId = String;

pub const DEFAULT_COLUMN_NAME: &str = "New Column";
pub const DEFAULT_TABLE_NAME: &str = "Untitled Table";

/// Generates a fresh client-side id.
pub fn new_id() -> String {
    Uuid::new_v4().to_string()
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Column {
    pub id: ColumnId,
    pub name: String,
    #[serde(rename = "type")]
    pub column_type: ColumnType,
    #[serde(default)]
    pub metadata: ColumnMetadata,
}

/// Definition used when adding a column.
#[derive(Clone, Debug, PartialEq)]
pub struct ColumnDef {
    pub name: String,
    pub column_type: ColumnType,
    pub metadata: ColumnMetadata,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct ColumnUpdate {
    pub name: Option<String>,
    pub column_type: Option<ColumnType>,
    pub metadata: Option<ColumnMetadata>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cell {
    pub id: String,
    pub content: String,
    #[serde(rename = "type")]
    pub cell_type: ColumnType,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Row {
    pub id: RowId,
    pub cells: BTreeMap<ColumnId, Cell>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Table {
    pub id: TableId,
    pub name: String,
    pub columns: Vec<Column>,
    pub rows: Vec<Row>,
}

/// A column removed from a table, kept so the removal can be undone.
#[derive(Clone, Debug, PartialEq)]
pub struct RemovedColumn {
    pub index: usize,
    pub column: Column,
    pub cells: Vec<(RowId, Cell)>,
}

impl Default for ColumnDef {
    fn default() -> Self {
        Self::new(DEFAULT_COLUMN_NAME, ColumnType::Text)
    }
}

impl ColumnDef {
    pub fn new(name: impl Into<String>, column_type: ColumnType) -> Self {
        Self {
            name: name.into(),
            column_type,
            metadata: column_type.default_metadata(),
        }
    }

    pub fn with_metadata(mut self, metadata: ColumnMetadata) -> Self {
        self.metadata.merge(metadata);
        self
    }

    pub fn with_options<I, S>(mut self, options: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.metadata.options = Some(options.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_format(mut self, format: impl Into<String>) -> Self {
        self.metadata.format = Some(format.into());
        self
    }
}

impl ColumnUpdate {
    pub fn name(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    pub fn column_type(column_type: ColumnType) -> Self {
        Self {
            column_type: Some(column_type),
            ..Self::default()
        }
    }

    pub fn with_metadata(mut self, metadata: ColumnMetadata) -> Self {
        self.metadata = Some(metadata);
        self
    }
}

impl Column {
    pub fn from_def(id: ColumnId, def: ColumnDef) -> Self {
        Self {
            id,
            name: normalize_name(&def.name, DEFAULT_COLUMN_NAME),
            column_type: def.column_type,
            metadata: def.metadata,
        }
    }

    /// Applies `update` in place. Metadata is merged, not replaced.
    pub fn apply(&mut self, update: &ColumnUpdate) {
        if let Some(name) = update.name.as_deref() {
            self.name = normalize_name(name, DEFAULT_COLUMN_NAME);
        }
        if let Some(column_type) = update.column_type {
            self.column_type = column_type;
        }
        if let Some(metadata) = update.metadata.clone() {
            self.metadata.merge(metadata);
        }
    }

    pub fn display(&self, cell: Option<&Cell>) -> String {
        cell.map(|cell| self.column_type.display(&cell.content, &self.metadata))
            .unwrap_or_default()
    }
}

impl Cell {
    pub fn empty(cell_type: ColumnType) -> Self {
        Self {
            id: new_id(),
            content: String::new(),
            cell_type,
        }
    }
}

impl Row {
    pub fn new(columns: &[Column]) -> Self {
        Self {
            id: new_id(),
            cells: columns
                .iter()
                .map(|column| (column.id.clone(), Cell::empty(column.column_type)))
                .collect(),
        }
    }

    pub fn cell(&self, column_id: &str) -> Option<&Cell> {
        self.cells.get(column_id)
    }

    /// Raw content for a column; a missing cell reads as empty.
    pub fn content(&self, column_id: &str) -> &str {
        self.cells
            .get(column_id)
            .map(|cell| cell.content.as_str())
            .unwrap_or("")
    }
}

impl Table {
    pub fn new(id: TableId, name: &str) -> Self {
        Self {
            id,
            name: normalize_name(name, DEFAULT_TABLE_NAME),
            columns: Vec::new(),
            rows: Vec::new(),
        }
    }

    pub fn column(&self, column_id: &str) -> Option<&Column> {
        self.columns.iter().find(|column| column.id == column_id)
    }

    pub fn column_index(&self, column_id: &str) -> Option<usize> {
        self.columns.iter().position(|column| column.id == column_id)
    }

    pub fn row(&self, row_id: &str) -> Option<&Row> {
        self.rows.iter().find(|row| row.id == row_id)
    }

    pub fn row_mut(&mut self, row_id: &str) -> Option<&mut Row> {
        self.rows.iter_mut().find(|row| row.id == row_id)
    }

    pub fn column_ids(&self) -> BTreeSet<&str> {
        self.columns.iter().map(|column| column.id.as_str()).collect()
    }

    /// True when every row holds exactly one cell per column.
    pub fn is_cell_complete(&self) -> bool {
        let expected = self.column_ids();
        self.rows.iter().all(|row| {
            row.cells.len() == expected.len()
                && row.cells.keys().all(|key| expected.contains(key.as_str()))
        })
    }

    /// Appends a column and back-fills an empty cell into every row. Returns
    /// the cells created.
    pub fn push_column(&mut self, column: Column) -> Vec<(RowId, Cell)> {
        let mut created = Vec::with_capacity(self.rows.len());
        for row in &mut self.rows {
            let cell = Cell::empty(column.column_type);
            created.push((row.id.clone(), cell.clone()));
            row.cells.insert(column.id.clone(), cell);
        }
        self.columns.push(column);
        created
    }

    pub fn remove_column(&mut self, column_id: &str) -> Option<RemovedColumn> {
        let index = self.column_index(column_id)?;
        let column = self.columns.remove(index);
        let cells = self
            .rows
            .iter_mut()
            .filter_map(|row| {
                row.cells
                    .remove(column_id)
                    .map(|cell| (row.id.clone(), cell))
            })
            .collect();
        Some(RemovedColumn {
            index,
            column,
            cells,
        })
    }

    pub fn restore_column(&mut self, removed: RemovedColumn) {
        let RemovedColumn {
            index,
            column,
            cells,
        } = removed;
        let mut by_row: BTreeMap<RowId, Cell> = cells.into_iter().collect();
        for row in &mut self.rows {
            if let Some(cell) = by_row.remove(&row.id) {
                row.cells.insert(column.id.clone(), cell);
            }
        }
        let index = index.min(self.columns.len());
        self.columns.insert(index, column);
    }

    /// Applies `update` to a column and propagates the type onto its cells.
    /// Cell content is left untouched. Returns the previous definition.
    pub fn update_column(&mut self, column_id: &str, update: &ColumnUpdate) -> Option<Column> {
        let index = self.column_index(column_id)?;
        let previous = self.columns[index].clone();
        self.columns[index].apply(update);
        let column_type = self.columns[index].column_type;
        self.retype_cells(column_id, column_type);
        Some(previous)
    }

    pub fn replace_column(&mut self, column: Column) -> bool {
        let Some(index) = self.column_index(&column.id) else {
            return false;
        };
        let column_type = column.column_type;
        let column_id = column.id.clone();
        self.columns[index] = column;
        self.retype_cells(&column_id, column_type);
        true
    }

    pub fn move_column(&mut self, from: usize, to: usize) -> bool {
        if from >= self.columns.len() || to >= self.columns.len() {
            return false;
        }
        if from == to {
            return true;
        }
        let column = self.columns.remove(from);
        self.columns.insert(to, column);
        true
    }

    /// Appends a row with one empty cell per column.
    pub fn push_row(&mut self) -> &Row {
        let row = Row::new(&self.columns);
        self.rows.push(row);
        &self.rows[self.rows.len() - 1]
    }

    pub fn remove_rows(&mut self, row_ids: &BTreeSet<&str>) -> Vec<(usize, Row)> {
        let mut removed = Vec::new();
        let mut kept = Vec::with_capacity(self.rows.len());
        for (idx, row) in std::mem::take(&mut self.rows).into_iter().enumerate() {
            if row_ids.contains(row.id.as_str()) {
                removed.push((idx, row));
            } else {
                kept.push(row);
            }
        }
        self.rows = kept;
        removed
    }

    /// Puts rows back at their original indices. `removed` must be sorted by
    /// index, as returned by `remove_rows`.
    pub fn restore_rows(&mut self, removed: Vec<(usize, Row)>) {
        for (idx, row) in removed {
            let idx = idx.min(self.rows.len());
            self.rows.insert(idx, row);
        }
    }

    /// Replaces a cell's content, creating the cell if the row has none for
    /// the column. Returns the updated cell.
    pub fn set_cell_content(&mut self, row_id: &str, column_id: &str, content: &str) -> Option<Cell> {
        let column_type = self.column(column_id)?.column_type;
        let row = self.row_mut(row_id)?;
        let cell = row
            .cells
            .entry(column_id.to_string())
            .or_insert_with(|| Cell::empty(column_type));
        cell.content = content.to_string();
        Some(cell.clone())
    }

    /// Fills missing cells and drops cells for unknown columns.
    pub fn normalize_cells(&mut self) {
        let columns: Vec<(ColumnId, ColumnType)> = self
            .columns
            .iter()
            .map(|column| (column.id.clone(), column.column_type))
            .collect();
        for row in &mut self.rows {
            row.cells
                .retain(|key, _| columns.iter().any(|(id, _)| id == key));
            for (id, column_type) in &columns {
                let cell = row
                    .cells
                    .entry(id.clone())
                    .or_insert_with(|| Cell::empty(*column_type));
                cell.cell_type = *column_type;
            }
        }
    }

    fn retype_cells(&mut self, column_id: &str, column_type: ColumnType) {
        for row in &mut self.rows {
            if let Some(cell) = row.cells.get_mut(column_id) {
                cell.cell_type = column_type;
            }
        }
    }
}

pub fn normalize_name(name: &str, fallback: &str) -> String {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        fallback.to_string()
    } else {
        trimmed.to_string()
    }
}
