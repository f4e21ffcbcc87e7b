use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::task::JoinHandle;

use crate::io::backend::{Backend, BackendError, Collection, Filter, Order, Record};
use crate::io::records::{self, CellRecord, ColumnRecord, RowRecord, TableRecord};
use crate::state::column_template::ColumnTemplate;
use crate::state::column_type::{ColumnMetadata, ColumnType};
use crate::state::data_model::{
    new_id, normalize_name, Cell, Column, ColumnDef, ColumnId, ColumnUpdate, Row, RowId, Table,
    TableId, DEFAULT_TABLE_NAME,
};
use crate::state::error::{StoreError, StoreResult};

const DEFAULT_COLUMNS: [&str; 3] = ["Name", "Type", "Status"];

/// Client-side owner of every table of the signed-in user.
///
/// Structural operations apply locally, persist, and revert the local change
/// if persistence fails; the failure is also kept in [`DatabaseStore::error`].
/// Cell edits apply locally and persist in the background; their failures are
/// only logged.
pub struct DatabaseStore<B: Backend> {
    backend: Arc<B>,
    tables: BTreeMap<TableId, Table>,
    table_order: Vec<TableId>,
    active_table_id: Option<TableId>,
    selected_rows: BTreeMap<TableId, Vec<RowId>>,
    user_id: Option<String>,
    error: Option<String>,
    pending_writes: Vec<JoinHandle<()>>,
}

impl<B: Backend> DatabaseStore<B> {
    pub fn new(backend: Arc<B>) -> Self {
        Self {
            backend,
            tables: BTreeMap::new(),
            table_order: Vec::new(),
            active_table_id: None,
            selected_rows: BTreeMap::new(),
            user_id: None,
            error: None,
            pending_writes: Vec::new(),
        }
    }

    pub fn backend(&self) -> &Arc<B> {
        &self.backend
    }

    /// Tables in display order, newest first.
    pub fn tables(&self) -> impl Iterator<Item = &Table> + '_ {
        self.table_order
            .iter()
            .filter_map(|id| self.tables.get(id))
    }

    pub fn table(&self, table_id: &str) -> Option<&Table> {
        self.tables.get(table_id)
    }

    pub fn active_table_id(&self) -> Option<&str> {
        self.active_table_id.as_deref()
    }

    pub fn active_table(&self) -> Option<&Table> {
        self.active_table_id
            .as_deref()
            .and_then(|id| self.tables.get(id))
    }

    pub fn selected_rows(&self, table_id: &str) -> &[RowId] {
        self.selected_rows
            .get(table_id)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn user_id(&self) -> Option<&str> {
        self.user_id.as_deref()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn clear_error(&mut self) {
        self.error = None;
    }

    pub fn set_active_table(&mut self, table_id: &str) -> StoreResult<()> {
        if !self.tables.contains_key(table_id) {
            return Err(StoreError::TableNotFound(table_id.to_string()));
        }
        self.active_table_id = Some(table_id.to_string());
        Ok(())
    }

    pub async fn fetch_user_tables(&mut self) -> StoreResult<usize> {
        let result = self.try_fetch_user_tables().await;
        self.finish("fetch_user_tables", result)
    }

    /// Creates a table with the default columns and one empty row, and makes
    /// it the active table.
    pub async fn create_table(&mut self, name: &str) -> StoreResult<TableId> {
        let result = self.try_create_table(name).await;
        self.finish("create_table", result)
    }

    pub async fn rename_table(&mut self, table_id: &str, name: &str) -> StoreResult<()> {
        let result = self.try_rename_table(table_id, name).await;
        self.finish("rename_table", result)
    }

    pub async fn delete_table(&mut self, table_id: &str) -> StoreResult<()> {
        let result = self.try_delete_table(table_id).await;
        self.finish("delete_table", result)
    }

    /// Appends a column (`New Column`, text, when `def` is `None`) and
    /// back-fills an empty cell into every row.
    pub async fn add_column(
        &mut self,
        table_id: &str,
        def: Option<ColumnDef>,
    ) -> StoreResult<ColumnId> {
        let result = self.try_add_column(table_id, def.unwrap_or_default()).await;
        self.finish("add_column", result)
    }

    /// Adds the predefined column registered under `template_id`.
    pub async fn add_template_column(
        &mut self,
        table_id: &str,
        template_id: &str,
    ) -> StoreResult<ColumnId> {
        let result = match ColumnTemplate::find(template_id) {
            Some(template) => self.try_add_column(table_id, template.to_def()).await,
            None => Err(StoreError::Validation(format!(
                "unknown column template {template_id:?}"
            ))),
        };
        self.finish("add_template_column", result)
    }

    pub async fn update_column(
        &mut self,
        table_id: &str,
        column_id: &str,
        update: ColumnUpdate,
    ) -> StoreResult<()> {
        let result = self.try_update_column(table_id, column_id, update).await;
        self.finish("update_column", result)
    }

    /// Removes a column and its cells. Deleting a column that is already gone
    /// succeeds without a remote call.
    pub async fn delete_column(&mut self, table_id: &str, column_id: &str) -> StoreResult<()> {
        let result = self.try_delete_column(table_id, column_id).await;
        self.finish("delete_column", result)
    }

    pub async fn move_column(&mut self, table_id: &str, from: usize, to: usize) -> StoreResult<()> {
        let result = self.try_move_column(table_id, from, to).await;
        self.finish("move_column", result)
    }

    pub async fn add_row(&mut self, table_id: &str) -> StoreResult<RowId> {
        let result = self.try_add_row(table_id).await;
        self.finish("add_row", result)
    }

    pub async fn delete_row(&mut self, table_id: &str, row_id: &str) -> StoreResult<()> {
        let row_exists = self
            .tables
            .get(table_id)
            .map(|table| table.row(row_id).is_some());
        let result = match row_exists {
            None => Err(StoreError::TableNotFound(table_id.to_string())),
            Some(false) => Err(StoreError::RowNotFound {
                table_id: table_id.to_string(),
                row_id: row_id.to_string(),
            }),
            Some(true) => self.try_delete_rows(table_id, &[row_id]).await.map(|_| ()),
        };
        self.finish("delete_row", result)
    }

    /// Deletes several rows with one local update and one remote call. Ids not
    /// in the table are ignored. Returns the number of rows removed.
    pub async fn delete_multiple_rows(
        &mut self,
        table_id: &str,
        row_ids: &[impl AsRef<str>],
    ) -> StoreResult<usize> {
        let result = self.try_delete_rows(table_id, row_ids).await;
        self.finish("delete_multiple_rows", result)
    }

    /// Replaces a cell's content locally and persists it in the background.
    /// A failed write is logged and the local edit is kept.
    pub fn update_cell(
        &mut self,
        table_id: &str,
        row_id: &str,
        column_id: &str,
        value: &str,
    ) -> StoreResult<()> {
        if self.user_id.is_none() {
            return Err(StoreError::Unauthenticated);
        }
        let table = self
            .tables
            .get_mut(table_id)
            .ok_or_else(|| StoreError::TableNotFound(table_id.to_string()))?;
        if table.column(column_id).is_none() {
            return Err(StoreError::ColumnNotFound {
                table_id: table_id.to_string(),
                column_id: column_id.to_string(),
            });
        }
        let cell = table
            .set_cell_content(row_id, column_id, value)
            .ok_or_else(|| StoreError::RowNotFound {
                table_id: table_id.to_string(),
                row_id: row_id.to_string(),
            })?;

        self.spawn_cell_write(CellRecord {
            id: cell.id,
            row_id: row_id.to_string(),
            column_id: column_id.to_string(),
            content: cell.content,
        });
        Ok(())
    }

    /// Toggles a row in the table's selection. Returns whether the row is now
    /// selected.
    pub fn toggle_row_selection(&mut self, table_id: &str, row_id: &str) -> StoreResult<bool> {
        if !self.tables.contains_key(table_id) {
            return Err(StoreError::TableNotFound(table_id.to_string()));
        }
        let selection = self.selected_rows.entry(table_id.to_string()).or_default();
        if let Some(idx) = selection.iter().position(|id| id == row_id) {
            selection.remove(idx);
            Ok(false)
        } else {
            selection.push(row_id.to_string());
            Ok(true)
        }
    }

    pub fn clear_selection(&mut self, table_id: &str) {
        if let Some(selection) = self.selected_rows.get_mut(table_id) {
            selection.clear();
        }
    }

    /// Waits for every background cell write issued so far.
    pub async fn settle(&mut self) {
        for handle in self.pending_writes.drain(..) {
            if let Err(err) = handle.await {
                tracing::error!(error = %err, "cell write task failed");
            }
        }
    }

    async fn try_fetch_user_tables(&mut self) -> StoreResult<usize> {
        let user = self.require_user().await?;
        let table_records: Vec<TableRecord> = self
            .select(
                Collection::Tables,
                Filter::new().eq("user_id", user.as_str()),
                Some(Order::desc("created_at")),
            )
            .await?;

        let mut tables = BTreeMap::new();
        let mut table_order = Vec::with_capacity(table_records.len());
        for record in table_records {
            let columns: Vec<ColumnRecord> = self
                .select(
                    Collection::Columns,
                    Filter::new().eq("table_id", record.id.as_str()),
                    Some(Order::asc("order")),
                )
                .await?;
            let rows: Vec<RowRecord> = self
                .select(
                    Collection::Rows,
                    Filter::new().eq("table_id", record.id.as_str()),
                    Some(Order::asc("created_at")),
                )
                .await?;
            let cells: Vec<CellRecord> = if rows.is_empty() {
                Vec::new()
            } else {
                self.select(
                    Collection::Cells,
                    Filter::new().is_in("row_id", rows.iter().map(|row| row.id.clone())),
                    None,
                )
                .await?
            };

            let table = assemble_table(record, columns, rows, cells);
            table_order.push(table.id.clone());
            tables.insert(table.id.clone(), table);
        }

        let count = tables.len();
        let keep_active = self
            .active_table_id
            .as_ref()
            .is_some_and(|id| tables.contains_key(id));
        if !keep_active {
            self.active_table_id = table_order.first().cloned();
        }
        self.selected_rows = table_order
            .iter()
            .map(|id| (id.clone(), Vec::new()))
            .collect();
        self.tables = tables;
        self.table_order = table_order;
        tracing::debug!(count, "loaded tables");
        Ok(count)
    }

    async fn try_create_table(&mut self, name: &str) -> StoreResult<TableId> {
        let user = self.require_user().await?;

        let mut table = Table::new(new_id(), name);
        for column_name in DEFAULT_COLUMNS {
            table.push_column(Column::from_def(
                new_id(),
                ColumnDef::new(column_name, ColumnType::Text),
            ));
        }
        table.push_row();

        let table_id = table.id.clone();
        self.tables.insert(table_id.clone(), table.clone());
        self.table_order.insert(0, table_id.clone());
        self.selected_rows.insert(table_id.clone(), Vec::new());
        let previous_active = self.active_table_id.replace(table_id.clone());

        if let Err(err) = self.persist_new_table(&user, &table).await {
            self.tables.remove(&table_id);
            self.table_order.retain(|id| id != &table_id);
            self.selected_rows.remove(&table_id);
            self.active_table_id = previous_active;
            return Err(err);
        }

        tracing::debug!(table_id = %table_id, "created table");
        Ok(table_id)
    }

    async fn persist_new_table(&self, user: &str, table: &Table) -> StoreResult<()> {
        self.backend
            .insert(
                Collection::Tables,
                vec![records::to_record(&TableRecord {
                    id: table.id.clone(),
                    user_id: user.to_string(),
                    name: table.name.clone(),
                    created_at: None,
                })?],
            )
            .await?;

        let result: StoreResult<()> = async {
            let columns = table
                .columns
                .iter()
                .enumerate()
                .map(|(order, column)| records::to_record(&column_record(&table.id, column, order)))
                .collect::<Result<Vec<_>, _>>()?;
            self.backend.insert(Collection::Columns, columns).await?;

            for row in &table.rows {
                self.insert_row_with_cells(&table.id, row).await?;
            }
            Ok(())
        }
        .await;

        if result.is_err() {
            self.compensate(Collection::Tables, Filter::new().eq("id", table.id.as_str()))
                .await;
        }
        result
    }

    async fn try_rename_table(&mut self, table_id: &str, name: &str) -> StoreResult<()> {
        self.require_user().await?;
        let name = normalize_name(name, DEFAULT_TABLE_NAME);
        let table = self.table_mut(table_id)?;
        let previous = std::mem::replace(&mut table.name, name.clone());

        let persisted = self
            .backend
            .update(
                Collection::Tables,
                &Filter::new().eq("id", table_id),
                records::patch([("name", name)]),
            )
            .await;
        if let Err(err) = persisted {
            if let Some(table) = self.tables.get_mut(table_id) {
                table.name = previous;
            }
            return Err(err.into());
        }
        Ok(())
    }

    async fn try_delete_table(&mut self, table_id: &str) -> StoreResult<()> {
        self.require_user().await?;
        let Some(table) = self.tables.remove(table_id) else {
            return Err(StoreError::TableNotFound(table_id.to_string()));
        };
        let position = self
            .table_order
            .iter()
            .position(|id| id == table_id)
            .unwrap_or(self.table_order.len());
        self.table_order.retain(|id| id != table_id);
        let selection = self.selected_rows.remove(table_id);
        let previous_active = self.active_table_id.clone();
        if previous_active.as_deref() == Some(table_id) {
            self.active_table_id = self.table_order.first().cloned();
        }

        let persisted = self
            .backend
            .delete(Collection::Tables, &Filter::new().eq("id", table_id))
            .await;
        if let Err(err) = persisted {
            let position = position.min(self.table_order.len());
            self.table_order.insert(position, table_id.to_string());
            self.tables.insert(table_id.to_string(), table);
            if let Some(selection) = selection {
                self.selected_rows.insert(table_id.to_string(), selection);
            }
            self.active_table_id = previous_active;
            return Err(err.into());
        }

        tracing::debug!(table_id, "deleted table");
        Ok(())
    }

    async fn try_add_column(&mut self, table_id: &str, def: ColumnDef) -> StoreResult<ColumnId> {
        self.require_user().await?;
        validate_column(def.column_type, &def.metadata)?;

        let table = self.table_mut(table_id)?;
        let column = Column::from_def(new_id(), def);
        let order = table.columns.len();
        let created = table.push_column(column.clone());

        if let Err(err) = self.persist_new_column(table_id, &column, order, &created).await {
            if let Some(table) = self.tables.get_mut(table_id) {
                table.remove_column(&column.id);
            }
            return Err(err);
        }

        tracing::debug!(table_id, column_id = %column.id, "added column");
        Ok(column.id)
    }

    async fn persist_new_column(
        &self,
        table_id: &str,
        column: &Column,
        order: usize,
        created: &[(RowId, Cell)],
    ) -> StoreResult<()> {
        self.backend
            .insert(
                Collection::Columns,
                vec![records::to_record(&column_record(table_id, column, order))?],
            )
            .await?;
        if created.is_empty() {
            return Ok(());
        }

        let cells = created
            .iter()
            .map(|(row_id, cell)| records::to_record(&cell_record(row_id, &column.id, cell)))
            .collect::<Result<Vec<_>, _>>()?;
        if let Err(err) = self.backend.insert(Collection::Cells, cells).await {
            self.compensate(Collection::Columns, Filter::new().eq("id", column.id.as_str()))
                .await;
            return Err(err.into());
        }
        Ok(())
    }

    async fn try_update_column(
        &mut self,
        table_id: &str,
        column_id: &str,
        update: ColumnUpdate,
    ) -> StoreResult<()> {
        self.require_user().await?;
        let table = self.table_mut(table_id)?;
        let Some(current) = table.column(column_id) else {
            return Err(StoreError::ColumnNotFound {
                table_id: table_id.to_string(),
                column_id: column_id.to_string(),
            });
        };
        let mut candidate = current.clone();
        candidate.apply(&update);
        validate_column(candidate.column_type, &candidate.metadata)?;

        let Some(previous) = table.update_column(column_id, &update) else {
            return Err(StoreError::ColumnNotFound {
                table_id: table_id.to_string(),
                column_id: column_id.to_string(),
            });
        };

        let persisted = self.persist_column_definition(&candidate).await;
        if let Err(err) = persisted {
            if let Some(table) = self.tables.get_mut(table_id) {
                table.replace_column(previous);
            }
            return Err(err);
        }
        Ok(())
    }

    async fn persist_column_definition(&self, column: &Column) -> StoreResult<()> {
        let patch: Record = records::patch([
            ("name", Value::String(column.name.clone())),
            ("type", Value::String(column.column_type.as_str().to_string())),
            ("metadata", serde_json::to_value(&column.metadata).map_err(BackendError::from)?),
        ]);
        self.backend
            .update(
                Collection::Columns,
                &Filter::new().eq("id", column.id.as_str()),
                patch,
            )
            .await?;
        Ok(())
    }

    async fn try_delete_column(&mut self, table_id: &str, column_id: &str) -> StoreResult<()> {
        self.require_user().await?;
        let table = self.table_mut(table_id)?;
        let Some(removed) = table.remove_column(column_id) else {
            tracing::debug!(table_id, column_id, "column already removed");
            return Ok(());
        };

        let persisted = self
            .backend
            .delete(Collection::Columns, &Filter::new().eq("id", column_id))
            .await;
        if let Err(err) = persisted {
            if let Some(table) = self.tables.get_mut(table_id) {
                table.restore_column(removed);
            }
            return Err(err.into());
        }

        tracing::debug!(table_id, column_id, "deleted column");
        Ok(())
    }

    async fn try_move_column(&mut self, table_id: &str, from: usize, to: usize) -> StoreResult<()> {
        self.require_user().await?;
        let table = self.table_mut(table_id)?;
        if !table.move_column(from, to) {
            return Err(StoreError::Validation(format!(
                "cannot move column {from} to {to} in a table of {} columns",
                table.columns.len()
            )));
        }
        if from == to {
            return Ok(());
        }

        let (low, high) = (from.min(to), from.max(to));
        let moved: Vec<(ColumnId, usize)> = (low..=high)
            .map(|order| (table.columns[order].id.clone(), order))
            .collect();

        let mut written = Vec::new();
        for (column_id, order) in &moved {
            let persisted = self
                .backend
                .update(
                    Collection::Columns,
                    &Filter::new().eq("id", column_id.as_str()),
                    records::patch([("order", *order)]),
                )
                .await;
            match persisted {
                Ok(_) => written.push(column_id.clone()),
                Err(err) => {
                    if let Some(table) = self.tables.get_mut(table_id) {
                        table.move_column(to, from);
                    }
                    self.restore_column_orders(table_id, &written).await;
                    return Err(err.into());
                }
            }
        }
        Ok(())
    }

    async fn restore_column_orders(&self, table_id: &str, column_ids: &[ColumnId]) {
        let Some(table) = self.tables.get(table_id) else {
            return;
        };
        for column_id in column_ids {
            let Some(order) = table.column_index(column_id) else {
                continue;
            };
            let restored = self
                .backend
                .update(
                    Collection::Columns,
                    &Filter::new().eq("id", column_id.as_str()),
                    records::patch([("order", order)]),
                )
                .await;
            if let Err(err) = restored {
                tracing::error!(column_id = %column_id, error = %err, "failed to restore column order");
            }
        }
    }

    async fn try_add_row(&mut self, table_id: &str) -> StoreResult<RowId> {
        self.require_user().await?;
        let table = self.table_mut(table_id)?;
        let row = table.push_row().clone();

        if let Err(err) = self.insert_row_with_cells(table_id, &row).await {
            if let Some(table) = self.tables.get_mut(table_id) {
                table.remove_rows(&BTreeSet::from([row.id.as_str()]));
            }
            return Err(err);
        }

        tracing::debug!(table_id, row_id = %row.id, "added row");
        Ok(row.id)
    }

    async fn insert_row_with_cells(&self, table_id: &str, row: &Row) -> StoreResult<()> {
        self.backend
            .insert(
                Collection::Rows,
                vec![records::to_record(&RowRecord {
                    id: row.id.clone(),
                    table_id: table_id.to_string(),
                    created_at: None,
                })?],
            )
            .await?;
        if row.cells.is_empty() {
            return Ok(());
        }

        let cells = row
            .cells
            .iter()
            .map(|(column_id, cell)| records::to_record(&cell_record(&row.id, column_id, cell)))
            .collect::<Result<Vec<_>, _>>()?;
        if let Err(err) = self.backend.insert(Collection::Cells, cells).await {
            self.compensate(Collection::Rows, Filter::new().eq("id", row.id.as_str()))
                .await;
            return Err(err.into());
        }
        Ok(())
    }

    async fn try_delete_rows(
        &mut self,
        table_id: &str,
        row_ids: &[impl AsRef<str>],
    ) -> StoreResult<usize> {
        self.require_user().await?;
        let table = self.table_mut(table_id)?;
        let wanted: BTreeSet<&str> = row_ids.iter().map(AsRef::as_ref).collect();
        let removed = table.remove_rows(&wanted);
        if removed.is_empty() {
            return Ok(0);
        }

        let removed_ids: Vec<RowId> = removed.iter().map(|(_, row)| row.id.clone()).collect();
        let previous_selection = self.selected_rows.get(table_id).cloned();
        if let Some(selection) = self.selected_rows.get_mut(table_id) {
            selection.retain(|id| !removed_ids.contains(id));
        }

        let persisted = self
            .backend
            .delete(
                Collection::Rows,
                &Filter::new().is_in("id", removed_ids.iter().cloned()),
            )
            .await;
        if let Err(err) = persisted {
            if let Some(table) = self.tables.get_mut(table_id) {
                table.restore_rows(removed);
            }
            if let Some(selection) = previous_selection {
                self.selected_rows.insert(table_id.to_string(), selection);
            }
            return Err(err.into());
        }

        tracing::debug!(table_id, count = removed_ids.len(), "deleted rows");
        Ok(removed_ids.len())
    }

    fn spawn_cell_write(&mut self, record: CellRecord) {
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            tracing::error!(
                row_id = %record.row_id,
                column_id = %record.column_id,
                "no async runtime; cell edit kept locally only"
            );
            return;
        };

        self.pending_writes.retain(|handle| !handle.is_finished());
        let backend = Arc::clone(&self.backend);
        self.pending_writes.push(runtime.spawn(async move {
            if let Err(err) = persist_cell(backend.as_ref(), &record).await {
                tracing::error!(
                    row_id = %record.row_id,
                    column_id = %record.column_id,
                    error = %err,
                    "failed to persist cell edit"
                );
            }
        }));
    }

    async fn require_user(&mut self) -> StoreResult<String> {
        match self.backend.current_user().await? {
            Some(user) => {
                self.user_id = Some(user.clone());
                Ok(user)
            }
            None => {
                self.user_id = None;
                Err(StoreError::Unauthenticated)
            }
        }
    }

    async fn select<T: DeserializeOwned>(
        &self,
        collection: Collection,
        filter: Filter,
        order: Option<Order>,
    ) -> StoreResult<Vec<T>> {
        let found = self
            .backend
            .select(collection, &filter, order.as_ref())
            .await?;
        Ok(records::from_records(found)?)
    }

    async fn compensate(&self, collection: Collection, filter: Filter) {
        if let Err(err) = self.backend.delete(collection, &filter).await {
            tracing::error!(%collection, error = %err, "compensating delete failed");
        }
    }

    fn table_mut(&mut self, table_id: &str) -> StoreResult<&mut Table> {
        self.tables
            .get_mut(table_id)
            .ok_or_else(|| StoreError::TableNotFound(table_id.to_string()))
    }

    fn finish<T>(&mut self, operation: &'static str, result: StoreResult<T>) -> StoreResult<T> {
        match result {
            Ok(value) => {
                self.error = None;
                Ok(value)
            }
            Err(err) => {
                tracing::warn!(operation, error = %err, "database operation failed");
                self.error = Some(err.to_string());
                Err(err)
            }
        }
    }
}

async fn persist_cell<B: Backend>(backend: &B, record: &CellRecord) -> Result<(), BackendError> {
    let filter = Filter::new()
        .eq("row_id", record.row_id.as_str())
        .eq("column_id", record.column_id.as_str());
    let updated = backend
        .update(
            Collection::Cells,
            &filter,
            records::patch([("content", record.content.clone())]),
        )
        .await?;
    if updated == 0 {
        backend
            .insert(Collection::Cells, vec![records::to_record(record)?])
            .await?;
    }
    Ok(())
}

fn validate_column(column_type: ColumnType, metadata: &ColumnMetadata) -> StoreResult<()> {
    if column_type == ColumnType::Select && metadata.options().is_empty() {
        return Err(StoreError::Validation(
            "select columns need at least one option".to_string(),
        ));
    }
    Ok(())
}

fn column_record(table_id: &str, column: &Column, order: usize) -> ColumnRecord {
    ColumnRecord {
        id: column.id.clone(),
        table_id: table_id.to_string(),
        name: column.name.clone(),
        column_type: column.column_type,
        metadata: column.metadata.clone(),
        order: order as i64,
    }
}

fn cell_record(row_id: &str, column_id: &str, cell: &Cell) -> CellRecord {
    CellRecord {
        id: cell.id.clone(),
        row_id: row_id.to_string(),
        column_id: column_id.to_string(),
        content: cell.content.clone(),
    }
}

fn assemble_table(
    record: TableRecord,
    columns: Vec<ColumnRecord>,
    rows: Vec<RowRecord>,
    cells: Vec<CellRecord>,
) -> Table {
    let columns: Vec<Column> = columns
        .into_iter()
        .map(|column| Column {
            id: column.id,
            name: column.name,
            column_type: column.column_type,
            metadata: column.metadata,
        })
        .collect();

    let mut cells_by_row: BTreeMap<RowId, BTreeMap<ColumnId, Cell>> = BTreeMap::new();
    for cell in cells {
        let Some(column) = columns.iter().find(|column| column.id == cell.column_id) else {
            continue;
        };
        cells_by_row.entry(cell.row_id).or_default().insert(
            cell.column_id,
            Cell {
                id: cell.id,
                content: cell.content,
                cell_type: column.column_type,
            },
        );
    }

    let rows = rows
        .into_iter()
        .map(|row| Row {
            cells: cells_by_row.remove(&row.id).unwrap_or_default(),
            id: row.id,
        })
        .collect();

    let mut table = Table {
        id: record.id,
        name: record.name,
        columns,
        rows,
    };
    table.normalize_cells();
    table
}
