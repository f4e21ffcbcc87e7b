use std::collections::BTreeSet;

use crate::state::column_type::FilterOperator;
use crate::state::data_model::{Column, Row, Table};
use crate::state::view::{self, FilterCondition, FilterLogic, SortOrder, SortSpec};

/// Partial update for a filter condition. A new column resets operator and
/// value.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FilterUpdate {
    pub column_id: Option<String>,
    pub operator: Option<FilterOperator>,
    pub value: Option<String>,
    pub logic: Option<FilterLogic>,
}

/// Transient view state for one table: filters, sort, quick search, hidden
/// columns. Never persisted.
#[derive(Clone, Debug, PartialEq, Default)]
pub struct TableViewState {
    filters: Vec<FilterCondition>,
    sort_spec: Option<SortSpec>,
    search_query: String,
    hidden_columns: BTreeSet<String>,
}

impl TableViewState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn filters(&self) -> &[FilterCondition] {
        &self.filters
    }

    pub fn sort_spec(&self) -> Option<&SortSpec> {
        self.sort_spec.as_ref()
    }

    pub fn search_query(&self) -> &str {
        &self.search_query
    }

    pub fn set_filters(&mut self, filters: Vec<FilterCondition>) {
        self.filters = filters;
    }

    /// Appends a condition on the table's first column. Returns `None` when
    /// the table has no columns.
    pub fn add_filter(&mut self, table: &Table) -> Option<&FilterCondition> {
        let column = table.columns.first()?;
        let operator = default_operator(column);
        self.filters
            .push(FilterCondition::new(column.id.clone(), operator, String::new()));
        self.filters.last()
    }

    pub fn update_filter(&mut self, table: &Table, filter_id: &str, update: FilterUpdate) -> bool {
        let Some(filter) = self.filters.iter_mut().find(|f| f.id == filter_id) else {
            return false;
        };

        if let Some(column_id) = update.column_id {
            if column_id != filter.column_id {
                filter.operator = table
                    .column(&column_id)
                    .map(default_operator)
                    .unwrap_or(FilterOperator::Contains);
                filter.value.clear();
                filter.column_id = column_id;
            }
        }
        if let Some(operator) = update.operator {
            filter.operator = operator;
            if !operator.needs_value() {
                filter.value.clear();
            }
        }
        if let Some(value) = update.value {
            if filter.operator.needs_value() {
                filter.value = value;
            }
        }
        if let Some(logic) = update.logic {
            filter.logic = logic;
        }
        true
    }

    pub fn remove_filter(&mut self, filter_id: &str) -> bool {
        let before = self.filters.len();
        self.filters.retain(|f| f.id != filter_id);
        self.filters.len() != before
    }

    pub fn clear_filters(&mut self) {
        self.filters.clear();
    }

    pub fn sort_by_column_toggle(&mut self, column: &str) {
        let next_order = match self.sort_spec.as_ref() {
            Some(spec) if spec.column == column => toggle_sort_order(spec.order),
            _ => SortOrder::Asc,
        };
        self.sort_spec = Some(SortSpec::new(column, next_order));
    }

    pub fn set_sort(&mut self, sort_spec: Option<SortSpec>) {
        self.sort_spec = sort_spec;
    }

    pub fn set_search(&mut self, query: String) {
        self.search_query = query.trim().to_string();
    }

    pub fn cell_matches_search(&self, row: &Row, column_id: &str) -> bool {
        if self.search_query.is_empty() {
            return false;
        }
        let needle = self.search_query.to_lowercase();
        row.content(column_id).to_lowercase().contains(&needle)
    }

    pub fn toggle_column_visibility(&mut self, column_id: &str) {
        if !self.hidden_columns.remove(column_id) {
            self.hidden_columns.insert(column_id.to_string());
        }
    }

    pub fn is_hidden(&self, column_id: &str) -> bool {
        self.hidden_columns.contains(column_id)
    }

    pub fn visible_columns<'a>(&self, table: &'a Table) -> Vec<&'a Column> {
        table
            .columns
            .iter()
            .filter(|column| !self.is_hidden(&column.id))
            .collect()
    }

    /// Drops view state that refers to columns no longer in `table`.
    pub fn prune(&mut self, table: &Table) {
        let columns = table.column_ids();
        self.filters
            .retain(|f| columns.contains(f.column_id.as_str()));
        if self
            .sort_spec
            .as_ref()
            .is_some_and(|spec| !columns.contains(spec.column.as_str()))
        {
            self.sort_spec = None;
        }
        self.hidden_columns
            .retain(|id| columns.contains(id.as_str()));
    }

    pub fn visible_rows<'a>(&self, table: &'a Table) -> Vec<&'a Row> {
        view::derive_view(table, &self.filters, self.sort_spec.as_ref())
    }
}

fn default_operator(column: &Column) -> FilterOperator {
    if column.column_type.supports(FilterOperator::Contains) {
        FilterOperator::Contains
    } else {
        column.column_type.operators()[0]
    }
}

fn toggle_sort_order(order: SortOrder) -> SortOrder {
    match order {
        SortOrder::Asc => SortOrder::Desc,
        SortOrder::Desc => SortOrder::Asc,
    }
}
