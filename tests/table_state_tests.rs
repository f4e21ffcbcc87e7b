use portal_sheet::state::column_type::{ColumnType, FilterOperator};
use portal_sheet::state::data_model::{Column, ColumnDef, Table};
use portal_sheet::state::table_state::{FilterUpdate, TableViewState};
use portal_sheet::state::view::{FilterLogic, SortOrder, SortSpec};

fn sample_table() -> Table {
    let mut table = Table::new("t1".to_string(), "Orders");
    table.push_column(Column::from_def(
        "qty".to_string(),
        ColumnDef::new("Qty", ColumnType::Number),
    ));
    table.push_column(Column::from_def(
        "name".to_string(),
        ColumnDef::new("Name", ColumnType::Text),
    ));
    for (qty, name) in [("3", "Pens"), ("12", "Paper"), ("7", "Ink")] {
        let row_id = table.push_row().id.clone();
        table.set_cell_content(&row_id, "qty", qty);
        table.set_cell_content(&row_id, "name", name);
    }
    table
}

#[test]
fn test_add_filter_picks_first_column_and_allowed_operator() {
    let table = sample_table();
    let mut state = TableViewState::new();

    let filter = state.add_filter(&table).unwrap();
    assert_eq!(filter.column_id, "qty");
    assert_eq!(filter.operator, FilterOperator::Equals);
    assert_eq!(filter.logic, FilterLogic::And);
    assert_eq!(filter.value, "");
}

#[test]
fn test_add_filter_on_table_without_columns() {
    let table = Table::new("t2".to_string(), "");
    let mut state = TableViewState::new();
    assert!(state.add_filter(&table).is_none());
    assert!(state.filters().is_empty());
    assert_eq!(table.name, "Untitled Table");
}

#[test]
fn test_update_filter_column_change_resets_operator_and_value() {
    let table = sample_table();
    let mut state = TableViewState::new();
    let id = state.add_filter(&table).unwrap().id.clone();

    assert!(state.update_filter(
        &table,
        &id,
        FilterUpdate {
            value: Some("12".to_string()),
            ..FilterUpdate::default()
        },
    ));
    assert_eq!(state.filters()[0].value, "12");

    state.update_filter(
        &table,
        &id,
        FilterUpdate {
            column_id: Some("name".to_string()),
            ..FilterUpdate::default()
        },
    );
    let filter = &state.filters()[0];
    assert_eq!(filter.column_id, "name");
    assert_eq!(filter.operator, FilterOperator::Contains);
    assert_eq!(filter.value, "");
}

#[test]
fn test_update_filter_valueless_operator_clears_value() {
    let table = sample_table();
    let mut state = TableViewState::new();
    let id = state.add_filter(&table).unwrap().id.clone();
    state.update_filter(
        &table,
        &id,
        FilterUpdate {
            value: Some("5".to_string()),
            ..FilterUpdate::default()
        },
    );

    state.update_filter(
        &table,
        &id,
        FilterUpdate {
            operator: Some(FilterOperator::IsEmpty),
            logic: Some(FilterLogic::Or),
            ..FilterUpdate::default()
        },
    );
    assert_eq!(state.filters()[0].value, "");
    assert_eq!(state.filters()[0].logic, FilterLogic::Or);

    assert!(!state.update_filter(&table, "missing", FilterUpdate::default()));
}

#[test]
fn test_remove_and_clear_filters() {
    let table = sample_table();
    let mut state = TableViewState::new();
    let first = state.add_filter(&table).unwrap().id.clone();
    state.add_filter(&table);

    assert!(state.remove_filter(&first));
    assert!(!state.remove_filter(&first));
    assert_eq!(state.filters().len(), 1);

    state.clear_filters();
    assert!(state.filters().is_empty());
}

#[test]
fn test_sort_toggle_flips_direction() {
    let mut state = TableViewState::new();
    state.sort_by_column_toggle("name");
    assert_eq!(state.sort_spec(), Some(&SortSpec::new("name", SortOrder::Asc)));
    state.sort_by_column_toggle("name");
    assert_eq!(state.sort_spec(), Some(&SortSpec::new("name", SortOrder::Desc)));
    state.sort_by_column_toggle("qty");
    assert_eq!(state.sort_spec(), Some(&SortSpec::new("qty", SortOrder::Asc)));
}

#[test]
fn test_visible_rows_applies_filters_and_sort() {
    let table = sample_table();
    let mut state = TableViewState::new();
    let id = state.add_filter(&table).unwrap().id.clone();
    state.update_filter(
        &table,
        &id,
        FilterUpdate {
            operator: Some(FilterOperator::GreaterThan),
            value: Some("5".to_string()),
            ..FilterUpdate::default()
        },
    );
    state.sort_by_column_toggle("name");

    let names: Vec<&str> = state
        .visible_rows(&table)
        .iter()
        .map(|row| row.content("name"))
        .collect();
    assert_eq!(names, vec!["Ink", "Paper"]);
}

#[test]
fn test_search_highlight() {
    let table = sample_table();
    let mut state = TableViewState::new();
    let row = &table.rows[1];
    assert!(!state.cell_matches_search(row, "name"));

    state.set_search("  PAP ".to_string());
    assert_eq!(state.search_query(), "PAP");
    assert!(state.cell_matches_search(row, "name"));
    assert!(!state.cell_matches_search(row, "qty"));
}

#[test]
fn test_hidden_columns_and_prune() {
    let mut table = sample_table();
    let mut state = TableViewState::new();
    state.toggle_column_visibility("qty");
    assert!(state.is_hidden("qty"));
    let visible: Vec<&str> = state
        .visible_columns(&table)
        .iter()
        .map(|column| column.id.as_str())
        .collect();
    assert_eq!(visible, vec!["name"]);

    state.add_filter(&table);
    state.sort_by_column_toggle("qty");
    table.remove_column("qty");
    state.prune(&table);

    assert!(state.filters().is_empty());
    assert!(state.sort_spec().is_none());
    assert!(!state.is_hidden("qty"));

    state.toggle_column_visibility("name");
    state.toggle_column_visibility("name");
    assert!(!state.is_hidden("name"));
}
