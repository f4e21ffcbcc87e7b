use std::path::{Path, PathBuf};
use std::sync::Arc;

use portal_sheet::io::json_io::{self, JsonFileBackend};
use portal_sheet::io::{BackendError, Collection};
use portal_sheet::state::blocks::BlockType;
use portal_sheet::state::column_type::ColumnType;
use portal_sheet::state::database_store::DatabaseStore;
use portal_sheet::state::page_store::PageStore;

fn fixture() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/data/portal_snapshot.json")
}

fn copy_fixture(dir: &Path) -> PathBuf {
    let path = dir.join("portal.json");
    std::fs::copy(fixture(), &path).unwrap();
    path
}

#[test]
fn test_open_missing_file_starts_empty() {
    let dir = tempfile::tempdir().unwrap();
    let backend = JsonFileBackend::open(dir.path().join("nothing.json")).unwrap();
    let snapshot = backend.snapshot();
    assert!(snapshot.user_id.is_none());
    assert!(snapshot.collections.is_empty());
}

#[test]
fn test_open_malformed_file_is_json_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("broken.json");
    std::fs::write(&path, "{ not json").unwrap();

    let err = JsonFileBackend::open(&path).unwrap_err();
    assert!(matches!(err, BackendError::Json(_)));
}

#[test]
fn test_sign_in_is_persisted() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested/dir/portal.json");
    let backend = JsonFileBackend::open(&path).unwrap();
    backend.sign_in(Some("user-1".to_string())).unwrap();

    let snapshot = json_io::load_snapshot(&path).unwrap();
    assert_eq!(snapshot.user_id.as_deref(), Some("user-1"));
}

#[tokio::test]
async fn test_fixture_loads_into_store() {
    let dir = tempfile::tempdir().unwrap();
    let backend = Arc::new(JsonFileBackend::open(copy_fixture(dir.path())).unwrap());
    let mut store = DatabaseStore::new(Arc::clone(&backend));

    assert_eq!(store.fetch_user_tables().await.unwrap(), 1);
    let table = store.active_table().unwrap();
    assert_eq!(table.name, "Customers");

    let columns: Vec<(&str, ColumnType)> = table
        .columns
        .iter()
        .map(|column| (column.name.as_str(), column.column_type))
        .collect();
    assert_eq!(
        columns,
        vec![
            ("Company", ColumnType::Text),
            ("Deal size", ColumnType::Number),
            ("Status", ColumnType::Select),
            ("Legacy", ColumnType::Text),
        ]
    );

    let row_ids: Vec<&str> = table.rows.iter().map(|row| row.id.as_str()).collect();
    assert_eq!(row_ids, vec!["row-a", "row-b"]);
    assert!(table.is_cell_complete());
    assert_eq!(table.rows[1].content("col-name"), "Globex");
    assert_eq!(table.rows[1].content("col-value"), "");

    let deal = table.column("col-value").unwrap();
    assert_eq!(deal.display(table.rows[0].cell("col-value")), "$1,200.00");
}

#[tokio::test]
async fn test_writes_survive_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = copy_fixture(dir.path());

    let table_id = {
        let backend = Arc::new(JsonFileBackend::open(&path).unwrap());
        let mut store = DatabaseStore::new(Arc::clone(&backend));
        store.fetch_user_tables().await.unwrap();
        let table_id = store.create_table("Vendors").await.unwrap();
        store.delete_row("tbl-crm", "row-b").await.unwrap();
        let row_id = store.table(&table_id).unwrap().rows[0].id.clone();
        let column_id = store.table(&table_id).unwrap().columns[0].id.clone();
        store.update_cell(&table_id, &row_id, &column_id, "Initech").unwrap();
        store.settle().await;
        table_id
    };

    let backend = Arc::new(JsonFileBackend::open(&path).unwrap());
    let mut store = DatabaseStore::new(Arc::clone(&backend));
    assert_eq!(store.fetch_user_tables().await.unwrap(), 2);

    let vendors = store.table(&table_id).unwrap();
    assert_eq!(vendors.rows[0].content(&vendors.columns[0].id), "Initech");
    assert_eq!(store.table("tbl-crm").unwrap().rows.len(), 1);

    let snapshot = backend.snapshot();
    let orphaned = snapshot.collections[&Collection::Cells]
        .iter()
        .any(|record| record["row_id"] == "row-b" && record["column_id"] == "col-name");
    assert!(!orphaned);
}

#[tokio::test]
async fn test_fixture_page_blocks() {
    let dir = tempfile::tempdir().unwrap();
    let backend = Arc::new(JsonFileBackend::open(copy_fixture(dir.path())).unwrap());
    let mut pages = PageStore::new(Arc::clone(&backend));

    assert_eq!(pages.fetch_pages().await.unwrap(), 1);
    let page = pages.page("page-1").unwrap();
    assert!(page.is_published);
    let types: Vec<BlockType> = page.blocks.iter().map(|block| block.block_type()).collect();
    assert_eq!(types, vec![BlockType::Text, BlockType::RecordLink]);
}

#[tokio::test]
async fn test_failed_snapshot_save_undoes_write() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("portal.json");
    let backend = Arc::new(JsonFileBackend::open(&path).unwrap());
    backend.sign_in(Some("user-1".to_string())).unwrap();
    let mut store = DatabaseStore::new(Arc::clone(&backend));
    let table_id = store.create_table("Inventory").await.unwrap();

    // A directory in place of the snapshot makes the rename fail.
    std::fs::remove_file(&path).unwrap();
    std::fs::create_dir(&path).unwrap();

    let err = store.add_column(&table_id, None).await.unwrap_err();
    assert!(err.is_remote());
    assert_eq!(store.table(&table_id).unwrap().columns.len(), 3);
    assert_eq!(backend.snapshot().collections[&Collection::Columns].len(), 3);

    std::fs::remove_dir(&path).unwrap();
    store.rename_table(&table_id, "Stock").await.unwrap();

    let reopened = Arc::new(JsonFileBackend::open(&path).unwrap());
    let mut reloaded = DatabaseStore::new(reopened);
    reloaded.fetch_user_tables().await.unwrap();
    let table = reloaded.table(&table_id).unwrap();
    assert_eq!(table.name, "Stock");
    assert_eq!(table.columns.len(), 3);
    assert!(table.is_cell_complete());
}
