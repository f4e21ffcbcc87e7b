use std::sync::Arc;
use std::time::Duration;

use portal_sheet::io::{Collection, MemoryBackend};
use portal_sheet::state::database_store::DatabaseStore;
use portal_sheet::state::debounce::{CellEditDebouncer, CellRef, PendingEdit};
use tokio::time::Instant;

fn cell(column: &str) -> CellRef {
    CellRef::new("t1", "r1", column)
}

#[tokio::test(start_paused = true)]
async fn test_keystrokes_on_same_cell_coalesce() {
    let mut debouncer = CellEditDebouncer::new(Duration::from_millis(500));

    assert!(debouncer.keystroke(cell("c1"), "h").is_none());
    tokio::time::advance(Duration::from_millis(300)).await;
    assert!(debouncer.keystroke(cell("c1"), "he").is_none());
    tokio::time::advance(Duration::from_millis(300)).await;
    assert!(debouncer.take_expired(Instant::now()).is_none());
    assert!(debouncer.keystroke(cell("c1"), "hey").is_none());

    let edit = debouncer.expired().await.unwrap();
    assert_eq!(edit.value, "hey");
    assert!(debouncer.pending().is_none());
}

#[tokio::test(start_paused = true)]
async fn test_window_restarts_on_every_keystroke() {
    let mut debouncer = CellEditDebouncer::new(Duration::from_secs(1));
    let start = Instant::now();

    debouncer.keystroke(cell("c1"), "a");
    tokio::time::advance(Duration::from_millis(900)).await;
    debouncer.keystroke(cell("c1"), "ab");

    assert_eq!(
        debouncer.deadline(),
        Some(start + Duration::from_millis(1900))
    );
    debouncer.expired().await.unwrap();
    assert!(Instant::now() >= start + Duration::from_millis(1900));
}

#[tokio::test(start_paused = true)]
async fn test_switching_cells_displaces_pending_edit() {
    let mut debouncer = CellEditDebouncer::default();
    assert_eq!(debouncer.window(), Duration::from_secs(1));

    debouncer.keystroke(cell("c1"), "left");
    let displaced = debouncer.keystroke(cell("c2"), "right").unwrap();
    assert_eq!(
        displaced,
        PendingEdit {
            cell: cell("c1"),
            value: "left".to_string(),
        }
    );
    assert_eq!(debouncer.pending().unwrap().value, "right");
}

#[tokio::test(start_paused = true)]
async fn test_flush_and_cancel() {
    let mut debouncer = CellEditDebouncer::new(Duration::from_secs(5));
    debouncer.keystroke(cell("c1"), "blurred");
    assert_eq!(debouncer.flush().unwrap().value, "blurred");
    assert!(debouncer.flush().is_none());
    assert!(debouncer.expired().await.is_none());

    debouncer.keystroke(cell("c1"), "gone");
    debouncer.cancel();
    assert!(debouncer.pending().is_none());
}

#[tokio::test]
async fn test_expired_edit_commits_to_store() {
    let backend = Arc::new(MemoryBackend::with_user("user-1"));
    let mut store = DatabaseStore::new(Arc::clone(&backend));
    let table_id = store.create_table("Debounced").await.unwrap();
    let table = store.table(&table_id).unwrap();
    let target = CellRef::new(
        table_id.clone(),
        table.rows[0].id.clone(),
        table.columns[0].id.clone(),
    );

    let mut debouncer = CellEditDebouncer::new(Duration::from_millis(10));
    debouncer.keystroke(target.clone(), "draf");
    debouncer.keystroke(target.clone(), "draft");
    let edit = debouncer.expired().await.unwrap();
    edit.commit(&mut store).unwrap();
    store.settle().await;

    assert_eq!(
        store.table(&table_id).unwrap().rows[0].content(&target.column_id),
        "draft"
    );
    let stored = backend
        .records(Collection::Cells)
        .into_iter()
        .find(|record| record["column_id"] == target.column_id.as_str())
        .unwrap();
    assert_eq!(stored["content"], "draft");
}
