use std::time::Duration;

use tokio::time::Instant;

use crate::io::backend::Backend;
use crate::state::database_store::DatabaseStore;
use crate::state::error::StoreResult;

pub const DEFAULT_EDIT_DEBOUNCE: Duration = Duration::from_secs(1);

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CellRef {
    pub table_id: String,
    pub row_id: String,
    pub column_id: String,
}

impl CellRef {
    pub fn new(
        table_id: impl Into<String>,
        row_id: impl Into<String>,
        column_id: impl Into<String>,
    ) -> Self {
        Self {
            table_id: table_id.into(),
            row_id: row_id.into(),
            column_id: column_id.into(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PendingEdit {
    pub cell: CellRef,
    pub value: String,
}

impl PendingEdit {
    pub fn commit<B: Backend>(self, store: &mut DatabaseStore<B>) -> StoreResult<()> {
        store.update_cell(
            &self.cell.table_id,
            &self.cell.row_id,
            &self.cell.column_id,
            &self.value,
        )
    }
}

/// Coalesces keystrokes into one cell edit per quiet window.
#[derive(Debug)]
pub struct CellEditDebouncer {
    window: Duration,
    pending: Option<(PendingEdit, Instant)>,
}

impl Default for CellEditDebouncer {
    fn default() -> Self {
        Self::new(DEFAULT_EDIT_DEBOUNCE)
    }
}

impl CellEditDebouncer {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            pending: None,
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    pub fn pending(&self) -> Option<&PendingEdit> {
        self.pending.as_ref().map(|(edit, _)| edit)
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.pending.as_ref().map(|(_, deadline)| *deadline)
    }

    /// Records a keystroke and restarts the window. If a different cell was
    /// pending, that edit is returned and should be committed now.
    pub fn keystroke(&mut self, cell: CellRef, value: impl Into<String>) -> Option<PendingEdit> {
        let deadline = Instant::now() + self.window;
        let displaced = match self.pending.take() {
            Some((previous, _)) if previous.cell != cell => Some(previous),
            _ => None,
        };
        self.pending = Some((
            PendingEdit {
                cell,
                value: value.into(),
            },
            deadline,
        ));
        displaced
    }

    /// Returns the pending edit if its window has closed by `now`.
    pub fn take_expired(&mut self, now: Instant) -> Option<PendingEdit> {
        match self.deadline() {
            Some(deadline) if deadline <= now => self.flush(),
            _ => None,
        }
    }

    /// Sleeps until the pending edit's window closes and returns it. Returns
    /// `None` at once when nothing is pending.
    pub async fn expired(&mut self) -> Option<PendingEdit> {
        let deadline = self.deadline()?;
        tokio::time::sleep_until(deadline).await;
        self.flush()
    }

    /// Takes the pending edit regardless of its deadline (blur, unmount).
    pub fn flush(&mut self) -> Option<PendingEdit> {
        self.pending.take().map(|(edit, _)| edit)
    }

    pub fn cancel(&mut self) {
        if let Some((edit, _)) = self.pending.take() {
            tracing::debug!(row_id = %edit.cell.row_id, column_id = %edit.cell.column_id, "discarded pending cell edit");
        }
    }
}
