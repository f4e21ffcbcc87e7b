use thiserror::Error;

use crate::io::backend::BackendError;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("not authenticated")]
    Unauthenticated,
    #[error("table '{0}' not found")]
    TableNotFound(String),
    #[error("column '{column_id}' not found in table '{table_id}'")]
    ColumnNotFound { table_id: String, column_id: String },
    #[error("row '{row_id}' not found in table '{table_id}'")]
    RowNotFound { table_id: String, row_id: String },
    #[error("page '{0}' not found")]
    PageNotFound(String),
    #[error("block '{block_id}' not found on page '{page_id}'")]
    BlockNotFound { page_id: String, block_id: String },
    #[error("invalid input: {0}")]
    Validation(String),
    #[error(transparent)]
    Remote(#[from] BackendError),
}

impl StoreError {
    pub fn is_remote(&self) -> bool {
        matches!(self, Self::Remote(_))
    }
}

pub type StoreResult<T> = Result<T, StoreError>;
