use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::io::backend::{BackendError, Record};
use crate::state::column_type::{ColumnMetadata, ColumnType};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TableRecord {
    pub id: String,
    pub user_id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ColumnRecord {
    pub id: String,
    pub table_id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub column_type: ColumnType,
    #[serde(default)]
    pub metadata: ColumnMetadata,
    pub order: i64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RowRecord {
    pub id: String,
    pub table_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CellRecord {
    pub id: String,
    pub row_id: String,
    pub column_id: String,
    #[serde(default)]
    pub content: String,
}

/// One page with its block array stored as JSON content.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PageRecord {
    pub id: String,
    pub user_id: String,
    pub title: String,
    pub slug: String,
    #[serde(default)]
    pub is_published: bool,
    #[serde(default)]
    pub content: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

pub fn to_record<T: Serialize>(value: &T) -> Result<Record, BackendError> {
    match serde_json::to_value(value)? {
        Value::Object(map) => Ok(map),
        other => Err(BackendError::Json(serde::ser::Error::custom(format!(
            "expected a JSON object, got {other}"
        )))),
    }
}

pub fn from_record<T: DeserializeOwned>(record: Record) -> Result<T, BackendError> {
    Ok(serde_json::from_value(Value::Object(record))?)
}

pub fn from_records<T: DeserializeOwned>(records: Vec<Record>) -> Result<Vec<T>, BackendError> {
    records.into_iter().map(from_record).collect()
}

/// Builds a patch record from field/value pairs.
pub fn patch<I, V>(fields: I) -> Record
where
    I: IntoIterator<Item = (&'static str, V)>,
    V: Into<Value>,
{
    fields
        .into_iter()
        .map(|(field, value)| (field.to_string(), value.into()))
        .collect()
}
