use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::state::column_type::{parse_bool, parse_date, parse_number, ColumnType, FilterOperator};
use crate::state::data_model::{Column, Row, Table};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum FilterLogic {
    #[default]
    #[serde(rename = "AND")]
    And,
    #[serde(rename = "OR")]
    Or,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterCondition {
    pub id: String,
    pub column_id: String,
    pub operator: FilterOperator,
    pub value: String,
    #[serde(default)]
    pub logic: FilterLogic,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortSpec {
    pub column: String,
    pub order: SortOrder,
}

impl FilterCondition {
    pub fn new(
        column_id: impl Into<String>,
        operator: FilterOperator,
        value: impl Into<String>,
    ) -> Self {
        Self {
            id: format!("filter-{}", uuid::Uuid::new_v4()),
            column_id: column_id.into(),
            operator,
            value: value.into(),
            logic: FilterLogic::And,
        }
    }

    pub fn with_logic(mut self, logic: FilterLogic) -> Self {
        self.logic = logic;
        self
    }

    /// Evaluates this condition against one row. Unknown columns, operators
    /// outside the column type's set, and unparseable operands never match.
    pub fn matches(&self, table: &Table, row: &Row) -> bool {
        let Some(column) = table.column(&self.column_id) else {
            return false;
        };
        evaluate(column, self.operator, row.content(&column.id), &self.value)
    }
}

impl SortSpec {
    pub fn new(column: impl Into<String>, order: SortOrder) -> Self {
        Self {
            column: column.into(),
            order,
        }
    }
}

/// Derives the displayed rows of `table`: filters folded left to right, then
/// a stable string sort on the raw content of one column.
pub fn derive_view<'a>(
    table: &'a Table,
    filters: &[FilterCondition],
    sort: Option<&SortSpec>,
) -> Vec<&'a Row> {
    let mut rows: Vec<&Row> = table
        .rows
        .iter()
        .filter(|row| row_matches(table, row, filters))
        .collect();

    if let Some(spec) = sort {
        rows.sort_by(|a, b| {
            let ordering = a.content(&spec.column).cmp(b.content(&spec.column));
            match spec.order {
                SortOrder::Asc => ordering,
                SortOrder::Desc => ordering.reverse(),
            }
        });
    }
    rows
}

pub fn row_matches(table: &Table, row: &Row, filters: &[FilterCondition]) -> bool {
    let Some((first, rest)) = filters.split_first() else {
        return true;
    };

    rest.iter().fold(first.matches(table, row), |acc, condition| match condition.logic {
        FilterLogic::And => acc && condition.matches(table, row),
        FilterLogic::Or => acc || condition.matches(table, row),
    })
}

fn evaluate(column: &Column, operator: FilterOperator, content: &str, value: &str) -> bool {
    if !column.column_type.supports(operator) {
        return false;
    }

    match operator {
        FilterOperator::IsEmpty => content.trim().is_empty(),
        FilterOperator::IsNotEmpty => !content.trim().is_empty(),
        FilterOperator::Equals => equals(column.column_type, content, value).unwrap_or(false),
        FilterOperator::NotEquals => equals(column.column_type, content, value)
            .map(|eq| !eq)
            .unwrap_or(false),
        FilterOperator::Contains => lower(content).contains(&lower(value)),
        FilterOperator::NotContains => !lower(content).contains(&lower(value)),
        FilterOperator::StartsWith => lower(content).starts_with(&lower(value)),
        FilterOperator::EndsWith => lower(content).ends_with(&lower(value)),
        FilterOperator::GreaterThan => compare_numbers(content, value, Ordering::is_gt),
        FilterOperator::LessThan => compare_numbers(content, value, Ordering::is_lt),
        FilterOperator::GreaterEqual => compare_numbers(content, value, Ordering::is_ge),
        FilterOperator::LessEqual => compare_numbers(content, value, Ordering::is_le),
        FilterOperator::After => compare_dates(content, value, Ordering::is_gt),
        FilterOperator::Before => compare_dates(content, value, Ordering::is_lt),
        FilterOperator::OnOrAfter => compare_dates(content, value, Ordering::is_ge),
        FilterOperator::OnOrBefore => compare_dates(content, value, Ordering::is_le),
    }
}

/// `None` when either side fails to parse as the column type.
fn equals(column_type: ColumnType, content: &str, value: &str) -> Option<bool> {
    match column_type {
        ColumnType::Text | ColumnType::Select => Some(lower(content.trim()) == lower(value.trim())),
        ColumnType::Number => Some(parse_number(content)? == parse_number(value)?),
        ColumnType::Date => Some(parse_date(content)? == parse_date(value)?),
        ColumnType::Boolean => {
            let actual = if content.trim().is_empty() {
                false
            } else {
                parse_bool(content)?
            };
            Some(actual == parse_bool(value)?)
        }
    }
}

fn compare_numbers(content: &str, value: &str, accept: fn(Ordering) -> bool) -> bool {
    match (parse_number(content), parse_number(value)) {
        (Some(left), Some(right)) => left.partial_cmp(&right).map(accept).unwrap_or(false),
        _ => false,
    }
}

fn compare_dates(content: &str, value: &str, accept: fn(Ordering) -> bool) -> bool {
    match (parse_date(content), parse_date(value)) {
        (Some(left), Some(right)) => accept(left.cmp(&right)),
        _ => false,
    }
}

fn lower(value: &str) -> String {
    value.to_lowercase()
}
