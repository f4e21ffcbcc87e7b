use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// Column type tag. Persisted as a free string by the backend, so unknown tags
/// deserialize as `Text`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", from = "String")]
pub enum ColumnType {
    #[default]
    Text,
    Number,
    Select,
    Date,
    Boolean,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterOperator {
    Equals,
    NotEquals,
    Contains,
    NotContains,
    StartsWith,
    EndsWith,
    IsEmpty,
    IsNotEmpty,
    GreaterThan,
    LessThan,
    GreaterEqual,
    LessEqual,
    After,
    Before,
    OnOrAfter,
    OnOrBefore,
}

#[derive(Clone, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ColumnMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
}

const TEXT_OPERATORS: &[FilterOperator] = &[
    FilterOperator::Equals,
    FilterOperator::NotEquals,
    FilterOperator::Contains,
    FilterOperator::NotContains,
    FilterOperator::StartsWith,
    FilterOperator::EndsWith,
    FilterOperator::IsEmpty,
    FilterOperator::IsNotEmpty,
];

const NUMBER_OPERATORS: &[FilterOperator] = &[
    FilterOperator::Equals,
    FilterOperator::NotEquals,
    FilterOperator::GreaterThan,
    FilterOperator::LessThan,
    FilterOperator::GreaterEqual,
    FilterOperator::LessEqual,
    FilterOperator::IsEmpty,
    FilterOperator::IsNotEmpty,
];

const DATE_OPERATORS: &[FilterOperator] = &[
    FilterOperator::Equals,
    FilterOperator::NotEquals,
    FilterOperator::After,
    FilterOperator::Before,
    FilterOperator::OnOrAfter,
    FilterOperator::OnOrBefore,
    FilterOperator::IsEmpty,
    FilterOperator::IsNotEmpty,
];

const SELECT_OPERATORS: &[FilterOperator] = &[
    FilterOperator::Equals,
    FilterOperator::NotEquals,
    FilterOperator::IsEmpty,
    FilterOperator::IsNotEmpty,
];

const BOOLEAN_OPERATORS: &[FilterOperator] = &[FilterOperator::Equals, FilterOperator::NotEquals];

impl ColumnType {
    pub fn all() -> &'static [Self] {
        &[
            Self::Text,
            Self::Number,
            Self::Select,
            Self::Date,
            Self::Boolean,
        ]
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Number => "number",
            Self::Select => "select",
            Self::Date => "date",
            Self::Boolean => "boolean",
        }
    }

    pub fn parse(tag: &str) -> Self {
        match tag.trim().to_ascii_lowercase().as_str() {
            "number" => Self::Number,
            "select" => Self::Select,
            "date" => Self::Date,
            "boolean" => Self::Boolean,
            _ => Self::Text,
        }
    }

    /// Filter operators offered for this column type, in menu order.
    pub fn operators(self) -> &'static [FilterOperator] {
        match self {
            Self::Text => TEXT_OPERATORS,
            Self::Number => NUMBER_OPERATORS,
            Self::Select => SELECT_OPERATORS,
            Self::Date => DATE_OPERATORS,
            Self::Boolean => BOOLEAN_OPERATORS,
        }
    }

    pub fn supports(self, operator: FilterOperator) -> bool {
        self.operators().contains(&operator)
    }

    pub fn default_metadata(self) -> ColumnMetadata {
        match self {
            Self::Select => ColumnMetadata {
                options: Some(Vec::new()),
                format: None,
            },
            Self::Number => ColumnMetadata {
                options: None,
                format: Some(NUMBER_FORMAT_PLAIN.to_string()),
            },
            Self::Date => ColumnMetadata {
                options: None,
                format: Some(DATE_FORMAT_SHORT.to_string()),
            },
            Self::Text | Self::Boolean => ColumnMetadata::default(),
        }
    }

    /// Formats raw cell content for display. Content that does not parse as
    /// the column type is shown verbatim.
    pub fn display(self, content: &str, metadata: &ColumnMetadata) -> String {
        if content.trim().is_empty() {
            return String::new();
        }

        match self {
            Self::Text | Self::Select => content.to_string(),
            Self::Number => match parse_number(content) {
                Some(value) => format_number(value, metadata.format.as_deref()),
                None => content.to_string(),
            },
            Self::Date => match parse_date(content) {
                Some(date) => format_date(date, metadata.format.as_deref()),
                None => content.to_string(),
            },
            Self::Boolean => match parse_bool(content) {
                Some(true) => "Yes".to_string(),
                Some(false) => "No".to_string(),
                None => content.to_string(),
            },
        }
    }
}

impl From<String> for ColumnType {
    fn from(tag: String) -> Self {
        Self::parse(&tag)
    }
}

impl std::fmt::Display for ColumnType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FilterOperator {
    pub fn needs_value(self) -> bool {
        !matches!(self, Self::IsEmpty | Self::IsNotEmpty)
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Equals => "Equals",
            Self::NotEquals => "Does not equal",
            Self::Contains => "Contains",
            Self::NotContains => "Does not contain",
            Self::StartsWith => "Starts with",
            Self::EndsWith => "Ends with",
            Self::IsEmpty => "Is empty",
            Self::IsNotEmpty => "Is not empty",
            Self::GreaterThan => "Greater than",
            Self::LessThan => "Less than",
            Self::GreaterEqual => "Greater than or equal",
            Self::LessEqual => "Less than or equal",
            Self::After => "After",
            Self::Before => "Before",
            Self::OnOrAfter => "On or after",
            Self::OnOrBefore => "On or before",
        }
    }
}

impl ColumnMetadata {
    pub fn options(&self) -> &[String] {
        self.options.as_deref().unwrap_or_default()
    }

    /// Overwrites only the fields present in `updates`.
    pub fn merge(&mut self, updates: ColumnMetadata) {
        if let Some(options) = updates.options {
            self.options = Some(options);
        }
        if let Some(format) = updates.format {
            self.format = Some(format);
        }
    }
}

pub const NUMBER_FORMAT_PLAIN: &str = "plain";
pub const NUMBER_FORMAT_CURRENCY: &str = "currency";
pub const NUMBER_FORMAT_PERCENT: &str = "percent";
pub const DATE_FORMAT_SHORT: &str = "short";
pub const DATE_FORMAT_ISO: &str = "iso";
pub const DATE_FORMAT_LONG: &str = "long";

pub fn parse_number(raw: &str) -> Option<f64> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed.parse::<f64>().ok().filter(|value| value.is_finite())
}

pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        return Some(date);
    }
    if let Ok(datetime) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(datetime.date_naive());
    }
    for pattern in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(datetime) = NaiveDateTime::parse_from_str(trimmed, pattern) {
            return Some(datetime.date());
        }
    }
    NaiveDate::parse_from_str(trimmed, "%m/%d/%Y").ok()
}

pub fn parse_bool(raw: &str) -> Option<bool> {
    let trimmed = raw.trim();
    if trimmed.eq_ignore_ascii_case("true") || trimmed == "1" || trimmed.eq_ignore_ascii_case("yes")
    {
        Some(true)
    } else if trimmed.eq_ignore_ascii_case("false")
        || trimmed == "0"
        || trimmed.eq_ignore_ascii_case("no")
    {
        Some(false)
    } else {
        None
    }
}

fn format_number(value: f64, format: Option<&str>) -> String {
    match format.unwrap_or(NUMBER_FORMAT_PLAIN) {
        NUMBER_FORMAT_CURRENCY => {
            let grouped = group_thousands(value.abs(), 2, 2);
            if is_negative(value, &grouped) {
                format!("-${grouped}")
            } else {
                format!("${grouped}")
            }
        }
        NUMBER_FORMAT_PERCENT => format!("{}%", signed_grouped(value, 0, 2)),
        _ => signed_grouped(value, 0, 3),
    }
}

fn signed_grouped(value: f64, min_frac: usize, max_frac: usize) -> String {
    let grouped = group_thousands(value.abs(), min_frac, max_frac);
    if is_negative(value, &grouped) {
        format!("-{grouped}")
    } else {
        grouped
    }
}

/// Values that round to zero lose their sign.
fn is_negative(value: f64, rounded: &str) -> bool {
    value < 0.0 && rounded.chars().any(|ch| matches!(ch, '1'..='9'))
}

fn group_thousands(value: f64, min_frac: usize, max_frac: usize) -> String {
    let rendered = format!("{value:.max_frac$}");
    let (int_part, frac_part) = rendered
        .split_once('.')
        .unwrap_or((rendered.as_str(), ""));

    let mut frac = frac_part.trim_end_matches('0').to_string();
    while frac.len() < min_frac {
        frac.push('0');
    }

    let digits = int_part.len();
    let mut out = String::with_capacity(digits + digits / 3 + frac.len() + 1);
    for (idx, ch) in int_part.chars().enumerate() {
        if idx > 0 && (digits - idx) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    if !frac.is_empty() {
        out.push('.');
        out.push_str(&frac);
    }
    out
}

fn format_date(date: NaiveDate, format: Option<&str>) -> String {
    match format.unwrap_or(DATE_FORMAT_SHORT) {
        DATE_FORMAT_ISO => date.format("%Y-%m-%d").to_string(),
        DATE_FORMAT_LONG => date.format("%B %-d, %Y").to_string(),
        _ => date.format("%-m/%-d/%Y").to_string(),
    }
}
