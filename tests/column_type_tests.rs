use portal_sheet::state::column_type::{
    self, ColumnMetadata, ColumnType, FilterOperator, DATE_FORMAT_ISO, DATE_FORMAT_LONG,
    NUMBER_FORMAT_CURRENCY, NUMBER_FORMAT_PERCENT,
};
use portal_sheet::state::column_template::{ColumnTemplate, TemplateCategory, COLUMN_TEMPLATES};
use portal_sheet::state::data_model::{Column, ColumnDef};

fn metadata_with_format(format: &str) -> ColumnMetadata {
    ColumnMetadata {
        options: None,
        format: Some(format.to_string()),
    }
}

#[test]
fn test_column_type_serde_tags() {
    let json = serde_json::to_string(&ColumnType::Boolean).unwrap();
    assert_eq!(json, "\"boolean\"");

    let parsed: ColumnType = serde_json::from_str("\"date\"").unwrap();
    assert_eq!(parsed, ColumnType::Date);
}

#[test]
fn test_unknown_type_tag_reads_as_text() {
    let parsed: ColumnType = serde_json::from_str("\"currency\"").unwrap();
    assert_eq!(parsed, ColumnType::Text);
    assert_eq!(ColumnType::parse(" NUMBER "), ColumnType::Number);
}

#[test]
fn test_column_json_uses_type_key() {
    let column: Column = serde_json::from_str(
        r#"{"id":"c1","name":"Status","type":"select","metadata":{"options":["Open","Done"]}}"#,
    )
    .unwrap();
    assert_eq!(column.column_type, ColumnType::Select);
    assert_eq!(column.metadata.options(), ["Open", "Done"]);
    assert_eq!(column.metadata.format, None);
}

#[test]
fn test_operator_sets_are_gated_by_type() {
    assert!(ColumnType::Text.supports(FilterOperator::Contains));
    assert!(!ColumnType::Text.supports(FilterOperator::GreaterThan));
    assert!(ColumnType::Number.supports(FilterOperator::LessEqual));
    assert!(!ColumnType::Number.supports(FilterOperator::Contains));
    assert!(ColumnType::Date.supports(FilterOperator::OnOrBefore));
    assert_eq!(
        ColumnType::Boolean.operators(),
        [FilterOperator::Equals, FilterOperator::NotEquals]
    );
    for column_type in ColumnType::all() {
        assert!(column_type.supports(FilterOperator::Equals));
    }
}

#[test]
fn test_operator_needs_value() {
    assert!(!FilterOperator::IsEmpty.needs_value());
    assert!(!FilterOperator::IsNotEmpty.needs_value());
    assert!(FilterOperator::StartsWith.needs_value());

    let json = serde_json::to_string(&FilterOperator::OnOrAfter).unwrap();
    assert_eq!(json, "\"on_or_after\"");
}

#[test]
fn test_default_metadata() {
    assert_eq!(ColumnType::Select.default_metadata().options, Some(vec![]));
    assert_eq!(
        ColumnType::Number.default_metadata().format.as_deref(),
        Some("plain")
    );
    assert_eq!(ColumnType::Text.default_metadata(), ColumnMetadata::default());
}

#[test]
fn test_metadata_merge_keeps_missing_fields() {
    let mut metadata = ColumnMetadata {
        options: Some(vec!["A".to_string()]),
        format: Some("short".to_string()),
    };
    metadata.merge(ColumnMetadata {
        options: Some(vec!["A".to_string(), "B".to_string()]),
        format: None,
    });
    assert_eq!(metadata.options(), ["A", "B"]);
    assert_eq!(metadata.format.as_deref(), Some("short"));
}

#[test]
fn test_number_display_formats() {
    let plain = ColumnMetadata::default();
    assert_eq!(ColumnType::Number.display("1234.5", &plain), "1,234.5");
    assert_eq!(
        ColumnType::Number.display("1234.5", &metadata_with_format(NUMBER_FORMAT_CURRENCY)),
        "$1,234.50"
    );
    assert_eq!(
        ColumnType::Number.display("42", &metadata_with_format(NUMBER_FORMAT_PERCENT)),
        "42%"
    );
    assert_eq!(ColumnType::Number.display("abc", &plain), "abc");
    assert_eq!(ColumnType::Number.display("  ", &plain), "");
}

#[test]
fn test_date_display_formats() {
    let short = ColumnType::Date.default_metadata();
    assert_eq!(ColumnType::Date.display("2024-03-05", &short), "3/5/2024");
    assert_eq!(
        ColumnType::Date.display("2024-03-05", &metadata_with_format(DATE_FORMAT_ISO)),
        "2024-03-05"
    );
    assert_eq!(
        ColumnType::Date.display("2024-03-05", &metadata_with_format(DATE_FORMAT_LONG)),
        "March 5, 2024"
    );
    assert_eq!(ColumnType::Date.display("soon", &short), "soon");
}

#[test]
fn test_boolean_display() {
    let metadata = ColumnMetadata::default();
    assert_eq!(ColumnType::Boolean.display("true", &metadata), "Yes");
    assert_eq!(ColumnType::Boolean.display("0", &metadata), "No");
    assert_eq!(ColumnType::Boolean.display("maybe", &metadata), "maybe");
}

#[test]
fn test_parsers() {
    assert_eq!(column_type::parse_number(" 3.5 "), Some(3.5));
    assert_eq!(column_type::parse_number("NaN"), None);
    assert_eq!(column_type::parse_bool("YES"), Some(true));
    assert_eq!(column_type::parse_bool(""), None);
    assert_eq!(
        column_type::parse_date("2024-01-31T10:00:00Z"),
        column_type::parse_date("01/31/2024")
    );
}

#[test]
fn test_column_templates_build_defs() {
    let price = ColumnDef::from_template("price").unwrap();
    assert_eq!(price.name, "Price");
    assert_eq!(price.column_type, ColumnType::Number);
    assert_eq!(price.metadata.format.as_deref(), Some(NUMBER_FORMAT_CURRENCY));

    let status = ColumnDef::from_template("status").unwrap();
    assert_eq!(status.column_type, ColumnType::Select);
    assert_eq!(
        status.metadata.options(),
        ["New", "In Progress", "Completed", "Canceled"]
    );

    let due = ColumnDef::from_template("dueDate").unwrap();
    assert_eq!(due.column_type, ColumnType::Date);
    assert_eq!(due.metadata, ColumnType::Date.default_metadata());

    assert!(ColumnDef::from_template("nope").is_none());
}

#[test]
fn test_column_template_catalog() {
    assert_eq!(COLUMN_TEMPLATES.len(), 12);
    for category in TemplateCategory::ALL {
        assert!(ColumnTemplate::in_category(category).count() > 0, "{}", category.label());
    }

    let contact: Vec<&str> = ColumnTemplate::in_category(TemplateCategory::Contact)
        .map(|template| template.name)
        .collect();
    assert_eq!(contact, vec!["Email", "Phone"]);

    let mut ids: Vec<&str> = COLUMN_TEMPLATES.iter().map(|template| template.id).collect();
    ids.sort_unstable();
    ids.dedup();
    assert_eq!(ids.len(), COLUMN_TEMPLATES.len());

    let discount = ColumnTemplate::find("discount").unwrap();
    assert_eq!(discount.metadata().format.as_deref(), Some(NUMBER_FORMAT_PERCENT));
    assert!(discount.metadata().options.is_none());
}
