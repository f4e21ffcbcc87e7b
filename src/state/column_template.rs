use serde::{Deserialize, Serialize};

use crate::state::column_type::{
    ColumnMetadata, ColumnType, NUMBER_FORMAT_CURRENCY, NUMBER_FORMAT_PERCENT,
};
use crate::state::data_model::ColumnDef;

/// Groups shown in the column picker.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TemplateCategory {
    Common,
    Product,
    Contact,
    System,
}

impl TemplateCategory {
    pub const ALL: [TemplateCategory; 4] = [
        TemplateCategory::Common,
        TemplateCategory::Product,
        TemplateCategory::Contact,
        TemplateCategory::System,
    ];

    pub fn label(self) -> &'static str {
        match self {
            TemplateCategory::Common => "Common Fields",
            TemplateCategory::Product => "Product Attributes",
            TemplateCategory::Contact => "Contact Information",
            TemplateCategory::System => "System Fields",
        }
    }
}

/// A predefined column that can be added to any table by id.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ColumnTemplate {
    pub id: &'static str,
    pub name: &'static str,
    pub column_type: ColumnType,
    pub category: TemplateCategory,
    options: &'static [&'static str],
    format: Option<&'static str>,
}

const fn template(
    id: &'static str,
    name: &'static str,
    column_type: ColumnType,
    category: TemplateCategory,
) -> ColumnTemplate {
    ColumnTemplate {
        id,
        name,
        column_type,
        category,
        options: &[],
        format: None,
    }
}

pub const COLUMN_TEMPLATES: &[ColumnTemplate] = &[
    template("name", "Name", ColumnType::Text, TemplateCategory::Common),
    template("description", "Description", ColumnType::Text, TemplateCategory::Common),
    template("email", "Email", ColumnType::Text, TemplateCategory::Contact),
    template("phone", "Phone", ColumnType::Text, TemplateCategory::Contact),
    ColumnTemplate {
        format: Some(NUMBER_FORMAT_CURRENCY),
        ..template("price", "Price", ColumnType::Number, TemplateCategory::Product)
    },
    template("stockLevel", "Stock Level", ColumnType::Number, TemplateCategory::Product),
    ColumnTemplate {
        format: Some(NUMBER_FORMAT_PERCENT),
        ..template("discount", "Discount", ColumnType::Number, TemplateCategory::Product)
    },
    ColumnTemplate {
        options: &["New", "In Progress", "Completed", "Canceled"],
        ..template("status", "Status", ColumnType::Select, TemplateCategory::Common)
    },
    template("createdAt", "Created at", ColumnType::Date, TemplateCategory::System),
    template("updatedAt", "Updated at", ColumnType::Date, TemplateCategory::System),
    template("dueDate", "Due date", ColumnType::Date, TemplateCategory::Common),
    template("active", "Active", ColumnType::Boolean, TemplateCategory::Common),
];

impl ColumnTemplate {
    pub fn find(id: &str) -> Option<&'static ColumnTemplate> {
        COLUMN_TEMPLATES.iter().find(|template| template.id == id)
    }

    pub fn in_category(category: TemplateCategory) -> impl Iterator<Item = &'static ColumnTemplate> {
        COLUMN_TEMPLATES
            .iter()
            .filter(move |template| template.category == category)
    }

    /// Options only apply to select columns and formats only to numbers.
    pub fn metadata(&self) -> ColumnMetadata {
        ColumnMetadata {
            options: (self.column_type == ColumnType::Select)
                .then(|| self.options.iter().map(|option| option.to_string()).collect()),
            format: self
                .format
                .filter(|_| self.column_type == ColumnType::Number)
                .map(str::to_string),
        }
    }

    pub fn to_def(&self) -> ColumnDef {
        ColumnDef::new(self.name, self.column_type).with_metadata(self.metadata())
    }
}

impl ColumnDef {
    pub fn from_template(id: &str) -> Option<ColumnDef> {
        ColumnTemplate::find(id).map(ColumnTemplate::to_def)
    }
}
