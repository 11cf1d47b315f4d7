//! Built-in schema for the ten-column customer dataset.
//!
//! Used whenever `scrubkit.toml` declares no `[columns]`.

use super::types::*;

pub const CUSTOMER_COLUMNS: &[&str] = &[
    "customer_id",
    "first_name",
    "last_name",
    "email",
    "phone",
    "date_of_birth",
    "address",
    "income",
    "account_status",
    "created_date",
];

pub const EMAIL_PATTERN: &str = r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$";
pub const PHONE_PATTERN: &str = r"^\d{3}-\d{3}-\d{4}$";

pub fn customer_schema() -> SchemaModel {
    let mut schema = SchemaModel::new();

    schema.add_column(
        ColumnSpec::new("customer_id", LogicalType::Integer)
            .required()
            .with(Constraint::Range {
                min: Some(1.0),
                max: None,
            }),
    );
    for name in ["first_name", "last_name"] {
        schema.add_column(
            ColumnSpec::new(name, LogicalType::String)
                .required()
                .with(Constraint::Length {
                    min: Some(2),
                    max: Some(50),
                })
                .with(Constraint::CharClass(CharClass::Alphabetic))
                .pii(PiiCategory::Name)
                .case(CaseStyle::Title),
        );
    }
    schema.add_column(
        ColumnSpec::new("email", LogicalType::String)
            .with(Constraint::Pattern(EMAIL_PATTERN.to_string()))
            .pii(PiiCategory::Email)
            .case(CaseStyle::Lower),
    );
    schema.add_column(
        ColumnSpec::new("phone", LogicalType::String)
            .with(Constraint::Pattern(PHONE_PATTERN.to_string()))
            .pii(PiiCategory::Phone),
    );
    schema.add_column(
        ColumnSpec::new("date_of_birth", LogicalType::Date)
            .with(Constraint::MaxAge { years: 150 })
            .with(Constraint::NotInFuture)
            .pii(PiiCategory::DateOfBirth),
    );
    schema.add_column(
        ColumnSpec::new("address", LogicalType::String)
            .with(Constraint::Length {
                min: None,
                max: Some(200),
            })
            .pii(PiiCategory::Address),
    );
    schema.add_column(
        ColumnSpec::new("income", LogicalType::Decimal)
            .required()
            .with(Constraint::Range {
                min: Some(0.0),
                max: Some(10_000_000.0),
            }),
    );
    schema.add_column(
        ColumnSpec::new("account_status", LogicalType::Categorical)
            .with(Constraint::AllowedValues(vec![
                "active".to_string(),
                "inactive".to_string(),
                "suspended".to_string(),
            ]))
            .case(CaseStyle::Lower),
    );
    schema.add_column(
        ColumnSpec::new("created_date", LogicalType::Date).with(Constraint::NotInFuture),
    );

    schema.add_unique_key(&["customer_id"]);
    schema
}
