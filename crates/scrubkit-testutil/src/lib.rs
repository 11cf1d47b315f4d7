use fake::faker::address::en::{StreetName, StreetSuffix};
use fake::faker::name::en::{FirstName, LastName};
use fake::Fake;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use scrubkit_core::schema::customers::{customer_schema, CUSTOMER_COLUMNS};
use scrubkit_core::schema::SchemaModel;
use scrubkit_core::table::Table;

/// Fixed reference date so age and future checks do not depend on the clock.
pub const AS_OF: &str = "2025-06-01";

/// The built-in customer schema pinned to [`AS_OF`].
pub fn pinned_customer_schema() -> SchemaModel {
    let mut schema = customer_schema();
    schema.as_of = chrono::NaiveDate::parse_from_str(AS_OF, "%Y-%m-%d").ok();
    schema
}

/// Build a customer table from string cells, typed against `schema`.
pub fn raw_table(schema: &SchemaModel, rows: &[[&str; 10]]) -> Table {
    let header: Vec<String> = CUSTOMER_COLUMNS.iter().map(|c| c.to_string()).collect();
    let cells = rows
        .iter()
        .map(|row| row.iter().map(|c| c.to_string()).collect())
        .collect();
    Table::from_raw_rows(schema, &header, cells, 2).expect("fixture rows match the customer schema")
}

/// Five raw customers with the usual problems: lower-case and blank names,
/// mixed phone formats, US-style and unparseable dates, blank income.
pub fn sample_raw_table() -> Table {
    raw_table(
        &pinned_customer_schema(),
        &[
            [
                "1", "John", "Doe", "john@example.com", "555-123-4567", "1985-03-15",
                "123 Main St", "75000", "active", "2024-01-10",
            ],
            [
                "2", "jane", "Smith", "jane@example.com", "555.987.6543", "1990-07-22",
                "456 Oak Ave", "95000", "active", "2024-01-11",
            ],
            [
                "3", "", "Johnson", "bob@example.com", "(555) 234-5678", "1988-11-08", "",
                "", "suspended", "2024-01-12",
            ],
            [
                "4", "Mary", "Brown", "mary@example.com", "5554356789", "05/10/1975",
                "789 Pine Rd", "120000", "", "2024-01-13",
            ],
            [
                "5", "Robert", "", "robert@example.com", "555-456-7890", "invalid_date",
                "892 Elm St", "55000", "active", "01/15/2024",
            ],
        ],
    )
}

/// Three customers that already satisfy every rule.
pub fn sample_clean_table() -> Table {
    raw_table(
        &pinned_customer_schema(),
        &[
            [
                "1", "John", "Doe", "john@example.com", "555-123-4567", "1985-03-15",
                "123 Main St", "75000", "active", "2024-01-10",
            ],
            [
                "2", "Jane", "Smith", "jane@example.com", "555-987-6543", "1990-07-22",
                "456 Oak Ave", "95000", "active", "2024-01-11",
            ],
            [
                "3", "Bob", "Johnson", "bob@example.com", "555-234-5678", "1988-11-08",
                "789 Pine Rd", "85000", "suspended", "2024-01-12",
            ],
        ],
    )
}

/// Generate `n` customer rows with randomly injected formatting problems.
///
/// The same seed always yields the same table.
pub fn messy_customers(n: usize, seed: u64) -> Table {
    let schema = pinned_customer_schema();
    let mut rng = StdRng::seed_from_u64(seed);
    let header: Vec<String> = CUSTOMER_COLUMNS.iter().map(|c| c.to_string()).collect();

    let rows: Vec<Vec<String>> = (0..n)
        .map(|i| messy_row(&mut rng, i as i64 + 1))
        .collect();

    Table::from_raw_rows(&schema, &header, rows, 2)
        .expect("generated rows match the customer schema")
}

fn messy_row(rng: &mut StdRng, id: i64) -> Vec<String> {
    let first: String = FirstName().fake_with_rng(rng);
    let last: String = LastName().fake_with_rng(rng);
    let email = format!(
        "{}.{}@example.com",
        first.to_lowercase(),
        last.to_lowercase()
    );

    let area = rng.random_range(200..999);
    let exchange = rng.random_range(200..999);
    let line = rng.random_range(0..10_000);
    let phone = match rng.random_range(0..5) {
        0 => format!("{}-{}-{:04}", area, exchange, line),
        1 => format!("({}) {}-{:04}", area, exchange, line),
        2 => format!("{}.{}.{:04}", area, exchange, line),
        3 => format!("{}{}{:04}", area, exchange, line),
        _ => format!("{}-{:04}", exchange, line),
    };

    let (year, month, day) = (
        rng.random_range(1940..2005),
        rng.random_range(1..=12),
        rng.random_range(1..=28),
    );
    let dob = match rng.random_range(0..6) {
        0 => format!("{:02}/{:02}/{}", month, day, year),
        1 => "not a date".to_string(),
        _ => format!("{}-{:02}-{:02}", year, month, day),
    };

    let street: String = StreetName().fake_with_rng(rng);
    let suffix: String = StreetSuffix().fake_with_rng(rng);
    let address = format!("{} {} {}", rng.random_range(1..9999), street, suffix);

    let income = rng.random_range(20_000..250_000);
    let income = match rng.random_range(0..4) {
        0 => format!("${},{:03}", income / 1000, income % 1000),
        1 => String::new(),
        _ => income.to_string(),
    };

    let statuses = ["active", "inactive", "suspended", "ACTIVE", " Inactive "];
    let status = statuses[rng.random_range(0..statuses.len())];

    let first = maybe_lower(rng, first);
    let mut row = vec![
        id.to_string(),
        maybe_blank(rng, first),
        maybe_blank(rng, last),
        email,
        phone,
        dob,
        maybe_blank(rng, address),
        income,
        status.to_string(),
        format!("2024-{:02}-{:02}", rng.random_range(1..=12), rng.random_range(1..=28)),
    ];

    // An occasional duplicate id exercises the unique key.
    if id > 1 && rng.random_bool(0.02) {
        row[0] = (id - 1).to_string();
    }
    row
}

fn maybe_blank(rng: &mut StdRng, value: String) -> String {
    if rng.random_bool(0.1) {
        String::new()
    } else {
        value
    }
}

fn maybe_lower(rng: &mut StdRng, value: String) -> String {
    if rng.random_bool(0.3) {
        value.to_lowercase()
    } else {
        value
    }
}
