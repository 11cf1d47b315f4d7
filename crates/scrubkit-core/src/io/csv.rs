use std::io::{Read, Write};

use crate::error::{Result, ScrubKitError};
use crate::schema::SchemaModel;
use crate::table::Table;

/// Read a CSV document into a typed table.
///
/// The first record is the header and must match the schema's declared
/// columns. Rows may be shorter than the header; missing trailing cells
/// load as `Missing`. Blank lines are skipped, a quoted empty field is not.
pub fn read_table<R: Read>(reader: &mut R, schema: &SchemaModel) -> Result<Table> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(reader);

    let header: Vec<String> = csv_reader
        .headers()
        .map_err(csv_error)?
        .iter()
        .enumerate()
        .map(|(i, h)| {
            if i == 0 {
                h.trim_start_matches('\u{feff}').to_string()
            } else {
                h.to_string()
            }
        })
        .collect();
    if header.is_empty() {
        return Err(ScrubKitError::Input {
            line: 1,
            message: "empty input, expected a header row".to_string(),
        });
    }

    let mut first_line = None;
    let mut rows = Vec::new();
    for record in csv_reader.records() {
        let record = record.map_err(csv_error)?;
        if first_line.is_none() {
            first_line = record.position().map(|p| p.line() as usize);
        }
        rows.push(record.iter().map(str::to_string).collect());
    }

    // Exact only without embedded newlines; good enough for errors.
    Table::from_raw_rows(schema, &header, rows, first_line.unwrap_or(2))
}

fn csv_error(err: csv::Error) -> ScrubKitError {
    let line = err.position().map_or(1, |p| p.line() as usize);
    let message = err.to_string();
    match err.into_kind() {
        csv::ErrorKind::Io(source) => ScrubKitError::Read {
            message: "reading CSV input".to_string(),
            source,
        },
        _ => ScrubKitError::Input { line, message },
    }
}

/// Write a table as CSV: header row, then one line per record.
pub fn write_table<W: Write>(writer: &mut W, table: &Table) -> Result<()> {
    let header = table
        .columns()
        .iter()
        .map(|c| csv_escape(c))
        .collect::<Vec<_>>()
        .join(",");
    writeln!(writer, "{}", header).map_err(|e| ScrubKitError::Output {
        message: "writing CSV header".to_string(),
        source: e,
    })?;

    for (i, row) in table.rows().iter().enumerate() {
        let values: Vec<String> = table
            .columns()
            .iter()
            .map(|col| {
                row.get(col)
                    .map(|v| csv_escape(&v.render()))
                    .unwrap_or_default()
            })
            .collect();

        writeln!(writer, "{}", values.join(",")).map_err(|e| ScrubKitError::Output {
            message: format!("writing CSV row {}", i),
            source: e,
        })?;
    }

    Ok(())
}

/// Escape a string for CSV: quote if it contains comma, quote, or newline.
fn csv_escape(s: &str) -> String {
    if s.contains(',') || s.contains('"') || s.contains('\n') || s.contains('\r') {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{ColumnSpec, LogicalType};
    use crate::table::Value;

    fn schema() -> SchemaModel {
        let mut s = SchemaModel::new();
        s.add_column(ColumnSpec::new("id", LogicalType::Integer));
        s.add_column(ColumnSpec::new("address", LogicalType::String));
        s
    }

    #[test]
    fn test_csv_escape() {
        assert_eq!(csv_escape("hello"), "hello");
        assert_eq!(csv_escape("hello,world"), "\"hello,world\"");
        assert_eq!(csv_escape("say \"hi\""), "\"say \"\"hi\"\"\"");
    }

    fn read(input: &str, schema: &SchemaModel) -> Result<Table> {
        read_table(&mut input.as_bytes(), schema)
    }

    #[test]
    fn test_read_quoted_fields_and_crlf() {
        let table = read(
            "id,address\r\n1,\"12 Main St, Apt 4\"\r\n2,\"say \"\"hi\"\"\"\r\n",
            &schema(),
        )
        .unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(
            table.get(0, "address"),
            Some(&Value::Text("12 Main St, Apt 4".into()))
        );
        assert_eq!(table.get(1, "address"), Some(&Value::Text("say \"hi\"".into())));
    }

    #[test]
    fn test_read_embedded_newline_and_blank_lines() {
        let table = read("id,address\n\n1,\"line one\nline two\"\n2,x", &schema()).unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(
            table.get(0, "address"),
            Some(&Value::Text("line one\nline two".into()))
        );
        assert_eq!(table.get(1, "address"), Some(&Value::Text("x".into())));
    }

    #[test]
    fn test_read_strips_byte_order_mark() {
        let table = read("\u{feff}id,address\n1,x\n", &schema()).unwrap();
        assert_eq!(table.get(0, "id"), Some(&Value::Integer(1)));
    }

    #[test]
    fn test_quoted_empty_value_is_a_row_in_single_column_table() {
        let mut single = SchemaModel::new();
        single.add_column(ColumnSpec::new("note", LogicalType::String));

        let table = read("note\na\n\"\"\nb\n", &single).unwrap();
        assert_eq!(table.len(), 3, "the quoted empty row must not be dropped");
        assert_eq!(table.get(1, "note"), Some(&Value::Missing));
        assert_eq!(table.get(2, "note"), Some(&Value::Text("b".into())));
    }

    #[test]
    fn test_too_many_cells_is_input_error() {
        let err = read("id,address\n1,x,extra\n", &schema()).unwrap_err();
        assert!(matches!(err, ScrubKitError::Input { .. }), "{}", err);
    }

    #[test]
    fn test_invalid_utf8_is_input_error() {
        let mut input: &[u8] = b"id,address\n1,\xff\xfe\n";
        let err = read_table(&mut input, &schema()).unwrap_err();
        assert!(matches!(err, ScrubKitError::Input { .. }), "{}", err);
    }

    #[test]
    fn test_read_table_types_cells() {
        let mut input = "id,address\n1,\"1 Main St, Springfield\"\n,\n".as_bytes();
        let table = read_table(&mut input, &schema()).unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.get(0, "id"), Some(&Value::Integer(1)));
        assert_eq!(
            table.get(0, "address"),
            Some(&Value::Text("1 Main St, Springfield".into()))
        );
        assert_eq!(table.get(1, "id"), Some(&Value::Missing));
    }

    #[test]
    fn test_read_table_rejects_wrong_header() {
        let mut input = "address,id\n".as_bytes();
        let err = read_table(&mut input, &schema()).unwrap_err();
        assert!(matches!(err, ScrubKitError::HeaderMismatch { .. }));
    }

    #[test]
    fn test_read_empty_input() {
        let mut input = "".as_bytes();
        assert!(matches!(
            read_table(&mut input, &schema()),
            Err(ScrubKitError::Input { line: 1, .. })
        ));
    }

    #[test]
    fn test_write_then_read_preserves_table() {
        let mut input = "id,address\n7,\"a, \"\"b\"\"\"\n8,\n".as_bytes();
        let table = read_table(&mut input, &schema()).unwrap();

        let mut out = Vec::new();
        write_table(&mut out, &table).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert_eq!(text, "id,address\n7,\"a, \"\"b\"\"\"\n8,\n");

        let again = read_table(&mut text.as_bytes(), &schema()).unwrap();
        assert_eq!(again, table);
    }
}
