use crate::error::{IngestError, Result};
use calamine::{open_workbook_auto_from_rs, Data, Reader};
use serde_json::{Map, Value};
use std::io::Cursor;

/// Tabular formats accepted by the upload surface, derived from the
/// filename extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    Csv,
    Tsv,
    /// Excel workbook (.xlsx or .xls); the first worksheet is read.
    Workbook,
}

impl FileFormat {
    pub fn from_filename(filename: &str) -> Option<Self> {
        let ext = filename.rsplit_once('.')?.1.to_ascii_lowercase();
        match ext.as_str() {
            "csv" => Some(FileFormat::Csv),
            "tsv" => Some(FileFormat::Tsv),
            "xlsx" | "xls" => Some(FileFormat::Workbook),
            _ => None,
        }
    }
}

/// A parsed upload: declared column names plus one map per source row,
/// in source order.
#[derive(Debug, Clone)]
pub struct ParsedTable {
    pub columns: Vec<String>,
    pub rows: Vec<Map<String, Value>>,
}

/// Decode raw upload bytes into rows. The whole file is rejected on any
/// decoding failure; there are no partial results.
pub fn parse(bytes: &[u8], format: FileFormat) -> Result<ParsedTable> {
    match format {
        FileFormat::Csv => parse_delimited(bytes, b','),
        FileFormat::Tsv => parse_delimited(bytes, b'\t'),
        FileFormat::Workbook => parse_workbook(bytes),
    }
}

fn parse_delimited(bytes: &[u8], delimiter: u8) -> Result<ParsedTable> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .from_reader(bytes);

    let columns: Vec<String> = reader
        .headers()?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    let mut rows = Vec::new();
    for result in reader.records() {
        let record = result?;
        let mut row = Map::new();
        for (column, field) in columns.iter().zip(record.iter()) {
            row.insert(column.clone(), Value::String(field.to_string()));
        }
        rows.push(row);
    }

    Ok(ParsedTable { columns, rows })
}

fn parse_workbook(bytes: &[u8]) -> Result<ParsedTable> {
    let cursor = Cursor::new(bytes.to_vec());
    let mut workbook = open_workbook_auto_from_rs(cursor)?;

    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| IngestError::Parse("workbook has no worksheets".to_string()))??;

    let mut cells = range.rows();
    let columns: Vec<String> = cells
        .next()
        .ok_or_else(|| IngestError::Parse("worksheet has no header row".to_string()))?
        .iter()
        .map(|c| c.to_string().trim().to_string())
        .collect();

    let mut rows = Vec::new();
    for source_row in cells {
        let mut row = Map::new();
        for (column, cell) in columns.iter().zip(source_row.iter()) {
            row.insert(column.clone(), cell_to_value(cell));
        }
        rows.push(row);
    }

    Ok(ParsedTable { columns, rows })
}

fn cell_to_value(cell: &Data) -> Value {
    match cell {
        Data::Empty => Value::Null,
        Data::String(s) => Value::String(s.clone()),
        Data::Float(f) => serde_json::Number::from_f64(*f)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        Data::Int(i) => Value::Number((*i).into()),
        Data::Bool(b) => Value::Bool(*b),
        // Dates and cell errors have no place in the measurement schema;
        // carry them as text and let coercion sort them out.
        other => Value::String(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognizes_supported_extensions() {
        assert_eq!(FileFormat::from_filename("fish.csv"), Some(FileFormat::Csv));
        assert_eq!(FileFormat::from_filename("fish.TSV"), Some(FileFormat::Tsv));
        assert_eq!(
            FileFormat::from_filename("fish.xlsx"),
            Some(FileFormat::Workbook)
        );
        assert_eq!(
            FileFormat::from_filename("legacy.XLS"),
            Some(FileFormat::Workbook)
        );
        assert_eq!(FileFormat::from_filename("fish.pdf"), None);
        assert_eq!(FileFormat::from_filename("no_extension"), None);
    }

    #[test]
    fn parses_csv_preserving_row_order() {
        let data = b"Species,chemical,Amount,DOI\nsalmon,mercury,1.5,10.1/a\ntrout,lead,0.2,10.1/b\n";
        let table = parse(data, FileFormat::Csv).unwrap();
        assert_eq!(table.columns, vec!["Species", "chemical", "Amount", "DOI"]);
        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.rows[0]["Species"], "salmon");
        assert_eq!(table.rows[1]["Species"], "trout");
    }

    #[test]
    fn parses_tsv() {
        let data = b"Species\tAmount\nsalmon\t1.5\n";
        let table = parse(data, FileFormat::Tsv).unwrap();
        assert_eq!(table.columns, vec!["Species", "Amount"]);
        assert_eq!(table.rows[0]["Amount"], "1.5");
    }

    #[test]
    fn rejects_ragged_csv() {
        let data = b"Species,Amount\nsalmon,1.5,extra\n";
        let err = parse(data, FileFormat::Csv).unwrap_err();
        assert!(matches!(err, IngestError::Parse(_)));
    }

    #[test]
    fn rejects_corrupt_workbook() {
        let err = parse(b"this is not a spreadsheet", FileFormat::Workbook).unwrap_err();
        assert!(matches!(err, IngestError::Parse(_)));
    }
}
