use crate::domain::Record;
use crate::error::{IngestError, Result};
use crate::pipeline::parser::ParsedTable;
use serde_json::{Map, Value};
use tracing::debug;

/// The column whose presence is the schema contract for an upload.
pub const AMOUNT_COLUMN: &str = "Amount";

/// Rows that survived validation, stamped with the uploader, plus how many
/// were dropped along the way.
#[derive(Debug, Clone)]
pub struct NormalizedBatch {
    pub rows: Vec<Record>,
    pub dropped: usize,
}

/// Validate and normalize a parsed table.
///
/// A missing `Amount` column aborts the whole batch. A row whose `Amount`
/// value cannot be coerced to a finite number is a soft error: it is dropped
/// and counted, and the batch continues.
pub fn normalize(table: &ParsedTable, uploaded_by: &str) -> Result<NormalizedBatch> {
    if !table.columns.iter().any(|c| c == AMOUNT_COLUMN) {
        return Err(IngestError::Schema(AMOUNT_COLUMN.to_string()));
    }

    let species_col = resolve_column(&table.columns, "species");
    let chemical_col = resolve_column(&table.columns, "chemical");
    let doi_col = resolve_column(&table.columns, "doi");

    let mut rows = Vec::with_capacity(table.rows.len());
    let mut dropped = 0usize;

    for (index, row) in table.rows.iter().enumerate() {
        let amount = match row.get(AMOUNT_COLUMN).and_then(coerce_amount) {
            Some(amount) => amount,
            None => {
                debug!(row = index, "dropping row with non-numeric amount");
                dropped += 1;
                continue;
            }
        };

        rows.push(Record {
            species: text_field(row, species_col.as_deref()),
            chemical: text_field(row, chemical_col.as_deref()),
            amount,
            doi: text_field(row, doi_col.as_deref()),
            uploaded_by: uploaded_by.to_string(),
        });
    }

    Ok(NormalizedBatch { rows, dropped })
}

/// Case-insensitive header lookup for the descriptive fields. Only `Amount`
/// is a hard requirement; the others default to empty when absent.
fn resolve_column(columns: &[String], name: &str) -> Option<String> {
    columns
        .iter()
        .find(|c| c.eq_ignore_ascii_case(name))
        .cloned()
}

fn coerce_amount(value: &Value) -> Option<f64> {
    let amount = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    amount.is_finite().then_some(amount)
}

fn text_field(row: &Map<String, Value>, column: Option<&str>) -> String {
    let Some(value) = column.and_then(|c| row.get(c)) else {
        return String::new();
    };
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}
