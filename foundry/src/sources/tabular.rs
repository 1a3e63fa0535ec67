//! Tabular files: one JSON object per data row.

use calamine::{Data, Reader};
use serde_json::{Map, Number, Value};
use std::io::Cursor;

use crate::errors::ParseError;

/// Turns a raw cell into a JSON value, preferring numbers and booleans.
fn cell_value(raw: &str) -> Value {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Value::Null;
    }
    if let Ok(i) = trimmed.parse::<i64>() {
        return Value::Number(i.into());
    }
    if let Some(n) = trimmed.parse::<f64>().ok().and_then(Number::from_f64) {
        return Value::Number(n);
    }
    match trimmed {
        "true" | "TRUE" | "True" => Value::Bool(true),
        "false" | "FALSE" | "False" => Value::Bool(false),
        _ => Value::String(raw.to_string()),
    }
}

fn row_to_json<I>(headers: &[String], cells: I) -> Result<String, ParseError>
where
    I: IntoIterator<Item = Value>,
{
    let object: Map<String, Value> = headers.iter().cloned().zip(cells).collect();
    Ok(serde_json::to_string(&Value::Object(object))?)
}

/// Chunks a CSV file. The first row is the header.
pub fn chunk_csv(content: &[u8]) -> Result<Vec<String>, ParseError> {
    let mut reader = csv::Reader::from_reader(content);
    let headers: Vec<String> = reader
        .headers()?
        .iter()
        .map(str::to_string)
        .collect();

    let mut chunks = Vec::new();
    for row in reader.records() {
        let row = row?;
        chunks.push(row_to_json(&headers, row.iter().map(cell_value))?);
    }
    Ok(chunks)
}

fn data_value(cell: &Data) -> Value {
    match cell {
        Data::Empty => Value::Null,
        Data::String(s) => Value::String(s.clone()),
        Data::Int(i) => Value::Number((*i).into()),
        Data::Float(f) => Number::from_f64(*f).map_or(Value::Null, Value::Number),
        Data::Bool(b) => Value::Bool(*b),
        Data::DateTime(dt) => Value::String(dt.to_string()),
        Data::DateTimeIso(s) | Data::DurationIso(s) => Value::String(s.clone()),
        Data::Error(e) => Value::String(format!("#ERROR {e:?}")),
    }
}

/// Chunks the first worksheet of an Excel or ODS workbook.
pub fn chunk_spreadsheet(content: &[u8]) -> Result<Vec<String>, ParseError> {
    let mut workbook = calamine::open_workbook_auto_from_rs(Cursor::new(content))
        .map_err(|e| ParseError::Workbook(e.to_string()))?;

    let Some(sheet) = workbook.sheet_names().first().cloned() else {
        return Ok(Vec::new());
    };
    let range = workbook
        .worksheet_range(&sheet)
        .map_err(|e| ParseError::Workbook(format!("sheet '{sheet}': {e}")))?;

    let mut rows = range.rows();
    let Some(header_row) = rows.next() else {
        return Ok(Vec::new());
    };
    let headers: Vec<String> = header_row
        .iter()
        .enumerate()
        .map(|(i, cell)| match data_value(cell) {
            Value::Null => format!("column_{i}"),
            Value::String(s) => s,
            other => other.to_string(),
        })
        .collect();

    rows.filter(|row| !row.iter().all(|cell| matches!(cell, Data::Empty)))
        .map(|row| row_to_json(&headers, row.iter().map(data_value)))
        .collect()
}
