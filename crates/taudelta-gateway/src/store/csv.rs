//! Decoding of CSV query responses.
//!
//! Responses are requested with a header row and no annotation rows. A
//! response holds one or more tables; a table whose schema differs from the
//! previous one follows a blank line and starts with its own header.

use std::collections::HashMap;

use super::{StoreError, StoreResult};

/// One result row, keyed by column name.
pub(crate) type Record = HashMap<String, String>;

/// Decode a whole response body into records.
pub(crate) fn decode(body: &str) -> StoreResult<Vec<Record>> {
    let mut records = Vec::new();
    let mut header: Option<Vec<String>> = None;

    for row in parse_rows(body)? {
        if row.is_empty() {
            header = None;
            continue;
        }

        let Some(columns) = &header else {
            header = Some(row);
            continue;
        };

        if columns.first().map(String::as_str) == Some("error") {
            let message = row.into_iter().next().unwrap_or_default();
            return Err(StoreError::Query(message));
        }

        if row.len() != columns.len() {
            return Err(StoreError::Decode(format!(
                "row has {} columns, header has {}",
                row.len(),
                columns.len()
            )));
        }

        records.push(columns.iter().cloned().zip(row).collect());
    }

    Ok(records)
}

/// Split a body into rows of fields (RFC 4180 quoting). Blank lines come
/// back as empty rows.
fn parse_rows(body: &str) -> StoreResult<Vec<Vec<String>>> {
    let mut rows = Vec::new();
    let mut row = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut quoted = false;
    let mut chars = body.chars().peekable();

    while let Some(c) = chars.next() {
        if in_quotes {
            match c {
                '"' if chars.peek() == Some(&'"') => {
                    chars.next();
                    field.push('"');
                }
                '"' => in_quotes = false,
                c => field.push(c),
            }
            continue;
        }

        match c {
            '"' => {
                in_quotes = true;
                quoted = true;
            }
            ',' => row.push(std::mem::take(&mut field)),
            '\r' => {}
            '\n' => {
                row.push(std::mem::take(&mut field));
                rows.push(finish_row(std::mem::take(&mut row), quoted));
                quoted = false;
            }
            c => field.push(c),
        }
    }

    if in_quotes {
        return Err(StoreError::Decode("unterminated quoted field".to_string()));
    }
    if !field.is_empty() || !row.is_empty() || quoted {
        row.push(field);
        rows.push(finish_row(row, quoted));
    }

    Ok(rows)
}

fn finish_row(row: Vec<String>, quoted: bool) -> Vec<String> {
    if !quoted && row.len() == 1 && row[0].is_empty() {
        Vec::new()
    } else {
        row
    }
}
