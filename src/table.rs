//! Row/column windows for reads and the cell layout for writes.

use serde_json::{Map, Value};

use crate::coordinate::{MAX_COLUMN, MAX_ROW, letter_to_col};
use crate::error::{Result, ServiceError};

/// Rows of a sheet as display strings; rows may differ in length.
pub type SheetSnapshot = Vec<Vec<String>>;

/// Resolve a 1-based inclusive window against `total` items.
///
/// `start < 1` becomes 1, `end <= 0` or past the end becomes `total`. When the
/// clamped window is empty `None` is returned and callers keep everything.
pub fn clamp_window(start: i64, end: i64, total: usize) -> Option<(usize, usize)> {
    let total = total as i64;
    let start = start.max(1);
    let end = if end <= 0 || end > total { total } else { end };

    (start <= end).then_some((start as usize, end as usize))
}

pub fn apply_row_window(rows: SheetSnapshot, start: Option<i64>, end: Option<i64>) -> SheetSnapshot {
    let (start, end) = (start.unwrap_or(0), end.unwrap_or(0));
    match clamp_window(start, end, rows.len()) {
        Some((first, last)) => rows.into_iter().skip(first - 1).take(last - first + 1).collect(),
        None => rows,
    }
}

/// Clip every row to the columns named by `start_col`/`end_col`.
///
/// The window is resolved against the widest row. Without either bound the
/// rows are returned untouched.
pub fn apply_col_window(
    rows: SheetSnapshot,
    start_col: Option<&str>,
    end_col: Option<&str>,
) -> Result<SheetSnapshot> {
    let start_col = start_col.filter(|s| !s.is_empty());
    let end_col = end_col.filter(|s| !s.is_empty());
    if start_col.is_none() && end_col.is_none() {
        return Ok(rows);
    }

    let start = column_bound(start_col, "start_col")?;
    let end = column_bound(end_col, "end_col")?;
    let width = rows.iter().map(Vec::len).max().unwrap_or(0);

    let Some((first, last)) = clamp_window(start, end, width) else {
        return Ok(rows);
    };

    Ok(rows
        .into_iter()
        .map(|row| row.into_iter().skip(first - 1).take(last - first + 1).collect())
        .collect())
}

fn column_bound(letters: Option<&str>, field: &str) -> Result<i64> {
    match letters {
        None => Ok(0),
        Some(letters) => letter_to_col(letters)
            .map(i64::from)
            .ok_or_else(|| ServiceError::InvalidRequest(format!("{field} is not a column: {letters}"))),
    }
}

/// One value to place at a 1-based `(col, row)`.
#[derive(Debug, Clone, PartialEq)]
pub struct CellWrite {
    pub col: u32,
    pub row: u32,
    pub value: String,
}

/// Header row plus data rows, ready to hand to the backend.
#[derive(Debug, Default)]
pub struct WriteLayout {
    pub(crate) headers: Vec<String>,
    pub cells: Vec<CellWrite>,
    pub rows_written: usize,
}

/// Lay out `data` with the header row at `start_row` and one row per record below it.
///
/// Headers are the keys of the first record in the order they appear in the
/// request. Later records missing a header get an empty cell; keys that are not
/// headers are dropped.
pub fn layout_rows(
    data: &[Map<String, Value>],
    start_row: Option<i64>,
    start_col: Option<&str>,
) -> Result<WriteLayout> {
    let start_row = start_row.unwrap_or(1).max(1);
    let start_col = match start_col.filter(|s| !s.is_empty()) {
        None => 1,
        Some(letters) => letter_to_col(letters).ok_or_else(|| {
            ServiceError::InvalidRequest(format!("start_col is not a column: {letters}"))
        })?,
    };

    // header row plus one row per record must end on or before the last sheet row
    let rows_needed = data.len();
    let start_row = u32::try_from(start_row)
        .ok()
        .filter(|&row| {
            u32::try_from(rows_needed)
                .ok()
                .and_then(|n| row.checked_add(n))
                .is_some_and(|last| last <= MAX_ROW)
        })
        .ok_or_else(|| {
            ServiceError::InvalidRequest(format!(
                "start_row {start_row} leaves no room for {rows_needed} rows below the header (last row is {MAX_ROW})"
            ))
        })?;

    let Some(first) = data.first() else {
        return Ok(WriteLayout::default());
    };

    let headers: Vec<String> = first.keys().cloned().collect();
    let fits = u32::try_from(headers.len())
        .ok()
        .and_then(|n| start_col.checked_add(n.saturating_sub(1)))
        .is_some_and(|last| last <= MAX_COLUMN);
    if !fits {
        return Err(ServiceError::InvalidRequest(format!(
            "{} columns starting at column {start_col} run past the last column ({MAX_COLUMN})",
            headers.len()
        )));
    }

    let mut cells = Vec::with_capacity(headers.len() * (data.len() + 1));

    for (i, header) in headers.iter().enumerate() {
        cells.push(CellWrite {
            col: start_col + i as u32,
            row: start_row,
            value: header.clone(),
        });
    }

    for (row_idx, record) in data.iter().enumerate() {
        for (col_idx, header) in headers.iter().enumerate() {
            let value = match record.get(header) {
                None | Some(Value::Null) => String::new(),
                Some(Value::String(s)) => s.clone(),
                Some(other) => {
                    return Err(ServiceError::InvalidRequest(format!(
                        "data[{row_idx}].{header} must be a string, got {other}"
                    )));
                }
            };
            cells.push(CellWrite {
                col: start_col + col_idx as u32,
                row: start_row + row_idx as u32 + 1,
                value,
            });
        }
    }

    Ok(WriteLayout {
        headers,
        cells,
        rows_written: data.len(),
    })
}
