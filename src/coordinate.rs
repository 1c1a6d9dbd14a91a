use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref CELL_REGEX: Regex = Regex::new(r"^\$?([A-Za-z]{1,3})\$?([0-9]+)$").unwrap();
    static ref COLUMN_REGEX: Regex = Regex::new(r"^[A-Za-z]{1,3}$").unwrap();
}

/// Largest column an xlsx sheet can address (`XFD`).
pub const MAX_COLUMN: u32 = 16_384;

/// Largest row an xlsx sheet can address.
pub const MAX_ROW: u32 = 1_048_576;

/// Convert a 1-based column number to its letter form (1 -> A, 27 -> AA).
pub fn col_to_letter(col: u32) -> String {
    let mut col = col;
    let mut result = String::new();
    while col > 0 {
        col -= 1;
        result.push(((col % 26) as u8 + b'A') as char);
        col /= 26;
    }
    result.chars().rev().collect()
}

/// Convert column letters to a 1-based column number.
///
/// Returns `None` for anything that is not one to three ASCII letters or that
/// lands past the last addressable column.
pub fn letter_to_col(letters: &str) -> Option<u32> {
    if !COLUMN_REGEX.is_match(letters) {
        return None;
    }

    let col = letters
        .chars()
        .map(|c| c.to_ascii_uppercase())
        .fold(0u32, |acc, c| acc * 26 + (c as u32 - 'A' as u32 + 1));

    (col <= MAX_COLUMN).then_some(col)
}

pub fn cell_name(col: u32, row: u32) -> String {
    format!("{}{}", col_to_letter(col), row)
}

/// Parse an `A1` style reference (absolute markers allowed) into `(col, row)`.
pub fn parse_cell_name(cell_name: &str) -> Option<(u32, u32)> {
    let caps = CELL_REGEX.captures(cell_name.trim())?;
    let col = letter_to_col(&caps[1])?;
    let row = caps[2].parse::<u32>().ok()?;

    if row == 0 || row > MAX_ROW {
        return None;
    }
    Some((col, row))
}

/// Parse `"B2:D3"` into `(start_col, start_row, end_col, end_row)`.
///
/// A lone cell reference yields a one-cell area. Corners are normalised so
/// the end never precedes the start.
pub fn parse_range(range: &str) -> Option<(u32, u32, u32, u32)> {
    let (first, second) = range.split_once(':').unwrap_or((range, range));

    let (c0, r0) = parse_cell_name(first)?;
    let (c1, r1) = parse_cell_name(second)?;
    Some((c0.min(c1), r0.min(r1), c0.max(c1), r0.max(r1)))
}

/// A rectangular block of merged cells, 1-based and inclusive on both ends.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MergedRange {
    pub start_col: u32,
    pub start_row: u32,
    pub end_col: u32,
    pub end_row: u32,
}

impl MergedRange {
    pub fn parse(range: &str) -> Option<Self> {
        let (start_col, start_row, end_col, end_row) = parse_range(range)?;
        Some(MergedRange {
            start_col,
            start_row,
            end_col,
            end_row,
        })
    }

    pub fn span_rows(&self) -> u32 {
        self.end_row - self.start_row + 1
    }

    pub fn span_cols(&self) -> u32 {
        self.end_col - self.start_col + 1
    }

    pub fn start_cell(&self) -> String {
        cell_name(self.start_col, self.start_row)
    }

    pub fn end_cell(&self) -> String {
        cell_name(self.end_col, self.end_row)
    }

    /// `"A1:C2"` form used in responses.
    pub fn reference(&self) -> String {
        format!("{}:{}", self.start_cell(), self.end_cell())
    }
}
