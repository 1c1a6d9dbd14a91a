use chrono::{DateTime, Local};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use crate::coordinate::MergedRange;
use crate::error::{Result, ServiceError};
use crate::header::{HeaderAssessment, analyze_header};
use crate::workbook::Workbook;

/// Merged ranges listed per sheet; the count still covers all of them.
pub const MERGED_RANGES_LISTED: usize = 10;

#[derive(Serialize, Debug)]
pub struct MergedRangeInfo {
    pub range: String,
    pub start_row: u32,
    pub end_row: u32,
    pub start_col: u32,
    pub end_col: u32,
    pub span_rows: u32,
    pub span_cols: u32,
}

impl From<&MergedRange> for MergedRangeInfo {
    fn from(range: &MergedRange) -> Self {
        MergedRangeInfo {
            range: range.reference(),
            start_row: range.start_row,
            end_row: range.end_row,
            start_col: range.start_col,
            end_col: range.end_col,
            span_rows: range.span_rows(),
            span_cols: range.span_cols(),
        }
    }
}

#[derive(Serialize, Debug)]
pub struct MergedCellsSummary {
    pub count: usize,
    pub ranges: Vec<MergedRangeInfo>,
}

#[derive(Serialize, Debug)]
pub struct SheetInfo {
    pub row_count: usize,
    pub col_count: usize,
    pub has_data: bool,
    pub multi_level_header: HeaderAssessment,
    pub merged_cells: MergedCellsSummary,
}

#[derive(Serialize, Debug, Default, PartialEq)]
pub struct FileStructureSummary {
    pub total_merged_cells: usize,
    pub sheets_with_multi_headers: usize,
    pub complex_structure_detected: bool,
}

#[derive(Serialize, Debug)]
pub struct FileInfo {
    pub file_name: String,
    pub file_size: u64,
    pub modified_time: String,
    pub sheet_count: usize,
    pub sheets: BTreeMap<String, SheetInfo>,
    pub file_structure_summary: FileStructureSummary,
}

/// Describe one sheet from its rows and merged ranges.
pub fn describe_sheet(rows: &[Vec<String>], merged: &[MergedRange]) -> SheetInfo {
    SheetInfo {
        row_count: rows.len(),
        col_count: rows.first().map(Vec::len).unwrap_or(0),
        has_data: !rows.is_empty(),
        multi_level_header: analyze_header(rows, merged),
        merged_cells: MergedCellsSummary {
            count: merged.len(),
            ranges: merged
                .iter()
                .take(MERGED_RANGES_LISTED)
                .map(MergedRangeInfo::from)
                .collect(),
        },
    }
}

pub fn summarize<'a>(sheets: impl IntoIterator<Item = &'a SheetInfo>) -> FileStructureSummary {
    let mut summary = FileStructureSummary::default();
    for sheet in sheets {
        summary.total_merged_cells += sheet.merged_cells.count;
        if sheet.multi_level_header.detected {
            summary.sheets_with_multi_headers += 1;
        }
        if sheet.multi_level_header.detected || sheet.merged_cells.count > 0 {
            summary.complex_structure_detected = true;
        }
    }
    summary
}

/// Collect file metadata and per-sheet structure for `path`.
pub fn inspect_file(path: &Path) -> Result<FileInfo> {
    let book = Workbook::open(path)?;
    let metadata = fs::metadata(path).map_err(|e| ServiceError::Open(e.to_string()))?;

    let modified_time = metadata
        .modified()
        .map(|t| DateTime::<Local>::from(t).to_rfc3339())
        .unwrap_or_default();

    let sheet_names = book.sheet_names();
    let mut sheets = BTreeMap::new();
    for name in &sheet_names {
        // Unreadable sheets are reported empty rather than failing the whole file.
        let rows = book.snapshot(name).unwrap_or_else(|e| {
            log::warn!("{e}");
            Vec::new()
        });
        let merged = book.merged_ranges(name);
        sheets.insert(name.clone(), describe_sheet(&rows, &merged));
    }

    let file_structure_summary = summarize(sheets.values());

    Ok(FileInfo {
        file_name: path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default(),
        file_size: metadata.len(),
        modified_time,
        sheet_count: sheet_names.len(),
        sheets,
        file_structure_summary,
    })
}
