use std::path::{Path, PathBuf};
use umya_spreadsheet::Spreadsheet;
use umya_spreadsheet::structs::Worksheet;

use crate::coordinate::MergedRange;
use crate::error::{Result, ServiceError};
use crate::table::{CellWrite, SheetSnapshot};

/// Sheet created for writes that don't name one.
pub const DEFAULT_SHEET: &str = "Sheet1";

/// An xlsx file loaded into memory, tied to the path it is saved back to.
pub struct Workbook {
    path: PathBuf,
    book: Spreadsheet,
}

impl Workbook {
    /// Open an existing file, reporting a missing path as a request error.
    pub fn open(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(ServiceError::FileNotFound(path.to_path_buf()));
        }
        Self::read(path)
    }

    /// Open a file without the existence check; every failure is a backend error.
    pub fn read(path: &Path) -> Result<Self> {
        log::debug!("opening workbook {}", path.display());
        let book = umya_spreadsheet::reader::xlsx::read(path)
            .map_err(|e| ServiceError::Open(format!("{}: {}", path.display(), e)))?;

        Ok(Workbook {
            path: path.to_path_buf(),
            book,
        })
    }

    /// Open `path` if it exists, otherwise start a fresh workbook that will be saved there.
    pub fn open_or_create(path: &Path) -> Result<Self> {
        if path.exists() {
            return Self::read(path);
        }

        log::debug!("creating workbook {}", path.display());
        Ok(Workbook {
            path: path.to_path_buf(),
            book: umya_spreadsheet::new_file(),
        })
    }

    pub fn sheet_names(&self) -> Vec<String> {
        self.book
            .get_sheet_collection()
            .iter()
            .map(|sheet| sheet.get_name().to_string())
            .collect()
    }

    /// The requested sheet name, or the first sheet's name when none was given.
    pub fn resolve_sheet_name(&self, requested: Option<&str>) -> String {
        match requested.filter(|name| !name.is_empty()) {
            Some(name) => name.to_string(),
            None => self
                .book
                .get_sheet(&0)
                .map(|sheet| sheet.get_name().to_string())
                .unwrap_or_default(),
        }
    }

    fn worksheet(&self, name: &str) -> Option<&Worksheet> {
        self.book.get_sheet_by_name(name)
    }

    pub fn worksheet_mut(&mut self, name: &str) -> Option<&mut Worksheet> {
        self.book.get_sheet_by_name_mut(name)
    }

    /// Cell text of a sheet, row by row.
    ///
    /// Trailing empty cells of each row and trailing empty rows are dropped, so
    /// rows come back ragged.
    pub fn snapshot(&self, name: &str) -> Result<SheetSnapshot> {
        let sheet = self
            .worksheet(name)
            .ok_or_else(|| ServiceError::ReadSheet(format!("sheet {name} does not exist")))?;
        Ok(snapshot_sheet(sheet))
    }

    pub fn merged_ranges(&self, name: &str) -> Vec<MergedRange> {
        let Some(sheet) = self.worksheet(name) else {
            return Vec::new();
        };

        sheet
            .get_merge_cells()
            .iter()
            .filter_map(|range| {
                let reference = range.get_range();
                let parsed = MergedRange::parse(&reference);
                if parsed.is_none() {
                    log::warn!("skipping unparseable merge range {reference} on {name}");
                }
                parsed
            })
            .collect()
    }

    /// Make sure a sheet called `name` exists, adding it at the end if needed.
    pub fn ensure_sheet(&mut self, name: &str) -> Result<()> {
        if self.worksheet(name).is_some() {
            return Ok(());
        }

        log::debug!("adding sheet {name} to {}", self.path.display());
        self.book
            .new_sheet(name)
            .map(|_| ())
            .map_err(|e| ServiceError::Write(format!("cannot add sheet {name}: {e}")))
    }

    /// Store every value as text at its coordinate.
    pub fn write_cells(&mut self, name: &str, cells: &[CellWrite]) -> Result<()> {
        let sheet = self
            .worksheet_mut(name)
            .ok_or_else(|| ServiceError::Write(format!("sheet {name} does not exist")))?;

        for cell in cells {
            sheet
                .get_cell_mut((cell.col, cell.row))
                .set_value_string(cell.value.clone());
        }
        Ok(())
    }

    /// Write the workbook back to its path, replacing the file.
    pub fn save(&self) -> Result<()> {
        umya_spreadsheet::writer::xlsx::write(&self.book, &self.path)
            .map_err(|e| ServiceError::Save(format!("{}: {}", self.path.display(), e)))?;
        log::debug!("saved workbook {}", self.path.display());
        Ok(())
    }
}

fn snapshot_sheet(sheet: &Worksheet) -> SheetSnapshot {
    let (max_col, max_row) = sheet.get_highest_column_and_row();
    let mut rows: SheetSnapshot = Vec::with_capacity(max_row as usize);

    for row in 1..=max_row {
        let mut record: Vec<String> = (1..=max_col)
            .map(|col| {
                sheet
                    .get_cell((col, row))
                    .map(|cell| cell.get_formatted_value())
                    .unwrap_or_default()
            })
            .collect();

        while record.last().is_some_and(|value| value.is_empty()) {
            record.pop();
        }
        rows.push(record);
    }

    while rows.last().is_some_and(|row| row.is_empty()) {
        rows.pop();
    }
    rows
}
