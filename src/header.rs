//! Guess whether a sheet starts with a multi-level header.
//!
//! Only the first few rows and the merged ranges near the top are examined. The
//! thresholds are fixed so that results stay comparable between releases.
//!
//! Every sheet is assessed whatever its row count. Services that skip sheets
//! with fewer than two rows report nothing for them; here a one-row sheet with
//! a merged title at `A1` is flagged as a merged header, and a lone text row is
//! listed as a candidate even though it can never form a multi-level pair.

use serde::Serialize;

use crate::coordinate::MergedRange;

/// Leading rows inspected for header candidates.
pub const HEADER_SCAN_ROWS: usize = 5;

/// Two candidate rows at most this far apart form a multi-level header.
pub const CANDIDATE_GAP: usize = 2;

/// A merged range starting at or above this row marks a merged header.
pub const MERGED_HEADER_MAX_ROW: u32 = 3;

pub const MULTI_LEVEL_CONFIDENCE: f64 = 0.7;
pub const MERGED_HEADER_CONFIDENCE: f64 = 0.8;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StructureType {
    SingleLevel,
    MultiLevel,
    MergedHeader,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct HeaderAssessment {
    pub detected: bool,
    pub structure_type: StructureType,
    pub confidence: f64,
    /// 1-based rows that look like labels, reported even when nothing is detected.
    #[serde(rename = "header_candidates")]
    pub header_candidate_rows: Vec<usize>,
}

impl Default for HeaderAssessment {
    fn default() -> Self {
        HeaderAssessment {
            detected: false,
            structure_type: StructureType::SingleLevel,
            confidence: 0.0,
            header_candidate_rows: Vec::new(),
        }
    }
}

/// A row is a candidate when it has more than one value and most of them are text.
fn is_header_candidate(row: &[String]) -> bool {
    let mut non_empty = 0usize;
    let mut text = 0usize;

    for cell in row.iter().filter(|c| !c.is_empty()) {
        non_empty += 1;
        if cell.parse::<f64>().is_err() {
            text += 1;
        }
    }

    non_empty > 1 && text > non_empty / 2
}

pub fn header_candidates(rows: &[Vec<String>]) -> Vec<usize> {
    rows.iter()
        .take(HEADER_SCAN_ROWS)
        .enumerate()
        .filter(|(_, row)| is_header_candidate(row))
        .map(|(i, _)| i + 1)
        .collect()
}

pub fn analyze_header(rows: &[Vec<String>], merged: &[MergedRange]) -> HeaderAssessment {
    let mut assessment = HeaderAssessment {
        header_candidate_rows: header_candidates(rows),
        ..HeaderAssessment::default()
    };

    // Candidates come out in ascending order, so neighbours are enough.
    let close_pair = assessment
        .header_candidate_rows
        .windows(2)
        .any(|pair| pair[1] - pair[0] <= CANDIDATE_GAP);
    if close_pair {
        assessment.detected = true;
        assessment.structure_type = StructureType::MultiLevel;
        assessment.confidence = MULTI_LEVEL_CONFIDENCE;
    }

    if merged.iter().any(|m| m.start_row <= MERGED_HEADER_MAX_ROW) {
        assessment.detected = true;
        assessment.structure_type = StructureType::MergedHeader;
        assessment.confidence = MERGED_HEADER_CONFIDENCE;
    }

    assessment
}
