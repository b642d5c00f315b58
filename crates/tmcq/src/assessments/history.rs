use std::io::Read;
use std::path::Path;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::Deserialize;

use crate::scoring::{compute_composite, validate_score, CompositeScore, ScoringError};

/// One historical evaluation rebuilt from an exported CSV row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryEntry {
    pub evaluated_at: NaiveDateTime,
    pub tmcq: CompositeScore,
}

#[derive(Debug, thiserror::Error)]
pub enum HistoryImportError {
    #[error("failed to read evaluation history: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid evaluation history CSV: {0}")]
    Csv(#[from] csv::Error),
    #[error("row {row}: unrecognized evaluation_date '{value}'")]
    InvalidDate { row: usize, value: String },
    #[error("row {row}: {source}")]
    InvalidScore { row: usize, source: ScoringError },
}

#[derive(Debug, Deserialize)]
struct HistoryRow {
    evaluation_date: String,
    qcm_score: f64,
    clinical_cases_score: f64,
    ai_audit_score: f64,
}

impl HistoryRow {
    fn validated_scores(&self) -> Result<(f64, f64, f64), ScoringError> {
        Ok((
            validate_score("qcm_score", self.qcm_score)?,
            validate_score("clinical_cases_score", self.clinical_cases_score)?,
            validate_score("ai_audit_score", self.ai_audit_score)?,
        ))
    }
}

pub fn load_history_from_path<P: AsRef<Path>>(
    path: P,
) -> Result<Vec<HistoryEntry>, HistoryImportError> {
    let file = std::fs::File::open(path)?;
    load_history(file)
}

/// Parse `evaluation_date,qcm_score,clinical_cases_score,ai_audit_score`
/// rows, recompute each T-MCQ, and return them oldest first.
pub fn load_history<R: Read>(reader: R) -> Result<Vec<HistoryEntry>, HistoryImportError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);
    let mut entries = Vec::new();

    for (index, record) in csv_reader.deserialize::<HistoryRow>().enumerate() {
        let row = record?;
        let line = index + 1;
        let evaluated_at =
            parse_datetime(&row.evaluation_date).ok_or_else(|| HistoryImportError::InvalidDate {
                row: line,
                value: row.evaluation_date.clone(),
            })?;

        let (qcm, cases, audit) = row
            .validated_scores()
            .map_err(|source| HistoryImportError::InvalidScore { row: line, source })?;

        entries.push(HistoryEntry {
            evaluated_at,
            tmcq: compute_composite(qcm, cases, audit),
        });
    }

    entries.sort_by_key(|entry| entry.evaluated_at);
    Ok(entries)
}

fn parse_datetime(value: &str) -> Option<NaiveDateTime> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(dt.naive_utc());
    }

    if let Ok(dt) = NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%d %H:%M:%S") {
        return Some(dt);
    }

    if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        return date.and_hms_opt(0, 0, 0);
    }

    None
}
