//! The processing result and its export format.
//!
//! A result is created once, by the synthesizer, after every phase completes.
//! Downstream renderers depend on its ordering invariants:
//! - `extracted_sections` ascending by unique `importance_rank`
//! - `sub_section_analysis` descending by `relevance_score`
//!
//! Serialization is stable: record keys are emitted in declaration order, with
//! `metadata` first, then `extractedSections`, then `subSectionAnalysis`.

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::persona::Persona;
use crate::schema::validate_result_schema;
use crate::task::Task;

/// Errors from result validation and export.
#[derive(Error, Debug)]
pub enum ResultError {
    #[error("Importance rank {0} appears more than once")]
    DuplicateRank(u32),

    #[error("Importance rank must be positive (section {index})")]
    InvalidRank { index: usize },

    #[error("Extracted sections are not sorted by importance rank at index {index}")]
    RanksNotAscending { index: usize },

    #[error("Page number must be positive ({list} index {index})")]
    InvalidPageNumber { list: &'static str, index: usize },

    #[error("Relevance score {score} is outside [0, 100] (index {index})")]
    ScoreOutOfRange { index: usize, score: f64 },

    #[error("Sub-section analyses are not sorted by relevance at index {index}")]
    ScoresNotDescending { index: usize },

    #[error("Result does not match schema: {}", .0.join("; "))]
    Schema(Vec<String>),

    #[error("Failed to encode or decode result JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Failed to read or write result file: {0}")]
    Io(#[from] std::io::Error),
}

/// Where a result came from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultMetadata {
    pub input_documents: Vec<String>,
    pub persona: Persona,
    pub task: Task,
    /// ISO-8601, millisecond precision, UTC.
    pub processing_timestamp: String,
    pub processing_time_seconds: u64,
}

/// A ranked section pulled from one document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractedSection {
    pub document: String,
    pub page_number: u32,
    pub section_title: String,
    pub importance_rank: u32,
    pub content: String,
}

/// A refined passage scored against the task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubSectionAnalysis {
    pub document: String,
    pub refined_text: String,
    pub page_number: u32,
    pub relevance_score: f64,
    pub key_insights: Vec<String>,
}

/// The full analysis report payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessingResult {
    pub metadata: ResultMetadata,
    pub extracted_sections: Vec<ExtractedSection>,
    pub sub_section_analysis: Vec<SubSectionAnalysis>,
}

impl ProcessingResult {
    /// Check the ordering and range invariants.
    pub fn validate(&self) -> Result<(), ResultError> {
        let mut ranks = HashSet::new();
        for (index, section) in self.extracted_sections.iter().enumerate() {
            if section.importance_rank == 0 {
                return Err(ResultError::InvalidRank { index });
            }
            if !ranks.insert(section.importance_rank) {
                return Err(ResultError::DuplicateRank(section.importance_rank));
            }
            if section.page_number == 0 {
                return Err(ResultError::InvalidPageNumber {
                    list: "extractedSections",
                    index,
                });
            }
        }

        for (index, pair) in self.extracted_sections.windows(2).enumerate() {
            if pair[0].importance_rank > pair[1].importance_rank {
                return Err(ResultError::RanksNotAscending { index: index + 1 });
            }
        }

        for (index, analysis) in self.sub_section_analysis.iter().enumerate() {
            let score = analysis.relevance_score;
            if !score.is_finite() || !(0.0..=100.0).contains(&score) {
                return Err(ResultError::ScoreOutOfRange { index, score });
            }
            if analysis.page_number == 0 {
                return Err(ResultError::InvalidPageNumber {
                    list: "subSectionAnalysis",
                    index,
                });
            }
        }

        for (index, pair) in self.sub_section_analysis.windows(2).enumerate() {
            if pair[0].relevance_score < pair[1].relevance_score {
                return Err(ResultError::ScoresNotDescending { index: index + 1 });
            }
        }

        Ok(())
    }

    /// Sort both lists into their canonical order.
    ///
    /// Backends that produce sections out of order call this before handing
    /// the result over. Ties keep their relative order.
    pub fn normalize_order(&mut self) {
        self.extracted_sections.sort_by_key(|s| s.importance_rank);
        self.sub_section_analysis
            .sort_by(|a, b| b.relevance_score.total_cmp(&a.relevance_score));
    }

    /// Pretty-printed JSON export.
    pub fn to_json_pretty(&self) -> Result<String, ResultError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Parse an export, checking the schema and the ordering invariants.
    pub fn from_json(json: &str) -> Result<Self, ResultError> {
        let value: serde_json::Value = serde_json::from_str(json)?;
        validate_result_schema(&value).map_err(ResultError::Schema)?;
        let result: ProcessingResult = serde_json::from_value(value)?;
        result.validate()?;
        Ok(result)
    }

    /// Parse an export file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ResultError> {
        let contents = fs::read_to_string(path)?;
        Self::from_json(&contents)
    }

    /// Write the export to a file.
    pub fn write_to(&self, path: impl AsRef<Path>) -> Result<(), ResultError> {
        fs::write(path, self.to_json_pretty()?)?;
        Ok(())
    }
}

/// Default export file name for a timestamp in Unix milliseconds.
pub fn export_file_name(timestamp_millis: i64) -> String {
    format!("document-analysis-{}.json", timestamp_millis)
}
