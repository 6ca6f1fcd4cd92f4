//! Summaries and tiers for presenting a [`ProcessingResult`].

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::result::{ExtractedSection, ProcessingResult};

/// Headline numbers for a result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportSummary {
    pub documents_analyzed: usize,
    pub sections_extracted: usize,
    pub key_insights: usize,
    /// Mean relevance score, rounded to a whole percent.
    pub average_relevance: u32,
    pub processing_time_seconds: u64,
}

impl ReportSummary {
    pub fn from_result(result: &ProcessingResult) -> Self {
        let analyses = &result.sub_section_analysis;
        let average_relevance = if analyses.is_empty() {
            0
        } else {
            let total: f64 = analyses.iter().map(|a| a.relevance_score).sum();
            (total / analyses.len() as f64).round() as u32
        };

        Self {
            documents_analyzed: result.metadata.input_documents.len(),
            sections_extracted: result.extracted_sections.len(),
            key_insights: analyses.iter().map(|a| a.key_insights.len()).sum(),
            average_relevance,
            processing_time_seconds: result.metadata.processing_time_seconds,
        }
    }
}

/// Importance band of an extracted section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RankTier {
    High,
    Medium,
    Low,
}

impl RankTier {
    pub fn for_rank(rank: u32) -> Self {
        match rank {
            0..=3 => RankTier::High,
            4..=6 => RankTier::Medium,
            _ => RankTier::Low,
        }
    }
}

/// Strength band of a relevance score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RelevanceTier {
    Strong,
    Moderate,
    Weak,
}

impl RelevanceTier {
    pub fn for_score(score: f64) -> Self {
        if score >= 90.0 {
            RelevanceTier::Strong
        } else if score >= 75.0 {
            RelevanceTier::Moderate
        } else {
            RelevanceTier::Weak
        }
    }
}

/// Which part of a result to present.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportView {
    #[default]
    Overview,
    Sections,
    Analysis,
    Json,
}

impl ReportView {
    pub const ALL: [ReportView; 4] = [
        ReportView::Overview,
        ReportView::Sections,
        ReportView::Analysis,
        ReportView::Json,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ReportView::Overview => "overview",
            ReportView::Sections => "sections",
            ReportView::Analysis => "analysis",
            ReportView::Json => "json",
        }
    }
}

impl fmt::Display for ReportView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReportView {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|v| v.as_str() == wanted)
            .ok_or_else(|| {
                format!(
                    "Unknown view: {} (expected overview, sections, analysis or json)",
                    s
                )
            })
    }
}

/// The `n` most important sections.
pub fn top_sections(result: &ProcessingResult, n: usize) -> &[ExtractedSection] {
    let end = n.min(result.extracted_sections.len());
    &result.extracted_sections[..end]
}
