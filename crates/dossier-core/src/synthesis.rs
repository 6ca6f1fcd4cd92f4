//! Result synthesis: turns the intake artifacts into a [`ProcessingResult`].
//!
//! The shape of the result is policy and does not depend on the strategy that
//! fills it in:
//! 1. `min(8, 2 × documents)` extracted sections, documents taken round-robin,
//!    ranks `1..=k` ascending, distinct page numbers
//! 2. `min(6, ⌊1.5 × documents⌋)` sub-section analyses, focus areas taken
//!    round-robin, sorted by relevance descending
//! 3. every relevance score within [0, 100]
//!
//! [`StandInSynthesizer`] fabricates narrative content around that shape. A
//! real extraction backend implements [`Synthesizer`] and honors the same
//! contract; the engine validates every result before accepting it.

use std::sync::Mutex;
use std::time::Duration;

use chrono::{DateTime, SecondsFormat, Utc};
use rand::rngs::StdRng;
use rand::seq::IteratorRandom;
use rand::{Rng, SeedableRng};
use thiserror::Error;

use crate::documents::DocumentSet;
use crate::engine::ProcessingPhase;
use crate::persona::Persona;
use crate::result::{ExtractedSection, ProcessingResult, ResultMetadata, SubSectionAnalysis};
use crate::task::Task;

/// Upper bound on extracted sections per result.
pub const MAX_EXTRACTED_SECTIONS: usize = 8;

/// Upper bound on sub-section analyses per result.
pub const MAX_SUB_SECTIONS: usize = 6;

/// Highest page number the stand-in assigns.
const MAX_PAGE: u32 = 20;

/// Characters of the task quoted in section content.
const TASK_EXCERPT_CHARS: usize = 50;

const SECTION_TITLES: [&str; 8] = [
    "Introduction and Methodology",
    "Literature Review",
    "Data Analysis and Results",
    "Discussion and Implications",
    "Conclusion and Future Work",
    "Technical Implementation",
    "Performance Evaluation",
    "Comparative Analysis",
];

const KEY_INSIGHTS: [&str; 6] = [
    "Key methodology identified",
    "Performance benchmark established",
    "Dataset characteristics analyzed",
    "Comparative results available",
    "Implementation details provided",
    "Future research directions outlined",
];

/// Errors a synthesis backend may report.
///
/// The stand-in never fails; real backends surface these as a failed phase.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SynthesisError {
    #[error("Document {document} could not be read: {reason}")]
    UnreadableDocument { document: String, reason: String },

    #[error("Synthesis backend failed: {0}")]
    Backend(String),
}

/// Everything a synthesizer may look at.
#[derive(Debug, Clone, Copy)]
pub struct SynthesisRequest<'a> {
    pub documents: &'a DocumentSet,
    pub persona: &'a Persona,
    pub task: &'a Task,
    /// Time since processing started.
    pub elapsed: Duration,
    pub timestamp: DateTime<Utc>,
}

impl SynthesisRequest<'_> {
    /// Metadata block shared by every strategy.
    pub fn metadata(&self) -> ResultMetadata {
        ResultMetadata {
            input_documents: self.documents.names(),
            persona: self.persona.clone(),
            task: self.task.clone(),
            processing_timestamp: self.timestamp.to_rfc3339_opts(SecondsFormat::Millis, true),
            processing_time_seconds: self.elapsed.as_secs_f64().round() as u64,
        }
    }
}

/// Number of extracted sections for a document count.
pub fn section_count(documents: usize) -> usize {
    MAX_EXTRACTED_SECTIONS.min(documents.saturating_mul(2))
}

/// Number of sub-section analyses for a document count: `⌊1.5 × n⌋`, capped.
pub fn sub_section_count(documents: usize) -> usize {
    MAX_SUB_SECTIONS.min(documents.saturating_mul(3) / 2)
}

/// Strategy that produces the processing result.
///
/// Implementations must be `Send + Sync`; one synthesizer may serve many
/// workflows, each calling it from its own thread of control.
pub trait Synthesizer: Send + Sync {
    /// Short name for logs.
    fn name(&self) -> &str;

    /// Called as each phase begins. A backend doing real work per phase
    /// returns an error here to fail that phase.
    fn prepare_phase(
        &self,
        _phase: &ProcessingPhase,
        _request: &SynthesisRequest<'_>,
    ) -> Result<(), SynthesisError> {
        Ok(())
    }

    /// Produce the result once every phase has completed.
    fn synthesize(
        &self,
        request: &SynthesisRequest<'_>,
    ) -> Result<ProcessingResult, SynthesisError>;
}

/// Template-filling synthesizer with randomized pages, scores and insights.
pub struct StandInSynthesizer {
    rng: Mutex<StdRng>,
}

impl StandInSynthesizer {
    /// Seeded from OS entropy.
    pub fn new() -> Self {
        Self {
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    /// Reproducible output for a given seed.
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    fn sections(&self, rng: &mut StdRng, request: &SynthesisRequest<'_>) -> Vec<ExtractedSection> {
        let docs = request.documents.as_slice();
        let count = section_count(docs.len());
        let pages = (1..=MAX_PAGE).choose_multiple(rng, count);
        let excerpt: String = request.task.task.chars().take(TASK_EXCERPT_CHARS).collect();

        (0..count)
            .map(|i| ExtractedSection {
                document: docs[i % docs.len()].name().to_string(),
                page_number: pages[i],
                section_title: SECTION_TITLES[i % SECTION_TITLES.len()].to_string(),
                importance_rank: (i + 1) as u32,
                content: format!(
                    "This section contains highly relevant information for {} regarding {}...",
                    request.persona.role, excerpt
                ),
            })
            .collect()
    }

    fn sub_sections(
        &self,
        rng: &mut StdRng,
        request: &SynthesisRequest<'_>,
    ) -> Vec<SubSectionAnalysis> {
        let docs = request.documents.as_slice();
        let count = sub_section_count(docs.len());

        let mut analyses: Vec<SubSectionAnalysis> = (0..count)
            .map(|i| {
                let focus = request.persona.focus_area_cycled(i).unwrap_or("general");
                // Jitter stays below the 5-point step so the base order holds.
                let jitter: f64 = rng.gen_range(0.0..4.0);
                let score = ((95.0 - 5.0 * i as f64 - jitter) * 100.0).round() / 100.0;
                let insights = rng.gen_range(2..=4);

                SubSectionAnalysis {
                    document: docs[i % docs.len()].name().to_string(),
                    refined_text: format!(
                        "Refined analysis of content specifically relevant to {} focus area. \
                         This extracted text has been processed to highlight the most pertinent \
                         information for the specified job requirements.",
                        focus
                    ),
                    page_number: rng.gen_range(1..=MAX_PAGE),
                    relevance_score: score.clamp(0.0, 100.0),
                    key_insights: KEY_INSIGHTS[..insights].iter().map(|s| s.to_string()).collect(),
                }
            })
            .collect();

        analyses.sort_by(|a, b| b.relevance_score.total_cmp(&a.relevance_score));
        analyses
    }
}

impl Default for StandInSynthesizer {
    fn default() -> Self {
        Self::new()
    }
}

impl Synthesizer for StandInSynthesizer {
    fn name(&self) -> &str {
        "stand-in"
    }

    fn synthesize(
        &self,
        request: &SynthesisRequest<'_>,
    ) -> Result<ProcessingResult, SynthesisError> {
        if request.documents.is_empty() {
            return Err(SynthesisError::Backend("no documents to analyze".to_string()));
        }

        let mut rng = self
            .rng
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        let result = ProcessingResult {
            metadata: request.metadata(),
            extracted_sections: self.sections(&mut rng, request),
            sub_section_analysis: self.sub_sections(&mut rng, request),
        };

        tracing::debug!(
            synthesizer = self.name(),
            sections = result.extracted_sections.len(),
            sub_sections = result.sub_section_analysis.len(),
            "Synthesized result"
        );

        Ok(result)
    }
}
