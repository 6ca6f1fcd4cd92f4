//! # dossier-core
//!
//! Persona-driven document analysis intake and processing.
//!
//! A [`Workflow`] walks one analysis through five stages:
//! - **Upload**: collect at least three PDFs
//! - **Persona**: who is reading (role, expertise, focus areas, experience)
//! - **Job**: what they need done, with priority and timeline
//! - **Processing**: a paced, five-phase pipeline
//! - **Results**: a ranked, scored [`ProcessingResult`]
//!
//! ## Key Guarantees
//!
//! 1. **Gated**: no stage is entered without its predecessors' artifacts
//! 2. **Monotonic**: processing progress never decreases and ends at exactly 100
//! 3. **Cancellable**: a reset cancels every outstanding timer before returning
//! 4. **Pluggable**: the [`Synthesizer`] decides content, the shape is fixed
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use dossier_core::{DocumentCandidate, ManualClock, Persona, StandInSynthesizer, Task, Workflow};
//!
//! let clock = ManualClock::new();
//! let mut workflow = Workflow::new(Arc::new(StandInSynthesizer::new()), Arc::new(clock.clone()));
//!
//! workflow.ingest(candidates)?;
//! workflow.advance_from_upload()?;
//! workflow.submit_persona(persona)?;
//! workflow.submit_task(task)?;
//! workflow.start_processing()?;
//!
//! while let Some(deadline) = workflow.next_deadline() {
//!     clock.set(deadline);
//!     for event in workflow.run_due() {
//!         println!("{:?}", event);
//!     }
//! }
//! ```
//!
//! The engine never blocks: drivers own time. `dossier-runtime` drives a
//! workflow on tokio timers.

pub mod documents;
pub mod engine;
pub mod persona;
pub mod report;
pub mod result;
pub mod schema;
pub mod scheduler;
pub mod synthesis;
pub mod task;
pub mod validation;
pub mod workflow;

// Re-export main types at crate root
pub use documents::{
    DocumentCandidate, DocumentId, DocumentRef, DocumentSet, MIN_DOCUMENTS, PDF_MEDIA_TYPE,
    RECOMMENDED_MAX_DOCUMENTS,
};
pub use engine::{
    AnalysisInputs, EngineError, EngineEvent, EngineOutcome, EngineStatus, EngineTimer, Pacing,
    ProcessingEngine, ProcessingPhase, ProgressSnapshot,
};
pub use persona::{Persona, TagSet};
pub use report::{top_sections, RankTier, RelevanceTier, ReportSummary, ReportView};
pub use result::{
    export_file_name, ExtractedSection, ProcessingResult, ResultError, ResultMetadata,
    SubSectionAnalysis,
};
pub use schema::{is_valid_result, result_schema, validate_result_schema};
pub use scheduler::{Clock, ManualClock, Scheduler, SystemClock, TimerId, TimerQueue};
pub use synthesis::{StandInSynthesizer, SynthesisError, SynthesisRequest, Synthesizer};
pub use task::{Priority, Task, Timeline};
pub use validation::ValidationError;
pub use workflow::{Stage, StepStatus, Workflow, WorkflowError, WorkflowEvent, WorkflowSnapshot};
