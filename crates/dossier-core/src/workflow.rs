//! The staged intake workflow.
//!
//! ```text
//! Upload ──advance──▶ Persona ──submit_persona──▶ Job ──submit_task──▶ Processing ──▶ Results
//!    ▲                   │                         │                                    │
//!    └────go_back────────┘◀────────go_back─────────┘                                    │
//!    └──────────────────────────────────reset───────────────────────────────────────────┘
//! ```
//!
//! [`Workflow`] is the only thing that changes the stage. It owns the
//! documents, persona, task and result, plus the engine and the engine's
//! timers, so a reset can cancel everything synchronously.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::documents::{DocumentCandidate, DocumentId, DocumentRef, DocumentSet};
use crate::engine::{
    AnalysisInputs, EngineError, EngineEvent, EngineOutcome, EngineTimer, Pacing,
    ProcessingEngine, ProcessingPhase, ProgressSnapshot,
};
use crate::persona::Persona;
use crate::result::ProcessingResult;
use crate::scheduler::{Clock, TimerQueue};
use crate::synthesis::Synthesizer;
use crate::task::Task;
use crate::validation::ValidationError;

/// Errors from workflow transitions.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WorkflowError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Expected stage {expected}, workflow is at {actual}")]
    StageMismatch { expected: Stage, actual: Stage },

    #[error("Cannot go back from stage {0}")]
    CannotGoBack(Stage),

    #[error("Processing has already started")]
    AlreadyStarted,

    #[error("Processing engine error: {0}")]
    Engine(#[from] EngineError),
}

/// Workflow stages, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Upload,
    Persona,
    Job,
    Processing,
    Results,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Upload => "upload",
            Stage::Persona => "persona",
            Stage::Job => "job",
            Stage::Processing => "processing",
            Stage::Results => "results",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Observable changes, in the order they happened.
#[derive(Debug, Clone, PartialEq)]
pub enum WorkflowEvent {
    StageChanged { from: Stage, to: Stage },
    PhaseStarted { index: usize, id: String },
    Progress(ProgressSnapshot),
    PhaseCompleted { index: usize, id: String },
    Completed(Box<ProcessingResult>),
    Failed { phase_id: String, reason: String },
    Reset,
}

/// One entry of the step indicator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepStatus {
    pub stage: Stage,
    pub title: String,
    pub completed: bool,
}

/// Serializable view of a workflow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowSnapshot {
    pub stage: Stage,
    pub documents: DocumentSet,
    pub persona: Option<Persona>,
    pub task: Option<Task>,
    pub result: Option<ProcessingResult>,
    pub progress: Option<ProgressSnapshot>,
    pub outcome: Option<EngineOutcome>,
    pub steps: Vec<StepStatus>,
}

/// Owner of the stage and every artifact collected along the way.
pub struct Workflow {
    stage: Stage,
    documents: DocumentSet,
    persona: Option<Persona>,
    task: Option<Task>,
    result: Option<ProcessingResult>,
    outcome: Option<EngineOutcome>,
    phases: Vec<ProcessingPhase>,
    pacing: Pacing,
    engine: Option<ProcessingEngine>,
    timers: TimerQueue<EngineTimer>,
    synthesizer: Arc<dyn Synthesizer>,
}

impl Workflow {
    /// A fresh workflow at Upload with the default pipeline and pacing.
    pub fn new(synthesizer: Arc<dyn Synthesizer>, clock: Arc<dyn Clock>) -> Self {
        Self {
            stage: Stage::Upload,
            documents: DocumentSet::new(),
            persona: None,
            task: None,
            result: None,
            outcome: None,
            phases: ProcessingPhase::default_pipeline(),
            pacing: Pacing::default(),
            engine: None,
            timers: TimerQueue::new(clock),
            synthesizer,
        }
    }

    /// Replace the pacing used by future runs.
    pub fn with_pacing(self, pacing: Pacing) -> Result<Self, WorkflowError> {
        let phases = self.phases.clone();
        self.with_pipeline(phases, pacing)
    }

    /// Replace the phase pipeline and pacing used by future runs.
    pub fn with_pipeline(
        mut self,
        phases: Vec<ProcessingPhase>,
        pacing: Pacing,
    ) -> Result<Self, WorkflowError> {
        ProcessingEngine::new(phases.clone(), pacing)?;
        self.phases = phases;
        self.pacing = pacing;
        Ok(self)
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn documents(&self) -> &DocumentSet {
        &self.documents
    }

    pub fn persona(&self) -> Option<&Persona> {
        self.persona.as_ref()
    }

    pub fn task(&self) -> Option<&Task> {
        self.task.as_ref()
    }

    pub fn result(&self) -> Option<&ProcessingResult> {
        self.result.as_ref()
    }

    pub fn outcome(&self) -> Option<&EngineOutcome> {
        self.outcome.as_ref()
    }

    pub fn progress(&self) -> Option<ProgressSnapshot> {
        self.engine.as_ref().map(|e| e.progress())
    }

    pub fn phases(&self) -> &[ProcessingPhase] {
        self.engine
            .as_ref()
            .map(|e| e.phases())
            .unwrap_or(&self.phases)
    }

    /// When the next engine timer is due, on the workflow's clock.
    pub fn next_deadline(&self) -> Option<Duration> {
        self.timers.next_deadline()
    }

    /// Replace the document set. Allowed only at Upload.
    pub fn submit_documents(&mut self, documents: DocumentSet) -> Result<(), WorkflowError> {
        self.require(Stage::Upload)?;
        tracing::debug!(documents = documents.len(), "Documents submitted");
        self.documents = documents;
        Ok(())
    }

    /// Admit candidates into the current set. Returns the number admitted.
    pub fn ingest(
        &mut self,
        candidates: impl IntoIterator<Item = DocumentCandidate>,
    ) -> Result<usize, WorkflowError> {
        self.require(Stage::Upload)?;
        Ok(self.documents.admit(candidates))
    }

    pub fn remove_document(
        &mut self,
        id: &DocumentId,
    ) -> Result<Option<DocumentRef>, WorkflowError> {
        self.require(Stage::Upload)?;
        Ok(self.documents.remove(id))
    }

    /// Upload → Persona, once at least three documents are present.
    pub fn advance_from_upload(&mut self) -> Result<(), WorkflowError> {
        self.require(Stage::Upload)?;
        self.documents.check_minimum()?;
        self.transition(Stage::Persona);
        Ok(())
    }

    /// Store a complete persona and move to Job.
    ///
    /// Accepted at Upload too, in which case the document gate applies.
    pub fn submit_persona(&mut self, persona: Persona) -> Result<(), WorkflowError> {
        match self.stage {
            Stage::Persona => {}
            Stage::Upload => self.documents.check_minimum()?,
            actual => {
                return Err(WorkflowError::StageMismatch {
                    expected: Stage::Persona,
                    actual,
                })
            }
        }
        persona.validate()?;
        tracing::debug!(role = %persona.role, "Persona submitted");
        self.persona = Some(persona);
        self.transition(Stage::Job);
        Ok(())
    }

    /// Store a complete task and move to Processing.
    pub fn submit_task(&mut self, task: Task) -> Result<(), WorkflowError> {
        self.require(Stage::Job)?;
        task.validate()?;
        tracing::debug!(priority = %task.priority, timeline = %task.timeline, "Task submitted");
        self.task = Some(task);
        self.transition(Stage::Processing);
        Ok(())
    }

    /// Start the engine on the collected artifacts.
    pub fn start_processing(&mut self) -> Result<(), WorkflowError> {
        self.require(Stage::Processing)?;
        if self.engine.is_some() {
            return Err(WorkflowError::AlreadyStarted);
        }

        let persona = self
            .persona
            .clone()
            .ok_or(ValidationError::MissingField("persona"))?;
        let task = self
            .task
            .clone()
            .ok_or(ValidationError::MissingField("task"))?;
        let inputs = AnalysisInputs {
            documents: self.documents.clone(),
            persona,
            task,
        };

        let mut engine = ProcessingEngine::new(self.phases.clone(), self.pacing)?;
        engine.start(inputs, Arc::clone(&self.synthesizer), &mut self.timers)?;
        self.engine = Some(engine);
        Ok(())
    }

    /// Step back one stage without clearing anything.
    pub fn go_back(&mut self) -> Result<(), WorkflowError> {
        let target = match self.stage {
            Stage::Persona => Stage::Upload,
            Stage::Job => Stage::Persona,
            stage => return Err(WorkflowError::CannotGoBack(stage)),
        };
        self.transition(target);
        Ok(())
    }

    /// Tear down processing, clear all artifacts and return to Upload.
    pub fn reset(&mut self) {
        if let Some(mut engine) = self.engine.take() {
            engine.teardown(&mut self.timers);
        }
        self.timers.clear();

        self.documents = DocumentSet::new();
        self.persona = None;
        self.task = None;
        self.result = None;
        self.outcome = None;
        if self.stage != Stage::Upload {
            self.transition(Stage::Upload);
        }
    }

    /// Deliver every due timer to the engine.
    ///
    /// A timer the engine rejects changed nothing, so it is logged and
    /// skipped. Events from the rest of the batch are still returned.
    pub fn run_due(&mut self) -> Vec<WorkflowEvent> {
        let mut events = Vec::new();

        while let Some((id, timer)) = self.timers.pop_due() {
            let Some(engine) = self.engine.as_mut() else {
                tracing::warn!(timer = %id, "Timer fired without an engine, skipping");
                continue;
            };

            let fired = match engine.fire(id, timer, &mut self.timers) {
                Ok(fired) => fired,
                Err(e) => {
                    tracing::warn!(timer = %id, error = %e, "Engine rejected timer, skipping");
                    continue;
                }
            };

            for event in fired {
                match event {
                    EngineEvent::PhaseStarted { index, id } => {
                        events.push(WorkflowEvent::PhaseStarted { index, id })
                    }
                    EngineEvent::Progress(snapshot) => {
                        events.push(WorkflowEvent::Progress(snapshot))
                    }
                    EngineEvent::PhaseCompleted { index, id } => {
                        events.push(WorkflowEvent::PhaseCompleted { index, id })
                    }
                    EngineEvent::Completed(result) => {
                        events.push(WorkflowEvent::Completed(result.clone()));
                        events.push(self.complete_processing(*result));
                    }
                    EngineEvent::Failed { phase_id, reason } => {
                        self.outcome = Some(EngineOutcome::Failed {
                            phase_id: phase_id.clone(),
                            reason: reason.clone(),
                        });
                        events.push(WorkflowEvent::Failed { phase_id, reason });
                    }
                }
            }
        }

        events
    }

    /// The step indicator.
    pub fn steps(&self) -> Vec<StepStatus> {
        [
            (Stage::Upload, "Upload Documents", !self.documents.is_empty()),
            (Stage::Persona, "Define Persona", self.persona.is_some()),
            (Stage::Job, "Job To Be Done", self.task.is_some()),
            (Stage::Processing, "AI Processing", self.result.is_some()),
        ]
        .into_iter()
        .map(|(stage, title, completed)| StepStatus {
            stage,
            title: title.to_string(),
            completed,
        })
        .collect()
    }

    pub fn snapshot(&self) -> WorkflowSnapshot {
        WorkflowSnapshot {
            stage: self.stage,
            documents: self.documents.clone(),
            persona: self.persona.clone(),
            task: self.task.clone(),
            result: self.result.clone(),
            progress: self.progress(),
            outcome: self.outcome.clone(),
            steps: self.steps(),
        }
    }

    fn complete_processing(&mut self, result: ProcessingResult) -> WorkflowEvent {
        self.result = Some(result);
        self.outcome = Some(EngineOutcome::Completed);
        self.transition(Stage::Results)
    }

    fn require(&self, expected: Stage) -> Result<(), WorkflowError> {
        if self.stage != expected {
            return Err(WorkflowError::StageMismatch {
                expected,
                actual: self.stage,
            });
        }
        Ok(())
    }

    fn transition(&mut self, to: Stage) -> WorkflowEvent {
        let from = self.stage;
        self.stage = to;
        tracing::info!(from = %from, to = %to, "Advanced workflow");
        WorkflowEvent::StageChanged { from, to }
    }
}

impl fmt::Debug for Workflow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Workflow")
            .field("stage", &self.stage)
            .field("documents", &self.documents.len())
            .field("persona", &self.persona.is_some())
            .field("task", &self.task.is_some())
            .field("engine", &self.engine)
            .field("timers", &self.timers.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduler::{ManualClock, Scheduler};
    use crate::synthesis::StandInSynthesizer;
    use crate::task::{Priority, Timeline};
    use proptest::prelude::*;

    fn workflow() -> (ManualClock, Workflow) {
        let clock = ManualClock::new();
        let wf = Workflow::new(
            Arc::new(StandInSynthesizer::seeded(1)),
            Arc::new(clock.clone()),
        );
        (clock, wf)
    }

    fn pdfs(count: usize) -> Vec<DocumentCandidate> {
        (0..count)
            .map(|i| DocumentCandidate::pdf(format!("paper-{}.pdf", i), 2048))
            .collect()
    }

    fn persona() -> Persona {
        Persona::from_parts(
            "PhD Researcher",
            ["Machine Learning"],
            ["Methodology"],
            "5 years",
        )
        .unwrap()
    }

    fn task() -> Task {
        Task::new(
            "Prepare a literature review",
            "Comparative summary",
            Priority::High,
            Timeline::WithinWeek,
        )
    }

    fn to_processing(wf: &mut Workflow, documents: usize) {
        wf.ingest(pdfs(documents)).unwrap();
        wf.advance_from_upload().unwrap();
        wf.submit_persona(persona()).unwrap();
        wf.submit_task(task()).unwrap();
    }

    /// Fast-forward until no timers remain.
    fn drain(clock: &ManualClock, wf: &mut Workflow) -> Vec<WorkflowEvent> {
        let mut events = Vec::new();
        while let Some(deadline) = wf.next_deadline() {
            clock.set(deadline.max(clock.now()));
            events.extend(wf.run_due());
        }
        events
    }

    #[test]
    fn test_stages_are_ordered() {
        assert!(Stage::Upload < Stage::Persona);
        assert!(Stage::Job < Stage::Processing);
        assert!(Stage::Processing < Stage::Results);
        assert_eq!(serde_json::to_string(&Stage::Job).unwrap(), "\"job\"");
    }

    #[test]
    fn test_two_documents_block_upload() {
        let (_, mut wf) = workflow();
        wf.ingest(pdfs(2)).unwrap();
        let err = wf.advance_from_upload().unwrap_err();
        assert_eq!(
            err,
            WorkflowError::Validation(ValidationError::TooFewDocuments {
                required: 3,
                actual: 2
            })
        );
        assert_eq!(wf.stage(), Stage::Upload);
    }

    #[test]
    fn test_non_pdf_candidates_do_not_count() {
        let (_, mut wf) = workflow();
        let mut candidates = pdfs(2);
        candidates.push(DocumentCandidate::new("notes.txt", 10, "text/plain"));
        assert_eq!(wf.ingest(candidates).unwrap(), 2);
        assert!(wf.advance_from_upload().is_err());
    }

    #[test]
    fn test_submitted_non_pdf_refs_do_not_count() {
        let (_, mut wf) = workflow();
        let refs = (0..3)
            .map(|i| {
                DocumentRef::new(
                    format!("doc-{}", i),
                    format!("notes-{}.txt", i),
                    10,
                    "text/plain",
                )
            })
            .collect();
        wf.submit_documents(DocumentSet::from_refs(refs).unwrap()).unwrap();

        assert!(wf.documents().is_empty());
        assert!(matches!(
            wf.advance_from_upload(),
            Err(WorkflowError::Validation(ValidationError::TooFewDocuments { actual: 0, .. }))
        ));
        assert_eq!(wf.stage(), Stage::Upload);
    }

    #[test]
    fn test_submit_persona_from_upload_applies_gate() {
        let (_, mut wf) = workflow();
        wf.ingest(pdfs(1)).unwrap();
        assert!(matches!(
            wf.submit_persona(persona()),
            Err(WorkflowError::Validation(ValidationError::TooFewDocuments { .. }))
        ));
        assert!(wf.persona().is_none());

        wf.ingest(pdfs(2)).unwrap();
        wf.submit_persona(persona()).unwrap();
        assert_eq!(wf.stage(), Stage::Job);
    }

    #[test]
    fn test_incomplete_persona_rejected() {
        let (_, mut wf) = workflow();
        wf.ingest(pdfs(3)).unwrap();
        wf.advance_from_upload().unwrap();

        let missing_focus =
            Persona::from_parts("Analyst", ["Finance"], Vec::<&str>::new(), "5y").unwrap();
        assert_eq!(
            wf.submit_persona(missing_focus).unwrap_err(),
            WorkflowError::Validation(ValidationError::EmptyTagSet("focusAreas"))
        );
        let blank_role = Persona::from_parts("  ", ["Finance"], ["Risk"], "5y").unwrap();
        assert_eq!(
            wf.submit_persona(blank_role).unwrap_err(),
            WorkflowError::Validation(ValidationError::MissingField("role"))
        );
        assert_eq!(wf.stage(), Stage::Persona);
        assert!(wf.persona().is_none());
    }

    #[test]
    fn test_documents_locked_after_upload() {
        let (_, mut wf) = workflow();
        wf.ingest(pdfs(3)).unwrap();
        wf.advance_from_upload().unwrap();

        assert_eq!(
            wf.submit_documents(DocumentSet::new()).unwrap_err(),
            WorkflowError::StageMismatch {
                expected: Stage::Upload,
                actual: Stage::Persona
            }
        );
        assert!(wf.ingest(pdfs(1)).is_err());
        assert_eq!(wf.documents().len(), 3);
    }

    #[test]
    fn test_remove_document_at_upload() {
        let (_, mut wf) = workflow();
        wf.ingest(pdfs(3)).unwrap();
        let id = wf.documents().as_slice()[1].id().clone();

        let removed = wf.remove_document(&id).unwrap().unwrap();
        assert_eq!(removed.name(), "paper-1.pdf");
        assert_eq!(wf.documents().len(), 2);
        assert!(wf.remove_document(&id).unwrap().is_none());
    }

    #[test]
    fn test_go_back_keeps_data() {
        let (_, mut wf) = workflow();
        wf.ingest(pdfs(3)).unwrap();
        wf.advance_from_upload().unwrap();
        wf.submit_persona(persona()).unwrap();

        wf.go_back().unwrap();
        assert_eq!(wf.stage(), Stage::Persona);
        assert_eq!(wf.persona(), Some(&persona()));

        wf.go_back().unwrap();
        assert_eq!(wf.stage(), Stage::Upload);
        assert_eq!(wf.documents().len(), 3);
        assert_eq!(wf.go_back().unwrap_err(), WorkflowError::CannotGoBack(Stage::Upload));
    }

    #[test]
    fn test_go_back_refused_during_processing() {
        let (_, mut wf) = workflow();
        to_processing(&mut wf, 3);
        assert_eq!(
            wf.go_back().unwrap_err(),
            WorkflowError::CannotGoBack(Stage::Processing)
        );
    }

    #[test]
    fn test_start_processing_twice_rejected() {
        let (_, mut wf) = workflow();
        to_processing(&mut wf, 3);
        wf.start_processing().unwrap();
        assert_eq!(wf.start_processing().unwrap_err(), WorkflowError::AlreadyStarted);
    }

    #[test]
    fn test_full_run_reaches_results() {
        let (clock, mut wf) = workflow();
        to_processing(&mut wf, 4);
        wf.start_processing().unwrap();
        let events = drain(&clock, &mut wf);

        assert_eq!(wf.stage(), Stage::Results);
        assert_eq!(wf.outcome(), Some(&EngineOutcome::Completed));
        assert!(matches!(
            events.last(),
            Some(WorkflowEvent::StageChanged {
                from: Stage::Processing,
                to: Stage::Results
            })
        ));

        let result = wf.result().unwrap();
        assert_eq!(result.extracted_sections.len(), 8);
        assert_eq!(result.sub_section_analysis.len(), 6);
        assert_eq!(result.metadata.input_documents.len(), 4);
        assert_eq!(result.metadata.persona, persona());
        assert!(wf.steps().iter().all(|s| s.completed));
        assert_eq!(wf.progress().unwrap().overall, 100.0);
    }

    #[test]
    fn test_reset_from_results_is_idempotent() {
        let (clock, mut wf) = workflow();
        to_processing(&mut wf, 3);
        wf.start_processing().unwrap();
        drain(&clock, &mut wf);
        assert_eq!(wf.stage(), Stage::Results);

        wf.reset();
        let once = wf.snapshot();
        wf.reset();
        assert_eq!(wf.snapshot(), once);

        assert_eq!(once.stage, Stage::Upload);
        assert!(once.documents.is_empty());
        assert!(once.persona.is_none() && once.task.is_none() && once.result.is_none());
        assert!(once.progress.is_none());
        assert!(once.steps.iter().all(|s| !s.completed));
    }

    #[test]
    fn test_reset_mid_processing_cancels_timers() {
        let (clock, mut wf) = workflow();
        to_processing(&mut wf, 3);
        wf.start_processing().unwrap();

        clock.advance(Duration::from_millis(800));
        assert!(!wf.run_due().is_empty());

        wf.reset();
        assert!(wf.next_deadline().is_none());
        clock.advance(Duration::from_secs(600));
        assert!(wf.run_due().is_empty());
        assert_eq!(wf.stage(), Stage::Upload);
        assert!(wf.result().is_none());
    }

    #[test]
    fn test_rejected_timer_keeps_batch_events() {
        let (clock, mut wf) = workflow();
        to_processing(&mut wf, 3);
        wf.start_processing().unwrap();

        let first = wf.next_deadline().unwrap();
        clock.set(first);
        wf.timers.schedule(Duration::ZERO, EngineTimer::Settle);

        let events = wf.run_due();
        assert!(matches!(
            events.first(),
            Some(WorkflowEvent::PhaseStarted { index: 0, .. })
        ));
        assert!(wf.next_deadline().is_some_and(|d| d > first));

        drain(&clock, &mut wf);
        assert_eq!(wf.stage(), Stage::Results);
    }

    #[test]
    fn test_reset_then_new_run() {
        let (clock, mut wf) = workflow();
        to_processing(&mut wf, 3);
        wf.start_processing().unwrap();
        clock.advance(Duration::from_secs(1));
        wf.run_due();
        wf.reset();

        to_processing(&mut wf, 5);
        wf.start_processing().unwrap();
        drain(&clock, &mut wf);
        assert_eq!(wf.result().unwrap().metadata.input_documents.len(), 5);
    }

    #[test]
    fn test_snapshot_serializes() {
        let (_, mut wf) = workflow();
        to_processing(&mut wf, 3);
        let json = serde_json::to_value(wf.snapshot()).unwrap();
        assert_eq!(json["stage"], "processing");
        assert_eq!(json["steps"][2]["title"], "Job To Be Done");
        assert_eq!(json["steps"][2]["completed"], true);
        assert_eq!(json["steps"][3]["completed"], false);
    }

    #[test]
    fn test_with_pacing_rejects_bad_step() {
        let (_, wf) = workflow();
        let pacing = Pacing {
            tick_step: 0,
            ..Pacing::default()
        };
        assert!(matches!(
            wf.with_pacing(pacing),
            Err(WorkflowError::Engine(EngineError::InvalidTickStep(0)))
        ));
    }

    proptest! {
        #[test]
        fn prop_document_gate(count in 0usize..8) {
            let (_, mut wf) = workflow();
            wf.ingest(pdfs(count)).unwrap();
            let advanced = wf.advance_from_upload().is_ok();
            prop_assert_eq!(advanced, count >= 3);
            prop_assert_eq!(wf.stage() == Stage::Persona, count >= 3);
        }
    }
}
