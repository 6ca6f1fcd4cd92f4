//! Processing engine: a fixed, ordered pipeline of paced phases.
//!
//! ## Progress model
//!
//! Each phase owns an internal counter that runs 0 → 100 in steps of
//! `tick_step`. Overall progress is
//!
//! ```text
//! (completed_phases × 100 + internal) / phase_count
//! ```
//!
//! so every phase contributes exactly `100 / phase_count` percentage points.
//! A phase's weight only sets how long its counter takes to traverse 0 → 100
//! (`weight × unit` of wall-clock time). Heavier phases move the bar more
//! slowly; they never move it further.
//!
//! ## Timers
//!
//! The engine keeps at most one outstanding timer. Any other timer delivered
//! to [`ProcessingEngine::fire`] (including everything after teardown) is a
//! [`EngineError::TeardownRace`] and changes nothing.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::documents::DocumentSet;
use crate::persona::Persona;
use crate::result::ProcessingResult;
use crate::scheduler::{Scheduler, TimerId};
use crate::synthesis::{SynthesisRequest, Synthesizer};
use crate::task::Task;

/// Errors from the processing engine.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    #[error("Processing pipeline has no phases")]
    EmptyPipeline,

    #[error("Phase {0} must have a positive weight")]
    ZeroWeight(String),

    #[error("Duplicate phase id: {0}")]
    DuplicatePhase(String),

    #[error("Tick step {0} must be between 1 and 100 and divide 100")]
    InvalidTickStep(u32),

    #[error("Processing has already started")]
    AlreadyStarted,

    #[error("Processing is not running")]
    NotRunning,

    #[error("Unknown phase: {0}")]
    UnknownPhase(String),

    #[error("{timer} fired outside the engine's lifetime")]
    TeardownRace { timer: TimerId },
}

/// One step of the simulated pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessingPhase {
    pub id: String,
    pub title: String,
    pub description: String,
    /// Relative duration units. Controls pacing, not progress share.
    pub weight: u32,
    #[serde(default)]
    pub completed: bool,
}

impl ProcessingPhase {
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        description: impl Into<String>,
        weight: u32,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            description: description.into(),
            weight,
            completed: false,
        }
    }

    /// parse → analyze → match → rank → extract.
    pub fn default_pipeline() -> Vec<ProcessingPhase> {
        vec![
            Self::new(
                "parse",
                "Document Parsing",
                "Extracting text and structure from PDF documents",
                15,
            ),
            Self::new(
                "analyze",
                "Content Analysis",
                "Analyzing document content and identifying key sections",
                20,
            ),
            Self::new(
                "match",
                "Persona Matching",
                "Matching content relevance to persona expertise",
                15,
            ),
            Self::new(
                "rank",
                "Importance Ranking",
                "Ranking sections by relevance to job-to-be-done",
                10,
            ),
            Self::new(
                "extract",
                "Content Extraction",
                "Extracting and refining most relevant sections",
                10,
            ),
        ]
    }
}

/// Timing knobs for the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pacing {
    /// Internal-progress increment per tick, in percentage points.
    pub tick_step: u32,
    /// Wall-clock time per weight unit for a full phase.
    pub unit: Duration,
    /// Pause before each phase, and before synthesis.
    pub phase_delay: Duration,
    /// Pause between synthesis and completion.
    pub settle_delay: Duration,
}

impl Default for Pacing {
    fn default() -> Self {
        Self {
            tick_step: 2,
            unit: Duration::from_millis(10),
            phase_delay: Duration::from_millis(500),
            settle_delay: Duration::from_secs(1),
        }
    }
}

impl Pacing {
    /// No delays at all; ticks still happen, in order.
    pub fn immediate() -> Self {
        Self {
            tick_step: 2,
            unit: Duration::ZERO,
            phase_delay: Duration::ZERO,
            settle_delay: Duration::ZERO,
        }
    }

    /// Wall-clock time for a phase's counter to go 0 → 100.
    pub fn phase_duration(&self, weight: u32) -> Duration {
        self.unit.saturating_mul(weight)
    }

    /// Time between ticks of a phase.
    pub fn tick_interval(&self, weight: u32) -> Duration {
        self.phase_duration(weight).saturating_mul(self.tick_step) / 100
    }

    fn validate(&self) -> Result<(), EngineError> {
        if self.tick_step == 0 || self.tick_step > 100 || 100 % self.tick_step != 0 {
            return Err(EngineError::InvalidTickStep(self.tick_step));
        }
        Ok(())
    }
}

/// The three upstream artifacts, owned by the engine for the run.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisInputs {
    pub documents: DocumentSet,
    pub persona: Persona,
    pub task: Task,
}

/// Timers the engine schedules for itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineTimer {
    /// Begin phase `i`; `i == phase_count` means synthesize.
    PhaseStart(usize),
    /// Advance phase `i` by one tick.
    Tick(usize),
    /// Deliver the synthesized result.
    Settle,
}

/// Point-in-time view of progress.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressSnapshot {
    /// 0.0 ..= 100.0
    pub overall: f64,
    pub completed_phases: usize,
    pub total_phases: usize,
    /// Phase currently running or about to run, if any.
    pub current_phase: Option<String>,
    /// Internal counter of the current phase.
    pub phase_progress: u32,
    pub elapsed_ms: u64,
}

/// Where the engine is in its lifecycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum EngineStatus {
    Idle,
    /// Waiting out the delay before phase `phase` (or synthesis).
    Waiting { phase: usize },
    Running { phase: usize, internal: u32 },
    /// Result synthesized, waiting out the settle delay.
    Settling,
    Completed,
    Failed { phase_id: String, reason: String },
    Cancelled,
}

impl EngineStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            EngineStatus::Completed | EngineStatus::Failed { .. } | EngineStatus::Cancelled
        )
    }
}

/// How a processing run ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum EngineOutcome {
    Completed,
    Failed { phase_id: String, reason: String },
}

/// What happened as a result of a timer.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    PhaseStarted { index: usize, id: String },
    Progress(ProgressSnapshot),
    PhaseCompleted { index: usize, id: String },
    Completed(Box<ProcessingResult>),
    Failed { phase_id: String, reason: String },
}

/// Runs the phase pipeline for one analysis.
pub struct ProcessingEngine {
    phases: Vec<ProcessingPhase>,
    pacing: Pacing,
    status: EngineStatus,
    inputs: Option<AnalysisInputs>,
    synthesizer: Option<Arc<dyn Synthesizer>>,
    started_at: Option<Duration>,
    pending: Option<TimerId>,
    overall: f64,
    elapsed: Duration,
    result: Option<ProcessingResult>,
}

impl ProcessingEngine {
    /// Build an engine, rejecting pipelines that could never reach 100%.
    pub fn new(phases: Vec<ProcessingPhase>, pacing: Pacing) -> Result<Self, EngineError> {
        if phases.is_empty() {
            return Err(EngineError::EmptyPipeline);
        }
        for (i, phase) in phases.iter().enumerate() {
            if phase.weight == 0 {
                return Err(EngineError::ZeroWeight(phase.id.clone()));
            }
            if phases[..i].iter().any(|p| p.id == phase.id) {
                return Err(EngineError::DuplicatePhase(phase.id.clone()));
            }
        }
        pacing.validate()?;
        Ok(Self::from_checked(phases, pacing))
    }

    /// The five-phase pipeline with default pacing.
    pub fn standard() -> Self {
        Self::from_checked(ProcessingPhase::default_pipeline(), Pacing::default())
    }

    fn from_checked(phases: Vec<ProcessingPhase>, pacing: Pacing) -> Self {
        let phases = phases
            .into_iter()
            .map(|p| ProcessingPhase {
                completed: false,
                ..p
            })
            .collect();

        Self {
            phases,
            pacing,
            status: EngineStatus::Idle,
            inputs: None,
            synthesizer: None,
            started_at: None,
            pending: None,
            overall: 0.0,
            elapsed: Duration::ZERO,
            result: None,
        }
    }

    pub fn phases(&self) -> &[ProcessingPhase] {
        &self.phases
    }

    pub fn pacing(&self) -> Pacing {
        self.pacing
    }

    pub fn status(&self) -> &EngineStatus {
        &self.status
    }

    pub fn inputs(&self) -> Option<&AnalysisInputs> {
        self.inputs.as_ref()
    }

    /// Whether a timer is outstanding.
    pub fn has_pending_timer(&self) -> bool {
        self.pending.is_some()
    }

    pub fn progress(&self) -> ProgressSnapshot {
        let (current_phase, phase_progress) = match &self.status {
            EngineStatus::Running { phase, internal } => (Some(*phase), *internal),
            EngineStatus::Waiting { phase } if *phase < self.phases.len() => (Some(*phase), 0),
            _ => (None, 0),
        };

        ProgressSnapshot {
            overall: self.overall,
            completed_phases: self.phases.iter().filter(|p| p.completed).count(),
            total_phases: self.phases.len(),
            current_phase: current_phase.map(|i| self.phases[i].id.clone()),
            phase_progress,
            elapsed_ms: u64::try_from(self.elapsed.as_millis()).unwrap_or(u64::MAX),
        }
    }

    /// Begin processing. Phase 0 starts after `phase_delay`.
    pub fn start(
        &mut self,
        inputs: AnalysisInputs,
        synthesizer: Arc<dyn Synthesizer>,
        scheduler: &mut dyn Scheduler<EngineTimer>,
    ) -> Result<(), EngineError> {
        if self.status != EngineStatus::Idle {
            return Err(EngineError::AlreadyStarted);
        }

        tracing::info!(
            phases = self.phases.len(),
            documents = inputs.documents.len(),
            synthesizer = synthesizer.name(),
            "Processing started"
        );

        self.started_at = Some(scheduler.now());
        self.inputs = Some(inputs);
        self.synthesizer = Some(synthesizer);
        self.status = EngineStatus::Waiting { phase: 0 };
        self.pending = Some(
            scheduler.schedule(self.pacing.phase_delay, EngineTimer::PhaseStart(0)),
        );
        Ok(())
    }

    /// Handle a timer previously scheduled by this engine.
    pub fn fire(
        &mut self,
        id: TimerId,
        timer: EngineTimer,
        scheduler: &mut dyn Scheduler<EngineTimer>,
    ) -> Result<Vec<EngineEvent>, EngineError> {
        if self.pending != Some(id) || !self.expects(timer) {
            tracing::error!(
                timer = %id,
                kind = ?timer,
                status = ?self.status,
                "Timer fired outside engine lifetime"
            );
            return Err(EngineError::TeardownRace { timer: id });
        }
        self.pending = None;
        self.elapsed = self.elapsed_at(scheduler.now());

        let events = match timer {
            EngineTimer::PhaseStart(index) if index < self.phases.len() => {
                self.begin_phase(index, scheduler)
            }
            EngineTimer::PhaseStart(_) => self.synthesize(scheduler),
            EngineTimer::Tick(index) => self.tick(index, scheduler),
            EngineTimer::Settle => self.settle(),
        };
        Ok(events)
    }

    /// Fail the run at `phase_id`. Cancels the outstanding timer.
    pub fn fail(
        &mut self,
        phase_id: &str,
        reason: impl Into<String>,
        scheduler: &mut dyn Scheduler<EngineTimer>,
    ) -> Result<EngineEvent, EngineError> {
        if self.status == EngineStatus::Idle || self.status.is_terminal() {
            return Err(EngineError::NotRunning);
        }
        let index = self
            .phases
            .iter()
            .position(|p| p.id == phase_id)
            .ok_or_else(|| EngineError::UnknownPhase(phase_id.to_string()))?;

        if let Some(id) = self.pending.take() {
            scheduler.cancel(id);
        }
        Ok(self.fail_at(index, reason.into()))
    }

    /// Stop processing and cancel the outstanding timer. Idempotent.
    ///
    /// Returns true if this call cancelled a run in progress.
    pub fn teardown(&mut self, scheduler: &mut dyn Scheduler<EngineTimer>) -> bool {
        if let Some(id) = self.pending.take() {
            scheduler.cancel(id);
        }
        self.result = None;

        if self.status.is_terminal() || self.status == EngineStatus::Idle {
            return false;
        }
        tracing::info!(status = ?self.status, "Processing torn down");
        self.status = EngineStatus::Cancelled;
        true
    }

    fn expects(&self, timer: EngineTimer) -> bool {
        match (timer, &self.status) {
            (EngineTimer::PhaseStart(i), EngineStatus::Waiting { phase }) => i == *phase,
            (EngineTimer::Tick(i), EngineStatus::Running { phase, .. }) => i == *phase,
            (EngineTimer::Settle, EngineStatus::Settling) => true,
            _ => false,
        }
    }

    fn elapsed_at(&self, now: Duration) -> Duration {
        self.started_at
            .map(|start| now.saturating_sub(start))
            .unwrap_or_default()
    }

    fn request<'a>(
        &self,
        inputs: &'a AnalysisInputs,
        scheduler: &dyn Scheduler<EngineTimer>,
    ) -> SynthesisRequest<'a> {
        SynthesisRequest {
            documents: &inputs.documents,
            persona: &inputs.persona,
            task: &inputs.task,
            elapsed: self.elapsed,
            timestamp: scheduler.timestamp(),
        }
    }

    fn begin_phase(
        &mut self,
        index: usize,
        scheduler: &mut dyn Scheduler<EngineTimer>,
    ) -> Vec<EngineEvent> {
        let Some((inputs, synthesizer)) = self.inputs.as_ref().zip(self.synthesizer.as_ref()) else {
            return vec![self.fail_at(index, "processing inputs missing".to_string())];
        };
        let request = self.request(inputs, scheduler);
        if let Err(e) = synthesizer.prepare_phase(&self.phases[index], &request) {
            return vec![self.fail_at(index, e.to_string())];
        }

        let phase = &self.phases[index];
        tracing::debug!(phase = %phase.id, weight = phase.weight, "Phase started");
        let event = EngineEvent::PhaseStarted {
            index,
            id: phase.id.clone(),
        };
        let interval = self.pacing.tick_interval(phase.weight);

        self.status = EngineStatus::Running {
            phase: index,
            internal: 0,
        };
        self.pending = Some(scheduler.schedule(interval, EngineTimer::Tick(index)));
        vec![event]
    }

    fn tick(
        &mut self,
        index: usize,
        scheduler: &mut dyn Scheduler<EngineTimer>,
    ) -> Vec<EngineEvent> {
        let internal = match self.status {
            EngineStatus::Running { internal, .. } => (internal + self.pacing.tick_step).min(100),
            _ => return Vec::new(),
        };

        let total = self.phases.len();
        let overall = (index * 100 + internal as usize) as f64 / total as f64;
        // Never move backwards, even with a misbehaving step.
        self.overall = self.overall.max(overall.min(100.0));
        self.status = EngineStatus::Running {
            phase: index,
            internal,
        };

        let mut events = vec![EngineEvent::Progress(self.progress())];

        if internal >= 100 {
            self.phases[index].completed = true;
            let id = self.phases[index].id.clone();
            tracing::info!(phase = %id, overall = self.overall, "Phase completed");
            events.push(EngineEvent::PhaseCompleted { index, id });

            self.status = EngineStatus::Waiting { phase: index + 1 };
            self.pending = Some(
                scheduler.schedule(self.pacing.phase_delay, EngineTimer::PhaseStart(index + 1)),
            );
        } else {
            let interval = self.pacing.tick_interval(self.phases[index].weight);
            self.pending = Some(scheduler.schedule(interval, EngineTimer::Tick(index)));
        }

        events
    }

    fn synthesize(&mut self, scheduler: &mut dyn Scheduler<EngineTimer>) -> Vec<EngineEvent> {
        let last = self.phases.len() - 1;
        let Some((inputs, synthesizer)) = self.inputs.as_ref().zip(self.synthesizer.as_ref()) else {
            return vec![self.fail_at(last, "processing inputs missing".to_string())];
        };
        let request = self.request(inputs, scheduler);

        let result = match synthesizer.synthesize(&request) {
            Ok(result) => result,
            Err(e) => return vec![self.fail_at(last, e.to_string())],
        };
        if let Err(e) = result.validate() {
            return vec![self.fail_at(last, format!("synthesized result rejected: {}", e))];
        }

        tracing::info!(
            elapsed_secs = result.metadata.processing_time_seconds,
            sections = result.extracted_sections.len(),
            "Result synthesized"
        );
        self.result = Some(result);
        self.status = EngineStatus::Settling;
        self.pending = Some(scheduler.schedule(self.pacing.settle_delay, EngineTimer::Settle));
        Vec::new()
    }

    fn settle(&mut self) -> Vec<EngineEvent> {
        match self.result.take() {
            Some(result) => {
                self.status = EngineStatus::Completed;
                tracing::info!("Processing completed");
                vec![EngineEvent::Completed(Box::new(result))]
            }
            None => {
                let last = self.phases.len() - 1;
                vec![self.fail_at(last, "result missing at completion".to_string())]
            }
        }
    }

    fn fail_at(&mut self, index: usize, reason: String) -> EngineEvent {
        let phase_id = self.phases[index].id.clone();
        tracing::warn!(phase = %phase_id, reason = %reason, "Processing failed");
        self.status = EngineStatus::Failed {
            phase_id: phase_id.clone(),
            reason: reason.clone(),
        };
        self.result = None;
        EngineEvent::Failed { phase_id, reason }
    }
}

impl std::fmt::Debug for ProcessingEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProcessingEngine")
            .field("phases", &self.phases.len())
            .field("status", &self.status)
            .field("overall", &self.overall)
            .field("pending", &self.pending)
            .finish()
    }
}
