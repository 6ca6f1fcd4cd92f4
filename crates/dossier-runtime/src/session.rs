//! Analysis session: one [`Workflow`] owned by a tokio task.
//!
//! Every mutation goes through the actor's command channel, so the workflow
//! has a single thread of control. The actor sleeps until the workflow's next
//! timer deadline or the next command, whichever comes first. Commands win
//! ties, so a reset always lands before a timer due at the same instant.

use std::sync::Arc;

use thiserror::Error;
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::time::Instant;

use dossier_core::{
    DocumentCandidate, DocumentId, DocumentRef, DocumentSet, EngineOutcome, Persona,
    ProcessingResult, Stage, Synthesizer, Task, Workflow, WorkflowError, WorkflowEvent,
    WorkflowSnapshot,
};

use crate::clock::TokioClock;
use crate::config::RuntimeConfig;

/// Errors from a session handle.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error("Session is closed")]
    Closed,

    #[error(transparent)]
    Workflow(#[from] WorkflowError),

    #[error("Processing failed at phase {phase_id}: {reason}")]
    Failed { phase_id: String, reason: String },

    #[error("Processing was reset before a result was produced")]
    Cancelled,
}

type Reply<T> = oneshot::Sender<Result<T, WorkflowError>>;

enum Command {
    SubmitDocuments { documents: DocumentSet, respond: Reply<()> },
    Ingest { candidates: Vec<DocumentCandidate>, respond: Reply<usize> },
    RemoveDocument { id: DocumentId, respond: Reply<Option<DocumentRef>> },
    AdvanceFromUpload { respond: Reply<()> },
    SubmitPersona { persona: Persona, respond: Reply<()> },
    SubmitTask { task: Task, respond: Reply<()> },
    GoBack { respond: Reply<()> },
    Reset { respond: oneshot::Sender<()> },
    Snapshot { respond: oneshot::Sender<WorkflowSnapshot> },
    Subscribe { respond: oneshot::Sender<broadcast::Receiver<WorkflowEvent>> },
    Shutdown { respond: oneshot::Sender<()> },
}

/// Entry point for starting sessions.
pub struct AnalysisSession;

impl AnalysisSession {
    /// Spawn a session actor on the current tokio runtime.
    pub fn spawn(
        config: &RuntimeConfig,
        synthesizer: Arc<dyn Synthesizer>,
    ) -> Result<SessionHandle, SessionError> {
        let clock = TokioClock::new();
        let workflow = Workflow::new(synthesizer, Arc::new(clock)).with_pacing(config.pacing())?;

        let (commands_tx, commands_rx) = mpsc::channel(32);
        let (events, _) = broadcast::channel(config.event_buffer.max(1));

        let actor = SessionActor {
            workflow,
            clock,
            commands: commands_rx,
            events,
        };
        tokio::spawn(actor.run());

        tracing::info!(event_buffer = config.event_buffer, "Analysis session started");
        Ok(SessionHandle {
            commands: commands_tx,
        })
    }
}

/// Cloneable handle to a running session.
///
/// The session shuts down once every handle is dropped.
#[derive(Clone)]
pub struct SessionHandle {
    commands: mpsc::Sender<Command>,
}

impl SessionHandle {
    pub async fn submit_documents(&self, documents: DocumentSet) -> Result<(), SessionError> {
        Ok(self
            .request(|respond| Command::SubmitDocuments { documents, respond })
            .await??)
    }

    pub async fn ingest(&self, candidates: Vec<DocumentCandidate>) -> Result<usize, SessionError> {
        Ok(self
            .request(|respond| Command::Ingest { candidates, respond })
            .await??)
    }

    pub async fn remove_document(
        &self,
        id: DocumentId,
    ) -> Result<Option<DocumentRef>, SessionError> {
        Ok(self
            .request(|respond| Command::RemoveDocument { id, respond })
            .await??)
    }

    pub async fn advance_from_upload(&self) -> Result<(), SessionError> {
        Ok(self
            .request(|respond| Command::AdvanceFromUpload { respond })
            .await??)
    }

    pub async fn submit_persona(&self, persona: Persona) -> Result<(), SessionError> {
        Ok(self
            .request(|respond| Command::SubmitPersona { persona, respond })
            .await??)
    }

    /// Submit the task and start processing.
    pub async fn submit_task(&self, task: Task) -> Result<(), SessionError> {
        Ok(self
            .request(|respond| Command::SubmitTask { task, respond })
            .await??)
    }

    pub async fn go_back(&self) -> Result<(), SessionError> {
        Ok(self.request(|respond| Command::GoBack { respond }).await??)
    }

    /// Cancel processing and clear everything. Completes after teardown.
    pub async fn reset(&self) -> Result<(), SessionError> {
        self.request(|respond| Command::Reset { respond }).await
    }

    pub async fn snapshot(&self) -> Result<WorkflowSnapshot, SessionError> {
        self.request(|respond| Command::Snapshot { respond }).await
    }

    /// Receive every event emitted from now on.
    pub async fn subscribe(&self) -> Result<broadcast::Receiver<WorkflowEvent>, SessionError> {
        self.request(|respond| Command::Subscribe { respond }).await
    }

    /// Wait for the current analysis to produce a result.
    pub async fn wait_for_result(&self) -> Result<ProcessingResult, SessionError> {
        let mut events = self.subscribe().await?;

        loop {
            let snapshot = self.snapshot().await?;
            if let Some(result) = snapshot.result {
                return Ok(result);
            }
            if let Some(EngineOutcome::Failed { phase_id, reason }) = snapshot.outcome {
                return Err(SessionError::Failed { phase_id, reason });
            }

            loop {
                match events.recv().await {
                    Ok(WorkflowEvent::Completed(result)) => return Ok(*result),
                    Ok(WorkflowEvent::Failed { phase_id, reason }) => {
                        return Err(SessionError::Failed { phase_id, reason })
                    }
                    Ok(WorkflowEvent::Reset) => return Err(SessionError::Cancelled),
                    Ok(_) => {}
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::debug!(skipped, "Result waiter lagged, re-reading snapshot");
                        break;
                    }
                    Err(broadcast::error::RecvError::Closed) => return Err(SessionError::Closed),
                }
            }
        }
    }

    /// Stop the session, tearing down any processing.
    pub async fn shutdown(&self) -> Result<(), SessionError> {
        self.request(|respond| Command::Shutdown { respond }).await
    }

    async fn request<R>(
        &self,
        make: impl FnOnce(oneshot::Sender<R>) -> Command,
    ) -> Result<R, SessionError> {
        let (tx, rx) = oneshot::channel();
        self.commands
            .send(make(tx))
            .await
            .map_err(|_| SessionError::Closed)?;
        rx.await.map_err(|_| SessionError::Closed)
    }
}

impl std::fmt::Debug for SessionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionHandle")
            .field("closed", &self.commands.is_closed())
            .finish()
    }
}

struct SessionActor {
    workflow: Workflow,
    clock: TokioClock,
    commands: mpsc::Receiver<Command>,
    events: broadcast::Sender<WorkflowEvent>,
}

impl SessionActor {
    async fn run(mut self) {
        let mut shutdown_ack = None;

        loop {
            let deadline = self
                .workflow
                .next_deadline()
                .map(|d| self.clock.instant_at(d));

            tokio::select! {
                biased;

                command = self.commands.recv() => match command {
                    Some(Command::Shutdown { respond }) => {
                        shutdown_ack = Some(respond);
                        break;
                    }
                    Some(command) => self.handle(command),
                    None => break,
                },
                _ = sleep_until(deadline) => self.fire_due(),
            }
        }

        self.workflow.reset();
        tracing::info!("Analysis session closed");
        if let Some(respond) = shutdown_ack {
            let _ = respond.send(());
        }
    }

    fn handle(&mut self, command: Command) {
        let before = self.workflow.stage();

        match command {
            Command::SubmitDocuments { documents, respond } => {
                let _ = respond.send(self.workflow.submit_documents(documents));
            }
            Command::Ingest { candidates, respond } => {
                let _ = respond.send(self.workflow.ingest(candidates));
            }
            Command::RemoveDocument { id, respond } => {
                let _ = respond.send(self.workflow.remove_document(&id));
            }
            Command::AdvanceFromUpload { respond } => {
                let _ = respond.send(self.workflow.advance_from_upload());
            }
            Command::SubmitPersona { persona, respond } => {
                let _ = respond.send(self.workflow.submit_persona(persona));
            }
            Command::SubmitTask { task, respond } => {
                let outcome = self
                    .workflow
                    .submit_task(task)
                    .and_then(|()| self.workflow.start_processing());
                let _ = respond.send(outcome);
            }
            Command::GoBack { respond } => {
                let _ = respond.send(self.workflow.go_back());
            }
            Command::Reset { respond } => {
                self.workflow.reset();
                self.emit_stage_change(before);
                self.emit(WorkflowEvent::Reset);
                let _ = respond.send(());
                return;
            }
            Command::Snapshot { respond } => {
                let _ = respond.send(self.workflow.snapshot());
            }
            Command::Subscribe { respond } => {
                let _ = respond.send(self.events.subscribe());
            }
            Command::Shutdown { respond } => {
                let _ = respond.send(());
            }
        }

        self.emit_stage_change(before);
    }

    fn fire_due(&mut self) {
        for event in self.workflow.run_due() {
            if let WorkflowEvent::Progress(progress) = &event {
                tracing::debug!(
                    overall = progress.overall,
                    phase = ?progress.current_phase,
                    "Processing progress"
                );
            }
            self.emit(event);
        }
    }

    fn emit_stage_change(&self, before: Stage) {
        let after = self.workflow.stage();
        if after != before {
            self.emit(WorkflowEvent::StageChanged {
                from: before,
                to: after,
            });
        }
    }

    fn emit(&self, event: WorkflowEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }
}

async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending::<()>().await,
    }
}
