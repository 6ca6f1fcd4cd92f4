//! # dossier-runtime
//!
//! Tokio runtime for the Dossier analysis workflow.
//!
//! `dossier-core` never sleeps: its engine schedules timers on a queue and
//! waits to be driven. This crate drives that queue on tokio time inside a
//! session actor, and exposes the workflow through an async handle.
//!
//! ## Example
//!
//! ```rust,ignore
//! use dossier_runtime::{AnalysisSession, RuntimeConfig};
//!
//! let config = RuntimeConfig::from_yaml_file("dossier.yaml")?;
//! let session = AnalysisSession::spawn(&config, config.synthesizer())?;
//!
//! session.ingest(candidates).await?;
//! session.advance_from_upload().await?;
//! session.submit_persona(persona).await?;
//! session.submit_task(task).await?;
//!
//! let result = session.wait_for_result().await?;
//! ```

pub mod clock;
pub mod config;
pub mod session;

pub use clock::TokioClock;
pub use config::{ConfigError, PacingConfig, RuntimeConfig};
pub use session::{AnalysisSession, SessionError, SessionHandle};
