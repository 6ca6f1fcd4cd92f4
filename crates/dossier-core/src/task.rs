//! Task descriptor: the job the persona needs done.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::validation::{require_text, ValidationError};

/// How urgent the job is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    Medium,
    High,
    Urgent,
}

impl Priority {
    pub const ALL: [Priority; 4] = [
        Priority::Low,
        Priority::Medium,
        Priority::High,
        Priority::Urgent,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
            Priority::Urgent => "urgent",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Priority {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim();
        Priority::ALL
            .into_iter()
            .find(|p| p.as_str().eq_ignore_ascii_case(needle))
            .ok_or_else(|| ValidationError::UnknownPriority(s.to_string()))
    }
}

/// When the output is needed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Timeline {
    WithinHour,
    WithinDay,
    WithinWeek,
    WithinMonth,
    Flexible,
}

impl Timeline {
    pub const ALL: [Timeline; 5] = [
        Timeline::WithinHour,
        Timeline::WithinDay,
        Timeline::WithinWeek,
        Timeline::WithinMonth,
        Timeline::Flexible,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Timeline::WithinHour => "within-hour",
            Timeline::WithinDay => "within-day",
            Timeline::WithinWeek => "within-week",
            Timeline::WithinMonth => "within-month",
            Timeline::Flexible => "flexible",
        }
    }

    /// Display label, e.g. `within week`.
    pub fn label(&self) -> String {
        self.as_str().replace('-', " ")
    }
}

impl fmt::Display for Timeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Timeline {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim().replace(' ', "-");
        Timeline::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(&needle))
            .ok_or_else(|| ValidationError::UnknownTimeline(s.to_string()))
    }
}

/// The job to be done.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub task: String,
    pub expected_output: String,
    pub priority: Priority,
    pub timeline: Timeline,
}

impl Task {
    pub fn new(
        task: impl Into<String>,
        expected_output: impl Into<String>,
        priority: Priority,
        timeline: Timeline,
    ) -> Self {
        Self {
            task: task.into().trim().to_string(),
            expected_output: expected_output.into().trim().to_string(),
            priority,
            timeline,
        }
    }

    /// Check all fields are present.
    pub fn validate(&self) -> Result<(), ValidationError> {
        require_text(&self.task, "task")?;
        require_text(&self.expected_output, "expectedOutput")?;
        Ok(())
    }

    /// Ready-made jobs offered next to the job definition form.
    pub fn samples() -> Vec<Task> {
        vec![
            Task::new(
                "Prepare a comprehensive literature review focusing on methodologies, datasets, and performance benchmarks",
                "Structured literature review with methodology comparison table, dataset analysis, and performance benchmarks summary",
                Priority::High,
                Timeline::WithinWeek,
            ),
            Task::new(
                "Analyze revenue trends, R&D investments, and market positioning strategies",
                "Financial analysis report with trend charts, investment comparisons, and strategic positioning assessment",
                Priority::High,
                Timeline::WithinDay,
            ),
            Task::new(
                "Identify key concepts and mechanisms for exam preparation on reaction kinetics",
                "Study guide with key concepts, mechanism summaries, and practice problem references",
                Priority::Medium,
                Timeline::WithinWeek,
            ),
        ]
    }
}
