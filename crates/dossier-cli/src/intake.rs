//! Intake files: the documents, persona and task for one run.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use dossier_core::{DocumentCandidate, Persona, Task};

/// Everything the workflow collects, in one file.
///
/// ```yaml
/// documents:
///   - { name: q1.pdf, size: 120443, media_type: application/pdf }
/// persona:
///   role: Investment Analyst
///   expertise: [Financial Analysis]
///   focusAreas: [Revenue Trends]
///   experience: 8 years
/// task:
///   task: Compare revenue trends
///   expectedOutput: Summary table
///   priority: high
///   timeline: within-day
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Intake {
    pub documents: Vec<DocumentCandidate>,
    pub persona: Persona,
    pub task: Task,
}

impl Intake {
    /// Load from `.json`, otherwise YAML.
    pub fn from_path(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read intake file {}", path.display()))?;

        let is_json = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("json"));

        let intake = if is_json {
            serde_json::from_str(&contents)
                .with_context(|| format!("Invalid intake JSON in {}", path.display()))?
        } else {
            serde_yaml::from_str(&contents)
                .with_context(|| format!("Invalid intake YAML in {}", path.display()))?
        };
        Ok(intake)
    }
}

/// Sample personas and tasks, for `dossier samples`.
#[derive(Debug, Serialize)]
pub struct Samples {
    pub personas: Vec<Persona>,
    pub tasks: Vec<Task>,
}

impl Samples {
    pub fn load() -> Self {
        Self {
            personas: Persona::samples(),
            tasks: Task::samples(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dossier_core::{Priority, Timeline};
    use std::io::Write;

    const YAML: &str = r#"
documents:
  - { name: q1.pdf, size: 120443, media_type: application/pdf }
  - { name: q2.pdf, size: 99000, media_type: application/pdf }
  - { name: notes.docx, size: 5000, media_type: application/vnd.openxmlformats-officedocument.wordprocessingml.document }
persona:
  role: Investment Analyst
  expertise: [Financial Analysis]
  focusAreas: [Revenue Trends, Market Position]
  experience: 8 years
task:
  task: Compare revenue trends
  expectedOutput: Summary table
  priority: high
  timeline: within-day
"#;

    fn write(suffix: &str, contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_yaml_intake() {
        let file = write(".yaml", YAML);
        let intake = Intake::from_path(file.path()).unwrap();
        assert_eq!(intake.documents.len(), 3);
        assert!(intake.documents[0].is_pdf());
        assert!(!intake.documents[2].is_pdf());
        assert_eq!(intake.persona.focus_areas.len(), 2);
        assert_eq!(intake.task.priority, Priority::High);
        assert_eq!(intake.task.timeline, Timeline::WithinDay);
    }

    #[test]
    fn test_json_intake_matches_yaml() {
        let yaml = Intake::from_path(write(".yml", YAML).path()).unwrap();
        let json = serde_json::to_string(&yaml).unwrap();
        let parsed = Intake::from_path(write(".json", &json).path()).unwrap();
        assert_eq!(parsed, yaml);
    }

    #[test]
    fn test_malformed_intake_names_file() {
        let file = write(".yaml", "documents: 12\n");
        let err = Intake::from_path(file.path()).unwrap_err();
        assert!(format!("{:#}", err).contains("Invalid intake YAML"));
    }

    #[test]
    fn test_samples_serialize() {
        let yaml = serde_yaml::to_string(&Samples::load()).unwrap();
        assert!(yaml.contains("personas:"));
        assert!(yaml.contains("expectedOutput:"));
    }
}
