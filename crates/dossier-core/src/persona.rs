//! Persona descriptor: who will read the analysis.

use serde::{Deserialize, Serialize};

use crate::validation::{normalize_text, require_text, ValidationError};

/// Ordered set of non-empty tags.
///
/// Insertion order is kept for display. Tags are normalized (trimmed, inner
/// whitespace collapsed) before storage, so `"Risk "` and `"Risk"` collide.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(transparent)]
pub struct TagSet {
    #[serde(skip)]
    field: &'static str,
    tags: Vec<String>,
}

impl TagSet {
    /// An empty set; `field` names the set in validation errors.
    pub fn new(field: &'static str) -> Self {
        Self {
            field,
            tags: Vec::new(),
        }
    }

    /// Build a set from tags, stopping at the first invalid one.
    pub fn from_tags<I, S>(field: &'static str, tags: I) -> Result<Self, ValidationError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut set = Self::new(field);
        for tag in tags {
            set.insert(tag.as_ref())?;
        }
        Ok(set)
    }

    pub fn insert(&mut self, tag: &str) -> Result<(), ValidationError> {
        let tag = normalize_text(tag);
        if tag.is_empty() {
            return Err(ValidationError::EmptyTag { field: self.field });
        }
        if self.contains(&tag) {
            return Err(ValidationError::DuplicateTag {
                field: self.field,
                tag,
            });
        }
        self.tags.push(tag);
        Ok(())
    }

    pub fn remove(&mut self, tag: &str) -> bool {
        let tag = normalize_text(tag);
        let before = self.tags.len();
        self.tags.retain(|t| *t != tag);
        self.tags.len() != before
    }

    pub fn contains(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        self.tags.get(index).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.tags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.tags.iter().map(String::as_str)
    }

    pub fn as_slice(&self) -> &[String] {
        &self.tags
    }
}

impl PartialEq for TagSet {
    fn eq(&self, other: &Self) -> bool {
        self.tags == other.tags
    }
}

impl Eq for TagSet {}

/// The person the analysis is tailored to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Persona {
    pub role: String,
    #[serde(deserialize_with = "expertise_tags")]
    pub expertise: TagSet,
    #[serde(deserialize_with = "focus_area_tags")]
    pub focus_areas: TagSet,
    pub experience: String,
}

fn expertise_tags<'de, D>(deserializer: D) -> Result<TagSet, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let tags = Vec::<String>::deserialize(deserializer)?;
    TagSet::from_tags("expertise", tags).map_err(serde::de::Error::custom)
}

fn focus_area_tags<'de, D>(deserializer: D) -> Result<TagSet, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let tags = Vec::<String>::deserialize(deserializer)?;
    TagSet::from_tags("focusAreas", tags).map_err(serde::de::Error::custom)
}

impl Persona {
    /// Start a persona with no tags yet.
    pub fn new(role: impl AsRef<str>, experience: impl AsRef<str>) -> Self {
        Self {
            role: normalize_text(role.as_ref()),
            expertise: TagSet::new("expertise"),
            focus_areas: TagSet::new("focusAreas"),
            experience: experience.as_ref().trim().to_string(),
        }
    }

    pub fn with_expertise(mut self, tag: &str) -> Result<Self, ValidationError> {
        self.expertise.insert(tag)?;
        Ok(self)
    }

    pub fn with_focus_area(mut self, tag: &str) -> Result<Self, ValidationError> {
        self.focus_areas.insert(tag)?;
        Ok(self)
    }

    /// Build a persona from plain string lists.
    pub fn from_parts<E, F, S>(
        role: impl AsRef<str>,
        expertise: E,
        focus_areas: F,
        experience: impl AsRef<str>,
    ) -> Result<Self, ValidationError>
    where
        E: IntoIterator<Item = S>,
        F: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut persona = Self::new(role, experience);
        persona.expertise = TagSet::from_tags("expertise", expertise)?;
        persona.focus_areas = TagSet::from_tags("focusAreas", focus_areas)?;
        Ok(persona)
    }

    /// Check the persona is complete enough to leave the persona stage.
    pub fn validate(&self) -> Result<(), ValidationError> {
        require_text(&self.role, "role")?;
        if self.expertise.is_empty() {
            return Err(ValidationError::EmptyTagSet("expertise"));
        }
        if self.focus_areas.is_empty() {
            return Err(ValidationError::EmptyTagSet("focusAreas"));
        }
        require_text(&self.experience, "experience")?;
        Ok(())
    }

    /// Focus area used for the `index`-th contextual snippet, cycling.
    pub fn focus_area_cycled(&self, index: usize) -> Option<&str> {
        if self.focus_areas.is_empty() {
            return None;
        }
        self.focus_areas.get(index % self.focus_areas.len())
    }

    /// Ready-made personas offered next to the persona form.
    pub fn samples() -> Vec<Persona> {
        SAMPLE_PERSONAS
            .iter()
            .filter_map(|(role, expertise, focus, experience)| {
                Persona::from_parts(
                    role,
                    expertise.iter().copied(),
                    focus.iter().copied(),
                    experience,
                )
                .ok()
            })
            .collect()
    }
}

type SamplePersona = (&'static str, &'static [&'static str], &'static [&'static str], &'static str);

const SAMPLE_PERSONAS: [SamplePersona; 3] = [
    (
        "PhD Researcher in Computational Biology",
        &[
            "Machine Learning",
            "Bioinformatics",
            "Graph Neural Networks",
            "Drug Discovery",
        ],
        &[
            "Methodology Analysis",
            "Dataset Evaluation",
            "Performance Benchmarking",
        ],
        "5+ years in computational biology research",
    ),
    (
        "Investment Analyst",
        &[
            "Financial Analysis",
            "Market Research",
            "Company Valuation",
            "Risk Assessment",
        ],
        &[
            "Revenue Analysis",
            "R&D Investment Tracking",
            "Competitive Positioning",
        ],
        "3+ years in investment analysis",
    ),
    (
        "Undergraduate Chemistry Student",
        &[
            "Organic Chemistry",
            "Reaction Mechanisms",
            "Laboratory Techniques",
        ],
        &[
            "Exam Preparation",
            "Concept Understanding",
            "Problem Solving",
        ],
        "2 years of chemistry studies",
    ),
];

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn analyst() -> Persona {
        Persona::from_parts("Analyst", ["Finance"], ["Risk"], "5y").unwrap()
    }

    #[test]
    fn test_complete_persona_validates() {
        assert!(analyst().validate().is_ok());
    }

    #[test]
    fn test_duplicate_tag_rejected() {
        let mut tags = TagSet::new("expertise");
        tags.insert("Finance").unwrap();
        let err = tags.insert("  Finance ").unwrap_err();
        assert_eq!(
            err,
            ValidationError::DuplicateTag {
                field: "expertise",
                tag: "Finance".to_string()
            }
        );
        assert_eq!(tags.len(), 1);
    }

    #[test]
    fn test_empty_tag_rejected() {
        let mut tags = TagSet::new("focusAreas");
        assert_eq!(
            tags.insert("   "),
            Err(ValidationError::EmptyTag { field: "focusAreas" })
        );
    }

    #[test]
    fn test_tag_order_preserved_and_removal() {
        let mut tags = TagSet::from_tags("expertise", ["B", "A", "C"]).unwrap();
        assert_eq!(tags.as_slice(), &["B", "A", "C"]);
        assert!(tags.remove("A"));
        assert!(!tags.remove("A"));
        assert_eq!(tags.as_slice(), &["B", "C"]);
    }

    #[test]
    fn test_missing_fields_reported_in_order() {
        let mut p = analyst();
        p.role = " ".to_string();
        assert_eq!(p.validate(), Err(ValidationError::MissingField("role")));

        let p = Persona::new("Analyst", "5y").with_focus_area("Risk").unwrap();
        assert_eq!(p.validate(), Err(ValidationError::EmptyTagSet("expertise")));

        let p = Persona::new("Analyst", "5y").with_expertise("Finance").unwrap();
        assert_eq!(p.validate(), Err(ValidationError::EmptyTagSet("focusAreas")));

        let mut p = analyst();
        p.experience.clear();
        assert_eq!(p.validate(), Err(ValidationError::MissingField("experience")));
    }

    #[test]
    fn test_focus_area_cycles() {
        let p = Persona::from_parts("R", ["E"], ["One", "Two"], "x").unwrap();
        assert_eq!(p.focus_area_cycled(0), Some("One"));
        assert_eq!(p.focus_area_cycled(1), Some("Two"));
        assert_eq!(p.focus_area_cycled(2), Some("One"));
    }

    #[test]
    fn test_serde_uses_camel_case_and_validates_tags() {
        let json = serde_json::to_value(analyst()).unwrap();
        assert_eq!(json["focusAreas"], serde_json::json!(["Risk"]));

        let dup = r#"{"role":"A","expertise":["x","x"],"focusAreas":["y"],"experience":"e"}"#;
        let err = serde_json::from_str::<Persona>(dup).unwrap_err();
        assert!(err.to_string().contains("Duplicate expertise entry"));

        let blank = r#"{"role":"A","expertise":["x"],"focusAreas":["y","  "],"experience":"e"}"#;
        let err = serde_json::from_str::<Persona>(blank).unwrap_err();
        assert!(err.to_string().contains("focusAreas entries must not be empty"));
    }

    #[test]
    fn test_samples_are_complete() {
        let samples = Persona::samples();
        assert_eq!(samples.len(), 3);
        for sample in &samples {
            assert!(sample.validate().is_ok(), "{:?}", sample);
        }
        assert_eq!(samples[1].role, "Investment Analyst");
    }

    proptest! {
        #[test]
        fn prop_persona_requires_every_part(
            has_role in any::<bool>(),
            has_expertise in any::<bool>(),
            has_focus in any::<bool>(),
            has_experience in any::<bool>(),
        ) {
            let role = if has_role { "Analyst" } else { "" };
            let experience = if has_experience { "5y" } else { "" };
            let expertise: Vec<&str> = if has_expertise { vec!["Finance"] } else { vec![] };
            let focus: Vec<&str> = if has_focus { vec!["Risk"] } else { vec![] };

            let persona = Persona::from_parts(role, expertise, focus, experience).unwrap();
            let complete = has_role && has_expertise && has_focus && has_experience;
            prop_assert_eq!(persona.validate().is_ok(), complete);
        }
    }
}
