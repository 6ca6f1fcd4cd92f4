//! JSON Schema validation for exported results.
//!
//! Exports are validated against schema/processing_result.schema.json, which
//! is embedded at compile time so downstream tools and this crate agree on one
//! definition of the wire format.

use std::sync::OnceLock;
use thiserror::Error;

/// Embedded result schema (loaded at compile time).
const RESULT_SCHEMA_JSON: &str = include_str!("../../../schema/processing_result.schema.json");

/// Compiled JSON Schema validator (initialized once, reused).
static COMPILED_SCHEMA: OnceLock<Result<jsonschema::Validator, String>> = OnceLock::new();

/// Errors from schema loading.
#[derive(Error, Debug)]
pub enum SchemaError {
    #[error("Failed to load schema: {0}")]
    LoadError(String),
}

fn get_validator() -> Result<&'static jsonschema::Validator, SchemaError> {
    let result = COMPILED_SCHEMA.get_or_init(|| {
        let schema_value: serde_json::Value = match serde_json::from_str(RESULT_SCHEMA_JSON) {
            Ok(v) => v,
            Err(e) => return Err(format!("Invalid schema JSON: {}", e)),
        };

        jsonschema::options()
            .build(&schema_value)
            .map_err(|e| format!("Failed to compile schema: {}", e))
    });

    result
        .as_ref()
        .map_err(|e| SchemaError::LoadError(e.clone()))
}

/// The embedded schema document, for tools that want to publish it.
pub fn result_schema() -> &'static str {
    RESULT_SCHEMA_JSON
}

/// Validate a result JSON value against the schema.
///
/// Returns every violation as `"<message> at <instance path>"`.
pub fn validate_result_schema(result_json: &serde_json::Value) -> Result<(), Vec<String>> {
    let validator = get_validator().map_err(|e| vec![e.to_string()])?;

    let errors: Vec<String> = validator
        .iter_errors(result_json)
        .map(|e| format!("{} at {}", e, e.instance_path))
        .collect();

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Check if a result JSON value is valid against the schema.
pub fn is_valid_result(result_json: &serde_json::Value) -> bool {
    get_validator()
        .map(|v| v.is_valid(result_json))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn valid() -> serde_json::Value {
        json!({
            "metadata": {
                "inputDocuments": ["a.pdf", "b.pdf", "c.pdf"],
                "persona": {
                    "role": "Analyst",
                    "expertise": ["Finance"],
                    "focusAreas": ["Risk"],
                    "experience": "5y"
                },
                "task": {
                    "task": "Review",
                    "expectedOutput": "Report",
                    "priority": "high",
                    "timeline": "within-day"
                },
                "processingTimestamp": "2025-01-01T00:00:03.000Z",
                "processingTimeSeconds": 3
            },
            "extractedSections": [
                {
                    "document": "a.pdf",
                    "pageNumber": 4,
                    "sectionTitle": "Literature Review",
                    "importanceRank": 1,
                    "content": "Relevant"
                }
            ],
            "subSectionAnalysis": [
                {
                    "document": "a.pdf",
                    "refinedText": "Refined",
                    "pageNumber": 2,
                    "relevanceScore": 95.0,
                    "keyInsights": ["Key methodology identified"]
                }
            ]
        })
    }

    #[test]
    fn test_valid_result_passes_schema() {
        assert!(validate_result_schema(&valid()).is_ok());
        assert!(is_valid_result(&valid()));
    }

    #[test]
    fn test_missing_section_fails() {
        let mut value = valid();
        value.as_object_mut().unwrap().remove("subSectionAnalysis");
        let errors = validate_result_schema(&value).unwrap_err();
        assert!(!errors.is_empty());
    }

    #[test]
    fn test_score_above_range_fails() {
        let mut value = valid();
        value["subSectionAnalysis"][0]["relevanceScore"] = json!(100.5);
        assert!(validate_result_schema(&value).is_err());
    }

    #[test]
    fn test_zero_page_fails() {
        let mut value = valid();
        value["extractedSections"][0]["pageNumber"] = json!(0);
        assert!(validate_result_schema(&value).is_err());
    }

    #[test]
    fn test_unknown_priority_fails() {
        let mut value = valid();
        value["metadata"]["task"]["priority"] = json!("asap");
        assert!(validate_result_schema(&value).is_err());
    }

    #[test]
    fn test_bad_timestamp_fails() {
        let mut value = valid();
        value["metadata"]["processingTimestamp"] = json!("yesterday");
        assert!(validate_result_schema(&value).is_err());
    }

    #[test]
    fn test_additional_properties_fail() {
        let mut value = valid();
        value["extractedSections"][0]["score"] = json!(1);
        let errors = validate_result_schema(&value).unwrap_err();
        assert!(errors.iter().any(|e| e.contains("/extractedSections/0")));
    }

    #[test]
    fn test_embedded_schema_is_json() {
        let parsed: serde_json::Value = serde_json::from_str(result_schema()).unwrap();
        assert_eq!(parsed["title"], "ProcessingResult");
    }
}
