//! Error types for the stagewatch crate.
//!
//! These are API-level errors returned by constructors and registration
//! methods. Operational failures inside a pipeline are modelled as
//! [`PipelineError`](crate::core::PipelineError) values instead, and never
//! surface through this enum.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

/// The main error type for stagewatch operations.
#[derive(Debug, Error)]
pub enum StagewatchError {
    /// A pipeline with the same id is already registered.
    #[error("Pipeline '{0}' already exists")]
    DuplicatePipeline(String),

    /// A pipeline definition failed validation.
    #[error("{0}")]
    Validation(#[from] PipelineValidationError),

    /// A dependency cycle was found between stage definitions.
    #[error("{0}")]
    CycleDetected(#[from] CycleDetectedError),

    /// A configuration document could not be interpreted.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Metadata describing a validation failure for diagnostics.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ValidationErrorInfo {
    /// Error code (e.g., "PIPELINE-002-UNKNOWN_DEP").
    pub code: String,
    /// Short summary of the error.
    pub summary: String,
    /// Hint for fixing the error.
    pub fix_hint: Option<String>,
    /// Additional context key-value pairs.
    #[serde(default)]
    pub context: HashMap<String, String>,
}

impl ValidationErrorInfo {
    /// Creates a new validation error info.
    #[must_use]
    pub fn new(code: impl Into<String>, summary: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            summary: summary.into(),
            fix_hint: None,
            context: HashMap::new(),
        }
    }

    /// Sets the fix hint.
    #[must_use]
    pub fn with_fix_hint(mut self, hint: impl Into<String>) -> Self {
        self.fix_hint = Some(hint.into());
        self
    }

    /// Adds a single context entry.
    #[must_use]
    pub fn with_context_entry(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }
}

/// Error raised when a set of stage definitions is invalid.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct PipelineValidationError {
    /// The error message.
    pub message: String,
    /// The stages involved in the error.
    pub stages: Vec<String>,
    /// Optional diagnostic info.
    pub error_info: Option<ValidationErrorInfo>,
}

impl PipelineValidationError {
    /// Creates a new pipeline validation error.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            stages: Vec::new(),
            error_info: None,
        }
    }

    /// Sets the stages involved.
    #[must_use]
    pub fn with_stages(mut self, stages: Vec<String>) -> Self {
        self.stages = stages;
        self
    }

    /// Sets the diagnostic info.
    #[must_use]
    pub fn with_error_info(mut self, info: ValidationErrorInfo) -> Self {
        self.error_info = Some(info);
        self
    }

    /// A stage depends on an id that is not declared in the same pipeline.
    #[must_use]
    pub fn unknown_dependency(stage: &str, dependency: &str) -> Self {
        Self::new(format!(
            "Stage '{stage}' depends on unknown stage '{dependency}'"
        ))
        .with_stages(vec![stage.to_string(), dependency.to_string()])
        .with_error_info(
            ValidationErrorInfo::new("PIPELINE-002-UNKNOWN_DEP", "Unknown stage dependency")
                .with_fix_hint("Declare the dependency as a stage or remove it.")
                .with_context_entry("dependency", dependency),
        )
    }

    /// The same stage id was declared more than once.
    #[must_use]
    pub fn duplicate_stage(stage: &str) -> Self {
        Self::new(format!("Stage '{stage}' is declared more than once"))
            .with_stages(vec![stage.to_string()])
            .with_error_info(ValidationErrorInfo::new(
                "PIPELINE-003-DUPLICATE_STAGE",
                "Duplicate stage id",
            ))
    }

    /// A pipeline without stages was submitted.
    #[must_use]
    pub fn empty() -> Self {
        Self::new("Pipeline must declare at least one stage").with_error_info(
            ValidationErrorInfo::new("PIPELINE-001-EMPTY", "No stages declared")
                .with_fix_hint("Add at least one stage definition."),
        )
    }
}

/// Error raised when stage dependencies form a cycle.
#[derive(Debug, Clone, Error)]
#[error("Cycle detected in pipeline: {}", cycle_path.join(" -> "))]
pub struct CycleDetectedError {
    /// The path of stages forming the cycle.
    pub cycle_path: Vec<String>,
}

impl CycleDetectedError {
    /// Creates a new cycle detected error.
    #[must_use]
    pub fn new(cycle_path: Vec<String>) -> Self {
        Self { cycle_path }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicate_pipeline_message() {
        let err = StagewatchError::DuplicatePipeline("render".to_string());
        assert_eq!(err.to_string(), "Pipeline 'render' already exists");
    }

    #[test]
    fn test_unknown_dependency_info() {
        let err = PipelineValidationError::unknown_dependency("encode", "decode");
        assert!(err.to_string().contains("unknown stage 'decode'"));
        let info = err.error_info.unwrap();
        assert_eq!(info.code, "PIPELINE-002-UNKNOWN_DEP");
        assert_eq!(info.context.get("dependency"), Some(&"decode".to_string()));
    }

    #[test]
    fn test_cycle_detected_error() {
        let err = CycleDetectedError::new(vec![
            "a".to_string(),
            "b".to_string(),
            "a".to_string(),
        ]);
        assert!(err.to_string().contains("a -> b -> a"));
    }

    #[test]
    fn test_validation_converts_into_crate_error() {
        let err: StagewatchError = PipelineValidationError::empty().into();
        assert!(matches!(err, StagewatchError::Validation(_)));
    }
}
