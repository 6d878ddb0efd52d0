//! Predicates over [`PipelineError`] fields used to narrow strategies.

use crate::core::PipelineError;
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;
use tracing::warn;

/// An inspectable field of a [`PipelineError`].
///
/// Parsed from dotted paths such as `code` or `context.path`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ErrorField {
    /// `code`
    Code,
    /// `message`
    Message,
    /// `stage`
    Stage,
    /// `details`
    Details,
    /// `severity`
    Severity,
    /// `recoverable`
    Recoverable,
    /// `retry_count`
    RetryCount,
    /// `max_retries`
    MaxRetries,
    /// `context.<key>`
    Context(String),
}

impl ErrorField {
    /// Reads the field from `error`. Missing values yield `None`.
    #[must_use]
    pub fn value(&self, error: &PipelineError) -> Option<Value> {
        match self {
            Self::Code => Some(Value::from(error.code.clone())),
            Self::Message => Some(Value::from(error.message.clone())),
            Self::Stage => Some(Value::from(error.stage.clone())),
            Self::Details => error.details.clone().map(Value::from),
            Self::Severity => Some(Value::from(error.severity.to_string())),
            Self::Recoverable => Some(Value::from(error.recoverable)),
            Self::RetryCount => Some(Value::from(error.retry_count)),
            Self::MaxRetries => Some(Value::from(error.max_retries)),
            Self::Context(key) => error.context.get(key).cloned(),
        }
    }
}

impl FromStr for ErrorField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "code" => Ok(Self::Code),
            "message" => Ok(Self::Message),
            "stage" => Ok(Self::Stage),
            "details" => Ok(Self::Details),
            "severity" => Ok(Self::Severity),
            "recoverable" => Ok(Self::Recoverable),
            "retry_count" => Ok(Self::RetryCount),
            "max_retries" => Ok(Self::MaxRetries),
            other => match other.strip_prefix("context.") {
                Some(key) if !key.is_empty() => Ok(Self::Context(key.to_string())),
                _ => Err(format!("unknown error field '{other}'")),
            },
        }
    }
}

impl TryFrom<String> for ErrorField {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ErrorField> for String {
    fn from(field: ErrorField) -> Self {
        field.to_string()
    }
}

impl fmt::Display for ErrorField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Code => write!(f, "code"),
            Self::Message => write!(f, "message"),
            Self::Stage => write!(f, "stage"),
            Self::Details => write!(f, "details"),
            Self::Severity => write!(f, "severity"),
            Self::Recoverable => write!(f, "recoverable"),
            Self::RetryCount => write!(f, "retry_count"),
            Self::MaxRetries => write!(f, "max_retries"),
            Self::Context(key) => write!(f, "context.{key}"),
        }
    }
}

/// Comparison applied by an [`ErrorCondition`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConditionOperator {
    /// Equal values; numbers compare numerically.
    Equals,
    /// Field text contains the value.
    Contains,
    /// Field text starts with the value.
    StartsWith,
    /// Field text ends with the value.
    EndsWith,
    /// Field text matches the value as a regular expression.
    Regex,
    /// Numeric field lies within `{"min": .., "max": ..}`, bounds inclusive.
    Range,
}

/// A single predicate over an error field.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorCondition {
    /// Field to inspect.
    pub field: ErrorField,
    /// Comparison.
    pub operator: ConditionOperator,
    /// Operand.
    pub value: Value,
    /// Whether text comparisons are case sensitive.
    #[serde(default = "default_case_sensitive")]
    pub case_sensitive: bool,
    #[serde(skip)]
    compiled: OnceLock<CompiledPattern>,
}

/// A regex operand compiled on first use, keyed by what it was built from.
#[derive(Debug, Clone)]
struct CompiledPattern {
    pattern: String,
    case_sensitive: bool,
    regex: Option<Regex>,
}

impl CompiledPattern {
    fn build(pattern: String, case_sensitive: bool) -> Self {
        let regex = match RegexBuilder::new(&pattern)
            .case_insensitive(!case_sensitive)
            .build()
        {
            Ok(re) => Some(re),
            Err(e) => {
                warn!(pattern = %pattern, error = %e, "Invalid condition regex");
                None
            }
        };
        Self {
            pattern,
            case_sensitive,
            regex,
        }
    }

    fn is_for(&self, pattern: &str, case_sensitive: bool) -> bool {
        self.pattern == pattern && self.case_sensitive == case_sensitive
    }
}

impl PartialEq for ErrorCondition {
    fn eq(&self, other: &Self) -> bool {
        self.field == other.field
            && self.operator == other.operator
            && self.value == other.value
            && self.case_sensitive == other.case_sensitive
    }
}

fn default_case_sensitive() -> bool {
    true
}

impl ErrorCondition {
    /// Creates a case-sensitive condition.
    #[must_use]
    pub fn new(field: ErrorField, operator: ConditionOperator, value: Value) -> Self {
        Self {
            field,
            operator,
            value,
            case_sensitive: true,
            compiled: OnceLock::new(),
        }
    }

    /// `field == value`
    #[must_use]
    pub fn equals(field: ErrorField, value: Value) -> Self {
        Self::new(field, ConditionOperator::Equals, value)
    }

    /// `field` contains `needle`
    #[must_use]
    pub fn contains(field: ErrorField, needle: impl Into<String>) -> Self {
        Self::new(field, ConditionOperator::Contains, Value::from(needle.into()))
    }

    /// `field` starts with `prefix`
    #[must_use]
    pub fn starts_with(field: ErrorField, prefix: impl Into<String>) -> Self {
        Self::new(field, ConditionOperator::StartsWith, Value::from(prefix.into()))
    }

    /// `field` ends with `suffix`
    #[must_use]
    pub fn ends_with(field: ErrorField, suffix: impl Into<String>) -> Self {
        Self::new(field, ConditionOperator::EndsWith, Value::from(suffix.into()))
    }

    /// `field` matches `pattern`
    #[must_use]
    pub fn regex(field: ErrorField, pattern: impl Into<String>) -> Self {
        Self::new(field, ConditionOperator::Regex, Value::from(pattern.into()))
    }

    /// `min <= field <= max`; a missing bound is open.
    #[must_use]
    pub fn range(field: ErrorField, min: Option<f64>, max: Option<f64>) -> Self {
        Self::new(
            field,
            ConditionOperator::Range,
            serde_json::json!({ "min": min, "max": max }),
        )
    }

    /// Makes text comparisons case insensitive.
    #[must_use]
    pub fn case_insensitive(mut self) -> Self {
        self.case_sensitive = false;
        self
    }

    /// Evaluates the condition. A missing field never matches.
    #[must_use]
    pub fn evaluate(&self, error: &PipelineError) -> bool {
        let Some(actual) = self.field.value(error) else {
            return false;
        };

        match self.operator {
            ConditionOperator::Equals => match (actual.as_f64(), self.value.as_f64()) {
                (Some(a), Some(b)) => (a - b).abs() < f64::EPSILON,
                _ => match (&actual, &self.value) {
                    (Value::Bool(a), Value::Bool(b)) => a == b,
                    _ => self.fold(&text(&actual)) == self.fold(&text(&self.value)),
                },
            },
            ConditionOperator::Contains => {
                self.fold(&text(&actual)).contains(&self.fold(&text(&self.value)))
            }
            ConditionOperator::StartsWith => {
                self.fold(&text(&actual)).starts_with(&self.fold(&text(&self.value)))
            }
            ConditionOperator::EndsWith => {
                self.fold(&text(&actual)).ends_with(&self.fold(&text(&self.value)))
            }
            ConditionOperator::Regex => self.matches_regex(&text(&actual)),
            ConditionOperator::Range => {
                let Some(n) = actual.as_f64() else {
                    return false;
                };
                let min = self.value.get("min").and_then(Value::as_f64);
                let max = self.value.get("max").and_then(Value::as_f64);
                min.map_or(true, |m| n >= m) && max.map_or(true, |m| n <= m)
            }
        }
    }

    /// Matches against the operand compiled once per condition. Fields edited
    /// after the first evaluation fall back to a one-off compile.
    fn matches_regex(&self, haystack: &str) -> bool {
        let pattern = text(&self.value);
        let cached = self
            .compiled
            .get_or_init(|| CompiledPattern::build(pattern.clone(), self.case_sensitive));
        if cached.is_for(&pattern, self.case_sensitive) {
            cached.regex.as_ref().is_some_and(|re| re.is_match(haystack))
        } else {
            CompiledPattern::build(pattern, self.case_sensitive)
                .regex
                .is_some_and(|re| re.is_match(haystack))
        }
    }

    fn fold(&self, s: &str) -> String {
        if self.case_sensitive {
            s.to_string()
        } else {
            s.to_lowercase()
        }
    }
}

fn text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Severity;
    use serde_json::json;

    fn error() -> PipelineError {
        PipelineError::new("download", "NETWORK_ERROR", "Connection reset by peer")
            .with_severity(Severity::High)
            .with_retry_count(2)
            .with_context("path", json!("/tmp/in.pdf"))
            .with_context("bytes", json!(4096))
    }

    #[test]
    fn test_field_parsing() {
        assert_eq!("code".parse::<ErrorField>(), Ok(ErrorField::Code));
        assert_eq!(
            "context.path".parse::<ErrorField>(),
            Ok(ErrorField::Context("path".to_string()))
        );
        assert!("context.".parse::<ErrorField>().is_err());
        assert!("bogus".parse::<ErrorField>().is_err());
    }

    #[test]
    fn test_string_operators() {
        let e = error();
        assert!(ErrorCondition::equals(ErrorField::Code, json!("NETWORK_ERROR")).evaluate(&e));
        assert!(ErrorCondition::contains(ErrorField::Message, "reset").evaluate(&e));
        assert!(ErrorCondition::starts_with(ErrorField::Stage, "down").evaluate(&e));
        assert!(ErrorCondition::ends_with(ErrorField::Context("path".into()), ".pdf").evaluate(&e));
        assert!(!ErrorCondition::contains(ErrorField::Message, "RESET").evaluate(&e));
        assert!(ErrorCondition::contains(ErrorField::Message, "RESET")
            .case_insensitive()
            .evaluate(&e));
    }

    #[test]
    fn test_severity_and_numeric_equality() {
        let e = error();
        assert!(ErrorCondition::equals(ErrorField::Severity, json!("high")).evaluate(&e));
        assert!(ErrorCondition::equals(ErrorField::RetryCount, json!(2)).evaluate(&e));
        assert!(ErrorCondition::equals(ErrorField::Recoverable, json!(true)).evaluate(&e));
    }

    #[test]
    fn test_regex_operator() {
        let e = error();
        assert!(ErrorCondition::regex(ErrorField::Code, "^NET.*ERROR$").evaluate(&e));
        assert!(ErrorCondition::regex(ErrorField::Message, "connection")
            .case_insensitive()
            .evaluate(&e));
        assert!(!ErrorCondition::regex(ErrorField::Code, "([").evaluate(&e));
    }

    #[test]
    fn test_regex_compiled_once_and_follows_edits() {
        let e = error();
        let mut condition = ErrorCondition::regex(ErrorField::Code, "^NETWORK");
        assert!(condition.evaluate(&e));
        let first = condition.compiled.get().map(|c| c.pattern.clone());
        assert!(condition.evaluate(&e));
        assert_eq!(first.as_deref(), Some("^NETWORK"));

        condition.value = json!("^DISK");
        assert!(!condition.evaluate(&e));
        condition.value = json!("^network");
        condition.case_sensitive = false;
        assert!(condition.evaluate(&e));

        let copy = condition.clone();
        assert_eq!(copy, condition);
    }

    #[test]
    fn test_range_operator() {
        let e = error();
        assert!(ErrorCondition::range(ErrorField::Context("bytes".into()), Some(1024.0), None).evaluate(&e));
        assert!(!ErrorCondition::range(ErrorField::Context("bytes".into()), None, Some(1024.0)).evaluate(&e));
        assert!(!ErrorCondition::range(ErrorField::Code, Some(0.0), None).evaluate(&e));
    }

    #[test]
    fn test_missing_field_never_matches() {
        let e = error();
        assert!(!ErrorCondition::contains(ErrorField::Details, "x").evaluate(&e));
        assert!(!ErrorCondition::equals(ErrorField::Context("missing".into()), json!(null)).evaluate(&e));
    }

    #[test]
    fn test_condition_serialization_uses_paths() {
        let c = ErrorCondition::contains(ErrorField::Context("host".into()), "example");
        let json = serde_json::to_value(&c).unwrap();
        assert_eq!(json["field"], "context.host");
        assert_eq!(json["operator"], "contains");
        let back: ErrorCondition = serde_json::from_value(json).unwrap();
        assert_eq!(back, c);
    }
}
