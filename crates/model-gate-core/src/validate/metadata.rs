// crates/model-gate-core/src/validate/metadata.rs
// ============================================================================
// Module: Model Gate Metadata Validator
// Description: Declared-metadata parsing and field shape checks.
// Purpose: Accept only metadata documents that satisfy the track's schema.
// Dependencies: serde_json
// ============================================================================

//! ## Overview
//! The metadata document is parsed once. Missing required keys stop
//! validation immediately; otherwise every present field is shape-checked and
//! all violations are returned together. The `model_class` format rule is a
//! pure string check; whether the class exists is decided later against the
//! extracted bundle.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;

use serde_json::Map;
use serde_json::Value;

use crate::core::Track;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Sub-keys required inside `expected_inputs`.
pub const REQUIRED_INPUT_KEYS: [&str; 3] = ["stock_prices", "volume", "timestamps"];
/// Sub-keys required inside `output_format`.
pub const REQUIRED_OUTPUT_KEYS: [&str; 2] = ["signal", "confidence"];

// ============================================================================
// SECTION: Violations
// ============================================================================

/// Metadata failure classes, recorded as check names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum MetadataCode {
    /// Document is not a JSON object.
    InvalidJson,
    /// Required keys are absent.
    MissingFields,
    /// `model_id` is not a non-empty string.
    InvalidModelId,
    /// `version` is not a string.
    InvalidVersion,
    /// `author` is not a non-empty string.
    InvalidAuthor,
    /// `expected_inputs` is not an object.
    InvalidExpectedInputs,
    /// `expected_inputs` lacks required sub-keys.
    MissingInputFields,
    /// `output_format` is not an object.
    InvalidOutputFormat,
    /// `output_format` lacks required sub-keys.
    MissingOutputFields,
    /// `model_class` is not a non-empty string.
    InvalidModelClass,
    /// `model_class` is not a dotted qualified identifier.
    InvalidModelClassFormat,
}

impl MetadataCode {
    /// Returns the canonical check name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::InvalidJson => "INVALID_JSON",
            Self::MissingFields => "MISSING_METADATA_FIELDS",
            Self::InvalidModelId => "INVALID_MODEL_ID",
            Self::InvalidVersion => "INVALID_VERSION",
            Self::InvalidAuthor => "INVALID_AUTHOR",
            Self::InvalidExpectedInputs => "INVALID_EXPECTED_INPUTS",
            Self::MissingInputFields => "MISSING_INPUT_FIELDS",
            Self::InvalidOutputFormat => "INVALID_OUTPUT_FORMAT",
            Self::MissingOutputFields => "MISSING_OUTPUT_FIELDS",
            Self::InvalidModelClass => "INVALID_MODEL_CLASS",
            Self::InvalidModelClassFormat => "INVALID_MODEL_CLASS_FORMAT",
        }
    }
}

/// One metadata violation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetadataViolation {
    /// Failure class.
    pub code: MetadataCode,
    /// Human-readable message.
    pub message: String,
}

impl MetadataViolation {
    /// Creates a violation.
    fn new(code: MetadataCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

// ============================================================================
// SECTION: Model Metadata
// ============================================================================

/// Validated metadata with the projected scalar fields.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelMetadata {
    /// Declared model identifier, when present.
    model_id: Option<String>,
    /// Declared primary class (bytecode track), when present.
    model_class: Option<String>,
    /// Full parsed document.
    document: Map<String, Value>,
}

impl ModelMetadata {
    /// Returns the declared model identifier.
    #[must_use]
    pub fn model_id(&self) -> Option<&str> {
        self.model_id.as_deref()
    }

    /// Returns the declared primary class in dotted form.
    #[must_use]
    pub fn model_class(&self) -> Option<&str> {
        self.model_class.as_deref()
    }

    /// Returns the parsed document.
    #[must_use]
    pub const fn document(&self) -> &Map<String, Value> {
        &self.document
    }
}

// ============================================================================
// SECTION: Validation
// ============================================================================

/// Validates a metadata document for `track`.
///
/// # Errors
///
/// Returns every [`MetadataViolation`] found. An unparsable document or
/// missing required keys yield exactly one violation.
pub fn validate_metadata(
    text: &str,
    track: Track,
    required_fields: &BTreeSet<String>,
) -> Result<ModelMetadata, Vec<MetadataViolation>> {
    let document = parse_document(text).map_err(|violation| vec![violation])?;

    let missing: Vec<&str> = required_fields
        .iter()
        .filter(|field| !document.contains_key(field.as_str()))
        .map(String::as_str)
        .collect();
    if !missing.is_empty() {
        return Err(vec![MetadataViolation::new(
            MetadataCode::MissingFields,
            format!("Missing required fields in metadata.json: {}", missing.join(", ")),
        )]);
    }

    let mut violations = Vec::new();
    if let Some(value) = document.get("model_id")
        && !is_non_empty_string(value)
    {
        violations.push(MetadataViolation::new(
            MetadataCode::InvalidModelId,
            "model_id must be a non-empty string",
        ));
    }
    if let Some(value) = document.get("version")
        && !value.is_string()
    {
        violations.push(MetadataViolation::new(
            MetadataCode::InvalidVersion,
            "version must be a string (e.g., '1.0.0')",
        ));
    }
    if let Some(value) = document.get("author")
        && !is_non_empty_string(value)
    {
        violations.push(MetadataViolation::new(
            MetadataCode::InvalidAuthor,
            "author must be a non-empty string",
        ));
    }
    match track {
        Track::Source => {
            check_sub_object(
                &document,
                "expected_inputs",
                &REQUIRED_INPUT_KEYS,
                MetadataCode::InvalidExpectedInputs,
                MetadataCode::MissingInputFields,
                &mut violations,
            );
            check_sub_object(
                &document,
                "output_format",
                &REQUIRED_OUTPUT_KEYS,
                MetadataCode::InvalidOutputFormat,
                MetadataCode::MissingOutputFields,
                &mut violations,
            );
        }
        Track::Bytecode => check_model_class(&document, &mut violations),
    }

    if !violations.is_empty() {
        return Err(violations);
    }
    Ok(ModelMetadata {
        model_id: string_field(&document, "model_id"),
        model_class: string_field(&document, "model_class"),
        document,
    })
}

/// Extracts `model_id` from a document without validating it.
#[must_use]
pub fn extract_model_id(text: &str) -> Option<String> {
    extract_field(text, "model_id")
}

/// Extracts a non-empty string field from a document without validating it.
#[must_use]
pub fn extract_field(text: &str, field: &str) -> Option<String> {
    parse_document(text).ok().and_then(|document| string_field(&document, field))
}

/// Returns true when `value` is a dotted qualified identifier.
///
/// At least one dot is required; every segment is non-empty, starts with a
/// letter or underscore, and contains only alphanumerics or underscores.
#[must_use]
pub fn is_qualified_identifier(value: &str) -> bool {
    value.contains('.')
        && value.split('.').all(|segment| {
            let mut chars = segment.chars();
            chars.next().is_some_and(|first| first.is_alphabetic() || first == '_')
                && chars.all(|ch| ch.is_alphanumeric() || ch == '_')
        })
}

/// Parses the document as a JSON object.
fn parse_document(text: &str) -> Result<Map<String, Value>, MetadataViolation> {
    match serde_json::from_str::<Value>(text) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(MetadataViolation::new(
            MetadataCode::InvalidJson,
            "metadata.json must contain a JSON object",
        )),
        Err(err) => Err(MetadataViolation::new(
            MetadataCode::InvalidJson,
            format!("metadata.json is not valid JSON: {err}"),
        )),
    }
}

/// Returns the trimmed-non-empty string value of `field`.
fn string_field(document: &Map<String, Value>, field: &str) -> Option<String> {
    document
        .get(field)
        .and_then(Value::as_str)
        .filter(|value| !value.trim().is_empty())
        .map(str::to_string)
}

/// Returns true for strings that are non-empty after trimming.
fn is_non_empty_string(value: &Value) -> bool {
    value.as_str().is_some_and(|text| !text.trim().is_empty())
}

/// Checks that `field`, when present, is an object holding every required key.
fn check_sub_object(
    document: &Map<String, Value>,
    field: &str,
    required_keys: &[&str],
    shape_code: MetadataCode,
    missing_code: MetadataCode,
    violations: &mut Vec<MetadataViolation>,
) {
    let Some(value) = document.get(field) else {
        return;
    };
    let Some(object) = value.as_object() else {
        violations.push(MetadataViolation::new(
            shape_code,
            format!("{field} must be an object/dictionary"),
        ));
        return;
    };
    let missing: Vec<&str> =
        required_keys.iter().copied().filter(|key| !object.contains_key(*key)).collect();
    if !missing.is_empty() {
        violations.push(MetadataViolation::new(
            missing_code,
            format!("{field} missing required fields: {}", missing.join(", ")),
        ));
    }
}

/// Checks the `model_class` field, when present.
fn check_model_class(document: &Map<String, Value>, violations: &mut Vec<MetadataViolation>) {
    let Some(value) = document.get("model_class") else {
        return;
    };
    match value.as_str() {
        Some(class) if !class.trim().is_empty() => {
            if !is_qualified_identifier(class) {
                violations.push(MetadataViolation::new(
                    MetadataCode::InvalidModelClassFormat,
                    format!(
                        "model_class '{class}' is not a valid Java class name. Expected format: \
                         com.example.MyModel"
                    ),
                ));
            }
        }
        _ => violations.push(MetadataViolation::new(
            MetadataCode::InvalidModelClass,
            "model_class must be a non-empty string (fully qualified class name)",
        )),
    }
}
