use anyhow::anyhow;
use jsonschema::Validator;
use serde_json::{json, Value};

use crate::error::CounselError;

/// Maximum number of individual violations reported in one error.
const MAX_REPORTED_ERRORS: usize = 5;

type ExtraCheck = fn(&Value) -> Result<(), String>;

/// A compiled JSON schema that model output must satisfy before it is trusted.
pub struct ResponseSchema {
    name: &'static str,
    schema: Value,
    validator: Validator,
    extra: Option<ExtraCheck>,
}

impl std::fmt::Debug for ResponseSchema {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResponseSchema")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

impl ResponseSchema {
    pub fn new(name: &'static str, schema: Value) -> Result<Self, CounselError> {
        let validator = jsonschema::draft7::new(&schema)
            .map_err(|e| anyhow!("invalid {name} schema: {e}"))?;
        Ok(Self {
            name,
            schema,
            validator,
            extra: None,
        })
    }

    /// Attach a check the schema language can't express.
    pub fn with_check(mut self, check: ExtraCheck) -> Self {
        self.extra = Some(check);
        self
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn schema(&self) -> &Value {
        &self.schema
    }

    pub fn validate(&self, instance: &Value) -> Result<(), CounselError> {
        let errors: Vec<String> = self
            .validator
            .iter_errors(instance)
            .take(MAX_REPORTED_ERRORS)
            .map(|e| e.to_string())
            .collect();
        if !errors.is_empty() {
            return Err(CounselError::Schema(format!(
                "{}: {}",
                self.name,
                errors.join(", ")
            )));
        }
        if let Some(check) = self.extra {
            check(instance).map_err(|e| CounselError::Schema(format!("{}: {e}", self.name)))?;
        }
        Ok(())
    }
}

// ── Prediction ───────────────────────────────────────────────────────────

/// Schema for model-generated predictions.
pub fn prediction_schema() -> Value {
    json!({
        "$schema": "http://json-schema.org/draft-07/schema#",
        "type": "object",
        "required": ["prediction"],
        "properties": {
            "prediction": {
                "type": "object",
                "required": ["probability", "timeline", "feature_points", "related_records"],
                "properties": {
                    "probability": {
                        "type": "number",
                        "minimum": 0,
                        "maximum": 100,
                        "description": "Estimated likelihood of a favorable outcome, in percent"
                    },
                    "timeline": {
                        "type": "string",
                        "description": "Estimated duration until resolution, e.g. \"1-3 years\""
                    },
                    "feature_points": {
                        "type": "array",
                        "minItems": 1,
                        "items": { "type": "string" },
                        "description": "Key factors behind the estimate"
                    },
                    "related_records": {
                        "type": "array",
                        "items": {
                            "type": "object",
                            "required": ["title", "url"],
                            "properties": {
                                "title": { "type": "string" },
                                "url": { "type": "string", "format": "uri" },
                                "snippet": { "type": "string" }
                            }
                        }
                    }
                }
            }
        }
    })
}

pub fn prediction_validator() -> Result<ResponseSchema, CounselError> {
    Ok(ResponseSchema::new("prediction", prediction_schema())?.with_check(check_record_urls))
}

/// Every related record must carry an absolute URL.
fn check_record_urls(instance: &Value) -> Result<(), String> {
    let records = instance
        .pointer("/prediction/related_records")
        .and_then(Value::as_array);
    for (i, record) in records.into_iter().flatten().enumerate() {
        let raw = record.get("url").and_then(Value::as_str).unwrap_or_default();
        url::Url::parse(raw).map_err(|e| format!("related_records[{i}].url {raw:?}: {e}"))?;
    }
    Ok(())
}

// ── Contract analysis ────────────────────────────────────────────────────

pub fn contract_analysis_schema() -> Value {
    json!({
        "$schema": "http://json-schema.org/draft-07/schema#",
        "type": "object",
        "required": ["summary", "risk_level", "risks", "key_terms", "recommendations"],
        "properties": {
            "summary": { "type": "string", "minLength": 1 },
            "risk_level": { "type": "string", "enum": ["low", "medium", "high"] },
            "risks": {
                "type": "array",
                "items": {
                    "type": "object",
                    "required": ["clause", "severity", "explanation"],
                    "properties": {
                        "clause": { "type": "string" },
                        "severity": { "type": "string", "enum": ["low", "medium", "high"] },
                        "explanation": { "type": "string" }
                    }
                }
            },
            "key_terms": { "type": "array", "items": { "type": "string" } },
            "recommendations": { "type": "array", "items": { "type": "string" } }
        }
    })
}

pub fn contract_analysis_validator() -> Result<ResponseSchema, CounselError> {
    ResponseSchema::new("contract_analysis", contract_analysis_schema())
}
