//! Reshapes loosely-typed upstream and model JSON into fixed response types.
//!
//! Nothing in here fails: absent or malformed fields become `0`, `""` or an
//! empty list.

use serde_json::Value;

use crate::types::{
    ContractAnalysis, ContractRisk, Prediction, PredictionEnvelope, RelatedRecord, RiskLevel,
};

// ── Prediction ───────────────────────────────────────────────────────────

/// The object the prediction fields are read from: a nested `prediction`
/// object if there is one, otherwise the body itself.
fn prediction_source(body: &Value) -> &Value {
    match body.get("prediction") {
        Some(p) if p.is_object() => p,
        _ => body,
    }
}

/// True when an upstream body carries something worth normalizing.
///
/// A 2xx body without a `prediction` object or a non-null top-level
/// `probability` counts as "no data".
pub fn has_prediction_data(body: &Value) -> bool {
    if !body.is_object() {
        return false;
    }
    body.get("prediction").is_some_and(Value::is_object)
        || body.get("probability").is_some_and(|v| !v.is_null())
}

/// Build the envelope from a primary-service or model response body.
pub fn normalize_prediction(body: &Value) -> PredictionEnvelope {
    let source = prediction_source(body);

    let mut related_records = records_from(source.get("related_records"));
    if related_records.is_empty() {
        related_records = records_from(source.get("references"));
    }
    if related_records.is_empty() && !std::ptr::eq(source, body) {
        related_records = records_from(body.get("references"));
    }

    PredictionEnvelope {
        prediction: Prediction {
            probability: finite_number(source.get("probability")).unwrap_or(0.0),
            timeline: source
                .get("timeline")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            feature_points: strings_from(source.get("feature_points")),
            related_records,
        },
    }
}

/// JSON numbers only. Range is not checked here.
fn finite_number(v: Option<&Value>) -> Option<f64> {
    v?.as_f64().filter(|n| n.is_finite())
}

fn strings_from(v: Option<&Value>) -> Vec<String> {
    v.and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

/// Keep only entries with string `title` and `url`; `snippet` survives only if it is a string.
fn records_from(v: Option<&Value>) -> Vec<RelatedRecord> {
    let Some(items) = v.and_then(Value::as_array) else {
        return Vec::new();
    };
    items
        .iter()
        .filter_map(|item| {
            let title = item.get("title")?.as_str()?;
            let url = item.get("url")?.as_str()?;
            Some(RelatedRecord {
                title: title.to_string(),
                url: url.to_string(),
                snippet: item
                    .get("snippet")
                    .and_then(Value::as_str)
                    .map(str::to_string),
            })
        })
        .collect()
}

// ── Contract analysis ────────────────────────────────────────────────────

/// Accepts either `{ "analysis": {...} }` or the analysis object itself.
pub fn normalize_contract_analysis(body: &Value) -> ContractAnalysis {
    let source = match body.get("analysis") {
        Some(a) if a.is_object() => a,
        _ => body,
    };

    let risks: Vec<ContractRisk> = source
        .get("risks")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(|r| {
                    let clause = r.get("clause")?.as_str()?;
                    Some(ContractRisk {
                        clause: clause.to_string(),
                        severity: r
                            .get("severity")
                            .and_then(Value::as_str)
                            .and_then(RiskLevel::parse)
                            .unwrap_or_default(),
                        explanation: r
                            .get("explanation")
                            .and_then(Value::as_str)
                            .unwrap_or_default()
                            .to_string(),
                    })
                })
                .collect()
        })
        .unwrap_or_default();

    // Overall level falls back to the worst individual risk.
    let risk_level = source
        .get("risk_level")
        .and_then(Value::as_str)
        .and_then(RiskLevel::parse)
        .or_else(|| risks.iter().map(|r| r.severity).max_by_key(|s| severity_rank(*s)))
        .unwrap_or(RiskLevel::Low);

    ContractAnalysis {
        summary: source
            .get("summary")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        risk_level,
        risks,
        key_terms: strings_from(source.get("key_terms")),
        recommendations: strings_from(source.get("recommendations")),
    }
}

fn severity_rank(level: RiskLevel) -> u8 {
    match level {
        RiskLevel::Low => 0,
        RiskLevel::Medium => 1,
        RiskLevel::High => 2,
    }
}
