pub mod contract;
pub mod predict;
pub mod prediction_service;
pub mod prompts;
pub mod research;

use counsel_core::{
    model::ModelChain,
    schema::{contract_analysis_validator, prediction_validator, ResponseSchema},
    CounselError,
};

pub use prediction_service::{PredictionServiceClient, ServiceResponse};

/// Request-scoped entry points for the dashboard's model-backed features.
///
/// Holds no per-request state; one instance is shared by every handler.
pub struct LegalAssistant {
    service: Option<PredictionServiceClient>,
    models: ModelChain,
    prediction_schema: ResponseSchema,
    contract_schema: ResponseSchema,
    max_contract_chars: usize,
}

impl LegalAssistant {
    pub fn new(
        service: Option<PredictionServiceClient>,
        models: ModelChain,
    ) -> Result<Self, CounselError> {
        Ok(Self {
            service,
            models,
            prediction_schema: prediction_validator()?,
            contract_schema: contract_analysis_validator()?,
            max_contract_chars: 100_000,
        })
    }

    pub fn with_max_contract_chars(mut self, max: usize) -> Self {
        self.max_contract_chars = max;
        self
    }

    pub fn has_prediction_service(&self) -> bool {
        self.service.is_some()
    }

    pub fn model_strategies(&self) -> Vec<String> {
        self.models.strategy_names()
    }
}

/// Trim and reject empty input before anything leaves the process.
pub(crate) fn required_text<'a>(
    value: Option<&'a str>,
    field: &str,
) -> Result<&'a str, CounselError> {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(CounselError::invalid_input(format!("{field} is required"))),
    }
}
