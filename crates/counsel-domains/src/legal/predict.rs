use counsel_core::{
    model::GenerationRequest,
    normalize::normalize_prediction,
    CounselError, PredictionEnvelope,
};
use tracing::{debug, info, warn};

use super::{
    prompts::{prediction_prompt, PREDICTION_SYSTEM},
    required_text, LegalAssistant, ServiceResponse,
};

impl LegalAssistant {
    /// Primary service first, model fallback second, normalization always.
    ///
    /// The fallback runs when the service is unconfigured, unreachable,
    /// answers non-2xx, or answers 2xx without prediction data.
    pub async fn predict_case(
        &self,
        case_text: Option<&str>,
    ) -> Result<PredictionEnvelope, CounselError> {
        let case_text = required_text(case_text, "case")?;

        match &self.service {
            Some(service) => match service.predict(case_text).await {
                Ok(ServiceResponse::Prediction(body)) => {
                    info!(source = "service", "prediction served by primary service");
                    return Ok(normalize_prediction(&body));
                }
                Ok(ServiceResponse::NoData(reason)) => {
                    warn!(
                        url = service.url(),
                        "prediction service returned no data ({reason}); using model fallback"
                    );
                }
                Err(e) => {
                    warn!(
                        url = service.url(),
                        "prediction service failed: {e:#}; using model fallback"
                    );
                }
            },
            None => debug!("no prediction service configured; using model fallback"),
        }

        let request = GenerationRequest::prompt(prediction_prompt(case_text))
            .with_system(PREDICTION_SYSTEM)
            .with_schema(self.prediction_schema.schema().clone());
        let value = self
            .models
            .generate_json(&request, &self.prediction_schema)
            .await?;

        info!(source = "model", "prediction served by model fallback");
        Ok(normalize_prediction(&value))
    }
}
