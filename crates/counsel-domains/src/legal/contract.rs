use counsel_core::{
    model::GenerationRequest, normalize::normalize_contract_analysis, ContractAnalysis,
    CounselError,
};
use tracing::{info, warn};

use super::{
    prompts::{contract_prompt, CONTRACT_SYSTEM},
    required_text, LegalAssistant,
};

impl LegalAssistant {
    pub async fn analyze_contract(
        &self,
        contract_text: Option<&str>,
    ) -> Result<ContractAnalysis, CounselError> {
        let contract_text = required_text(contract_text, "contract")?;
        let contract_text = truncate_chars(contract_text, self.max_contract_chars);

        let request = GenerationRequest::prompt(contract_prompt(contract_text))
            .with_system(CONTRACT_SYSTEM)
            .with_schema(self.contract_schema.schema().clone());
        let value = self.models.generate_json(&request, &self.contract_schema).await?;

        let analysis = normalize_contract_analysis(&value);
        info!(
            risk_level = ?analysis.risk_level,
            risks = analysis.risks.len(),
            "contract analyzed"
        );
        Ok(analysis)
    }
}

fn truncate_chars(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => {
            warn!(limit = max, "contract text truncated before analysis");
            &text[..idx]
        }
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::truncate_chars;

    #[test]
    fn test_truncate_respects_char_boundaries() {
        assert_eq!(truncate_chars("héllo", 2), "hé");
        assert_eq!(truncate_chars("short", 10), "short");
        assert_eq!(truncate_chars("exact", 5), "exact");
    }
}
