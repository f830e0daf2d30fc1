use counsel_core::{model::GenerationRequest, ChatRole, ChatTurn, CounselError};
use tracing::info;

use super::{prompts::RESEARCH_SYSTEM, LegalAssistant};

/// Older turns beyond this are dropped before the model call.
const MAX_HISTORY_TURNS: usize = 20;

impl LegalAssistant {
    /// Answer the last user turn with the earlier turns as context.
    pub async fn research_chat(&self, turns: &[ChatTurn]) -> Result<String, CounselError> {
        match turns.last() {
            None => return Err(CounselError::invalid_input("messages is required")),
            Some(last) if last.role != ChatRole::User || last.content.trim().is_empty() => {
                return Err(CounselError::invalid_input(
                    "last message must be a non-empty user message",
                ));
            }
            Some(_) => {}
        }

        let start = turns.len().saturating_sub(MAX_HISTORY_TURNS);
        let mut history: Vec<ChatTurn> = turns[start..]
            .iter()
            .filter(|t| !t.content.trim().is_empty())
            .cloned()
            .collect();
        // Providers expect the conversation to open with a user turn.
        while history.first().is_some_and(|t| t.role != ChatRole::User) {
            history.remove(0);
        }

        let request = GenerationRequest::conversation(history).with_system(RESEARCH_SYSTEM);
        let reply = self.models.generate_text(&request).await?;
        info!(turns = turns.len(), reply_len = reply.len(), "research reply generated");
        Ok(reply)
    }
}
