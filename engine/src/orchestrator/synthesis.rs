//! Synthesis Generator
//!
//! Produces the short consensus/tension/next-step summary after the agents
//! have spoken. Synthesis is best-effort: any failure yields an empty string
//! and the turn carries on.

use crate::llm::{CompletionRequest, CompletionService, Message};
use crate::orchestrator::prompts;
use crate::orchestrator::types::ParsedAgentResponse;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

const SYNTHESIS_MAX_TOKENS: u32 = 300;
const SYNTHESIS_TEMPERATURE: f64 = 0.3;

pub struct SynthesisGenerator {
    llm: Arc<dyn CompletionService>,
    call_timeout: Duration,
}

impl SynthesisGenerator {
    pub fn new(llm: Arc<dyn CompletionService>, call_timeout: Duration) -> Self {
        Self { llm, call_timeout }
    }

    /// Summarize the round in 2-3 sentences. Empty string on any failure.
    pub async fn generate(&self, goals: &[String], responses: &[ParsedAgentResponse]) -> String {
        let messages = vec![
            Message::system(prompts::synthesis_system_prompt()),
            Message::user(prompts::synthesis_user_prompt(goals, responses)),
        ];
        let request =
            CompletionRequest::new(messages, SYNTHESIS_MAX_TOKENS, SYNTHESIS_TEMPERATURE);

        let outcome = tokio::time::timeout(self.call_timeout, self.llm.complete(&request)).await;

        match outcome {
            Ok(Ok(completion)) => completion.text.trim().to_string(),
            Ok(Err(e)) => {
                warn!("Synthesis call failed: {}", e);
                String::new()
            }
            Err(_) => {
                warn!("Synthesis call timed out");
                String::new()
            }
        }
    }
}
