//! Agent Executor
//!
//! Runs one planned assignment: pulls the agent's memories, assembles the
//! prompt and conversation context, calls the completion service with the
//! agent's own generation parameters, and parses the result. A failed call is
//! the caller's signal to skip this agent, never to abort the turn.

use crate::db::{MemoryRecord, MemoryRepository};
use crate::llm::{
    CompletionError, CompletionRequest, CompletionService, Message, RawToolCall,
};
use crate::orchestrator::parser::ResponseParser;
use crate::orchestrator::prompts;
use crate::orchestrator::types::{
    AgentAssignment, ParsedAgentResponse, ToolCallRequest, ToolCallStatus,
};
use sdk::types::{AgentDescriptor, DeliberationRequest, ResponseMode, TurnRole};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Token budgets by response mode
const SHORT_BUDGET: u32 = 300;
const STRUCTURED_BUDGET: u32 = 700;
const DETAILED_BUDGET: u32 = 1500;

/// Executes one assignment at a time, in plan priority order
pub struct AgentExecutor {
    llm: Arc<dyn CompletionService>,
    memories: MemoryRepository,
    parser: ResponseParser,
    call_timeout: Duration,
    history_window: usize,
    memory_limit: i64,
}

impl AgentExecutor {
    pub fn new(
        llm: Arc<dyn CompletionService>,
        memories: MemoryRepository,
        call_timeout: Duration,
        history_window: usize,
        memory_limit: i64,
    ) -> Self {
        Self {
            llm,
            memories,
            parser: ResponseParser::new(),
            call_timeout,
            history_window,
            memory_limit,
        }
    }

    /// Execute one assignment and parse the agent's reply.
    ///
    /// `prior` holds the responses already produced this round so later
    /// agents react to earlier ones.
    pub async fn execute(
        &self,
        assignment: &AgentAssignment,
        agent: &AgentDescriptor,
        request: &DeliberationRequest,
        prior: &[ParsedAgentResponse],
    ) -> crate::llm::Result<ParsedAgentResponse> {
        let memories = self
            .memories
            .top_by_importance(
                &agent.key,
                &request.user_id,
                request.squad_id.as_deref(),
                self.memory_limit,
            )
            .await
            .unwrap_or_else(|e| {
                debug!("Memory retrieval failed for {}: {}", agent.key, e);
                Vec::new()
            });

        let messages = build_messages(
            agent,
            assignment,
            request,
            &memories,
            prior,
            self.history_window,
        );

        let budget = mode_budget(request.response_mode).min(agent.generation.max_tokens);
        let completion_request =
            CompletionRequest::new(messages, budget, agent.generation.temperature);

        let completion =
            match tokio::time::timeout(self.call_timeout, self.llm.complete(&completion_request))
                .await
            {
                Ok(result) => result?,
                Err(_) => return Err(CompletionError::Timeout),
            };

        let mut parsed = self.parser.parse(&completion.text, &agent.key, &agent.name);

        // Providers may also surface structured tool calls alongside the text
        parsed
            .tool_calls
            .extend(completion.tool_calls.iter().map(provider_tool_call));

        Ok(parsed)
    }
}

/// Token budget for the declared response mode
pub(crate) fn mode_budget(mode: ResponseMode) -> u32 {
    match mode {
        ResponseMode::Short => SHORT_BUDGET,
        ResponseMode::Structured => STRUCTURED_BUDGET,
        ResponseMode::Detailed => DETAILED_BUDGET,
    }
}

/// Assemble the message list for one agent execution: system prompt, trailing
/// history window, the user's message, and the prior-responses digest when
/// other agents already spoke this round.
pub(crate) fn build_messages(
    agent: &AgentDescriptor,
    assignment: &AgentAssignment,
    request: &DeliberationRequest,
    memories: &[MemoryRecord],
    prior: &[ParsedAgentResponse],
    history_window: usize,
) -> Vec<Message> {
    let system = prompts::agent_system_prompt(
        agent,
        request.phase,
        &assignment.task,
        memories,
        request.project_context.as_deref(),
    );

    let mut messages = Vec::with_capacity(request.history.len() + 3);
    messages.push(Message::system(system));

    let skip = request.history.len().saturating_sub(history_window);
    for turn in request.history.iter().skip(skip) {
        messages.push(match turn.role {
            TurnRole::User => Message::user(&turn.content),
            TurnRole::Assistant => Message::assistant(&turn.content),
        });
    }

    messages.push(Message::user(&request.message));

    if !prior.is_empty() {
        messages.push(Message::user(prompts::prior_responses_digest(prior)));
    }

    messages
}

/// Convert a provider-surfaced structured tool call into a pending request
fn provider_tool_call(raw: &RawToolCall) -> ToolCallRequest {
    let arguments = match serde_json::from_str::<Value>(&raw.arguments) {
        Ok(Value::Object(map)) => map.into_iter().collect::<BTreeMap<String, Value>>(),
        _ => {
            let mut map = BTreeMap::new();
            map.insert("context".to_string(), Value::String(raw.arguments.clone()));
            map
        }
    };

    let id = if raw.id.is_empty() {
        format!("call_{}", uuid::Uuid::new_v4())
    } else {
        raw.id.clone()
    };

    ToolCallRequest {
        id,
        tool: raw.name.clone(),
        arguments,
        status: ToolCallStatus::Pending,
    }
}
