//! Session/Action Recorder
//!
//! Persists the turn as one session row plus one pending-action row per tool
//! call, for audit and for the downstream approval flow. Both writes are
//! best-effort: a recorder failure is logged and the already-computed
//! responses still go back to the caller.

use crate::db::{ActionRepository, NewAction, NewSession, SessionRepository};
use crate::orchestrator::types::{OrchestrationPlan, ParsedAgentResponse, RoundOutput};
use sdk::types::DeliberationRequest;
use tracing::warn;

const SESSION_TYPE: &str = "deliberation";

pub struct SessionRecorder {
    sessions: SessionRepository,
    actions: ActionRepository,
}

impl SessionRecorder {
    pub fn new(sessions: SessionRepository, actions: ActionRepository) -> Self {
        Self { sessions, actions }
    }

    /// Persist the session row. Returns the generated id, or None when the
    /// write failed.
    pub async fn record_session(
        &self,
        request: &DeliberationRequest,
        plan: &OrchestrationPlan,
        responses: &[ParsedAgentResponse],
        synthesis: Option<&str>,
        round: u32,
    ) -> Option<String> {
        let output = RoundOutput {
            round,
            phase: request.phase,
            responses: responses.to_vec(),
            synthesis: synthesis.map(str::to_string),
        };

        let round_outputs = match serde_json::to_string(&vec![output]) {
            Ok(json) => json,
            Err(e) => {
                warn!("Failed to serialize round outputs: {}", e);
                return None;
            }
        };

        let session = NewSession {
            user_id: request.user_id.clone(),
            squad_id: request.squad_id.clone(),
            context_id: request.context_id.clone(),
            session_type: SESSION_TYPE.to_string(),
            round: round as i64,
            phase: request.phase.as_str().to_string(),
            agent_keys: plan
                .assignments
                .iter()
                .map(|a| a.agent_key.clone())
                .collect(),
            goals: plan.goals.clone(),
            tasks: plan.assignments.iter().map(|a| a.task.clone()).collect(),
            round_outputs,
            conductor_notes: plan.conductor_notes.clone(),
            active: true,
        };

        match self.sessions.insert(&session).await {
            Ok(row) => Some(row.id),
            Err(e) => {
                warn!("Session persistence failed: {}", e);
                None
            }
        }
    }

    /// Persist one pending action per tool call across all responses.
    /// Failures are logged and swallowed.
    pub async fn record_actions(
        &self,
        request: &DeliberationRequest,
        plan: &OrchestrationPlan,
        responses: &[ParsedAgentResponse],
    ) {
        let mut actions = Vec::new();

        for response in responses {
            let priority = plan
                .assignments
                .iter()
                .find(|a| a.agent_key == response.agent_key)
                .map(|a| a.priority as i64)
                .unwrap_or(0);

            for call in &response.tool_calls {
                let arguments = serde_json::to_string(&call.arguments)
                    .unwrap_or_else(|_| "{}".to_string());

                actions.push(NewAction {
                    tool_call_id: call.id.clone(),
                    user_id: request.user_id.clone(),
                    squad_id: request.squad_id.clone(),
                    agent_key: response.agent_key.clone(),
                    agent_name: response.agent_name.clone(),
                    action_type: call.tool.clone(),
                    label: format!("{} requests {}", response.agent_name, call.tool),
                    arguments,
                    priority,
                });
            }
        }

        if actions.is_empty() {
            return;
        }

        if let Err(e) = self.actions.insert_many(&actions).await {
            warn!("Pending-action persistence failed: {}", e);
        }
    }
}
