//! Orchestration Driver
//!
//! Top-level control flow for one incoming message: build the plan, execute
//! the assigned agents strictly in priority order, optionally synthesize,
//! then persist memories, actions, and the session record. Compute-path
//! failures degrade the output; persist-path failures are swallowed. The only
//! caller-visible error is a roster with no assignable agents.

use crate::config::OrchestratorConfig;
use crate::db::Database;
use crate::llm::CompletionService;
use crate::orchestrator::executor::AgentExecutor;
use crate::orchestrator::memory::{extract_memories, MemoryWriter};
use crate::orchestrator::planner::PlanBuilder;
use crate::orchestrator::recorder::SessionRecorder;
use crate::orchestrator::synthesis::SynthesisGenerator;
use crate::orchestrator::types::{DeliberationResult, ParsedAgentResponse};
use sdk::errors::EngineError;
use sdk::types::DeliberationRequest;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// The current driver always produces exactly one round per call; the session
/// schema supports more.
const ROUND: u32 = 1;

pub struct Orchestrator {
    planner: PlanBuilder,
    executor: AgentExecutor,
    synthesis: SynthesisGenerator,
    writer: MemoryWriter,
    recorder: SessionRecorder,
    max_assignments: usize,
}

impl Orchestrator {
    pub fn new(
        llm: Arc<dyn CompletionService>,
        db: &Database,
        config: &OrchestratorConfig,
    ) -> Self {
        let call_timeout = Duration::from_secs(config.completion_timeout_secs);

        Self {
            planner: PlanBuilder::new(Arc::clone(&llm)),
            executor: AgentExecutor::new(
                Arc::clone(&llm),
                db.memories(),
                call_timeout,
                config.history_window,
                config.memory_limit,
            ),
            synthesis: SynthesisGenerator::new(Arc::clone(&llm), call_timeout),
            writer: MemoryWriter::new(db.memories()),
            recorder: SessionRecorder::new(db.sessions(), db.actions()),
            max_assignments: config.max_assignments,
        }
    }

    /// Run one full deliberation turn.
    ///
    /// Agents run sequentially because each one's prompt includes a digest of
    /// the responses before it; parallelizing would break the
    /// react-to-each-other property. A failed agent call is skipped, a failed
    /// plan call falls back to a static plan, a failed synthesis yields no
    /// summary — an all-agents-failed turn returns an empty response list
    /// rather than an error.
    pub async fn deliberate(
        &self,
        request: &DeliberationRequest,
    ) -> Result<DeliberationResult, EngineError> {
        info!(
            "Starting deliberation for user {} ({} agents in roster, phase {})",
            request.user_id,
            request.roster.len(),
            request.phase
        );

        let mut plan = self
            .planner
            .build(&request.message, &request.roster, &request.history)
            .await?;

        if plan.assignments.len() > self.max_assignments {
            warn!(
                "Plan assigned {} agents, capping to {}",
                plan.assignments.len(),
                self.max_assignments
            );
            plan.assignments.truncate(self.max_assignments);
        }

        // Ordered reduce over assignments: step i+1 sees the output of 1..i
        let mut responses: Vec<ParsedAgentResponse> = Vec::new();
        for assignment in &plan.assignments {
            let Some(agent) = request
                .roster
                .iter()
                .find(|a| a.key == assignment.agent_key)
            else {
                warn!(
                    "No descriptor for planned agent {}, skipping",
                    assignment.agent_key
                );
                continue;
            };

            match self
                .executor
                .execute(assignment, agent, request, &responses)
                .await
            {
                Ok(response) => {
                    debug!(
                        "Agent {} responded (confidence {:.2}, {} tool calls)",
                        agent.key,
                        response.confidence,
                        response.tool_calls.len()
                    );
                    responses.push(response);
                }
                Err(e) => {
                    warn!(
                        "Agent {} call failed, skipping: {}",
                        assignment.agent_key, e
                    );
                }
            }
        }

        if responses.is_empty() && !plan.assignments.is_empty() {
            warn!("No agent produced a response this turn");
        }

        let synthesis = if plan.activate_conductor && responses.len() >= 2 {
            let text = self.synthesis.generate(&plan.goals, &responses).await;
            if text.is_empty() {
                None
            } else {
                Some(text)
            }
        } else {
            None
        };

        let memories_written = self
            .writer
            .persist(&extract_memories(
                &responses,
                &request.user_id,
                request.squad_id.as_deref(),
            ))
            .await;

        let session_id = self
            .recorder
            .record_session(request, &plan, &responses, synthesis.as_deref(), ROUND)
            .await;
        self.recorder
            .record_actions(request, &plan, &responses)
            .await;

        let tool_calls = responses
            .iter()
            .flat_map(|r| r.tool_calls.iter().cloned())
            .collect();

        info!(
            "Deliberation finished: {} responses, synthesis {}",
            responses.len(),
            if synthesis.is_some() { "yes" } else { "no" }
        );

        Ok(DeliberationResult {
            conductor_active: plan.activate_conductor,
            plan,
            responses,
            synthesis,
            tool_calls,
            session_id,
            phase: request.phase,
            round: ROUND,
            memories_written,
        })
    }
}
