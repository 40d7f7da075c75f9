//! End-to-end tests for the deliberation driver
//!
//! Uses a scripted in-process completion service so every provider outcome
//! (good plans, malformed JSON, hard failures) can be replayed
//! deterministically against a real SQLite store.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

use conclave_engine::config::OrchestratorConfig;
use conclave_engine::db::Database;
use conclave_engine::llm::{Completion, CompletionError, CompletionRequest, CompletionService};
use conclave_engine::orchestrator::{Complexity, Orchestrator};
use sdk::errors::EngineError;
use sdk::types::{AgentDescriptor, DeliberationRequest, GenerationParams, Phase, ResponseMode};

/// Scripted completion service: pops one outcome per call, in order.
/// Calls past the end of the script fail, which doubles as a guard against
/// unexpected extra calls (e.g. synthesis running when it should not).
struct ScriptedService {
    script: Mutex<VecDeque<Result<Completion, CompletionError>>>,
    calls: Mutex<Vec<CompletionRequest>>,
}

impl ScriptedService {
    fn new(outcomes: Vec<Result<Completion, CompletionError>>) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(outcomes.into()),
            calls: Mutex::new(Vec::new()),
        })
    }

    fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl CompletionService for ScriptedService {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn complete(
        &self,
        request: &CompletionRequest,
    ) -> conclave_engine::llm::Result<Completion> {
        self.calls.lock().unwrap().push(request.clone());
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(CompletionError::Unknown("script exhausted".to_string())))
    }
}

fn ok(text: &str) -> Result<Completion, CompletionError> {
    Ok(Completion::text(text))
}

fn server_error() -> Result<Completion, CompletionError> {
    Err(CompletionError::Unknown(
        "500 Internal Server Error".to_string(),
    ))
}

fn agent(key: &str, name: &str) -> AgentDescriptor {
    AgentDescriptor {
        key: key.to_string(),
        name: name.to_string(),
        specialty: String::new(),
        role_instructions: format!("You are {}, a member of the squad.", name),
        decision_style: "pragmatic".to_string(),
        priorities: vec![],
        bias_note: None,
        capabilities: vec![],
        allowed_tools: vec!["create_task".to_string()],
        synthesis_only: false,
        generation: GenerationParams::default(),
    }
}

fn request(message: &str, roster: Vec<AgentDescriptor>) -> DeliberationRequest {
    DeliberationRequest {
        user_id: "user-1".to_string(),
        message: message.to_string(),
        squad_id: None,
        context_id: None,
        roster,
        history: Vec::new(),
        project_context: None,
        response_mode: ResponseMode::Structured,
        phase: Phase::Proposal,
    }
}

async fn setup(service: Arc<ScriptedService>) -> (TempDir, Database, Orchestrator) {
    let temp_dir = TempDir::new().unwrap();
    let db = Database::new(&temp_dir.path().join("test.db")).await.unwrap();
    let orchestrator = Orchestrator::new(service, &db, &OrchestratorConfig::default());
    (temp_dir, db, orchestrator)
}

/// Scenario A: a simple question gets the fallback plan (two agents, no
/// conductor) and no synthesis call is ever issued.
#[tokio::test]
async fn test_simple_question_skips_synthesis() {
    let service = ScriptedService::new(vec![
        ok("I can't produce a plan right now, sorry!"),
        ok("Resetting goes through the account settings page."),
        ok("Agreed, settings page, then the email link."),
    ]);
    let (_tmp, _db, orchestrator) = setup(Arc::clone(&service)).await;

    let roster = vec![
        agent("pm", "Priya"),
        agent("eng", "Kenji"),
        agent("design", "Maya"),
    ];
    let result = orchestrator
        .deliberate(&request("How do I reset a password?", roster))
        .await
        .unwrap();

    assert_eq!(result.plan.complexity, Complexity::Simple);
    assert!(!result.plan.activate_conductor);
    assert!(!result.conductor_active);
    assert_eq!(result.plan.assignments.len(), 2);
    assert_eq!(result.responses.len(), 2);
    assert!(result.synthesis.is_none());
    // planner + 2 agents, nothing else
    assert_eq!(service.call_count(), 3);
}

/// Scenario B: a strategic question turns the conductor on via the classifier
/// when the planner omits the flag, and synthesis runs over the responses.
#[tokio::test]
async fn test_complex_question_runs_synthesis() {
    let plan_json = r#"{"goals": ["Weigh the migration"], "assignedAgents": [
        {"agentKey": "pm", "task": "Frame impact", "priority": 1},
        {"agentKey": "eng", "task": "Assess feasibility", "priority": 2}
    ], "expectedRounds": 1, "conductorNotes": ""}"#;

    let service = ScriptedService::new(vec![
        ok(plan_json),
        ok(r#"We should migrate incrementally. {"stance": "Migrate in slices", "key_points": ["strangler pattern limits risk"], "confidence": 0.8, "tradeoffs": [], "next_action": ""}"#),
        ok(r#"Timeline doubles if we do it all at once. {"stance": "Phase it over two quarters", "key_points": [], "confidence": 0.7, "tradeoffs": ["slower payoff"], "next_action": ""}"#),
        ok("Both agree on incremental migration; the open tension is timeline. Next step: draft the slice plan."),
    ]);
    let (_tmp, _db, orchestrator) = setup(Arc::clone(&service)).await;

    let roster = vec![
        agent("pm", "Priya"),
        agent("eng", "Kenji"),
        agent("design", "Maya"),
        agent("data", "Tomas"),
    ];
    let result = orchestrator
        .deliberate(&request(
            "Should we migrate to a new architecture and what's the trade-off on timeline?",
            roster,
        ))
        .await
        .unwrap();

    assert_eq!(result.plan.complexity, Complexity::Complex);
    assert!(result.plan.activate_conductor);
    assert_eq!(result.responses.len(), 2);
    let synthesis = result.synthesis.unwrap();
    assert!(synthesis.contains("incremental migration"));
    assert_eq!(service.call_count(), 4);
}

/// Scenario C: one of two agents fails with a 500; the turn continues with
/// the surviving response and the session still persists one round output.
#[tokio::test]
async fn test_partial_agent_failure_is_isolated() {
    let plan_json = r#"{"goals": ["g"], "assignedAgents": [
        {"agentKey": "pm", "task": "t1", "priority": 1},
        {"agentKey": "eng", "task": "t2", "priority": 2}
    ]}"#;

    let service = ScriptedService::new(vec![
        ok(plan_json),
        ok("First answer survives."),
        server_error(),
    ]);
    let (_tmp, db, orchestrator) = setup(service).await;

    let roster = vec![agent("pm", "Priya"), agent("eng", "Kenji")];
    let result = orchestrator
        .deliberate(&request("What now?", roster))
        .await
        .unwrap();

    assert_eq!(result.responses.len(), 1);
    assert_eq!(result.responses[0].agent_key, "pm");

    let session_id = result.session_id.expect("session should persist");
    let session = db.sessions().get(&session_id).await.unwrap().unwrap();
    assert_eq!(session.round, 1);
    // One round output with exactly one response inside
    let outputs: serde_json::Value = serde_json::from_str(&session.round_outputs).unwrap();
    assert_eq!(outputs.as_array().unwrap().len(), 1);
    assert_eq!(outputs[0]["responses"].as_array().unwrap().len(), 1);
}

/// Scenario D: the agent's self-introduction is stripped from the visible
/// content, across languages.
#[tokio::test]
async fn test_self_introduction_is_stripped() {
    let plan_json =
        r#"{"goals": ["g"], "assignedAgents": [{"agentKey": "sarah", "task": "t", "priority": 1}]}"#;

    let service = ScriptedService::new(vec![
        ok(plan_json),
        ok("Bonjour, c'est Sarah, je pense que..."),
    ]);
    let (_tmp, _db, orchestrator) = setup(service).await;

    let roster = vec![agent("sarah", "Sarah")];
    let result = orchestrator
        .deliberate(&request("Une question", roster))
        .await
        .unwrap();

    assert_eq!(result.responses.len(), 1);
    assert!(result.responses[0].content.starts_with("je pense que..."));
}

/// Scenario E: planner, agents, and synthesis all fail — the turn still
/// returns the fallback plan and an empty response list without erroring.
#[tokio::test]
async fn test_total_provider_failure_degrades_gracefully() {
    let service = ScriptedService::new(vec![server_error(), server_error(), server_error()]);
    let (_tmp, _db, orchestrator) = setup(Arc::clone(&service)).await;

    let roster = vec![agent("pm", "Priya"), agent("eng", "Kenji")];
    let result = orchestrator
        .deliberate(&request("Anything at all?", roster))
        .await
        .unwrap();

    assert_eq!(result.plan.goals, vec!["Respond to the user's question"]);
    assert_eq!(result.plan.assignments.len(), 2);
    assert!(result.responses.is_empty());
    assert!(result.synthesis.is_none());
    assert!(result.tool_calls.is_empty());
    assert!(result.memories_written.is_empty());
}

/// The one hard error: an empty effective roster.
#[tokio::test]
async fn test_empty_roster_is_the_only_hard_error() {
    let service = ScriptedService::new(vec![]);
    let (_tmp, _db, orchestrator) = setup(service).await;

    let err = orchestrator
        .deliberate(&request("Hello?", vec![]))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::EmptyRoster));
}

/// Tool markers surface as pending actions and in the flattened result list.
#[tokio::test]
async fn test_tool_calls_become_pending_actions() {
    let plan_json =
        r#"{"goals": ["g"], "assignedAgents": [{"agentKey": "pm", "task": "t", "priority": 1}]}"#;

    let service = ScriptedService::new(vec![
        ok(plan_json),
        ok("Let's track it. [TOOL: create_task] Flag rollout for the squad"),
    ]);
    let (_tmp, db, orchestrator) = setup(service).await;

    let roster = vec![agent("pm", "Priya")];
    let result = orchestrator
        .deliberate(&request("Plan the rollout", roster))
        .await
        .unwrap();

    assert_eq!(result.tool_calls.len(), 1);
    assert_eq!(result.tool_calls[0].tool, "create_task");
    assert!(!result.responses[0].content.contains("[TOOL:"));

    let actions = db.actions().list_recent("user-1", 10).await.unwrap();
    assert_eq!(actions.len(), 1);
    assert_eq!(actions[0].action_type, "create_task");
    assert_eq!(actions[0].agent_name, "Priya");
    assert_eq!(actions[0].status.as_str(), "pending");
    // Every pending action traces back to a tool call from this turn
    assert_eq!(actions[0].tool_call_id, result.tool_calls[0].id);
}

/// Memories extracted from responses land in the store and come back on the
/// next retrieval, most important first.
#[tokio::test]
async fn test_memories_persist_across_the_turn() {
    let plan_json =
        r#"{"goals": ["g"], "assignedAgents": [{"agentKey": "pm", "task": "t", "priority": 1}]}"#;

    let service = ScriptedService::new(vec![
        ok(plan_json),
        ok(r#"Thoughts. {"stance": "Ship the flag rollout this sprint", "key_points": ["The squad already owns the flag infrastructure"], "confidence": 0.9, "tradeoffs": [], "next_action": ""}"#),
    ]);
    let (_tmp, db, orchestrator) = setup(service).await;

    let roster = vec![agent("pm", "Priya")];
    let result = orchestrator
        .deliberate(&request("Plan the rollout", roster))
        .await
        .unwrap();

    // One fact from the key point, one preference from the stance
    assert_eq!(result.memories_written.len(), 2);

    let stored = db
        .memories()
        .top_by_importance("pm", "user-1", None, 5)
        .await
        .unwrap();
    assert_eq!(stored.len(), 2);
    // Fact at confidence 0.9 outranks the fixed 0.6 preference
    assert!(stored[0].importance > stored[1].importance);
    assert_eq!(
        stored[0].content,
        "The squad already owns the flag infrastructure"
    );
}

/// Later agents see a digest of earlier responses in their prompt.
#[tokio::test]
async fn test_agents_react_to_prior_responses() {
    let plan_json = r#"{"goals": ["g"], "assignedAgents": [
        {"agentKey": "pm", "task": "t1", "priority": 1},
        {"agentKey": "eng", "task": "t2", "priority": 2}
    ]}"#;

    let service = ScriptedService::new(vec![
        ok(plan_json),
        ok("Ship it this week."),
        ok("Pushing back on the timeline."),
    ]);
    let (_tmp, _db, orchestrator) = setup(Arc::clone(&service)).await;

    let roster = vec![agent("pm", "Priya"), agent("eng", "Kenji")];
    orchestrator
        .deliberate(&request("When do we ship?", roster))
        .await
        .unwrap();

    let calls = service.calls.lock().unwrap();
    // Call 1 = planner, call 2 = first agent, call 3 = second agent
    let first_agent = &calls[1];
    let second_agent = &calls[2];

    assert!(!first_agent
        .messages
        .iter()
        .any(|m| m.content.contains("Responses so far this round")));
    assert!(second_agent
        .messages
        .iter()
        .any(|m| m.content.contains("Priya: Ship it this week.")));
}
