//! Plan Builder
//!
//! Decides which agents speak this turn. One planning call against the
//! completion service produces the plan; a deterministic keyword classifier
//! supplies the complexity verdict and backstops the planner when its output
//! is unusable. The fallback path never fails unless the roster itself is
//! empty — it is the availability backstop for the whole turn.

use crate::llm::{CompletionRequest, CompletionService, Message};
use crate::orchestrator::parser;
use crate::orchestrator::prompts;
use crate::orchestrator::types::{AgentAssignment, Complexity, OrchestrationPlan};
use sdk::errors::EngineError;
use sdk::types::{AgentDescriptor, ConversationTurn};
use serde::Deserialize;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::warn;

/// Cue words marking a strategic, multi-perspective question
const COMPLEX_CUES: &[&str] = &[
    "strategy",
    "strategic",
    "decision",
    "decide",
    "trade-off",
    "tradeoff",
    "trade off",
    "roadmap",
    "architecture",
    "architectural",
    "migration",
    "migrate",
    "redesign",
    "prioritize",
    "prioritization",
];

/// Cue words marking a lookup-style question one agent can answer
const SIMPLE_CUES: &[&str] = &[
    "how do",
    "how to",
    "how can",
    "what is",
    "what's",
    "explain",
    "define",
    "definition of",
    "meaning of",
];

const PLANNING_MAX_TOKENS: u32 = 700;
const PLANNING_TEMPERATURE: f64 = 0.2;
const FALLBACK_GOAL: &str = "Respond to the user's question";
const FALLBACK_TASK: &str = "Respond to the user's question from your role's perspective";

/// Classify a message by lexical cues and roster size.
///
/// Complex: two complex cues, or more than three assignable agents.
/// Moderate: one complex cue, or no simple cues at all.
/// Simple: everything else.
pub fn classify_complexity(message: &str, assignable_agents: usize) -> Complexity {
    let lower = message.to_lowercase();
    let complex_hits = COMPLEX_CUES.iter().filter(|c| lower.contains(*c)).count();
    let simple_hits = SIMPLE_CUES.iter().filter(|c| lower.contains(*c)).count();

    if complex_hits >= 2 || assignable_agents > 3 {
        Complexity::Complex
    } else if complex_hits >= 1 || simple_hits == 0 {
        Complexity::Moderate
    } else {
        Complexity::Simple
    }
}

/// Intermediate deserialization type for planner JSON output
#[derive(Debug, Deserialize)]
struct RawPlan {
    #[serde(default)]
    goals: Vec<String>,
    #[serde(default, alias = "assignedAgents")]
    assigned_agents: Vec<RawAssignment>,
    #[serde(default, alias = "expectedRounds")]
    expected_rounds: Option<u32>,
    #[serde(default, alias = "conductorNotes")]
    conductor_notes: Option<String>,
    #[serde(default, alias = "shouldActivateConductor")]
    should_activate_conductor: Option<bool>,
}

#[derive(Debug, Deserialize)]
struct RawAssignment {
    #[serde(alias = "agentKey", alias = "agent", alias = "key")]
    agent_key: String,
    #[serde(default)]
    task: Option<String>,
    #[serde(default)]
    priority: Option<u32>,
}

/// Builds the per-turn execution plan
pub struct PlanBuilder {
    llm: Arc<dyn CompletionService>,
}

impl PlanBuilder {
    pub fn new(llm: Arc<dyn CompletionService>) -> Self {
        Self { llm }
    }

    /// Build a plan for the message.
    ///
    /// Synthesis-only agents are excluded from assignment. Any failure in the
    /// planning call or its output drops to the deterministic fallback; the
    /// only error out of here is an empty effective roster.
    pub async fn build(
        &self,
        message: &str,
        roster: &[AgentDescriptor],
        history: &[ConversationTurn],
    ) -> Result<OrchestrationPlan, EngineError> {
        let assignable: Vec<&AgentDescriptor> =
            roster.iter().filter(|a| !a.synthesis_only).collect();
        let complexity = classify_complexity(message, assignable.len());

        if assignable.is_empty() {
            return Err(EngineError::EmptyRoster);
        }

        let messages = vec![
            Message::system(prompts::planning_system_prompt()),
            Message::user(prompts::planning_user_prompt(message, &assignable, history)),
        ];
        let request =
            CompletionRequest::new(messages, PLANNING_MAX_TOKENS, PLANNING_TEMPERATURE);

        match self.llm.complete(&request).await {
            Ok(completion) => {
                match self.parse_plan(&completion.text, &assignable, complexity) {
                    Some(plan) => Ok(plan),
                    None => {
                        warn!("Planner output unparseable, using fallback plan");
                        self.fallback_plan(&assignable, complexity)
                    }
                }
            }
            Err(e) => {
                warn!("Planning call failed: {}, using fallback plan", e);
                self.fallback_plan(&assignable, complexity)
            }
        }
    }

    /// Parse the first JSON object out of the planner text.
    ///
    /// Unknown and synthesis-only agent keys are dropped. A missing
    /// `shouldActivateConductor` is overridden by the classifier's complex
    /// verdict. Returns None when no usable assignment survives.
    fn parse_plan(
        &self,
        text: &str,
        assignable: &[&AgentDescriptor],
        complexity: Complexity,
    ) -> Option<OrchestrationPlan> {
        let span = parser::first_json_object(text)?;
        let raw: RawPlan = serde_json::from_str(span).ok()?;

        let known: HashSet<&str> = assignable.iter().map(|a| a.key.as_str()).collect();
        let mut seen = HashSet::new();
        let mut assignments: Vec<AgentAssignment> = raw
            .assigned_agents
            .into_iter()
            .filter(|a| known.contains(a.agent_key.as_str()))
            .filter(|a| seen.insert(a.agent_key.clone()))
            .enumerate()
            .map(|(i, a)| AgentAssignment {
                agent_key: a.agent_key,
                task: a
                    .task
                    .filter(|t| !t.trim().is_empty())
                    .unwrap_or_else(|| FALLBACK_TASK.to_string()),
                priority: a.priority.unwrap_or(i as u32 + 1),
            })
            .collect();

        if assignments.is_empty() {
            return None;
        }
        assignments.sort_by_key(|a| a.priority);

        let goals = if raw.goals.is_empty() {
            vec![FALLBACK_GOAL.to_string()]
        } else {
            raw.goals
        };

        Some(OrchestrationPlan {
            goals,
            assignments,
            expected_rounds: raw.expected_rounds.unwrap_or(1).clamp(1, 3),
            conductor_notes: raw.conductor_notes.unwrap_or_default(),
            complexity,
            activate_conductor: raw
                .should_activate_conductor
                .unwrap_or(complexity == Complexity::Complex),
        })
    }

    /// Deterministic plan used whenever the planner cannot be trusted:
    /// first two assignable agents, priorities 1 and 2, no synthesis.
    fn fallback_plan(
        &self,
        assignable: &[&AgentDescriptor],
        complexity: Complexity,
    ) -> Result<OrchestrationPlan, EngineError> {
        if assignable.is_empty() {
            return Err(EngineError::EmptyRoster);
        }

        let assignments = assignable
            .iter()
            .take(2)
            .enumerate()
            .map(|(i, agent)| AgentAssignment {
                agent_key: agent.key.clone(),
                task: FALLBACK_TASK.to_string(),
                priority: i as u32 + 1,
            })
            .collect();

        Ok(OrchestrationPlan {
            goals: vec![FALLBACK_GOAL.to_string()],
            assignments,
            expected_rounds: 1,
            conductor_notes: String::new(),
            complexity,
            activate_conductor: false,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{Completion, CompletionError};
    use async_trait::async_trait;
    use sdk::types::GenerationParams;

    /// Test double returning a fixed outcome for every call
    struct StaticService {
        reply: Option<String>,
    }

    #[async_trait]
    impl CompletionService for StaticService {
        fn name(&self) -> &str {
            "static"
        }

        async fn complete(&self, _request: &CompletionRequest) -> crate::llm::Result<Completion> {
            match &self.reply {
                Some(text) => Ok(Completion::text(text.clone())),
                None => Err(CompletionError::Unknown("scripted failure".to_string())),
            }
        }
    }

    fn agent(key: &str, synthesis_only: bool) -> AgentDescriptor {
        AgentDescriptor {
            key: key.to_string(),
            name: key.to_uppercase(),
            specialty: String::new(),
            role_instructions: format!("You are {}.", key),
            decision_style: String::new(),
            priorities: vec![],
            bias_note: None,
            capabilities: vec![],
            allowed_tools: vec![],
            synthesis_only,
            generation: GenerationParams::default(),
        }
    }

    #[test]
    fn test_classifier_simple_question() {
        assert_eq!(
            classify_complexity("How do I reset a password?", 3),
            Complexity::Simple
        );
    }

    #[test]
    fn test_classifier_complex_by_cues() {
        assert_eq!(
            classify_complexity(
                "Should we migrate to a new architecture and what's the trade-off on timeline?",
                2
            ),
            Complexity::Complex
        );
    }

    #[test]
    fn test_classifier_complex_by_roster_size() {
        assert_eq!(classify_complexity("quick check", 4), Complexity::Complex);
    }

    #[test]
    fn test_classifier_moderate() {
        // One complex cue
        assert_eq!(
            classify_complexity("What's our roadmap?", 2),
            Complexity::Moderate
        );
        // No cues either way
        assert_eq!(
            classify_complexity("The billing page is broken again", 2),
            Complexity::Moderate
        );
    }

    #[tokio::test]
    async fn test_build_parses_planner_json() {
        let reply = r#"Here's my plan:
{"goals": ["Weigh the options"], "assignedAgents": [
  {"agentKey": "eng", "task": "Assess feasibility", "priority": 2},
  {"agentKey": "pm", "task": "Frame the user impact", "priority": 1}
], "expectedRounds": 1, "conductorNotes": "keep it tight", "shouldActivateConductor": true}"#;

        let builder = PlanBuilder::new(Arc::new(StaticService {
            reply: Some(reply.to_string()),
        }));
        let roster = vec![agent("pm", false), agent("eng", false)];

        let plan = builder.build("Pick a direction", &roster, &[]).await.unwrap();

        assert_eq!(plan.goals, vec!["Weigh the options"]);
        assert_eq!(plan.assignments.len(), 2);
        // Sorted by priority: pm first
        assert_eq!(plan.assignments[0].agent_key, "pm");
        assert_eq!(plan.assignments[1].agent_key, "eng");
        assert!(plan.activate_conductor);
        assert_eq!(plan.conductor_notes, "keep it tight");
    }

    #[tokio::test]
    async fn test_build_drops_unknown_and_synthesis_agents() {
        let reply = r#"{"goals": ["g"], "assignedAgents": [
  {"agentKey": "ghost", "task": "t"},
  {"agentKey": "conductor", "task": "t"},
  {"agentKey": "pm", "task": "t"}
]}"#;

        let builder = PlanBuilder::new(Arc::new(StaticService {
            reply: Some(reply.to_string()),
        }));
        let roster = vec![agent("pm", false), agent("conductor", true)];

        let plan = builder.build("question", &roster, &[]).await.unwrap();

        assert_eq!(plan.assignments.len(), 1);
        assert_eq!(plan.assignments[0].agent_key, "pm");
    }

    #[tokio::test]
    async fn test_build_falls_back_on_malformed_output() {
        for reply in ["not json at all", "", "{\"goals\": [1,2", "{}"] {
            let builder = PlanBuilder::new(Arc::new(StaticService {
                reply: Some(reply.to_string()),
            }));
            let roster = vec![agent("a", false), agent("b", false), agent("c", false)];

            let plan = builder.build("How do I log in?", &roster, &[]).await.unwrap();

            assert_eq!(plan.goals, vec![FALLBACK_GOAL]);
            assert_eq!(plan.assignments.len(), 2);
            assert_eq!(plan.assignments[0].agent_key, "a");
            assert_eq!(plan.assignments[0].priority, 1);
            assert_eq!(plan.assignments[1].priority, 2);
            assert!(!plan.activate_conductor);
        }
    }

    #[tokio::test]
    async fn test_build_falls_back_on_provider_failure() {
        let builder = PlanBuilder::new(Arc::new(StaticService { reply: None }));
        let roster = vec![agent("a", false)];

        let plan = builder.build("hello", &roster, &[]).await.unwrap();

        // Single-agent roster yields a single-assignment fallback
        assert_eq!(plan.assignments.len(), 1);
        assert_eq!(plan.expected_rounds, 1);
    }

    #[tokio::test]
    async fn test_build_missing_conductor_flag_uses_classifier() {
        let reply = r#"{"goals": ["g"], "assignedAgents": [{"agentKey": "a", "task": "t"}]}"#;
        let builder = PlanBuilder::new(Arc::new(StaticService {
            reply: Some(reply.to_string()),
        }));
        let roster = vec![
            agent("a", false),
            agent("b", false),
            agent("c", false),
            agent("d", false),
        ];

        // Roster > 3 makes the classifier verdict complex
        let plan = builder.build("quick check", &roster, &[]).await.unwrap();
        assert_eq!(plan.complexity, Complexity::Complex);
        assert!(plan.activate_conductor);
    }

    #[tokio::test]
    async fn test_build_empty_roster_is_an_error() {
        let builder = PlanBuilder::new(Arc::new(StaticService { reply: None }));

        let err = builder.build("hello", &[], &[]).await.unwrap_err();
        assert!(matches!(err, EngineError::EmptyRoster));

        // Synthesis-only agents do not count
        let roster = vec![agent("conductor", true)];
        let err = builder.build("hello", &roster, &[]).await.unwrap_err();
        assert!(matches!(err, EngineError::EmptyRoster));
    }
}
