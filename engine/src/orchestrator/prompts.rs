//! Prompt templating
//!
//! Every prompt string is a pure function of its inputs, kept apart from
//! network and parsing code so the wording can be unit-tested without a live
//! completion service.

use crate::db::MemoryRecord;
use crate::orchestrator::types::ParsedAgentResponse;
use sdk::types::{AgentDescriptor, ConversationTurn, Phase, TurnRole};

/// Conversation turns included verbatim in the planning prompt
pub const PLANNING_HISTORY_TURNS: usize = 5;

/// Per-response excerpt length in the prior-responses digest
const DIGEST_SNIPPET_CHARS: usize = 280;

/// History excerpt length in the planning prompt
const HISTORY_SNIPPET_CHARS: usize = 200;

/// System prompt for the planning call
pub fn planning_system_prompt() -> &'static str {
    "You are the deliberation conductor. Given a user message and a roster of \
     agents, decide which agents should speak, in what order, and with what \
     task.\n\
     Output ONLY a JSON object with these fields:\n\
     - \"goals\": array of short discussion goals\n\
     - \"assignedAgents\": array of {\"agentKey\": string, \"task\": string, \"priority\": number} \
     — pick 2-4 agents, priority 1 speaks first\n\
     - \"expectedRounds\": number of rounds the discussion needs\n\
     - \"conductorNotes\": brief internal notes\n\
     - \"shouldActivateConductor\": whether a closing synthesis is worth producing\n\n\
     Output ONLY the JSON object, no markdown, no explanation."
}

/// User prompt for the planning call: assignable roster, recent history, and
/// the message under discussion
pub fn planning_user_prompt(
    message: &str,
    roster: &[&AgentDescriptor],
    history: &[ConversationTurn],
) -> String {
    let mut prompt = String::from("Available agents:\n");
    for agent in roster {
        prompt.push_str(&format!(
            "- {} ({}): specialty {}, style {}\n",
            agent.key,
            agent.name,
            if agent.specialty.is_empty() {
                "general"
            } else {
                &agent.specialty
            },
            if agent.decision_style.is_empty() {
                "unspecified"
            } else {
                &agent.decision_style
            },
        ));
    }

    let recent: Vec<&ConversationTurn> = history
        .iter()
        .rev()
        .take(PLANNING_HISTORY_TURNS)
        .collect();
    if !recent.is_empty() {
        prompt.push_str("\nRecent conversation (most recent first):\n");
        for turn in recent {
            let role = match turn.role {
                TurnRole::User => "user",
                TurnRole::Assistant => "assistant",
            };
            prompt.push_str(&format!(
                "[{}] {}\n",
                role,
                truncate(&turn.content, HISTORY_SNIPPET_CHARS)
            ));
        }
    }

    prompt.push_str("\nUser message:\n");
    prompt.push_str(message);
    prompt
}

/// Phase-specific instruction block
pub fn phase_instructions(phase: Phase) -> &'static str {
    match phase {
        Phase::Proposal => {
            "This is the proposal phase. Put forward your own position on the \
             question. Commit to a concrete recommendation rather than listing \
             options, and say what evidence would change your mind."
        }
        Phase::Critique => {
            "This is the critique phase. Challenge the positions already on the \
             table: name specific flaws, risks, and blind spots. Do not restate \
             your own proposal — engage with what the others said."
        }
        Phase::Reconciliation => {
            "This is the reconciliation phase. Weigh the proposals and critiques \
             so far, concede points where the critique was right, and converge \
             on the single path you would actually commit to."
        }
    }
}

/// Fixed output contract appended to every agent prompt
pub fn output_contract() -> &'static str {
    "End your reply with a single JSON object on its own line:\n\
     {\"stance\": \"<one sentence>\", \"key_points\": [\"...\"], \
     \"confidence\": <0.0-1.0>, \"tradeoffs\": [\"...\"], \
     \"next_action\": \"<concrete next step, or empty>\"}\n\
     Never begin your reply with a self-introduction or your own name."
}

/// Full system prompt for one agent execution
pub fn agent_system_prompt(
    agent: &AgentDescriptor,
    phase: Phase,
    task: &str,
    memories: &[MemoryRecord],
    project_context: Option<&str>,
) -> String {
    let mut prompt = String::with_capacity(1024);
    prompt.push_str(&agent.role_instructions);

    if !agent.decision_style.is_empty() {
        prompt.push_str(&format!("\n\nDecision style: {}", agent.decision_style));
    }

    if !agent.priorities.is_empty() {
        prompt.push_str("\nPriorities, highest first:");
        for (i, priority) in agent.priorities.iter().enumerate() {
            prompt.push_str(&format!("\n{}. {}", i + 1, priority));
        }
    }

    if let Some(bias) = &agent.bias_note {
        prompt.push_str(&format!("\nKnown bias to watch for: {}", bias));
    }

    if let Some(context) = project_context {
        if !context.is_empty() {
            prompt.push_str("\n\n--- Project Context ---\n");
            prompt.push_str(context);
        }
    }

    if !memories.is_empty() {
        prompt.push_str("\n\n--- What you remember ---\n");
        for memory in memories {
            prompt.push_str(&format!(
                "- [{}] {}\n",
                memory.kind.as_str(),
                memory.content
            ));
        }
    }

    prompt.push_str("\n\n");
    prompt.push_str(phase_instructions(phase));

    prompt.push_str("\n\nYour task: ");
    prompt.push_str(task);

    if agent.allowed_tools.is_empty() {
        prompt.push_str("\n\nYou have no tools available this turn.");
    } else {
        prompt.push_str(&format!(
            "\n\nYou may request these tools by writing [TOOL: name] followed by \
             what you need, on its own line: {}",
            agent.allowed_tools.join(", ")
        ));
    }

    prompt.push_str("\n\n");
    prompt.push_str(output_contract());

    prompt
}

/// Synthetic message summarizing responses already produced this round, so
/// later agents react to earlier ones
pub fn prior_responses_digest(responses: &[ParsedAgentResponse]) -> String {
    let mut digest = String::from("Responses so far this round:\n");
    for response in responses {
        let excerpt = if response.content.is_empty() {
            &response.stance
        } else {
            &response.content
        };
        digest.push_str(&format!(
            "{}: {}\n",
            response.agent_name,
            truncate(excerpt, DIGEST_SNIPPET_CHARS)
        ));
    }
    digest.push_str("React to these positions where relevant.");
    digest
}

/// System prompt for the synthesis call
pub fn synthesis_system_prompt() -> &'static str {
    "You summarize a multi-agent deliberation for the user. In 2-3 sentences, \
     state where the agents agree, the sharpest open tension between them, and \
     one concrete next step. No preamble, no bullet points."
}

/// User prompt for the synthesis call
pub fn synthesis_user_prompt(goals: &[String], responses: &[ParsedAgentResponse]) -> String {
    let mut prompt = String::new();
    if !goals.is_empty() {
        prompt.push_str(&format!("Discussion goals: {}\n\n", goals.join("; ")));
    }
    for response in responses {
        prompt.push_str(&format!(
            "{} (confidence {:.2}): {}\n",
            response.agent_name,
            response.confidence,
            truncate(
                if response.stance.is_empty() {
                    &response.content
                } else {
                    &response.stance
                },
                DIGEST_SNIPPET_CHARS
            )
        ));
    }
    prompt
}

/// Truncate on a char boundary, appending an ellipsis when content was cut
pub(crate) fn truncate(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        return s.to_string();
    }
    let cut: String = s.chars().take(max_chars).collect();
    format!("{}…", cut.trim_end())
}
