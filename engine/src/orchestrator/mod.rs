//! Deliberation Orchestrator
//!
//! Plans which agents speak, executes them in order against the completion
//! service, parses their output, and persists memories, actions, and the
//! session record.

pub mod driver;
pub mod executor;
pub mod memory;
pub mod parser;
pub mod planner;
pub mod prompts;
pub mod recorder;
pub mod synthesis;
pub mod types;

pub use driver::Orchestrator;
pub use executor::AgentExecutor;
pub use memory::{extract_memories, MemoryWriter};
pub use parser::ResponseParser;
pub use planner::{classify_complexity, PlanBuilder};
pub use recorder::SessionRecorder;
pub use synthesis::SynthesisGenerator;
pub use types::{
    AgentAssignment, Complexity, DeliberationResult, OrchestrationPlan, ParsedAgentResponse,
    RoundOutput, ToolCallRequest, ToolCallStatus,
};
