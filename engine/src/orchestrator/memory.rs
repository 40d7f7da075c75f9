//! Memory Store Adapter
//!
//! Extracts durable fragments from a turn's responses and persists them.
//! Extraction is a pure function of the response set so the same responses
//! always yield the same memory contents; only persistence touches the
//! database, and its failure never fails the turn.

use crate::db::{MemoryKind, MemoryRecord, MemoryRepository, NewMemory};
use crate::orchestrator::types::ParsedAgentResponse;
use tracing::warn;

/// Key points shorter than this carry too little signal to keep
const FACT_MIN_CHARS: usize = 20;

/// Stances shorter than this are not worth remembering as a preference
const PREFERENCE_MIN_CHARS: usize = 10;

/// Fixed importance for preference memories
const PREFERENCE_IMPORTANCE: f64 = 0.6;

/// Derive memory fragments from the turn's responses.
///
/// Key points become facts at the response's confidence; a long-enough stance
/// becomes a preference at fixed importance. Pure: ids and timestamps are
/// assigned at insert time.
pub fn extract_memories(
    responses: &[ParsedAgentResponse],
    user_id: &str,
    squad_id: Option<&str>,
) -> Vec<NewMemory> {
    let mut memories = Vec::new();

    for response in responses {
        for point in &response.key_points {
            if point.chars().count() > FACT_MIN_CHARS {
                memories.push(NewMemory {
                    agent_key: response.agent_key.clone(),
                    user_id: user_id.to_string(),
                    squad_id: squad_id.map(str::to_string),
                    kind: MemoryKind::Fact,
                    content: point.clone(),
                    importance: response.confidence,
                });
            }
        }

        if response.stance.chars().count() > PREFERENCE_MIN_CHARS {
            memories.push(NewMemory {
                agent_key: response.agent_key.clone(),
                user_id: user_id.to_string(),
                squad_id: squad_id.map(str::to_string),
                kind: MemoryKind::Preference,
                content: response.stance.clone(),
                importance: PREFERENCE_IMPORTANCE,
            });
        }
    }

    memories
}

/// Persists extracted memories, swallowing storage failures
pub struct MemoryWriter {
    repo: MemoryRepository,
}

impl MemoryWriter {
    pub fn new(repo: MemoryRepository) -> Self {
        Self { repo }
    }

    /// Batch-insert the fragments. Storage failure is logged and yields an
    /// empty list — memory persistence must not fail the turn.
    pub async fn persist(&self, memories: &[NewMemory]) -> Vec<MemoryRecord> {
        if memories.is_empty() {
            return Vec::new();
        }

        match self.repo.insert_many(memories).await {
            Ok(records) => records,
            Err(e) => {
                warn!("Memory persistence failed: {}", e);
                Vec::new()
            }
        }
    }
}
