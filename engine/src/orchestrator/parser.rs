//! Response Parser
//!
//! Turns raw completion text into a typed `ParsedAgentResponse`: strips
//! formulaic self-introductions, pulls out the embedded structured block, and
//! extracts inline tool markers. Parsing is total — malformed input degrades
//! to defaults, it never errors.

use crate::orchestrator::types::{
    ParsedAgentResponse, ToolCallRequest, ToolCallStatus, DEFAULT_CONFIDENCE,
};
use regex::Regex;
use serde_json::Value;
use std::collections::BTreeMap;

/// Name-specific stripping rules. `{name}` is replaced with the escaped agent
/// display name before compilation. All rules are anchored at the start of the
/// text so non-leading name mentions are never touched.
const NAME_RULE_TEMPLATES: &[&str] = &[
    // "Sarah: ..." / "Sarah, ..."
    r"(?i)^\s*\{name\}\s*[,:]\s*",
    // "I am Sarah, ..." / "this is Sarah." / "c'est Sarah, ..."
    r"(?i)^\s*(?:i\s+am|i'm|this\s+is|it's|c'est)\s+\{name\}\b[\s,.:!-]*",
    // "Sarah here - ..."
    r"(?i)^\s*\{name\}\s+here\b[\s,.:!-]*",
    // "According to Sarah, ..."
    r"(?i)^\s*according\s+to\s+\{name\}(?:'s)?\s*[,:]?\s*",
    // "From Sarah's perspective, ..."
    r"(?i)^\s*from\s+\{name\}(?:'s)?\s+(?:perspective|point\s+of\s+view)\s*[,:]?\s*",
];

/// Name-agnostic stripping rules, applied alongside the name rules in the
/// same fixed-point loop.
const GENERIC_RULE_PATTERNS: &[&str] = &[
    // "Hello team!" / "Bonjour," / "Hi everyone."
    r"(?i)^\s*(?:hello|hi|hey|greetings|bonjour|salut)(?:\s+(?:team|everyone|all|folks))?\s*[!,.:]\s*",
    // "As a security engineer, ..."
    r"(?i)^\s*as\s+an?\s+[^,.!?\n]{1,60},\s*",
];

/// Inline tool marker: `[TOOL: name] free-text-args`
const TOOL_MARKER_PATTERN: &str = r"\[TOOL:\s*([A-Za-z0-9_.\-]+)\]([^\n\[]*)";

/// Start of a structured block worth attempting to parse
const STRUCTURED_START_PATTERN: &str = r#"\{\s*"(?:stance|key_points|keyPoints)""#;

/// Parser for raw agent completion text
pub struct ResponseParser {
    generic_rules: Vec<Regex>,
    tool_marker: Regex,
    structured_start: Regex,
}

impl Default for ResponseParser {
    fn default() -> Self {
        Self::new()
    }
}

impl ResponseParser {
    pub fn new() -> Self {
        let generic_rules = GENERIC_RULE_PATTERNS
            .iter()
            .filter_map(|p| Regex::new(p).ok())
            .collect();

        Self {
            generic_rules,
            // Fixed literal patterns; compilation cannot fail
            tool_marker: Regex::new(TOOL_MARKER_PATTERN).expect("tool marker pattern compiles"),
            structured_start: Regex::new(STRUCTURED_START_PATTERN)
                .expect("structured start pattern compiles"),
        }
    }

    /// Parse raw completion text into a typed response
    pub fn parse(&self, raw: &str, agent_key: &str, agent_name: &str) -> ParsedAgentResponse {
        let stripped = self.strip_self_introductions(raw, agent_name);
        let (structured, remaining) = self.extract_structured(&stripped);
        let (tool_calls, remaining) = self.extract_tool_calls(&remaining);

        ParsedAgentResponse {
            agent_key: agent_key.to_string(),
            agent_name: agent_name.to_string(),
            content: remaining.trim().to_string(),
            stance: structured.stance,
            key_points: structured.key_points,
            confidence: structured.confidence,
            tradeoffs: structured.tradeoffs,
            next_action: structured.next_action,
            tool_calls,
        }
    }

    /// Remove stacked leading self-introductions.
    ///
    /// Rules are applied in a fixed-point loop: intros can stack ("Hello
    /// team! Sarah here, ..."), so a single pass is not enough. Every rule
    /// consumes at least one character when it fires, so the loop terminates,
    /// and re-running on already-clean text is a no-op.
    pub fn strip_self_introductions(&self, text: &str, agent_name: &str) -> String {
        let name_rules = self.compile_name_rules(agent_name);
        let mut current = text.to_string();

        loop {
            let mut changed = false;
            for rule in self.generic_rules.iter().chain(name_rules.iter()) {
                if let Some(m) = rule.find(&current) {
                    if m.end() > 0 {
                        current = current[m.end()..].to_string();
                        changed = true;
                    }
                }
            }
            if !changed {
                break;
            }
        }

        current
    }

    fn compile_name_rules(&self, agent_name: &str) -> Vec<Regex> {
        let name = agent_name.trim();
        if name.is_empty() {
            return Vec::new();
        }

        let escaped = regex::escape(name);
        NAME_RULE_TEMPLATES
            .iter()
            .filter_map(|template| {
                let pattern = template.replace(r"\{name\}", &escaped);
                Regex::new(&pattern).ok()
            })
            .collect()
    }

    /// Pull the first embedded structured block out of the text.
    ///
    /// Candidates are balanced-brace objects whose leading key is `stance` or
    /// `key_points`; the first one that parses wins and its span is removed
    /// from the visible content. Anything malformed keeps the defaults.
    fn extract_structured(&self, text: &str) -> (StructuredFields, String) {
        for m in self.structured_start.find_iter(text) {
            let candidate = &text[m.start()..];
            let Some(span) = extract_balanced_object(candidate) else {
                continue;
            };
            let Ok(value) = serde_json::from_str::<Value>(span) else {
                continue;
            };
            let Some(obj) = value.as_object() else {
                continue;
            };

            let fields = StructuredFields {
                stance: str_field(obj.get("stance")),
                key_points: list_field(obj.get("key_points").or_else(|| obj.get("keyPoints"))),
                confidence: obj
                    .get("confidence")
                    .and_then(Value::as_f64)
                    .filter(|c| (0.0..=1.0).contains(c))
                    .unwrap_or(DEFAULT_CONFIDENCE),
                tradeoffs: list_field(obj.get("tradeoffs").or_else(|| obj.get("trade_offs"))),
                next_action: str_field(obj.get("next_action").or_else(|| obj.get("nextAction"))),
            };

            let mut remaining = String::with_capacity(text.len() - span.len());
            remaining.push_str(&text[..m.start()]);
            remaining.push_str(&text[m.start() + span.len()..]);

            return (fields, remaining);
        }

        (StructuredFields::default(), text.to_string())
    }

    /// Extract every `[TOOL: name] args` marker into a pending request.
    ///
    /// Lossless in count: one marker, one request. Matched marker text is
    /// removed from the visible content.
    fn extract_tool_calls(&self, text: &str) -> (Vec<ToolCallRequest>, String) {
        let mut calls = Vec::new();

        for caps in self.tool_marker.captures_iter(text) {
            let tool = caps
                .get(1)
                .map(|m| m.as_str().to_string())
                .unwrap_or_default();
            let context = caps
                .get(2)
                .map(|m| m.as_str().trim().to_string())
                .unwrap_or_default();

            let mut arguments = BTreeMap::new();
            arguments.insert("context".to_string(), Value::String(context));

            calls.push(ToolCallRequest {
                id: format!("call_{}", uuid::Uuid::new_v4()),
                tool,
                arguments,
                status: ToolCallStatus::Pending,
            });
        }

        let remaining = self.tool_marker.replace_all(text, "").to_string();

        (calls, remaining)
    }
}

/// Structured fields with their defaults applied
struct StructuredFields {
    stance: String,
    key_points: Vec<String>,
    confidence: f64,
    tradeoffs: Vec<String>,
    next_action: String,
}

impl Default for StructuredFields {
    fn default() -> Self {
        Self {
            stance: String::new(),
            key_points: Vec::new(),
            confidence: DEFAULT_CONFIDENCE,
            tradeoffs: Vec::new(),
            next_action: String::new(),
        }
    }
}

fn str_field(value: Option<&Value>) -> String {
    value
        .and_then(Value::as_str)
        .map(str::trim)
        .unwrap_or_default()
        .to_string()
}

fn list_field(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(Value::as_str)
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect(),
        // A bare string counts as a single-item list
        Some(Value::String(s)) if !s.trim().is_empty() => vec![s.trim().to_string()],
        _ => Vec::new(),
    }
}

/// Extract a balanced JSON object starting at position 0 of `s`.
///
/// Counts `{` / `}` depth, respecting string literals, to find the matching
/// close brace.
pub(crate) fn extract_balanced_object(s: &str) -> Option<&str> {
    if !s.starts_with('{') {
        return None;
    }
    let mut depth = 0i32;
    let mut in_string = false;
    let mut escape_next = false;

    for (i, ch) in s.char_indices() {
        if escape_next {
            escape_next = false;
            continue;
        }
        match ch {
            '\\' if in_string => escape_next = true,
            '"' => in_string = !in_string,
            '{' if !in_string => depth += 1,
            '}' if !in_string => {
                depth -= 1;
                if depth == 0 {
                    return Some(&s[..=i]);
                }
            }
            _ => {}
        }
    }
    None
}

/// Find the first balanced object in `text` that parses as JSON.
///
/// Used by the planner to dig the plan object out of prose-wrapped output.
pub(crate) fn first_json_object(text: &str) -> Option<&str> {
    let mut search_from = 0;
    while let Some(offset) = text[search_from..].find('{') {
        let start = search_from + offset;
        if let Some(span) = extract_balanced_object(&text[start..]) {
            if serde_json::from_str::<Value>(span)
                .map(|v| v.is_object())
                .unwrap_or(false)
            {
                return Some(span);
            }
        }
        search_from = start + 1;
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parser() -> ResponseParser {
        ResponseParser::new()
    }

    #[test]
    fn test_strip_simple_name_prefix() {
        let p = parser();
        let out = p.strip_self_introductions("Sarah: I think we should wait.", "Sarah");
        assert_eq!(out, "I think we should wait.");
    }

    #[test]
    fn test_strip_french_stacked_intro() {
        let p = parser();
        let out = p.strip_self_introductions("Bonjour, c'est Sarah, je pense que...", "Sarah");
        assert_eq!(out, "je pense que...");
    }

    #[test]
    fn test_strip_hello_team_stacked() {
        let p = parser();
        let out = p.strip_self_introductions("Hello team! Sarah here, let's dig in.", "Sarah");
        assert_eq!(out, "let's dig in.");
    }

    #[test]
    fn test_strip_as_a_role() {
        let p = parser();
        let out = p.strip_self_introductions("As a security engineer, I'd flag the token flow.", "Kenji");
        assert_eq!(out, "I'd flag the token flow.");
    }

    #[test]
    fn test_strip_is_idempotent() {
        let p = parser();
        let inputs = [
            "Bonjour, c'est Sarah, je pense que...",
            "Sarah: Sarah agrees with Sarah.",
            "plain text with no intro",
            "",
            "Hello team! I am Sarah, this is Sarah. done",
        ];
        for input in inputs {
            let once = p.strip_self_introductions(input, "Sarah");
            let twice = p.strip_self_introductions(&once, "Sarah");
            assert_eq!(once, twice, "not idempotent for {:?}", input);
        }
    }

    #[test]
    fn test_strip_keeps_non_leading_name() {
        let p = parser();
        let out = p.strip_self_introductions("I agree with Sarah on the rollout.", "Sarah");
        assert_eq!(out, "I agree with Sarah on the rollout.");
    }

    #[test]
    fn test_strip_escapes_regex_metacharacters_in_name() {
        let p = parser();
        let out = p.strip_self_introductions("A.I. (beta): my take is simple.", "A.I. (beta)");
        assert_eq!(out, "my take is simple.");
    }

    #[test]
    fn test_parse_extracts_structured_block() {
        let p = parser();
        let raw = concat!(
            "We should ship behind a flag.\n",
            r#"{"stance": "Ship gated", "key_points": ["low risk", "fast rollback"], "confidence": 0.85, "tradeoffs": ["slower full launch"], "next_action": "Create the flag"}"#
        );
        let resp = p.parse(raw, "pm", "Priya");

        assert_eq!(resp.content, "We should ship behind a flag.");
        assert_eq!(resp.stance, "Ship gated");
        assert_eq!(resp.key_points, vec!["low risk", "fast rollback"]);
        assert!((resp.confidence - 0.85).abs() < 1e-9);
        assert_eq!(resp.tradeoffs, vec!["slower full launch"]);
        assert_eq!(resp.next_action, "Create the flag");
    }

    #[test]
    fn test_parse_missing_block_keeps_defaults() {
        let p = parser();
        let resp = p.parse("Just prose, no JSON here.", "pm", "Priya");

        assert_eq!(resp.content, "Just prose, no JSON here.");
        assert_eq!(resp.stance, "");
        assert!(resp.key_points.is_empty());
        assert!((resp.confidence - DEFAULT_CONFIDENCE).abs() < f64::EPSILON);
    }

    #[test]
    fn test_parse_malformed_block_keeps_defaults() {
        let p = parser();
        let raw = r#"Thoughts. {"stance": "truncated, never closed"#;
        let resp = p.parse(raw, "pm", "Priya");

        assert_eq!(resp.stance, "");
        assert!((resp.confidence - DEFAULT_CONFIDENCE).abs() < f64::EPSILON);
        // Unparseable text stays visible rather than silently vanishing
        assert!(resp.content.contains("Thoughts."));
    }

    #[test]
    fn test_parse_out_of_range_confidence_resets_to_default() {
        let p = parser();
        let raw = r#"{"stance": "sure", "key_points": [], "confidence": 7.5}"#;
        let resp = p.parse(raw, "pm", "Priya");
        assert!((resp.confidence - DEFAULT_CONFIDENCE).abs() < f64::EPSILON);

        let raw = r#"{"stance": "sure", "key_points": [], "confidence": -0.2}"#;
        let resp = p.parse(raw, "pm", "Priya");
        assert!((resp.confidence - DEFAULT_CONFIDENCE).abs() < f64::EPSILON);
    }

    #[test]
    fn test_parse_handles_nested_braces_in_strings() {
        let p = parser();
        let raw = r#"Check this. {"stance": "use {braces} carefully", "key_points": ["a } inside"]}"#;
        let resp = p.parse(raw, "pm", "Priya");

        assert_eq!(resp.stance, "use {braces} carefully");
        assert_eq!(resp.key_points, vec!["a } inside"]);
        assert_eq!(resp.content, "Check this.");
    }

    #[test]
    fn test_tool_extraction_count_and_removal() {
        let p = parser();
        let raw = "Do it. [TOOL: create_task] Set up the flag\nThen [TOOL: notify_squad] rollout starts";
        let resp = p.parse(raw, "pm", "Priya");

        assert_eq!(resp.tool_calls.len(), 2);
        assert_eq!(resp.tool_calls[0].tool, "create_task");
        assert_eq!(
            resp.tool_calls[0].arguments.get("context").unwrap(),
            "Set up the flag"
        );
        assert_eq!(resp.tool_calls[1].tool, "notify_squad");
        assert!(!resp.content.contains("[TOOL:"));
        assert_eq!(resp.tool_calls[0].status, ToolCallStatus::Pending);
    }

    #[test]
    fn test_tool_ids_are_unique() {
        let p = parser();
        let raw = "[TOOL: a] x [TOOL: a] x";
        let resp = p.parse(raw, "pm", "Priya");
        assert_eq!(resp.tool_calls.len(), 2);
        assert_ne!(resp.tool_calls[0].id, resp.tool_calls[1].id);
    }

    #[test]
    fn test_parse_empty_input() {
        let p = parser();
        let resp = p.parse("", "pm", "Priya");
        assert_eq!(resp.content, "");
        assert!(resp.tool_calls.is_empty());
        assert!((resp.confidence - DEFAULT_CONFIDENCE).abs() < f64::EPSILON);
    }

    #[test]
    fn test_parse_pure_json_input() {
        let p = parser();
        let raw = r#"{"stance": "only json", "key_points": ["one"]}"#;
        let resp = p.parse(raw, "pm", "Priya");
        assert_eq!(resp.content, "");
        assert_eq!(resp.stance, "only json");
    }

    #[test]
    fn test_first_json_object_in_prose() {
        let text = "Sure! Here's the plan: {\"goals\": [\"a\"], \"expectedRounds\": 1} hope that helps";
        let span = first_json_object(text).unwrap();
        assert!(span.starts_with('{'));
        assert!(span.ends_with('}'));
        let value: Value = serde_json::from_str(span).unwrap();
        assert!(value.get("goals").is_some());
    }

    #[test]
    fn test_first_json_object_skips_unbalanced() {
        assert!(first_json_object("{ not json").is_none());
        assert!(first_json_object("no braces at all").is_none());
    }

    #[test]
    fn test_balanced_object_respects_escapes() {
        let s = r#"{"a": "quote \" and brace }", "b": 1} trailing"#;
        let span = extract_balanced_object(s).unwrap();
        assert!(serde_json::from_str::<Value>(span).is_ok());
    }
}
