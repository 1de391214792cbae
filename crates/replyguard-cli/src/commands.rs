//! Subcommand implementations

use anyhow::{Context, Result};
use replyguard_core::ModerationResult;
use replyguard_policy::{ModerationRequest, ModerationSession, Rule, RuleEngine, RuleSet};
use serde::Serialize;
use std::io::{Read, Write};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::config::CliConfig;

/// One line of streaming output
#[derive(Debug, Serialize)]
struct StreamEvent<'a> {
    phase: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    chunk: Option<usize>,
    #[serde(flatten)]
    result: &'a ModerationResult,
}

/// Read a request from `input`, or stdin when absent
pub fn read_request(input: Option<&Path>) -> Result<ModerationRequest> {
    let raw = match input {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read request from {}", path.display()))?,
        None => {
            let mut raw = String::new();
            std::io::stdin()
                .read_to_string(&mut raw)
                .context("Failed to read request from stdin")?;
            raw
        }
    };

    Ok(ModerationRequest::from_json(&raw)?)
}

/// Pick the rule set for a request.
///
/// The rules file is the authority unless the config prefers rules sent
/// inline and the request carries some.
pub fn resolve_rules(request: &mut ModerationRequest, config: &CliConfig) -> Result<RuleEngine> {
    if config.prefer_inline_rules {
        if let Some(rules) = request.rules.take() {
            debug!(rules = rules.len(), "Using inline rules");
            let shared: Arc<[Rule]> = rules.into();
            return Ok(RuleEngine::new(shared));
        }
    }

    let rules = RuleSet::from_file(&config.rules_path).with_context(|| {
        format!("Failed to load rules from {}", config.rules_path.display())
    })?;
    if rules.is_empty() {
        warn!(path = %config.rules_path.display(), "Rule set is empty, replies pass unmoderated");
    } else {
        info!(path = %config.rules_path.display(), rules = rules.len(), "Rules loaded");
    }

    Ok(RuleEngine::from(rules))
}

/// Moderate the whole draft in one pass and print the result
pub fn moderate(
    engine: &RuleEngine,
    request: &ModerationRequest,
    out: &mut impl Write,
) -> Result<ModerationResult> {
    let result = engine.evaluate(&request.user_state, &request.draft_reply);

    serde_json::to_writer_pretty(&mut *out, &result)?;
    writeln!(out)?;

    Ok(result)
}

/// Feed the draft to a session `chunk_size` characters at a time, printing
/// one JSON line per append and one for finalize
pub fn stream(
    engine: &RuleEngine,
    request: &ModerationRequest,
    chunk_size: usize,
    out: &mut impl Write,
) -> Result<ModerationResult> {
    let mut session: ModerationSession = engine.session(request.user_state.clone());

    for (index, chunk) in split_chunks(&request.draft_reply, chunk_size).enumerate() {
        let result = session.append(chunk);
        write_event(out, "append", Some(index), &result)?;

        if result.is_blocked() {
            break;
        }
    }

    let result = session.finalize();
    write_event(out, "finalize", None, &result)?;

    Ok(result)
}

fn write_event(
    out: &mut impl Write,
    phase: &'static str,
    chunk: Option<usize>,
    result: &ModerationResult,
) -> Result<()> {
    let event = StreamEvent {
        phase,
        chunk,
        result,
    };
    serde_json::to_writer(&mut *out, &event)?;
    writeln!(out)?;
    Ok(())
}

/// Split on character boundaries into pieces of at most `chunk_size` chars
fn split_chunks(text: &str, chunk_size: usize) -> impl Iterator<Item = &str> {
    let size = chunk_size.max(1);
    let mut rest = text;

    std::iter::from_fn(move || {
        if rest.is_empty() {
            return None;
        }
        let cut = rest
            .char_indices()
            .nth(size)
            .map_or(rest.len(), |(idx, _)| idx);
        let (head, tail) = rest.split_at(cut);
        rest = tail;
        Some(head)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use replyguard_core::{ModerationStatus, UserState};
    use std::io::Write as _;

    const RULES: &str = r#"[
        {"id": "rule_block", "type": "BLOCK_PHRASE", "params": {"phrases": ["guarantee"]}},
        {"id": "rule_rewrite", "type": "REWRITE_REGEX",
         "params": {"pattern": "\\d{3}-\\d{3}-\\d{4}", "replacement": "[REDACTED_PHONE]"}}
    ]"#;

    fn request(draft: &str) -> ModerationRequest {
        ModerationRequest {
            user_state: UserState::new(false, "NY", false),
            draft_reply: draft.to_string(),
            rules: None,
        }
    }

    fn engine() -> RuleEngine {
        RuleEngine::from(RuleSet::from_json(RULES).unwrap())
    }

    fn lines(out: &[u8]) -> Vec<serde_json::Value> {
        String::from_utf8_lossy(out)
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect()
    }

    #[test]
    fn test_split_chunks() {
        let parts: Vec<&str> = split_chunks("héllo wörld", 4).collect();
        assert_eq!(parts, vec!["héll", "o wö", "rld"]);
        assert_eq!(split_chunks("", 4).count(), 0);
    }

    #[test]
    fn test_moderate_prints_result() {
        let mut out = Vec::new();
        let result = moderate(&engine(), &request("Call 555-123-4567"), &mut out).unwrap();

        assert_eq!(result.status, ModerationStatus::Rewrite);
        let printed: serde_json::Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(printed["status"], "REWRITE");
        assert_eq!(printed["final_reply"], "Call [REDACTED_PHONE]");
    }

    #[test]
    fn test_stream_defers_rewrite() {
        let mut out = Vec::new();
        let result = stream(&engine(), &request("Call 555-123-4567"), 8, &mut out).unwrap();

        assert_eq!(result.final_reply, "Call [REDACTED_PHONE]");

        let events = lines(&out);
        assert_eq!(events.len(), 4);
        assert_eq!(events[0]["phase"], "append");
        assert_eq!(events[0]["final_reply"], "Call 555");
        assert_eq!(events[2]["final_reply"], "Call 555-123-4567");
        assert_eq!(events[3]["phase"], "finalize");
        assert_eq!(events[3]["status"], "REWRITE");
        assert!(events[3].get("chunk").is_none());
    }

    #[test]
    fn test_stream_stops_on_block() {
        let mut out = Vec::new();
        let result = stream(&engine(), &request("We guarantee a lot of things"), 4, &mut out).unwrap();

        assert!(result.is_blocked());

        let events = lines(&out);
        // "We g", "uara", "ntee" then finalize
        assert_eq!(events.len(), 4);
        assert_eq!(events[2]["status"], "BLOCK");
        assert_eq!(events[3]["status"], "BLOCK");
        assert_eq!(events[3]["applied_rules"][0], "rule_block");
    }

    #[test]
    fn test_rules_file_is_the_authority() {
        let mut rules_file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        rules_file.write_all(RULES.as_bytes()).unwrap();

        let config = CliConfig {
            rules_path: rules_file.path().to_path_buf(),
            ..CliConfig::default()
        };

        let mut req = request("hello");
        req.rules = Some(vec![Rule::max_length("inline", 1)]);

        let engine = resolve_rules(&mut req, &config).unwrap();
        assert_eq!(engine.rules().len(), 2);
        assert!(req.rules.is_some());
    }

    #[test]
    fn test_prefer_inline_rules() {
        let config = CliConfig {
            rules_path: "/nonexistent/rules.json".into(),
            prefer_inline_rules: true,
            ..CliConfig::default()
        };

        let mut req = request("hello");
        req.rules = Some(vec![Rule::max_length("inline", 1)]);

        let engine = resolve_rules(&mut req, &config).unwrap();
        assert_eq!(engine.rules()[0].id(), "inline");
        assert_eq!(engine.evaluate(&req.user_state, "hello").final_reply, "h");
    }

    #[test]
    fn test_empty_rules_file_allows_everything() {
        let mut rules_file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        rules_file.write_all(b"[]").unwrap();

        let config = CliConfig {
            rules_path: rules_file.path().to_path_buf(),
            ..CliConfig::default()
        };

        let engine = resolve_rules(&mut request("we guarantee it"), &config).unwrap();
        assert!(engine.rules().is_empty());

        let result = engine.evaluate(&UserState::new(false, "NY", false), "we guarantee it");
        assert_eq!(result.status, ModerationStatus::Allow);
    }

    #[test]
    fn test_missing_rules_file() {
        let config = CliConfig {
            rules_path: "/nonexistent/rules.json".into(),
            ..CliConfig::default()
        };

        assert!(resolve_rules(&mut request("hello"), &config).is_err());
    }
}
