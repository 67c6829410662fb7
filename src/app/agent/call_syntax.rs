//! Textual tool-call protocol embedded in model output.
//!
//! Grammar (one marker, no nesting):
//!
//! ```text
//! marker := "[TOOL_CALL:" ws* name "(" args? ")]"
//! name   := [A-Za-z_][A-Za-z0-9_]*
//! args   := JSON object literal
//! ```
//!
//! Extraction and cleaning share `find_marker`, so they always agree on
//! where a marker starts and ends. An argument that opens with `{` is read as
//! one JSON value, so `)]` inside a string does not end the marker.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::de::IgnoredAny;
use serde::Serialize;
use serde_json::Value as JsonValue;
use std::ops::Range;

static MARKER_OPEN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\[TOOL_CALL:\s*([A-Za-z_][A-Za-z0-9_]*)\(")
        .expect("tool call pattern is a valid regex")
});

static MARKER_CLOSE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*\)\]").expect("tool call close pattern is a valid regex"));

static BLANK_RUNS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\n[ \t]*\n(?:[ \t]*\n)+").expect("blank-run pattern is a valid regex"));

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolCall {
    pub name: String,
    pub args: JsonValue,
}

/// One marker's location and its unparsed pieces.
struct Marker<'t> {
    span: Range<usize>,
    name: &'t str,
    raw_args: &'t str,
}

/// First marker starting at or after `from`. An opening with no closing `)]`
/// is not a marker.
fn find_marker(text: &str, from: usize) -> Option<Marker<'_>> {
    let mut search = from;
    loop {
        let caps = MARKER_OPEN.captures_at(text, search)?;
        let open = caps.get(0)?;
        let name = caps.get(1)?.as_str();
        if let Some((args_end, end)) = marker_end(text, open.end()) {
            return Some(Marker {
                span: open.start()..end,
                name,
                raw_args: &text[open.end()..args_end],
            });
        }
        search = open.end();
    }
}

/// Returns `(end of arguments, end of marker)` for arguments starting at `start`.
fn marker_end(text: &str, start: usize) -> Option<(usize, usize)> {
    let rest = &text[start..];
    let trimmed = rest.trim_start();
    if trimmed.starts_with('{') {
        let offset = start + (rest.len() - trimmed.len());
        let mut values = serde_json::Deserializer::from_str(trimmed).into_iter::<IgnoredAny>();
        if let Some(Ok(_)) = values.next() {
            let args_end = offset + values.byte_offset();
            if let Some(close) = MARKER_CLOSE.find(&text[args_end..]) {
                return Some((args_end, args_end + close.end()));
            }
        }
    }
    rest.find(")]").map(|i| (start + i, start + i + 2))
}

/// Lazy left-to-right scan over the markers in one piece of text.
///
/// Malformed markers are logged and skipped; the scan carries on after them.
/// Calling [`scan_tool_calls`] again on the same text restarts from the top.
pub struct ToolCalls<'t> {
    text: &'t str,
    pos: usize,
}

impl Iterator for ToolCalls<'_> {
    type Item = ToolCall;

    fn next(&mut self) -> Option<ToolCall> {
        loop {
            let marker = find_marker(self.text, self.pos)?;
            self.pos = marker.span.end;
            if let Some(call) = parse_marker(&marker) {
                return Some(call);
            }
        }
    }
}

pub fn scan_tool_calls(text: &str) -> ToolCalls<'_> {
    ToolCalls { text, pos: 0 }
}

pub fn extract_tool_calls(text: &str) -> Vec<ToolCall> {
    scan_tool_calls(text).collect()
}

pub fn contains_tool_call(text: &str) -> bool {
    find_marker(text, 0).is_some()
}

fn parse_marker(marker: &Marker<'_>) -> Option<ToolCall> {
    let name = marker.name;
    let raw_args = marker.raw_args.trim();

    if raw_args.is_empty() {
        return Some(ToolCall {
            name: name.to_string(),
            args: JsonValue::Object(Default::default()),
        });
    }

    match serde_json::from_str::<JsonValue>(raw_args) {
        Ok(args @ JsonValue::Object(_)) => Some(ToolCall {
            name: name.to_string(),
            args,
        }),
        Ok(_) => {
            tracing::warn!(tool = name, "Skipping tool call: arguments are not a JSON object");
            None
        }
        Err(e) => {
            tracing::warn!(tool = name, error = %e, "Skipping tool call: malformed JSON arguments");
            None
        }
    }
}

/// Removes every marker, well-formed or not, leaving the prose for display.
pub fn strip_tool_calls(text: &str) -> String {
    let mut stripped = String::with_capacity(text.len());
    let mut pos = 0;
    while let Some(marker) = find_marker(text, pos) {
        stripped.push_str(&text[pos..marker.span.start]);
        pos = marker.span.end;
    }
    stripped.push_str(&text[pos..]);
    let collapsed = BLANK_RUNS.replace_all(&stripped, "\n\n");
    collapsed.trim().to_string()
}

/// Renders a call in marker syntax, e.g. for prompt examples.
pub fn format_tool_call(name: &str, args: &JsonValue) -> String {
    format!("[TOOL_CALL: {}({})]", name, args)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_extracts_calls_in_order() {
        let text = r#"Sure. [TOOL_CALL: createTask({"title": "Ship spec", "priority": 3})]
Then [TOOL_CALL: listTasks({})] and [TOOL_CALL: rememberFact({"fact": "likes tea"})]"#;
        let calls = extract_tool_calls(text);
        let names: Vec<&str> = calls.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["createTask", "listTasks", "rememberFact"]);
        assert_eq!(calls[0].args, json!({"title": "Ship spec", "priority": 3}));
        assert_eq!(calls[1].args, json!({}));
    }

    #[test]
    fn test_empty_parens_mean_empty_object() {
        let calls = extract_tool_calls("[TOOL_CALL: listTasks()]");
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].args, json!({}));
    }

    #[test]
    fn test_nested_objects_and_multiline_args() {
        let text = "[TOOL_CALL: createTask({\n  \"title\": \"a\",\n  \"tags\": {\"k\": [1, 2]}\n})]";
        let calls = extract_tool_calls(text);
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].args["tags"]["k"], json!([1, 2]));
    }

    #[test]
    fn test_malformed_marker_is_skipped_not_fatal() {
        let text = r#"[TOOL_CALL: a({"x": 1})] [TOOL_CALL: b({x: oops})] [TOOL_CALL: c({"y": 2})]"#;
        let calls = extract_tool_calls(text);
        let names: Vec<&str> = calls.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["a", "c"]);
    }

    #[test]
    fn test_non_object_arguments_are_skipped() {
        assert!(extract_tool_calls(r#"[TOOL_CALL: a([1, 2])]"#).is_empty());
        assert!(extract_tool_calls(r#"[TOOL_CALL: a("text")]"#).is_empty());
    }

    #[test]
    fn test_strip_removes_every_marker() {
        let text = "Done!\n\n[TOOL_CALL: a({\"x\": 1})]\n\n\n[TOOL_CALL: b({bad})]\nAnything else?";
        let cleaned = strip_tool_calls(text);
        assert!(!cleaned.contains("[TOOL_CALL:"));
        assert_eq!(cleaned, "Done!\n\nAnything else?");
    }

    #[test]
    fn test_close_sequence_inside_json_string() {
        let text = r#"Adding it. [TOOL_CALL: createTask({"title": "Fix (a)] now"})] Anything else?"#;
        let calls = extract_tool_calls(text);
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].args["title"], "Fix (a)] now");
        assert_eq!(strip_tool_calls(text), "Adding it.  Anything else?");
    }

    #[test]
    fn test_unclosed_marker_is_left_in_prose() {
        let text = "See [TOOL_CALL: a({\"x\": 1} for details";
        assert!(!contains_tool_call(text));
        assert_eq!(strip_tool_calls(text), text);
    }

    #[test]
    fn test_scan_restarts() {
        let text = r#"[TOOL_CALL: a({})] [TOOL_CALL: b({})]"#;
        let mut first = scan_tool_calls(text);
        assert_eq!(first.next().map(|c| c.name), Some("a".to_string()));
        let again: Vec<String> = scan_tool_calls(text).map(|c| c.name).collect();
        assert_eq!(again, vec!["a", "b"]);
    }

    #[test]
    fn test_format_round_trips_through_scanner() {
        let marker = format_tool_call("createGoal", &json!({"title": "Run 10k"}));
        assert!(contains_tool_call(&marker));
        assert_eq!(extract_tool_calls(&marker)[0].args["title"], "Run 10k");
    }
}
