//! Tool registry: lookup, prompt rendering and fault-isolated dispatch.

use crate::app::agent::call_syntax::ToolCall;
use crate::app::agent::tool::{ParamType, ToolDescriptor, ToolError};
use crate::storage::Store;
use serde::Serialize;
use serde_json::{json, Value as JsonValue};
use std::collections::HashMap;
use std::sync::Arc;

/// Result of one dispatched call, as folded back into the conversation.
#[derive(Debug, Clone, Serialize)]
pub struct ToolOutcome {
    pub name: String,
    pub args: JsonValue,
    pub result: JsonValue,
}

impl ToolOutcome {
    pub fn is_error(&self) -> bool {
        self.result.get("error").is_some()
    }
}

/// Insertion-ordered set of tools, built once at startup.
pub struct ToolRegistry {
    tools: Vec<Arc<ToolDescriptor>>,
    index: HashMap<&'static str, usize>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// Registers a tool. A tool with the same name is replaced in place.
    pub fn register(&mut self, tool: ToolDescriptor) {
        let name = tool.name();
        let tool = Arc::new(tool);
        match self.index.get(name) {
            Some(&pos) => self.tools[pos] = tool,
            None => {
                self.index.insert(name, self.tools.len());
                self.tools.push(tool);
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<&Arc<ToolDescriptor>> {
        self.index.get(name).map(|&pos| &self.tools[pos])
    }

    pub fn has_tool(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn tool_names(&self) -> Vec<&'static str> {
        self.tools.iter().map(|t| t.name()).collect()
    }

    pub fn tools(&self) -> impl Iterator<Item = &Arc<ToolDescriptor>> {
        self.tools.iter()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// One line per tool in registration order:
    /// `- name(req: type, opt?: type): description`
    pub fn render_prompt(&self) -> String {
        self.tools
            .iter()
            .map(|t| format!("- {}: {}", t.signature(), t.description()))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Executes one call. Never fails: unknown tools, bad arguments and handler
    /// errors all come back as `{"error": message}`.
    pub async fn dispatch(&self, store: &Store, call: &ToolCall) -> JsonValue {
        match self.try_dispatch(store, call).await {
            Ok(result) => result,
            Err(e) => {
                tracing::warn!(tool = %call.name, error = %e, "Tool call failed");
                json!({ "error": e.to_string() })
            }
        }
    }

    async fn try_dispatch(&self, store: &Store, call: &ToolCall) -> Result<JsonValue, ToolError> {
        let tool = self
            .get(&call.name)
            .ok_or_else(|| ToolError::NotFound(call.name.clone()))?;

        let args = call.args.as_object().ok_or_else(|| ToolError::InvalidArguments {
            tool: call.name.clone(),
        })?;
        for param in tool.params().iter().filter(|p| p.required) {
            let present = args.get(param.name).map_or(false, |v| match param.param_type {
                ParamType::String => v.as_str().map_or(!v.is_null(), |s| !s.trim().is_empty()),
                _ => !v.is_null(),
            });
            if !present {
                return Err(ToolError::MissingParameter {
                    tool: call.name.clone(),
                    param: param.name.to_string(),
                });
            }
        }

        tracing::info!(tool = %call.name, "Executing tool call");
        tool.handler()
            .call(store.clone(), call.args.clone())
            .await
            .map_err(|e| ToolError::Execution(e.to_string()))
    }

    /// Executes calls one after another in extraction order; a later call may
    /// depend on what an earlier one created.
    pub async fn dispatch_all(&self, store: &Store, calls: &[ToolCall]) -> Vec<ToolOutcome> {
        let mut outcomes = Vec::with_capacity(calls.len());
        for call in calls {
            let result = self.dispatch(store, call).await;
            outcomes.push(ToolOutcome {
                name: call.name.clone(),
                args: call.args.clone(),
                result,
            });
        }
        outcomes
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}
