//! One chat turn: context, model call, tool dispatch, optional follow-up.

use crate::app::agent::call_syntax::{
    contains_tool_call, extract_tool_calls, format_tool_call, strip_tool_calls,
};
use crate::app::agent::context::AgentContext;
use crate::app::agent::registry::{ToolOutcome, ToolRegistry};
use crate::app::crud;
use crate::domain::model::tables;
use crate::error::AppError;
use crate::storage::Store;
use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value as JsonValue};
use std::sync::Arc;
use utoipa::ToSchema;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
}

impl ChatRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChatRole::User => "user",
            ChatRole::Assistant => "assistant",
        }
    }

    fn parse(s: &str) -> Option<Self> {
        match s {
            "user" => Some(ChatRole::User),
            "assistant" => Some(ChatRole::Assistant),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
        }
    }
}

/// Text completion provider. The system prompt is passed separately from the
/// conversation so implementations can place it however their API expects.
#[async_trait]
pub trait ChatModel: Send + Sync {
    async fn complete(&self, system: &str, messages: &[ChatMessage]) -> anyhow::Result<String>;
}

#[derive(Debug, Clone, Serialize)]
pub struct ChatTurn {
    pub reply: String,
    pub tool_calls: Vec<ToolOutcome>,
}

pub struct ChatAgent {
    tools: Arc<ToolRegistry>,
    model: Arc<dyn ChatModel>,
    follow_up: bool,
}

impl ChatAgent {
    pub fn new(tools: Arc<ToolRegistry>, model: Arc<dyn ChatModel>) -> Self {
        Self {
            tools,
            model,
            follow_up: true,
        }
    }

    /// Whether to ask the model a second time with the tool results.
    pub fn with_follow_up(mut self, follow_up: bool) -> Self {
        self.follow_up = follow_up;
        self
    }

    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    pub fn system_prompt(&self, context: &AgentContext, today: NaiveDate) -> String {
        let example = format_tool_call("createTask", &json!({ "title": "Draft proposal", "priority": 2 }));
        format!(
            "You are Kensenich, a personal business manager. You help the user plan work, \
             track goals, manage contacts and deals, and remember what matters to them.\n\
             Today is {today}.\n\n\
             ## Current situation\n{context}\n\n\
             ## Tools\n\
             To act, write a tool call on its own line using exactly this syntax:\n\
             {example}\n\
             Arguments must be a JSON object. You may issue several calls in one reply; \
             they run in order. Only call tools listed here:\n{tools}\n\n\
             Keep replies short and practical.",
            today = today.format("%A, %Y-%m-%d"),
            context = context.render(),
            example = example,
            tools = self.tools.render_prompt(),
        )
    }

    /// Runs one turn and persists the user message and the cleaned reply.
    pub async fn respond(
        &self,
        store: &Store,
        history: Vec<ChatMessage>,
        message: &str,
    ) -> Result<ChatTurn, AppError> {
        let today = Utc::now().date_naive();
        let context = AgentContext::assemble(store, today).await;
        let system = self.system_prompt(&context, today);

        let mut messages = history;
        messages.push(ChatMessage::user(message));

        let first = self
            .model
            .complete(&system, &messages)
            .await
            .map_err(|e| AppError::Upstream(format!("{:#}", e)))?;

        let calls = extract_tool_calls(&first);
        if calls.is_empty() && contains_tool_call(&first) {
            tracing::warn!("Model reply held tool call markers but none were well-formed");
        }
        let outcomes = self.tools.dispatch_all(store, &calls).await;
        if !calls.is_empty() {
            tracing::info!(
                calls = calls.len(),
                failed = outcomes.iter().filter(|o| o.is_error()).count(),
                "Dispatched tool calls"
            );
        }

        let raw_reply = if !outcomes.is_empty() && self.follow_up {
            messages.push(ChatMessage::assistant(first.clone()));
            messages.push(ChatMessage::user(tool_results_message(&outcomes)));
            match self.model.complete(&system, &messages).await {
                Ok(second) => second,
                Err(e) => {
                    tracing::warn!(error = %e, "Follow-up completion failed, using first reply");
                    first
                }
            }
        } else {
            first
        };

        let mut reply = strip_tool_calls(&raw_reply);
        if reply.is_empty() {
            reply = if outcomes.is_empty() {
                EMPTY_REPLY_FALLBACK.to_string()
            } else {
                "Done.".to_string()
            };
        }

        // Rows are written only once the reply is final and non-empty.
        let chat_table = tables::chat_messages();
        let rows = [
            json!({ "role": ChatRole::User.as_str(), "content": message }),
            json!({ "role": ChatRole::Assistant.as_str(), "content": reply }),
        ];
        for row in &rows {
            crud::create(store, &chat_table, row).await?;
        }

        Ok(ChatTurn {
            reply,
            tool_calls: outcomes,
        })
    }
}

const EMPTY_REPLY_FALLBACK: &str = "Sorry, I didn't get that. Could you rephrase?";

fn tool_results_message(outcomes: &[ToolOutcome]) -> String {
    let results: Vec<JsonValue> = outcomes
        .iter()
        .map(|o| json!({ "tool": o.name, "result": o.result }))
        .collect();
    format!(
        "Tool results:\n{}\n\nSummarise what happened for the user. Do not issue further tool calls.",
        JsonValue::Array(results)
    )
}

/// The most recent persisted messages, oldest first.
pub async fn recent_history(store: &Store, limit: u32) -> Result<Vec<ChatMessage>, AppError> {
    if limit == 0 {
        return Ok(Vec::new());
    }
    let rows = store
        .fetch_all(
            "SELECT role, content FROM chat_messages ORDER BY created_at DESC, rowid DESC LIMIT ?",
            &[JsonValue::from(limit)],
        )
        .await?;

    let mut history: Vec<ChatMessage> = rows
        .iter()
        .filter_map(|r| {
            let role = r.get("role").and_then(JsonValue::as_str).and_then(ChatRole::parse)?;
            let content = r.get("content").and_then(JsonValue::as_str)?;
            Some(ChatMessage {
                role,
                content: content.to_string(),
            })
        })
        .collect();
    history.reverse();
    Ok(history)
}
