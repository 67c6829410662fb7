use crate::app::agent::{ChatAgent, ChatMessage, ToolOutcome, ToolRegistry};
use crate::domain::model::{TableRegistry, TableSchema};
use crate::error::AppError;
use crate::storage::Store;
use axum::extract::rejection::JsonRejection;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::sync::Arc;
use utoipa::ToSchema;

#[derive(Clone)]
pub struct AppState {
    pub store: Store,
    pub tables: Arc<TableRegistry>,
    pub tools: Arc<ToolRegistry>,
    /// `None` when no model provider is configured.
    pub chat: Option<Arc<ChatAgent>>,
    pub chat_history_limit: u32,
}

#[derive(Serialize, Debug, ToSchema)]
pub struct ErrorBody {
    pub error: String,
}

#[derive(Serialize, Debug, ToSchema)]
pub struct DeleteResponse {
    pub message: String,
    pub id: String,
}

#[derive(Serialize, Debug, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Deserialize, Debug, ToSchema)]
pub struct ChatRequest {
    pub message: String,
    /// Conversation so far. When omitted, recent persisted messages are used.
    #[serde(default)]
    pub history: Option<Vec<ChatMessage>>,
}

#[derive(Serialize, Debug, ToSchema)]
pub struct ToolCallResult {
    pub name: String,
    #[schema(value_type = Object)]
    pub args: JsonValue,
    #[schema(value_type = Object)]
    pub result: JsonValue,
}

impl From<ToolOutcome> for ToolCallResult {
    fn from(o: ToolOutcome) -> Self {
        Self {
            name: o.name,
            args: o.args,
            result: o.result,
        }
    }
}

#[derive(Serialize, Debug, ToSchema)]
pub struct ChatResponse {
    pub reply: String,
    pub tool_calls: Vec<ToolCallResult>,
}

#[derive(Serialize, Debug, ToSchema)]
pub struct ColumnInfo {
    pub name: String,
    #[serde(rename = "type")]
    pub col_type: String,
    pub nullable: bool,
}

#[derive(Serialize, Debug, ToSchema)]
pub struct TableInfo {
    pub table_name: String,
    pub label: String,
    pub route_path: String,
    pub columns: Vec<ColumnInfo>,
    pub creatable: Vec<String>,
    pub updatable: Vec<String>,
    pub filterable: Vec<String>,
    pub searchable: Vec<String>,
    pub required: Vec<String>,
    pub default_order: String,
    pub allow_delete: bool,
    /// `METHOD path` relative to `route_path`.
    pub custom_routes: Vec<String>,
}

fn owned(fields: &[&str]) -> Vec<String> {
    fields.iter().map(|f| f.to_string()).collect()
}

impl From<&TableSchema> for TableInfo {
    fn from(t: &TableSchema) -> Self {
        Self {
            table_name: t.table_name().to_string(),
            label: t.label().to_string(),
            route_path: t.route_path().to_string(),
            columns: t
                .columns()
                .iter()
                .map(|c| ColumnInfo {
                    name: c.name.to_string(),
                    col_type: c.col_type.as_str().to_string(),
                    nullable: c.nullable,
                })
                .collect(),
            creatable: owned(t.creatable_fields()),
            updatable: owned(t.updatable_fields()),
            filterable: owned(&t.filterable_fields()),
            searchable: owned(t.searchable_fields()),
            required: owned(t.required_fields()),
            default_order: t.default_order().to_string(),
            allow_delete: t.allows_delete(),
            custom_routes: t
                .custom_routes()
                .iter()
                .map(|r| format!("{} {}", r.method.as_str(), r.path))
                .collect(),
        }
    }
}

#[derive(Serialize, Debug, ToSchema)]
pub struct ToolParamInfo {
    pub name: String,
    #[serde(rename = "type")]
    pub param_type: String,
    pub description: String,
    pub required: bool,
}

#[derive(Serialize, Debug, ToSchema)]
pub struct ToolInfo {
    pub name: String,
    pub description: String,
    pub signature: String,
    pub parameters: Vec<ToolParamInfo>,
}

pub fn json_422(err: JsonRejection, expected: &str) -> AppError {
    AppError::InvalidBody(format!("Invalid JSON body: {} (expected: {})", err, expected))
}
