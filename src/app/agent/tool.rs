//! Tool descriptors: name, description, parameter schema and handler.

use crate::storage::Store;
use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value as JsonValue;
use std::future::Future;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ParamType {
    String,
    Number,
    Integer,
    Boolean,
    Object,
    Array,
}

impl ParamType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ParamType::String => "string",
            ParamType::Number => "number",
            ParamType::Integer => "integer",
            ParamType::Boolean => "boolean",
            ParamType::Object => "object",
            ParamType::Array => "array",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ToolParam {
    pub name: &'static str,
    #[serde(rename = "type")]
    pub param_type: ParamType,
    pub description: &'static str,
    pub required: bool,
}

/// Executes one tool against the store.
///
/// The store is passed in explicitly; handlers hold no shared state of their own.
#[async_trait]
pub trait ToolHandler: Send + Sync {
    async fn call(&self, store: Store, args: JsonValue) -> anyhow::Result<JsonValue>;
}

#[async_trait]
impl<F, Fut> ToolHandler for F
where
    F: Fn(Store, JsonValue) -> Fut + Send + Sync,
    Fut: Future<Output = anyhow::Result<JsonValue>> + Send + 'static,
{
    async fn call(&self, store: Store, args: JsonValue) -> anyhow::Result<JsonValue> {
        (self)(store, args).await
    }
}

#[derive(Clone)]
pub struct ToolDescriptor {
    name: &'static str,
    description: &'static str,
    params: Vec<ToolParam>,
    handler: Arc<dyn ToolHandler>,
}

impl ToolDescriptor {
    pub fn new<H: ToolHandler + 'static>(
        name: &'static str,
        description: &'static str,
        handler: H,
    ) -> Self {
        Self {
            name,
            description,
            params: Vec::new(),
            handler: Arc::new(handler),
        }
    }

    pub fn required(mut self, name: &'static str, param_type: ParamType, description: &'static str) -> Self {
        self.params.push(ToolParam {
            name,
            param_type,
            description,
            required: true,
        });
        self
    }

    pub fn optional(mut self, name: &'static str, param_type: ParamType, description: &'static str) -> Self {
        self.params.push(ToolParam {
            name,
            param_type,
            description,
            required: false,
        });
        self
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn description(&self) -> &'static str {
        self.description
    }

    pub fn params(&self) -> &[ToolParam] {
        &self.params
    }

    pub fn handler(&self) -> &dyn ToolHandler {
        self.handler.as_ref()
    }

    /// `name(req: type, opt?: type)`
    pub fn signature(&self) -> String {
        let params: Vec<String> = self
            .params
            .iter()
            .map(|p| {
                let marker = if p.required { "" } else { "?" };
                format!("{}{}: {}", p.name, marker, p.param_type.as_str())
            })
            .collect();
        format!("{}({})", self.name, params.join(", "))
    }
}

/// Failures inside dispatch. None of these escape: the dispatcher turns each
/// into an `{error}` result so the rest of the batch still runs.
#[derive(Error, Debug)]
pub enum ToolError {
    #[error("tool '{0}' not found")]
    NotFound(String),

    #[error("tool '{tool}' is missing required parameter '{param}'")]
    MissingParameter { tool: String, param: String },

    #[error("tool '{tool}' expects a JSON object as arguments")]
    InvalidArguments { tool: String },

    #[error("{0}")]
    Execution(String),
}
