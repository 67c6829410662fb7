//! Agent layer: tool registry, textual call protocol, context and chat turns.

pub mod call_syntax;
pub mod chat;
pub mod context;
pub mod registry;
pub mod tool;
pub mod tools;

pub use call_syntax::{extract_tool_calls, scan_tool_calls, strip_tool_calls, ToolCall};
pub use chat::{ChatAgent, ChatMessage, ChatModel, ChatRole, ChatTurn};
pub use context::{ActivityCounters, AgentContext};
pub use registry::{ToolOutcome, ToolRegistry};
pub use tool::{ParamType, ToolDescriptor, ToolError, ToolHandler};
pub use tools::standard_tools;
