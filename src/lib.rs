pub mod app;
pub mod domain;
pub mod error;
pub mod infra;
pub mod storage;
pub mod transport;

// Convenience re-exports (keeps call-sites clean)
pub use app::agent::{standard_tools, ChatAgent, ChatModel, ToolRegistry};
pub use domain::model::{TableRegistry, TableSchema};
pub use error::AppError;
pub use infra::Config;
pub use storage::Store;
