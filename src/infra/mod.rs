pub mod config;
pub mod llm;

pub use config::{Config, LlmConfig};
