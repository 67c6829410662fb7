pub mod client;

pub use client::OpenAiChatClient;
