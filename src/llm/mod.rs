pub mod client;
pub mod prompt;

pub use client::{LlmClient, ModelInvoker};
pub use prompt::LlmPrompt;
