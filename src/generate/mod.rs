//! Marketing copy generation: prompt, service client, batch loop.

pub mod client;
pub mod orchestrator;
pub mod prompt;

pub use client::GeminiClient;
pub use orchestrator::{GenerationOrchestrator, ThreadSleep};
