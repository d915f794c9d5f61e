pub mod config;
pub mod domain;
mod error;
pub mod http;
mod llm;
pub mod notify;
pub mod parser;
mod processor;
pub mod server;
pub mod tracing;
pub mod types;
pub mod yt;

pub use error::Error;
pub use llm::gemini::{self, GeminiClient};
pub use llm::summarizer::{Summarizer, SummaryRequest, SummaryResponse};
pub use processor::{builder::PressReviewProcessorBuilder, PressReviewProcessor, RunReport};
