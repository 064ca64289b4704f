pub mod cli;
pub mod core;
pub mod eventsource;
pub mod providers;
pub mod telemetry;

pub use crate::core::{Config, LLMConfig, LLMError};
pub use providers::{ChatMessage, ChatParams, ChunkStream, CollectMode, LLMClient, StreamChunk};
pub use telemetry::{FileLogStore, RequestLogger};
