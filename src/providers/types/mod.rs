pub mod messages;
pub mod params;
pub mod stream_chunk;

pub use messages::{ChatMessage, Role};
pub use params::{ChatParams, DEFAULT_TIMEOUT_SECS};
pub use stream_chunk::{CollectMode, StreamChunk, StreamCollectResult, StreamCollector};
