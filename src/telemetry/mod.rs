//! Request telemetry: one JSON-lines record per completed request.

mod logger;
mod redact;
mod store;

pub use logger::{
    LogEntry, LoggerConfig, MessagePreview, RequestId, RequestInfo, RequestLogger, RequestStatus,
};
pub use redact::{mask_api_key, truncate_content};
pub use store::{FileLogStore, LogStore, MemoryLogStore, LOG_FILE_NAME};
