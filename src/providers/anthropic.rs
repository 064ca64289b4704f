pub mod types;

use crate::providers::decoder::Extracted;
use crate::providers::{ChatMessage, ChatParams, Role, StreamChunk};
use log::{debug, warn};
use types::{DeltaEvent, MessagesRequest, StreamEvent};

pub const API_VERSION: &str = "2023-06-01";
/// The Messages API rejects requests without `max_tokens`.
pub const DEFAULT_MAX_TOKENS: u32 = 4096;

/// Builds the streaming Messages payload. System turns are not allowed in the
/// message list, so they are hoisted into the top-level `system` field.
pub fn build_request<'a>(model: &'a str, params: &'a ChatParams) -> MessagesRequest<'a> {
    let (system, messages): (Vec<&ChatMessage>, Vec<&ChatMessage>) = params
        .messages
        .iter()
        .partition(|message| message.role == Role::System);

    let system = (!system.is_empty()).then(|| {
        system
            .iter()
            .map(|message| message.content.as_str())
            .collect::<Vec<_>>()
            .join("\n\n")
    });

    MessagesRequest::new(
        model,
        params.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
        messages,
    )
    .with_system(system)
    .with_temperature(params.temperature)
    .with_top_p(params.top_p)
}

/// Maps one `data:` payload onto a chunk. `message_stop` ends the stream.
pub fn extract_chunk(payload: &str) -> Extracted {
    let event: StreamEvent = match serde_json::from_str(payload) {
        Ok(event) => event,
        Err(e) => {
            debug!("[anthropic] skipping malformed stream line: {e}");
            return Extracted::Skip;
        }
    };

    let chunk = match event {
        StreamEvent::ContentBlockDelta { delta } => match delta {
            DeltaEvent::TextDelta { text } => StreamChunk::content(text),
            DeltaEvent::ThinkingDelta { thinking } => StreamChunk::reasoning(thinking),
            DeltaEvent::Other => return Extracted::Skip,
        },
        StreamEvent::MessageDelta { delta } => match delta.stop_reason {
            Some(reason) => StreamChunk::finish(reason),
            None => return Extracted::Skip,
        },
        StreamEvent::MessageStop => return Extracted::End,
        StreamEvent::Error { error } => {
            warn!(
                "[anthropic] stream reported {}: {}",
                error.error_type, error.message
            );
            return Extracted::Skip;
        }
        StreamEvent::Other => return Extracted::Skip,
    };

    chunk.non_empty().map_or(Extracted::Skip, Extracted::Chunk)
}
