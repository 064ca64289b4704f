pub mod types;

use crate::providers::decoder::Extracted;
use crate::providers::{ChatParams, StreamChunk};
use log::debug;
use types::{ChatCompletionChunk, ChatCompletionRequest, ResponseFormat};

/// Builds the streaming chat-completions payload.
pub fn build_request<'a>(model: &'a str, params: &'a ChatParams) -> ChatCompletionRequest<'a> {
    ChatCompletionRequest {
        model,
        messages: &params.messages,
        stream: true,
        temperature: params.temperature,
        top_p: params.top_p,
        max_tokens: params.max_tokens,
        response_format: params
            .response_format
            .as_deref()
            .map(|format_type| ResponseFormat { format_type }),
    }
}

/// Maps one `data:` payload onto a chunk. Unparseable payloads are skipped.
pub fn extract_chunk(payload: &str) -> Extracted {
    let parsed: ChatCompletionChunk = match serde_json::from_str(payload) {
        Ok(parsed) => parsed,
        Err(e) => {
            debug!("[openai] skipping malformed stream line: {e}");
            return Extracted::Skip;
        }
    };

    let Some(choice) = parsed.choices.into_iter().next() else {
        return Extracted::Skip;
    };

    let (content, reasoning_content) = choice
        .delta
        .map(|delta| (delta.content, delta.reasoning_content))
        .unwrap_or_default();

    StreamChunk {
        content,
        reasoning_content,
        finish_reason: choice.finish_reason,
    }
    .non_empty()
    .map_or(Extracted::Skip, Extracted::Chunk)
}
