use crate::core::LLMError;
use crate::eventsource::{LineBuffer, SseLine};
use crate::providers::{anthropic, openai, Dialect, StreamChunk};
use async_stream::try_stream;
use bytes::Bytes;
use futures::{Stream, StreamExt};

/// Result of interpreting one `data:` payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Extracted {
    Chunk(StreamChunk),
    /// Nothing to emit; keep decoding
    Skip,
    /// Dialect-level end-of-stream marker
    End,
}

impl Dialect {
    pub fn extract(self, payload: &str) -> Extracted {
        match self {
            Self::OpenAi => openai::extract_chunk(payload),
            Self::Anthropic => anthropic::extract_chunk(payload),
        }
    }
}

/// Incremental SSE decoder for one response body.
///
/// Feed it raw body pieces in arrival order; chunk boundaries are irrelevant
/// to the output. Once a sentinel has been seen, further input is ignored.
#[derive(Debug)]
pub struct SseDecoder {
    dialect: Dialect,
    lines: LineBuffer,
    finished: bool,
}

impl SseDecoder {
    pub fn new(dialect: Dialect) -> Self {
        Self {
            dialect,
            lines: LineBuffer::new(),
            finished: false,
        }
    }

    pub const fn is_finished(&self) -> bool {
        self.finished
    }

    pub fn feed(&mut self, bytes: &[u8]) -> Vec<StreamChunk> {
        if self.finished {
            return Vec::new();
        }
        let lines = self.lines.push(bytes);
        self.decode_lines(lines)
    }

    /// Flushes a trailing line left unterminated at end of body.
    pub fn finish(&mut self) -> Vec<StreamChunk> {
        if self.finished {
            return Vec::new();
        }
        let rest = self.lines.finish();
        let chunks = self.decode_lines(rest);
        self.finished = true;
        chunks
    }

    fn decode_lines(&mut self, lines: impl IntoIterator<Item = String>) -> Vec<StreamChunk> {
        let mut chunks = Vec::new();
        for line in lines {
            let payload = match SseLine::parse(&line) {
                SseLine::Ignored => continue,
                SseLine::Done => {
                    self.finished = true;
                    break;
                }
                SseLine::Data(payload) => payload,
            };

            match self.dialect.extract(payload) {
                Extracted::Chunk(chunk) => chunks.push(chunk),
                Extracted::Skip => {}
                Extracted::End => {
                    self.finished = true;
                    break;
                }
            }
        }
        chunks
    }
}

/// Decodes a response body into chunks, yielding each as soon as its line is
/// complete. The body is dropped as soon as the returned stream is.
pub fn decode_stream<S>(
    body: S,
    dialect: Dialect,
) -> impl Stream<Item = Result<StreamChunk, LLMError>> + Send + 'static
where
    S: Stream<Item = Result<Bytes, LLMError>> + Send + Unpin + 'static,
{
    try_stream! {
        let mut body = body;
        let mut decoder = SseDecoder::new(dialect);

        while let Some(bytes) = body.next().await {
            let bytes = bytes?;
            for chunk in decoder.feed(&bytes) {
                yield chunk;
            }
            if decoder.is_finished() {
                break;
            }
        }

        for chunk in decoder.finish() {
            yield chunk;
        }
    }
}
