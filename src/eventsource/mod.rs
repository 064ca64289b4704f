use memchr::memchr;

const LINE_DELIMITER: u8 = b'\n';
const DATA_FIELD: &str = "data:";
const DONE_SENTINEL: &str = "[DONE]";

/// Reassembles complete lines from arbitrarily split byte pieces.
///
/// Bytes are only decoded once a full line is available, so a piece boundary
/// falling inside a multi-byte UTF-8 sequence never corrupts the text.
#[derive(Debug, Default)]
pub struct LineBuffer {
    buffer: Vec<u8>,
}

impl LineBuffer {
    pub fn new() -> Self {
        Self {
            buffer: Vec::with_capacity(1024),
        }
    }

    /// Appends `bytes` and drains every line completed by them.
    pub fn push(&mut self, bytes: &[u8]) -> Vec<String> {
        self.buffer.extend_from_slice(bytes);

        let mut lines = Vec::new();
        let mut start = 0;
        while let Some(offset) = memchr(LINE_DELIMITER, &self.buffer[start..]) {
            let end = start + offset;
            lines.push(String::from_utf8_lossy(&self.buffer[start..end]).into_owned());
            start = end + 1;
        }
        self.buffer.drain(..start);
        lines
    }

    /// Returns the unterminated remainder, if any, leaving the buffer empty.
    pub fn finish(&mut self) -> Option<String> {
        if self.buffer.is_empty() {
            return None;
        }
        let rest = String::from_utf8_lossy(&self.buffer).into_owned();
        self.buffer.clear();
        Some(rest)
    }

    pub fn pending_len(&self) -> usize {
        self.buffer.len()
    }
}

/// Classification of a single line of an SSE body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SseLine<'a> {
    /// Blank lines, comments and non-`data` fields
    Ignored,
    /// The `[DONE]` end-of-stream sentinel
    Done,
    /// The payload of a `data:` field
    Data(&'a str),
}

impl<'a> SseLine<'a> {
    pub fn parse(line: &'a str) -> Self {
        let trimmed = line.trim();
        let Some(payload) = trimmed.strip_prefix(DATA_FIELD) else {
            return Self::Ignored;
        };

        let payload = payload.strip_prefix(' ').unwrap_or(payload);
        if payload.is_empty() {
            Self::Ignored
        } else if payload == DONE_SENTINEL {
            Self::Done
        } else {
            Self::Data(payload)
        }
    }
}
