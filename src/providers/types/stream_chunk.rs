use serde::{Deserialize, Serialize};

/// One decoded unit of streaming output, common to both dialects.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StreamChunk {
    pub content: Option<String>,
    pub reasoning_content: Option<String>,
    pub finish_reason: Option<String>,
}

impl StreamChunk {
    pub fn content(text: impl Into<String>) -> Self {
        Self {
            content: Some(text.into()),
            ..Self::default()
        }
    }

    pub fn reasoning(text: impl Into<String>) -> Self {
        Self {
            reasoning_content: Some(text.into()),
            ..Self::default()
        }
    }

    pub fn finish(reason: impl Into<String>) -> Self {
        Self {
            finish_reason: Some(reason.into()),
            ..Self::default()
        }
    }

    /// Drops empty fields; `None` when nothing is left worth emitting.
    pub fn non_empty(self) -> Option<Self> {
        let keep = |field: Option<String>| field.filter(|s| !s.is_empty());
        let chunk = Self {
            content: keep(self.content),
            reasoning_content: keep(self.reasoning_content),
            finish_reason: keep(self.finish_reason),
        };
        (!chunk.is_empty()).then_some(chunk)
    }

    pub const fn is_empty(&self) -> bool {
        self.content.is_none() && self.reasoning_content.is_none() && self.finish_reason.is_none()
    }
}

/// Which chunk fields [`StreamCollector`] accumulates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum CollectMode {
    /// Final answer only
    #[default]
    #[value(name = "content_only")]
    ContentOnly,
    /// Final answer plus the model's reasoning
    #[value(name = "with_reasoning")]
    WithReasoning,
    /// Reasoning only
    #[value(name = "reasoning_only")]
    ReasoningOnly,
}

impl CollectMode {
    pub const fn collects_content(self) -> bool {
        matches!(self, Self::ContentOnly | Self::WithReasoning)
    }

    pub const fn collects_reasoning(self) -> bool {
        matches!(self, Self::WithReasoning | Self::ReasoningOnly)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StreamCollectResult {
    pub content: String,
    pub reasoning: String,
    pub finish_reason: Option<String>,
    pub chunk_count: usize,
}

#[derive(Debug)]
pub struct StreamCollector {
    mode: CollectMode,
    result: StreamCollectResult,
}

impl StreamCollector {
    pub fn new(mode: CollectMode) -> Self {
        Self {
            mode,
            result: StreamCollectResult::default(),
        }
    }

    pub fn push(&mut self, chunk: &StreamChunk) {
        self.result.chunk_count += 1;

        if self.mode.collects_content() {
            if let Some(content) = &chunk.content {
                self.result.content.push_str(content);
            }
        }
        if self.mode.collects_reasoning() {
            if let Some(reasoning) = &chunk.reasoning_content {
                self.result.reasoning.push_str(reasoning);
            }
        }
        if let Some(reason) = &chunk.finish_reason {
            self.result.finish_reason = Some(reason.clone());
        }
    }

    pub const fn chunk_count(&self) -> usize {
        self.result.chunk_count
    }

    pub fn finish(self) -> StreamCollectResult {
        self.result
    }
}
