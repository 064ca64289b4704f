use crate::core::LLMError;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;

pub const LOG_FILE_NAME: &str = "llm_requests.jsonl";

/// Line-oriented persistence for telemetry records.
#[async_trait]
pub trait LogStore: Send + Sync {
    /// Appends one record; `line` carries no trailing newline.
    async fn append_line(&self, line: &str) -> Result<(), LLMError>;
    /// All non-empty lines currently stored, oldest first.
    async fn read_all(&self) -> Result<Vec<String>, LLMError>;
    /// Replaces the whole store with `lines`.
    async fn rewrite(&self, lines: &[String]) -> Result<(), LLMError>;
}

/// JSON-lines file store. The parent directory is created on first write.
#[derive(Debug, Clone)]
pub struct FileLogStore {
    path: PathBuf,
}

impl FileLogStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store at `<dir>/llm_requests.jsonl`.
    pub fn in_dir(dir: &Path) -> Self {
        Self::new(dir.join(LOG_FILE_NAME))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn ensure_parent(&self) -> Result<(), LLMError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await?;
            }
        }
        Ok(())
    }
}

#[async_trait]
impl LogStore for FileLogStore {
    async fn append_line(&self, line: &str) -> Result<(), LLMError> {
        self.ensure_parent().await?;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;

        let mut record = String::with_capacity(line.len() + 1);
        record.push_str(line);
        record.push('\n');
        file.write_all(record.as_bytes()).await?;
        file.flush().await?;
        Ok(())
    }

    async fn read_all(&self) -> Result<Vec<String>, LLMError> {
        let contents = match fs::read_to_string(&self.path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        Ok(contents
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(str::to_string)
            .collect())
    }

    async fn rewrite(&self, lines: &[String]) -> Result<(), LLMError> {
        self.ensure_parent().await?;
        let mut contents = lines.join("\n");
        if !contents.is_empty() {
            contents.push('\n');
        }
        fs::write(&self.path, contents).await?;
        Ok(())
    }
}

/// In-process store, handy for embedding and tests.
#[derive(Debug, Default)]
pub struct MemoryLogStore {
    lines: Mutex<Vec<String>>,
}

impl MemoryLogStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> Vec<String> {
        self.lines
            .lock()
            .map(|lines| lines.clone())
            .unwrap_or_default()
    }
}

fn poisoned() -> LLMError {
    LLMError::IOError("log store lock poisoned".to_string())
}

#[async_trait]
impl LogStore for MemoryLogStore {
    async fn append_line(&self, line: &str) -> Result<(), LLMError> {
        self.lines
            .lock()
            .map_err(|_| poisoned())?
            .push(line.to_string());
        Ok(())
    }

    async fn read_all(&self) -> Result<Vec<String>, LLMError> {
        Ok(self.lines.lock().map_err(|_| poisoned())?.clone())
    }

    async fn rewrite(&self, lines: &[String]) -> Result<(), LLMError> {
        *self.lines.lock().map_err(|_| poisoned())? = lines.to_vec();
        Ok(())
    }
}
