use colored::Colorize;
use directories::ProjectDirs;
use futures::StreamExt;
use log::{debug, warn};
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use super::args::Args;
use crate::{
    core::{Config, LLMError, API_KEY_ENV},
    providers::{ChatMessage, ChatParams, CollectMode, LLMClient, StreamCollectResult},
    telemetry::{FileLogStore, LogEntry, RequestLogger, RequestStatus},
};

/// Directory for request logs: `[telemetry].log_dir`, else the platform data dir.
fn telemetry_dir(config: &Config) -> Option<PathBuf> {
    config.telemetry.log_dir.clone().or_else(|| {
        ProjectDirs::from("", "", "llm-stream").map(|dirs| dirs.data_dir().join("logs"))
    })
}

fn create_logger(config: &Config) -> RequestLogger {
    if !config.telemetry.enabled {
        return RequestLogger::console();
    }
    match telemetry_dir(config) {
        Some(dir) => {
            debug!("[SETTINGS] request log directory: {}", dir.display());
            RequestLogger::new(
                Arc::new(FileLogStore::in_dir(&dir)),
                config.telemetry.logger.clone(),
            )
        }
        None => {
            warn!("No data directory available; request logs go to the debug log only");
            RequestLogger::console()
        }
    }
}

fn build_params(config: &Config, args: &Args, query: String, cancel: CancellationToken) -> ChatParams {
    let mut messages = Vec::with_capacity(2);
    if let Some(prompt) = config.system_prompt.as_deref().filter(|p| !p.trim().is_empty()) {
        messages.push(ChatMessage::system(prompt));
    }
    messages.push(ChatMessage::user(query));

    ChatParams {
        temperature: config.temperature,
        max_tokens: config.max_tokens,
        timeout: args.timeout.or(config.timeout_secs),
        cancel: Some(cancel),
        ..ChatParams::new(messages)
    }
}

/// Cancels the returned token on Ctrl-C.
fn interrupt_token() -> CancellationToken {
    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_interrupt.cancel();
        }
    });
    cancel
}

fn print_log_entry(out: &mut impl Write, entry: &LogEntry) -> io::Result<()> {
    let status = match entry.status {
        RequestStatus::Success => "success".green(),
        RequestStatus::Error => "error".red(),
        RequestStatus::Pending => "pending".yellow(),
    };
    write!(
        out,
        "{} {status} {} {} {}",
        entry.timestamp.format("%Y-%m-%d %H:%M:%S"),
        entry.api_format,
        entry.model,
        entry.endpoint.dimmed()
    )?;
    if let Some(ms) = entry.duration_ms {
        write!(out, " {ms}ms")?;
    }
    if let Some(message) = &entry.error_message {
        write!(out, " {}", message.red())?;
    }
    writeln!(out)
}

async fn show_logs(logger: &RequestLogger, count: usize) -> Result<(), LLMError> {
    let entries = logger.recent_logs(count).await;
    let mut stdout = io::stdout();
    if entries.is_empty() {
        writeln!(stdout, "No request logs recorded.")?;
    }
    for entry in &entries {
        print_log_entry(&mut stdout, entry)?;
    }
    Ok(())
}

fn print_collected(out: &mut impl Write, result: &StreamCollectResult) -> io::Result<()> {
    if !result.reasoning.is_empty() {
        writeln!(out, "{}", result.reasoning.dimmed())?;
    }
    writeln!(out, "{}", result.content)
}

async fn print_streaming(
    client: &LLMClient,
    params: ChatParams,
    mode: CollectMode,
) -> Result<(), LLMError> {
    let mut stream = client.stream_chat(params).await?;
    let mut stdout = io::stdout();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        if mode.collects_reasoning() {
            if let Some(reasoning) = &chunk.reasoning_content {
                write!(stdout, "{}", reasoning.dimmed())?;
            }
        }
        if mode.collects_content() {
            if let Some(content) = &chunk.content {
                write!(stdout, "{content}")?;
            }
        }
        stdout.flush()?;
    }

    // Ensure final newline
    writeln!(stdout)?;
    Ok(())
}

pub async fn run(args: Args) -> Result<(), LLMError> {
    let _ = dotenv::dotenv();

    let mut config = Config::load()?;
    if let Some(model) = args.model.clone() {
        config.update_model(model);
    }
    if let Some(base_url) = args.base_url.clone() {
        config.update_base_url(base_url);
    }

    let logger = Arc::new(create_logger(&config));
    if let Some(count) = args.show_logs {
        return show_logs(&logger, count).await;
    }

    let query = args
        .query
        .clone()
        .filter(|q| !q.trim().is_empty())
        .ok_or_else(|| LLMError::ConfigError("Query must not be empty".to_string()))?;

    let llm_config = config.llm_config(dotenv::var(API_KEY_ENV).ok())?;
    let client =
        LLMClient::from_config(llm_config, config.simulate_browser)?.with_logger(logger);

    let mode = args.mode.unwrap_or(config.collect_mode);
    let params = build_params(&config, &args, query, interrupt_token());
    debug!(
        "[SETTINGS] model: {:?}, mode: {mode:?}, timeout: {}s",
        config.llm.model,
        params.timeout_secs()
    );

    if args.collect {
        let result = client.stream_and_collect(params, mode).await?;
        print_collected(&mut io::stdout(), &result)?;
        Ok(())
    } else {
        print_streaming(&client, params, mode).await
    }
}
