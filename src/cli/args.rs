use clap::Parser;

use crate::providers::CollectMode;

#[derive(Parser, Debug)]
#[command(name = "llm-stream", author, version, about, long_about = None)]
pub struct Args {
    /// Your query to the LLM
    #[arg(required_unless_present = "show_logs")]
    pub query: Option<String>,

    /// Model to use; names containing "claude" use the Anthropic format
    #[arg(short, long)]
    pub model: Option<String>,

    /// Base URL of the API or relay
    #[arg(long)]
    pub base_url: Option<String>,

    /// Which parts of the response to print
    #[arg(long, value_enum)]
    pub mode: Option<CollectMode>,

    /// Seconds to wait for the response headers
    #[arg(short, long)]
    pub timeout: Option<u64>,

    /// Wait for the full response instead of printing it as it streams
    #[arg(long)]
    pub collect: bool,

    /// Print the newest N request log records and exit
    #[arg(long, value_name = "N")]
    pub show_logs: Option<usize>,

    /// Enable debug output
    #[arg(short, long, default_value = "false")]
    pub debug: bool,
}
