use clap::Parser;
use colored::Colorize;
use llm_stream::cli::{run, Args};

#[tokio::main]
async fn main() {
    let args = Args::parse();

    let level = if args.debug { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    if let Err(e) = run(args).await {
        eprintln!("{} {e}", "Error:".red().bold());
        std::process::exit(1);
    }
}
