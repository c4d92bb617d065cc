//! Command-line interface for textgen-rs

use anyhow::Context;
use clap::Parser;
use futures::StreamExt;
use std::io::Write;
use textgen_providers::{ProviderConfig, ProviderKind, build_provider};
use textgen_runtime::{AgentDeps, run_agent, run_agent_stream};
use textgen_utils::Settings;
use tracing::{debug, info};

#[derive(Parser, Debug)]
#[command(name = "textgen-cli")]
#[command(about = "Run one prompt against a configured text-generation provider", long_about = None)]
struct Args {
    /// Prompt to send
    prompt: String,

    /// Provider to use ("gemini" or "ollama"); defaults to LLM_PROVIDER
    #[arg(short, long)]
    provider: Option<String>,

    /// Model identifier; defaults to PRIMARY_MODEL
    #[arg(short, long)]
    model: Option<String>,

    /// Base URL for the HTTP provider; defaults to BASE_URL
    #[arg(long)]
    base_url: Option<String>,

    /// API credential; defaults to LLM_API_KEY / GEMINI_API_KEY
    #[arg(long)]
    api_key: Option<String>,

    /// System prompt
    #[arg(short, long)]
    system: Option<String>,

    /// Stream the response as it is generated
    #[arg(long)]
    stream: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    textgen_utils::init_tracing();

    let args = Args::parse();
    let settings = Settings::from_env();

    let kind: ProviderKind = args
        .provider
        .unwrap_or(settings.provider)
        .parse()
        .context("unsupported provider")?;
    let config = ProviderConfig {
        kind,
        model: args.model.unwrap_or(settings.model),
        base_url: Some(args.base_url.unwrap_or(settings.base_url)),
        api_key: args.api_key.or(settings.api_key),
    };

    info!(provider = ?config.kind, model = %config.model, "Starting generation");
    let provider = build_provider(&config).context("failed to construct provider")?;
    let deps = AgentDeps::new(provider, args.system.unwrap_or_default());

    let failed = if args.stream {
        stream_to_stdout(&deps, &args.prompt).await?
    } else {
        let result = run_agent(&deps, args.prompt).await;
        debug!(?result.usage, "Generation finished");
        if result.is_error() {
            eprintln!("{}", result.text);
        } else {
            println!("{}", result.text);
        }
        result.is_error()
    };

    if failed {
        std::process::exit(1);
    }
    Ok(())
}

/// Print fragments as they arrive; returns whether the stream failed
async fn stream_to_stdout(deps: &AgentDeps, prompt: &str) -> anyhow::Result<bool> {
    let mut chunks = run_agent_stream(deps, prompt);
    let mut stdout = std::io::stdout();
    let mut failed = false;

    while let Some(chunk) = chunks.next().await {
        if chunk.is_error() {
            failed = true;
            eprintln!("{}", chunk.text);
            break;
        }
        if chunk.is_terminal() {
            debug!(?chunk.usage, "Stream finished");
            break;
        }
        stdout.write_all(chunk.text.as_bytes())?;
        stdout.flush()?;
    }

    println!();
    Ok(failed)
}
