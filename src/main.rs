use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};
use weekly_digest::types::DigestError;
use weekly_digest::{load_sources, pipeline, OpenAiAdapter, RunConfig};

/// Build a weekly digest from configured RSS and web sources.
#[derive(Parser, Debug)]
#[command(name = "weekly-digest", version)]
struct Cli {
    /// JSON file with the list of sources to crawl.
    #[arg(long, default_value = "sources.json")]
    sources: PathBuf,

    /// Directory the rendered digest is written under.
    #[arg(long, default_value = "digests")]
    out_dir: PathBuf,

    /// Use the external classification/summarization service instead of the
    /// keyword-and-excerpt fallback. Requires OPENAI_API_KEY.
    #[arg(long)]
    use_ai: bool,

    /// Bypass the summarization stage and render normalized excerpts.
    #[arg(long)]
    skip_summaries: bool,

    /// Trailing window of days to keep items from.
    #[arg(long, default_value_t = 7)]
    window_days: i64,

    #[arg(long, default_value_t = 4)]
    max_per_source: usize,

    #[arg(long, default_value_t = 12)]
    max_per_category: usize,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();
    let cli = Cli::parse();

    let code = match run(cli).await {
        Ok(()) => 0,
        Err(e) => {
            error!("Run failed: {}", e);
            match e {
                DigestError::Config(_) => 2,
                DigestError::Validation(_) => 3,
                _ => 1,
            }
        }
    };
    std::process::exit(code);
}

async fn run(cli: Cli) -> Result<(), DigestError> {
    let sources = load_sources(&cli.sources)?;

    let adapter = if cli.use_ai {
        let api_key = std::env::var("OPENAI_API_KEY").map_err(|_| {
            DigestError::Config("OPENAI_API_KEY is required with --use-ai".to_string())
        })?;
        Some(Arc::new(OpenAiAdapter::new(api_key, None)) as weekly_digest::DynLlmAdapter)
    } else {
        None
    };

    let config = RunConfig {
        window_days: cli.window_days,
        max_per_source: cli.max_per_source,
        max_per_category: cli.max_per_category,
        skip_summaries: cli.skip_summaries,
        ..RunConfig::default()
    };

    match pipeline::run(&config, &sources, adapter).await? {
        Some(digest) => {
            let path = cli.out_dir.join(&digest.relative_path);
            if let Some(parent) = path.parent() {
                tokio::fs::create_dir_all(parent).await?;
            }
            tokio::fs::write(&path, &digest.markdown).await?;
            info!("Wrote {} ({} items)", path.display(), digest.item_count);
        }
        None => {
            info!("No digest this week");
        }
    }
    Ok(())
}
