use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use pitchboard::config;
use pitchboard::sanity::SanityClient;

#[derive(Parser, Debug)]
struct Args {
    /// Path to YAML config
    #[arg(long, default_value = "config.yaml")]
    config: PathBuf,

    /// Search term to exercise the directory query with
    #[arg(long)]
    search: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let cfg = config::load(Some(&args.config))?;
    let client = SanityClient::from_config(&cfg)?;

    client.ping().await?;
    println!("Content store reachable (dataset: {})", cfg.sanity.dataset);

    let startups = client.list_startups(args.search.as_deref()).await?;
    println!("{} startups:", startups.len());
    for startup in &startups {
        println!(
            "  {} -> {} [{}] by {}",
            startup.id, startup.title, startup.category, startup.author_name
        );
    }
    Ok(())
}
