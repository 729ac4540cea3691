//! Deckhand CLI - Webpage to Shareable Slide Presentation
//!
//! One-shot pipeline driver: scrapes a webpage into sections and, on
//! request, builds a remote presentation out of them and prints the
//! shareable link.
//!
//! # Usage
//!
//! ```bash
//! # Scrape only, print a content summary
//! deckhand https://en.wikipedia.org/wiki/Hello
//!
//! # Inspect the scraped sections as JSON
//! deckhand https://en.wikipedia.org/wiki/Hello --json
//!
//! # Scrape and build the remote presentation
//! deckhand https://en.wikipedia.org/wiki/Hello --create-presentation
//!
//! # With config file
//! deckhand --config ~/.config/deckhand/deckhand.toml --create-presentation
//!
//! # Verbose logging
//! RUST_LOG=debug deckhand --create-presentation
//! ```
//!
//! # Credentials
//!
//! Credentials come from the environment (a `.env` file is honored):
//! `FIRECRAWL_API_KEY` for scraping, plus `ALAI_EMAIL`, `ALAI_PASSWORD`, and
//! `ALAI_API_KEY` when `--create-presentation` is given. They are never read
//! from the config file.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use deckhand_core::scrape::ContentSource;
use deckhand_core::{
    load_config_from_path, ApiClient, CredentialStore, Credentials, FirecrawlSource,
    PresentationBackend, SlideOrchestrator,
};

/// Demo page used when no URL is given
const DEFAULT_URL: &str = "https://en.wikipedia.org/wiki/Hello";

/// Deckhand - Turn a webpage into a shareable slide presentation
#[derive(Parser, Debug)]
#[command(name = "deckhand")]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// URL of the webpage to present
    #[arg(value_name = "URL")]
    url: Option<String>,

    /// Build the remote presentation after scraping
    #[arg(long)]
    create_presentation: bool,

    /// Print the scraped page as pretty JSON
    #[arg(long)]
    json: bool,

    /// Configuration file path
    #[arg(short = 'c', long, env = "DECKHAND_CONFIG", value_name = "FILE")]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short = 'l', long, env = "DECKHAND_LOG", default_value = "info")]
    log_level: String,
}

/// Initialize logging with the specified level
fn init_logging(level: &str) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        tracing_subscriber::EnvFilter::new(format!("deckhand={level},deckhand_core={level}"))
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let args = Args::parse();
    init_logging(&args.log_level)?;

    info!("Deckhand starting");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    let config =
        load_config_from_path(args.config.clone()).context("Failed to load configuration")?;
    info!(source = %config.source(), "Configuration loaded");

    let url = args.url.clone().unwrap_or_else(|| {
        println!("No URL provided, using default: {DEFAULT_URL}");
        DEFAULT_URL.to_string()
    });

    println!("Scraping URL: {url}");
    let source = FirecrawlSource::from_env(config.scrape.clone())
        .context("Firecrawl credentials missing")?;
    let page = source
        .scrape(&url)
        .await
        .context("Failed to scrape webpage")?;

    println!(
        "Extracted: {} sections, {} images",
        page.sections.len(),
        page.image_count()
    );
    println!("Page title: {}", page.title);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&page)?);
    }

    if !args.create_presentation {
        return Ok(());
    }

    let credentials = Credentials::from_env().context("Provider credentials missing")?;
    let store = Arc::new(CredentialStore::new(
        config.provider.auth_base.clone(),
        credentials,
    ));
    let backend = Arc::new(ApiClient::new(config, store));

    let presentation = backend
        .create_presentation(&page.title)
        .await
        .context("Failed to create presentation")?;
    println!("Created presentation with ID: {}", presentation.id);

    let orchestrator = SlideOrchestrator::new(Arc::clone(&backend));
    let first_slide = presentation.first_slide_id();
    let summary = orchestrator
        .run(&presentation.id, first_slide, page)
        .await
        .context("Presentation run failed")?;

    println!(
        "Committed {} slide(s), abandoned {} section(s)",
        summary.committed(),
        summary.abandoned()
    );
    if summary.abandoned() > 0 {
        println!("Abandoned: {}", summary.abandoned_sections.join(", "));
    }

    let link = backend
        .share_link(&presentation.id)
        .await
        .context("Failed to create share link")?;
    println!("\nPresentation created successfully!");
    println!("\nShareable link: {link}\n");

    Ok(())
}
