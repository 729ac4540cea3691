//! Deckhand Core - Headless Webpage-to-Presentation Orchestration
//!
//! This crate turns a webpage into a remotely hosted slide presentation,
//! completely independent of any command-line surface. It scrapes the page
//! into ordered sections, then drives a remote presentation provider through
//! its REST and streaming endpoints until every section has a slide or has
//! been given up on.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐  ScrapedPage  ┌─────────────────────────────────────────┐
//! │   Content   │──────────────▶│            SlideOrchestrator            │
//! │   Source    │               │  ┌───────────┐     ┌─────────────────┐  │
//! │ (Firecrawl) │               │  │  Section  │────▶│  Attempt loop   │  │
//! └─────────────┘               │  │   Queue   │     │ (state machine) │  │
//!                               │  └───────────┘     └────────┬────────┘  │
//!                               │  ┌───────────┐              │           │
//!                               │  │   Image   │──────────────┤           │
//!                               │  │ Ingestion │              │           │
//!                               │  └───────────┘              │           │
//!                               └─────────────────────────────┼───────────┘
//!                                                             │
//!                                                  PresentationBackend
//!                                                             │
//!                               ┌─────────────────────────────┴───────────┐
//!                               │       Remote Presentation Provider      │
//!                               │  REST: create / delete / pick / upload  │
//!                               │        / share                          │
//!                               │  WebSocket: variant generation stream   │
//!                               └─────────────────────────────────────────┘
//! ```
//!
//! # Key Types
//!
//! - [`SlideOrchestrator`]: drives sections through the per-slide retry loop
//! - [`PresentationBackend`]: the provider as the orchestrator sees it
//! - [`ApiClient`]: production backend over REST plus the variant stream
//! - [`CredentialStore`]: cached bearer tokens with refresh-then-password fallback
//! - [`FirecrawlSource`]: webpage scraping via structured extraction
//! - [`ScrapedPage`]: validated sections ready for slide generation
//!
//! # Quick Start
//!
//! ```ignore
//! use std::sync::Arc;
//!
//! use deckhand_core::{
//!     load_config, ApiClient, CredentialStore, Credentials, FirecrawlSource,
//!     PresentationBackend, SlideOrchestrator,
//! };
//! use deckhand_core::scrape::ContentSource;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = load_config()?;
//!
//!     // Scrape the page into ordered, validated sections
//!     let source = FirecrawlSource::from_env(config.scrape.clone())?;
//!     let page = source.scrape("https://en.wikipedia.org/wiki/Hello").await?;
//!
//!     // Authenticate and create the presentation shell
//!     let credentials = Credentials::from_env()?;
//!     let store = Arc::new(CredentialStore::new(
//!         config.provider.auth_base.clone(),
//!         credentials,
//!     ));
//!     let backend = Arc::new(ApiClient::new(config, store));
//!     let presentation = backend.create_presentation(&page.title).await?;
//!
//!     // Drive every section into a slide, then share
//!     let orchestrator = SlideOrchestrator::new(Arc::clone(&backend));
//!     let summary = orchestrator
//!         .run(&presentation.id, presentation.first_slide_id(), page)
//!         .await?;
//!     println!("committed {} slide(s)", summary.committed());
//!     println!("{}", backend.share_link(&presentation.id).await?);
//!     Ok(())
//! }
//! ```
//!
//! # Module Overview
//!
//! - [`api`]: provider data model, error taxonomy, REST client, variant stream
//! - [`auth`]: credentials and the cached token lifecycle
//! - [`config`]: engine configuration (defaults, TOML file, env overrides)
//! - [`content`]: sections, validation contract, Introduction-first queue
//! - [`images`]: download-filter-upload pipeline for section images
//! - [`orchestrator`]: the per-slide attempt state machine and run loop
//! - [`scrape`]: webpage extraction through Firecrawl
//!
//! # No CLI Dependencies
//!
//! This crate has **zero** dependencies on clap, terminal output, or process
//! environment loading beyond documented credential variables. It's pure
//! engine logic that can drive a CLI, a service, or tests.

#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod api;
pub mod auth;
pub mod config;
pub mod content;
pub mod images;
pub mod orchestrator;
pub mod scrape;

// Re-exports for convenience
pub use api::{
    ApiClient, ApiError, GenerationError, GenerationRequest, ImagePayload, ImageRef, Presentation,
    PresentationBackend, PresentationId, SlideId, SlideRecord, Variant, VariantId,
};
pub use auth::{AuthError, CredentialStore, Credentials};
pub use content::{ContentError, ScrapedPage, Section, SectionQueue};
pub use images::{FetchError, FetchedImage, HttpImageFetcher, ImageFetcher, ImageIngestor};
pub use orchestrator::{
    RetryDecision, RunSummary, SectionOutcome, SlideEvent, SlideOrchestrator, SlideState,
};
pub use scrape::{ContentSource, FirecrawlSource, ScrapeError};

// Config exports
pub use config::{
    default_config_path, load_config, load_config_from_path, ConfigError, ConfigSource,
    EngineConfig, ProviderEndpoints, ScrapeConfig,
};
