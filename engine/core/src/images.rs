//! Image Ingestion
//!
//! Downloads section images and hands the survivors to the provider in one
//! batch upload. The pipeline is tolerant by design: a dead link, a non-HTTP
//! URL, or an exotic format skips that image and never fails the batch. Zero
//! survivors short-circuits to "no images", which downstream produces a
//! text-only slide layout.
//!
//! Downloads go out with a browser User-Agent; plenty of image hosts refuse
//! obvious bots.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, warn};

use crate::api::{ApiError, ImagePayload, ImageRef, PresentationBackend, PresentationId};

/// Formats the provider accepts for slide generation
const ACCEPTED_EXTENSIONS: [&str; 4] = ["jpeg", "png", "gif", "webp"];

/// Assumed content type when an image response has none
const DEFAULT_IMAGE_CONTENT_TYPE: &str = "image/jpeg";

/// Timeout for a single image download
const FETCH_TIMEOUT: Duration = Duration::from_secs(30);

/// A downloaded image before content-type filtering
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FetchedImage {
    /// Content type reported by the host, when present
    pub content_type: Option<String>,
    /// Raw response body
    pub bytes: Vec<u8>,
}

/// Failure to download one image
#[derive(Debug, Error)]
pub enum FetchError {
    /// The host answered with a non-success status
    #[error("image host returned {status} for {url}")]
    Status {
        /// URL that was fetched
        url: String,
        /// HTTP status code
        status: u16,
    },

    /// The download never completed
    #[error("image download failed: {0}")]
    Transport(#[from] reqwest::Error),
}

/// Downloads raw image bytes
///
/// Abstracted so ingestion tests run without a network.
#[async_trait]
pub trait ImageFetcher: Send + Sync {
    /// Fetch one image
    ///
    /// # Errors
    ///
    /// Returns an error when the download fails; callers skip that URL.
    async fn fetch(&self, url: &str) -> Result<FetchedImage, FetchError>;
}

/// [`ImageFetcher`] backed by a plain HTTP client
#[derive(Debug, Clone)]
pub struct HttpImageFetcher {
    http: reqwest::Client,
}

impl HttpImageFetcher {
    /// Create a fetcher with the standard download timeout
    #[must_use]
    pub fn new() -> Self {
        let http = reqwest::Client::builder()
            .timeout(FETCH_TIMEOUT)
            .build()
            .expect("Failed to create HTTP client");
        Self { http }
    }
}

impl Default for HttpImageFetcher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ImageFetcher for HttpImageFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchedImage, FetchError> {
        let response = self
            .http
            .get(url)
            .header("User-Agent", crate::api::BROWSER_USER_AGENT)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);
        let bytes = response.bytes().await?.to_vec();

        Ok(FetchedImage {
            content_type,
            bytes,
        })
    }
}

/// Extension for an accepted content type, `None` when the format is skipped
fn accepted_extension(content_type: &str) -> Option<&str> {
    let extension = content_type.split('/').nth(1)?;
    if ACCEPTED_EXTENSIONS.contains(&extension) {
        Some(extension)
    } else {
        None
    }
}

/// Downloads a section's images and uploads the survivors to the provider
pub struct ImageIngestor<B, F = HttpImageFetcher> {
    backend: Arc<B>,
    fetcher: F,
}

impl<B: PresentationBackend> ImageIngestor<B> {
    /// Create an ingestor that downloads over plain HTTP
    #[must_use]
    pub fn new(backend: Arc<B>) -> Self {
        Self {
            backend,
            fetcher: HttpImageFetcher::new(),
        }
    }
}

impl<B: PresentationBackend, F: ImageFetcher> ImageIngestor<B, F> {
    /// Create an ingestor with a custom fetcher
    #[must_use]
    pub fn with_fetcher(backend: Arc<B>, fetcher: F) -> Self {
        Self { backend, fetcher }
    }

    /// Download `urls` and upload the usable ones, returning provider references
    ///
    /// Empty input returns empty output without touching the network. A URL
    /// that fails to download or carries an unsupported format is skipped
    /// with a log line. The upload happens only when at least one image
    /// survives.
    ///
    /// # Errors
    ///
    /// Returns an error only when the final batch upload fails; individual
    /// download failures never surface.
    pub async fn ingest(
        &self,
        presentation_id: &PresentationId,
        urls: &[String],
    ) -> Result<Vec<ImageRef>, ApiError> {
        if urls.is_empty() {
            return Ok(Vec::new());
        }

        let mut payloads = Vec::new();
        for (index, url) in urls.iter().enumerate() {
            if !url.starts_with("http") {
                debug!(url, "Skipping non-http image URL");
                continue;
            }

            let image = match self.fetcher.fetch(url).await {
                Ok(image) => image,
                Err(error) => {
                    warn!(url, error = %error, "Skipping failed image download");
                    continue;
                }
            };

            let content_type = image
                .content_type
                .unwrap_or_else(|| DEFAULT_IMAGE_CONTENT_TYPE.to_string())
                .to_lowercase();

            let Some(extension) = accepted_extension(&content_type) else {
                debug!(url, content_type, "Skipping unsupported image format");
                continue;
            };

            let filename = format!("image{index}.{extension}");
            payloads.push(ImagePayload {
                filename,
                content_type,
                bytes: image.bytes,
            });
        }

        if payloads.is_empty() {
            debug!(candidates = urls.len(), "No usable images survived filtering");
            return Ok(Vec::new());
        }

        self.backend.upload_images(presentation_id, payloads).await
    }
}
