//! Content Source
//!
//! Turns a webpage URL into a validated [`ScrapedPage`] using Firecrawl's
//! structured extraction API. The protocol is asynchronous on the provider
//! side: one POST starts an extraction job, then the job is polled until it
//! completes.
//!
//! Extraction quality varies run to run, so the whole extract-and-validate
//! cycle repeats until the content satisfies the engine's contract (real
//! title, an Introduction, at least three sections) or the attempt budget
//! runs out.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::ScrapeConfig;
use crate::content::{ContentError, ScrapedPage, Section};

/// Environment variable holding the Firecrawl API key
pub const API_KEY_VAR: &str = "FIRECRAWL_API_KEY";

/// Poll cycles before a job is declared stuck (multiplied by the interval)
const MAX_POLL_CYCLES: u32 = 150;

/// Timeout for a single extraction API request
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Extraction instructions sent verbatim with every job
const EXTRACTION_PROMPT: &str = r#"

You'll be given the raw HTML of a webpage. Parse it and return a single JSON object with three keys: `title`, `paragraphs`, and `images`.

1. **Extract the page title**
    - Grab the text inside `<title>` and set `"title"` to that string.

2. **Build the `paragraphs` dictionary**
    - Keys: section headings.
    - Values: the concatenated plain text relevant paragraphs under that heading.
    - Always include an `"Introduction"` key first.
    - Include at least 4–6 sections total.
    - Order the entries exactly as they appear in the HTML.

3. **Build the `images` dictionary**
    - Keys: must exactly match the keys in `paragraphs`.
    - Values: a list of absolute, publicly accessible URLs from all `<img src="…">` tags within that section.
    - Try to include at least one image URL per section but if a section has no images, use an empty list. DO NOT INCLUDE EMPTY STRINGS IN THE LISTS.
    - Try to include mostly png images.
    - Include as many png images as possible.

4. **Output format**
    ```json
    {
        "title": "…",
        "paragraphs": {
        "Introduction": "…",
        "Section 1 Heading": "…",
        …
        },
        "images": {
        "Introduction": ["https://…", …],
        "Section 1 Heading": [ … ],
        …
        }
    }

"#;

/// Errors from webpage extraction
#[derive(Debug, Error)]
pub enum ScrapeError {
    /// A required environment variable is unset
    #[error("missing required environment variable: {0}")]
    MissingCredential(&'static str),

    /// The extraction API answered with a non-success status
    #[error("extraction API returned {status}: {body}")]
    Status {
        /// HTTP status code
        status: u16,
        /// Response body, when readable
        body: String,
    },

    /// The request never completed
    #[error("extraction request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The extraction job ended in a terminal non-success state
    #[error("extraction job ended as '{status}'")]
    JobFailed {
        /// Terminal status reported by the API
        status: String,
    },

    /// The job never completed within the polling budget
    #[error("extraction job still running after {waited:?}")]
    TimedOut {
        /// Total time spent polling
        waited: Duration,
    },

    /// The response arrived but made no sense
    #[error("malformed extraction response: {0}")]
    MalformedResponse(String),

    /// Every extraction attempt produced content that failed validation
    #[error("content failed validation after {attempts} extraction attempt(s)")]
    Exhausted {
        /// Attempts spent
        attempts: u32,
        /// Last validation failure
        #[source]
        source: ContentError,
    },
}

/// Produces page content for a presentation run
///
/// Abstracted so runs can be fed from fixtures in tests.
#[async_trait]
pub trait ContentSource: Send + Sync {
    /// Scrape one webpage into validated sections
    ///
    /// # Errors
    ///
    /// Returns an error when extraction fails or never yields content that
    /// satisfies the validation contract.
    async fn scrape(&self, url: &str) -> Result<ScrapedPage, ScrapeError>;
}

/// [`ContentSource`] backed by the Firecrawl extraction API
#[derive(Debug, Clone)]
pub struct FirecrawlSource {
    config: ScrapeConfig,
    api_key: String,
    http: reqwest::Client,
}

impl FirecrawlSource {
    /// Create a source with an explicit API key
    #[must_use]
    pub fn new(config: ScrapeConfig, api_key: impl Into<String>) -> Self {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .expect("Failed to create HTTP client");

        Self {
            config,
            api_key: api_key.into(),
            http,
        }
    }

    /// Create a source with the API key from `FIRECRAWL_API_KEY`
    ///
    /// # Errors
    ///
    /// Returns [`ScrapeError::MissingCredential`] when the variable is unset.
    pub fn from_env(config: ScrapeConfig) -> Result<Self, ScrapeError> {
        let api_key =
            std::env::var(API_KEY_VAR).map_err(|_| ScrapeError::MissingCredential(API_KEY_VAR))?;
        Ok(Self::new(config, api_key))
    }

    /// Start one extraction job and return its identifier
    async fn start_job(&self, url: &str) -> Result<String, ScrapeError> {
        let payload = json!({
            "urls": [url],
            "prompt": EXTRACTION_PROMPT,
            "schema": extraction_schema(),
        });

        let response = self
            .http
            .post(format!("{}/v1/extract", self.config.extract_base))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&payload)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ScrapeError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let start: StartResponse = response.json().await?;
        debug!(job_id = %start.id, url, "Extraction job started");
        Ok(start.id)
    }

    /// Poll a job until it completes or the budget runs out
    async fn poll_job(&self, job_id: &str) -> Result<RawExtract, ScrapeError> {
        for _ in 0..MAX_POLL_CYCLES {
            tokio::time::sleep(self.config.poll_interval).await;

            let response = self
                .http
                .get(format!("{}/v1/extract/{job_id}", self.config.extract_base))
                .header("Authorization", format!("Bearer {}", self.api_key))
                .send()
                .await?;

            let status = response.status();
            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                return Err(ScrapeError::Status {
                    status: status.as_u16(),
                    body,
                });
            }

            let poll: PollResponse = response.json().await?;
            match poll.status.as_str() {
                "completed" => {
                    return poll.data.ok_or_else(|| {
                        ScrapeError::MalformedResponse(
                            "completed job carried no data".to_string(),
                        )
                    });
                }
                "processing" | "pending" => {}
                other => {
                    return Err(ScrapeError::JobFailed {
                        status: other.to_string(),
                    });
                }
            }
        }

        Err(ScrapeError::TimedOut {
            waited: self.config.poll_interval * MAX_POLL_CYCLES,
        })
    }
}

#[async_trait]
impl ContentSource for FirecrawlSource {
    async fn scrape(&self, url: &str) -> Result<ScrapedPage, ScrapeError> {
        let mut attempt: u32 = 0;
        loop {
            attempt += 1;
            info!(url, attempt, "Extracting page content");

            let job_id = self.start_job(url).await?;
            let raw = self.poll_job(&job_id).await?;
            let page = ScrapedPage::from(raw);

            match page.validate() {
                Ok(()) => {
                    info!(
                        url,
                        title = %page.title,
                        sections = page.sections.len(),
                        images = page.image_count(),
                        "Extracted page content"
                    );
                    return Ok(page);
                }
                Err(error) if attempt >= self.config.max_attempts => {
                    return Err(ScrapeError::Exhausted {
                        attempts: attempt,
                        source: error,
                    });
                }
                Err(error) => {
                    warn!(
                        url,
                        attempt,
                        error = %error,
                        "Extracted content failed validation, retrying"
                    );
                }
            }
        }
    }
}

/// JSON Schema the extraction model must fill
fn extraction_schema() -> serde_json::Value {
    json!({
        "type": "object",
        "properties": {
            "title": { "type": "string" },
            "paragraphs": { "type": "object" },
            "images": { "type": "object" },
        },
        "required": ["title", "paragraphs", "images"],
    })
}

#[derive(Debug, Deserialize)]
struct StartResponse {
    id: String,
}

#[derive(Debug, Deserialize)]
struct PollResponse {
    status: String,
    #[serde(default)]
    data: Option<RawExtract>,
}

/// Extraction result as the API returns it
///
/// `paragraphs` keeps the page's section order thanks to serde_json's
/// `preserve_order` feature.
#[derive(Debug, Deserialize)]
pub(crate) struct RawExtract {
    #[serde(default)]
    title: String,
    #[serde(default)]
    paragraphs: serde_json::Map<String, serde_json::Value>,
    #[serde(default)]
    images: serde_json::Map<String, serde_json::Value>,
}

impl From<RawExtract> for ScrapedPage {
    fn from(raw: RawExtract) -> Self {
        let RawExtract {
            title,
            paragraphs,
            images,
        } = raw;

        let sections = paragraphs
            .into_iter()
            .map(|(name, body)| {
                let urls = images
                    .get(&name)
                    .and_then(serde_json::Value::as_array)
                    .map(|values| {
                        values
                            .iter()
                            .filter_map(serde_json::Value::as_str)
                            .filter(|url| !url.is_empty())
                            .map(str::to_string)
                            .collect()
                    })
                    .unwrap_or_default();

                let body = body.as_str().unwrap_or_default();
                Section::new(name, body).with_images(urls)
            })
            .collect();

        ScrapedPage::new(title, sections)
    }
}
