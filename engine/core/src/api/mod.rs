//! Remote Presentation API Surface
//!
//! Everything the engine knows about the provider lives here: typed
//! identifiers, the wire-facing data model, the error taxonomy, and the
//! [`PresentationBackend`] trait the orchestrator is generic over.
//!
//! The production implementation is [`ApiClient`] ([`rest`] for the REST
//! endpoints, [`stream`] for the variant generation WebSocket). Tests swap in
//! a call-tracing mock behind the same trait.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::auth::AuthError;

pub mod rest;
pub mod stream;

pub use rest::ApiClient;
pub use stream::resolve_outcome;

/// Browser User-Agent presented on image downloads and the stream handshake
///
/// Several endpoints (and most image hosts) reject requests without a
/// browser-looking agent.
pub(crate) const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) \
     AppleWebKit/537.36 (KHTML, like Gecko) Chrome/134.0.0.0 Safari/537.36";

// =============================================================================
// Identifiers
// =============================================================================

/// Identifier of a remote presentation, generated client-side
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PresentationId(pub Uuid);

impl PresentationId {
    /// Generate a fresh presentation id
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for PresentationId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for PresentationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Identifier of a remote slide, generated client-side
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SlideId(pub Uuid);

impl SlideId {
    /// Generate a fresh slide id
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SlideId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SlideId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Identifier of a streamed variant, assigned by the server
///
/// Kept as an opaque string: the engine only ever echoes it back on the
/// selection call.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VariantId(pub String);

impl fmt::Display for VariantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

// =============================================================================
// Data Model
// =============================================================================

/// A remote presentation as returned by the creation endpoint
#[derive(Clone, Debug, Deserialize)]
pub struct Presentation {
    /// Presentation identifier
    pub id: PresentationId,
    /// Slides present at creation time (the provider pre-creates the first)
    #[serde(default)]
    pub slides: Vec<SlideRecord>,
}

impl Presentation {
    /// Identifier of the pre-created first slide, when the provider made one
    #[must_use]
    pub fn first_slide_id(&self) -> Option<SlideId> {
        self.slides.first().map(|s| s.id.clone())
    }
}

/// Minimal view of a slide inside a [`Presentation`] response
#[derive(Clone, Debug, Deserialize)]
pub struct SlideRecord {
    /// Slide identifier
    pub id: SlideId,
}

/// One AI-generated candidate returned by the generation stream
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Variant {
    /// Server-assigned variant identifier
    pub id: VariantId,
    /// Full variant message as received
    pub payload: serde_json::Value,
}

/// Opaque provider-side handle for an uploaded image
///
/// Returned by the image upload endpoint and passed through to the generation
/// request untouched.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ImageRef(pub serde_json::Value);

/// A downloaded image ready for upload
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ImagePayload {
    /// Filename presented in the multipart form
    pub filename: String,
    /// MIME type of the image
    pub content_type: String,
    /// Raw image bytes
    pub bytes: Vec<u8>,
}

/// One slide generation request sent over the stream
#[derive(Clone, Debug)]
pub struct GenerationRequest {
    /// Presentation the slide belongs to
    pub presentation_id: PresentationId,
    /// Slide to generate content for
    pub slide_id: SlideId,
    /// Slide-specific context (section name and body)
    pub context: String,
    /// Provider-hosted images to place on the slide
    pub images: Vec<ImageRef>,
}

impl GenerationRequest {
    /// Create a request with no images
    pub fn new(
        presentation_id: PresentationId,
        slide_id: SlideId,
        context: impl Into<String>,
    ) -> Self {
        Self {
            presentation_id,
            slide_id,
            context: context.into(),
            images: Vec::new(),
        }
    }

    /// Attach uploaded image references
    #[must_use]
    pub fn with_images(mut self, images: Vec<ImageRef>) -> Self {
        self.images = images;
        self
    }
}

// =============================================================================
// Errors
// =============================================================================

/// Errors from the provider's REST surface
#[derive(Debug, Error)]
pub enum ApiError {
    /// The provider answered with a non-success status
    #[error("provider returned {status} for {operation}: {body}")]
    Status {
        /// Which endpoint was called
        operation: &'static str,
        /// HTTP status code
        status: u16,
        /// Response body, when readable
        body: String,
    },

    /// The request never completed
    #[error("provider request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The response arrived but made no sense
    #[error("malformed provider response for {operation}: {detail}")]
    MalformedResponse {
        /// Which endpoint was called
        operation: &'static str,
        /// What was wrong with the body
        detail: String,
    },

    /// No bearer token could be obtained
    #[error(transparent)]
    Auth(#[from] AuthError),
}

/// Failure of one slide generation attempt
///
/// These are the recoverable failures the orchestrator's retry loop feeds on;
/// only [`GenerationError::Auth`] is fatal.
#[derive(Debug, Error)]
pub enum GenerationError {
    /// The server rejected an uploaded image's MIME type mid-generation
    #[error("generation stream rejected an image: {0}")]
    UnsupportedImage(String),

    /// The stream closed before a variant was delivered
    #[error("generation stream closed after {received} message(s), expected at least 2")]
    Underrun {
        /// Messages received before closure
        received: usize,
    },

    /// The variant slot held something that is not a variant
    #[error("generation stream produced a malformed variant: {0}")]
    MalformedVariant(String),

    /// The connection could not be established or broke before any outcome
    #[error("generation stream transport error: {0}")]
    Transport(String),

    /// The server did not finish streaming within the configured budget
    #[error("generation stream produced no outcome within {0:?}")]
    TimedOut(Duration),

    /// No bearer token could be obtained
    #[error(transparent)]
    Auth(#[from] AuthError),
}

impl GenerationError {
    /// Whether this failure is the provider rejecting an image format
    ///
    /// Drives the distinct recovery policy: images are dropped for the final
    /// retry instead of simply retrying with the same inputs.
    #[must_use]
    pub fn is_image_rejection(&self) -> bool {
        matches!(self, Self::UnsupportedImage(_))
    }
}

// =============================================================================
// Backend Trait
// =============================================================================

/// The remote presentation provider, as the orchestrator sees it
///
/// [`ApiClient`] is the production implementation; tests substitute
/// call-tracing mocks. Every method re-validates the bearer credential
/// through the shared [`crate::auth::CredentialStore`] before talking to the
/// provider.
#[async_trait]
pub trait PresentationBackend: Send + Sync {
    /// Create a presentation titled `title`
    ///
    /// The provider pre-creates the first slide alongside the presentation.
    ///
    /// # Errors
    ///
    /// Any failure here is fatal for the run.
    async fn create_presentation(&self, title: &str) -> Result<Presentation, ApiError>;

    /// Create an empty slide at `order` within the presentation
    ///
    /// # Errors
    ///
    /// Any failure here is fatal for the run.
    async fn create_slide(
        &self,
        presentation_id: &PresentationId,
        order: i32,
    ) -> Result<SlideId, ApiError>;

    /// Delete slides remotely
    ///
    /// # Errors
    ///
    /// Callers treat failures as non-fatal (the slide may already be gone)
    /// but must log them: a surviving slide means the remote order drifts.
    async fn delete_slides(&self, slide_ids: &[SlideId]) -> Result<(), ApiError>;

    /// Confirm `variant_id` as the chosen content for `slide_id`
    ///
    /// # Errors
    ///
    /// Returns an error when the provider rejects the selection.
    async fn pick_variant(&self, slide_id: &SlideId, variant_id: &VariantId)
        -> Result<(), ApiError>;

    /// Upload downloaded images for use in slide generation
    ///
    /// Returns provider-side references in upload order.
    ///
    /// # Errors
    ///
    /// Returns an error when the batch upload fails as a whole.
    async fn upload_images(
        &self,
        presentation_id: &PresentationId,
        images: Vec<ImagePayload>,
    ) -> Result<Vec<ImageRef>, ApiError>;

    /// Run one generation stream session and return the default variant
    ///
    /// Opens a fresh stream, sends the request, drains messages until the
    /// server closes, and resolves the outcome.
    ///
    /// # Errors
    ///
    /// Returns the classified failure of this attempt; see
    /// [`GenerationError`].
    async fn generate_slide(&self, request: &GenerationRequest)
        -> Result<Variant, GenerationError>;

    /// Create (or refresh) the shareable viewer link for a presentation
    ///
    /// # Errors
    ///
    /// Returns an error when the share endpoint fails.
    async fn share_link(&self, presentation_id: &PresentationId) -> Result<String, ApiError>;
}
