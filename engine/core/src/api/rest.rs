//! REST Client for the Presentation Provider
//!
//! [`ApiClient`] implements [`PresentationBackend`] against the provider's
//! HTTP surface. Every call fetches a bearer token from the shared
//! [`CredentialStore`] first, so a token refresh mid-run is invisible to
//! callers.
//!
//! Endpoint payload shapes are load-bearing: the provider validates them
//! strictly and rejects unknown field spellings.

use std::sync::Arc;

use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info};

use crate::auth::CredentialStore;
use crate::config::EngineConfig;

use super::stream;
use super::{
    ApiError, GenerationError, GenerationRequest, ImagePayload, ImageRef, Presentation,
    PresentationBackend, PresentationId, SlideId, Variant, VariantId,
};

/// Theme applied to every created presentation
pub(crate) const DEFAULT_THEME_ID: &str = "a6bff6e5-3afc-4336-830b-fbc710081012";

/// Product discriminator the slide endpoints expect
pub(crate) const PRODUCT_TYPE: &str = "PRESENTATION_CREATOR";

/// Color set applied to presentations and slides
pub(crate) const DEFAULT_COLOR_SET_ID: u32 = 0;

/// HTTP client for the provider's REST endpoints
#[derive(Debug, Clone)]
pub struct ApiClient {
    config: EngineConfig,
    credentials: Arc<CredentialStore>,
    http: reqwest::Client,
}

impl ApiClient {
    /// Create a client from engine configuration and shared credentials
    #[must_use]
    pub fn new(config: EngineConfig, credentials: Arc<CredentialStore>) -> Self {
        let http = reqwest::Client::builder()
            .timeout(config.http_timeout)
            .build()
            .expect("Failed to create HTTP client");

        Self {
            config,
            credentials,
            http,
        }
    }

    /// Full URL for an API path
    fn endpoint(&self, path: &str) -> String {
        format!("{}{path}", self.config.provider.api_base)
    }

    /// POST request builder with the standard provider headers attached
    async fn authed_post(&self, path: &str) -> Result<reqwest::RequestBuilder, ApiError> {
        let token = self.credentials.bearer().await?;
        Ok(self
            .http
            .post(self.endpoint(path))
            .header("Accept", "*/*")
            .header("Accept-Language", "en")
            .header("Authorization", format!("Bearer {token}"))
            .header("Origin", self.config.provider.origin.clone()))
    }
}

/// Map a non-success response to [`ApiError::Status`], keeping the body
async fn check_status(
    operation: &'static str,
    response: reqwest::Response,
) -> Result<reqwest::Response, ApiError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    Err(ApiError::Status {
        operation,
        status: status.as_u16(),
        body,
    })
}

/// Extract the share identifier from the share endpoint's body
///
/// The endpoint answers with a bare JSON string, quotes included.
fn parse_share_identifier(body: &str) -> Option<&str> {
    let id = body.trim().trim_matches('"');
    if id.is_empty() {
        None
    } else {
        Some(id)
    }
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    images: Vec<ImageRef>,
}

#[async_trait::async_trait]
impl PresentationBackend for ApiClient {
    async fn create_presentation(&self, title: &str) -> Result<Presentation, ApiError> {
        let presentation_id = PresentationId::new();
        let payload = json!({
            "presentation_id": presentation_id,
            "presentation_title": title,
            "create_first_slide": true,
            "theme_id": DEFAULT_THEME_ID,
            "default_color_set_id": DEFAULT_COLOR_SET_ID,
        });

        let response = self
            .authed_post("/create-new-presentation")
            .await?
            .json(&payload)
            .send()
            .await?;
        let response = check_status("create-new-presentation", response).await?;
        let presentation: Presentation = response.json().await?;

        info!(
            presentation_id = %presentation.id,
            title,
            "Created presentation"
        );
        Ok(presentation)
    }

    async fn create_slide(
        &self,
        presentation_id: &PresentationId,
        order: i32,
    ) -> Result<SlideId, ApiError> {
        let slide_id = SlideId::new();
        let payload = json!({
            "slide_id": slide_id,
            "presentation_id": presentation_id,
            "product_type": PRODUCT_TYPE,
            "slide_order": order,
            "color_set_id": DEFAULT_COLOR_SET_ID,
        });

        let response = self
            .authed_post("/create-new-slide")
            .await?
            .json(&payload)
            .send()
            .await?;
        check_status("create-new-slide", response).await?;

        debug!(slide_id = %slide_id, order, "Created slide");
        Ok(slide_id)
    }

    async fn delete_slides(&self, slide_ids: &[SlideId]) -> Result<(), ApiError> {
        // Body is a bare JSON array, not an object
        let response = self
            .authed_post("/delete-slides")
            .await?
            .json(&slide_ids)
            .send()
            .await?;
        check_status("delete-slides", response).await?;

        debug!(count = slide_ids.len(), "Deleted slides");
        Ok(())
    }

    async fn pick_variant(
        &self,
        slide_id: &SlideId,
        variant_id: &VariantId,
    ) -> Result<(), ApiError> {
        let payload = json!({
            "slide_id": slide_id,
            "variant_id": variant_id,
        });

        let response = self
            .authed_post("/pick-slide-variant")
            .await?
            .json(&payload)
            .send()
            .await?;
        check_status("pick-slide-variant", response).await?;

        debug!(slide_id = %slide_id, variant_id = %variant_id, "Committed variant");
        Ok(())
    }

    async fn upload_images(
        &self,
        presentation_id: &PresentationId,
        images: Vec<ImagePayload>,
    ) -> Result<Vec<ImageRef>, ApiError> {
        let count = images.len();
        let mut form = reqwest::multipart::Form::new();
        for image in images {
            let part = reqwest::multipart::Part::bytes(image.bytes)
                .file_name(image.filename)
                .mime_str(&image.content_type)?;
            form = form.part("files", part);
        }
        let upload_input =
            reqwest::multipart::Part::text(json!({ "presentation_id": presentation_id }).to_string())
                .mime_str("application/json")?;
        form = form.part("upload_input", upload_input);

        let response = self
            .authed_post("/upload-images-for-slide-generation")
            .await?
            .multipart(form)
            .send()
            .await?;
        let response = check_status("upload-images-for-slide-generation", response).await?;
        let upload: UploadResponse = response.json().await?;

        info!(
            presentation_id = %presentation_id,
            uploaded = upload.images.len(),
            submitted = count,
            "Uploaded images"
        );
        Ok(upload.images)
    }

    async fn generate_slide(
        &self,
        request: &GenerationRequest,
    ) -> Result<Variant, GenerationError> {
        let token = self.credentials.bearer().await?;
        stream::run_generation(&self.config, &token, request).await
    }

    async fn share_link(&self, presentation_id: &PresentationId) -> Result<String, ApiError> {
        let payload = json!({ "presentation_id": presentation_id });

        let response = self
            .authed_post("/upsert-presentation-share")
            .await?
            .json(&payload)
            .send()
            .await?;
        let response = check_status("upsert-presentation-share", response).await?;
        let body = response.text().await?;

        let share_id = parse_share_identifier(&body).ok_or(ApiError::MalformedResponse {
            operation: "upsert-presentation-share",
            detail: "empty share identifier".to_string(),
        })?;

        let link = format!("{}/{share_id}", self.config.provider.viewer_base);
        info!(presentation_id = %presentation_id, link = %link, "Created share link");
        Ok(link)
    }
}
