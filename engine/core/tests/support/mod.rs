//! Shared test doubles: a call-tracing presentation backend with scriptable
//! failure modes.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::json;

use deckhand_core::auth::EMAIL_VAR;
use deckhand_core::{
    ApiError, AuthError, GenerationError, GenerationRequest, ImagePayload, ImageRef, Presentation,
    PresentationBackend, PresentationId, SlideId, SlideRecord, Variant, VariantId,
};

/// One recorded backend interaction
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BackendCall {
    CreateSlide {
        order: i32,
    },
    DeleteSlides {
        slide_ids: Vec<SlideId>,
    },
    PickVariant {
        slide_id: SlideId,
        variant_id: VariantId,
    },
    UploadImages {
        files: Vec<(String, String)>,
    },
    GenerateSlide {
        slide_id: SlideId,
        context: String,
        image_count: usize,
    },
}

/// Scripted outcome for one generation attempt
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GenerationOutcome {
    Success,
    ImageRejection,
    Underrun,
    Transport,
    AuthFailure,
}

/// Scripted outcome for image uploads
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UploadOutcome {
    Succeed,
    FailStatus,
    FailAuth,
}

/// [`PresentationBackend`] double that records every call
///
/// Generation outcomes are consumed front-to-back from the script; an empty
/// script means success.
pub struct MockBackend {
    calls: Mutex<Vec<BackendCall>>,
    generation_script: Mutex<VecDeque<GenerationOutcome>>,
    upload_outcome: Mutex<UploadOutcome>,
    pick_fails: Mutex<bool>,
    create_fails: Mutex<bool>,
    variant_counter: Mutex<u32>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            generation_script: Mutex::new(VecDeque::new()),
            upload_outcome: Mutex::new(UploadOutcome::Succeed),
            pick_fails: Mutex::new(false),
            create_fails: Mutex::new(false),
            variant_counter: Mutex::new(0),
        }
    }

    pub fn with_generation_script(script: Vec<GenerationOutcome>) -> Self {
        let backend = Self::new();
        *backend.generation_script.lock().unwrap() = script.into();
        backend
    }

    pub fn fail_pick_variant(self) -> Self {
        *self.pick_fails.lock().unwrap() = true;
        self
    }

    pub fn fail_slide_creation(self) -> Self {
        *self.create_fails.lock().unwrap() = true;
        self
    }

    pub fn upload_outcome(self, outcome: UploadOutcome) -> Self {
        *self.upload_outcome.lock().unwrap() = outcome;
        self
    }

    pub fn calls(&self) -> Vec<BackendCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn created_orders(&self) -> Vec<i32> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                BackendCall::CreateSlide { order } => Some(order),
                _ => None,
            })
            .collect()
    }

    pub fn deleted_slides(&self) -> Vec<SlideId> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                BackendCall::DeleteSlides { slide_ids } => Some(slide_ids),
                _ => None,
            })
            .flatten()
            .collect()
    }

    pub fn picked_slides(&self) -> Vec<SlideId> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                BackendCall::PickVariant { slide_id, .. } => Some(slide_id),
                _ => None,
            })
            .collect()
    }

    pub fn generation_contexts(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                BackendCall::GenerateSlide { context, .. } => Some(context),
                _ => None,
            })
            .collect()
    }

    pub fn generation_image_counts(&self) -> Vec<usize> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                BackendCall::GenerateSlide { image_count, .. } => Some(image_count),
                _ => None,
            })
            .collect()
    }

    pub fn uploaded_files(&self) -> Vec<Vec<(String, String)>> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                BackendCall::UploadImages { files } => Some(files),
                _ => None,
            })
            .collect()
    }

    fn record(&self, call: BackendCall) {
        self.calls.lock().unwrap().push(call);
    }

    fn auth_error() -> AuthError {
        AuthError::MissingCredential(EMAIL_VAR)
    }

    fn status_error(operation: &'static str) -> ApiError {
        ApiError::Status {
            operation,
            status: 500,
            body: "scripted failure".to_string(),
        }
    }
}

#[async_trait]
impl PresentationBackend for MockBackend {
    async fn create_presentation(&self, _title: &str) -> Result<Presentation, ApiError> {
        Ok(Presentation {
            id: PresentationId::new(),
            slides: vec![SlideRecord { id: SlideId::new() }],
        })
    }

    async fn create_slide(
        &self,
        _presentation_id: &PresentationId,
        order: i32,
    ) -> Result<SlideId, ApiError> {
        self.record(BackendCall::CreateSlide { order });
        if *self.create_fails.lock().unwrap() {
            return Err(Self::status_error("create-new-slide"));
        }
        Ok(SlideId::new())
    }

    async fn delete_slides(&self, slide_ids: &[SlideId]) -> Result<(), ApiError> {
        self.record(BackendCall::DeleteSlides {
            slide_ids: slide_ids.to_vec(),
        });
        Ok(())
    }

    async fn pick_variant(
        &self,
        slide_id: &SlideId,
        variant_id: &VariantId,
    ) -> Result<(), ApiError> {
        self.record(BackendCall::PickVariant {
            slide_id: slide_id.clone(),
            variant_id: variant_id.clone(),
        });
        if *self.pick_fails.lock().unwrap() {
            return Err(Self::status_error("pick-slide-variant"));
        }
        Ok(())
    }

    async fn upload_images(
        &self,
        _presentation_id: &PresentationId,
        images: Vec<ImagePayload>,
    ) -> Result<Vec<ImageRef>, ApiError> {
        let files: Vec<(String, String)> = images
            .iter()
            .map(|image| (image.filename.clone(), image.content_type.clone()))
            .collect();
        self.record(BackendCall::UploadImages {
            files: files.clone(),
        });

        match *self.upload_outcome.lock().unwrap() {
            UploadOutcome::Succeed => Ok(files
                .into_iter()
                .map(|(filename, _)| ImageRef(json!({ "file": filename })))
                .collect()),
            UploadOutcome::FailStatus => {
                Err(Self::status_error("upload-images-for-slide-generation"))
            }
            UploadOutcome::FailAuth => Err(ApiError::Auth(Self::auth_error())),
        }
    }

    async fn generate_slide(
        &self,
        request: &GenerationRequest,
    ) -> Result<Variant, GenerationError> {
        self.record(BackendCall::GenerateSlide {
            slide_id: request.slide_id.clone(),
            context: request.context.clone(),
            image_count: request.images.len(),
        });

        let outcome = self
            .generation_script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(GenerationOutcome::Success);

        match outcome {
            GenerationOutcome::Success => {
                let mut counter = self.variant_counter.lock().unwrap();
                *counter += 1;
                let id = format!("variant-{counter}");
                Ok(Variant {
                    id: VariantId(id.clone()),
                    payload: json!({ "id": id }),
                })
            }
            GenerationOutcome::ImageRejection => Err(GenerationError::UnsupportedImage(
                "Input should be 'image/jpeg', 'image/png', 'image/gif' or 'image/webp'"
                    .to_string(),
            )),
            GenerationOutcome::Underrun => Err(GenerationError::Underrun { received: 1 }),
            GenerationOutcome::Transport => {
                Err(GenerationError::Transport("connection reset".to_string()))
            }
            GenerationOutcome::AuthFailure => Err(GenerationError::Auth(Self::auth_error())),
        }
    }

    async fn share_link(&self, _presentation_id: &PresentationId) -> Result<String, ApiError> {
        Ok("https://app.getalai.com/view/mock-share".to_string())
    }
}
