//! Slide Orchestrator
//!
//! Drives one presentation run: pulls sections off the queue, resolves their
//! images, and walks each section through the per-slide attempt loop until it
//! commits or exhausts its budget.
//!
//! Each attempt is tracked by an explicit state machine instead of loose
//! counters, so the retry policy is testable without a backend:
//!
//! ```text
//!                create              commit
//!    NoSlide ───────────▶ Created ───────────▶ Committed
//!       ▲                    │
//!       │      discard       │ exhaust
//!       └────────────────────┼──────────▶ Abandoned
//! ```
//!
//! Failure handling is deliberately lopsided: a section may burn all four of
//! its attempts and the run shrugs and moves on, but a credential failure
//! anywhere aborts the whole run. Every failed attempt deletes its remote
//! slide first, so an abandoned section leaves nothing behind and the order
//! counter stays honest.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::api::{
    ApiError, GenerationError, GenerationRequest, ImageRef, PresentationBackend, PresentationId,
    SlideId,
};
use crate::content::{Section, SectionQueue};
use crate::images::{HttpImageFetcher, ImageFetcher, ImageIngestor};

/// Attempts allowed per section before it is abandoned
pub const MAX_TRIALS: u32 = 4;

/// Trial index whose image rejection drops images for the final attempt
pub const IMAGE_DROP_TRIAL: u32 = 2;

// =============================================================================
// Attempt State Machine
// =============================================================================

/// Where a section's slide currently stands
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SlideState {
    /// No remote slide is held
    NoSlide,
    /// A remote slide exists and awaits generated content
    Created(SlideId),
    /// The slide holds committed content and survives the run
    Committed(SlideId),
    /// The retry budget is spent, no remote slide persists
    Abandoned,
}

/// What happened to the slide during an attempt
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SlideEvent {
    /// A remote slide was created
    Create(SlideId),
    /// The default variant was selected and the slide kept
    Commit,
    /// The failed slide was deleted, leaving room for another attempt
    Discard,
    /// The failed slide was deleted and the budget is spent
    Exhaust,
}

impl SlideState {
    /// Pure transition function
    ///
    /// Events that make no sense for the current state leave it unchanged;
    /// terminal states absorb everything.
    #[must_use]
    pub fn apply(self, event: SlideEvent) -> Self {
        match (self, event) {
            (Self::NoSlide, SlideEvent::Create(id)) => Self::Created(id),
            (Self::Created(id), SlideEvent::Commit) => Self::Committed(id),
            (Self::Created(_), SlideEvent::Discard) => Self::NoSlide,
            (Self::Created(_), SlideEvent::Exhaust) => Self::Abandoned,
            (state, _) => state,
        }
    }
}

/// What to do after a failed generation attempt
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RetryDecision {
    /// Delete the slide and attempt again
    Retry {
        /// Drop all images before the next attempt
        drop_images: bool,
    },
    /// Delete the slide and abandon the section
    GiveUp,
}

impl RetryDecision {
    /// Decide the follow-up for a failure on trial index `trial`
    ///
    /// Images are dropped only when the provider rejected an image format on
    /// the penultimate trial, giving the final attempt a text-only shot.
    #[must_use]
    pub fn after_failure(error: &GenerationError, trial: u32) -> Self {
        if trial + 1 >= MAX_TRIALS {
            return Self::GiveUp;
        }
        Self::Retry {
            drop_images: error.is_image_rejection() && trial == IMAGE_DROP_TRIAL,
        }
    }
}

// =============================================================================
// Run Outcomes
// =============================================================================

/// Terminal outcome of one section
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SectionOutcome {
    /// A slide holds this section's content
    Committed {
        /// Remote slide that survived
        slide_id: SlideId,
    },
    /// All attempts failed, no slide persists for this section
    Abandoned,
}

/// What a completed run produced
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Sections that committed a slide, in processing order
    pub committed_sections: Vec<String>,
    /// Sections abandoned after exhausting retries, in processing order
    pub abandoned_sections: Vec<String>,
}

impl RunSummary {
    /// Number of slides committed
    #[must_use]
    pub fn committed(&self) -> usize {
        self.committed_sections.len()
    }

    /// Number of sections abandoned
    #[must_use]
    pub fn abandoned(&self) -> usize {
        self.abandoned_sections.len()
    }
}

// =============================================================================
// Orchestrator
// =============================================================================

/// Sequentially turns sections into committed slides
///
/// Sections are processed strictly one at a time: the provider's slide
/// ordering and the delete-on-failure protocol both assume no concurrent
/// mutation of the presentation.
pub struct SlideOrchestrator<B, F = HttpImageFetcher> {
    backend: Arc<B>,
    ingestor: ImageIngestor<B, F>,
}

impl<B: PresentationBackend> SlideOrchestrator<B> {
    /// Create an orchestrator that downloads images over plain HTTP
    #[must_use]
    pub fn new(backend: Arc<B>) -> Self {
        let ingestor = ImageIngestor::new(Arc::clone(&backend));
        Self { backend, ingestor }
    }
}

impl<B: PresentationBackend, F: ImageFetcher> SlideOrchestrator<B, F> {
    /// Create an orchestrator with a custom image fetcher
    #[must_use]
    pub fn with_ingestor(backend: Arc<B>, ingestor: ImageIngestor<B, F>) -> Self {
        Self { backend, ingestor }
    }

    /// Process every section into the presentation
    ///
    /// `initial_slide_id` is the slide the provider pre-created alongside the
    /// presentation; the first section reuses it at order 0 instead of
    /// creating a fresh one. The queue is fully drained regardless of
    /// per-section failures.
    ///
    /// # Errors
    ///
    /// Returns an error only for credential failures or failed slide
    /// creation. Per-section generation failures are absorbed into the
    /// summary.
    pub async fn run(
        &self,
        presentation_id: &PresentationId,
        initial_slide_id: Option<SlideId>,
        sections: impl Into<SectionQueue> + Send,
    ) -> Result<RunSummary, ApiError> {
        let mut order: i32 = 0;
        let mut carried = initial_slide_id;
        let mut summary = RunSummary::default();

        for section in sections.into() {
            let outcome = self
                .process_section(presentation_id, carried.take(), &mut order, &section)
                .await?;

            match outcome {
                SectionOutcome::Committed { .. } => {
                    summary.committed_sections.push(section.name.clone());
                }
                SectionOutcome::Abandoned => {
                    summary.abandoned_sections.push(section.name.clone());
                }
            }
        }

        info!(
            presentation_id = %presentation_id,
            committed = summary.committed(),
            abandoned = summary.abandoned(),
            "Presentation run complete"
        );
        Ok(summary)
    }

    /// Run the attempt loop for a single section
    async fn process_section(
        &self,
        presentation_id: &PresentationId,
        carried_slide: Option<SlideId>,
        order: &mut i32,
        section: &Section,
    ) -> Result<SectionOutcome, ApiError> {
        let mut images = self.resolve_images(presentation_id, section).await?;
        let context = section.slide_context();

        // A carried slide already occupies order 0 on the provider side
        let mut state = match carried_slide {
            Some(id) => SlideState::Created(id),
            None => SlideState::NoSlide,
        };
        let mut trial: u32 = 0;

        while trial < MAX_TRIALS {
            if matches!(state, SlideState::NoSlide) {
                *order += 1;
                let id = self.backend.create_slide(presentation_id, *order).await?;
                state = state.apply(SlideEvent::Create(id));
            }
            let SlideState::Created(slide_id) = state.clone() else {
                break;
            };

            debug!(
                section = %section.name,
                slide_id = %slide_id,
                order = *order,
                trial,
                "Attempting slide generation"
            );

            let request =
                GenerationRequest::new(presentation_id.clone(), slide_id.clone(), context.clone())
                    .with_images(images.clone());

            match self.backend.generate_slide(&request).await {
                Ok(variant) => {
                    if let Err(error) = self.backend.pick_variant(&slide_id, &variant.id).await {
                        if let ApiError::Auth(auth) = error {
                            return Err(ApiError::Auth(auth));
                        }
                        warn!(
                            slide_id = %slide_id,
                            error = %error,
                            "Variant selection failed, keeping slide as generated"
                        );
                    }
                    info!(
                        section = %section.name,
                        slide_id = %slide_id,
                        order = *order,
                        trial,
                        "Committed slide"
                    );
                    state = state.apply(SlideEvent::Commit);
                    break;
                }
                Err(GenerationError::Auth(auth)) => return Err(ApiError::Auth(auth)),
                Err(error) => {
                    warn!(
                        section = %section.name,
                        slide_id = %slide_id,
                        trial,
                        error = %error,
                        "Slide generation attempt failed"
                    );

                    let decision = RetryDecision::after_failure(&error, trial);
                    self.discard_slide(&slide_id).await;
                    *order -= 1;
                    trial += 1;

                    match decision {
                        RetryDecision::Retry { drop_images } => {
                            if drop_images {
                                info!(
                                    section = %section.name,
                                    "Dropping images for the final attempt"
                                );
                                images.clear();
                            }
                            state = state.apply(SlideEvent::Discard);
                        }
                        RetryDecision::GiveUp => {
                            state = state.apply(SlideEvent::Exhaust);
                            break;
                        }
                    }
                }
            }
        }

        match state {
            SlideState::Committed(slide_id) => Ok(SectionOutcome::Committed { slide_id }),
            _ => {
                warn!(
                    section = %section.name,
                    trials = trial,
                    "Abandoning section after exhausted retries"
                );
                Ok(SectionOutcome::Abandoned)
            }
        }
    }

    /// Upload a section's images, degrading to none on non-fatal failure
    async fn resolve_images(
        &self,
        presentation_id: &PresentationId,
        section: &Section,
    ) -> Result<Vec<ImageRef>, ApiError> {
        if !section.has_images() {
            return Ok(Vec::new());
        }

        match self.ingestor.ingest(presentation_id, &section.image_urls).await {
            Ok(refs) => Ok(refs),
            Err(ApiError::Auth(auth)) => Err(ApiError::Auth(auth)),
            Err(error) => {
                warn!(
                    section = %section.name,
                    error = %error,
                    "Image upload failed, continuing without images"
                );
                Ok(Vec::new())
            }
        }
    }

    /// Best-effort remote deletion of a failed slide
    async fn discard_slide(&self, slide_id: &SlideId) {
        if let Err(error) = self
            .backend
            .delete_slides(std::slice::from_ref(slide_id))
            .await
        {
            warn!(
                slide_id = %slide_id,
                error = %error,
                "Failed to delete slide after failed attempt"
            );
        }
    }
}
