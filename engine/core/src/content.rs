//! Scraped Content Model
//!
//! Types carrying webpage content from the content source to the
//! orchestrator: a page is a title plus ordered sections, each section a named
//! chunk of text with the image URLs found under that heading. Every section
//! maps to exactly one slide attempt.
//!
//! [`SectionQueue`] implements the processing order the orchestrator relies
//! on: a section literally named `"Introduction"` always comes out first, the
//! rest follow in page order, and every section is yielded exactly once.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Section name that is always processed first when present
pub const INTRODUCTION_SECTION: &str = "Introduction";

/// Minimum number of sections a scraped page must carry
pub const MINIMUM_SECTIONS: usize = 3;

/// Violations of the scraped page contract
#[derive(Debug, Error)]
pub enum ContentError {
    /// The page title was empty
    #[error("scraped page has an empty title")]
    EmptyTitle,

    /// Fewer sections than the contract requires
    #[error("scraped page has {found} section(s), need at least {minimum}")]
    TooFewSections {
        /// Sections actually present
        found: usize,
        /// Required minimum
        minimum: usize,
    },

    /// No "Introduction" section present
    #[error("scraped page has no \"{INTRODUCTION_SECTION}\" section")]
    MissingIntroduction,
}

/// One named chunk of source content, mapped to exactly one slide attempt
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Section {
    /// Section heading from the source page
    pub name: String,
    /// Concatenated paragraph text under the heading
    pub body: String,
    /// Absolute image URLs found under the heading, in page order
    #[serde(default)]
    pub image_urls: Vec<String>,
}

impl Section {
    /// Create a section with no images
    pub fn new(name: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            body: body.into(),
            image_urls: Vec::new(),
        }
    }

    /// Attach image URLs
    #[must_use]
    pub fn with_images(mut self, image_urls: Vec<String>) -> Self {
        self.image_urls = image_urls;
        self
    }

    /// The slide-specific context sent to the generation stream
    #[must_use]
    pub fn slide_context(&self) -> String {
        format!("{}: {}", self.name, self.body)
    }

    /// Whether any image URLs were scraped for this section
    #[must_use]
    pub fn has_images(&self) -> bool {
        !self.image_urls.is_empty()
    }
}

/// A webpage reduced to a title and ordered sections
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScrapedPage {
    /// Page title, used as the presentation title
    pub title: String,
    /// Sections in page order
    pub sections: Vec<Section>,
}

impl ScrapedPage {
    /// Create a page from a title and sections
    pub fn new(title: impl Into<String>, sections: Vec<Section>) -> Self {
        Self {
            title: title.into(),
            sections,
        }
    }

    /// Total number of image URLs across all sections
    #[must_use]
    pub fn image_count(&self) -> usize {
        self.sections.iter().map(|s| s.image_urls.len()).sum()
    }

    /// Check the content source contract
    ///
    /// A valid page has a non-empty title, at least [`MINIMUM_SECTIONS`]
    /// sections, and an [`INTRODUCTION_SECTION`].
    ///
    /// # Errors
    ///
    /// Returns the first violated constraint.
    pub fn validate(&self) -> Result<(), ContentError> {
        if self.title.trim().is_empty() {
            return Err(ContentError::EmptyTitle);
        }
        if self.sections.len() < MINIMUM_SECTIONS {
            return Err(ContentError::TooFewSections {
                found: self.sections.len(),
                minimum: MINIMUM_SECTIONS,
            });
        }
        if !self
            .sections
            .iter()
            .any(|s| s.name == INTRODUCTION_SECTION)
        {
            return Err(ContentError::MissingIntroduction);
        }
        Ok(())
    }
}

/// Ordered queue of pending sections
///
/// Yields `"Introduction"` first regardless of its position, then the
/// remaining sections in their original order. Dequeued sections are removed,
/// so no section can be processed twice even if its slide ultimately fails.
#[derive(Clone, Debug, Default)]
pub struct SectionQueue {
    sections: Vec<Section>,
}

impl SectionQueue {
    /// Build a queue from sections in page order
    #[must_use]
    pub fn new(sections: Vec<Section>) -> Self {
        Self { sections }
    }

    /// Number of sections still pending
    #[must_use]
    pub fn len(&self) -> usize {
        self.sections.len()
    }

    /// Whether the queue has been drained
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }
}

impl Iterator for SectionQueue {
    type Item = Section;

    fn next(&mut self) -> Option<Section> {
        if self.sections.is_empty() {
            return None;
        }
        let position = self
            .sections
            .iter()
            .position(|s| s.name == INTRODUCTION_SECTION)
            .unwrap_or(0);
        Some(self.sections.remove(position))
    }
}

impl From<ScrapedPage> for SectionQueue {
    fn from(page: ScrapedPage) -> Self {
        Self::new(page.sections)
    }
}
