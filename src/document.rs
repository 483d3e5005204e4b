//! The academic document schema produced by the structuring step.
//!
//! Every field is optional: models routinely omit sections they could not
//! find, and a partially filled document is still worth rendering. Field
//! names serialise in camelCase (`tableOfContents`, `accessDate`) because
//! that is the shape the structuring prompt asks the model to emit.

use crate::error::StructuringError;
use serde::{Deserialize, Serialize};

/// Title used by [`StructuredDocument::fallback`].
pub const FALLBACK_TITLE: &str = "Untitled Document";
/// Author used by [`StructuredDocument::fallback`].
pub const FALLBACK_AUTHOR: &str = "Unknown Author";
/// Abstract used by [`StructuredDocument::fallback`].
pub const FALLBACK_ABSTRACT: &str = "No abstract available.";
/// Title of the single chapter in [`StructuredDocument::fallback`].
pub const FALLBACK_CHAPTER_TITLE: &str = "Content";

/// A structured academic document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StructuredDocument {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(default, rename = "abstract", skip_serializing_if = "Option::is_none")]
    pub abstract_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table_of_contents: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chapters: Option<Vec<Chapter>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub references: Option<Vec<Reference>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub appendices: Option<Vec<Appendix>>,
}

/// A top-level chapter.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Chapter {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subchapters: Option<Vec<Subchapter>>,
}

/// A titled block of text nested under a [`Chapter`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Subchapter {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

/// Appendices have the same shape as subchapters.
pub type Appendix = Subchapter;

/// A bibliography entry. Free text throughout; `year` is not checked to be
/// numeric.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reference {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub publisher: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_date: Option<String>,
}

impl StructuredDocument {
    /// The document substituted when the model's answer is unusable: fixed
    /// title, author and abstract, and the raw input as a single chapter.
    pub fn fallback(raw_text: &str) -> Self {
        Self {
            title: Some(FALLBACK_TITLE.to_string()),
            author: Some(FALLBACK_AUTHOR.to_string()),
            abstract_text: Some(FALLBACK_ABSTRACT.to_string()),
            chapters: Some(vec![Chapter {
                title: Some(FALLBACK_CHAPTER_TITLE.to_string()),
                content: Some(raw_text.to_string()),
                subchapters: None,
            }]),
            ..Default::default()
        }
    }

    /// Number of chapters, zero when the field is absent.
    pub fn chapter_count(&self) -> usize {
        self.chapters.as_ref().map_or(0, Vec::len)
    }

    /// Number of references, zero when the field is absent.
    pub fn reference_count(&self) -> usize {
        self.references.as_ref().map_or(0, Vec::len)
    }
}

/// Result of the structuring step: either the model's document or the
/// fallback along with the reason it was needed.
#[derive(Debug, Clone, PartialEq)]
pub enum StructuringOutcome {
    /// The model's answer parsed and matched the schema.
    Structured(StructuredDocument),
    /// The model's answer was unusable; `document` is
    /// [`StructuredDocument::fallback`] of the raw input.
    Fallback {
        document: StructuredDocument,
        reason: StructuringError,
    },
}

impl StructuringOutcome {
    /// Build the fallback outcome for `raw_text`.
    pub fn fallback(raw_text: &str, reason: StructuringError) -> Self {
        StructuringOutcome::Fallback {
            document: StructuredDocument::fallback(raw_text),
            reason,
        }
    }

    pub fn document(&self) -> &StructuredDocument {
        match self {
            StructuringOutcome::Structured(doc) => doc,
            StructuringOutcome::Fallback { document, .. } => document,
        }
    }

    pub fn into_document(self) -> StructuredDocument {
        match self {
            StructuringOutcome::Structured(doc) => doc,
            StructuringOutcome::Fallback { document, .. } => document,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, StructuringOutcome::Fallback { .. })
    }

    /// The fallback reason, if any.
    pub fn fallback_reason(&self) -> Option<&StructuringError> {
        match self {
            StructuringOutcome::Structured(_) => None,
            StructuringOutcome::Fallback { reason, .. } => Some(reason),
        }
    }
}
