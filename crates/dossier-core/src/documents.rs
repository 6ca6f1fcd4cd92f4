//! The document set: validated, order-preserving document references.
//!
//! Documents arrive from an ingestion collaborator as [`DocumentCandidate`]s.
//! Only PDFs are admitted; anything else is dropped without an error. This is
//! the one place in the workflow where input is filtered silently.

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::validation::ValidationError;

/// Minimum number of documents before the upload stage may advance.
pub const MIN_DOCUMENTS: usize = 3;

/// Advisory upper bound for a normal analysis. Never enforced.
pub const RECOMMENDED_MAX_DOCUMENTS: usize = 10;

/// The only media type admitted into a document set.
pub const PDF_MEDIA_TYPE: &str = "application/pdf";

/// Opaque, unique document token.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentId(String);

impl DocumentId {
    /// Generate a fresh random id.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().simple().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for DocumentId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for DocumentId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A file offered by the ingestion collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentCandidate {
    pub name: String,
    pub size: u64,
    #[serde(alias = "mediaType", alias = "type")]
    pub media_type: String,
}

impl DocumentCandidate {
    pub fn new(name: impl Into<String>, size: u64, media_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            size,
            media_type: media_type.into(),
        }
    }

    /// Shorthand for a PDF candidate.
    pub fn pdf(name: impl Into<String>, size: u64) -> Self {
        Self::new(name, size, PDF_MEDIA_TYPE)
    }

    /// Whether this candidate passes the ingestion media-type filter.
    ///
    /// Comparison ignores case and any `;`-separated parameters.
    pub fn is_pdf(&self) -> bool {
        is_pdf_media_type(&self.media_type)
    }
}

fn is_pdf_media_type(media_type: &str) -> bool {
    let essence = media_type.split(';').next().unwrap_or_default().trim();
    essence.eq_ignore_ascii_case(PDF_MEDIA_TYPE)
}

/// An admitted document. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentRef {
    id: DocumentId,
    name: String,
    size: u64,
    media_type: String,
}

impl DocumentRef {
    pub fn new(
        id: impl Into<DocumentId>,
        name: impl Into<String>,
        size: u64,
        media_type: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            size,
            media_type: media_type.into(),
        }
    }

    fn admit(candidate: DocumentCandidate) -> Self {
        Self {
            id: DocumentId::generate(),
            name: candidate.name,
            size: candidate.size,
            media_type: candidate.media_type,
        }
    }

    pub fn id(&self) -> &DocumentId {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn media_type(&self) -> &str {
        &self.media_type
    }

    /// Human-readable size: `0 Bytes`, `512 Bytes`, `1.5 KB`, `2.25 MB`.
    pub fn display_size(&self) -> String {
        format_size(self.size)
    }
}

fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["Bytes", "KB", "MB", "GB"];

    if bytes == 0 {
        return "0 Bytes".to_string();
    }

    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }

    let rounded = format!("{:.2}", value);
    let trimmed = rounded.trim_end_matches('0').trim_end_matches('.');
    format!("{} {}", trimmed, UNITS[unit])
}

/// Ordered list of admitted documents with unique ids.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct DocumentSet {
    documents: Vec<DocumentRef>,
}

impl DocumentSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a set from existing references, rejecting duplicate ids.
    ///
    /// Non-PDF references are dropped, the same as in [`DocumentSet::admit`].
    pub fn from_refs(documents: Vec<DocumentRef>) -> Result<Self, ValidationError> {
        let offered = documents.len();
        let documents: Vec<DocumentRef> = documents
            .into_iter()
            .filter(|doc| is_pdf_media_type(&doc.media_type))
            .collect();

        let mut seen = HashSet::new();
        for doc in &documents {
            if !seen.insert(doc.id.clone()) {
                return Err(ValidationError::DuplicateDocumentId(doc.id.to_string()));
            }
        }

        let dropped = offered - documents.len();
        if dropped > 0 {
            tracing::debug!(dropped, kept = documents.len(), "Dropped non-PDF references");
        }
        Ok(Self { documents })
    }

    /// Build a set by admitting candidates into an empty set.
    pub fn from_candidates(candidates: impl IntoIterator<Item = DocumentCandidate>) -> Self {
        let mut set = Self::new();
        set.admit(candidates);
        set
    }

    /// Admit PDF candidates after the existing documents.
    ///
    /// Non-PDF candidates are dropped. Returns the number admitted.
    pub fn admit(&mut self, candidates: impl IntoIterator<Item = DocumentCandidate>) -> usize {
        let before = self.documents.len();
        let mut dropped = 0usize;

        for candidate in candidates {
            if candidate.is_pdf() {
                self.documents.push(DocumentRef::admit(candidate));
            } else {
                dropped += 1;
            }
        }

        let admitted = self.documents.len() - before;
        tracing::debug!(admitted, dropped, total = self.documents.len(), "Ingested documents");

        if self.documents.len() > RECOMMENDED_MAX_DOCUMENTS {
            tracing::warn!(
                total = self.documents.len(),
                recommended = RECOMMENDED_MAX_DOCUMENTS,
                "Document set exceeds the recommended size"
            );
        }

        admitted
    }

    /// Remove a document by id.
    pub fn remove(&mut self, id: &DocumentId) -> Option<DocumentRef> {
        let index = self.documents.iter().position(|d| &d.id == id)?;
        Some(self.documents.remove(index))
    }

    pub fn get(&self, id: &DocumentId) -> Option<&DocumentRef> {
        self.documents.iter().find(|d| &d.id == id)
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &DocumentRef> {
        self.documents.iter()
    }

    pub fn as_slice(&self) -> &[DocumentRef] {
        &self.documents
    }

    /// Document names in set order.
    pub fn names(&self) -> Vec<String> {
        self.documents.iter().map(|d| d.name.clone()).collect()
    }

    /// Total bytes across all documents.
    pub fn total_size(&self) -> u64 {
        self.documents.iter().map(|d| d.size).sum()
    }

    /// Check the minimum-count gate for leaving the upload stage.
    pub fn check_minimum(&self) -> Result<(), ValidationError> {
        if self.documents.len() < MIN_DOCUMENTS {
            return Err(ValidationError::TooFewDocuments {
                required: MIN_DOCUMENTS,
                actual: self.documents.len(),
            });
        }
        Ok(())
    }
}

impl<'de> Deserialize<'de> for DocumentSet {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let documents = Vec::<DocumentRef>::deserialize(deserializer)?;
        Self::from_refs(documents).map_err(serde::de::Error::custom)
    }
}

impl<'a> IntoIterator for &'a DocumentSet {
    type Item = &'a DocumentRef;
    type IntoIter = std::slice::Iter<'a, DocumentRef>;

    fn into_iter(self) -> Self::IntoIter {
        self.documents.iter()
    }
}
