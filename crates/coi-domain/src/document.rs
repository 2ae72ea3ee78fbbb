//! Document module - raw COI text and its provenance

use crate::hashing;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of a document, derived from its source
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentId(String);

impl DocumentId {
    /// Create a document id
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the id as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// An ingested Certificate of Insurance
///
/// Immutable once ingested. The raw text is whatever the OCR stage produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    /// Document id
    pub id: DocumentId,
    /// Source the text was fetched from (path or URI)
    pub source: String,
    /// Raw text
    pub raw_text: String,
    /// blake3 digest of the raw text
    pub content_hash: String,
    /// When the document was ingested
    pub ingested_at: DateTime<Utc>,
}

impl Document {
    /// Create a document, hashing its text
    ///
    /// # Examples
    ///
    /// ```
    /// use coi_domain::Document;
    /// use chrono::Utc;
    ///
    /// let doc = Document::new("inbox/acme.txt", "CERTIFICATE OF LIABILITY INSURANCE", Utc::now());
    /// assert_eq!(doc.id.as_str(), "inbox/acme.txt");
    /// assert_eq!(doc.content_hash.len(), 64);
    /// ```
    pub fn new(
        source: impl Into<String>,
        raw_text: impl Into<String>,
        ingested_at: DateTime<Utc>,
    ) -> Self {
        let source = source.into();
        let raw_text = raw_text.into();
        Self {
            id: DocumentId::new(source.clone()),
            content_hash: hashing::hash_str(&raw_text),
            source,
            raw_text,
            ingested_at,
        }
    }

    /// Provenance of this document, without its text
    pub fn metadata(&self) -> DocumentMetadata {
        DocumentMetadata {
            document_id: self.id.clone(),
            source: self.source.clone(),
            content_hash: self.content_hash.clone(),
            ingested_at: self.ingested_at,
        }
    }
}

/// Source metadata included in reports
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentMetadata {
    /// Document id
    pub document_id: DocumentId,
    /// Source path or URI
    pub source: String,
    /// blake3 digest of the raw text
    pub content_hash: String,
    /// When the document was ingested
    pub ingested_at: DateTime<Utc>,
}
