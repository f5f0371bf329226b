//! Summary request and result types.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Default document identifier sent with single-document jobs
pub const DEFAULT_DOCUMENT_ID: &str = "1";

/// Default document language
pub const DEFAULT_LANGUAGE: &str = "en";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RequestError {
    #[error("document text is empty")]
    EmptyDocument,
    #[error("unknown summary length '{0}', expected short, medium or long")]
    UnknownLength(String),
}

/// How long the summary should be.
///
/// Each variant maps to exactly one sentence count; there is no way to ask
/// the service for any other number of sentences.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SummaryLength {
    Short,
    #[default]
    Medium,
    Long,
}

impl SummaryLength {
    pub const ALL: [SummaryLength; 3] = [Self::Short, Self::Medium, Self::Long];

    /// Number of sentences requested from the service
    pub fn sentence_count(self) -> u32 {
        match self {
            Self::Short => 3,
            Self::Medium => 5,
            Self::Long => 8,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Short => "short",
            Self::Medium => "medium",
            Self::Long => "long",
        }
    }
}

impl fmt::Display for SummaryLength {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SummaryLength {
    type Err = RequestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "short" => Ok(Self::Short),
            "medium" => Ok(Self::Medium),
            "long" => Ok(Self::Long),
            other => Err(RequestError::UnknownLength(other.to_string())),
        }
    }
}

/// A single-document summarisation request.
///
/// Fields are private so a constructed request always carries non-empty text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummaryRequest {
    document_text: String,
    length: SummaryLength,
    language: String,
    document_id: String,
}

impl SummaryRequest {
    /// Create a request with the default language and document id
    pub fn new(text: impl Into<String>, length: SummaryLength) -> Result<Self, RequestError> {
        let text = text.into();
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Err(RequestError::EmptyDocument);
        }

        Ok(Self {
            document_text: trimmed.to_string(),
            length,
            language: DEFAULT_LANGUAGE.to_string(),
            document_id: DEFAULT_DOCUMENT_ID.to_string(),
        })
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }

    pub fn with_document_id(mut self, id: impl Into<String>) -> Self {
        self.document_id = id.into();
        self
    }

    pub fn document_text(&self) -> &str {
        &self.document_text
    }

    pub fn length(&self) -> SummaryLength {
        self.length
    }

    pub fn sentence_count(&self) -> u32 {
        self.length.sentence_count()
    }

    pub fn language(&self) -> &str {
        &self.language
    }

    pub fn document_id(&self) -> &str {
        &self.document_id
    }
}

/// Extracted sentences in the order the service returned them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryResult {
    pub sentences: Vec<String>,
}

impl SummaryResult {
    pub fn new(sentences: Vec<String>) -> Self {
        Self { sentences }
    }

    /// The summary as one string, sentences separated by a single space
    pub fn text(&self) -> String {
        self.sentences.join(" ")
    }

    /// Check if the summary has any content
    pub fn is_empty(&self) -> bool {
        self.text().trim().is_empty()
    }
}

impl fmt::Display for SummaryResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text())
    }
}
