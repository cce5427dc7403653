//! Wire types for the paper-learning backend and the client-side `Paper`
//! shape derived from them.

use serde::{Deserialize, Serialize};

/// Paper domain tags understood by the search endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Domain {
    Finance,
    Telecom,
    Manufacturing,
    Logistics,
    Ai,
    Cloud,
}

impl Domain {
    pub const ALL: [Domain; 6] = [
        Domain::Finance,
        Domain::Telecom,
        Domain::Manufacturing,
        Domain::Logistics,
        Domain::Ai,
        Domain::Cloud,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Domain::Finance => "Finance",
            Domain::Telecom => "Telecom",
            Domain::Manufacturing => "Manufacturing",
            Domain::Logistics => "Logistics",
            Domain::Ai => "AI",
            Domain::Cloud => "Cloud",
        }
    }

    /// Value sent in the search request body.
    pub fn wire_value(self) -> &'static str {
        match self {
            Domain::Finance => "finance",
            Domain::Telecom => "telecom",
            Domain::Manufacturing => "manufacturing",
            Domain::Logistics => "logistics",
            Domain::Ai => "ai",
            Domain::Cloud => "cloud",
        }
    }

    pub fn next(self) -> Domain {
        let idx = Domain::ALL.iter().position(|&d| d == self).unwrap_or(0);
        Domain::ALL[(idx + 1) % Domain::ALL.len()]
    }

    pub fn prev(self) -> Domain {
        let idx = Domain::ALL.iter().position(|&d| d == self).unwrap_or(0);
        Domain::ALL[(idx + Domain::ALL.len() - 1) % Domain::ALL.len()]
    }
}

/// Raw search/detail record as returned by the backend.
#[derive(Debug, Clone, Deserialize)]
pub struct PaperRecord {
    pub id: u64,
    pub title: String,
    /// The backend names this field "abstract", which is a Rust keyword.
    #[serde(rename = "abstract", default)]
    pub abstract_text: String,
    #[serde(default)]
    pub authors: Vec<String>,
    #[serde(default)]
    pub published_date: String,
    #[serde(default)]
    pub categories: Vec<String>,
    #[serde(default)]
    pub pdf_url: Option<String>,
    #[serde(default)]
    pub arxiv_url: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SearchResponse {
    pub data: Vec<PaperRecord>,
}

/// Client-side paper shape, immutable once selected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Paper {
    pub research_id: u64,
    pub domain: Domain,
    pub title: String,
    pub authors: Vec<String>,
    pub abstract_text: String,
    pub source: String,
    pub published_at: String,
    pub url: String,
    pub pdf_url: Option<String>,
    pub arxiv_url: Option<String>,
}

impl Paper {
    /// Build the display shape from a backend record and the domain it was
    /// searched under. Source falls back to "arXiv" when the record carries
    /// no categories; the canonical URL prefers the arXiv page.
    pub fn from_record(record: PaperRecord, domain: Domain) -> Self {
        let source = if record.categories.is_empty() {
            "arXiv".to_string()
        } else {
            record.categories.join(", ")
        };
        let url = record
            .arxiv_url
            .clone()
            .or_else(|| record.pdf_url.clone())
            .unwrap_or_default();
        Self {
            research_id: record.id,
            domain,
            title: record.title,
            authors: record.authors,
            abstract_text: record.abstract_text,
            source,
            published_at: record.published_date,
            url,
            pdf_url: record.pdf_url,
            arxiv_url: record.arxiv_url,
        }
    }
}

// ── Derived payloads ────────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
pub struct ArchiveReceipt {
    pub message: String,
    pub research_id: u64,
    pub s3_key: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SummaryDoc {
    pub title: String,
    /// Markdown body.
    pub summary: String,
    #[serde(default)]
    pub pdf_link: Option<String>,
}

/// Expected answer of an O/X quiz card.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OxAnswer {
    O,
    X,
}

impl OxAnswer {
    pub fn label(self) -> &'static str {
        match self {
            OxAnswer::O => "O",
            OxAnswer::X => "X",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct QuizQuestion {
    pub question: String,
    pub answer: OxAnswer,
    pub explanation: String,
}

#[derive(Debug, Deserialize)]
pub struct QuizResponse {
    pub data: Vec<QuizQuestion>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TtsTrack {
    #[serde(default)]
    pub message: String,
    pub tts_id: String,
    pub audio_file: String,
    /// Podcast transcript, markdown-ish prose.
    #[serde(default)]
    pub explainer: String,
    #[serde(default)]
    pub download_url: Option<String>,
    #[serde(default)]
    pub stream_url: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VideoStatus {
    Ready,
    Error,
    /// Anything else ("generating", "processing", ...) counts as in-flight.
    #[serde(other)]
    Generating,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct VideoLecture {
    #[serde(default)]
    pub message: String,
    pub research_id: u64,
    pub video_status: VideoStatus,
    #[serde(default)]
    pub stream_url: Option<String>,
}

// ── Chatbot ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
pub struct ChatbotSession {
    pub message: String,
    pub research_id: u64,
    pub chatbot_status: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatAnswer {
    pub answer: String,
    pub research_id: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CacheRefresh {
    pub message: String,
    pub research_id: u64,
    pub status: String,
}
