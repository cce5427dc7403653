//! HTTP client for the paper-learning backend.
//!
//! Thin typed wrappers over the backend surface: one request per call, status
//! checked, JSON decoded. No retries, no backoff, no caching — idempotency
//! and de-duplication live in the stores, not here. Binary endpoints save the
//! body to a local file and return the path.

pub mod error;
pub mod types;

use std::path::{Path, PathBuf};

use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::json;

pub use error::{ApiError, ApiResult};
pub use types::*;

/// Voice used for podcast/video narration. The backend accepts a `tts_mode`
/// knob on video generation.
pub const DEFAULT_TTS_MODE: &str = "standard";

#[derive(Clone)]
pub struct ApiClient {
    http: Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: Client::new(),
            base_url: normalize_base_url(base_url.into()),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// Map a non-success status to `ApiError::Status` with the reason phrase.
    async fn check(response: Response) -> ApiResult<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        Err(ApiError::Status {
            status: status.as_u16(),
            reason: reason_phrase(status),
        })
    }

    async fn decode<T: DeserializeOwned>(response: Response) -> ApiResult<T> {
        response.json::<T>().await.map_err(ApiError::Decode)
    }

    // ── Search ──────────────────────────────────────────────────────────

    /// POST /research/search — papers for one domain.
    pub async fn search_by_domain(&self, domain: Domain) -> ApiResult<Vec<Paper>> {
        log::info!("Searching papers for domain {}", domain.label());
        let response = self
            .http
            .post(self.url("/research/search"))
            .json(&json!({ "domain": domain.wire_value() }))
            .send()
            .await?;
        let body: SearchResponse = Self::decode(Self::check(response).await?).await?;
        let papers: Vec<Paper> = body
            .data
            .into_iter()
            .map(|record| Paper::from_record(record, domain))
            .collect();
        log::info!("Loaded {} papers for {}", papers.len(), domain.label());
        Ok(papers)
    }

    /// POST /research/search/keyword — free-text keyword search. Results are
    /// tagged with the domain the user is currently browsing.
    pub async fn search_by_keyword(
        &self,
        keyword: &str,
        domain: Domain,
    ) -> ApiResult<Vec<Paper>> {
        log::info!("Searching papers for keyword {keyword:?}");
        let response = self
            .http
            .post(self.url("/research/search/keyword"))
            .json(&json!({ "keyword": keyword }))
            .send()
            .await?;
        let body: SearchResponse = Self::decode(Self::check(response).await?).await?;
        Ok(body
            .data
            .into_iter()
            .map(|record| Paper::from_record(record, domain))
            .collect())
    }

    /// GET /research/{id} — single record, used to restore a lost selection.
    pub async fn get_paper(&self, research_id: u64) -> ApiResult<PaperRecord> {
        let response = self
            .http
            .get(self.url(&format!("/research/{research_id}")))
            .send()
            .await?;
        Self::decode(Self::check(response).await?).await
    }

    // ── Archive & files ─────────────────────────────────────────────────

    /// POST /research/download/{id} — ask the backend to persist the paper's
    /// source file to long-term storage. Distinct from a local download.
    pub async fn archive_paper(&self, research_id: u64) -> ApiResult<ArchiveReceipt> {
        log::info!("Archiving paper {research_id}");
        let response = self
            .http
            .post(self.url(&format!("/research/download/{research_id}")))
            .send()
            .await?;
        let receipt: ArchiveReceipt = Self::decode(Self::check(response).await?).await?;
        log::info!("Paper {research_id} archived at {}", receipt.s3_key);
        Ok(receipt)
    }

    /// GET /research/serve/{id} — save the paper PDF into `dest_dir`.
    /// Filename comes from Content-Disposition when present, else
    /// `research_{id}.pdf`.
    pub async fn save_paper_file(
        &self,
        research_id: u64,
        dest_dir: &Path,
    ) -> ApiResult<PathBuf> {
        let response = self
            .http
            .get(self.url(&format!("/research/serve/{research_id}")))
            .send()
            .await?;
        let response = Self::check(response).await?;
        let filename = response
            .headers()
            .get(reqwest::header::CONTENT_DISPOSITION)
            .and_then(|v| v.to_str().ok())
            .and_then(filename_from_disposition)
            .unwrap_or_else(|| format!("research_{research_id}.pdf"));
        self.save_body(response, dest_dir, &filename).await
    }

    async fn save_body(
        &self,
        response: Response,
        dest_dir: &Path,
        filename: &str,
    ) -> ApiResult<PathBuf> {
        let bytes = response.bytes().await?;
        std::fs::create_dir_all(dest_dir)?;
        let path = dest_dir.join(filename);
        std::fs::write(&path, &bytes)?;
        log::info!("Saved {} bytes to {}", bytes.len(), path.display());
        Ok(path)
    }

    // ── Derived content ─────────────────────────────────────────────────

    /// POST /summary — AI summary for the paper.
    pub async fn get_summary(&self, research_id: u64) -> ApiResult<SummaryDoc> {
        let response = self
            .http
            .post(self.url("/summary"))
            .json(&json!({ "research_id": research_id }))
            .send()
            .await?;
        Self::decode(Self::check(response).await?).await
    }

    /// POST /quiz — O/X quiz questions. May legitimately return zero items.
    pub async fn get_quiz(&self, research_id: u64) -> ApiResult<Vec<QuizQuestion>> {
        let response = self
            .http
            .post(self.url("/quiz"))
            .json(&json!({ "research_id": research_id }))
            .send()
            .await?;
        let body: QuizResponse = Self::decode(Self::check(response).await?).await?;
        log::info!("Quiz for {research_id}: {} questions", body.data.len());
        Ok(body.data)
    }

    /// POST /tts/from-s3 — generate (or fetch cached) podcast narration.
    pub async fn generate_tts(&self, research_id: u64) -> ApiResult<TtsTrack> {
        let response = self
            .http
            .post(self.url("/tts/from-s3"))
            .json(&json!({ "research_id": research_id }))
            .send()
            .await?;
        Self::decode(Self::check(response).await?).await
    }

    /// GET /tts/{file}/stream — full audio body for local playback.
    pub async fn fetch_tts_audio(&self, audio_file: &str) -> ApiResult<Vec<u8>> {
        let encoded = urlencoding::encode(audio_file);
        let response = self
            .http
            .get(self.url(&format!("/tts/{encoded}/stream")))
            .send()
            .await?;
        let response = Self::check(response).await?;
        Ok(response.bytes().await?.to_vec())
    }

    /// GET /tts/{file}/download — save narration as `{title}_explainer.mp3`.
    pub async fn save_tts_audio(
        &self,
        audio_file: &str,
        title: &str,
        dest_dir: &Path,
    ) -> ApiResult<PathBuf> {
        let encoded = urlencoding::encode(audio_file);
        let response = self
            .http
            .get(self.url(&format!("/tts/{encoded}/download")))
            .send()
            .await?;
        let response = Self::check(response).await?;
        let filename = format!("{}_explainer.mp3", sanitize_filename(title));
        self.save_body(response, dest_dir, &filename).await
    }

    /// POST /video — generate (or fetch cached) video lecture.
    pub async fn generate_video(
        &self,
        research_id: u64,
        force_regenerate: bool,
    ) -> ApiResult<VideoLecture> {
        let mut url = self.url("/video");
        if force_regenerate {
            url.push_str("?force_regenerate=true");
        }
        let response = self
            .http
            .post(url)
            .json(&json!({ "research_id": research_id, "tts_mode": DEFAULT_TTS_MODE }))
            .send()
            .await?;
        Self::decode(Self::check(response).await?).await
    }

    /// GET /video/{id} — save the lecture as `research_{id}.mp4`.
    pub async fn save_video(&self, research_id: u64, dest_dir: &Path) -> ApiResult<PathBuf> {
        let response = self
            .http
            .get(self.url(&format!("/video/{research_id}")))
            .send()
            .await?;
        let response = Self::check(response).await?;
        let filename = format!("research_{research_id}.mp4");
        self.save_body(response, dest_dir, &filename).await
    }

    // ── Chatbot ─────────────────────────────────────────────────────────

    /// POST /chatbot/{id} — create/warm the paper-grounded session.
    pub async fn create_chatbot(&self, research_id: u64) -> ApiResult<ChatbotSession> {
        let response = self
            .http
            .post(self.url(&format!("/chatbot/{research_id}")))
            .send()
            .await?;
        Self::decode(Self::check(response).await?).await
    }

    /// POST /chatbot/chat/{id} — one question, one answer.
    pub async fn send_chat_message(
        &self,
        research_id: u64,
        question: &str,
    ) -> ApiResult<ChatAnswer> {
        let response = self
            .http
            .post(self.url(&format!("/chatbot/chat/{research_id}")))
            .json(&json!({ "question": question }))
            .send()
            .await?;
        Self::decode(Self::check(response).await?).await
    }

    /// POST /chatbot/refresh-cache/{id} — best-effort server-side cleanup
    /// when the user moves to a different paper.
    pub async fn refresh_chatbot_cache(&self, research_id: u64) -> ApiResult<CacheRefresh> {
        let response = self
            .http
            .post(self.url(&format!("/chatbot/refresh-cache/{research_id}")))
            .send()
            .await?;
        Self::decode(Self::check(response).await?).await
    }
}

// ── Helpers ─────────────────────────────────────────────────────────────────

fn normalize_base_url(mut url: String) -> String {
    while url.ends_with('/') {
        url.pop();
    }
    url
}

fn reason_phrase(status: StatusCode) -> String {
    status
        .canonical_reason()
        .unwrap_or("Unknown")
        .to_string()
}

/// Extract `filename=` from a Content-Disposition header value, stripping
/// surrounding quotes.
pub(crate) fn filename_from_disposition(value: &str) -> Option<String> {
    let lower = value.to_ascii_lowercase();
    let idx = lower.find("filename=")?;
    let raw = value[idx + "filename=".len()..]
        .split(';')
        .next()?
        .trim()
        .trim_matches(|c| c == '"' || c == '\'');
    if raw.is_empty() {
        None
    } else {
        Some(raw.to_string())
    }
}

/// Keep downloaded filenames filesystem-safe.
fn sanitize_filename(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '-' || c == '_' || c == ' ' {
                c
            } else {
                '_'
            }
        })
        .collect();
    let trimmed = cleaned.trim().replace(' ', "_");
    if trimmed.is_empty() {
        "paper".to_string()
    } else {
        trimmed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn record_json(id: u64) -> serde_json::Value {
        serde_json::json!({
            "id": id,
            "title": "Paper",
            "abstract": "Abstract.",
            "authors": ["A"],
            "published_date": "2024-01-01",
            "categories": ["cs.LG"],
            "pdf_url": "https://example.org/p.pdf",
            "arxiv_url": "https://example.org/abs"
        })
    }

    #[tokio::test]
    async fn test_search_by_domain_decodes_papers() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/research/search"))
            .and(body_json(serde_json::json!({ "domain": "ai" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": [record_json(1), record_json(2)]
            })))
            .mount(&server)
            .await;

        let client = ApiClient::new(server.uri());
        let papers = client.search_by_domain(Domain::Ai).await.unwrap();
        assert_eq!(papers.len(), 2);
        assert_eq!(papers[0].research_id, 1);
        assert_eq!(papers[0].domain, Domain::Ai);
    }

    #[tokio::test]
    async fn test_get_paper_decodes_record() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/research/7"))
            .respond_with(ResponseTemplate::new(200).set_body_json(record_json(7)))
            .mount(&server)
            .await;

        let client = ApiClient::new(server.uri());
        let record = client.get_paper(7).await.unwrap();
        assert_eq!(record.id, 7);
        assert_eq!(record.title, "Paper");
    }

    #[tokio::test]
    async fn test_non_success_status_becomes_typed_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/summary"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let client = ApiClient::new(server.uri());
        let err = client.get_summary(9).await.unwrap_err();
        match err {
            ApiError::Status { status, reason } => {
                assert_eq!(status, 503);
                assert_eq!(reason, "Service Unavailable");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_quiz_may_be_empty() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/quiz"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({ "data": [] })),
            )
            .mount(&server)
            .await;

        let client = ApiClient::new(server.uri());
        let quiz = client.get_quiz(3).await.unwrap();
        assert!(quiz.is_empty());
    }

    #[tokio::test]
    async fn test_archive_returns_receipt() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/research/download/42"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "message": "ok",
                "research_id": 42,
                "s3_key": "papers/42.pdf"
            })))
            .mount(&server)
            .await;

        let client = ApiClient::new(server.uri());
        let receipt = client.archive_paper(42).await.unwrap();
        assert_eq!(receipt.s3_key, "papers/42.pdf");
    }

    #[tokio::test]
    async fn test_save_paper_file_uses_content_disposition() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/research/serve/42"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("Content-Disposition", "attachment; filename=\"neat.pdf\"")
                    .set_body_bytes(b"%PDF-1.4".to_vec()),
            )
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let client = ApiClient::new(server.uri());
        let saved = client.save_paper_file(42, dir.path()).await.unwrap();
        assert_eq!(saved.file_name().unwrap(), "neat.pdf");
        assert_eq!(std::fs::read(saved).unwrap(), b"%PDF-1.4");
    }

    #[tokio::test]
    async fn test_save_paper_file_fallback_name() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/research/serve/7"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"%PDF".to_vec()))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let client = ApiClient::new(server.uri());
        let saved = client.save_paper_file(7, dir.path()).await.unwrap();
        assert_eq!(saved.file_name().unwrap(), "research_7.pdf");
    }

    #[tokio::test]
    async fn test_chat_roundtrip() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chatbot/chat/5"))
            .and(body_json(serde_json::json!({ "question": "Why attention?" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "answer": "Because recurrence is slow.",
                "research_id": 5
            })))
            .mount(&server)
            .await;

        let client = ApiClient::new(server.uri());
        let answer = client.send_chat_message(5, "Why attention?").await.unwrap();
        assert_eq!(answer.answer, "Because recurrence is slow.");
    }

    #[test]
    fn test_filename_from_disposition() {
        assert_eq!(
            filename_from_disposition("attachment; filename=\"a b.pdf\"").as_deref(),
            Some("a b.pdf")
        );
        assert_eq!(
            filename_from_disposition("attachment; filename=plain.pdf").as_deref(),
            Some("plain.pdf")
        );
        assert_eq!(filename_from_disposition("attachment"), None);
        assert_eq!(filename_from_disposition("attachment; filename="), None);
    }

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(sanitize_filename("A Study: Part/2"), "A_Study__Part_2");
        assert_eq!(sanitize_filename("  "), "paper");
    }

    #[test]
    fn test_base_url_trailing_slash_stripped() {
        let client = ApiClient::new("http://localhost:8000///");
        assert_eq!(client.base_url(), "http://localhost:8000");
    }
}
