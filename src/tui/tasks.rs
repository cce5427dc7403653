//! Background task dispatch.
//!
//! Every function here spawns a tokio task that talks to the backend and
//! sends the result back into the event loop, stamped with the research id
//! the request was dispatched for. There are no retries; failures surface
//! once and the user retries explicitly.

use std::path::PathBuf;

use tokio::sync::mpsc;

use crate::core::paper::SelectionPlan;

use super::events::AppEvent;
use super::services::Services;

/// Fire the full per-paper fan-out: archive (when needed) plus the four
/// content requests, all in parallel, all stamped with the plan's id.
pub fn dispatch_selection(services: &Services, plan: &SelectionPlan) {
    let research_id = plan.research_id;
    log::info!(
        "Dispatching fan-out for paper {research_id} (archive: {})",
        plan.needs_archive
    );

    if plan.needs_archive {
        dispatch_archive(services, research_id);
    }
    dispatch_summary(services, research_id);
    dispatch_quiz(services, research_id);
    dispatch_tts(services, research_id);
    dispatch_video(services, research_id, false);
}

pub fn dispatch_archive(services: &Services, research_id: u64) {
    let api = services.api.clone();
    let tx = services.event_tx.clone();
    tokio::spawn(async move {
        let result = api
            .archive_paper(research_id)
            .await
            .map(|receipt| receipt.s3_key)
            .map_err(|e| e.to_string());
        let _ = tx.send(AppEvent::ArchiveSettled {
            research_id,
            result,
        });
    });
}

pub fn dispatch_summary(services: &Services, research_id: u64) {
    let api = services.api.clone();
    let tx = services.event_tx.clone();
    tokio::spawn(async move {
        let result = api
            .get_summary(research_id)
            .await
            .map_err(|e| e.to_string());
        let _ = tx.send(AppEvent::SummaryFetched {
            research_id,
            result,
        });
    });
}

pub fn dispatch_quiz(services: &Services, research_id: u64) {
    let api = services.api.clone();
    let tx = services.event_tx.clone();
    tokio::spawn(async move {
        let result = api.get_quiz(research_id).await.map_err(|e| e.to_string());
        let _ = tx.send(AppEvent::QuizFetched {
            research_id,
            result,
        });
    });
}

pub fn dispatch_tts(services: &Services, research_id: u64) {
    let api = services.api.clone();
    let tx = services.event_tx.clone();
    tokio::spawn(async move {
        let result = api
            .generate_tts(research_id)
            .await
            .map_err(|e| e.to_string());
        let _ = tx.send(AppEvent::TtsFetched {
            research_id,
            result,
        });
    });
}

pub fn dispatch_video(services: &Services, research_id: u64, force_regenerate: bool) {
    let api = services.api.clone();
    let tx = services.event_tx.clone();
    tokio::spawn(async move {
        let result = api
            .generate_video(research_id, force_regenerate)
            .await
            .map_err(|e| e.to_string());
        let _ = tx.send(AppEvent::VideoFetched {
            research_id,
            result,
        });
    });
}

/// Pull the podcast audio body for local playback.
pub fn dispatch_tts_audio(services: &Services, research_id: u64, audio_file: String) {
    let api = services.api.clone();
    let tx = services.event_tx.clone();
    tokio::spawn(async move {
        let result = api
            .fetch_tts_audio(&audio_file)
            .await
            .map_err(|e| e.to_string());
        let _ = tx.send(AppEvent::TtsAudioLoaded {
            research_id,
            result,
        });
    });
}

// ── Chatbot ─────────────────────────────────────────────────────────────────

/// Create the backend chat session. When `refresh_old` carries a previous
/// paper's id, its server-side cache is refreshed first, best-effort.
pub fn dispatch_chatbot_create(services: &Services, research_id: u64, refresh_old: Option<u64>) {
    let api = services.api.clone();
    let tx = services.event_tx.clone();
    tokio::spawn(async move {
        if let Some(old_id) = refresh_old {
            if let Err(e) = api.refresh_chatbot_cache(old_id).await {
                log::warn!("Cache refresh for previous paper {old_id} failed: {e}");
            }
        }
        let result = api
            .create_chatbot(research_id)
            .await
            .map(|_| ())
            .map_err(|e| e.to_string());
        let _ = tx.send(AppEvent::ChatbotCreated {
            research_id,
            result,
        });
    });
}

pub fn dispatch_chat_message(services: &Services, research_id: u64, question: String) {
    let api = services.api.clone();
    let tx = services.event_tx.clone();
    tokio::spawn(async move {
        let result = api
            .send_chat_message(research_id, &question)
            .await
            .map(|answer| answer.answer)
            .map_err(|e| e.to_string());
        let _ = tx.send(AppEvent::ChatAnswered {
            research_id,
            result,
        });
    });
}

// ── Downloads ───────────────────────────────────────────────────────────────

fn send_saved(
    tx: &mpsc::UnboundedSender<AppEvent>,
    label: &str,
    result: Result<PathBuf, String>,
) {
    let _ = tx.send(AppEvent::FileSaved {
        label: label.to_string(),
        result,
    });
}

/// Save the selected paper's PDF into the downloads directory.
pub fn dispatch_save_paper(services: &Services, research_id: u64) {
    let api = services.api.clone();
    let tx = services.event_tx.clone();
    let dest = services.downloads_dir.clone();
    tokio::spawn(async move {
        let result = api
            .save_paper_file(research_id, &dest)
            .await
            .map_err(|e| e.to_string());
        send_saved(&tx, "Paper PDF", result);
    });
}

/// Save the podcast narration mp3 into the downloads directory.
pub fn dispatch_save_audio(services: &Services, audio_file: String, title: String) {
    let api = services.api.clone();
    let tx = services.event_tx.clone();
    let dest = services.downloads_dir.clone();
    tokio::spawn(async move {
        let result = api
            .save_tts_audio(&audio_file, &title, &dest)
            .await
            .map_err(|e| e.to_string());
        send_saved(&tx, "Podcast audio", result);
    });
}

/// Save the video lecture into the downloads directory.
pub fn dispatch_save_video(services: &Services, research_id: u64) {
    let api = services.api.clone();
    let tx = services.event_tx.clone();
    let dest = services.downloads_dir.clone();
    tokio::spawn(async move {
        let result = api
            .save_video(research_id, &dest)
            .await
            .map_err(|e| e.to_string());
        send_saved(&tx, "Video lecture", result);
    });
}
