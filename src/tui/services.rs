use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::mpsc;

use crate::api::ApiClient;
use crate::config::AppConfig;
use crate::core::persist::{JsonFileStore, KeyValueStore};

use super::audio::AudioPlayer;
use super::events::AppEvent;

/// Centralized handle to the backend client and local facilities.
///
/// Created once at startup, then passed by ref to views and tasks.
/// The API client is Arc'd so spawned tasks can hold their own handle.
pub struct Services {
    pub api: Arc<ApiClient>,
    pub storage: Arc<dyn KeyValueStore>,
    pub audio: AudioPlayer,
    /// Where downloaded PDFs, audio, and video land.
    pub downloads_dir: PathBuf,
    pub event_tx: mpsc::UnboundedSender<AppEvent>,
}

impl Services {
    /// Initialize all services from config.
    ///
    /// Failures here are fatal — the TUI cannot run without local storage.
    pub fn init(
        config: &AppConfig,
        event_tx: mpsc::UnboundedSender<AppEvent>,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let data_dir = config.data_dir();
        log::info!("Initializing services with data dir: {}", data_dir.display());

        let storage: Arc<dyn KeyValueStore> =
            Arc::new(JsonFileStore::new(data_dir.join("state"))?);

        let api = Arc::new(ApiClient::new(config.api.base_url.clone()));
        log::info!("API client pointed at {}", api.base_url());

        let audio = AudioPlayer::new(event_tx.clone());

        let downloads_dir = data_dir.join("downloads");
        std::fs::create_dir_all(&downloads_dir)?;

        Ok(Self {
            api,
            storage,
            audio,
            downloads_dir,
            event_tx,
        })
    }
}
