use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::ai::workflow::AnalysisSettings;
use crate::capture::camera::CameraOptions;
use crate::capture::library::LibraryOptions;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    pub openai_api_key: String,
    pub openai_model: String,
    pub api_base_url: String,
    pub max_tokens: u32,
    pub request_timeout_secs: u64,
    pub response_mode: ResponseMode,
    pub camera_quality: f32,
    pub library_aspect: [u32; 2],
    pub library_quality: f32,
}

/// How the model is asked to shape its reply.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ResponseMode {
    /// Strict JSON schema output; the message content is the JSON document.
    #[default]
    Structured,
    /// Free text with the JSON inside a ```json fenced block.
    FencedBlock,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            openai_api_key: String::new(),
            openai_model: "gpt-4o".to_string(),
            api_base_url: "https://api.openai.com/v1".to_string(),
            max_tokens: 500,
            request_timeout_secs: 60,
            response_mode: ResponseMode::Structured,
            camera_quality: 0.8,
            library_aspect: [4, 3],
            library_quality: 1.0,
        }
    }
}

impl AppConfig {
    pub fn load(app_data: &Path) -> Self {
        let config_path = app_data.join("config.json");
        let mut config = if config_path.exists() {
            match std::fs::read_to_string(&config_path) {
                Ok(content) => serde_json::from_str(&content).unwrap_or_else(|e| {
                    log::warn!("Ignoring unreadable config {}: {}", config_path.display(), e);
                    Self::default()
                }),
                Err(_) => Self::default(),
            }
        } else {
            let c = Self::default();
            c.save(app_data);
            c
        };

        // Environment wins over the stored key
        if let Ok(key) = std::env::var("OPENAI_API_KEY") {
            if !key.is_empty() {
                config.openai_api_key = key;
            }
        }

        config
    }

    pub fn save(&self, app_data: &Path) {
        let config_path = app_data.join("config.json");
        match serde_json::to_string_pretty(self) {
            Ok(content) => {
                if let Err(e) = std::fs::write(&config_path, content) {
                    log::error!("Failed to write {}: {}", config_path.display(), e);
                }
            }
            Err(e) => log::error!("Failed to serialize config: {}", e),
        }
    }

    pub fn chat_completions_url(&self) -> String {
        format!("{}/chat/completions", self.api_base_url.trim_end_matches('/'))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }

    pub fn analysis_settings(&self) -> AnalysisSettings {
        AnalysisSettings {
            max_tokens: self.max_tokens,
            timeout: self.request_timeout(),
            mode: self.response_mode,
        }
    }

    pub fn camera_options(&self) -> CameraOptions {
        CameraOptions {
            quality: self.camera_quality,
        }
    }

    pub fn library_options(&self) -> LibraryOptions {
        LibraryOptions {
            aspect: (self.library_aspect[0], self.library_aspect[1]),
            quality: self.library_quality,
        }
    }
}

#[cfg(feature = "desktop")]
pub(crate) type ConfigState = std::sync::Arc<parking_lot::Mutex<AppConfig>>;

#[cfg(feature = "desktop")]
#[tauri::command]
pub fn get_config(config: tauri::State<'_, ConfigState>) -> AppConfig {
    config.lock().clone()
}

#[cfg(feature = "desktop")]
#[tauri::command]
pub fn update_config(
    app: tauri::AppHandle,
    config_state: tauri::State<'_, ConfigState>,
    screen: tauri::State<'_, crate::commands::ScreenState>,
    new_config: AppConfig,
) -> Result<(), String> {
    use tauri::Manager;

    let app_data = app
        .path()
        .app_data_dir()
        .map_err(|e: tauri::Error| e.to_string())?;

    let client = crate::ai::openai::OpenAIVisionClient::new(&new_config).map_err(|e| e.to_string())?;
    screen.reconfigure(crate::ai::workflow::AnalysisWorkflow::new(
        client,
        new_config.analysis_settings(),
    ));

    new_config.save(&app_data);
    *config_state.lock() = new_config;
    log::info!("Configuration updated");
    Ok(())
}
