use serde::Serialize;
use std::sync::Arc;
use tauri::{AppHandle, Emitter};

use crate::ai::openai::OpenAIVisionClient;
use crate::capture::camera::CameraPermission;
use crate::capture::library;
use crate::config::ConfigState;
use crate::screen::{Notice, Notifier, RecipeScreen, ScreenView};

pub type ScreenState = Arc<RecipeScreen<OpenAIVisionClient>>;

#[derive(Debug, Serialize)]
struct NoticeEvent<'a> {
    #[serde(flatten)]
    notice: &'a Notice,
    message: &'static str,
}

/// Forwards screen changes and alerts to the webview.
pub struct TauriNotifier {
    app: AppHandle,
}

impl TauriNotifier {
    pub fn new(app: AppHandle) -> Self {
        Self { app }
    }
}

impl Notifier for TauriNotifier {
    fn notice(&self, notice: &Notice) {
        let event = NoticeEvent {
            notice,
            message: notice.message(),
        };
        if let Err(e) = self.app.emit("notice", &event) {
            log::error!("Failed to emit notice: {}", e);
        }
    }

    fn screen_changed(&self, view: &ScreenView) {
        if let Err(e) = self.app.emit("screen-changed", view) {
            log::error!("Failed to emit screen change: {}", e);
        }
    }
}

#[tauri::command]
pub fn get_screen(screen: tauri::State<'_, ScreenState>) -> ScreenView {
    screen.view()
}

#[tauri::command]
pub fn current_image(screen: tauri::State<'_, ScreenState>) -> Option<String> {
    screen.image_data_uri()
}

#[tauri::command]
pub fn open_camera(
    screen: tauri::State<'_, ScreenState>,
    permission: CameraPermission,
) -> Result<ScreenView, String> {
    screen.open_camera(permission).map_err(|e| e.to_string())?;
    Ok(screen.view())
}

#[tauri::command]
pub fn close_camera(screen: tauri::State<'_, ScreenState>) -> Result<ScreenView, String> {
    screen.close_camera().map_err(|e| e.to_string())?;
    Ok(screen.view())
}

#[tauri::command]
pub async fn take_picture(
    screen: tauri::State<'_, ScreenState>,
    config: tauri::State<'_, ConfigState>,
    frame: String,
) -> Result<ScreenView, String> {
    let options = config.lock().camera_options();
    let screen = screen.inner().clone();
    screen
        .take_picture(&frame, &options)
        .await
        .map_err(|e| e.to_string())?;
    Ok(screen.view())
}

#[tauri::command]
pub async fn pick_image(
    screen: tauri::State<'_, ScreenState>,
    config: tauri::State<'_, ConfigState>,
) -> Result<ScreenView, String> {
    let options = config.lock().library_options();
    let screen = screen.inner().clone();
    let picked = library::pick_image_file().await;
    screen
        .select_image(picked.as_deref(), &options)
        .await
        .map_err(|e| e.to_string())?;
    Ok(screen.view())
}

#[tauri::command]
pub fn cancel_analysis(screen: tauri::State<'_, ScreenState>) -> Result<ScreenView, String> {
    screen.cancel_analysis().map_err(|e| e.to_string())?;
    Ok(screen.view())
}

#[tauri::command]
pub fn new_photo(screen: tauri::State<'_, ScreenState>) -> Result<ScreenView, String> {
    screen.new_photo().map_err(|e| e.to_string())?;
    Ok(screen.view())
}
