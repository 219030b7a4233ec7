pub mod ai;
pub mod capture;
#[cfg(feature = "desktop")]
mod commands;
pub mod config;
pub mod error;
pub mod screen;

pub use ai::{AnalysisResult, Recipe};
pub use capture::CapturedImage;
pub use screen::{Notice, RecipeScreen, ScreenView};

#[cfg(feature = "desktop")]
use anyhow::Context;
#[cfg(feature = "desktop")]
use parking_lot::Mutex;
#[cfg(feature = "desktop")]
use std::sync::Arc;
#[cfg(feature = "desktop")]
use tauri::Manager;

#[cfg(feature = "desktop")]
#[cfg_attr(mobile, tauri::mobile_entry_point)]
pub fn run() {
    env_logger::init();

    tauri::Builder::default()
        .setup(|app| {
            init_state(app)?;
            log::info!("Recipe Vision initialized");
            Ok(())
        })
        .invoke_handler(tauri::generate_handler![
            // Config
            config::get_config,
            config::update_config,
            // Screen
            commands::get_screen,
            commands::current_image,
            commands::open_camera,
            commands::close_camera,
            commands::take_picture,
            commands::pick_image,
            commands::cancel_analysis,
            commands::new_photo,
        ])
        .run(tauri::generate_context!())
        .expect("error while running Recipe Vision");
}

#[cfg(feature = "desktop")]
fn init_state(app: &mut tauri::App) -> anyhow::Result<()> {
    let app_data = app
        .path()
        .app_data_dir()
        .context("Failed to get app data dir")?;
    std::fs::create_dir_all(&app_data)
        .with_context(|| format!("Failed to create {}", app_data.display()))?;

    let app_config = config::AppConfig::load(&app_data);
    if app_config.openai_api_key.is_empty() {
        log::warn!("No OpenAI API key configured; set OPENAI_API_KEY or update the config");
    }

    let captures = app
        .path()
        .app_cache_dir()
        .context("Failed to get app cache dir")?
        .join("captures");
    let store = capture::CaptureStore::new(&captures).context("Failed to prepare capture store")?;

    let client = ai::openai::OpenAIVisionClient::new(&app_config).context("Failed to build HTTP client")?;
    let workflow = ai::workflow::AnalysisWorkflow::new(client, app_config.analysis_settings());
    let notifier = Arc::new(commands::TauriNotifier::new(app.handle().clone()));
    let screen: commands::ScreenState = Arc::new(RecipeScreen::new(workflow, store, notifier));

    app.manage(screen);
    app.manage(Arc::new(Mutex::new(app_config)));
    Ok(())
}
