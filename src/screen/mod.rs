pub mod controller;

use futures::future::AbortHandle;
use serde::Serialize;

use crate::ai::AnalysisResult;
use crate::capture::{CapturedImage, ImageOrigin};

pub use controller::RecipeScreen;

/// Everything the single screen can be showing. Only one variant holds at a
/// time, so an open camera can never coexist with a running analysis.
#[derive(Debug, Clone, Default)]
pub enum Screen {
    #[default]
    Idle,
    Camera,
    Loading {
        image: CapturedImage,
        abort: AbortHandle,
    },
    Displaying {
        image: CapturedImage,
        result: AnalysisResult,
    },
    DisplayingDegraded {
        image: CapturedImage,
        result: AnalysisResult,
    },
}

impl Screen {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Camera => "camera",
            Self::Loading { .. } => "loading",
            Self::Displaying { .. } => "displaying",
            Self::DisplayingDegraded { .. } => "displaying degraded result",
        }
    }

    pub fn image(&self) -> Option<&CapturedImage> {
        match self {
            Self::Idle | Self::Camera => None,
            Self::Loading { image, .. }
            | Self::Displaying { image, .. }
            | Self::DisplayingDegraded { image, .. } => Some(image),
        }
    }

    pub fn result(&self) -> Option<&AnalysisResult> {
        match self {
            Self::Displaying { result, .. } | Self::DisplayingDegraded { result, .. } => Some(result),
            _ => None,
        }
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, Self::Loading { .. })
    }

    pub fn view(&self) -> ScreenView {
        match self {
            Self::Idle => ScreenView::Idle,
            Self::Camera => ScreenView::Camera,
            Self::Loading { image, .. } => ScreenView::Loading {
                image_uri: image.display_uri.clone(),
                origin: image.origin,
            },
            Self::Displaying { image, result } => ScreenView::Displaying {
                image_uri: image.display_uri.clone(),
                origin: image.origin,
                result: result.clone(),
            },
            Self::DisplayingDegraded { image, result } => ScreenView::DisplayingDegraded {
                image_uri: image.display_uri.clone(),
                origin: image.origin,
                result: result.clone(),
            },
        }
    }
}

/// Serializable snapshot for the front end.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum ScreenView {
    Idle,
    Camera,
    Loading {
        image_uri: String,
        origin: ImageOrigin,
    },
    Displaying {
        image_uri: String,
        origin: ImageOrigin,
        result: AnalysisResult,
    },
    DisplayingDegraded {
        image_uri: String,
        origin: ImageOrigin,
        result: AnalysisResult,
    },
}

/// Transient user-facing alert.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "detail", rename_all = "camelCase")]
pub enum Notice {
    CameraPermissionDenied,
    CaptureFailed(String),
    LibraryFailed(String),
    NoFoodDetected,
}

impl Notice {
    pub fn message(&self) -> &'static str {
        match self {
            Self::CameraPermissionDenied => "Sorry, we need camera permissions to make this work!",
            Self::CaptureFailed(_) => "Error taking picture",
            Self::LibraryFailed(_) => "Error selecting image from library",
            Self::NoFoodDetected => "No food detected in this image",
        }
    }
}

/// Where screen changes and alerts go.
pub trait Notifier: Send + Sync {
    fn notice(&self, notice: &Notice);
    fn screen_changed(&self, view: &ScreenView);
}
