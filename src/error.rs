use std::time::Duration;

use thiserror::Error;

/// Failures while acquiring an image from the camera or the library.
#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("camera permission denied")]
    PermissionDenied,

    #[error("failed to access image file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to process image: {0}")]
    Image(#[from] image::ImageError),

    #[error("invalid frame payload: {0}")]
    InvalidPayload(String),
}

/// Failures of a single analysis request.
#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("no image data provided")]
    EmptyImage,

    #[error("OpenAI API key not configured")]
    MissingApiKey,

    #[error("request failed: {0}")]
    Network(String),

    #[error("API error: {0}")]
    Api(String),

    #[error("malformed response: {0}")]
    MalformedResponse(String),

    #[error("analysis timed out after {}s", .0.as_secs())]
    Timeout(Duration),
}

impl AnalysisError {
    /// Ingredient text shown in place of a real result when this error ends an analysis.
    pub fn sentinel(&self) -> &'static str {
        match self {
            Self::MalformedResponse(_) => "Error processing response",
            Self::Timeout(_) => "Analysis timed out",
            _ => "Error analyzing image",
        }
    }
}

impl From<reqwest::Error> for AnalysisError {
    fn from(e: reqwest::Error) -> Self {
        Self::Network(e.to_string())
    }
}

/// Screen actions that do not apply to the current state.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ScreenError {
    #[error("an analysis is already in progress")]
    Busy,

    #[error("cannot {action} while {state}")]
    InvalidTransition {
        state: &'static str,
        action: &'static str,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sentinel_names_failure_category() {
        assert_eq!(
            AnalysisError::MalformedResponse("x".into()).sentinel(),
            "Error processing response"
        );
        assert_eq!(AnalysisError::Api("x".into()).sentinel(), "Error analyzing image");
        assert_eq!(AnalysisError::Network("x".into()).sentinel(), "Error analyzing image");
        assert_eq!(AnalysisError::MissingApiKey.sentinel(), "Error analyzing image");
        assert_eq!(
            AnalysisError::Timeout(Duration::from_secs(3)).sentinel(),
            "Analysis timed out"
        );
    }

    #[test]
    fn timeout_message_reports_seconds() {
        let err = AnalysisError::Timeout(Duration::from_secs(60));
        assert_eq!(err.to_string(), "analysis timed out after 60s");
    }
}
