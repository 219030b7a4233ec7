use std::time::Duration;

use super::{parse, prompt, AnalysisResult, VisionClient, VisionRequest};
use crate::config::ResponseMode;
use crate::error::AnalysisError;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnalysisSettings {
    pub max_tokens: u32,
    pub timeout: Duration,
    pub mode: ResponseMode,
}

impl Default for AnalysisSettings {
    fn default() -> Self {
        Self {
            max_tokens: 500,
            timeout: Duration::from_secs(60),
            mode: ResponseMode::Structured,
        }
    }
}

/// Outcome of a successful round trip.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Food(AnalysisResult),
    NoFood,
}

/// Sends one photo to the vision model and interprets the reply.
pub struct AnalysisWorkflow<C> {
    client: C,
    settings: AnalysisSettings,
}

impl<C: VisionClient> AnalysisWorkflow<C> {
    pub fn new(client: C, settings: AnalysisSettings) -> Self {
        Self { client, settings }
    }

    fn request_for(&self, base64_jpeg: &str) -> VisionRequest {
        let (prompt, response_schema) = match self.settings.mode {
            ResponseMode::Structured => (
                prompt::ANALYSIS_PROMPT.to_string(),
                Some(prompt::analysis_schema()),
            ),
            ResponseMode::FencedBlock => (
                format!("{}{}", prompt::ANALYSIS_PROMPT, prompt::FENCED_BLOCK_HINT),
                None,
            ),
        };

        VisionRequest {
            prompt,
            image_base64: base64_jpeg.to_string(),
            max_tokens: self.settings.max_tokens,
            response_schema,
        }
    }

    pub async fn analyze(&self, base64_jpeg: &str) -> Result<Verdict, AnalysisError> {
        if base64_jpeg.is_empty() {
            return Err(AnalysisError::EmptyImage);
        }

        let request = self.request_for(base64_jpeg);
        log::info!(
            "Analyzing image ({} base64 bytes, {:?} mode)",
            base64_jpeg.len(),
            self.settings.mode
        );

        let content = tokio::time::timeout(self.settings.timeout, self.client.complete(request))
            .await
            .map_err(|_| AnalysisError::Timeout(self.settings.timeout))??;
        log::debug!("Model reply: {}", content);

        let result = parse::parse_analysis(&content, self.settings.mode)?;
        if !result.contains_food {
            return Ok(Verdict::NoFood);
        }

        log::info!(
            "Found {} ingredients, {} recipes",
            result.ingredients.len(),
            result.recipes.len()
        );
        Ok(Verdict::Food(result))
    }
}
