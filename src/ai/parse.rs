use once_cell::sync::Lazy;
use regex::Regex;

use super::AnalysisResult;
use crate::config::ResponseMode;
use crate::error::AnalysisError;

static JSON_BLOCK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"```json\r?\n([\s\S]*?)\r?\n```").expect("valid fenced block pattern"));

/// The body of the first ```json fenced block, if any.
pub fn extract_fenced_json(content: &str) -> Option<&str> {
    JSON_BLOCK
        .captures(content)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

pub fn parse_analysis(content: &str, mode: ResponseMode) -> Result<AnalysisResult, AnalysisError> {
    let json = match mode {
        ResponseMode::Structured => content.trim(),
        ResponseMode::FencedBlock => extract_fenced_json(content).ok_or_else(|| {
            AnalysisError::MalformedResponse("Could not extract JSON from response".to_string())
        })?,
    };

    serde_json::from_str(json).map_err(|e| {
        log::debug!("Unparseable analysis JSON: {}", json);
        AnalysisError::MalformedResponse(format!("invalid analysis JSON: {}", e))
    })
}
