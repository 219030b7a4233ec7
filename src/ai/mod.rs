pub mod openai;
pub mod parse;
pub mod prompt;
pub mod workflow;

use serde::{Deserialize, Serialize};
use std::future::Future;

use crate::error::AnalysisError;

/// What the model found in one photo.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    pub contains_food: bool,
    #[serde(default)]
    pub ingredients: Vec<String>,
    #[serde(default)]
    pub recipes: Vec<Recipe>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recipe {
    pub name: String,
    #[serde(default)]
    pub description: String,
}

impl AnalysisResult {
    /// Placeholder shown when an analysis fails: one sentinel ingredient, no recipes.
    pub fn degraded(error: &AnalysisError) -> Self {
        Self {
            contains_food: false,
            ingredients: vec![error.sentinel().to_string()],
            recipes: Vec::new(),
        }
    }
}

/// One vision completion call.
#[derive(Debug, Clone, PartialEq)]
pub struct VisionRequest {
    pub prompt: String,
    pub image_base64: String,
    pub max_tokens: u32,
    /// Strict output schema; `None` leaves the reply free-form.
    pub response_schema: Option<serde_json::Value>,
}

impl VisionRequest {
    pub fn image_data_uri(&self) -> String {
        format!("data:image/jpeg;base64,{}", self.image_base64)
    }
}

/// A hosted multimodal model that answers with the text of its reply.
#[cfg_attr(test, mockall::automock)]
pub trait VisionClient: Send + Sync {
    fn complete(
        &self,
        request: VisionRequest,
    ) -> impl Future<Output = Result<String, AnalysisError>> + Send;
}
