use serde_json::json;

pub const SCHEMA_NAME: &str = "food_analysis";

pub const ANALYSIS_PROMPT: &str = "Look at this image and: \
    1) List all food ingredients you can identify, \
    2) Suggest 3-5 possible recipes I could make with these ingredients. \
    Format your response as JSON with 'containsFood' (boolean), 'ingredients' (array) \
    and 'recipes' (array of objects with name and description). \
    If no food is detected, set containsFood to false.";

/// Extra instruction when the reply is parsed out of a fenced block.
pub const FENCED_BLOCK_HINT: &str = " Wrap the JSON in a ```json code block.";

/// Strict schema for structured output. Every property is required and closed,
/// as strict mode demands.
pub fn analysis_schema() -> serde_json::Value {
    json!({
        "type": "object",
        "properties": {
            "containsFood": { "type": "boolean" },
            "ingredients": {
                "type": "array",
                "items": { "type": "string" }
            },
            "recipes": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {
                        "name": { "type": "string" },
                        "description": { "type": "string" }
                    },
                    "required": ["name", "description"],
                    "additionalProperties": false
                }
            }
        },
        "required": ["containsFood", "ingredients", "recipes"],
        "additionalProperties": false
    })
}
