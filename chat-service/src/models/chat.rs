use super::nutrition::{parse_or_default, NutritionContext};
use serde::{Deserialize, Serialize};
use serde_json::value::RawValue;
use std::collections::HashMap;
use validator::Validate;

pub const MESSAGE_REQUIRED: &str = "Message is required";

/// Inbound `POST /chat` body.
#[derive(Debug, Clone, Default, Validate)]
pub struct ChatRequest {
    #[validate(length(min = 1, message = "Message is required"))]
    pub message: String,

    pub context: Option<NutritionContext>,
}

impl ChatRequest {
    /// Parse a raw request body. Anything that is not a JSON object yields an
    /// empty request, which then fails validation.
    ///
    /// Top-level fields are captured as raw JSON and decoded independently,
    /// so a bad `context` never costs the `message`. Repeated keys keep the
    /// last value. Only a JSON string counts as a message.
    pub fn from_body(body: &[u8]) -> Self {
        let fields: HashMap<String, Box<RawValue>> = match serde_json::from_slice(body) {
            Ok(fields) => fields,
            Err(e) => {
                tracing::debug!(error = %e, "Unparsable chat body, treating as empty");
                return Self::default();
            }
        };

        let message = fields
            .get("message")
            .and_then(|raw| serde_json::from_str::<String>(raw.get()).ok())
            .unwrap_or_default();
        let context = fields
            .get("context")
            .and_then(|raw| parse_or_default::<Option<NutritionContext>>(raw));

        Self { message, context }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatResponse {
    pub reply: String,
}
