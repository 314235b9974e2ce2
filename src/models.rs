//! Request/response models for the agent backend API.

use serde::{Deserialize, Serialize};

/// Default tool set offered to the backend when none is configured.
pub const DEFAULT_TOOLS: &[&str] = &["web_search", "weather", "file_write"];

/// One message of the conversation history, as the backend expects it.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }

    #[must_use]
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: "assistant".to_string(),
            content: content.into(),
        }
    }
}

/// Request payload for `POST /chat`. The response is a streamed plain-text
/// body, not JSON.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ChatRequest {
    pub messages: Vec<ChatMessage>,
    pub tools: Vec<String>,
    pub deep_research_mode: bool,
}

/// Response payload for `GET /tools`.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ToolsInfo {
    pub available_tools: Vec<String>,
    #[serde(default)]
    pub configured_tools: Vec<String>,
}

/// Response payload for `GET /health`.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct HealthInfo {
    pub status: String,
    #[serde(default)]
    pub version: Option<String>,
}
