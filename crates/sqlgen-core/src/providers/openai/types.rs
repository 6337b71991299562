//! Chat-completions wire format, reduced to a single prompt and its answer

use crate::providers::provider::TokenUsage;
use serde::{Deserialize, Serialize};

/// Request body: one user turn, never streamed
#[derive(Debug, Serialize)]
pub struct CompletionRequest<'a> {
    pub model: &'a str,
    pub messages: [PromptMessage<'a>; 1],
    pub stream: bool,
}

#[derive(Debug, Serialize)]
pub struct PromptMessage<'a> {
    pub role: &'static str,
    pub content: &'a str,
}

#[derive(Debug, Deserialize)]
pub struct CompletionResponse {
    pub model: String,
    #[serde(default)]
    pub choices: Vec<CompletionChoice>,
    /// Absent on some compatible servers
    #[serde(default)]
    pub usage: Option<TokenUsage>,
}

#[derive(Debug, Deserialize)]
pub struct CompletionChoice {
    pub message: AnswerMessage,
}

#[derive(Debug, Deserialize)]
pub struct AnswerMessage {
    /// Null when the model refuses or only calls tools
    #[serde(default)]
    pub content: Option<String>,
}
