//! Narrative generators

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::{MoveSummary, NarrativeGenerator};
use crate::error::NarrativeError;
use crate::types::{CommandKind, MovementCommand};

/// Deterministic message, also the fallback for every other narrator
#[derive(Debug, Clone, Copy, Default)]
pub struct TemplateNarrator;

impl TemplateNarrator {
    pub fn render(command: &MovementCommand, summary: &MoveSummary) -> String {
        let target = match (&command.place_name, command.kind, command.direction) {
            (Some(place), _, _) => place.clone(),
            (None, CommandKind::DirectionMove, Some(direction)) => {
                format!("{:.0} m {}", command.distance_meters, direction)
            }
            _ => summary.to.to_string(),
        };

        format!(
            "Moving to {}: {:.0} m away, about {} s at {} pace",
            target, summary.distance_meters, summary.estimated_seconds, command.speed_profile
        )
    }
}

#[async_trait]
impl NarrativeGenerator for TemplateNarrator {
    fn uses_ai(&self) -> bool {
        false
    }

    async fn describe(
        &self,
        command: &MovementCommand,
        summary: &MoveSummary,
    ) -> Result<String, NarrativeError> {
        Ok(Self::render(command, summary))
    }
}

const SYSTEM_PROMPT: &str = "You narrate the movements of a virtual rabbit avatar on a map of \
Taiwan. Reply with one or two friendly sentences confirming the move. Answer in the language \
of the player's command.";

#[derive(Debug, Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<ChatMessage>,
    max_tokens: u32,
    temperature: f64,
}

#[derive(Debug, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

/// Narrator backed by any OpenAI-compatible `/chat/completions` endpoint
#[derive(Debug, Clone)]
pub struct ChatNarrator {
    api_key: Option<String>,
    base_url: String,
    model: String,
    temperature: f64,
    max_tokens: u32,
    http_client: reqwest::Client,
}

impl ChatNarrator {
    pub fn new(
        api_key: Option<String>,
        base_url: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            api_key,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
            temperature: 0.7,
            max_tokens: 200,
            http_client: reqwest::Client::builder()
                .timeout(Duration::from_secs(30))
                .build()
                .unwrap_or_default(),
        }
    }

    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }

    fn build_prompt(command: &MovementCommand, summary: &MoveSummary) -> String {
        format!(
            "Player command: \"{}\"\nKind: {:?}\nTarget: {}\nDestination: {}\nDistance: {:.0} m\nETA: {} s\nConfidence: {:.1}%",
            command.original_text,
            command.kind,
            command.place_name.as_deref().unwrap_or("-"),
            summary.to,
            summary.distance_meters,
            summary.estimated_seconds,
            command.confidence * 100.0
        )
    }
}

#[async_trait]
impl NarrativeGenerator for ChatNarrator {
    async fn describe(
        &self,
        command: &MovementCommand,
        summary: &MoveSummary,
    ) -> Result<String, NarrativeError> {
        let request = ChatCompletionRequest {
            model: self.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: SYSTEM_PROMPT.to_string(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: Self::build_prompt(command, summary),
                },
            ],
            max_tokens: self.max_tokens,
            temperature: self.temperature,
        };

        let mut builder = self
            .http_client
            .post(self.endpoint())
            .header("Content-Type", "application/json");

        if let Some(api_key) = &self.api_key {
            builder = builder.header("Authorization", format!("Bearer {}", api_key));
        }

        let response = builder
            .json(&request)
            .send()
            .await
            .map_err(|e| NarrativeError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(NarrativeError::Request(format!("{}: {}", status, error_text)));
        }

        let completion: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| NarrativeError::Request(e.to_string()))?;

        completion
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content.trim().to_string())
            .filter(|content| !content.is_empty())
            .ok_or(NarrativeError::Empty)
    }
}
