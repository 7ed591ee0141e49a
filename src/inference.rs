use std::fmt;
use std::str::FromStr;

use async_openai::config::OpenAIConfig;
use async_openai::error::{ApiError, OpenAIError};
use async_openai::types::{
    ChatCompletionRequestSystemMessageArgs, ChatCompletionRequestUserMessageArgs,
    CreateChatCompletionRequestArgs,
};
use async_openai::Client;
use backoff::ExponentialBackoffBuilder;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use crate::config::AppConfig;
use crate::error::InferenceError;
use crate::pipeline::DraftGenerator;
use crate::prompt;

/// Upper bound on generated email length, in completion tokens.
const MAX_COMPLETION_TOKENS: u32 = 700;
const TEMPERATURE: f32 = 0.7;

/// The fixed set of hosted models offered in the UI.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ModelChoice {
    #[default]
    Mistral7B,
    Llama31_8B,
    Qwen25_7B,
}

impl ModelChoice {
    pub const ALL: [ModelChoice; 3] = [
        ModelChoice::Mistral7B,
        ModelChoice::Llama31_8B,
        ModelChoice::Qwen25_7B,
    ];

    /// Identifier sent to the inference endpoint.
    pub fn id(self) -> &'static str {
        match self {
            ModelChoice::Mistral7B => "mistralai/Mistral-7B-Instruct-v0.3",
            ModelChoice::Llama31_8B => "meta-llama/Llama-3.1-8B-Instruct",
            ModelChoice::Qwen25_7B => "Qwen/Qwen2.5-7B-Instruct",
        }
    }

    /// Name shown in the model dropdown.
    pub fn label(self) -> &'static str {
        match self {
            ModelChoice::Mistral7B => "Mistral 7B Instruct",
            ModelChoice::Llama31_8B => "Llama 3.1 8B Instruct",
            ModelChoice::Qwen25_7B => "Qwen 2.5 7B Instruct",
        }
    }
}

impl fmt::Display for ModelChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

#[derive(Debug, Error)]
#[error("unrecognized model {0:?}")]
pub struct UnknownModel(pub String);

impl FromStr for ModelChoice {
    type Err = UnknownModel;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ModelChoice::ALL
            .into_iter()
            .find(|model| model.id().eq_ignore_ascii_case(s))
            .ok_or_else(|| UnknownModel(s.to_string()))
    }
}

impl Serialize for ModelChoice {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.id())
    }
}

impl<'de> Deserialize<'de> for ModelChoice {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Client for an OpenAI-compatible hosted inference endpoint.
///
/// One request, one response; rate-limit and server rejections surface to
/// the caller instead of being retried, and no state is kept across calls.
pub struct InferenceClient {
    api_base: String,
    api_token: Option<String>,
}

impl InferenceClient {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            api_base: config.api_base.clone(),
            api_token: config.api_token.clone(),
        }
    }

    /// Send `prompt` to `model` and return the generated text.
    ///
    /// The credential is checked before anything else, so a missing token
    /// never results in network traffic.
    pub fn generate(&self, model: ModelChoice, prompt: &str) -> Result<String, InferenceError> {
        let token = self
            .api_token
            .as_deref()
            .ok_or(InferenceError::MissingCredential)?;

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| InferenceError::Remote(format!("could not start async runtime: {e}")))?;

        runtime.block_on(self.request(token, model, prompt))
    }

    async fn request(
        &self,
        token: &str,
        model: ModelChoice,
        prompt: &str,
    ) -> Result<String, InferenceError> {
        let config = OpenAIConfig::new()
            .with_api_base(&self.api_base)
            .with_api_key(token);
        // Zero backoff window: one attempt, rejections surface immediately.
        let backoff = ExponentialBackoffBuilder::new()
            .with_max_elapsed_time(Some(std::time::Duration::ZERO))
            .build();
        let client = Client::build(reqwest::Client::new(), config, backoff);

        let request = CreateChatCompletionRequestArgs::default()
            .model(model.id())
            .messages([
                ChatCompletionRequestSystemMessageArgs::default()
                    .content(prompt::SYSTEM_PROMPT)
                    .build()
                    .map_err(classify)?
                    .into(),
                ChatCompletionRequestUserMessageArgs::default()
                    .content(prompt)
                    .build()
                    .map_err(classify)?
                    .into(),
            ])
            .max_tokens(MAX_COMPLETION_TOKENS)
            .temperature(TEMPERATURE)
            .build()
            .map_err(classify)?;

        debug!(model = model.id(), prompt_chars = prompt.len(), "sending completion request");
        let response = client.chat().create(request).await.map_err(classify)?;

        let text = response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .map(|content| content.trim().to_string())
            .filter(|content| !content.is_empty())
            .ok_or(InferenceError::EmptyCompletion)?;

        info!(model = model.id(), chars = text.len(), "completion received");
        Ok(text)
    }
}

impl DraftGenerator for InferenceClient {
    fn generate(&self, model: ModelChoice, prompt: &str) -> Result<String, InferenceError> {
        InferenceClient::generate(self, model, prompt)
    }
}

/// Map client errors onto the caller-facing taxonomy. Auth and rate-limit
/// rejections are recognized from the error payload; everything else is a
/// plain remote failure.
fn classify(err: OpenAIError) -> InferenceError {
    match err {
        OpenAIError::ApiError(api) => classify_api_error(api),
        other => InferenceError::Remote(other.to_string()),
    }
}

fn classify_api_error(api: ApiError) -> InferenceError {
    let kind = api.r#type.as_deref().unwrap_or("");
    let message = api.message;
    let lowered = message.to_lowercase();

    if kind.contains("rate_limit") || lowered.contains("rate limit") {
        InferenceError::RateLimited(message)
    } else if kind.contains("auth")
        || lowered.contains("api key")
        || lowered.contains("credential")
    {
        InferenceError::Auth(message)
    } else {
        InferenceError::Remote(message)
    }
}
