// Generation module
// Prompt -> text, consumed as a black-box function with opaque sampling parameters

#[cfg(test)]
mod tests;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;
use url::Url;

use crate::QaError;
use crate::config::Config;

const DEFAULT_TIMEOUT_SECONDS: u64 = 300;

/// Produces an answer text from a finished prompt.
pub trait Generator {
    fn generate(&self, prompt: &str) -> crate::Result<String>;
}

/// Sampling parameters forwarded verbatim to the generation endpoint.
/// Opaque to the rest of the system.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GenerationParams {
    pub temperature: f32,
    pub max_tokens: u32,
    pub stop: Vec<String>,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            temperature: 0.2,
            max_tokens: 512,
            stop: Vec::new(),
        }
    }
}

/// Client for the Ollama generation endpoint.
///
/// No retry here: generation calls are long-running and the answer path
/// never retries.
#[derive(Debug, Clone)]
pub struct OllamaGenerator {
    base_url: Url,
    model: String,
    params: GenerationParams,
    agent: ureq::Agent,
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    options: GenerateOptions<'a>,
}

#[derive(Debug, Serialize)]
struct GenerateOptions<'a> {
    temperature: f32,
    num_predict: u32,
    #[serde(skip_serializing_if = "<[String]>::is_empty")]
    stop: &'a [String],
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    response: String,
}

impl OllamaGenerator {
    #[inline]
    pub fn new(config: &Config) -> Result<Self> {
        let base_url = config
            .ollama
            .url()
            .context("Failed to generate Ollama URL from config")?;

        let agent = ureq::Agent::config_builder()
            .timeout_global(Some(Duration::from_secs(DEFAULT_TIMEOUT_SECONDS)))
            .build()
            .into();

        Ok(Self {
            base_url,
            model: config.ollama.generation_model.clone(),
            params: config.generation.clone(),
            agent,
        })
    }

    #[inline]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.agent = ureq::Agent::config_builder()
            .timeout_global(Some(timeout))
            .build()
            .into();
        self
    }

    fn request_completion(&self, prompt: &str) -> Result<String> {
        let request = GenerateRequest {
            model: &self.model,
            prompt,
            stream: false,
            options: GenerateOptions {
                temperature: self.params.temperature,
                num_predict: self.params.max_tokens,
                stop: &self.params.stop,
            },
        };

        let url = self
            .base_url
            .join("/api/generate")
            .context("Failed to build generation URL")?;

        let request_json =
            serde_json::to_string(&request).context("Failed to serialize generation request")?;

        debug!(
            "Requesting completion from model {} (prompt length: {})",
            self.model,
            prompt.len()
        );

        let response_text = self
            .agent
            .post(url.as_str())
            .header("Content-Type", "application/json")
            .send(&request_json)
            .and_then(|mut resp| resp.body_mut().read_to_string())
            .context("Generation request failed")?;

        let response: GenerateResponse =
            serde_json::from_str(&response_text).context("Failed to parse generation response")?;

        Ok(response.response)
    }
}

impl Generator for OllamaGenerator {
    fn generate(&self, prompt: &str) -> crate::Result<String> {
        self.request_completion(prompt)
            .map_err(|e| QaError::Generation(format!("{e:#}")))
    }
}
