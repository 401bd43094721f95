//! Summary from an OpenAI-compatible chat-completions endpoint.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{AiSummary, ProviderError, SuggestionProvider};
use crate::config::AiConfig;
use crate::detect::Finding;
use crate::diff::DiffFile;

pub const API_KEY_ENV: &str = "OPENAI_API_KEY";
pub const MODEL_ENV: &str = "OPENAI_MODEL";
pub const BASE_URL_ENV: &str = "OPENAI_BASE_URL";

const DEFAULT_MODEL: &str = "gpt-4o-mini";
const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// At most this many findings are listed in the prompt.
const MAX_PROMPT_FINDINGS: usize = 200;

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
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
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

pub struct OpenAiProvider {
    api_key: Option<String>,
    model: String,
    base_url: String,
    max_tokens: u32,
    temperature: f64,
    prompt_style: String,
}

impl OpenAiProvider {
    pub fn new(config: &AiConfig, api_key: Option<String>) -> Self {
        Self {
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            model: DEFAULT_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            max_tokens: config.max_tokens,
            temperature: config.temperature,
            prompt_style: config.prompt_style.clone(),
        }
    }

    /// Key, model, and base URL from the environment.
    pub fn from_env(config: &AiConfig) -> Self {
        let mut provider = Self::new(config, std::env::var(API_KEY_ENV).ok());
        if let Ok(model) = std::env::var(MODEL_ENV) {
            provider = provider.model(model);
        }
        if let Ok(url) = std::env::var(BASE_URL_ENV) {
            provider = provider.base_url(url);
        }
        provider
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    fn system_prompt(&self) -> &'static str {
        match self.prompt_style.as_str() {
            "bullets" => "You review iOS pull requests. Reply with at most eight short bullet points, most important first.",
            "detailed" => "You review iOS pull requests. Explain each class of problem, why it matters, and how to fix it.",
            _ => "You review iOS pull requests. Write a short PR summary of the main risks followed by concrete recommendations.",
        }
    }

    /// User message listing the findings and the size of the change.
    pub fn user_prompt(findings: &[Finding], diff: Option<&[DiffFile]>) -> String {
        let mut prompt = format!("Static analysis produced {} finding(s):\n", findings.len());
        for f in findings.iter().take(MAX_PROMPT_FINDINGS) {
            prompt.push_str(&format!("- {}\n", f));
        }
        if findings.len() > MAX_PROMPT_FINDINGS {
            prompt.push_str(&format!(
                "- ... {} more omitted\n",
                findings.len() - MAX_PROMPT_FINDINGS
            ));
        }
        if let Some(files) = diff {
            prompt.push_str("\nChanged files:\n");
            for file in files {
                prompt.push_str(&format!(
                    "- {} (+{} / -{} lines)\n",
                    file.path,
                    file.added_lines.len(),
                    file.removed_lines.len()
                ));
            }
        }
        prompt
    }

    async fn request(&self, key: &str, prompt: String) -> Result<String, ProviderError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("reviewgate/", env!("CARGO_PKG_VERSION")))
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        let body = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: self.system_prompt().to_string(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: prompt,
                },
            ],
            max_tokens: self.max_tokens,
            temperature: self.temperature,
        };

        let url = format!("{}/chat/completions", self.base_url);
        let response = client.post(&url).bearer_auth(key).json(&body).send().await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(ProviderError::Status {
                status: status.as_u16(),
                body: text,
            });
        }

        let parsed: ChatResponse = response.json().await?;
        parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content.trim().to_string())
            .filter(|c| !c.is_empty())
            .ok_or(ProviderError::EmptyResponse)
    }
}

impl SuggestionProvider for OpenAiProvider {
    fn name(&self) -> &'static str {
        "openai"
    }

    fn summarize(
        &self,
        findings: &[Finding],
        diff: Option<&[DiffFile]>,
    ) -> anyhow::Result<Option<AiSummary>> {
        let Some(key) = self.api_key.as_deref() else {
            debug!("{} not set, skipping remote summary", API_KEY_ENV);
            return Ok(None);
        };
        if findings.is_empty() {
            return Ok(None);
        }

        let prompt = Self::user_prompt(findings, diff);
        let runtime = tokio::runtime::Runtime::new().map_err(ProviderError::from)?;
        let body = runtime.block_on(self.request(key, prompt))?;

        Ok(Some(AiSummary {
            title: format!("AI Suggestions ({})", self.model),
            body,
        }))
    }
}
