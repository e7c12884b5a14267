use std::fmt;
use std::time::Duration;

use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};

use lumi_core::config::LlmSettings;
use lumi_core::error::{Error, Result, Stage};

use crate::generator::AnswerGenerator;
use crate::retry::send_with_retry;

/// Client for an OpenAI-compatible `/chat/completions` endpoint.
pub struct ChatCompletionsClient {
    client: reqwest::Client,
    base_url: String,
    model: String,
    api_key: Option<String>,
    /// Name of the variable the key should come from, for error messages.
    api_key_env: String,
    temperature: f32,
    max_tokens: u32,
    max_retries: u32,
    timeout: Duration,
}

impl fmt::Debug for ChatCompletionsClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChatCompletionsClient")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("max_retries", &self.max_retries)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl ChatCompletionsClient {
    /// The API key is read from `settings.api_key_env`; a missing key only
    /// fails once a request is made.
    pub fn from_settings(settings: &LlmSettings) -> Result<Self> {
        Self::new(settings, settings.api_key())
    }

    pub fn new(settings: &LlmSettings, api_key: Option<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(settings.timeout())
            .build()
            .map_err(|e| Error::InvalidConfig(format!("http client: {e}")))?;
        Ok(Self {
            client,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            model: settings.model.clone(),
            api_key,
            api_key_env: settings.api_key_env.clone(),
            temperature: settings.temperature,
            max_tokens: settings.max_tokens,
            max_retries: settings.max_retries,
            timeout: settings.timeout(),
        })
    }

    pub fn has_api_key(&self) -> bool { self.api_key.is_some() }

    async fn send_request(&self, prompt: &str) -> Result<String> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| Error::external(Stage::Generation, format!("{} is not set", self.api_key_env)))?;
        let body = ChatRequest {
            model: &self.model,
            messages: vec![ApiMessage { role: "user", content: prompt }],
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            stream: false,
        };
        let url = format!("{}/chat/completions", self.base_url);

        let response = send_with_retry(self.max_retries, self.timeout, || {
            self.client.post(&url).bearer_auth(api_key).json(&body).send()
        })
        .await?;

        let status = response.status();
        let text = response.text().await.map_err(|e| Error::external(Stage::Generation, e))?;
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            return Err(Error::external(Stage::Generation, format!("credentials rejected (status {status})")));
        }
        if !status.is_success() {
            tracing::error!(%status, body = %text, "chat completions request failed");
            return Err(Error::external(Stage::Generation, format!("request failed (status {status})")));
        }

        let resp: ChatResponse = serde_json::from_str(&text).map_err(|e| Error::external(Stage::Generation, format!("malformed response: {e}")))?;
        resp.choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| Error::external(Stage::Generation, "response has no choices"))
    }
}

impl AnswerGenerator for ChatCompletionsClient {
    fn model_id(&self) -> &str { &self.model }

    fn generate<'a>(&'a self, prompt: &'a str) -> BoxFuture<'a, Result<String>> {
        Box::pin(self.send_request(prompt))
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ApiMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
    stream: bool,
}

#[derive(Serialize)]
struct ApiMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    content: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_output_redacts_the_key() {
        let client = ChatCompletionsClient::new(&LlmSettings::default(), Some("gsk_secret".into())).unwrap();
        let shown = format!("{client:?}");
        assert!(!shown.contains("gsk_secret"));
        assert!(shown.contains("<redacted>"));
    }

    #[tokio::test]
    async fn missing_key_is_an_external_failure() {
        let client = ChatCompletionsClient::new(&LlmSettings::default(), None).unwrap();
        assert!(!client.has_api_key());
        let err = client.generate("hello").await.unwrap_err();
        match err {
            Error::ExternalService { stage, message } => {
                assert_eq!(stage, Stage::Generation);
                assert!(message.contains("GROQ_API_KEY"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
