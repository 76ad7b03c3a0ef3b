use crate::reply::{Oracle, OracleError, OracleReply};
use serde::Serialize;
use std::time::Duration;

// OpenAI-compatible chat-completions request (OpenAI, LiteLLM proxy, OpenRouter)
#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 1],
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

/// Oracle backed by an OpenAI-compatible `/chat/completions` endpoint.
/// The whole response body is handed back as [`OracleReply::Structured`].
pub struct ChatCompletionsOracle {
    client: reqwest::Client,
    base_url: String,
    model: String,
    api_key: Option<String>,
    temperature: Option<f32>,
}

impl ChatCompletionsOracle {
    pub fn new(
        base_url: &str,
        model: &str,
        request_timeout: Duration,
    ) -> Result<Self, OracleError> {
        let client = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|e| OracleError::Transport(format!("building HTTP client: {e}")))?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            api_key: None,
            temperature: None,
        })
    }

    pub fn with_api_key(mut self, key: Option<String>) -> Self {
        self.api_key = key
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty());
        self
    }

    pub fn with_temperature(mut self, temperature: Option<f32>) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }

    fn request_body<'a>(&'a self, prompt: &'a str) -> ChatRequest<'a> {
        ChatRequest {
            model: &self.model,
            messages: [ChatMessage {
                role: "user",
                content: prompt,
            }],
            temperature: self.temperature,
        }
    }
}

#[async_trait::async_trait]
impl Oracle for ChatCompletionsOracle {
    async fn complete(&self, prompt: &str) -> Result<OracleReply, OracleError> {
        let mut req = self
            .client
            .post(self.endpoint())
            .json(&self.request_body(prompt));
        if let Some(key) = &self.api_key {
            req = req.bearer_auth(key);
        }

        let res = req
            .send()
            .await
            .map_err(|e| OracleError::Transport(e.to_string()))?;

        let status = res.status();
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            return Err(OracleError::Http {
                status: status.as_u16(),
                body,
            });
        }

        let value: serde_json::Value = res
            .json()
            .await
            .map_err(|e| OracleError::Malformed(format!("response body is not JSON: {e}")))?;
        Ok(OracleReply::Structured(value))
    }
}
