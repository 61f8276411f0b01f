//! OpenAiCompatProvider -- concrete [`ModelProvider`] for any API speaking
//! the OpenAI REST shape (`/chat/completions`, `/embeddings`).
//!
//! The API key is wrapped in [`secrecy::SecretString`] and is only exposed
//! when constructing the `Authorization` header. No retries: a failure is
//! reported to the caller as a [`ProviderError`].

use std::time::Duration;

use chatledger_core::llm::provider::ModelProvider;
use chatledger_types::chat::TokenUsage;
use chatledger_types::config::ModelConfig;
use chatledger_types::error::ProviderError;
use chatledger_types::llm::{ChatTurn, Completion};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

/// Provider for OpenAI and OpenAI-compatible endpoints.
///
/// Does NOT derive Debug, so the key can never end up in a log line.
pub struct OpenAiCompatProvider {
    client: reqwest::Client,
    api_key: SecretString,
    base_url: String,
    chat_model: String,
    embedding_model: String,
}

impl OpenAiCompatProvider {
    pub fn new(api_key: SecretString, config: &ModelConfig) -> Result<Self, ProviderError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ProviderError::Request(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            api_key,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            chat_model: config.chat_model.clone(),
            embedding_model: config.embedding_model.clone(),
        })
    }

    pub fn chat_model(&self) -> &str {
        &self.chat_model
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn post<B: Serialize, R: for<'de> Deserialize<'de>>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<R, ProviderError> {
        let response = self
            .client
            .post(self.url(path))
            .bearer_auth(self.api_key.expose_secret())
            .json(body)
            .send()
            .await
            .map_err(|e| ProviderError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(match status.as_u16() {
                401 | 403 => ProviderError::AuthenticationFailed,
                429 => ProviderError::RateLimited,
                code => ProviderError::Status { status: code, body },
            });
        }

        response
            .json()
            .await
            .map_err(|e| ProviderError::Deserialization(format!("failed to parse response: {e}")))
    }
}

#[derive(Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatTurn],
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
    usage: Option<UsageBody>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct UsageBody {
    prompt_tokens: Option<u32>,
    completion_tokens: Option<u32>,
    total_tokens: Option<u32>,
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a str,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    #[serde(default)]
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

impl ModelProvider for OpenAiCompatProvider {
    fn name(&self) -> &str {
        "openai"
    }

    async fn complete(&self, turns: &[ChatTurn]) -> Result<Completion, ProviderError> {
        let body = ChatCompletionRequest {
            model: &self.chat_model,
            messages: turns,
        };
        let response: ChatCompletionResponse = self.post("/chat/completions", &body).await?;

        let content = response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|c| !c.trim().is_empty())
            .ok_or(ProviderError::EmptyResponse)?;

        Ok(Completion {
            content,
            usage: response.usage.map(|u| TokenUsage {
                prompt_tokens: u.prompt_tokens,
                completion_tokens: u.completion_tokens,
                total_tokens: u.total_tokens,
            }),
        })
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, ProviderError> {
        let body = EmbeddingRequest {
            model: &self.embedding_model,
            input: text,
        };
        let response: EmbeddingResponse = self.post("/embeddings", &body).await?;

        response
            .data
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .filter(|e| !e.is_empty())
            .ok_or(ProviderError::EmptyResponse)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn provider(server: &MockServer) -> OpenAiCompatProvider {
        let config = ModelConfig {
            base_url: server.uri(),
            ..Default::default()
        };
        OpenAiCompatProvider::new(SecretString::from("sk-test".to_string()), &config).unwrap()
    }

    #[tokio::test]
    async fn complete_returns_content_and_usage() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(header("authorization", "Bearer sk-test"))
            .and(body_partial_json(json!({
                "model": "gpt-4o-mini",
                "messages": [
                    {"role": "system", "content": "be brief"},
                    {"role": "user", "content": "hi"}
                ]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{"index": 0, "message": {"role": "assistant", "content": "Hello!"}}],
                "usage": {"prompt_tokens": 9, "completion_tokens": 2, "total_tokens": 11}
            })))
            .mount(&server)
            .await;

        let completion = provider(&server)
            .complete(&[ChatTurn::system("be brief"), ChatTurn::user("hi")])
            .await
            .unwrap();
        assert_eq!(completion.content, "Hello!");
        let usage = completion.usage.unwrap();
        assert_eq!(usage.prompt_tokens, Some(9));
        assert_eq!(usage.total_tokens, Some(11));
    }

    #[tokio::test]
    async fn complete_maps_status_codes() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(429))
            .mount(&server)
            .await;

        let err = provider(&server)
            .complete(&[ChatTurn::user("hi")])
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::RateLimited));
    }

    #[tokio::test]
    async fn complete_rejects_empty_choices() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"choices": []})))
            .mount(&server)
            .await;

        let err = provider(&server)
            .complete(&[ChatTurn::user("hi")])
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::EmptyResponse));
    }

    #[tokio::test]
    async fn embed_returns_first_vector() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/embeddings"))
            .and(body_partial_json(json!({
                "model": "text-embedding-3-small",
                "input": "return policy"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": [{"index": 0, "embedding": [0.25, -0.5, 1.0]}]
            })))
            .mount(&server)
            .await;

        let vector = provider(&server).embed("return policy").await.unwrap();
        assert_eq!(vector, vec![0.25, -0.5, 1.0]);
    }

    #[tokio::test]
    async fn unauthorized_is_authentication_failed() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/embeddings"))
            .respond_with(ResponseTemplate::new(401).set_body_string("bad key"))
            .mount(&server)
            .await;

        assert!(matches!(
            provider(&server).embed("x").await,
            Err(ProviderError::AuthenticationFailed)
        ));
    }
}
