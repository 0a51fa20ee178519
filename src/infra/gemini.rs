//! Generative Language API client used for daily topic seeding.

use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::{Deserialize, Serialize};

use crate::application::topics::{TopicError, TopicModel};

pub const DEFAULT_GEMINI_ENDPOINT: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-1.5-flash";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeminiOptions {
    pub api_key: String,
    pub model: String,
    pub endpoint: Url,
}

#[derive(Debug, Clone)]
pub struct GeminiClient {
    client: Client,
    options: GeminiOptions,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    contents: [Content<'a>; 1],
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    role: &'static str,
    parts: [Part<'a>; 1],
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    max_output_tokens: u32,
    top_p: f32,
    top_k: u32,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            temperature: 0.7,
            max_output_tokens: 512,
            top_p: 0.9,
            top_k: 40,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Default, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: CandidateContent,
}

#[derive(Debug, Default, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Default, Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: String,
}

impl GeminiClient {
    pub fn new(options: GeminiOptions) -> Result<Self, TopicError> {
        let client = Client::builder()
            .user_agent(concat!("gazette/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|err| TopicError::Request(err.to_string()))?;
        Ok(Self { client, options })
    }

    fn generate_url(&self) -> Result<Url, TopicError> {
        let method = format!("{}:generateContent", self.options.model);
        let mut url = self.options.endpoint.clone();
        url.path_segments_mut()
            .map_err(|_| TopicError::Request("endpoint cannot be a base URL".into()))?
            .pop_if_empty()
            .extend(["v1beta", "models", method.as_str()]);
        url.query_pairs_mut()
            .append_pair("key", &self.options.api_key);
        Ok(url)
    }
}

#[async_trait]
impl TopicModel for GeminiClient {
    fn name(&self) -> &str {
        &self.options.model
    }

    async fn complete(&self, prompt: &str) -> Result<String, TopicError> {
        let body = GenerateRequest {
            contents: [Content {
                role: "user",
                parts: [Part { text: prompt }],
            }],
            generation_config: GenerationConfig::default(),
        };

        let response = self
            .client
            .post(self.generate_url()?)
            .json(&body)
            .send()
            .await
            .map_err(|err| TopicError::Request(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(TopicError::Request(format!("status {status} body {text}")));
        }

        let payload: GenerateResponse = response
            .json()
            .await
            .map_err(|err| TopicError::Request(format!("failed to parse body: {err}")))?;

        let text: String = payload
            .candidates
            .into_iter()
            .next()
            .map(|candidate| {
                candidate
                    .content
                    .parts
                    .into_iter()
                    .map(|part| part.text)
                    .collect()
            })
            .unwrap_or_default();

        if text.trim().is_empty() {
            return Err(TopicError::EmptyResponse);
        }
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use httpmock::MockServer;
    use time::macros::date;

    use super::*;
    use crate::application::topics::{TopicGenerator, fallback_topics};

    fn client(server: &MockServer) -> GeminiClient {
        GeminiClient::new(GeminiOptions {
            api_key: "test-key".to_string(),
            model: DEFAULT_GEMINI_MODEL.to_string(),
            endpoint: Url::parse(&server.base_url()).expect("url"),
        })
        .expect("client")
    }

    #[tokio::test]
    async fn complete_posts_prompt_and_reads_first_candidate() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method("POST")
                    .path("/v1beta/models/gemini-1.5-flash:generateContent")
                    .query_param("key", "test-key")
                    .json_body_includes(
                        r#"{"generationConfig":{"maxOutputTokens":512,"topK":40}}"#,
                    );
                then.status(200)
                    .header("content-type", "application/json")
                    .body(r#"{"candidates":[{"content":{"parts":[{"text":"[\"a\"]"}]}}]}"#);
            })
            .await;

        let text = client(&server).complete("prompt").await.expect("complete");
        assert_eq!(text, r#"["a"]"#);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn error_status_is_a_request_error() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method("POST");
                then.status(403).body("quota");
            })
            .await;

        let err = client(&server).complete("prompt").await.expect_err("403");
        assert!(matches!(err, TopicError::Request(message) if message.contains("403")));
    }

    #[tokio::test]
    async fn generator_falls_back_when_api_fails() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method("POST");
                then.status(500);
            })
            .await;

        let generator =
            TopicGenerator::new(Some(std::sync::Arc::new(client(&server))));
        let today = date!(2024 - 09 - 10);
        assert_eq!(generator.generate(today).await, fallback_topics(today));
    }
}
