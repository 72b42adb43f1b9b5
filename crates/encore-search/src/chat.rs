//! Grounded answer generation with an OpenAI-compatible chat model.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};

use crate::error::{ProviderError, ProviderResult};

const PROVIDER: &str = "OpenAI";

/// Default chat model.
pub const DEFAULT_CHAT_MODEL: &str = "gpt-4o-mini";

/// Low temperature keeps answers close to the retrieved data.
pub const DEFAULT_TEMPERATURE: f32 = 0.3;

pub const DEFAULT_MAX_TOKENS: u32 = 500;

/// Instructions given to the model with every question.
pub const SYSTEM_PROMPT: &str = "\
You are SetlistAI, an expert assistant for questions about live music performances.

You have access to a database of concert setlists including artist names, venues, dates, songs played, and encore information.

When answering questions:
1. Base your answers ONLY on the provided setlist data
2. Be specific with dates, venues, and song names
3. If you don't have enough information, say so clearly
4. Provide relevant statistics when asked (e.g., \"3 out of 5 shows\")
5. Format responses clearly with line breaks for readability
6. Cite specific shows when making claims (e.g., \"On July 5, 2015 at Soldier Field...\")

If the question cannot be answered with the available data, explain what information is missing.
";

/// A model that completes a system + user message pair.
#[async_trait]
pub trait ChatModel: Send + Sync + fmt::Debug {
    async fn complete(&self, system: &str, user: &str) -> ProviderResult<String>;
}

/// The user turn sent alongside [`SYSTEM_PROMPT`].
#[must_use]
pub fn user_message(question: &str, context: &str) -> String {
    format!(
        "Question: {question}\n\nRetrieved Setlist Data:\n{context}\n\n\
         Please answer the question based on the setlist data provided."
    )
}

/// Answer `question` from `context`.
///
/// Never fails: a provider error becomes a readable
/// `"Error generating response: ..."` string.
pub async fn generate_response(model: &dyn ChatModel, question: &str, context: &str) -> String {
    match model
        .complete(SYSTEM_PROMPT, &user_message(question, context))
        .await
    {
        Ok(text) => text,
        Err(e) => {
            log::warn!("Chat completion failed: {e}");
            format!("Error generating response: {e}")
        }
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    temperature: f32,
    max_tokens: u32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Client for the OpenAI chat completions API.
#[derive(Clone)]
pub struct OpenAiChat {
    http: Client,
    base_url: String,
    model: String,
    api_key: String,
}

impl fmt::Debug for OpenAiChat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenAiChat")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .finish_non_exhaustive()
    }
}

impl OpenAiChat {
    /// Create a client. Requests use [`DEFAULT_TEMPERATURE`] and
    /// [`DEFAULT_MAX_TOKENS`].
    ///
    /// # Errors
    /// Returns [`ProviderError::MissingApiKey`] for an empty key, or a
    /// request error if the HTTP client cannot be built.
    pub fn new(
        base_url: impl Into<String>,
        model: impl Into<String>,
        api_key: impl Into<String>,
    ) -> ProviderResult<Self> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(ProviderError::MissingApiKey {
                provider: PROVIDER.to_string(),
            });
        }

        let http = Client::builder()
            .user_agent(concat!("encore/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(120))
            .build()?;

        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
            api_key,
        })
    }
}

#[async_trait]
impl ChatModel for OpenAiChat {
    async fn complete(&self, system: &str, user: &str) -> ProviderResult<String> {
        let request = ChatRequest {
            model: &self.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: system,
                },
                ChatMessage {
                    role: "user",
                    content: user,
                },
            ],
            temperature: DEFAULT_TEMPERATURE,
            max_tokens: DEFAULT_MAX_TOKENS,
        };

        log::debug!("Requesting completion from {}", self.model);
        let response = self
            .http
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        if response.status() == StatusCode::TOO_MANY_REQUESTS {
            return Err(ProviderError::RateLimited {
                provider: PROVIDER.to_string(),
            });
        }

        let response = response.error_for_status().map_err(|e| ProviderError::Http {
            provider: PROVIDER.to_string(),
            message: e.to_string(),
        })?;

        let body: ChatResponse = response.json().await.map_err(|e| ProviderError::Parse {
            provider: PROVIDER.to_string(),
            message: e.to_string(),
        })?;

        body.choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| ProviderError::EmptyResponse {
                provider: PROVIDER.to_string(),
            })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::sync::Mutex;

    use super::*;

    /// Echoes the user turn, or fails when `fail` is set.
    #[derive(Debug, Default)]
    pub(crate) struct FakeChat {
        pub fail: bool,
        pub seen: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl ChatModel for FakeChat {
        async fn complete(&self, system: &str, user: &str) -> ProviderResult<String> {
            assert_eq!(system, SYSTEM_PROMPT);
            self.seen.lock().unwrap().push(user.to_string());
            if self.fail {
                return Err(ProviderError::RateLimited {
                    provider: "fake".to_string(),
                });
            }
            Ok(format!("answer to: {}", user.lines().next().unwrap_or("")))
        }
    }

    #[test]
    fn test_user_message_layout() {
        assert_eq!(
            user_message("Which show had Dark Star?", "CTX"),
            "Question: Which show had Dark Star?\n\nRetrieved Setlist Data:\nCTX\n\n\
             Please answer the question based on the setlist data provided."
        );
    }

    #[test]
    fn test_system_prompt_rules() {
        assert!(SYSTEM_PROMPT.starts_with("You are SetlistAI"));
        assert!(SYSTEM_PROMPT.contains("6. Cite specific shows"));
    }

    #[tokio::test]
    async fn test_generate_response_passes_through() {
        let chat = FakeChat::default();
        let text = generate_response(&chat, "Q?", "context").await;
        assert_eq!(text, "answer to: Question: Q?");
        assert!(chat.seen.lock().unwrap()[0].contains("\ncontext\n"));
    }

    #[tokio::test]
    async fn test_generate_response_renders_errors() {
        let chat = FakeChat {
            fail: true,
            ..FakeChat::default()
        };
        let text = generate_response(&chat, "Q?", "context").await;
        assert_eq!(text, "Error generating response: rate limited by fake");
    }

    #[test]
    fn test_parse_completion() {
        let json = r#"{"choices":[{"message":{"role":"assistant","content":"Hi"}}]}"#;
        let body: ChatResponse = serde_json::from_str(json).unwrap();
        assert_eq!(body.choices[0].message.content.as_deref(), Some("Hi"));
    }

    #[test]
    fn test_missing_key() {
        let err = OpenAiChat::new("https://api.openai.com/v1", DEFAULT_CHAT_MODEL, "").unwrap_err();
        assert!(matches!(err, ProviderError::MissingApiKey { .. }));
    }
}
