use crate::config::AiConfig;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

const ASK_SYSTEM_PROMPT: &str =
    "You are a network diagnostic assistant. Be descriptive and helpful with \
     network-related questions.";

const TOPOLOGY_SYSTEM_PROMPT: &str = r#"You are a network topology analyzer.
Generate a realistic network topology with nodes and links.
Return only valid JSON that matches this structure exactly:
{
    "nodes": [
        {"id": "string", "type": "string", "label": "string", "status": "string"}
    ],
    "links": [
        {"source": "string", "target": "string", "status": "string"}
    ]
}
Include core routers, switches, firewalls, and servers. Make sure all IDs referenced in links exist in nodes."#;

const TOPOLOGY_USER_PROMPT: &str =
    "Generate a realistic enterprise network topology with core infrastructure, \
     servers, and security devices.";

#[derive(Debug, Error)]
pub enum AiError {
    #[error("AI request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("unexpected AI response shape: {0}")]
    Shape(String),
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f64,
    max_tokens: u32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
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

/// Thin proxy over a remote chat-completion API. No logic of its own beyond
/// prompt assembly and response unwrapping; the remote call is opaque.
pub struct AiClient {
    client: Client,
    base_url: String,
    model: String,
    api_key: String,
}

impl AiClient {
    /// None when the proxy is disabled or its API key env var is unset; the
    /// HTTP layer turns that into a "not configured" response.
    pub fn from_config(client: Client, cfg: &AiConfig) -> Option<Self> {
        if !cfg.enabled {
            return None;
        }
        let api_key = match std::env::var(&cfg.api_key_env) {
            Ok(v) if !v.trim().is_empty() => v,
            _ => {
                warn!(env = %cfg.api_key_env, "AI enabled but API key env var is unset");
                return None;
            }
        };
        Some(Self {
            client,
            base_url: cfg.base_url.trim_end_matches('/').to_string(),
            model: cfg.model.clone(),
            api_key,
        })
    }

    pub async fn ask(&self, question: &str) -> Result<String, AiError> {
        self.chat(ASK_SYSTEM_PROMPT, question, 0.7, 256).await
    }

    pub async fn topology(&self) -> Result<serde_json::Value, AiError> {
        let text = self
            .chat(TOPOLOGY_SYSTEM_PROMPT, TOPOLOGY_USER_PROMPT, 1.0, 1024)
            .await?;
        serde_json::from_str(&text)
            .map_err(|err| AiError::Shape(format!("topology is not valid JSON: {err}")))
    }

    async fn chat(
        &self,
        system: &str,
        user: &str,
        temperature: f64,
        max_tokens: u32,
    ) -> Result<String, AiError> {
        let body = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system,
                },
                ChatMessage {
                    role: "user",
                    content: user,
                },
            ],
            temperature,
            max_tokens,
        };

        let response: ChatResponse = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        response
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| AiError::Shape("response contained no choices".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::routing::post;
    use axum::{Json, Router};

    async fn spawn_fixture(reply: serde_json::Value) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind fixture listener");
        let addr = listener.local_addr().expect("fixture addr");
        let app = Router::new().route(
            "/chat/completions",
            post(move || {
                let reply = reply.clone();
                async move { Json(reply) }
            }),
        );
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });
        format!("http://{addr}")
    }

    fn client(base_url: String) -> AiClient {
        AiClient {
            client: Client::new(),
            base_url,
            model: "test-model".to_string(),
            api_key: "test-key".to_string(),
        }
    }

    fn completion(content: &str) -> serde_json::Value {
        serde_json::json!({
            "choices": [{"message": {"role": "assistant", "content": content}}]
        })
    }

    #[tokio::test]
    async fn ask_returns_assistant_text() {
        let base = spawn_fixture(completion("Check your default gateway.")).await;
        let answer = client(base).ask("why is DNS slow?").await.expect("answer");
        assert_eq!(answer, "Check your default gateway.");
    }

    #[tokio::test]
    async fn topology_parses_strict_json_content() {
        let base = spawn_fixture(completion(
            r#"{"nodes":[{"id":"r1","type":"router","label":"Core","status":"up"}],"links":[]}"#,
        ))
        .await;
        let topology = client(base).topology().await.expect("topology");
        assert_eq!(topology["nodes"][0]["id"], "r1");
    }

    #[tokio::test]
    async fn non_json_topology_is_a_shape_error() {
        let base = spawn_fixture(completion("here is your topology: ...")).await;
        let err = client(base).topology().await.expect_err("must fail");
        assert!(matches!(err, AiError::Shape(_)));
    }

    #[tokio::test]
    async fn empty_choices_is_a_shape_error() {
        let base = spawn_fixture(serde_json::json!({"choices": []})).await;
        let err = client(base).ask("hello").await.expect_err("must fail");
        assert!(matches!(err, AiError::Shape(_)));
    }

    #[test]
    fn disabled_config_yields_no_client() {
        let cfg = AiConfig::default();
        assert!(AiClient::from_config(Client::new(), &cfg).is_none());
    }
}
