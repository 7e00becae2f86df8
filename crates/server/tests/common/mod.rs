#![allow(dead_code)]

use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use firstaid_server::ai::{CompletionSource, FragmentStream, UpstreamError};
use firstaid_server::config::{AppState, ServerConfig};
use firstaid_server::core::db::Database;
use futures::{stream, StreamExt};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

pub const SECRET: &[u8] = b"integration-test-secret";

/// Upstream stand-in. Replies with `fragments`, optionally preceded by the
/// prompt itself so concurrent sessions can be told apart.
pub struct ScriptedSource {
    pub fragments: Vec<String>,
    pub echo_prompt: bool,
    pub refuse: bool,
}

impl ScriptedSource {
    pub fn replying(fragments: &[&str]) -> Self {
        Self {
            fragments: fragments.iter().map(|f| f.to_string()).collect(),
            echo_prompt: false,
            refuse: false,
        }
    }

    pub fn echo() -> Self {
        Self {
            fragments: vec![" ".into(), "ack".into()],
            echo_prompt: true,
            refuse: false,
        }
    }

    pub fn refusing() -> Self {
        Self {
            fragments: vec![],
            echo_prompt: false,
            refuse: true,
        }
    }
}

#[async_trait]
impl CompletionSource for ScriptedSource {
    async fn open_stream(&self, prompt: &str) -> Result<FragmentStream, UpstreamError> {
        if self.refuse {
            return Err(UpstreamError::Request("provider unreachable".into()));
        }
        let mut items = Vec::new();
        if self.echo_prompt {
            items.push(prompt.to_string());
        }
        items.extend(self.fragments.iter().cloned());
        // Yield between fragments so concurrent sessions interleave
        let fragments = stream::iter(items).then(|f| async move {
            tokio::task::yield_now().await;
            Ok::<_, UpstreamError>(f)
        });
        Ok(fragments.boxed())
    }
}

pub struct TestApp {
    pub router: Router,
    pub state: AppState,
}

impl TestApp {
    pub async fn new(source: ScriptedSource) -> Self {
        Self::with_config(source, |_| {}).await
    }

    pub async fn with_config(source: ScriptedSource, tweak: impl FnOnce(&mut ServerConfig)) -> Self {
        let mut config = ServerConfig::with_secret(SECRET);
        config.bcrypt_cost = 4;
        config.relay.idle_timeout = Duration::from_secs(2);
        config.relay.flush_timeout = Duration::from_secs(2);
        tweak(&mut config);

        let db = Database::in_memory().await.unwrap();
        Self::on_database(db, config, source)
    }

    pub fn on_database(db: Database, config: ServerConfig, source: ScriptedSource) -> Self {
        let state = AppState::new(config, db, Arc::new(source));
        let router = firstaid_server::app(state.clone());
        Self { router, state }
    }

    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Vec<u8>) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let body = match body {
            Some(json) => {
                builder = builder.header(header::CONTENT_TYPE, "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };

        let response = self
            .router
            .clone()
            .oneshot(builder.body(body).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, bytes.to_vec())
    }

    pub async fn json(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let (status, bytes) = self.request(method, uri, token, body).await;
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    pub async fn signup(&self, name: &str, email: &str, password: &str) -> String {
        let (status, body) = self
            .json(
                Method::POST,
                "/signup",
                None,
                Some(serde_json::json!({ "name": name, "email": email, "password": password })),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "signup failed: {}", body);
        body["data"].as_str().unwrap().to_string()
    }

    pub async fn new_chat(&self, token: &str) -> i64 {
        let (status, body) = self.json(Method::POST, "/auth/new_chat", Some(token), None).await;
        assert_eq!(status, StatusCode::OK);
        body["data"].as_i64().unwrap()
    }

    /// Returns the raw event stream.
    pub async fn send_message(&self, token: &str, chat_id: i64, text: &str) -> (StatusCode, String) {
        let (status, bytes) = self
            .request(
                Method::POST,
                "/auth/send_message",
                Some(token),
                Some(serde_json::json!({ "chat_id": chat_id, "text": text })),
            )
            .await;
        (status, String::from_utf8(bytes).unwrap())
    }

    pub async fn messages(&self, token: &str, chat_id: i64) -> Vec<Value> {
        let (status, body) = self
            .json(Method::GET, &format!("/auth/chats/{}", chat_id), Some(token), None)
            .await;
        assert_eq!(status, StatusCode::OK, "{}", body);
        body["data"].as_array().unwrap().clone()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SseFrame {
    pub event: Option<String>,
    pub data: String,
}

/// Split an event-stream body into frames, skipping keep-alive comments.
pub fn parse_sse(body: &str) -> Vec<SseFrame> {
    body.split("\n\n")
        .filter_map(|frame| {
            let mut event = None;
            let mut data: Vec<&str> = Vec::new();
            for line in frame.lines() {
                if let Some(v) = line.strip_prefix("event:") {
                    event = Some(v.trim_start().to_string());
                } else if let Some(v) = line.strip_prefix("data:") {
                    data.push(v.strip_prefix(' ').unwrap_or(v));
                }
            }
            if event.is_none() && data.is_empty() {
                None
            } else {
                Some(SseFrame {
                    event,
                    data: data.join("\n"),
                })
            }
        })
        .collect()
}

/// Concatenated fragment data, in arrival order.
pub fn fragments_text(frames: &[SseFrame]) -> String {
    frames
        .iter()
        .filter(|f| f.event.is_none())
        .map(|f| f.data.as_str())
        .collect()
}
