// src/api.rs
use crate::config::Settings;
use crate::errors::{ConfigError, ToggleError};
use crate::podcast::ItemId;
use crate::toggle::ToggleKind;
use async_trait::async_trait;
use log::{debug, info};
use reqwest::header::{CONTENT_TYPE, COOKIE, HeaderMap, HeaderValue};
use reqwest::{Client, Response};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;
use url::Url;

/// Body returned by the persistence endpoints: `{ "error"?: .., "message"?: .. }`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ApiResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ApiResponse {
    pub fn ok() -> Self {
        Self { error: Some(Value::Bool(false)), message: Some("ok".to_string()) }
    }

    pub fn failed(detail: &str) -> Self {
        Self { error: Some(Value::String(detail.to_string())), message: None }
    }

    /// The reported error, if the `error` field is truthy. The server answers
    /// `{"error": false}` on success, so presence alone is not enough.
    pub fn error_detail(&self) -> Option<String> {
        let error = self.error.as_ref()?;
        let truthy = match error {
            Value::Null => false,
            Value::Bool(b) => *b,
            Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
            Value::String(s) => !s.is_empty(),
            Value::Array(_) | Value::Object(_) => true,
        };
        if !truthy {
            return None;
        }
        Some(match (error, &self.message) {
            (Value::String(s), _) => s.clone(),
            (_, Some(message)) => message.clone(),
            (other, None) => other.to_string(),
        })
    }
}

// ===== persistence api
#[async_trait]
pub trait PersistenceApi: Send + Sync {
    /// Marks the item listened / subscribed.
    async fn set_active(&self, kind: ToggleKind, id: &ItemId) -> Result<ApiResponse, ToggleError>;

    /// Marks the item unlistened / unsubscribed.
    async fn set_inactive(&self, kind: ToggleKind, id: &ItemId)
    -> Result<ApiResponse, ToggleError>;
}

// ===== Live http api
pub struct HttpPersistenceApi {
    client: Client,
    base_url: Url,
}

impl HttpPersistenceApi {
    pub fn new(
        base_url: Url,
        timeout: Duration,
        session_cookie: Option<&str>,
    ) -> Result<Self, ConfigError> {
        const APP_USER_AGENT: &str = "PodtallyClient/0.1";

        if base_url.cannot_be_a_base() {
            return Err(ConfigError::CannotBeABase(base_url.to_string()));
        }

        let mut headers = HeaderMap::new();
        if let Some(cookie) = session_cookie {
            headers.insert(COOKIE, HeaderValue::from_str(cookie)?);
        }

        let client: Client = reqwest::Client::builder()
            .user_agent(APP_USER_AGENT)
            .default_headers(headers)
            .timeout(timeout)
            .build()?;

        Ok(Self { client, base_url })
    }

    pub fn from_settings(settings: &Settings) -> Result<Self, ConfigError> {
        Self::new(
            settings.base_url.clone(),
            settings.request_timeout,
            settings.session_cookie.as_deref(),
        )
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, ToggleError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ToggleError::InvalidUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn post(
        &self,
        kind: ToggleKind,
        id: &ItemId,
        active: bool,
    ) -> Result<ApiResponse, ToggleError> {
        let request = match kind {
            ToggleKind::Listen => {
                let mut segments = vec!["api", "episodes", id.as_str(), "listens"];
                if !active {
                    segments.push("delete");
                }
                let url = self.endpoint(&segments)?;
                debug!("HttpPersistenceApi: POST {}", url);
                self.client.post(url).header(CONTENT_TYPE, "application/json").body("{}")
            }
            ToggleKind::Subscription => {
                let segments: &[&str] = if active {
                    &["api", "subscriptions"]
                } else {
                    &["api", "subscriptions", "delete"]
                };
                let url = self.endpoint(segments)?;
                debug!("HttpPersistenceApi: POST {} collectionID={}", url, id);
                self.client.post(url).form(&[("collectionID", id.as_str())])
            }
        };

        let response: Response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(ToggleError::Status { status: status.as_u16(), body });
        }
        let parsed: ApiResponse = serde_json::from_str(&body)?;
        info!("HttpPersistenceApi: {:?} {} -> {} ({:?})", kind, id, active, parsed.message);
        Ok(parsed)
    }
}

#[async_trait]
impl PersistenceApi for HttpPersistenceApi {
    async fn set_active(&self, kind: ToggleKind, id: &ItemId) -> Result<ApiResponse, ToggleError> {
        self.post(kind, id, true).await
    }

    async fn set_inactive(
        &self,
        kind: ToggleKind,
        id: &ItemId,
    ) -> Result<ApiResponse, ToggleError> {
        self.post(kind, id, false).await
    }
}

// ===== Fake api for testing
#[derive(Debug, Clone)]
pub enum FakeReply {
    Body(ApiResponse),
    TransportFailure(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedCall {
    pub kind: ToggleKind,
    pub id: ItemId,
    pub active: bool,
}

/// Answers from a script of replies (falling back to `ApiResponse::ok()`), optionally
/// after a per-reply delay, and records every call it receives.
#[derive(Default)]
pub struct FakePersistenceApi {
    replies: Mutex<VecDeque<(FakeReply, Duration)>>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl FakePersistenceApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn replying(replies: Vec<FakeReply>) -> Self {
        let fake = Self::new();
        for reply in replies {
            fake.push_reply(reply, Duration::ZERO);
        }
        fake
    }

    pub fn push_reply(&self, reply: FakeReply, delay: Duration) {
        if let Ok(mut replies) = self.replies.lock() {
            replies.push_back((reply, delay));
        }
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    async fn answer(
        &self,
        kind: ToggleKind,
        id: &ItemId,
        active: bool,
    ) -> Result<ApiResponse, ToggleError> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(RecordedCall { kind, id: id.clone(), active });
        }
        let next = self.replies.lock().ok().and_then(|mut r| r.pop_front());
        let (reply, delay) = next.unwrap_or((FakeReply::Body(ApiResponse::ok()), Duration::ZERO));
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        match reply {
            FakeReply::Body(body) => Ok(body),
            FakeReply::TransportFailure(reason) => {
                Err(ToggleError::Status { status: 503, body: reason })
            }
        }
    }
}

#[async_trait]
impl PersistenceApi for FakePersistenceApi {
    async fn set_active(&self, kind: ToggleKind, id: &ItemId) -> Result<ApiResponse, ToggleError> {
        self.answer(kind, id, true).await
    }

    async fn set_inactive(
        &self,
        kind: ToggleKind,
        id: &ItemId,
    ) -> Result<ApiResponse, ToggleError> {
        self.answer(kind, id, false).await
    }
}
