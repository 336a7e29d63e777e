//! REST client (component B): authenticated HTTP calls against ARI endpoints.
//!
//! One shared `reqwest::Client` backs every call; each endpoint method builds
//! the path/query/body ARI expects and returns decoded JSON (or nothing for
//! an empty 2xx body). Entities embedded in a response are canonicalized
//! through an [`EntityResolver`] before being handed back to the caller.

use std::sync::Arc;
use std::time::Duration;

use ari_types::{Bridge, Channel, EntityResolver, Playback};
use base64::Engine;
use serde_json::{json, Value};
use tracing::debug;

use crate::error::RestError;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Thin wrapper around `reqwest::Client` plus the ARI base URL and
/// pre-encoded Basic auth header.
#[derive(Clone)]
pub struct RestClient {
    http: reqwest::Client,
    base_url: String,
    auth_header: String,
}

impl RestClient {
    pub fn new(host: &str, port: u16, username: &str, secret: &str) -> Self {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .expect("reqwest client builder should never fail with these options");
        let creds = base64::engine::general_purpose::STANDARD.encode(format!("{username}:{secret}"));
        RestClient {
            http,
            base_url: format!("http://{host}:{port}/ari"),
            auth_header: format!("Basic {creds}"),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn auth_header(&self) -> &str {
        &self.auth_header
    }

    /// WebSocket URL for the events stream of `app`, derived from the REST
    /// base URL (`http(s)://` swapped for `ws(s)://`).
    pub fn ws_url(&self, app: &str) -> String {
        let ws_base = if let Some(rest) = self.base_url.strip_prefix("https://") {
            format!("wss://{rest}")
        } else if let Some(rest) = self.base_url.strip_prefix("http://") {
            format!("ws://{rest}")
        } else {
            self.base_url.clone()
        };
        format!("{ws_base}/events?app={app}")
    }

    /// Core request method. Implements the status handling contract in
    /// §4.B: 500 is an error, other non-2xx is `None` (caller discretion),
    /// 2xx with an empty body is `None`, 2xx with a body is `Some(json)`.
    async fn request(
        &self,
        method: reqwest::Method,
        path: &str,
        query: &[(&str, String)],
        body: Option<Value>,
    ) -> Result<Option<Value>, RestError> {
        let url = format!("{}{}", self.base_url, path);
        let mut builder = self
            .http
            .request(method, &url)
            .header("Authorization", &self.auth_header);
        if !query.is_empty() {
            builder = builder.query(query);
        }
        if let Some(body) = &body {
            builder = builder.json(body);
        }

        let response = builder
            .send()
            .await
            .map_err(|source| RestError::Http { path: path.to_owned(), source })?;

        let status = response.status();
        if status.as_u16() == 500 {
            let reason = status.canonical_reason().unwrap_or("").to_owned();
            let body = response.text().await.unwrap_or_default();
            return Err(RestError::ServerError {
                path: path.to_owned(),
                status: status.as_u16(),
                reason,
                body,
            });
        }
        if !status.is_success() {
            debug!(path, status = status.as_u16(), "ARI returned a non-success, non-500 status");
            return Ok(None);
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|source| RestError::Http { path: path.to_owned(), source })?;
        if bytes.is_empty() {
            return Ok(None);
        }
        serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|source| RestError::Decode { path: path.to_owned(), source })
    }

    async fn get(&self, path: &str) -> Result<Option<Value>, RestError> {
        self.request(reqwest::Method::GET, path, &[], None).await
    }

    async fn post(&self, path: &str, query: &[(&str, String)], body: Option<Value>) -> Result<Option<Value>, RestError> {
        self.request(reqwest::Method::POST, path, query, body).await
    }

    async fn put(&self, path: &str, body: Option<Value>) -> Result<Option<Value>, RestError> {
        self.request(reqwest::Method::PUT, path, &[], body).await
    }

    async fn delete(&self, path: &str) -> Result<Option<Value>, RestError> {
        self.request(reqwest::Method::DELETE, path, &[], None).await
    }

    pub async fn channels(&self) -> Result<Vec<Value>, RestError> {
        Ok(self
            .get("/channels")
            .await?
            .and_then(|v| v.as_array().cloned())
            .unwrap_or_default())
    }

    /// `POST /channels/{channel_id}` — originate a call. `callerid` and
    /// `app` are ARI's `callerId`/`app` query fields.
    pub async fn create_channel(
        &self,
        resolver: &dyn EntityResolver,
        channel_id: &str,
        endpoint: &str,
        app: &str,
        callerid: &str,
        timeout: i64,
    ) -> Result<Arc<Channel>, RestError> {
        let query = [
            ("endpoint", endpoint.to_owned()),
            ("app", app.to_owned()),
            ("callerId", callerid.to_owned()),
            ("timeout", timeout.to_string()),
        ];
        let path = format!("/channels/{channel_id}");
        let body = json!({ "variables": {} });
        let payload = self.post(&path, &query, Some(body)).await?;
        Ok(resolver.resolve_channel(&payload.unwrap_or_else(|| json!({"id": channel_id}))))
    }

    pub async fn answer(&self, channel_id: &str) -> Result<(), RestError> {
        self.post(&format!("/channels/{channel_id}/answer"), &[], None).await?;
        Ok(())
    }

    pub async fn ring_channel(&self, channel_id: &str) -> Result<(), RestError> {
        self.post(&format!("/channels/{channel_id}/ring"), &[], None).await?;
        Ok(())
    }

    pub async fn stop_ring_channel(&self, channel_id: &str) -> Result<(), RestError> {
        self.delete(&format!("/channels/{channel_id}/ring")).await?;
        Ok(())
    }

    pub async fn close_channel(&self, channel_id: &str) -> Result<(), RestError> {
        self.delete(&format!("/channels/{channel_id}")).await?;
        Ok(())
    }

    /// `POST /channels/{channel_id}/play` — `media` is a full URI
    /// (`sound:...`) built by the caller.
    pub async fn play_channel(&self, resolver: &dyn EntityResolver, channel_id: &str, media: &str) -> Result<Arc<Playback>, RestError> {
        let query = [("media", media.to_owned())];
        let payload = self.post(&format!("/channels/{channel_id}/play"), &query, None).await?;
        Ok(resolver.resolve_playback(&payload.unwrap_or_default()))
    }

    /// `POST /channels/{channel_id}/record` with `name`, `format="wav"`.
    pub async fn record_channel(&self, channel_id: &str, name: &str) -> Result<Option<Value>, RestError> {
        let query = [("name", name.to_owned()), ("format", "wav".to_owned())];
        self.post(&format!("/channels/{channel_id}/record"), &query, None).await
    }

    /// `POST /channels/{channel_id}/snoop` with `{app, spy}`. Returns the
    /// spawned snoop channel.
    pub async fn start_snoop(
        &self,
        resolver: &dyn EntityResolver,
        channel_id: &str,
        app: &str,
        spy: &str,
    ) -> Result<Arc<Channel>, RestError> {
        let query = [("app", app.to_owned()), ("spy", spy.to_owned())];
        let payload = self.post(&format!("/channels/{channel_id}/snoop"), &query, None).await?;
        Ok(resolver.resolve_channel(&payload.unwrap_or_default()))
    }

    /// `POST /channels/externalMedia` — starts the robot pseudo-channel
    /// streaming to `external_host` (`"host:port"`).
    pub async fn external_media(
        &self,
        resolver: &dyn EntityResolver,
        channel_id: &str,
        app: &str,
        external_host: &str,
        format: &str,
    ) -> Result<Arc<Channel>, RestError> {
        let query = [
            ("channelId", channel_id.to_owned()),
            ("app", app.to_owned()),
            ("external_host", external_host.to_owned()),
            ("format", format.to_owned()),
        ];
        let payload = self.post("/channels/externalMedia", &query, None).await?;
        Ok(resolver.resolve_channel(&payload.unwrap_or_else(|| json!({"id": channel_id}))))
    }

    pub async fn bridges(&self) -> Result<Vec<Value>, RestError> {
        Ok(self
            .get("/bridges")
            .await?
            .and_then(|v| v.as_array().cloned())
            .unwrap_or_default())
    }

    pub async fn create_bridge(&self, resolver: &dyn EntityResolver, bridge_type: &str) -> Result<Arc<Bridge>, RestError> {
        let query = [("type", bridge_type.to_owned())];
        let payload = self.post("/bridges", &query, None).await?;
        Ok(resolver.resolve_bridge(&payload.unwrap_or_default()))
    }

    pub async fn close_bridge(&self, bridge_id: &str) -> Result<(), RestError> {
        self.delete(&format!("/bridges/{bridge_id}")).await?;
        Ok(())
    }

    pub async fn add_to_bridge(&self, bridge_id: &str, channel_id: &str) -> Result<(), RestError> {
        let query = [("channel", channel_id.to_owned())];
        self.post(&format!("/bridges/{bridge_id}/addChannel"), &query, None).await?;
        Ok(())
    }

    pub async fn remove_from_bridge(&self, bridge_id: &str, channel_id: &str) -> Result<(), RestError> {
        let query = [("channel", channel_id.to_owned())];
        self.post(&format!("/bridges/{bridge_id}/removeChannel"), &query, None).await?;
        Ok(())
    }

    pub async fn record_bridge(&self, bridge_id: &str, name: &str) -> Result<Option<Value>, RestError> {
        let query = [("name", name.to_owned()), ("format", "wav".to_owned())];
        self.post(&format!("/bridges/{bridge_id}/record"), &query, None).await
    }

    pub async fn play_bridge(&self, resolver: &dyn EntityResolver, bridge_id: &str, media: &str) -> Result<Arc<Playback>, RestError> {
        let query = [("media", media.to_owned())];
        let payload = self.post(&format!("/bridges/{bridge_id}/play"), &query, None).await?;
        Ok(resolver.resolve_playback(&payload.unwrap_or_default()))
    }

    /// `media = "sound:silence/{seconds}"`.
    pub async fn play_silence(&self, resolver: &dyn EntityResolver, bridge_id: &str, seconds: u32) -> Result<Arc<Playback>, RestError> {
        self.play_bridge(resolver, bridge_id, &format!("sound:silence/{seconds}")).await
    }

    pub async fn moh_bridge(&self, bridge_id: &str, moh_class: &str) -> Result<(), RestError> {
        let query = [("mohClass", moh_class.to_owned())];
        self.post(&format!("/bridges/{bridge_id}/moh"), &query, None).await?;
        Ok(())
    }

    pub async fn stop_moh_bridge(&self, bridge_id: &str) -> Result<(), RestError> {
        self.delete(&format!("/bridges/{bridge_id}/moh")).await?;
        Ok(())
    }

    pub async fn close_playback(&self, playback_id: &str) -> Result<(), RestError> {
        self.delete(&format!("/playbacks/{playback_id}")).await?;
        Ok(())
    }

    pub async fn control_playback(&self, playback_id: &str, operation: &str) -> Result<(), RestError> {
        let query = [("operation", operation.to_owned())];
        self.post(&format!("/playbacks/{playback_id}/control"), &query, None).await?;
        Ok(())
    }

    /// `PUT /applications/{app}/eventFilter` — negotiates the allowed-event
    /// set for the WebSocket connection tied to `app`.
    pub async fn filter_events(&self, app: &str, allowed: &[ari_types::EventType]) -> Result<(), RestError> {
        let body = json!({
            "allowed": allowed.iter().map(|t| json!({"type": t.as_str()})).collect::<Vec<_>>(),
        });
        self.put(&format!("/applications/{app}/eventFilter"), Some(body)).await?;
        Ok(())
    }

    pub async fn list_apps(&self) -> Result<Vec<Value>, RestError> {
        Ok(self
            .get("/applications")
            .await?
            .and_then(|v| v.as_array().cloned())
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> RestClient {
        let url = server.uri();
        let without_scheme = url.trim_start_matches("http://");
        let (host, port) = without_scheme.split_once(':').unwrap();
        RestClient::new(host, port.parse().unwrap(), "user", "pass")
    }

    #[tokio::test]
    async fn empty_body_2xx_is_none() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/ari/channels/ch1"))
            .respond_with(ResponseTemplate::new(204))
            .mount(&server)
            .await;
        let client = client_for(&server);
        assert!(client.close_channel("ch1").await.is_ok());
    }

    #[tokio::test]
    async fn status_500_is_server_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/ari/channels/bad/answer"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;
        let client = client_for(&server);
        let err = client.answer("bad").await.unwrap_err();
        match err {
            RestError::ServerError { status, .. } => assert_eq!(status, 500),
            other => panic!("expected ServerError, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn non_2xx_non_500_returns_none_not_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/ari/channels"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;
        let client = client_for(&server);
        assert_eq!(client.channels().await.unwrap(), Vec::<Value>::new());
    }
}
