// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP implementations of the external collaborator traits.
//!
//! Every failure maps to [`CourierError::Delivery`], which the engine
//! treats as retryable; the collaborators being briefly unreachable is an
//! ordinary condition, not a pipeline fault.

use std::time::Duration;

use async_trait::async_trait;
use courier_config::model::{BlocksConfig, ExecConfig};
use courier_core::{
    BlockStore, CourierError, ExecTarget, SessionAccess, SessionHandle, TerminalHandle,
};
use serde_json::Value;
use tracing::debug;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

fn delivery_err(message: String, source: reqwest::Error) -> CourierError {
    CourierError::Delivery {
        message,
        source: Some(Box::new(source)),
    }
}

fn status_err(context: &str, status: reqwest::StatusCode) -> CourierError {
    CourierError::Delivery {
        message: format!("{context} returned {status}"),
        source: None,
    }
}

/// Execution-environment client.
pub struct HttpExecTarget {
    client: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl HttpExecTarget {
    pub fn new(config: &ExecConfig) -> Result<Self, CourierError> {
        let base_url = config
            .base_url
            .clone()
            .ok_or_else(|| CourierError::Config("exec.base_url is not set".into()))?;
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| CourierError::Internal(format!("building http client: {e}")))?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: config.token.clone(),
        })
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        let mut req = self.client.request(method, format!("{}{path}", self.base_url));
        if let Some(token) = &self.token {
            req = req.bearer_auth(token);
        }
        req
    }
}

#[async_trait]
impl ExecTarget for HttpExecTarget {
    async fn ensure_session(
        &self,
        dashboard_id: &str,
    ) -> Result<SessionAccess, CourierError> {
        let response = self
            .request(
                reqwest::Method::POST,
                &format!("/v1/sessions/{dashboard_id}/ensure"),
            )
            .send()
            .await
            .map_err(|e| delivery_err("ensure_session failed".into(), e))?;
        if response.status() == reqwest::StatusCode::FORBIDDEN {
            debug!(dashboard_id, "session access denied");
            return Ok(SessionAccess::Denied);
        }
        if !response.status().is_success() {
            return Err(status_err("ensure_session", response.status()));
        }
        let body: Value = response
            .json()
            .await
            .map_err(|e| delivery_err("decoding ensure_session response".into(), e))?;
        let session_id = body
            .get("session_id")
            .and_then(Value::as_str)
            .ok_or_else(|| CourierError::Delivery {
                message: "ensure_session response lacks session_id".into(),
                source: None,
            })?;
        Ok(SessionAccess::Granted(SessionHandle(session_id.to_string())))
    }

    async fn resolve_terminal(
        &self,
        session: &SessionHandle,
        item_id: &str,
    ) -> Result<TerminalHandle, CourierError> {
        let response = self
            .request(
                reqwest::Method::POST,
                &format!("/v1/sessions/{}/terminals/{item_id}", session.0),
            )
            .send()
            .await
            .map_err(|e| delivery_err("resolve_terminal failed".into(), e))?;
        if !response.status().is_success() {
            return Err(status_err("resolve_terminal", response.status()));
        }
        let body: Value = response
            .json()
            .await
            .map_err(|e| delivery_err("decoding resolve_terminal response".into(), e))?;
        let terminal_id = body
            .get("terminal_id")
            .and_then(Value::as_str)
            .ok_or_else(|| CourierError::Delivery {
                message: "resolve_terminal response lacks terminal_id".into(),
                source: None,
            })?;
        Ok(TerminalHandle(terminal_id.to_string()))
    }

    async fn write_terminal(
        &self,
        handle: &TerminalHandle,
        text: &str,
    ) -> Result<(), CourierError> {
        let response = self
            .request(
                reqwest::Method::POST,
                &format!("/v1/terminals/{}/input", handle.0),
            )
            .json(&serde_json::json!({ "text": text }))
            .send()
            .await
            .map_err(|e| delivery_err("write_terminal failed".into(), e))?;
        if !response.status().is_success() {
            return Err(status_err("write_terminal", response.status()));
        }
        Ok(())
    }

    async fn is_running(&self, dashboard_id: &str) -> Result<bool, CourierError> {
        let response = self
            .request(
                reqwest::Method::GET,
                &format!("/v1/sessions/{dashboard_id}/status"),
            )
            .send()
            .await
            .map_err(|e| delivery_err("session status check failed".into(), e))?;
        if !response.status().is_success() {
            return Err(status_err("session status", response.status()));
        }
        let body: Value = response
            .json()
            .await
            .map_err(|e| delivery_err("decoding session status".into(), e))?;
        Ok(body.get("running").and_then(Value::as_bool).unwrap_or(false))
    }
}

/// Block-store client for note and prompt destinations.
pub struct HttpBlockStore {
    client: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl HttpBlockStore {
    pub fn new(config: &BlocksConfig) -> Result<Self, CourierError> {
        let base_url = config
            .base_url
            .clone()
            .ok_or_else(|| CourierError::Config("blocks.base_url is not set".into()))?;
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| CourierError::Internal(format!("building http client: {e}")))?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: config.token.clone(),
        })
    }

    async fn post_text(
        &self,
        path: &str,
        text: &str,
        context: &str,
    ) -> Result<(), CourierError> {
        let mut req = self
            .client
            .post(format!("{}{path}", self.base_url))
            .json(&serde_json::json!({ "text": text }));
        if let Some(token) = &self.token {
            req = req.bearer_auth(token);
        }
        let response = req
            .send()
            .await
            .map_err(|e| delivery_err(format!("{context} failed"), e))?;
        if !response.status().is_success() {
            return Err(status_err(context, response.status()));
        }
        Ok(())
    }
}

#[async_trait]
impl BlockStore for HttpBlockStore {
    async fn append_note(
        &self,
        dashboard_id: &str,
        item_id: &str,
        text: &str,
    ) -> Result<(), CourierError> {
        self.post_text(
            &format!("/v1/dashboards/{dashboard_id}/notes/{item_id}/append"),
            text,
            "append_note",
        )
        .await
    }

    async fn replace_prompt(
        &self,
        dashboard_id: &str,
        item_id: &str,
        text: &str,
    ) -> Result<(), CourierError> {
        self.post_text(
            &format!("/v1/dashboards/{dashboard_id}/prompts/{item_id}/replace"),
            text,
            "replace_prompt",
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn exec_config(base: &str) -> ExecConfig {
        ExecConfig {
            base_url: Some(base.to_string()),
            token: Some("exec-token".into()),
        }
    }

    #[tokio::test]
    async fn ensure_session_grant_and_denial() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/sessions/dash-1/ensure"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({
                    "session_id": "sess-9"
                })),
            )
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/v1/sessions/dash-2/ensure"))
            .respond_with(ResponseTemplate::new(403))
            .mount(&server)
            .await;

        let exec = HttpExecTarget::new(&exec_config(&server.uri())).unwrap();
        assert_eq!(
            exec.ensure_session("dash-1").await.unwrap(),
            SessionAccess::Granted(SessionHandle("sess-9".into()))
        );
        assert_eq!(
            exec.ensure_session("dash-2").await.unwrap(),
            SessionAccess::Denied
        );
    }

    #[tokio::test]
    async fn write_terminal_posts_text_and_maps_errors() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/terminals/t-1/input"))
            .and(body_json(serde_json::json!({"text": "hello\n"})))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/v1/terminals/t-down/input"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let exec = HttpExecTarget::new(&exec_config(&server.uri())).unwrap();
        exec.write_terminal(&TerminalHandle("t-1".into()), "hello\n")
            .await
            .unwrap();
        let err = exec
            .write_terminal(&TerminalHandle("t-down".into()), "hello\n")
            .await;
        assert!(matches!(err, Err(CourierError::Delivery { .. })));
    }

    #[tokio::test]
    async fn block_store_note_append() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/dashboards/dash-1/notes/note-1/append"))
            .and(body_json(serde_json::json!({"text": "[slack] a: b"})))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let blocks = HttpBlockStore::new(&BlocksConfig {
            base_url: Some(server.uri()),
            token: None,
        })
        .unwrap();
        blocks
            .append_note("dash-1", "note-1", "[slack] a: b")
            .await
            .unwrap();
    }

    #[test]
    fn missing_base_url_is_a_config_error() {
        let err = HttpExecTarget::new(&ExecConfig {
            base_url: None,
            token: None,
        });
        assert!(matches!(err, Err(CourierError::Config(_))));
    }
}
