//! AIP HTTP client
//!
//! Resolves an agent's tool and MCP configuration, then opens the agent run
//! as a stream of JSON events (newline-delimited JSON or SSE `data:` lines).

use anyhow::{Context, Result};
use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::{self, Stream, StreamExt};
use reqwest::Client;
use serde_json::{json, Map, Value};
use std::collections::VecDeque;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::stream::{EventSource, EventStream};
use super::InvokeError;
use crate::config::ApiConfig;

/// Client for the AIP agent API
#[derive(Clone, Debug)]
pub struct AipClient {
    http: Client,
    api_url: String,
    api_key: String,
    bosa_token: Option<String>,
    bosa_api_key: Option<String>,
}

impl AipClient {
    /// Create a client; the API URL and key are required
    pub fn new(api: &ApiConfig) -> Result<Self> {
        let (Some(api_url), Some(api_key)) = (api.url.clone(), api.api_key.clone()) else {
            return Err(InvokeError::MissingCredentials.into());
        };

        let http = Client::builder()
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            http,
            api_url: api_url.trim_end_matches('/').to_string(),
            api_key,
            bosa_token: api.bosa_token.clone(),
            bosa_api_key: api.bosa_api_key.clone(),
        })
    }

    fn agent_url(&self, agent_id: &str) -> String {
        format!("{}/agents/{}", self.api_url, agent_id)
    }

    /// Fetch the agent definition and return its tool ids and MCP ids
    pub async fn agent_config_ids(&self, agent_id: &str) -> Result<(Vec<String>, Vec<String>)> {
        let response = self
            .http
            .get(self.agent_url(agent_id))
            .header("X-API-Key", &self.api_key)
            .send()
            .await
            .with_context(|| format!("Failed to fetch configuration of agent {agent_id}"))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(InvokeError::Api {
                status: status.as_u16(),
                body,
            }
            .into());
        }

        let config: Value = response
            .json()
            .await
            .context("Failed to decode agent configuration")?;

        Ok((collect_ids(&config, "tools"), collect_ids(&config, "mcps")))
    }

    /// Build the run payload, attaching tool and MCP credentials when configured
    pub fn build_payload(&self, prompt: &str, tool_ids: &[String], mcp_ids: &[String]) -> Value {
        let mut payload = Map::new();
        payload.insert("input".to_string(), Value::String(prompt.to_string()));

        if let Some(token) = &self.bosa_token {
            let tool_configs: Map<String, Value> = tool_ids
                .iter()
                .map(|id| (id.clone(), json!({ "bosa_token": token })))
                .collect();
            payload.insert("tool_configs".to_string(), Value::Object(tool_configs));

            if let Some(api_key) = &self.bosa_api_key {
                let mcp_configs: Map<String, Value> = mcp_ids
                    .iter()
                    .map(|id| {
                        let auth = json!({
                            "authentication": {
                                "type": "custom-header",
                                "headers": {
                                    "X-Api-Key": api_key,
                                    "Authorization": format!("Bearer {token}"),
                                },
                            }
                        });
                        (id.clone(), auth)
                    })
                    .collect();
                payload.insert("mcp_configs".to_string(), Value::Object(mcp_configs));
            }
        }

        Value::Object(payload)
    }
}

#[async_trait]
impl EventSource for AipClient {
    async fn open(&self, agent_id: &str, prompt: &str, timeout: Duration) -> Result<EventStream> {
        let (tool_ids, mcp_ids) = self.agent_config_ids(agent_id).await?;
        let payload = self.build_payload(prompt, &tool_ids, &mcp_ids);
        info!(agent_id, tools = tool_ids.len(), mcps = mcp_ids.len(), "Starting agent stream");

        let response = self
            .http
            .post(format!("{}/run", self.agent_url(agent_id)))
            .header("X-API-Key", &self.api_key)
            .header("Accept", "text/event-stream")
            .timeout(timeout)
            .json(&payload)
            .send()
            .await
            .with_context(|| format!("Failed to start run of agent {agent_id}"))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(InvokeError::Api {
                status: status.as_u16(),
                body,
            }
            .into());
        }

        Ok(event_stream(Box::pin(response.bytes_stream())))
    }
}

/// Ids of the entries under `key`, accepting an optional `data` envelope
fn collect_ids(config: &Value, key: &str) -> Vec<String> {
    let body = config.get("data").filter(|d| d.is_object()).unwrap_or(config);
    body.get(key)
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(|item| item.get("id").and_then(Value::as_str))
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

/// Decode one line of the response body into an event.
///
/// Accepts raw JSON lines and SSE `data:` lines; skips blank lines, SSE
/// comments and metadata fields, and the `[DONE]` sentinel.
pub(crate) fn parse_event_line(line: &str) -> Option<Value> {
    let line = line.trim();
    if line.is_empty() || line.starts_with(':') {
        return None;
    }

    let payload = match line.strip_prefix("data:") {
        Some(data) => data.trim(),
        None if ["event:", "id:", "retry:"].iter().any(|p| line.starts_with(p)) => return None,
        None => line,
    };
    if payload.is_empty() || payload == "[DONE]" {
        return None;
    }

    match serde_json::from_str(payload) {
        Ok(event) => Some(event),
        Err(e) => {
            warn!("Skipping undecodable stream line: {}", e);
            debug!("Undecodable line: {}", payload);
            None
        }
    }
}

struct LineState<S> {
    body: S,
    buffer: Vec<u8>,
    pending: VecDeque<Value>,
    done: bool,
}

impl<S> LineState<S> {
    fn drain_lines(&mut self) {
        while let Some(pos) = self.buffer.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=pos).collect();
            if let Some(event) = parse_event_line(&String::from_utf8_lossy(&line)) {
                self.pending.push_back(event);
            }
        }
    }

    fn drain_rest(&mut self) {
        let rest = std::mem::take(&mut self.buffer);
        if let Some(event) = parse_event_line(&String::from_utf8_lossy(&rest)) {
            self.pending.push_back(event);
        }
    }
}

/// Split a byte stream into lines and decode each line into an event
pub(crate) fn event_stream<S, E>(body: S) -> EventStream
where
    S: Stream<Item = std::result::Result<Bytes, E>> + Send + Unpin + 'static,
    E: std::error::Error + Send + Sync + 'static,
{
    let state = LineState {
        body,
        buffer: Vec::new(),
        pending: VecDeque::new(),
        done: false,
    };

    stream::unfold(state, |mut state| async move {
        loop {
            if let Some(event) = state.pending.pop_front() {
                return Some((Ok(event), state));
            }
            if state.done {
                return None;
            }

            match state.body.next().await {
                Some(Ok(chunk)) => {
                    state.buffer.extend_from_slice(&chunk);
                    state.drain_lines();
                }
                Some(Err(e)) => {
                    state.done = true;
                    let err = anyhow::Error::new(e).context("Agent stream transport error");
                    return Some((Err(err), state));
                }
                None => {
                    state.done = true;
                    state.drain_rest();
                }
            }
        }
    })
    .boxed()
}
