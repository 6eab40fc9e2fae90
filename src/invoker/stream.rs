//! Streaming invocation
//!
//! Consumes an agent's event stream to completion and folds every received
//! event into one [`InvocationResult`]. The final answer is picked out of the
//! events flagged as final and appended in a bordered block.

use anyhow::Result;
use async_trait::async_trait;
use futures::stream::BoxStream;
use futures::StreamExt;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};

use super::{AgentInvoker, InvokeError};
use crate::models::InvocationResult;
use crate::utils::Timer;

/// Width of the separator and border lines in the stdout text
const SEPARATOR_WIDTH: usize = 80;

/// Event type tag marking the authoritative final event
const FINAL_EVENT_TYPE: &str = "final_response";

/// Stream of decoded agent events
pub type EventStream = BoxStream<'static, Result<Value>>;

/// Source of agent event streams
#[async_trait]
pub trait EventSource: Send + Sync {
    /// Open the event stream for one agent run
    async fn open(&self, agent_id: &str, prompt: &str, timeout: Duration) -> Result<EventStream>;
}

/// Everything collected from one streamed agent run
#[derive(Clone, Debug)]
pub struct AgentRun {
    pub result: InvocationResult,
    pub final_content: Option<Value>,
    pub events: usize,
}

/// An event is final if it carries `final: true` or `event_type: "final_response"`
pub fn is_final_event(event: &Value) -> bool {
    event.get("final").and_then(Value::as_bool) == Some(true)
        || event.get("event_type").and_then(Value::as_str) == Some(FINAL_EVENT_TYPE)
}

/// Final content of an event, if it is a final event with non-empty content.
///
/// String content is decoded as JSON when possible and kept verbatim otherwise.
pub fn final_content_of(event: &Value) -> Option<Value> {
    if !is_final_event(event) {
        return None;
    }

    let content = event.get("content")?;
    if is_blank(content) {
        return None;
    }

    match content {
        Value::String(text) => match serde_json::from_str(text) {
            // A decoded `null` is no answer at all.
            Ok(Value::Null) => None,
            Ok(decoded) => Some(decoded),
            Err(_) => Some(content.clone()),
        },
        other => Some(other.clone()),
    }
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
    }
}

fn format_events(events: &[Value]) -> String {
    let separator = format!("\n{}\n", "─".repeat(SEPARATOR_WIDTH));
    events
        .iter()
        .map(|event| serde_json::to_string_pretty(event).unwrap_or_else(|_| event.to_string()))
        .collect::<Vec<_>>()
        .join(&separator)
}

fn format_final_content(content: &Value) -> String {
    let border = "═".repeat(SEPARATOR_WIDTH);
    let body = serde_json::to_string_pretty(content).unwrap_or_else(|_| content.to_string());
    format!("\n\n{border}\nFINAL CONTENT\n{border}\n{body}\n{border}")
}

/// Invoker that consumes an agent event stream
pub struct StreamingInvoker<S> {
    source: S,
}

impl<S: EventSource> StreamingInvoker<S> {
    pub fn new(source: S) -> Self {
        Self { source }
    }

    /// Run the agent and keep the decoded final content alongside the result
    pub async fn run_agent(&self, agent_id: &str, prompt: &str, timeout: Duration) -> AgentRun {
        let timer = Timer::start(format!("stream {agent_id}"));
        let mut events: Vec<Value> = Vec::new();
        let mut final_content: Option<Value> = None;
        let mut errors: Vec<String> = Vec::new();

        let consume = async {
            let mut stream = self.source.open(agent_id, prompt, timeout).await?;
            while let Some(event) = stream.next().await {
                let event = event?;
                if let Some(content) = final_content_of(&event) {
                    final_content = Some(content);
                }
                events.push(event);
            }
            Ok::<(), anyhow::Error>(())
        };

        let outcome = match tokio::time::timeout(timeout, consume).await {
            Ok(outcome) => outcome,
            Err(_) => Err(InvokeError::StreamTimeout(timeout.as_secs()).into()),
        };

        if let Err(err) = outcome {
            warn!(agent_id, received = events.len(), "Error during streaming: {:#}", err);
            errors.push(format!("Error during streaming: {err:#}"));
            errors.push(format!("{err:?}"));
        }

        let mut stdout = format_events(&events);
        if let Some(content) = &final_content {
            stdout.push_str(&format_final_content(content));
        }

        let success = !events.is_empty();
        debug!(agent_id, events = events.len(), success, "Stream consumed");

        AgentRun {
            result: InvocationResult {
                success,
                stdout,
                stderr: errors.join("\n"),
                return_code: if success { 0 } else { -1 },
                elapsed_secs: timer.elapsed_secs(),
            },
            final_content,
            events: events.len(),
        }
    }
}

#[async_trait]
impl<S: EventSource> AgentInvoker for StreamingInvoker<S> {
    async fn invoke(&self, agent_id: &str, prompt: &str, timeout: Duration) -> Result<InvocationResult> {
        let run = self.run_agent(agent_id, prompt, timeout).await;
        debug!(
            agent_id,
            events = run.events,
            final_content = run.final_content.is_some(),
            "Agent run collected"
        );
        Ok(run.result)
    }

    fn name(&self) -> &'static str {
        "streaming"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream;
    use serde_json::json;

    /// Replays a fixed list of events, optionally failing after them
    struct ScriptedSource {
        events: Vec<Value>,
        fail_after: Option<&'static str>,
        delay: Option<Duration>,
    }

    impl ScriptedSource {
        fn new(events: Vec<Value>) -> Self {
            Self {
                events,
                fail_after: None,
                delay: None,
            }
        }
    }

    #[async_trait]
    impl EventSource for ScriptedSource {
        async fn open(&self, _agent_id: &str, _prompt: &str, _timeout: Duration) -> Result<EventStream> {
            let mut items: Vec<Result<Value>> = self.events.iter().cloned().map(Ok).collect();
            if let Some(message) = self.fail_after {
                items.push(Err(anyhow::anyhow!(message)));
            }
            let delay = self.delay;
            let stream = stream::iter(items).then(move |item| async move {
                if let Some(delay) = delay {
                    tokio::time::sleep(delay).await;
                }
                item
            });
            Ok(stream.boxed())
        }
    }

    struct FailingSource;

    #[async_trait]
    impl EventSource for FailingSource {
        async fn open(&self, _agent_id: &str, _prompt: &str, _timeout: Duration) -> Result<EventStream> {
            Err(InvokeError::Api {
                status: 404,
                body: "agent not found".to_string(),
            }
            .into())
        }
    }

    const LIMIT: Duration = Duration::from_secs(5);

    #[test]
    fn test_final_detection_checks_both_fields() {
        assert!(is_final_event(&json!({"final": true})));
        assert!(is_final_event(&json!({"event_type": "final_response"})));
        assert!(is_final_event(&json!({"final": false, "event_type": "final_response"})));
        assert!(!is_final_event(&json!({"final": "true"})));
        assert!(!is_final_event(&json!({"event_type": "tool_call"})));
    }

    #[test]
    fn test_final_content_blank_is_none() {
        assert_eq!(final_content_of(&json!({"final": true})), None);
        assert_eq!(final_content_of(&json!({"final": true, "content": ""})), None);
        assert_eq!(final_content_of(&json!({"final": true, "content": null})), None);
        assert_eq!(final_content_of(&json!({"content": "not final"})), None);
        assert_eq!(final_content_of(&json!({"final": true, "content": "null"})), None);
    }

    #[test]
    fn test_final_content_structured_is_kept() {
        let event = json!({"event_type": "final_response", "content": {"answer": 42}});
        assert_eq!(final_content_of(&event), Some(json!({"answer": 42})));
    }

    #[tokio::test]
    async fn test_final_json_content_is_decoded() {
        let invoker = StreamingInvoker::new(ScriptedSource::new(vec![
            json!({"status": "thinking"}),
            json!({"final": true, "content": "{\"x\":1}"}),
        ]));
        let run = invoker.run_agent("agent", "prompt", LIMIT).await;

        assert_eq!(run.final_content, Some(json!({"x": 1})));
        assert_eq!(run.events, 2);
        assert!(run.result.success);
        assert_eq!(run.result.return_code, 0);
        assert!(run.result.stderr.is_empty());
        assert!(run.result.stdout.contains(&"─".repeat(80)));
        assert!(run.result.stdout.contains("FINAL CONTENT"));
        assert!(run.result.stdout.ends_with(&format!("{{\n  \"x\": 1\n}}\n{}", "═".repeat(80))));
    }

    #[tokio::test]
    async fn test_final_text_content_is_kept_raw() {
        let invoker = StreamingInvoker::new(ScriptedSource::new(vec![
            json!({"status": "thinking"}),
            json!({"final": true, "content": "not json"}),
        ]));
        let run = invoker.run_agent("agent", "prompt", LIMIT).await;

        assert_eq!(run.final_content, Some(json!("not json")));
        assert!(run.result.success);
        assert!(run.result.stderr.is_empty());
    }

    #[tokio::test]
    async fn test_success_without_final_event() {
        let invoker = StreamingInvoker::new(ScriptedSource::new(vec![json!({"status": "working"})]));
        let run = invoker.run_agent("agent", "prompt", LIMIT).await;

        assert!(run.result.success);
        assert_eq!(run.final_content, None);
        assert!(!run.result.stdout.contains("FINAL CONTENT"));
    }

    #[tokio::test]
    async fn test_decoded_null_keeps_earlier_final_content() {
        let invoker = StreamingInvoker::new(ScriptedSource::new(vec![
            json!({"final": true, "content": "{\"x\":1}"}),
            json!({"final": true, "content": "null"}),
        ]));
        let run = invoker.run_agent("agent", "prompt", LIMIT).await;

        assert_eq!(run.final_content, Some(json!({"x": 1})));
        assert!(run.result.stdout.ends_with(&format!("{{\n  \"x\": 1\n}}\n{}", "═".repeat(80))));
    }

    #[tokio::test]
    async fn test_last_final_event_wins() {
        let invoker = StreamingInvoker::new(ScriptedSource::new(vec![
            json!({"final": true, "content": "first"}),
            json!({"event_type": "final_response", "content": "second"}),
        ]));
        let run = invoker.run_agent("agent", "prompt", LIMIT).await;
        assert_eq!(run.final_content, Some(json!("second")));
    }

    #[tokio::test]
    async fn test_no_events_is_failure() {
        let invoker = StreamingInvoker::new(ScriptedSource::new(Vec::new()));
        let result = invoker.invoke("agent", "prompt", LIMIT).await.unwrap();

        assert!(!result.success);
        assert_eq!(result.return_code, -1);
        assert_eq!(result.stdout, "");
    }

    #[tokio::test]
    async fn test_mid_stream_error_keeps_received_events() {
        let mut source = ScriptedSource::new(vec![json!({"status": "one"}), json!({"status": "two"})]);
        source.fail_after = Some("connection reset");
        let run = StreamingInvoker::new(source).run_agent("agent", "prompt", LIMIT).await;

        assert!(run.result.success);
        assert_eq!(run.events, 2);
        assert!(run.result.stderr.starts_with("Error during streaming: connection reset"));
    }

    #[tokio::test]
    async fn test_open_failure_is_failed_result() {
        let result = StreamingInvoker::new(FailingSource)
            .invoke("agent", "prompt", LIMIT)
            .await
            .unwrap();

        assert!(!result.success);
        assert_eq!(result.return_code, -1);
        assert!(result.stderr.contains("404"));
    }

    #[tokio::test]
    async fn test_stream_timeout_keeps_partial_events() {
        let mut source = ScriptedSource::new(vec![
            json!({"status": "one"}),
            json!({"status": "two"}),
            json!({"status": "three"}),
        ]);
        source.delay = Some(Duration::from_millis(150));
        let run = StreamingInvoker::new(source)
            .run_agent("agent", "prompt", Duration::from_millis(250))
            .await;

        assert_eq!(run.events, 1);
        assert!(run.result.success);
        assert!(run.result.stderr.contains("timed out"));
    }
}
