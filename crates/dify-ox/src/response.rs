use serde::{Deserialize, Serialize};

/// Response of a blocking `chat-messages` request.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatResponse {
    pub event: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub task_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub message_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conversation_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mode: Option<String>,
    pub answer: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Metadata>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<u64>,
}

/// Usage and retrieval info attached to a finished message.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Metadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retriever_resources: Option<Vec<RetrieverResource>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Usage {
    #[serde(default)]
    pub prompt_tokens: u32,
    #[serde(default)]
    pub completion_tokens: u32,
    #[serde(default)]
    pub total_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_price: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latency: Option<f64>,
}

/// One knowledge-base citation from the retrieval pipeline.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RetrieverResource {
    #[serde(default)]
    pub position: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dataset_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dataset_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub document_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub document_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub segment_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

/// Response of `chat-messages/{task_id}/stop`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StopResponse {
    pub result: String,
}

/// Response of `messages/{message_id}/suggested`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SuggestedQuestionsResponse {
    pub result: String,
    #[serde(default)]
    pub data: Vec<String>,
}

// Streaming types
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum StreamEvent {
    /// Answer text delta of a plain chat app.
    Message {
        #[serde(skip_serializing_if = "Option::is_none")]
        task_id: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        id: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        message_id: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        conversation_id: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        answer: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        created_at: Option<u64>,
    },
    /// Answer text delta of an agent app.
    AgentMessage {
        #[serde(skip_serializing_if = "Option::is_none")]
        task_id: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        id: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        message_id: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        conversation_id: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        answer: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        created_at: Option<u64>,
    },
    /// Reasoning step of an agent, including any tool invocation.
    AgentThought {
        #[serde(skip_serializing_if = "Option::is_none")]
        id: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        task_id: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        message_id: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        position: Option<u32>,
        #[serde(skip_serializing_if = "Option::is_none")]
        thought: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        observation: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        tool: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        tool_input: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        conversation_id: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        created_at: Option<u64>,
    },
    /// Message finished; carries usage and citations.
    MessageEnd {
        #[serde(skip_serializing_if = "Option::is_none")]
        task_id: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        id: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        message_id: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        conversation_id: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        metadata: Option<Metadata>,
    },
    /// Fatal backend error; terminates the stream.
    Error {
        #[serde(skip_serializing_if = "Option::is_none")]
        task_id: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        message_id: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        status: Option<u16>,
        #[serde(skip_serializing_if = "Option::is_none")]
        code: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        message: Option<String>,
    },
    /// Keepalive, sent every few seconds on idle streams.
    Ping,
    /// Any event type this client does not consume.
    #[serde(other)]
    Unknown,
}

impl StreamEvent {
    /// Answer text carried by this event, if it is an answer-bearing delta.
    pub fn answer(&self) -> Option<&str> {
        match self {
            StreamEvent::Message { answer, .. } | StreamEvent::AgentMessage { answer, .. } => {
                answer.as_deref()
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_message_event() {
        let event: StreamEvent = serde_json::from_str(
            r#"{"event": "message", "task_id": "t-1", "message_id": "m-1",
                "conversation_id": "c-1", "answer": "Hello", "created_at": 1705395332}"#,
        )
        .expect("valid event");

        assert_eq!(event.answer(), Some("Hello"));
        match event {
            StreamEvent::Message {
                task_id,
                conversation_id,
                ..
            } => {
                assert_eq!(task_id.as_deref(), Some("t-1"));
                assert_eq!(conversation_id.as_deref(), Some("c-1"));
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn deserializes_agent_message_event() {
        let event: StreamEvent =
            serde_json::from_str(r#"{"event": "agent_message", "answer": "Hi"}"#)
                .expect("valid event");
        assert_eq!(event.answer(), Some("Hi"));
        assert!(matches!(event, StreamEvent::AgentMessage { .. }));
    }

    #[test]
    fn deserializes_error_event() {
        let event: StreamEvent = serde_json::from_str(
            r#"{"event": "error", "status": 400, "code": "quota_exceeded", "message": "boom"}"#,
        )
        .expect("valid event");

        assert!(event.answer().is_none());
        match event {
            StreamEvent::Error {
                status,
                code,
                message,
                ..
            } => {
                assert_eq!(status, Some(400));
                assert_eq!(code.as_deref(), Some("quota_exceeded"));
                assert_eq!(message.as_deref(), Some("boom"));
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn deserializes_message_end_with_usage() {
        let event: StreamEvent = serde_json::from_str(
            r#"{"event": "message_end", "message_id": "m-1",
                "metadata": {"usage": {"prompt_tokens": 10, "completion_tokens": 5,
                "total_tokens": 15, "currency": "USD"}}}"#,
        )
        .expect("valid event");

        match event {
            StreamEvent::MessageEnd { metadata, .. } => {
                let usage = metadata.and_then(|m| m.usage).expect("usage present");
                assert_eq!(usage.total_tokens, 15);
                assert_eq!(usage.currency.as_deref(), Some("USD"));
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn unknown_event_types_fall_through() {
        let event: StreamEvent =
            serde_json::from_str(r#"{"event": "tts_message", "audio": "...."}"#)
                .expect("unknown events are tolerated");
        assert!(matches!(event, StreamEvent::Unknown));

        let ping: StreamEvent =
            serde_json::from_str(r#"{"event": "ping"}"#).expect("valid event");
        assert!(matches!(ping, StreamEvent::Ping));
    }

    #[test]
    fn deserializes_blocking_response() {
        let response: ChatResponse = serde_json::from_str(
            r#"{"event": "message", "message_id": "m-1", "conversation_id": "c-1",
                "mode": "chat", "answer": "The answer is 42.",
                "metadata": {"usage": {"prompt_tokens": 20, "completion_tokens": 8,
                "total_tokens": 28}}, "created_at": 1705395332}"#,
        )
        .expect("valid response");

        assert_eq!(response.answer, "The answer is 42.");
        assert_eq!(response.mode.as_deref(), Some("chat"));
        let usage = response.metadata.and_then(|m| m.usage).expect("usage");
        assert_eq!(usage.total_tokens, 28);
    }
}
