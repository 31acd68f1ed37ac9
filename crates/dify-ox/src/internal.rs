use async_stream::try_stream;
use futures_util::stream::{BoxStream, StreamExt};
use reqwest::{Method, RequestBuilder as ReqwestRequestBuilder};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::{
    error::{self, DifyRequestError},
    request::ChatRequest,
    response::{ChatResponse, StopResponse, StreamEvent, SuggestedQuestionsResponse},
    streaming::SseFramer,
};

/// Payload that marks explicit end-of-stream.
const DONE_SENTINEL: &str = "[DONE]";

/// HTTP method for API endpoints
#[derive(Debug, Clone)]
pub(crate) enum HttpMethod {
    Get,
    Post,
}

impl From<HttpMethod> for Method {
    fn from(method: HttpMethod) -> Self {
        match method {
            HttpMethod::Get => Method::GET,
            HttpMethod::Post => Method::POST,
        }
    }
}

/// Represents an API endpoint with its configuration
#[derive(Debug, Clone)]
pub(crate) struct Endpoint {
    path: String,
    method: HttpMethod,
}

impl Endpoint {
    pub fn new(path: impl Into<String>, method: HttpMethod) -> Self {
        Self {
            path: path.into(),
            method,
        }
    }
}

/// Dify client helper that owns request building and dispatch.
#[derive(Clone)]
pub(crate) struct DifyRequestHelper {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl std::fmt::Debug for DifyRequestHelper {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DifyRequestHelper")
            .field("base_url", &self.base_url)
            .field("api_key", &"[REDACTED]")
            .finish()
    }
}

impl DifyRequestHelper {
    pub fn new(client: reqwest::Client, base_url: &str, api_key: &str) -> Self {
        Self {
            client,
            base_url: base_url.to_string(),
            api_key: api_key.to_string(),
        }
    }

    /// Build a reqwest RequestBuilder for the given endpoint
    fn build_request(&self, endpoint: &Endpoint) -> ReqwestRequestBuilder {
        let url = format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            endpoint.path.trim_start_matches('/')
        );
        let method: Method = endpoint.method.clone().into();

        let mut req = self.client.request(method, &url).bearer_auth(&self.api_key);

        if matches!(endpoint.method, HttpMethod::Post) {
            req = req.header("content-type", "application/json");
        }

        req
    }

    /// Execute a request with JSON body and return deserialized response
    async fn request_json<T: for<'de> Deserialize<'de>, B: Serialize>(
        &self,
        endpoint: &Endpoint,
        body: Option<&B>,
    ) -> Result<T, DifyRequestError> {
        let mut req = self.build_request(endpoint);

        if let Some(body) = body {
            req = req.json(body);
        }

        let res = req.send().await?;
        self.handle_response(res).await
    }

    /// Handle response and parse errors
    async fn handle_response<T: for<'de> Deserialize<'de>>(
        &self,
        res: reqwest::Response,
    ) -> Result<T, DifyRequestError> {
        let status = res.status();
        let bytes = res.bytes().await?;

        if status.is_success() {
            Ok(serde_json::from_slice(&bytes)?)
        } else {
            Err(error::parse_error_response(status, &bytes))
        }
    }

    /// Send a blocking chat-message request
    pub async fn send_chat_request(
        &self,
        request: &ChatRequest,
    ) -> Result<ChatResponse, DifyRequestError> {
        let endpoint = Endpoint::new("chat-messages", HttpMethod::Post);
        self.request_json(&endpoint, Some(request)).await
    }

    /// Stop an in-flight streaming generation on the server side
    pub async fn stop_generation(
        &self,
        task_id: &str,
        user: &str,
    ) -> Result<StopResponse, DifyRequestError> {
        let endpoint = Endpoint::new(format!("chat-messages/{task_id}/stop"), HttpMethod::Post);
        self.request_json(&endpoint, Some(&json!({ "user": user })))
            .await
    }

    /// Fetch follow-up question suggestions for a completed message
    pub async fn suggested_questions(
        &self,
        message_id: &str,
        user: &str,
    ) -> Result<SuggestedQuestionsResponse, DifyRequestError> {
        let endpoint = Endpoint::new(format!("messages/{message_id}/suggested"), HttpMethod::Get);
        let req = self.build_request(&endpoint).query(&[("user", user)]);
        let res = req.send().await?;
        self.handle_response(res).await
    }

    /// Stream a chat-message request as decoded wire events.
    ///
    /// The returned stream yields events in arrival order and terminates on
    /// the first of: the `[DONE]` sentinel, an `error` event (surfaced as the
    /// final `Err` item), or the peer closing the connection. Payloads that
    /// fail to parse are skipped; a broken line must not abort an otherwise
    /// healthy stream.
    pub fn stream_chat_request(
        &self,
        request: &ChatRequest,
    ) -> BoxStream<'static, Result<StreamEvent, DifyRequestError>> {
        let helper = self.clone();
        let request = request.clone();

        Box::pin(try_stream! {
            let endpoint = Endpoint::new("chat-messages", HttpMethod::Post);
            let response = helper
                .build_request(&endpoint)
                .json(&request)
                .send()
                .await?;
            let status = response.status();

            if !status.is_success() {
                let bytes = response.bytes().await?;
                Err(error::parse_error_response(status, &bytes))?;
            } else {
                let mut byte_stream = response.bytes_stream();
                let mut framer = SseFramer::new();
                let mut saw_done = false;

                'read: while let Some(chunk) = byte_stream.next().await {
                    let chunk = chunk?;
                    for record in framer.feed(&chunk) {
                        for payload in record.data_payloads() {
                            if payload == DONE_SENTINEL {
                                // Anything still buffered past the sentinel is
                                // intentionally never processed.
                                saw_done = true;
                                break 'read;
                            }

                            match serde_json::from_str::<StreamEvent>(payload) {
                                Ok(StreamEvent::Error {
                                    status: event_status,
                                    code,
                                    message,
                                    ..
                                }) => {
                                    Err(DifyRequestError::ErrorEvent {
                                        status: event_status,
                                        code,
                                        message: message
                                            .unwrap_or_else(|| "Unknown error from Dify".to_string()),
                                    })?;
                                }
                                Ok(event) => yield event,
                                Err(parse_err) => {
                                    tracing::warn!(
                                        error = %parse_err,
                                        payload,
                                        "skipping malformed stream payload"
                                    );
                                }
                            }
                        }
                    }
                }

                if !saw_done {
                    // Peer closed without the sentinel; drain the partial tail
                    // best-effort before terminating.
                    if let Some(record) = framer.finish() {
                        for payload in record.data_payloads() {
                            if payload == DONE_SENTINEL {
                                break;
                            }
                            if let Ok(event) = serde_json::from_str::<StreamEvent>(payload) {
                                if !matches!(event, StreamEvent::Error { .. }) {
                                    yield event;
                                }
                            }
                        }
                    }
                }
            }
        })
    }
}
