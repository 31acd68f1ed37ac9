#![cfg_attr(not(test), deny(unsafe_code))]
#![warn(
    clippy::pedantic,
    clippy::unwrap_used,
    clippy::missing_docs_in_private_items
)]

pub mod error;
mod internal;
pub mod request;
pub mod response;
pub mod streaming;

// Re-export main types
pub use error::DifyRequestError;
pub use request::{ChatRequest, FileInput, ResponseMode, TransferMethod};
pub use response::{
    ChatResponse, Metadata, StopResponse, StreamEvent, SuggestedQuestionsResponse, Usage,
};
pub use streaming::{SseFramer, SseRecord};

use bon::Builder;
use core::fmt;
use futures_util::stream::{self, BoxStream};
#[cfg(feature = "leaky-bucket")]
use leaky_bucket::RateLimiter;
#[cfg(feature = "leaky-bucket")]
use std::sync::Arc;

use crate::internal::DifyRequestHelper;

const BASE_URL: &str = "https://api.dify.ai/v1";

/// Dify chat API client.
///
/// Configuration is explicit: credentials and endpoint live on the struct,
/// never in ambient process state, so tests can construct throwaway clients
/// against a mock server. [`Dify::load_from_env`] is the opt-in convenience
/// for binaries that do configure through the environment.
#[derive(Clone, Default, Builder)]
pub struct Dify {
    #[builder(into)]
    pub(crate) api_key: Option<String>,
    #[builder(default)]
    pub(crate) client: reqwest::Client,
    #[cfg(feature = "leaky-bucket")]
    pub(crate) leaky_bucket: Option<Arc<RateLimiter>>,
    #[builder(default = BASE_URL.to_string(), into)]
    pub(crate) base_url: String,
}

impl Dify {
    /// Create a new Dify client with the provided API key.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: Some(api_key.into()),
            client: reqwest::Client::new(),
            #[cfg(feature = "leaky-bucket")]
            leaky_bucket: None,
            base_url: BASE_URL.to_string(),
        }
    }

    /// Build a client from `DIFY_API_KEY` and optionally `DIFY_BASE_URL`.
    pub fn load_from_env() -> Result<Self, std::env::VarError> {
        let api_key = std::env::var("DIFY_API_KEY")?;
        let base_url =
            std::env::var("DIFY_BASE_URL").unwrap_or_else(|_| BASE_URL.to_string());
        Ok(Self::builder().api_key(api_key).base_url(base_url).build())
    }

    /// Base URL for the API
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Create request helper after validating configuration.
    ///
    /// Missing or empty credentials fail here, before any network call.
    fn request_helper(&self) -> Result<DifyRequestHelper, DifyRequestError> {
        if self.base_url.trim().is_empty() {
            return Err(DifyRequestError::ConfigurationMissing("base_url"));
        }
        match self.api_key.as_deref() {
            Some(key) if !key.trim().is_empty() => Ok(DifyRequestHelper::new(
                self.client.clone(),
                &self.base_url,
                key,
            )),
            _ => Err(DifyRequestError::ConfigurationMissing("api_key")),
        }
    }
}

impl Dify {
    /// Send a chat message in blocking mode and wait for the full answer.
    pub async fn send(&self, request: &ChatRequest) -> Result<ChatResponse, DifyRequestError> {
        #[cfg(feature = "leaky-bucket")]
        if let Some(ref limiter) = self.leaky_bucket {
            limiter.acquire_one().await;
        }

        let helper = self.request_helper()?;
        let mut request_data = request.clone();
        request_data.response_mode = Some(ResponseMode::Blocking);
        helper.send_chat_request(&request_data).await
    }

    /// Stream a chat message as decoded wire events.
    ///
    /// Items arrive in backend emission order. The stream terminates after at
    /// most one `Err`: an explicit `error` event, a transport failure, or a
    /// rejected request all end it, as do the `[DONE]` sentinel and the peer
    /// closing the connection. Dropping the stream aborts the request.
    pub fn stream(
        &self,
        request: &ChatRequest,
    ) -> BoxStream<'static, Result<StreamEvent, DifyRequestError>> {
        use async_stream::try_stream;
        use futures_util::StreamExt;

        let helper = match self.request_helper() {
            Ok(helper) => helper,
            Err(err) => return Box::pin(stream::once(async move { Err(err) })),
        };

        let mut request_data = request.clone();
        request_data.response_mode = Some(ResponseMode::Streaming);

        #[cfg(feature = "leaky-bucket")]
        let rate_limiter = self.leaky_bucket.clone();

        Box::pin(try_stream! {
            #[cfg(feature = "leaky-bucket")]
            if let Some(ref limiter) = rate_limiter {
                limiter.acquire_one().await;
            }

            let mut events = helper.stream_chat_request(&request_data);

            while let Some(event) = events.next().await {
                yield event?;
            }
        })
    }

    /// Stream only the assistant answer text.
    ///
    /// Yields the non-empty `answer` deltas of `message` and `agent_message`
    /// events in arrival order; concatenating the yields reproduces the full
    /// reply.
    pub fn stream_answer(
        &self,
        request: &ChatRequest,
    ) -> BoxStream<'static, Result<String, DifyRequestError>> {
        use async_stream::try_stream;
        use futures_util::StreamExt;

        let mut events = self.stream(request);

        Box::pin(try_stream! {
            while let Some(event) = events.next().await {
                let event = event?;
                if let Some(answer) = event.answer() {
                    if !answer.is_empty() {
                        yield answer.to_string();
                    }
                }
            }
        })
    }

    /// Ask the backend to stop generating an in-flight streaming answer.
    ///
    /// Complements drop-cancellation: dropping the stream closes the client
    /// side, this stops the generation server-side.
    pub async fn stop_generation(
        &self,
        task_id: &str,
        user: &str,
    ) -> Result<StopResponse, DifyRequestError> {
        let helper = self.request_helper()?;
        helper.stop_generation(task_id, user).await
    }

    /// Fetch follow-up question suggestions for a completed message.
    pub async fn suggested_questions(
        &self,
        message_id: &str,
        user: &str,
    ) -> Result<SuggestedQuestionsResponse, DifyRequestError> {
        #[cfg(feature = "leaky-bucket")]
        if let Some(ref limiter) = self.leaky_bucket {
            limiter.acquire_one().await;
        }

        let helper = self.request_helper()?;
        helper.suggested_questions(message_id, user).await
    }
}

impl fmt::Debug for Dify {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dify")
            .field("api_key", &"[REDACTED]")
            .field("client", &self.client)
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}
