#![cfg_attr(not(test), deny(unsafe_code))]

pub mod buffer;
pub mod error;
pub mod message;
pub mod request;
pub mod session;
pub mod transport;
pub mod wire;

// Re-export main types
pub use buffer::IncrementalBuffer;
pub use error::ChatStreamError;
pub use message::{ChatMessage, MessageId, MessageStatus, Role};
pub use request::SendMessageRequest;
pub use session::{CancelHandle, SessionState, StreamHandler, StreamSession};
pub use wire::WireEvent;

use bon::Builder;
use core::fmt;
use futures_util::stream::BoxStream;

const BASE_URL: &str = "http://localhost:8000";
const MESSAGES_URL: &str = "v1/conversations";

#[derive(Clone, Default, Builder)]
pub struct ChatClient {
    #[builder(into)]
    pub(crate) api_token: Option<String>,
    #[builder(default)]
    pub(crate) client: reqwest::Client,
    #[builder(default = BASE_URL.to_string(), into)]
    pub(crate) base_url: String,
    #[builder(default)]
    pub(crate) headers: std::collections::HashMap<String, String>,
}

impl ChatClient {
    /// Create a new client against the given backend base URL.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            api_token: None,
            client: reqwest::Client::new(),
            base_url: base_url.into(),
            headers: std::collections::HashMap::new(),
        }
    }

    pub fn load_from_env() -> Result<Self, std::env::VarError> {
        let base_url = std::env::var("CHAT_API_URL")?;
        let api_token = std::env::var("CHAT_API_TOKEN").ok();
        Ok(Self::builder()
            .base_url(base_url)
            .maybe_api_token(api_token)
            .build())
    }

    /// Add a custom header to the client
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    /// Open a session for one assistant reply in the given conversation.
    pub fn open_session(&self, conversation_id: impl Into<String>) -> StreamSession {
        StreamSession::new(conversation_id)
    }

    /// Send a message and stream back the assistant's reply as typed events.
    ///
    /// The stream is lazy, finite and non-restartable; feed it to
    /// [`StreamSession::run`] to drive the callback contract.
    pub fn send_message(
        &self,
        request: &SendMessageRequest,
    ) -> BoxStream<'static, Result<WireEvent, ChatStreamError>> {
        use async_stream::try_stream;

        let client = self.client.clone();
        let api_token = self.api_token.clone();
        let headers = self.headers.clone();
        let url = format!(
            "{}/{}/{}/messages",
            self.base_url, MESSAGES_URL, request.conversation_id
        );
        let request_data = request.clone().streaming();

        Box::pin(try_stream! {
            let mut req = client
                .post(&url)
                .header("content-type", "application/json")
                .header("accept", "text/event-stream");

            if let Some(token) = &api_token {
                req = req.header("authorization", format!("Bearer {token}"));
            }
            for (key, value) in &headers {
                req = req.header(key, value);
            }

            let response = req.json(&request_data).send().await?;
            let status = response.status();

            if !status.is_success() {
                let bytes = response.bytes().await?;
                Err(error::parse_error_response(status, bytes))?;
            } else {
                let mut lines = transport::LineReader::from_response(response);

                while let Some(line) = lines.next_line().await? {
                    if let Some(event) = wire::parse_line(&line) {
                        yield event;
                    }
                }
            }
        })
    }
}

impl fmt::Debug for ChatClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChatClient")
            .field("api_token", &self.api_token.as_ref().map(|_| "[REDACTED]"))
            .field("client", &self.client)
            .field("base_url", &self.base_url)
            .field("headers", &self.headers)
            .finish_non_exhaustive()
    }
}
