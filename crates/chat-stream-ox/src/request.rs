use bon::Builder;
use serde::{Deserialize, Serialize};

/// Body of a send-message call. The backend replies with the event stream
/// consumed by the pipeline.
#[derive(Debug, Clone, Serialize, Deserialize, Builder)]
pub struct SendMessageRequest {
    #[builder(into)]
    #[serde(default, skip_serializing)]
    pub conversation_id: String,
    #[builder(into)]
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stream: Option<bool>,
}

impl SendMessageRequest {
    pub fn new(conversation_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            conversation_id: conversation_id.into(),
            content: content.into(),
            stream: None,
        }
    }

    /// Enable streaming for this request
    pub fn streaming(mut self) -> Self {
        self.stream = Some(true);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conversation_id_is_not_serialized() {
        let request = SendMessageRequest::new("c1", "hello").streaming();
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json, serde_json::json!({"content": "hello", "stream": true}));
    }
}
