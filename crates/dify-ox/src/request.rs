use bon::Builder;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// How the backend should deliver the completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseMode {
    /// Server-sent-event stream of incremental answer deltas.
    Streaming,
    /// Single JSON response once the answer is complete.
    Blocking,
}

/// Request body for the `chat-messages` endpoint.
///
/// `response_mode` is set by the client method that dispatches the request
/// ([`crate::Dify::send`] forces blocking, [`crate::Dify::stream`] forces
/// streaming), so builders normally leave it unset.
#[derive(Debug, Clone, Serialize, Builder)]
pub struct ChatRequest {
    /// App input variables, `{}` when the app defines none.
    #[builder(default)]
    pub inputs: Map<String, Value>,
    /// User query text.
    #[builder(into)]
    pub query: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_mode: Option<ResponseMode>,
    /// Empty string starts a new conversation; the backend owns the state.
    #[builder(default, into)]
    pub conversation_id: String,
    /// Caller identity, scoped to the app.
    #[builder(into)]
    pub user: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub files: Option<Vec<FileInput>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auto_generate_name: Option<bool>,
}

impl ChatRequest {
    pub fn push_input(&mut self, key: impl Into<String>, value: Value) {
        self.inputs.insert(key.into(), value);
    }
}

/// A file attached to a chat message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileInput {
    pub r#type: String,
    pub transfer_method: TransferMethod,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub upload_file_id: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransferMethod {
    RemoteUrl,
    LocalFile,
}

impl FileInput {
    /// Attach an image by remote URL.
    pub fn remote_image(url: impl Into<String>) -> Self {
        Self {
            r#type: "image".to_string(),
            transfer_method: TransferMethod::RemoteUrl,
            url: Some(url.into()),
            upload_file_id: None,
        }
    }

    /// Attach an image previously uploaded through the files API.
    pub fn uploaded_image(upload_file_id: impl Into<String>) -> Self {
        Self {
            r#type: "image".to_string(),
            transfer_method: TransferMethod::LocalFile,
            url: None,
            upload_file_id: Some(upload_file_id.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn serializes_wire_body_shape() {
        let mut request = ChatRequest::builder()
            .query("What are the specs of the iPhone 13 Pro Max?")
            .user("user-123")
            .build();
        request.response_mode = Some(ResponseMode::Streaming);

        let body = serde_json::to_value(&request).expect("serializable");
        assert_eq!(
            body,
            json!({
                "inputs": {},
                "query": "What are the specs of the iPhone 13 Pro Max?",
                "response_mode": "streaming",
                "conversation_id": "",
                "user": "user-123",
            })
        );
    }

    #[test]
    fn serializes_files_and_inputs() {
        let mut request = ChatRequest::builder()
            .query("describe this")
            .user("user-123")
            .files(vec![FileInput::remote_image("https://example.com/a.png")])
            .build();
        request.push_input("lang", json!("en"));

        let body = serde_json::to_value(&request).expect("serializable");
        assert_eq!(body["inputs"]["lang"], "en");
        assert_eq!(body["files"][0]["transfer_method"], "remote_url");
        assert_eq!(body["files"][0]["url"], "https://example.com/a.png");
        assert!(body["files"][0].get("upload_file_id").is_none());
    }
}
