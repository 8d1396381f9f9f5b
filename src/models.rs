//! Core data models used throughout docqa.
//!
//! [`Message`] is the unit of the conversation log. [`SelectedFile`] is a
//! document picked by the user, already read into memory. The remaining types
//! mirror the JSON bodies exchanged with the indexing backend.

use serde::{Deserialize, Serialize};

/// Who produced a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    User,
    Bot,
}

/// One entry in the conversation. Never changed after it is appended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub sender: Sender,
    pub text: String,
}

impl Message {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            sender: Sender::User,
            text: text.into(),
        }
    }

    pub fn bot(text: impl Into<String>) -> Self {
        Self {
            sender: Sender::Bot,
            text: text.into(),
        }
    }

    pub fn is_bot(&self) -> bool {
        self.sender == Sender::Bot
    }
}

/// A document chosen for upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectedFile {
    /// Base name sent as the multipart file name.
    pub name: String,
    pub bytes: Vec<u8>,
}

impl SelectedFile {
    pub fn new(name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            bytes: bytes.into(),
        }
    }
}

/// `POST /api/createIndex` response.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateIndexResponse {
    pub index_name: String,
}

/// `POST /api/queryIndex` request.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryIndexRequest {
    pub index_name: String,
    pub question: String,
}

/// `POST /api/queryIndex` response.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct QueryIndexResponse {
    pub answer: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_request_uses_camel_case() {
        let req = QueryIndexRequest {
            index_name: "idx-1".to_string(),
            question: "What is the capital?".to_string(),
        };
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["indexName"], "idx-1");
        assert_eq!(json["question"], "What is the capital?");
    }

    #[test]
    fn test_create_index_response_parses_index_name() {
        let resp: CreateIndexResponse =
            serde_json::from_str(r#"{"indexName":"idx-9","extra":true}"#).unwrap();
        assert_eq!(resp.index_name, "idx-9");
    }

    #[test]
    fn test_sender_serializes_lowercase() {
        let json = serde_json::to_string(&Message::bot("hi")).unwrap();
        assert_eq!(json, r#"{"sender":"bot","text":"hi"}"#);
    }
}
