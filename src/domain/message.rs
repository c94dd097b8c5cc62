//! Message - Wire protocol between the viewer and the remote data source
//!
//! ```text
//! viewer ── ready / request_rows { start_row, fetch_size } ──▶ source
//! viewer ◀── initial_data / receive_rows { start_row, fetch_size, data } ── source
//! ```

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::domain::dataset::DataSet;
use crate::domain::fragment::Fragment;
use crate::error::{Error, Result};

/// Requests sent by the viewer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum OutboundType {
    /// Handshake; the source answers with `initial_data`
    Ready,
    /// Page request; the source answers with `receive_rows`
    RequestRows,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct OutboundMessage {
    pub msg_type: OutboundType,
    pub start_row: usize,
    pub fetch_size: usize,
}

impl OutboundMessage {
    pub fn ready(fetch_size: usize) -> Self {
        Self {
            msg_type: OutboundType::Ready,
            start_row: 0,
            fetch_size,
        }
    }

    pub fn request_rows(start_row: usize, fetch_size: usize) -> Self {
        Self {
            msg_type: OutboundType::RequestRows,
            start_row,
            fetch_size,
        }
    }
}

/// Messages delivered to the viewer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum InboundType {
    InitialData,
    ReceiveRows,
    /// The source failed to produce the rows at `start_row`
    Error,
    /// Anything else travelling on the same channel
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct InboundMessage {
    pub msg_type: InboundType,

    #[serde(default)]
    pub start_row: usize,

    #[serde(default)]
    pub fetch_size: usize,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<DataSet>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl InboundMessage {
    pub fn initial_data(fetch_size: usize, data: DataSet) -> Self {
        Self {
            msg_type: InboundType::InitialData,
            start_row: 0,
            fetch_size,
            data: Some(data),
            error: None,
        }
    }

    pub fn receive_rows(start_row: usize, fetch_size: usize, data: DataSet) -> Self {
        Self {
            msg_type: InboundType::ReceiveRows,
            start_row,
            fetch_size,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(start_row: usize, message: impl Into<String>) -> Self {
        Self {
            msg_type: InboundType::Error,
            start_row,
            fetch_size: 0,
            data: None,
            error: Some(message.into()),
        }
    }

    /// Parse a JSON message
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Whether this message carries rows
    pub fn is_data_delivery(&self) -> bool {
        matches!(
            self.msg_type,
            InboundType::InitialData | InboundType::ReceiveRows
        )
    }

    /// Convert a data delivery into a fragment
    pub fn into_fragment(self) -> Result<Fragment> {
        let start_row = self.start_row;
        match self.data {
            Some(data) => Fragment::from_dataset(start_row, data),
            None => Err(Error::Invalid {
                message: format!("{:?} at row {start_row} carries no data", self.msg_type),
            }),
        }
    }
}

/// JSON schemas of both message directions
pub fn protocol_schema() -> serde_json::Value {
    serde_json::json!({
        "outbound": schemars::schema_for!(OutboundMessage),
        "inbound": schemars::schema_for!(InboundMessage),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_rows_wire_format() {
        let json = serde_json::to_value(OutboundMessage::request_rows(300, 100)).expect("json");
        assert_eq!(
            json,
            serde_json::json!({"msg_type": "request_rows", "start_row": 300, "fetch_size": 100})
        );
    }

    #[test]
    fn test_parse_receive_rows() {
        let message = InboundMessage::from_json(
            r#"{
                "msg_type": "receive_rows",
                "start_row": 200,
                "fetch_size": 2,
                "data": {"columns": [{"name": "a", "data": [1, 2]}], "rowCount": 1000}
            }"#,
        )
        .expect("parse");

        assert!(message.is_data_delivery());
        let fragment = message.into_fragment().expect("fragment");
        assert_eq!(fragment.row_start(), 200);
        assert_eq!(fragment.len(), 2);
        assert_eq!(fragment.row_count(), Some(1000));
    }

    #[test]
    fn test_unknown_message_type_is_other() {
        let message =
            InboundMessage::from_json(r#"{"msg_type": "update_theme"}"#).expect("parse");
        assert_eq!(message.msg_type, InboundType::Other);
        assert!(!message.is_data_delivery());
    }

    #[test]
    fn test_delivery_without_data_is_invalid() {
        let message = InboundMessage::from_json(r#"{"msg_type": "receive_rows", "start_row": 5}"#)
            .expect("parse");
        assert!(matches!(message.into_fragment(), Err(Error::Invalid { .. })));
    }

    #[test]
    fn test_schema_has_both_directions() {
        let schema = protocol_schema();
        assert!(schema.get("outbound").is_some());
        assert!(schema.get("inbound").is_some());
    }
}
