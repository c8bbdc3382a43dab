//! JSON-RPC 2.0 message types for the MCP gateway.
//!
//! # Message Types
//!
//! - **Request**: carries a non-null `id` and receives exactly one response
//! - **Notification**: `id` absent or `null`; never answered
//! - **Response**: `result` or `error`, never both; `id` is `null` when the
//!   request id could not be recovered
//!
//! Requests are kept alongside their raw [`Value`] so the gateway can
//! forward them upstream exactly as received.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Number, Value};

/// The MCP protocol version this implementation supports.
pub const MCP_PROTOCOL_VERSION: &str = "2024-11-05";

/// Server name for capability negotiation.
pub const SERVER_NAME: &str = "eraser-mcp";

/// JSON-RPC version tag.
pub const JSONRPC_VERSION: &str = "2.0";

/// A JSON-RPC 2.0 request ID.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RequestId {
    /// Numeric request ID, echoed exactly as received.
    Number(Number),
    /// String request ID.
    String(String),
}

impl From<i64> for RequestId {
    fn from(n: i64) -> Self {
        Self::Number(n.into())
    }
}

impl From<&str> for RequestId {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::String(s) => write!(f, "{s}"),
        }
    }
}

/// A parsed inbound envelope.
#[derive(Debug, Clone)]
pub struct JsonRpcRequest {
    /// Request id; `None` for notifications.
    pub id: Option<RequestId>,

    /// The method to invoke.
    pub method: String,

    /// Optional parameters for the method.
    pub params: Option<Value>,

    /// The envelope exactly as parsed from the wire.
    pub raw: Value,
}

impl JsonRpcRequest {
    /// Returns `true` if no response is expected.
    #[must_use]
    pub const fn is_notification(&self) -> bool {
        self.id.is_none()
    }
}

/// Standard JSON-RPC 2.0 error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    /// Invalid JSON was received by the server.
    ParseError,
    /// The JSON sent is not a valid Request object.
    InvalidRequest,
    /// The method does not exist or is not available.
    MethodNotFound,
    /// Generic operation failure (credential, upstream, unhandled task).
    ServerError,
}

impl ErrorCode {
    /// Returns the numeric code for this error.
    #[must_use]
    pub const fn code(self) -> i32 {
        match self {
            Self::ParseError => -32700,
            Self::InvalidRequest => -32600,
            Self::MethodNotFound => -32601,
            Self::ServerError => -32000,
        }
    }

    /// Returns the default message for this error code.
    #[must_use]
    pub const fn default_message(self) -> &'static str {
        match self {
            Self::ParseError => "Parse error",
            Self::InvalidRequest => "Invalid Request",
            Self::MethodNotFound => "Method not found",
            Self::ServerError => "Server error",
        }
    }
}

/// A JSON-RPC 2.0 error object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcErrorData {
    /// The error code.
    pub code: i32,

    /// A short description of the error.
    pub message: String,

    /// Additional information about the error.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl JsonRpcErrorData {
    /// Creates a new error from an error code.
    #[must_use]
    pub fn from_code(code: ErrorCode) -> Self {
        Self::with_message(code, code.default_message())
    }

    /// Creates a new error with a custom message.
    #[must_use]
    pub fn with_message(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code: code.code(),
            message: message.into(),
            data: None,
        }
    }
}

/// A JSON-RPC 2.0 response envelope.
///
/// Built only through [`JsonRpcResponse::success`] and
/// [`JsonRpcResponse::failure`], so exactly one of `result` and `error` is
/// set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    /// Always "2.0".
    pub jsonrpc: String,

    /// The request ID this response corresponds to, `null` if unknown.
    pub id: Option<RequestId>,

    /// The result of the method call. A `null` result is `Some(Value::Null)`.
    #[serde(
        default,
        deserialize_with = "present_value",
        skip_serializing_if = "Option::is_none"
    )]
    pub result: Option<Value>,

    /// The error details.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcErrorData>,
}

/// Deserialises a present field as `Some`, even when it is `null`.
fn present_value<'de, D>(deserializer: D) -> Result<Option<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

impl JsonRpcResponse {
    /// Creates a new success response.
    #[must_use]
    pub fn success(id: RequestId, result: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id: Some(id),
            result: Some(result),
            error: None,
        }
    }

    /// Creates a new error response.
    #[must_use]
    pub fn failure(id: Option<RequestId>, error: JsonRpcErrorData) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            result: None,
            error: Some(error),
        }
    }

    /// Creates a parse error response (ID cannot be determined).
    #[must_use]
    pub fn parse_error() -> Self {
        Self::failure(None, JsonRpcErrorData::from_code(ErrorCode::ParseError))
    }

    /// Creates an invalid request error response.
    #[must_use]
    pub fn invalid_request(id: Option<RequestId>) -> Self {
        Self::failure(id, JsonRpcErrorData::from_code(ErrorCode::InvalidRequest))
    }

    /// Creates a method not found error response.
    #[must_use]
    pub fn method_not_found(id: RequestId, method: &str) -> Self {
        Self::failure(
            Some(id),
            JsonRpcErrorData::with_message(
                ErrorCode::MethodNotFound,
                format!("Method not found: {method}"),
            ),
        )
    }

    /// Creates a generic operation error response.
    #[must_use]
    pub fn server_error(id: Option<RequestId>, message: impl Into<String>) -> Self {
        Self::failure(
            id,
            JsonRpcErrorData::with_message(ErrorCode::ServerError, message),
        )
    }
}

/// Parses one transport line into a request envelope.
///
/// # Errors
///
/// Returns the error response to emit when the line is not valid JSON
/// (`-32700`, null id) or not a valid request object (`-32600`, echoing
/// the id when it could be recovered).
pub fn parse_message(json: &str) -> Result<JsonRpcRequest, JsonRpcResponse> {
    let raw: Value = serde_json::from_str(json).map_err(|_| JsonRpcResponse::parse_error())?;

    let Some(obj) = raw.as_object() else {
        return Err(JsonRpcResponse::invalid_request(None));
    };

    let id = parse_id(obj).ok_or_else(|| JsonRpcResponse::invalid_request(None))?;

    if obj.get("jsonrpc").and_then(Value::as_str) != Some(JSONRPC_VERSION) {
        return Err(JsonRpcResponse::invalid_request(id));
    }

    let Some(method) = obj.get("method").and_then(Value::as_str) else {
        return Err(JsonRpcResponse::invalid_request(id));
    };

    Ok(JsonRpcRequest {
        id,
        method: method.to_string(),
        params: obj.get("params").cloned(),
        raw: raw.clone(),
    })
}

/// Extracts the request id.
///
/// The outer `None` means the id has an invalid type; `Some(None)` means the
/// id is absent or `null`.
fn parse_id(obj: &Map<String, Value>) -> Option<Option<RequestId>> {
    match obj.get("id") {
        None | Some(Value::Null) => Some(None),
        Some(Value::Number(n)) => Some(Some(RequestId::Number(n.clone()))),
        Some(Value::String(s)) => Some(Some(RequestId::String(s.clone()))),
        Some(_) => None,
    }
}
