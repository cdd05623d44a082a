use thiserror::Error;

/// Outcome of handling a single inbound message when it is not a success.
///
/// Every variant except [`RpcError::NotificationError`] is answered with an
/// error response carrying [`RpcError::code`] and [`RpcError::message`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum RpcError {
    /// Text did not parse as JSON.
    #[error("parse error")]
    ParseError,
    /// Wrong protocol version or malformed method shape.
    #[error("invalid request")]
    InvalidRequest,
    /// Method is unregistered or was not negotiated on this connection.
    #[error("method not found")]
    MethodNotFound,
    /// A required field is missing or has the wrong type.
    #[error("invalid params")]
    InvalidParams,
    /// A notification failed validation. Never answered.
    #[error("notification failed validation")]
    NotificationError,
    #[error("unknown error")]
    Unknown,
}

impl RpcError {
    /// Wire error code.
    pub fn code(&self) -> i64 {
        match self {
            RpcError::ParseError => -32700,
            RpcError::InvalidRequest => -32600,
            RpcError::MethodNotFound => -32601,
            RpcError::InvalidParams => -32602,
            RpcError::NotificationError => -32000,
            RpcError::Unknown => -32603,
        }
    }

    /// Fixed wire message for the error category.
    pub fn message(&self) -> &'static str {
        match self {
            RpcError::ParseError => "Parse error",
            RpcError::InvalidRequest => "Invalid Request",
            RpcError::MethodNotFound => "Method not found",
            RpcError::InvalidParams => "Invalid params",
            RpcError::NotificationError => "Notification error",
            RpcError::Unknown => "Unknown error",
        }
    }

    /// Whether the error response must carry `"id": null` instead of the
    /// request id.
    pub fn has_null_id(&self) -> bool {
        matches!(self, RpcError::ParseError | RpcError::InvalidRequest)
    }

    /// Whether this outcome produces an error response at all.
    pub fn is_answered(&self) -> bool {
        !matches!(self, RpcError::NotificationError)
    }
}

/// Code sent when a dialogue enhancement override request carries a bad gain.
pub const DIALOGUE_ENHANCEMENT_OVERRIDE_FAILED: i64 = -24;
pub const DIALOGUE_ENHANCEMENT_OVERRIDE_FAILED_MESSAGE: &str =
    "Dialogue Enhancement override failed";
