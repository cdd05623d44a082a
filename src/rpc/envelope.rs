use serde::Serialize;
use serde_json::Value;

pub const JSONRPC_VERSION: &str = "2.0";

// ---------------------------------------------------------------------------
// Outbound envelopes
// ---------------------------------------------------------------------------

/// Response to a peer request, either `result` or `error`.
#[derive(Debug, Serialize)]
pub struct RpcResponse {
    pub jsonrpc: &'static str,
    pub id: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcErrorObject>,
}

/// Error payload inside an [`RpcResponse`].
#[derive(Debug, Serialize)]
pub struct RpcErrorObject {
    pub code: i64,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,
}

impl RpcResponse {
    /// Build a successful response echoing the peer's id.
    pub fn success(id: Value, result: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION,
            id,
            result: Some(result),
            error: None,
        }
    }

    /// Build an error response. Pass `Value::Null` when no id is available.
    pub fn error(id: Value, code: i64, message: &str, data: Option<String>) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION,
            id,
            result: None,
            error: Some(RpcErrorObject {
                code,
                message: message.to_owned(),
                data,
            }),
        }
    }
}

/// Terminal-initiated request or notification.
#[derive(Debug, Serialize)]
pub struct RpcRequest {
    pub jsonrpc: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,
    pub method: String,
    pub params: Value,
}

impl RpcRequest {
    /// A request expecting a confirmation, such as an intent.
    pub fn client(id: String, method: &str, params: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION,
            id: Some(Value::String(id)),
            method: method.to_owned(),
            params,
        }
    }

    /// An `org.hbbtv.notify` message. Carries no id.
    pub fn notify(params: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION,
            id: None,
            method: super::methods::NOTIFY.to_owned(),
            params,
        }
    }
}

macro_rules! display_as_json {
    ($ty:ty) => {
        impl std::fmt::Display for $ty {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                let text = serde_json::to_string(self).map_err(|_| std::fmt::Error)?;
                f.write_str(&text)
            }
        }
    };
}

display_as_json!(RpcResponse);
display_as_json!(RpcRequest);

// ---------------------------------------------------------------------------
// Inbound accessors
// ---------------------------------------------------------------------------

/// A peer-supplied request id, kept as received so it can be echoed back
/// unchanged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestId(Value);

impl RequestId {
    pub fn as_value(&self) -> &Value {
        &self.0
    }

    pub fn into_value(self) -> Value {
        self.0
    }
}

impl From<&str> for RequestId {
    fn from(s: &str) -> Self {
        Self(Value::String(s.to_owned()))
    }
}

impl From<String> for RequestId {
    fn from(s: String) -> Self {
        Self(Value::String(s))
    }
}

impl From<i64> for RequestId {
    fn from(n: i64) -> Self {
        Self(Value::from(n))
    }
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.0 {
            Value::String(s) => f.write_str(s),
            other => write!(f, "{}", other),
        }
    }
}

/// The peer's request id, when it is a non-empty string or a number.
pub fn request_id(obj: &Value) -> Option<RequestId> {
    match obj.get("id")? {
        Value::String(s) if !s.is_empty() => Some(RequestId(Value::String(s.clone()))),
        Value::Number(n) => Some(RequestId(Value::Number(n.clone()))),
        _ => None,
    }
}

pub fn params(obj: &Value) -> Option<&serde_json::Map<String, Value>> {
    obj.get("params")?.as_object()
}

pub fn str_field<'a>(obj: &'a serde_json::Map<String, Value>, key: &str) -> Option<&'a str> {
    obj.get(key)?.as_str()
}

pub fn bool_field(obj: &serde_json::Map<String, Value>, key: &str) -> Option<bool> {
    obj.get(key)?.as_bool()
}

/// `result.method` when present and a string.
pub fn result_method(obj: &Value) -> Option<&str> {
    obj.get("result")?.get("method")?.as_str()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn success_response_shape() {
        let text = RpcResponse::success(json!("7"), json!({"method": "x"})).to_string();
        let v: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(v, json!({"jsonrpc": "2.0", "id": "7", "result": {"method": "x"}}));
    }

    #[test]
    fn error_response_with_null_id_omits_data() {
        let text = RpcResponse::error(Value::Null, -32700, "Parse error", None).to_string();
        let v: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(
            v,
            json!({"jsonrpc": "2.0", "id": null, "error": {"code": -32700, "message": "Parse error"}})
        );
    }

    #[test]
    fn notify_has_no_id() {
        let text = RpcRequest::notify(json!({"msgType": "subtitlesPrefChange"})).to_string();
        let v: Value = serde_json::from_str(&text).unwrap();
        assert!(v.get("id").is_none());
        assert_eq!(v["method"], "org.hbbtv.notify");
    }

    #[test]
    fn request_id_accepts_strings_and_numbers() {
        assert_eq!(request_id(&json!({"id": "a"})), Some(RequestId::from("a")));
        assert_eq!(request_id(&json!({"id": 3})), Some(RequestId::from(3)));
        assert_eq!(request_id(&json!({"id": ""})), None);
        assert_eq!(request_id(&json!({"id": null})), None);
        assert_eq!(request_id(&json!({})), None);
    }

    #[test]
    fn request_id_keeps_its_json_type() {
        let id = request_id(&json!({"id": 42})).unwrap();
        assert_eq!(id.to_string(), "42");
        assert_eq!(id.into_value(), json!(42));
        assert_eq!(RequestId::from("IntentId1").to_string(), "IntentId1");
    }
}
