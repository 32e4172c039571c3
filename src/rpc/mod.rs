//! JSON-RPC style object registry
//!
//! Objects register under a global name and answer `"object.method"`
//! requests with JSON parameters.

mod registry;

pub use registry::*;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Errors surfaced to RPC callers
#[derive(Debug, thiserror::Error)]
pub enum RpcError {
    #[error("Unknown RPC object: {0}")]
    ObjectNotFound(String),

    #[error("Unknown RPC method: {0}")]
    MethodNotFound(String),

    #[error("Invalid parameters: {0}")]
    InvalidParams(String),

    /// The object is registered but its backing service is gone
    #[error("RPC object unavailable: {0}")]
    Unavailable(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl RpcError {
    /// JSON-RPC error code
    pub fn code(&self) -> i64 {
        match self {
            RpcError::ObjectNotFound(_) | RpcError::MethodNotFound(_) => -32601,
            RpcError::InvalidParams(_) => -32602,
            RpcError::Unavailable(_) | RpcError::Serialization(_) => -32603,
        }
    }

    /// Get error code string
    pub fn error_code(&self) -> &'static str {
        match self {
            RpcError::ObjectNotFound(_) => "OBJECT_NOT_FOUND",
            RpcError::MethodNotFound(_) => "METHOD_NOT_FOUND",
            RpcError::InvalidParams(_) => "INVALID_PARAMS",
            RpcError::Unavailable(_) => "UNAVAILABLE",
            RpcError::Serialization(_) => "SERIALIZATION_ERROR",
        }
    }
}

/// An object callable over RPC
#[async_trait]
pub trait RpcCallable: Send + Sync {
    /// Method names this object answers to
    fn methods(&self) -> &'static [&'static str];

    /// Invoke `method` with JSON parameters
    async fn call(&self, method: &str, params: Value) -> Result<Value, RpcError>;
}

/// A request for `"object.method"`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcRequest {
    #[serde(default)]
    pub id: Value,
    pub method: String,
    #[serde(default)]
    pub params: Value,
}

/// Error body of an [`RpcResponse`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcErrorBody {
    pub code: i64,
    pub error_code: String,
    pub message: String,
}

impl From<&RpcError> for RpcErrorBody {
    fn from(err: &RpcError) -> Self {
        Self {
            code: err.code(),
            error_code: err.error_code().to_string(),
            message: err.to_string(),
        }
    }
}

/// Answer to an [`RpcRequest`]; exactly one of `result` and `error` is set
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcResponse {
    pub id: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcErrorBody>,
}

impl RpcResponse {
    pub fn success(id: Value, result: Value) -> Self {
        Self {
            id,
            result: Some(result),
            error: None,
        }
    }

    pub fn failure(id: Value, err: &RpcError) -> Self {
        Self {
            id,
            result: None,
            error: Some(err.into()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}
