use crate::rpc::{RpcCallable, RpcError, RpcRequest, RpcResponse};
use dashmap::DashMap;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, warn};

/// Registry of globally named RPC objects
#[derive(Default)]
pub struct RpcRegistry {
    objects: DashMap<String, Arc<dyn RpcCallable>>,
}

impl RpcRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `object` under `name`, replacing any previous registration
    pub fn register_global_object(&self, name: impl Into<String>, object: Arc<dyn RpcCallable>) {
        let name = name.into();
        debug!(object = %name, methods = ?object.methods(), "RPC object registered");
        if self.objects.insert(name.clone(), object).is_some() {
            warn!(object = %name, "RPC object replaced an earlier registration");
        }
    }

    /// Remove the object registered under `name`; returns false if none was
    pub fn unregister(&self, name: &str) -> bool {
        self.objects.remove(name).is_some()
    }

    pub fn is_registered(&self, name: &str) -> bool {
        self.objects.contains_key(name)
    }

    /// Call `method` on the object registered under `object`
    pub async fn call(&self, object: &str, method: &str, params: Value) -> Result<Value, RpcError> {
        // Clone out of the map so no shard lock is held across the call
        let target = self
            .objects
            .get(object)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or_else(|| RpcError::ObjectNotFound(object.to_string()))?;

        if !target.methods().iter().any(|m| *m == method) {
            return Err(RpcError::MethodNotFound(format!("{}.{}", object, method)));
        }

        target.call(method, params).await
    }

    /// Dispatch a request whose method is written `"object.method"`
    pub async fn handle(&self, request: RpcRequest) -> RpcResponse {
        let RpcRequest { id, method, params } = request;

        let result = match method.split_once('.') {
            Some((object, method)) => self.call(object, method, params).await,
            None => Err(RpcError::MethodNotFound(method.clone())),
        };

        match result {
            Ok(value) => RpcResponse::success(id, value),
            Err(e) => {
                debug!(method = %method, error_code = e.error_code(), error = %e, "RPC call failed");
                RpcResponse::failure(id, &e)
            }
        }
    }
}
