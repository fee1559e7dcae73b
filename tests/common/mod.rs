//! Shared test transport: canned response bodies per method, plus a call
//! log so tests can assert what the engine actually issued.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;

use sbl::rpc::{NO_DATA, Route, RpcError, RpcTransport};

#[derive(Default)]
pub struct MockTransport {
    responses: Mutex<HashMap<String, String>>,
    calls: Mutex<Vec<(String, Value)>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the body returned for `method`. Methods without a canned body
    /// answer `"no_data"`.
    pub fn respond(&self, method: &str, body: &str) {
        self.responses
            .lock()
            .unwrap()
            .insert(method.to_string(), body.to_string());
    }

    pub fn count(&self, method: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(m, _)| m == method)
            .count()
    }

    pub fn count_for(&self, method: &str, host: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(m, params)| m == method && params["ip"] == host)
            .count()
    }
}

#[async_trait]
impl RpcTransport for MockTransport {
    async fn call(&self, _route: Route, method: &str, params: Value) -> Result<String, RpcError> {
        self.calls
            .lock()
            .unwrap()
            .push((method.to_string(), params));

        let responses = self.responses.lock().unwrap();
        Ok(responses
            .get(method)
            .cloned()
            .unwrap_or_else(|| NO_DATA.to_string()))
    }
}
