//! Scripted service gateway for tests and demo mode
//!
//! Records every invocation so tests can assert exactly which procedures
//! ran (or that none did), and supports scripted per-procedure responses,
//! failures, and gates that hold a call open until released.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::Value as JsonValue;
use tokio::sync::Notify;

use crate::domain::result::{Error, Result};
use crate::ports::ServiceGateway;

/// One recorded gateway invocation
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub name: String,
    pub payload: JsonValue,
}

/// Scripted gateway implementation
///
/// By default every call succeeds with `null`. Responses, failures, and
/// gates are keyed by procedure name.
#[derive(Default)]
pub struct ScriptedGateway {
    calls: Mutex<Vec<RecordedCall>>,
    responses: Mutex<HashMap<String, JsonValue>>,
    failures: Mutex<HashMap<String, String>>,
    gates: Mutex<HashMap<String, Arc<Notify>>>,
}

impl ScriptedGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Script the JSON result of a named procedure
    pub fn respond_with(&self, name: &str, result: JsonValue) {
        self.responses
            .lock()
            .expect("gateway mutex poisoned")
            .insert(name.to_string(), result);
    }

    /// Script a named procedure to fail with a service-call error
    pub fn fail_with(&self, name: &str, message: &str) {
        self.failures
            .lock()
            .expect("gateway mutex poisoned")
            .insert(name.to_string(), message.to_string());
    }

    /// Hold calls to a named procedure open until the returned gate is
    /// notified
    pub fn gate(&self, name: &str) -> Arc<Notify> {
        let notify = Arc::new(Notify::new());
        self.gates
            .lock()
            .expect("gateway mutex poisoned")
            .insert(name.to_string(), notify.clone());
        notify
    }

    /// Every call recorded so far, in order
    pub fn recorded_calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().expect("gateway mutex poisoned").clone()
    }

    /// How many times a named procedure was invoked
    pub fn call_count(&self, name: &str) -> usize {
        self.calls
            .lock()
            .expect("gateway mutex poisoned")
            .iter()
            .filter(|c| c.name == name)
            .count()
    }

    /// Total number of invocations across all procedures
    pub fn total_calls(&self) -> usize {
        self.calls.lock().expect("gateway mutex poisoned").len()
    }
}

#[async_trait]
impl ServiceGateway for ScriptedGateway {
    async fn call(&self, name: &str, payload: JsonValue) -> Result<JsonValue> {
        self.calls
            .lock()
            .expect("gateway mutex poisoned")
            .push(RecordedCall {
                name: name.to_string(),
                payload,
            });

        let gate = self
            .gates
            .lock()
            .expect("gateway mutex poisoned")
            .get(name)
            .cloned();
        if let Some(gate) = gate {
            gate.notified().await;
        }

        if let Some(message) = self
            .failures
            .lock()
            .expect("gateway mutex poisoned")
            .get(name)
        {
            return Err(Error::ServiceCall {
                name: name.to_string(),
                message: message.clone(),
            });
        }

        Ok(self
            .responses
            .lock()
            .expect("gateway mutex poisoned")
            .get(name)
            .cloned()
            .unwrap_or(JsonValue::Null))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_records_calls_in_order() {
        let gateway = ScriptedGateway::new();
        gateway.call("a", json!(1)).await.unwrap();
        gateway.call("b", json!(2)).await.unwrap();

        let calls = gateway.recorded_calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].name, "a");
        assert_eq!(calls[1].payload, json!(2));
    }

    #[tokio::test]
    async fn test_scripted_failure() {
        let gateway = ScriptedGateway::new();
        gateway.fail_with("chargeCustomer", "card declined");

        let err = gateway.call("chargeCustomer", json!({})).await.unwrap_err();
        assert_eq!(err.code(), "service_call");
        // The failed call is still recorded
        assert_eq!(gateway.call_count("chargeCustomer"), 1);
    }
}
