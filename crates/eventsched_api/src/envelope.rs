//! Transport-neutral request and response envelopes.
//!
//! # Invariants
//! - Success bodies carry `"success": true` plus one of `event`, `events`
//!   or `message`.
//! - Failure bodies carry `"success": false` and a human-readable `error`.

use eventsched_core::Event;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// One inbound call: method, path (optionally with `?query`), extra query
/// pairs and an optional JSON body.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ApiRequest {
    pub method: String,
    pub path: String,
    #[serde(default)]
    pub query: Vec<(String, String)>,
    #[serde(default)]
    pub body: Option<Value>,
}

impl ApiRequest {
    pub fn new(method: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            path: path.into(),
            query: Vec::new(),
            body: None,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new("GET", path)
    }

    pub fn post(path: impl Into<String>, body: Value) -> Self {
        Self::new("POST", path).with_body(body)
    }

    pub fn put(path: impl Into<String>, body: Value) -> Self {
        Self::new("PUT", path).with_body(body)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new("DELETE", path)
    }

    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }
}

/// Status code plus JSON body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiResponse {
    pub status: u16,
    pub body: Value,
}

impl ApiResponse {
    pub fn event(status: u16, event: &Event) -> Self {
        Self {
            status,
            body: json!({ "success": true, "event": event }),
        }
    }

    pub fn events(events: &[Event]) -> Self {
        Self {
            status: 200,
            body: json!({ "success": true, "events": events }),
        }
    }

    pub fn message(message: &str) -> Self {
        Self {
            status: 200,
            body: json!({ "success": true, "message": message }),
        }
    }

    pub fn error(status: u16, error: impl Into<String>) -> Self {
        Self {
            status,
            body: json!({ "success": false, "error": error.into() }),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// `error` text of a failure body.
    pub fn error_message(&self) -> Option<&str> {
        self.body.get("error").and_then(Value::as_str)
    }
}
