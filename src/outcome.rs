//! Terminal outcome of an action invocation.
//!
//! Exactly one outcome is produced per invocation. Action logic returns the
//! outcome as a value; only the process entry point renders it to stdout and
//! maps it onto an exit code, which keeps every action unit-testable without
//! process termination side effects.

use serde_json::{Map, Value, json};

use crate::error::ActionError;

/// Exit code for an interrupt received while reading the input document.
pub const EXIT_INTERRUPTED: u8 = 2;

/// The three mutually exclusive terminal states of an action.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// Desired state already held; nothing was mutated.
    Ok { data: Map<String, Value> },
    /// Desired state did not hold; the system was mutated and now converges.
    Changed {
        message: Option<String>,
        data: Map<String, Value>,
    },
    /// Desired state could not be determined or achieved.
    Fail {
        message: String,
        data: Map<String, Value>,
    },
}

impl Outcome {
    /// Desired state already satisfied, no extra payload.
    pub fn ok() -> Self {
        Self::Ok { data: Map::new() }
    }

    /// Desired state already satisfied, with action-specific payload.
    pub fn ok_with(data: Map<String, Value>) -> Self {
        Self::Ok { data }
    }

    /// A mutation was performed, described by `message`.
    pub fn changed(message: impl Into<String>) -> Self {
        Self::Changed {
            message: Some(message.into()),
            data: Map::new(),
        }
    }

    /// A mutation was performed, with payload and no message.
    pub fn changed_with(data: Map<String, Value>) -> Self {
        Self::Changed {
            message: None,
            data,
        }
    }

    /// The invocation failed with `message`.
    pub fn fail(message: impl Into<String>) -> Self {
        Self::Fail {
            message: message.into(),
            data: Map::new(),
        }
    }

    /// Attach an extra payload field, returning the outcome.
    pub fn with(mut self, key: &str, value: Value) -> Self {
        match &mut self {
            Self::Ok { data } | Self::Changed { data, .. } | Self::Fail { data, .. } => {
                data.insert(key.to_string(), value);
            }
        }
        self
    }

    /// Whether this outcome represents a successful invocation (Ok or Changed).
    pub fn is_ok(&self) -> bool {
        !matches!(self, Self::Fail { .. })
    }

    /// Whether this outcome reports a mutation.
    pub fn is_changed(&self) -> bool {
        matches!(self, Self::Changed { .. })
    }

    /// Exit code the process should terminate with for this outcome.
    pub fn exit_code(&self) -> u8 {
        u8::from(!self.is_ok())
    }

    /// Build the structured report document.
    ///
    /// `serde_json::Map` keeps keys sorted, so the rendered document has a
    /// stable key order for reproducible captures.
    pub fn report(&self) -> Value {
        match self {
            Self::Ok { data } => {
                let mut doc = data.clone();
                doc.insert("changed".to_string(), json!(false));
                doc.insert("ok".to_string(), json!(true));
                Value::Object(doc)
            }
            Self::Changed { message, data } => {
                let mut doc = data.clone();
                doc.insert("changed".to_string(), json!(true));
                doc.insert("ok".to_string(), json!(true));
                if let Some(message) = message {
                    doc.insert("message".to_string(), json!(message));
                }
                Value::Object(doc)
            }
            Self::Fail { message, data } => {
                let mut doc = data.clone();
                doc.insert("message".to_string(), json!(message));
                doc.insert("ok".to_string(), json!(false));
                Value::Object(doc)
            }
        }
    }

    /// Render the report as pretty-printed JSON.
    pub fn render(&self) -> String {
        serde_json::to_string_pretty(&self.report()).unwrap_or_else(|_| String::from("{}"))
    }
}

impl From<ActionError> for Outcome {
    fn from(err: ActionError) -> Self {
        Self::fail(err.to_string())
    }
}
