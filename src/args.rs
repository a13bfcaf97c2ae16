//! Argument specifications and input validation.
//!
//! Each action declares the parameters it accepts as a set of
//! [`ArgumentSpec`]s. Validation is total and runs before any side-effecting
//! logic: either the whole input document is accepted (with defaults
//! substituted) or the invocation fails without touching the system.

use serde_json::{Map, Value};

use crate::error::{ActionError, Result};

/// Argument names reserved by the protocol itself.
///
/// `ok` and `changed` are result keys; `sudo` is claimed by the controller
/// for privilege escalation. Declaring any of these is a defect in the action
/// definition, not in its input, so the collision aborts construction.
const RESERVED_NAMES: &[&str] = &["ok", "changed", "sudo"];

/// Declaration of one named parameter an action accepts.
#[derive(Debug, Clone)]
pub struct ArgumentSpec {
    name: &'static str,
    optional: bool,
    default: Value,
    choices: Option<Vec<Value>>,
}

impl ArgumentSpec {
    /// Declare a mandatory argument.
    ///
    /// # Panics
    ///
    /// Panics if `name` collides with a protocol-reserved result key.
    pub fn required(name: &'static str) -> Self {
        assert!(
            !RESERVED_NAMES.contains(&name),
            "action declares argument '{name}' which is reserved by the protocol"
        );
        Self {
            name,
            optional: false,
            default: Value::Null,
            choices: None,
        }
    }

    /// Declare an optional argument defaulting to null.
    pub fn optional(name: &'static str) -> Self {
        Self {
            optional: true,
            ..Self::required(name)
        }
    }

    /// Declare an optional argument with an explicit default.
    pub fn with_default(name: &'static str, default: Value) -> Self {
        Self {
            optional: true,
            default,
            ..Self::required(name)
        }
    }

    /// Restrict the argument to a fixed set of allowed values.
    pub fn choices(mut self, choices: &[&str]) -> Self {
        self.choices = Some(choices.iter().map(|c| Value::String((*c).to_string())).collect());
        self
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

/// The validated, fully-resolved argument mapping for one invocation.
///
/// Built once per process from the raw input document; immutable thereafter.
#[derive(Debug, Clone)]
pub struct ActionInput {
    values: Map<String, Value>,
}

impl ActionInput {
    /// Validate a raw input mapping against the declared specs.
    ///
    /// Checks run in a fixed order so error messages are deterministic:
    /// unsupported keys first, then per-spec completeness (substituting
    /// defaults for absent optionals), then choice membership.
    pub fn validate(specs: &[ArgumentSpec], mut raw: Map<String, Value>) -> Result<Self> {
        for key in raw.keys() {
            if !specs.iter().any(|spec| spec.name == key) {
                return Err(ActionError::argument(format!(
                    "argument '{key}' is not supported by this action"
                )));
            }
        }

        for spec in specs {
            if !raw.contains_key(spec.name) {
                if spec.optional {
                    raw.insert(spec.name.to_string(), spec.default.clone());
                    continue;
                }
                return Err(ActionError::argument(format!(
                    "mandatory argument '{}' was not provided",
                    spec.name
                )));
            }

            if let Some(choices) = &spec.choices {
                let value = &raw[spec.name];
                if !value.is_null() && !choices.contains(value) {
                    let rendered: Vec<String> = choices
                        .iter()
                        .map(|c| c.as_str().map_or_else(|| c.to_string(), str::to_string))
                        .collect();
                    return Err(ActionError::argument(format!(
                        "argument '{}' must be one of [{}]",
                        spec.name,
                        rendered.join(", ")
                    )));
                }
            }
        }

        Ok(Self { values: raw })
    }

    fn value(&self, name: &str) -> &Value {
        self.values.get(name).unwrap_or(&Value::Null)
    }

    /// A mandatory string argument.
    pub fn str(&self, name: &str) -> Result<&str> {
        self.value(name)
            .as_str()
            .ok_or_else(|| ActionError::argument(format!("argument '{name}' must be a string")))
    }

    /// An optional string argument; null and absent read as `None`.
    pub fn opt_str(&self, name: &str) -> Result<Option<&str>> {
        match self.value(name) {
            Value::Null => Ok(None),
            Value::String(s) => Ok(Some(s)),
            _ => Err(ActionError::argument(format!(
                "argument '{name}' must be a string"
            ))),
        }
    }

    /// An optional boolean argument.
    pub fn opt_bool(&self, name: &str) -> Result<Option<bool>> {
        match self.value(name) {
            Value::Null => Ok(None),
            Value::Bool(b) => Ok(Some(*b)),
            _ => Err(ActionError::argument(format!(
                "argument '{name}' must be a boolean"
            ))),
        }
    }

    /// An optional non-negative integer argument.
    pub fn opt_u64(&self, name: &str) -> Result<Option<u64>> {
        match self.value(name) {
            Value::Null => Ok(None),
            Value::Number(n) if n.as_u64().is_some() => Ok(n.as_u64()),
            _ => Err(ActionError::argument(format!(
                "argument '{name}' must be a non-negative integer"
            ))),
        }
    }

    /// An optional list-of-strings argument.
    pub fn opt_str_list(&self, name: &str) -> Result<Option<Vec<String>>> {
        match self.value(name) {
            Value::Null => Ok(None),
            Value::Array(items) => items
                .iter()
                .map(|item| {
                    item.as_str().map(str::to_string).ok_or_else(|| {
                        ActionError::argument(format!(
                            "argument '{name}' must be a list of strings"
                        ))
                    })
                })
                .collect::<Result<Vec<_>>>()
                .map(Some),
            _ => Err(ActionError::argument(format!(
                "argument '{name}' must be a list of strings"
            ))),
        }
    }

    /// A mandatory object argument.
    pub fn dict(&self, name: &str) -> Result<&Map<String, Value>> {
        self.value(name)
            .as_object()
            .ok_or_else(|| ActionError::argument(format!("argument '{name}' must be an object")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn specs() -> Vec<ArgumentSpec> {
        vec![
            ArgumentSpec::required("path"),
            ArgumentSpec::optional("source"),
            ArgumentSpec::with_default("state", json!("file"))
                .choices(&["file", "directory", "symlink", "absent"]),
        ]
    }

    fn raw(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn unsupported_key_rejected_first() {
        // Even with a mandatory argument also missing, the unsupported key
        // wins because it is checked first.
        let err = ActionInput::validate(&specs(), raw(json!({"bogus": 1}))).unwrap_err();
        assert_eq!(
            err.to_string(),
            "argument 'bogus' is not supported by this action"
        );
    }

    #[test]
    fn missing_mandatory_rejected() {
        let err = ActionInput::validate(&specs(), raw(json!({"source": "/etc/hosts"})))
            .unwrap_err();
        assert_eq!(err.to_string(), "mandatory argument 'path' was not provided");
    }

    #[test]
    fn choice_membership_enforced() {
        let err = ActionInput::validate(&specs(), raw(json!({"path": "/tmp/x", "state": "hmmm"})))
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "argument 'state' must be one of [file, directory, symlink, absent]"
        );
    }

    #[test]
    fn defaults_substituted_for_absent_optionals() {
        let input = ActionInput::validate(&specs(), raw(json!({"path": "/tmp/x"}))).unwrap();
        assert_eq!(input.str("state").unwrap(), "file");
        assert_eq!(input.opt_str("source").unwrap(), None);
    }

    #[test]
    fn explicit_default_equals_omitted_default() {
        let omitted = ActionInput::validate(&specs(), raw(json!({"path": "/tmp/x"}))).unwrap();
        let explicit =
            ActionInput::validate(&specs(), raw(json!({"path": "/tmp/x", "state": "file"})))
                .unwrap();
        assert_eq!(omitted.str("state").unwrap(), explicit.str("state").unwrap());
    }

    #[test]
    fn explicit_null_for_optional_reads_as_none() {
        let input =
            ActionInput::validate(&specs(), raw(json!({"path": "/tmp/x", "source": null})))
                .unwrap();
        assert_eq!(input.opt_str("source").unwrap(), None);
    }

    #[test]
    fn typed_getters_reject_wrong_types() {
        let input = ActionInput::validate(&specs(), raw(json!({"path": "/tmp/x"}))).unwrap();
        assert!(input.dict("path").is_err());
        assert_eq!(
            input.str("missing").unwrap_err().to_string(),
            "argument 'missing' must be a string"
        );
    }

    #[test]
    fn list_getter_accepts_strings_only() {
        let specs = vec![ArgumentSpec::optional("patterns")];
        let input =
            ActionInput::validate(&specs, raw(json!({"patterns": ["*.plist", 3]}))).unwrap();
        assert!(input.opt_str_list("patterns").is_err());
    }

    #[test]
    #[should_panic(expected = "reserved by the protocol")]
    fn reserved_name_aborts_construction() {
        let _ = ArgumentSpec::required("changed");
    }
}
