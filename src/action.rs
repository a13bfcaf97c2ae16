//! The action contract and the invocation pipeline.
//!
//! Every invocation passes through the same sequence exactly once: raw input
//! is captured, validated against the declared argument specs, executed, and
//! terminated with a single outcome. Side effects are confined to the
//! execution step; validation never touches the system.

use serde_json::{Map, Value};

use crate::args::{ActionInput, ArgumentSpec};
use crate::error::{ActionError, Result};
use crate::outcome::Outcome;

/// One idempotent unit of desired-state application.
///
/// Implementations declare the arguments they accept and provide the
/// idempotency algorithm in [`process`](Action::process). The typed request
/// structs each action builds from the validated input are what keeps
/// cross-field invariants out of the generic pipeline.
pub trait Action {
    /// Protocol name the controller uses to select this action.
    fn name(&self) -> &'static str;

    /// The full set of arguments this action accepts.
    fn arg_specs(&self) -> Vec<ArgumentSpec>;

    /// Compute current state, compare to desired state and converge.
    fn process(&self, input: &ActionInput) -> Result<Outcome>;
}

/// Run the full pipeline for one raw input document.
///
/// Decode and validation failures terminate the pipeline before any
/// side-effecting logic runs; every [`ActionError`] surfaces uniformly as a
/// `Fail` outcome.
pub fn invoke(action: &dyn Action, raw: &str) -> Outcome {
    match decode(raw)
        .and_then(|document| ActionInput::validate(&action.arg_specs(), document))
        .and_then(|input| action.process(&input))
    {
        Ok(outcome) => outcome,
        Err(err) => err.into(),
    }
}

fn decode(raw: &str) -> Result<Map<String, Value>> {
    match serde_json::from_str::<Value>(raw) {
        Ok(Value::Object(document)) => Ok(document),
        _ => Err(ActionError::InputDecode),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    /// Minimal action standing in for a real one: Changed when told to,
    /// Ok otherwise.
    struct Probe;

    impl Action for Probe {
        fn name(&self) -> &'static str {
            "probe"
        }

        fn arg_specs(&self) -> Vec<ArgumentSpec> {
            vec![
                ArgumentSpec::required("target"),
                ArgumentSpec::with_default("mutate", json!(false)),
            ]
        }

        fn process(&self, input: &ActionInput) -> Result<Outcome> {
            let target = input.str("target")?;
            if input.opt_bool("mutate")?.unwrap_or(false) {
                Ok(Outcome::changed("mutated").with("target", json!(target)))
            } else {
                Ok(Outcome::ok().with("target", json!(target)))
            }
        }
    }

    #[test]
    fn malformed_input_fails_before_validation() {
        let outcome = invoke(&Probe, "not json {");
        assert_eq!(
            outcome,
            Outcome::fail("the input provided could not be parsed")
        );
    }

    #[test]
    fn non_object_input_fails_the_same_way() {
        let outcome = invoke(&Probe, "[1, 2, 3]");
        assert_eq!(
            outcome,
            Outcome::fail("the input provided could not be parsed")
        );
    }

    #[test]
    fn unsupported_argument_fails_regardless_of_other_validity() {
        let outcome = invoke(&Probe, r#"{"target": "/tmp/x", "bogus": true}"#);
        assert_eq!(
            outcome,
            Outcome::fail("argument 'bogus' is not supported by this action")
        );
    }

    #[test]
    fn valid_input_reaches_process() {
        let outcome = invoke(&Probe, r#"{"target": "/tmp/x"}"#);
        assert!(outcome.is_ok());
        assert!(!outcome.is_changed());
    }

    #[test]
    fn process_outcome_propagates() {
        let outcome = invoke(&Probe, r#"{"target": "/tmp/x", "mutate": true}"#);
        assert!(outcome.is_changed());
        assert_eq!(outcome.report()["message"], json!("mutated"));
    }
}
