//! Plist action: structural merge of values into a property list.
//!
//! The desired values are compared structurally against the current plist:
//! if every requested key is already present and equal (containment, not
//! whole-document equality) nothing is written. Otherwise the values are
//! deep-merged into the document, which is rewritten as XML.

use std::path::PathBuf;

use plist::Dictionary;
use serde_json::{Map, json};

use crate::action::Action;
use crate::args::{ActionInput, ArgumentSpec};
use crate::attrs::FileAttrs;
use crate::error::{ActionError, Result};
use crate::outcome::Outcome;
use crate::paths;

pub struct PlistAction;

const GLOBAL_DOMAINS: &[&str] = &["NSGlobalDomain", "Apple Global Domain"];

/// Validated request for one plist invocation.
struct PlistRequest {
    path: PathBuf,
    source: Option<PathBuf>,
    values: Dictionary,
    attrs: FileAttrs,
}

impl PlistRequest {
    fn from_input(input: &ActionInput) -> Result<Self> {
        let domain = input.opt_str("domain")?;
        let container = input.opt_str("container")?;
        let path = input.opt_str("path")?;

        if domain.is_none() && path.is_none() {
            return Err(ActionError::argument(
                "you must provide either the 'domain' or 'path' argument",
            ));
        }
        if domain.is_some() && path.is_some() {
            return Err(ActionError::argument(
                "you may only provide one of the 'domain' or 'path' arguments",
            ));
        }
        if container.is_some() && domain.is_some_and(|d| GLOBAL_DOMAINS.contains(&d)) {
            return Err(ActionError::argument(
                "the 'container' argument is not allowed when updating the global domain",
            ));
        }

        let resolved = match (domain, path) {
            (_, Some(path)) => path.to_string(),
            (Some(domain), _) if GLOBAL_DOMAINS.contains(&domain) => {
                "~/Library/Preferences/.GlobalPreferences.plist".to_string()
            }
            (Some(domain), _) => match container {
                Some(container) => format!(
                    "~/Library/Containers/{container}/Data/Library/Preferences/{domain}.plist"
                ),
                None => format!("~/Library/Preferences/{domain}.plist"),
            },
            (None, None) => unreachable!("validated above"),
        };

        Ok(Self {
            path: paths::expand(&resolved),
            source: input.opt_str("source")?.map(paths::expand),
            values: json_to_dictionary(input.dict("values")?)?,
            attrs: FileAttrs::from_input(input)?,
        })
    }
}

impl Action for PlistAction {
    fn name(&self) -> &'static str {
        "plist"
    }

    fn arg_specs(&self) -> Vec<ArgumentSpec> {
        vec![
            ArgumentSpec::required("values"),
            ArgumentSpec::optional("domain"),
            ArgumentSpec::optional("container"),
            ArgumentSpec::optional("path"),
            ArgumentSpec::optional("source"),
            ArgumentSpec::optional("mode"),
            ArgumentSpec::optional("owner"),
            ArgumentSpec::optional("group"),
        ]
    }

    fn process(&self, input: &ActionInput) -> Result<Outcome> {
        let request = PlistRequest::from_input(input)?;

        // A missing plist starts from an empty document; an unreadable one
        // is a hard failure rather than something to overwrite.
        let mut current = if request.path.exists() {
            match plist::Value::from_file(&request.path) {
                Ok(plist::Value::Dictionary(dict)) => dict,
                _ => return Err(ActionError::execution("an invalid plist already exists")),
            }
        } else {
            Dictionary::new()
        };

        // With a source plist, the desired document is the source overlaid
        // (top level) with the requested values.
        let desired = match &request.source {
            Some(source) => {
                if !source.is_file() {
                    return Err(ActionError::execution(
                        "the source file provided does not exist",
                    ));
                }
                let mut base = match plist::Value::from_file(source) {
                    Ok(plist::Value::Dictionary(dict)) => dict,
                    _ => {
                        return Err(ActionError::execution(
                            "the source file is an invalid plist",
                        ));
                    }
                };
                for (key, value) in request.values.iter() {
                    base.insert(key.clone(), value.clone());
                }
                base
            }
            None => request.values.clone(),
        };

        if dict_contained(&desired, &current) {
            return if request.attrs.reconcile(&request.path)? {
                Ok(Outcome::changed_with(
                    [("path".to_string(), json!(request.path))]
                        .into_iter()
                        .collect(),
                ))
            } else {
                Ok(Outcome::ok().with("path", json!(request.path)))
            };
        }

        deep_merge(&desired, &mut current);
        plist::Value::Dictionary(current)
            .to_file_xml(&request.path)
            .map_err(|_| ActionError::execution("unable to update the requested plist"))?;
        request.attrs.reconcile(&request.path)?;
        Ok(Outcome::changed_with(
            [("path".to_string(), json!(request.path))]
                .into_iter()
                .collect(),
        ))
    }
}

/// Whether every entry of `desired` is present and deeply equal in `current`.
fn dict_contained(desired: &Dictionary, current: &Dictionary) -> bool {
    desired
        .iter()
        .all(|(key, value)| value_contained(value, current.get(key)))
}

fn value_contained(desired: &plist::Value, current: Option<&plist::Value>) -> bool {
    match (desired, current) {
        (plist::Value::Dictionary(desired), Some(plist::Value::Dictionary(current))) => {
            dict_contained(desired, current)
        }
        (desired, Some(current)) => desired == current,
        (_, None) => false,
    }
}

/// Merge `desired` into `current`, recursing through nested dictionaries and
/// replacing everything else.
fn deep_merge(desired: &Dictionary, current: &mut Dictionary) {
    for (key, value) in desired.iter() {
        if let plist::Value::Dictionary(child) = value {
            if let Some(plist::Value::Dictionary(existing)) = current.get_mut(key) {
                deep_merge(child, existing);
                continue;
            }
        }
        current.insert(key.clone(), value.clone());
    }
}

/// Convert the JSON `values` argument into a plist dictionary.
fn json_to_dictionary(values: &Map<String, serde_json::Value>) -> Result<Dictionary> {
    let mut dict = Dictionary::new();
    for (key, value) in values {
        dict.insert(key.clone(), json_to_plist(value)?);
    }
    Ok(dict)
}

fn json_to_plist(value: &serde_json::Value) -> Result<plist::Value> {
    use serde_json::Value;

    Ok(match value {
        Value::Null => {
            return Err(ActionError::argument(
                "argument 'values' may not contain null values",
            ));
        }
        Value::Bool(b) => plist::Value::Boolean(*b),
        Value::Number(n) => {
            if let Some(int) = n.as_i64() {
                plist::Value::Integer(int.into())
            } else {
                plist::Value::Real(n.as_f64().unwrap_or_default())
            }
        }
        Value::String(s) => plist::Value::String(s.clone()),
        Value::Array(items) => plist::Value::Array(
            items.iter().map(json_to_plist).collect::<Result<Vec<_>>>()?,
        ),
        Value::Object(map) => plist::Value::Dictionary(json_to_dictionary(map)?),
    })
}
