//! Request construction from declared call shapes.

use crate::config::Endpoint;
use crate::error::ClientError;
use crate::spec::{BodySource, CallSpec, Method};
use serde::Serialize;
use serde_json::{Map, Value};

/// Ordered argument bindings for one invocation.
///
/// Arguments are bound by name to the spec's declared parameters. Values are
/// serialized eagerly; a value that fails to serialize poisons the whole
/// invocation with a configuration error when the request is built.
#[derive(Debug, Clone, Default)]
pub struct CallArgs {
    values: Vec<(String, Value)>,
    invalid: Option<String>,
}

impl CallArgs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind one named argument.
    pub fn arg(mut self, name: &str, value: impl Serialize) -> Self {
        match serde_json::to_value(value) {
            Ok(v) => self.values.push((name.to_string(), v)),
            Err(e) => self.invalid = Some(format!("argument {name:?}: {e}")),
        }
        self
    }

    fn get(&self, name: &str) -> Option<&Value> {
        self.values.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }
}

/// A fully resolved outgoing request: method, URL, and either a JSON body
/// or query pairs (never both).
#[derive(Debug)]
pub(crate) struct OutgoingRequest {
    pub method: Method,
    pub url: String,
    pub body: Option<Map<String, Value>>,
    pub query: Vec<(String, String)>,
}

/// Resolve a declared call plus bound arguments against a selected endpoint.
pub(crate) fn build_request(
    spec: &CallSpec,
    endpoint: &Endpoint,
    args: &CallArgs,
) -> Result<OutgoingRequest, ClientError> {
    if spec.response_shape().is_none() {
        return Err(ClientError::Configuration(format!(
            "call spec {:?} declares no response shape",
            spec.path()
        )));
    }
    if let Some(reason) = &args.invalid {
        return Err(ClientError::Configuration(format!(
            "unserializable argument for {:?}: {reason}",
            spec.path()
        )));
    }
    for (name, _) in &args.values {
        if !spec.param_names().contains(&name.as_str()) {
            return Err(ClientError::Configuration(format!(
                "unknown argument {name:?} for {:?} (declared: {:?})",
                spec.path(),
                spec.param_names()
            )));
        }
    }

    let placeholders = placeholder_names(spec.path());
    let path = resolve_path(spec, args, &placeholders)?;
    let payload = resolve_payload(spec, args, &placeholders)?;

    let (body, query) = if spec.method().carries_body() {
        (Some(payload), Vec::new())
    } else {
        let pairs = payload
            .into_iter()
            .map(|(name, value)| (name, plain_string(&value)))
            .collect();
        (None, pairs)
    };

    Ok(OutgoingRequest {
        method: spec.method(),
        url: endpoint.join(&path),
        body,
        query,
    })
}

/// Names appearing as `{name}` in the template, in template order.
fn placeholder_names(template: &str) -> Vec<&str> {
    let mut names = Vec::new();
    let mut rest = template;
    while let Some(open) = rest.find('{') {
        let Some(close) = rest[open..].find('}') else {
            break;
        };
        names.push(&rest[open + 1..open + close]);
        rest = &rest[open + close + 1..];
    }
    names
}

fn resolve_path(
    spec: &CallSpec,
    args: &CallArgs,
    placeholders: &[&str],
) -> Result<String, ClientError> {
    let mut path = spec.path().to_string();
    for name in placeholders {
        let Some(value) = args.get(name) else {
            return Err(ClientError::Configuration(format!(
                "missing argument {name:?} for path {:?}",
                spec.path()
            )));
        };
        if value.is_object() || value.is_array() {
            return Err(ClientError::Configuration(format!(
                "path argument {name:?} for {:?} must be a scalar",
                spec.path()
            )));
        }
        path = path.replace(&format!("{{{name}}}"), &plain_string(value));
    }
    Ok(path)
}

fn resolve_payload(
    spec: &CallSpec,
    args: &CallArgs,
    placeholders: &[&str],
) -> Result<Map<String, Value>, ClientError> {
    let payload_args: Vec<&(String, Value)> = args
        .values
        .iter()
        .filter(|(name, _)| !placeholders.contains(&name.as_str()))
        .collect();

    match spec.body_source() {
        BodySource::MergedArgs => Ok(payload_args
            .into_iter()
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect()),
        BodySource::SingleArg => match payload_args.as_slice() {
            [(_, Value::Object(fields))] => Ok(fields.clone()),
            [(name, _)] => Err(ClientError::Configuration(format!(
                "argument {name:?} for {:?} must serialize to a JSON object",
                spec.path()
            ))),
            other => Err(ClientError::Configuration(format!(
                "{:?} takes exactly one structured argument, got {}",
                spec.path(),
                other.len()
            ))),
        },
    }
}

/// Scalar rendering for paths and query strings: strings unquoted, everything
/// else via its JSON form.
fn plain_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
