//! Purpose: Implement the parameter-echo transform shared by the CLI and tests.
//! Exports: `RuntimeStamp`, `parse_params`, `parse_value`, `stringify`,
//! `apply_param_default`, `annotate`, `echo`, and the `myparam` constants.
//! Role: Pure core of the action; all I/O and environment reads stay in callers.
//! Invariants: After `apply_param_default`, the `myparam` key is always present
//! and always holds a string.
//! Invariants: Keys other than `myparam` and the stamp fields pass through
//! unchanged.
use serde_json::{Map, Value, json};

use crate::core::error::{Error, ErrorKind};

/// Key the action guarantees is present in its output.
pub const PARAM_KEY: &str = "myparam";

/// Value filled in when the caller did not supply `myparam`.
pub const PARAM_DEFAULT: &str = "myparam default";

/// Stamp text used when no build stamp was provided.
pub const BUILD_STAMP_FALLBACK: &str = "no Dockerfile ENV";

/// Runtime identity and optional build stamp for the stamped echo variant.
///
/// Constructed once at the process boundary and passed in explicitly, so the
/// transform itself never reads the environment.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RuntimeStamp {
    pub runtime: String,
    pub build_stamp: Option<String>,
}

impl RuntimeStamp {
    pub fn current(build_stamp: Option<String>) -> Self {
        Self {
            runtime: concat!("echoact/", env!("CARGO_PKG_VERSION")).to_string(),
            build_stamp,
        }
    }

    pub fn action_version(&self) -> &str {
        self.build_stamp.as_deref().unwrap_or(BUILD_STAMP_FALLBACK)
    }
}

/// Parse raw input as a JSON object.
pub fn parse_params(raw: &str) -> Result<Map<String, Value>, Error> {
    match parse_value(raw)? {
        Value::Object(map) => Ok(map),
        other => Err(Error::new(ErrorKind::Parse)
            .with_message(format!(
                "params must be a JSON object, got {}",
                json_type_name(&other)
            ))
            .with_hint("Pass an object like '{\"myparam\": \"value\"}'.")),
    }
}

/// Parse raw input as any JSON value.
pub fn parse_value(raw: &str) -> Result<Value, Error> {
    serde_json::from_str(raw).map_err(|err| {
        let (line, column) = (err.line() as u64, err.column() as u64);
        Error::new(ErrorKind::Parse)
            .with_message("invalid JSON input")
            .with_line_column(line, column)
            .with_source(err)
    })
}

/// Stringify a JSON value: strings become their contents, everything else its
/// compact JSON serialization.
pub fn stringify(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

/// Insert or overwrite `myparam` with the stringified supplied value, or the
/// default string when absent.
pub fn apply_param_default(params: &mut Map<String, Value>) {
    let text = params
        .get(PARAM_KEY)
        .map(stringify)
        .unwrap_or_else(|| PARAM_DEFAULT.to_string());
    params.insert(PARAM_KEY.to_string(), Value::String(text));
}

/// Insert the runtime and build-stamp metadata fields of the stamped variant.
pub fn annotate(params: &mut Map<String, Value>, stamp: &RuntimeStamp) {
    params.insert("runtime".to_string(), Value::String(stamp.runtime.clone()));
    params.insert(
        "actionVersion".to_string(),
        Value::String(stamp.action_version().to_string()),
    );
}

/// Wrap the processed map in the output envelope.
pub fn echo(params: Map<String, Value>) -> Value {
    json!({ "allparams": params })
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::{
        BUILD_STAMP_FALLBACK, PARAM_DEFAULT, PARAM_KEY, RuntimeStamp, annotate,
        apply_param_default, echo, parse_params, parse_value, stringify,
    };
    use serde_json::{Value, json};

    fn params(raw: &str) -> serde_json::Map<String, Value> {
        parse_params(raw).expect("valid params")
    }

    #[test]
    fn default_fills_missing_myparam() {
        let mut map = params(r#"{"a": 1}"#);
        apply_param_default(&mut map);
        assert_eq!(map.get(PARAM_KEY), Some(&Value::String(PARAM_DEFAULT.into())));
    }

    #[test]
    fn supplied_myparam_is_stringified() {
        let cases = [
            (r#"{"myparam": "hello"}"#, "hello"),
            (r#"{"myparam": 7}"#, "7"),
            (r#"{"myparam": true}"#, "true"),
            (r#"{"myparam": null}"#, "null"),
            (r#"{"myparam": {"a": 1}}"#, r#"{"a":1}"#),
        ];
        for (raw, expected) in cases {
            let mut map = params(raw);
            apply_param_default(&mut map);
            assert_eq!(map.get(PARAM_KEY), Some(&Value::String(expected.into())));
        }
    }

    #[test]
    fn other_keys_pass_through_unchanged() {
        let mut map = params(r#"{"a": [1, 2], "b": {"nested": true}}"#);
        apply_param_default(&mut map);
        let envelope = echo(map);
        let all = envelope.get("allparams").expect("allparams");
        assert_eq!(all.get("a"), Some(&json!([1, 2])));
        assert_eq!(all.get("b"), Some(&json!({"nested": true})));
    }

    #[test]
    fn parse_rejects_malformed_json() {
        let err = parse_params("not-json").expect_err("parse error");
        assert_eq!(err.kind(), crate::core::error::ErrorKind::Parse);
        assert!(err.line().is_some());
    }

    #[test]
    fn parse_rejects_non_object_values() {
        for raw in ["[1, 2]", "\"text\"", "42", "true", "null"] {
            let err = parse_params(raw).expect_err("parse error");
            assert_eq!(err.kind(), crate::core::error::ErrorKind::Parse);
        }
        parse_value("[1, 2]").expect("arrays are valid values");
    }

    #[test]
    fn stringify_unwraps_strings_only() {
        assert_eq!(stringify(&json!("plain")), "plain");
        assert_eq!(stringify(&json!([1, "x"])), r#"[1,"x"]"#);
    }

    #[test]
    fn annotate_uses_build_stamp_or_fallback() {
        let mut map = params("{}");
        let stamped = RuntimeStamp::current(Some("2023-01-01".to_string()));
        annotate(&mut map, &stamped);
        assert_eq!(map.get("actionVersion"), Some(&json!("2023-01-01")));
        let runtime = map.get("runtime").and_then(Value::as_str).expect("runtime");
        assert!(runtime.starts_with("echoact/"));

        let mut bare = params("{}");
        annotate(&mut bare, &RuntimeStamp::current(None));
        assert_eq!(bare.get("actionVersion"), Some(&json!(BUILD_STAMP_FALLBACK)));
    }
}
