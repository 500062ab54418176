// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::{ToolCall, ToolOutput};

/// Decode a call's arguments into the tool's parameter struct.
///
/// The error branch is a ready-to-return [`ToolOutput`], so tool bodies
/// only ever see well-typed input.  Missing arguments (`null`) decode as
/// an empty object.
pub fn parse_args<T: DeserializeOwned>(call: &ToolCall) -> Result<T, ToolOutput> {
    let args = match &call.args {
        Value::Null => Value::Object(Default::default()),
        v => v.clone(),
    };
    serde_json::from_value(args)
        .map_err(|e| ToolOutput::err(&call.id, format!("invalid arguments for {}: {e}", call.name)))
}

#[cfg(test)]
mod tests {
    use serde::Deserialize;
    use serde_json::json;

    use super::*;

    #[derive(Deserialize, Debug)]
    struct Params {
        path: String,
        #[serde(default)]
        limit: Option<usize>,
    }

    fn call(args: Value) -> ToolCall {
        ToolCall { id: "c1".into(), name: "read".into(), args }
    }

    #[test]
    fn decodes_valid_args() {
        let p: Params = parse_args(&call(json!({"path": "a.txt", "limit": 3}))).unwrap();
        assert_eq!(p.path, "a.txt");
        assert_eq!(p.limit, Some(3));
    }

    #[test]
    fn missing_required_field_is_argument_error() {
        let err = parse_args::<Params>(&call(json!({}))).unwrap_err();
        assert!(err.is_error);
        assert!(err.content.starts_with("error: invalid arguments for read:"), "{}", err.content);
        assert!(err.content.contains("path"));
        assert_eq!(err.call_id, "c1");
    }

    #[test]
    fn wrong_type_is_argument_error() {
        let err = parse_args::<Params>(&call(json!({"path": 7}))).unwrap_err();
        assert!(err.content.starts_with("error: invalid arguments"));
    }

    #[test]
    fn null_args_decode_as_empty_object() {
        #[derive(Deserialize)]
        struct NoArgs {
            #[serde(default)]
            path: Option<String>,
        }
        let p: NoArgs = parse_args(&call(Value::Null)).unwrap();
        assert!(p.path.is_none());
    }
}
