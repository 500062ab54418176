// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
//! Shorthand for tool parameter schemas.
//!
//! ```
//! use taskrun_tools::schema::{object, Param};
//! let s = object([("path", Param::Type("string")), ("limit", Param::Type("number?"))]);
//! assert_eq!(s["required"], serde_json::json!(["path"]));
//! ```

use serde_json::{json, Map, Value};

pub enum Param {
    /// `string`, `number` or `boolean`; a trailing `?` marks it optional.
    Type(&'static str),
    /// Literal JSON-Schema for structured parameters.  Always required.
    Schema(Value),
}

/// `{type: "object", properties, required}`.
pub fn object(params: impl IntoIterator<Item = (&'static str, Param)>) -> Value {
    let mut properties = Map::new();
    let mut required = Vec::new();
    for (name, param) in params {
        match param {
            Param::Type(ty) => {
                let (ty, optional) = match ty.strip_suffix('?') {
                    Some(base) => (base, true),
                    None => (ty, false),
                };
                properties.insert(name.to_string(), json!({ "type": ty }));
                if !optional {
                    required.push(Value::String(name.to_string()));
                }
            }
            Param::Schema(schema) => {
                properties.insert(name.to_string(), schema);
                required.push(Value::String(name.to_string()));
            }
        }
    }
    json!({
        "type": "object",
        "properties": properties,
        "required": required,
    })
}
