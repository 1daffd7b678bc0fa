//! Key case conversion for resources with `key_case: camel`: request keys camelCase -> snake_case
//! (column names), response keys snake_case -> camelCase.

use crate::config::KeyCase;
use serde_json::{Map, Value};
use std::collections::HashMap;

/// e.g. "user_id" -> "userId", "created_at" -> "createdAt"
pub fn to_camel_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut capitalize_next = false;
    for c in s.chars() {
        if c == '_' {
            capitalize_next = !out.is_empty();
        } else if capitalize_next {
            out.extend(c.to_uppercase());
            capitalize_next = false;
        } else {
            out.push(c);
        }
    }
    out
}

/// e.g. "userId" -> "user_id", "createdAt" -> "created_at"
pub fn to_snake_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 4);
    for (i, c) in s.chars().enumerate() {
        if c.is_uppercase() {
            if i > 0 {
                out.push('_');
            }
            out.extend(c.to_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}

/// Top-level keys of a request body to column names.
pub fn body_keys_in(case: KeyCase, body: HashMap<String, Value>) -> HashMap<String, Value> {
    match case {
        KeyCase::Snake => body,
        KeyCase::Camel => body.into_iter().map(|(k, v)| (to_snake_case(&k), v)).collect(),
    }
}

/// A single key (query parameter or field name) to its column name.
pub fn key_in(case: KeyCase, key: &str) -> String {
    match case {
        KeyCase::Snake => key.to_string(),
        KeyCase::Camel => to_snake_case(key),
    }
}

/// Top-level keys of a response row from column names. Nested JSON values are left as stored.
pub fn row_keys_out(case: KeyCase, row: Map<String, Value>) -> Map<String, Value> {
    match case {
        KeyCase::Snake => row,
        KeyCase::Camel => row.into_iter().map(|(k, v)| (to_camel_case(&k), v)).collect(),
    }
}
