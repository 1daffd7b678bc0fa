//! Write-body processors: the business-logic services modules wire up by `kind`.

use crate::config::{Operation, ServiceDefinition};
use crate::error::{AppError, ConfigError};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::collections::HashMap;

/// Where a processor is being run.
#[derive(Clone, Copy, Debug)]
pub struct ProcessContext<'a> {
    pub resource: &'a str,
    pub operation: Operation,
}

impl ProcessContext<'_> {
    pub fn is_create(&self) -> bool {
        matches!(self.operation, Operation::Create | Operation::BulkCreate)
    }
}

/// Runs on a write body (snake_case keys) before validation. May rewrite it or reject it.
#[async_trait]
pub trait ResourceProcessor: Send + Sync {
    async fn process(&self, ctx: &ProcessContext<'_>, body: &mut HashMap<String, Value>) -> Result<(), AppError>;
}

/// Deserialize a service's `arguments` into the processor's typed options.
pub fn arguments<T: DeserializeOwned>(name: &str, def: &ServiceDefinition) -> Result<T, ConfigError> {
    serde_json::from_value(Value::Object(def.arguments.clone())).map_err(|e| ConfigError::InvalidServiceArguments {
        service: name.to_string(),
        message: e.to_string(),
    })
}

/// `field_defaults`: fills missing fields on create.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FieldDefaults {
    pub values: Map<String, Value>,
}

#[async_trait]
impl ResourceProcessor for FieldDefaults {
    async fn process(&self, ctx: &ProcessContext<'_>, body: &mut HashMap<String, Value>) -> Result<(), AppError> {
        if !ctx.is_create() {
            return Ok(());
        }
        for (k, v) in &self.values {
            body.entry(k.clone()).or_insert_with(|| v.clone());
        }
        Ok(())
    }
}

/// `trim_strings`: trims whitespace from string fields (all of them when `fields` is empty).
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TrimStrings {
    #[serde(default)]
    pub fields: Vec<String>,
    /// Turn strings that trim to nothing into null.
    #[serde(default)]
    pub empty_as_null: bool,
}

#[async_trait]
impl ResourceProcessor for TrimStrings {
    async fn process(&self, _ctx: &ProcessContext<'_>, body: &mut HashMap<String, Value>) -> Result<(), AppError> {
        for (k, v) in body.iter_mut() {
            if !self.fields.is_empty() && !self.fields.contains(k) {
                continue;
            }
            if let Value::String(s) = v {
                let trimmed = s.trim();
                if trimmed.is_empty() && self.empty_as_null {
                    *v = Value::Null;
                } else if trimmed.len() != s.len() {
                    *v = Value::String(trimmed.to_string());
                }
            }
        }
        Ok(())
    }
}

/// `slugify`: derives `target` from `source` when the body does not set it.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Slugify {
    pub source: String,
    pub target: String,
}

#[async_trait]
impl ResourceProcessor for Slugify {
    async fn process(&self, _ctx: &ProcessContext<'_>, body: &mut HashMap<String, Value>) -> Result<(), AppError> {
        if body.get(&self.target).is_some_and(|v| !v.is_null()) {
            return Ok(());
        }
        if let Some(Value::String(src)) = body.get(&self.source) {
            let slug = slug(src);
            body.insert(self.target.clone(), Value::String(slug));
        }
        Ok(())
    }
}

pub fn slug(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars().flat_map(char::to_lowercase) {
        if c.is_alphanumeric() {
            out.push(c);
        } else if !out.is_empty() && !out.ends_with('-') {
            out.push('-');
        }
    }
    while out.ends_with('-') {
        out.pop();
    }
    out
}

/// `reject_fields`: refuses writes that try to set any of `fields`.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RejectFields {
    pub fields: Vec<String>,
    /// Restrict the check to these operations; all writes when empty.
    #[serde(default)]
    pub operations: Vec<Operation>,
}

#[async_trait]
impl ResourceProcessor for RejectFields {
    async fn process(&self, ctx: &ProcessContext<'_>, body: &mut HashMap<String, Value>) -> Result<(), AppError> {
        if !self.operations.is_empty() && !self.operations.contains(&ctx.operation) {
            return Ok(());
        }
        match self.fields.iter().find(|f| body.contains_key(*f)) {
            Some(f) => Err(AppError::Validation(format!("{} cannot be set on {}", f, ctx.resource))),
            None => Ok(()),
        }
    }
}
