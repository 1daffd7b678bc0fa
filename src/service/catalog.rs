//! Explicit kind → factory table for service definitions.

use crate::config::ServiceDefinition;
use crate::error::ConfigError;
use crate::service::processors::{arguments, FieldDefaults, RejectFields, ResourceProcessor, Slugify, TrimStrings};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Builds one service from its logical name and definition.
pub type ServiceFactory =
    Box<dyn Fn(&str, &ServiceDefinition) -> Result<Arc<dyn ResourceProcessor>, ConfigError> + Send + Sync>;

pub struct ServiceCatalog {
    factories: BTreeMap<String, ServiceFactory>,
}

impl Default for ServiceCatalog {
    fn default() -> Self {
        Self::with_builtins()
    }
}

impl ServiceCatalog {
    pub fn empty() -> Self {
        ServiceCatalog {
            factories: BTreeMap::new(),
        }
    }

    /// Catalog preloaded with `field_defaults`, `trim_strings`, `slugify` and `reject_fields`.
    pub fn with_builtins() -> Self {
        let mut c = Self::empty();
        c.register("field_defaults", |name, def| {
            Ok(Arc::new(arguments::<FieldDefaults>(name, def)?) as Arc<dyn ResourceProcessor>)
        });
        c.register("trim_strings", |name, def| {
            Ok(Arc::new(arguments::<TrimStrings>(name, def)?) as Arc<dyn ResourceProcessor>)
        });
        c.register("slugify", |name, def| {
            Ok(Arc::new(arguments::<Slugify>(name, def)?) as Arc<dyn ResourceProcessor>)
        });
        c.register("reject_fields", |name, def| {
            Ok(Arc::new(arguments::<RejectFields>(name, def)?) as Arc<dyn ResourceProcessor>)
        });
        c
    }

    /// Add or replace a kind.
    pub fn register<F>(&mut self, kind: impl Into<String>, factory: F) -> &mut Self
    where
        F: Fn(&str, &ServiceDefinition) -> Result<Arc<dyn ResourceProcessor>, ConfigError> + Send + Sync + 'static,
    {
        self.factories.insert(kind.into(), Box::new(factory));
        self
    }

    pub fn contains(&self, kind: &str) -> bool {
        self.factories.contains_key(kind)
    }

    pub fn kinds(&self) -> impl Iterator<Item = &str> {
        self.factories.keys().map(String::as_str)
    }

    pub fn create(&self, name: &str, def: &ServiceDefinition) -> Result<Arc<dyn ResourceProcessor>, ConfigError> {
        let factory = self.factories.get(&def.kind).ok_or_else(|| ConfigError::UnknownServiceKind {
            service: name.to_string(),
            kind: def.kind.clone(),
        })?;
        factory(name, def)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn builtins_are_registered() {
        let c = ServiceCatalog::default();
        let kinds: Vec<&str> = c.kinds().collect();
        assert_eq!(kinds, vec!["field_defaults", "reject_fields", "slugify", "trim_strings"]);
    }

    #[test]
    fn unknown_kind_is_an_error() {
        let def: ServiceDefinition = serde_json::from_value(json!({"kind": "mailer"})).unwrap();
        let err = ServiceCatalog::default().create("billing.mailer", &def).err().unwrap();
        assert!(matches!(err, ConfigError::UnknownServiceKind { kind, .. } if kind == "mailer"));
    }

    #[test]
    fn applications_can_add_kinds() {
        let mut c = ServiceCatalog::empty();
        c.register("noop", |_, _| Ok(Arc::new(TrimStrings::default()) as Arc<dyn ResourceProcessor>));
        assert!(c.contains("noop"));
        let def: ServiceDefinition = serde_json::from_value(json!({"kind": "noop"})).unwrap();
        assert!(c.create("x", &def).is_ok());
    }
}
