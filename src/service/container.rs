//! Instantiated services, looked up by logical name.

use crate::error::{AppError, ConfigError};
use crate::registry::CompositionRoot;
use crate::service::catalog::ServiceCatalog;
use crate::service::processors::{ProcessContext, ResourceProcessor};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

#[derive(Clone, Default)]
pub struct ServiceContainer {
    services: BTreeMap<String, Arc<dyn ResourceProcessor>>,
}

impl ServiceContainer {
    /// Instantiate every enabled service of the composition root. Fails on the first
    /// unknown kind or bad argument set.
    pub fn build(root: &CompositionRoot, catalog: &ServiceCatalog) -> Result<Self, ConfigError> {
        let mut services = BTreeMap::new();
        for (name, reg) in &root.services {
            let def = &reg.definition;
            if !def.enabled {
                tracing::debug!(service = %name, module = %reg.module, "service disabled, skipped");
                continue;
            }
            let svc = catalog.create(name, def)?;
            tracing::debug!(service = %name, kind = %def.kind, module = %reg.module, "service instantiated");
            services.insert(name.clone(), svc);
        }
        Ok(ServiceContainer { services })
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn ResourceProcessor>> {
        self.services.get(name).cloned()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.services.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.services.len()
    }

    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }

    /// Run the named processors over `body`, in order.
    pub async fn run(
        &self,
        names: &[String],
        ctx: &ProcessContext<'_>,
        body: &mut HashMap<String, Value>,
    ) -> Result<(), AppError> {
        for name in names {
            let svc = self.services.get(name).ok_or_else(|| ConfigError::MissingReference {
                kind: "service",
                id: name.clone(),
                owner: format!("resource {}", ctx.resource),
            })?;
            svc.process(ctx, body).await?;
        }
        Ok(())
    }
}

impl std::fmt::Debug for ServiceContainer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceContainer")
            .field("services", &self.services.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Operation, ServiceDefinition};
    use crate::registry::Registered;
    use serde_json::json;

    fn root(services: Value) -> CompositionRoot {
        let mut root = CompositionRoot::default();
        let defs: BTreeMap<String, ServiceDefinition> = serde_json::from_value(services).unwrap();
        for (name, definition) in defs {
            root.services.insert(
                name,
                Registered { module: "Example".into(), sources: vec![], definition },
            );
        }
        root
    }

    #[tokio::test]
    async fn builds_enabled_services_and_runs_them_in_order() {
        let root = root(json!({
            "example.trim": {"kind": "trim_strings"},
            "example.slug": {"kind": "slugify", "arguments": {"source": "name", "target": "slug"}},
            "example.off": {"kind": "no_such_kind", "enabled": false}
        }));
        let c = ServiceContainer::build(&root, &ServiceCatalog::default()).unwrap();
        assert_eq!(c.names().collect::<Vec<_>>(), vec!["example.slug", "example.trim"]);
        assert!(c.get("example.off").is_none());

        let mut body: HashMap<String, Value> = serde_json::from_value(json!({"name": "  Big Box "})).unwrap();
        let ctx = ProcessContext { resource: "examples", operation: Operation::Create };
        c.run(&["example.trim".into(), "example.slug".into()], &ctx, &mut body).await.unwrap();
        assert_eq!(body["name"], json!("Big Box"));
        assert_eq!(body["slug"], json!("big-box"));
    }

    #[test]
    fn bad_arguments_fail_the_build() {
        let root = root(json!({"example.slug": {"kind": "slugify", "arguments": {"source": "name"}}}));
        let err = ServiceContainer::build(&root, &ServiceCatalog::default()).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidServiceArguments { service, .. } if service == "example.slug"));
    }
}
