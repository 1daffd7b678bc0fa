//! The composition root: every service, entity mapping and api resource contributed by the
//! discovered modules, with provenance.

use crate::config::{ApiResource, EntityMapping, ServiceDefinition};
use crate::registry::discovery::DiscoveredModule;
use crate::registry::role::{Format, Role};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::PathBuf;

/// A definition plus where it came from.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Registered<T> {
    pub module: String,
    /// Contributing fragment paths in merge order; the first is the defining fragment.
    pub sources: Vec<PathBuf>,
    pub definition: T,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct FragmentInfo {
    pub role: Role,
    pub environment: Option<String>,
    pub format: Format,
    pub path: PathBuf,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ModuleInfo {
    pub name: String,
    pub path: PathBuf,
    pub fragments: Vec<FragmentInfo>,
}

impl From<&DiscoveredModule> for ModuleInfo {
    fn from(m: &DiscoveredModule) -> Self {
        ModuleInfo {
            name: m.name.clone(),
            path: m.path.clone(),
            fragments: m
                .fragments
                .iter()
                .map(|f| FragmentInfo {
                    role: f.role,
                    environment: f.environment.clone(),
                    format: f.format,
                    path: f.path.clone(),
                })
                .collect(),
        }
    }
}

/// Merged wiring of all modules for one environment. Built once per process, never mutated.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct CompositionRoot {
    pub environment: String,
    pub modules: Vec<ModuleInfo>,
    pub services: BTreeMap<String, Registered<ServiceDefinition>>,
    pub entities: BTreeMap<String, Registered<EntityMapping>>,
    pub resources: BTreeMap<String, Registered<ApiResource>>,
}

impl CompositionRoot {
    pub fn is_empty(&self) -> bool {
        self.services.is_empty() && self.entities.is_empty() && self.resources.is_empty()
    }

    pub fn service(&self, name: &str) -> Option<&ServiceDefinition> {
        self.services.get(name).map(|r| &r.definition)
    }

    pub fn entity(&self, name: &str) -> Option<&EntityMapping> {
        self.entities.get(name).map(|r| &r.definition)
    }

    pub fn resource(&self, name: &str) -> Option<&ApiResource> {
        self.resources.get(name).map(|r| &r.definition)
    }

    /// Names registered by one module, per role.
    pub fn names_owned_by(&self, module: &str) -> ModuleEntries {
        fn owned<T>(map: &BTreeMap<String, Registered<T>>, module: &str) -> Vec<String> {
            map.iter()
                .filter(|(_, r)| r.module == module)
                .map(|(n, _)| n.clone())
                .collect()
        }
        ModuleEntries {
            services: owned(&self.services, module),
            entities: owned(&self.entities, module),
            resources: owned(&self.resources, module),
        }
    }

    /// Compact view for introspection endpoints and logs.
    pub fn summary(&self) -> CompositionSummary {
        CompositionSummary {
            environment: self.environment.clone(),
            modules: self
                .modules
                .iter()
                .map(|m| ModuleSummary {
                    name: m.name.clone(),
                    fragments: m.fragments.iter().map(|f| f.path.clone()).collect(),
                    entries: self.names_owned_by(&m.name),
                })
                .collect(),
            services: self.services.len(),
            entities: self.entities.len(),
            resources: self.resources.len(),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ModuleEntries {
    pub services: Vec<String>,
    pub entities: Vec<String>,
    pub resources: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ModuleSummary {
    pub name: String,
    pub fragments: Vec<PathBuf>,
    pub entries: ModuleEntries,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct CompositionSummary {
    pub environment: String,
    pub modules: Vec<ModuleSummary>,
    pub services: usize,
    pub entities: usize,
    pub resources: usize,
}
