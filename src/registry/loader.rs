//! Build the composition root from a module tree.

use crate::error::RegistryError;
use crate::registry::composition::{CompositionRoot, ModuleInfo, Registered};
use crate::registry::discovery::{discover, validate_environment, DiscoveredModule, FragmentFile};
use crate::registry::fragment;
use crate::registry::merge::merge_patch;
use crate::registry::role::{Role, RoleStems};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Scans `<root>/<Module>/<stem>[_<env>].<ext>` and merges every fragment into one [`CompositionRoot`].
///
/// ```no_run
/// use api_skeleton::registry::ModuleRegistry;
///
/// let root = ModuleRegistry::new("modules", "prod").build()?;
/// println!("{} resources", root.resources.len());
/// # Ok::<(), api_skeleton::RegistryError>(())
/// ```
#[derive(Clone, Debug)]
pub struct ModuleRegistry {
    root: PathBuf,
    environment: String,
    stems: RoleStems,
    require_base_fragment: bool,
}

impl ModuleRegistry {
    pub fn new(root: impl Into<PathBuf>, environment: impl Into<String>) -> Self {
        ModuleRegistry {
            root: root.into(),
            environment: environment.into(),
            stems: RoleStems::default(),
            require_base_fragment: false,
        }
    }

    /// Use a different file stem for one role.
    pub fn with_stem(mut self, role: Role, stem: impl Into<String>) -> Self {
        self.stems.set(role, stem);
        self
    }

    /// When set, an environment fragment without an unsuffixed sibling of the same role is fatal.
    pub fn require_base_fragment(mut self, require: bool) -> Self {
        self.require_base_fragment = require;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn environment(&self) -> &str {
        &self.environment
    }

    /// Discover, parse and merge. All-or-nothing: the first error aborts the build.
    pub fn build(&self) -> Result<CompositionRoot, RegistryError> {
        validate_environment(&self.environment)?;
        let modules = discover(&self.root, &self.environment, &self.stems)?;

        let mut tables: BTreeMap<Role, RawTable> = BTreeMap::new();
        for role in Role::ALL {
            let table = tables.entry(role).or_default();
            for file in ordered_fragments(&modules, role, false) {
                for (name, value) in fragment::load(file)? {
                    table.insert_base(role, name, file, value)?;
                }
            }
            for file in ordered_fragments(&modules, role, true) {
                if self.require_base_fragment && !has_base(&modules, &file.module, role) {
                    return Err(RegistryError::EnvironmentOverride {
                        role,
                        path: file.path.clone(),
                    });
                }
                for (name, patch) in fragment::load(file)? {
                    table.apply_override(role, name, file, patch)?;
                }
            }
        }

        let mut take = |role: Role| tables.remove(&role).unwrap_or_default();
        let services = take(Role::Services).into_typed(Role::Services)?;
        let entities = take(Role::Persistence).into_typed(Role::Persistence)?;
        let resources = take(Role::Api).into_typed(Role::Api)?;

        let root = CompositionRoot {
            environment: self.environment.clone(),
            modules: modules.iter().map(ModuleInfo::from).collect(),
            services,
            entities,
            resources,
        };
        tracing::info!(
            environment = %root.environment,
            modules = root.modules.len(),
            services = root.services.len(),
            entities = root.entities.len(),
            resources = root.resources.len(),
            "composition root built"
        );
        Ok(root)
    }
}

/// Shorthand for `ModuleRegistry::new(root, environment).build()`.
pub fn build_composition_root(
    root: impl Into<PathBuf>,
    environment: impl Into<String>,
) -> Result<CompositionRoot, RegistryError> {
    ModuleRegistry::new(root, environment).build()
}

/// One glob: all fragments of `role` that are (or are not) environment-suffixed, ordered by path.
fn ordered_fragments(modules: &[DiscoveredModule], role: Role, suffixed: bool) -> Vec<&FragmentFile> {
    let mut files: Vec<&FragmentFile> = modules
        .iter()
        .flat_map(|m| m.fragments.iter())
        .filter(|f| f.role == role && f.environment.is_some() == suffixed)
        .collect();
    files.sort_by(|a, b| a.path.cmp(&b.path));
    files
}

fn has_base(modules: &[DiscoveredModule], module: &str, role: Role) -> bool {
    modules
        .iter()
        .find(|m| m.name == module)
        .map(|m| m.has_base(role))
        .unwrap_or(false)
}

#[derive(Debug)]
struct RawEntry {
    module: String,
    sources: Vec<PathBuf>,
    value: Value,
}

/// Untyped entries for one role, merged at the value level so overrides can be partial.
#[derive(Debug, Default)]
struct RawTable {
    entries: BTreeMap<String, RawEntry>,
}

impl RawTable {
    fn insert_base(
        &mut self,
        role: Role,
        name: String,
        file: &FragmentFile,
        value: Value,
    ) -> Result<(), RegistryError> {
        if let Some(existing) = self.entries.get(&name) {
            return Err(RegistryError::NameCollision {
                role,
                name,
                first: existing.sources[0].clone(),
                second: file.path.clone(),
            });
        }
        tracing::debug!(%role, name = %name, module = %file.module, "registered");
        self.entries.insert(
            name,
            RawEntry {
                module: file.module.clone(),
                sources: vec![file.path.clone()],
                value,
            },
        );
        Ok(())
    }

    /// Environment fragments may only touch their own module's names or add new ones.
    fn apply_override(
        &mut self,
        role: Role,
        name: String,
        file: &FragmentFile,
        patch: Value,
    ) -> Result<(), RegistryError> {
        match self.entries.get_mut(&name) {
            Some(existing) if existing.module != file.module => Err(RegistryError::NameCollision {
                role,
                name,
                first: existing.sources[0].clone(),
                second: file.path.clone(),
            }),
            Some(_) if patch.is_null() => {
                tracing::debug!(%role, name = %name, module = %file.module, "removed by environment fragment");
                self.entries.remove(&name);
                Ok(())
            }
            Some(existing) => {
                merge_patch(&mut existing.value, patch);
                existing.sources.push(file.path.clone());
                tracing::debug!(%role, name = %name, module = %file.module, "overridden");
                Ok(())
            }
            None if patch.is_null() => Ok(()),
            None => {
                let mut value = Value::Null;
                merge_patch(&mut value, patch);
                self.entries.insert(
                    name,
                    RawEntry {
                        module: file.module.clone(),
                        sources: vec![file.path.clone()],
                        value,
                    },
                );
                Ok(())
            }
        }
    }

    fn into_typed<T: DeserializeOwned>(
        self,
        role: Role,
    ) -> Result<BTreeMap<String, Registered<T>>, RegistryError> {
        let mut out = BTreeMap::new();
        for (name, raw) in self.entries {
            let definition = serde_json::from_value::<T>(raw.value).map_err(|e| {
                RegistryError::InvalidDefinition {
                    role,
                    name: name.clone(),
                    path: raw.sources.last().cloned().unwrap_or_default(),
                    message: e.to_string(),
                }
            })?;
            out.insert(
                name,
                Registered {
                    module: raw.module,
                    sources: raw.sources,
                    definition,
                },
            );
        }
        Ok(out)
    }
}
