//! Module discovery: walk `<root>/<Module>/` and classify the fragment files each module provides.

use crate::error::RegistryError;
use crate::registry::role::{Format, Role, RoleStems};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// One recognised fragment file for the active environment.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct FragmentFile {
    pub module: String,
    pub role: Role,
    /// `None` for the unsuffixed fragment, `Some(env)` for `<stem>_<env>`.
    pub environment: Option<String>,
    pub format: Format,
    pub path: PathBuf,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct DiscoveredModule {
    pub name: String,
    pub path: PathBuf,
    pub fragments: Vec<FragmentFile>,
}

impl DiscoveredModule {
    pub fn has_base(&self, role: Role) -> bool {
        self.fragments
            .iter()
            .any(|f| f.role == role && f.environment.is_none())
    }
}

/// Environment names end up in file names, so keep them to a conservative character set.
pub fn validate_environment(environment: &str) -> Result<(), RegistryError> {
    let ok = !environment.is_empty()
        && environment
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if ok {
        Ok(())
    } else {
        Err(RegistryError::InvalidEnvironment(environment.to_string()))
    }
}

/// List modules under `root` in name order. A missing root yields no modules.
pub fn discover(
    root: &Path,
    environment: &str,
    stems: &RoleStems,
) -> Result<Vec<DiscoveredModule>, RegistryError> {
    if !root.exists() {
        tracing::info!(root = %root.display(), "module root not found, composing without modules");
        return Ok(Vec::new());
    }
    let mut module_dirs = Vec::new();
    for entry in read_dir_sorted(root)? {
        let name = match entry.file_name().and_then(|n| n.to_str()) {
            Some(n) => n.to_string(),
            None => continue,
        };
        if name.starts_with('.') || !entry.is_dir() {
            continue;
        }
        module_dirs.push((name, entry));
    }

    let mut modules = Vec::with_capacity(module_dirs.len());
    for (name, dir) in module_dirs {
        let fragments = classify_module(&name, &dir, environment, stems)?;
        if fragments.is_empty() {
            tracing::debug!(module = %name, "directory has no fragments, skipping");
            continue;
        }
        modules.push(DiscoveredModule {
            name,
            path: dir,
            fragments,
        });
    }
    Ok(modules)
}

fn classify_module(
    module: &str,
    dir: &Path,
    environment: &str,
    stems: &RoleStems,
) -> Result<Vec<FragmentFile>, RegistryError> {
    let mut seen: BTreeMap<(Role, Option<String>), PathBuf> = BTreeMap::new();
    let mut fragments = Vec::new();
    for path in read_dir_sorted(dir)? {
        if !path.is_file() {
            continue;
        }
        let (Some(file_stem), Some(ext)) = (
            path.file_stem().and_then(|s| s.to_str()),
            path.extension().and_then(|s| s.to_str()),
        ) else {
            continue;
        };
        let Some((role, env)) = stems.classify(file_stem) else {
            continue;
        };
        let Some(format) = Format::from_extension(ext) else {
            tracing::warn!(path = %path.display(), "unsupported fragment extension, ignoring");
            continue;
        };
        if let Some(env) = env {
            if env != environment {
                tracing::debug!(path = %path.display(), env, "fragment for another environment, skipping");
                continue;
            }
        }
        let key = (role, env.map(str::to_string));
        if let Some(first) = seen.get(&key) {
            return Err(RegistryError::AmbiguousFragment {
                module: module.to_string(),
                role,
                first: first.clone(),
                second: path,
            });
        }
        seen.insert(key.clone(), path.clone());
        fragments.push(FragmentFile {
            module: module.to_string(),
            role,
            environment: key.1,
            format,
            path,
        });
    }
    Ok(fragments)
}

fn read_dir_sorted(dir: &Path) -> Result<Vec<PathBuf>, RegistryError> {
    let io_err = |source| RegistryError::Io {
        path: dir.to_path_buf(),
        source,
    };
    let mut paths = Vec::new();
    for entry in fs::read_dir(dir).map_err(io_err)? {
        paths.push(entry.map_err(io_err)?.path());
    }
    paths.sort();
    Ok(paths)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn touch(root: &Path, rel: &str) {
        let p = root.join(rel);
        fs::create_dir_all(p.parent().unwrap()).unwrap();
        fs::write(p, "").unwrap();
    }

    #[test]
    fn missing_root_is_empty() {
        let tmp = TempDir::new().unwrap();
        let modules = discover(&tmp.path().join("nope"), "dev", &RoleStems::default()).unwrap();
        assert!(modules.is_empty());
    }

    #[test]
    fn modules_are_sorted_and_filtered() {
        let tmp = TempDir::new().unwrap();
        touch(tmp.path(), "Zeta/api.yaml");
        touch(tmp.path(), "Alpha/services.json");
        touch(tmp.path(), "Alpha/services_prod.json");
        touch(tmp.path(), "Alpha/services_dev.json");
        touch(tmp.path(), "Alpha/README.md");
        touch(tmp.path(), "Empty/notes.txt");
        touch(tmp.path(), ".hidden/services.yaml");
        touch(tmp.path(), "loose.yaml");

        let modules = discover(tmp.path(), "dev", &RoleStems::default()).unwrap();
        let names: Vec<_> = modules.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["Alpha", "Zeta"]);

        let alpha = &modules[0];
        assert_eq!(alpha.fragments.len(), 2);
        assert_eq!(alpha.fragments[0].environment, None);
        assert_eq!(alpha.fragments[1].environment.as_deref(), Some("dev"));
        assert!(alpha.has_base(Role::Services));
        assert!(!alpha.has_base(Role::Api));
    }

    #[test]
    fn two_formats_for_one_role_are_ambiguous() {
        let tmp = TempDir::new().unwrap();
        touch(tmp.path(), "Order/services.json");
        touch(tmp.path(), "Order/services.yaml");
        let err = discover(tmp.path(), "dev", &RoleStems::default()).unwrap_err();
        assert!(matches!(err, RegistryError::AmbiguousFragment { ref module, role: Role::Services, .. } if module == "Order"));
    }

    #[test]
    fn environment_names_are_checked() {
        assert!(validate_environment("prod").is_ok());
        assert!(validate_environment("qa-eu_1").is_ok());
        assert!(validate_environment("").is_err());
        assert!(validate_environment("../etc").is_err());
    }
}
