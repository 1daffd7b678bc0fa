//! Fragment roles and the file formats a fragment may be written in.

use serde::Serialize;
use std::fmt;

/// What a configuration fragment wires. Composition always visits roles in [`Role::ALL`] order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Business-logic services (`services.*`).
    Services,
    /// Entity to table mappings (`persistence.*`).
    Persistence,
    /// Resources exposed over HTTP (`api.*`).
    Api,
}

impl Role {
    pub const ALL: [Role; 3] = [Role::Services, Role::Persistence, Role::Api];

    /// Default file stem, e.g. `services` for `services.yaml` / `services_prod.yaml`.
    pub fn default_stem(self) -> &'static str {
        match self {
            Role::Services => "services",
            Role::Persistence => "persistence",
            Role::Api => "api",
        }
    }

    /// Top-level key holding the named entries inside a fragment document.
    pub fn document_key(self) -> &'static str {
        match self {
            Role::Services => "services",
            Role::Persistence => "entities",
            Role::Api => "resources",
        }
    }

    fn index(self) -> usize {
        match self {
            Role::Services => 0,
            Role::Persistence => 1,
            Role::Api => 2,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Role::Services => "service",
            Role::Persistence => "persistence",
            Role::Api => "api",
        };
        f.write_str(s)
    }
}

/// Structured-config formats accepted for fragments.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Format {
    Json,
    Yaml,
    Toml,
}

impl Format {
    pub fn from_extension(ext: &str) -> Option<Format> {
        match ext {
            "json" => Some(Format::Json),
            "yaml" | "yml" => Some(Format::Yaml),
            "toml" => Some(Format::Toml),
            _ => None,
        }
    }
}

/// File stem per role. Customisable so a project can keep e.g. `wiring.yaml` instead of `services.yaml`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RoleStems {
    stems: [String; 3],
}

impl Default for RoleStems {
    fn default() -> Self {
        RoleStems {
            stems: Role::ALL.map(|r| r.default_stem().to_string()),
        }
    }
}

impl RoleStems {
    pub fn get(&self, role: Role) -> &str {
        &self.stems[role.index()]
    }

    pub fn set(&mut self, role: Role, stem: impl Into<String>) {
        self.stems[role.index()] = stem.into();
    }

    /// Match a file stem against every role: `services` is a base fragment, `services_prod` is
    /// the `prod` variant. Longer stems are tried first so `api_v2` wins over `api` + `_v2`.
    pub fn classify<'a>(&self, file_stem: &'a str) -> Option<(Role, Option<&'a str>)> {
        let mut roles = Role::ALL;
        roles.sort_by_key(|r| std::cmp::Reverse(self.get(*r).len()));
        for role in roles {
            let stem = self.get(role);
            if file_stem == stem {
                return Some((role, None));
            }
            if let Some(rest) = file_stem.strip_prefix(stem).and_then(|r| r.strip_prefix('_')) {
                if !rest.is_empty() {
                    return Some((role, Some(rest)));
                }
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_base_and_environment_stems() {
        let stems = RoleStems::default();
        assert_eq!(stems.classify("services"), Some((Role::Services, None)));
        assert_eq!(stems.classify("services_prod"), Some((Role::Services, Some("prod"))));
        assert_eq!(stems.classify("persistence_test"), Some((Role::Persistence, Some("test"))));
        assert_eq!(stems.classify("api"), Some((Role::Api, None)));
        assert_eq!(stems.classify("api_"), None);
        assert_eq!(stems.classify("routes"), None);
    }

    #[test]
    fn custom_stem_replaces_default() {
        let mut stems = RoleStems::default();
        stems.set(Role::Services, "wiring");
        assert_eq!(stems.classify("wiring_dev"), Some((Role::Services, Some("dev"))));
        assert_eq!(stems.classify("services"), None);
    }

    #[test]
    fn yml_and_yaml_are_the_same_format() {
        assert_eq!(Format::from_extension("yml"), Some(Format::Yaml));
        assert_eq!(Format::from_extension("yaml"), Some(Format::Yaml));
        assert_eq!(Format::from_extension("xml"), None);
    }
}
