use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// `{name, displayName, version, migrationPrefix, dependencies[],
/// description}` entry the module registry stores keyed by name (§4.4, §6).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModuleDefinition {
    pub name: String,
    pub display_name: String,
    pub version: String,
    pub migration_prefix: String,
    #[serde(default)]
    pub dependencies: Vec<String>,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ModuleOrderingError {
    #[error("module dependency cycle detected among: {}", .0.join(", "))]
    Cycle(Vec<String>),
    #[error("module `{module}` depends on unknown module `{dependency}`")]
    UnknownDependency { module: String, dependency: String },
}

/// Topologically orders modules by declared dependency, so that modules are
/// applied only after every module they depend on (§4.4, §9). Ties within
/// one dependency depth are broken by name for determinism.
pub fn order_modules(modules: &[ModuleDefinition]) -> Result<Vec<String>, ModuleOrderingError> {
    let by_name: HashMap<&str, &ModuleDefinition> =
        modules.iter().map(|module| (module.name.as_str(), module)).collect();

    for module in modules {
        for dependency in &module.dependencies {
            if !by_name.contains_key(dependency.as_str()) {
                return Err(ModuleOrderingError::UnknownDependency {
                    module: module.name.clone(),
                    dependency: dependency.clone(),
                });
            }
        }
    }

    let mut resolved: Vec<String> = Vec::with_capacity(modules.len());
    let mut resolved_set: HashSet<&str> = HashSet::new();
    let mut remaining: BTreeSet<&str> = modules.iter().map(|module| module.name.as_str()).collect();

    while !remaining.is_empty() {
        let ready: Vec<&str> = remaining
            .iter()
            .copied()
            .filter(|name| {
                by_name[name]
                    .dependencies
                    .iter()
                    .all(|dependency| resolved_set.contains(dependency.as_str()))
            })
            .collect();

        if ready.is_empty() {
            let mut cycle: Vec<String> = remaining.iter().map(|name| (*name).to_string()).collect();
            cycle.sort();
            return Err(ModuleOrderingError::Cycle(cycle));
        }

        for name in ready {
            resolved.push(name.to_string());
            resolved_set.insert(name);
            remaining.remove(name);
        }
    }

    Ok(resolved)
}

/// Module definitions keyed by name, as persisted by `lp_module_registry`.
#[must_use]
pub fn index_by_name(modules: Vec<ModuleDefinition>) -> BTreeMap<String, ModuleDefinition> {
    modules.into_iter().map(|module| (module.name.clone(), module)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn module(name: &str, dependencies: &[&str]) -> ModuleDefinition {
        ModuleDefinition {
            name: name.to_string(),
            display_name: name.to_string(),
            version: "1.0.0".to_string(),
            migration_prefix: format!("{name}_"),
            dependencies: dependencies.iter().map(|d| (*d).to_string()).collect(),
            description: String::new(),
        }
    }

    #[test]
    fn orders_dependencies_before_dependents() {
        let modules = vec![module("billing", &["core"]), module("core", &[])];
        let ordered = order_modules(&modules).unwrap();
        assert_eq!(ordered, vec!["core".to_string(), "billing".to_string()]);
    }

    #[test]
    fn rejects_cycles_naming_the_members() {
        let modules = vec![module("a", &["b"]), module("b", &["a"])];
        let err = order_modules(&modules).unwrap_err();
        assert_eq!(err, ModuleOrderingError::Cycle(vec!["a".to_string(), "b".to_string()]));
    }

    #[test]
    fn rejects_unknown_dependencies() {
        let modules = vec![module("a", &["missing"])];
        let err = order_modules(&modules).unwrap_err();
        assert_eq!(
            err,
            ModuleOrderingError::UnknownDependency {
                module: "a".to_string(),
                dependency: "missing".to_string(),
            }
        );
    }

    #[test]
    fn breaks_ties_by_name_for_determinism() {
        let modules = vec![module("z", &[]), module("a", &[]), module("m", &[])];
        assert_eq!(order_modules(&modules).unwrap(), vec!["a", "m", "z"]);
    }
}
