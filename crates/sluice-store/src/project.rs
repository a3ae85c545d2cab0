use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, RwLock};

use serde::{Deserialize, Serialize};

use sluice_core::id::{AccountId, ObjectId};
use sluice_core::types::{AccessGrants, LabelType, LabelTypes, PermissionRange, SUBMIT_LABEL};

use crate::StoreError;

/// File inside a `refs/meta/config` commit holding the project configuration.
pub const PROJECT_CONFIG_FILE: &str = "project.toml";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProjectSection {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AccessRule {
    pub label: String,
    pub account: AccountId,
    pub min: i16,
    pub max: i16,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProjectConfig {
    #[serde(default)]
    pub project: ProjectSection,
    #[serde(default, rename = "label")]
    pub labels: Vec<LabelType>,
    #[serde(default)]
    pub access: Vec<AccessRule>,
}

impl ProjectConfig {
    /// Parse and validate the text of a `project.toml`. `commit` names the
    /// commit it came from in errors.
    pub fn parse(text: &str, commit: ObjectId) -> Result<Self, StoreError> {
        let invalid = |reason: String| StoreError::InvalidProjectConfig { commit, reason };
        let config: ProjectConfig = toml::from_str(text).map_err(|e| invalid(e.to_string()))?;
        config.validate().map_err(invalid)?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), String> {
        let mut names = BTreeSet::new();
        for label in &self.labels {
            if label.name.trim().is_empty() {
                return Err("label with empty name".into());
            }
            if label.name == SUBMIT_LABEL {
                return Err(format!("label name {SUBMIT_LABEL} is reserved"));
            }
            if label.min > label.max {
                return Err(format!(
                    "label {}: min {} exceeds max {}",
                    label.name, label.min, label.max
                ));
            }
            if !names.insert(label.name.as_str()) {
                return Err(format!("duplicate label {}", label.name));
            }
        }
        for rule in &self.access {
            if !names.contains(rule.label.as_str()) {
                return Err(format!("access rule for undefined label {}", rule.label));
            }
            if rule.min > rule.max {
                return Err(format!(
                    "access rule {} for account {}: min {} exceeds max {}",
                    rule.label, rule.account, rule.min, rule.max
                ));
            }
        }
        Ok(())
    }

    pub fn description(&self) -> Option<&str> {
        self.project.description.as_deref()
    }

    pub fn label_types(&self) -> LabelTypes {
        LabelTypes::new(self.labels.iter().cloned())
    }

    pub fn access_grants(&self) -> AccessGrants {
        let mut grants = AccessGrants::default();
        for rule in &self.access {
            grants.grant(&rule.label, rule.account, PermissionRange::new(rule.min, rule.max));
        }
        grants
    }
}

/// A project's configuration as loaded from its config ref.
#[derive(Debug, Clone)]
pub struct ProjectState {
    pub name: String,
    pub config: ProjectConfig,
    /// Commit the config came from; `None` when the config ref does not exist.
    pub config_commit: Option<ObjectId>,
    pub label_types: LabelTypes,
    pub access: AccessGrants,
}

impl ProjectState {
    pub fn new(name: impl Into<String>, config: ProjectConfig, config_commit: Option<ObjectId>) -> Self {
        let label_types = config.label_types();
        let access = config.access_grants();
        Self {
            name: name.into(),
            config,
            config_commit,
            label_types,
            access,
        }
    }
}

pub trait ProjectLoader: Send + Sync {
    fn load_project(&self, project: &str) -> Result<ProjectState, StoreError>;
}

/// Process-wide cache of project configuration. Entries are only ever
/// replaced whole: evict, then the next `get` reloads.
pub struct ProjectCache {
    loader: Arc<dyn ProjectLoader>,
    entries: RwLock<HashMap<String, Arc<ProjectState>>>,
}

impl ProjectCache {
    pub fn new(loader: Arc<dyn ProjectLoader>) -> Self {
        Self {
            loader,
            entries: RwLock::new(HashMap::new()),
        }
    }

    pub fn get(&self, project: &str) -> Result<Arc<ProjectState>, StoreError> {
        if let Some(state) = self
            .entries
            .read()
            .map_err(|_| StoreError::Config("project cache poisoned".into()))?
            .get(project)
        {
            return Ok(state.clone());
        }
        let state = Arc::new(self.loader.load_project(project)?);
        self.entries
            .write()
            .map_err(|_| StoreError::Config("project cache poisoned".into()))?
            .insert(project.to_string(), state.clone());
        Ok(state)
    }

    pub fn evict(&self, project: &str) {
        if let Ok(mut entries) = self.entries.write() {
            entries.remove(project);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const VALID: &str = r#"
[project]
description = "Demo project"

[[label]]
name = "Code-Review"
min = -2
max = 2

[[access]]
label = "Code-Review"
account = 1
min = -2
max = 2
"#;

    fn commit() -> ObjectId {
        ObjectId::from_bytes([9; 32])
    }

    #[test]
    fn parses_valid_config() {
        let config = ProjectConfig::parse(VALID, commit()).unwrap();
        assert_eq!(config.description(), Some("Demo project"));
        assert_eq!(config.label_types().by_label("Code-Review").unwrap().max, 2);
        assert_eq!(
            config.access_grants().range("Code-Review", AccountId(1)),
            Some(PermissionRange::new(-2, 2))
        );
    }

    #[test]
    fn rejects_unparsable_toml() {
        let err = ProjectConfig::parse("[project\ndescription=", commit()).unwrap_err();
        assert!(matches!(err, StoreError::InvalidProjectConfig { .. }));
    }

    #[test]
    fn rejects_unknown_keys_and_bad_ranges() {
        assert!(ProjectConfig::parse("[project]\ncolour = \"red\"\n", commit()).is_err());
        let inverted = "[[label]]\nname = \"Verified\"\nmin = 1\nmax = -1\n";
        assert!(ProjectConfig::parse(inverted, commit()).is_err());
        let dangling = "[[access]]\nlabel = \"Nope\"\naccount = 1\nmin = 0\nmax = 1\n";
        assert!(ProjectConfig::parse(dangling, commit()).is_err());
    }

    struct CountingLoader(AtomicUsize);

    impl ProjectLoader for CountingLoader {
        fn load_project(&self, project: &str) -> Result<ProjectState, StoreError> {
            let n = self.0.fetch_add(1, Ordering::SeqCst);
            let config = ProjectConfig {
                project: ProjectSection {
                    description: Some(format!("load {n}")),
                },
                ..Default::default()
            };
            Ok(ProjectState::new(project, config, None))
        }
    }

    #[test]
    fn cache_reloads_only_after_evict() {
        let cache = ProjectCache::new(Arc::new(CountingLoader(AtomicUsize::new(0))));
        assert_eq!(cache.get("demo").unwrap().config.description(), Some("load 0"));
        assert_eq!(cache.get("demo").unwrap().config.description(), Some("load 0"));
        cache.evict("demo");
        assert_eq!(cache.get("demo").unwrap().config.description(), Some("load 1"));
    }
}
