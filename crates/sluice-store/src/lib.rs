pub mod error;
pub mod layout;
pub mod lockfile;
pub mod memory;
pub mod meta;
pub mod meta_db;
pub mod objects;
pub mod project;
pub mod reflog;
pub mod refs;
pub mod repo;
pub mod tip_cache;

pub use error::StoreError;
pub use memory::MemoryMetaStore;
pub use meta::{MetaStore, MetaTxn};
pub use meta_db::RedbMetaStore;
pub use project::{ProjectCache, ProjectConfig, ProjectLoader, ProjectState};
pub use tip_cache::TipCache;

use std::path::Path;

use sluice_core::hash::{content_hash, ObjectKind};
use sluice_core::id::ObjectId;
use sluice_core::types::{Commit, RefUpdateCommand, REFS_CONFIG};

use crate::layout::RepoLayout;
use crate::project::PROJECT_CONFIG_FILE;
use crate::repo::RepoConfig;

/// One project's repository: commit objects, refs and repository config.
pub struct SluiceRepo {
    layout: RepoLayout,
    config: RepoConfig,
}

impl SluiceRepo {
    pub fn init(root: &Path, project: &str) -> Result<Self, StoreError> {
        let layout = RepoLayout::new(root);
        layout.create_dirs()?;
        let config = RepoConfig::new(project);
        repo::write_config(&layout, &config)?;
        Ok(Self { layout, config })
    }

    pub fn open(root: &Path) -> Result<Self, StoreError> {
        let layout = RepoLayout::new(root);
        if !layout.sluice_dir().exists() {
            return Err(StoreError::NotARepository(root.to_path_buf()));
        }
        let config = repo::read_config(&layout)?;
        Ok(Self { layout, config })
    }

    pub fn root(&self) -> &Path {
        self.layout.root()
    }

    pub fn layout(&self) -> &RepoLayout {
        &self.layout
    }

    pub fn config(&self) -> &RepoConfig {
        &self.config
    }

    pub fn project(&self) -> &str {
        &self.config.project
    }

    pub fn save_config(&mut self, config: RepoConfig) -> Result<(), StoreError> {
        repo::write_config(&self.layout, &config)?;
        self.config = config;
        Ok(())
    }

    pub fn open_meta_store(&self) -> Result<RedbMetaStore, StoreError> {
        RedbMetaStore::open(&self.layout.meta_db_file())
    }

    pub fn store_commit(&self, commit: &Commit) -> Result<ObjectId, StoreError> {
        let payload = commit.serialize_payload()?;
        let id = content_hash(ObjectKind::Commit, &payload);
        objects::write_object(&self.layout, &id, &payload)?;
        Ok(id)
    }

    pub fn load_commit(&self, id: &ObjectId) -> Result<Commit, StoreError> {
        let payload = objects::read_object(&self.layout, id)?;
        Ok(Commit::deserialize_payload(&payload)?)
    }

    pub fn has_commit(&self, id: &ObjectId) -> bool {
        objects::object_path(&self.layout, id).exists()
    }

    pub fn set_ref(&self, name: &str, target: &ObjectId) -> Result<(), StoreError> {
        refs::write_ref(&self.layout, name, target)
    }

    pub fn get_ref(&self, name: &str) -> Result<Option<ObjectId>, StoreError> {
        refs::read_ref(&self.layout, name)
    }

    pub fn list_refs(&self, prefix: &str) -> Result<Vec<(String, ObjectId)>, StoreError> {
        refs::list_refs(&self.layout, prefix)
    }

    /// Commit a batch of CAS ref updates; see [`refs::apply_ref_updates`].
    pub fn apply_ref_updates(
        &self,
        commands: &[RefUpdateCommand],
        author: &str,
        message: &str,
    ) -> Result<(), StoreError> {
        refs::apply_ref_updates(&self.layout, commands, author, message)
    }

    /// Load and validate the project configuration stored in `commit`.
    pub fn load_project_config(&self, commit: &ObjectId) -> Result<ProjectConfig, StoreError> {
        let c = self.load_commit(commit)?;
        match c.file(PROJECT_CONFIG_FILE) {
            Some(text) => ProjectConfig::parse(text, *commit),
            None => Ok(ProjectConfig::default()),
        }
    }

    pub fn description(&self) -> Result<Option<String>, StoreError> {
        let path = self.layout.description_file();
        if !path.exists() {
            return Ok(None);
        }
        Ok(Some(std::fs::read_to_string(path)?.trim_end().to_string()))
    }

    pub fn set_description(&self, description: Option<&str>) -> Result<(), StoreError> {
        let path = self.layout.description_file();
        match description {
            Some(text) => std::fs::write(path, format!("{text}\n"))?,
            None if path.exists() => std::fs::remove_file(path)?,
            None => {}
        }
        Ok(())
    }
}

impl ProjectLoader for SluiceRepo {
    fn load_project(&self, project: &str) -> Result<ProjectState, StoreError> {
        if project != self.project() {
            return Err(StoreError::Config(format!("unknown project {project}")));
        }
        let config_commit = self.get_ref(REFS_CONFIG)?;
        let config = match &config_commit {
            Some(id) => self.load_project_config(id)?,
            None => ProjectConfig::default(),
        };
        Ok(ProjectState::new(project, config, config_commit))
    }
}
