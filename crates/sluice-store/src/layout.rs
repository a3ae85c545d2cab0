use std::path::{Path, PathBuf};

use crate::StoreError;

#[derive(Debug, Clone)]
pub struct RepoLayout {
    root: PathBuf,
}

impl RepoLayout {
    pub fn new(root: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn sluice_dir(&self) -> PathBuf {
        self.root.join(".sluice")
    }

    pub fn objects_dir(&self) -> PathBuf {
        self.sluice_dir().join("objects")
    }

    /// Refs are stored by full name (`refs/heads/main`) under the sluice dir.
    pub fn ref_path(&self, name: &str) -> PathBuf {
        self.sluice_dir().join(name)
    }

    pub fn refs_dir(&self) -> PathBuf {
        self.sluice_dir().join("refs")
    }

    pub fn reflogs_dir(&self) -> PathBuf {
        self.sluice_dir().join("logs")
    }

    pub fn config_file(&self) -> PathBuf {
        self.sluice_dir().join("repo.toml")
    }

    pub fn meta_db_file(&self) -> PathBuf {
        self.sluice_dir().join("meta.db")
    }

    pub fn description_file(&self) -> PathBuf {
        self.sluice_dir().join("description")
    }

    pub fn outbox_dir(&self) -> PathBuf {
        self.sluice_dir().join("outbox")
    }

    pub fn create_dirs(&self) -> Result<(), StoreError> {
        std::fs::create_dir_all(self.objects_dir())?;
        std::fs::create_dir_all(self.refs_dir().join("heads"))?;
        std::fs::create_dir_all(self.refs_dir().join("meta"))?;
        std::fs::create_dir_all(self.reflogs_dir())?;
        std::fs::create_dir_all(self.outbox_dir())?;
        Ok(())
    }
}
