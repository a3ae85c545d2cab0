use std::path::PathBuf;

use sluice_core::id::ObjectId;

use crate::layout::RepoLayout;
use crate::StoreError;

pub fn object_path(layout: &RepoLayout, id: &ObjectId) -> PathBuf {
    let dir = layout.objects_dir().join(id.shard_prefix());
    dir.join(id.shard_suffix())
}

pub fn write_object(layout: &RepoLayout, id: &ObjectId, data: &[u8]) -> Result<(), StoreError> {
    let path = object_path(layout, id);

    // Content addressed: an existing file already holds these bytes.
    if path.exists() {
        return Ok(());
    }

    let dir = layout.objects_dir().join(id.shard_prefix());
    std::fs::create_dir_all(&dir)?;

    // Atomic write: temp file + rename
    let temp = tempfile::NamedTempFile::new_in(&dir)?;
    std::fs::write(temp.path(), data)?;
    temp.persist(&path).map_err(|e| StoreError::Io(e.error))?;

    Ok(())
}

pub fn read_object(layout: &RepoLayout, id: &ObjectId) -> Result<Vec<u8>, StoreError> {
    let path = object_path(layout, id);
    if !path.exists() {
        return Err(StoreError::ObjectNotFound(*id));
    }
    Ok(std::fs::read(&path)?)
}
