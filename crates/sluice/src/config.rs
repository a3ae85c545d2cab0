use std::path::PathBuf;

use sluice_core::id::ObjectId;
use sluice_store::SluiceRepo;

/// Find the sluice repo root by walking up from the current directory.
pub fn find_repo_root() -> anyhow::Result<PathBuf> {
    let mut dir = std::env::current_dir()?;
    loop {
        if dir.join(".sluice").is_dir() {
            return Ok(dir);
        }
        if !dir.pop() {
            anyhow::bail!("not in a sluice repository (no .sluice directory found)");
        }
    }
}

pub fn open_repo() -> anyhow::Result<SluiceRepo> {
    Ok(SluiceRepo::open(&find_repo_root()?)?)
}

/// Resolve a commit given as hex id, full ref name or branch short name.
pub fn resolve_commit(repo: &SluiceRepo, rev: &str) -> anyhow::Result<ObjectId> {
    if let Ok(id) = ObjectId::from_hex(rev) {
        if repo.has_commit(&id) {
            return Ok(id);
        }
        anyhow::bail!("commit not found: {rev}");
    }
    let ref_name = if rev.starts_with("refs/") {
        rev.to_string()
    } else {
        format!("{}{rev}", sluice_core::types::REFS_HEADS)
    };
    repo.get_ref(&ref_name)?
        .ok_or_else(|| anyhow::anyhow!("ref not found: {ref_name}"))
}

pub fn now_ms() -> anyhow::Result<u64> {
    Ok(std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)?
        .as_millis() as u64)
}
