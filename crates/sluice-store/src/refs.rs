use std::collections::BTreeMap;
use std::path::Path;

use sluice_core::id::ObjectId;
use sluice_core::types::{validate_ref_name, RefUpdateCommand};

use crate::layout::RepoLayout;
use crate::lockfile::LockFile;
use crate::reflog::append_reflog;
use crate::StoreError;

pub fn write_ref(layout: &RepoLayout, name: &str, target: &ObjectId) -> Result<(), StoreError> {
    validate_ref_name(name)?;
    let path = layout.ref_path(name);
    let dir = match path.parent() {
        Some(parent) => parent.to_path_buf(),
        None => layout.sluice_dir(),
    };
    std::fs::create_dir_all(&dir)?;
    let temp = tempfile::NamedTempFile::new_in(&dir)?;
    std::fs::write(temp.path(), target.to_hex())?;
    temp.persist(&path).map_err(|e| StoreError::Io(e.error))?;
    Ok(())
}

pub fn read_ref(layout: &RepoLayout, name: &str) -> Result<Option<ObjectId>, StoreError> {
    validate_ref_name(name)?;
    let path = layout.ref_path(name);
    if !path.is_file() {
        return Ok(None);
    }
    let content = std::fs::read_to_string(&path)?;
    let id = ObjectId::from_hex(content.trim())?;
    Ok(Some(id))
}

pub fn delete_ref(layout: &RepoLayout, name: &str) -> Result<(), StoreError> {
    validate_ref_name(name)?;
    let path = layout.ref_path(name);
    if path.exists() {
        std::fs::remove_file(&path)?;
    }
    Ok(())
}

/// Lists refs under `prefix` (e.g. `refs/heads`), returning full ref names.
pub fn list_refs(layout: &RepoLayout, prefix: &str) -> Result<Vec<(String, ObjectId)>, StoreError> {
    let base = layout.ref_path(prefix);
    if !base.exists() {
        return Ok(Vec::new());
    }

    let mut results = Vec::new();
    collect_refs(&base, &layout.sluice_dir(), &mut results)?;
    results.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(results)
}

fn collect_refs(
    dir: &Path,
    root: &Path,
    results: &mut Vec<(String, ObjectId)>,
) -> Result<(), StoreError> {
    if !dir.is_dir() {
        return Ok(());
    }
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if path.is_dir() {
            collect_refs(&path, root, results)?;
        } else if path.is_file() {
            let Ok(rel) = path.strip_prefix(root) else {
                continue;
            };
            let name = rel.to_string_lossy().replace('\\', "/");
            if name.ends_with(".lock") {
                continue;
            }
            let content = std::fs::read_to_string(&path)?;
            if let Ok(id) = ObjectId::from_hex(content.trim()) {
                results.push((name, id));
            }
        }
    }
    Ok(())
}

/// Apply a batch of compare-and-swap ref updates, all or nothing.
///
/// Every touched ref is locked first. Commands are replayed in order against
/// the refs' current values, so a batch may chain several updates to one ref
/// (`A -> B` then `B -> C`). A zero `old_id` expects the ref to be absent; a
/// zero `new_id` deletes it. Nothing is written unless every command matches.
pub fn apply_ref_updates(
    layout: &RepoLayout,
    commands: &[RefUpdateCommand],
    author: &str,
    message: &str,
) -> Result<(), StoreError> {
    if commands.is_empty() {
        return Ok(());
    }

    let mut current: BTreeMap<&str, ObjectId> = BTreeMap::new();
    let mut locks = Vec::new();
    for cmd in commands {
        let name = cmd.ref_name.as_str();
        if current.contains_key(name) {
            continue;
        }
        validate_ref_name(name)?;
        let path = layout.ref_path(name);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        locks.push(LockFile::acquire(&path)?);
        current.insert(name, read_ref(layout, name)?.unwrap_or_else(ObjectId::zero));
    }

    let original = current.clone();
    for cmd in commands {
        let name = cmd.ref_name.as_str();
        let actual = current[name];
        if actual != cmd.old_id {
            tracing::debug!(ref_name = name, expected = %cmd.old_id, actual = %actual, "ref CAS rejected");
            return Err(StoreError::RefCasConflict {
                ref_name: name.to_string(),
                expected: cmd.old_id.to_hex(),
                actual: actual.to_hex(),
            });
        }
        current.insert(name, cmd.new_id);
    }

    let changed: Vec<(&str, ObjectId, ObjectId)> = current
        .iter()
        .filter(|(name, new_id)| original[*name] != **new_id)
        .map(|(name, new_id)| (*name, original[name], *new_id))
        .collect();

    for (i, (name, _, new_id)) in changed.iter().enumerate() {
        if let Err(e) = set_or_delete(layout, name, new_id) {
            tracing::error!(ref_name = *name, error = %e, "ref write failed, restoring earlier refs");
            for (written, old_id, _) in &changed[..i] {
                if let Err(undo) = set_or_delete(layout, written, old_id) {
                    tracing::error!(ref_name = *written, error = %undo, "cannot restore ref");
                }
            }
            return Err(e);
        }
    }

    // The refs have moved; a missing log line must not report the update
    // as failed.
    for (name, old_id, new_id) in &changed {
        if let Err(e) = append_reflog(layout, name, old_id, new_id, author, message) {
            tracing::warn!(ref_name = *name, error = %e, "cannot append reflog");
        }
    }

    drop(locks);
    Ok(())
}

fn set_or_delete(layout: &RepoLayout, name: &str, target: &ObjectId) -> Result<(), StoreError> {
    if target.is_zero() {
        delete_ref(layout, name)
    } else {
        write_ref(layout, name, target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reflog::read_reflog;
    use sluice_core::hash::{content_hash, ObjectKind};

    fn setup() -> (tempfile::TempDir, RepoLayout) {
        let tmp = tempfile::tempdir().unwrap();
        let layout = RepoLayout::new(tmp.path());
        layout.create_dirs().unwrap();
        (tmp, layout)
    }

    #[test]
    fn ref_roundtrip() {
        let (_tmp, layout) = setup();
        let id = content_hash(ObjectKind::Commit, b"test");
        write_ref(&layout, "refs/heads/main", &id).unwrap();
        assert_eq!(read_ref(&layout, "refs/heads/main").unwrap(), Some(id));
    }

    #[test]
    fn list_refs_finds_all() {
        let (_tmp, layout) = setup();
        let id1 = content_hash(ObjectKind::Commit, b"a");
        let id2 = content_hash(ObjectKind::Commit, b"b");
        write_ref(&layout, "refs/heads/main", &id1).unwrap();
        write_ref(&layout, "refs/heads/dev", &id2).unwrap();

        let refs = list_refs(&layout, "refs/heads").unwrap();
        assert_eq!(refs.len(), 2);
        assert_eq!(refs[0].0, "refs/heads/dev");
    }

    #[test]
    fn transaction_creates_missing_ref_from_zero() {
        let (_tmp, layout) = setup();
        let a = content_hash(ObjectKind::Commit, b"a");
        let cmd = RefUpdateCommand::new("refs/heads/main", ObjectId::zero(), a);
        apply_ref_updates(&layout, &[cmd], "alice", "create").unwrap();
        assert_eq!(read_ref(&layout, "refs/heads/main").unwrap(), Some(a));
        assert_eq!(read_reflog(&layout, "refs/heads/main").unwrap().len(), 1);
    }

    #[test]
    fn transaction_accepts_chained_updates() {
        let (_tmp, layout) = setup();
        let a = content_hash(ObjectKind::Commit, b"a");
        let b = content_hash(ObjectKind::Commit, b"b");
        let c = content_hash(ObjectKind::Commit, b"c");
        write_ref(&layout, "refs/heads/main", &a).unwrap();

        let cmds = vec![
            RefUpdateCommand::new("refs/heads/main", a, b),
            RefUpdateCommand::new("refs/heads/main", b, c),
        ];
        apply_ref_updates(&layout, &cmds, "alice", "submit").unwrap();
        assert_eq!(read_ref(&layout, "refs/heads/main").unwrap(), Some(c));
    }

    #[test]
    fn stale_old_id_fails_whole_transaction() {
        let (_tmp, layout) = setup();
        let a = content_hash(ObjectKind::Commit, b"a");
        let b = content_hash(ObjectKind::Commit, b"b");
        let x = content_hash(ObjectKind::Commit, b"x");
        write_ref(&layout, "refs/heads/main", &a).unwrap();

        let cmds = vec![
            RefUpdateCommand::new("refs/heads/dev", ObjectId::zero(), b),
            RefUpdateCommand::new("refs/heads/main", x, b),
        ];
        let err = apply_ref_updates(&layout, &cmds, "alice", "submit").unwrap_err();
        assert!(matches!(err, StoreError::RefCasConflict { .. }));
        assert_eq!(read_ref(&layout, "refs/heads/main").unwrap(), Some(a));
        assert_eq!(read_ref(&layout, "refs/heads/dev").unwrap(), None);
        assert!(!layout.ref_path("refs/heads/main.lock").exists());
    }

    #[test]
    fn failed_write_restores_refs_already_written() {
        let (_tmp, layout) = setup();
        let a = content_hash(ObjectKind::Commit, b"a");
        let b = content_hash(ObjectKind::Commit, b"b");
        let c = content_hash(ObjectKind::Commit, b"c");
        write_ref(&layout, "refs/heads/dev", &a).unwrap();
        // A non-empty directory where `release` should go makes that write fail.
        std::fs::create_dir_all(layout.ref_path("refs/heads/release/blocker")).unwrap();

        let cmds = vec![
            RefUpdateCommand::new("refs/heads/dev", a, b),
            RefUpdateCommand::new("refs/heads/new", ObjectId::zero(), b),
            RefUpdateCommand::new("refs/heads/release", ObjectId::zero(), c),
        ];
        assert!(apply_ref_updates(&layout, &cmds, "alice", "submit").is_err());
        assert_eq!(read_ref(&layout, "refs/heads/dev").unwrap(), Some(a));
        assert_eq!(read_ref(&layout, "refs/heads/new").unwrap(), None);
        assert!(read_reflog(&layout, "refs/heads/dev").unwrap().is_empty());
        assert!(!layout.ref_path("refs/heads/dev.lock").exists());
    }

    #[test]
    fn reflog_failure_does_not_fail_committed_update() {
        let (_tmp, layout) = setup();
        let a = content_hash(ObjectKind::Commit, b"a");
        std::fs::create_dir_all(layout.reflogs_dir().join("refs/heads/main")).unwrap();

        let cmd = RefUpdateCommand::new("refs/heads/main", ObjectId::zero(), a);
        apply_ref_updates(&layout, &[cmd], "alice", "submit").unwrap();
        assert_eq!(read_ref(&layout, "refs/heads/main").unwrap(), Some(a));
    }

    #[test]
    fn held_lock_blocks_transaction() {
        let (_tmp, layout) = setup();
        let a = content_hash(ObjectKind::Commit, b"a");
        let _held = LockFile::acquire(&layout.ref_path("refs/heads/main")).unwrap();
        let cmd = RefUpdateCommand::new("refs/heads/main", ObjectId::zero(), a);
        assert!(matches!(
            apply_ref_updates(&layout, &[cmd], "alice", "submit"),
            Err(StoreError::LockContention(_))
        ));
    }
}
