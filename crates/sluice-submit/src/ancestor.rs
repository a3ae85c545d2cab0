use std::collections::{HashSet, VecDeque};

use sluice_core::id::ObjectId;
use sluice_store::SluiceRepo;

use crate::SubmitError;

/// True when `ancestor` is reachable from `descendant` through parent links.
/// A commit is its own ancestor.
pub fn is_ancestor(
    repo: &SluiceRepo,
    ancestor: &ObjectId,
    descendant: &ObjectId,
) -> Result<bool, SubmitError> {
    let mut seen: HashSet<ObjectId> = HashSet::new();
    let mut queue: VecDeque<ObjectId> = VecDeque::new();
    seen.insert(*descendant);
    queue.push_back(*descendant);

    while let Some(id) = queue.pop_front() {
        if id == *ancestor {
            return Ok(true);
        }
        let commit = repo.load_commit(&id)?;
        for parent in commit.parents {
            if seen.insert(parent) {
                queue.push_back(parent);
            }
        }
    }
    Ok(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use sluice_core::types::Commit;

    fn commit(repo: &SluiceRepo, parents: Vec<ObjectId>, msg: &str) -> ObjectId {
        repo.store_commit(&Commit {
            parents,
            author: "a".into(),
            message: msg.into(),
            files: Default::default(),
            created_at_ms: 1,
        })
        .unwrap()
    }

    #[test]
    fn walks_parents() {
        let tmp = tempfile::tempdir().unwrap();
        let repo = SluiceRepo::init(tmp.path(), "demo").unwrap();
        let root = commit(&repo, vec![], "root");
        let left = commit(&repo, vec![root], "left");
        let right = commit(&repo, vec![root], "right");
        let merge = commit(&repo, vec![left, right], "merge");

        assert!(is_ancestor(&repo, &root, &merge).unwrap());
        assert!(is_ancestor(&repo, &right, &merge).unwrap());
        assert!(is_ancestor(&repo, &left, &left).unwrap());
        assert!(!is_ancestor(&repo, &left, &right).unwrap());
        assert!(!is_ancestor(&repo, &merge, &root).unwrap());
    }
}
