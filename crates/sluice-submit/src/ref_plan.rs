use tracing::debug;

use sluice_core::id::{ObjectId, SubmissionId};
use sluice_core::types::{BranchName, RefUpdateCommand};
use sluice_store::SluiceRepo;

use crate::SubmitError;

/// Turns the tip observed around one strategy run into a ref update.
///
/// Returns `None` when the tip did not move. Updates of the project
/// configuration ref are only accepted if the new commit holds a valid
/// configuration.
pub fn plan_ref_update(
    repo: &SluiceRepo,
    submission: SubmissionId,
    dest: &BranchName,
    before: Option<ObjectId>,
    after: Option<ObjectId>,
) -> Result<Option<RefUpdateCommand>, SubmitError> {
    if before == after {
        return Ok(None);
    }
    let Some(new_id) = after else {
        debug!(%submission, branch = %dest, "tip became absent; no ref update");
        return Ok(None);
    };
    if dest.is_config() {
        check_project_config(repo, dest, &new_id)?;
    }
    let command = RefUpdateCommand::new(
        dest.ref_name.clone(),
        before.unwrap_or_else(ObjectId::zero),
        new_id,
    );
    debug!(%submission, %command, "staged ref update");
    Ok(Some(command))
}

fn check_project_config(
    repo: &SluiceRepo,
    dest: &BranchName,
    commit: &ObjectId,
) -> Result<(), SubmitError> {
    repo.load_project_config(commit)
        .map(|_| ())
        .map_err(|e| SubmitError::Integration {
            message: format!(
                "Submit would store invalid project configuration {commit} for {}",
                dest.project
            ),
            source: Some(e),
        })
}
