pub mod account;
pub mod change;
pub mod commit;
pub mod init;
pub mod review;
pub mod submit;

use clap::Subcommand;

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a new sluice repository
    Init(init::InitArgs),
    /// Manage accounts known to the repository
    Account(account::AccountArgs),
    /// Record a commit
    Commit(commit::CommitArgs),
    /// Manage changes
    Change(change::ChangeArgs),
    /// Vote on a change's current revision
    Review(review::ReviewArgs),
    /// Submit changes onto their branch
    Submit(submit::SubmitArgs),
}

impl Commands {
    pub async fn run(self) -> anyhow::Result<()> {
        match self {
            Commands::Init(args) => init::run(args),
            Commands::Account(args) => account::run(args),
            Commands::Commit(args) => commit::run(args),
            Commands::Change(args) => change::run(args),
            Commands::Review(args) => review::run(args),
            Commands::Submit(args) => submit::run(args).await,
        }
    }
}
