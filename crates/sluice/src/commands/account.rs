use clap::{Args, Subcommand};

use sluice_core::id::AccountId;
use sluice_core::types::Account;

use crate::config::open_repo;

#[derive(Args)]
pub struct AccountArgs {
    #[command(subcommand)]
    command: AccountCommand,
}

#[derive(Subcommand)]
enum AccountCommand {
    /// Add or replace an account
    Add {
        id: u32,
        #[arg(short, long)]
        name: Option<String>,
        #[arg(short, long)]
        email: Option<String>,
    },
    /// List accounts
    List,
}

pub fn run(args: AccountArgs) -> anyhow::Result<()> {
    let mut repo = open_repo()?;
    match args.command {
        AccountCommand::Add { id, name, email } => {
            let mut config = repo.config().clone();
            config.accounts.retain(|a| a.id != AccountId(id));
            config.accounts.push(Account {
                id: AccountId(id),
                full_name: name,
                email,
            });
            config.accounts.sort_by_key(|a| a.id);
            repo.save_config(config)?;
            println!("Saved account {id}");
        }
        AccountCommand::List => {
            for account in &repo.config().accounts {
                println!(
                    "{} {} {}",
                    account.id,
                    account.full_name.as_deref().unwrap_or("-"),
                    account.email.as_deref().unwrap_or("-")
                );
            }
        }
    }
    Ok(())
}
