use clap::Args;
use std::path::PathBuf;

use sluice_store::SluiceRepo;

#[derive(Args)]
pub struct InitArgs {
    /// Path to initialize (defaults to current directory)
    #[arg(default_value = ".")]
    path: PathBuf,
    /// Project name (defaults to the directory name)
    #[arg(short, long)]
    project: Option<String>,
}

pub fn run(args: InitArgs) -> anyhow::Result<()> {
    let path = if args.path.is_absolute() {
        args.path
    } else {
        std::env::current_dir()?.join(&args.path)
    };
    let project = match args.project {
        Some(p) => p,
        None => path
            .file_name()
            .and_then(|n| n.to_str())
            .map(str::to_string)
            .ok_or_else(|| anyhow::anyhow!("cannot derive a project name; pass --project"))?,
    };

    std::fs::create_dir_all(&path)?;
    SluiceRepo::init(&path, &project)?;
    println!("Initialized sluice repository for {project} at {}", path.display());
    Ok(())
}
