use crate::cli::ValidateArgs;
use crate::config::PartialSetupConfig;
use crate::error::Result;
use perses::workflows;
use tracing::info;

pub async fn run(args: ValidateArgs) -> Result<()> {
    let partial_config = PartialSetupConfig::from_file(&args.config)?;
    let config = partial_config.merge_with_cli(&args.overrides, None)?;
    println!("✓ Setup document is valid: {}", args.config.display());

    if args.document_only {
        info!("Skipping input file checks.");
        return Ok(());
    }

    let (old, new) = tokio::task::block_in_place(|| workflows::setup::preflight(&config))?;
    println!(
        "✓ Inputs found; ligand {} is '{}', ligand {} is '{}'",
        old.index, old.title, new.index, new.title
    );
    Ok(())
}
