use crate::cli::SetupArgs;
use crate::config::PartialSetupConfig;
use crate::error::Result;
use crate::utils::progress::CliProgressHandler;
use perses::engine::error::EngineError;
use perses::engine::progress::ProgressReporter;
use perses::engine::schedule::Protocol;
use perses::workflows;
use tracing::info;

pub async fn run(args: SetupArgs) -> Result<()> {
    let partial_config = PartialSetupConfig::from_file(&args.config)?;
    info!("Merging setup document and command line overrides...");
    let config = partial_config.merge_with_cli(&args.overrides, args.output.as_deref())?;

    if let Some(path) = &args.write_config {
        config.save(path)?;
        info!("Resolved setup document written to {:?}", path);
    }

    let progress_handler = CliProgressHandler::new();
    let reporter = ProgressReporter::with_callback(progress_handler.get_callback());

    println!(
        "Setting up {} calculation for ligands {} -> {}...",
        config.fe_type, config.old_ligand_index, config.new_ligand_index
    );
    let setup = tokio::task::block_in_place(|| workflows::setup::run_and_save(&config, &reporter))?;

    println!(
        "✓ {} -> {} ({} phase(s), {} lambda states)",
        setup.old_ligand.title,
        setup.new_ligand.title,
        setup.phases.len(),
        setup.lambda_schedule.n_states()
    );
    match &setup.protocol {
        Protocol::Nonequilibrium(schedule) => println!(
            "  Switching protocol: {} steps, {} work values per switch",
            schedule.protocol.n_steps,
            schedule.protocol.n_work_values()
        ),
        Protocol::Sams(schedule) => println!(
            "  SAMS: {} iterations of {} steps",
            schedule.total_iterations().map_err(EngineError::from)?,
            schedule.steps_per_iteration
        ),
    }
    println!("Setup artifact written to: {}", config.save_setup_pickle_as.display());
    Ok(())
}
