use crate::core::io::ligand::{LigandEntry, read_ligand_entries};
use crate::core::io::pdb::PdbFile;
use crate::core::io::traits::MolecularFile;
use crate::engine::config::{FeType, Phase, SetupConfig};
use crate::engine::error::EngineError;
use crate::engine::progress::ProgressReporter;
use crate::engine::schedule::{
    AlchemicalSchedule, DEFAULT_SWITCHING_STEPS, Protocol, SamsSchedule, ScheduleError,
    SwitchingProtocol, SwitchingSchedule,
};
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{MAIN_SEPARATOR, Path, PathBuf};
use tracing::{debug, info, instrument};

/// Size of the receptor read for the complex phase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceptorSummary {
    pub path: PathBuf,
    pub n_atoms: usize,
    pub n_residues: usize,
    pub n_chains: usize,
}

/// One leg of the calculation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhaseSetup {
    pub phase: Phase,
    pub solvated: bool,
    /// Trajectory path without extension: `<directory>/<prefix>_<phase>`.
    pub trajectory_stem: PathBuf,
    /// Receptor atoms present in this leg (complex phase only).
    pub receptor_atoms: Option<usize>,
    /// Solvent padding in nm, when the leg is solvated.
    pub solvent_padding_nm: Option<f64>,
}

/// The prepared relative free-energy calculation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelativeSetup {
    #[serde(with = "yaml_document")]
    pub config: SetupConfig,
    pub old_ligand: LigandEntry,
    pub new_ligand: LigandEntry,
    pub receptor: Option<ReceptorSummary>,
    pub phases: Vec<PhaseSetup>,
    pub lambda_schedule: AlchemicalSchedule,
    pub protocol: Protocol,
}

impl RelativeSetup {
    pub fn phase(&self, phase: Phase) -> Option<&PhaseSetup> {
        self.phases.iter().find(|leg| leg.phase == phase)
    }

    /// Writes the setup as a binary artifact.
    pub fn save(&self, path: &Path) -> Result<(), EngineError> {
        let io_error = |source| EngineError::Io {
            path: path.to_string_lossy().to_string(),
            source,
        };
        let file = File::create(path).map_err(io_error)?;
        let mut writer = BufWriter::new(file);
        bincode::serialize_into(&mut writer, self).map_err(|source| EngineError::Serialization {
            path: path.to_string_lossy().to_string(),
            source,
        })?;
        writer.flush().map_err(io_error)?;
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self, EngineError> {
        let file = File::open(path).map_err(|source| EngineError::Io {
            path: path.to_string_lossy().to_string(),
            source,
        })?;
        bincode::deserialize_from(BufReader::new(file)).map_err(|source| EngineError::Serialization {
            path: path.to_string_lossy().to_string(),
            source,
        })
    }
}

/// The configuration is stored as its YAML document so that optional keys survive the
/// binary encoding.
mod yaml_document {
    use super::SetupConfig;
    use serde::{Deserialize, Deserializer, Serializer, de, ser};

    pub fn serialize<S: Serializer>(config: &SetupConfig, serializer: S) -> Result<S::Ok, S::Error> {
        let text = config.to_yaml().map_err(ser::Error::custom)?;
        serializer.serialize_str(&text)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<SetupConfig, D::Error> {
        let text = String::deserialize(deserializer)?;
        SetupConfig::from_yaml(&text).map_err(de::Error::custom)
    }
}

#[instrument(skip_all, name = "setup_workflow")]
pub fn run(config: &SetupConfig, reporter: &ProgressReporter) -> Result<RelativeSetup, EngineError> {
    info!(fe_type = %config.fe_type, phases = config.phases.len(), "Starting relative setup.");

    // === Phase 1: Validation ===
    reporter.phase("Validating Inputs", || validate_inputs(config))?;

    // === Phase 2: Ligands ===
    let (old_ligand, new_ligand) = reporter.phase("Reading Ligands", || select_ligands(config))?;
    info!(old = %old_ligand.title, new = %new_ligand.title, "Selected alchemical end states.");

    // === Phase 3: Receptor ===
    let receptor = if config.has_phase(Phase::Complex) {
        Some(reporter.phase("Reading Receptor", || read_receptor(&config.protein_pdb))?)
    } else {
        debug!("No complex phase requested; skipping receptor.");
        None
    };

    // === Phase 4: Phase legs ===
    let phases = reporter.phase("Preparing Phases", || {
        Ok::<_, EngineError>(
            config
                .phases
                .iter()
                .map(|&phase| phase_setup(config, phase, receptor.as_ref()))
                .collect::<Vec<_>>(),
        )
    })?;

    // === Phase 5: Schedules ===
    let (lambda_schedule, protocol) = reporter.phase("Building Schedules", || build_schedules(config))?;

    info!(
        n_states = lambda_schedule.n_states(),
        legs = phases.len(),
        "Relative setup complete."
    );
    Ok(RelativeSetup {
        config: config.clone(),
        old_ligand,
        new_ligand,
        receptor,
        phases,
        lambda_schedule,
        protocol,
    })
}

/// Runs the setup, creates the trajectory directory and writes the artifact to
/// `save_setup_pickle_as`.
pub fn run_and_save(config: &SetupConfig, reporter: &ProgressReporter) -> Result<RelativeSetup, EngineError> {
    let setup = run(config, reporter)?;
    fs::create_dir_all(&config.trajectory_directory).map_err(|source| EngineError::Io {
        path: config.trajectory_directory.to_string_lossy().to_string(),
        source,
    })?;
    setup.save(&config.save_setup_pickle_as)?;
    info!(path = %config.save_setup_pickle_as.display(), "Setup artifact written.");
    Ok(setup)
}

/// Checks the document and its input files without building anything; returns the
/// selected ligands.
pub fn preflight(config: &SetupConfig) -> Result<(LigandEntry, LigandEntry), EngineError> {
    validate_inputs(config)?;
    select_ligands(config)
}

fn validate_inputs(config: &SetupConfig) -> Result<(), EngineError> {
    config.validate()?;
    require_file("protein PDB", &config.protein_pdb)?;
    require_file("ligand file", &config.ligand_file)?;
    if let Some(templates) = &config.residue_templates {
        require_file("residue templates", templates)?;
    }

    for entry in &config.forcefield_files {
        if looks_like_path(entry) {
            require_file("force-field file", Path::new(entry))?;
        } else {
            debug!(forcefield = %entry, "Treating force-field entry as a named source.");
        }
    }
    Ok(())
}

/// Entries with a directory component refer to files; bare names refer to force fields
/// resolved by the simulation toolkit.
fn looks_like_path(entry: &str) -> bool {
    entry.contains('/') || entry.contains(MAIN_SEPARATOR)
}

fn require_file(what: &'static str, path: &Path) -> Result<(), EngineError> {
    if path.is_file() {
        Ok(())
    } else {
        Err(EngineError::MissingInput {
            what,
            path: path.to_path_buf(),
        })
    }
}

fn select_ligands(config: &SetupConfig) -> Result<(LigandEntry, LigandEntry), EngineError> {
    let entries = read_ligand_entries(&config.ligand_file)?;
    let count = entries.len();
    debug!(count, "Read ligand file.");

    let pick = |index: usize| {
        entries
            .get(index)
            .cloned()
            .ok_or(EngineError::LigandIndexOutOfRange { index, count })
    };
    Ok((pick(config.old_ligand_index)?, pick(config.new_ligand_index)?))
}

fn read_receptor(path: &Path) -> Result<ReceptorSummary, EngineError> {
    let (topology, _) = PdbFile::read_from_path(path)?;
    Ok(ReceptorSummary {
        path: path.to_path_buf(),
        n_atoms: topology.n_atoms(),
        n_residues: topology.n_residues(),
        n_chains: topology.n_chains(),
    })
}

fn phase_setup(config: &SetupConfig, phase: Phase, receptor: Option<&ReceptorSummary>) -> PhaseSetup {
    let stem = format!("{}_{}", config.trajectory_prefix, phase);
    PhaseSetup {
        phase,
        solvated: config.solvate,
        trajectory_stem: config.trajectory_directory.join(stem),
        receptor_atoms: match phase {
            Phase::Complex => receptor.map(|r| r.n_atoms),
            Phase::Solvent => None,
        },
        solvent_padding_nm: config.solvate.then_some(config.solvent_padding / 10.0),
    }
}

fn build_schedules(config: &SetupConfig) -> Result<(AlchemicalSchedule, Protocol), EngineError> {
    let lambda_schedule = AlchemicalSchedule::linear(config.n_states)?;
    let protocol = match config.fe_type {
        FeType::Sams => {
            let schedule = SamsSchedule {
                n_equilibration_iterations: config.n_equilibration_iterations,
                n_production_iterations: config
                    .n_cycles
                    .checked_mul(config.n_iterations_per_cycle)
                    .ok_or(ScheduleError::CountOverflow { what: "SAMS production iteration" })?,
                steps_per_iteration: config.n_equilibrium_steps_per_iteration,
                n_states: config.n_states,
            };
            schedule.total_steps()?;
            Protocol::Sams(schedule)
        }
        FeType::Nonequilibrium => {
            let per_move = config.n_steps_per_move_application;
            let n_steps = config
                .n_steps_ncmc_protocol
                .unwrap_or_else(|| DEFAULT_SWITCHING_STEPS.div_ceil(per_move) * per_move);
            let schedule = SwitchingSchedule {
                protocol: SwitchingProtocol::new(n_steps, per_move)?,
                n_equilibration_iterations: config.n_equilibration_iterations,
                n_equilibrium_steps_per_iteration: config.n_equilibrium_steps_per_iteration,
                n_cycles: config.n_cycles,
                n_iterations_per_cycle: config.n_iterations_per_cycle,
            };
            schedule.switching_steps_per_cycle()?;
            Protocol::Nonequilibrium(schedule)
        }
    };
    Ok((lambda_schedule, protocol))
}
