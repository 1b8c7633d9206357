use clap::{Args, Parser, Subcommand};
use perses::engine::config::{FeType, Phase};
use std::path::PathBuf;

const HELP_TEMPLATE: &str = "\
{before-help}{name} {version}
{author-with-newline}{about-with-newline}
{usage-heading} {usage}

{all-args}{after-help}
";

#[derive(Parser, Debug)]
#[command(
    author = "The perses-rs developers",
    version,
    about = "perses CLI - set up relative alchemical free-energy calculations and propose polymer mutations.",
    help_template = HELP_TEMPLATE,
)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity level (-v for INFO, -vv for DEBUG, -vvv for TRACE)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all log output except for errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Write logs to a specified file in addition to the console output
    #[arg(long, global = true, value_name = "PATH")]
    pub log_file: Option<PathBuf>,

    /// Set the number of threads for parallel computation.
    /// Defaults to the number of available logical cores.
    #[arg(short = 'j', long, global = true, value_name = "NUM")]
    pub threads: Option<usize>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Build a relative free-energy setup from a YAML document and save the artifact.
    Setup(SetupArgs),
    /// Check a YAML setup document and its input files without building anything.
    Validate(ValidateArgs),
    /// Mutate residues of a polymer and grow the new atoms.
    Mutate(MutateArgs),
}

/// Arguments for the `setup` subcommand.
#[derive(Args, Debug)]
pub struct SetupArgs {
    /// Path to the setup document in YAML format.
    #[arg(short, long, required = true, value_name = "PATH")]
    pub config: PathBuf,

    /// Override `save_setup_pickle_as` from the config file.
    #[arg(short, long, value_name = "PATH")]
    pub output: Option<PathBuf>,

    /// Also write the fully resolved setup document to this path.
    #[arg(long, value_name = "PATH")]
    pub write_config: Option<PathBuf>,

    #[command(flatten)]
    pub overrides: SetupOverrides,
}

/// Arguments for the `validate` subcommand.
#[derive(Args, Debug)]
pub struct ValidateArgs {
    /// Path to the setup document in YAML format.
    #[arg(short, long, required = true, value_name = "PATH")]
    pub config: PathBuf,

    /// Only check the document; skip the input files.
    #[arg(long)]
    pub document_only: bool,

    #[command(flatten)]
    pub overrides: SetupOverrides,
}

/// Command line overrides shared by the commands that read a setup document.
#[derive(Args, Debug, Default, Clone)]
pub struct SetupOverrides {
    // --- Thermodynamic state ---
    /// Override the temperature in kelvin.
    #[arg(long, value_name = "KELVIN")]
    pub temperature: Option<f64>,

    /// Override the pressure in atmospheres.
    #[arg(long, value_name = "ATM")]
    pub pressure: Option<f64>,

    // --- Method ---
    /// Override the free-energy method ('nonequilibrium' or 'sams').
    #[arg(long, value_name = "METHOD")]
    pub fe_type: Option<FeType>,

    /// Restrict the run to these phases. Can be used multiple times.
    #[arg(long = "phase", value_name = "PHASE")]
    pub phases: Vec<Phase>,

    /// Build vacuum legs, overriding `solvate` from the config file.
    #[arg(long)]
    pub no_solvate: bool,

    // --- Ligands ---
    /// Override the index of the initial ligand.
    #[arg(long, value_name = "INT")]
    pub old_ligand_index: Option<usize>,

    /// Override the index of the final ligand.
    #[arg(long, value_name = "INT")]
    pub new_ligand_index: Option<usize>,

    /// Set a specific configuration value, overriding the config file.
    /// Can be used multiple times. Example: -S n_states=12
    #[arg(short = 'S', long = "set", value_name = "KEY=VALUE", num_args(0..))]
    pub set_values: Vec<String>,
}

/// Arguments for the `mutate` subcommand.
#[derive(Args, Debug)]
pub struct MutateArgs {
    /// Path to the input structure (PDB).
    #[arg(short, long, required = true, value_name = "PATH")]
    pub input: PathBuf,

    /// Path for the mutated structure (PDB).
    #[arg(short, long, required = true, value_name = "PATH")]
    pub output: PathBuf,

    /// Chain to mutate.
    #[arg(long, default_value_t = 'A', value_name = "ID")]
    pub chain: char,

    /// A mutation such as '99-ALA' or 'L99A'. Repeat to apply several at once.
    #[arg(short, long = "mutation", value_name = "MUTATION", conflicts_with = "library")]
    pub mutations: Vec<String>,

    /// Number of random point mutations when no mutation is given.
    #[arg(long, value_name = "INT")]
    pub max_point_mutants: Option<usize>,

    /// Residue numbers that random mutations may touch. Can be used multiple times.
    #[arg(long = "allow-residue", value_name = "NUMBER")]
    pub allowed_residues: Vec<isize>,

    /// Peptide library sequence in one-letter codes. Can be used multiple times.
    #[arg(long, value_name = "SEQUENCE")]
    pub library: Vec<String>,

    /// Residue template file in TOML format; the built-in amino acids when absent.
    #[arg(long, value_name = "PATH")]
    pub templates: Option<PathBuf>,

    /// Temperature in kelvin for the geometry proposal.
    #[arg(long, value_name = "KELVIN")]
    pub temperature: Option<f64>,

    /// Replace bonds to hydrogen by fixed-length constraints.
    #[arg(long)]
    pub constrain_hydrogens: bool,

    /// Write one CSV row per grown atom to this path.
    #[arg(long, value_name = "PATH")]
    pub placements: Option<PathBuf>,

    /// Seed for the random number generator.
    #[arg(long, value_name = "INT")]
    pub seed: Option<u64>,
}
