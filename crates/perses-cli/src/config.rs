pub mod defaults;

use crate::cli::SetupOverrides;
use crate::error::{CliError, Result};
use defaults::DefaultsConfig;
use perses::engine::config::{FeType, Phase, SetupConfig, SetupConfigBuilder};
use serde::Deserialize;
use std::fmt::Display;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::debug;

/// A setup document as read from disk, before overrides and defaults.
#[derive(Deserialize, Debug, Default, Clone)]
#[serde(deny_unknown_fields)]
pub struct PartialSetupConfig {
    protein_pdb: Option<PathBuf>,
    ligand_file: Option<PathBuf>,
    old_ligand_index: Option<usize>,
    new_ligand_index: Option<usize>,
    forcefield_files: Option<Vec<String>>,
    pressure: Option<f64>,
    temperature: Option<f64>,
    solvent_padding: Option<f64>,
    save_setup_pickle_as: Option<PathBuf>,
    fe_type: Option<FeType>,
    n_steps_ncmc_protocol: Option<usize>,
    n_states: Option<usize>,
    n_equilibration_iterations: Option<usize>,
    n_equilibrium_steps_per_iteration: Option<usize>,
    n_steps_per_move_application: Option<usize>,
    n_cycles: Option<usize>,
    n_iterations_per_cycle: Option<usize>,
    trajectory_directory: Option<PathBuf>,
    trajectory_prefix: Option<String>,
    atom_selection: Option<String>,
    phases: Option<Vec<Phase>>,
    timestep: Option<f64>,
    solvate: Option<bool>,
    scheduler_address: Option<String>,
    residue_templates: Option<PathBuf>,
}

impl PartialSetupConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        debug!("Loading setup document from file: {:?}", path);
        let content = std::fs::read_to_string(path)?;
        serde_yaml::from_str(&content).map_err(|e| CliError::FileParsing {
            path: path.to_path_buf(),
            source: e.into(),
        })
    }

    /// Resolves the final configuration. Command line flags override the document,
    /// `-S KEY=VALUE` pairs override both, and [`DefaultsConfig`] fills what is left.
    pub fn merge_with_cli(mut self, overrides: &SetupOverrides, output: Option<&Path>) -> Result<SetupConfig> {
        self.apply_overrides(overrides, output);
        self.apply_set_values(&overrides.set_values)?;

        let defaults = DefaultsConfig::default();
        let builder = SetupConfigBuilder::new()
            .pressure(self.pressure.unwrap_or(defaults.pressure))
            .temperature(self.temperature.unwrap_or(defaults.temperature))
            .solvent_padding(self.solvent_padding.unwrap_or(defaults.solvent_padding))
            .timestep(self.timestep.unwrap_or(defaults.timestep))
            .phases(self.phases.unwrap_or(defaults.phases))
            .solvate(self.solvate.unwrap_or(defaults.solvate))
            .n_states(self.n_states.unwrap_or(defaults.n_states))
            .n_steps_per_move_application(
                self.n_steps_per_move_application
                    .unwrap_or(defaults.n_steps_per_move_application),
            );

        let builder = with(builder, self.protein_pdb, SetupConfigBuilder::protein_pdb);
        let builder = with(builder, self.ligand_file, SetupConfigBuilder::ligand_file);
        let builder = with(builder, self.old_ligand_index, SetupConfigBuilder::old_ligand_index);
        let builder = with(builder, self.new_ligand_index, SetupConfigBuilder::new_ligand_index);
        let builder = with(builder, self.forcefield_files, SetupConfigBuilder::forcefield_files);
        let builder = with(builder, self.save_setup_pickle_as, SetupConfigBuilder::save_setup_pickle_as);
        let builder = with(builder, self.fe_type, SetupConfigBuilder::fe_type);
        let builder = with(builder, self.n_steps_ncmc_protocol, SetupConfigBuilder::n_steps_ncmc_protocol);
        let builder = with(
            builder,
            self.n_equilibration_iterations,
            SetupConfigBuilder::n_equilibration_iterations,
        );
        let builder = with(
            builder,
            self.n_equilibrium_steps_per_iteration,
            SetupConfigBuilder::n_equilibrium_steps_per_iteration,
        );
        let builder = with(builder, self.n_cycles, SetupConfigBuilder::n_cycles);
        let builder = with(builder, self.n_iterations_per_cycle, SetupConfigBuilder::n_iterations_per_cycle);
        let builder = with(builder, self.trajectory_directory, SetupConfigBuilder::trajectory_directory);
        let builder = with(builder, self.trajectory_prefix, SetupConfigBuilder::trajectory_prefix);
        let builder = with(builder, self.atom_selection, SetupConfigBuilder::atom_selection);
        let builder = with(builder, self.scheduler_address, SetupConfigBuilder::scheduler_address);
        let builder = with(builder, self.residue_templates, SetupConfigBuilder::residue_templates);

        Ok(builder.build()?)
    }

    fn apply_overrides(&mut self, overrides: &SetupOverrides, output: Option<&Path>) {
        if let Some(temperature) = overrides.temperature {
            self.temperature = Some(temperature);
        }
        if let Some(pressure) = overrides.pressure {
            self.pressure = Some(pressure);
        }
        if let Some(fe_type) = overrides.fe_type {
            self.fe_type = Some(fe_type);
        }
        if !overrides.phases.is_empty() {
            self.phases = Some(overrides.phases.clone());
        }
        if overrides.no_solvate {
            self.solvate = Some(false);
        }
        if let Some(index) = overrides.old_ligand_index {
            self.old_ligand_index = Some(index);
        }
        if let Some(index) = overrides.new_ligand_index {
            self.new_ligand_index = Some(index);
        }
        if let Some(path) = output {
            self.save_setup_pickle_as = Some(path.to_path_buf());
        }
    }

    fn apply_set_values(&mut self, set_values: &[String]) -> Result<()> {
        for kv_pair in set_values {
            let Some((key, value)) = kv_pair.split_once('=') else {
                return Err(CliError::Config(format!(
                    "Invalid --set format: '{}'. Expected KEY=VALUE.",
                    kv_pair
                )));
            };
            let (key, value) = (key.trim(), value.trim());

            match key {
                "protein_pdb" => self.protein_pdb = Some(parse_value(key, value)?),
                "ligand_file" => self.ligand_file = Some(parse_value(key, value)?),
                "old_ligand_index" => self.old_ligand_index = Some(parse_value(key, value)?),
                "new_ligand_index" => self.new_ligand_index = Some(parse_value(key, value)?),
                "forcefield_files" => self.forcefield_files = Some(parse_list(key, value)?),
                "pressure" => self.pressure = Some(parse_value(key, value)?),
                "temperature" => self.temperature = Some(parse_value(key, value)?),
                "solvent_padding" => self.solvent_padding = Some(parse_value(key, value)?),
                "save_setup_pickle_as" => self.save_setup_pickle_as = Some(parse_value(key, value)?),
                "fe_type" => self.fe_type = Some(parse_value(key, value)?),
                "n_steps_ncmc_protocol" => self.n_steps_ncmc_protocol = Some(parse_value(key, value)?),
                "n_states" => self.n_states = Some(parse_value(key, value)?),
                "n_equilibration_iterations" => {
                    self.n_equilibration_iterations = Some(parse_value(key, value)?)
                }
                "n_equilibrium_steps_per_iteration" => {
                    self.n_equilibrium_steps_per_iteration = Some(parse_value(key, value)?)
                }
                "n_steps_per_move_application" => {
                    self.n_steps_per_move_application = Some(parse_value(key, value)?)
                }
                "n_cycles" => self.n_cycles = Some(parse_value(key, value)?),
                "n_iterations_per_cycle" => self.n_iterations_per_cycle = Some(parse_value(key, value)?),
                "trajectory_directory" => self.trajectory_directory = Some(parse_value(key, value)?),
                "trajectory_prefix" => self.trajectory_prefix = Some(value.to_string()),
                "atom_selection" => self.atom_selection = Some(value.to_string()),
                "phases" => self.phases = Some(parse_list(key, value)?),
                "timestep" => self.timestep = Some(parse_value(key, value)?),
                "solvate" => self.solvate = Some(parse_value(key, value)?),
                "scheduler_address" => self.scheduler_address = Some(value.to_string()),
                "residue_templates" => self.residue_templates = Some(parse_value(key, value)?),
                _ => {
                    return Err(CliError::Config(format!(
                        "Unsupported configuration key for --set: '{}'",
                        key
                    )));
                }
            }
            debug!(key, value, "Applied --set override.");
        }
        Ok(())
    }
}

fn with<T>(
    builder: SetupConfigBuilder,
    value: Option<T>,
    set: fn(SetupConfigBuilder, T) -> SetupConfigBuilder,
) -> SetupConfigBuilder {
    match value {
        Some(value) => set(builder, value),
        None => builder,
    }
}

fn parse_value<T>(key: &str, value: &str) -> Result<T>
where
    T: FromStr,
    T::Err: Display,
{
    value
        .parse()
        .map_err(|e| CliError::Config(format!("Invalid value for {}: '{}' ({})", key, value, e)))
}

/// Comma-separated list; empty items are dropped.
fn parse_list<T>(key: &str, value: &str) -> Result<Vec<T>>
where
    T: FromStr,
    T::Err: Display,
{
    value
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(|item| parse_value(key, item))
        .collect()
}
