use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;

/// Boltzmann constant in kJ/(mol K).
pub const BOLTZMANN_KJ_PER_MOL_K: f64 = 0.008314462618;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required parameter: {0}")]
    MissingParameter(&'static str),

    #[error("Invalid YAML document: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("File I/O error for '{path}': {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("At least one phase must be requested")]
    NoPhases,

    #[error("Phase '{0}' is listed more than once")]
    DuplicatePhase(Phase),

    #[error("Old and new ligand indices must differ (both are {0})")]
    IdenticalLigandIndices(usize),

    #[error("Parameter '{field}' must be a positive integer")]
    NonPositiveCount { field: &'static str },

    #[error("Parameter '{field}' must be positive and finite (got {value})")]
    NonPositiveValue { field: &'static str, value: f64 },

    #[error("Parameter '{0}' must not be empty")]
    EmptyField(&'static str),

    #[error(
        "Protocol length {steps} must be a multiple of n_steps_per_move_application ({per_move})"
    )]
    ProtocolLength { steps: usize, per_move: usize },
}

/// Free-energy estimation method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeType {
    Nonequilibrium,
    Sams,
}

impl fmt::Display for FeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            FeType::Nonequilibrium => "nonequilibrium",
            FeType::Sams => "sams",
        })
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("Unknown free-energy method '{0}' (expected 'nonequilibrium' or 'sams')")]
pub struct ParseFeTypeError(String);

impl FromStr for FeType {
    type Err = ParseFeTypeError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "nonequilibrium" | "neq" => Ok(FeType::Nonequilibrium),
            "sams" => Ok(FeType::Sams),
            _ => Err(ParseFeTypeError(s.to_string())),
        }
    }
}

/// A simulation leg.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Solvent,
    Complex,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Phase::Solvent => "solvent",
            Phase::Complex => "complex",
        })
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("Unknown phase '{0}' (expected 'solvent' or 'complex')")]
pub struct ParsePhaseError(String);

impl FromStr for Phase {
    type Err = ParsePhaseError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "solvent" => Ok(Phase::Solvent),
            "complex" => Ok(Phase::Complex),
            _ => Err(ParsePhaseError(s.to_string())),
        }
    }
}

fn default_solvate() -> bool {
    true
}

/// Parameters of a relative free-energy calculation between two ligands.
///
/// The YAML form is a flat mapping with one key per field. Physical quantities use the
/// units of the document: atm, K, Angstrom (padding) and fs (timestep).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SetupConfig {
    pub protein_pdb: PathBuf,
    pub ligand_file: PathBuf,
    pub old_ligand_index: usize,
    pub new_ligand_index: usize,
    pub forcefield_files: Vec<String>,
    pub pressure: f64,
    pub temperature: f64,
    pub solvent_padding: f64,
    pub save_setup_pickle_as: PathBuf,
    pub fe_type: FeType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub n_steps_ncmc_protocol: Option<usize>,
    pub n_states: usize,
    pub n_equilibration_iterations: usize,
    pub n_equilibrium_steps_per_iteration: usize,
    pub n_steps_per_move_application: usize,
    pub n_cycles: usize,
    pub n_iterations_per_cycle: usize,
    pub trajectory_directory: PathBuf,
    pub trajectory_prefix: String,
    pub atom_selection: String,
    pub phases: Vec<Phase>,
    pub timestep: f64,
    #[serde(default = "default_solvate")]
    pub solvate: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scheduler_address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub residue_templates: Option<PathBuf>,
}

impl SetupConfig {
    /// Parses and validates a YAML document.
    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        let config: SetupConfig = serde_yaml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_string_lossy().to_string(),
            source: e,
        })?;
        Self::from_yaml(&content)
    }

    pub fn to_yaml(&self) -> Result<String, ConfigError> {
        Ok(serde_yaml::to_string(self)?)
    }

    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let content = self.to_yaml()?;
        std::fs::write(path, content).map_err(|e| ConfigError::Io {
            path: path.to_string_lossy().to_string(),
            source: e,
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.phases.is_empty() {
            return Err(ConfigError::NoPhases);
        }
        for (i, phase) in self.phases.iter().enumerate() {
            if self.phases[..i].contains(phase) {
                return Err(ConfigError::DuplicatePhase(*phase));
            }
        }

        if self.old_ligand_index == self.new_ligand_index {
            return Err(ConfigError::IdenticalLigandIndices(self.old_ligand_index));
        }

        let counts = [
            ("n_states", Some(self.n_states)),
            ("n_equilibration_iterations", Some(self.n_equilibration_iterations)),
            (
                "n_equilibrium_steps_per_iteration",
                Some(self.n_equilibrium_steps_per_iteration),
            ),
            (
                "n_steps_per_move_application",
                Some(self.n_steps_per_move_application),
            ),
            ("n_cycles", Some(self.n_cycles)),
            ("n_iterations_per_cycle", Some(self.n_iterations_per_cycle)),
            ("n_steps_ncmc_protocol", self.n_steps_ncmc_protocol),
        ];
        for (field, value) in counts {
            if value == Some(0) {
                return Err(ConfigError::NonPositiveCount { field });
            }
        }

        let values = [
            ("timestep", self.timestep),
            ("temperature", self.temperature),
            ("pressure", self.pressure),
            ("solvent_padding", self.solvent_padding),
        ];
        for (field, value) in values {
            if !(value.is_finite() && value > 0.0) {
                return Err(ConfigError::NonPositiveValue { field, value });
            }
        }

        if self.forcefield_files.is_empty()
            || self.forcefield_files.iter().any(|f| f.trim().is_empty())
        {
            return Err(ConfigError::EmptyField("forcefield_files"));
        }
        if self.atom_selection.trim().is_empty() {
            return Err(ConfigError::EmptyField("atom_selection"));
        }
        if self.trajectory_prefix.trim().is_empty() {
            return Err(ConfigError::EmptyField("trajectory_prefix"));
        }
        if self.scheduler_address.as_ref().is_some_and(|a| a.trim().is_empty()) {
            return Err(ConfigError::EmptyField("scheduler_address"));
        }

        if let (FeType::Nonequilibrium, Some(steps)) = (self.fe_type, self.n_steps_ncmc_protocol) {
            if steps % self.n_steps_per_move_application != 0 {
                return Err(ConfigError::ProtocolLength {
                    steps,
                    per_move: self.n_steps_per_move_application,
                });
            }
        }

        Ok(())
    }

    /// Inverse thermal energy `1 / (k_B T)` in mol/kJ.
    pub fn beta(&self) -> f64 {
        1.0 / (BOLTZMANN_KJ_PER_MOL_K * self.temperature)
    }

    pub fn timestep_ps(&self) -> f64 {
        self.timestep / 1000.0
    }

    /// Work values recorded per switching protocol, excluding the initial zero.
    pub fn n_work_values_per_iteration(&self) -> Option<usize> {
        self.n_steps_ncmc_protocol
            .map(|steps| steps / self.n_steps_per_move_application)
    }

    pub fn has_phase(&self, phase: Phase) -> bool {
        self.phases.contains(&phase)
    }
}

#[derive(Default)]
pub struct SetupConfigBuilder {
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

impl SetupConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn protein_pdb(mut self, path: PathBuf) -> Self {
        self.protein_pdb = Some(path);
        self
    }
    pub fn ligand_file(mut self, path: PathBuf) -> Self {
        self.ligand_file = Some(path);
        self
    }
    pub fn old_ligand_index(mut self, index: usize) -> Self {
        self.old_ligand_index = Some(index);
        self
    }
    pub fn new_ligand_index(mut self, index: usize) -> Self {
        self.new_ligand_index = Some(index);
        self
    }
    pub fn forcefield_files(mut self, files: Vec<String>) -> Self {
        self.forcefield_files = Some(files);
        self
    }
    pub fn pressure(mut self, atm: f64) -> Self {
        self.pressure = Some(atm);
        self
    }
    pub fn temperature(mut self, kelvin: f64) -> Self {
        self.temperature = Some(kelvin);
        self
    }
    pub fn solvent_padding(mut self, angstroms: f64) -> Self {
        self.solvent_padding = Some(angstroms);
        self
    }
    pub fn save_setup_pickle_as(mut self, path: PathBuf) -> Self {
        self.save_setup_pickle_as = Some(path);
        self
    }
    pub fn fe_type(mut self, fe_type: FeType) -> Self {
        self.fe_type = Some(fe_type);
        self
    }
    pub fn n_steps_ncmc_protocol(mut self, steps: usize) -> Self {
        self.n_steps_ncmc_protocol = Some(steps);
        self
    }
    pub fn n_states(mut self, n: usize) -> Self {
        self.n_states = Some(n);
        self
    }
    pub fn n_equilibration_iterations(mut self, n: usize) -> Self {
        self.n_equilibration_iterations = Some(n);
        self
    }
    pub fn n_equilibrium_steps_per_iteration(mut self, n: usize) -> Self {
        self.n_equilibrium_steps_per_iteration = Some(n);
        self
    }
    pub fn n_steps_per_move_application(mut self, n: usize) -> Self {
        self.n_steps_per_move_application = Some(n);
        self
    }
    pub fn n_cycles(mut self, n: usize) -> Self {
        self.n_cycles = Some(n);
        self
    }
    pub fn n_iterations_per_cycle(mut self, n: usize) -> Self {
        self.n_iterations_per_cycle = Some(n);
        self
    }
    pub fn trajectory_directory(mut self, path: PathBuf) -> Self {
        self.trajectory_directory = Some(path);
        self
    }
    pub fn trajectory_prefix(mut self, prefix: String) -> Self {
        self.trajectory_prefix = Some(prefix);
        self
    }
    pub fn atom_selection(mut self, selection: String) -> Self {
        self.atom_selection = Some(selection);
        self
    }
    pub fn phases(mut self, phases: Vec<Phase>) -> Self {
        self.phases = Some(phases);
        self
    }
    pub fn timestep(mut self, femtoseconds: f64) -> Self {
        self.timestep = Some(femtoseconds);
        self
    }
    pub fn solvate(mut self, solvate: bool) -> Self {
        self.solvate = Some(solvate);
        self
    }
    pub fn scheduler_address(mut self, address: String) -> Self {
        self.scheduler_address = Some(address);
        self
    }
    pub fn residue_templates(mut self, path: PathBuf) -> Self {
        self.residue_templates = Some(path);
        self
    }

    pub fn build(self) -> Result<SetupConfig, ConfigError> {
        let config = SetupConfig {
            protein_pdb: self
                .protein_pdb
                .ok_or(ConfigError::MissingParameter("protein_pdb"))?,
            ligand_file: self
                .ligand_file
                .ok_or(ConfigError::MissingParameter("ligand_file"))?,
            old_ligand_index: self
                .old_ligand_index
                .ok_or(ConfigError::MissingParameter("old_ligand_index"))?,
            new_ligand_index: self
                .new_ligand_index
                .ok_or(ConfigError::MissingParameter("new_ligand_index"))?,
            forcefield_files: self
                .forcefield_files
                .ok_or(ConfigError::MissingParameter("forcefield_files"))?,
            pressure: self
                .pressure
                .ok_or(ConfigError::MissingParameter("pressure"))?,
            temperature: self
                .temperature
                .ok_or(ConfigError::MissingParameter("temperature"))?,
            solvent_padding: self
                .solvent_padding
                .ok_or(ConfigError::MissingParameter("solvent_padding"))?,
            save_setup_pickle_as: self
                .save_setup_pickle_as
                .ok_or(ConfigError::MissingParameter("save_setup_pickle_as"))?,
            fe_type: self
                .fe_type
                .ok_or(ConfigError::MissingParameter("fe_type"))?,
            n_steps_ncmc_protocol: self.n_steps_ncmc_protocol,
            n_states: self
                .n_states
                .ok_or(ConfigError::MissingParameter("n_states"))?,
            n_equilibration_iterations: self
                .n_equilibration_iterations
                .ok_or(ConfigError::MissingParameter("n_equilibration_iterations"))?,
            n_equilibrium_steps_per_iteration: self.n_equilibrium_steps_per_iteration.ok_or(
                ConfigError::MissingParameter("n_equilibrium_steps_per_iteration"),
            )?,
            n_steps_per_move_application: self
                .n_steps_per_move_application
                .ok_or(ConfigError::MissingParameter("n_steps_per_move_application"))?,
            n_cycles: self
                .n_cycles
                .ok_or(ConfigError::MissingParameter("n_cycles"))?,
            n_iterations_per_cycle: self
                .n_iterations_per_cycle
                .ok_or(ConfigError::MissingParameter("n_iterations_per_cycle"))?,
            trajectory_directory: self
                .trajectory_directory
                .ok_or(ConfigError::MissingParameter("trajectory_directory"))?,
            trajectory_prefix: self
                .trajectory_prefix
                .ok_or(ConfigError::MissingParameter("trajectory_prefix"))?,
            atom_selection: self
                .atom_selection
                .ok_or(ConfigError::MissingParameter("atom_selection"))?,
            phases: self
                .phases
                .ok_or(ConfigError::MissingParameter("phases"))?,
            timestep: self
                .timestep
                .ok_or(ConfigError::MissingParameter("timestep"))?,
            solvate: self.solvate.unwrap_or(true),
            scheduler_address: self.scheduler_address,
            residue_templates: self.residue_templates,
        };
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use tempfile::tempdir;

    pub(crate) const CDK2_YAML: &str = r#"
protein_pdb: CDK2_protein.pdb
ligand_file: CDK2_ligands.sdf
old_ligand_index: 14
new_ligand_index: 15
forcefield_files:
    - gaff.xml
    - amber99sbildn.xml
    - tip3p.xml
pressure: 1.0
temperature: 300.0
solvent_padding: 9.0
save_setup_pickle_as: fesetup_hbonds.pkl
fe_type: nonequilibrium
n_steps_ncmc_protocol: 100
n_states: 10
n_equilibration_iterations: 10
n_equilibrium_steps_per_iteration: 100
n_steps_per_move_application: 10
n_cycles: 10
n_iterations_per_cycle: 10
trajectory_directory: cdk2_nonequilibrium
trajectory_prefix: cdk2
atom_selection: not water
phases:
    - solvent
    - complex
timestep: 1.0
"#;

    pub(crate) fn cdk2_config() -> SetupConfig {
        SetupConfig::from_yaml(CDK2_YAML).unwrap()
    }

    #[test]
    fn from_yaml_parses_every_field() {
        let config = cdk2_config();
        assert_eq!(config.protein_pdb, PathBuf::from("CDK2_protein.pdb"));
        assert_eq!(config.old_ligand_index, 14);
        assert_eq!(config.forcefield_files.len(), 3);
        assert_eq!(config.forcefield_files[1], "amber99sbildn.xml");
        assert_eq!(config.fe_type, FeType::Nonequilibrium);
        assert_eq!(config.phases, vec![Phase::Solvent, Phase::Complex]);
        assert_eq!(config.n_steps_ncmc_protocol, Some(100));
        assert!(config.solvate);
        assert!(config.scheduler_address.is_none());
    }

    #[test]
    fn yaml_round_trip_preserves_all_values() {
        let config = cdk2_config();
        let yaml = config.to_yaml().unwrap();
        assert_eq!(SetupConfig::from_yaml(&yaml).unwrap(), config);
        assert!(!yaml.contains("scheduler_address"));
    }

    #[test]
    fn yaml_round_trip_keeps_ambiguous_strings_and_extreme_values() {
        let cases: [(&str, &str, &str, f64); 5] = [
            ("123", "null", "true", f64::MAX),
            ("~", "a: b", "null", f64::MIN_POSITIVE),
            ("true", "~", "123", 1e-300),
            ("a: b", "123", "~", 1e300),
            ("null", "resname 'LIG' and not water", "a: b", 0.1 + 0.2),
        ];
        for (prefix, selection, forcefield, value) in cases {
            let mut config = cdk2_config();
            config.trajectory_prefix = prefix.to_string();
            config.atom_selection = selection.to_string();
            config.forcefield_files = vec![forcefield.to_string(), "tip3p.xml".to_string()];
            config.temperature = value;
            config.pressure = value;
            config.solvent_padding = value;
            config.timestep = value;
            config.validate().unwrap();

            let yaml = config.to_yaml().unwrap();
            let restored = SetupConfig::from_yaml(&yaml)
                .unwrap_or_else(|e| panic!("failed to reload {:?}: {}\n{}", prefix, e, yaml));
            assert_eq!(restored, config, "round trip changed the document:\n{}", yaml);
        }
    }

    #[test]
    fn save_and_load_round_trip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("setup.yaml");
        let mut config = cdk2_config();
        config.solvate = false;
        config.scheduler_address = Some("tcp://127.0.0.1:8786".into());
        config.save(&path).unwrap();
        assert_eq!(SetupConfig::load(&path).unwrap(), config);
    }

    #[test]
    fn load_fails_for_missing_file() {
        let dir = tempdir().unwrap();
        let result = SetupConfig::load(&dir.path().join("missing.yaml"));
        assert!(matches!(result, Err(ConfigError::Io { .. })));
    }

    #[test]
    fn unknown_keys_and_methods_are_rejected() {
        let extra = format!("{}\nmystery_knob: 3\n", CDK2_YAML);
        assert!(matches!(SetupConfig::from_yaml(&extra), Err(ConfigError::Yaml(_))));

        let bad_method = CDK2_YAML.replace("fe_type: nonequilibrium", "fe_type: repex");
        assert!(matches!(SetupConfig::from_yaml(&bad_method), Err(ConfigError::Yaml(_))));

        let bad_phase = CDK2_YAML.replace("- complex", "- vacuum");
        assert!(matches!(SetupConfig::from_yaml(&bad_phase), Err(ConfigError::Yaml(_))));
    }

    #[test]
    fn missing_required_key_is_a_yaml_error() {
        let missing = CDK2_YAML.replace("timestep: 1.0\n", "");
        assert!(matches!(SetupConfig::from_yaml(&missing), Err(ConfigError::Yaml(_))));
    }

    #[test]
    fn validate_rejects_empty_and_duplicate_phases() {
        let mut config = cdk2_config();
        config.phases.clear();
        assert!(matches!(config.validate(), Err(ConfigError::NoPhases)));

        config.phases = vec![Phase::Complex, Phase::Solvent, Phase::Complex];
        assert!(matches!(
            config.validate(),
            Err(ConfigError::DuplicatePhase(Phase::Complex))
        ));
    }

    #[test]
    fn validate_rejects_identical_ligand_indices() {
        let mut config = cdk2_config();
        config.new_ligand_index = config.old_ligand_index;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::IdenticalLigandIndices(14))
        ));
    }

    #[test]
    fn validate_rejects_zero_counts() {
        let mut config = cdk2_config();
        config.n_cycles = 0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::NonPositiveCount { field: "n_cycles" })
        ));

        let mut config = cdk2_config();
        config.n_steps_ncmc_protocol = Some(0);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::NonPositiveCount { field: "n_steps_ncmc_protocol" })
        ));
    }

    #[test]
    fn validate_rejects_non_positive_or_non_finite_values() {
        let mut config = cdk2_config();
        config.timestep = 0.0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::NonPositiveValue { field: "timestep", .. })
        ));

        let mut config = cdk2_config();
        config.temperature = -300.0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::NonPositiveValue { field: "temperature", .. })
        ));

        let mut config = cdk2_config();
        config.solvent_padding = f64::NAN;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::NonPositiveValue { field: "solvent_padding", .. })
        ));
    }

    #[test]
    fn validate_rejects_empty_strings() {
        let mut config = cdk2_config();
        config.forcefield_files.clear();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::EmptyField("forcefield_files"))
        ));

        let mut config = cdk2_config();
        config.atom_selection = "  ".into();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::EmptyField("atom_selection"))
        ));

        let mut config = cdk2_config();
        config.scheduler_address = Some(String::new());
        assert!(matches!(
            config.validate(),
            Err(ConfigError::EmptyField("scheduler_address"))
        ));
    }

    #[test]
    fn validate_requires_whole_number_of_work_intervals() {
        let mut config = cdk2_config();
        config.n_steps_ncmc_protocol = Some(105);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::ProtocolLength { steps: 105, per_move: 10 })
        ));

        config.fe_type = FeType::Sams;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn derived_quantities_use_document_units() {
        let config = cdk2_config();
        assert_relative_eq!(config.beta(), 0.400_908, epsilon = 1e-5);
        assert_relative_eq!(config.timestep_ps(), 0.001);
        assert_eq!(config.n_work_values_per_iteration(), Some(10));
    }

    #[test]
    fn fe_type_and_phase_parse_from_strings() {
        assert_eq!("SAMS".parse::<FeType>().unwrap(), FeType::Sams);
        assert_eq!(" nonequilibrium ".parse::<FeType>().unwrap(), FeType::Nonequilibrium);
        assert!("repex".parse::<FeType>().is_err());
        assert_eq!("complex".parse::<Phase>().unwrap(), Phase::Complex);
        assert_eq!(Phase::Solvent.to_string(), "solvent");
    }

    #[test]
    fn builder_reports_missing_parameters() {
        let result = SetupConfigBuilder::new().temperature(300.0).build();
        assert!(matches!(
            result,
            Err(ConfigError::MissingParameter("protein_pdb"))
        ));
    }

    #[test]
    fn builder_produces_validated_config() {
        let reference = cdk2_config();
        let built = SetupConfigBuilder::new()
            .protein_pdb(reference.protein_pdb.clone())
            .ligand_file(reference.ligand_file.clone())
            .old_ligand_index(14)
            .new_ligand_index(15)
            .forcefield_files(reference.forcefield_files.clone())
            .pressure(1.0)
            .temperature(300.0)
            .solvent_padding(9.0)
            .save_setup_pickle_as(reference.save_setup_pickle_as.clone())
            .fe_type(FeType::Nonequilibrium)
            .n_steps_ncmc_protocol(100)
            .n_states(10)
            .n_equilibration_iterations(10)
            .n_equilibrium_steps_per_iteration(100)
            .n_steps_per_move_application(10)
            .n_cycles(10)
            .n_iterations_per_cycle(10)
            .trajectory_directory(reference.trajectory_directory.clone())
            .trajectory_prefix("cdk2".into())
            .atom_selection("not water".into())
            .phases(vec![Phase::Solvent, Phase::Complex])
            .timestep(1.0)
            .build()
            .unwrap();
        assert_eq!(built, reference);

        let invalid = SetupConfigBuilder::new()
            .protein_pdb("p.pdb".into())
            .ligand_file("l.sdf".into())
            .old_ligand_index(0)
            .new_ligand_index(0);
        assert!(matches!(
            invalid.build(),
            Err(ConfigError::MissingParameter("forcefield_files"))
        ));
    }
}
