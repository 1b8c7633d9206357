use crate::core::io::pdb::PdbFile;
use crate::core::io::placements::write_placements_csv;
use crate::core::io::traits::MolecularFile;
use crate::core::models::topology::Topology;
use crate::core::templates::registry::TemplateRegistry;
use crate::engine::config::BOLTZMANN_KJ_PER_MOL_K;
use crate::engine::error::EngineError;
use crate::engine::geometry::{
    FFAllAngleGeometryEngine, GeometryEngine, GeometryProposal, ProposalSystems, ValenceParameters,
};
use crate::engine::progress::ProgressReporter;
use crate::engine::proposal::{
    MutationPolicy, PeptideLibraryEngine, PointMutationEngine, ProposalEngine, TopologyProposal,
};
use rand::Rng;
use std::path::{Path, PathBuf};
use tracing::{debug, info, instrument};

/// How the new chemical state is chosen.
#[derive(Debug, Clone, PartialEq)]
pub enum MoveSet {
    PointMutations(MutationPolicy),
    PeptideLibrary(Vec<String>),
}

#[derive(Debug, Clone)]
pub struct MutateRequest {
    pub structure: PathBuf,
    pub chain_id: char,
    pub moves: MoveSet,
    /// Residue template file; the built-in amino acid set when absent.
    pub templates: Option<PathBuf>,
    /// Kelvin.
    pub temperature: f64,
    pub constrain_hydrogens: bool,
}

#[derive(Debug, Clone)]
pub struct MutationOutcome {
    pub proposal: TopologyProposal,
    pub geometry: GeometryProposal,
    pub logp_reverse: f64,
    /// The new topology with grown positions.
    pub structure: Topology,
}

impl MutationOutcome {
    /// `logp_reverse - logp_forward` of the geometry move.
    pub fn log_geometry_ratio(&self) -> f64 {
        self.logp_reverse - self.geometry.logp
    }
}

/// Mutates a structure and grows the atoms the mutation introduces.
#[instrument(skip_all, name = "mutate_workflow", fields(structure = %request.structure.display()))]
pub fn run<R: Rng + ?Sized>(
    request: &MutateRequest,
    reporter: &ProgressReporter,
    rng: &mut R,
) -> Result<MutationOutcome, EngineError> {
    if !request.temperature.is_finite() || request.temperature <= 0.0 {
        return Err(EngineError::PhaseFailed {
            phase: "Validating Inputs",
            reason: format!("temperature must be positive, got {}", request.temperature),
        });
    }
    let beta = 1.0 / (BOLTZMANN_KJ_PER_MOL_K * request.temperature);

    let (templates, current) = reporter.phase("Reading Structure", || {
        read_structure(&request.structure, request.templates.as_deref())
    })?;

    let proposal = reporter.phase("Proposing Topology", || match &request.moves {
        MoveSet::PointMutations(policy) => {
            let engine = PointMutationEngine::new(request.chain_id, policy.clone(), templates)?;
            propose_topology(&engine, &current, rng)
        }
        MoveSet::PeptideLibrary(library) => {
            let engine = PeptideLibraryEngine::new(request.chain_id, library.clone(), templates)?;
            propose_topology(&engine, &current, rng)
        }
    })?;
    info!(
        old = proposal.old_chemical_state_key(),
        new = proposal.new_chemical_state_key(),
        unique_new = proposal.unique_new_atoms().len(),
        unique_old = proposal.unique_old_atoms().len(),
        "Proposed new chemical state."
    );

    let (old_params, new_params) = reporter.phase("Assigning Parameters", || {
        Ok::<_, EngineError>(valence_parameters(&proposal, request.constrain_hydrogens))
    })?;
    let systems = ProposalSystems {
        old: &old_params,
        new: &new_params,
    };

    let geometry_engine = FFAllAngleGeometryEngine::default();
    let old_positions = proposal.old_topology().positions();
    let (geometry, logp_reverse) = reporter.phase("Growing Atoms", || {
        let geometry = geometry_engine.propose(&proposal, &systems, &old_positions, beta, rng)?;
        let logp_reverse =
            geometry_engine.logp_reverse(&proposal, &systems, &geometry.positions, &old_positions, beta, rng)?;
        Ok::<_, EngineError>((geometry, logp_reverse))
    })?;

    let mut structure = proposal.new_topology().clone();
    structure.set_positions(&geometry.positions)?;

    info!(
        logp_forward = geometry.logp,
        logp_reverse,
        "Mutation complete."
    );
    Ok(MutationOutcome {
        proposal,
        geometry,
        logp_reverse,
        structure,
    })
}

/// Writes the mutated structure and, optionally, the per-atom placement records.
pub fn write_outcome(
    outcome: &MutationOutcome,
    structure_path: &Path,
    placements_path: Option<&Path>,
) -> Result<(), EngineError> {
    PdbFile::write_topology_to_path(&outcome.structure, structure_path)?;
    if let Some(path) = placements_path {
        write_placements_csv(&outcome.geometry.placements, path)?;
    }
    Ok(())
}

fn read_structure(path: &Path, templates: Option<&Path>) -> Result<(TemplateRegistry, Topology), EngineError> {
    if !path.is_file() {
        return Err(EngineError::MissingInput {
            what: "structure",
            path: path.to_path_buf(),
        });
    }
    let templates = TemplateRegistry::load_or_builtin(templates)?;
    let (mut topology, _) = PdbFile::read_from_path(path)?;
    let added = templates.apply_standard_bonds(&mut topology);
    debug!(atoms = topology.n_atoms(), bonds_added = added, "Read structure.");
    Ok((templates, topology))
}

fn propose_topology<E: ProposalEngine, R: Rng + ?Sized>(
    engine: &E,
    current: &Topology,
    rng: &mut R,
) -> Result<TopologyProposal, EngineError> {
    Ok(engine.propose(current, None, rng)?)
}

fn valence_parameters(proposal: &TopologyProposal, constrain_hydrogens: bool) -> (ValenceParameters, ValenceParameters) {
    let mut old = ValenceParameters::generic(proposal.old_topology());
    let mut new = ValenceParameters::generic(proposal.new_topology());
    if constrain_hydrogens {
        let n_old = old.constrain_hydrogen_bonds(proposal.old_topology());
        let n_new = new.constrain_hydrogen_bonds(proposal.new_topology());
        debug!(n_old, n_new, "Constrained bonds to hydrogen.");
    }
    (old, new)
}
