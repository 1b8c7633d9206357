use super::GeometryError;
use super::coordinates::{
    InternalCoordinates, cartesian_to_internal, internal_to_cartesian, log_jacobian, torsion_scan,
};
use super::energy::{GrowthEnergy, ValenceGrowthEnergy};
use super::order::{ProposalOrder, TorsionPath};
use super::pmf::{ANGLE_DIVISIONS, BOND_DIVISIONS, DiscretePmf, TORSION_DIVISIONS};
use super::valence::ValenceParameters;
use crate::core::io::placements::PlacementRecord;
use crate::core::models::topology::Topology;
use crate::engine::proposal::TopologyProposal;
use nalgebra::Point3;
use rand::Rng;
use rayon::prelude::*;
use tracing::{debug, info, instrument, trace};

/// Valence parameters of both end states of a proposal.
#[derive(Debug, Clone, Copy)]
pub struct ProposalSystems<'a> {
    pub old: &'a ValenceParameters,
    pub new: &'a ValenceParameters,
}

/// New positions and the log-probability of having proposed them.
#[derive(Debug, Clone, PartialEq)]
pub struct GeometryProposal {
    pub positions: Vec<Point3<f64>>,
    /// Total log-probability, `logp_choice` plus every placement.
    pub logp: f64,
    /// Log-probability of the growth order and torsion choices.
    pub logp_choice: f64,
    pub placements: Vec<PlacementRecord>,
}

/// Proposes positions for the atoms a topology proposal creates.
pub trait GeometryEngine {
    /// Grows the unique new atoms of `proposal` on top of `old_positions`.
    fn propose<R: Rng + ?Sized>(
        &self,
        proposal: &TopologyProposal,
        systems: &ProposalSystems,
        old_positions: &[Point3<f64>],
        beta: f64,
        rng: &mut R,
    ) -> Result<GeometryProposal, GeometryError>;

    /// Log-probability of the reverse move proposing the unique old atoms at
    /// `old_positions`.
    fn logp_reverse<R: Rng + ?Sized>(
        &self,
        proposal: &TopologyProposal,
        systems: &ProposalSystems,
        new_positions: &[Point3<f64>],
        old_positions: &[Point3<f64>],
        beta: f64,
        rng: &mut R,
    ) -> Result<f64, GeometryError>;
}

/// Geometry engine drawing every bond length, angle and torsion of a grown atom.
///
/// Softening constants scale the force constants of the bond and angle distributions;
/// values below one widen them.
#[derive(Debug, Clone, PartialEq)]
pub struct FFAllAngleGeometryEngine {
    pub bond_softening_constant: f64,
    pub angle_softening_constant: f64,
    pub bond_divisions: usize,
    pub angle_divisions: usize,
    pub torsion_divisions: usize,
}

impl Default for FFAllAngleGeometryEngine {
    fn default() -> Self {
        Self {
            bond_softening_constant: 1.0,
            angle_softening_constant: 1.0,
            bond_divisions: BOND_DIVISIONS,
            angle_divisions: ANGLE_DIVISIONS,
            torsion_divisions: TORSION_DIVISIONS,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Propose,
    Evaluate,
}

struct Growth<'a> {
    topology: &'a Topology,
    params: &'a ValenceParameters,
    atoms: &'a [usize],
    positioned: Vec<usize>,
    positions: Vec<Point3<f64>>,
}

impl FFAllAngleGeometryEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_softening(mut self, bond: f64, angle: f64) -> Self {
        self.bond_softening_constant = bond;
        self.angle_softening_constant = angle;
        self
    }

    /// Like [`GeometryEngine::logp_reverse`], but returns the placement of every unique
    /// old atom alongside the total.
    #[instrument(skip_all, name = "geometry_reverse", fields(n_unique_old = proposal.unique_old_atoms().len()))]
    pub fn reverse_placements<R: Rng + ?Sized>(
        &self,
        proposal: &TopologyProposal,
        systems: &ProposalSystems,
        new_positions: &[Point3<f64>],
        old_positions: &[Point3<f64>],
        beta: f64,
        rng: &mut R,
    ) -> Result<GeometryProposal, GeometryError> {
        check_count(proposal.n_atoms_new(), new_positions.len())?;
        check_count(proposal.n_atoms_old(), old_positions.len())?;
        check_parameters(proposal.n_atoms_old(), systems.old)?;

        if proposal.unique_old_atoms().is_empty() {
            debug!("No unique old atoms; reverse log-probability is zero");
            return Ok(GeometryProposal {
                positions: old_positions.to_vec(),
                logp: 0.0,
                logp_choice: 0.0,
                placements: Vec::new(),
            });
        }

        let mut positions = old_positions.to_vec();
        for (&old, &new) in proposal.old_to_new_atom_map() {
            positions[old] = new_positions[new];
        }

        let growth = Growth {
            topology: proposal.old_topology(),
            params: systems.old,
            atoms: proposal.unique_old_atoms(),
            positioned: proposal.old_to_new_atom_map().keys().copied().collect(),
            positions,
        };
        self.grow(growth, Mode::Evaluate, beta, rng)
    }

    fn grow<R: Rng + ?Sized>(
        &self,
        growth: Growth<'_>,
        mode: Mode,
        beta: f64,
        rng: &mut R,
    ) -> Result<GeometryProposal, GeometryError> {
        let Growth {
            topology,
            params,
            atoms,
            positioned,
            mut positions,
        } = growth;

        let order = ProposalOrder::determine(topology, atoms, positioned.iter().copied(), rng)?;
        let energy = ValenceGrowthEnergy::new(params);
        let mut placed = vec![false; positions.len()];
        for &i in &positioned {
            placed[i] = true;
        }

        let mut placements = Vec::with_capacity(order.torsions.len());
        let mut logp = order.logp_choice;
        for path in &order.torsions {
            let (record, xyz) = self.place_atom(path, params, &energy, &positions, &placed, mode, beta, rng)?;
            trace!(atom = path.atom, logp = record.logp(), "Placed atom");
            logp += record.logp();
            positions[path.atom] = xyz;
            placed[path.atom] = true;
            placements.push(record);
        }

        info!(
            atoms = placements.len(),
            logp,
            logp_choice = order.logp_choice,
            "Geometry {} complete",
            match mode {
                Mode::Propose => "proposal",
                Mode::Evaluate => "evaluation",
            }
        );
        Ok(GeometryProposal {
            positions,
            logp,
            logp_choice: order.logp_choice,
            placements,
        })
    }

    #[allow(clippy::too_many_arguments)]
    fn place_atom<R: Rng + ?Sized>(
        &self,
        path: &TorsionPath,
        params: &ValenceParameters,
        energy: &impl GrowthEnergy,
        positions: &[Point3<f64>],
        placed: &[bool],
        mode: Mode,
        beta: f64,
        rng: &mut R,
    ) -> Result<(PlacementRecord, Point3<f64>), GeometryError> {
        let &TorsionPath { atom, bond, angle, torsion } = path;
        let (bond_xyz, angle_xyz, torsion_xyz) = (positions[bond], positions[angle], positions[torsion]);
        let linear = || GeometryError::LinearReference {
            atom,
            atoms: [bond, angle, torsion],
        };
        let current = match mode {
            Mode::Propose => None,
            Mode::Evaluate => Some(cartesian_to_internal(&positions[atom], &bond_xyz, &angle_xyz, &torsion_xyz)),
        };

        // --- Bond length ---
        let (r, logp_r) = match (params.bond(atom, bond), params.constraint(atom, bond)) {
            (Some(term), _) => {
                let pmf = DiscretePmf::bond(
                    term.length,
                    term.k * self.bond_softening_constant,
                    beta,
                    self.bond_divisions,
                )?;
                match current {
                    Some(ic) => (ic.r, pmf.log_density(ic.r)),
                    None => pmf.sample(rng)?,
                }
            }
            (None, Some(constraint)) => (current.map_or(constraint.length, |ic| ic.r), 0.0),
            (None, None) => {
                return Err(GeometryError::NoBondOrConstraint { atom, partner: bond });
            }
        };

        // --- Bond angle ---
        let term = params
            .angle(atom, bond, angle)
            .ok_or(GeometryError::MissingAngle { atoms: [atom, bond, angle] })?;
        let pmf = DiscretePmf::angle(
            term.angle,
            term.k * self.angle_softening_constant,
            beta,
            self.angle_divisions,
        )?;
        let (theta, logp_theta) = match current {
            Some(ic) => (ic.theta, pmf.log_density(ic.theta)),
            None => pmf.sample(rng)?,
        };

        // --- Torsion ---
        let phis = DiscretePmf::torsion_grid(self.torsion_divisions);
        let candidates = torsion_scan(&bond_xyz, &angle_xyz, &torsion_xyz, r, theta, &phis).ok_or_else(linear)?;
        let log_q: Vec<f64> = candidates
            .par_iter()
            .map(|xyz| -beta * energy.trial_energy(atom, xyz, positions, placed))
            .collect();
        let pmf = DiscretePmf::torsion(&log_q, atom)?;
        let (phi, logp_phi, xyz) = match current {
            Some(ic) => (ic.phi, pmf.nearest_bin_log_density(ic.phi), positions[atom]),
            None => {
                let (phi, logp_phi) = pmf.sample(rng)?;
                let ic = InternalCoordinates { r, theta, phi };
                let xyz = internal_to_cartesian(&bond_xyz, &angle_xyz, &torsion_xyz, &ic).ok_or_else(linear)?;
                (phi, logp_phi, xyz)
            }
        };

        let record = PlacementRecord {
            atom_index: atom,
            r,
            theta,
            phi,
            logp_r,
            logp_theta,
            logp_phi,
            log_detj: log_jacobian(r, theta),
        };
        Ok((record, xyz))
    }
}

impl GeometryEngine for FFAllAngleGeometryEngine {
    #[instrument(skip_all, name = "geometry_propose", fields(n_unique_new = proposal.unique_new_atoms().len()))]
    fn propose<R: Rng + ?Sized>(
        &self,
        proposal: &TopologyProposal,
        systems: &ProposalSystems,
        old_positions: &[Point3<f64>],
        beta: f64,
        rng: &mut R,
    ) -> Result<GeometryProposal, GeometryError> {
        check_count(proposal.n_atoms_old(), old_positions.len())?;
        check_parameters(proposal.n_atoms_new(), systems.new)?;

        let mut positions = vec![Point3::origin(); proposal.n_atoms_new()];
        for (&new, &old) in proposal.new_to_old_atom_map() {
            positions[new] = old_positions[old];
        }

        if proposal.unique_new_atoms().is_empty() {
            debug!("No unique new atoms; copying positions");
            return Ok(GeometryProposal {
                positions,
                logp: 0.0,
                logp_choice: 0.0,
                placements: Vec::new(),
            });
        }

        let growth = Growth {
            topology: proposal.new_topology(),
            params: systems.new,
            atoms: proposal.unique_new_atoms(),
            positioned: proposal.new_to_old_atom_map().keys().copied().collect(),
            positions,
        };
        self.grow(growth, Mode::Propose, beta, rng)
    }

    fn logp_reverse<R: Rng + ?Sized>(
        &self,
        proposal: &TopologyProposal,
        systems: &ProposalSystems,
        new_positions: &[Point3<f64>],
        old_positions: &[Point3<f64>],
        beta: f64,
        rng: &mut R,
    ) -> Result<f64, GeometryError> {
        self.reverse_placements(proposal, systems, new_positions, old_positions, beta, rng)
            .map(|reverse| reverse.logp)
    }
}

fn check_count(expected: usize, found: usize) -> Result<(), GeometryError> {
    if expected != found {
        return Err(GeometryError::PositionCount { expected, found });
    }
    Ok(())
}

fn check_parameters(expected: usize, params: &ValenceParameters) -> Result<(), GeometryError> {
    if params.n_atoms() != expected {
        return Err(GeometryError::ParameterCount {
            expected,
            found: params.n_atoms(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::templates::registry::TemplateRegistry;
    use crate::engine::config::BOLTZMANN_KJ_PER_MOL_K;
    use crate::engine::proposal::polymer::tests::tripeptide;
    use crate::engine::proposal::polymer::{PolymerMutator, ResidueMap};
    use crate::engine::proposal::ProposalMetadata;
    use approx::assert_relative_eq;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn beta() -> f64 {
        1.0 / (BOLTZMANN_KJ_PER_MOL_K * 300.0)
    }

    fn mutate(current: &Topology, name: &str) -> TopologyProposal {
        let templates = TemplateRegistry::amino_acids().unwrap();
        PolymerMutator::new(&templates)
            .propose(current, 'A', &ResidueMap::from([(2, name.to_string())]), ProposalMetadata::default())
            .unwrap()
    }

    fn atom_index(topology: &Topology, name: &str) -> usize {
        let chain = topology.find_chain('A').unwrap();
        let residue = topology.residue(topology.find_residue(chain, 2).unwrap()).unwrap();
        topology.atom_index_map()[&residue.atom_id_by_name(name).unwrap()]
    }

    struct Fixture {
        proposal: TopologyProposal,
        old: ValenceParameters,
        new: ValenceParameters,
    }

    impl Fixture {
        fn ala_to_ser() -> Self {
            let proposal = mutate(&tripeptide(&["ALA", "ALA", "GLY"]), "SER");
            let old = ValenceParameters::generic(proposal.old_topology());
            let new = ValenceParameters::generic(proposal.new_topology());
            Self { proposal, old, new }
        }

        fn systems(&self) -> ProposalSystems<'_> {
            ProposalSystems {
                old: &self.old,
                new: &self.new,
            }
        }
    }

    #[test]
    fn proposal_places_every_new_atom() {
        let fixture = Fixture::ala_to_ser();
        let proposal = &fixture.proposal;
        let old_positions = proposal.old_topology().positions();
        let engine = FFAllAngleGeometryEngine::default();

        let result = engine
            .propose(proposal, &fixture.systems(), &old_positions, beta(), &mut StdRng::seed_from_u64(17))
            .unwrap();

        assert_eq!(result.positions.len(), proposal.n_atoms_new());
        for (&new, &old) in proposal.new_to_old_atom_map() {
            assert_eq!(result.positions[new], old_positions[old]);
        }

        let new_topology = proposal.new_topology();
        let og = atom_index(new_topology, "OG");
        let hg = atom_index(new_topology, "HG");
        let placed: Vec<usize> = result.placements.iter().map(|p| p.atom_index).collect();
        assert_eq!(placed, vec![og, hg]);

        let cb = atom_index(new_topology, "CB");
        let r = (result.positions[og] - result.positions[cb]).norm();
        let pmf = DiscretePmf::bond(0.142, 250_000.0, beta(), BOND_DIVISIONS).unwrap();
        assert!(r >= pmf.lower() && r < pmf.upper(), "OG-CB distance {}", r);
        assert_relative_eq!(result.placements[0].r, r, epsilon = 1e-9);

        let summed: f64 = result.placements.iter().map(PlacementRecord::logp).sum();
        assert_relative_eq!(result.logp, result.logp_choice + summed, epsilon = 1e-9);
        assert!(result.logp.is_finite());
    }

    #[test]
    fn constrained_hydrogens_keep_their_length() {
        let mut fixture = Fixture::ala_to_ser();
        fixture.new.constrain_hydrogen_bonds(fixture.proposal.new_topology());
        let old_positions = fixture.proposal.old_topology().positions();

        let result = FFAllAngleGeometryEngine::default()
            .propose(&fixture.proposal, &fixture.systems(), &old_positions, beta(), &mut StdRng::seed_from_u64(3))
            .unwrap();

        let hg = atom_index(fixture.proposal.new_topology(), "HG");
        let og = atom_index(fixture.proposal.new_topology(), "OG");
        let record = result.placements.iter().find(|p| p.atom_index == hg).unwrap();
        assert_relative_eq!(record.r, 0.097, epsilon = 1e-12);
        assert_eq!(record.logp_r, 0.0);
        assert_relative_eq!((result.positions[hg] - result.positions[og]).norm(), 0.097, epsilon = 1e-9);
    }

    #[test]
    fn restored_parameters_propose_like_the_originals() {
        let mut fixture = Fixture::ala_to_ser();
        let old_positions = fixture.proposal.old_topology().positions();
        let engine = FFAllAngleGeometryEngine::default();
        let expected = engine
            .propose(&fixture.proposal, &fixture.systems(), &old_positions, beta(), &mut StdRng::seed_from_u64(41))
            .unwrap();

        let bytes = bincode::serialize(&fixture.new).unwrap();
        let restored: ValenceParameters = bincode::deserialize(&bytes).unwrap();
        assert_eq!(restored, fixture.new);
        fixture.new = restored;

        let result = engine
            .propose(&fixture.proposal, &fixture.systems(), &old_positions, beta(), &mut StdRng::seed_from_u64(41))
            .unwrap();
        assert_eq!(result.positions, expected.positions);
        assert_relative_eq!(result.logp, expected.logp, epsilon = 1e-12);
    }

    #[test]
    fn reverse_evaluation_recovers_forward_bonds_and_angles() {
        let fixture = Fixture::ala_to_ser();
        let old_positions = fixture.proposal.old_topology().positions();
        let engine = FFAllAngleGeometryEngine::default();
        let forward = engine
            .propose(&fixture.proposal, &fixture.systems(), &old_positions, beta(), &mut StdRng::seed_from_u64(29))
            .unwrap();

        let mut serine = fixture.proposal.new_topology().clone();
        serine.set_positions(&forward.positions).unwrap();
        let reverse = mutate(&serine, "ALA");
        let old = ValenceParameters::generic(reverse.old_topology());
        let new = ValenceParameters::generic(reverse.new_topology());
        let systems = ProposalSystems { old: &old, new: &new };

        let evaluated = engine
            .reverse_placements(
                &reverse,
                &systems,
                &reverse.new_topology().positions(),
                &forward.positions,
                beta(),
                &mut StdRng::seed_from_u64(31),
            )
            .unwrap();

        assert_eq!(evaluated.placements.len(), forward.placements.len());
        for record in &evaluated.placements {
            let original = forward
                .placements
                .iter()
                .find(|p| p.atom_index == record.atom_index)
                .unwrap();
            assert_relative_eq!(record.r, original.r, epsilon = 1e-9);
            assert_relative_eq!(record.logp_r, original.logp_r, epsilon = 1e-6);
            assert_relative_eq!(record.logp_theta, original.logp_theta, epsilon = 1e-6);
            assert_relative_eq!(record.log_detj, original.log_detj, epsilon = 1e-9);
        }
        assert_eq!(evaluated.positions, forward.positions);

        let logp = engine
            .logp_reverse(
                &reverse,
                &systems,
                &reverse.new_topology().positions(),
                &forward.positions,
                beta(),
                &mut StdRng::seed_from_u64(31),
            )
            .unwrap();
        assert_relative_eq!(logp, evaluated.logp);
    }

    #[test]
    fn proposals_without_new_atoms_copy_positions() {
        let current = tripeptide(&["ALA", "SER", "GLY"]);
        let proposal = mutate(&current, "ALA");
        let old = ValenceParameters::generic(proposal.old_topology());
        let new = ValenceParameters::generic(proposal.new_topology());
        let systems = ProposalSystems { old: &old, new: &new };
        let engine = FFAllAngleGeometryEngine::default();
        let mut rng = StdRng::seed_from_u64(1);

        let old_positions = current.positions();
        let result = engine.propose(&proposal, &systems, &old_positions, beta(), &mut rng).unwrap();
        assert_eq!(result.logp, 0.0);
        assert!(result.placements.is_empty());
        assert_eq!(result.positions, proposal.new_topology().positions());

        // Growing ALA back into SER has no unique old atoms to score in reverse.
        let forward = mutate(proposal.new_topology(), "SER");
        let old = ValenceParameters::generic(forward.old_topology());
        let new = ValenceParameters::generic(forward.new_topology());
        let systems = ProposalSystems { old: &old, new: &new };
        let logp = engine
            .logp_reverse(
                &forward,
                &systems,
                &forward.new_topology().positions(),
                &forward.old_topology().positions(),
                beta(),
                &mut rng,
            )
            .unwrap();
        assert_eq!(logp, 0.0);
    }

    #[test]
    fn same_seed_reproduces_the_proposal() {
        let fixture = Fixture::ala_to_ser();
        let old_positions = fixture.proposal.old_topology().positions();
        let engine = FFAllAngleGeometryEngine::default();
        let run = |seed| {
            engine
                .propose(&fixture.proposal, &fixture.systems(), &old_positions, beta(), &mut StdRng::seed_from_u64(seed))
                .unwrap()
        };
        assert_eq!(run(8), run(8));
    }

    #[test]
    fn missing_bond_terms_are_reported() {
        let fixture = Fixture::ala_to_ser();
        let empty = ValenceParameters::new(fixture.proposal.n_atoms_new());
        let systems = ProposalSystems {
            old: &fixture.old,
            new: &empty,
        };
        let old_positions = fixture.proposal.old_topology().positions();
        let err = FFAllAngleGeometryEngine::default()
            .propose(&fixture.proposal, &systems, &old_positions, beta(), &mut StdRng::seed_from_u64(0))
            .unwrap_err();

        let og = atom_index(fixture.proposal.new_topology(), "OG");
        let cb = atom_index(fixture.proposal.new_topology(), "CB");
        assert!(matches!(err, GeometryError::NoBondOrConstraint { atom, partner } if atom == og && partner == cb));
    }

    #[test]
    fn mismatched_inputs_are_rejected() {
        let fixture = Fixture::ala_to_ser();
        let engine = FFAllAngleGeometryEngine::default();
        let mut rng = StdRng::seed_from_u64(0);

        let err = engine
            .propose(&fixture.proposal, &fixture.systems(), &[Point3::origin()], beta(), &mut rng)
            .unwrap_err();
        assert!(matches!(err, GeometryError::PositionCount { found: 1, .. }));

        let wrong = ValenceParameters::new(3);
        let systems = ProposalSystems {
            old: &fixture.old,
            new: &wrong,
        };
        let old_positions = fixture.proposal.old_topology().positions();
        let err = engine
            .propose(&fixture.proposal, &systems, &old_positions, beta(), &mut rng)
            .unwrap_err();
        assert!(matches!(err, GeometryError::ParameterCount { found: 3, .. }));
    }
}
