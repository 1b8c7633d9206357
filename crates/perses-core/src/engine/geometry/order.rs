use super::GeometryError;
use crate::core::models::topology::Topology;
use crate::engine::utils::sampling::ln_factorial;
use rand::Rng;
use rand::seq::SliceRandom;
use std::collections::{BTreeMap, BTreeSet, HashSet, VecDeque};
use tracing::{debug, trace};

/// The torsion used to grow one atom.
///
/// `atom` is bonded to `bond`, `angle` closes the bond angle and `torsion` closes the
/// dihedral. All indices are particle indices of the topology being grown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TorsionPath {
    pub atom: usize,
    pub bond: usize,
    pub angle: usize,
    pub torsion: usize,
}

/// The order in which atoms are grown, with the log-probability of having chosen it.
#[derive(Debug, Clone, PartialEq)]
pub struct ProposalOrder {
    pub torsions: Vec<TorsionPath>,
    pub logp_choice: f64,
}

impl ProposalOrder {
    /// Chooses an order for growing `atoms` on top of the `positioned` atoms.
    ///
    /// Heavy atoms are grown before hydrogens. Within each group atoms are grown in
    /// rounds: every atom that has a torsion path to positioned atoms at the start of
    /// the round picks one of its eligible torsions uniformly, then the round is
    /// shuffled. The bond graph is restricted to bonds touching the residues that
    /// contain `atoms`.
    pub fn determine<R: Rng + ?Sized>(
        topology: &Topology,
        atoms: &[usize],
        positioned: impl IntoIterator<Item = usize>,
        rng: &mut R,
    ) -> Result<Self, GeometryError> {
        let ordered = topology.ordered_atom_ids();
        let graph = ResidueGraph::new(topology, atoms);
        let mut positioned: HashSet<usize> = positioned.into_iter().collect();

        let is_hydrogen = |i: usize| {
            ordered
                .get(i)
                .and_then(|&id| topology.atom(id))
                .is_some_and(|atom| atom.is_hydrogen())
        };
        let (hydrogens, heavy): (Vec<usize>, Vec<usize>) = atoms.iter().partition(|&&i| is_hydrogen(i));

        let mut order = Self {
            torsions: Vec::with_capacity(atoms.len()),
            logp_choice: 0.0,
        };
        for group in [heavy, hydrogens] {
            order.grow_group(&graph, group, &mut positioned, rng)?;
        }
        debug!(
            atoms = order.torsions.len(),
            logp_choice = order.logp_choice,
            "Determined proposal order"
        );
        Ok(order)
    }

    fn grow_group<R: Rng + ?Sized>(
        &mut self,
        graph: &ResidueGraph,
        mut remaining: Vec<usize>,
        positioned: &mut HashSet<usize>,
        rng: &mut R,
    ) -> Result<(), GeometryError> {
        while !remaining.is_empty() {
            let mut round = Vec::new();
            let mut deferred = Vec::new();

            for atom in remaining {
                let eligible = graph.eligible_torsions(atom, positioned);
                if eligible.is_empty() {
                    deferred.push(atom);
                    continue;
                }
                let choice = rng.gen_range(0..eligible.len());
                self.logp_choice -= (eligible.len() as f64).ln();
                trace!(atom, candidates = eligible.len(), "Chose torsion");
                round.push(eligible[choice]);
            }

            if round.is_empty() {
                return Err(GeometryError::UnreachableAtoms { atoms: deferred });
            }

            positioned.extend(round.iter().map(|path| path.atom));
            round.shuffle(rng);
            self.logp_choice -= ln_factorial(round.len());
            self.torsions.extend(round);
            remaining = deferred;
        }
        Ok(())
    }
}

struct ResidueGraph {
    adjacency: BTreeMap<usize, BTreeSet<usize>>,
}

impl ResidueGraph {
    fn new(topology: &Topology, atoms: &[usize]) -> Self {
        let ordered = topology.ordered_atom_ids();
        let index = topology.atom_index_map();

        let residues: BTreeSet<_> = atoms
            .iter()
            .filter_map(|&i| ordered.get(i))
            .filter_map(|&id| topology.atom(id).map(|atom| atom.residue_id))
            .collect();

        let mut adjacency: BTreeMap<usize, BTreeSet<usize>> = BTreeMap::new();
        for residue in residues {
            for bond in topology.residue_bonds(residue) {
                let (Some(&a), Some(&b)) = (index.get(&bond.atom1_id), index.get(&bond.atom2_id)) else {
                    continue;
                };
                adjacency.entry(a).or_default().insert(b);
                adjacency.entry(b).or_default().insert(a);
            }
        }
        Self { adjacency }
    }

    /// Shortest paths of exactly three bonds from `atom` whose other three atoms are
    /// all positioned.
    fn eligible_torsions(&self, atom: usize, positioned: &HashSet<usize>) -> Vec<TorsionPath> {
        self.paths_of_three_bonds(atom)
            .into_iter()
            .filter(|path| path[1..].iter().all(|i| positioned.contains(i)))
            .map(|path| TorsionPath {
                atom: path[0],
                bond: path[1],
                angle: path[2],
                torsion: path[3],
            })
            .collect()
    }

    fn paths_of_three_bonds(&self, source: usize) -> Vec<[usize; 4]> {
        let mut parent: BTreeMap<usize, usize> = BTreeMap::new();
        let mut depth: BTreeMap<usize, usize> = BTreeMap::from([(source, 0)]);
        let mut queue = VecDeque::from([source]);
        let mut found = Vec::new();

        while let Some(node) = queue.pop_front() {
            let d = depth[&node];
            if d == 3 {
                let angle = parent[&node];
                let bond = parent[&angle];
                found.push([source, bond, angle, node]);
                continue;
            }
            for &next in self.adjacency.get(&node).into_iter().flatten() {
                if depth.contains_key(&next) {
                    continue;
                }
                depth.insert(next, d + 1);
                parent.insert(next, node);
                queue.push_back(next);
            }
        }
        found
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::atom::Atom;
    use nalgebra::Point3;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    /// Ethanol-like chain C1-C2-O-H plus a branch C2-C3 and hydrogens on C1.
    fn branched() -> Topology {
        let mut topology = Topology::new();
        let chain = topology.add_chain('A');
        let residue = topology.add_residue(chain, 1, "LIG").unwrap();
        let names = ["C1", "C2", "O", "HO", "C3", "H11"];
        let ids: Vec<_> = names
            .iter()
            .enumerate()
            .map(|(i, name)| {
                let atom = Atom::new(name, "", residue, Point3::new(i as f64 * 0.1, 0.0, 0.0));
                topology.add_atom(residue, atom).unwrap()
            })
            .collect();
        for (a, b) in [(0, 1), (1, 2), (2, 3), (1, 4), (0, 5)] {
            topology.add_bond(ids[a], ids[b]).unwrap();
        }
        topology
    }

    #[test]
    fn heavy_atoms_are_grown_before_hydrogens() {
        let topology = branched();
        let mut rng = StdRng::seed_from_u64(5);
        // Positioned: C1, C2, C3, H11. New: O (heavy), HO (hydrogen).
        let order = ProposalOrder::determine(&topology, &[3, 2], [0, 1, 4, 5], &mut rng).unwrap();
        let grown: Vec<usize> = order.torsions.iter().map(|p| p.atom).collect();
        assert_eq!(grown, vec![2, 3]);

        // O has the single torsion O-C2-C1-H11; HO picks between HO-O-C2-C1 and HO-O-C2-C3.
        let o = order.torsions[0];
        assert_eq!((o.bond, o.angle, o.torsion), (1, 0, 5));
        assert!((order.logp_choice + 2f64.ln()).abs() < 1e-12);
    }

    #[test]
    fn choice_probability_counts_candidates_and_rounds() {
        let topology = branched();
        let mut rng = StdRng::seed_from_u64(9);
        let order = ProposalOrder::determine(&topology, &[3], [0, 1, 2, 4, 5], &mut rng).unwrap();
        assert_eq!(order.torsions.len(), 1);
        let path = order.torsions[0];
        assert_eq!((path.atom, path.bond, path.angle), (3, 2, 1));
        assert!(path.torsion == 0 || path.torsion == 4);
        assert!((order.logp_choice - (0.5f64).ln()).abs() < 1e-12);
    }

    #[test]
    fn atoms_grown_in_the_same_round_do_not_anchor_each_other() {
        let topology = branched();
        let mut rng = StdRng::seed_from_u64(1);
        // Only C1, C2 and H11 positioned: O and C3 each have a single torsion ending in H11.
        let order = ProposalOrder::determine(&topology, &[2, 4], [0, 1, 5], &mut rng).unwrap();
        assert_eq!(order.torsions.len(), 2);
        for path in &order.torsions {
            assert_eq!((path.bond, path.angle, path.torsion), (1, 0, 5));
        }
        // One candidate each, one round of two atoms.
        assert!((order.logp_choice + 2f64.ln()).abs() < 1e-12);
    }

    #[test]
    fn disconnected_atoms_are_reported() {
        let topology = branched();
        let mut rng = StdRng::seed_from_u64(2);
        let err = ProposalOrder::determine(&topology, &[3], [5], &mut rng).unwrap_err();
        assert!(matches!(err, GeometryError::UnreachableAtoms { atoms } if atoms == vec![3]));
    }

    #[test]
    fn same_seed_gives_same_order() {
        let topology = branched();
        let first = ProposalOrder::determine(&topology, &[2, 3, 4], [0, 1, 5], &mut StdRng::seed_from_u64(4)).unwrap();
        let second = ProposalOrder::determine(&topology, &[2, 3, 4], [0, 1, 5], &mut StdRng::seed_from_u64(4)).unwrap();
        assert_eq!(first, second);
    }
}
