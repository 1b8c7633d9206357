use crate::core::models::ids::AtomId;
use crate::core::models::topology::Topology;
use crate::core::utils::elements::covalent_radius_nm;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;

/// Harmonic bond `0.5 k (r - length)²`, in nm and kJ/mol/nm².
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HarmonicBond {
    pub atoms: [usize; 2],
    pub length: f64,
    pub k: f64,
}

/// Harmonic angle `0.5 k (θ - angle)²` with the central atom in the middle, in radians
/// and kJ/mol/rad².
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HarmonicAngle {
    pub atoms: [usize; 3],
    pub angle: f64,
    pub k: f64,
}

/// Periodic torsion `k (1 + cos(n φ - phase))`, in kJ/mol.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PeriodicTorsion {
    pub atoms: [usize; 4],
    pub periodicity: u32,
    pub phase: f64,
    pub k: f64,
}

/// Fixed distance between two atoms, in nm.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Constraint {
    pub atoms: [usize; 2],
    pub length: f64,
}

/// Bonded terms of one end state, indexed by particle.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "ValenceTerms")]
pub struct ValenceParameters {
    n_atoms: usize,
    bonds: Vec<HarmonicBond>,
    angles: Vec<HarmonicAngle>,
    torsions: Vec<PeriodicTorsion>,
    constraints: Vec<Constraint>,
    #[serde(skip)]
    bond_index: HashMap<(usize, usize), usize>,
    #[serde(skip)]
    constraint_index: HashMap<(usize, usize), usize>,
    #[serde(skip)]
    angle_index: HashMap<(usize, usize, usize), usize>,
}

/// Serialized form of [`ValenceParameters`]; the lookup tables are rebuilt on load.
#[derive(Deserialize)]
struct ValenceTerms {
    n_atoms: usize,
    bonds: Vec<HarmonicBond>,
    angles: Vec<HarmonicAngle>,
    torsions: Vec<PeriodicTorsion>,
    constraints: Vec<Constraint>,
}

impl From<ValenceTerms> for ValenceParameters {
    fn from(terms: ValenceTerms) -> Self {
        let mut params = Self {
            n_atoms: terms.n_atoms,
            bonds: terms.bonds,
            angles: terms.angles,
            torsions: terms.torsions,
            constraints: terms.constraints,
            ..Self::default()
        };
        params.reindex();
        params
    }
}

const GENERIC_BOND_K: f64 = 250_000.0;
const GENERIC_ANGLE_K: f64 = 400.0;
const TETRAHEDRAL: f64 = 1.910_633_236_249_019; // acos(-1/3)
const TRIGONAL: f64 = 2.094_395_102_393_195_5; // 2π/3

fn pair(i: usize, j: usize) -> (usize, usize) {
    (i.min(j), i.max(j))
}

fn triple(i: usize, j: usize, k: usize) -> (usize, usize, usize) {
    (i.min(k), j, i.max(k))
}

fn is_planar_center(topology: &Topology, element: &str, neighbors: &[AtomId]) -> bool {
    match element {
        "N" => neighbors.len() == 3,
        "C" => neighbors.iter().any(|&id| {
            topology.atom(id).is_some_and(|atom| atom.element == "O")
                && topology.bonded_neighbors(id).is_some_and(|n| n.len() == 1)
        }),
        _ => false,
    }
}

impl ValenceParameters {
    pub fn new(n_atoms: usize) -> Self {
        Self {
            n_atoms,
            ..Self::default()
        }
    }

    /// Generic parameters derived from connectivity alone.
    ///
    /// Bond lengths are sums of covalent radii. Angles are trigonal around carbonyl
    /// carbons and three-coordinate nitrogens and tetrahedral everywhere else. No torsion
    /// terms are generated.
    pub fn generic(topology: &Topology) -> Self {
        let index = topology.atom_index_map();
        let ordered = topology.ordered_atom_ids();
        let mut params = Self::new(ordered.len());

        for bond in topology.bonds() {
            let (Some(&i), Some(&j)) = (index.get(&bond.atom1_id), index.get(&bond.atom2_id)) else {
                continue;
            };
            let (Some(a), Some(b)) = (topology.atom(bond.atom1_id), topology.atom(bond.atom2_id)) else {
                continue;
            };
            let length = covalent_radius_nm(&a.element) + covalent_radius_nm(&b.element);
            params.add_bond(i, j, length, GENERIC_BOND_K);
        }

        for (center, &center_id) in ordered.iter().enumerate() {
            let Some(neighbors) = topology.bonded_neighbors(center_id) else {
                continue;
            };
            let Some(center_atom) = topology.atom(center_id) else {
                continue;
            };
            if neighbors.len() < 2 {
                continue;
            }
            let equilibrium = if is_planar_center(topology, &center_atom.element, neighbors) {
                TRIGONAL
            } else {
                TETRAHEDRAL
            };
            let mut partners: Vec<usize> = neighbors.iter().filter_map(|id| index.get(id).copied()).collect();
            partners.sort_unstable();
            for (n, &i) in partners.iter().enumerate() {
                for &k in &partners[n + 1..] {
                    params.add_angle(i, center, k, equilibrium, GENERIC_ANGLE_K);
                }
            }
        }

        debug!(
            bonds = params.bonds.len(),
            angles = params.angles.len(),
            "Derived generic valence parameters"
        );
        params
    }

    pub fn n_atoms(&self) -> usize {
        self.n_atoms
    }

    pub fn bonds(&self) -> &[HarmonicBond] {
        &self.bonds
    }

    pub fn angles(&self) -> &[HarmonicAngle] {
        &self.angles
    }

    pub fn torsions(&self) -> &[PeriodicTorsion] {
        &self.torsions
    }

    pub fn constraints(&self) -> &[Constraint] {
        &self.constraints
    }

    /// Adds or replaces the bond between `i` and `j`.
    pub fn add_bond(&mut self, i: usize, j: usize, length: f64, k: f64) {
        let term = HarmonicBond { atoms: [i, j], length, k };
        match self.bond_index.get(&pair(i, j)) {
            Some(&slot) => self.bonds[slot] = term,
            None => {
                self.bond_index.insert(pair(i, j), self.bonds.len());
                self.bonds.push(term);
            }
        }
    }

    /// Adds or replaces the angle `i-j-k` centred on `j`.
    pub fn add_angle(&mut self, i: usize, j: usize, k: usize, angle: f64, force_constant: f64) {
        let term = HarmonicAngle { atoms: [i, j, k], angle, k: force_constant };
        match self.angle_index.get(&triple(i, j, k)) {
            Some(&slot) => self.angles[slot] = term,
            None => {
                self.angle_index.insert(triple(i, j, k), self.angles.len());
                self.angles.push(term);
            }
        }
    }

    pub fn add_torsion(&mut self, atoms: [usize; 4], periodicity: u32, phase: f64, k: f64) {
        self.torsions.push(PeriodicTorsion { atoms, periodicity, phase, k });
    }

    /// Adds or replaces the constraint between `i` and `j`.
    pub fn add_constraint(&mut self, i: usize, j: usize, length: f64) {
        let term = Constraint { atoms: [i, j], length };
        match self.constraint_index.get(&pair(i, j)) {
            Some(&slot) => self.constraints[slot] = term,
            None => {
                self.constraint_index.insert(pair(i, j), self.constraints.len());
                self.constraints.push(term);
            }
        }
    }

    pub fn bond(&self, i: usize, j: usize) -> Option<&HarmonicBond> {
        self.bond_index.get(&pair(i, j)).map(|&slot| &self.bonds[slot])
    }

    pub fn constraint(&self, i: usize, j: usize) -> Option<&Constraint> {
        self.constraint_index.get(&pair(i, j)).map(|&slot| &self.constraints[slot])
    }

    /// The angle `i-j-k` centred on `j`, in either orientation.
    pub fn angle(&self, i: usize, j: usize, k: usize) -> Option<&HarmonicAngle> {
        self.angle_index.get(&triple(i, j, k)).map(|&slot| &self.angles[slot])
    }

    /// Replaces every bond term involving a hydrogen by a constraint at its equilibrium
    /// length. Returns the number of bonds converted.
    pub fn constrain_hydrogen_bonds(&mut self, topology: &Topology) -> usize {
        let hydrogens: Vec<bool> = topology
            .ordered_atom_ids()
            .into_iter()
            .map(|id| topology.atom(id).is_some_and(|atom| atom.is_hydrogen()))
            .collect();
        let is_hydrogen = |i: usize| hydrogens.get(i).copied().unwrap_or(false);

        let (constrained, kept): (Vec<HarmonicBond>, Vec<HarmonicBond>) = self
            .bonds
            .drain(..)
            .partition(|bond| bond.atoms.iter().any(|&i| is_hydrogen(i)));

        self.bond_index.clear();
        for bond in kept {
            self.add_bond(bond.atoms[0], bond.atoms[1], bond.length, bond.k);
        }
        for bond in &constrained {
            self.add_constraint(bond.atoms[0], bond.atoms[1], bond.length);
        }
        constrained.len()
    }

    fn reindex(&mut self) {
        self.bond_index = self
            .bonds
            .iter()
            .enumerate()
            .map(|(slot, b)| (pair(b.atoms[0], b.atoms[1]), slot))
            .collect();
        self.constraint_index = self
            .constraints
            .iter()
            .enumerate()
            .map(|(slot, c)| (pair(c.atoms[0], c.atoms[1]), slot))
            .collect();
        self.angle_index = self
            .angles
            .iter()
            .enumerate()
            .map(|(slot, a)| (triple(a.atoms[0], a.atoms[1], a.atoms[2]), slot))
            .collect();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::proposal::polymer::tests::tripeptide;
    use approx::assert_relative_eq;

    fn index_of(topology: &Topology, residue: isize, name: &str) -> usize {
        let chain = topology.find_chain('A').unwrap();
        let residue = topology.residue(topology.find_residue(chain, residue).unwrap()).unwrap();
        let id = residue.atom_id_by_name(name).unwrap();
        topology.atom_index_map()[&id]
    }

    #[test]
    fn generic_parameters_cover_every_bond() {
        let topology = tripeptide(&["ALA", "SER", "GLY"]);
        let params = ValenceParameters::generic(&topology);
        assert_eq!(params.n_atoms(), topology.n_atoms());
        assert_eq!(params.bonds().len(), topology.bonds().len());

        let ca = index_of(&topology, 2, "CA");
        let cb = index_of(&topology, 2, "CB");
        let bond = params.bond(cb, ca).unwrap();
        assert_relative_eq!(bond.length, 0.152, epsilon = 1e-12);
    }

    #[test]
    fn generic_angles_follow_coordination() {
        let topology = tripeptide(&["ALA", "SER", "GLY"]);
        let params = ValenceParameters::generic(&topology);

        let n = index_of(&topology, 2, "N");
        let ca = index_of(&topology, 2, "CA");
        let cb = index_of(&topology, 2, "CB");
        let og = index_of(&topology, 2, "OG");
        let hg = index_of(&topology, 2, "HG");
        assert_relative_eq!(params.angle(n, ca, cb).unwrap().angle, TETRAHEDRAL);
        assert_relative_eq!(params.angle(cb, ca, n).unwrap().angle, TETRAHEDRAL);
        assert_relative_eq!(params.angle(cb, og, hg).unwrap().angle, TETRAHEDRAL);

        let c = index_of(&topology, 2, "C");
        let o = index_of(&topology, 2, "O");
        assert_relative_eq!(params.angle(ca, c, o).unwrap().angle, TRIGONAL);
        let h = index_of(&topology, 2, "H");
        assert_relative_eq!(params.angle(ca, n, h).unwrap().angle, TRIGONAL);
        assert!(params.angle(n, cb, ca).is_none());
        assert!(params.torsions().is_empty());
    }

    #[test]
    fn hydrogen_bonds_become_constraints() {
        let topology = tripeptide(&["ALA", "SER", "GLY"]);
        let mut params = ValenceParameters::generic(&topology);
        let n_bonds = params.bonds().len();

        let og = index_of(&topology, 2, "OG");
        let hg = index_of(&topology, 2, "HG");
        let converted = params.constrain_hydrogen_bonds(&topology);

        assert!(converted > 0);
        assert_eq!(params.bonds().len() + converted, n_bonds);
        assert!(params.bond(og, hg).is_none());
        assert_relative_eq!(params.constraint(hg, og).unwrap().length, 0.097, epsilon = 1e-12);
        assert!(params.bond(og, index_of(&topology, 2, "CB")).is_some());
    }

    #[test]
    fn adding_a_term_twice_replaces_it() {
        let mut params = ValenceParameters::new(3);
        params.add_bond(0, 1, 0.1, 1.0);
        params.add_bond(1, 0, 0.2, 2.0);
        assert_eq!(params.bonds().len(), 1);
        assert_eq!(params.bond(0, 1).unwrap().length, 0.2);

        params.add_angle(0, 1, 2, 1.0, 1.0);
        params.add_angle(2, 1, 0, 2.0, 1.0);
        assert_eq!(params.angles().len(), 1);
        assert_eq!(params.angle(0, 1, 2).unwrap().angle, 2.0);
    }

    #[test]
    fn lookup_tables_survive_serialization() {
        let mut params = ValenceParameters::new(3);
        params.add_bond(0, 1, 0.1, 1.0);
        params.add_constraint(1, 2, 0.1);
        params.add_angle(0, 1, 2, 1.0, 1.0);

        let bytes = bincode::serialize(&params).unwrap();
        let mut restored: ValenceParameters = bincode::deserialize(&bytes).unwrap();
        assert_eq!(restored, params);
        assert_eq!(restored.bond(1, 0).unwrap().length, 0.1);
        assert!(restored.constraint(2, 1).is_some());
        assert!(restored.angle(2, 1, 0).is_some());

        restored.add_bond(1, 0, 0.2, 2.0);
        assert_eq!(restored.bonds().len(), 1);
    }
}
