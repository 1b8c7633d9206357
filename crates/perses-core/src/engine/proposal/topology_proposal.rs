use super::error::ProposalError;
use crate::core::models::topology::Topology;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Bookkeeping attached to a proposal.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProposalMetadata {
    /// Applied point mutations, formatted `WT-number-MUT` (e.g. `LEU-99-ALA`).
    pub mutations: Vec<String>,
    /// Free-form entries carried through from the caller.
    pub entries: BTreeMap<String, String>,
}

/// A proposed transformation from an old to a new topology.
///
/// Atom indices are the particle indices of the respective topologies. Every entry of
/// the new-to-old map lies inside both atom ranges and no old atom is mapped twice.
#[derive(Debug, Clone)]
pub struct TopologyProposal {
    old_topology: Topology,
    new_topology: Topology,
    logp_proposal: f64,
    new_to_old_atom_map: BTreeMap<usize, usize>,
    old_to_new_atom_map: BTreeMap<usize, usize>,
    unique_new_atoms: Vec<usize>,
    unique_old_atoms: Vec<usize>,
    old_chemical_state_key: String,
    new_chemical_state_key: String,
    metadata: ProposalMetadata,
}

impl TopologyProposal {
    pub fn new(
        old_topology: Topology,
        new_topology: Topology,
        logp_proposal: f64,
        new_to_old_atom_map: BTreeMap<usize, usize>,
        old_chemical_state_key: String,
        new_chemical_state_key: String,
        metadata: ProposalMetadata,
    ) -> Result<Self, ProposalError> {
        let n_old = old_topology.n_atoms();
        let n_new = new_topology.n_atoms();

        let mut old_to_new_atom_map = BTreeMap::new();
        for (&new_index, &old_index) in &new_to_old_atom_map {
            if new_index >= n_new || old_index >= n_old {
                return Err(ProposalError::AtomMapOutOfRange {
                    new_index,
                    old_index,
                    n_new,
                    n_old,
                });
            }
            if old_to_new_atom_map.insert(old_index, new_index).is_some() {
                return Err(ProposalError::NonInjectiveAtomMap { old_index });
            }
        }

        let unique_new_atoms = (0..n_new)
            .filter(|i| !new_to_old_atom_map.contains_key(i))
            .collect();
        let unique_old_atoms = (0..n_old)
            .filter(|i| !old_to_new_atom_map.contains_key(i))
            .collect();

        Ok(Self {
            old_topology,
            new_topology,
            logp_proposal,
            new_to_old_atom_map,
            old_to_new_atom_map,
            unique_new_atoms,
            unique_old_atoms,
            old_chemical_state_key,
            new_chemical_state_key,
            metadata,
        })
    }

    /// Builds a proposal whose atom map pairs atoms by identity.
    ///
    /// `new_topology` must be derived from `old_topology` by cloning and editing, so that
    /// every atom that survived the edit keeps its handle.
    pub fn from_shared_atoms(
        old_topology: Topology,
        new_topology: Topology,
        logp_proposal: f64,
        old_chemical_state_key: String,
        new_chemical_state_key: String,
        metadata: ProposalMetadata,
    ) -> Result<Self, ProposalError> {
        let old_indices = old_topology.atom_index_map();
        let new_to_old_atom_map = new_topology
            .ordered_atom_ids()
            .iter()
            .enumerate()
            .filter_map(|(new_index, id)| old_indices.get(id).map(|&old| (new_index, old)))
            .collect();
        Self::new(
            old_topology,
            new_topology,
            logp_proposal,
            new_to_old_atom_map,
            old_chemical_state_key,
            new_chemical_state_key,
            metadata,
        )
    }

    pub fn old_topology(&self) -> &Topology {
        &self.old_topology
    }

    pub fn new_topology(&self) -> &Topology {
        &self.new_topology
    }

    pub fn logp_proposal(&self) -> f64 {
        self.logp_proposal
    }

    pub fn new_to_old_atom_map(&self) -> &BTreeMap<usize, usize> {
        &self.new_to_old_atom_map
    }

    pub fn old_to_new_atom_map(&self) -> &BTreeMap<usize, usize> {
        &self.old_to_new_atom_map
    }

    /// New atoms without an old counterpart, in ascending index order.
    pub fn unique_new_atoms(&self) -> &[usize] {
        &self.unique_new_atoms
    }

    /// Old atoms without a new counterpart, in ascending index order.
    pub fn unique_old_atoms(&self) -> &[usize] {
        &self.unique_old_atoms
    }

    pub fn n_atoms_old(&self) -> usize {
        self.old_topology.n_atoms()
    }

    pub fn n_atoms_new(&self) -> usize {
        self.new_topology.n_atoms()
    }

    pub fn old_chemical_state_key(&self) -> &str {
        &self.old_chemical_state_key
    }

    pub fn new_chemical_state_key(&self) -> &str {
        &self.new_chemical_state_key
    }

    pub fn metadata(&self) -> &ProposalMetadata {
        &self.metadata
    }

    /// Whether the proposal leaves the chemical state unchanged.
    pub fn is_self_proposal(&self) -> bool {
        self.old_chemical_state_key == self.new_chemical_state_key
            && self.unique_new_atoms.is_empty()
            && self.unique_old_atoms.is_empty()
    }

    /// Residue-level summary of the atoms that appear or disappear.
    pub fn changed_residues(&self) -> BTreeSet<String> {
        let describe = |topology: &Topology, indices: &[usize]| -> Vec<String> {
            let order = topology.ordered_atom_ids();
            indices
                .iter()
                .filter_map(|&i| order.get(i))
                .filter_map(|&id| topology.atom(id))
                .filter_map(|atom| topology.residue(atom.residue_id))
                .map(|residue| format!("{}{}", residue.name, residue.number))
                .collect()
        };
        describe(&self.new_topology, &self.unique_new_atoms)
            .into_iter()
            .chain(describe(&self.old_topology, &self.unique_old_atoms))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::atom::Atom;
    use nalgebra::Point3;

    fn chain_of(names: &[&str]) -> Topology {
        let mut topology = Topology::new();
        let chain = topology.add_chain('A');
        let residue = topology.add_residue(chain, 1, "MOL").unwrap();
        for name in names {
            topology
                .add_atom(residue, Atom::new(name, "C", residue, Point3::origin()))
                .unwrap();
        }
        topology
    }

    fn keys() -> (String, String) {
        ("MOL".to_string(), "MOL".to_string())
    }

    #[test]
    fn derived_maps_and_unique_atoms() {
        let old = chain_of(&["C1", "C2", "C3"]);
        let new = chain_of(&["C1", "C2", "C4", "C5"]);
        let map = BTreeMap::from([(0, 0), (1, 2)]);
        let (ok, nk) = keys();
        let proposal = TopologyProposal::new(old, new, -1.5, map, ok, nk, Default::default()).unwrap();

        assert_eq!(proposal.old_to_new_atom_map(), &BTreeMap::from([(0, 0), (2, 1)]));
        assert_eq!(proposal.unique_new_atoms(), &[2, 3]);
        assert_eq!(proposal.unique_old_atoms(), &[1]);
        assert_eq!(proposal.n_atoms_old(), 3);
        assert_eq!(proposal.n_atoms_new(), 4);
        assert_eq!(proposal.logp_proposal(), -1.5);
    }

    #[test]
    fn out_of_range_entries_are_rejected() {
        let (ok, nk) = keys();
        let result = TopologyProposal::new(
            chain_of(&["C1"]),
            chain_of(&["C1", "C2"]),
            0.0,
            BTreeMap::from([(1, 1)]),
            ok,
            nk,
            Default::default(),
        );
        assert!(matches!(
            result,
            Err(ProposalError::AtomMapOutOfRange { new_index: 1, old_index: 1, .. })
        ));
    }

    #[test]
    fn non_injective_maps_are_rejected() {
        let (ok, nk) = keys();
        let result = TopologyProposal::new(
            chain_of(&["C1", "C2"]),
            chain_of(&["C1", "C2"]),
            0.0,
            BTreeMap::from([(0, 1), (1, 1)]),
            ok,
            nk,
            Default::default(),
        );
        assert!(matches!(
            result,
            Err(ProposalError::NonInjectiveAtomMap { old_index: 1 })
        ));
    }

    #[test]
    fn shared_atoms_are_matched_by_identity() {
        let old = chain_of(&["C1", "C2", "C3"]);
        let mut new = old.clone();
        let ids = new.ordered_atom_ids();
        new.remove_atom(ids[1]);
        let residue = new.atom(ids[0]).unwrap().residue_id;
        new.add_atom(residue, Atom::new("C9", "C", residue, Point3::origin()))
            .unwrap();

        let (ok, nk) = keys();
        let proposal =
            TopologyProposal::from_shared_atoms(old, new, 0.0, ok, nk, Default::default()).unwrap();
        assert_eq!(proposal.new_to_old_atom_map(), &BTreeMap::from([(0, 0), (1, 2)]));
        assert_eq!(proposal.unique_new_atoms(), &[2]);
        assert_eq!(proposal.unique_old_atoms(), &[1]);
        assert_eq!(proposal.changed_residues().len(), 1);
        assert!(!proposal.is_self_proposal());
    }

    #[test]
    fn identical_topologies_form_a_self_proposal() {
        let old = chain_of(&["C1", "C2"]);
        let new = old.clone();
        let (ok, nk) = keys();
        let proposal =
            TopologyProposal::from_shared_atoms(old, new, 0.0, ok, nk, Default::default()).unwrap();
        assert!(proposal.is_self_proposal());
        assert!(proposal.changed_residues().is_empty());
    }
}
