use super::atom::Atom;
use super::bond::Bond;
use super::chain::{Chain, ChainType};
use super::ids::{AtomId, ChainId, ResidueId};
use super::residue::Residue;
use nalgebra::Point3;
use slotmap::{SecondaryMap, SlotMap};
use std::collections::HashMap;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TopologyError {
    #[error("Expected {expected} positions but received {found}")]
    PositionCount { expected: usize, found: usize },
}

/// The connectivity and coordinates of a molecular system.
///
/// Storage is keyed by stable slot-map handles. The dense particle index of an atom is
/// its position in [`Topology::ordered_atom_ids`], which walks chains, residues and atoms
/// in insertion order. Cloning a topology preserves every handle, so atoms that survive an
/// edit of the clone can be matched to the original by identity.
#[derive(Debug, Clone, Default)]
pub struct Topology {
    /// Primary storage for atoms.
    atoms: SlotMap<AtomId, Atom>,
    /// Primary storage for residues.
    residues: SlotMap<ResidueId, Residue>,
    /// Primary storage for chains.
    chains: SlotMap<ChainId, Chain>,
    /// Chains in insertion order.
    chain_order: Vec<ChainId>,
    /// All bonds in the system.
    bonds: Vec<Bond>,
    /// Lookup of residues by chain and sequence number.
    residue_id_map: HashMap<(ChainId, isize), ResidueId>,
    /// Lookup of chains by their single-character identifier.
    chain_id_map: HashMap<char, ChainId>,
    /// Bond adjacency cache indexed by atom.
    bond_adjacency: SecondaryMap<AtomId, Vec<AtomId>>,
}

impl Topology {
    /// Creates a new, empty topology.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn atom(&self, id: AtomId) -> Option<&Atom> {
        self.atoms.get(id)
    }

    pub fn atom_mut(&mut self, id: AtomId) -> Option<&mut Atom> {
        self.atoms.get_mut(id)
    }

    /// Returns `true` if `id` refers to an atom of this topology.
    pub fn contains_atom(&self, id: AtomId) -> bool {
        self.atoms.contains_key(id)
    }

    pub fn residue(&self, id: ResidueId) -> Option<&Residue> {
        self.residues.get(id)
    }

    pub fn residue_mut(&mut self, id: ResidueId) -> Option<&mut Residue> {
        self.residues.get_mut(id)
    }

    pub fn chain(&self, id: ChainId) -> Option<&Chain> {
        self.chains.get(id)
    }

    /// Iterates over chains in insertion order.
    pub fn chains_iter(&self) -> impl Iterator<Item = (ChainId, &Chain)> {
        self.chain_order
            .iter()
            .filter_map(|&id| self.chains.get(id).map(|chain| (id, chain)))
    }

    pub fn bonds(&self) -> &[Bond] {
        &self.bonds
    }

    pub fn n_atoms(&self) -> usize {
        self.atoms.len()
    }

    pub fn n_residues(&self) -> usize {
        self.residues.len()
    }

    pub fn n_chains(&self) -> usize {
        self.chains.len()
    }

    pub fn find_chain(&self, id: char) -> Option<ChainId> {
        self.chain_id_map.get(&id).copied()
    }

    pub fn find_residue(&self, chain_id: ChainId, number: isize) -> Option<ResidueId> {
        self.residue_id_map.get(&(chain_id, number)).copied()
    }

    /// Adds a polymer chain, or returns the existing chain with the same identifier.
    pub fn add_chain(&mut self, id: char) -> ChainId {
        self.add_chain_with_type(id, ChainType::Polymer)
    }

    /// Adds a chain of the given type. Idempotent on the chain identifier.
    pub fn add_chain_with_type(&mut self, id: char, chain_type: ChainType) -> ChainId {
        if let Some(&existing) = self.chain_id_map.get(&id) {
            return existing;
        }
        let chain_id = self.chains.insert(Chain::new(id, chain_type));
        self.chain_id_map.insert(id, chain_id);
        self.chain_order.push(chain_id);
        chain_id
    }

    /// Adds a residue to a chain, or returns the existing residue with the same number.
    ///
    /// Returns `None` if the chain does not exist.
    pub fn add_residue(&mut self, chain_id: ChainId, number: isize, name: &str) -> Option<ResidueId> {
        let chain = self.chains.get_mut(chain_id)?;
        let residue_id = *self
            .residue_id_map
            .entry((chain_id, number))
            .or_insert_with(|| self.residues.insert(Residue::new(number, name, chain_id)));

        if !chain.residues.contains(&residue_id) {
            chain.residues.push(residue_id);
        }
        Some(residue_id)
    }

    /// Adds an atom to a residue. The atom's `residue_id` is overwritten with `residue_id`.
    ///
    /// Returns `None` if the residue does not exist.
    pub fn add_atom(&mut self, residue_id: ResidueId, mut atom: Atom) -> Option<AtomId> {
        if !self.residues.contains_key(residue_id) {
            return None;
        }
        atom.residue_id = residue_id;
        let name = atom.name.clone();
        let atom_id = self.atoms.insert(atom);
        self.bond_adjacency.insert(atom_id, Vec::new());
        self.residues.get_mut(residue_id)?.add_atom(&name, atom_id);
        Some(atom_id)
    }

    /// Adds a bond between two distinct atoms. Adding an existing bond is a no-op.
    ///
    /// Returns `None` if either atom is missing or both IDs are the same.
    pub fn add_bond(&mut self, atom1_id: AtomId, atom2_id: AtomId) -> Option<()> {
        if atom1_id == atom2_id
            || !self.atoms.contains_key(atom1_id)
            || !self.atoms.contains_key(atom2_id)
        {
            return None;
        }
        if self.are_bonded(atom1_id, atom2_id) {
            return Some(());
        }
        self.bonds.push(Bond::new(atom1_id, atom2_id));
        self.bond_adjacency.get_mut(atom1_id)?.push(atom2_id);
        self.bond_adjacency.get_mut(atom2_id)?.push(atom1_id);
        Some(())
    }

    pub fn are_bonded(&self, atom1_id: AtomId, atom2_id: AtomId) -> bool {
        self.bond_adjacency
            .get(atom1_id)
            .is_some_and(|neighbors| neighbors.contains(&atom2_id))
    }

    /// Removes the bond between two atoms. Returns `true` if a bond was removed.
    pub fn remove_bond_between(&mut self, atom1_id: AtomId, atom2_id: AtomId) -> bool {
        let before = self.bonds.len();
        self.bonds.retain(|bond| !bond.connects(atom1_id, atom2_id));
        if self.bonds.len() == before {
            return false;
        }
        if let Some(adjacency) = self.bond_adjacency.get_mut(atom1_id) {
            adjacency.retain(|&id| id != atom2_id);
        }
        if let Some(adjacency) = self.bond_adjacency.get_mut(atom2_id) {
            adjacency.retain(|&id| id != atom1_id);
        }
        true
    }

    /// Removes an atom together with every bond it participates in.
    pub fn remove_atom(&mut self, atom_id: AtomId) -> Option<Atom> {
        let atom = self.atoms.remove(atom_id)?;

        if let Some(residue) = self.residues.get_mut(atom.residue_id) {
            residue.remove_atom(&atom.name, atom_id);
        }

        self.bonds.retain(|bond| !bond.contains(atom_id));

        let neighbors = self.bond_adjacency.remove(atom_id).unwrap_or_default();
        for neighbor_id in neighbors {
            if let Some(adjacency) = self.bond_adjacency.get_mut(neighbor_id) {
                adjacency.retain(|&id| id != atom_id);
            }
        }

        Some(atom)
    }

    pub fn bonded_neighbors(&self, atom_id: AtomId) -> Option<&[AtomId]> {
        self.bond_adjacency.get(atom_id).map(|v| v.as_slice())
    }

    /// Bonds with at least one atom in the given residue, including inter-residue bonds.
    pub fn residue_bonds(&self, residue_id: ResidueId) -> impl Iterator<Item = &Bond> {
        self.bonds.iter().filter(move |bond| {
            self.atom_residue(bond.atom1_id) == Some(residue_id)
                || self.atom_residue(bond.atom2_id) == Some(residue_id)
        })
    }

    fn atom_residue(&self, atom_id: AtomId) -> Option<ResidueId> {
        self.atoms.get(atom_id).map(|atom| atom.residue_id)
    }

    /// Residues in chain order, then sequence order within each chain.
    pub fn residues_in_order(&self) -> Vec<ResidueId> {
        self.chains_iter()
            .flat_map(|(_, chain)| chain.residues.iter().copied())
            .collect()
    }

    /// Atom IDs in particle-index order.
    pub fn ordered_atom_ids(&self) -> Vec<AtomId> {
        self.residues_in_order()
            .into_iter()
            .filter_map(|residue_id| self.residues.get(residue_id))
            .flat_map(|residue| residue.atoms.iter().copied())
            .collect()
    }

    /// Maps each atom ID to its 0-based particle index.
    pub fn atom_index_map(&self) -> HashMap<AtomId, usize> {
        self.ordered_atom_ids()
            .into_iter()
            .enumerate()
            .map(|(index, id)| (id, index))
            .collect()
    }

    /// Positions in particle-index order, in nanometers.
    pub fn positions(&self) -> Vec<Point3<f64>> {
        self.ordered_atom_ids()
            .into_iter()
            .filter_map(|id| self.atoms.get(id).map(|atom| atom.position))
            .collect()
    }

    /// Overwrites every position from a particle-ordered slice.
    pub fn set_positions(&mut self, positions: &[Point3<f64>]) -> Result<(), TopologyError> {
        let order = self.ordered_atom_ids();
        if order.len() != positions.len() {
            return Err(TopologyError::PositionCount {
                expected: order.len(),
                found: positions.len(),
            });
        }
        for (atom_id, position) in order.into_iter().zip(positions) {
            if let Some(atom) = self.atoms.get_mut(atom_id) {
                atom.position = *position;
            }
        }
        Ok(())
    }

    /// Whether a residue opens and/or closes its chain, as `(is_first, is_last)`.
    pub fn terminal_flags(&self, residue_id: ResidueId) -> (bool, bool) {
        let Some(chain) = self
            .residues
            .get(residue_id)
            .and_then(|residue| self.chains.get(residue.chain_id))
        else {
            return (false, false);
        };
        (
            chain.first_residue() == Some(residue_id),
            chain.last_residue() == Some(residue_id),
        )
    }
}
