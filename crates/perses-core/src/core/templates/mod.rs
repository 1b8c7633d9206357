//! Residue templates describing the atoms and intra-residue bonds of polymer residues.

pub mod registry;
