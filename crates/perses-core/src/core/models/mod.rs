//! # Core Models Module
//!
//! Data structures describing the connectivity and coordinates of a molecular system.
//!
//! ## Key Components
//!
//! - [`atom`] - A single atom with its element and position
//! - [`residue`] - A named residue owning an ordered set of atoms
//! - [`chain`] - An ordered sequence of residues
//! - [`bond`] - An undirected connection between two atoms
//! - [`topology`] - The complete system, with lookups and a bond adjacency cache
//! - [`ids`] - Stable keys for atoms, residues and chains
//!
//! ## Atom indices
//!
//! Keys are stable across edits and clones, which lets two topologies derived from one
//! another share atom identities. The dense, 0-based particle index used by position
//! arrays and atom maps is derived on demand from the chain → residue → atom order.
//!
//! ```ignore
//! use perses::core::models::{atom::Atom, topology::Topology};
//!
//! let mut topology = Topology::new();
//! let chain = topology.add_chain('A');
//! let residue = topology.add_residue(chain, 1, "ALA")?;
//! let ca = topology.add_atom(residue, Atom::new("CA", "C", residue, Point3::origin()))?;
//! ```

pub mod atom;
pub mod bond;
pub mod chain;
pub mod ids;
pub mod residue;
pub mod topology;
