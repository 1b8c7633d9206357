//! # Core Module
//!
//! Fundamental building blocks shared by every proposal and setup routine.
//!
//! ## Architecture
//!
//! - **Molecular Representation** ([`models`]) - Topologies built from chains, residues, atoms and bonds
//! - **File I/O** ([`io`]) - PDB structures, multi-molecule ligand files and placement records
//! - **Residue Templates** ([`templates`]) - Atom and bond definitions used to build mutated residues
//! - **Utilities** ([`utils`]) - Amino-acid code tables, element lookups and vector geometry
//!
//! All positions handled by this layer are expressed in nanometers. File formats that use
//! other units (PDB stores Angstroms) are converted at the I/O boundary.

pub mod io;
pub mod models;
pub mod templates;
pub mod utils;
