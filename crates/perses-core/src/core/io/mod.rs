//! Reading and writing of molecular files.
//!
//! Structures are exchanged through the [`traits::MolecularFile`] interface (PDB for
//! receptors and peptides). Ligand files are only scanned for their molecule entries,
//! and geometry proposals can be exported as CSV placement records.

pub mod ligand;
pub mod pdb;
pub mod placements;
pub mod traits;
