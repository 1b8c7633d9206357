//! # perses
//!
//! A library for preparing relative alchemical free-energy calculations: validated setup
//! documents, topology proposals that transform one chemical state into another, and
//! geometry proposals that place the atoms a transformation creates.
//!
//! ## Architectural Philosophy
//!
//! The library follows a strict three-layer architecture.
//!
//! - **[`core`]: The Foundation.** Stateless data models (`Topology`, atoms, residues,
//!   chains, bonds), file I/O (PDB structures, ligand collections, residue templates) and
//!   small lookup utilities.
//!
//! - **[`engine`]: The Logic Core.** The setup configuration and its validation, sampling
//!   schedules, topology proposal engines (point mutations, peptide libraries) and the
//!   all-angle geometry engine with its discretised internal-coordinate distributions.
//!
//! - **[`workflows`]: The Public API.** End-to-end procedures that tie `engine` and `core`
//!   together, such as building and persisting a relative setup from a YAML document or
//!   proposing a point mutation on a structure.

pub mod core;
pub mod engine;
pub mod workflows;
