use std::path::PathBuf;
use thiserror::Error;

use super::config::ConfigError;
use super::geometry::GeometryError;
use super::proposal::ProposalError;
use super::schedule::ScheduleError;
use crate::core::io::ligand::LigandFileError;
use crate::core::io::pdb::PdbError;
use crate::core::io::placements::PlacementWriteError;
use crate::core::models::topology::TopologyError;
use crate::core::templates::registry::TemplateLoadError;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("Required input {what} not found: {path:?}")]
    MissingInput { what: &'static str, path: PathBuf },

    #[error("Ligand file error: {0}")]
    Ligand(#[from] LigandFileError),

    #[error("Ligand index {index} is out of range (file holds {count} molecules)")]
    LigandIndexOutOfRange { index: usize, count: usize },

    #[error("Structure file error: {0}")]
    Structure(#[from] PdbError),

    #[error("Residue template error: {0}")]
    Templates(#[from] TemplateLoadError),

    #[error("Topology error: {0}")]
    Topology(#[from] TopologyError),

    #[error("Topology proposal failed: {0}")]
    Proposal(#[from] ProposalError),

    #[error("Geometry proposal failed: {0}")]
    Geometry(#[from] GeometryError),

    #[error("Failed to write placements: {0}")]
    Placements(#[from] PlacementWriteError),

    #[error("Schedule error: {0}")]
    Schedule(#[from] ScheduleError),

    #[error("File I/O error for '{path}': {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("Failed to (de)serialize setup artifact '{path}': {source}")]
    Serialization {
        path: String,
        source: bincode::Error,
    },

    #[error("Setup phase '{phase}' failed: {reason}")]
    PhaseFailed { phase: &'static str, reason: String },
}
