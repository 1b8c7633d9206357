//! Topology proposals: transformations of one chemical state into another.
//!
//! A proposal engine takes the current [`Topology`] and returns a [`TopologyProposal`]
//! holding the old and new topologies, the map between the atoms they share and the
//! log-probability of having proposed the move.

mod error;
pub mod peptide_library;
pub mod point_mutation;
pub mod polymer;
pub mod topology_proposal;

pub use error::ProposalError;
pub use peptide_library::PeptideLibraryEngine;
pub use point_mutation::{MutationPolicy, PointMutationEngine};
pub use topology_proposal::{ProposalMetadata, TopologyProposal};

use crate::core::models::topology::Topology;
use rand::Rng;

/// A source of topology proposals.
pub trait ProposalEngine {
    /// Proposes a new chemical state starting from `current`.
    ///
    /// `metadata` is carried into the proposal; engines add their own entries to it.
    fn propose<R: Rng + ?Sized>(
        &self,
        current: &Topology,
        metadata: Option<&ProposalMetadata>,
        rng: &mut R,
    ) -> Result<TopologyProposal, ProposalError>;

    /// The string identifying the chemical state of `topology` under this engine's scheme.
    fn compute_state_key(&self, topology: &Topology) -> String;
}
