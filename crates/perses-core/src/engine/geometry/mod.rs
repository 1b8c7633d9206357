//! Geometry proposals: placing the atoms a topology proposal creates, and scoring the
//! placement of the atoms it deletes.
//!
//! Atoms are grown one at a time in internal coordinates `(r, θ, φ)` relative to three
//! already positioned atoms. Bond lengths and angles are drawn from discretised
//! Boltzmann-weighted distributions of their harmonic terms; torsions are drawn from a
//! scan of the growth energy around the bond axis. The log-probability of every choice
//! is accumulated so the move can enter a Metropolis-Hastings acceptance ratio.

mod coordinates;
mod energy;
mod engine;
mod order;
mod pmf;
mod valence;

pub use coordinates::{
    InternalCoordinates, cartesian_to_internal, internal_to_cartesian, log_jacobian,
    rotate_about_axis, torsion_scan,
};
pub use energy::{GrowthEnergy, ValenceGrowthEnergy};
pub use engine::{FFAllAngleGeometryEngine, GeometryEngine, GeometryProposal, ProposalSystems};
pub use order::{ProposalOrder, TorsionPath};
pub use pmf::{
    ANGLE_DIVISIONS, ANGLE_EPSILON, BOND_DIVISIONS, DiscretePmf, LOG_ZERO, TORSION_DIVISIONS,
};
pub use valence::{Constraint, HarmonicAngle, HarmonicBond, PeriodicTorsion, ValenceParameters};

use super::utils::sampling::SamplingError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GeometryError {
    #[error("Expected {expected} positions but received {found}")]
    PositionCount { expected: usize, found: usize },

    #[error("Parameters describe {found} atoms but the topology has {expected}")]
    ParameterCount { expected: usize, found: usize },

    #[error("Atom {atom} has neither a bond term nor a constraint to atom {partner}")]
    NoBondOrConstraint { atom: usize, partner: usize },

    #[error("No angle term spans atoms {atoms:?}")]
    MissingAngle { atoms: [usize; 3] },

    #[error("Reference atoms {atoms:?} are collinear, the torsion of atom {atom} is undefined")]
    LinearReference { atom: usize, atoms: [usize; 3] },

    #[error("Every torsion energy of atom {atom} evaluated to NaN")]
    AllTorsionsNaN { atom: usize },

    #[error("No torsion connects atoms {atoms:?} to positioned atoms")]
    UnreachableAtoms { atoms: Vec<usize> },

    #[error("Invalid {what}: {value}")]
    InvalidParameter { what: &'static str, value: f64 },

    #[error("Sampling failed: {0}")]
    Sampling(#[from] SamplingError),
}
