//! Numerical helpers shared by the proposal and geometry engines.

pub mod sampling;
