//! # Engine Module
//!
//! The computational layer: everything needed to go from a setup document to a proposed
//! alchemical transformation.
//!
//! ## Architecture
//!
//! - **Configuration** ([`config`]) - The YAML setup document, its builder and validation
//! - **Schedules** ([`schedule`]) - Alchemical lambda ladders, switching protocols and SAMS iteration plans
//! - **Topology Proposals** ([`proposal`]) - Point mutations and peptide-library moves on polymer chains
//! - **Geometry Proposals** ([`geometry`]) - Placement of newly created atoms in internal coordinates
//! - **Progress Monitoring** ([`progress`]) - Callback-based progress reporting
//! - **Error Handling** ([`error`]) - The umbrella error type of the workflows
//!
//! Random choices are drawn from a caller-supplied [`rand::Rng`], so every proposal is
//! reproducible from a seeded generator.

pub mod config;
pub mod error;
pub mod geometry;
pub mod progress;
pub mod proposal;
pub mod schedule;
pub mod utils;
