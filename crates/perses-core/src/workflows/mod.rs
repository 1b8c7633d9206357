//! # Workflows Module
//!
//! High-level entry points that tie the configuration, the file readers and the proposal
//! engines together. Each workflow loads its inputs, reports its phases through a
//! [`ProgressReporter`](crate::engine::progress::ProgressReporter) and returns a plain
//! result value that callers can inspect or persist.
//!
//! - **Setup Workflow** ([`setup`]) - Validates a setup document against its input
//!   files and builds the serialisable [`RelativeSetup`](setup::RelativeSetup) with its
//!   phase legs and sampling schedules.
//! - **Mutation Workflow** ([`mutate`]) - Proposes a point mutation on a structure,
//!   grows the new side-chain atoms and scores the reverse move.

pub mod mutate;
pub mod setup;
