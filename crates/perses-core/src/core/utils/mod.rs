pub mod amino_acids;
pub mod elements;
pub mod geometry;
