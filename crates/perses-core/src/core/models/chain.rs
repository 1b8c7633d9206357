use super::ids::ResidueId;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Classifies a chain for output purposes (ATOM versus HETATM records).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ChainType {
    #[default]
    Polymer,
    Hetero,
}

#[derive(Debug, Error)]
#[error("Invalid chain type string: '{0}'")]
pub struct ParseChainTypeError(String);

impl FromStr for ChainType {
    type Err = ParseChainTypeError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "polymer" | "protein" | "atom" => Ok(ChainType::Polymer),
            "hetero" | "ligand" | "hetatm" => Ok(ChainType::Hetero),
            _ => Err(ParseChainTypeError(s.to_string())),
        }
    }
}

impl fmt::Display for ChainType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ChainType::Polymer => "polymer",
            ChainType::Hetero => "hetero",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chain {
    pub id: char,
    pub chain_type: ChainType,
    pub(crate) residues: Vec<ResidueId>,
}

impl Chain {
    pub(crate) fn new(id: char, chain_type: ChainType) -> Self {
        Self {
            id,
            chain_type,
            residues: Vec::new(),
        }
    }

    pub fn residues(&self) -> &[ResidueId] {
        &self.residues
    }

    pub fn first_residue(&self) -> Option<ResidueId> {
        self.residues.first().copied()
    }

    pub fn last_residue(&self) -> Option<ResidueId> {
        self.residues.last().copied()
    }
}
