use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProposalError {
    #[error(
        "Atom map entry {new_index} -> {old_index} lies outside the atom ranges (new: {n_new}, old: {n_old})"
    )]
    AtomMapOutOfRange {
        new_index: usize,
        old_index: usize,
        n_new: usize,
        n_old: usize,
    },

    #[error("Old atom {old_index} is mapped from more than one new atom")]
    NonInjectiveAtomMap { old_index: usize },

    #[error("Chain '{chain_id}' not found in topology; chains present are: {present:?}")]
    ChainNotFound { chain_id: char, present: Vec<char> },

    #[error("Residue {number} not found in chain '{chain_id}'")]
    ResidueNotFound { chain_id: char, number: isize },

    #[error("Residue handle does not belong to the topology")]
    StaleResidueHandle,

    #[error("No residue template named '{0}'")]
    MissingTemplate(String),

    #[error("Unknown amino acid '{0}'")]
    UnknownResidue(String),

    #[error("Unknown one-letter amino acid code '{0}'")]
    UnknownResidueCode(char),

    #[error("Invalid mutation '{0}' (expected e.g. 'L99A' or '99-ALA')")]
    InvalidMutation(String),

    #[error("No residues are available to mutate")]
    NoMutableResidues,

    #[error("The proposal engine has no candidates to choose from")]
    EmptyCandidates,

    #[error("Library sequence of length {length} exceeds chain length {chain_length}")]
    SequenceTooLong { length: usize, chain_length: usize },
}
