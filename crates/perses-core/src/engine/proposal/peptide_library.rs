use super::error::ProposalError;
use super::polymer::{PolymerMutator, ResidueMap, find_chain, polymer_state_key};
use super::topology_proposal::{ProposalMetadata, TopologyProposal};
use super::ProposalEngine;
use crate::core::models::topology::Topology;
use crate::core::templates::registry::TemplateRegistry;
use crate::core::utils::amino_acids::{HISTIDINE_TAUTOMERS, three_letter_code};
use rand::Rng;
use rand::seq::SliceRandom;
use tracing::{debug, instrument};

/// Proposes whole peptide sequences drawn uniformly from a library.
///
/// Each library entry is a string of one-letter codes applied position by position from
/// the start of the chain; residues past the end of the entry are left untouched.
#[derive(Debug, Clone)]
pub struct PeptideLibraryEngine {
    chain_id: char,
    library: Vec<String>,
    templates: TemplateRegistry,
}

impl PeptideLibraryEngine {
    pub fn new(
        chain_id: char,
        library: Vec<String>,
        templates: TemplateRegistry,
    ) -> Result<Self, ProposalError> {
        if library.is_empty() {
            return Err(ProposalError::EmptyCandidates);
        }
        for code in library.iter().flat_map(|sequence| sequence.chars()) {
            three_letter_code(code).ok_or(ProposalError::UnknownResidueCode(code))?;
        }
        Ok(Self {
            chain_id,
            library,
            templates,
        })
    }

    pub fn library(&self) -> &[String] {
        &self.library
    }

    pub fn choose_sequence<R: Rng + ?Sized>(
        &self,
        topology: &Topology,
        rng: &mut R,
    ) -> Result<ResidueMap, ProposalError> {
        let chain_id = find_chain(topology, self.chain_id)?;
        let residues = topology
            .chain(chain_id)
            .map(|chain| chain.residues().to_vec())
            .unwrap_or_default();
        let sequence = self.library.choose(rng).ok_or(ProposalError::EmptyCandidates)?;

        let length = sequence.chars().count();
        if length > residues.len() {
            return Err(ProposalError::SequenceTooLong {
                length,
                chain_length: residues.len(),
            });
        }

        let mut residue_map = ResidueMap::new();
        for (code, residue_id) in sequence.chars().zip(residues) {
            let Some(residue) = topology.residue(residue_id) else {
                continue;
            };
            let mut name = three_letter_code(code)
                .ok_or(ProposalError::UnknownResidueCode(code))?
                .to_string();
            if name == "HIS" {
                name = HISTIDINE_TAUTOMERS[rng.gen_range(0..HISTIDINE_TAUTOMERS.len())].to_string();
            }
            residue_map.insert(residue.number, name);
        }
        Ok(residue_map)
    }
}

impl ProposalEngine for PeptideLibraryEngine {
    #[instrument(skip_all, fields(chain = %self.chain_id))]
    fn propose<R: Rng + ?Sized>(
        &self,
        current: &Topology,
        metadata: Option<&ProposalMetadata>,
        rng: &mut R,
    ) -> Result<TopologyProposal, ProposalError> {
        let residue_map = self.choose_sequence(current, rng)?;
        debug!(n_residues = residue_map.len(), "Chose library sequence");
        let metadata = metadata.cloned().unwrap_or_default();
        PolymerMutator::new(&self.templates).propose(current, self.chain_id, &residue_map, metadata)
    }

    fn compute_state_key(&self, topology: &Topology) -> String {
        polymer_state_key(topology)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::proposal::polymer::tests::tripeptide;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn engine(library: &[&str]) -> Result<PeptideLibraryEngine, ProposalError> {
        PeptideLibraryEngine::new(
            'A',
            library.iter().map(|s| s.to_string()).collect(),
            TemplateRegistry::amino_acids().unwrap(),
        )
    }

    #[test]
    fn new_validates_library() {
        assert!(matches!(engine(&[]), Err(ProposalError::EmptyCandidates)));
        assert!(matches!(engine(&["AXG"]), Err(ProposalError::UnknownResidueCode('X'))));
        assert_eq!(engine(&["AG", "ss"]).unwrap().library().len(), 2);
    }

    #[test]
    fn single_entry_library_sets_the_sequence() {
        let engine = engine(&["GWS"]).unwrap();
        let current = tripeptide(&["ALA", "LEU", "GLY"]);
        let proposal = engine
            .propose(&current, None, &mut StdRng::seed_from_u64(2))
            .unwrap();
        assert_eq!(proposal.new_chemical_state_key(), "GLY-TRP-SER");
    }

    #[test]
    fn shorter_sequences_leave_the_tail_untouched() {
        let engine = engine(&["V"]).unwrap();
        let current = tripeptide(&["ALA", "LEU", "GLY"]);
        let proposal = engine
            .propose(&current, None, &mut StdRng::seed_from_u64(2))
            .unwrap();
        assert_eq!(proposal.new_chemical_state_key(), "VAL-LEU-GLY");
    }

    #[test]
    fn histidine_codes_expand_to_tautomers() {
        let engine = engine(&["H"]).unwrap();
        let current = tripeptide(&["ALA", "LEU", "GLY"]);
        let map = engine
            .choose_sequence(&current, &mut StdRng::seed_from_u64(4))
            .unwrap();
        assert!(HISTIDINE_TAUTOMERS.contains(&map[&1].as_str()));
    }

    #[test]
    fn sequences_longer_than_the_chain_are_rejected() {
        let engine = engine(&["AAAA"]).unwrap();
        let current = tripeptide(&["ALA", "LEU", "GLY"]);
        let err = engine
            .propose(&current, None, &mut StdRng::seed_from_u64(2))
            .unwrap_err();
        assert!(matches!(
            err,
            ProposalError::SequenceTooLong { length: 4, chain_length: 3 }
        ));
    }

    #[test]
    fn library_entries_are_chosen_uniformly() {
        let engine = engine(&["A", "G"]).unwrap();
        let current = tripeptide(&["ALA", "LEU", "GLY"]);
        let mut rng = StdRng::seed_from_u64(21);
        let glycines = (0..2000)
            .filter(|_| engine.choose_sequence(&current, &mut rng).unwrap()[&1] == "GLY")
            .count();
        assert!((850..1150).contains(&glycines), "glycines = {}", glycines);
    }
}
