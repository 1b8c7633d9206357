use super::error::ProposalError;
use super::polymer::{PolymerMutator, ResidueMap, find_chain, polymer_state_key};
use super::topology_proposal::{ProposalMetadata, TopologyProposal};
use super::ProposalEngine;
use crate::core::models::topology::Topology;
use crate::core::templates::registry::TemplateRegistry;
use crate::core::utils::amino_acids::{
    AMINO_ACIDS, HISTIDINE_TAUTOMERS, canonical_residue_name, three_letter_code,
};
use rand::Rng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::{debug, instrument};

/// A single residue substitution: the residue number and its new three-letter name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Mutation {
    pub residue_number: isize,
    pub residue_name: String,
}

impl fmt::Display for Mutation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.residue_number, self.residue_name)
    }
}

impl FromStr for Mutation {
    type Err = ProposalError;

    /// Accepts `99-ALA` or the one-letter form `L99A` (the wild-type letter is ignored).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let invalid = || ProposalError::InvalidMutation(s.to_string());

        if let Some((number, name)) = s.split_once('-') {
            let residue_number = number.trim().parse().map_err(|_| invalid())?;
            let residue_name = name.trim().to_ascii_uppercase();
            if residue_name.is_empty() {
                return Err(invalid());
            }
            return Ok(Self {
                residue_number,
                residue_name,
            });
        }

        let mut chars = s.chars();
        let (Some(first), Some(last)) = (chars.next(), chars.next_back()) else {
            return Err(invalid());
        };
        if !first.is_ascii_alphabetic() || !last.is_ascii_alphabetic() {
            return Err(invalid());
        }
        let residue_number = chars.as_str().parse().map_err(|_| invalid())?;
        let residue_name = three_letter_code(last)
            .ok_or(ProposalError::UnknownResidueCode(last))?
            .to_string();
        Ok(Self {
            residue_number,
            residue_name,
        })
    }
}

/// How a [`PointMutationEngine`] picks mutations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum MutationPolicy {
    /// Up to `max_point_mutants` random substitutions, each at a uniformly chosen residue
    /// (restricted to `residues_allowed_to_mutate` when given) to a uniformly chosen
    /// different amino acid. Picking the same residue twice keeps the later choice.
    Random {
        max_point_mutants: usize,
        residues_allowed_to_mutate: Option<Vec<isize>>,
    },
    /// One of the listed mutant states, chosen uniformly.
    Allowed(Vec<Vec<Mutation>>),
}

/// Proposes point mutations on one chain of a polymer.
#[derive(Debug, Clone)]
pub struct PointMutationEngine {
    chain_id: char,
    policy: MutationPolicy,
    templates: TemplateRegistry,
}

impl PointMutationEngine {
    pub fn new(
        chain_id: char,
        policy: MutationPolicy,
        templates: TemplateRegistry,
    ) -> Result<Self, ProposalError> {
        match &policy {
            MutationPolicy::Random {
                max_point_mutants,
                residues_allowed_to_mutate,
            } => {
                if *max_point_mutants == 0
                    || residues_allowed_to_mutate.as_ref().is_some_and(|r| r.is_empty())
                {
                    return Err(ProposalError::NoMutableResidues);
                }
            }
            MutationPolicy::Allowed(states) => {
                if states.is_empty() {
                    return Err(ProposalError::EmptyCandidates);
                }
                for mutation in states.iter().flatten() {
                    let name = mutation.residue_name.as_str();
                    if templates.get(name).is_none() && !AMINO_ACIDS.contains(&name) {
                        return Err(ProposalError::UnknownResidue(name.to_string()));
                    }
                }
            }
        }
        Ok(Self {
            chain_id,
            policy,
            templates,
        })
    }

    pub fn chain_id(&self) -> char {
        self.chain_id
    }

    pub fn policy(&self) -> &MutationPolicy {
        &self.policy
    }

    /// Draws the residue edits of one proposal.
    pub fn choose_mutations<R: Rng + ?Sized>(
        &self,
        topology: &Topology,
        rng: &mut R,
    ) -> Result<ResidueMap, ProposalError> {
        let chain_id = find_chain(topology, self.chain_id)?;
        let chain = topology
            .chain(chain_id)
            .ok_or(ProposalError::NoMutableResidues)?;

        let mut residue_map = ResidueMap::new();
        match &self.policy {
            MutationPolicy::Allowed(states) => {
                let state = states.choose(rng).ok_or(ProposalError::EmptyCandidates)?;
                for mutation in state {
                    if topology.find_residue(chain_id, mutation.residue_number).is_none() {
                        return Err(ProposalError::ResidueNotFound {
                            chain_id: self.chain_id,
                            number: mutation.residue_number,
                        });
                    }
                    let name = resolve_histidine(&mutation.residue_name, rng);
                    residue_map.insert(mutation.residue_number, name);
                }
            }
            MutationPolicy::Random {
                max_point_mutants,
                residues_allowed_to_mutate,
            } => {
                let candidates: Vec<_> = chain
                    .residues()
                    .iter()
                    .filter_map(|&id| topology.residue(id))
                    .filter(|residue| {
                        residues_allowed_to_mutate
                            .as_ref()
                            .is_none_or(|allowed| allowed.contains(&residue.number))
                    })
                    .collect();
                if candidates.is_empty() {
                    return Err(ProposalError::NoMutableResidues);
                }

                for _ in 0..*max_point_mutants {
                    let residue = candidates[rng.gen_range(0..candidates.len())];
                    let current = canonical_residue_name(&residue.name);
                    let choices: Vec<&str> = AMINO_ACIDS
                        .iter()
                        .copied()
                        .filter(|&name| name != current)
                        .collect();
                    let proposed = choices.choose(rng).ok_or(ProposalError::EmptyCandidates)?;
                    residue_map.insert(residue.number, resolve_histidine(proposed, rng));
                }
            }
        }
        Ok(residue_map)
    }

    /// Formats the chosen edits as `WT-number-MUT`, in chain order.
    fn describe_mutations(&self, topology: &Topology, residue_map: &ResidueMap) -> Vec<String> {
        let Some(chain) = topology
            .find_chain(self.chain_id)
            .and_then(|id| topology.chain(id))
        else {
            return Vec::new();
        };
        chain
            .residues()
            .iter()
            .filter_map(|&id| topology.residue(id))
            .filter_map(|residue| {
                residue_map
                    .get(&residue.number)
                    .map(|new_name| format!("{}-{}-{}", residue.name, residue.number, new_name))
            })
            .collect()
    }
}

/// Expands a generic histidine into one of its tautomers with equal probability.
fn resolve_histidine<R: Rng + ?Sized>(name: &str, rng: &mut R) -> String {
    if name == "HIS" {
        HISTIDINE_TAUTOMERS[rng.gen_range(0..HISTIDINE_TAUTOMERS.len())].to_string()
    } else {
        name.to_string()
    }
}

impl ProposalEngine for PointMutationEngine {
    #[instrument(skip_all, fields(chain = %self.chain_id))]
    fn propose<R: Rng + ?Sized>(
        &self,
        current: &Topology,
        metadata: Option<&ProposalMetadata>,
        rng: &mut R,
    ) -> Result<TopologyProposal, ProposalError> {
        let residue_map = self.choose_mutations(current, rng)?;
        let mut metadata = metadata.cloned().unwrap_or_default();
        metadata.mutations = self.describe_mutations(current, &residue_map);
        debug!(mutations = ?metadata.mutations, "Chose point mutations");

        PolymerMutator::new(&self.templates).propose(current, self.chain_id, &residue_map, metadata)
    }

    fn compute_state_key(&self, topology: &Topology) -> String {
        polymer_state_key(topology)
    }
}
