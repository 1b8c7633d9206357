use super::error::ProposalError;
use super::topology_proposal::{ProposalMetadata, TopologyProposal};
use crate::core::models::atom::Atom;
use crate::core::models::ids::{ChainId, ResidueId};
use crate::core::models::topology::Topology;
use crate::core::templates::registry::TemplateRegistry;
use nalgebra::Point3;
use std::collections::BTreeMap;
use tracing::{debug, trace};

/// Residue edits of one proposal: residue number in the chain → new residue name.
pub type ResidueMap = BTreeMap<isize, String>;

/// Joins every residue name of the topology, in order, with `-`.
pub fn polymer_state_key(topology: &Topology) -> String {
    topology
        .residues_in_order()
        .into_iter()
        .filter_map(|id| topology.residue(id).map(|residue| residue.name.as_str()))
        .collect::<Vec<_>>()
        .join("-")
}

/// Looks up a chain by its identifier, listing the chains present on failure.
pub fn find_chain(topology: &Topology, chain_id: char) -> Result<ChainId, ProposalError> {
    topology
        .find_chain(chain_id)
        .ok_or_else(|| ProposalError::ChainNotFound {
            chain_id,
            present: topology.chains_iter().map(|(_, chain)| chain.id).collect(),
        })
}

/// Rebuilds residues of a polymer chain from templates.
pub struct PolymerMutator<'a> {
    templates: &'a TemplateRegistry,
}

impl<'a> PolymerMutator<'a> {
    pub fn new(templates: &'a TemplateRegistry) -> Self {
        Self { templates }
    }

    /// Applies `residue_map` to a copy of `current` and wraps the result in a proposal.
    ///
    /// Atoms that exist in both the old and the new residue keep their identity, so the
    /// atom map of the proposal covers every atom the edit did not touch.
    pub fn propose(
        &self,
        current: &Topology,
        chain_id: char,
        residue_map: &ResidueMap,
        metadata: ProposalMetadata,
    ) -> Result<TopologyProposal, ProposalError> {
        let old_topology = current.clone();
        let mut new_topology = current.clone();
        let chain = find_chain(&new_topology, chain_id)?;

        for (&number, new_name) in residue_map {
            let residue_id = new_topology
                .find_residue(chain, number)
                .ok_or(ProposalError::ResidueNotFound { chain_id, number })?;
            self.mutate_residue(&mut new_topology, residue_id, new_name)?;
        }

        let old_key = polymer_state_key(&old_topology);
        let new_key = polymer_state_key(&new_topology);
        debug!(%old_key, %new_key, "Built polymer proposal");
        TopologyProposal::from_shared_atoms(old_topology, new_topology, 0.0, old_key, new_key, metadata)
    }

    /// Turns one residue into `new_name`, using the terminal template variant when the
    /// residue opens or closes its chain.
    pub fn mutate_residue(
        &self,
        topology: &mut Topology,
        residue_id: ResidueId,
        new_name: &str,
    ) -> Result<(), ProposalError> {
        let (is_first, is_last) = topology.terminal_flags(residue_id);
        let (template_name, template) = self
            .templates
            .template_for(new_name, is_first, is_last)
            .ok_or_else(|| ProposalError::MissingTemplate(new_name.to_string()))?;
        trace!(template = %template_name, "Resolved residue template");

        let residue = topology
            .residue(residue_id)
            .ok_or(ProposalError::StaleResidueHandle)?;

        let excess: Vec<_> = residue
            .atoms()
            .iter()
            .copied()
            .filter(|&id| {
                topology
                    .atom(id)
                    .is_some_and(|atom| !template.has_atom(&atom.name))
            })
            .collect();
        for atom_id in excess {
            topology.remove_atom(atom_id);
        }

        let stale_bonds: Vec<_> = topology
            .residue_bonds(residue_id)
            .filter_map(|bond| {
                let a = topology.atom(bond.atom1_id)?;
                let b = topology.atom(bond.atom2_id)?;
                let intra = a.residue_id == residue_id && b.residue_id == residue_id;
                (intra && !template.has_bond(&a.name, &b.name))
                    .then_some((bond.atom1_id, bond.atom2_id))
            })
            .collect();
        for (a, b) in stale_bonds {
            topology.remove_bond_between(a, b);
        }

        for template_atom in &template.atoms {
            let present = topology
                .residue(residue_id)
                .is_some_and(|residue| residue.atom_id_by_name(&template_atom.name).is_some());
            if !present {
                let atom = Atom::new(
                    &template_atom.name,
                    &template_atom.element,
                    residue_id,
                    Point3::origin(),
                );
                topology.add_atom(residue_id, atom);
            }
        }

        let missing_bonds: Vec<_> = topology
            .residue(residue_id)
            .map(|residue| {
                template
                    .bonds
                    .iter()
                    .filter_map(|[a, b]| Some((residue.atom_id_by_name(a)?, residue.atom_id_by_name(b)?)))
                    .collect()
            })
            .unwrap_or_default();
        for (a, b) in missing_bonds {
            topology.add_bond(a, b);
        }

        if let Some(residue) = topology.residue_mut(residue_id) {
            residue.name = new_name.to_string();
        }
        Ok(())
    }
}
