use crate::core::models::chain::ChainType;
use crate::core::models::topology::Topology;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;
use tracing::debug;

const BUILTIN_AMINO_ACIDS: &str = include_str!("../../../data/amino_acids.toml");

#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct TemplateAtom {
    pub name: String,
    pub element: String,
}

#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ResidueTemplate {
    pub atoms: Vec<TemplateAtom>,
    #[serde(default)]
    pub bonds: Vec<[String; 2]>,
}

impl ResidueTemplate {
    pub fn atom(&self, name: &str) -> Option<&TemplateAtom> {
        self.atoms.iter().find(|atom| atom.name == name)
    }

    pub fn has_atom(&self, name: &str) -> bool {
        self.atom(name).is_some()
    }

    /// Whether the template bonds `a` and `b`, in either order.
    pub fn has_bond(&self, a: &str, b: &str) -> bool {
        self.bonds
            .iter()
            .any(|[x, y]| (x == a && y == b) || (x == b && y == a))
    }
}

/// Named residue templates. Chain-terminal variants are stored under the residue name
/// prefixed with `N` (first residue of a chain) or `C` (last residue).
#[derive(Debug, Clone, Default)]
pub struct TemplateRegistry {
    registry: HashMap<String, ResidueTemplate>,
}

impl TemplateRegistry {
    pub fn load(path: &Path) -> Result<Self, TemplateLoadError> {
        let content = std::fs::read_to_string(path).map_err(|e| TemplateLoadError::Io {
            path: path.to_string_lossy().to_string(),
            source: e,
        })?;
        let registry: HashMap<String, ResidueTemplate> =
            toml::from_str(&content).map_err(|e| TemplateLoadError::Toml {
                path: path.to_string_lossy().to_string(),
                source: e,
            })?;
        Ok(Self { registry })
    }

    /// The bundled templates for the standard amino acids and histidine tautomers.
    pub fn amino_acids() -> Result<Self, TemplateLoadError> {
        let registry = toml::from_str(BUILTIN_AMINO_ACIDS).map_err(|e| TemplateLoadError::Toml {
            path: "<builtin amino_acids.toml>".to_string(),
            source: e,
        })?;
        Ok(Self { registry })
    }

    /// Loads `path` when given, otherwise the bundled amino-acid templates.
    pub fn load_or_builtin(path: Option<&Path>) -> Result<Self, TemplateLoadError> {
        match path {
            Some(path) => Self::load(path),
            None => Self::amino_acids(),
        }
    }

    pub fn get(&self, residue_name: &str) -> Option<&ResidueTemplate> {
        self.registry.get(residue_name)
    }

    pub fn len(&self) -> usize {
        self.registry.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registry.is_empty()
    }

    /// Resolves the template for a residue at a given chain position.
    ///
    /// The `N`/`C` terminal variant is preferred when the residue opens or closes its
    /// chain; the plain template is used when no such variant exists. Returns the
    /// resolved template name with the template.
    pub fn template_for(
        &self,
        residue_name: &str,
        is_first: bool,
        is_last: bool,
    ) -> Option<(String, &ResidueTemplate)> {
        let mut candidates = Vec::with_capacity(3);
        if is_first {
            candidates.push(format!("N{}", residue_name));
        }
        if is_last {
            candidates.push(format!("C{}", residue_name));
        }
        candidates.push(residue_name.to_string());

        candidates
            .into_iter()
            .find_map(|name| self.registry.get(&name).map(|template| (name, template)))
    }

    /// Adds template bonds within every templated residue and peptide bonds between
    /// consecutive polymer residues. Returns the number of bonds added.
    pub fn apply_standard_bonds(&self, topology: &mut Topology) -> usize {
        let before = topology.bonds().len();
        let chains: Vec<_> = topology
            .chains_iter()
            .map(|(_, chain)| (chain.chain_type, chain.residues().to_vec()))
            .collect();

        for (chain_type, residues) in chains {
            for (position, &residue_id) in residues.iter().enumerate() {
                let Some(residue) = topology.residue(residue_id) else {
                    continue;
                };
                let is_first = position == 0;
                let is_last = position + 1 == residues.len();
                let Some((_, template)) = self.template_for(&residue.name, is_first, is_last)
                else {
                    debug!(residue = %residue.name, "No template; skipping intra-residue bonds");
                    continue;
                };
                let pairs: Vec<_> = template
                    .bonds
                    .iter()
                    .filter_map(|[a, b]| {
                        Some((residue.atom_id_by_name(a)?, residue.atom_id_by_name(b)?))
                    })
                    .collect();
                for (a, b) in pairs {
                    topology.add_bond(a, b);
                }
            }

            if chain_type != ChainType::Polymer {
                continue;
            }
            for window in residues.windows(2) {
                let carbon = topology
                    .residue(window[0])
                    .and_then(|residue| residue.atom_id_by_name("C"));
                let nitrogen = topology
                    .residue(window[1])
                    .and_then(|residue| residue.atom_id_by_name("N"));
                if let (Some(c), Some(n)) = (carbon, nitrogen) {
                    topology.add_bond(c, n);
                }
            }
        }

        topology.bonds().len() - before
    }
}

#[derive(Debug, Error)]
pub enum TemplateLoadError {
    #[error("File I/O error for '{path}': {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("TOML parsing error for '{path}': {source}")]
    Toml {
        path: String,
        source: toml::de::Error,
    },
}
