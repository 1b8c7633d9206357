use super::ids::ResidueId;
use crate::core::utils::elements;
use nalgebra::Point3;

/// An atom of a molecular topology.
///
/// Atoms carry only what proposals need: an identity within their residue, a chemical
/// element and a position. Force-field parameters live outside the topology.
#[derive(Debug, Clone, PartialEq)]
pub struct Atom {
    /// The name of the atom within its residue (e.g., "CA", "HB2").
    pub name: String,
    /// Element symbol with conventional capitalisation (e.g., "C", "Cl").
    pub element: String,
    /// The ID of the parent residue this atom belongs to.
    pub residue_id: ResidueId,
    /// Cartesian position in nanometers.
    pub position: Point3<f64>,
}

impl Atom {
    /// Creates a new atom.
    ///
    /// The element symbol is normalised (`"CL"` becomes `"Cl"`). When `element` is empty
    /// the element is inferred from the atom name.
    ///
    /// # Arguments
    ///
    /// * `name` - The atom name.
    /// * `element` - The element symbol, or an empty string to infer it.
    /// * `residue_id` - The ID of the residue this atom belongs to.
    /// * `position` - Position in nanometers.
    pub fn new(name: &str, element: &str, residue_id: ResidueId, position: Point3<f64>) -> Self {
        let element = if element.trim().is_empty() {
            elements::element_from_atom_name(name)
        } else {
            elements::normalize_symbol(element)
        };
        Self {
            name: name.to_string(),
            element,
            residue_id,
            position,
        }
    }

    /// Returns `true` for hydrogen and its isotopes.
    pub fn is_hydrogen(&self) -> bool {
        elements::is_hydrogen_symbol(&self.element)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use slotmap::KeyData;

    fn dummy_residue_id() -> ResidueId {
        ResidueId::from(KeyData::from_ffi(7))
    }

    #[test]
    fn new_atom_normalizes_element_symbol() {
        let atom = Atom::new("CL1", "CL", dummy_residue_id(), Point3::origin());
        assert_eq!(atom.element, "Cl");
        assert_eq!(atom.name, "CL1");
    }

    #[test]
    fn new_atom_infers_element_when_missing() {
        let atom = Atom::new("HB2", "", dummy_residue_id(), Point3::origin());
        assert_eq!(atom.element, "H");
        assert!(atom.is_hydrogen());

        let atom = Atom::new("CA", " ", dummy_residue_id(), Point3::origin());
        assert_eq!(atom.element, "C");
        assert!(!atom.is_hydrogen());
    }

    #[test]
    fn deuterium_counts_as_hydrogen() {
        let atom = Atom::new("D1", "D", dummy_residue_id(), Point3::new(0.1, 0.2, 0.3));
        assert!(atom.is_hydrogen());
        assert_eq!(atom.position, Point3::new(0.1, 0.2, 0.3));
    }
}
