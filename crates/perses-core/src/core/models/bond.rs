use super::ids::AtomId;

/// An undirected covalent bond.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Bond {
    pub atom1_id: AtomId,
    pub atom2_id: AtomId,
}

impl Bond {
    pub fn new(atom1_id: AtomId, atom2_id: AtomId) -> Self {
        Self { atom1_id, atom2_id }
    }

    pub fn contains(&self, atom_id: AtomId) -> bool {
        self.atom1_id == atom_id || self.atom2_id == atom_id
    }

    /// Returns `true` if the bond joins `a` and `b`, in either order.
    pub fn connects(&self, a: AtomId, b: AtomId) -> bool {
        (self.atom1_id == a && self.atom2_id == b) || (self.atom1_id == b && self.atom2_id == a)
    }

    /// The partner of `atom_id` in this bond, if `atom_id` participates.
    pub fn partner(&self, atom_id: AtomId) -> Option<AtomId> {
        if self.atom1_id == atom_id {
            Some(self.atom2_id)
        } else if self.atom2_id == atom_id {
            Some(self.atom1_id)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use slotmap::KeyData;

    fn dummy_atom_id(n: u64) -> AtomId {
        AtomId::from(KeyData::from_ffi(n))
    }

    #[test]
    fn connects_ignores_order() {
        let (a, b, c) = (dummy_atom_id(1), dummy_atom_id(2), dummy_atom_id(3));
        let bond = Bond::new(a, b);
        assert!(bond.connects(a, b));
        assert!(bond.connects(b, a));
        assert!(!bond.connects(a, c));
    }

    #[test]
    fn partner_returns_other_atom_or_none() {
        let (a, b, c) = (dummy_atom_id(10), dummy_atom_id(20), dummy_atom_id(30));
        let bond = Bond::new(a, b);
        assert_eq!(bond.partner(a), Some(b));
        assert_eq!(bond.partner(b), Some(a));
        assert_eq!(bond.partner(c), None);
        assert!(bond.contains(a) && !bond.contains(c));
    }
}
