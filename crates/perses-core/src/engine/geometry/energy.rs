use super::valence::{HarmonicAngle, HarmonicBond, PeriodicTorsion, ValenceParameters};
use crate::core::utils::geometry::{bond_angle, dihedral};
use nalgebra::Point3;

/// Potential energy of a partially grown system, in kJ/mol.
///
/// Only terms whose atoms are all marked in `placed` contribute.
pub trait GrowthEnergy: Sync {
    fn energy(&self, positions: &[Point3<f64>], placed: &[bool]) -> f64;

    /// Energy with `atom` moved to `trial` and counted as placed.
    ///
    /// Implementations may drop terms that do not involve `atom`; a torsion scan only
    /// compares trial energies of one atom against each other.
    fn trial_energy(
        &self,
        atom: usize,
        trial: &Point3<f64>,
        positions: &[Point3<f64>],
        placed: &[bool],
    ) -> f64 {
        let mut positions = positions.to_vec();
        let mut placed = placed.to_vec();
        positions[atom] = *trial;
        placed[atom] = true;
        self.energy(&positions, &placed)
    }
}

#[derive(Debug, Clone, Copy)]
enum Term {
    Bond(usize),
    Angle(usize),
    Torsion(usize),
}

/// Growth energy made of the harmonic bonds, harmonic angles and periodic torsions of a
/// [`ValenceParameters`] set.
#[derive(Debug)]
pub struct ValenceGrowthEnergy<'a> {
    params: &'a ValenceParameters,
    atom_terms: Vec<Vec<Term>>,
}

impl<'a> ValenceGrowthEnergy<'a> {
    pub fn new(params: &'a ValenceParameters) -> Self {
        let mut atom_terms = vec![Vec::new(); params.n_atoms()];
        let mut register = |atoms: &[usize], term: Term| {
            for &i in atoms {
                if let Some(terms) = atom_terms.get_mut(i) {
                    terms.push(term);
                }
            }
        };
        for (slot, bond) in params.bonds().iter().enumerate() {
            register(&bond.atoms[..], Term::Bond(slot));
        }
        for (slot, angle) in params.angles().iter().enumerate() {
            register(&angle.atoms[..], Term::Angle(slot));
        }
        for (slot, torsion) in params.torsions().iter().enumerate() {
            register(&torsion.atoms[..], Term::Torsion(slot));
        }
        Self { params, atom_terms }
    }

    fn term_energy(
        &self,
        term: Term,
        position: impl Fn(usize) -> Point3<f64>,
        placed: impl Fn(usize) -> bool,
    ) -> f64 {
        match term {
            Term::Bond(slot) => {
                let HarmonicBond { atoms, length, k } = self.params.bonds()[slot];
                if !atoms.iter().all(|&i| placed(i)) {
                    return 0.0;
                }
                let r = (position(atoms[0]) - position(atoms[1])).norm();
                0.5 * k * (r - length).powi(2)
            }
            Term::Angle(slot) => {
                let HarmonicAngle { atoms, angle, k } = self.params.angles()[slot];
                if !atoms.iter().all(|&i| placed(i)) {
                    return 0.0;
                }
                let theta = bond_angle(&position(atoms[0]), &position(atoms[1]), &position(atoms[2]));
                0.5 * k * (theta - angle).powi(2)
            }
            Term::Torsion(slot) => {
                let PeriodicTorsion { atoms, periodicity, phase, k } = self.params.torsions()[slot];
                if !atoms.iter().all(|&i| placed(i)) {
                    return 0.0;
                }
                let phi = dihedral(
                    &position(atoms[0]),
                    &position(atoms[1]),
                    &position(atoms[2]),
                    &position(atoms[3]),
                );
                k * (1.0 + (periodicity as f64 * phi - phase).cos())
            }
        }
    }
}

impl GrowthEnergy for ValenceGrowthEnergy<'_> {
    fn energy(&self, positions: &[Point3<f64>], placed: &[bool]) -> f64 {
        let position = |i: usize| positions[i];
        let is_placed = |i: usize| placed.get(i).copied().unwrap_or(false);

        let bonds = (0..self.params.bonds().len()).map(Term::Bond);
        let angles = (0..self.params.angles().len()).map(Term::Angle);
        let torsions = (0..self.params.torsions().len()).map(Term::Torsion);
        bonds
            .chain(angles)
            .chain(torsions)
            .map(|term| self.term_energy(term, position, is_placed))
            .sum()
    }

    fn trial_energy(
        &self,
        atom: usize,
        trial: &Point3<f64>,
        positions: &[Point3<f64>],
        placed: &[bool],
    ) -> f64 {
        let position = |i: usize| if i == atom { *trial } else { positions[i] };
        let is_placed = |i: usize| i == atom || placed.get(i).copied().unwrap_or(false);

        self.atom_terms
            .get(atom)
            .map(|terms| {
                terms
                    .iter()
                    .map(|&term| self.term_energy(term, position, is_placed))
                    .sum()
            })
            .unwrap_or(0.0)
    }
}
