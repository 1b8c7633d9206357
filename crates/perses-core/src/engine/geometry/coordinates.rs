use crate::core::utils::geometry::{bond_angle, dihedral};
use nalgebra::{Point3, Rotation3, Unit, Vector3};

/// Position of an atom relative to its bond, angle and torsion partners.
///
/// `r` is in nanometers, `theta` lies in `[0, π]` and `phi` in `[-π, π]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InternalCoordinates {
    pub r: f64,
    pub theta: f64,
    pub phi: f64,
}

/// Places an atom from internal coordinates.
///
/// `bond` is the atom the new atom is bonded to, `angle` closes the bond angle and
/// `torsion` closes the dihedral `torsion-angle-bond-new`. Returns `None` when the three
/// reference atoms are collinear and the torsion is undefined.
pub fn internal_to_cartesian(
    bond: &Point3<f64>,
    angle: &Point3<f64>,
    torsion: &Point3<f64>,
    coordinates: &InternalCoordinates,
) -> Option<Point3<f64>> {
    let InternalCoordinates { r, theta, phi } = *coordinates;

    let bc = (bond - angle).try_normalize(f64::EPSILON)?;
    let n = (angle - torsion).cross(&bc).try_normalize(f64::EPSILON)?;
    let m = n.cross(&bc);

    let d: Vector3<f64> = bc * (-r * theta.cos())
        + m * (r * theta.sin() * phi.cos())
        + n * (r * theta.sin() * phi.sin());
    Some(bond + d)
}

/// Reads the internal coordinates of `atom` off Cartesian positions.
pub fn cartesian_to_internal(
    atom: &Point3<f64>,
    bond: &Point3<f64>,
    angle: &Point3<f64>,
    torsion: &Point3<f64>,
) -> InternalCoordinates {
    InternalCoordinates {
        r: (atom - bond).norm(),
        theta: bond_angle(atom, bond, angle),
        phi: dihedral(torsion, angle, bond, atom),
    }
}

/// `ln |r² sin θ|`, the log-Jacobian of the spherical-coordinate transform.
pub fn log_jacobian(r: f64, theta: f64) -> f64 {
    (r * r * theta.sin()).abs().ln()
}

/// Rotates `point` by `angle` radians about the axis through `origin` along `axis`.
///
/// The rotation is right-handed: positive angles turn counter-clockwise when viewed
/// from the tip of `axis`.
pub fn rotate_about_axis(
    point: &Point3<f64>,
    origin: &Point3<f64>,
    axis: &Vector3<f64>,
    angle: f64,
) -> Point3<f64> {
    let rotation = Rotation3::from_axis_angle(&Unit::new_normalize(*axis), angle);
    origin + rotation * (point - origin)
}

/// Candidate positions of an atom for `phis`, keeping `r` and `theta` fixed.
///
/// The first candidate is built directly; the rest follow by rotation about the
/// `angle → bond` axis, which shifts the dihedral by the rotation angle. Returns `None`
/// when the reference atoms are collinear.
pub fn torsion_scan(
    bond: &Point3<f64>,
    angle: &Point3<f64>,
    torsion: &Point3<f64>,
    r: f64,
    theta: f64,
    phis: &[f64],
) -> Option<Vec<Point3<f64>>> {
    let Some(&phi0) = phis.first() else {
        return Some(Vec::new());
    };
    let start = internal_to_cartesian(bond, angle, torsion, &InternalCoordinates { r, theta, phi: phi0 })?;
    let axis = bond - angle;
    Some(
        phis.iter()
            .map(|&phi| rotate_about_axis(&start, bond, &axis, phi - phi0))
            .collect(),
    )
}
