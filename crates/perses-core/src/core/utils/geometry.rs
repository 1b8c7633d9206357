use nalgebra::{Point3, Vector3};

/// Angle at `center` formed by `a` and `b`, in radians within `[0, π]`.
pub fn bond_angle(a: &Point3<f64>, center: &Point3<f64>, b: &Point3<f64>) -> f64 {
    let u = a - center;
    let v = b - center;
    let denom = u.norm() * v.norm();
    if denom <= f64::EPSILON {
        return 0.0;
    }
    (u.dot(&v) / denom).clamp(-1.0, 1.0).acos()
}

/// Dihedral angle of the chain `p0-p1-p2-p3` in radians within `[-π, π]`.
///
/// A cis arrangement (`p0` and `p3` on the same side of the `p1-p2` axis) gives zero.
pub fn dihedral(p0: &Point3<f64>, p1: &Point3<f64>, p2: &Point3<f64>, p3: &Point3<f64>) -> f64 {
    let b0: Vector3<f64> = p0 - p1;
    let b1: Vector3<f64> = p2 - p1;
    let b2: Vector3<f64> = p3 - p2;

    let b1_norm = b1.norm();
    if b1_norm <= f64::EPSILON {
        return 0.0;
    }
    let b1 = b1 / b1_norm;

    let v = b0 - b1 * b0.dot(&b1);
    let w = b2 - b1 * b2.dot(&b1);
    let x = v.dot(&w);
    let y = b1.cross(&v).dot(&w);
    y.atan2(x)
}

/// Wraps an angle into `[-π, π)`.
pub fn wrap_angle(angle: f64) -> f64 {
    use std::f64::consts::PI;
    let wrapped = (angle + PI).rem_euclid(2.0 * PI) - PI;
    if wrapped >= PI { wrapped - 2.0 * PI } else { wrapped }
}
