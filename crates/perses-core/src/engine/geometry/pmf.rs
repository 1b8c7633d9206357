use super::GeometryError;
use crate::engine::utils::sampling::{normalize_log_weights, sample_log_weights};
use rand::Rng;
use std::f64::consts::PI;

/// Log-probability assigned to values outside a distribution's support.
pub const LOG_ZERO: f64 = -1.0e6;

pub const BOND_DIVISIONS: usize = 1000;
pub const ANGLE_DIVISIONS: usize = 180;
pub const TORSION_DIVISIONS: usize = 360;

/// Distance of the angle grid from 0 and π, where `sin θ` vanishes.
pub const ANGLE_EPSILON: f64 = 1.0e-3;

/// Width of the bond-length window in standard deviations on either side of `r0`.
const BOND_WINDOW_SIGMAS: f64 = 6.0;

/// A one-dimensional distribution discretised into equal-width bins.
///
/// Bin `i` covers `[lower + i·w, lower + (i+1)·w)` and carries the normalised
/// log-probability mass `log_p[i]`. Within a bin the density is uniform.
#[derive(Debug, Clone, PartialEq)]
pub struct DiscretePmf {
    lower: f64,
    width: f64,
    log_p: Vec<f64>,
}

impl DiscretePmf {
    /// Bond-length distribution `p(r) ∝ r² exp(-βk(r - r0)² / 2)`.
    ///
    /// The support is `[max(0, r0 - 6σ), r0 + 6σ)` with `σ = (βk)^(-1/2)`.
    pub fn bond(r0: f64, k: f64, beta: f64, divisions: usize) -> Result<Self, GeometryError> {
        let sigma = standard_deviation(k, beta)?;
        if !(r0.is_finite() && r0 > 0.0) {
            return Err(GeometryError::InvalidParameter { what: "equilibrium bond length", value: r0 });
        }
        let lower = (r0 - BOND_WINDOW_SIGMAS * sigma).max(0.0);
        let upper = r0 + BOND_WINDOW_SIGMAS * sigma;
        Self::tabulate(lower, upper, divisions, |r| {
            2.0 * r.ln() - 0.5 * ((r - r0) / sigma).powi(2)
        })
    }

    /// Bond-angle distribution `p(θ) ∝ sin θ exp(-βk(θ - θ0)² / 2)` on `[ε, π - ε)`.
    pub fn angle(theta0: f64, k: f64, beta: f64, divisions: usize) -> Result<Self, GeometryError> {
        let sigma = standard_deviation(k, beta)?;
        Self::tabulate(ANGLE_EPSILON, PI - ANGLE_EPSILON, divisions, |theta| {
            theta.sin().ln() - 0.5 * ((theta - theta0) / sigma).powi(2)
        })
    }

    /// Torsion distribution from unnormalised log-weights on `[-π, π)`.
    ///
    /// NaN weights are suppressed to zero probability; a scan that is NaN everywhere
    /// is an error.
    pub fn torsion(log_q: &[f64], atom: usize) -> Result<Self, GeometryError> {
        if log_q.is_empty() || log_q.iter().all(|q| q.is_nan()) {
            return Err(GeometryError::AllTorsionsNaN { atom });
        }
        let cleaned: Vec<f64> = log_q
            .iter()
            .map(|&q| if q.is_nan() { f64::NEG_INFINITY } else { q })
            .collect();
        Ok(Self {
            lower: -PI,
            width: 2.0 * PI / log_q.len() as f64,
            log_p: normalize_log_weights(&cleaned),
        })
    }

    /// Grid points `lower + i·w` of a torsion scan with `divisions` bins.
    pub fn torsion_grid(divisions: usize) -> Vec<f64> {
        let width = 2.0 * PI / divisions as f64;
        (0..divisions).map(|i| -PI + i as f64 * width).collect()
    }

    fn tabulate(
        lower: f64,
        upper: f64,
        divisions: usize,
        log_density: impl Fn(f64) -> f64,
    ) -> Result<Self, GeometryError> {
        if divisions == 0 {
            return Err(GeometryError::InvalidParameter { what: "number of bins", value: 0.0 });
        }
        let width = (upper - lower) / divisions as f64;
        // Each bin is represented by its midpoint.
        let log_q: Vec<f64> = (0..divisions)
            .map(|i| log_density(lower + i as f64 * width + 0.5 * width))
            .collect();
        Ok(Self {
            lower,
            width,
            log_p: normalize_log_weights(&log_q),
        })
    }

    pub fn lower(&self) -> f64 {
        self.lower
    }

    pub fn upper(&self) -> f64 {
        self.lower + self.width * self.log_p.len() as f64
    }

    pub fn bin_width(&self) -> f64 {
        self.width
    }

    pub fn len(&self) -> usize {
        self.log_p.len()
    }

    pub fn is_empty(&self) -> bool {
        self.log_p.is_empty()
    }

    /// Normalised log-probability mass of each bin.
    pub fn log_masses(&self) -> &[f64] {
        &self.log_p
    }

    /// Start of bin `index`.
    pub fn bin_start(&self, index: usize) -> f64 {
        self.lower + index as f64 * self.width
    }

    /// Bin containing `value`, or `None` outside the support.
    pub fn bin_of(&self, value: f64) -> Option<usize> {
        if !(value >= self.lower && value < self.upper()) {
            return None;
        }
        let index = ((value - self.lower) / self.width).floor() as usize;
        Some(index.min(self.log_p.len() - 1))
    }

    /// Log-density at `value`: the mass of its bin minus `ln w`, or [`LOG_ZERO`] outside
    /// the support.
    pub fn log_density(&self, value: f64) -> f64 {
        match self.bin_of(value) {
            Some(index) => self.log_p[index] - self.width.ln(),
            None => LOG_ZERO,
        }
    }

    /// Log-density using the bin whose start lies closest to `value`.
    pub fn nearest_bin_log_density(&self, value: f64) -> f64 {
        let index = (0..self.log_p.len())
            .min_by(|&a, &b| {
                let da = (value - self.bin_start(a)).abs();
                let db = (value - self.bin_start(b)).abs();
                da.total_cmp(&db)
            })
            .unwrap_or(0);
        self.log_p[index] - self.width.ln()
    }

    /// Draws a value: a bin by its mass, then a uniform offset within the bin.
    ///
    /// Returns the value and its log-density.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<(f64, f64), GeometryError> {
        let index = sample_log_weights(&self.log_p, rng)?;
        let value = self.bin_start(index) + rng.gen_range(0.0..self.width);
        Ok((value, self.log_p[index] - self.width.ln()))
    }
}

fn standard_deviation(k: f64, beta: f64) -> Result<f64, GeometryError> {
    if !(beta.is_finite() && beta > 0.0) {
        return Err(GeometryError::InvalidParameter { what: "inverse temperature", value: beta });
    }
    if !(k.is_finite() && k > 0.0) {
        return Err(GeometryError::InvalidParameter { what: "force constant", value: k });
    }
    Ok((1.0 / (beta * k)).sqrt())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    const BETA: f64 = 1.0 / (0.008314462618 * 300.0);

    fn total_mass(pmf: &DiscretePmf) -> f64 {
        pmf.log_masses().iter().map(|p| p.exp()).sum()
    }

    #[test]
    fn bond_pmf_is_normalised_and_centred() {
        let pmf = DiscretePmf::bond(0.1, 250_000.0, BETA, BOND_DIVISIONS).unwrap();
        assert_eq!(pmf.len(), BOND_DIVISIONS);
        assert_relative_eq!(total_mass(&pmf), 1.0, epsilon = 1e-9);

        let sigma = (1.0 / (BETA * 250_000.0)).sqrt();
        assert_relative_eq!(pmf.lower(), 0.1 - 6.0 * sigma, epsilon = 1e-12);
        assert_relative_eq!(pmf.upper(), 0.1 + 6.0 * sigma, epsilon = 1e-12);
        assert!(pmf.log_density(0.1) > pmf.log_density(0.1 + 3.0 * sigma));
    }

    #[test]
    fn soft_bond_window_is_clipped_at_zero() {
        let pmf = DiscretePmf::bond(0.1, 10.0, BETA, 100).unwrap();
        assert_eq!(pmf.lower(), 0.0);
        assert!(pmf.log_masses().iter().all(|p| p.is_finite()));
    }

    #[test]
    fn angle_pmf_spans_open_interval() {
        let pmf = DiscretePmf::angle(1.911, 400.0, BETA, ANGLE_DIVISIONS).unwrap();
        assert_relative_eq!(pmf.lower(), ANGLE_EPSILON);
        assert_relative_eq!(pmf.upper(), PI - ANGLE_EPSILON, epsilon = 1e-12);
        assert_relative_eq!(total_mass(&pmf), 1.0, epsilon = 1e-9);
    }

    #[test]
    fn values_outside_support_get_log_zero() {
        let pmf = DiscretePmf::bond(0.15, 250_000.0, BETA, 500).unwrap();
        assert_eq!(pmf.log_density(0.5), LOG_ZERO);
        assert_eq!(pmf.log_density(pmf.upper()), LOG_ZERO);
        assert_eq!(pmf.log_density(f64::NAN), LOG_ZERO);
        assert!(pmf.log_density(pmf.lower()) > LOG_ZERO);
    }

    #[test]
    fn log_density_integrates_to_one() {
        let pmf = DiscretePmf::angle(2.0, 100.0, BETA, 90).unwrap();
        let integral: f64 = (0..pmf.len())
            .map(|i| pmf.log_density(pmf.bin_start(i) + 0.5 * pmf.bin_width()).exp() * pmf.bin_width())
            .sum();
        assert_relative_eq!(integral, 1.0, epsilon = 1e-9);
    }

    #[test]
    fn samples_stay_in_support_and_report_their_density() {
        let pmf = DiscretePmf::bond(0.109, 250_000.0, BETA, BOND_DIVISIONS).unwrap();
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..500 {
            let (r, logp) = pmf.sample(&mut rng).unwrap();
            assert!(r >= pmf.lower() && r < pmf.upper());
            assert_relative_eq!(logp, pmf.log_density(r), epsilon = 1e-9);
        }
    }

    #[test]
    fn torsion_pmf_suppresses_nan_entries() {
        let pmf = DiscretePmf::torsion(&[0.0, f64::NAN, 0.0, f64::NAN], 7).unwrap();
        let masses: Vec<f64> = pmf.log_masses().iter().map(|p| p.exp()).collect();
        assert_relative_eq!(masses[0], 0.5, epsilon = 1e-12);
        assert_eq!(masses[1], 0.0);

        let err = DiscretePmf::torsion(&[f64::NAN; 4], 7).unwrap_err();
        assert!(matches!(err, GeometryError::AllTorsionsNaN { atom: 7 }));
    }

    #[test]
    fn nearest_bin_lookup_rounds_to_closest_start() {
        let log_q = [0.0, 1.0, 2.0, 3.0];
        let pmf = DiscretePmf::torsion(&log_q, 0).unwrap();
        let w = pmf.bin_width();
        let just_below_second = pmf.bin_start(1) - 0.1 * w;
        assert_relative_eq!(
            pmf.nearest_bin_log_density(just_below_second),
            pmf.log_masses()[1] - w.ln(),
            epsilon = 1e-12
        );
        assert_relative_eq!(
            pmf.log_density(just_below_second),
            pmf.log_masses()[0] - w.ln(),
            epsilon = 1e-12
        );
    }

    #[test]
    fn torsion_grid_excludes_endpoint() {
        let grid = DiscretePmf::torsion_grid(4);
        assert_eq!(grid.len(), 4);
        assert_relative_eq!(grid[0], -PI);
        assert_relative_eq!(grid[3], PI / 2.0, epsilon = 1e-12);
    }

    #[test]
    fn invalid_parameters_are_rejected() {
        assert!(matches!(
            DiscretePmf::bond(0.1, 0.0, BETA, 10),
            Err(GeometryError::InvalidParameter { what: "force constant", .. })
        ));
        assert!(matches!(
            DiscretePmf::angle(1.0, 10.0, -1.0, 10),
            Err(GeometryError::InvalidParameter { what: "inverse temperature", .. })
        ));
        assert!(DiscretePmf::angle(1.0, 10.0, BETA, 0).is_err());
    }
}
