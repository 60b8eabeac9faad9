//! Recursive Gaussian filter design.
//!
//! Implements "Recursive Implementation of the Gaussian Filter Using
//! Truncated Cosine Functions" by Charalampidis [2016]. The filter is the
//! sum of three second-order IIR sections (the odd harmonics k = 1, 3, 5 of
//! the truncated-cosine design); their weights are obtained from a 3x3
//! linear solve so that the combined response has unit DC gain.
//!
//! Equation numbers in comments refer to the paper.

use crate::GaussError;

const PI: f64 = std::f64::consts::PI;

/// Coefficients for one blur configuration.
///
/// Derived once per sigma, immutable afterwards, and shared read-only by all
/// worker threads. The same mathematical filter is stored in two shapes:
/// the direct second-order form (`n2`, `d1`) consumed by the vertical pass,
/// and a four-way algebraic expansion (`mul_in`, `mul_prev`, `mul_prev2`)
/// that lets the horizontal pass produce four consecutive outputs per step
/// without serializing on the output-to-output dependency.
#[derive(Debug, Clone)]
pub struct RecursiveGaussian {
    pub(crate) radius: usize,
    /// Direct-form numerator, one per mode.
    pub(crate) n2: [f32; 3],
    /// Direct-form denominator, one per mode.
    pub(crate) d1: [f32; 3],
    /// `mul_*[mode][lane]`: coefficient applied when producing output at
    /// unrolled offset `lane` from the input / previous / second-previous
    /// value. Lane 0 is the plain second-order recursion.
    pub(crate) mul_in: [[f32; 4]; 3],
    pub(crate) mul_prev: [[f32; 4]; 3],
    pub(crate) mul_prev2: [[f32; 4]; 3],
}

impl RecursiveGaussian {
    /// Designs the filter for the given standard deviation.
    ///
    /// Pure function of `sigma`: no I/O, no randomness. Radii below 2
    /// (possible for sigma < ~0.38) are clamped to 2 rather than rejected,
    /// so any finite positive sigma yields a usable filter. Radius 1 would
    /// put the mode frequencies at odd multiples of pi/2, where the p and r
    /// rows of the coefficient system coincide and the solve is singular;
    /// radius 2 is the smallest well-conditioned design.
    ///
    /// # Errors
    /// - [`GaussError::InvalidSigma`] if sigma is not finite and positive.
    /// - [`GaussError::SingularMatrix`] if the coefficient solve fails;
    ///   this cannot happen for a valid sigma and indicates an internal
    ///   inconsistency.
    pub fn new(sigma: f64) -> Result<Self, GaussError> {
        if !sigma.is_finite() || sigma <= 0.0 {
            return Err(GaussError::InvalidSigma);
        }

        let radius = (3.2795 * sigma + 0.2546).round().max(2.0); // (57), "N"

        // Table I, first row
        let pi_div_2r = PI / (2.0 * radius);
        let omega = [pi_div_2r, 3.0 * pi_div_2r, 5.0 * pi_div_2r];

        // (37), k = {1, 3, 5}
        let p_1 = 1.0 / (0.5 * omega[0]).tan();
        let p_3 = -1.0 / (0.5 * omega[1]).tan();
        let p_5 = 1.0 / (0.5 * omega[2]).tan();

        // (44), k = {1, 3, 5}
        let r_1 = p_1 * p_1 / omega[0].sin();
        let r_3 = -p_3 * p_3 / omega[1].sin();
        let r_5 = p_5 * p_5 / omega[2].sin();

        // (50), k = {1, 3, 5}
        let neg_half_sigma2 = -0.5 * sigma * sigma;
        let recip_radius = 1.0 / radius;
        let mut rho = [0.0f64; 3];
        for i in 0..3 {
            rho[i] = (neg_half_sigma2 * omega[i] * omega[i]).exp() * recip_radius;
        }

        // second part of (52), k1,k2 = 1,3; 3,5; 5,1
        let d_13 = p_1 * r_3 - r_1 * p_3;
        let d_35 = p_3 * r_5 - r_3 * p_5;
        let d_51 = p_5 * r_1 - r_5 * p_1;

        // (52), k = 5
        let recip_d13 = 1.0 / d_13;
        let zeta_15 = d_35 * recip_d13;
        let zeta_35 = d_51 * recip_d13;

        let a = [
            [p_1, p_3, p_5],
            [r_1, r_3, r_5], // (56)
            [zeta_15, zeta_35, 1.0],
        ];
        let a_inv = inv_3x3(&a).ok_or(GaussError::SingularMatrix)?;

        let gamma = [
            1.0,
            radius * radius - sigma * sigma, // (55)
            zeta_15 * rho[0] + zeta_35 * rho[1] + rho[2],
        ];
        let beta = mul_3x3_vector(&a_inv, &gamma); // (53)

        // Sanity check: beta solves (39), i.e. the filter weights are
        // normalized and a constant input is reproduced exactly.
        let sum = beta[0] * p_1 + beta[1] * p_3 + beta[2] * p_5;
        debug_assert!((sum - 1.0).abs() < 1e-12);

        let mut rg = Self {
            radius: radius as usize,
            n2: [0.0; 3],
            d1: [0.0; 3],
            mul_in: [[0.0; 4]; 3],
            mul_prev: [[0.0; 4]; 3],
            mul_prev2: [[0.0; 4]; 3],
        };

        for i in 0..3 {
            let n2 = -beta[i] * (omega[i] * (radius + 1.0)).cos(); // (33)
            let d1 = -2.0 * omega[i].cos(); // (33)
            rg.n2[i] = n2 as f32;
            rg.d1[i] = d1 as f32;

            let d_2 = d1 * d1;

            // Obtained by expanding (35) for four consecutive outputs via
            // sympy and gathering terms for prev (p) and prev2 (pp):
            //   o0 = n*i0 - d*p  - pp
            //   o1 = n*i1 - d*o0 - p
            //   o2 = n*i2 - d*o1 - o0
            //   o3 = n*i3 - d*o2 - o1
            rg.mul_prev[i] = [
                -d1 as f32,
                (d_2 - 1.0) as f32,
                (-d_2 * d1 + 2.0 * d1) as f32,
                (d_2 * d_2 - 3.0 * d_2 + 1.0) as f32,
            ];
            rg.mul_prev2[i] = [
                -1.0,
                d1 as f32,
                (-d_2 + 1.0) as f32,
                (d_2 * d1 - 2.0 * d1) as f32,
            ];
            rg.mul_in[i] = [
                n2 as f32,
                (-d1 * n2) as f32,
                (d_2 * n2 - n2) as f32,
                (-d_2 * d1 * n2 + 2.0 * d1 * n2) as f32,
            ];
        }
        Ok(rg)
    }

    /// Half-width of the recursion window, always >= 1.
    #[inline]
    pub fn radius(&self) -> usize {
        self.radius
    }

    /// Direct-form numerator coefficients, one per mode.
    #[inline]
    pub fn n2(&self) -> [f32; 3] {
        self.n2
    }

    /// Direct-form denominator coefficients, one per mode.
    #[inline]
    pub fn d1(&self) -> [f32; 3] {
        self.d1
    }
}

/// Inverts a 3x3 matrix via cofactors, or returns `None` when the
/// determinant vanishes.
fn inv_3x3(m: &[[f64; 3]; 3]) -> Option<[[f64; 3]; 3]> {
    let c00 = m[1][1] * m[2][2] - m[1][2] * m[2][1];
    let c01 = m[0][2] * m[2][1] - m[0][1] * m[2][2];
    let c02 = m[0][1] * m[1][2] - m[0][2] * m[1][1];
    let c10 = m[1][2] * m[2][0] - m[1][0] * m[2][2];
    let c11 = m[0][0] * m[2][2] - m[0][2] * m[2][0];
    let c12 = m[0][2] * m[1][0] - m[0][0] * m[1][2];
    let c20 = m[1][0] * m[2][1] - m[1][1] * m[2][0];
    let c21 = m[0][1] * m[2][0] - m[0][0] * m[2][1];
    let c22 = m[0][0] * m[1][1] - m[0][1] * m[1][0];

    let det = m[0][0] * c00 + m[0][1] * c10 + m[0][2] * c20;
    if det.abs() < 1e-12 {
        return None;
    }
    let s = 1.0 / det;
    Some([
        [c00 * s, c01 * s, c02 * s],
        [c10 * s, c11 * s, c12 * s],
        [c20 * s, c21 * s, c22 * s],
    ])
}

fn mul_3x3_vector(m: &[[f64; 3]; 3], v: &[f64; 3]) -> [f64; 3] {
    let mut out = [0.0; 3];
    for (row, o) in m.iter().zip(out.iter_mut()) {
        *o = row[0] * v[0] + row[1] * v[1] + row[2] * v[2];
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn radius_formula() {
        let rg = RecursiveGaussian::new(1.5).unwrap();
        assert_eq!(rg.radius(), 5); // round(3.2795 * 1.5 + 0.2546)
        let rg = RecursiveGaussian::new(2.0).unwrap();
        assert_eq!(rg.radius(), 7);
    }

    #[test]
    fn tiny_sigma_clamps_radius() {
        let rg = RecursiveGaussian::new(0.01).unwrap();
        assert_eq!(rg.radius(), 2);
    }

    #[test]
    fn tiny_sigmas_design_successfully() {
        // Below sigma ~0.38 the raw radius formula rounds to 1, which would
        // make the coefficient system singular; the clamp to radius 2 must
        // keep the design solvable with finite coefficients.
        for sigma in [0.05, 0.1, 0.3, 0.37] {
            let rg = RecursiveGaussian::new(sigma).unwrap();
            assert_eq!(rg.radius(), 2, "sigma {sigma}");
            for k in 0..3 {
                assert!(rg.n2[k].is_finite());
                assert!(rg.d1[k].is_finite());
            }
        }
    }

    #[test]
    fn rejects_bad_sigma() {
        assert_eq!(
            RecursiveGaussian::new(0.0).unwrap_err(),
            GaussError::InvalidSigma
        );
        assert_eq!(
            RecursiveGaussian::new(-1.0).unwrap_err(),
            GaussError::InvalidSigma
        );
        assert_eq!(
            RecursiveGaussian::new(f64::NAN).unwrap_err(),
            GaussError::InvalidSigma
        );
    }

    #[test]
    fn lane0_matches_direct_form() {
        // The first lane of the expansion must be the plain second-order
        // recursion the vertical pass uses.
        let rg = RecursiveGaussian::new(3.7).unwrap();
        for i in 0..3 {
            assert_eq!(rg.mul_in[i][0], rg.n2[i]);
            assert_eq!(rg.mul_prev[i][0], -rg.d1[i]);
            assert_eq!(rg.mul_prev2[i][0], -1.0);
        }
    }

    #[test]
    fn sigma_1_5_direct_form() {
        let rg = RecursiveGaussian::new(1.5).unwrap();
        assert_eq!(rg.radius(), 5);
        for i in 0..3 {
            assert!(rg.n2[i].is_finite());
            assert!(rg.d1[i].abs() < 2.0);
        }
        // d1 = -2 cos(omega_k) with omega = pi/10, 3pi/10, 5pi/10.
        assert!((f64::from(rg.d1[0]) - (-2.0 * (PI / 10.0).cos())).abs() < 1e-6);
        assert!((f64::from(rg.d1[1]) - (-2.0 * (3.0 * PI / 10.0).cos())).abs() < 1e-6);
        assert!((f64::from(rg.d1[2]) - (-2.0 * (5.0 * PI / 10.0).cos())).abs() < 1e-6);
    }

    #[test]
    fn inv_3x3_rejects_singular() {
        let m = [[1.0, 2.0, 3.0], [2.0, 4.0, 6.0], [0.0, 1.0, 0.0]];
        assert!(inv_3x3(&m).is_none());
    }

    #[test]
    fn inv_3x3_round_trip() {
        let m = [[2.0, 0.0, 1.0], [1.0, 3.0, 0.0], [0.0, 1.0, 4.0]];
        let inv = inv_3x3(&m).unwrap();
        let id = [
            mul_3x3_vector(&inv, &[m[0][0], m[1][0], m[2][0]]),
            mul_3x3_vector(&inv, &[m[0][1], m[1][1], m[2][1]]),
            mul_3x3_vector(&inv, &[m[0][2], m[1][2], m[2][2]]),
        ];
        for (i, col) in id.iter().enumerate() {
            for (j, v) in col.iter().enumerate() {
                let expected = if i == j { 1.0 } else { 0.0 };
                assert!((v - expected).abs() < 1e-12);
            }
        }
    }
}
