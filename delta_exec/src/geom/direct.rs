//! Direct geometric model

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::f64::consts::{FRAC_PI_2, PI};

use super::*;

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl DeltaGeometry {
    /// Find the platform position reached with the given arm angles.
    ///
    /// Of the two solutions of the closure equations the lower one is returned, the upper one
    /// would need the elbows bent backwards. The pose is then checked against the joint limits of
    /// the distal parallelograms.
    pub fn direct(&self, angles: &JointAngles) -> Result<CartesianPoint, GeomError> {
        let la = self.proximal_length_m;
        let lb = self.distal_length_m;
        let r = self.base_radius_m;

        // Angles measured from the vertical
        let mut q = angles.rounded().as_array();
        for qi in q.iter_mut() {
            *qi += FRAC_PI_2;
        }

        let mut d = [0.0; 3];
        let mut e = [0.0; 3];
        let mut f = [0.0; 3];
        let mut g = [0.0; 3];

        for i in 0..3 {
            let reach = r + la * q[i].cos();
            d[i] = -lb.powi(2) + la.powi(2) + r.powi(2) + 2.0 * r * la * q[i].cos();
            e[i] = 2.0 * reach * ARM_POSITIONS_RAD[i].cos();
            f[i] = 2.0 * reach * ARM_POSITIONS_RAD[i].sin();
            g[i] = -2.0 * la * q[i].sin();
        }

        let h1 = cyclic(&e, &g);
        let h2 = -cyclic(&e, &f);
        let h3 = -cyclic(&e, &d);
        let h4 = cyclic(&f, &d);
        let h5 = -cyclic(&f, &g);

        if h2 == 0.0 {
            return Err(GeomError::Singular);
        }

        let h2_sq = h2.powi(2);
        let l = (h5.powi(2) + h1.powi(2)) / h2_sq + 1.0;
        let m = 2.0 * (h5 * h4 + h1 * h3) / h2_sq - (h5 * e[0] + h1 * f[0]) / h2 - g[0];
        let n = (h4.powi(2) + h3.powi(2)) / h2_sq - (h4 * e[0] + h3 * f[0]) / h2 + d[0];

        if l == 0.0 {
            return Err(GeomError::Singular);
        }

        let disc = m.powi(2) - 4.0 * l * n;
        if disc < 0.0 {
            return Err(GeomError::DomainError);
        }

        let z = (-m - disc.sqrt()) / (2.0 * l);
        let x = z * (h5 / h2) + h4 / h2;
        let y = z * (h1 / h2) + h3 / h2;

        self.check_joint_limits(&q, x, y, z)?;

        Ok(CartesianPoint::new(x, y, z).rounded())
    }

    /// Check the distal parallelograms of a solved pose are within their range of motion.
    ///
    /// `q` are the arm angles measured from the vertical.
    fn check_joint_limits(&self, q: &[f64], x: f64, y: f64, z: f64) -> Result<(), GeomError> {
        let la = self.proximal_length_m;
        let lb = self.distal_length_m;
        let r = self.base_radius_m;

        let max_gamma_rad = MAX_GAMMA_DEG.to_radians();
        let min_elbow_rad = ELBOW_RANGE_DEG.0.to_radians();
        let max_elbow_rad = PI.min(ELBOW_RANGE_DEG.1.to_radians());

        for (q_i, arm_rad) in q.iter().zip(ARM_POSITIONS_RAD.iter()) {
            // Elbow position
            let reach = r + la * q_i.cos();
            let elbow = [reach * arm_rad.cos(), reach * arm_rad.sin(), -la * q_i.sin()];

            // Distance of the platform from the arm's plane of motion
            let offset = (arm_rad.sin() * x - arm_rad.cos() * y - arm_rad.sin() * elbow[0]
                + arm_rad.cos() * elbow[1])
                .abs();

            let gamma = checked_asin(offset / lb)?;
            let beta = checked_asin((z - elbow[2]).abs() / (lb * gamma.cos()))?;

            if gamma.abs() > max_gamma_rad {
                return Err(GeomError::JointLimit);
            }

            let elbow_rad = q_i + beta;
            if elbow_rad < min_elbow_rad || elbow_rad > max_elbow_rad {
                return Err(GeomError::JointLimit);
            }
        }

        Ok(())
    }
}

// ------------------------------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Cyclic antisymmetric combination of two per-arm coefficient sets.
fn cyclic(u: &[f64; 3], v: &[f64; 3]) -> f64 {
    u[0] * v[1] - u[0] * v[2] - u[1] * v[0] + u[1] * v[2] + u[2] * v[0] - u[2] * v[1]
}

/// `asin` for arguments which are non-negative by construction, failing instead of returning NaN.
fn checked_asin(value: f64) -> Result<f64, GeomError> {
    if value > 1.0 || value.is_nan() {
        Err(GeomError::DomainError)
    } else {
        Ok(value.asin())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn assert_point(point: CartesianPoint, expected: [f64; 3], tol: f64) {
        let got = [point.x_m, point.y_m, point.z_m];
        for (p, e) in got.iter().zip(expected.iter()) {
            assert!((p - e).abs() < tol, "{} != {:?}", point, expected);
        }
    }

    #[test]
    fn test_direct_horizontal_arms() {
        let geom = DeltaGeometry::default();

        let point = geom.direct(&JointAngles::new(0.0, 0.0, 0.0)).unwrap();
        assert_point(point, [0.0, 0.0, -0.223], 1e-9);
    }

    #[test]
    fn test_direct_failures() {
        let geom = DeltaGeometry::default();

        assert_eq!(
            geom.direct(&JointAngles::new(0.5, 0.5, 0.5)),
            Err(GeomError::JointLimit)
        );
        assert_eq!(
            geom.direct(&JointAngles::new(1.0, -0.5, 0.2)),
            Err(GeomError::JointLimit)
        );
        assert_eq!(
            geom.direct(&JointAngles::new(-1.2, -1.2, -1.2)),
            Err(GeomError::DomainError)
        );
    }

    #[test]
    fn test_round_trip() {
        let geom = DeltaGeometry::default();

        for x_cm in -4..=4 {
            for y_cm in -4..=4 {
                for z_cm in 10..=16 {
                    let target = CartesianPoint::new(
                        x_cm as f64 / 100.0,
                        y_cm as f64 / 100.0,
                        -(z_cm as f64) / 100.0,
                    );

                    let angles = geom.inverse(&target).unwrap();
                    let reached = geom.direct(&angles).unwrap();

                    assert_point(reached, [target.x_m, target.y_m, target.z_m], 1.5e-3);
                }
            }
        }
    }
}
