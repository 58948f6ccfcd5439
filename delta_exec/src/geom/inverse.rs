//! Inverse geometric model

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::f64::consts::FRAC_PI_2;

use super::*;

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl DeltaGeometry {
    /// Find the arm angles which put the platform centre at `target`.
    ///
    /// The target is rounded before use and the angles are rounded on output. Targets at or above
    /// the motor plane (`z >= 0`) are never reachable and return [`GeomError::DomainError`].
    pub fn inverse(&self, target: &CartesianPoint) -> Result<JointAngles, GeomError> {
        let CartesianPoint { x_m: x, y_m: y, z_m: z } = target.rounded();

        if z >= 0.0 {
            return Err(GeomError::DomainError);
        }

        let la = self.proximal_length_m;
        let lb = self.distal_length_m;
        let r = self.base_radius_m;

        let s = (1.0 / la) * (-x.powi(2) - y.powi(2) - z.powi(2) + lb.powi(2) - la.powi(2) - r.powi(2));

        let mut angles_rad = [0.0; 3];

        for (angle, arm_rad) in angles_rad.iter_mut().zip(ARM_POSITIONS_RAD.iter()) {
            let t = 2.0 * x * arm_rad.cos() + 2.0 * y * arm_rad.sin();

            let den = -2.0 * r - s - t * (r / la - 1.0);
            if den == 0.0 {
                return Err(GeomError::Degenerate);
            }

            let radicand = 4.0 * z.powi(2) + 4.0 * r.powi(2) - s.powi(2)
                + t.powi(2) * (1.0 - r.powi(2) / la.powi(2))
                + t * (-2.0 * r * s / la - 4.0 * r);
            if radicand < 0.0 {
                return Err(GeomError::DomainError);
            }

            let q = 2.0 * ((-2.0 * z - radicand.sqrt()) / den).atan();

            *angle = q - FRAC_PI_2;
        }

        Ok(JointAngles::from_array(angles_rad).rounded())
    }
}
