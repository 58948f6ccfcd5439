//! Height calibration helpers

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use util::maths::bisect;

use super::*;

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Highest point of the centre column searched.
///
/// Units: meters
pub const SEARCH_TOP_M: f64 = -0.090;

/// Lowest point of the centre column searched.
///
/// Units: meters
pub const SEARCH_BOTTOM_M: f64 = -0.230;

/// Tolerance on the arm angle when searching.
///
/// Heights are rounded to a millimeter, so near the bottom of the column, where the arm angle
/// changes fastest, some angles cannot be matched to this tolerance and the search fails.
///
/// Units: radians
pub const ANGLE_TOL_RAD: f64 = 5e-3;

const MAX_ITERS: usize = 64;

// ------------------------------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Find the height on the centre column (`x = y = 0`) at which all three arms sit at `angle_rad`.
///
/// Returns `None` if the angle cannot be reached anywhere on the searched part of the column.
pub fn find_height_for_angle(geom: &DeltaGeometry, angle_rad: f64) -> Option<f64> {
    bisect(
        SEARCH_BOTTOM_M,
        SEARCH_TOP_M,
        angle_rad,
        ANGLE_TOL_RAD,
        MAX_ITERS,
        |z_m| {
            geom.inverse(&CartesianPoint::new(0.0, 0.0, z_m))
                .ok()
                .map(|a| a.a_rad)
        },
    )
    .map(|z_m| util::maths::round_dp(z_m, ROUND_DP))
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_find_height_for_angle() {
        let geom = DeltaGeometry::default();

        let z_m = find_height_for_angle(&geom, -0.657).unwrap();
        assert!((z_m - -0.130).abs() < 2e-3, "z = {}", z_m);

        // The found height does put the arms at the requested angle
        let angles = geom.inverse(&CartesianPoint::new(0.0, 0.0, z_m)).unwrap();
        assert!((angles.a_rad - -0.657).abs() < 2.0 * ANGLE_TOL_RAD);

        let z_m = find_height_for_angle(&geom, -0.5).unwrap();
        assert!((z_m - -0.163).abs() < 2e-3, "z = {}", z_m);

        // Arms can't be raised that far
        assert!(find_height_for_angle(&geom, -1.5).is_none());
    }
}
