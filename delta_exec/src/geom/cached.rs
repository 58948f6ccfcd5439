//! Memoised geometric model

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::collections::HashMap;

use super::*;

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Default number of entries kept per direction before the cache is flushed.
const DEFAULT_CAPACITY: usize = 4096;

// ------------------------------------------------------------------------------------------------
// TYPES
// ------------------------------------------------------------------------------------------------

/// Cache key, the rounded inputs scaled to integers.
type Key = [i64; 3];

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// A [`DeltaGeometry`] which remembers its results, keyed on the rounded inputs.
///
/// Failures are cached too, since they are as deterministic as successes.
#[derive(Debug, Clone)]
pub struct CachedGeometry {
    geom: DeltaGeometry,

    capacity: usize,

    inverse_cache: HashMap<Key, Result<JointAngles, GeomError>>,
    direct_cache: HashMap<Key, Result<CartesianPoint, GeomError>>,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl CachedGeometry {
    pub fn new(geom: DeltaGeometry) -> Self {
        Self::with_capacity(geom, DEFAULT_CAPACITY)
    }

    /// Create a cache holding at most `capacity` results per direction. Once full, a direction's
    /// cache is emptied before the next insertion.
    pub fn with_capacity(geom: DeltaGeometry, capacity: usize) -> Self {
        Self {
            geom,
            capacity: capacity.max(1),
            inverse_cache: HashMap::new(),
            direct_cache: HashMap::new(),
        }
    }

    pub fn geometry(&self) -> &DeltaGeometry {
        &self.geom
    }

    pub fn inverse(&mut self, target: &CartesianPoint) -> Result<JointAngles, GeomError> {
        let key = to_key(target.x_m, target.y_m, target.z_m);

        if let Some(result) = self.inverse_cache.get(&key) {
            return *result;
        }

        let result = self.geom.inverse(target);
        if self.inverse_cache.len() >= self.capacity {
            self.inverse_cache.clear();
        }
        self.inverse_cache.insert(key, result);

        result
    }

    pub fn direct(&mut self, angles: &JointAngles) -> Result<CartesianPoint, GeomError> {
        let key = to_key(angles.a_rad, angles.b_rad, angles.c_rad);

        if let Some(result) = self.direct_cache.get(&key) {
            return *result;
        }

        let result = self.geom.direct(angles);
        if self.direct_cache.len() >= self.capacity {
            self.direct_cache.clear();
        }
        self.direct_cache.insert(key, result);

        result
    }

    /// Number of cached results, inverse and direct.
    pub fn len(&self) -> (usize, usize) {
        (self.inverse_cache.len(), self.direct_cache.len())
    }
}

// ------------------------------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ------------------------------------------------------------------------------------------------

fn to_key(a: f64, b: f64, c: f64) -> Key {
    let scale = 10f64.powi(ROUND_DP);
    [
        (round(a) * scale).round() as i64,
        (round(b) * scale).round() as i64,
        (round(c) * scale).round() as i64,
    ]
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_cache_matches_model() {
        let geom = DeltaGeometry::default();
        let mut cached = CachedGeometry::new(geom);

        let target = CartesianPoint::new(0.01, -0.02, -0.14);
        let first = cached.inverse(&target);
        assert_eq!(first, geom.inverse(&target));

        // Points rounding to the same key share an entry
        let second = cached.inverse(&CartesianPoint::new(0.0101, -0.0199, -0.1402));
        assert_eq!(first, second);
        assert_eq!(cached.len(), (1, 0));

        // Failures are cached as well
        let origin = CartesianPoint::new(0.0, 0.0, 0.0);
        assert_eq!(cached.inverse(&origin), Err(GeomError::DomainError));
        assert_eq!(cached.len(), (2, 0));

        let angles = first.unwrap();
        assert_eq!(cached.direct(&angles), geom.direct(&angles));
        assert_eq!(cached.len(), (2, 1));
    }

    #[test]
    fn test_cache_capacity() {
        let mut cached = CachedGeometry::with_capacity(DeltaGeometry::default(), 2);

        for z_mm in 120..130 {
            cached
                .inverse(&CartesianPoint::new(0.0, 0.0, -(z_mm as f64) / 1000.0))
                .unwrap();
            assert!(cached.len().0 <= 2);
        }
    }
}
