//! Utility maths functions

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use num_traits::Float;

/// Linear interpolation between `a` and `b`, with `t` the fraction along the scale.
pub fn lerp<T>(a: T, b: T, t: T) -> T
where
    T: Float,
{
    (T::one() - t) * a + t * b
}

/// Inverse linear interpolation, the fraction between `a` and `b` at which `v` lies.
pub fn inv_lerp<T>(a: T, b: T, v: T) -> T
where
    T: Float,
{
    (v - a) / (b - a)
}

/// Map a value from one range into another.
pub fn lin_map<T>(source_range: (T, T), target_range: (T, T), value: T) -> T
where
    T: Float,
{
    lerp(
        target_range.0,
        target_range.1,
        inv_lerp(source_range.0, source_range.1, value),
    )
}

/// Return the euclidian norm (distance between) of two points.
///
/// If the points do not have the same number of dimentions then `None` is
/// returned.
pub fn norm<T>(point_0: &[T], point_1: &[T]) -> Option<T>
where
    T: Float,
{
    if point_0.len() != point_1.len() {
        return None;
    }

    let sum = point_0
        .iter()
        .zip(point_1.iter())
        .fold(T::zero(), |acc, (a, b)| acc + (*a - *b).powi(2));

    Some(sum.sqrt())
}

pub fn clamp<T>(value: T, min: T, max: T) -> T
where
    T: Float,
{
    value.max(min).min(max)
}

/// Round a value to the given number of decimal places, with halves rounded away from zero.
pub fn round_dp<T>(value: T, decimal_places: i32) -> T
where
    T: Float,
{
    let scale = T::from(10.0).unwrap_or_else(T::one).powi(decimal_places);
    (value * scale).round() / scale
}

/// Binary search `[lo, hi]` for the argument at which `f` reaches `target`.
///
/// `f` must be monotonic over the interval. It may return `None` for arguments it cannot
/// evaluate, which ends the search. Returns the first argument whose value lies within `tol` of
/// the target, or `None` if the target is not bracketed or `max_iters` is exhausted.
pub fn bisect<T, F>(lo: T, hi: T, target: T, tol: T, max_iters: usize, mut f: F) -> Option<T>
where
    T: Float,
    F: FnMut(T) -> Option<T>,
{
    let (mut lo, mut hi) = (lo, hi);
    let f_lo = f(lo)?;
    let f_hi = f(hi)?;

    if (f_lo - target).abs() <= tol {
        return Some(lo);
    }
    if (f_hi - target).abs() <= tol {
        return Some(hi);
    }

    // Target must lie between the end values
    if (f_lo - target).signum() == (f_hi - target).signum() {
        return None;
    }

    let increasing = f_hi > f_lo;
    let two = T::one() + T::one();

    for _ in 0..max_iters {
        let mid = (lo + hi) / two;
        let val = f(mid)?;

        if (val - target).abs() <= tol {
            return Some(mid);
        }

        if (val < target) == increasing {
            lo = mid;
        } else {
            hi = mid;
        }
    }

    None
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_remap() {
        assert_eq!(lerp(0.0, 100.0, 0.5), 50.0);
        assert!((inv_lerp(1.0, 5.0, 4.2) - 0.8).abs() < 1e-12);
        assert!((lin_map((0.0, 100.0), (40.0, 50.0), 50.0) - 45.0).abs() < 1e-12);
        assert!((lin_map((1.0, 5.0), (3.0, 7.0), 4.2) - 6.2).abs() < 1e-12);

        // Reversed ranges flip the axis
        assert!((lin_map((900.0, 0.0), (0.0, 1440.0), 0.0) - 1440.0).abs() < 1e-12);
    }

    #[test]
    fn test_norm() {
        assert_eq!(norm(&[0.0, 0.0], &[3.0, 4.0]), Some(5.0));
        assert_eq!(norm(&[0.0], &[3.0, 4.0]), None);
    }

    #[test]
    fn test_round_dp() {
        assert_eq!(round_dp(0.12345, 3), 0.123);
        assert_eq!(round_dp(-0.1235, 3), -0.124);
        assert_eq!(round_dp(-0.13, 3), -0.13);
    }

    #[test]
    fn test_bisect() {
        // sqrt(2) via x^2
        let root = bisect(0.0, 2.0, 2.0, 1e-9, 200, |x: f64| Some(x * x)).unwrap();
        assert!((root - 2f64.sqrt()).abs() < 1e-6);

        // Decreasing functions work too
        let x = bisect(0.0, 10.0, -3.0, 1e-9, 200, |x: f64| Some(-x)).unwrap();
        assert!((x - 3.0).abs() < 1e-6);

        // Target not bracketed
        assert!(bisect(0.0, 1.0, 5.0, 1e-9, 200, |x: f64| Some(x)).is_none());

        // Evaluation failure aborts the search
        assert!(bisect(0.0, 1.0, 0.5, 1e-9, 200, |x: f64| if x > 0.4 && x < 0.6 {
            None
        } else {
            Some(x)
        })
        .is_none());
    }
}
