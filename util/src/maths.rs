//! Utility maths functions

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use num_traits::Float;

/// Return the sign of a value as `-1` or `+1`, with zero treated as
/// positive.
pub fn sign<T>(value: T) -> T
where
    T: Float,
{
    if value < T::zero() {
        -T::one()
    } else {
        T::one()
    }
}

/// Normalise an angle into the range (-pi, pi].
///
/// Non-finite inputs are returned unchanged.
pub fn wrap_pi<T>(angle: T) -> T
where
    T: Float,
{
    if !angle.is_finite() {
        return angle;
    }

    let pi_t: T = T::from(std::f64::consts::PI).unwrap_or_else(T::zero);
    let tau_t: T = pi_t + pi_t;

    // Map into [0, 2pi), then shift into [-pi, pi)
    let mut wrapped = rem_euclid(angle + pi_t, tau_t) - pi_t;

    // The interval is half open at -pi, so move that boundary to +pi
    if wrapped <= -pi_t {
        wrapped = wrapped + tau_t;
    }

    wrapped
}

/// Calculates the least nonnegative remainder of `lhs (mod rhs)`.
///
/// This function is taken from the std library as num is missing it.
///
/// In particular, the return value `r` satisfies `0.0 <= r < rhs.abs()` in
/// most cases. However, due to a floating point round-off error it can
/// result in `r == rhs.abs()`, violating the mathematical definition, if
/// `self` is much smaller than `rhs.abs()` in magnitude and `self < 0.0`.
pub fn rem_euclid<T>(lhs: T, rhs: T) -> T
where
    T: Float,
{
    let r = lhs % rhs;
    if r < T::zero() {
        r + rhs.abs()
    } else {
        r
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::f64::consts::PI;

    const EPS: f64 = 1e-12;

    #[test]
    fn test_wrap_pi() {
        assert!((wrap_pi(0f64)).abs() < EPS);
        assert!((wrap_pi(PI) - PI).abs() < EPS);
        assert!((wrap_pi(-PI) - PI).abs() < EPS);
        assert!((wrap_pi(3.0 * PI).abs() - PI).abs() < 1e-9);
        assert!((wrap_pi(1.5 * PI) + 0.5 * PI).abs() < EPS);
        assert!((wrap_pi(-1.5 * PI) - 0.5 * PI).abs() < EPS);
        assert!((wrap_pi(2.0 * PI + 0.1) - 0.1).abs() < EPS);
        assert!(wrap_pi(f64::NAN).is_nan());
    }

    #[test]
    fn test_sign() {
        assert_eq!(sign(-0.3f64), -1.0);
        assert_eq!(sign(0f64), 1.0);
        assert_eq!(sign(2f64), 1.0);
    }
}
