use serde::Serialize;

/// Default bound on the denominator of generated rationals.
pub const DEFAULT_MAX_DENOMINATOR: u64 = 1_000_000;

// 2^64: no numerator at or above this fits in a u64.
const U64_LIMIT: f64 = 18_446_744_073_709_551_616.0;

/// An exact `numerator / denominator` pair, as stored in an EXIF RATIONAL.
///
/// The denominator is always non-zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Rational {
    pub numerator: u64,
    pub denominator: u64,
}

impl Rational {
    pub const ZERO: Rational = Rational { numerator: 0, denominator: 1 };

    /// Build a rational, returning `None` for a zero denominator.
    pub fn new(numerator: u64, denominator: u64) -> Option<Self> {
        (denominator != 0).then_some(Self { numerator, denominator })
    }

    pub fn to_f64(self) -> f64 {
        self.numerator as f64 / self.denominator as f64
    }

    /// Closest rational to `value` whose denominator is at most `max_denominator`.
    ///
    /// Works on the exact binary value of the float and follows the
    /// continued-fraction "limit denominator" method: the expansion stops at the
    /// first convergent whose denominator exceeds the bound, then the nearer of the
    /// last convergent and the bounded semiconvergent wins. A tie goes to the
    /// convergent.
    ///
    /// Returns `None` for negative, NaN or infinite input, a zero bound, or when
    /// the numerator would not fit in a `u64`.
    pub fn approximate(value: f64, max_denominator: u64) -> Option<Self> {
        if !value.is_finite() || value < 0.0 || value >= U64_LIMIT || max_denominator == 0 {
            return None;
        }
        if value == 0.0 {
            return Some(Self::ZERO);
        }

        let Some((num, den)) = exact_dyadic(value) else {
            // Below 2^-75 nothing with a 64-bit denominator beats zero.
            return Some(Self::ZERO);
        };
        let max = max_denominator as u128;

        if den <= max {
            return Self::from_parts(num, den);
        }

        let (mut p0, mut q0, mut p1, mut q1) = (0u128, 1u128, 1u128, 0u128);
        let (mut n, mut d) = (num, den);
        loop {
            let a = n / d;
            let q2 = q0.saturating_add(a.saturating_mul(q1));
            if q2 > max {
                break;
            }
            (p0, q0, p1, q1) = (p1, q1, p0.saturating_add(a.saturating_mul(p1)), q2);
            (n, d) = (d, n - a * d);
        }

        // |p1/q1 - x| = d / (q1 * den) and the two candidates sit 1 / (q1 * q) apart,
        // so the convergent is at least as close exactly when 2 * d * q <= den.
        let k = (max - q0) / q1;
        let q = q0 + k * q1;
        let convergent_wins = match q.checked_mul(2).and_then(|q2| d.checked_mul(q2)) {
            Some(lhs) => lhs <= den,
            None => false,
        };

        if convergent_wins {
            Self::from_parts(p1, q1)
        } else {
            Self::from_parts(p0.saturating_add(k.saturating_mul(p1)), q)
        }
    }

    fn from_parts(numerator: u128, denominator: u128) -> Option<Self> {
        Some(Self {
            numerator: u64::try_from(numerator).ok()?,
            denominator: u64::try_from(denominator).ok()?,
        })
    }
}

impl std::fmt::Display for Rational {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.numerator, self.denominator)
    }
}

/// Split a positive finite float into `num / 2^k` in lowest terms.
///
/// `None` when the power of two does not fit a `u128`, i.e. for values under 2^-75.
fn exact_dyadic(value: f64) -> Option<(u128, u128)> {
    let bits = value.to_bits();
    let raw_exp = ((bits >> 52) & 0x7ff) as i32;
    let fraction = bits & ((1u64 << 52) - 1);

    let (mut mantissa, mut exp) = if raw_exp == 0 {
        (fraction, -1074)
    } else {
        (fraction | (1u64 << 52), raw_exp - 1075)
    };

    if exp >= 0 {
        // Inputs are below 2^64, so the shift is at most 11 bits.
        return Some(((mantissa as u128) << exp, 1));
    }

    let shift = mantissa.trailing_zeros().min((-exp) as u32);
    mantissa >>= shift;
    exp += shift as i32;

    if exp == 0 {
        return Some((mantissa as u128, 1));
    }
    let den_pow = (-exp) as u32;
    if den_pow > 127 {
        return None;
    }
    Some((mantissa as u128, 1u128 << den_pow))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(x: f64) -> Rational {
        Rational::approximate(x, DEFAULT_MAX_DENOMINATOR).unwrap()
    }

    /// |n/d - x| compared exactly-enough in f64 for the small values used here.
    fn error(r: Rational, x: f64) -> f64 {
        (r.to_f64() - x).abs()
    }

    #[test]
    fn zero_is_zero_over_one() {
        assert_eq!(approx(0.0), Rational::ZERO);
    }

    #[test]
    fn integers_are_exact() {
        assert_eq!(approx(37.0), Rational::new(37, 1).unwrap());
        assert_eq!(approx(180.0), Rational::new(180, 1).unwrap());
    }

    #[test]
    fn short_dyadics_are_exact() {
        assert_eq!(approx(0.5), Rational::new(1, 2).unwrap());
        assert_eq!(approx(12.375), Rational::new(99, 8).unwrap());
    }

    #[test]
    fn classic_pi_bounds() {
        let pi = std::f64::consts::PI;
        assert_eq!(Rational::approximate(pi, 10).unwrap(), Rational::new(22, 7).unwrap());
        assert_eq!(Rational::approximate(pi, 100).unwrap(), Rational::new(311, 99).unwrap());
        assert_eq!(Rational::approximate(pi, 1000).unwrap(), Rational::new(355, 113).unwrap());
        assert_eq!(
            Rational::approximate(pi, 1_000_000).unwrap(),
            Rational::new(3_126_535, 995_207).unwrap()
        );
    }

    #[test]
    fn one_third_prefers_simple_fraction() {
        assert_eq!(approx(1.0 / 3.0), Rational::new(1, 3).unwrap());
        assert_eq!(Rational::approximate(0.1, 1_000_000).unwrap(), Rational::new(1, 10).unwrap());
    }

    #[test]
    fn tie_goes_to_convergent() {
        // 0.25 sits exactly between 0/1 and 1/2 when the bound is 2.
        assert_eq!(Rational::approximate(0.25, 2).unwrap(), Rational::ZERO);
        // 0.75 sits between 1/2 and 1/1; the convergent 1/1 wins.
        assert_eq!(Rational::approximate(0.75, 2).unwrap(), Rational::new(1, 1).unwrap());
    }

    #[test]
    fn coordinates_within_bound() {
        for x in [37.7749, 122.4194, 89.999_999_9, 0.000_001_3, 179.123_456_789] {
            let r = approx(x);
            assert!(r.denominator <= DEFAULT_MAX_DENOMINATOR);
            assert!(r.denominator > 0);
            assert!(error(r, x) < 1e-6, "{x} -> {r}");
        }
    }

    #[test]
    fn tiny_values_collapse_to_zero() {
        assert_eq!(approx(1e-300), Rational::ZERO);
        assert_eq!(approx(f64::from_bits(1)), Rational::ZERO);
        assert_eq!(approx(1e-7), Rational::ZERO);
        assert_eq!(approx(6e-7), Rational::new(1, 1_000_000).unwrap());
    }

    #[test]
    fn invalid_input_is_rejected() {
        assert!(Rational::approximate(-1.0, 10).is_none());
        assert!(Rational::approximate(f64::NAN, 10).is_none());
        assert!(Rational::approximate(f64::INFINITY, 10).is_none());
        assert!(Rational::approximate(1.5, 0).is_none());
        assert!(Rational::approximate(1e20, 10).is_none());
    }

    #[test]
    fn best_approximation_against_brute_force() {
        // Check a spread of values against an exhaustive search over small bounds.
        let values = [
            0.0, 0.1, 0.333, 0.618_033_988_749_895, 1.414_213_562_373_095, 2.718_281_828,
            37.7749, 122.4194, 45.678_9, 89.5, 1_000.001, 2_147_483_647.25,
        ];
        for &x in &values {
            for bound in [1u64, 2, 3, 7, 10, 57, 100, 997] {
                let got = Rational::approximate(x, bound).unwrap();
                assert!(got.denominator <= bound);
                let got_err = error(got, x);
                for d in 1..=bound {
                    let n = (x * d as f64).round();
                    for cand in [n - 1.0, n, n + 1.0] {
                        if cand < 0.0 {
                            continue;
                        }
                        let cand_err = (cand / d as f64 - x).abs();
                        assert!(
                            got_err <= cand_err + 1e-12 * x.max(1.0),
                            "x={x} bound={bound}: {got} worse than {cand}/{d}"
                        );
                    }
                }
            }
        }
    }

    #[test]
    fn display_is_slash_separated() {
        assert_eq!(Rational::new(3, 4).unwrap().to_string(), "3/4");
    }
}
