//! Exact rational numbers used as unit exponents
//!
//! Fractions are always kept in lowest terms with a positive denominator,
//! so structural equality is value equality.

use std::cmp::Ordering;
use std::fmt;

/// Largest denominator accepted when converting a float to a fraction
pub const MAX_DENOMINATOR: i64 = 1000;

/// Relative tolerance for float-to-fraction conversion
const CONVERSION_EPSILON: f64 = 1e-9;

/// An exact rational number `numerator / denominator`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Fraction {
    numerator: i64,
    denominator: i64,
}

impl Fraction {
    pub const ZERO: Fraction = Fraction {
        numerator: 0,
        denominator: 1,
    };

    pub const ONE: Fraction = Fraction {
        numerator: 1,
        denominator: 1,
    };

    /// Create a fraction, reduced to lowest terms.
    ///
    /// # Panics
    ///
    /// Panics if `denominator` is zero, or if negating a negative
    /// denominator overflows (`i64::MIN`).
    pub fn new(numerator: i64, denominator: i64) -> Self {
        assert!(denominator != 0, "fraction denominator must not be zero");

        if numerator == 0 {
            return Self::ZERO;
        }

        let divisor = gcd(
            u128::from(numerator.unsigned_abs()),
            u128::from(denominator.unsigned_abs()),
        ) as i64;
        let sign = if denominator < 0 { -1 } else { 1 };
        Fraction {
            numerator: sign * numerator / divisor,
            denominator: sign * denominator / divisor,
        }
    }

    /// Create an integer fraction `n/1`
    pub const fn integer(n: i64) -> Self {
        Fraction {
            numerator: n,
            denominator: 1,
        }
    }

    pub const fn numerator(self) -> i64 {
        self.numerator
    }

    pub const fn denominator(self) -> i64 {
        self.denominator
    }

    pub const fn is_zero(self) -> bool {
        self.numerator == 0
    }

    pub const fn is_integer(self) -> bool {
        self.denominator == 1
    }

    /// Convert to f64 (lossy)
    pub fn to_f64(self) -> f64 {
        self.numerator as f64 / self.denominator as f64
    }

    /// Convert a float to the closest fraction with a denominator of at most
    /// [`MAX_DENOMINATOR`], if that fraction equals the float.
    ///
    /// Returns `None` for non-finite input and for values that are not
    /// representable as a bounded-denominator rational (e.g. `π`).
    pub fn from_f64(value: f64) -> Option<Fraction> {
        if !value.is_finite() || value.abs() > i64::MAX as f64 / 2.0 {
            return None;
        }

        // Continued-fraction expansion, keeping the last two convergents
        let (mut h_prev, mut h) = (1i64, value.floor() as i64);
        let (mut k_prev, mut k) = (0i64, 1i64);
        let mut rest = value - value.floor();

        loop {
            let candidate = h as f64 / k as f64;
            if (candidate - value).abs() <= CONVERSION_EPSILON * value.abs().max(1.0) {
                return Some(Fraction::new(h, k));
            }
            if rest.abs() < f64::EPSILON {
                return None;
            }

            let inverse = 1.0 / rest;
            let term = inverse.floor();
            rest = inverse - term;
            let term = term as i64;

            let k_next = term.checked_mul(k)?.checked_add(k_prev)?;
            if k_next > MAX_DENOMINATOR {
                return None;
            }
            let h_next = term.checked_mul(h)?.checked_add(h_prev)?;

            (h_prev, h) = (h, h_next);
            (k_prev, k) = (k, k_next);
        }
    }

    /// Reduce an `i128` ratio, failing when the result does not fit in `i64`
    fn reduce(numerator: i128, denominator: i128) -> Option<Fraction> {
        if denominator == 0 {
            return None;
        }
        if numerator == 0 {
            return Some(Self::ZERO);
        }
        let divisor = gcd(numerator.unsigned_abs(), denominator.unsigned_abs()) as i128;
        let sign = if denominator < 0 { -1 } else { 1 };
        Some(Fraction {
            numerator: i64::try_from(sign * numerator / divisor).ok()?,
            denominator: i64::try_from(sign * denominator / divisor).ok()?,
        })
    }

    pub fn checked_add(self, rhs: Fraction) -> Option<Fraction> {
        let (a, b) = (i128::from(self.numerator), i128::from(self.denominator));
        let (c, d) = (i128::from(rhs.numerator), i128::from(rhs.denominator));
        Self::reduce(a * d + c * b, b * d)
    }

    pub fn checked_sub(self, rhs: Fraction) -> Option<Fraction> {
        self.checked_add(rhs.checked_neg()?)
    }

    pub fn checked_mul(self, rhs: Fraction) -> Option<Fraction> {
        Self::reduce(
            i128::from(self.numerator) * i128::from(rhs.numerator),
            i128::from(self.denominator) * i128::from(rhs.denominator),
        )
    }

    /// `None` on overflow or when `rhs` is zero
    pub fn checked_div(self, rhs: Fraction) -> Option<Fraction> {
        Self::reduce(
            i128::from(self.numerator) * i128::from(rhs.denominator),
            i128::from(self.denominator) * i128::from(rhs.numerator),
        )
    }

    pub fn checked_neg(self) -> Option<Fraction> {
        Some(Fraction {
            numerator: self.numerator.checked_neg()?,
            denominator: self.denominator,
        })
    }
}

fn gcd(mut a: u128, mut b: u128) -> u128 {
    while b != 0 {
        (a, b) = (b, a % b);
    }
    a
}

impl From<i64> for Fraction {
    fn from(n: i64) -> Self {
        Fraction::integer(n)
    }
}

impl Ord for Fraction {
    fn cmp(&self, other: &Self) -> Ordering {
        // Denominators are positive, so cross-multiplying keeps the order
        (i128::from(self.numerator) * i128::from(other.denominator))
            .cmp(&(i128::from(other.numerator) * i128::from(self.denominator)))
    }
}

impl PartialOrd for Fraction {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Fraction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_integer() {
            write!(f, "{}", self.numerator)
        } else {
            write!(f, "{}/{}", self.numerator, self.denominator)
        }
    }
}
