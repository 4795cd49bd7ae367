//! Numeric domains
//!
//! A [`Domain`] is a stateless strategy that implements every operator the
//! evaluator needs for one scalar representation. The three implementations
//! share the unit-compatibility rules in this module:
//!
//! | Operation                                  | Unit rule                         |
//! |--------------------------------------------|-----------------------------------|
//! | add, subtract, modulo, comparisons, equals | identical units                   |
//! | multiply, divide, integer divide           | units multiply / divide           |
//! | power                                      | unitless exponent, rational if the base has units |
//! | bitwise, shifts, invert, factorial         | unitless operands                 |
//! | logical and / or                           | none (truthiness only)            |
//!
//! Every fallible operation returns an [`Outcome`]. On failure the message
//! has already been posted to the [`Diagnostics`] sink.

pub mod complex;
pub mod differential;
pub mod real;

pub use complex::ComplexDomain;
pub use differential::{Auxiliary, Differential, DifferentialDomain};
pub use real::RealDomain;

use crate::error::EvalError;
use crate::types::{Fraction, Quantity, Unit};

/// Result of a domain operation
pub type Outcome<T> = Result<Quantity<T>, EvalError>;

/// Sink for human-readable failure messages
pub trait Diagnostics {
    fn post(&mut self, message: &str);
}

/// Lookup context handed to the name-resolving operations
pub trait Context<T>: Diagnostics {
    fn variable(&self, name: &str) -> Option<Quantity<T>>;
    fn unit(&self, name: &str) -> Option<Quantity<T>>;
}

/// Diagnostics sink that collects messages in order
impl Diagnostics for Vec<String> {
    fn post(&mut self, message: &str) {
        self.push(message.to_string());
    }
}

/// Constants every scalar representation must provide
pub trait Scalar: Clone + PartialEq + std::fmt::Debug + Send + Sync {
    fn zero() -> Self;
    fn one() -> Self;
    fn from_f64(value: f64) -> Self;
}

impl Scalar for f64 {
    fn zero() -> Self {
        0.0
    }

    fn one() -> Self {
        1.0
    }

    fn from_f64(value: f64) -> Self {
        value
    }
}

/// The operation contract over quantities of one scalar representation
pub trait Domain: Send + Sync {
    type Scalar: Scalar;

    /// The value left behind by a failed operation
    fn invalid(&self) -> Quantity<Self::Scalar>;

    /// Parse a numeric literal
    fn parse_scalar(&self, text: &str, diag: &mut dyn Diagnostics) -> Outcome<Self::Scalar>;

    /// Units every workspace understands without registration
    fn builtin_unit(&self, _name: &str) -> Option<Quantity<Self::Scalar>> {
        None
    }

    /// Resolve a unit: workspace registrations first, then builtins
    fn unit(&self, name: &str, ctx: &mut dyn Context<Self::Scalar>) -> Outcome<Self::Scalar> {
        match ctx.unit(name).or_else(|| self.builtin_unit(name)) {
            Some(quantity) => Ok(quantity),
            None => fail(ctx, EvalError::UnknownUnit(name.to_string())),
        }
    }

    fn variable(&self, name: &str, ctx: &mut dyn Context<Self::Scalar>) -> Outcome<Self::Scalar> {
        match ctx.variable(name) {
            Some(quantity) => Ok(quantity),
            None => fail(ctx, EvalError::UnknownVariable(name.to_string())),
        }
    }

    /// The differential `d(name)`; only meaningful for differentiable domains
    fn differential(&self, name: &str, diag: &mut dyn Diagnostics) -> Outcome<Self::Scalar> {
        fail(diag, EvalError::UnknownDifferential(name.to_string()))
    }

    fn plus(&self, a: &Quantity<Self::Scalar>, diag: &mut dyn Diagnostics) -> Outcome<Self::Scalar>;
    fn minus(&self, a: &Quantity<Self::Scalar>, diag: &mut dyn Diagnostics) -> Outcome<Self::Scalar>;
    fn invert(&self, a: &Quantity<Self::Scalar>, diag: &mut dyn Diagnostics) -> Outcome<Self::Scalar>;
    fn remove_units(
        &self,
        a: &Quantity<Self::Scalar>,
        diag: &mut dyn Diagnostics,
    ) -> Outcome<Self::Scalar>;
    fn factorial(
        &self,
        a: &Quantity<Self::Scalar>,
        diag: &mut dyn Diagnostics,
    ) -> Outcome<Self::Scalar>;

    fn add(
        &self,
        a: &Quantity<Self::Scalar>,
        b: &Quantity<Self::Scalar>,
        diag: &mut dyn Diagnostics,
    ) -> Outcome<Self::Scalar>;
    fn subtract(
        &self,
        a: &Quantity<Self::Scalar>,
        b: &Quantity<Self::Scalar>,
        diag: &mut dyn Diagnostics,
    ) -> Outcome<Self::Scalar>;
    fn multiply(
        &self,
        a: &Quantity<Self::Scalar>,
        b: &Quantity<Self::Scalar>,
        diag: &mut dyn Diagnostics,
    ) -> Outcome<Self::Scalar>;
    fn divide(
        &self,
        a: &Quantity<Self::Scalar>,
        b: &Quantity<Self::Scalar>,
        diag: &mut dyn Diagnostics,
    ) -> Outcome<Self::Scalar>;
    fn modulo(
        &self,
        a: &Quantity<Self::Scalar>,
        b: &Quantity<Self::Scalar>,
        diag: &mut dyn Diagnostics,
    ) -> Outcome<Self::Scalar>;
    fn integer_divide(
        &self,
        a: &Quantity<Self::Scalar>,
        b: &Quantity<Self::Scalar>,
        diag: &mut dyn Diagnostics,
    ) -> Outcome<Self::Scalar>;
    fn power(
        &self,
        a: &Quantity<Self::Scalar>,
        b: &Quantity<Self::Scalar>,
        diag: &mut dyn Diagnostics,
    ) -> Outcome<Self::Scalar>;

    fn bit_or(
        &self,
        a: &Quantity<Self::Scalar>,
        b: &Quantity<Self::Scalar>,
        diag: &mut dyn Diagnostics,
    ) -> Outcome<Self::Scalar>;
    fn bit_and(
        &self,
        a: &Quantity<Self::Scalar>,
        b: &Quantity<Self::Scalar>,
        diag: &mut dyn Diagnostics,
    ) -> Outcome<Self::Scalar>;
    fn shift_left(
        &self,
        a: &Quantity<Self::Scalar>,
        b: &Quantity<Self::Scalar>,
        diag: &mut dyn Diagnostics,
    ) -> Outcome<Self::Scalar>;
    fn shift_right(
        &self,
        a: &Quantity<Self::Scalar>,
        b: &Quantity<Self::Scalar>,
        diag: &mut dyn Diagnostics,
    ) -> Outcome<Self::Scalar>;

    fn greater(
        &self,
        a: &Quantity<Self::Scalar>,
        b: &Quantity<Self::Scalar>,
        diag: &mut dyn Diagnostics,
    ) -> Outcome<Self::Scalar>;
    fn greater_equal(
        &self,
        a: &Quantity<Self::Scalar>,
        b: &Quantity<Self::Scalar>,
        diag: &mut dyn Diagnostics,
    ) -> Outcome<Self::Scalar>;
    fn less(
        &self,
        a: &Quantity<Self::Scalar>,
        b: &Quantity<Self::Scalar>,
        diag: &mut dyn Diagnostics,
    ) -> Outcome<Self::Scalar>;
    fn less_equal(
        &self,
        a: &Quantity<Self::Scalar>,
        b: &Quantity<Self::Scalar>,
        diag: &mut dyn Diagnostics,
    ) -> Outcome<Self::Scalar>;
    fn equals(
        &self,
        a: &Quantity<Self::Scalar>,
        b: &Quantity<Self::Scalar>,
        diag: &mut dyn Diagnostics,
    ) -> Outcome<Self::Scalar>;
    fn not_equals(
        &self,
        a: &Quantity<Self::Scalar>,
        b: &Quantity<Self::Scalar>,
        diag: &mut dyn Diagnostics,
    ) -> Outcome<Self::Scalar>;
    fn logical_or(
        &self,
        a: &Quantity<Self::Scalar>,
        b: &Quantity<Self::Scalar>,
        diag: &mut dyn Diagnostics,
    ) -> Outcome<Self::Scalar>;
    fn logical_and(
        &self,
        a: &Quantity<Self::Scalar>,
        b: &Quantity<Self::Scalar>,
        diag: &mut dyn Diagnostics,
    ) -> Outcome<Self::Scalar>;

    /// Truthiness used by the logical operators
    fn is_true(&self, a: &Quantity<Self::Scalar>) -> bool;

    /// Magnitude of `quantity` expressed with a display unit of the given
    /// scale; drives output-unit selection.
    fn factor(&self, quantity: &Quantity<Self::Scalar>, scale: &Self::Scalar) -> f64;

    /// Render a quantity so that parsing the text yields it back
    fn format(&self, quantity: &Quantity<Self::Scalar>) -> String {
        let scalar = self.format_scalar(quantity.scalar());
        if quantity.is_unitless() {
            scalar
        } else {
            format!("{scalar} {}", quantity.unit())
        }
    }

    fn format_scalar(&self, scalar: &Self::Scalar) -> String;

    /// Compact JSON encoding of a scalar
    fn encode(&self, scalar: &Self::Scalar) -> serde_json::Value;

    fn decode(&self, value: &serde_json::Value) -> Option<Self::Scalar>;
}

/// Post `err` to the sink and hand it back for propagation
pub(crate) fn report<D>(diag: &mut D, err: EvalError) -> EvalError
where
    D: Diagnostics + ?Sized,
{
    tracing::debug!(error = %err, "domain operation failed");
    diag.post(&err.to_string());
    err
}

pub(crate) fn fail<T, D>(diag: &mut D, err: EvalError) -> Outcome<T>
where
    D: Diagnostics + ?Sized,
{
    Err(report(diag, err))
}

/// Identical units on both operands, returning the shared unit
pub(crate) fn same_unit<T>(
    a: &Quantity<T>,
    b: &Quantity<T>,
    diag: &mut dyn Diagnostics,
) -> Result<Unit, EvalError> {
    if a.unit() == b.unit() {
        Ok(a.unit().clone())
    } else {
        Err(report(diag, EvalError::UnitMismatch))
    }
}

pub(crate) fn require_unitless<T>(
    operation: &'static str,
    operands: &[&Quantity<T>],
    diag: &mut dyn Diagnostics,
) -> Result<(), EvalError> {
    if operands.iter().all(|q| q.is_unitless()) {
        Ok(())
    } else {
        Err(report(diag, EvalError::UnsupportedUnit { operation }))
    }
}

/// Unit algebra result; an exponent that overflows is a power too complex
/// to represent
pub(crate) fn checked_unit(
    unit: Option<Unit>,
    diag: &mut dyn Diagnostics,
) -> Result<Unit, EvalError> {
    unit.ok_or_else(|| report(diag, EvalError::PowerTooComplex))
}

/// Unit of `base ^ exponent` for a real exponent
pub(crate) fn power_unit(
    base: &Unit,
    exponent: f64,
    diag: &mut dyn Diagnostics,
) -> Result<Unit, EvalError> {
    if base.is_unitless() {
        return Ok(Unit::unitless());
    }
    let unit = Fraction::from_f64(exponent).and_then(|fraction| base.power(fraction));
    checked_unit(unit, diag)
}

/// Unitless 1 or 0
pub(crate) fn truth<T: Scalar>(value: bool) -> Quantity<T> {
    Quantity::unitless(if value { T::one() } else { T::zero() })
}

/// Truncate to a 64-bit integer, saturating out-of-range and mapping NaN to 0
pub(crate) fn truncate(value: f64) -> i64 {
    value as i64
}

/// Shift by the low bits of `amount`, wrapping without overflow checks
pub(crate) fn shift(value: i64, amount: i64, left: bool) -> i64 {
    let amount = amount as u32;
    if left {
        value.wrapping_shl(amount)
    } else {
        value.wrapping_shr(amount)
    }
}

/// Γ(x + 1): exact products for small non-negative integers, Lanczos
/// otherwise. Negative integers sit on poles of Γ and give NaN.
pub(crate) fn gamma_factorial(x: f64) -> f64 {
    if x.fract() == 0.0 {
        if x < 0.0 {
            return f64::NAN;
        }
        if x <= 170.0 {
            return (1..=x as u64).fold(1.0, |acc, n| acc * n as f64);
        }
    }
    gamma(x + 1.0)
}

fn gamma(x: f64) -> f64 {
    const G: f64 = 7.0;
    const COEFFICIENTS: [f64; 9] = [
        0.999_999_999_999_809_9,
        676.520_368_121_885_1,
        -1_259.139_216_722_402_8,
        771.323_428_777_653_1,
        -176.615_029_162_140_6,
        12.507_343_278_686_905,
        -0.138_571_095_265_720_12,
        9.984_369_578_019_572e-6,
        1.505_632_735_149_311_6e-7,
    ];

    if x < 0.5 {
        // Reflection formula
        let pi = std::f64::consts::PI;
        return pi / ((pi * x).sin() * gamma(1.0 - x));
    }

    let x = x - 1.0;
    let t = x + G + 0.5;
    let sum = COEFFICIENTS
        .iter()
        .enumerate()
        .skip(1)
        .fold(COEFFICIENTS[0], |acc, (i, c)| acc + c / (x + i as f64));
    (2.0 * std::f64::consts::PI).sqrt() * t.powf(x + 0.5) * (-t).exp() * sum
}
