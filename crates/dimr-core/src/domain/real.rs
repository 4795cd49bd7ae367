//! Real numbers (`f64`)
//!
//! Arithmetic follows IEEE semantics: dividing by zero yields an infinity or
//! NaN rather than a failure, and bitwise operators truncate to `i64`
//! without overflow checks.

use std::str::FromStr;

use super::{
    checked_unit, fail, gamma_factorial, power_unit, require_unitless, same_unit, shift, truncate,
    truth, Auxiliary, Diagnostics, Domain, Outcome,
};
use crate::error::EvalError;
use crate::types::{Quantity, Unit};

#[derive(Debug, Clone, Default)]
pub struct RealDomain;

impl RealDomain {
    pub fn new() -> Self {
        RealDomain
    }

    /// Operations a wrapping differential domain needs from this one
    pub fn auxiliary() -> Auxiliary<f64> {
        Auxiliary::new(|x: &f64| x.ln())
    }

    fn compare(
        &self,
        a: &Quantity<f64>,
        b: &Quantity<f64>,
        diag: &mut dyn Diagnostics,
        predicate: fn(f64, f64) -> bool,
    ) -> Outcome<f64> {
        same_unit(a, b, diag)?;
        Ok(truth(predicate(*a.scalar(), *b.scalar())))
    }

    fn bitwise(
        &self,
        operation: &'static str,
        a: &Quantity<f64>,
        b: &Quantity<f64>,
        diag: &mut dyn Diagnostics,
        op: fn(i64, i64) -> i64,
    ) -> Outcome<f64> {
        require_unitless(operation, &[a, b], diag)?;
        let result = op(truncate(*a.scalar()), truncate(*b.scalar()));
        Ok(Quantity::unitless(result as f64))
    }
}

/// IEEE 754 remainder: `a - b * n` where `n` is `a / b` rounded half-to-even
pub(crate) fn ieee_remainder(a: f64, b: f64) -> f64 {
    a - b * (a / b).round_ties_even()
}

impl Domain for RealDomain {
    type Scalar = f64;

    fn invalid(&self) -> Quantity<f64> {
        Quantity::unitless(0.0)
    }

    fn parse_scalar(&self, text: &str, diag: &mut dyn Diagnostics) -> Outcome<f64> {
        match f64::from_str(text.trim()) {
            Ok(value) => Ok(Quantity::unitless(value)),
            Err(_) => fail(diag, EvalError::Parse(text.to_string())),
        }
    }

    fn plus(&self, a: &Quantity<f64>, _diag: &mut dyn Diagnostics) -> Outcome<f64> {
        Ok(a.clone())
    }

    fn minus(&self, a: &Quantity<f64>, _diag: &mut dyn Diagnostics) -> Outcome<f64> {
        Ok(a.with_scalar(-*a.scalar()))
    }

    fn invert(&self, a: &Quantity<f64>, diag: &mut dyn Diagnostics) -> Outcome<f64> {
        require_unitless("invert", &[a], diag)?;
        Ok(Quantity::unitless(!truncate(*a.scalar()) as f64))
    }

    fn remove_units(&self, a: &Quantity<f64>, _diag: &mut dyn Diagnostics) -> Outcome<f64> {
        Ok(Quantity::unitless(*a.scalar()))
    }

    fn factorial(&self, a: &Quantity<f64>, diag: &mut dyn Diagnostics) -> Outcome<f64> {
        require_unitless("factorial", &[a], diag)?;
        Ok(Quantity::unitless(gamma_factorial(*a.scalar())))
    }

    fn add(&self, a: &Quantity<f64>, b: &Quantity<f64>, diag: &mut dyn Diagnostics) -> Outcome<f64> {
        let unit = same_unit(a, b, diag)?;
        Ok(Quantity::new(a.scalar() + b.scalar(), unit))
    }

    fn subtract(
        &self,
        a: &Quantity<f64>,
        b: &Quantity<f64>,
        diag: &mut dyn Diagnostics,
    ) -> Outcome<f64> {
        let unit = same_unit(a, b, diag)?;
        Ok(Quantity::new(a.scalar() - b.scalar(), unit))
    }

    fn multiply(
        &self,
        a: &Quantity<f64>,
        b: &Quantity<f64>,
        diag: &mut dyn Diagnostics,
    ) -> Outcome<f64> {
        let unit = checked_unit(a.unit().multiply(b.unit()), diag)?;
        Ok(Quantity::new(a.scalar() * b.scalar(), unit))
    }

    fn divide(
        &self,
        a: &Quantity<f64>,
        b: &Quantity<f64>,
        diag: &mut dyn Diagnostics,
    ) -> Outcome<f64> {
        let unit = checked_unit(a.unit().divide(b.unit()), diag)?;
        Ok(Quantity::new(a.scalar() / b.scalar(), unit))
    }

    fn modulo(
        &self,
        a: &Quantity<f64>,
        b: &Quantity<f64>,
        diag: &mut dyn Diagnostics,
    ) -> Outcome<f64> {
        let unit = same_unit(a, b, diag)?;
        Ok(Quantity::new(ieee_remainder(*a.scalar(), *b.scalar()), unit))
    }

    fn integer_divide(
        &self,
        a: &Quantity<f64>,
        b: &Quantity<f64>,
        diag: &mut dyn Diagnostics,
    ) -> Outcome<f64> {
        let unit = checked_unit(a.unit().divide(b.unit()), diag)?;
        Ok(Quantity::new((a.scalar() / b.scalar()).trunc(), unit))
    }

    fn power(&self, a: &Quantity<f64>, b: &Quantity<f64>, diag: &mut dyn Diagnostics) -> Outcome<f64> {
        require_unitless("power exponent", &[b], diag)?;
        let unit = power_unit(a.unit(), *b.scalar(), diag)?;
        Ok(Quantity::new(a.scalar().powf(*b.scalar()), unit))
    }

    fn bit_or(&self, a: &Quantity<f64>, b: &Quantity<f64>, diag: &mut dyn Diagnostics) -> Outcome<f64> {
        self.bitwise("bitwise or", a, b, diag, |x, y| x | y)
    }

    fn bit_and(
        &self,
        a: &Quantity<f64>,
        b: &Quantity<f64>,
        diag: &mut dyn Diagnostics,
    ) -> Outcome<f64> {
        self.bitwise("bitwise and", a, b, diag, |x, y| x & y)
    }

    fn shift_left(
        &self,
        a: &Quantity<f64>,
        b: &Quantity<f64>,
        diag: &mut dyn Diagnostics,
    ) -> Outcome<f64> {
        self.bitwise("shift", a, b, diag, |x, y| shift(x, y, true))
    }

    fn shift_right(
        &self,
        a: &Quantity<f64>,
        b: &Quantity<f64>,
        diag: &mut dyn Diagnostics,
    ) -> Outcome<f64> {
        self.bitwise("shift", a, b, diag, |x, y| shift(x, y, false))
    }

    fn greater(
        &self,
        a: &Quantity<f64>,
        b: &Quantity<f64>,
        diag: &mut dyn Diagnostics,
    ) -> Outcome<f64> {
        self.compare(a, b, diag, |x, y| x > y)
    }

    fn greater_equal(
        &self,
        a: &Quantity<f64>,
        b: &Quantity<f64>,
        diag: &mut dyn Diagnostics,
    ) -> Outcome<f64> {
        self.compare(a, b, diag, |x, y| x >= y)
    }

    fn less(&self, a: &Quantity<f64>, b: &Quantity<f64>, diag: &mut dyn Diagnostics) -> Outcome<f64> {
        self.compare(a, b, diag, |x, y| x < y)
    }

    fn less_equal(
        &self,
        a: &Quantity<f64>,
        b: &Quantity<f64>,
        diag: &mut dyn Diagnostics,
    ) -> Outcome<f64> {
        self.compare(a, b, diag, |x, y| x <= y)
    }

    fn equals(
        &self,
        a: &Quantity<f64>,
        b: &Quantity<f64>,
        diag: &mut dyn Diagnostics,
    ) -> Outcome<f64> {
        self.compare(a, b, diag, |x, y| x == y)
    }

    fn not_equals(
        &self,
        a: &Quantity<f64>,
        b: &Quantity<f64>,
        diag: &mut dyn Diagnostics,
    ) -> Outcome<f64> {
        self.compare(a, b, diag, |x, y| x != y)
    }

    fn logical_or(
        &self,
        a: &Quantity<f64>,
        b: &Quantity<f64>,
        _diag: &mut dyn Diagnostics,
    ) -> Outcome<f64> {
        Ok(truth(self.is_true(a) || self.is_true(b)))
    }

    fn logical_and(
        &self,
        a: &Quantity<f64>,
        b: &Quantity<f64>,
        _diag: &mut dyn Diagnostics,
    ) -> Outcome<f64> {
        Ok(truth(self.is_true(a) && self.is_true(b)))
    }

    fn is_true(&self, a: &Quantity<f64>) -> bool {
        *a.scalar() != 0.0
    }

    fn factor(&self, quantity: &Quantity<f64>, scale: &f64) -> f64 {
        (quantity.scalar() * scale).abs()
    }

    fn format_scalar(&self, scalar: &f64) -> String {
        // Shortest representation that parses back to the same bits
        format!("{scalar}")
    }

    fn encode(&self, scalar: &f64) -> serde_json::Value {
        serde_json::Number::from_f64(*scalar)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null)
    }

    fn decode(&self, value: &serde_json::Value) -> Option<f64> {
        value.as_f64()
    }
}

impl From<f64> for Quantity<f64> {
    fn from(value: f64) -> Self {
        Quantity::new(value, Unit::unitless())
    }
}
