//! Complex numbers (`Complex64`)
//!
//! Complex numbers have no total order, so comparisons, truthiness, bitwise
//! operators and factorial look at the real part only. Equality compares
//! both components.

use std::str::FromStr;

use num_complex::Complex64;

use super::real::ieee_remainder;
use super::{
    checked_unit, fail, gamma_factorial, power_unit, require_unitless, same_unit, shift, truncate,
    truth, Auxiliary, Diagnostics, Domain, Outcome, Scalar,
};
use crate::error::EvalError;
use crate::types::{Quantity, Unit};

impl Scalar for Complex64 {
    fn zero() -> Self {
        Complex64::new(0.0, 0.0)
    }

    fn one() -> Self {
        Complex64::new(1.0, 0.0)
    }

    fn from_f64(value: f64) -> Self {
        Complex64::new(value, 0.0)
    }
}

#[derive(Debug, Clone, Default)]
pub struct ComplexDomain;

impl ComplexDomain {
    pub fn new() -> Self {
        ComplexDomain
    }

    /// Operations a wrapping differential domain needs from this one
    pub fn auxiliary() -> Auxiliary<Complex64> {
        Auxiliary::new(|z: &Complex64| z.ln())
    }

    fn compare(
        &self,
        a: &Quantity<Complex64>,
        b: &Quantity<Complex64>,
        diag: &mut dyn Diagnostics,
        predicate: fn(f64, f64) -> bool,
    ) -> Outcome<Complex64> {
        same_unit(a, b, diag)?;
        Ok(truth(predicate(a.scalar().re, b.scalar().re)))
    }

    fn bitwise(
        &self,
        operation: &'static str,
        a: &Quantity<Complex64>,
        b: &Quantity<Complex64>,
        diag: &mut dyn Diagnostics,
        op: fn(i64, i64) -> i64,
    ) -> Outcome<Complex64> {
        require_unitless(operation, &[a, b], diag)?;
        let result = op(truncate(a.scalar().re), truncate(b.scalar().re));
        Ok(Quantity::unitless(Complex64::from_f64(result as f64)))
    }
}

/// `base ^ exponent`, staying on the real axis where the result is real
fn complex_power(base: Complex64, exponent: Complex64) -> Complex64 {
    if exponent.im != 0.0 {
        return base.powc(exponent);
    }
    let e = exponent.re;
    if base.im != 0.0 {
        base.powf(e)
    } else if base.re >= 0.0 || e.fract() == 0.0 {
        Complex64::new(base.re.powf(e), 0.0)
    } else {
        // A signed-zero imaginary part would select the lower branch
        Complex64::new(base.re, 0.0).powf(e)
    }
}

fn format_component(value: f64) -> String {
    format!("{value}")
}

impl Domain for ComplexDomain {
    type Scalar = Complex64;

    fn invalid(&self) -> Quantity<Complex64> {
        Quantity::unitless(Complex64::zero())
    }

    fn parse_scalar(&self, text: &str, diag: &mut dyn Diagnostics) -> Outcome<Complex64> {
        match f64::from_str(text.trim()) {
            Ok(value) => Ok(Quantity::unitless(Complex64::from_f64(value))),
            Err(_) => fail(diag, EvalError::Parse(text.to_string())),
        }
    }

    fn builtin_unit(&self, name: &str) -> Option<Quantity<Complex64>> {
        match name {
            "i" | "j" => Some(Quantity::unitless(Complex64::i())),
            _ => None,
        }
    }

    fn plus(&self, a: &Quantity<Complex64>, _diag: &mut dyn Diagnostics) -> Outcome<Complex64> {
        Ok(a.clone())
    }

    fn minus(&self, a: &Quantity<Complex64>, _diag: &mut dyn Diagnostics) -> Outcome<Complex64> {
        Ok(a.with_scalar(-a.scalar()))
    }

    fn invert(&self, a: &Quantity<Complex64>, diag: &mut dyn Diagnostics) -> Outcome<Complex64> {
        require_unitless("invert", &[a], diag)?;
        let result = !truncate(a.scalar().re);
        Ok(Quantity::unitless(Complex64::from_f64(result as f64)))
    }

    fn remove_units(
        &self,
        a: &Quantity<Complex64>,
        _diag: &mut dyn Diagnostics,
    ) -> Outcome<Complex64> {
        Ok(Quantity::unitless(*a.scalar()))
    }

    fn factorial(&self, a: &Quantity<Complex64>, diag: &mut dyn Diagnostics) -> Outcome<Complex64> {
        require_unitless("factorial", &[a], diag)?;
        let result = gamma_factorial(a.scalar().re);
        Ok(Quantity::unitless(Complex64::from_f64(result)))
    }

    fn add(
        &self,
        a: &Quantity<Complex64>,
        b: &Quantity<Complex64>,
        diag: &mut dyn Diagnostics,
    ) -> Outcome<Complex64> {
        let unit = same_unit(a, b, diag)?;
        Ok(Quantity::new(a.scalar() + b.scalar(), unit))
    }

    fn subtract(
        &self,
        a: &Quantity<Complex64>,
        b: &Quantity<Complex64>,
        diag: &mut dyn Diagnostics,
    ) -> Outcome<Complex64> {
        let unit = same_unit(a, b, diag)?;
        Ok(Quantity::new(a.scalar() - b.scalar(), unit))
    }

    fn multiply(
        &self,
        a: &Quantity<Complex64>,
        b: &Quantity<Complex64>,
        diag: &mut dyn Diagnostics,
    ) -> Outcome<Complex64> {
        let unit = checked_unit(a.unit().multiply(b.unit()), diag)?;
        Ok(Quantity::new(a.scalar() * b.scalar(), unit))
    }

    fn divide(
        &self,
        a: &Quantity<Complex64>,
        b: &Quantity<Complex64>,
        diag: &mut dyn Diagnostics,
    ) -> Outcome<Complex64> {
        let unit = checked_unit(a.unit().divide(b.unit()), diag)?;
        Ok(Quantity::new(a.scalar() / b.scalar(), unit))
    }

    fn modulo(
        &self,
        a: &Quantity<Complex64>,
        b: &Quantity<Complex64>,
        diag: &mut dyn Diagnostics,
    ) -> Outcome<Complex64> {
        let unit = same_unit(a, b, diag)?;
        let (x, y) = (a.scalar(), b.scalar());
        let result = if x.im == 0.0 && y.im == 0.0 {
            Complex64::from_f64(ieee_remainder(x.re, y.re))
        } else {
            // Gaussian-integer quotient, rounded component-wise
            let q = x / y;
            let q = Complex64::new(q.re.round_ties_even(), q.im.round_ties_even());
            x - y * q
        };
        Ok(Quantity::new(result, unit))
    }

    fn integer_divide(
        &self,
        a: &Quantity<Complex64>,
        b: &Quantity<Complex64>,
        diag: &mut dyn Diagnostics,
    ) -> Outcome<Complex64> {
        let unit = checked_unit(a.unit().divide(b.unit()), diag)?;
        let q = a.scalar() / b.scalar();
        Ok(Quantity::new(Complex64::new(q.re.trunc(), q.im.trunc()), unit))
    }

    fn power(
        &self,
        a: &Quantity<Complex64>,
        b: &Quantity<Complex64>,
        diag: &mut dyn Diagnostics,
    ) -> Outcome<Complex64> {
        require_unitless("power exponent", &[b], diag)?;
        let exponent = *b.scalar();
        let unit = if a.is_unitless() {
            Unit::unitless()
        } else if exponent.im != 0.0 {
            return fail(diag, EvalError::ComplexUnitPower);
        } else {
            power_unit(a.unit(), exponent.re, diag)?
        };
        Ok(Quantity::new(complex_power(*a.scalar(), exponent), unit))
    }

    fn bit_or(
        &self,
        a: &Quantity<Complex64>,
        b: &Quantity<Complex64>,
        diag: &mut dyn Diagnostics,
    ) -> Outcome<Complex64> {
        self.bitwise("bitwise or", a, b, diag, |x, y| x | y)
    }

    fn bit_and(
        &self,
        a: &Quantity<Complex64>,
        b: &Quantity<Complex64>,
        diag: &mut dyn Diagnostics,
    ) -> Outcome<Complex64> {
        self.bitwise("bitwise and", a, b, diag, |x, y| x & y)
    }

    fn shift_left(
        &self,
        a: &Quantity<Complex64>,
        b: &Quantity<Complex64>,
        diag: &mut dyn Diagnostics,
    ) -> Outcome<Complex64> {
        self.bitwise("shift", a, b, diag, |x, y| shift(x, y, true))
    }

    fn shift_right(
        &self,
        a: &Quantity<Complex64>,
        b: &Quantity<Complex64>,
        diag: &mut dyn Diagnostics,
    ) -> Outcome<Complex64> {
        self.bitwise("shift", a, b, diag, |x, y| shift(x, y, false))
    }

    fn greater(
        &self,
        a: &Quantity<Complex64>,
        b: &Quantity<Complex64>,
        diag: &mut dyn Diagnostics,
    ) -> Outcome<Complex64> {
        self.compare(a, b, diag, |x, y| x > y)
    }

    fn greater_equal(
        &self,
        a: &Quantity<Complex64>,
        b: &Quantity<Complex64>,
        diag: &mut dyn Diagnostics,
    ) -> Outcome<Complex64> {
        self.compare(a, b, diag, |x, y| x >= y)
    }

    fn less(
        &self,
        a: &Quantity<Complex64>,
        b: &Quantity<Complex64>,
        diag: &mut dyn Diagnostics,
    ) -> Outcome<Complex64> {
        self.compare(a, b, diag, |x, y| x < y)
    }

    fn less_equal(
        &self,
        a: &Quantity<Complex64>,
        b: &Quantity<Complex64>,
        diag: &mut dyn Diagnostics,
    ) -> Outcome<Complex64> {
        self.compare(a, b, diag, |x, y| x <= y)
    }

    fn equals(
        &self,
        a: &Quantity<Complex64>,
        b: &Quantity<Complex64>,
        diag: &mut dyn Diagnostics,
    ) -> Outcome<Complex64> {
        same_unit(a, b, diag)?;
        Ok(truth(a.scalar() == b.scalar()))
    }

    fn not_equals(
        &self,
        a: &Quantity<Complex64>,
        b: &Quantity<Complex64>,
        diag: &mut dyn Diagnostics,
    ) -> Outcome<Complex64> {
        same_unit(a, b, diag)?;
        Ok(truth(a.scalar() != b.scalar()))
    }

    fn logical_or(
        &self,
        a: &Quantity<Complex64>,
        b: &Quantity<Complex64>,
        _diag: &mut dyn Diagnostics,
    ) -> Outcome<Complex64> {
        Ok(truth(self.is_true(a) || self.is_true(b)))
    }

    fn logical_and(
        &self,
        a: &Quantity<Complex64>,
        b: &Quantity<Complex64>,
        _diag: &mut dyn Diagnostics,
    ) -> Outcome<Complex64> {
        Ok(truth(self.is_true(a) && self.is_true(b)))
    }

    fn is_true(&self, a: &Quantity<Complex64>) -> bool {
        a.scalar().re != 0.0
    }

    fn factor(&self, quantity: &Quantity<Complex64>, scale: &Complex64) -> f64 {
        let scaled = quantity.scalar() * scale;
        scaled.re.abs().max(scaled.im.abs())
    }

    fn format(&self, quantity: &Quantity<Complex64>) -> String {
        let scalar = self.format_scalar(quantity.scalar());
        if quantity.is_unitless() {
            return scalar;
        }
        let z = quantity.scalar();
        if z.re != 0.0 && z.im != 0.0 {
            format!("({scalar}) {}", quantity.unit())
        } else {
            format!("{scalar} {}", quantity.unit())
        }
    }

    fn format_scalar(&self, scalar: &Complex64) -> String {
        let (re, im) = (scalar.re, scalar.im);
        match (re == 0.0, im == 0.0) {
            (true, true) => "0".to_string(),
            (false, true) => format_component(re),
            (true, false) => format!("{}i", format_component(im)),
            (false, false) => {
                let sign = if im.is_sign_negative() { '-' } else { '+' };
                format!(
                    "{}{sign}{}i",
                    format_component(re),
                    format_component(im.abs())
                )
            }
        }
    }

    fn encode(&self, scalar: &Complex64) -> serde_json::Value {
        let number = |x: f64| {
            serde_json::Number::from_f64(x)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null)
        };
        if scalar.im == 0.0 {
            number(scalar.re)
        } else {
            serde_json::Value::Array(vec![number(scalar.re), number(scalar.im)])
        }
    }

    fn decode(&self, value: &serde_json::Value) -> Option<Complex64> {
        match value {
            serde_json::Value::Array(parts) => match parts.as_slice() {
                [re, im] => Some(Complex64::new(re.as_f64()?, im.as_f64()?)),
                _ => None,
            },
            other => other.as_f64().map(Complex64::from_f64),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Fraction;

    fn c(re: f64, im: f64) -> Quantity<Complex64> {
        Quantity::unitless(Complex64::new(re, im))
    }

    fn meters(re: f64, im: f64) -> Quantity<Complex64> {
        Quantity::new(Complex64::new(re, im), Unit::base("m"))
    }

    #[test]
    fn test_arithmetic() {
        let domain = ComplexDomain::new();
        let mut diag = Vec::new();
        let product = domain.multiply(&c(1.0, 2.0), &c(3.0, -1.0), &mut diag).unwrap();
        assert_eq!(product, c(5.0, 5.0));
        let sum = domain.add(&meters(1.0, 1.0), &meters(2.0, 0.0), &mut diag).unwrap();
        assert_eq!(sum, meters(3.0, 1.0));
        assert_eq!(
            domain.subtract(&meters(1.0, 0.0), &c(1.0, 0.0), &mut diag),
            Err(EvalError::UnitMismatch)
        );
    }

    #[test]
    fn test_comparisons_use_real_part() {
        let domain = ComplexDomain::new();
        let mut diag = Vec::new();
        let gt = domain.greater(&c(2.0, -5.0), &c(1.0, 9.0), &mut diag).unwrap();
        assert_eq!(gt, c(1.0, 0.0));
        assert!(!domain.is_true(&c(0.0, 3.0)));
        let eq = domain.equals(&c(1.0, 1.0), &c(1.0, 2.0), &mut diag).unwrap();
        assert_eq!(eq, c(0.0, 0.0));
    }

    #[test]
    fn test_bitwise_uses_real_part() {
        let domain = ComplexDomain::new();
        let mut diag = Vec::new();
        let or = domain.bit_or(&c(4.9, 7.0), &c(1.0, 0.0), &mut diag).unwrap();
        assert_eq!(or, c(5.0, 0.0));
    }

    #[test]
    fn test_power() {
        let domain = ComplexDomain::new();
        let mut diag = Vec::new();
        let square = domain.power(&meters(-2.0, 0.0), &c(2.0, 0.0), &mut diag).unwrap();
        assert_eq!(square.scalar(), &Complex64::new(4.0, 0.0));
        assert_eq!(square.unit().exponent("m"), Fraction::integer(2));

        assert_eq!(
            domain.power(&meters(2.0, 0.0), &c(2.0, 1.0), &mut diag),
            Err(EvalError::ComplexUnitPower)
        );
        assert_eq!(
            domain.power(&meters(2.0, 0.0), &c(std::f64::consts::PI, 0.0), &mut diag),
            Err(EvalError::PowerTooComplex)
        );
        assert_eq!(
            diag,
            vec![
                "cannot raise units to a complex power".to_string(),
                "power too complex".to_string()
            ]
        );

        let root = domain.power(&c(-1.0, 0.0), &c(0.5, 0.0), &mut diag).unwrap();
        assert!(root.scalar().re.abs() < 1e-15);
        assert!((root.scalar().im - 1.0).abs() < 1e-15);
    }

    #[test]
    fn test_imaginary_unit_builtin() {
        let domain = ComplexDomain::new();
        assert_eq!(domain.builtin_unit("i"), Some(c(0.0, 1.0)));
        assert_eq!(domain.builtin_unit("j"), Some(c(0.0, 1.0)));
        assert_eq!(domain.builtin_unit("k"), None);
    }

    #[test]
    fn test_format() {
        let domain = ComplexDomain::new();
        assert_eq!(domain.format(&c(0.0, 0.0)), "0");
        assert_eq!(domain.format(&c(1.5, 0.0)), "1.5");
        assert_eq!(domain.format(&c(0.0, -2.0)), "-2i");
        assert_eq!(domain.format(&c(1.0, 2.0)), "1+2i");
        assert_eq!(domain.format(&c(1.0, -2.5)), "1-2.5i");
        assert_eq!(domain.format(&meters(1.0, 2.0)), "(1+2i) m");
        assert_eq!(domain.format(&meters(0.0, 2.0)), "2i m");
    }

    #[test]
    fn test_factor() {
        let domain = ComplexDomain::new();
        let q = meters(3.0, -40.0);
        assert_eq!(domain.factor(&q, &Complex64::new(0.5, 0.0)), 20.0);
    }

    #[test]
    fn test_encode_decode() {
        let domain = ComplexDomain::new();
        assert_eq!(domain.encode(&Complex64::new(2.0, 0.0)), serde_json::json!(2.0));
        assert_eq!(
            domain.encode(&Complex64::new(1.0, -1.0)),
            serde_json::json!([1.0, -1.0])
        );
        assert_eq!(
            domain.decode(&serde_json::json!([1.0, -1.0])),
            Some(Complex64::new(1.0, -1.0))
        );
        assert_eq!(domain.decode(&serde_json::json!(3)), Some(Complex64::new(3.0, 0.0)));
        assert_eq!(domain.decode(&serde_json::json!([1.0])), None);
    }
}
