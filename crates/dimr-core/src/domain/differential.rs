//! Forward-mode automatic differentiation
//!
//! [`DifferentialDomain`] wraps any other [`Domain`] and carries, next to
//! each value, a sparse map of partial derivatives keyed by variable name.
//! Derivatives share the quantity's unit, so they are plain scalars of the
//! wrapped domain.
//!
//! Every rule is assembled from the wrapped domain's own operations. The
//! value goes through the wrapped domain with its real unit (so unit checks
//! happen exactly once); derivative terms are combined as unitless scalars.
//!
//! ```text
//! d(f + g)  = df + dg
//! d(f * g)  = df*g + dg*f
//! d(f / g)  = (g*df - f*dg) / g^2
//! d(f ^ g)  = g*f^(g-1)*df + f^g*ln(f)*dg
//! ```
//!
//! Comparisons and logical operators drop the derivatives. Operators with
//! no derivative (factorial, invert, modulo, integer division, bitwise and
//! shifts) refuse values that carry any.

use std::collections::BTreeMap;
use std::fmt::Write as _;

use super::{fail, Diagnostics, Domain, Outcome, Scalar};
use crate::error::EvalError;
use crate::types::Quantity;

/// Operations the differential domain needs but does not define itself
pub struct Auxiliary<T> {
    ln: Box<dyn Fn(&T) -> T + Send + Sync>,
}

impl<T> Auxiliary<T> {
    pub fn new(ln: impl Fn(&T) -> T + Send + Sync + 'static) -> Self {
        Auxiliary { ln: Box::new(ln) }
    }

    /// Natural logarithm in the wrapped domain
    pub fn ln(&self, value: &T) -> T {
        (self.ln)(value)
    }
}

/// A value with its partial derivatives
///
/// Equality compares the value and the derivative maps by content; a
/// missing key is not the same as an explicit zero.
#[derive(Debug, Clone, PartialEq)]
pub struct Differential<T> {
    value: T,
    derivatives: BTreeMap<String, T>,
}

impl<T> Differential<T> {
    pub fn new(value: T, derivatives: BTreeMap<String, T>) -> Self {
        Differential { value, derivatives }
    }

    /// A value without derivatives
    pub fn constant(value: T) -> Self {
        Differential {
            value,
            derivatives: BTreeMap::new(),
        }
    }

    pub fn value(&self) -> &T {
        &self.value
    }

    pub fn derivatives(&self) -> &BTreeMap<String, T> {
        &self.derivatives
    }

    pub fn derivative(&self, name: &str) -> Option<&T> {
        self.derivatives.get(name)
    }

    pub fn has_derivatives(&self) -> bool {
        !self.derivatives.is_empty()
    }
}

impl<T: Scalar> Scalar for Differential<T> {
    fn zero() -> Self {
        Differential::constant(T::zero())
    }

    fn one() -> Self {
        Differential::constant(T::one())
    }

    fn from_f64(value: f64) -> Self {
        Differential::constant(T::from_f64(value))
    }
}

type DiffQuantity<D> = Quantity<Differential<<D as Domain>::Scalar>>;

pub struct DifferentialDomain<D: Domain> {
    base: D,
    auxiliary: Auxiliary<D::Scalar>,
}

fn plain<S: Clone>(scalar: &S) -> Quantity<S> {
    Quantity::unitless(scalar.clone())
}

fn lift<S>(quantity: Quantity<S>) -> Quantity<Differential<S>> {
    let (scalar, unit) = quantity.into_parts();
    Quantity::new(Differential::constant(scalar), unit)
}

fn value_of<S: Clone>(quantity: &Quantity<Differential<S>>) -> Quantity<S> {
    quantity.with_scalar(quantity.scalar().value.clone())
}

fn assemble<S>(value: Quantity<S>, derivatives: BTreeMap<String, S>) -> Quantity<Differential<S>> {
    let (scalar, unit) = value.into_parts();
    Quantity::new(Differential::new(scalar, derivatives), unit)
}

/// True when a rendered scalar has a sign past its first character
fn has_inner_sign(text: &str) -> bool {
    text.chars().skip(1).any(|c| c == '+' || c == '-')
}

impl<D: Domain> DifferentialDomain<D> {
    pub fn new(base: D, auxiliary: Auxiliary<D::Scalar>) -> Self {
        DifferentialDomain { base, auxiliary }
    }

    /// Lift a base quantity into an independent variable: `d(name)/d(name) = 1`
    pub fn seed(&self, name: &str, quantity: Quantity<D::Scalar>) -> DiffQuantity<D> {
        let (value, unit) = quantity.into_parts();
        let derivatives = BTreeMap::from([(name.to_string(), <D::Scalar as Scalar>::one())]);
        Quantity::new(Differential::new(value, derivatives), unit)
    }

    fn add_scalar(
        &self,
        a: &D::Scalar,
        b: &D::Scalar,
        diag: &mut dyn Diagnostics,
    ) -> Result<D::Scalar, EvalError> {
        Ok(self.base.add(&plain(a), &plain(b), diag)?.into_parts().0)
    }

    fn subtract_scalar(
        &self,
        a: &D::Scalar,
        b: &D::Scalar,
        diag: &mut dyn Diagnostics,
    ) -> Result<D::Scalar, EvalError> {
        Ok(self.base.subtract(&plain(a), &plain(b), diag)?.into_parts().0)
    }

    fn multiply_scalar(
        &self,
        a: &D::Scalar,
        b: &D::Scalar,
        diag: &mut dyn Diagnostics,
    ) -> Result<D::Scalar, EvalError> {
        Ok(self.base.multiply(&plain(a), &plain(b), diag)?.into_parts().0)
    }

    fn divide_scalar(
        &self,
        a: &D::Scalar,
        b: &D::Scalar,
        diag: &mut dyn Diagnostics,
    ) -> Result<D::Scalar, EvalError> {
        Ok(self.base.divide(&plain(a), &plain(b), diag)?.into_parts().0)
    }

    fn power_scalar(
        &self,
        a: &D::Scalar,
        b: &D::Scalar,
        diag: &mut dyn Diagnostics,
    ) -> Result<D::Scalar, EvalError> {
        Ok(self.base.power(&plain(a), &plain(b), diag)?.into_parts().0)
    }

    fn negate_scalar(
        &self,
        a: &D::Scalar,
        diag: &mut dyn Diagnostics,
    ) -> Result<D::Scalar, EvalError> {
        Ok(self.base.minus(&plain(a), diag)?.into_parts().0)
    }

    /// Add `term` into `derivatives[name]`
    fn accumulate(
        &self,
        derivatives: &mut BTreeMap<String, D::Scalar>,
        name: &str,
        term: D::Scalar,
        diag: &mut dyn Diagnostics,
    ) -> Result<(), EvalError> {
        let next = match derivatives.get(name) {
            Some(existing) => self.add_scalar(existing, &term, diag)?,
            None => term,
        };
        derivatives.insert(name.to_string(), next);
        Ok(())
    }

    /// Delegate an operator that has no derivative
    fn constant_unary<F>(
        &self,
        operation: &'static str,
        a: &DiffQuantity<D>,
        diag: &mut dyn Diagnostics,
        op: F,
    ) -> Outcome<Differential<D::Scalar>>
    where
        F: FnOnce(&D, &Quantity<D::Scalar>, &mut dyn Diagnostics) -> Outcome<D::Scalar>,
    {
        if a.scalar().has_derivatives() {
            return fail(diag, EvalError::NotDifferentiable { operation });
        }
        Ok(lift(op(&self.base, &value_of(a), diag)?))
    }

    fn constant_binary<F>(
        &self,
        operation: &'static str,
        a: &DiffQuantity<D>,
        b: &DiffQuantity<D>,
        diag: &mut dyn Diagnostics,
        op: F,
    ) -> Outcome<Differential<D::Scalar>>
    where
        F: FnOnce(
            &D,
            &Quantity<D::Scalar>,
            &Quantity<D::Scalar>,
            &mut dyn Diagnostics,
        ) -> Outcome<D::Scalar>,
    {
        if a.scalar().has_derivatives() || b.scalar().has_derivatives() {
            return fail(diag, EvalError::NotDifferentiable { operation });
        }
        Ok(lift(op(&self.base, &value_of(a), &value_of(b), diag)?))
    }

    /// Delegate on values only; the result carries no derivatives
    fn values_only<F>(
        &self,
        a: &DiffQuantity<D>,
        b: &DiffQuantity<D>,
        diag: &mut dyn Diagnostics,
        op: F,
    ) -> Outcome<Differential<D::Scalar>>
    where
        F: FnOnce(
            &D,
            &Quantity<D::Scalar>,
            &Quantity<D::Scalar>,
            &mut dyn Diagnostics,
        ) -> Outcome<D::Scalar>,
    {
        Ok(lift(op(&self.base, &value_of(a), &value_of(b), diag)?))
    }

    /// Shared body of add and subtract
    fn sum(
        &self,
        a: &DiffQuantity<D>,
        b: &DiffQuantity<D>,
        diag: &mut dyn Diagnostics,
        negate_right: bool,
    ) -> Outcome<Differential<D::Scalar>> {
        let value = if negate_right {
            self.base.subtract(&value_of(a), &value_of(b), diag)?
        } else {
            self.base.add(&value_of(a), &value_of(b), diag)?
        };

        let mut derivatives = a.scalar().derivatives.clone();
        for (name, db) in &b.scalar().derivatives {
            let next = match (derivatives.get(name), negate_right) {
                (Some(da), false) => self.add_scalar(da, db, diag)?,
                (Some(da), true) => self.subtract_scalar(da, db, diag)?,
                (None, false) => db.clone(),
                (None, true) => self.negate_scalar(db, diag)?,
            };
            derivatives.insert(name.clone(), next);
        }
        Ok(assemble(value, derivatives))
    }
}

impl<D: Domain> Domain for DifferentialDomain<D> {
    type Scalar = Differential<D::Scalar>;

    fn invalid(&self) -> DiffQuantity<D> {
        lift(self.base.invalid())
    }

    fn parse_scalar(&self, text: &str, diag: &mut dyn Diagnostics) -> Outcome<Self::Scalar> {
        Ok(lift(self.base.parse_scalar(text, diag)?))
    }

    fn builtin_unit(&self, name: &str) -> Option<DiffQuantity<D>> {
        self.base.builtin_unit(name).map(lift)
    }

    fn differential(&self, name: &str, _diag: &mut dyn Diagnostics) -> Outcome<Self::Scalar> {
        Ok(self.seed(name, Quantity::unitless(<D::Scalar as Scalar>::zero())))
    }

    fn plus(&self, a: &DiffQuantity<D>, _diag: &mut dyn Diagnostics) -> Outcome<Self::Scalar> {
        Ok(a.clone())
    }

    fn minus(&self, a: &DiffQuantity<D>, diag: &mut dyn Diagnostics) -> Outcome<Self::Scalar> {
        let value = self.base.minus(&value_of(a), diag)?;
        let mut derivatives = BTreeMap::new();
        for (name, da) in &a.scalar().derivatives {
            derivatives.insert(name.clone(), self.negate_scalar(da, diag)?);
        }
        Ok(assemble(value, derivatives))
    }

    fn invert(&self, a: &DiffQuantity<D>, diag: &mut dyn Diagnostics) -> Outcome<Self::Scalar> {
        self.constant_unary("invert", a, diag, |base, x, diag| base.invert(x, diag))
    }

    fn remove_units(
        &self,
        a: &DiffQuantity<D>,
        diag: &mut dyn Diagnostics,
    ) -> Outcome<Self::Scalar> {
        let value = self.base.remove_units(&value_of(a), diag)?;
        Ok(assemble(value, a.scalar().derivatives.clone()))
    }

    fn factorial(&self, a: &DiffQuantity<D>, diag: &mut dyn Diagnostics) -> Outcome<Self::Scalar> {
        self.constant_unary("factorial", a, diag, |base, x, diag| base.factorial(x, diag))
    }

    fn add(
        &self,
        a: &DiffQuantity<D>,
        b: &DiffQuantity<D>,
        diag: &mut dyn Diagnostics,
    ) -> Outcome<Self::Scalar> {
        self.sum(a, b, diag, false)
    }

    fn subtract(
        &self,
        a: &DiffQuantity<D>,
        b: &DiffQuantity<D>,
        diag: &mut dyn Diagnostics,
    ) -> Outcome<Self::Scalar> {
        self.sum(a, b, diag, true)
    }

    fn multiply(
        &self,
        a: &DiffQuantity<D>,
        b: &DiffQuantity<D>,
        diag: &mut dyn Diagnostics,
    ) -> Outcome<Self::Scalar> {
        let value = self.base.multiply(&value_of(a), &value_of(b), diag)?;
        let (f, g) = (a.scalar(), b.scalar());

        let mut derivatives = BTreeMap::new();
        for (name, df) in &f.derivatives {
            derivatives.insert(name.clone(), self.multiply_scalar(df, &g.value, diag)?);
        }
        for (name, dg) in &g.derivatives {
            let term = self.multiply_scalar(dg, &f.value, diag)?;
            self.accumulate(&mut derivatives, name, term, diag)?;
        }
        Ok(assemble(value, derivatives))
    }

    fn divide(
        &self,
        a: &DiffQuantity<D>,
        b: &DiffQuantity<D>,
        diag: &mut dyn Diagnostics,
    ) -> Outcome<Self::Scalar> {
        let value = self.base.divide(&value_of(a), &value_of(b), diag)?;
        let (f, g) = (a.scalar(), b.scalar());

        // Numerators g*df - f*dg, per key
        let mut numerators = BTreeMap::new();
        for (name, df) in &f.derivatives {
            numerators.insert(name.clone(), self.multiply_scalar(&g.value, df, diag)?);
        }
        for (name, dg) in &g.derivatives {
            let term = self.multiply_scalar(&f.value, dg, diag)?;
            let next = match numerators.get(name) {
                Some(existing) => self.subtract_scalar(existing, &term, diag)?,
                None => self.negate_scalar(&term, diag)?,
            };
            numerators.insert(name.clone(), next);
        }

        let g_squared = self.multiply_scalar(&g.value, &g.value, diag)?;
        let mut derivatives = BTreeMap::new();
        for (name, numerator) in numerators {
            let derivative = self.divide_scalar(&numerator, &g_squared, diag)?;
            derivatives.insert(name, derivative);
        }
        Ok(assemble(value, derivatives))
    }

    fn modulo(
        &self,
        a: &DiffQuantity<D>,
        b: &DiffQuantity<D>,
        diag: &mut dyn Diagnostics,
    ) -> Outcome<Self::Scalar> {
        self.constant_binary("modulo", a, b, diag, |base, x, y, diag| {
            base.modulo(x, y, diag)
        })
    }

    fn integer_divide(
        &self,
        a: &DiffQuantity<D>,
        b: &DiffQuantity<D>,
        diag: &mut dyn Diagnostics,
    ) -> Outcome<Self::Scalar> {
        self.constant_binary("integer division", a, b, diag, |base, x, y, diag| {
            base.integer_divide(x, y, diag)
        })
    }

    fn power(
        &self,
        a: &DiffQuantity<D>,
        b: &DiffQuantity<D>,
        diag: &mut dyn Diagnostics,
    ) -> Outcome<Self::Scalar> {
        let value = self.base.power(&value_of(a), &value_of(b), diag)?;
        let (f, g) = (a.scalar(), b.scalar());
        let mut derivatives = BTreeMap::new();

        if f.has_derivatives() {
            // g * f^(g-1)
            let g_minus_one = self.subtract_scalar(&g.value, &<D::Scalar as Scalar>::one(), diag)?;
            let f_power = self.power_scalar(&f.value, &g_minus_one, diag)?;
            let coefficient = self.multiply_scalar(&g.value, &f_power, diag)?;
            for (name, df) in &f.derivatives {
                derivatives.insert(name.clone(), self.multiply_scalar(&coefficient, df, diag)?);
            }
        }

        if g.has_derivatives() {
            // f^g * ln(f)
            let ln_f = self.auxiliary.ln(&f.value);
            let coefficient = self.multiply_scalar(value.scalar(), &ln_f, diag)?;
            for (name, dg) in &g.derivatives {
                let term = self.multiply_scalar(&coefficient, dg, diag)?;
                self.accumulate(&mut derivatives, name, term, diag)?;
            }
        }
        Ok(assemble(value, derivatives))
    }

    fn bit_or(
        &self,
        a: &DiffQuantity<D>,
        b: &DiffQuantity<D>,
        diag: &mut dyn Diagnostics,
    ) -> Outcome<Self::Scalar> {
        self.constant_binary("bitwise or", a, b, diag, |base, x, y, diag| {
            base.bit_or(x, y, diag)
        })
    }

    fn bit_and(
        &self,
        a: &DiffQuantity<D>,
        b: &DiffQuantity<D>,
        diag: &mut dyn Diagnostics,
    ) -> Outcome<Self::Scalar> {
        self.constant_binary("bitwise and", a, b, diag, |base, x, y, diag| {
            base.bit_and(x, y, diag)
        })
    }

    fn shift_left(
        &self,
        a: &DiffQuantity<D>,
        b: &DiffQuantity<D>,
        diag: &mut dyn Diagnostics,
    ) -> Outcome<Self::Scalar> {
        self.constant_binary("shift", a, b, diag, |base, x, y, diag| {
            base.shift_left(x, y, diag)
        })
    }

    fn shift_right(
        &self,
        a: &DiffQuantity<D>,
        b: &DiffQuantity<D>,
        diag: &mut dyn Diagnostics,
    ) -> Outcome<Self::Scalar> {
        self.constant_binary("shift", a, b, diag, |base, x, y, diag| {
            base.shift_right(x, y, diag)
        })
    }

    fn greater(
        &self,
        a: &DiffQuantity<D>,
        b: &DiffQuantity<D>,
        diag: &mut dyn Diagnostics,
    ) -> Outcome<Self::Scalar> {
        self.values_only(a, b, diag, |base, x, y, diag| base.greater(x, y, diag))
    }

    fn greater_equal(
        &self,
        a: &DiffQuantity<D>,
        b: &DiffQuantity<D>,
        diag: &mut dyn Diagnostics,
    ) -> Outcome<Self::Scalar> {
        self.values_only(a, b, diag, |base, x, y, diag| {
            base.greater_equal(x, y, diag)
        })
    }

    fn less(
        &self,
        a: &DiffQuantity<D>,
        b: &DiffQuantity<D>,
        diag: &mut dyn Diagnostics,
    ) -> Outcome<Self::Scalar> {
        self.values_only(a, b, diag, |base, x, y, diag| base.less(x, y, diag))
    }

    fn less_equal(
        &self,
        a: &DiffQuantity<D>,
        b: &DiffQuantity<D>,
        diag: &mut dyn Diagnostics,
    ) -> Outcome<Self::Scalar> {
        self.values_only(a, b, diag, |base, x, y, diag| base.less_equal(x, y, diag))
    }

    fn equals(
        &self,
        a: &DiffQuantity<D>,
        b: &DiffQuantity<D>,
        diag: &mut dyn Diagnostics,
    ) -> Outcome<Self::Scalar> {
        self.values_only(a, b, diag, |base, x, y, diag| base.equals(x, y, diag))
    }

    fn not_equals(
        &self,
        a: &DiffQuantity<D>,
        b: &DiffQuantity<D>,
        diag: &mut dyn Diagnostics,
    ) -> Outcome<Self::Scalar> {
        self.values_only(a, b, diag, |base, x, y, diag| base.not_equals(x, y, diag))
    }

    fn logical_or(
        &self,
        a: &DiffQuantity<D>,
        b: &DiffQuantity<D>,
        diag: &mut dyn Diagnostics,
    ) -> Outcome<Self::Scalar> {
        self.values_only(a, b, diag, |base, x, y, diag| base.logical_or(x, y, diag))
    }

    fn logical_and(
        &self,
        a: &DiffQuantity<D>,
        b: &DiffQuantity<D>,
        diag: &mut dyn Diagnostics,
    ) -> Outcome<Self::Scalar> {
        self.values_only(a, b, diag, |base, x, y, diag| base.logical_and(x, y, diag))
    }

    fn is_true(&self, a: &DiffQuantity<D>) -> bool {
        self.base.is_true(&value_of(a))
    }

    fn factor(&self, quantity: &DiffQuantity<D>, scale: &Self::Scalar) -> f64 {
        self.base.factor(&value_of(quantity), &scale.value)
    }

    fn format(&self, quantity: &DiffQuantity<D>) -> String {
        if !quantity.scalar().has_derivatives() {
            return self.base.format(&value_of(quantity));
        }
        let scalar = self.format_scalar(quantity.scalar());
        if quantity.is_unitless() {
            scalar
        } else {
            format!("({scalar}) {}", quantity.unit())
        }
    }

    fn format_scalar(&self, scalar: &Self::Scalar) -> String {
        let mut text = self.base.format_scalar(&scalar.value);
        for (name, derivative) in &scalar.derivatives {
            let rendered = self.base.format_scalar(derivative);
            if has_inner_sign(&rendered) {
                let _ = write!(text, " + ({rendered}) d({name})");
            } else {
                let _ = write!(text, " + {rendered} d({name})");
            }
        }
        text
    }

    fn encode(&self, scalar: &Self::Scalar) -> serde_json::Value {
        let derivatives: serde_json::Map<String, serde_json::Value> = scalar
            .derivatives
            .iter()
            .map(|(name, d)| (name.clone(), self.base.encode(d)))
            .collect();
        serde_json::json!({
            "value": self.base.encode(&scalar.value),
            "derivatives": derivatives,
        })
    }

    fn decode(&self, value: &serde_json::Value) -> Option<Self::Scalar> {
        let object = value.as_object()?;
        let scalar = self.base.decode(object.get("value")?)?;
        let mut derivatives = BTreeMap::new();
        if let Some(encoded) = object.get("derivatives") {
            for (name, d) in encoded.as_object()? {
                derivatives.insert(name.clone(), self.base.decode(d)?);
            }
        }
        Some(Differential::new(scalar, derivatives))
    }
}
