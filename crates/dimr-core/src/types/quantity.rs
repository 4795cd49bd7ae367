//! Scalar values paired with a dimension vector

use super::Unit;

/// An immutable scalar of some numeric representation together with its unit
#[derive(Debug, Clone, PartialEq)]
pub struct Quantity<T> {
    scalar: T,
    unit: Unit,
}

impl<T> Quantity<T> {
    pub fn new(scalar: T, unit: Unit) -> Self {
        Quantity { scalar, unit }
    }

    /// A quantity without units
    pub fn unitless(scalar: T) -> Self {
        Quantity {
            scalar,
            unit: Unit::unitless(),
        }
    }

    pub fn scalar(&self) -> &T {
        &self.scalar
    }

    pub fn unit(&self) -> &Unit {
        &self.unit
    }

    pub fn is_unitless(&self) -> bool {
        self.unit.is_unitless()
    }

    pub fn into_parts(self) -> (T, Unit) {
        (self.scalar, self.unit)
    }

    /// Same unit, different scalar
    pub fn with_scalar<U>(&self, scalar: U) -> Quantity<U> {
        Quantity::new(scalar, self.unit.clone())
    }

    /// Same scalar, different unit
    pub fn with_unit(self, unit: Unit) -> Quantity<T> {
        Quantity::new(self.scalar, unit)
    }
}
