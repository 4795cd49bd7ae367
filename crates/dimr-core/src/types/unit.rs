//! Dimension vectors
//!
//! A [`Unit`] maps base-unit symbols (e.g. `m`, `s`) to exact exponents.
//! Entries with a zero exponent are never stored, so two units are
//! compatible exactly when they are structurally equal. The empty map is the
//! distinguished unitless value.

use std::collections::BTreeMap;
use std::fmt;

use super::Fraction;

/// An immutable dimension vector in canonical form
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Unit {
    exponents: BTreeMap<String, Fraction>,
}

impl Unit {
    /// The unitless dimension vector
    pub fn unitless() -> Self {
        Self::default()
    }

    /// A single base unit with exponent 1 (e.g. `m`)
    pub fn base(symbol: impl Into<String>) -> Self {
        Self::from_exponents([(symbol.into(), Fraction::ONE)])
    }

    /// Build a unit from `(symbol, exponent)` pairs.
    ///
    /// A repeated symbol keeps its last exponent; zero exponents are dropped.
    pub fn from_exponents<S, I>(entries: I) -> Self
    where
        S: Into<String>,
        I: IntoIterator<Item = (S, Fraction)>,
    {
        let mut exponents = BTreeMap::new();
        for (symbol, exponent) in entries {
            let symbol = symbol.into();
            if exponent.is_zero() {
                exponents.remove(&symbol);
            } else {
                exponents.insert(symbol, exponent);
            }
        }
        Unit { exponents }
    }

    pub fn is_unitless(&self) -> bool {
        self.exponents.is_empty()
    }

    /// Exponent of a base symbol (zero when absent)
    pub fn exponent(&self, symbol: &str) -> Fraction {
        self.exponents.get(symbol).copied().unwrap_or(Fraction::ZERO)
    }

    /// Iterate over `(symbol, exponent)` pairs in symbol order
    pub fn iter(&self) -> impl Iterator<Item = (&str, Fraction)> {
        self.exponents.iter().map(|(s, e)| (s.as_str(), *e))
    }

    /// Pointwise exponent addition; `None` when an exponent overflows
    pub fn multiply(&self, other: &Unit) -> Option<Unit> {
        let mut exponents = self.exponents.clone();
        for (symbol, exponent) in &other.exponents {
            accumulate(&mut exponents, symbol, *exponent)?;
        }
        Some(Unit { exponents })
    }

    /// Pointwise exponent subtraction; `None` when an exponent overflows
    pub fn divide(&self, other: &Unit) -> Option<Unit> {
        let mut exponents = self.exponents.clone();
        for (symbol, exponent) in &other.exponents {
            accumulate(&mut exponents, symbol, exponent.checked_neg()?)?;
        }
        Some(Unit { exponents })
    }

    /// Multiply every exponent by `power`; `None` when an exponent overflows
    pub fn power(&self, power: Fraction) -> Option<Unit> {
        if power.is_zero() {
            return Some(Unit::unitless());
        }
        let exponents = self
            .exponents
            .iter()
            .map(|(symbol, exponent)| Some((symbol.clone(), exponent.checked_mul(power)?)))
            .collect::<Option<_>>()?;
        Some(Unit { exponents })
    }

    pub fn invert(&self) -> Option<Unit> {
        self.power(Fraction::integer(-1))
    }
}

fn accumulate(
    exponents: &mut BTreeMap<String, Fraction>,
    symbol: &str,
    exponent: Fraction,
) -> Option<()> {
    let total = exponents
        .get(symbol)
        .copied()
        .unwrap_or(Fraction::ZERO)
        .checked_add(exponent)?;
    if total.is_zero() {
        exponents.remove(symbol);
    } else {
        exponents.insert(symbol.to_string(), total);
    }
    Some(())
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (symbol, exponent)) in self.exponents.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            if *exponent == Fraction::ONE {
                write!(f, "{symbol}")?;
            } else if exponent.is_integer() {
                write!(f, "{symbol}^{exponent}")?;
            } else {
                write!(f, "{symbol}^({exponent})")?;
            }
        }
        Ok(())
    }
}
