//! Evaluation errors
//!
//! Domain operations never panic on bad input. A failing operation posts the
//! error's message to the caller's [`Diagnostics`](crate::domain::Diagnostics)
//! sink and returns it as `Err`, so the first failure short-circuits the
//! whole evaluation.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EvalError {
    /// Operands' units differ where identical units are required
    #[error("units do not match")]
    UnitMismatch,

    /// An operand that must be unitless carries a unit
    #[error("{operation} requires unitless operands")]
    UnsupportedUnit { operation: &'static str },

    /// A unit-bearing base raised to a power that is not a bounded fraction
    #[error("power too complex")]
    PowerTooComplex,

    /// A unit-bearing base raised to a power with an imaginary part
    #[error("cannot raise units to a complex power")]
    ComplexUnitPower,

    #[error("unknown variable: {0}")]
    UnknownVariable(String),

    #[error("unknown unit: {0}")]
    UnknownUnit(String),

    #[error("unknown function: {0}")]
    UnknownFunction(String),

    /// `d(name)` used outside the differential domain
    #[error("differentials are not supported here: d({0})")]
    UnknownDifferential(String),

    /// Scalar text that is not a valid literal for the domain
    #[error("cannot parse number: {0}")]
    Parse(String),

    /// A non-differentiable operation applied to a value with derivatives
    #[error("{operation} is not differentiable")]
    NotDifferentiable { operation: &'static str },

    /// Builtin function called with the wrong number of arguments
    #[error("{name} expects {expected} argument(s), got {got}")]
    Arity {
        name: String,
        expected: usize,
        got: usize,
    },

    /// Input text the parser could not understand
    #[error("syntax error: {0}")]
    Syntax(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages() {
        assert_eq!(EvalError::UnitMismatch.to_string(), "units do not match");
        assert_eq!(EvalError::PowerTooComplex.to_string(), "power too complex");
        assert_eq!(
            EvalError::ComplexUnitPower.to_string(),
            "cannot raise units to a complex power"
        );
        assert_eq!(
            EvalError::UnsupportedUnit { operation: "bitwise or" }.to_string(),
            "bitwise or requires unitless operands"
        );
    }
}
