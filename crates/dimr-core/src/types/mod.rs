//! Value types for dimr calculations

mod fraction;
mod quantity;
pub mod unit;

pub use fraction::{Fraction, MAX_DENOMINATOR};
pub use quantity::Quantity;
pub use unit::Unit;
