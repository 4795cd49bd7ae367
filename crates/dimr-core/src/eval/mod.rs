//! Expression evaluation
//!
//! [`evaluate`] walks an [`Expr`] bottom-up; every node performs exactly one
//! [`Domain`] operation on its already-resolved children, and the first
//! failure stops the walk.

use std::collections::BTreeMap;

use crate::domain::{fail, Context, Diagnostics, Domain, Outcome, Scalar};
use crate::error::EvalError;
use crate::output::{self, OutputUnits};
use crate::parser::{BinaryOp, Expr, UnaryOp};
use crate::types::{Fraction, Quantity, Unit};

/// Variables, units, output units and collected diagnostics for one
/// calculation session
#[derive(Debug, Clone)]
pub struct Workspace<T> {
    variables: BTreeMap<String, Quantity<T>>,
    units: BTreeMap<String, Quantity<T>>,
    output_units: OutputUnits<T>,
    diagnostics: Vec<String>,
}

impl<T> Workspace<T> {
    /// An empty workspace without any units
    pub fn new() -> Self {
        Self {
            variables: BTreeMap::new(),
            units: BTreeMap::new(),
            output_units: OutputUnits::new(),
            diagnostics: Vec::new(),
        }
    }

    pub fn variable(&self, name: &str) -> Option<&Quantity<T>> {
        self.variables.get(name)
    }

    pub fn set_variable(&mut self, name: impl Into<String>, value: Quantity<T>) {
        self.variables.insert(name.into(), value);
    }

    /// Variables in name order
    pub fn variables(&self) -> impl Iterator<Item = (&str, &Quantity<T>)> {
        self.variables.iter().map(|(name, value)| (name.as_str(), value))
    }

    pub fn clear_variables(&mut self) {
        self.variables.clear();
    }

    /// Register `name` as an alias for `value`, e.g. `km` for `1000 m`
    pub fn register_unit(&mut self, name: impl Into<String>, value: Quantity<T>) {
        let name = name.into();
        tracing::debug!(unit = %name, base = %value.unit(), "registered unit");
        self.units.insert(name, value);
    }

    pub fn unit(&self, name: &str) -> Option<&Quantity<T>> {
        self.units.get(name)
    }

    pub fn output_units(&self) -> &OutputUnits<T> {
        &self.output_units
    }

    /// Messages posted by failed operations, oldest first
    pub fn diagnostics(&self) -> &[String] {
        &self.diagnostics
    }

    pub fn take_diagnostics(&mut self) -> Vec<String> {
        std::mem::take(&mut self.diagnostics)
    }

    /// Rewrite `quantity` into its most readable registered output unit
    pub fn resolve_output<D>(&mut self, domain: &D, quantity: Quantity<T>) -> Outcome<T>
    where
        D: Domain<Scalar = T>,
    {
        output::resolve(domain, &self.output_units, quantity, &mut self.diagnostics)
    }
}

/// `(name, exponent)` pairs of a derived unit's dimension vector
type Dimensions = &'static [(&'static str, i64)];

const BASE_UNITS: &[&str] = &["m", "kg", "s", "A", "K", "mol", "cd"];

const SCALED_UNITS: &[(&str, f64, Dimensions)] = &[
    ("km", 1e3, &[("m", 1)]),
    ("cm", 1e-2, &[("m", 1)]),
    ("mm", 1e-3, &[("m", 1)]),
    ("um", 1e-6, &[("m", 1)]),
    ("nm", 1e-9, &[("m", 1)]),
    ("g", 1e-3, &[("kg", 1)]),
    ("mg", 1e-6, &[("kg", 1)]),
    ("t", 1e3, &[("kg", 1)]),
    ("min", 60.0, &[("s", 1)]),
    ("h", 3600.0, &[("s", 1)]),
    ("day", 86400.0, &[("s", 1)]),
    ("Hz", 1.0, &[("s", -1)]),
    ("N", 1.0, &[("kg", 1), ("m", 1), ("s", -2)]),
    ("Pa", 1.0, &[("kg", 1), ("m", -1), ("s", -2)]),
    ("J", 1.0, &[("kg", 1), ("m", 2), ("s", -2)]),
    ("kJ", 1e3, &[("kg", 1), ("m", 2), ("s", -2)]),
    ("MJ", 1e6, &[("kg", 1), ("m", 2), ("s", -2)]),
    ("W", 1.0, &[("kg", 1), ("m", 2), ("s", -3)]),
    ("C", 1.0, &[("A", 1), ("s", 1)]),
    ("V", 1.0, &[("kg", 1), ("m", 2), ("s", -3), ("A", -1)]),
];

/// `(display unit, base-unit scalar → display scalar factor)` per dimension
const OUTPUT_UNITS: &[(Dimensions, &[(&str, f64)])] = &[
    (
        &[("m", 1)],
        &[
            ("nm", 1e9),
            ("um", 1e6),
            ("mm", 1e3),
            ("cm", 1e2),
            ("m", 1.0),
            ("km", 1e-3),
        ],
    ),
    (
        &[("kg", 1)],
        &[("mg", 1e6), ("g", 1e3), ("kg", 1.0), ("t", 1e-3)],
    ),
    (
        &[("s", 1)],
        &[
            ("s", 1.0),
            ("min", 1.0 / 60.0),
            ("h", 1.0 / 3600.0),
            ("day", 1.0 / 86400.0),
        ],
    ),
    (
        &[("kg", 1), ("m", 2), ("s", -2)],
        &[("J", 1.0), ("kJ", 1e-3), ("MJ", 1e-6)],
    ),
];

fn dimensions(pairs: Dimensions) -> Unit {
    Unit::from_exponents(
        pairs
            .iter()
            .map(|(symbol, exponent)| (symbol.to_string(), Fraction::integer(*exponent))),
    )
}

impl<T: Scalar> Workspace<T> {
    /// A workspace with the SI base units, common scaled and derived units,
    /// and output units for length, mass, time and energy
    pub fn standard() -> Self {
        let mut workspace = Self::new();
        for symbol in BASE_UNITS {
            workspace.register_unit(*symbol, Quantity::new(T::one(), Unit::base(*symbol)));
        }
        for (name, scale, dims) in SCALED_UNITS {
            workspace.register_unit(*name, Quantity::new(T::from_f64(*scale), dimensions(*dims)));
        }
        for (dims, displays) in OUTPUT_UNITS {
            let base = dimensions(*dims);
            for (display, scale) in *displays {
                workspace.output_units.register(
                    base.clone(),
                    Unit::base(*display),
                    T::from_f64(*scale),
                );
            }
        }
        workspace
    }
}

impl<T> Default for Workspace<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Diagnostics for Workspace<T> {
    fn post(&mut self, message: &str) {
        self.diagnostics.push(message.to_string());
    }
}

impl<T: Clone> Context<T> for Workspace<T> {
    fn variable(&self, name: &str) -> Option<Quantity<T>> {
        self.variables.get(name).cloned()
    }

    fn unit(&self, name: &str) -> Option<Quantity<T>> {
        self.units.get(name).cloned()
    }
}

/// Evaluate an expression through `domain`
pub fn evaluate<D, C>(expr: &Expr, domain: &D, ctx: &mut C) -> Outcome<D::Scalar>
where
    D: Domain,
    C: Context<D::Scalar>,
{
    match expr {
        Expr::Number(text) => domain.parse_scalar(text, ctx),

        Expr::Name(name) => {
            if ctx.variable(name).is_some() {
                domain.variable(name, ctx)
            } else {
                domain.unit(name, ctx)
            }
        }

        Expr::Differential(name) => domain.differential(name, ctx),

        Expr::UnaryOp { op, operand } => {
            let value = evaluate(operand, domain, ctx)?;
            match op {
                UnaryOp::Plus => domain.plus(&value, ctx),
                UnaryOp::Minus => domain.minus(&value, ctx),
                UnaryOp::Invert => domain.invert(&value, ctx),
                UnaryOp::Factorial => domain.factorial(&value, ctx),
            }
        }

        Expr::BinaryOp { op, left, right } => {
            let left = evaluate(left, domain, ctx)?;
            let right = evaluate(right, domain, ctx)?;
            eval_binary_op(*op, &left, &right, domain, ctx)
        }

        Expr::FunctionCall { name, args } => eval_function(name, args, domain, ctx),
    }
}

fn eval_binary_op<D: Domain>(
    op: BinaryOp,
    a: &Quantity<D::Scalar>,
    b: &Quantity<D::Scalar>,
    domain: &D,
    diag: &mut dyn Diagnostics,
) -> Outcome<D::Scalar> {
    match op {
        BinaryOp::Add => domain.add(a, b, diag),
        BinaryOp::Subtract => domain.subtract(a, b, diag),
        BinaryOp::Multiply => domain.multiply(a, b, diag),
        BinaryOp::Divide => domain.divide(a, b, diag),
        BinaryOp::Modulo => domain.modulo(a, b, diag),
        BinaryOp::IntegerDivide => domain.integer_divide(a, b, diag),
        BinaryOp::Power => domain.power(a, b, diag),
        BinaryOp::BitOr => domain.bit_or(a, b, diag),
        BinaryOp::BitAnd => domain.bit_and(a, b, diag),
        BinaryOp::ShiftLeft => domain.shift_left(a, b, diag),
        BinaryOp::ShiftRight => domain.shift_right(a, b, diag),
        BinaryOp::Greater => domain.greater(a, b, diag),
        BinaryOp::GreaterEqual => domain.greater_equal(a, b, diag),
        BinaryOp::Less => domain.less(a, b, diag),
        BinaryOp::LessEqual => domain.less_equal(a, b, diag),
        BinaryOp::Equal => domain.equals(a, b, diag),
        BinaryOp::NotEqual => domain.not_equals(a, b, diag),
        BinaryOp::Or => domain.logical_or(a, b, diag),
        BinaryOp::And => domain.logical_and(a, b, diag),
    }
}

fn eval_function<D, C>(name: &str, args: &[Expr], domain: &D, ctx: &mut C) -> Outcome<D::Scalar>
where
    D: Domain,
    C: Context<D::Scalar>,
{
    if !matches!(name, "sqrt" | "unitless") {
        return fail(ctx, EvalError::UnknownFunction(name.to_string()));
    }
    let [arg] = args else {
        return fail(
            ctx,
            EvalError::Arity {
                name: name.to_string(),
                expected: 1,
                got: args.len(),
            },
        );
    };

    let value = evaluate(arg, domain, ctx)?;
    match name {
        "sqrt" => {
            let half = Quantity::unitless(<D::Scalar as Scalar>::from_f64(0.5));
            domain.power(&value, &half, ctx)
        }
        _ => domain.remove_units(&value, ctx),
    }
}
