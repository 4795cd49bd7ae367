//! dimr-core: unit-aware calculation engine
//!
//! Expressions evaluate to [`Quantity`] values, a scalar paired with a
//! dimension vector. The numeric representation is pluggable through the
//! [`Domain`] trait: [`RealDomain`] (`f64`), [`ComplexDomain`]
//! (`Complex64`) and [`DifferentialDomain`], which wraps either of them and
//! carries forward-mode derivatives alongside every value.
//!
//! # Example
//!
//! ```
//! use dimr_core::{Calculator, RealDomain};
//!
//! let mut calc = Calculator::new(RealDomain::new());
//!
//! // Units combine and convert
//! let result = calc.eval("1200 m + 300 m").unwrap().unwrap();
//! assert_eq!(calc.display(&result), "1.5 km");
//!
//! // Variables
//! calc.eval("speed = 10 m / 2 s").unwrap();
//! let result = calc.eval("speed * 3 s").unwrap().unwrap();
//! assert_eq!(calc.format_raw(&result), "15 m");
//!
//! // Incompatible units fail with a diagnostic
//! assert!(calc.eval("1 m + 1 s").is_err());
//! assert_eq!(calc.diagnostics(), ["units do not match"]);
//! ```

pub mod domain;
pub mod error;
pub mod eval;
pub mod output;
pub mod parser;
pub mod types;

pub use domain::{
    Auxiliary, ComplexDomain, Context, Diagnostics, Differential, DifferentialDomain, Domain,
    Outcome, RealDomain, Scalar,
};
pub use error::EvalError;
pub use eval::{evaluate, Workspace};
pub use output::{OutputKey, OutputUnits};
pub use parser::{parse_line, Ast, BinaryOp, Expr, UnaryOp};
pub use types::{Fraction, Quantity, Unit};

/// Main engine: a domain plus the workspace it evaluates against
pub struct Calculator<D: Domain> {
    domain: D,
    workspace: Workspace<D::Scalar>,
}

impl<D: Domain> Calculator<D> {
    /// Create a calculator over the standard workspace
    pub fn new(domain: D) -> Self {
        Self {
            domain,
            workspace: Workspace::standard(),
        }
    }

    /// Evaluate a single line.
    ///
    /// Returns `Ok(None)` for an empty line. An assignment stores the value
    /// and also returns it. Failures are recorded in [`diagnostics`](Self::diagnostics).
    pub fn eval(&mut self, input: &str) -> Result<Option<Quantity<D::Scalar>>, EvalError> {
        let ast = match parse_line(input) {
            Ok(ast) => ast,
            Err(err) => return Err(domain::report(&mut self.workspace, err)),
        };

        match ast {
            Ast::Empty => Ok(None),
            Ast::Assignment { name, expr } => {
                let value = evaluate(&expr, &self.domain, &mut self.workspace)?;
                tracing::debug!(variable = %name, "assigned");
                self.workspace.set_variable(name, value.clone());
                Ok(Some(value))
            }
            Ast::Expression(expr) => evaluate(&expr, &self.domain, &mut self.workspace).map(Some),
        }
    }

    /// Rewrite a result into its most readable registered output unit,
    /// leaving it unchanged when resolution fails
    pub fn resolve_output(&mut self, quantity: &Quantity<D::Scalar>) -> Quantity<D::Scalar> {
        self.workspace
            .resolve_output(&self.domain, quantity.clone())
            .unwrap_or_else(|_| quantity.clone())
    }

    /// Render a result in its most readable registered output unit
    pub fn display(&mut self, quantity: &Quantity<D::Scalar>) -> String {
        let resolved = self.resolve_output(quantity);
        self.domain.format(&resolved)
    }

    /// Render a result in the units it was computed in
    pub fn format_raw(&self, quantity: &Quantity<D::Scalar>) -> String {
        self.domain.format(quantity)
    }

    pub fn variable(&self, name: &str) -> Option<&Quantity<D::Scalar>> {
        self.workspace.variable(name)
    }

    pub fn set_variable(&mut self, name: impl Into<String>, value: Quantity<D::Scalar>) {
        self.workspace.set_variable(name, value);
    }

    /// Variables in name order
    pub fn variables(&self) -> impl Iterator<Item = (&str, &Quantity<D::Scalar>)> {
        self.workspace.variables()
    }

    pub fn diagnostics(&self) -> &[String] {
        self.workspace.diagnostics()
    }

    pub fn take_diagnostics(&mut self) -> Vec<String> {
        self.workspace.take_diagnostics()
    }

    /// Clear variables and diagnostics; registered units are kept
    pub fn clear(&mut self) {
        self.workspace.clear_variables();
        self.workspace.take_diagnostics();
    }

    pub fn domain(&self) -> &D {
        &self.domain
    }
}

impl<D: Domain + Default> Default for Calculator<D> {
    fn default() -> Self {
        Self::new(D::default())
    }
}
