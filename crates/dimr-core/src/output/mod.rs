//! Output-unit selection
//!
//! Results are computed in base units (`1500 m`). When display units are
//! registered for a result's dimension vector, [`resolve`] rewrites the
//! result into the candidate that reads best: a magnitude in `[1, 1000)` if
//! any candidate gives one, otherwise the one closest to that range.

use std::collections::BTreeMap;

use crate::domain::{Diagnostics, Domain, Outcome};
use crate::types::{Quantity, Unit};

/// Lower bound (inclusive) of the preferred magnitude range
const PREFERRED_MIN: f64 = 1.0;
/// Upper bound (exclusive) of the preferred magnitude range
const PREFERRED_MAX: f64 = 1000.0;

/// Key of one registered display unit
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OutputKey {
    /// Dimension vector results are computed in
    pub base: Unit,
    /// Unit the result is displayed in
    pub display: Unit,
}

/// Registered display units, each with the factor converting a base-unit
/// scalar into the display unit (e.g. `m → km` has scale `0.001`)
#[derive(Debug, Clone)]
pub struct OutputUnits<T> {
    entries: BTreeMap<OutputKey, T>,
}

impl<T> OutputUnits<T> {
    pub fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }

    /// Register a display unit; re-registering the same pair replaces its scale
    pub fn register(&mut self, base: Unit, shown: Unit, scale: T) {
        tracing::debug!(base = %base, shown = %shown, "registered output unit");
        self.entries.insert(
            OutputKey {
                base,
                display: shown,
            },
            scale,
        );
    }

    /// Candidates for a dimension vector, in key order
    pub fn candidates<'a, 'b>(
        &'a self,
        base: &'b Unit,
    ) -> impl Iterator<Item = (&'a Unit, &'a T)> + 'b
    where
        'a: 'b,
    {
        self.entries
            .iter()
            .filter(move |(key, _)| &key.base == base)
            .map(|(key, scale)| (&key.display, scale))
    }

}

impl<T> Default for OutputUnits<T> {
    fn default() -> Self {
        Self::new()
    }
}

fn in_range(factor: f64) -> bool {
    (PREFERRED_MIN..PREFERRED_MAX).contains(&factor)
}

/// Whether a candidate's factor beats the running best
fn is_better(candidate: f64, best: f64) -> bool {
    match (in_range(candidate), in_range(best)) {
        (true, true) => candidate < best,
        (true, false) => true,
        (false, true) => false,
        (false, false) if best >= PREFERRED_MAX => candidate < best,
        (false, false) => candidate > best,
    }
}

/// Rewrite `quantity` into its most readable registered display unit.
///
/// Unitless quantities and units without registered candidates are returned
/// unchanged.
pub fn resolve<D: Domain>(
    domain: &D,
    table: &OutputUnits<D::Scalar>,
    quantity: Quantity<D::Scalar>,
    diag: &mut dyn Diagnostics,
) -> Outcome<D::Scalar> {
    if quantity.is_unitless() {
        return Ok(quantity);
    }

    let mut best: Option<(&Unit, &D::Scalar, f64)> = None;
    for (shown, scale) in table.candidates(quantity.unit()) {
        let factor = domain.factor(&quantity, scale);
        tracing::trace!(shown = %shown, factor, "output unit candidate");
        match best {
            Some((_, _, best_factor)) if !is_better(factor, best_factor) => {}
            _ => best = Some((shown, scale, factor)),
        }
    }

    let Some((shown, scale, _)) = best else {
        return Ok(quantity);
    };

    let scaled = domain.multiply(
        &Quantity::unitless(quantity.scalar().clone()),
        &Quantity::unitless(scale.clone()),
        diag,
    )?;
    Ok(scaled.with_unit(shown.clone()))
}
