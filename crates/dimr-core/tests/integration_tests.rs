use dimr_core::{
    Calculator, ComplexDomain, Domain, EvalError, Fraction, Quantity, RealDomain, Unit,
};
use num_complex::Complex64;
use pretty_assertions::assert_eq;

fn value<D: Domain>(calc: &mut Calculator<D>, input: &str) -> Quantity<D::Scalar> {
    calc.eval(input)
        .unwrap_or_else(|e| panic!("{input}: {e}"))
        .unwrap_or_else(|| panic!("{input}: no value"))
}

fn display<D: Domain>(calc: &mut Calculator<D>, input: &str) -> String {
    let q = value(calc, input);
    calc.display(&q)
}

#[test]
fn test_real_addition() {
    let mut calc = Calculator::new(RealDomain::new());
    assert_eq!(
        value(&mut calc, "1 m + 2 m"),
        Quantity::new(3.0, Unit::base("m"))
    );
    assert!(calc.diagnostics().is_empty());
}

#[test]
fn test_real_addition_unit_mismatch() {
    let mut calc = Calculator::new(RealDomain::new());
    assert_eq!(calc.eval("1 m + 1 s"), Err(EvalError::UnitMismatch));
    assert_eq!(calc.diagnostics(), ["units do not match"]);
}

#[test]
fn test_derived_units() {
    let mut calc = Calculator::new(RealDomain::new());
    let force = value(&mut calc, "2 kg * 3 m / 1 s^2");
    assert_eq!(force, value(&mut calc, "6 N"));
    assert_eq!(calc.format_raw(&force), "6 kg m s^-2");

    let power = value(&mut calc, "1 J / 1 s");
    assert_eq!(power, value(&mut calc, "1 W"));
}

#[test]
fn test_rational_exponents() {
    let mut calc = Calculator::new(RealDomain::new());
    let root = value(&mut calc, "sqrt(4 m)");
    assert_eq!(root.unit().exponent("m"), Fraction::new(1, 2));
    assert_eq!(calc.format_raw(&root), "2 m^(1/2)");

    assert_eq!(calc.eval("2 m ^ 0.7071067811865476"), Err(EvalError::PowerTooComplex));
    // unitless bases accept any exponent
    assert!(calc.eval("2 ^ 0.7071067811865476").is_ok());
}

#[test]
fn test_output_unit_selection() {
    let mut calc = Calculator::new(RealDomain::new());
    assert_eq!(display(&mut calc, "1500 m"), "1.5 km");
    assert_eq!(display(&mut calc, "500 m"), "500 m");
    assert_eq!(display(&mut calc, "250 g"), "250 g");
    assert_eq!(display(&mut calc, "90 s"), "1.5 min");
    assert_eq!(display(&mut calc, "2500 J"), "2.5 kJ");
    // no candidates registered for speed
    assert_eq!(display(&mut calc, "3 m / 1 s"), "3 m s^-1");
    assert_eq!(display(&mut calc, "42"), "42");
}

#[test]
fn test_variables_and_assignment() {
    let mut calc = Calculator::new(RealDomain::new());
    value(&mut calc, "width = 3 m");
    value(&mut calc, "height = 4 m");
    let area = value(&mut calc, "width * height");
    assert_eq!(calc.format_raw(&area), "12 m^2");

    let names: Vec<&str> = calc.variables().map(|(name, _)| name).collect();
    assert_eq!(names, vec!["height", "width"]);
}

#[test]
fn test_logical_and_bitwise() {
    let mut calc = Calculator::new(RealDomain::new());
    assert_eq!(value(&mut calc, "6 | 3"), Quantity::unitless(7.0));
    assert_eq!(value(&mut calc, "6 & 3"), Quantity::unitless(2.0));
    assert_eq!(value(&mut calc, "1 << 4"), Quantity::unitless(16.0));
    assert_eq!(value(&mut calc, "~0"), Quantity::unitless(-1.0));
    assert_eq!(value(&mut calc, "2 m > 1 m && 0"), Quantity::unitless(0.0));
    assert_eq!(value(&mut calc, "0 || 3 s"), Quantity::unitless(1.0));
    assert_eq!(
        calc.eval("6 m | 3"),
        Err(EvalError::UnsupportedUnit { operation: "bitwise or" })
    );
}

#[test]
fn test_complex_arithmetic() {
    let mut calc = Calculator::new(ComplexDomain::new());
    assert_eq!(
        value(&mut calc, "i * i"),
        Quantity::unitless(Complex64::new(-1.0, 0.0))
    );
    assert_eq!(
        value(&mut calc, "(1 + 2i) m + (3 - 1j) m"),
        Quantity::new(Complex64::new(4.0, 1.0), Unit::base("m"))
    );

    let root = value(&mut calc, "sqrt(-4)");
    assert!(root.scalar().re.abs() < 1e-12);
    assert!((root.scalar().im - 2.0).abs() < 1e-12);

    let q = value(&mut calc, "(1 + 2i) m");
    assert_eq!(calc.format_raw(&q), "(1+2i) m");
    assert_eq!(
        calc.eval("2 m ^ i"),
        Err(EvalError::ComplexUnitPower)
    );
}

#[test]
fn test_complex_comparisons_use_real_part() {
    let mut calc = Calculator::new(ComplexDomain::new());
    assert_eq!(
        value(&mut calc, "(2 + 5i) > (1 + 9i)"),
        Quantity::unitless(Complex64::new(1.0, 0.0))
    );
    assert_eq!(
        value(&mut calc, "(2 + 5i) == (2 + 9i)"),
        Quantity::unitless(Complex64::new(0.0, 0.0))
    );
}

#[test]
fn test_complex_encoding() {
    let calc = Calculator::new(ComplexDomain::new());
    let domain = calc.domain();
    let z = Complex64::new(1.5, -2.0);
    let encoded = domain.encode(&z);
    assert_eq!(encoded, serde_json::json!([1.5, -2.0]));
    assert_eq!(domain.decode(&encoded), Some(z));
    assert_eq!(
        domain.encode(&Complex64::new(3.0, 0.0)),
        serde_json::json!(3.0)
    );
}
