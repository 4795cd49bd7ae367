use dimr_core::{Calculator, Differential, DifferentialDomain, EvalError, Quantity, RealDomain, Unit};

type DiffCalculator = Calculator<DifferentialDomain<RealDomain>>;

fn calculator() -> DiffCalculator {
    Calculator::new(DifferentialDomain::new(RealDomain::new(), RealDomain::auxiliary()))
}

/// `a = 1 m` and `b = 2`, both seeded as independent variables
fn seeded() -> DiffCalculator {
    let mut calc = calculator();
    let a = calc.domain().seed("a", Quantity::new(1.0, Unit::base("m")));
    let b = calc.domain().seed("b", Quantity::unitless(2.0));
    calc.set_variable("a", a);
    calc.set_variable("b", b);
    calc
}

fn eval(calc: &mut DiffCalculator, input: &str) -> Quantity<Differential<f64>> {
    calc.eval(input)
        .unwrap_or_else(|e| panic!("{input}: {e}"))
        .unwrap_or_else(|| panic!("{input}: no value"))
}

fn assert_close(actual: f64, expected: f64) {
    assert!(
        (actual - expected).abs() < 1e-12,
        "expected {expected}, got {actual}"
    );
}

fn assert_derivative(q: &Quantity<Differential<f64>>, name: &str, expected: f64) {
    let actual = q
        .scalar()
        .derivative(name)
        .unwrap_or_else(|| panic!("missing derivative d({name})"));
    assert_close(*actual, expected);
}

#[test]
fn test_seeded_variable_is_its_own_derivative() {
    let mut calc = seeded();
    let q = eval(&mut calc, "a");
    assert_eq!(q.unit(), &Unit::base("m"));
    assert_close(*q.scalar().value(), 1.0);
    assert_derivative(&q, "a", 1.0);
    assert_eq!(q.scalar().derivatives().len(), 1);
    assert_eq!(calc.format_raw(&q), "(1 + 1 d(a)) m");
}

#[test]
fn test_sum_with_scaled_unit() {
    let mut calc = seeded();
    let q = eval(&mut calc, "a + b * 1cm");
    assert_eq!(q.unit(), &Unit::base("m"));
    assert_close(*q.scalar().value(), 1.02);
    assert_derivative(&q, "a", 1.0);
    assert_derivative(&q, "b", 0.01);
}

#[test]
fn test_product_rule() {
    let mut calc = seeded();
    let q = eval(&mut calc, "a * b");
    assert_eq!(q.unit(), &Unit::base("m"));
    assert_close(*q.scalar().value(), 2.0);
    assert_derivative(&q, "a", 2.0);
    assert_derivative(&q, "b", 1.0);
}

#[test]
fn test_quotient_rule() {
    let mut calc = seeded();
    let q = eval(&mut calc, "a / b");
    assert_eq!(q.unit(), &Unit::base("m"));
    assert_close(*q.scalar().value(), 0.5);
    assert_derivative(&q, "a", 0.5);
    assert_derivative(&q, "b", -0.25);
}

#[test]
fn test_power_rules() {
    let mut calc = seeded();
    let square = eval(&mut calc, "a^2");
    assert_eq!(square.unit().to_string(), "m^2");
    assert_close(*square.scalar().value(), 1.0);
    assert_derivative(&square, "a", 2.0);
    assert_eq!(square.scalar().derivative("b"), None);

    // exponent carries a derivative too: d(a^b)/db = ln(a) a^b = 0 at a = 1
    let general = eval(&mut calc, "a^b");
    assert_eq!(general.unit().to_string(), "m^2");
    assert_close(*general.scalar().value(), 1.0);
    assert_derivative(&general, "a", 2.0);
    assert_derivative(&general, "b", 0.0);
}

#[test]
fn test_seeding_through_differential_literal() {
    let mut calc = calculator();
    eval(&mut calc, "x = (3 + d(x)) s");
    let q = eval(&mut calc, "x * x");
    assert_eq!(q.unit().to_string(), "s^2");
    assert_close(*q.scalar().value(), 9.0);
    assert_derivative(&q, "x", 6.0);
}

#[test]
fn test_format_lists_derivatives() {
    let mut calc = seeded();
    let q = eval(&mut calc, "a + b * 1cm");
    assert_eq!(calc.format_raw(&q), "(1.02 + 1 d(a) + 0.01 d(b)) m");

    let q = eval(&mut calc, "a / b");
    assert_eq!(calc.format_raw(&q), "(0.5 + 0.5 d(a) + -0.25 d(b)) m");

    let constant = eval(&mut calc, "3 km");
    assert_eq!(calc.format_raw(&constant), "3000 m");
}

#[test]
fn test_formatted_value_parses_back() {
    let mut calc = seeded();
    for input in ["a + b * 1cm", "a / b", "a * b", "b^3", "-a"] {
        let q = eval(&mut calc, input);
        let text = calc.format_raw(&q);
        assert_eq!(eval(&mut calc, &text), q, "{input} rendered as {text}");
    }
}

#[test]
fn test_non_differentiable_operations() {
    let mut calc = seeded();
    assert_eq!(
        calc.eval("b % 2"),
        Err(EvalError::NotDifferentiable { operation: "modulo" })
    );
    assert_eq!(
        calc.eval("b!"),
        Err(EvalError::NotDifferentiable { operation: "factorial" })
    );
    assert_eq!(calc.diagnostics().len(), 2);

    // constants still work
    assert_eq!(
        calc.eval("7 % 4").unwrap().map(|q| *q.scalar().value()),
        Some(-1.0)
    );
}

#[test]
fn test_comparisons_drop_derivatives() {
    let mut calc = seeded();
    let q = eval(&mut calc, "a > 50 cm");
    assert_eq!(*q.scalar().value(), 1.0);
    assert!(!q.scalar().has_derivatives());
}

#[test]
fn test_remove_units_keeps_derivatives() {
    let mut calc = seeded();
    let q = eval(&mut calc, "unitless(a * b)");
    assert!(q.is_unitless());
    assert_derivative(&q, "a", 2.0);
    assert_derivative(&q, "b", 1.0);
}
