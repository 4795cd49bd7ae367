//! Abstract Syntax Tree definitions

use pest::iterators::{Pair, Pairs};

use super::Rule;

/// Top-level AST node for a line
#[derive(Debug, Clone, PartialEq)]
pub enum Ast {
    /// Empty line
    Empty,
    /// Variable assignment: name = expr
    Assignment { name: String, expr: Box<Expr> },
    /// Expression to evaluate
    Expression(Expr),
}

/// Expression node
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Numeric literal, kept as text so each domain parses it natively
    Number(String),
    /// Variable or unit name
    Name(String),
    /// Differential `d(name)`
    Differential(String),
    /// Unary operation
    UnaryOp { op: UnaryOp, operand: Box<Expr> },
    /// Binary operation
    BinaryOp {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    /// Function call: sqrt(x)
    FunctionCall { name: String, args: Vec<Expr> },
}

/// Unary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Plus,
    Minus,
    Invert,
    Factorial,
}

/// Binary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulo,
    IntegerDivide,
    Power,
    BitOr,
    BitAnd,
    ShiftLeft,
    ShiftRight,
    Greater,
    GreaterEqual,
    Less,
    LessEqual,
    Equal,
    NotEqual,
    Or,
    And,
}

impl BinaryOp {
    fn from_token(token: &str) -> Result<Self, String> {
        Ok(match token {
            "+" => BinaryOp::Add,
            "-" => BinaryOp::Subtract,
            "*" => BinaryOp::Multiply,
            "/" => BinaryOp::Divide,
            "%" => BinaryOp::Modulo,
            "//" => BinaryOp::IntegerDivide,
            "|" => BinaryOp::BitOr,
            "&" => BinaryOp::BitAnd,
            "<<" => BinaryOp::ShiftLeft,
            ">>" => BinaryOp::ShiftRight,
            ">" => BinaryOp::Greater,
            ">=" => BinaryOp::GreaterEqual,
            "<" => BinaryOp::Less,
            "<=" => BinaryOp::LessEqual,
            "==" => BinaryOp::Equal,
            "!=" => BinaryOp::NotEqual,
            "||" => BinaryOp::Or,
            "&&" => BinaryOp::And,
            other => return Err(format!("Unknown operator: {other}")),
        })
    }
}

impl UnaryOp {
    fn from_token(token: &str) -> Result<Self, String> {
        Ok(match token {
            "+" => UnaryOp::Plus,
            "-" => UnaryOp::Minus,
            "~" => UnaryOp::Invert,
            "!" => UnaryOp::Factorial,
            other => return Err(format!("Unknown operator: {other}")),
        })
    }
}

fn binary(op: BinaryOp, left: Expr, right: Expr) -> Expr {
    Expr::BinaryOp {
        op,
        left: Box::new(left),
        right: Box::new(right),
    }
}

fn unary(op: UnaryOp, operand: Expr) -> Expr {
    Expr::UnaryOp {
        op,
        operand: Box::new(operand),
    }
}

/// Build AST from parsed pairs
pub fn build_ast(pairs: Pairs<'_, Rule>) -> Result<Ast, String> {
    for pair in pairs {
        if pair.as_rule() == Rule::line {
            for inner_pair in pair.into_inner() {
                match inner_pair.as_rule() {
                    Rule::assignment => return build_assignment(inner_pair.into_inner()),
                    Rule::expression => return Ok(Ast::Expression(build_expr(inner_pair)?)),
                    _ => {}
                }
            }
            return Ok(Ast::Empty);
        }
    }
    Ok(Ast::Empty)
}

fn build_assignment(mut pairs: Pairs<'_, Rule>) -> Result<Ast, String> {
    let name = pairs
        .next()
        .ok_or("Expected identifier")?
        .as_str()
        .to_string();

    let expr_pair = pairs.next().ok_or("Expected expression")?;
    let expr = build_expr(expr_pair)?;

    Ok(Ast::Assignment {
        name,
        expr: Box::new(expr),
    })
}

fn build_expr(pair: Pair<'_, Rule>) -> Result<Expr, String> {
    match pair.as_rule() {
        Rule::expression | Rule::implicit => {
            let inner = pair.into_inner().next().ok_or("Expected expression")?;
            build_expr(inner)
        }
        Rule::logic_or
        | Rule::logic_and
        | Rule::comparison
        | Rule::bit_or
        | Rule::bit_and
        | Rule::shift
        | Rule::sum
        | Rule::product => build_left_assoc(pair.into_inner()),
        Rule::term => build_term(pair.into_inner()),
        Rule::unary | Rule::exponent => build_prefixed(pair.into_inner()),
        Rule::power => build_power(pair.into_inner()),
        Rule::postfix => build_postfix(pair.into_inner()),
        Rule::primary => {
            let inner = pair.into_inner().next().ok_or("Expected operand")?;
            build_expr(inner)
        }
        Rule::number => Ok(Expr::Number(pair.as_str().to_string())),
        Rule::ident => Ok(Expr::Name(pair.as_str().to_string())),
        Rule::differential => {
            let name = pair
                .into_inner()
                .find(|p| p.as_rule() == Rule::ident)
                .ok_or("Expected variable in differential")?;
            Ok(Expr::Differential(name.as_str().to_string()))
        }
        Rule::call => build_call(pair.into_inner()),
        rule => Err(format!("Unexpected rule: {rule:?}")),
    }
}

/// `operand (op operand)*`, folded to the left
fn build_left_assoc(mut pairs: Pairs<'_, Rule>) -> Result<Expr, String> {
    let first = pairs.next().ok_or("Expected operand")?;
    let mut expr = build_expr(first)?;
    while let Some(op) = pairs.next() {
        let op = BinaryOp::from_token(op.as_str())?;
        let right = pairs.next().ok_or("Expected operand after operator")?;
        expr = binary(op, expr, build_expr(right)?);
    }
    Ok(expr)
}

/// Juxtaposed operands multiply, left to right
fn build_term(mut pairs: Pairs<'_, Rule>) -> Result<Expr, String> {
    let first = pairs.next().ok_or("Expected operand")?;
    let mut expr = build_expr(first)?;
    for next in pairs {
        expr = binary(BinaryOp::Multiply, expr, build_expr(next)?);
    }
    Ok(expr)
}

/// `prefix_op* operand`, innermost prefix applied first
fn build_prefixed(pairs: Pairs<'_, Rule>) -> Result<Expr, String> {
    let mut ops = Vec::new();
    let mut operand = None;
    for pair in pairs {
        if pair.as_rule() == Rule::prefix_op {
            ops.push(UnaryOp::from_token(pair.as_str())?);
        } else {
            operand = Some(build_expr(pair)?);
        }
    }
    let mut expr = operand.ok_or("Expected operand")?;
    for op in ops.into_iter().rev() {
        expr = unary(op, expr);
    }
    Ok(expr)
}

fn build_power(mut pairs: Pairs<'_, Rule>) -> Result<Expr, String> {
    let base = build_expr(pairs.next().ok_or("Expected operand")?)?;
    match pairs.next() {
        Some(exponent) => Ok(binary(BinaryOp::Power, base, build_expr(exponent)?)),
        None => Ok(base),
    }
}

fn build_postfix(mut pairs: Pairs<'_, Rule>) -> Result<Expr, String> {
    let mut expr = build_expr(pairs.next().ok_or("Expected operand")?)?;
    for op in pairs {
        expr = unary(UnaryOp::from_token(op.as_str())?, expr);
    }
    Ok(expr)
}

fn build_call(mut pairs: Pairs<'_, Rule>) -> Result<Expr, String> {
    let name = pairs.next().ok_or("Expected function name")?.as_str().to_string();
    let args = pairs.map(build_expr).collect::<Result<Vec<_>, _>>()?;
    Ok(Expr::FunctionCall { name, args })
}
