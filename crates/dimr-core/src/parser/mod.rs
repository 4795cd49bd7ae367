//! Expression parser using pest

mod ast;

pub use ast::{Ast, BinaryOp, Expr, UnaryOp};

use pest::Parser;
use pest_derive::Parser;

use crate::error::EvalError;

#[derive(Parser)]
#[grammar = "parser/grammar.pest"]
pub struct DimrParser;

/// Parse a single line of input
pub fn parse_line(input: &str) -> Result<Ast, EvalError> {
    let pairs = DimrParser::parse(Rule::line, input).map_err(|err| {
        let column = match err.line_col {
            pest::error::LineColLocation::Pos((_, col)) => col,
            pest::error::LineColLocation::Span((_, col), _) => col,
        };
        EvalError::Syntax(format!("unexpected input at column {column}"))
    })?;
    ast::build_ast(pairs).map_err(EvalError::Syntax)
}
