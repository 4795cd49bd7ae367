//! JSON-RPC 2.0 server mode for dimr-cli
//!
//! Enables external tools to use dimr as a calculation backend.
//! Reads JSON-RPC requests from stdin, writes responses to stdout.

use dimr_core::{Calculator, Domain, EvalError, Quantity};
use serde::{Deserialize, Serialize};
use std::io::{self, BufRead, Write};

/// JSON-RPC 2.0 request
#[derive(Deserialize)]
struct Request {
    jsonrpc: String,
    method: String,
    #[serde(default)]
    params: Option<serde_json::Value>,
    id: serde_json::Value,
}

/// JSON-RPC 2.0 response
#[derive(Serialize)]
struct Response {
    jsonrpc: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<RpcError>,
    id: serde_json::Value,
}

/// JSON-RPC error object
#[derive(Serialize)]
struct RpcError {
    code: i32,
    message: String,
}

/// Structured evaluation result
#[derive(Serialize)]
struct EvalResult {
    #[serde(rename = "type")]
    result_type: &'static str,
    /// Scalar in the domain's JSON encoding
    #[serde(skip_serializing_if = "Option::is_none")]
    value: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    unit: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
    display: String,
}

/// Params for eval method
#[derive(Deserialize)]
struct EvalParams {
    expr: String,
}

/// Params for eval_lines method
#[derive(Deserialize)]
struct EvalLinesParams {
    lines: Vec<String>,
}

/// Variable info for get_variables response
#[derive(Serialize)]
struct VariableInfo {
    name: String,
    value: EvalResult,
}

// JSON-RPC error codes
const PARSE_ERROR: i32 = -32700;
const INVALID_REQUEST: i32 = -32600;
const METHOD_NOT_FOUND: i32 = -32601;
const INVALID_PARAMS: i32 = -32602;
const INTERNAL_ERROR: i32 = -32603;

impl Response {
    fn success(id: serde_json::Value, result: impl Serialize) -> Self {
        match serde_json::to_value(result) {
            Ok(result) => Self {
                jsonrpc: "2.0",
                result: Some(result),
                error: None,
                id,
            },
            Err(e) => Self::error(id, INTERNAL_ERROR, format!("Cannot encode result: {e}")),
        }
    }

    fn error(id: serde_json::Value, code: i32, message: impl Into<String>) -> Self {
        Self {
            jsonrpc: "2.0",
            result: None,
            error: Some(RpcError {
                code,
                message: message.into(),
            }),
            id,
        }
    }
}

/// Evaluation session: the calculator plus how results are shown
struct Session<'a, D: Domain> {
    calc: &'a mut Calculator<D>,
    raw: bool,
}

impl<D: Domain> Session<'_, D> {
    fn eval(&mut self, input: &str) -> EvalResult {
        match self.calc.eval(input) {
            Ok(Some(value)) => self.value_to_result(&value),
            Ok(None) => EvalResult {
                result_type: "empty",
                value: None,
                unit: None,
                message: None,
                display: String::new(),
            },
            Err(err) => error_to_result(&err),
        }
    }

    /// Convert a quantity to a structured result in its displayed unit
    fn value_to_result(&mut self, value: &Quantity<D::Scalar>) -> EvalResult {
        let shown = if self.raw {
            value.clone()
        } else {
            self.calc.resolve_output(value)
        };
        let domain = self.calc.domain();
        EvalResult {
            result_type: "value",
            value: Some(domain.encode(shown.scalar())),
            unit: (!shown.is_unitless()).then(|| shown.unit().to_string()),
            message: None,
            display: domain.format(&shown),
        }
    }
}

fn error_to_result(err: &EvalError) -> EvalResult {
    EvalResult {
        result_type: "error",
        value: None,
        unit: None,
        message: Some(err.to_string()),
        display: format!("error: {err}"),
    }
}

fn parse_params<T: serde::de::DeserializeOwned>(
    params: Option<serde_json::Value>,
) -> Result<T, String> {
    match params {
        Some(p) => serde_json::from_value(p).map_err(|e| format!("Invalid params: {e}")),
        None => Err("Missing params".to_string()),
    }
}

/// Handle a single JSON-RPC request
fn handle_request<D: Domain>(session: &mut Session<'_, D>, input: &str) -> Response {
    // Parse request
    let request: Request = match serde_json::from_str(input) {
        Ok(r) => r,
        Err(e) => {
            return Response::error(
                serde_json::Value::Null,
                PARSE_ERROR,
                format!("Parse error: {e}"),
            );
        }
    };

    // Validate jsonrpc version
    if request.jsonrpc != "2.0" {
        return Response::error(request.id, INVALID_REQUEST, "Invalid JSON-RPC version");
    }

    tracing::debug!(method = %request.method, "request");

    // Dispatch method
    match request.method.as_str() {
        "eval" => handle_eval(session, request.id, request.params),
        "eval_lines" => handle_eval_lines(session, request.id, request.params),
        "clear" => handle_clear(session, request.id),
        "get_variables" => handle_get_variables(session, request.id),
        _ => Response::error(
            request.id,
            METHOD_NOT_FOUND,
            format!("Method not found: {}", request.method),
        ),
    }
}

/// Handle eval method - evaluate single expression
fn handle_eval<D: Domain>(
    session: &mut Session<'_, D>,
    id: serde_json::Value,
    params: Option<serde_json::Value>,
) -> Response {
    let params: EvalParams = match parse_params(params) {
        Ok(p) => p,
        Err(message) => return Response::error(id, INVALID_PARAMS, message),
    };

    let result = session.eval(&params.expr);
    Response::success(id, result)
}

/// Handle eval_lines method - evaluate multiple lines (preserves variables)
fn handle_eval_lines<D: Domain>(
    session: &mut Session<'_, D>,
    id: serde_json::Value,
    params: Option<serde_json::Value>,
) -> Response {
    let params: EvalLinesParams = match parse_params(params) {
        Ok(p) => p,
        Err(message) => return Response::error(id, INVALID_PARAMS, message),
    };

    let results: Vec<EvalResult> = params.lines.iter().map(|line| session.eval(line)).collect();
    Response::success(id, results)
}

/// Handle clear method - clear variables and diagnostics
fn handle_clear<D: Domain>(session: &mut Session<'_, D>, id: serde_json::Value) -> Response {
    session.calc.clear();
    Response::success(id, serde_json::json!({"message": "Cleared"}))
}

/// Handle get_variables method - list defined variables in name order
fn handle_get_variables<D: Domain>(
    session: &mut Session<'_, D>,
    id: serde_json::Value,
) -> Response {
    let variables: Vec<_> = session
        .calc
        .variables()
        .map(|(name, value)| (name.to_string(), value.clone()))
        .collect();
    let results: Vec<VariableInfo> = variables
        .into_iter()
        .map(|(name, value)| VariableInfo {
            value: session.value_to_result(&value),
            name,
        })
        .collect();
    Response::success(id, results)
}

/// Run the JSON-RPC server loop
pub fn run_server<D: Domain>(calc: &mut Calculator<D>, raw: bool) -> io::Result<()> {
    let stdin = io::stdin();
    let mut stdout = io::stdout();
    let mut session = Session { calc, raw };

    for line in stdin.lock().lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }

        let response = handle_request(&mut session, &line);
        let json = serde_json::to_string(&response)?;
        writeln!(stdout, "{json}")?;
        stdout.flush()?;
    }

    Ok(())
}
