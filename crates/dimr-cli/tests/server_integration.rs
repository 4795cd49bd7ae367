//! Integration tests for JSON-RPC server mode
//!
//! These tests drive the built binary the way an editor plugin would:
//! one eval call per keystroke, batches of lines, and state queries.

use serde_json::{json, Value};
use std::io::{BufRead, BufReader, Write};
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};

/// Helper to send a JSON-RPC request and get response
fn send_request(stdin: &mut impl Write, stdout: &mut impl BufRead, request: Value) -> Value {
    writeln!(stdin, "{}", request).unwrap();
    stdin.flush().unwrap();

    let mut response = String::new();
    stdout.read_line(&mut response).unwrap();
    serde_json::from_str(&response).unwrap()
}

/// Helper to create eval request
fn eval_request(expr: &str, id: u32) -> Value {
    json!({
        "jsonrpc": "2.0",
        "method": "eval",
        "params": {"expr": expr},
        "id": id
    })
}

/// Helper to extract result from response
fn get_result(response: &Value) -> &Value {
    response.get("result").expect("expected result in response")
}

/// Helper to get display string from result
fn get_display(response: &Value) -> &str {
    get_result(response)
        .get("display")
        .and_then(|v| v.as_str())
        .unwrap_or("")
}

/// Helper to get result type
fn get_type(response: &Value) -> &str {
    get_result(response)
        .get("type")
        .and_then(|v| v.as_str())
        .unwrap_or("")
}

/// Spawn server process with extra arguments
fn spawn_server_with(args: &[&str]) -> (Child, ChildStdin, BufReader<ChildStdout>) {
    let mut child = Command::new(env!("CARGO_BIN_EXE_dimr-cli"))
        .arg("--server")
        .args(args)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .expect("failed to spawn server");
    let stdin = child.stdin.take().unwrap();
    let stdout = BufReader::new(child.stdout.take().unwrap());
    (child, stdin, stdout)
}

fn spawn_server() -> (Child, ChildStdin, BufReader<ChildStdout>) {
    spawn_server_with(&[])
}

fn shutdown(mut child: Child, stdin: ChildStdin) {
    drop(stdin);
    child.wait().unwrap();
}

/// Test: User types "1500 m + 2 km" character by character
#[test]
fn test_incremental_typing_with_units() {
    let (child, mut stdin, mut stdout) = spawn_server();

    let keystrokes = [
        "1",
        "15",
        "1500",
        "1500 ",
        "1500 m",
        "1500 m ",
        "1500 m +",
        "1500 m + ",
        "1500 m + 2",
        "1500 m + 2 ",
        "1500 m + 2 k",
        "1500 m + 2 km",
    ];

    for (i, partial) in keystrokes.iter().enumerate() {
        let response = send_request(&mut stdin, &mut stdout, eval_request(partial, i as u32));
        assert!(response.get("result").is_some(), "no result for {partial:?}");

        match *partial {
            "1500" => assert_eq!(get_display(&response), "1500"),
            "1500 m" => assert_eq!(get_display(&response), "1.5 km"),
            // a bare number cannot be added to a length
            "1500 m + 2" => assert_eq!(get_type(&response), "error"),
            "1500 m + 2 k" => assert_eq!(get_type(&response), "error"),
            "1500 m + 2 km" => {
                assert_eq!(get_display(&response), "3.5 km");
                assert_eq!(get_result(&response)["unit"], "km");
                assert_eq!(get_result(&response)["value"], 3.5);
            }
            _ => {}
        }
    }

    shutdown(child, stdin);
}

/// Test: Variable assignment persists across calls
#[test]
fn test_variable_persistence() {
    let (child, mut stdin, mut stdout) = spawn_server();

    let response = send_request(&mut stdin, &mut stdout, eval_request("distance = 42 km", 1));
    assert_eq!(get_type(&response), "value");
    assert_eq!(get_display(&response), "42 km");

    let response = send_request(&mut stdin, &mut stdout, eval_request("time = 2 h", 2));
    assert_eq!(get_display(&response), "2 h");

    let response = send_request(
        &mut stdin,
        &mut stdout,
        eval_request("distance / time", 3),
    );
    assert_eq!(get_result(&response)["unit"], "m s^-1");
    let speed = get_result(&response)["value"].as_f64().unwrap();
    assert!((speed - 42000.0 / 7200.0).abs() < 1e-9);

    shutdown(child, stdin);
}

/// Test: Error recovery - user types invalid then fixes
#[test]
fn test_error_recovery() {
    let (child, mut stdin, mut stdout) = spawn_server();

    let response = send_request(&mut stdin, &mut stdout, eval_request("10 +", 1));
    assert_eq!(get_type(&response), "error");

    let response = send_request(&mut stdin, &mut stdout, eval_request("10 + 5", 2));
    assert_eq!(get_display(&response), "15");
    assert_eq!(get_type(&response), "value");

    let response = send_request(&mut stdin, &mut stdout, eval_request("1 m + 1 s", 3));
    assert_eq!(get_type(&response), "error");
    assert_eq!(get_result(&response)["message"], "units do not match");

    let response = send_request(&mut stdin, &mut stdout, eval_request("widget", 4));
    assert_eq!(get_type(&response), "error");

    let response = send_request(&mut stdin, &mut stdout, eval_request("widget = 42", 5));
    assert_eq!(get_display(&response), "42");

    let response = send_request(&mut stdin, &mut stdout, eval_request("widget + 8", 6));
    assert_eq!(get_display(&response), "50");

    shutdown(child, stdin);
}

/// Test: eval_lines for multi-line input (like paste or batch)
#[test]
fn test_eval_lines_batch() {
    let (child, mut stdin, mut stdout) = spawn_server();

    let request = json!({
        "jsonrpc": "2.0",
        "method": "eval_lines",
        "params": {
            "lines": [
                "mass = 2 kg",
                "",
                "g0 = 9.8 m / s^2",
                "height = 10 m",
                "mass * g0 * height"
            ]
        },
        "id": 1
    });

    let response = send_request(&mut stdin, &mut stdout, request);
    let results = response.get("result").unwrap().as_array().unwrap();

    assert_eq!(results.len(), 5);
    assert_eq!(results[0]["display"], "2 kg");
    assert_eq!(results[1]["type"], "empty");
    assert_eq!(results[2]["unit"], "m s^-2");
    assert_eq!(results[4]["unit"], "J");
    assert!(results[4]["display"].as_str().unwrap().ends_with(" J"));

    shutdown(child, stdin);
}

/// Test: clear resets state
#[test]
fn test_clear_resets_state() {
    let (child, mut stdin, mut stdout) = spawn_server();

    send_request(&mut stdin, &mut stdout, eval_request("x = 100", 1));

    let response = send_request(&mut stdin, &mut stdout, eval_request("x + 50", 2));
    assert_eq!(get_display(&response), "150");

    let clear_request = json!({
        "jsonrpc": "2.0",
        "method": "clear",
        "id": 3
    });
    let response = send_request(&mut stdin, &mut stdout, clear_request);
    assert!(response.get("result").is_some());

    // Variable should be gone, units remain
    let response = send_request(&mut stdin, &mut stdout, eval_request("x", 4));
    assert_eq!(get_type(&response), "error");
    let response = send_request(&mut stdin, &mut stdout, eval_request("3 km", 5));
    assert_eq!(get_display(&response), "3 km");

    shutdown(child, stdin);
}

/// Test: get_variables returns defined variables in name order
#[test]
fn test_get_variables() {
    let (child, mut stdin, mut stdout) = spawn_server();

    send_request(&mut stdin, &mut stdout, eval_request("width = 3 m", 1));
    send_request(&mut stdin, &mut stdout, eval_request("depth = 2500 m", 2));
    send_request(&mut stdin, &mut stdout, eval_request("count = 3", 3));

    let request = json!({
        "jsonrpc": "2.0",
        "method": "get_variables",
        "id": 4
    });
    let response = send_request(&mut stdin, &mut stdout, request);
    let vars = response.get("result").unwrap().as_array().unwrap();

    let names: Vec<&str> = vars.iter().map(|v| v["name"].as_str().unwrap()).collect();
    assert_eq!(names, vec!["count", "depth", "width"]);
    assert_eq!(vars[1]["value"]["display"], "2.5 km");

    shutdown(child, stdin);
}

/// Test: Rapid sequential requests (simulates fast typing)
#[test]
fn test_rapid_sequential_requests() {
    let (child, mut stdin, mut stdout) = spawn_server();

    for i in 0..50 {
        let expr = format!("{} + {}", i, i + 1);
        let response = send_request(&mut stdin, &mut stdout, eval_request(&expr, i));

        let expected = (i + i + 1) as f64;
        let value = get_result(&response)["value"].as_f64().unwrap();
        assert!((value - expected).abs() < 0.01);
    }

    shutdown(child, stdin);
}

/// Test: Empty, whitespace and comment-only expressions
#[test]
fn test_empty_expressions() {
    let (child, mut stdin, mut stdout) = spawn_server();

    let response = send_request(&mut stdin, &mut stdout, eval_request("", 1));
    assert_eq!(get_type(&response), "empty");

    let response = send_request(&mut stdin, &mut stdout, eval_request("   ", 2));
    assert_eq!(get_type(&response), "empty");

    let response = send_request(
        &mut stdin,
        &mut stdout,
        eval_request("# this is a comment", 3),
    );
    assert_eq!(get_type(&response), "empty");

    shutdown(child, stdin);
}

/// Test: --raw keeps results in the units they were computed in
#[test]
fn test_raw_mode() {
    let (child, mut stdin, mut stdout) = spawn_server_with(&["--raw"]);

    let response = send_request(&mut stdin, &mut stdout, eval_request("2 km", 1));
    assert_eq!(get_display(&response), "2000 m");
    assert_eq!(get_result(&response)["unit"], "m");

    shutdown(child, stdin);
}

/// Test: complex domain encodes values as [re, im]
#[test]
fn test_complex_domain() {
    let (child, mut stdin, mut stdout) = spawn_server_with(&["--domain", "complex"]);

    let response = send_request(&mut stdin, &mut stdout, eval_request("(1 + 2i) * i", 1));
    assert_eq!(get_display(&response), "-2+1i");
    assert_eq!(get_result(&response)["value"], json!([-2.0, 1.0]));

    let response = send_request(&mut stdin, &mut stdout, eval_request("i * i", 2));
    assert_eq!(get_display(&response), "-1");
    assert_eq!(get_result(&response)["value"], json!(-1.0));

    shutdown(child, stdin);
}

/// Test: differential domain reports derivatives
#[test]
fn test_differential_domain() {
    let (child, mut stdin, mut stdout) = spawn_server_with(&["--domain", "differential", "--raw"]);

    send_request(&mut stdin, &mut stdout, eval_request("x = (3 + d(x)) m", 1));
    let response = send_request(&mut stdin, &mut stdout, eval_request("x^2", 2));
    assert_eq!(get_display(&response), "(9 + 6 d(x)) m^2");
    assert_eq!(
        get_result(&response)["value"],
        json!({"value": 9.0, "derivatives": {"x": 6.0}})
    );

    shutdown(child, stdin);
}

/// Test: Invalid JSON-RPC requests
#[test]
fn test_invalid_requests() {
    let (child, mut stdin, mut stdout) = spawn_server();

    // Missing method
    let request = json!({
        "jsonrpc": "2.0",
        "params": {"expr": "10"},
        "id": 1
    });
    let response = send_request(&mut stdin, &mut stdout, request);
    assert!(response.get("error").is_some());

    // Unknown method
    let request = json!({
        "jsonrpc": "2.0",
        "method": "unknown_method",
        "id": 2
    });
    let response = send_request(&mut stdin, &mut stdout, request);
    assert!(response.get("error").is_some());
    assert!(response["error"]["message"]
        .as_str()
        .unwrap()
        .contains("not found"));

    // Wrong jsonrpc version
    let request = json!({
        "jsonrpc": "1.0",
        "method": "eval",
        "params": {"expr": "10"},
        "id": 3
    });
    let response = send_request(&mut stdin, &mut stdout, request);
    assert!(response.get("error").is_some());

    shutdown(child, stdin);
}
