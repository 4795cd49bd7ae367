//! dimr-cli - Unit-aware command-line calculator
//!
//! Usage:
//!   dimr-cli "1500 m + 2 km"              # Single expression
//!   echo "10 m / 2 s" | dimr-cli          # Pipe mode
//!   dimr-cli -f calculations.txt          # File mode
//!   dimr-cli -i                           # Interactive REPL
//!   dimr-cli --domain complex "sqrt(-4)"  # Complex numbers
//!   dimr-cli --server                     # JSON-RPC 2.0 over stdin/stdout

mod server;

use std::io::{self, BufRead, IsTerminal, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use dimr_core::{Calculator, ComplexDomain, DifferentialDomain, Domain, RealDomain};
use tracing_subscriber::EnvFilter;

/// Environment variable holding a `tracing` filter directive
const LOG_ENV: &str = "DIMR_LOG";

#[derive(Parser, Debug)]
#[command(name = "dimr-cli")]
#[command(about = "A calculator for physical quantities", long_about = None)]
struct Args {
    /// Expression to evaluate
    expression: Option<String>,

    /// Read expressions from file
    #[arg(short, long, value_name = "FILE")]
    file: Option<PathBuf>,

    /// Interactive REPL mode
    #[arg(short, long)]
    interactive: bool,

    /// Show only the results (no input echo)
    #[arg(short, long)]
    quiet: bool,

    /// Numeric representation to evaluate in
    #[arg(short, long, value_enum, default_value_t = DomainKind::Real)]
    domain: DomainKind,

    /// Show results in the units they were computed in
    #[arg(long)]
    raw: bool,

    /// Run as a JSON-RPC 2.0 server on stdin/stdout
    #[arg(long)]
    server: bool,

    /// Log verbosity (-v debug, -vv trace); DIMR_LOG takes precedence
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum DomainKind {
    /// 64-bit floating point
    Real,
    /// Complex numbers; `i` and `j` are the imaginary unit
    Complex,
    /// Real numbers with forward-mode derivatives; `d(x)` seeds `x`
    Differential,
}

fn init_logging(verbose: u8) {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| {
        EnvFilter::new(match verbose {
            0 => "warn",
            1 => "debug",
            _ => "trace",
        })
    });
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);
    tracing::debug!(?args.domain, raw = args.raw, "starting");

    match args.domain {
        DomainKind::Real => run(Calculator::new(RealDomain::new()), &args),
        DomainKind::Complex => run(Calculator::new(ComplexDomain::new()), &args),
        DomainKind::Differential => run(
            Calculator::new(DifferentialDomain::new(
                RealDomain::new(),
                RealDomain::auxiliary(),
            )),
            &args,
        ),
    }
}

fn run<D: Domain>(mut calc: Calculator<D>, args: &Args) -> Result<()> {
    if args.server {
        return server::run_server(&mut calc, args.raw).context("server I/O failed");
    }

    // Determine input source
    if let Some(expr) = &args.expression {
        eval_and_print(&mut calc, expr, args);
    } else if let Some(path) = &args.file {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("cannot read {}", path.display()))?;
        for line in content.lines() {
            eval_and_print(&mut calc, line, args);
        }
    } else if args.interactive {
        run_repl(&mut calc, args)?;
    } else if !io::stdin().is_terminal() {
        // Pipe mode
        for line in io::stdin().lock().lines() {
            let line = line?;
            eval_and_print(&mut calc, &line, args);
        }
    } else {
        eprintln!("Usage: dimr-cli <expression>");
        eprintln!("       dimr-cli -f <file>");
        eprintln!("       dimr-cli -i");
        eprintln!("       dimr-cli --server");
        eprintln!("       echo \"10 m / 2 s\" | dimr-cli");
        std::process::exit(1);
    }

    Ok(())
}

/// Evaluate one line and render its result; `None` for blank lines
fn render<D: Domain>(calc: &mut Calculator<D>, input: &str, raw: bool) -> Option<String> {
    match calc.eval(input) {
        Ok(Some(value)) if raw => Some(calc.format_raw(&value)),
        Ok(Some(value)) => Some(calc.display(&value)),
        Ok(None) => None,
        Err(err) => Some(format!("error: {err}")),
    }
}

fn eval_and_print<D: Domain>(calc: &mut Calculator<D>, input: &str, args: &Args) {
    let result = render(calc, input, args.raw);

    if args.quiet {
        if let Some(result) = result {
            println!("{result}");
        }
    } else {
        match result {
            None => println!("{input}"),
            Some(result) => {
                // Pad input to align results
                let padding = 40usize.saturating_sub(input.len());
                println!("{input}{:>padding$} = {result}", "");
            }
        }
    }
}

fn run_repl<D: Domain>(calc: &mut Calculator<D>, args: &Args) -> Result<()> {
    let stdin = io::stdin();
    let mut stdout = io::stdout();

    println!("dimr - Unit-Aware Calculator");
    println!("Type expressions to calculate. Press Ctrl+D to exit.\n");

    loop {
        print!("> ");
        stdout.flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            // EOF
            println!();
            break;
        }

        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        match line {
            "quit" | "exit" => break,
            "clear" => {
                calc.clear();
                println!("Cleared.");
                continue;
            }
            "vars" => {
                let variables: Vec<_> = calc
                    .variables()
                    .map(|(name, value)| (name.to_string(), value.clone()))
                    .collect();
                for (name, value) in variables {
                    println!("{name} = {}", calc.display(&value));
                }
                continue;
            }
            "help" => {
                print_help();
                continue;
            }
            _ => {}
        }

        if let Some(result) = render(calc, line, args.raw) {
            println!("{result}");
        }
    }

    Ok(())
}

fn print_help() {
    println!(
        r#"
Commands:
  help     Show this help
  vars     List variables
  clear    Clear all variables
  quit     Exit the REPL

Examples:
  10 + 20                  Basic arithmetic
  1500 m + 2 km            Units combine and display as 3.5 km
  speed = 10 m / 2 s       Variable assignment
  speed * 1 min            Use variable
  sqrt(9 m^2)              Rational unit exponents
  x = (3 + d(x)) m         Seed a derivative (--domain differential)
  x^2                      ... and read d(x^2)/dx = 2x
  (1 + 2i) m * i           Complex values (--domain complex)
"#
    );
}
