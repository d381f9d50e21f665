//! Leveler - level assignment for homomorphic circuits
//!
//! Reads a circuit description, assigns levels, inserts reductions and
//! writes the leveled circuit as a Graphviz graph.
//!
//! # Usage
//!
//! ```bash
//! leveler circuit.lvl | dot -Tsvg > leveled.svg
//! leveler circuit.lvl --dot leveled.dot --eval x=3 --eval y=4
//! ```

use std::collections::HashMap;
use std::path::PathBuf;

use clap::Parser;
use circuit_leveler::{
    builder,
    circuit::{validate_graph, validate_levels},
    dsl,
    error::{LevelerError, Result},
    eval::{annotate, evaluate, PlaintextEvaluator},
    to_dot, BalancerConfig, LevelBalancer,
};
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

/// Homomorphic circuit leveler
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the circuit description file
    #[arg(value_name = "CIRCUIT_FILE")]
    circuit_file: PathBuf,

    /// Write the DOT graph here instead of stdout
    #[arg(long, value_name = "PATH")]
    dot: Option<PathBuf>,

    /// Only balance the part of the circuit feeding this node
    #[arg(long, value_name = "NODE")]
    root: Option<String>,

    /// Do not propagate input levels forward before balancing
    #[arg(long)]
    no_propagate: bool,

    /// Keep reductions whose input and output levels are equal
    #[arg(long)]
    keep_noop: bool,

    /// Evaluate the circuit with an input value (repeatable)
    #[arg(long, value_name = "NAME=VALUE", value_parser = parse_assignment)]
    eval: Vec<(String, u64)>,

    /// Increase log verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn parse_assignment(text: &str) -> std::result::Result<(String, u64), String> {
    let (name, value) = text
        .split_once('=')
        .ok_or_else(|| format!("expected NAME=VALUE, got '{}'", text))?;
    let value = value
        .trim()
        .parse::<u64>()
        .map_err(|e| format!("invalid value for '{}': {}", name, e))?;
    Ok((name.trim().to_string(), value))
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("circuit_leveler={},leveler={}", level, level)));
    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    // Parse and build the circuit
    let ast = dsl::parse_file(&args.circuit_file)?;
    let built = builder::build_circuit(&ast)?;
    let mut graph = built.graph;
    validate_graph(&graph)?;

    // Balance
    let config = BalancerConfig::new()
        .with_propagate_inputs(!args.no_propagate)
        .with_collapse_noop_reductions(!args.keep_noop);
    let balancer = LevelBalancer::with_config(config);
    let report = match &args.root {
        Some(root) => balancer.balance_from(&mut graph, root)?,
        None => balancer.balance(&mut graph)?,
    };
    if args.root.is_none() {
        validate_levels(&graph)?;
    }
    eprintln!("{}", report);

    // Optional plaintext evaluation
    if !args.eval.is_empty() {
        let mut evaluator = PlaintextEvaluator::from_params(&built.params)?;
        let inputs: HashMap<String, u64> = args.eval.iter().cloned().collect();
        let values = evaluate(&graph, &mut evaluator, &inputs)?;
        for output in graph.outputs() {
            if let Some(value) = values.get(output) {
                eprintln!("{} = {}", output, value);
            }
        }
        annotate(&mut graph, &values)?;
    }

    // Render
    let dot = to_dot(&graph);
    match &args.dot {
        Some(path) => {
            std::fs::write(path, dot).map_err(|e| LevelerError::FileWriteError {
                path: path.display().to_string(),
                source: e,
            })?;
            info!(path = %path.display(), "wrote graph");
        }
        None => print!("{}", dot),
    }

    Ok(())
}
