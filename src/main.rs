//! Wirebench - DC circuit solver for breadboard-style circuits
//!
//! Loads an editor snapshot, solves it once and prints the result.
//!
//! # Usage
//!
//! ```bash
//! wirebench circuit.json
//! wirebench circuit.json --format json --max-short-current 5 -vv
//! ```

use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use wirebench_core::{
    components::DisplayState, error::Result, ChangeEvent, CircuitSnapshot, Measurement,
    Session, SolveResult, SolverConfig, WirebenchError,
};

/// Output format of the solve result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Format {
    /// Human-readable table
    Text,
    /// The full result as JSON
    Json,
}

/// DC circuit solver for breadboard-style circuits
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the circuit snapshot file (.json)
    #[arg(value_name = "SNAPSHOT_FILE")]
    snapshot_file: PathBuf,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = Format::Text)]
    format: Format,

    /// Current reported for a shorted battery, in amperes
    #[arg(long)]
    max_short_current: Option<f64>,

    /// Maximum LED switching passes
    #[arg(long)]
    max_iterations: Option<usize>,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let level = match args.verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();

    let mut config = SolverConfig::default();
    if let Some(amperes) = args.max_short_current {
        config = config.with_max_short_current(amperes);
    }
    if let Some(passes) = args.max_iterations {
        config = config.with_max_iterations(passes);
    }

    // Load the snapshot
    let snapshot = CircuitSnapshot::load(&args.snapshot_file)?;

    // Solve
    let session = Session::new(config)?;
    session.notify(&ChangeEvent::SnapshotLoaded, snapshot);
    let result = session.solve_pending();

    match args.format {
        Format::Json => {
            let json = serde_json::to_string_pretty(&*result)
                .map_err(|source| WirebenchError::SnapshotFormat { source })?;
            println!("{json}");
        }
        Format::Text => print_table(&result),
    }

    Ok(())
}

fn describe(display: &DisplayState) -> String {
    match display {
        DisplayState::Basic => String::new(),
        DisplayState::Lightbulb { brightness } => format!("brightness {:.0}%", brightness * 100.0),
        DisplayState::Led { brightness, lit } => format!(
            "{} brightness {:.0}%",
            if *lit { "lit" } else { "dark" },
            brightness * 100.0
        ),
        DisplayState::Potentiometer { ratio, .. } => format!("ratio {ratio:.2}"),
        DisplayState::Multimeter { reading, .. } => match reading {
            Measurement::Volts(v) => format!("reads {v:.4} V"),
            Measurement::Amps(a) => format!("reads {a:.4} A"),
            Measurement::Ohms(r) => format!("reads {r:.4} ohm"),
            Measurement::Open => "reads OL".to_string(),
            Measurement::Indeterminate => "reads ---".to_string(),
        },
        DisplayState::Board { pins, .. } => pins
            .iter()
            .filter_map(|p| p.voltage.map(|v| format!("{}={v:.2}V", p.pin)))
            .collect::<Vec<_>>()
            .join(" "),
        DisplayState::Sensor { powered: true } => "powered".to_string(),
        DisplayState::Sensor { powered: false } => "unpowered".to_string(),
        DisplayState::Unmodeled => "unmodeled".to_string(),
    }
}

fn print_table(result: &SolveResult) {
    println!(
        "{:<12} {:<24} {:>12} {:>12}  {}",
        "ID", "TYPE", "VOLTAGE (V)", "CURRENT (A)", "STATE"
    );
    for element in &result.elements {
        let mut state = describe(&element.display);
        for (flag, name) in [
            (element.flags.shorted, "SHORTED"),
            (element.flags.indeterminate, "INDETERMINATE"),
        ] {
            if flag {
                state.push_str(if state.is_empty() { "" } else { " " });
                state.push_str(name);
            }
        }
        println!(
            "{:<12} {:<24} {:>12.6} {:>12.6}  {}",
            element.id.as_str(),
            element.kind.as_str(),
            element.voltage,
            element.current,
            state
        );
    }
    if !result.converged {
        println!("warning: LED states did not settle after {} passes", result.iterations);
    }
    for warning in &result.warnings {
        println!("warning: {warning}");
    }
}
