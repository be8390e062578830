//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - parses CLI arguments
//! - sets up logging
//! - loads spectra and starts an assignment session (interactive)
//! - runs one-off fits, lookups and synthetic data generation
//! - prints reports/plots and writes optional exports

use std::fs::OpenOptions;
use std::path::Path;

use clap::Parser;

use crate::cli::{AssignArgs, Command, FitArgs, LookupArgs, SynthArgs};
use crate::domain::{LineTable, SpectralSeries};
use crate::error::AppError;
use crate::io::{read_line_table, read_series, SpectrumStore};
use crate::math::index_range;

pub mod session;

pub use session::*;

/// Entry point for the `rova` binary.
pub fn run() -> Result<(), AppError> {
    // `rova` and `rova exp.csv high calc.csv stick` behave like `rova assign ...`.
    //
    // Clap requires a subcommand name, so we rewrite argv before parsing.
    let argv = rewrite_args(std::env::args().collect());
    let cli = crate::cli::Cli::parse_from(argv);

    match cli.command {
        Command::Assign(args) => handle_assign(args),
        Command::Fit(args) => {
            init_stderr_logging();
            handle_fit(args)
        }
        Command::Lookup(args) => {
            init_stderr_logging();
            handle_lookup(args)
        }
        Command::Synth(args) => {
            init_stderr_logging();
            handle_synth(args)
        }
    }
}

fn handle_assign(args: AssignArgs) -> Result<(), AppError> {
    let config = args.resolve()?;
    init_file_logging(&args.log_file)?;

    let store = SpectrumStore::load(&config)?;
    let session = AssignmentSession::new(store, &config);
    crate::tui::run(session, config)
}

fn handle_fit(args: FitArgs) -> Result<(), AppError> {
    let series = read_series(&args.exp, args.delimiter)?;
    let store = SpectrumStore::from_parts(series, SpectralSeries::default(), LineTable::default());

    let (xmin, xmax) = (args.xmin.min(args.xmax), args.xmin.max(args.xmax));
    let (x, y) = store.experimental_window(xmin, xmax)?;
    let fit = crate::fit::fit_line_profile(x, y)?;
    log::info!("fitted {} samples in {} iterations", fit.x.len(), fit.iterations);

    println!("{}", crate::report::format_fit_report(&fit, &args.exp));

    if args.plot {
        println!("{}", crate::plot::render_fit_plot(&fit, args.width, args.height));
    }

    if let Some(path) = &args.export_fit {
        crate::io::write_fit_json(path, &args.exp, xmin, xmax, &fit)?;
        log::info!("wrote {}", path.display());
    }

    Ok(())
}

fn handle_lookup(args: LookupArgs) -> Result<(), AppError> {
    let table = read_line_table(&args.calc, args.delimiter)?;
    let table = match &args.exp {
        Some(exp) => {
            let series = read_series(exp, args.delimiter)?;
            SpectrumStore::from_parts(series, SpectralSeries::default(), table).lines
        }
        None => table,
    };

    let (xmin, xmax) = (args.xmin.min(args.xmax), args.xmin.max(args.xmax));
    let range = index_range(&table.positions, xmin, xmax)?;
    let record = &table.records[range.start];

    println!(
        "{}",
        crate::report::format_line_record(&table, record, range.start, range.len())
    );
    Ok(())
}

fn handle_synth(args: SynthArgs) -> Result<(), AppError> {
    let options = crate::data::SynthOptions {
        seed: args.seed,
        lines: args.lines,
        kind: args.kind,
        ..crate::data::SynthOptions::default()
    };
    let written = crate::data::write_synthetic(&args.out_dir, &options)?;
    for path in &written.files {
        println!("wrote {}", path.display());
    }
    Ok(())
}

/// Non-interactive commands log to stderr.
fn init_stderr_logging() {
    // Repeated initialisation (e.g. from tests) is harmless.
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).try_init();
}

/// The terminal UI owns the screen, so its log goes to a file.
fn init_file_logging(path: &Path) -> Result<(), AppError> {
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| AppError::new(2, format!("Failed to open log file '{}': {e}", path.display())))?;

    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Pipe(Box::new(file)))
        .try_init();
    Ok(())
}

/// Rewrite argv so `rova` defaults to `rova assign`.
///
/// Rules:
/// - `rova`                        -> `rova assign`
/// - `rova exp.csv high ...`       -> `rova assign exp.csv high ...`
/// - `rova --assignments out.txt`  -> `rova assign --assignments out.txt`
/// - `rova --help/--version/-h`    -> unchanged (show top-level help/version)
fn rewrite_args(mut argv: Vec<String>) -> Vec<String> {
    let Some(arg1) = argv.get(1).cloned() else {
        argv.push("assign".to_string());
        return argv;
    };

    let is_top_level_help_or_version = matches!(arg1.as_str(), "-h" | "--help" | "-V" | "--version" | "help");
    if is_top_level_help_or_version {
        return argv;
    }

    let is_subcommand = matches!(arg1.as_str(), "assign" | "fit" | "lookup" | "synth");
    if is_subcommand {
        return argv;
    }

    argv.insert(1, "assign".to_string());
    argv
}

#[cfg(test)]
mod tests {
    use super::*;

    fn argv(args: &[&str]) -> Vec<String> {
        args.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn bare_invocation_launches_assign() {
        assert_eq!(rewrite_args(argv(&["rova"])), argv(&["rova", "assign"]));
    }

    #[test]
    fn positional_inputs_launch_assign() {
        assert_eq!(
            rewrite_args(argv(&["rova", "e.csv", "high", "c.csv", "stick"])),
            argv(&["rova", "assign", "e.csv", "high", "c.csv", "stick"])
        );
        assert_eq!(
            rewrite_args(argv(&["rova", "--delimiter", ";"])),
            argv(&["rova", "assign", "--delimiter", ";"])
        );
    }

    #[test]
    fn subcommands_and_help_pass_through() {
        assert_eq!(rewrite_args(argv(&["rova", "fit", "--exp", "e.csv"]))[1], "fit");
        assert_eq!(rewrite_args(argv(&["rova", "--help"])), argv(&["rova", "--help"]));
    }

    #[test]
    fn reversed_fit_window_exports_ordered_bounds() {
        let dir = tempfile::tempdir().unwrap();
        let exp = dir.path().join("exp.csv");
        let mut text = String::from("nu,I\n");
        for i in 0..=80 {
            let x = 14.0 + i as f64 * 0.025;
            let y = 1.0 + 4.0 * (-(x - 15.0_f64).powi(2) / (2.0 * 0.2_f64.powi(2))).exp();
            text.push_str(&format!("{x:.3},{y}\n"));
        }
        std::fs::write(&exp, text).unwrap();

        let json = dir.path().join("fit.json");
        handle_fit(FitArgs {
            exp,
            xmin: 15.8,
            xmax: 14.2,
            plot: false,
            width: 100,
            height: 25,
            export_fit: Some(json.clone()),
            delimiter: crate::domain::Delimiter::COMMA,
        })
        .unwrap();

        let doc: crate::io::FitFile = serde_json::from_str(&std::fs::read_to_string(&json).unwrap()).unwrap();
        assert_eq!((doc.xmin, doc.xmax), (14.2, 15.8));
        assert_eq!(doc.grid.x.first(), Some(&14.2));
        assert!((doc.grid.x[doc.grid.x.len() - 1] - 15.8).abs() < 1e-12);
    }
}
