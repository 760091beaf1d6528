//! Align command implementation

use std::path::Path;
use std::process::ExitCode;

use super::{EXIT_ERROR, EXIT_INVALID_ARGS, EXIT_SUCCESS};
use crate::align::{correct_all, correct_character_dir, ensure_has_frames, AlignOptions, AlignmentReport};
use crate::config::loader::load_config;

/// Execute the align command
pub fn run_align(dir: &Path, all: bool, dry_run: bool, config: Option<&Path>) -> ExitCode {
    if !dir.is_dir() {
        eprintln!("Error: Directory not found: {}", dir.display());
        return ExitCode::from(EXIT_INVALID_ARGS);
    }

    let pretty = match load_config(config) {
        Ok(cfg) => cfg.output.pretty,
        Err(e) => {
            eprintln!("Error loading config: {}", e);
            return ExitCode::from(EXIT_INVALID_ARGS);
        }
    };
    let options = AlignOptions { dry_run, pretty };

    if !all {
        if let Err(e) = ensure_has_frames(dir) {
            eprintln!("Error: {}", e);
            eprintln!("Use --all to process every character directory below it");
            return ExitCode::from(EXIT_INVALID_ARGS);
        }
        return match correct_character_dir(dir, options) {
            Ok(report) => {
                print_report(&report, dry_run);
                ExitCode::from(EXIT_SUCCESS)
            }
            Err(e) => {
                eprintln!("Error: {}", e);
                ExitCode::from(EXIT_ERROR)
            }
        };
    }

    let results = match correct_all(dir, options) {
        Ok(r) => r,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::from(EXIT_ERROR);
        }
    };

    let mut failed = 0;
    for (path, result) in &results {
        match result {
            Ok(report) => print_report(report, dry_run),
            Err(e) => {
                failed += 1;
                eprintln!("Error: {}: {}", path.display(), e);
            }
        }
    }

    if failed > 0 {
        eprintln!("{} of {} directories failed", failed, results.len());
        ExitCode::from(EXIT_ERROR)
    } else {
        ExitCode::from(EXIT_SUCCESS)
    }
}

fn print_report(report: &AlignmentReport, dry_run: bool) {
    let verb = if dry_run { "would shift" } else { "shifted" };
    println!("{}: {} {} frame(s)", report.character, verb, report.shifted_frames());
    for (direction, shifts) in &report.shifts {
        if shifts.iter().any(|&s| s > 0) {
            let baseline = report.baselines.get(direction).copied().unwrap_or_default();
            println!("  {:<5} baseline {:>3}  shifts {:?}", direction.as_str(), baseline, shifts);
        }
    }
    for warning in &report.warnings {
        println!("  warning: {}", warning);
    }
}
