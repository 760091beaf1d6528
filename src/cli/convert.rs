//! Convert command implementation

use std::path::Path;
use std::process::ExitCode;

use super::{resolve_options, StyleArgs, EXIT_ERROR, EXIT_INVALID_ARGS, EXIT_SUCCESS};
use crate::pipeline::{convert_character, CharacterReport};

/// Execute the convert command
pub fn run_convert(
    input: &Path,
    output: &Path,
    name: Option<&str>,
    style: &StyleArgs,
    config: Option<&Path>,
) -> ExitCode {
    let overrides = match style.overrides() {
        Ok(o) => o,
        Err(code) => return code,
    };
    let options = match resolve_options(config, &overrides) {
        Ok(o) => o,
        Err(code) => return code,
    };

    match convert_character(input, output, name, &options) {
        Ok(report) => {
            print_report(&report);
            ExitCode::from(EXIT_SUCCESS)
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            if e.is_input_error() {
                ExitCode::from(EXIT_INVALID_ARGS)
            } else {
                ExitCode::from(EXIT_ERROR)
            }
        }
    }
}

/// One summary line per character on stdout.
pub(crate) fn print_report(report: &CharacterReport) {
    let reason = report.reason.map(|r| format!(" ({})", r)).unwrap_or_default();
    println!(
        "{}: {} palette{}, {} frames -> {}",
        report.name,
        report.palette,
        reason,
        report.files.frames.len(),
        report.dir.display()
    );
    if let Some(alignment) = &report.alignment {
        if !alignment.is_noop() {
            println!("  aligned {} frame(s)", alignment.shifted_frames());
        }
    }
}
