//! Grid command implementation

use std::path::Path;
use std::process::ExitCode;

use super::convert::print_report;
use super::{resolve_options, StyleArgs, EXIT_ERROR, EXIT_INVALID_ARGS, EXIT_SUCCESS};
use crate::error::PipelineError;
use crate::pipeline::convert_grid;

/// Grid-only flags
#[derive(Debug, Default, Clone, Copy)]
pub struct GridArgs {
    pub rows: Option<u32>,
    pub columns: Option<u32>,
    pub jobs: Option<usize>,
    pub allow_remainder: bool,
}

/// Execute the grid command
pub fn run_grid(
    input: &Path,
    output: &Path,
    args: GridArgs,
    style: &StyleArgs,
    config: Option<&Path>,
) -> ExitCode {
    let mut overrides = match style.overrides() {
        Ok(o) => o,
        Err(code) => return code,
    };
    overrides.rows = args.rows;
    overrides.columns = args.columns;
    overrides.jobs = args.jobs;
    overrides.allow_remainder = args.allow_remainder.then_some(true);

    let options = match resolve_options(config, &overrides) {
        Ok(o) => o,
        Err(code) => return code,
    };

    let report = match convert_grid(input, output, &options) {
        Ok(r) => r,
        Err(e) => {
            eprintln!("Error: {}", e);
            return match e {
                PipelineError::InputNotFound { .. } | PipelineError::InvalidGridGeometry { .. } => {
                    ExitCode::from(EXIT_INVALID_ARGS)
                }
                _ => ExitCode::from(EXIT_ERROR),
            };
        }
    };

    for report in report.succeeded() {
        print_report(report);
    }

    let failures: Vec<_> = report.failed().collect();
    if failures.is_empty() {
        ExitCode::from(EXIT_SUCCESS)
    } else {
        for (_, e) in &failures {
            eprintln!("Error: {}", e);
        }
        eprintln!("{} of {} characters failed", failures.len(), report.results.len());
        ExitCode::from(EXIT_ERROR)
    }
}
