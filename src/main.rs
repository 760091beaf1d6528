//! Pixelwalk - Command-line tool for converting character art into walk-cycle sprite sheets

use std::process::ExitCode;

use pixelwalk::cli;

fn main() -> ExitCode {
    cli::run()
}
