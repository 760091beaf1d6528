//! Palettes command implementation

use std::process::ExitCode;

use super::{EXIT_ERROR, EXIT_INVALID_ARGS, EXIT_SUCCESS};
use crate::palette::{Palette, PALETTES};

/// Execute the palettes command
pub fn run_palettes(name: Option<&str>, json: bool) -> ExitCode {
    let selected: Vec<&Palette> = match name {
        Some(name) => match Palette::by_name(name) {
            Ok(p) => vec![p],
            Err(e) => {
                eprintln!("Error: {}", e);
                return ExitCode::from(EXIT_INVALID_ARGS);
            }
        },
        None => PALETTES.to_vec(),
    };

    if json {
        let value: Vec<serde_json::Value> = selected
            .iter()
            .map(|p| serde_json::json!({ "name": p.name.as_str(), "colors": p.hex_colors() }))
            .collect();
        return match serde_json::to_string_pretty(&value) {
            Ok(s) => {
                println!("{}", s);
                ExitCode::from(EXIT_SUCCESS)
            }
            Err(e) => {
                eprintln!("Error: {}", e);
                ExitCode::from(EXIT_ERROR)
            }
        };
    }

    for palette in selected {
        println!("{:<8} ({} colors)", palette.name.as_str(), palette.colors.len());
        println!("  {}", palette.hex_colors().join(" "));
    }
    ExitCode::from(EXIT_SUCCESS)
}
