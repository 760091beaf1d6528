//! Command-line interface implementation
//!
//! This module provides the CLI entry point and dispatches to submodules
//! for specific command implementations.

mod align;
mod convert;
mod grid;
mod palettes;

use clap::{ArgAction, Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::config::loader::{load_config, merge_cli_overrides, pipeline_options, CliOverrides};
use crate::palette::PaletteName;
use crate::pipeline::PipelineOptions;
use crate::pose::GaitKind;

/// Exit codes
pub(crate) const EXIT_SUCCESS: u8 = 0;
pub(crate) const EXIT_ERROR: u8 = 1;
pub(crate) const EXIT_INVALID_ARGS: u8 = 2;

/// Default output directory when `-o` is omitted
pub(crate) const DEFAULT_OUTPUT_DIR: &str = "output";

/// Pixelwalk - Turn character portraits into walk-cycle sprite sheets
#[derive(Parser)]
#[command(name = "pxw")]
#[command(about = "Pixelwalk - Turn character portraits into walk-cycle sprite sheets")]
#[command(version)]
pub struct Cli {
    /// More log output (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Only log errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Use this pxw.toml instead of searching for one
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Convert a single character image into walk frames and a sprite sheet
    Convert {
        /// Source image of one character
        input: PathBuf,

        /// Output root; files go to {output}/{name}/
        #[arg(short, long, default_value = DEFAULT_OUTPUT_DIR)]
        output: PathBuf,

        /// Character name (default: input file stem)
        #[arg(long)]
        name: Option<String>,

        #[command(flatten)]
        style: StyleArgs,
    },

    /// Split a composite grid image and convert every character in it
    Grid {
        /// Composite source image
        input: PathBuf,

        /// Output root; files go to {output}/{stem}-char{n}/
        #[arg(short, long, default_value = DEFAULT_OUTPUT_DIR)]
        output: PathBuf,

        /// Grid rows (default: 2)
        #[arg(long)]
        rows: Option<u32>,

        /// Grid columns (default: 3)
        #[arg(long)]
        columns: Option<u32>,

        /// Worker threads (default: available parallelism)
        #[arg(short, long)]
        jobs: Option<usize>,

        /// Discard right/bottom pixels that don't divide evenly
        #[arg(long)]
        allow_remainder: bool,

        #[command(flatten)]
        style: StyleArgs,
    },

    /// Fix baseline drift in persisted walk frames and regenerate the sheet
    Align {
        /// Character directory, or output root with --all
        dir: PathBuf,

        /// Process every character directory below DIR
        #[arg(long)]
        all: bool,

        /// Report shifts without writing
        #[arg(long)]
        dry_run: bool,
    },

    /// List the canonical palettes
    Palettes {
        /// Only show this palette
        name: Option<String>,

        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },
}

/// Conversion flags shared by `convert` and `grid`
#[derive(clap::Args, Debug, Default)]
pub struct StyleArgs {
    /// Fixed palette: warm, cool, tech, rainbow, shiba (default: auto-select)
    #[arg(short, long)]
    pub palette: Option<String>,

    /// Frames per direction (default: 4)
    #[arg(long)]
    pub frames: Option<usize>,

    /// Walk cycle strategy
    #[arg(long, value_enum)]
    pub gait: Option<GaitKind>,

    /// Align frame baselines before writing
    #[arg(long)]
    pub align: bool,

    /// Also write {name}-preview.png upscaled by this factor
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..=16))]
    pub preview_scale: Option<u32>,
}

impl StyleArgs {
    /// Overrides for the style flags; `Err` carries the exit code for a bad
    /// palette name.
    fn overrides(&self) -> Result<CliOverrides, ExitCode> {
        let palette = match &self.palette {
            Some(name) => match name.parse::<PaletteName>() {
                Ok(p) => Some(p),
                Err(e) => {
                    eprintln!("Error: {}", e);
                    return Err(ExitCode::from(EXIT_INVALID_ARGS));
                }
            },
            None => None,
        };

        Ok(CliOverrides {
            palette,
            frames: self.frames,
            gait: self.gait,
            align: self.align.then_some(true),
            preview_scale: self.preview_scale,
            ..Default::default()
        })
    }
}

/// Install the stderr log subscriber.
///
/// `RUST_LOG` wins over the verbosity flags.
fn init_logging(verbose: u8, quiet: bool) {
    let default_directive = if quiet {
        "pixelwalk=error"
    } else {
        match verbose {
            0 => "pixelwalk=info",
            1 => "pixelwalk=debug",
            _ => "pixelwalk=trace",
        }
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));

    // A subscriber may already be installed when embedded
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .try_init();
}

/// Load config (explicit path or discovered), apply overrides, and build
/// pipeline options.
pub(crate) fn resolve_options(
    config_path: Option<&Path>,
    overrides: &CliOverrides,
) -> Result<PipelineOptions, ExitCode> {
    let mut config = match load_config(config_path) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Error loading config: {}", e);
            return Err(ExitCode::from(EXIT_INVALID_ARGS));
        }
    };
    merge_cli_overrides(&mut config, overrides);

    pipeline_options(&config).map_err(|e| {
        eprintln!("Error: {}", e);
        ExitCode::from(EXIT_INVALID_ARGS)
    })
}

/// Run the CLI application
pub fn run() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);
    let config = cli.config.as_deref();

    match cli.command {
        Commands::Convert { input, output, name, style } => {
            convert::run_convert(&input, &output, name.as_deref(), &style, config)
        }
        Commands::Grid { input, output, rows, columns, jobs, allow_remainder, style } => {
            grid::run_grid(
                &input,
                &output,
                grid::GridArgs { rows, columns, jobs, allow_remainder },
                &style,
                config,
            )
        }
        Commands::Align { dir, all, dry_run } => align::run_align(&dir, all, dry_run, config),
        Commands::Palettes { name, json } => palettes::run_palettes(name.as_deref(), json),
    }
}
