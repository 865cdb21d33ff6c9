use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

mod commands;
mod config;
mod error;

use config::Config;
use error::{print_error_and_exit, CliError};

#[derive(Parser)]
#[command(name = "chromaplot")]
#[command(about = "Chromaplot - RGB chromaticity diagrams for colours and images")]
#[command(version)]
#[command(long_about = "
Chromaplot projects a single RGB colour or every pixel of an image onto a
CIE chromaticity diagram and exports the figure as SVG or PNG.

Examples:
  chromaplot plot --color '0.5, 0.2, 0.1' --out colour.svg
  chromaplot plot --image photo.exr --colorspace ACEScg --method cie1931 --out photo.png
  chromaplot plot --image photo.png --overlay 'ITU-R BT.2020=#9C27B0' --out gamut.svg
  chromaplot convert '#FF8000' --format hexadecimal --to 'Display P3'
  chromaplot colorspaces --details
")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Configuration file path
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Number of threads to use
    #[arg(short, long, global = true)]
    pub threads: Option<usize>,

    /// Verbose output
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Quiet mode (suppress non-error output)
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Plot a colour or an image on a chromaticity diagram
    Plot(commands::plot::PlotArgs),

    /// List the available colorspaces
    Colorspaces {
        /// Also print primaries, whitepoint and transfer function
        #[arg(long)]
        details: bool,
    },

    /// Convert a colour string from one colorspace to another
    Convert {
        /// Colour value, e.g. '0.5, 0.5, 0.5', '128 64 0' or '#FF8000'
        value: String,

        /// Format of the input value
        #[arg(long, default_value = "float_d4")]
        format: String,

        /// Colorspace the value is expressed in
        #[arg(long, default_value = "sRGB")]
        from: String,

        /// Target colorspace
        #[arg(long)]
        to: String,

        /// Format of the output value (defaults to the input format)
        #[arg(long)]
        output_format: Option<String>,
    },

    /// Print or write the configuration file
    Config {
        /// Print an example configuration with every default
        #[arg(long)]
        example: bool,

        /// Write the effective configuration to this file
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExportFormat {
    Svg,
    Png,
}

fn setup_logging(verbose: u8, quiet: bool) -> Result<()> {
    let level = if quiet {
        "error"
    } else {
        match verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .try_init()
        .context("Failed to initialize logging")?;

    Ok(())
}

fn run(cli: Cli) -> Result<()> {
    // Setup logging
    setup_logging(cli.verbose, cli.quiet)?;

    // Load configuration
    let config = Config::load(cli.config.as_deref())?;

    // Set global thread count if specified
    if let Some(threads) = cli.threads.or(config.general.threads) {
        rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build_global()
            .context("Failed to set thread count")?;
    }

    // Execute the requested command
    match cli.command {
        Commands::Plot(args) => commands::plot::execute(&config, args),
        Commands::Colorspaces { details } => commands::colorspaces::execute(details),
        Commands::Convert {
            value,
            format,
            from,
            to,
            output_format,
        } => commands::convert::execute(&value, &format, &from, &to, output_format.as_deref()),
        Commands::Config { example, output } => {
            if example {
                print!("{}", Config::example_toml()?);
            } else if let Some(path) = output {
                config.save_to_file(&path)?;
                log::info!("Wrote configuration to {}", path.display());
            } else {
                print!("{}", config.to_toml()?);
            }
            Ok(())
        }
    }
}

fn main() {
    let cli = Cli::parse();

    if let Err(err) = run(cli) {
        match err.downcast_ref::<CliError>() {
            Some(cli_error) => print_error_and_exit(cli_error),
            None => {
                eprintln!("Error: {:#}", err);
                std::process::exit(1);
            }
        }
    }
}
