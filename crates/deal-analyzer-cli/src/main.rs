mod commands;
mod input;
mod logging;
mod output;

use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::process;

use commands::deal::{DealArgs, PropertyArgs};
use commands::sensitivity::SensitivityArgs;

/// Real-estate deal pro-formas and sensitivity analysis
#[derive(Parser)]
#[command(
    name = "deal-analyzer",
    version,
    about = "Real-estate deal pro-formas and sensitivity analysis",
    long_about = "Builds a multi-year pro-forma for a single real-estate acquisition \
                  (financing, first-year operations, NOI projection, sale and tax, \
                  investor/sponsor waterfall) with decimal precision, and runs \
                  one-variable-at-a-time Monte Carlo sensitivity analysis over it."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(long, default_value = "json", global = true)]
    output: OutputFormat,

    /// Log more (-v info, -vv debug). RUST_LOG overrides
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Full deal pro-forma with investor/sponsor waterfall and IRRs
    Deal(DealArgs),
    /// Financing, first-year operations and exit value only
    Property(PropertyArgs),
    /// Perturb variables one at a time and collect the IRR distribution
    Sensitivity(SensitivityArgs),
    /// List the variables accepted by `sensitivity --variables`
    Variables,
    /// Print version information
    Version,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Csv,
    Minimal,
}

fn main() {
    let cli = Cli::parse();
    logging::init_logging(cli.verbose);

    let result: Result<serde_json::Value, Box<dyn std::error::Error>> = match cli.command {
        Commands::Deal(args) => commands::deal::run_deal(args),
        Commands::Property(args) => commands::deal::run_property(args),
        Commands::Sensitivity(args) => commands::sensitivity::run_sensitivity_command(args),
        Commands::Variables => Ok(commands::sensitivity::list_variables()),
        Commands::Version => {
            println!("deal-analyzer {}", env!("CARGO_PKG_VERSION"));
            return;
        }
    };

    match result {
        Ok(value) => {
            output::format_output(&cli.output, &value);
            process::exit(0);
        }
        Err(e) => {
            tracing::debug!(error = %e, "command failed");
            eprintln!("{}: {}", "error".red().bold(), e);
            process::exit(1);
        }
    }
}
