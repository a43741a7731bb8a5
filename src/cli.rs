//! CLI argument parsing for the ITP workflow.
//!
//! Commands map one-to-one onto workflow entry points; all policy lives in
//! the library modules.
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Root CLI entrypoint.
#[derive(Parser, Debug)]
#[command(
    name = "itp",
    version,
    about = "Intent to Proceed (ITP) workflow for mortgage borrower tables",
    after_help = "Commands:\n  filter --table <csv>           List borrowers ready for ITP processing\n  run [--table <csv>]            Extract, filter, and dispatch ready borrowers\n  escalate --loan-number <n> ... Send one manual human-review report\n  describe                       Show the capability catalog\n  init-config --out <path>       Write a default config.json\n\nExamples:\n  itp filter --table borrowers.csv\n  itp run --table borrowers.csv --thread-id station-7 --json\n  itp escalate --loan-number 1001 --borrower-name \"Jane Roe\" --message \"login failed\"",
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct RootArgs {
    /// Path to config.json (overrides ITP_CONFIG and the user config dir)
    #[arg(long, value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,

    /// Log at debug level unless RUST_LOG is set
    #[arg(long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// Top-level workflow commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    Filter(FilterArgs),
    Run(RunArgs),
    Escalate(EscalateArgs),
    Describe(DescribeArgs),
    InitConfig(InitConfigArgs),
}

#[derive(Parser, Debug)]
#[command(about = "Evaluate a borrower table and list ready borrowers")]
pub struct FilterArgs {
    /// Borrower table CSV (header row first)
    #[arg(long, value_name = "CSV")]
    pub table: PathBuf,

    /// Emit machine-readable JSON output
    #[arg(long)]
    pub json: bool,
}

/// Run command inputs for one full workflow pass.
#[derive(Parser, Debug)]
#[command(about = "Run the ITP workflow end to end")]
pub struct RunArgs {
    /// Read the borrower table from a file instead of the extraction capability
    #[arg(long, value_name = "CSV")]
    pub table: Option<PathBuf>,

    /// Run identity; also the station id shared by every dispatch
    #[arg(long, value_name = "ID")]
    pub thread_id: Option<String>,

    /// Emit machine-readable JSON output
    #[arg(long)]
    pub json: bool,

    /// Write the run summary JSON to this path
    #[arg(long, value_name = "PATH")]
    pub out: Option<PathBuf>,
}

#[derive(Parser, Debug)]
#[command(about = "Send a manual escalation report for human review")]
pub struct EscalateArgs {
    #[arg(long, value_name = "LOAN")]
    pub loan_number: String,

    #[arg(long, value_name = "NAME")]
    pub borrower_name: String,

    /// What went wrong
    #[arg(long)]
    pub message: String,

    /// Optional screenshot reference to attach
    #[arg(long, value_name = "REF")]
    pub screenshot: Option<String>,

    /// Run identity used as the correlation id
    #[arg(long, value_name = "ID")]
    pub thread_id: Option<String>,
}

#[derive(Parser, Debug)]
#[command(about = "Describe the workflow and its capabilities")]
pub struct DescribeArgs {
    /// Emit machine-readable JSON output
    #[arg(long)]
    pub json: bool,
}

#[derive(Parser, Debug)]
#[command(about = "Write a default config.json")]
pub struct InitConfigArgs {
    #[arg(long, value_name = "PATH")]
    pub out: PathBuf,

    /// Overwrite an existing file
    #[arg(long)]
    pub force: bool,
}
