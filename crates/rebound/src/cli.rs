//! CLI argument definitions

use camino::Utf8PathBuf;
use clap::{Args, Parser, Subcommand, ValueEnum};
use rebound_core::retry::BackoffStrategy;

#[derive(Parser, Debug)]
#[command(name = "rebound")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Settings file (default: ~/.rebound/retry.yaml)
    #[arg(short, long, global = true)]
    pub config: Option<Utf8PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Print the delay schedule an engine produces for repeated failures
    Simulate(SimulateArgs),

    /// Retry a synthetic operation that fails a given number of times
    Run(RunArgs),

    /// Parse retry-related HTTP headers
    #[command(subcommand)]
    Header(HeaderCommands),

    /// Settings management
    #[command(subcommand)]
    Config(ConfigCommands),
}

/// Decision engine to drive
#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Engine {
    /// Attempt scope builder with a pluggable strategy
    #[default]
    Pattern,
    /// Flat backoff decision function
    Backoff,
    /// Backoff decision function with the HTTP policy layered on
    Http,
}

// ============================================================================
// Simulate Command
// ============================================================================

#[derive(Args, Debug)]
pub struct SimulateArgs {
    /// Engine to simulate
    #[arg(short, long, value_enum, default_value_t = Engine::Pattern)]
    pub engine: Engine,

    /// Delay strategy (pattern engine only)
    #[arg(short, long)]
    pub strategy: Option<BackoffStrategy>,

    /// Named operation whose pattern overrides apply
    #[arg(long)]
    pub operation: Option<String>,

    /// Pin the random source to this value in [0, 1)
    #[arg(short, long)]
    pub random: Option<f64>,

    /// Stop after this many failures even if the engine would keep retrying
    #[arg(long, default_value_t = 20)]
    pub limit: u32,

    /// Status code of the simulated HTTP failure (0 for a network error)
    #[arg(long, default_value_t = 503)]
    pub status: u16,

    /// Retry-After header of the simulated HTTP failure
    #[arg(long)]
    pub retry_after: Option<String>,

    /// Keep-Alive header of the simulated HTTP failure
    #[arg(long)]
    pub keep_alive: Option<String>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

// ============================================================================
// Run Command
// ============================================================================

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Engine to drive
    #[arg(short, long, value_enum, default_value_t = Engine::Pattern)]
    pub engine: Engine,

    /// Number of times the operation fails before it succeeds
    #[arg(short, long, default_value_t = 2)]
    pub failures: u32,

    /// Delay strategy (pattern engine only)
    #[arg(short, long)]
    pub strategy: Option<BackoffStrategy>,

    /// Named operation whose pattern overrides apply
    #[arg(long)]
    pub operation: Option<String>,

    /// Pin the random source to this value in [0, 1)
    #[arg(short, long)]
    pub random: Option<f64>,

    /// Status code of the simulated HTTP failure (0 for a network error)
    #[arg(long, default_value_t = 503)]
    pub status: u16,

    /// HTTP method of the simulated request
    #[arg(long, default_value = "GET")]
    pub method: String,
}

// ============================================================================
// Header Commands
// ============================================================================

#[derive(Subcommand, Debug)]
pub enum HeaderCommands {
    /// Parse a Retry-After value into milliseconds
    RetryAfter(RetryAfterArgs),

    /// Parse a Keep-Alive value into its timeout in milliseconds
    KeepAlive(KeepAliveArgs),
}

#[derive(Args, Debug)]
pub struct RetryAfterArgs {
    /// Header value: seconds or an HTTP date
    pub value: String,

    /// Reference time as RFC 3339 (default: now)
    #[arg(long)]
    pub now: Option<String>,
}

#[derive(Args, Debug)]
pub struct KeepAliveArgs {
    /// Header value, e.g. "timeout=5, max=1000"
    pub value: String,
}

// ============================================================================
// Config Commands
// ============================================================================

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Show the effective settings
    Show(ConfigShowArgs),

    /// Print the settings file location
    Path,
}

#[derive(Args, Debug)]
pub struct ConfigShowArgs {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}
