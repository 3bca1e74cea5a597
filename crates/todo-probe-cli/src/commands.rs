//! CLI command definitions using clap

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::logging::LogFormat;
use crate::output::OutputFormat;

/// todo-probe: end-to-end regression suite for the React Cool Todo App
#[derive(Parser, Debug)]
#[command(name = "todo-probe")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Quiet mode (suppress non-error output)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Color output (auto, always, never)
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorArg,

    /// Log line format on stderr
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Subcommand to run
    #[command(subcommand)]
    pub command: Commands,
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the regression suite against a deployment
    Run(RunArgs),

    /// List the regression cases
    List(ListArgs),

    /// Show the effective configuration as YAML
    Config(ConfigArgs),
}

/// Arguments for the run command
#[derive(Parser, Debug)]
#[allow(clippy::struct_excessive_bools)]
pub struct RunArgs {
    /// Base URL of the deployment under test
    #[arg(long)]
    pub base_url: Option<String>,

    /// Show the browser window
    #[arg(long)]
    pub headed: bool,

    /// Delay before every browser action, in milliseconds
    #[arg(long, value_name = "MS")]
    pub slow_mo: Option<u64>,

    /// Path to the chromium binary
    #[arg(long)]
    pub chromium: Option<String>,

    /// Disable the chromium sandbox (containers, CI)
    #[arg(long)]
    pub no_sandbox: bool,

    /// Only run cases whose id or description contains this text
    #[arg(short, long)]
    pub filter: Option<String>,

    /// Number of cases to run at once, each in its own browser context
    #[arg(short = 'j', long, default_value = "1")]
    pub jobs: usize,

    /// Stop scheduling cases after the first failure
    #[arg(long)]
    pub fail_fast: bool,

    /// Directory for failure screenshots
    #[arg(short, long, default_value = "target/todo-probe")]
    pub output: PathBuf,

    /// Result format on stdout
    #[arg(long, default_value = "text")]
    pub format: OutputFormat,

    /// YAML configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,
}

/// Arguments for the list command
#[derive(Parser, Debug)]
pub struct ListArgs {
    /// Only list cases whose id or description contains this text
    #[arg(short, long)]
    pub filter: Option<String>,
}

/// Arguments for the config command
#[derive(Parser, Debug)]
pub struct ConfigArgs {
    /// YAML configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Base URL override
    #[arg(long)]
    pub base_url: Option<String>,
}

/// Color argument for CLI
#[derive(ValueEnum, Clone, Debug, Default)]
pub enum ColorArg {
    /// Automatic color detection
    #[default]
    Auto,
    /// Always use colors
    Always,
    /// Never use colors
    Never,
}

impl From<ColorArg> for crate::config::ColorChoice {
    fn from(arg: ColorArg) -> Self {
        match arg {
            ColorArg::Auto => Self::Auto,
            ColorArg::Always => Self::Always,
            ColorArg::Never => Self::Never,
        }
    }
}
