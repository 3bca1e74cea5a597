//! todo-probe CLI library
//!
//! Command-line front end for the todo-probe regression suite: flag parsing,
//! configuration layering, log setup, the concurrent suite runner and
//! progress output.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]

mod commands;
mod config;
mod error;
pub mod logging;
mod output;
mod runner;

pub use commands::{Cli, ColorArg, Commands, ConfigArgs, ListArgs, RunArgs};
pub use config::{resolve_probe_config, CliConfig, ColorChoice, ProbeOverrides, Verbosity};
pub use error::{CliError, CliResult};
pub use logging::LogFormat;
pub use output::{OutputFormat, ProgressReporter};
pub use runner::{select_cases, CaseResult, CaseStatus, RunReport, SuiteRunner};

impl From<&RunArgs> for ProbeOverrides {
    fn from(args: &RunArgs) -> Self {
        Self {
            base_url: args.base_url.clone(),
            headed: args.headed,
            slow_mo_ms: args.slow_mo,
            chromium_path: args.chromium.clone(),
            no_sandbox: args.no_sandbox,
        }
    }
}

impl From<&ConfigArgs> for ProbeOverrides {
    fn from(args: &ConfigArgs) -> Self {
        Self {
            base_url: args.base_url.clone(),
            ..Self::default()
        }
    }
}
