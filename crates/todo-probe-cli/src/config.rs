//! CLI configuration

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use todo_probe::ProbeConfig;

use crate::error::CliResult;

/// CLI verbosity level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Verbosity {
    /// Quiet - failures only
    Quiet,
    /// Normal - default output
    #[default]
    Normal,
    /// Verbose - scenario lifecycle logs
    Verbose,
    /// Debug - every page-object step
    Debug,
}

impl Verbosity {
    /// From the `-q` flag and `-v` count
    #[must_use]
    pub const fn from_flags(quiet: bool, verbose: u8) -> Self {
        if quiet {
            return Self::Quiet;
        }
        match verbose {
            0 => Self::Normal,
            1 => Self::Verbose,
            _ => Self::Debug,
        }
    }

    /// Check if quiet mode
    #[must_use]
    pub const fn is_quiet(self) -> bool {
        matches!(self, Self::Quiet)
    }

    /// Check if verbose or higher
    #[must_use]
    pub const fn is_verbose(self) -> bool {
        matches!(self, Self::Verbose | Self::Debug)
    }

    /// Default log filter when `RUST_LOG` is unset
    #[must_use]
    pub const fn log_filter(self) -> &'static str {
        match self {
            Self::Quiet => "error",
            Self::Normal => "warn",
            Self::Verbose => "info",
            Self::Debug => "debug",
        }
    }
}

/// Color output choice
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ColorChoice {
    /// Always use colors
    Always,
    /// Use colors when output is a terminal
    #[default]
    Auto,
    /// Never use colors
    Never,
}

impl ColorChoice {
    /// Should use colors based on output detection
    #[must_use]
    pub fn should_color(self) -> bool {
        match self {
            Self::Always => true,
            Self::Never => false,
            Self::Auto => std::io::IsTerminal::is_terminal(&std::io::stderr()),
        }
    }
}

/// How a run is executed and reported
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CliConfig {
    /// Verbosity level
    pub verbosity: Verbosity,
    /// Color output choice
    pub color: ColorChoice,
    /// Cases in flight at once
    pub jobs: usize,
    /// Stop scheduling cases after the first failure
    pub fail_fast: bool,
    /// Failure screenshot directory
    pub output_dir: Option<PathBuf>,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            verbosity: Verbosity::Normal,
            color: ColorChoice::Auto,
            jobs: 1,
            fail_fast: false,
            output_dir: None,
        }
    }
}

impl CliConfig {
    /// Create new default configuration
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set verbosity
    #[must_use]
    pub const fn with_verbosity(mut self, verbosity: Verbosity) -> Self {
        self.verbosity = verbosity;
        self
    }

    /// Set color choice
    #[must_use]
    pub const fn with_color(mut self, color: ColorChoice) -> Self {
        self.color = color;
        self
    }

    /// Set the number of concurrent cases; zero counts as one
    #[must_use]
    pub fn with_jobs(mut self, jobs: usize) -> Self {
        self.jobs = jobs.max(1);
        self
    }

    /// Set fail fast
    #[must_use]
    pub const fn with_fail_fast(mut self, fail_fast: bool) -> Self {
        self.fail_fast = fail_fast;
        self
    }

    /// Set the failure screenshot directory
    #[must_use]
    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = Some(dir.into());
        self
    }
}

/// Command-line overrides, the last configuration layer
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProbeOverrides {
    /// `--base-url`
    pub base_url: Option<String>,
    /// `--headed`
    pub headed: bool,
    /// `--slow-mo`
    pub slow_mo_ms: Option<u64>,
    /// `--chromium`
    pub chromium_path: Option<String>,
    /// `--no-sandbox`
    pub no_sandbox: bool,
}

impl ProbeOverrides {
    /// Overlay onto `config`; unset flags leave it alone
    pub fn apply(&self, config: &mut ProbeConfig) {
        if let Some(url) = &self.base_url {
            *config = std::mem::take(config).with_base_url(url);
        }
        if self.headed {
            config.browser.headless = false;
        }
        if let Some(slow_mo) = self.slow_mo_ms {
            config.browser.slow_mo_ms = slow_mo;
        }
        if let Some(path) = &self.chromium_path {
            config.browser.chromium_path = Some(path.clone());
        }
        if self.no_sandbox {
            config.browser.sandbox = false;
        }
    }
}

/// Defaults, then `file`, then the environment, then `overrides`
pub fn resolve_probe_config(
    file: Option<&Path>,
    overrides: &ProbeOverrides,
) -> CliResult<ProbeConfig> {
    let mut config = ProbeConfig::load(file)?;
    overrides.apply(&mut config);
    config.validate()?;
    Ok(config)
}
