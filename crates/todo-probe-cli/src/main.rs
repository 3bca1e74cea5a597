//! todo-probe CLI: end-to-end regression suite for the React Cool Todo App
//!
//! ## Usage
//!
//! ```bash
//! todo-probe run                                  # Whole suite, headless
//! todo-probe run --base-url http://localhost:3000 # Another deployment
//! todo-probe run --headed --slow-mo 250 -f delete # Watch the delete cases
//! todo-probe run -j 4 --fail-fast                 # Four contexts at once
//! todo-probe list                                 # Case ids
//! todo-probe config -c probe.yaml                 # Effective configuration
//! ```

use clap::Parser;
use std::process::ExitCode;
use todo_probe_cli::{
    logging, resolve_probe_config, select_cases, Cli, CliConfig, CliError, CliResult,
    ColorChoice, Commands, ConfigArgs, ListArgs, OutputFormat, ProbeOverrides, RunArgs,
    SuiteRunner, Verbosity,
};

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> CliResult<()> {
    let cli = Cli::parse();
    let config = build_config(&cli);
    logging::init(
        config.verbosity,
        cli.log_format,
        config.color.should_color(),
    )?;

    match cli.command {
        Commands::Run(args) => run_suite(config, &args).await,
        Commands::List(args) => run_list(&args),
        Commands::Config(args) => run_config(&args),
    }
}

fn build_config(cli: &Cli) -> CliConfig {
    let verbosity = Verbosity::from_flags(cli.quiet, cli.verbose);
    let color: ColorChoice = cli.color.clone().into();
    CliConfig::new().with_verbosity(verbosity).with_color(color)
}

async fn run_suite(config: CliConfig, args: &RunArgs) -> CliResult<()> {
    let probe = resolve_probe_config(args.config.as_deref(), &ProbeOverrides::from(args))?;
    let cases = select_cases(args.filter.as_deref());
    if cases.is_empty() {
        return Err(CliError::NoCases {
            filter: args.filter.clone().unwrap_or_default(),
        });
    }

    let config = config
        .with_jobs(args.jobs)
        .with_fail_fast(args.fail_fast)
        .with_output_dir(&args.output);
    let report = SuiteRunner::new(config).run(&probe, &cases).await?;

    if args.format == OutputFormat::Json {
        println!("{}", report.to_json()?);
    }
    if report.all_passed() {
        Ok(())
    } else {
        Err(CliError::CasesFailed {
            failed: report.failed(),
            total: report.ran(),
        })
    }
}

fn run_list(args: &ListArgs) -> CliResult<()> {
    let cases = select_cases(args.filter.as_deref());
    if cases.is_empty() {
        return Err(CliError::NoCases {
            filter: args.filter.clone().unwrap_or_default(),
        });
    }
    for case in cases {
        println!("{case}");
    }
    Ok(())
}

fn run_config(args: &ConfigArgs) -> CliResult<()> {
    let probe = resolve_probe_config(args.config.as_deref(), &ProbeOverrides::from(args))?;
    print!("{}", probe.to_yaml()?);
    Ok(())
}
