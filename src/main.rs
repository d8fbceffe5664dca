use std::io::{self, Write};
use std::path::PathBuf;

use anyhow::{Result, anyhow, bail};
use buildcheck::config::HarnessConfig;
use buildcheck::executor::SystemExecutor;
use buildcheck::observability::{PipelineMetrics, log_metrics};
use buildcheck::pipeline::PipelineRunner;
use buildcheck::report::ConsoleReport;
use buildcheck::validation::{ValidationReport, validate_config};
use clap::{Args, CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, prelude::*};

fn main() -> Result<()> {
    let cli = Cli::parse();
    configure_tracing()?;

    match cli.command.unwrap_or_else(|| Commands::Run(RunArgs::default())) {
        Commands::Run(args) => run_pipeline(args),
        Commands::Validate { config } => validate_cmd(config),
        Commands::Init { output, force } => init_config(output, force),
        Commands::Rules { config } => list_rules(config),
        Commands::Completions { shell } => {
            clap_complete::generate(shell, &mut Cli::command(), "buildcheck", &mut io::stdout());
            Ok(())
        }
    }
}

fn configure_tracing() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .try_init()
        .map_err(|err| anyhow!(err.to_string()))?;
    Ok(())
}

fn load_config(path: Option<&PathBuf>) -> Result<HarnessConfig> {
    match path {
        Some(path) => HarnessConfig::load(path),
        None => Ok(HarnessConfig::default()),
    }
}

fn report_validation(source: &str, report: &ValidationReport) {
    for warning in &report.warnings {
        warn!(config = source, "{warning}");
    }
    for error_msg in &report.errors {
        error!(config = source, "{error_msg}");
    }
}

fn run_pipeline(args: RunArgs) -> Result<()> {
    let mut config = load_config(args.config.as_ref())?;
    if let Some(root) = args.project_root {
        config.project.root = root;
    }

    let source = args
        .config
        .as_ref()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "<defaults>".to_string());
    let validation = validate_config(&config);
    report_validation(&source, &validation);
    if !validation.is_ok() {
        bail!(
            "Configuration is invalid ({} error(s))",
            validation.errors.len()
        );
    }

    let runner = PipelineRunner::new(config, SystemExecutor);
    let stdout = io::stdout();
    let mut console = ConsoleReport::new(stdout.lock());
    console.header(&runner.config().project.name)?;

    let mut render_error: Option<io::Error> = None;
    let report = runner.run_with_progress(|result| {
        if render_error.is_none()
            && let Err(err) = console.stage(result)
        {
            render_error = Some(err);
        }
    });
    if let Some(err) = render_error {
        return Err(err.into());
    }
    console.summary(&report)?;
    console.into_inner().flush()?;

    if args.print_metrics {
        log_metrics(&PipelineMetrics::from_report(&report));
    }

    if let Some(path) = &args.report_json {
        report.write_json(path)?;
        info!(report = %path.display(), "Report JSON written");
    }

    if args.strict && report.has_failures() {
        bail!("Verification finished with outcome '{}'", report.outcome());
    }

    Ok(())
}

fn validate_cmd(path: PathBuf) -> Result<()> {
    let config = HarnessConfig::load(&path)?;
    let report = validate_config(&config);
    report_validation(&path.display().to_string(), &report);

    if report.is_ok() {
        info!(file = %path.display(), "Config validation passed");
        Ok(())
    } else {
        Err(anyhow!(
            "Config validation failed with {} error(s)",
            report.errors.len()
        ))
    }
}

fn init_config(output: PathBuf, force: bool) -> Result<()> {
    if output.exists() && !force {
        bail!(
            "'{}' already exists; pass --force to overwrite it",
            output.display()
        );
    }
    HarnessConfig::default().save(&output)?;
    info!(path = %output.display(), "Default config written");
    Ok(())
}

fn list_rules(path: Option<PathBuf>) -> Result<()> {
    let config = load_config(path.as_ref())?;
    if config.rules.is_empty() {
        println!("No defect rules configured.");
        return Ok(());
    }
    println!("Known defect rules:");
    for rule in &config.rules {
        println!("- '{}' -> {}", rule.pattern, rule.tag);
    }
    Ok(())
}

#[derive(Parser)]
#[command(
    name = "buildcheck",
    version,
    about = "Verify a wasm build and its generated bindings"
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile, check the artifact, generate bindings and print the report
    Run(RunArgs),
    Validate {
        config: PathBuf,
    },
    /// Write the built-in configuration as YAML
    Init {
        #[arg(long, default_value = "buildcheck.yaml")]
        output: PathBuf,
        #[arg(long)]
        force: bool,
    },
    Rules {
        #[arg(long)]
        config: Option<PathBuf>,
    },
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Args, Default)]
struct RunArgs {
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long = "project-root")]
    project_root: Option<PathBuf>,
    #[arg(long = "report-json")]
    report_json: Option<PathBuf>,
    #[arg(long)]
    print_metrics: bool,
    /// Exit non-zero when any stage failed
    #[arg(long)]
    strict: bool,
}
