use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use neobench_cli::config::ProfileConfig;
use neobench_cli::output::{JsonLinesDriver, NullDriver, RunSummary};
use neobench_core::runtime::ClientRuntime;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Neobench: weighted, reproducible workload generation
///
/// Profiles are TOML files holding the experiment settings and the workload
/// (baseline variables and weighted scripts).
///
/// Example usage:
///   neobench generate -P profiles/tpcb-like.toml
///   neobench generate -P profiles/tpcb-like.toml -D scale=100 --set experiment.clients=8
///   neobench check -P profiles/tpcb-like.toml
#[derive(Parser)]
#[command(name = "neobench")]
#[command(version, about = "Workload generator for database load tests", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short = 'l', long, default_value = "info", global = true)]
    log_level: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate units of work from a profile
    Generate {
        #[command(flatten)]
        profile: ProfileArgs,

        /// Where generated work goes
        #[arg(short = 'o', long, value_enum, default_value_t = OutputFormat::Json)]
        output: OutputFormat,
    },

    /// Validate a profile and print script selection probabilities
    Check {
        #[command(flatten)]
        profile: ProfileArgs,
    },
}

#[derive(clap::Args)]
struct ProfileArgs {
    /// Path to TOML profile (REQUIRED)
    #[arg(short = 'P', long, required = true)]
    profile: PathBuf,

    /// Override any profile value using dot notation (can be repeated)
    ///
    /// Examples:
    ///   --set experiment.clients=8
    ///   --set experiment.duration=30s
    ///   --set workload.scripts.0.weight=5
    #[arg(long = "set", value_name = "KEY=VALUE")]
    set: Vec<String>,

    /// Define a baseline variable (can be repeated)
    #[arg(short = 'D', long = "define", value_name = "NAME=VALUE")]
    define: Vec<String>,
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    /// One JSON object per unit of work on stdout
    Json,
    /// Discard work, only log the summary
    None,
}

impl ProfileArgs {
    fn load(&self) -> anyhow::Result<ProfileConfig> {
        tracing::info!("Loading profile: {}", self.profile.display());
        let mut config = ProfileConfig::from_file_with_overrides(&self.profile, &self.set)?;
        config.define_variables(&self.define)?;
        config.validate()?;
        Ok(config)
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // stdout carries generated work, so logs go to stderr
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| cli.log_level.clone().into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    match cli.command {
        Commands::Generate { profile, output } => generate(profile.load()?, output),
        Commands::Check { profile } => check(profile.load()?),
    }
}

fn generate(config: ProfileConfig, output: OutputFormat) -> anyhow::Result<()> {
    let experiment = &config.experiment;
    tracing::info!("=== Experiment Configuration ===");
    tracing::info!("Name: {}", experiment.name);
    if let Some(desc) = &experiment.description {
        tracing::info!("Description: {}", desc);
    }
    if let Some(seed) = experiment.seed {
        tracing::info!("Seed: {} (reproducible mode)", seed);
    }
    tracing::info!("Duration: {:?}", experiment.duration);
    tracing::info!("Clients: {}", experiment.clients);

    let workload = config.workload.build(experiment.seed)?;

    let mut runtime = ClientRuntime::new(experiment.clients);
    if let Some(max) = experiment.iterations {
        runtime = runtime.with_max_iterations(max);
    }

    match output {
        OutputFormat::Json => {
            let out = Arc::new(Mutex::new(BufWriter::new(io::stdout())));
            let reports = runtime.run(&workload, experiment.duration, |_| {
                JsonLinesDriver::new(Arc::clone(&out))
            })?;
            RunSummary::from_reports(&reports).log();

            // A reader that went away early is not a failure
            let flushed = out.lock().unwrap_or_else(PoisonError::into_inner).flush();
            if let Err(e) = flushed {
                if e.kind() != io::ErrorKind::BrokenPipe {
                    return Err(e).context("Failed to flush output");
                }
            }
        }
        OutputFormat::None => {
            let reports = runtime.run(&workload, experiment.duration, |_| NullDriver)?;
            RunSummary::from_reports(&reports).log();
        }
    }

    Ok(())
}

fn check(config: ProfileConfig) -> anyhow::Result<()> {
    let scripts = config.workload.scripts()?;
    let total = scripts.total_weight() as f64;

    println!("Profile '{}' is valid", config.experiment.name);
    for script in scripts.scripts() {
        println!(
            "  {:<24} weight {:>5}  p={:.3}  {} command(s){}",
            script.name,
            script.weight,
            script.weight as f64 / total,
            script.commands.len(),
            if script.readonly { "  [readonly]" } else { "" }
        );
    }
    Ok(())
}
