use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

mod cli;

#[derive(Parser)]
#[command(name = "verter")]
#[command(about = "Generates Android UI tests from recorded interactions and repairs them until they compile", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[arg(long, global = true, help = "Enable verbose debug output")]
    verbose: bool,

    #[arg(long, global = true, help = "Perform a dry run without writing files or running the build")]
    dry_run: bool,

    #[arg(long, global = true, help = "Settings file (defaults to verter.yml when present)")]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Generate test sources from a recorded trace, then fix the build")]
    Generate {
        #[arg(long, help = "Recorded interaction trace (JSON)")]
        trace: PathBuf,

        #[arg(long, help = "Test scenario text", conflicts_with = "scenario_file")]
        scenario: Option<String>,

        #[arg(long, help = "File holding the test scenario")]
        scenario_file: Option<PathBuf>,

        #[arg(long, help = "Write the sources without running the fix loop")]
        no_fix: bool,
    },

    #[command(about = "Run the build-fix loop on the project")]
    Fix {
        #[arg(long, help = "Override the step limit of the fix session")]
        max_steps: Option<usize>,
    },

    #[command(about = "Print the normalized action records of a trace as JSON")]
    Normalize {
        #[arg(help = "Recorded interaction trace (JSON)")]
        trace: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let default_filter = if cli.verbose { "verter=debug" } else { "verter=info" };
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)))
        .init();

    let config = cli::Config {
        verbose: cli.verbose,
        dry_run: cli.dry_run,
    };

    match cli.command {
        Commands::Generate {
            trace,
            scenario,
            scenario_file,
            no_fix,
        } => {
            let scenario = cli::ScenarioSource::from_args(scenario, scenario_file)?;
            cli::generate(&trace, scenario, no_fix, cli.config.as_deref(), &config).await?;
        }
        Commands::Fix { max_steps } => {
            cli::fix(max_steps, cli.config.as_deref(), &config).await?;
        }
        Commands::Normalize { trace } => {
            cli::normalize(&trace)?;
        }
    }

    Ok(())
}
