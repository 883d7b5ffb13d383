//! moonport CLI
//!
//! Loads a pipeline definition, resolves its steps and launches it on a
//! build backend. Logs go to stderr; the job id is the only thing printed
//! on stdout.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use moonport::{load_step_sources, BackendConfig, Launchpad, Options, Pipeline};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "moonport", version, about = "Launch declarative build pipelines on remote build backends")]
struct Cli {
  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand)]
enum Command {
  /// Validate a pipeline and submit it to a build backend
  Run {
    /// Pipeline definition file
    pipeline: PathBuf,

    #[command(flatten)]
    sources: SourceArgs,

    /// Backend driver moniker
    #[arg(short, long, env = "MOONPORT_BACKEND", default_value = "gcb")]
    backend: String,

    /// Project the build is created in (overrides MOONPORT_PROJECT_ID)
    #[arg(long)]
    project: Option<String>,
  },
  /// Load and validate a pipeline without submitting it
  Validate {
    /// Pipeline definition file
    pipeline: PathBuf,

    #[command(flatten)]
    sources: SourceArgs,
  },
  /// Print the merged step catalog
  Steps {
    #[command(flatten)]
    sources: SourceArgs,
  },
}

#[derive(Args)]
struct SourceArgs {
  /// Step source directory; repeat for more, later ones override earlier ones
  #[arg(short = 's', long = "steps", env = "MOONPORT_STEP_SOURCES", value_delimiter = ':')]
  steps: Vec<PathBuf>,

  /// Leave unknown step labels for the backend driver to report
  #[arg(long)]
  lenient: bool,
}

impl SourceArgs {
  fn options(&self) -> Options {
    Options::with_step_sources(self.steps.clone()).strict_references(!self.lenient)
  }
}

#[tokio::main]
async fn main() -> Result<()> {
  tracing_subscriber::registry()
    .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "moonport=info".into()))
    .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
    .init();

  let cli = Cli::parse();
  match cli.command {
    Command::Run {
      pipeline,
      sources,
      backend,
      project,
    } => {
      let mut config = BackendConfig::from_env();
      if project.is_some() {
        config.project_id = project;
      }

      let mut pipeline = Pipeline::from_file(&pipeline, sources.options())?;
      pipeline.validate().context("validating pipeline")?;

      let launchpad = Launchpad::new(&backend, &config)?;
      let data = launchpad.run(&mut pipeline).await?;
      info!("Result: {}", data);
      println!("{}", data.job_id);
    }
    Command::Validate { pipeline, sources } => {
      let mut pipeline = Pipeline::from_file(&pipeline, sources.options())?;
      pipeline.validate().context("validating pipeline")?;
      println!(
        "pipeline '{}' is valid ({} stages)",
        pipeline.name(),
        pipeline.stages().len()
      );
    }
    Command::Steps { sources } => {
      let catalog = load_step_sources(&sources.steps)?;
      for (name, step) in catalog.iter() {
        println!("{}\t{}", name, step.spec.image);
      }
    }
  }

  Ok(())
}
