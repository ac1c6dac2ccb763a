//! Inspect, validate, and patch DRLX run files from the command line.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use drlx::config::{ConfigLoader, DrlxConfig, Mapping, codec};
use drlx::telemetry::{self, TracingOptions};
use tracing::info;

#[derive(Parser)]
#[command(name = "drlx-config", about = "Inspect and patch DRLX run configs")]
struct Cli {
    /// Log filter used when RUST_LOG is unset.
    #[arg(long, default_value = "warn")]
    log: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the fully resolved config, defaults included.
    Show {
        /// Run file to load.
        file: PathBuf,
    },
    /// Load a run file and check value ranges.
    Validate {
        /// Run file to load.
        file: PathBuf,
    },
    /// Apply KEY=VALUE overrides such as `train.batch_size=8`.
    Set {
        /// Run file to load.
        file: PathBuf,
        /// Overrides; values are parsed as YAML scalars.
        #[arg(required = true)]
        overrides: Vec<String>,
        /// Write the result here instead of printing it.
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
    /// List registered method names.
    Methods,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    telemetry::init(&TracingOptions::new().with_directive(&cli.log))?;

    let loader = ConfigLoader::new()?;
    match cli.command {
        Command::Show { file } => {
            let config = load(&loader, &file)?;
            println!("{config}");
        }
        Command::Validate { file } => {
            let config = load(&loader, &file)?;
            config
                .validate()
                .with_context(|| format!("{} failed validation", file.display()))?;
            println!("{}: ok (method `{}`)", file.display(), config.method.name());
        }
        Command::Set {
            file,
            overrides,
            output,
        } => {
            let config = load(&loader, &file)?;
            let updated = loader
                .update(&config, &parse_overrides(&overrides)?)
                .context("failed to apply overrides")?;
            match output {
                Some(path) => {
                    updated
                        .save(&path)
                        .with_context(|| format!("failed to write {}", path.display()))?;
                    info!(path = %path.display(), "saved updated config");
                }
                None => print!("{}", codec::render_mapping(&updated.to_mapping()?)?),
            }
        }
        Command::Methods => {
            for name in loader.registry().names()? {
                println!("{name}");
            }
        }
    }

    Ok(())
}

fn load(loader: &ConfigLoader, file: &Path) -> Result<DrlxConfig> {
    loader
        .load(file)
        .with_context(|| format!("failed to load {}", file.display()))
}

fn parse_overrides(pairs: &[String]) -> Result<Mapping> {
    let mut overrides = Mapping::new();
    for pair in pairs {
        let Some((key, value)) = pair.split_once('=') else {
            bail!("override `{pair}` must have the form KEY=VALUE");
        };
        let value = codec::parse_value(value)
            .with_context(|| format!("invalid value in override `{pair}`"))?;
        overrides.insert(key.trim().to_owned(), value);
    }
    Ok(overrides)
}
