//! Lifecycles CLI — entry point.

use std::path::PathBuf;

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use serde_json::Value;

use lifecycles::{Direction, Dtype, LifeCycle, DEFAULT_ASUR_THRESHOLD, DEFAULT_GREENE_THRESHOLD};
use lifecycles_cli::config::resolve_model_path;
use lifecycles_cli::report::{self, AttributeSource};

#[derive(Parser)]
#[command(
    name = "lifecycles",
    about = "Track how groups evolve over time: flows, facets and lifecycle events",
    version
)]
struct Cli {
    /// Path to the model file.
    #[arg(short, long, global = true)]
    model: Option<String>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, default_value = "info", global = true)]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build a model from a JSON array of partitions and write it.
    Ingest {
        /// JSON file holding partitions, each a list of groups.
        partitions: PathBuf,

        /// Element type (bool, int, float, str, list, set, dict).
        #[arg(long, default_value = "int")]
        dtype: Dtype,

        /// Attribute values as name=file.json, repeatable.
        #[arg(long = "attributes", value_name = "NAME=FILE")]
        attributes: Vec<AttributeSource>,
    },

    /// Print dtype, temporal ids, group count and universe size.
    Info,

    /// Print the flow of a group.
    Flow {
        group: String,

        /// Direction: + (forward) or - (backward).
        #[arg(short, long, default_value = "+", allow_hyphen_values = true)]
        direction: Direction,

        /// Drop branches sharing fewer elements.
        #[arg(long, default_value_t = 1)]
        min_branch_size: usize,
    },

    /// Print unicity, identity and outflow of a group.
    Facets {
        group: String,

        /// Direction: + or -; both when omitted.
        #[arg(short, long, allow_hyphen_values = true)]
        direction: Option<Direction>,

        /// Attribute to analyze alongside the facets, repeatable.
        #[arg(long)]
        attribute: Vec<String>,
    },

    /// Print event scores and the most typical event of a group.
    Event {
        group: String,

        #[arg(short, long, allow_hyphen_values = true)]
        direction: Option<Direction>,
    },

    /// Print event scores of every analyzable group.
    Events {
        #[arg(short, long, allow_hyphen_values = true)]
        direction: Option<Direction>,

        /// Read unicity with the legacy polarity.
        #[arg(long)]
        legacy: bool,
    },

    /// Print the mean Continue score per direction.
    Stability {
        #[arg(short, long, allow_hyphen_values = true)]
        direction: Option<Direction>,
    },

    /// Detect merge, split, birth, death and continue events (Asur et al.).
    Asur {
        #[arg(long, default_value_t = DEFAULT_ASUR_THRESHOLD)]
        threshold: f64,
    },

    /// Build the Jaccard event graph (Greene et al.).
    Greene {
        #[arg(long, default_value_t = DEFAULT_GREENE_THRESHOLD)]
        threshold: f64,
    },

    /// Generate shell completion scripts.
    ///
    /// Examples:
    ///   lifecycles completions bash > ~/.local/share/bash-completion/completions/lifecycles
    ///   lifecycles completions zsh > ~/.zfunc/_lifecycles
    Completions {
        /// Shell type (bash, zsh, fish, powershell, elvish).
        shell: Shell,
    },
}

fn print(value: &Value) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&cli.log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let model_path = resolve_model_path(cli.model.as_deref());
    let load = || -> anyhow::Result<LifeCycle> {
        tracing::debug!("Model: {}", model_path.display());
        Ok(LifeCycle::read(&model_path)?)
    };

    match cli.command {
        Commands::Ingest {
            partitions,
            dtype,
            attributes,
        } => {
            let lc = report::ingest(&partitions, dtype, &attributes)?;
            lc.write(&model_path)?;
            print(&report::info(&lc))?;
        }

        Commands::Info => print(&report::info(&load()?))?,

        Commands::Flow {
            group,
            direction,
            min_branch_size,
        } => print(&report::flow(&load()?, &group, direction, min_branch_size)?)?,

        Commands::Facets {
            group,
            direction,
            attribute,
        } => print(&report::facets(&load()?, &group, direction, &attribute)?)?,

        Commands::Event { group, direction } => {
            print(&report::event(&load()?, &group, direction)?)?
        }

        Commands::Events { direction, legacy } => {
            print(&report::events(&load()?, direction, legacy)?)?
        }

        Commands::Stability { direction } => {
            print(&report::stability_report(&load()?, direction)?)?
        }

        Commands::Asur { threshold } => print(&report::asur(&load()?, threshold)?)?,

        Commands::Greene { threshold } => print(&report::greene(&load()?, threshold)?)?,

        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            clap_complete::generate(shell, &mut cmd, "lifecycles", &mut std::io::stdout());
        }
    }

    Ok(())
}
