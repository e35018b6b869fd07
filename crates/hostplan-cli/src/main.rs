use std::path::PathBuf;

use clap::{Parser, Subcommand};
use hostplan_placement::Strategy;

mod commands;

#[derive(Parser)]
#[command(
    name = "hostplan",
    about = "hostplan — service distribution and port planning",
    version,
    propagate_version = true,
)]
struct Cli {
    /// Path to a hostplan.toml config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Reduce candidate targets to a final distribution.
    ///
    /// Prints the distribution as JSON on stdout, in the same shape as the
    /// candidate model so it can be fed to `hostplan ports`.
    Divide {
        /// Services model (JSON)
        #[arg(short, long)]
        services: PathBuf,
        /// Infrastructure model (JSON)
        #[arg(short, long)]
        infrastructure: PathBuf,
        /// Candidate model (JSON)
        #[arg(short, long)]
        distribution: PathBuf,
        /// Allocation strategy (defaults to [distribution].strategy, then none)
        #[arg(long, value_enum)]
        strategy: Option<Strategy>,
        /// Numeric service property holding the requirement
        #[arg(long)]
        service_property: Option<String>,
        /// Numeric target property holding the capacity or bid
        #[arg(long)]
        target_property: Option<String>,
    },
    /// Assign shared and private ports to services.
    ///
    /// Reads the prior port state from --state if it exists, sweeps
    /// obsolete reservations, assigns ports, prints the result and writes
    /// the updated state back.
    Ports {
        /// Services model (JSON)
        #[arg(short, long)]
        services: PathBuf,
        /// Candidate model or final distribution (JSON)
        #[arg(short, long)]
        distribution: PathBuf,
        /// Port state file, read if present and rewritten afterwards
        #[arg(long)]
        state: Option<PathBuf>,
        /// Lowest port to hand out
        #[arg(long)]
        min_port: Option<u16>,
        /// Highest port to hand out
        #[arg(long)]
        max_port: Option<u16>,
        /// Service property selecting the port mode
        #[arg(long)]
        mode_property: Option<String>,
    },
    /// Print the target → services index of a candidate model.
    Index {
        /// Candidate model (JSON)
        #[arg(short, long)]
        distribution: PathBuf,
    },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("hostplan=info".parse()?)
        )
        .init();

    let cli = Cli::parse();
    let config = commands::load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Divide {
            services,
            infrastructure,
            distribution,
            strategy,
            service_property,
            target_property,
        } => commands::divide::divide(
            &config,
            &commands::divide::DivideArgs {
                services,
                infrastructure,
                distribution,
                strategy,
                service_property,
                target_property,
            },
        ),
        Commands::Ports {
            services,
            distribution,
            state,
            min_port,
            max_port,
            mode_property,
        } => commands::ports::ports(
            &config,
            &commands::ports::PortsArgs {
                services,
                distribution,
                state,
                min_port,
                max_port,
                mode_property,
            },
        ),
        Commands::Index { distribution } => commands::index::index(&distribution),
    }
}
