use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use slice_orchestrator::LifecycleOptions;

mod commands;

use commands::lifecycle::Operation;

#[derive(Parser)]
#[command(
    name = "slicectl",
    about = "slicectl - install and run YDB slices over ssh",
    version,
    propagate_version = true,
)]
struct Cli {
    /// Cluster description file
    #[arg(short, long, global = true, default_value = "cluster.toml")]
    cluster: PathBuf,
    /// Log at debug level
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Install binary, config and slots from scratch. Wipes drives.
    Install(Target),
    /// Start the static process and place dynamic slots.
    Start(Target),
    /// Stop dynamic slots and the static process.
    Stop(Target),
    /// Ship a new binary and config, then restart.
    Update(Target),
    /// Stop, remove slot directories and wipe drives.
    Clear(Target),
    /// Stop, wipe drives, start again.
    Format(Target),
    /// Restart with the static config tree as generated, without secrets.
    UpdateRawCfg(Target),
    /// Print the slot placement without changing any host.
    Plan {
        /// Output format: text or json
        #[arg(short, long, default_value = "text")]
        format: String,
        /// Skip the NUMA probe; no slot is bound to a NUMA node.
        #[arg(long)]
        no_numa_probe: bool,
    },
}

#[derive(Args)]
struct Target {
    /// Components to act on: kikimr, kikimr:bin, kikimr:cfg, dynamic_slots, all.
    /// Defaults to all.
    components: Vec<String>,
    /// Delete slot logs before starting
    #[arg(long)]
    clear_logs: bool,
    /// Secret version holding the auth token and TVM secret
    #[arg(long)]
    secret_version: Option<String>,
}

impl Target {
    fn options(&self) -> LifecycleOptions {
        LifecycleOptions {
            clear_logs: self.clear_logs,
            secret_version: self.secret_version.clone(),
            ..LifecycleOptions::default()
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let directive = if cli.verbose { "slice=debug" } else { "slice=info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(directive.parse()?)
        )
        .init();

    let (operation, target) = match cli.command {
        Commands::Plan { format, no_numa_probe } => {
            return commands::plan::plan(&cli.cluster, &format, !no_numa_probe);
        }
        Commands::Install(target) => (Operation::Install, target),
        Commands::Start(target) => (Operation::Start, target),
        Commands::Stop(target) => (Operation::Stop, target),
        Commands::Update(target) => (Operation::Update, target),
        Commands::Clear(target) => (Operation::Clear, target),
        Commands::Format(target) => (Operation::Format, target),
        Commands::UpdateRawCfg(target) => (Operation::UpdateRawCfg, target),
    };

    commands::lifecycle::run(&cli.cluster, operation, &target.components, target.options())
}
