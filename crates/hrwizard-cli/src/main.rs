mod cmd;
mod output;
mod root;

use clap::{Parser, Subcommand};
use cmd::{config::ConfigSubcommand, project::ProjectSubcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "hrwizard",
    about = "Step-gated HR design wizards: diagnosis, performance and compensation",
    version,
    propagate_version = true
)]
struct Cli {
    /// Workspace root (default: auto-detect from .hrwizard/)
    #[arg(long, global = true, env = "HRWIZARD_ROOT")]
    root: Option<PathBuf>,

    /// Output as JSON
    #[arg(long, global = true, short = 'j')]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize a wizard workspace in the current directory
    Init {
        /// Workspace name (default: directory name)
        #[arg(long)]
        name: Option<String>,
    },

    /// Create, list and inspect projects
    Project {
        #[command(subcommand)]
        subcommand: ProjectSubcommand,
    },

    /// Show the tab strip and progress of one wizard family
    Status {
        /// diagnosis, performance or compensation
        family: String,
        project: String,
    },

    /// Check whether a step is reachable and its required fields are met
    Check {
        family: String,
        project: String,
        step: String,
    },

    /// Fill in fields on a step and press Next (or save a draft)
    Save {
        family: String,
        project: String,
        step: String,

        /// Field assignment, KEY=VALUE; VALUE is parsed as JSON when it can be
        #[arg(long = "set", value_name = "KEY=VALUE")]
        fields: Vec<String>,

        /// Save without validation and stay on the step
        #[arg(long)]
        draft: bool,

        /// Save through a running server instead of the local files
        #[arg(long, value_name = "URL")]
        remote: Option<String>,
    },

    /// Submit every step of a family for approval
    Submit {
        family: String,
        project: String,

        /// Submit through a running server instead of the local files
        #[arg(long, value_name = "URL")]
        remote: Option<String>,
    },

    /// Approve a submitted family
    Approve { family: String, project: String },

    /// Lock a submitted or approved family
    Lock { family: String, project: String },

    /// Inspect and validate the workspace configuration
    Config {
        #[command(subcommand)]
        subcommand: ConfigSubcommand,
    },

    /// Run the HTTP API
    Serve {
        /// Port to listen on (default: server.port from config)
        #[arg(long)]
        port: Option<u16>,

        /// Don't open a browser
        #[arg(long)]
        no_open: bool,
    },
}

fn main() {
    let cli = Cli::parse();

    let default_level = match &cli.command {
        Commands::Serve { .. } => tracing::Level::INFO,
        _ => tracing::Level::WARN,
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(default_level.into()),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let root = root::resolve_root(cli.root.as_deref());

    let result = match cli.command {
        Commands::Init { name } => cmd::init::run(&root, name.as_deref()),
        Commands::Project { subcommand } => cmd::project::run(&root, subcommand, cli.json),
        Commands::Status { family, project } => {
            cmd::wizard::status(&root, &family, &project, cli.json)
        }
        Commands::Check {
            family,
            project,
            step,
        } => cmd::wizard::check(&root, &family, &project, &step, cli.json),
        Commands::Save {
            family,
            project,
            step,
            fields,
            draft,
            remote,
        } => cmd::wizard::save(
            &root,
            cmd::wizard::SaveArgs {
                family: &family,
                project: &project,
                step: &step,
                fields: &fields,
                draft,
                remote: remote.as_deref(),
            },
            cli.json,
        ),
        Commands::Submit {
            family,
            project,
            remote,
        } => cmd::wizard::submit(&root, &family, &project, remote.as_deref(), cli.json),
        Commands::Approve { family, project } => {
            cmd::wizard::finalize(&root, &family, &project, cmd::wizard::Finalize::Approve, cli.json)
        }
        Commands::Lock { family, project } => {
            cmd::wizard::finalize(&root, &family, &project, cmd::wizard::Finalize::Lock, cli.json)
        }
        Commands::Config { subcommand } => cmd::config::run(&root, subcommand, cli.json),
        Commands::Serve { port, no_open } => cmd::serve::run(&root, port, no_open),
    };

    if let Err(e) = result {
        // Print the full error chain (anyhow's alternate Display)
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}
