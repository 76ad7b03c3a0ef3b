mod cmd_config;
mod cmd_remap;
mod cmd_run;
mod cmd_status;
mod cmd_trim_plan;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "smartcut",
    version,
    about = "Turn lecture transcripts into standalone concept clips"
)]
struct Cli {
    /// Store root (defaults to the per-user data directory)
    #[arg(long, global = true)]
    root: Option<PathBuf>,
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the pipeline on a transcript (JSON array of lines)
    Run {
        /// Transcript file
        transcript: PathBuf,
        /// Session name (defaults to the transcript file stem)
        #[arg(long)]
        session: Option<String>,
        /// Pipeline config (YAML)
        #[arg(long)]
        config: Option<PathBuf>,
        /// Reuse artifacts of stages finished by an earlier run
        #[arg(long)]
        resume: bool,
        /// Override the oracle model
        #[arg(long)]
        model: Option<String>,
        /// Override the oracle endpoint
        #[arg(long)]
        base_url: Option<String>,
    },
    /// Show the state of a session
    Status {
        session: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Recompute mapped clips from stored artifacts, without the oracle
    Remap { session: String },
    /// Emit the cut list for the trimming engine
    TrimPlan {
        session: String,
        /// Write to a file instead of stdout
        #[arg(long)]
        out: Option<PathBuf>,
        /// Emit snippet records instead of the cut list
        #[arg(long)]
        snippets: bool,
    },
    /// Print the effective configuration as YAML
    Config {
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env("SMARTCUT_LOG")
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing();
    let root = cli.root.unwrap_or_else(smartcut_store::store_root);

    match cli.cmd {
        Command::Run {
            transcript,
            session,
            config,
            resume,
            model,
            base_url,
        } => cmd_run::execute(cmd_run::RunParams {
            root: &root,
            transcript: &transcript,
            session: session.as_deref(),
            config: config.as_deref(),
            resume,
            model,
            base_url,
        }),
        Command::Status { session, json } => cmd_status::execute(&root, &session, json),
        Command::Remap { session } => cmd_remap::execute(&root, &session),
        Command::TrimPlan {
            session,
            out,
            snippets,
        } => cmd_trim_plan::execute(&root, &session, out.as_deref(), snippets),
        Command::Config { config } => cmd_config::execute(config.as_deref()),
    }
}
