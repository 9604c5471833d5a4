//! scriba - CLI entry point.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

use scriba::config;
use scriba::flow;
use scriba::git;
use scriba::pipeline::{CommitContext, CommitMode, CommitOptions, run_commit};
use scriba::provider::{ModelProvider, build_provider};
use scriba::session::TerminalInteract;
use scriba::usage::JsonUsageStore;

/// Write conventional commit messages from your pending changes.
#[derive(Parser, Debug)]
#[command(name = "scriba")]
#[command(about = "Write conventional commit messages from your pending changes")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Collect pending changes and commit them with a generated message
    Commit(CommitArgs),
    /// Initialize a repository, optionally with a remote and a dev branch
    Init(InitArgs),
    /// Merge one branch into another with an explicit merge commit
    Merge(MergeArgs),
    /// Create a tag on HEAD
    Tag(TagArgs),
    /// Show the resolved configuration with secrets masked
    Config,
}

#[derive(clap::Args, Debug)]
struct CommitArgs {
    /// How the message comes to exist
    #[arg(long, value_enum, default_value_t = Mode::Ai)]
    mode: Mode,

    /// A one-line note about the changes, guiding categorization and wording
    #[arg(long)]
    brief: Option<String>,

    /// Accept the first generated message without review
    #[arg(long)]
    force: bool,

    /// Push the new commit to origin afterwards
    #[arg(long)]
    push: bool,

    /// Run the whole flow but do not touch the repository
    #[arg(long)]
    dry_run: bool,

    /// These changes are not a feature; exclude the feat type
    #[arg(long)]
    no_feat: bool,

    /// Print prompts, raw replies, and the collected file list
    #[arg(long)]
    debug: bool,
}

#[derive(ValueEnum, Debug, Clone, Copy)]
enum Mode {
    Manual,
    Ai,
}

impl From<Mode> for CommitMode {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::Manual => CommitMode::Manual,
            Mode::Ai => CommitMode::Ai,
        }
    }
}

#[derive(clap::Args, Debug)]
struct InitArgs {
    /// Directory to initialize (defaults to the current directory)
    #[arg(default_value = ".")]
    path: PathBuf,

    /// Remote URL to add as origin
    #[arg(long)]
    origin: Option<String>,

    /// Create and switch to this development branch
    #[arg(long)]
    dev: Option<String>,
}

#[derive(clap::Args, Debug)]
struct MergeArgs {
    /// Branch to merge from
    source: String,

    /// Branch to merge into
    destination: String,

    /// Push the destination branch afterwards
    #[arg(long)]
    push: bool,
}

#[derive(clap::Args, Debug)]
struct TagArgs {
    /// Tag name, e.g. v1.2.0
    name: String,

    /// Annotation message; omitting it creates a lightweight tag
    #[arg(short, long)]
    message: Option<String>,

    /// Delete and recreate the tag if it already exists
    #[arg(long)]
    force: bool,

    /// Push the tag to origin afterwards
    #[arg(long)]
    push: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_filter = match &cli.command {
        Command::Commit(args) if args.debug => "scriba=debug",
        _ => "scriba=warn",
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into()))
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Command::Commit(args) => commit(args).await,
        Command::Init(args) => {
            flow::init(&args.path, args.origin.as_deref(), args.dev.as_deref())?;
            Ok(())
        }
        Command::Merge(args) => {
            let repo = git::open_repository(Path::new("."))
                .context("Run scriba from within a git repository")?;
            let workdir = repo
                .workdir()
                .context("Cannot merge in a bare repository")?;
            flow::merge(workdir, &args.source, &args.destination, args.push)?;
            Ok(())
        }
        Command::Tag(args) => {
            let repo = git::open_repository(Path::new("."))
                .context("Run scriba from within a git repository")?;
            flow::tag(
                &repo,
                &args.name,
                args.message.as_deref(),
                args.force,
                args.push,
            )?;
            Ok(())
        }
        Command::Config => {
            let config = config::load()?;
            println!("# {}", config::config_path()?.display());
            println!("{}", config.display_redacted());
            Ok(())
        }
    }
}

async fn commit(args: CommitArgs) -> Result<()> {
    let config = config::load().context("Failed to load configuration")?;
    let repo = git::open_repository(Path::new("."))
        .context("Run scriba from within a git repository")?;

    let mode = CommitMode::from(args.mode);
    let timeout = Duration::from_secs(config.limits.timeout_secs);

    // Providers are only needed when a model drafts the message.
    let (provider, summarizer): (Option<Box<dyn ModelProvider>>, Option<Box<dyn ModelProvider>>) =
        match mode {
            CommitMode::Manual => (None, None),
            CommitMode::Ai => {
                let provider = build_provider(&config.provider, timeout)?;
                let summarizer = config
                    .summarizer_spec()
                    .map(|spec| build_provider(spec, timeout))
                    .transpose()?;
                (Some(provider), summarizer)
            }
        };

    let usage = JsonUsageStore::new(config.usage_path()?);
    let mut interact = TerminalInteract::new(config.limits.title_max);

    let ctx = CommitContext {
        provider: provider.as_deref(),
        summarizer: summarizer.as_deref(),
        usage: &usage,
        device_id: &config.device_id,
        title_max: config.limits.title_max,
        max_regenerations: config.limits.max_regenerations,
    };
    let options = CommitOptions {
        mode,
        brief: args.brief,
        force: args.force,
        push: args.push,
        dry_run: args.dry_run,
        no_feat: args.no_feat,
        debug: args.debug,
    };

    run_commit(&repo, &ctx, &mut interact, &options).await?;
    Ok(())
}
