use std::{path::PathBuf, process, time::Duration};

use clap::{
    Parser, ValueEnum,
    builder::{
        Styles,
        styling::{AnsiColor, Effects},
    },
};

use sparchive::{
    cli, config, environment::SnapshotDirKind, error, log::Logger, success,
    updater::DEFAULT_CONCURRENCY, warning,
};

fn styles() -> Styles {
    Styles::styled()
        .header(AnsiColor::White.on_default() | Effects::BOLD)
        .usage(AnsiColor::White.on_default() | Effects::BOLD)
        .literal(AnsiColor::BrightBlue.on_default())
        .placeholder(AnsiColor::BrightGreen.on_default())
}

#[derive(Parser, Debug, Clone)]
#[clap(
  version = env!("CARGO_PKG_VERSION"),
  name=env!("CARGO_PKG_NAME"),
  bin_name=env!("CARGO_PKG_NAME"),
  about=env!("CARGO_PKG_DESCRIPTION"),
  styles=styles(),
)]
struct Cli {
    /// Path to the playlists directory
    #[clap(long, required_unless_present = "target", conflicts_with = "target")]
    playlists_dir: Option<PathBuf>,

    /// Resolve the playlists directory from the repository root instead
    #[clap(long, value_enum)]
    target: Option<Target>,

    /// If specified, cache data from the Spotify API in this directory
    #[clap(long)]
    cache_dir: Option<PathBuf>,

    /// Ignore cache entries older than this many seconds
    #[clap(long, requires = "cache_dir")]
    cache_max_age: Option<u64>,

    /// Automatically register playlists owned by the authenticated user
    #[clap(long)]
    auto_register: bool,

    /// Commit and push updated playlists upstream (only inside CI)
    #[clap(long)]
    commit_and_push: bool,

    /// Maximum number of playlists fetched at the same time
    #[clap(long, default_value_t = DEFAULT_CONCURRENCY)]
    concurrency: usize,

    /// Treat playlists that only changed track order as unchanged
    #[clap(long)]
    ignore_track_order: bool,

    /// Include debug logs
    #[clap(long)]
    verbose: bool,
}

#[derive(ValueEnum, Debug, Clone, Copy)]
enum Target {
    Prod,
    Test,
}

impl From<Target> for SnapshotDirKind {
    fn from(target: Target) -> Self {
        match target {
            Target::Prod => SnapshotDirKind::Prod,
            Target::Test => SnapshotDirKind::Test,
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let log = Logger::new(cli.verbose);

    config::load_env(log).await;

    let opts = cli::UpdateOptions {
        playlists_dir: cli.playlists_dir,
        target: cli.target.map(SnapshotDirKind::from),
        cache_dir: cli.cache_dir,
        cache_max_age: cli.cache_max_age.map(Duration::from_secs),
        auto_register: cli.auto_register,
        commit_and_push: cli.commit_and_push,
        concurrency: cli.concurrency,
        ignore_track_order: cli.ignore_track_order,
    };

    tokio::select! {
        result = cli::update(opts, log) => match result {
            Ok(_) => success!(log, "Done"),
            Err(e) => {
                error!(log, "{}", e);
                process::exit(1);
            }
        },
        _ = tokio::signal::ctrl_c() => {
            warning!(log, "Interrupted, discarding partial results");
            process::exit(130);
        }
    }
}
