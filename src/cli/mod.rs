//! # CLI Module
//!
//! This module is the command-line layer of sparchive. It turns parsed
//! flags into a configured update pipeline, runs it, reports the outcome and
//! optionally commits the result.
//!
//! ## Overview
//!
//! ```text
//! CLI Layer (flags, summary, exit status)
//!     ↓
//! Update pipeline (FileUpdater)
//!     ↓
//! Cache ──→ Spotify client
//!     ↓
//! File Manager (snapshot directory)
//!     ↓
//! Committer (git, CI only)
//! ```
//!
//! ## Component Selection
//!
//! Everything polymorphic is chosen once, here, before the run starts:
//!
//! - **Cache**: `--cache-dir` selects the read-through disk cache, its
//!   absence the passthrough `NoCache`
//! - **Snapshot directory**: `--playlists-dir`, or `--target prod|test`
//!   resolved against the repository root
//! - **Comparison**: `--ignore-track-order` relaxes snapshot equality
//!
//! ## Error Handling Philosophy
//!
//! - **Setup errors** (no access token, bad repository root, missing
//!   `.gitignore` entry) abort before anything is fetched
//! - **Per-playlist errors** are reported in the summary and do not change
//!   the exit status; a scheduled job should keep what it could fetch
//! - **Commit and push errors** are fatal, an unpushed commit would tangle
//!   the next run
//!
//! ## Usage Patterns
//!
//! ```bash
//! sparchive --playlists-dir playlists                      # local dry run
//! sparchive --playlists-dir playlists --cache-dir .cache   # reuse fetches
//! sparchive --target prod --auto-register --commit-and-push
//! ```

mod update;

pub use update::UpdateOptions;
pub use update::print_summary;
pub use update::run_update;
pub use update::update;
