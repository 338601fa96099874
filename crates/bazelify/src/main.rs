use std::path::PathBuf;

use anyhow::Result;
use bazelify_gen::{Options, generate_build_files};
use clap::Parser;
use clap_verbosity_flag::{InfoLevel, Verbosity};
use itertools::Itertools;
use mimalloc::MiMalloc;
use tracing_subscriber::EnvFilter;

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

/// Convert a vendor C SDK to build files.
///
/// Reads the SDK's headers, resolves every quoted include to a library
/// target, collapses cyclic include relationships into grouped rules, and
/// writes one build file per directory. All pre-existing build files inside
/// the SDK are deleted first. Options are read from the .bazelifyrc file at
/// the root of the SDK; when includes cannot be resolved or groups cannot be
/// named, a .bazelifyrc.hint file with proposed resolutions is written next
/// to it.
#[derive(Parser)]
#[command(author, version, about)]
struct Cli {
    /// The workspace root directory. Absolute path required.
    #[arg(long)]
    workspace: PathBuf,

    /// The SDK root directory, inside the workspace. Absolute path required.
    #[arg(long)]
    sdk: PathBuf,

    /// Write the final dependency graph in DOT format to this path.
    #[arg(long)]
    dot_graph: Option<PathBuf>,

    /// Write a numbered DOT snapshot to this directory after every edge.
    #[arg(long)]
    dot_progression: Option<PathBuf>,

    /// Write per-named-group subgraphs in DOT format to this directory.
    #[arg(long)]
    named_group_graphs: Option<PathBuf>,

    #[command(flatten)]
    verbose: Verbosity<InfoLevel>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Structured logging goes to stderr, with our crates allowlisted at the
    // requested level and everything else kept at warn.
    const CRATES: &[&str] = &[
        "bazelify",
        "bazelify_config",
        "bazelify_gen",
        "bazelify_graph",
    ];
    let level = cli.verbose.tracing_level_filter();
    let allowlist = CRATES.iter().map(|c| format!("{c}={level}")).join(",");
    let filter = EnvFilter::new(format!("warn,{allowlist}"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let opts = Options {
        workspace_dir: cli.workspace,
        sdk_dir: cli.sdk,
        verbose: cli.verbose.is_present(),
        dot_graph_path: cli.dot_graph,
        dot_progression_dir: cli.dot_progression,
        named_group_graphs_dir: cli.named_group_graphs,
    };
    generate_build_files(&opts)?;
    Ok(())
}
