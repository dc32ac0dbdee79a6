use clap::{ArgGroup, Args, Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "mindpack",
    version,
    about = "manage minder bundles",
    long_about = "Builds distributable bundles of profiles and rule types.

A bundle source is a directory with profiles/, rule_types/ and a manifest.json
that records the sha-256 of every file. `init` writes the manifest, `pack`
archives the directory, `verify` checks contents against the manifest."
)]
pub struct Cli {
    /// Log filter (e.g. info, debug, mindpack=trace)
    #[arg(
        long,
        global = true,
        env = "MINDPACK_LOG",
        default_value = "info",
        value_parser = parse_log_filter
    )]
    pub log_level: String,

    #[command(subcommand)]
    pub cmd: Command,
}

fn parse_log_filter(s: &str) -> Result<String, String> {
    EnvFilter::try_new(s)
        .map(|_| s.to_string())
        .map_err(|e| format!("invalid log filter {s:?}: {e}"))
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Initializes a mindpack source directory
    Init(InitArgs),
    /// Writes a mindpack bundle to a distributable archive
    Pack(PackArgs),
    /// Checks bundle contents against the manifest hashes
    Verify(VerifyArgs),
    /// Print version
    Version,
}

#[derive(Args, Debug, Clone)]
#[command(after_help = "Example:\n  mindpack init --source=bundle-data/ --name=bundle --version=v0.1.0")]
pub struct InitArgs {
    /// Source directory of the mindpack bundle
    #[arg(short = 's', long, value_name = "DIR")]
    pub source: PathBuf,

    /// Name of the bundle
    #[arg(short = 'n', long, default_value = "")]
    pub name: String,

    /// Namespace of the bundle
    #[arg(long = "ns", default_value = "")]
    pub namespace: String,

    /// Initial version for the new bundle
    #[arg(short = 'v', long = "version", default_value = "v0.0.1")]
    pub bundle_version: String,
}

#[derive(Args, Debug, Clone)]
#[command(after_help = "Example:\n  mindpack pack --source=bundle-data/ --file=mypack.mpk")]
pub struct PackArgs {
    /// Source directory of the mindpack bundle
    #[arg(short = 's', long, value_name = "DIR")]
    pub source: PathBuf,

    /// Path to write the bundle
    #[arg(short = 'f', long, value_name = "PATH")]
    pub file: PathBuf,
}

#[derive(Args, Debug, Clone)]
#[command(group(ArgGroup::new("target").required(true).args(["source", "file"])))]
pub struct VerifyArgs {
    /// Source directory to verify
    #[arg(short = 's', long, value_name = "DIR")]
    pub source: Option<PathBuf>,

    /// Packed bundle archive to verify
    #[arg(short = 'f', long, value_name = "PATH")]
    pub file: Option<PathBuf>,

    /// Print the verification report as JSON on stdout
    #[arg(long)]
    pub json: bool,
}
