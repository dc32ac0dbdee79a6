use super::super::args::PackArgs;
use crate::exit_codes;
use anyhow::Context;
use mindpack::{Bundle, Packer};
use tracing::warn;

pub fn run(args: PackArgs) -> anyhow::Result<i32> {
    let bundle = Bundle::from_directory(&args.source)
        .with_context(|| format!("reading bundle source {}", args.source.display()))?;
    if !bundle.has_declared_manifest() {
        warn!(
            source = %args.source.display(),
            "no manifest.json in source; the archive cannot be verified (run `mindpack init` first)"
        );
    }

    Packer::new()
        .write_to_file(&bundle, &args.file)
        .with_context(|| format!("writing bundle to {}", args.file.display()))?;

    eprintln!(
        "wrote bundle: {} ({} files)",
        args.file.display(),
        bundle.files.len()
    );
    Ok(exit_codes::EXIT_SUCCESS)
}
