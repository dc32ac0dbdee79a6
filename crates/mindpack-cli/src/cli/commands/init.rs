use super::super::args::InitArgs;
use crate::exit_codes;
use anyhow::Context;
use mindpack::{InitOptions, Metadata, Packer};

pub fn run(args: InitArgs) -> anyhow::Result<i32> {
    let opts = InitOptions::new(
        Metadata::new(args.name, args.namespace, args.bundle_version),
        &args.source,
    );
    let bundle = Packer::new()
        .init(&opts)
        .with_context(|| format!("initializing bundle in {}", args.source.display()))?;

    eprintln!(
        "wrote new manifest: {} ({} profiles, {} rule types)",
        opts.manifest_path().display(),
        bundle.files.profiles.len(),
        bundle.files.rule_types.len()
    );
    Ok(exit_codes::EXIT_SUCCESS)
}
