use super::super::args::VerifyArgs;
use crate::exit_codes;
use anyhow::Context;
use mindpack::{verify_archive, Bundle, PackError, VerifyReport};
use std::path::Path;

pub fn run(args: VerifyArgs) -> anyhow::Result<i32> {
    let (target, report) = match (&args.source, &args.file) {
        (Some(dir), _) => (dir.as_path(), verify_directory(dir)?),
        (None, Some(file)) => (file.as_path(), verify_file(file)?),
        (None, None) => anyhow::bail!("either --source or --file is required"),
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    }

    if !report.is_ok() {
        for v in &report.violations {
            eprintln!("error: {}", v);
        }
        eprintln!(
            "bundle verify: FAILED ({}, {} violations)",
            target.display(),
            report.violations.len()
        );
        return Ok(exit_codes::EXIT_VERIFY_FAILED);
    }
    eprintln!("bundle verify: OK ({})", target.display());
    Ok(exit_codes::EXIT_SUCCESS)
}

fn verify_directory(dir: &Path) -> anyhow::Result<VerifyReport> {
    let mut bundle = Bundle::from_directory(dir)
        .with_context(|| format!("reading bundle source {}", dir.display()))?;
    if !bundle.has_declared_manifest() {
        return Err(PackError::MissingManifest)
            .with_context(|| format!("verifying {}", dir.display()));
    }
    bundle
        .verify()
        .with_context(|| format!("verifying {}", dir.display()))
}

fn verify_file(file: &Path) -> anyhow::Result<VerifyReport> {
    let f = std::fs::File::open(file)
        .with_context(|| format!("failed to open bundle: {}", file.display()))?;
    verify_archive(std::io::BufReader::new(f))
        .with_context(|| format!("verifying {}", file.display()))
}
