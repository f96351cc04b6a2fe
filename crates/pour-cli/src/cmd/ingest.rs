//! Ingest command

use std::path::Path;

use anyhow::{Context, Result};
use pour_core::{IngestOutcome, Registry, Reporter, registry_dir};
use pour_schema::Manifest;

use crate::ui::Output;

/// Validate a manifest file and record it in the registry
pub fn ingest(path: &Path, output: Output) -> Result<()> {
    let manifest = Manifest::from_file(path)
        .map_err(pour_core::Error::from)
        .with_context(|| format!("Failed to load {}", path.display()))?;
    let (name, version) = (manifest.name.clone(), manifest.version.clone());

    let registry = Registry::open(&registry_dir())?;
    match registry.ingest(manifest)? {
        IngestOutcome::Inserted => output.success(&format!("Ingested {name} {version}")),
        IngestOutcome::Unchanged => output.info(&format!("{name} {version} is already recorded")),
    }
    Ok(())
}
