//! `cas init`: create the `.cas` directory tree.

use std::path::PathBuf;

use anyhow::{Context, Result};
use cas_core::{CatalogBackend, Repository};
use clap::{Args, ValueEnum};

/// Arguments for `cas init`.
#[derive(Args, Debug)]
pub struct InitArgs {
    /// Working directory that will contain `.cas`.
    #[arg(default_value = ".")]
    pub dir: PathBuf,

    /// Catalog storage format.
    #[arg(long, value_enum, default_value_t = CatalogKind::Json)]
    pub catalog: CatalogKind,
}

/// CLI spelling of [`CatalogBackend`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum CatalogKind {
    /// `catalog.json`, rewritten on save.
    Json,
    /// `catalog.db`, written through on every upsert.
    Sqlite,
}

impl From<CatalogKind> for CatalogBackend {
    fn from(kind: CatalogKind) -> Self {
        match kind {
            CatalogKind::Json => CatalogBackend::Json,
            CatalogKind::Sqlite => CatalogBackend::Sqlite,
        }
    }
}

/// Execute `cas init`.
pub async fn run_init(args: &InitArgs, out: &mut impl std::io::Write) -> Result<u8> {
    let repo = Repository::init_with(&args.dir, args.catalog.into())
        .await
        .context("failed to initialize CAS")?;
    writeln!(out, "Initialized empty CAS in {}", repo.cas_dir().display())?;
    Ok(0)
}
