//! Subcommand implementations.

use std::path::Path;

use anyhow::Context as _;
use famphoto_catalog::{PhotoRecord, RedbCatalog};
use famphoto_faceid::{Clusterer, distance_histogram};
use famphoto_importer::{Importer, SidecarEncoder};
use tracing::debug;

use crate::Cli;
use crate::config::{AppConfig, load_config};

/// Loads the config file and applies command-line overrides.
pub fn resolve_config(cli: &Cli) -> anyhow::Result<AppConfig> {
    let mut cfg = load_config(cli.config.as_deref())?;
    apply_overrides(&mut cfg, cli);
    cfg.cluster.validate()?;
    debug!(
        eps = cfg.cluster.eps,
        min_samples = cfg.cluster.min_samples,
        metric = %cfg.cluster.metric,
        "resolved configuration"
    );
    Ok(cfg)
}

fn apply_overrides(cfg: &mut AppConfig, cli: &Cli) {
    if let Some(db) = &cli.database {
        cfg.database = Some(db.clone());
    }
    if let Some(eps) = cli.eps {
        cfg.cluster.eps = eps;
    }
    if let Some(n) = cli.min_samples {
        cfg.cluster.min_samples = n;
    }
}

fn open_catalog(cfg: &AppConfig) -> anyhow::Result<RedbCatalog> {
    let path = cfg.database_path()?;
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    RedbCatalog::open(&path).with_context(|| format!("open catalog {}", path.display()))
}

pub fn import(cfg: &AppConfig, dir: &Path) -> anyhow::Result<()> {
    let catalog = open_catalog(cfg)?;
    let clusterer = Clusterer::new(cfg.cluster.clone())?;
    let report = Importer::new(&catalog, SidecarEncoder::new(), clusterer).import_folder(dir)?;

    println!("{report}");
    for hash in &report.unresolved {
        println!("  unresolved: {hash}");
    }
    Ok(())
}

pub fn people(cfg: &AppConfig) -> anyhow::Result<()> {
    let catalog = open_catalog(cfg)?;
    let identities = catalog.identities()?;
    if identities.is_empty() {
        println!("No people yet. Import some photos first.");
        return Ok(());
    }

    let counts = catalog.photo_counts()?;
    println!("{:>6}  {:<24} {:>6}", "ID", "NAME", "PHOTOS");
    for identity in &identities {
        let n = counts.get(&identity.id).copied().unwrap_or(0);
        println!("{:>6}  {:<24} {:>6}", identity.id, identity.label, n);
    }
    Ok(())
}

pub fn rename(cfg: &AppConfig, id: u64, label: &str) -> anyhow::Result<()> {
    let label = label.trim();
    if label.is_empty() {
        anyhow::bail!("name must not be empty");
    }
    let catalog = open_catalog(cfg)?;
    catalog.rename_identity(id, label)?;
    println!("Renamed {id} to {label}");
    Ok(())
}

pub fn photos(cfg: &AppConfig, person: Option<u64>) -> anyhow::Result<()> {
    let catalog = open_catalog(cfg)?;
    let photos = match person {
        Some(id) => catalog.photos_of_identity(id)?,
        None => catalog.photos()?,
    };
    if photos.is_empty() {
        println!("No photos.");
        return Ok(());
    }
    for photo in &photos {
        println!("{}", photo_line(photo));
    }
    Ok(())
}

fn photo_line(photo: &PhotoRecord) -> String {
    let marker = if photo.capture_time_accurate { ' ' } else { '~' };
    let mut line = format!(
        "{:>6}  {}{}  {}",
        photo.id,
        photo.captured_at.format("%Y-%m-%d %H:%M"),
        marker,
        photo.file_path.display()
    );
    if let Some(camera) = &photo.camera {
        line.push_str(&format!("  [{camera}]"));
    }
    if let Some((lat, lon)) = photo.location {
        line.push_str(&format!("  @{lat:.5},{lon:.5}"));
    }
    line
}

pub fn distances(cfg: &AppConfig, bins: usize) -> anyhow::Result<()> {
    let catalog = open_catalog(cfg)?;
    let identities = catalog.identities()?;
    let points: Vec<&[f64]> = identities.iter().map(|i| i.encoding.as_slice()).collect();

    let Some(hist) = distance_histogram(&points, cfg.cluster.metric, bins)? else {
        println!("Need at least two people to compare.");
        return Ok(());
    };

    println!(
        "{} pairs, {} distance, eps = {}",
        hist.pairs, cfg.cluster.metric, cfg.cluster.eps
    );
    let widest = hist.bins.iter().copied().max().unwrap_or(0).max(1);
    for (i, &count) in hist.bins.iter().enumerate() {
        let (lo, hi) = hist.bin_range(i);
        let bar = "#".repeat(count * 40 / widest);
        println!("{lo:>8.4} - {hi:<8.4} {count:>6} {bar}");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn flags_override_config() {
        let cli = Cli::parse_from([
            "famphoto",
            "--eps",
            "0.3",
            "--min-samples",
            "2",
            "--database",
            "/tmp/x.redb",
            "people",
        ]);
        let mut cfg = AppConfig::default();
        apply_overrides(&mut cfg, &cli);
        assert_eq!(cfg.cluster.eps, 0.3);
        assert_eq!(cfg.cluster.min_samples, 2);
        assert_eq!(cfg.database_path().unwrap(), Path::new("/tmp/x.redb"));
    }

    #[test]
    fn global_flags_after_subcommand() {
        let cli = Cli::parse_from(["famphoto", "photos", "--person", "3", "-v"]);
        assert!(cli.verbose);
        assert!(matches!(
            cli.command,
            crate::Commands::Photos { person: Some(3) }
        ));
    }
}
