//! File-based ingest for collaborator-produced data
//!
//! The acquisition collaborators drop a catalog JSON file plus JSONL feeds
//! of observations and exchange rates; each detection pass replays the
//! feeds into the store. Replay is safe because observation inserts are
//! idempotent by id.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::io::{BufRead, BufReader};
use std::path::Path;
use tracing::{info, warn};
use super::MemoryStore;
use crate::store::PriceStore;
use crate::types::{ExchangeRate, Marketplace, PriceObservation, Product};

#[derive(Deserialize)]
struct CatalogFile {
    #[serde(default)]
    marketplaces: Vec<Marketplace>,
    #[serde(default)]
    products: Vec<Product>,
}

/// Loads marketplaces and products (including id replacement links) from a
/// catalog JSON file.
pub fn load_catalog(store: &MemoryStore, path: &Path) -> Result<(usize, usize)> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read catalog file {}", path.display()))?;
    let catalog: CatalogFile = serde_json::from_str(&raw)
        .with_context(|| format!("failed to parse catalog file {}", path.display()))?;

    let counts = (catalog.marketplaces.len(), catalog.products.len());
    for marketplace in catalog.marketplaces {
        store.insert_marketplace(marketplace);
    }
    for product in catalog.products {
        store.insert_product(product);
    }

    info!(
        "Loaded catalog: {} marketplaces, {} products",
        counts.0, counts.1
    );
    Ok(counts)
}

/// Replays an observations JSONL feed into the store. Malformed lines are
/// logged and skipped; returns the number of lines accepted.
pub fn load_observations(store: &MemoryStore, path: &Path) -> Result<usize> {
    let file = fs::File::open(path)
        .with_context(|| format!("failed to open observations feed {}", path.display()))?;

    let mut accepted = 0;
    for (line_no, line) in BufReader::new(file).lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<PriceObservation>(&line) {
            Ok(observation) => {
                store.insert_observation(observation)?;
                accepted += 1;
            }
            Err(e) => {
                warn!(
                    "Skipping malformed observation at {}:{}: {}",
                    path.display(),
                    line_no + 1,
                    e
                );
            }
        }
    }
    Ok(accepted)
}

/// Replays an exchange-rate JSONL feed into the store.
pub fn load_rates(store: &MemoryStore, path: &Path) -> Result<usize> {
    let file = fs::File::open(path)
        .with_context(|| format!("failed to open rates feed {}", path.display()))?;

    let mut accepted = 0;
    for (line_no, line) in BufReader::new(file).lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<ExchangeRate>(&line) {
            Ok(rate) => {
                store.put_rate(rate)?;
                accepted += 1;
            }
            Err(e) => {
                warn!(
                    "Skipping malformed rate at {}:{}: {}",
                    path.display(),
                    line_no + 1,
                    e
                );
            }
        }
    }
    Ok(accepted)
}
