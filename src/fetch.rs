//! Catalog acquisition from the dofusdu.de API
//!
//! Downloads the three item dumps the calculator consumes and writes them
//! pretty-printed into the data directory.

use std::fs;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};

/// Catalog sources, as (file name, endpoint).
const SOURCES: &[(&str, &str)] = &[
    (
        "dofus_resources.json",
        "https://api.dofusdu.de/dofus2/en/items/resources/all?sort%5Blevel%5D=desc",
    ),
    (
        "dofus_equipment.json",
        "https://api.dofusdu.de/dofus2/en/items/equipment/all?sort%5Blevel%5D=desc",
    ),
    (
        "dofus_consumables.json",
        "https://api.dofusdu.de/dofus2/en/items/consumables/all?sort%5Blevel%5D=desc",
    ),
];

/// Download every catalog file into `data_dir`, overwriting existing copies.
pub fn fetch_catalog(data_dir: &Path) -> Result<FetchStats> {
    fs::create_dir_all(data_dir)
        .with_context(|| format!("failed to create {}", data_dir.display()))?;

    let client = reqwest::blocking::Client::builder()
        .timeout(Duration::from_secs(120))
        .build()?;

    let mut stats = FetchStats::default();
    for (file_name, url) in SOURCES {
        println!("Fetching {file_name}...");
        let response = client
            .get(*url)
            .send()
            .and_then(|response| response.error_for_status())
            .with_context(|| format!("request to {url} failed"))?;
        let document: serde_json::Value = response
            .json()
            .with_context(|| format!("{url} returned invalid JSON"))?;

        let item_count = document
            .get("items")
            .and_then(|items| items.as_array())
            .map_or(0, |items| items.len());

        let path = data_dir.join(file_name);
        fs::write(&path, serde_json::to_string_pretty(&document)?)
            .with_context(|| format!("failed to write {}", path.display()))?;

        println!("  {item_count} items -> {}", path.display());
        stats.files += 1;
        stats.items += item_count;
    }

    Ok(stats)
}

#[derive(Debug, Default)]
pub struct FetchStats {
    pub files: usize,
    pub items: usize,
}

impl std::fmt::Display for FetchStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Fetched {} catalog files ({} items total)",
            self.files, self.items
        )
    }
}
