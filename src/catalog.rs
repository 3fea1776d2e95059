//! Catalog access: loading and querying the Dofus item dumps
//!
//! Catalog files follow the dofusdu.de layout:
//! `{"items": [{"ankama_id", "name", "level", "type", "recipe": [...]}]}`.
//! The files are consumed read-only; lookup misses during cost resolution
//! are diagnostics on the planner, not errors here.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::{debug, info};
use walkdir::WalkDir;

use crate::models::{AnkamaId, Category, ItemDefinition, RecipeLine};

/// Errors raised while loading catalog files.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("failed to read {path}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse {path}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// On-disk document shape.
#[derive(Deserialize)]
struct CatalogDocument {
    items: Vec<CatalogEntry>,
}

#[derive(Deserialize)]
struct CatalogEntry {
    ankama_id: AnkamaId,
    name: String,
    #[serde(default)]
    level: Option<u32>,
    #[serde(rename = "type", default)]
    category: Option<Category>,
    #[serde(default)]
    recipe: Option<Vec<RecipeLine>>,
}

impl CatalogEntry {
    fn into_definition(self) -> ItemDefinition {
        ItemDefinition {
            id: self.ankama_id,
            name: self.name,
            level: self.level,
            category: self
                .category
                .map(Category::into_name)
                .unwrap_or_else(|| "unknown".to_string()),
            recipe: self.recipe.unwrap_or_default(),
        }
    }
}

fn parse_document(raw: &str) -> Result<Vec<ItemDefinition>, serde_json::Error> {
    let document: CatalogDocument = serde_json::from_str(raw)?;
    Ok(document
        .items
        .into_iter()
        .map(CatalogEntry::into_definition)
        .collect())
}

/// In-memory item catalog with a load-time id index.
pub struct Catalog {
    items: Vec<ItemDefinition>,
    by_id: HashMap<AnkamaId, usize>,
}

impl Catalog {
    /// Build a catalog from already-parsed definitions. Duplicate ids keep
    /// the first definition seen.
    pub fn from_items(items: Vec<ItemDefinition>) -> Self {
        let mut by_id = HashMap::with_capacity(items.len());
        for (index, item) in items.iter().enumerate() {
            by_id.entry(item.id).or_insert(index);
        }
        Self { items, by_id }
    }

    /// Load and merge every `*.json` file under `dir`.
    ///
    /// Files are visited in sorted path order so duplicate ids resolve
    /// deterministically (first file wins).
    pub fn load_dir(dir: &Path) -> Result<Self, CatalogError> {
        let mut paths: Vec<PathBuf> = WalkDir::new(dir)
            .follow_links(true)
            .into_iter()
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().is_file())
            .filter(|entry| entry.path().extension().is_some_and(|ext| ext == "json"))
            .map(|entry| entry.into_path())
            .collect();
        paths.sort();

        let mut items = Vec::new();
        for path in paths {
            let raw = fs::read_to_string(&path).map_err(|source| CatalogError::Read {
                path: path.clone(),
                source,
            })?;
            let parsed = parse_document(&raw).map_err(|source| CatalogError::Parse {
                path: path.clone(),
                source,
            })?;
            debug!(path = %path.display(), items = parsed.len(), "loaded catalog file");
            items.extend(parsed);
        }
        info!(items = items.len(), "catalog loaded");
        Ok(Self::from_items(items))
    }

    pub fn find_by_id(&self, id: AnkamaId) -> Option<&ItemDefinition> {
        self.by_id.get(&id).map(|&index| &self.items[index])
    }

    /// Case-insensitive substring search over item names.
    pub fn find_by_name(&self, query: &str) -> Vec<&ItemDefinition> {
        let needle = query.to_lowercase();
        self.items
            .iter()
            .filter(|item| item.name.to_lowercase().contains(&needle))
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "items": [
            {
                "ankama_id": 44,
                "name": "Ash Wood",
                "level": 1,
                "type": "Wood",
                "recipe": null
            },
            {
                "ankama_id": 19,
                "name": "Small Sword",
                "level": 8,
                "type": {"name": "Sword"},
                "recipe": [
                    {"item_ankama_id": 44, "quantity": 3, "item_subtype": "resources"},
                    {"item_ankama_id": null, "quantity": 1, "item_subtype": "resources"}
                ]
            },
            {
                "ankama_id": 303,
                "name": "Boar Leather"
            }
        ]
    }"#;

    fn sample_catalog() -> Catalog {
        Catalog::from_items(parse_document(SAMPLE).unwrap())
    }

    #[test]
    fn parses_both_category_shapes() {
        let catalog = sample_catalog();
        assert_eq!(catalog.find_by_id(44).unwrap().category, "Wood");
        assert_eq!(catalog.find_by_id(19).unwrap().category, "Sword");
        assert_eq!(catalog.find_by_id(303).unwrap().category, "unknown");
    }

    #[test]
    fn null_or_missing_recipe_is_raw() {
        let catalog = sample_catalog();
        assert!(!catalog.find_by_id(44).unwrap().is_craftable());
        assert!(!catalog.find_by_id(303).unwrap().is_craftable());
        assert!(catalog.find_by_id(19).unwrap().is_craftable());
    }

    #[test]
    fn recipe_lines_keep_null_ids_until_expansion() {
        let catalog = sample_catalog();
        let sword = catalog.find_by_id(19).unwrap();
        assert_eq!(sword.recipe.len(), 2);
        assert_eq!(sword.recipe[0].sub_item_id, Some(44));
        assert_eq!(sword.recipe[1].sub_item_id, None);
    }

    #[test]
    fn find_by_name_is_case_insensitive_substring() {
        let catalog = sample_catalog();
        let hits = catalog.find_by_name("swor");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].name, "Small Sword");
        assert!(catalog.find_by_name("ASH WOOD").len() == 1);
        assert!(catalog.find_by_name("granite").is_empty());
    }

    #[test]
    fn duplicate_ids_first_wins() {
        let mut items = parse_document(SAMPLE).unwrap();
        let mut shadow = items[0].clone();
        shadow.name = "Shadow Ash".to_string();
        items.push(shadow);
        let catalog = Catalog::from_items(items);
        assert_eq!(catalog.find_by_id(44).unwrap().name, "Ash Wood");
    }

    #[test]
    fn missing_level_is_none() {
        let catalog = sample_catalog();
        assert_eq!(catalog.find_by_id(303).unwrap().level, None);
        assert_eq!(catalog.find_by_id(19).unwrap().level, Some(8));
    }
}
