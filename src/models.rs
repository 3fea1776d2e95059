//! Data models for Dofus items and recipes

use serde::Deserialize;

/// Stable integer identifier for a game item (the "Ankama ID").
pub type AnkamaId = u32;

/// Static definition of a game item, read-only to the cost engine.
///
/// An empty `recipe` marks a raw material (terminal node). The category is
/// canonicalized to a single string at catalog load.
#[derive(Debug, Clone)]
pub struct ItemDefinition {
    pub id: AnkamaId,
    pub name: String,
    pub level: Option<u32>,
    pub category: String,
    pub recipe: Vec<RecipeLine>,
}

impl ItemDefinition {
    /// Whether this item has a recipe and can therefore be cost-resolved.
    pub fn is_craftable(&self) -> bool {
        !self.recipe.is_empty()
    }
}

/// One line of a crafting recipe as stored in the catalog files.
///
/// Lines with a null `item_ankama_id` are unresolvable entries and get
/// dropped during expansion.
#[derive(Debug, Clone, Deserialize)]
pub struct RecipeLine {
    #[serde(rename = "item_ankama_id")]
    pub sub_item_id: Option<AnkamaId>,
    pub quantity: u64,
    #[serde(rename = "item_subtype", default)]
    pub subtype: String,
}

/// A normalized demand for `amount` units of a sub-item.
#[derive(Debug, Clone, PartialEq)]
pub struct Demand {
    pub item_id: AnkamaId,
    pub amount: u64,
    pub subtype: String,
}

/// Item category as stored in the catalog: older dumps carry a plain
/// string, newer ones a nested object with a `name` field.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum Category {
    Plain(String),
    Structured { name: String },
}

impl Category {
    /// Canonical category name; the union is resolved once at catalog load.
    pub fn into_name(self) -> String {
        match self {
            Category::Plain(name) => name,
            Category::Structured { name } => name,
        }
    }
}

/// Expand a recipe into per-sub-item demands at the given multiplier.
///
/// Input order is preserved and demands for the same item are not merged;
/// aggregation happens in the ledger and registry.
pub fn expand_recipe(recipe: &[RecipeLine], multiplier: u64) -> Vec<Demand> {
    let mut demands = Vec::with_capacity(recipe.len());
    for line in recipe {
        let Some(item_id) = line.sub_item_id else {
            continue;
        };
        demands.push(Demand {
            item_id,
            amount: line.quantity * multiplier,
            subtype: line.subtype.clone(),
        });
    }
    demands
}
