//! Cost resolution engine and recompute orchestration
//!
//! The planner owns all mutable cost state: the tracked crafting list, user
//! overrides, the ingredient ledger, the intermediate registry, and the
//! per-pass aggregation maps. A `recompute` call is the atomic unit: the
//! per-pass maps are rebuilt from scratch while overrides, ledger costs, and
//! intermediate snapshots carry over.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use tracing::{debug, warn};

use crate::catalog::Catalog;
use crate::ledger::{Ingredient, IngredientLedger, IntermediateItem, IntermediateRegistry};
use crate::models::{AnkamaId, ItemDefinition, expand_recipe};

/// User edit rejected by the planner; prior state is always retained.
#[derive(Debug, thiserror::Error)]
pub enum PlanError {
    #[error("invalid cost for {name}: {value} (must be finite and non-negative)")]
    InvalidOverrideValue { name: String, value: f64 },
}

/// One entry of the crafting list: an item reference (name or Ankama id),
/// how many to craft, and the expected sell price per unit.
#[derive(Debug, Clone)]
pub struct TrackedItem {
    pub reference: String,
    pub quantity: u64,
    pub sell_price: f64,
}

/// Non-fatal conditions observed during one recompute pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PassDiagnostics {
    /// Recipe lines or tracked references unknown to the catalog.
    pub lookup_misses: usize,
    /// Recipe lines abandoned because they would revisit an item already on
    /// the current resolution path.
    pub cycles: usize,
}

/// Per-item cost line of a recompute pass.
#[derive(Debug, Clone, PartialEq)]
pub struct ItemCost {
    pub name: String,
    pub quantity: u64,
    pub unit_cost: f64,
    pub profit: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IngredientRow {
    pub name: String,
    pub amount: u64,
    pub cost: f64,
    pub category: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IntermediateRow {
    pub name: String,
    pub amount: u64,
    pub cost: f64,
    pub level: u32,
    pub category: String,
}

/// Everything one recompute pass derives.
#[derive(Debug, Clone, PartialEq)]
pub struct CostReport {
    pub per_item: Vec<ItemCost>,
    pub ingredients: Vec<IngredientRow>,
    pub intermediates: Vec<IntermediateRow>,
    pub diagnostics: PassDiagnostics,
}

#[derive(Default)]
pub struct Planner {
    tracked: Vec<TrackedItem>,
    overrides: HashMap<String, f64>,
    ledger: IngredientLedger,
    registry: IntermediateRegistry,
    /// Aggregated demand by name for the current pass, raw and crafted alike.
    total_amounts: BTreeMap<String, u64>,
    /// Which tracked items (transitively) consume each sub-item.
    resource_usage: HashMap<String, BTreeSet<String>>,
    /// Per-pass memo of reference -> id resolutions.
    reference_cache: HashMap<String, AnkamaId>,
    diagnostics: PassDiagnostics,
}

impl Planner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the crafting list. Costs are not derived until `recompute`.
    pub fn set_tracked_items(&mut self, tracked: Vec<TrackedItem>) {
        self.tracked = tracked;
    }

    fn validate_cost(name: &str, cost: f64) -> Result<(), PlanError> {
        if !cost.is_finite() || cost < 0.0 {
            warn!(name, cost, "rejecting invalid cost edit");
            return Err(PlanError::InvalidOverrideValue {
                name: name.to_string(),
                value: cost,
            });
        }
        Ok(())
    }

    /// Set or clear a user cost override for `name`.
    ///
    /// A positive cost pins the item: resolution stops recursing into its
    /// recipe and charges the override directly, and a registry entry for
    /// the name migrates into the ledger. `None` (or 0) clears the override;
    /// a name once computed as an intermediate is restored into the registry
    /// from its snapshot.
    pub fn set_override(&mut self, name: &str, cost: Option<f64>) -> Result<(), PlanError> {
        let cost = cost.unwrap_or(0.0);
        Self::validate_cost(name, cost)?;

        if cost == 0.0 {
            self.overrides.remove(name);
            if self.registry.restore(name) {
                self.ledger.remove(name);
            } else {
                // never an intermediate: plain raw material priced back to zero
                self.ledger.set_cost(name, 0.0);
            }
        } else {
            self.overrides.insert(name.to_string(), cost);
            if let Some(entry) = self.registry.remove(name) {
                let amount = self.total_amounts.get(name).copied().unwrap_or(entry.amount);
                self.ledger.insert(Ingredient {
                    name: name.to_string(),
                    amount,
                    cost,
                    category: entry.category,
                });
            } else {
                self.ledger.set_cost(name, cost);
            }
        }
        Ok(())
    }

    /// Edit a raw material's unit cost in place.
    ///
    /// Editing a name that is currently overridden or sitting in the
    /// intermediate registry routes through the override transition instead,
    /// so a zero cost restores the intermediate.
    pub fn set_ingredient_cost(&mut self, name: &str, cost: f64) -> Result<(), PlanError> {
        Self::validate_cost(name, cost)?;
        if self.overrides.contains_key(name) || self.registry.contains(name) {
            let cost = if cost == 0.0 { None } else { Some(cost) };
            return self.set_override(name, cost);
        }
        self.ledger.set_cost(name, cost);
        Ok(())
    }

    /// Whether every tracked item that consumes `name` has a user override
    /// higher up the tree, i.e. the ingredient's demand is already priced in.
    pub fn is_fully_explained(&self, name: &str) -> bool {
        match self.resource_usage.get(name) {
            Some(consumers) if !consumers.is_empty() => consumers
                .iter()
                .all(|root| self.overrides.contains_key(root)),
            _ => false,
        }
    }

    /// Run one full recompute pass over the tracked list.
    ///
    /// Tracked items without a recipe are listed but never cost-resolved;
    /// only crafted items are priced.
    pub fn recompute(&mut self, catalog: &Catalog) -> CostReport {
        self.diagnostics = PassDiagnostics::default();
        self.total_amounts.clear();
        self.resource_usage.clear();
        self.reference_cache.clear();
        let prior = self.registry.start_pass();
        self.ledger.reset_amounts();

        let tracked = self.tracked.clone();
        let mut per_item = Vec::with_capacity(tracked.len());
        for entry in &tracked {
            let Some(item) = self.resolve_reference(catalog, &entry.reference) else {
                self.diagnostics.lookup_misses += 1;
                debug!(reference = %entry.reference, "tracked item not in catalog");
                continue;
            };
            if !item.is_craftable() {
                per_item.push(ItemCost {
                    name: item.name.clone(),
                    quantity: entry.quantity,
                    unit_cost: 0.0,
                    profit: 0.0,
                });
                continue;
            }
            let name = item.name.clone();
            let total = self.resolve_cost(
                catalog,
                item,
                entry.quantity,
                1,
                Some(item.name.as_str()),
                &mut Vec::new(),
            );
            let unit_cost = if entry.quantity > 0 {
                total / entry.quantity as f64
            } else {
                0.0
            };
            per_item.push(ItemCost {
                name,
                quantity: entry.quantity,
                unit_cost,
                profit: entry.sell_price - unit_cost,
            });
        }

        self.registry.reconcile(&prior, &self.overrides);

        CostReport {
            per_item,
            ingredients: self.ingredient_rows(),
            intermediates: self.intermediate_rows(),
            diagnostics: self.diagnostics,
        }
    }

    /// Resolve the total cost of crafting `amount` units of `item`.
    ///
    /// Raw sub-items are charged against the ledger, crafted sub-items
    /// recurse and register as intermediates, overridden names short-circuit
    /// at their pinned cost without expanding their sub-tree. `path` holds
    /// the item ids on the current recursion branch for cycle detection.
    fn resolve_cost<'c>(
        &mut self,
        catalog: &'c Catalog,
        item: &'c ItemDefinition,
        amount: u64,
        depth: u32,
        root: Option<&'c str>,
        path: &mut Vec<AnkamaId>,
    ) -> f64 {
        if let Some(&cost) = self.overrides.get(&item.name) {
            return cost * amount as f64;
        }
        if item.recipe.is_empty() {
            // raw leaves are charged by the caller, nothing to expand
            return 0.0;
        }

        path.push(item.id);
        let mut total = 0.0;
        for demand in expand_recipe(&item.recipe, amount) {
            let Some(sub) = catalog.find_by_id(demand.item_id) else {
                self.diagnostics.lookup_misses += 1;
                debug!(item_id = demand.item_id, "unknown sub-item, skipping recipe line");
                continue;
            };
            *self.total_amounts.entry(sub.name.clone()).or_insert(0) += demand.amount;

            if let Some(&cost) = self.overrides.get(&sub.name) {
                total += cost * demand.amount as f64;
            } else if sub.is_craftable() {
                if path.contains(&sub.id) {
                    self.diagnostics.cycles += 1;
                    warn!(item = %sub.name, "cyclic recipe, charging 0 for this branch");
                } else {
                    let sub_cost = self.resolve_cost(
                        catalog,
                        sub,
                        demand.amount,
                        depth + 1,
                        root.or(Some(item.name.as_str())),
                        path,
                    );
                    total += sub_cost;
                    if !self.registry.contains(&sub.name) {
                        let unit = if demand.amount > 0 {
                            sub_cost / demand.amount as f64
                        } else {
                            0.0
                        };
                        self.registry.insert_first(IntermediateItem {
                            name: sub.name.clone(),
                            amount: demand.amount,
                            cost: unit,
                            level: depth + 1,
                            category: sub.category.clone(),
                        });
                    }
                }
            } else {
                let unit = self.ledger.cost_of(&sub.name);
                total += unit * demand.amount as f64;
                self.ledger.accumulate(&sub.name, demand.amount, unit, &sub.category);
            }

            if let Some(root_name) = root {
                self.resource_usage
                    .entry(sub.name.clone())
                    .or_default()
                    .insert(root_name.to_string());
            }
        }
        path.pop();
        total
    }

    /// Resolve a tracked-item reference (Ankama id or name substring),
    /// memoized for the duration of the pass.
    fn resolve_reference<'c>(
        &mut self,
        catalog: &'c Catalog,
        reference: &str,
    ) -> Option<&'c ItemDefinition> {
        if let Some(&id) = self.reference_cache.get(reference) {
            return catalog.find_by_id(id);
        }
        let found = match reference.parse::<AnkamaId>() {
            Ok(id) => catalog.find_by_id(id),
            Err(_) => catalog.find_by_name(reference).into_iter().next(),
        };
        if let Some(item) = found {
            self.reference_cache.insert(reference.to_string(), item.id);
        }
        found
    }

    /// Rows for the ingredients view: every demanded name that is either a
    /// raw material or carries a user override.
    fn ingredient_rows(&self) -> Vec<IngredientRow> {
        let mut rows = Vec::new();
        for (name, &amount) in &self.total_amounts {
            if !self.overrides.contains_key(name) && self.registry.contains(name) {
                continue;
            }
            let (cost, category) = match self.ledger.get(name) {
                Some(entry) => (
                    self.overrides.get(name).copied().unwrap_or(entry.cost),
                    entry.category.clone(),
                ),
                // overridden crafted item that never reached the ledger
                None => (
                    self.overrides.get(name).copied().unwrap_or(0.0),
                    "intermediate".to_string(),
                ),
            };
            rows.push(IngredientRow {
                name: name.clone(),
                amount,
                cost,
                category,
            });
        }
        rows
    }

    /// Rows for the intermediates view: registry entries without an
    /// override, with demand refreshed from this pass's totals.
    fn intermediate_rows(&self) -> Vec<IntermediateRow> {
        let mut rows: Vec<IntermediateRow> = self
            .registry
            .iter()
            .filter(|entry| !self.overrides.contains_key(&entry.name))
            .map(|entry| IntermediateRow {
                name: entry.name.clone(),
                amount: self.total_amounts.get(&entry.name).copied().unwrap_or(0),
                cost: entry.cost,
                level: entry.level,
                category: entry.category.clone(),
            })
            .collect();
        rows.sort_by(|a, b| a.level.cmp(&b.level).then_with(|| a.name.cmp(&b.name)));
        rows
    }
}
