//! Ingredient ledger and intermediate registry
//!
//! Both aggregate demand by item name over one recompute pass. Raw
//! materials land in the ledger; crafted sub-items land in the registry
//! until a user override moves them out.

use std::collections::HashMap;

/// A raw material row: running demand for the current pass plus the unit
/// cost, either user-set or last known.
#[derive(Debug, Clone, PartialEq)]
pub struct Ingredient {
    pub name: String,
    pub amount: u64,
    pub cost: f64,
    pub category: String,
}

#[derive(Debug, Default)]
pub struct IngredientLedger {
    entries: HashMap<String, Ingredient>,
}

impl IngredientLedger {
    /// Add demand for a raw material, creating the entry on first sight.
    ///
    /// The stored cost is only replaced when `cost` is non-zero, so a
    /// user-priced entry survives passes that charge it at its current cost.
    pub fn accumulate(&mut self, name: &str, amount: u64, cost: f64, category: &str) {
        if let Some(entry) = self.entries.get_mut(name) {
            entry.amount += amount;
            if cost != 0.0 {
                entry.cost = cost;
            }
            if entry.category.is_empty() {
                entry.category = category.to_string();
            }
        } else {
            self.entries.insert(
                name.to_string(),
                Ingredient {
                    name: name.to_string(),
                    amount,
                    cost,
                    category: category.to_string(),
                },
            );
        }
    }

    /// Current unit cost for `name`, 0 when unknown.
    pub fn cost_of(&self, name: &str) -> f64 {
        self.entries.get(name).map_or(0.0, |entry| entry.cost)
    }

    pub fn get(&self, name: &str) -> Option<&Ingredient> {
        self.entries.get(name)
    }

    /// Set the unit cost in place, creating a zero-amount entry when the
    /// name has not been seen yet.
    pub fn set_cost(&mut self, name: &str, cost: f64) {
        self.entries
            .entry(name.to_string())
            .and_modify(|entry| entry.cost = cost)
            .or_insert_with(|| Ingredient {
                name: name.to_string(),
                amount: 0,
                cost,
                category: String::new(),
            });
    }

    /// Insert or replace a full entry (override migration path).
    pub fn insert(&mut self, ingredient: Ingredient) {
        self.entries.insert(ingredient.name.clone(), ingredient);
    }

    pub fn remove(&mut self, name: &str) -> Option<Ingredient> {
        self.entries.remove(name)
    }

    /// Zero every amount at the start of a pass. Entries are kept so their
    /// costs carry over; stale zero-amount rows are simply not displayed.
    pub fn reset_amounts(&mut self) {
        for entry in self.entries.values_mut() {
            entry.amount = 0;
        }
    }
}

/// A crafted sub-item row: demand, derived unit cost, and the recursion
/// depth at which it was first discovered this pass.
#[derive(Debug, Clone, PartialEq)]
pub struct IntermediateItem {
    pub name: String,
    pub amount: u64,
    pub cost: f64,
    pub level: u32,
    pub category: String,
}

/// Registry of crafted sub-items without a user override, plus snapshots of
/// their first-computed state for restoring cleared overrides.
#[derive(Debug, Default)]
pub struct IntermediateRegistry {
    entries: HashMap<String, IntermediateItem>,
    originals: HashMap<String, IntermediateItem>,
}

impl IntermediateRegistry {
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn get(&self, name: &str) -> Option<&IntermediateItem> {
        self.entries.get(name)
    }

    /// Record a freshly computed intermediate. Only the first computation in
    /// a pass sticks; it is also snapshotted so a later override can be
    /// cleared back to it.
    pub fn insert_first(&mut self, item: IntermediateItem) {
        if self.entries.contains_key(&item.name) {
            return;
        }
        self.originals.insert(item.name.clone(), item.clone());
        self.entries.insert(item.name.clone(), item);
    }

    pub fn remove(&mut self, name: &str) -> Option<IntermediateItem> {
        self.entries.remove(name)
    }

    /// Bring a previously overridden name back from its snapshot. Returns
    /// false when the name was never computed as an intermediate.
    pub fn restore(&mut self, name: &str) -> bool {
        match self.originals.get(name) {
            Some(snapshot) => {
                self.entries.insert(name.to_string(), snapshot.clone());
                true
            }
            None => false,
        }
    }

    /// Start a recompute pass: drain current entries and hand them back for
    /// reconciliation. Snapshots persist across passes.
    pub fn start_pass(&mut self) -> HashMap<String, IntermediateItem> {
        std::mem::take(&mut self.entries)
    }

    /// Merge prior-pass state into the fresh entries: a rediscovered name
    /// keeps its prior level, and overridden names keep their pinned cost.
    pub fn reconcile(
        &mut self,
        prior: &HashMap<String, IntermediateItem>,
        overrides: &HashMap<String, f64>,
    ) {
        for (name, previous) in prior {
            if let Some(entry) = self.entries.get_mut(name) {
                entry.level = previous.level;
                if let Some(&cost) = overrides.get(name) {
                    entry.cost = cost;
                }
            }
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &IntermediateItem> {
        self.entries.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accumulate_increments_amount() {
        let mut ledger = IngredientLedger::default();
        ledger.accumulate("Ash Wood", 3, 10.0, "Wood");
        ledger.accumulate("Ash Wood", 2, 10.0, "Wood");
        let entry = ledger.get("Ash Wood").unwrap();
        assert_eq!(entry.amount, 5);
        assert_eq!(entry.cost, 10.0);
        assert_eq!(entry.category, "Wood");
    }

    #[test]
    fn accumulate_keeps_cost_when_zero_supplied() {
        let mut ledger = IngredientLedger::default();
        ledger.set_cost("Iron", 25.0);
        ledger.accumulate("Iron", 4, 0.0, "Ore");
        let entry = ledger.get("Iron").unwrap();
        assert_eq!(entry.cost, 25.0);
        assert_eq!(entry.amount, 4);
        // category backfilled from the first real sighting
        assert_eq!(entry.category, "Ore");
    }

    #[test]
    fn reset_amounts_keeps_entries_and_costs() {
        let mut ledger = IngredientLedger::default();
        ledger.accumulate("Iron", 4, 25.0, "Ore");
        ledger.reset_amounts();
        let entry = ledger.get("Iron").unwrap();
        assert_eq!(entry.amount, 0);
        assert_eq!(entry.cost, 25.0);
    }

    fn hilt(cost: f64, level: u32) -> IntermediateItem {
        IntermediateItem {
            name: "Hilt".to_string(),
            amount: 1,
            cost,
            level,
            category: "Part".to_string(),
        }
    }

    #[test]
    fn insert_first_ignores_later_computations() {
        let mut registry = IntermediateRegistry::default();
        registry.insert_first(hilt(20.0, 2));
        registry.insert_first(hilt(99.0, 5));
        assert_eq!(registry.get("Hilt").unwrap().cost, 20.0);
        assert_eq!(registry.get("Hilt").unwrap().level, 2);
    }

    #[test]
    fn restore_uses_snapshot() {
        let mut registry = IntermediateRegistry::default();
        registry.insert_first(hilt(20.0, 2));
        registry.remove("Hilt");
        assert!(!registry.contains("Hilt"));
        assert!(registry.restore("Hilt"));
        assert_eq!(registry.get("Hilt").unwrap(), &hilt(20.0, 2));
        assert!(!registry.restore("Pommel"));
    }

    #[test]
    fn snapshots_survive_pass_boundaries() {
        let mut registry = IntermediateRegistry::default();
        registry.insert_first(hilt(20.0, 2));
        let prior = registry.start_pass();
        assert!(!registry.contains("Hilt"));
        assert_eq!(prior.len(), 1);
        assert!(registry.restore("Hilt"));
    }

    #[test]
    fn reconcile_restores_prior_level_and_pinned_cost() {
        let mut registry = IntermediateRegistry::default();
        registry.insert_first(hilt(20.0, 3));
        let prior = registry.start_pass();

        // rediscovered shallower in the next pass
        registry.insert_first(hilt(22.0, 2));
        let mut overrides = HashMap::new();
        overrides.insert("Hilt".to_string(), 100.0);
        registry.reconcile(&prior, &overrides);

        let entry = registry.get("Hilt").unwrap();
        assert_eq!(entry.level, 3);
        assert_eq!(entry.cost, 100.0);
    }
}
