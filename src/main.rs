//! Dofus Craftimizer
//!
//! A crafting cost and profit calculator for Dofus.

mod catalog;
mod fetch;
mod ledger;
mod models;
mod planner;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};

use crate::catalog::Catalog;
use crate::models::{AnkamaId, ItemDefinition};
use crate::planner::{Planner, TrackedItem};

#[derive(Parser)]
#[command(name = "craftimizer")]
#[command(about = "Crafting cost and profit calculator for Dofus")]
struct Cli {
    /// Directory holding the catalog JSON files
    #[arg(short, long, default_value = "data")]
    data_dir: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Download the item catalogs from the dofusdu.de API
    Fetch,

    /// Search the catalog by item name
    Search {
        /// Case-insensitive name fragment
        query: String,
    },

    /// Show one item's definition and recipe
    Item {
        /// Ankama id or item name
        item: String,
    },

    /// Compute crafting costs and profits for a list of items
    Calc {
        /// Items to craft, as NAME_OR_ID[:QUANTITY[:SELL_PRICE]]
        #[arg(required = true)]
        items: Vec<String>,

        /// Unit cost for a raw material, as NAME=COST (repeatable)
        #[arg(short, long = "cost", value_name = "NAME=COST")]
        costs: Vec<String>,

        /// Pinned unit cost for a crafted item, as NAME=COST (repeatable)
        #[arg(short, long = "override", value_name = "NAME=COST")]
        overrides: Vec<String>,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Fetch => {
            let stats = fetch::fetch_catalog(&cli.data_dir)?;
            println!("\n{stats}");
        }

        Commands::Search { query } => {
            let catalog = load_catalog(&cli.data_dir)?;
            let results = catalog.find_by_name(&query);
            if results.is_empty() {
                println!("No items matching '{query}'");
            } else {
                println!("{:<40} {:>6}  {}", "Name", "Level", "Category");
                println!("{}", "-".repeat(64));
                for item in results {
                    let level = item.level.map_or("-".to_string(), |level| level.to_string());
                    println!("{:<40} {:>6}  {}", item.name, level, item.category);
                }
            }
        }

        Commands::Item { item } => {
            let catalog = load_catalog(&cli.data_dir)?;
            match lookup(&catalog, &item) {
                Some(found) => print_item(&catalog, found),
                None => println!("Item '{item}' not found"),
            }
        }

        Commands::Calc {
            items,
            costs,
            overrides,
        } => {
            let catalog = load_catalog(&cli.data_dir)?;
            run_calc(&catalog, &items, &costs, &overrides)?;
        }
    }

    Ok(())
}

fn load_catalog(data_dir: &Path) -> Result<Catalog> {
    let catalog = Catalog::load_dir(data_dir)?;
    if catalog.is_empty() {
        bail!(
            "no catalog files in {}. Run 'fetch' first.",
            data_dir.display()
        );
    }
    Ok(catalog)
}

/// Resolve an item reference that is either an Ankama id or a name.
fn lookup<'c>(catalog: &'c Catalog, reference: &str) -> Option<&'c ItemDefinition> {
    match reference.parse::<AnkamaId>() {
        Ok(id) => catalog.find_by_id(id),
        Err(_) => catalog.find_by_name(reference).into_iter().next(),
    }
}

fn print_item(catalog: &Catalog, item: &ItemDefinition) {
    println!("{} (id {})", item.name, item.id);
    if let Some(level) = item.level {
        println!("  Level:    {level}");
    }
    println!("  Category: {}", item.category);

    if item.recipe.is_empty() {
        println!("  Raw material (no recipe)");
        return;
    }
    println!("  Recipe:");
    for line in &item.recipe {
        let Some(sub_item_id) = line.sub_item_id else {
            continue;
        };
        match catalog.find_by_id(sub_item_id) {
            Some(sub) => println!("    {}x {}", line.quantity, sub.name),
            None => println!("    {}x #{sub_item_id} (not in catalog)", line.quantity),
        }
    }
}

fn run_calc(catalog: &Catalog, items: &[String], costs: &[String], overrides: &[String]) -> Result<()> {
    let mut planner = Planner::new();
    for spec in costs {
        let (name, cost) = parse_cost_spec(spec)?;
        planner.set_ingredient_cost(&name, cost)?;
    }
    for spec in overrides {
        let (name, cost) = parse_cost_spec(spec)?;
        planner.set_override(&name, Some(cost))?;
    }
    planner.set_tracked_items(
        items
            .iter()
            .map(|spec| parse_item_spec(spec))
            .collect::<Result<Vec<_>>>()?,
    );

    let report = planner.recompute(catalog);

    println!("{:<40} {:>6} {:>14} {:>14}", "Item", "Qty", "Cost/Unit", "Profit/Unit");
    println!("{}", "-".repeat(78));
    for row in &report.per_item {
        println!(
            "{:<40} {:>6} {:>14.2} {:>14.2}",
            row.name, row.quantity, row.unit_cost, row.profit
        );
    }

    if !report.ingredients.is_empty() {
        println!();
        println!("Ingredients:");
        println!("{:<40} {:>8} {:>14}  {}", "Name", "Amount", "Cost/Unit", "Category");
        println!("{}", "-".repeat(78));
        let mut any_explained = false;
        for row in &report.ingredients {
            let marker = if planner.is_fully_explained(&row.name) {
                any_explained = true;
                " *"
            } else {
                ""
            };
            println!(
                "{:<40} {:>8} {:>14.2}  {}{marker}",
                row.name, row.amount, row.cost, row.category
            );
        }
        if any_explained {
            println!("  * every consumer carries a user-set cost");
        }
    }

    if !report.intermediates.is_empty() {
        println!();
        println!("Intermediate items:");
        println!(
            "{:<40} {:>8} {:>14} {:>6}  {}",
            "Name", "Amount", "Cost/Unit", "Level", "Category"
        );
        println!("{}", "-".repeat(78));
        for row in &report.intermediates {
            println!(
                "{:<40} {:>8} {:>14.2} {:>6}  {}",
                row.name, row.amount, row.cost, row.level, row.category
            );
        }
    }

    let diagnostics = report.diagnostics;
    if diagnostics.lookup_misses > 0 || diagnostics.cycles > 0 {
        println!();
        println!(
            "Warnings: {} catalog lookup misses, {} cyclic recipe branches",
            diagnostics.lookup_misses, diagnostics.cycles
        );
    }

    Ok(())
}

/// Parse `NAME_OR_ID[:QUANTITY[:SELL_PRICE]]` into a tracked item.
fn parse_item_spec(spec: &str) -> Result<TrackedItem> {
    let parts: Vec<&str> = spec.split(':').collect();
    if parts[0].is_empty() || parts.len() > 3 {
        bail!("invalid item spec '{spec}', expected NAME_OR_ID[:QUANTITY[:SELL_PRICE]]");
    }
    let quantity = match parts.get(1) {
        Some(raw) => raw
            .parse::<u64>()
            .with_context(|| format!("invalid quantity in '{spec}'"))?,
        None => 1,
    };
    let sell_price = match parts.get(2) {
        Some(raw) => raw
            .parse::<f64>()
            .with_context(|| format!("invalid sell price in '{spec}'"))?,
        None => 0.0,
    };
    Ok(TrackedItem {
        reference: parts[0].to_string(),
        quantity,
        sell_price,
    })
}

/// Parse `NAME=COST` into a (name, cost) pair.
fn parse_cost_spec(spec: &str) -> Result<(String, f64)> {
    let Some((name, raw_cost)) = spec.split_once('=') else {
        bail!("invalid cost spec '{spec}', expected NAME=COST");
    };
    if name.is_empty() {
        bail!("invalid cost spec '{spec}', expected NAME=COST");
    }
    let cost = raw_cost
        .parse::<f64>()
        .with_context(|| format!("invalid cost in '{spec}'"))?;
    Ok((name.to_string(), cost))
}
