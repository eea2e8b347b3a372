//! Recycling and environmental-impact statistics.
//!
//! The arithmetic lives in pure constructors over [`CategoryCounts`]; the
//! [`StatisticsAggregator`] only fetches counts from the record store.

use std::sync::Arc;

use serde::Serialize;

use crate::error::Result;
use crate::models::{Category, CategoryCounts};
use crate::repository::RecordStore;
use crate::utils::round_to;

/// Landfill mass diverted per classified item, in kilograms
pub const LANDFILL_KG_PER_ITEM: f64 = 0.3;
/// Litres of water saved per kilogram of CO2 saved
pub const WATER_L_PER_CO2_KG: f64 = 50.0;
/// Kilowatt-hours saved per kilogram of CO2 saved
pub const ENERGY_KWH_PER_CO2_KG: f64 = 2.5;

/// Item counts and recycling rate for one user
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BasicStats {
    /// Total classified items
    pub items_classified: u64,
    /// Percentage of items outside the trash category, one decimal place
    pub recycling_rate: f64,
    /// Count per category
    pub per_category: CategoryCounts,
}

impl BasicStats {
    /// Derive stats from per-category counts
    #[must_use]
    pub fn from_counts(counts: CategoryCounts) -> Self {
        Self {
            items_classified: counts.total(),
            recycling_rate: recycling_rate(&counts),
            per_category: counts,
        }
    }
}

/// Estimated environmental impact for one user
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct EcoStats {
    /// CO2 avoided, summed from per-category factors
    pub co2_saved_kg: f64,
    /// Mass kept out of landfill, every item counted
    pub landfill_diverted_kg: f64,
    /// Water saved, proportional to CO2 saved
    pub water_saved_l: f64,
    /// Energy saved, proportional to CO2 saved
    pub energy_saved_kwh: f64,
}

impl EcoStats {
    /// Derive impact estimates from per-category counts
    #[must_use]
    pub fn from_counts(counts: &CategoryCounts) -> Self {
        let co2: f64 = counts
            .iter()
            .map(|(category, n)| n as f64 * category.co2_saved_per_item_kg())
            .sum();
        let total = counts.total() as f64;

        Self {
            co2_saved_kg: round_to(co2, 2),
            landfill_diverted_kg: round_to(total * LANDFILL_KG_PER_ITEM, 2),
            water_saved_l: round_to(co2 * WATER_L_PER_CO2_KG, 2),
            energy_saved_kwh: round_to(co2 * ENERGY_KWH_PER_CO2_KG, 2),
        }
    }
}

/// Percentage of non-trash items, 0 when there are no items
#[must_use]
pub fn recycling_rate(counts: &CategoryCounts) -> f64 {
    let total = counts.total();
    if total == 0 {
        return 0.0;
    }

    let recyclable: u64 = counts
        .iter()
        .filter(|(category, _)| category.is_recyclable())
        .map(|(_, n)| n)
        .sum();

    round_to(recyclable as f64 / total as f64 * 100.0, 1)
}

/// Reads a user's counts from the store and derives statistics
#[derive(Clone)]
pub struct StatisticsAggregator {
    store: Arc<dyn RecordStore>,
}

impl StatisticsAggregator {
    /// Aggregator reading from `store`
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }

    /// Item counts and recycling rate
    pub fn basic_stats(&self, user_id: i64) -> Result<BasicStats> {
        Ok(BasicStats::from_counts(self.store.aggregate_by_category(user_id)?))
    }

    /// Environmental impact estimates
    pub fn eco_stats(&self, user_id: i64) -> Result<EcoStats> {
        Ok(EcoStats::from_counts(&self.store.aggregate_by_category(user_id)?))
    }
}

/// Counts in the shape older dashboards expect, keyed by display label
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LegacyCounts {
    /// Plastic items
    pub plastics: u64,
    /// Trash items, shown under the old "organics" label
    pub organics: u64,
    /// Paper items
    pub paper: u64,
    /// Glass items
    pub glass: u64,
    /// Metal items
    pub metals: u64,
    /// Cardboard items
    pub cardboard: u64,
}

impl From<&CategoryCounts> for LegacyCounts {
    fn from(counts: &CategoryCounts) -> Self {
        Self {
            plastics: counts.get(Category::Plastic),
            organics: counts.get(Category::Trash),
            paper: counts.get(Category::Paper),
            glass: counts.get(Category::Glass),
            metals: counts.get(Category::Metal),
            cardboard: counts.get(Category::Cardboard),
        }
    }
}
