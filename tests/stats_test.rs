//! Tests for recycling and environmental-impact statistics

use proptest::prelude::*;
use waste_sorter::models::{Category, CategoryCounts};
use waste_sorter::stats::{recycling_rate, BasicStats, EcoStats};

fn counts(pairs: &[(Category, u64)]) -> CategoryCounts {
    pairs.iter().copied().collect()
}

fn approx(actual: f64, expected: f64) {
    assert!((actual - expected).abs() < 1e-9, "expected {expected}, got {actual}");
}

#[test]
fn test_no_items_gives_zero_rate() {
    let stats = BasicStats::from_counts(CategoryCounts::new());
    assert_eq!(stats.items_classified, 0);
    approx(stats.recycling_rate, 0.0);
}

#[test]
fn test_recycling_rate_excludes_trash() {
    approx(recycling_rate(&counts(&[(Category::Cardboard, 3), (Category::Trash, 1)])), 75.0);
    approx(recycling_rate(&counts(&[(Category::Trash, 5)])), 0.0);
    approx(recycling_rate(&counts(&[(Category::Glass, 2), (Category::Paper, 2)])), 100.0);
}

#[test]
fn test_recycling_rate_rounds_to_one_place() {
    approx(recycling_rate(&counts(&[(Category::Plastic, 1), (Category::Trash, 2)])), 33.3);
}

#[test]
fn test_recycling_rate_halves_round_to_even() {
    // Each rate lands exactly on a hundredth ending in 5
    let cases = [
        (Category::Paper, 1, 15, 6.2),
        (Category::Paper, 5, 11, 31.2),
        (Category::Glass, 3, 13, 18.8),
        (Category::Metal, 9, 7, 56.2),
    ];

    for (category, recycled, trash, expected) in cases {
        let rate = recycling_rate(&counts(&[(category, recycled), (Category::Trash, trash)]));
        assert_eq!(rate, expected, "{recycled} {category:?} with {trash} trash");
    }
}

#[test]
fn test_basic_stats_lists_every_category() {
    let stats = BasicStats::from_counts(counts(&[(Category::Metal, 2)]));
    assert_eq!(stats.items_classified, 2);

    let json = serde_json::to_value(&stats).unwrap();
    let per_category = json["per_category"].as_object().unwrap();
    assert_eq!(per_category.len(), 6);
    assert_eq!(per_category["metal"], 2);
    assert_eq!(per_category["trash"], 0);
}

#[test]
fn test_eco_stats_metal_and_trash() {
    let eco = EcoStats::from_counts(&counts(&[(Category::Metal, 2), (Category::Trash, 1)]));
    approx(eco.co2_saved_kg, 5.0);
    approx(eco.landfill_diverted_kg, 0.9);
    approx(eco.water_saved_l, 250.0);
    approx(eco.energy_saved_kwh, 12.5);
}

#[test]
fn test_eco_stats_empty() {
    let eco = EcoStats::from_counts(&CategoryCounts::new());
    approx(eco.co2_saved_kg, 0.0);
    approx(eco.landfill_diverted_kg, 0.0);
    approx(eco.water_saved_l, 0.0);
    approx(eco.energy_saved_kwh, 0.0);
}

#[test]
fn test_eco_stats_uses_per_category_factors() {
    let eco = EcoStats::from_counts(&counts(&[
        (Category::Cardboard, 1),
        (Category::Glass, 1),
        (Category::Paper, 1),
        (Category::Plastic, 1),
    ]));
    // 0.8 + 0.3 + 1.5 + 0.5
    approx(eco.co2_saved_kg, 3.1);
    approx(eco.landfill_diverted_kg, 1.2);
}

proptest! {
    #[test]
    fn prop_recycling_rate_is_a_percentage(
        cardboard in 0u64..500,
        glass in 0u64..500,
        metal in 0u64..500,
        paper in 0u64..500,
        plastic in 0u64..500,
        trash in 0u64..500,
    ) {
        let counts = counts(&[
            (Category::Cardboard, cardboard),
            (Category::Glass, glass),
            (Category::Metal, metal),
            (Category::Paper, paper),
            (Category::Plastic, plastic),
            (Category::Trash, trash),
        ]);
        let rate = recycling_rate(&counts);
        prop_assert!((0.0..=100.0).contains(&rate));

        let eco = EcoStats::from_counts(&counts);
        prop_assert!(eco.co2_saved_kg >= 0.0);
        prop_assert!(eco.water_saved_l >= eco.co2_saved_kg);
    }
}
