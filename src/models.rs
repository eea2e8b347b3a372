//! Data models for classification and storage
//!
//! This module contains the data structures shared by the classifier, the
//! record store and the statistics layer. The waste category set is defined
//! here once and every other module derives its labels and tables from it.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::error::WasteSorterError;

/// Waste material category predicted for an image
///
/// Declaration order is the model's output index order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    /// Corrugated and flat cardboard
    Cardboard,
    /// Glass bottles and jars
    Glass,
    /// Cans and other metal items
    Metal,
    /// Paper products
    Paper,
    /// Plastic containers and packaging
    Plastic,
    /// Non-recyclable waste
    Trash,
}

impl Category {
    /// All categories in model output order
    pub const ALL: [Self; 6] = [
        Self::Cardboard,
        Self::Glass,
        Self::Metal,
        Self::Paper,
        Self::Plastic,
        Self::Trash,
    ];

    /// Lowercase label used in storage and JSON
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Cardboard => "cardboard",
            Self::Glass => "glass",
            Self::Metal => "metal",
            Self::Paper => "paper",
            Self::Plastic => "plastic",
            Self::Trash => "trash",
        }
    }

    /// Category for a model output index
    #[must_use]
    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    /// Whether items of this category count towards the recycling rate
    #[must_use]
    pub const fn is_recyclable(self) -> bool {
        !matches!(self, Self::Trash)
    }

    /// Kilograms of CO2 saved by recycling one item of this category
    #[must_use]
    pub const fn co2_saved_per_item_kg(self) -> f64 {
        match self {
            Self::Cardboard => 0.8,
            Self::Glass => 0.3,
            Self::Metal => 2.5,
            Self::Paper => 1.5,
            Self::Plastic => 0.5,
            Self::Trash => 0.0,
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = WasteSorterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|category| category.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| WasteSorterError::InvalidCategory(s.to_string()))
    }
}

/// Where a classification result came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClassificationSource {
    /// Produced by a forward pass of the trained model
    Model,
    /// Produced by the degraded-mode stub
    Stub,
}

impl ClassificationSource {
    /// Lowercase label used in storage and JSON
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Model => "model",
            Self::Stub => "stub",
        }
    }
}

impl FromStr for ClassificationSource {
    type Err = WasteSorterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "model" => Ok(Self::Model),
            "stub" => Ok(Self::Stub),
            other => Err(WasteSorterError::InvalidRecord(format!(
                "unknown classification source: {other}"
            ))),
        }
    }
}

/// A single classifier prediction
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    /// Predicted category
    pub category: Category,
    /// Certainty of the top prediction as a percentage in [0, 100]
    pub confidence: f64,
    /// Whether the prediction is a real inference or a stub
    pub source: ClassificationSource,
}

/// User identity as reported by the identity provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserIdentity {
    /// Provider subject id (`sub` claim)
    pub subject: String,
    /// Display name
    pub name: String,
    /// Email address (optional)
    pub email: Option<String>,
    /// Avatar URL (optional)
    pub picture: Option<String>,
}

/// Database representation of a user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DbUser {
    /// Database primary key
    pub id: i64,
    /// Provider subject id
    pub external_id: String,
    /// Display name
    pub username: String,
    /// Email address
    pub email: Option<String>,
    /// Timestamp when the user was first seen
    pub created_at: NaiveDateTime,
}

/// Data for creating a user on first login
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUser {
    /// Provider subject id
    pub external_id: String,
    /// Display name
    pub name: String,
    /// Email address
    pub email: Option<String>,
}

impl From<&UserIdentity> for NewUser {
    fn from(identity: &UserIdentity) -> Self {
        Self {
            external_id: identity.subject.clone(),
            name: identity.name.clone(),
            email: identity.email.clone(),
        }
    }
}

/// Data for appending a classification record
#[derive(Debug, Clone)]
pub struct NewClassification {
    /// Foreign key to users table
    pub user_id: i64,
    /// Path of the stored image
    pub image_path: String,
    /// Predicted category
    pub category: Category,
    /// Confidence percentage
    pub confidence: f64,
    /// Prediction provenance
    pub source: ClassificationSource,
}

impl NewClassification {
    /// Build a record for a classifier result
    #[must_use]
    pub fn from_result(user_id: i64, image_path: String, result: &Classification) -> Self {
        Self {
            user_id,
            image_path,
            category: result.category,
            confidence: result.confidence,
            source: result.source,
        }
    }
}

/// Database representation of a classification
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassificationRecord {
    /// Database primary key
    pub id: i64,
    /// Foreign key to users table
    pub user_id: i64,
    /// Path of the stored image
    pub image_path: String,
    /// Predicted category
    pub category: Category,
    /// Confidence percentage
    pub confidence: f64,
    /// Prediction provenance
    pub source: ClassificationSource,
    /// Timestamp when the record was written
    pub created_at: NaiveDateTime,
}

/// Number of classified items per category for one user
///
/// Every category is always present, with zero for categories never seen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct CategoryCounts(BTreeMap<Category, u64>);

impl Default for CategoryCounts {
    fn default() -> Self {
        Self(Category::ALL.into_iter().map(|c| (c, 0)).collect())
    }
}

impl CategoryCounts {
    /// Empty counts
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `count` items to a category
    pub fn add(&mut self, category: Category, count: u64) {
        *self.0.entry(category).or_insert(0) += count;
    }

    /// Count for one category
    #[must_use]
    pub fn get(&self, category: Category) -> u64 {
        self.0.get(&category).copied().unwrap_or(0)
    }

    /// Total number of items across categories
    #[must_use]
    pub fn total(&self) -> u64 {
        self.0.values().sum()
    }

    /// Iterate over (category, count) pairs in category order
    pub fn iter(&self) -> impl Iterator<Item = (Category, u64)> + '_ {
        self.0.iter().map(|(c, n)| (*c, *n))
    }
}

impl FromIterator<(Category, u64)> for CategoryCounts {
    fn from_iter<I: IntoIterator<Item = (Category, u64)>>(iter: I) -> Self {
        let mut counts = Self::new();
        for (category, count) in iter {
            counts.add(category, count);
        }
        counts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_round_trips_through_label() {
        for category in Category::ALL {
            assert_eq!(category.as_str().parse::<Category>().unwrap(), category);
        }
        assert_eq!("Glass".parse::<Category>().unwrap(), Category::Glass);
        assert!("organic".parse::<Category>().is_err());
    }

    #[test]
    fn test_index_order_matches_declaration() {
        assert_eq!(Category::from_index(0), Some(Category::Cardboard));
        assert_eq!(Category::from_index(5), Some(Category::Trash));
        assert_eq!(Category::from_index(6), None);
    }

    #[test]
    fn test_counts_include_every_category() {
        let counts: CategoryCounts = [(Category::Metal, 2), (Category::Metal, 1)].into_iter().collect();
        assert_eq!(counts.get(Category::Metal), 3);
        assert_eq!(counts.get(Category::Paper), 0);
        assert_eq!(counts.iter().count(), 6);
        assert_eq!(counts.total(), 3);
    }

    #[test]
    fn test_counts_serialize_as_label_map() {
        let counts: CategoryCounts = [(Category::Glass, 4)].into_iter().collect();
        let json = serde_json::to_value(&counts).unwrap();
        assert_eq!(json["glass"], 4);
        assert_eq!(json["trash"], 0);
    }
}
