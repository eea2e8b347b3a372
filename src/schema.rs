//! Database schema definitions
//!
//! This module provides constants for table and column names used with rusqlite.

/// Users table schema
pub mod users {
    /// Table name
    pub const TABLE: &str = "users";
    /// Primary key column
    pub const ID: &str = "id";
    /// Identity provider subject id column
    pub const EXTERNAL_ID: &str = "auth0_id";
    /// Display name column
    pub const USERNAME: &str = "username";
    /// Email address column
    pub const EMAIL: &str = "email";
    /// Creation timestamp column
    pub const CREATED_AT: &str = "created_at";
}

/// Classifications table schema
pub mod classifications {
    /// Table name
    pub const TABLE: &str = "classifications";
    /// Primary key column
    pub const ID: &str = "id";
    /// Foreign key to users table
    pub const USER_ID: &str = "user_id";
    /// Stored image path column
    pub const IMAGE_PATH: &str = "image_path";
    /// Predicted category column
    pub const CATEGORY: &str = "waste_type";
    /// Confidence percentage column
    pub const CONFIDENCE: &str = "confidence";
    /// Prediction provenance column
    pub const SOURCE: &str = "source";
    /// Creation timestamp column
    pub const CREATED_AT: &str = "created_at";
}

/// Ordered migration scripts; the index of each entry plus one is the
/// `user_version` the database reports once it has been applied.
pub const MIGRATIONS: &[(&str, &str)] = &[
    (
        "create_tables",
        include_str!("../migrations/2025-06-01-000000_create_tables/up.sql"),
    ),
    (
        "add_classification_source",
        include_str!("../migrations/2025-06-08-000000_add_classification_source/up.sql"),
    ),
];
