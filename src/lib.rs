//! Waste Sorter - Photo Classification and Recycling Statistics
//!
//! A Rust library and web service that sorts photos of waste into material
//! categories and keeps per-user recycling statistics.
//!
//! # Features
//!
//! - Six-way material classification, with a stub fallback when no model is loaded
//! - Per-user classification history in SQLite
//! - Recycling rate and environmental-impact estimates
//! - Hosted sign-in through an OpenID Connect provider
//! - Configurable upload policy

/// HTTP routes, sessions and error responses
pub mod api;
/// Image classification
pub mod classifier;
/// Configuration management
pub mod config;
/// SQLite record store
pub mod db;
/// Error types
pub mod error;
/// Identity provider client
pub mod identity;
/// Logging setup and utilities
pub mod logging;
/// Metrics collection
pub mod metrics;
/// Data models and structures
pub mod models;
/// Repository pattern for data access
pub mod repository;
/// Database schema definitions
pub mod schema;
/// Upload pipeline
pub mod service;
/// Statistics aggregation
pub mod stats;
/// Small shared helpers
pub mod utils;
/// Input validation and sanitization
pub mod validation;

// Re-export key components for easier access
pub use classifier::MaterialClassifier;
pub use db::Database;
pub use error::{Result, WasteSorterError};
pub use models::{Category, Classification, ClassificationSource};
pub use repository::RecordStore;
pub use service::UploadService;
pub use stats::StatisticsAggregator;
