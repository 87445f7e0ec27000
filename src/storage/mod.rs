mod repository;

pub use repository::*;

/// SQL migration for cars and cost categories
pub const MIGRATION_001_INITIAL: &str = include_str!("migrations/001_initial.sql");

/// SQL migration for the two depreciation series
pub const MIGRATION_002_DEPRECIATION: &str = include_str!("migrations/002_depreciation.sql");
