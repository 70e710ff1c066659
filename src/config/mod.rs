/// Database configuration and connection management
pub mod database;

/// Seller personalization catalog loading from a TOML file
pub mod catalog;
