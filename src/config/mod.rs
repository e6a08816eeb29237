/// Database configuration and connection management
pub mod database;

/// Reference data loading from master_data.toml
pub mod master_data;

/// Environment-sourced settings
pub mod settings;
