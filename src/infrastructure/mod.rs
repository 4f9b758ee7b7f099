// Infrastructure layer - External dependencies and adapters
pub mod catalog_table;
pub mod clock;
pub mod config;
pub mod file_cache;
pub mod sgs_repository;
