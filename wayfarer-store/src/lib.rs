pub mod app_config;
pub mod database;
pub mod memory;
pub mod postgres;
pub mod seed;

pub use app_config::Config;
pub use database::DbClient;
pub use memory::MemoryStore;
pub use postgres::{PgBookingStore, PgCatalogRepository};
pub use seed::{seed_sample_catalog, SeedSummary};
