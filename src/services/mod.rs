// Service exports
pub mod cache;
pub mod catalog;

pub use cache::{CacheKey, CachedCatalog};
pub use catalog::{CatalogSnapshot, InMemoryCatalog, VenueCatalog};
