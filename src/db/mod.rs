pub mod files;
pub mod postgres;
pub mod redis;
pub mod source;

pub use files::FileCatalogSource;
pub use postgres::{create_pool, run_migrations, PostgresCatalogSource};
pub use redis::{create_redis_client, Cache, CacheKey, CacheWriterHandle};
pub use source::{load_dataset, CatalogSource, Enrichment};
