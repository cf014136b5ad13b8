mod database;
mod kv_store;

pub use database::Database;
pub use kv_store::SqliteKvStore;
