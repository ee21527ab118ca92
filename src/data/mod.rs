//! Data layer module
//!
//! Session persistence:
//! - `SessionStore` trait
//! - In-memory store (volatile, Moka TTL)
//! - SQLite store (durable, SQLx)

mod cache;
mod database;
mod store;

pub use cache::MemorySessionStore;
pub use database::SqliteSessionStore;
pub use store::SessionStore;
