//! `PostgreSQL` adapter for the task store port.

pub mod models;
pub mod schema;
mod store;

pub use store::{BoardPgPool, PostgresTaskStore};
