//! Data layer
//!
//! - `models`: entity snapshots, follower records, outbox items
//! - `database`: SQLite persistence via SQLx

mod database;
mod models;

pub use database::Database;
pub use models::*;
