//! Durable stores for shortened URL records.

pub mod memory;
pub mod mysql;

pub use memory::InMemoryRepository;
pub use mysql::MySqlRepository;
pub use tinylink_core::{ReadRepository, Repository, StorageError, UrlRecord};

/// Schema for [`MySqlRepository`].
pub const MYSQL_SCHEMA: &str = include_str!("../ddl/mysql/short_urls.sql");
