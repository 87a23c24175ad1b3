//! Core types and traits for the Tinylink URL shortener.
//!
//! This crate holds the pieces every other Tinylink crate agrees on: the
//! base62 short code codec, the stored record shape, and the contracts the
//! resolution service needs from its durable store and its cache.

pub mod base62;
pub mod cache;
pub mod error;
pub mod repository;
pub mod shortcode;
pub mod shortener;

pub use cache::UrlCache;
pub use error::{CacheError, CoreError, ShortenerError, StorageError};
pub use repository::{ReadRepository, Repository, UrlRecord};
pub use shortcode::ShortCode;
pub use shortener::{ExpirationPolicy, ShortenParams, Shortener};
