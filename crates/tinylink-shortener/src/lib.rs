//! Shortening and resolution of Tinylink short codes.

pub mod service;

pub use service::ResolutionService;
pub use tinylink_core::{ExpirationPolicy, ShortenParams, Shortener, ShortenerError};
