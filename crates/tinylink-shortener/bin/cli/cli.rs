use clap::{Parser, Subcommand, ValueEnum};
use std::fmt::{Display, Formatter};
use tinylink_counter::CounterPath;

pub const COORDINATION_ADDR_ENV: &str = "TINYLINK_COORDINATION_ADDR";
pub const COUNTER_PATH_ENV: &str = "TINYLINK_COUNTER_PATH";
pub const RANGE_SIZE_ENV: &str = "TINYLINK_RANGE_SIZE";
pub const CACHE_ADDR_ENV: &str = "TINYLINK_CACHE_ADDR";
pub const CACHE_KEY_PREFIX_ENV: &str = "TINYLINK_CACHE_KEY_PREFIX";
pub const CACHE_TTL_SECS_ENV: &str = "TINYLINK_CACHE_TTL_SECS";
pub const STORAGE_BACKEND_ENV: &str = "TINYLINK_STORAGE_BACKEND";
pub const MYSQL_DSN_ENV: &str = "TINYLINK_MYSQL_DSN";
pub const STORE_TIMEOUT_MS_ENV: &str = "TINYLINK_STORE_TIMEOUT_MS";
pub const BASE_URL_ENV: &str = "TINYLINK_BASE_URL";

pub const DEFAULT_COORDINATION_ADDR: &str = "redis://127.0.0.1:6379";
pub const DEFAULT_COUNTER_PATH: &str = "/tinylink/counter";
pub const DEFAULT_CACHE_KEY_PREFIX: &str = "url";

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StorageBackendArg {
    #[value(name = "in-memory")]
    InMemory,
    #[value(name = "mysql")]
    Mysql,
}

impl Display for StorageBackendArg {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            StorageBackendArg::InMemory => write!(f, "in-memory"),
            StorageBackendArg::Mysql => write!(f, "mysql"),
        }
    }
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Print the short code for a URL, creating one if needed.
    Shorten {
        url: String,
        /// Days until the link expires; 0 keeps it forever.
        #[arg(long, default_value_t = 0)]
        expire_days: u32,
    },
    /// Print the URL behind a short code.
    Resolve { code: String },
}

#[derive(Debug, Parser)]
#[command(name = "tinylink")]
pub struct CLI {
    #[arg(long, env = COORDINATION_ADDR_ENV, default_value = DEFAULT_COORDINATION_ADDR)]
    pub coordination_addr: String,

    #[arg(long, env = COUNTER_PATH_ENV, default_value = DEFAULT_COUNTER_PATH)]
    pub counter_path: CounterPath,

    #[arg(
        long,
        env = RANGE_SIZE_ENV,
        default_value_t = 1_000,
        value_parser = clap::value_parser!(u64).range(1..),
    )]
    pub range_size: u64,

    /// Redis address for the shared lookup cache; an in-process cache is
    /// used when unset.
    #[arg(long, env = CACHE_ADDR_ENV)]
    pub cache_addr: Option<String>,

    #[arg(long, env = CACHE_KEY_PREFIX_ENV, default_value = DEFAULT_CACHE_KEY_PREFIX)]
    pub cache_key_prefix: String,

    #[arg(long, env = CACHE_TTL_SECS_ENV, default_value_t = 24 * 60 * 60)]
    pub cache_ttl_secs: u64,

    #[arg(
        long,
        env = STORAGE_BACKEND_ENV,
        value_enum,
        default_value_t = StorageBackendArg::InMemory
    )]
    pub storage: StorageBackendArg,

    #[arg(long, env = MYSQL_DSN_ENV, required_if_eq("storage", "mysql"))]
    pub mysql_dsn: Option<String>,

    /// Upper bound on each durable store call, in milliseconds.
    #[arg(long, env = STORE_TIMEOUT_MS_ENV, default_value_t = 2_000)]
    pub store_timeout_ms: u64,

    /// Prefix printed in front of new short codes, e.g. `https://tiny.link`.
    #[arg(long, env = BASE_URL_ENV)]
    pub base_url: Option<String>,

    /// Emit logs as JSON lines.
    #[arg(long)]
    pub log_json: bool,

    #[command(subcommand)]
    pub command: Command,
}

impl CLI {
    /// Records kept in process memory are gone once the command exits, so a
    /// later `resolve` cannot see codes issued by an earlier `shorten`.
    pub fn storage_warning(&self) -> Option<&'static str> {
        match self.storage {
            StorageBackendArg::InMemory => Some(
                "in-memory storage does not outlive this process; \
                 codes from earlier runs cannot be resolved",
            ),
            StorageBackendArg::Mysql => None,
        }
    }
}
