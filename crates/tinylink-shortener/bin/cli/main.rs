mod cli;

use crate::cli::{Command, StorageBackendArg, CLI};
use anyhow::{anyhow, Context};
use clap::Parser;
use std::sync::Arc;
use std::time::Duration;
use tinylink_cache::{LookupCache, LookupCacheSettings, MokaUrlCache, RedisUrlCache};
use tinylink_core::{ExpirationPolicy, Repository, ShortenParams, Shortener, UrlCache};
use tinylink_counter::{
    AllocatorSettings, CounterSettings, CounterStore, RangeAllocator, RedisBackend,
};
use tinylink_generator::Generator;
use tinylink_shortener::ResolutionService;
use tinylink_storage::{InMemoryRepository, MySqlRepository};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = CLI::parse();
    init_tracing(config.log_json);

    info!(
        coordination_addr = %config.coordination_addr,
        counter_path = %config.counter_path,
        range_size = config.range_size,
        storage_backend = %config.storage,
        "starting tinylink"
    );
    if let Some(warning) = config.storage_warning() {
        warn!("{warning}");
    }

    let backend = RedisBackend::connect(&config.coordination_addr)
        .await
        .context("coordination service is unreachable")?;
    let counter = CounterSettings::builder()
        .path(config.counter_path.clone())
        .build();
    let store = Arc::new(
        CounterStore::connect(Arc::new(backend), counter)
            .await
            .context("failed to prepare counter path")?,
    );
    let allocator = Arc::new(
        RangeAllocator::new(
            store.clone(),
            AllocatorSettings::builder()
                .range_size(config.range_size)
                .build(),
        )
        .context("invalid allocator settings")?,
    );
    let cache = lookup_cache(&config).await;

    let outcome = match config.storage {
        StorageBackendArg::InMemory => {
            run(&config, InMemoryRepository::new(), allocator, cache).await
        }
        StorageBackendArg::Mysql => {
            let dsn = config
                .mysql_dsn
                .as_deref()
                .ok_or_else(|| anyhow!("mysql dsn is required when storage backend is mysql"))?;
            let repository = MySqlRepository::connect(dsn)
                .await
                .context("failed to connect to mysql")?;
            run(&config, repository, allocator, cache).await
        }
    };

    if let Err(e) = store.shutdown().await {
        warn!(error = %e, "failed to release coordination service");
    }
    outcome
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

async fn lookup_cache(config: &CLI) -> LookupCache<dyn UrlCache> {
    let settings = LookupCacheSettings::builder()
        .ttl(Duration::from_secs(config.cache_ttl_secs))
        .build();

    let cache: Arc<dyn UrlCache> = match &config.cache_addr {
        Some(addr) => match RedisUrlCache::connect(addr, config.cache_key_prefix.clone()).await {
            Ok(cache) => Arc::new(cache),
            Err(e) => {
                warn!(error = %e, "lookup cache unavailable, using in-process cache");
                Arc::new(MokaUrlCache::new())
            }
        },
        None => Arc::new(MokaUrlCache::new()),
    };

    LookupCache::new(cache, settings)
}

async fn run<R: Repository, G: Generator>(
    config: &CLI,
    repository: R,
    generator: Arc<G>,
    cache: LookupCache<dyn UrlCache>,
) -> anyhow::Result<()> {
    let service = ResolutionService::new(Arc::new(repository), generator, cache)
        .with_store_timeout(Duration::from_millis(config.store_timeout_ms));

    match &config.command {
        Command::Shorten { url, expire_days } => {
            let params = ShortenParams::new(url.as_str())
                .with_expiration(ExpirationPolicy::after_days(*expire_days));
            let record = service.shorten(params).await?;
            match &config.base_url {
                Some(base) => println!("{}", record.code.to_url(base)),
                None => println!("{}", record.code),
            }
        }
        Command::Resolve { code } => match service.resolve(code).await? {
            Some(url) => println!("{url}"),
            None => return Err(anyhow!("short code '{code}' not found")),
        },
    }

    Ok(())
}
