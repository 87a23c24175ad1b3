use crate::Result;
use sqlx::mysql::{MySqlPool, MySqlPoolOptions};
use std::time::Duration;
use testcontainers::core::{IntoContainerPort, WaitFor};
use testcontainers::runners::AsyncRunner;
use testcontainers::ImageExt;
use testcontainers::{ContainerAsync, GenericImage};
use typed_builder::TypedBuilder;

const CONNECT_ATTEMPTS: u32 = 20;

#[derive(TypedBuilder)]
pub struct MysqlConfig {
    #[builder(default = "tinylink".to_string())]
    database: String,
    #[builder(default = "tinylink".to_string())]
    username: String,
    #[builder(default = "tinylink".to_string())]
    password: String,
    #[builder(default = 5)]
    max_connections: u32,
}

/// Test fixture for a disposable MySQL server.
pub struct MySqlServer {
    container: ContainerAsync<GenericImage>,
    config: MysqlConfig,
}

impl MySqlServer {
    /// Starts a MySQL container suitable for integration tests.
    pub async fn new(config: MysqlConfig) -> Result<Self> {
        let container = GenericImage::new("mysql", "8.4")
            .with_exposed_port(3306_u16.tcp())
            .with_wait_for(WaitFor::message_on_stderr("ready for connections"))
            .with_env_var("MYSQL_DATABASE", config.database.as_str())
            .with_env_var("MYSQL_USER", config.username.as_str())
            .with_env_var("MYSQL_PASSWORD", config.password.as_str())
            .with_env_var("MYSQL_ROOT_PASSWORD", "root")
            .start()
            .await?;

        Ok(Self { container, config })
    }

    pub async fn database_url(&self) -> Result<String> {
        let host = self.container.get_host().await?;
        let port = self.container.get_host_port_ipv4(3306).await?;
        Ok(format!(
            "mysql://{}:{}@{}:{}/{}",
            self.config.username, self.config.password, host, port, self.config.database
        ))
    }

    /// Opens a pool, retrying while MySQL finishes its first-boot restart.
    pub async fn pool(&self) -> Result<MySqlPool> {
        let url = self.database_url().await?;

        let mut attempt = 0;
        loop {
            match MySqlPoolOptions::new()
                .max_connections(self.config.max_connections)
                .connect(&url)
                .await
            {
                Ok(pool) => return Ok(pool),
                Err(err) if attempt >= CONNECT_ATTEMPTS => return Err(err.into()),
                Err(_) => {
                    attempt += 1;
                    tokio::time::sleep(Duration::from_millis(500)).await;
                }
            }
        }
    }

    /// Runs a DDL script, one statement at a time.
    pub async fn apply_schema(&self, pool: &MySqlPool, ddl: &str) -> Result<()> {
        for statement in ddl.split(';').map(str::trim).filter(|s| !s.is_empty()) {
            sqlx::query(statement).execute(pool).await?;
        }
        Ok(())
    }
}
