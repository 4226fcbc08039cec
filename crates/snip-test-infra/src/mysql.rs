use crate::{Result, TestInfraError};
use sqlx::mysql::{MySqlPool, MySqlPoolOptions};
use std::time::Duration;
use testcontainers::core::{IntoContainerPort, WaitFor};
use testcontainers::runners::AsyncRunner;
use testcontainers::ImageExt;
use testcontainers::{ContainerAsync, ContainerRequest, GenericImage};
use typed_builder::TypedBuilder;

const MYSQL_PORT: u16 = 3306;

// The entrypoint also logs this line for the temporary server it runs to
// initialise the data directory, so it only means startup has begun.
// `connect` retries until the real server accepts connections.
const READY_LINE: &str = "ready for connections";

#[derive(Debug, Clone, TypedBuilder)]
pub struct MysqlConfig {
    #[builder(default = "snip".to_string())]
    database: String,
    #[builder(default = "snip".to_string())]
    username: String,
    #[builder(default = "snip".to_string())]
    password: String,
    #[builder(default = "8.4".to_string())]
    tag: String,
    /// Pool size used by [`MySqlServer::connect`].
    #[builder(default = 5)]
    max_connections: u32,
    /// How many times [`MySqlServer::connect`] tries before giving up.
    #[builder(default = 20)]
    connect_attempts: u32,
    #[builder(default = Duration::from_millis(500))]
    connect_backoff: Duration,
}

impl MysqlConfig {
    /// Returns the `mysql://` URL of the test database served at `host:port`.
    pub fn database_url(&self, host: &str, port: u16) -> String {
        format!(
            "mysql://{}:{}@{}:{}/{}",
            self.username, self.password, host, port, self.database
        )
    }

    fn image(&self) -> ContainerRequest<GenericImage> {
        GenericImage::new("mysql", self.tag.as_str())
            .with_exposed_port(MYSQL_PORT.tcp())
            .with_wait_for(WaitFor::message_on_stderr(READY_LINE))
            .with_env_var("MYSQL_DATABASE", self.database.as_str())
            .with_env_var("MYSQL_USER", self.username.as_str())
            .with_env_var("MYSQL_PASSWORD", self.password.as_str())
            .with_env_var("MYSQL_ROOT_PASSWORD", "root")
    }
}

/// A disposable MySQL server holding the `target_urls` table.
pub struct MySqlServer {
    container: ContainerAsync<GenericImage>,
    config: MysqlConfig,
}

impl MySqlServer {
    pub async fn new(config: MysqlConfig) -> Result<Self> {
        let container = config.image().start().await?;
        Ok(Self { container, config })
    }

    /// Returns the host and mapped port the server is reachable at.
    pub async fn endpoint(&self) -> Result<(String, u16)> {
        let host = self.container.get_host().await?.to_string();
        let port = self.container.get_host_port_ipv4(MYSQL_PORT).await?;
        Ok((host, port))
    }

    pub async fn database_url(&self) -> Result<String> {
        let (host, port) = self.endpoint().await?;
        Ok(self.config.database_url(&host, port))
    }

    /// Opens a connection pool, retrying while the server warms up.
    pub async fn connect(&self) -> Result<MySqlPool> {
        let url = self.database_url().await?;
        let mut last_error = None;

        for _ in 0..self.config.connect_attempts {
            match MySqlPoolOptions::new()
                .max_connections(self.config.max_connections)
                .connect(&url)
                .await
            {
                Ok(pool) => return Ok(pool),
                Err(err) => {
                    last_error = Some(err);
                    tokio::time::sleep(self.config.connect_backoff).await;
                }
            }
        }

        Err(TestInfraError::NotReady {
            attempts: self.config.connect_attempts,
            reason: last_error
                .map(|err| err.to_string())
                .unwrap_or_else(|| "no connection attempt made".to_string()),
        })
    }
}
