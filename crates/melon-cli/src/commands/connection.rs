use clap::Args;
use melon_redis::{RedisInstance, RedisOptions};
use tracing::debug;

/// Store connection flags shared by every command
#[derive(Args, Debug, Clone)]
pub struct ConnectionArgs {
    /// Redis address as host:port
    #[arg(
        long,
        default_value = "localhost:6379",
        env = "MELON_REDIS_ADDRESS",
        global = true
    )]
    pub address: String,

    /// Redis ACL username
    #[arg(long, env = "MELON_REDIS_USERNAME", global = true)]
    pub username: Option<String>,

    /// Redis password
    #[arg(long, env = "MELON_REDIS_PASSWORD", global = true, hide_env_values = true)]
    pub password: Option<String>,

    /// Logical database index
    #[arg(long, default_value_t = 0, env = "MELON_REDIS_DB", global = true)]
    pub db: i64,

    /// Prefix applied to every key and channel
    #[arg(
        long,
        default_value = melon_redis::DEFAULT_NAMESPACE,
        env = "MELON_REDIS_NAMESPACE",
        global = true
    )]
    pub namespace: String,
}

impl ConnectionArgs {
    pub fn options(&self) -> RedisOptions {
        RedisOptions {
            address: self.address.clone(),
            username: self.username.clone().filter(|u| !u.is_empty()),
            password: self.password.clone().filter(|p| !p.is_empty()),
            db: self.db,
            namespace: self.namespace.clone(),
        }
    }

    pub async fn connect(&self) -> anyhow::Result<RedisInstance> {
        debug!("Connecting to {} (db {})", self.address, self.db);
        Ok(RedisInstance::create(self.options()).await?)
    }
}
