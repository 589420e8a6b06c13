use std::time::Duration;

use clap::Args;
use melon_redis::{Key, Ttl};
use tracing::info;

use super::ConnectionArgs;

#[derive(Args)]
pub struct PingCommand {}

impl PingCommand {
    pub fn execute(self, connection: ConnectionArgs) -> anyhow::Result<()> {
        let rt = tokio::runtime::Runtime::new()?;
        rt.block_on(self.run(connection))
    }

    async fn run(self, connection: ConnectionArgs) -> anyhow::Result<()> {
        // create() already pings
        let redis = connection.connect().await?;
        info!("{} is reachable (namespace {})", connection.address, redis.prefix());
        println!("PONG");
        Ok(())
    }
}

#[derive(Args)]
pub struct GetCommand {
    /// Logical key (without namespace)
    pub key: String,
}

impl GetCommand {
    pub fn execute(self, connection: ConnectionArgs) -> anyhow::Result<()> {
        let rt = tokio::runtime::Runtime::new()?;
        rt.block_on(self.run(connection))
    }

    async fn run(self, connection: ConnectionArgs) -> anyhow::Result<()> {
        let redis = connection.connect().await?;
        let value = redis.get(&Key::from(self.key)).await?;
        println!("{}", value);
        Ok(())
    }
}

#[derive(Args)]
pub struct SetCommand {
    /// Logical key (without namespace)
    pub key: String,
    pub value: String,
}

impl SetCommand {
    pub fn execute(self, connection: ConnectionArgs) -> anyhow::Result<()> {
        let rt = tokio::runtime::Runtime::new()?;
        rt.block_on(self.run(connection))
    }

    async fn run(self, connection: ConnectionArgs) -> anyhow::Result<()> {
        let redis = connection.connect().await?;
        redis.set(&Key::from(self.key), &self.value).await?;
        println!("OK");
        Ok(())
    }
}

#[derive(Args)]
pub struct DelCommand {
    /// Logical key (without namespace)
    pub key: String,
}

impl DelCommand {
    pub fn execute(self, connection: ConnectionArgs) -> anyhow::Result<()> {
        let rt = tokio::runtime::Runtime::new()?;
        rt.block_on(self.run(connection))
    }

    async fn run(self, connection: ConnectionArgs) -> anyhow::Result<()> {
        let redis = connection.connect().await?;
        let removed = redis.del(&Key::from(self.key)).await?;
        println!("{}", removed as u8);
        Ok(())
    }
}

#[derive(Args)]
pub struct ExpireCommand {
    /// Logical key (without namespace)
    pub key: String,

    /// Time-to-live in seconds; 0 deletes the key
    pub seconds: u64,
}

impl ExpireCommand {
    pub fn execute(self, connection: ConnectionArgs) -> anyhow::Result<()> {
        let rt = tokio::runtime::Runtime::new()?;
        rt.block_on(self.run(connection))
    }

    async fn run(self, connection: ConnectionArgs) -> anyhow::Result<()> {
        let redis = connection.connect().await?;
        let applied = redis
            .expire(&Key::from(self.key), Duration::from_secs(self.seconds))
            .await?;
        println!("{}", applied as u8);
        Ok(())
    }
}

#[derive(Args)]
pub struct TtlCommand {
    /// Logical key (without namespace)
    pub key: String,
}

impl TtlCommand {
    pub fn execute(self, connection: ConnectionArgs) -> anyhow::Result<()> {
        let rt = tokio::runtime::Runtime::new()?;
        rt.block_on(self.run(connection))
    }

    async fn run(self, connection: ConnectionArgs) -> anyhow::Result<()> {
        let redis = connection.connect().await?;
        match redis.ttl(&Key::from(self.key)).await? {
            Ttl::Missing => println!("(missing)"),
            Ttl::Persistent => println!("(no expiry)"),
            Ttl::Expires(left) => println!("{}ms", left.as_millis()),
        }
        Ok(())
    }
}
