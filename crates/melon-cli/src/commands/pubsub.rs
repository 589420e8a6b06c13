use clap::Args;
use melon_redis::Key;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use super::ConnectionArgs;

#[derive(Args)]
pub struct PublishCommand {
    /// Logical channel (without namespace)
    pub channel: String,
    pub payload: String,
}

impl PublishCommand {
    pub fn execute(self, connection: ConnectionArgs) -> anyhow::Result<()> {
        let rt = tokio::runtime::Runtime::new()?;
        rt.block_on(self.run(connection))
    }

    async fn run(self, connection: ConnectionArgs) -> anyhow::Result<()> {
        let redis = connection.connect().await?;
        let receivers = redis.publish(&Key::from(self.channel), &self.payload).await?;
        println!("{}", receivers);
        Ok(())
    }
}

#[derive(Args)]
pub struct SubscribeCommand {
    /// Logical channel (without namespace)
    pub channel: String,

    /// Print the envelope type in front of typed payloads
    #[arg(long)]
    pub envelope: bool,
}

impl SubscribeCommand {
    pub fn execute(self, connection: ConnectionArgs) -> anyhow::Result<()> {
        let rt = tokio::runtime::Runtime::new()?;
        rt.block_on(self.run(connection))
    }

    async fn run(self, connection: ConnectionArgs) -> anyhow::Result<()> {
        let redis = connection.connect().await?;
        let cancellation_token = CancellationToken::new();

        let token = cancellation_token.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("Received Ctrl-C, unsubscribing");
            }
            token.cancel();
        });

        let channel = Key::from(self.channel);
        let mut subscription = redis.subscribe(&channel, cancellation_token.clone()).await?;
        info!("Subscribed to {}{}", redis.prefix(), channel);

        while let Some(message) = subscription.recv().await {
            if self.envelope {
                match message.envelope() {
                    Ok(envelope) => {
                        println!("[{}] {} {}", message.channel, envelope.event_type, envelope.data)
                    }
                    Err(_) => println!("[{}] {}", message.channel, message.payload),
                }
            } else {
                println!("[{}] {}", message.channel, message.payload);
            }
        }

        if !cancellation_token.is_cancelled() {
            warn!("Subscription to {} ended by the store", channel);
        }

        Ok(())
    }
}
