//! Melonbot Redis CLI
//!
//! Operator tool for poking at the namespaced store the bot uses:
//! read and write keys, publish messages, and tail channels.

mod commands;

use clap::{Parser, Subcommand};
use commands::{
    ConnectionArgs, DelCommand, ExpireCommand, GetCommand, PingCommand, PublishCommand,
    SetCommand, SubscribeCommand, TtlCommand,
};
use tracing_subscriber::{layer::SubscriberExt, Layer};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info", env = "MELON_LOG_LEVEL", global = true)]
    log_level: String,

    /// Log format: compact, full
    #[arg(
        long,
        default_value = "compact",
        env = "MELON_LOG_FORMAT",
        global = true
    )]
    log_format: String,

    #[command(flatten)]
    connection: ConnectionArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check that the store is reachable
    Ping(PingCommand),
    /// Print the value of a key
    Get(GetCommand),
    /// Set a key (no expiration)
    Set(SetCommand),
    /// Delete a key
    Del(DelCommand),
    /// Set a time-to-live on a key
    Expire(ExpireCommand),
    /// Show the remaining time-to-live of a key
    Ttl(TtlCommand),
    /// Publish a message on a channel
    Publish(PublishCommand),
    /// Print messages from a channel until interrupted
    Subscribe(SubscribeCommand),
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // If RUST_LOG is set, use it directly; otherwise use our default filter
    let filter = if std::env::var("RUST_LOG").is_ok() {
        tracing_subscriber::EnvFilter::try_from_default_env()?
    } else {
        tracing_subscriber::EnvFilter::new(format!(
            "melon_cli={level},melon_redis={level},redis=warn",
            level = cli.log_level
        ))
    };

    let fmt_layer = match cli.log_format.as_str() {
        "full" => tracing_subscriber::fmt::layer()
            .with_target(true)
            .with_thread_ids(false)
            .with_thread_names(false)
            .boxed(),
        _ => tracing_subscriber::fmt::layer() // "compact" or any other value
            .compact()
            .with_target(false)
            .with_thread_ids(false)
            .with_thread_names(false)
            .boxed(),
    };

    let subscriber = tracing_subscriber::registry().with(filter).with(fmt_layer);
    tracing::subscriber::set_global_default(subscriber)?;

    let connection = cli.connection;
    match cli.command {
        Commands::Ping(cmd) => cmd.execute(connection),
        Commands::Get(cmd) => cmd.execute(connection),
        Commands::Set(cmd) => cmd.execute(connection),
        Commands::Del(cmd) => cmd.execute(connection),
        Commands::Expire(cmd) => cmd.execute(connection),
        Commands::Ttl(cmd) => cmd.execute(connection),
        Commands::Publish(cmd) => cmd.execute(connection),
        Commands::Subscribe(cmd) => cmd.execute(connection),
    }
}
