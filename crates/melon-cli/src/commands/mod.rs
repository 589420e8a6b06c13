pub mod connection;
pub mod pubsub;
pub mod store;

pub use connection::ConnectionArgs;
pub use pubsub::{PublishCommand, SubscribeCommand};
pub use store::{DelCommand, ExpireCommand, GetCommand, PingCommand, SetCommand, TtlCommand};
