//! Publish/subscribe bridge
//!
//! Channel names go through the same [`Namespace`] as keys, on both the
//! publishing and the subscribing side, so both agree on the physical
//! channel. Each subscription is served by one relay task that forwards
//! store messages into a one-deep handoff channel until it is cancelled,
//! dropped, or the store subscription ends.

use futures::StreamExt;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::backend::MessageStream;
use crate::error::StoreError;
use crate::instance::RedisInstance;
use crate::key::{Key, Namespace};

/// A message delivered on a channel
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PubMessage {
    pub channel: String,
    pub payload: String,
}

impl PubMessage {
    /// Parse the payload as a typed envelope
    pub fn envelope(&self) -> Result<ReceivedEnvelope, StoreError> {
        ReceivedEnvelope::parse(&self.payload)
    }
}

/// A value that can be published inside a typed envelope
///
/// The event type tells receivers which shape `Data` has, e.g. an
/// EventSub relay publishing several notification kinds on one channel.
pub trait PubJson: Serialize {
    fn event_type(&self) -> Key;
}

/// Wire format for typed publishing
///
/// ```json
/// { "Type": "<event type>", "Data": { ... } }
/// ```
#[derive(Debug, Serialize)]
pub struct Envelope<'a, T: Serialize> {
    #[serde(rename = "Type")]
    pub event_type: Key,
    #[serde(rename = "Data")]
    pub data: &'a T,
}

impl<'a, T: PubJson> Envelope<'a, T> {
    pub fn new(data: &'a T) -> Self {
        Self {
            event_type: data.event_type(),
            data,
        }
    }

    pub fn to_json(&self) -> Result<String, StoreError> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Receiving side of [`Envelope`]: branch on `event_type`, then decode
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ReceivedEnvelope {
    #[serde(rename = "Type")]
    pub event_type: Key,
    #[serde(rename = "Data")]
    pub data: serde_json::Value,
}

impl ReceivedEnvelope {
    pub fn parse(payload: &str) -> Result<Self, StoreError> {
        Ok(serde_json::from_str(payload)?)
    }

    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, StoreError> {
        Ok(T::deserialize(&self.data)?)
    }
}

/// A live subscription to one channel
///
/// Messages arrive in store order. The relay stops when the token given
/// to [`RedisInstance::subscribe`] is cancelled, when [`Subscription::cancel`]
/// is called, when the subscription is dropped, or when the store ends
/// the subscription. After that [`Subscription::recv`] returns `None`.
#[derive(Debug)]
pub struct Subscription {
    channel: Key,
    receiver: mpsc::Receiver<PubMessage>,
    cancel: CancellationToken,
}

impl Subscription {
    fn spawn(
        channel: Key,
        namespace: Namespace,
        messages: MessageStream,
        cancel: CancellationToken,
    ) -> Self {
        let (sender, receiver) = mpsc::channel(1);

        tokio::spawn(relay(
            channel.clone(),
            namespace,
            messages,
            sender,
            cancel.clone(),
        ));

        Self {
            channel,
            receiver,
            cancel,
        }
    }

    /// Next message, or `None` once the relay has stopped
    pub async fn recv(&mut self) -> Option<PubMessage> {
        self.receiver.recv().await
    }

    /// Logical channel name
    pub fn channel(&self) -> &Key {
        &self.channel
    }

    /// Stop the relay and release the store subscription
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Whether the relay has stopped. Already delivered messages may still
    /// be waiting in [`Subscription::recv`].
    pub fn is_closed(&self) -> bool {
        self.receiver.is_closed()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

async fn relay(
    channel: Key,
    namespace: Namespace,
    mut messages: MessageStream,
    sender: mpsc::Sender<PubMessage>,
    cancel: CancellationToken,
) {
    loop {
        let next = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                debug!("Subscription to {} cancelled", channel);
                break;
            }
            _ = sender.closed() => {
                debug!("Subscriber for {} went away", channel);
                break;
            }
            next = messages.next() => next,
        };

        let message = match next {
            Some(Ok(message)) => message,
            Some(Err(e)) => {
                warn!("Subscription to {} failed: {}", channel, e);
                break;
            }
            None => {
                warn!("Subscription to {} was closed by the store", channel);
                break;
            }
        };

        let message = PubMessage {
            channel: namespace.strip(&message.channel).to_string(),
            payload: message.payload,
        };

        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                debug!("Subscription to {} cancelled", channel);
                break;
            }
            sent = sender.send(message) => {
                if sent.is_err() {
                    debug!("Subscriber for {} went away", channel);
                    break;
                }
            }
        }
    }

    // Release the store subscription before closing the output channel
    drop(messages);
    drop(sender);
}

impl RedisInstance {
    /// Publish a payload on a channel
    ///
    /// Returns how many subscribers the store delivered it to.
    pub async fn publish(&self, channel: &Key, payload: &str) -> Result<u64, StoreError> {
        let physical = self.namespace.format(channel);
        debug!("PUBLISH {}", physical);
        self.backend.publish(&physical, payload).await
    }

    /// Publish a value wrapped in a typed [`Envelope`]
    ///
    /// Nothing is published if the value fails to serialize.
    pub async fn publish_json<T: PubJson>(
        &self,
        channel: &Key,
        data: &T,
    ) -> Result<u64, StoreError> {
        let payload = Envelope::new(data).to_json()?;
        self.publish(channel, &payload).await
    }

    /// Subscribe to a channel
    ///
    /// The store subscription is open once this returns. The relay lives
    /// until `cancel` fires or the returned [`Subscription`] is cancelled
    /// or dropped; cancelling the subscription does not cancel `cancel`.
    pub async fn subscribe(
        &self,
        channel: &Key,
        cancel: CancellationToken,
    ) -> Result<Subscription, StoreError> {
        let physical = self.namespace.format(channel);
        debug!("SUBSCRIBE {}", physical);

        let messages = self.backend.subscribe(&physical).await?;

        Ok(Subscription::spawn(
            channel.clone(),
            self.namespace.clone(),
            messages,
            cancel.child_token(),
        ))
    }
}
