//! Subscriber bookkeeping shared by the in-process gateways.

use std::collections::HashMap;

use reactkit_core::gateway::{
    ChannelId, IncomingMessage, MessageFeed, MessageId, ReactionEvent, ReactionFeed,
    SubscriptionId,
};
use tokio::sync::mpsc;

const FEED_CAPACITY: usize = 64;

#[derive(Default)]
pub(crate) struct SubscriberHub {
    next_id: u64,
    reactions: HashMap<SubscriptionId, (MessageId, mpsc::Sender<ReactionEvent>)>,
    messages: HashMap<SubscriptionId, (ChannelId, mpsc::Sender<IncomingMessage>)>,
}

impl SubscriberHub {
    fn allocate(&mut self) -> SubscriptionId {
        self.next_id += 1;
        SubscriptionId(self.next_id)
    }

    pub fn add_reaction_sub(&mut self, message: &MessageId) -> ReactionFeed {
        let id = self.allocate();
        let (tx, rx) = mpsc::channel(FEED_CAPACITY);
        self.reactions.insert(id, (message.clone(), tx));
        ReactionFeed { id, events: rx }
    }

    pub fn add_message_sub(&mut self, channel: &ChannelId) -> MessageFeed {
        let id = self.allocate();
        let (tx, rx) = mpsc::channel(FEED_CAPACITY);
        self.messages.insert(id, (channel.clone(), tx));
        MessageFeed { id, messages: rx }
    }

    /// Returns whether the id was known.
    pub fn remove(&mut self, id: SubscriptionId) -> bool {
        self.reactions.remove(&id).is_some() || self.messages.remove(&id).is_some()
    }

    pub fn reaction_targets(&self, message: &MessageId) -> Vec<mpsc::Sender<ReactionEvent>> {
        self.reactions
            .values()
            .filter(|(m, tx)| m == message && !tx.is_closed())
            .map(|(_, tx)| tx.clone())
            .collect()
    }

    pub fn message_targets(&self, channel: &ChannelId) -> Vec<mpsc::Sender<IncomingMessage>> {
        self.messages
            .values()
            .filter(|(c, tx)| c == channel && !tx.is_closed())
            .map(|(_, tx)| tx.clone())
            .collect()
    }

    /// Drop every subscription; their feeds end once drained.
    pub fn clear(&mut self) {
        self.reactions.clear();
        self.messages.clear();
    }

    pub fn len(&self) -> usize {
        self.reactions.len() + self.messages.len()
    }
}

/// Deliver to every target; returns how many accepted the event.
pub(crate) async fn fan_out<T: Clone>(targets: Vec<mpsc::Sender<T>>, item: T) -> usize {
    let mut delivered = 0;
    for tx in targets {
        if tx.send(item.clone()).await.is_ok() {
            delivered += 1;
        }
    }
    delivered
}
