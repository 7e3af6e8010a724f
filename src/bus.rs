// src/bus.rs
//! Page-lifetime broadcast of item changes.
//!
//! One [`EventBus`] is created per page and handed to every component. Delivery is
//! synchronous on the publishing task, to the handlers subscribed at dispatch time.
//! Nothing is queued or replayed.

use crate::podcast::ItemId;
use log::debug;
use std::cell::{Cell, RefCell};
use std::rc::Rc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    /// An episode was marked listened or unlistened.
    EpisodeUpdate,
    /// A podcast subscription was added or removed.
    SubscriptionUpdate,
}

impl Channel {
    pub fn name(&self) -> &'static str {
        match self {
            Channel::EpisodeUpdate => "episode:update",
            Channel::SubscriptionUpdate => "subscription:update",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeEvent {
    pub item_id: ItemId,
    pub new_state: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Handler = Rc<dyn Fn(&ChangeEvent)>;

struct Subscriber {
    id: SubscriptionId,
    channel: Channel,
    handler: Handler,
}

#[derive(Default)]
pub struct EventBus {
    subscribers: RefCell<Vec<Subscriber>>,
    next_id: Cell<u64>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(
        &self,
        channel: Channel,
        handler: impl Fn(&ChangeEvent) + 'static,
    ) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.get());
        self.next_id.set(id.0 + 1);
        self.subscribers.borrow_mut().push(Subscriber { id, channel, handler: Rc::new(handler) });
        debug!("EventBus: {:?} subscribed to {}", id, channel.name());
        id
    }

    /// Returns false when `id` was not subscribed.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut subscribers = self.subscribers.borrow_mut();
        let before = subscribers.len();
        subscribers.retain(|s| s.id != id);
        before != subscribers.len()
    }

    /// Delivers `event` to the current subscribers of `channel` and returns how many
    /// handlers ran. Handlers may subscribe or unsubscribe while being called; a
    /// handler unsubscribed by an earlier one in the same dispatch is skipped, and one
    /// subscribed during dispatch first sees the next event.
    pub fn publish(&self, channel: Channel, event: &ChangeEvent) -> usize {
        let handlers: Vec<(SubscriptionId, Handler)> = self
            .subscribers
            .borrow()
            .iter()
            .filter(|s| s.channel == channel)
            .map(|s| (s.id, s.handler.clone()))
            .collect();
        debug!(
            "EventBus: {} {{ item_id: {}, new_state: {} }} -> {} handler(s)",
            channel.name(),
            event.item_id,
            event.new_state,
            handlers.len()
        );
        let mut delivered = 0;
        for (id, handler) in &handlers {
            if !self.is_subscribed(*id) {
                debug!("EventBus: {:?} unsubscribed during dispatch, skipped", id);
                continue;
            }
            handler(event);
            delivered += 1;
        }
        delivered
    }

    fn is_subscribed(&self, id: SubscriptionId) -> bool {
        self.subscribers.borrow().iter().any(|s| s.id == id)
    }

    pub fn subscriber_count(&self, channel: Channel) -> usize {
        self.subscribers.borrow().iter().filter(|s| s.channel == channel).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(id: &str, new_state: bool) -> ChangeEvent {
        ChangeEvent { item_id: ItemId::new(id), new_state }
    }

    #[test]
    fn publish_reaches_only_matching_channel() {
        let bus = EventBus::new();
        let seen = Rc::new(RefCell::new(Vec::new()));

        let sink = seen.clone();
        bus.subscribe(Channel::EpisodeUpdate, move |e| sink.borrow_mut().push(e.clone()));

        assert_eq!(bus.publish(Channel::EpisodeUpdate, &event("1", true)), 1);
        assert_eq!(bus.publish(Channel::SubscriptionUpdate, &event("2", true)), 0);
        assert_eq!(*seen.borrow(), vec![event("1", true)]);
    }

    #[test]
    fn unsubscribed_handler_is_not_called() {
        let bus = EventBus::new();
        let calls = Rc::new(Cell::new(0));

        let counter = calls.clone();
        let id = bus.subscribe(Channel::EpisodeUpdate, move |_| counter.set(counter.get() + 1));
        bus.publish(Channel::EpisodeUpdate, &event("1", false));

        assert!(bus.unsubscribe(id));
        assert!(!bus.unsubscribe(id));
        bus.publish(Channel::EpisodeUpdate, &event("1", true));

        assert_eq!(calls.get(), 1);
        assert_eq!(bus.subscriber_count(Channel::EpisodeUpdate), 0);
    }

    #[test]
    fn handler_unsubscribed_mid_dispatch_is_skipped() {
        let bus = Rc::new(EventBus::new());
        let later: Rc<Cell<Option<SubscriptionId>>> = Rc::new(Cell::new(None));
        let later_calls = Rc::new(Cell::new(0));

        let (bus_ref, later_ref) = (bus.clone(), later.clone());
        bus.subscribe(Channel::EpisodeUpdate, move |_| {
            if let Some(id) = later_ref.get() {
                bus_ref.unsubscribe(id);
            }
        });
        let counter = later_calls.clone();
        let id = bus.subscribe(Channel::EpisodeUpdate, move |_| counter.set(counter.get() + 1));
        later.set(Some(id));

        assert_eq!(bus.publish(Channel::EpisodeUpdate, &event("5", true)), 1);
        assert_eq!(later_calls.get(), 0);
        assert_eq!(bus.subscriber_count(Channel::EpisodeUpdate), 1);
    }

    #[test]
    fn handler_may_unsubscribe_itself_during_dispatch() {
        let bus = Rc::new(EventBus::new());
        let own_id: Rc<Cell<Option<SubscriptionId>>> = Rc::new(Cell::new(None));

        let (bus_ref, id_ref) = (bus.clone(), own_id.clone());
        let id = bus.subscribe(Channel::EpisodeUpdate, move |_| {
            if let Some(id) = id_ref.get() {
                bus_ref.unsubscribe(id);
            }
        });
        own_id.set(Some(id));

        assert_eq!(bus.publish(Channel::EpisodeUpdate, &event("9", true)), 1);
        assert_eq!(bus.publish(Channel::EpisodeUpdate, &event("9", false)), 0);
    }
}
