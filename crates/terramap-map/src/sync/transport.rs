use super::{MapMessage, Side};

use parking_lot::Mutex;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};

pub type MessageStream = UnboundedReceiver<MapMessage>;
pub type MessageFilter = Box<dyn Fn(&MapMessage) -> bool + Send + Sync>;

/// A publish/subscribe channel between the world side and the storage side.
///
/// Delivery is at least once and unordered across messages; both sides tolerate duplicates because every write is an
/// idempotent upsert keyed by chunk coordinates.
pub trait Transport: Send + Sync {
    fn publish(&self, message: MapMessage);

    /// Messages accepted by `filter` are delivered to the returned stream. Dropping the stream unsubscribes.
    fn subscribe(&self, filter: MessageFilter) -> MessageStream;
}

/// Accepts messages for `world_id` that the given side should act on.
pub fn addressed_to(world_id: impl Into<String>, side: Side) -> MessageFilter {
    let world_id = world_id.into();
    Box::new(move |m: &MapMessage| m.destination() == side && m.world_id() == world_id)
}

struct Subscriber {
    filter: MessageFilter,
    sender: UnboundedSender<MapMessage>,
}

/// In-process [`Transport`] that fans every message out to all matching subscribers.
#[derive(Default)]
pub struct LocalBus {
    subscribers: Mutex<Vec<Subscriber>>,
}

impl LocalBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn num_subscribers(&self) -> usize {
        self.subscribers.lock().len()
    }
}

impl Transport for LocalBus {
    fn publish(&self, message: MapMessage) {
        let mut subscribers = self.subscribers.lock();
        let mut delivered = 0;
        subscribers.retain(|s| {
            if s.sender.is_closed() {
                return false;
            }
            if (s.filter)(&message) {
                delivered += 1;
                return s.sender.send(message.clone()).is_ok();
            }
            true
        });
        if delivered == 0 {
            log::trace!("No subscriber for message to {:?}", message.destination());
        }
    }

    fn subscribe(&self, filter: MessageFilter) -> MessageStream {
        let (sender, receiver) = unbounded_channel();
        self.subscribers.lock().push(Subscriber { filter, sender });
        receiver
    }
}
