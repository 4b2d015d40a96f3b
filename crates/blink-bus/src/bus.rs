use dashmap::DashMap;
use tokio::sync::mpsc;
use tracing::trace;

use crate::message::BusMessage;
use crate::topic::Topic;

/// Bounded per-subscriber queue capacity (`Q` in the design).
pub const QUEUE_CAPACITY: usize = 1000;

#[derive(Clone)]
struct Subscriber {
    blocking: bool,
    sender: mpsc::Sender<BusMessage>,
}

/// The fan-out publish/subscribe bus (C1). Subscriptions are additive for
/// the lifetime of the process: once subscribed, a handle keeps receiving
/// until it's dropped, and there is no way to unsubscribe a live handle.
#[derive(Default)]
pub struct Bus {
    subscribers: DashMap<Topic, Vec<Subscriber>>,
}

/// A subscriber's read end. Delivery within one handle is strict FIFO.
pub struct ReadHandle {
    receiver: mpsc::Receiver<BusMessage>,
}

impl ReadHandle {
    pub async fn recv(&mut self) -> Option<BusMessage> {
        self.receiver.recv().await
    }

    /// Non-blocking poll: `Ok(None)` means the queue is empty right now
    /// but the sender is still alive, `Err(())` means every sender has
    /// dropped and no more messages will ever arrive.
    pub fn try_recv(&mut self) -> Result<Option<BusMessage>, ()> {
        match self.receiver.try_recv() {
            Ok(msg) => Ok(Some(msg)),
            Err(mpsc::error::TryRecvError::Empty) => Ok(None),
            Err(mpsc::error::TryRecvError::Disconnected) => Err(()),
        }
    }
}

impl Bus {
    pub fn new() -> Self {
        Self::default()
    }

    /// `blocking = true` subscribers never miss a message (backpressure
    /// propagates to the publisher); `blocking = false` subscribers drop
    /// messages that arrive while their queue is full rather than stall
    /// the publisher.
    pub fn subscribe(&self, topic: Topic, blocking: bool) -> ReadHandle {
        let (sender, receiver) = mpsc::channel(QUEUE_CAPACITY);
        self.subscribers
            .entry(topic)
            .or_default()
            .push(Subscriber { blocking, sender });
        ReadHandle { receiver }
    }

    /// Delivers a copy of `msg` to every current subscriber of `topic`.
    /// Not atomic across subscribers: one may receive while another, on
    /// a full non-blocking queue, drops it.
    pub async fn publish(&self, topic: Topic, msg: BusMessage) {
        let subscribers = match self.subscribers.get(&topic) {
            Some(entry) => entry.value().clone(),
            None => return,
        };
        for subscriber in &subscribers {
            if subscriber.blocking {
                if subscriber.sender.send(msg.clone()).await.is_err() {
                    trace!(?topic, "blocking subscriber's receiver dropped");
                }
            } else if let Err(mpsc::error::TrySendError::Full(_)) = subscriber.sender.try_send(msg.clone()) {
                trace!(?topic, "non-blocking subscriber queue full, dropping message");
            }
        }
    }
}
