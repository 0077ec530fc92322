use std::any::Any;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use log::{debug, info, warn};
use smol::channel::{self, Receiver, Sender, TrySendError};

#[derive(Debug, thiserror::Error)]
pub enum BusError {
    #[error("topic '{0}' is already advertised")]
    AlreadyAdvertised(String),

    #[error("topic '{0}' is not advertised")]
    NotAdvertised(String),

    #[error("topic '{0}' carries a different message type")]
    TypeMismatch(String),

    #[error("topic '{0}' needs a queue depth of at least 1")]
    ZeroQueueDepth(String),
}

/// Ability to open an output channel on the bus.
pub trait Advertise {
    fn advertise<T: Send + Sync + 'static>(
        &self,
        topic: &str,
        queue_depth: usize,
    ) -> Result<Publisher<T>, BusError>;
}

/// Write end of a topic backed by a bounded channel.
///
/// `publish` never blocks: a full queue loses its oldest pending message.
pub struct Publisher<T> {
    topic: Arc<str>,
    tx: Sender<Arc<T>>,
    /// only used to evict the oldest message on overflow
    evict: Receiver<Arc<T>>,
}

impl<T> Clone for Publisher<T> {
    fn clone(&self) -> Self {
        Publisher {
            topic: self.topic.clone(),
            tx: self.tx.clone(),
            evict: self.evict.clone(),
        }
    }
}

impl<T> Publisher<T> {
    /// Creates a publisher together with the read end of its queue.
    pub fn channel(
        topic: &str,
        queue_depth: usize,
    ) -> Result<(Self, Receiver<Arc<T>>), BusError> {
        if queue_depth == 0 {
            return Err(BusError::ZeroQueueDepth(topic.to_string()));
        }
        let (tx, rx) = channel::bounded(queue_depth);
        let publisher = Publisher {
            topic: topic.into(),
            tx,
            evict: rx.clone(),
        };
        Ok((publisher, rx))
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub fn queue_depth(&self) -> usize {
        self.tx.capacity().unwrap_or(usize::MAX)
    }

    /// Number of messages waiting to be consumed.
    pub fn pending(&self) -> usize {
        self.tx.len()
    }

    pub fn publish(&self, msg: T) {
        let mut msg = Arc::new(msg);
        loop {
            match self.tx.try_send(msg) {
                Ok(()) => return,
                Err(TrySendError::Full(rejected)) => {
                    warn!("queue of '{}' is full, dropping oldest message", self.topic);
                    let _ = self.evict.try_recv();
                    msg = rejected;
                }
                Err(TrySendError::Closed(_)) => {
                    debug!("'{}' is closed, message discarded", self.topic);
                    return;
                }
            }
        }
    }
}

/// In-process bus, one queue per topic shared by all of its subscribers.
#[derive(Default)]
pub struct ChannelBus {
    topics: Mutex<HashMap<String, Box<dyn Any + Send + Sync>>>,
}

impl ChannelBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the read end of `topic`. Subscribers compete for messages.
    pub fn subscribe<T: Send + Sync + 'static>(
        &self,
        topic: &str,
    ) -> Result<Receiver<Arc<T>>, BusError> {
        let topics = self.topics.lock().unwrap_or_else(PoisonError::into_inner);
        let entry = topics
            .get(topic)
            .ok_or_else(|| BusError::NotAdvertised(topic.to_string()))?;
        entry
            .downcast_ref::<Receiver<Arc<T>>>()
            .cloned()
            .ok_or_else(|| BusError::TypeMismatch(topic.to_string()))
    }

    pub fn topics(&self) -> Vec<String> {
        let topics = self.topics.lock().unwrap_or_else(PoisonError::into_inner);
        let mut names: Vec<String> = topics.keys().cloned().collect();
        names.sort();
        names
    }
}

impl Advertise for ChannelBus {
    fn advertise<T: Send + Sync + 'static>(
        &self,
        topic: &str,
        queue_depth: usize,
    ) -> Result<Publisher<T>, BusError> {
        let mut topics = self.topics.lock().unwrap_or_else(PoisonError::into_inner);
        if topics.contains_key(topic) {
            return Err(BusError::AlreadyAdvertised(topic.to_string()));
        }
        let (publisher, rx) = Publisher::<T>::channel(topic, queue_depth)?;
        topics.insert(topic.to_string(), Box::new(rx));
        info!("advertised '{}' (queue depth {})", topic, queue_depth);
        Ok(publisher)
    }
}
