//! Seams between plugins and the host that loads them.
//!
//! A plugin is constructed from a [`PluginContext`] and then hands out its
//! [`Subscription`]s exactly once, when the [`Router`] attaches it. The router
//! is the dispatch table the flight-link decoder feeds decoded records into.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use log::{info, trace};
use mavlink::MavHeader;

use crate::bus::{Advertise, BusError};
use crate::msg::AirspeedMs;
use crate::params::ParamSource;
use crate::time_sync::TimeSync;

/// Type tag of a decoded telemetry record.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MessageKind {
    AirspeedMs,
}

/// Decoded telemetry as delivered by the flight-link decoder.
#[derive(Clone, Debug, PartialEq)]
pub enum Telemetry {
    AirspeedMs(AirspeedMs),
}

impl Telemetry {
    pub fn kind(&self) -> MessageKind {
        match self {
            Telemetry::AirspeedMs(_) => MessageKind::AirspeedMs,
        }
    }
}

impl From<AirspeedMs> for Telemetry {
    fn from(record: AirspeedMs) -> Self {
        Telemetry::AirspeedMs(record)
    }
}

/// A concrete record type a handler can be bound to.
pub trait TelemetryRecord: Sized {
    const KIND: MessageKind;

    fn from_telemetry(msg: &Telemetry) -> Option<&Self>;
}

impl TelemetryRecord for AirspeedMs {
    const KIND: MessageKind = MessageKind::AirspeedMs;

    fn from_telemetry(msg: &Telemetry) -> Option<&Self> {
        match msg {
            Telemetry::AirspeedMs(record) => Some(record),
        }
    }
}

type Handler = Box<dyn Fn(&MavHeader, &Telemetry) + Send + Sync>;

/// Binds one message kind to a handler.
pub struct Subscription {
    kind: MessageKind,
    handler: Handler,
}

impl Subscription {
    pub fn new<R, F>(handler: F) -> Self
    where
        R: TelemetryRecord + 'static,
        F: Fn(&MavHeader, &R) + Send + Sync + 'static,
    {
        Subscription {
            kind: R::KIND,
            handler: Box::new(move |header: &MavHeader, msg: &Telemetry| {
                if let Some(record) = R::from_telemetry(msg) {
                    handler(header, record)
                }
            }),
        }
    }

    pub fn kind(&self) -> MessageKind {
        self.kind
    }

    fn call(&self, header: &MavHeader, msg: &Telemetry) {
        (self.handler)(header, msg)
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("kind", &self.kind)
            .finish()
    }
}

pub type Subscriptions = Vec<Subscription>;

/// Everything a plugin may use during initialization.
pub struct PluginContext<'a, B> {
    /// parameters below the plugin's own namespace
    pub params: &'a dyn ParamSource,
    pub bus: &'a B,
    pub time: Arc<dyn TimeSync>,
}

#[derive(Debug, thiserror::Error)]
pub enum PluginError {
    #[error("advertise: {0}")]
    Advertise(#[from] BusError),
}

pub trait Plugin: Send + Sync + Sized + 'static {
    /// Namespace for the plugin's parameters.
    const NAME: &'static str;

    fn initialize<B: Advertise>(ctx: &PluginContext<'_, B>) -> Result<Self, PluginError>;

    fn subscriptions(self: Arc<Self>) -> Subscriptions;
}

/// Dispatch table from message kind to the handlers interested in it.
#[derive(Default)]
pub struct Router {
    table: HashMap<MessageKind, Vec<Subscription>>,
    plugins: Vec<&'static str>,
}

impl Router {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn attach<P: Plugin>(&mut self, plugin: Arc<P>) {
        let subscriptions = plugin.subscriptions();
        info!(
            "attaching plugin '{}' with {} subscription(s)",
            P::NAME,
            subscriptions.len()
        );
        for subscription in subscriptions {
            self.table
                .entry(subscription.kind())
                .or_default()
                .push(subscription);
        }
        self.plugins.push(P::NAME);
    }

    /// Runs every handler registered for the kind of `msg`, in attach order.
    /// Returns the number of handlers invoked.
    pub fn dispatch(&self, header: &MavHeader, msg: &Telemetry) -> usize {
        match self.table.get(&msg.kind()) {
            Some(handlers) => {
                handlers.iter().for_each(|h| h.call(header, msg));
                handlers.len()
            }
            None => {
                trace!("no handler for {:?}", msg.kind());
                0
            }
        }
    }

    pub fn plugins(&self) -> &[&'static str] {
        &self.plugins
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use crate::bus::ChannelBus;
    use crate::params::ParamStore;
    use crate::time_sync::HostClock;

    #[derive(Default)]
    struct Counter {
        seen: AtomicUsize,
        last_sequence: AtomicUsize,
    }

    impl Plugin for Counter {
        const NAME: &'static str = "counter";

        fn initialize<B: Advertise>(_ctx: &PluginContext<'_, B>) -> Result<Self, PluginError> {
            Ok(Counter::default())
        }

        fn subscriptions(self: Arc<Self>) -> Subscriptions {
            vec![Subscription::new(move |header: &MavHeader, _: &AirspeedMs| {
                self.seen.fetch_add(1, Ordering::SeqCst);
                self.last_sequence
                    .store(header.sequence as usize, Ordering::SeqCst);
            })]
        }
    }

    fn counter() -> Arc<Counter> {
        let store = ParamStore::new();
        let params = store.scoped(Counter::NAME);
        let bus = ChannelBus::new();
        let ctx = PluginContext {
            params: &params,
            bus: &bus,
            time: Arc::new(HostClock::new()),
        };
        Arc::new(Counter::initialize(&ctx).unwrap())
    }

    #[test]
    fn empty_router() {
        let router = Router::new();
        let msg = Telemetry::from(AirspeedMs::default());
        assert_eq!(router.dispatch(&MavHeader::default(), &msg), 0);
        assert!(router.plugins().is_empty());
    }

    #[test]
    fn dispatch_to_all_handlers() {
        let first = counter();
        let second = counter();
        let mut router = Router::new();
        router.attach(first.clone());
        router.attach(second.clone());
        assert_eq!(router.plugins(), &["counter", "counter"]);

        let header = MavHeader {
            system_id: 1,
            component_id: 1,
            sequence: 7,
        };
        let msg = Telemetry::from(AirspeedMs::default());
        assert_eq!(msg.kind(), MessageKind::AirspeedMs);
        assert_eq!(router.dispatch(&header, &msg), 2);
        assert_eq!(router.dispatch(&header, &msg), 2);

        assert_eq!(first.seen.load(Ordering::SeqCst), 2);
        assert_eq!(second.seen.load(Ordering::SeqCst), 2);
        assert_eq!(first.last_sequence.load(Ordering::SeqCst), 7);
    }

    #[test]
    fn subscription_kind() {
        let sub = Subscription::new(|_: &MavHeader, _: &AirspeedMs| {});
        assert_eq!(sub.kind(), MessageKind::AirspeedMs);
        assert_eq!(format!("{:?}", sub), "Subscription { kind: AirspeedMs }");
    }
}
