//! PX4 airspeed sensor plugin.
//!
//! Republishes every `AIRSPEED_M_S` record from the flight controller as an
//! [`Airspeed`] message on the `airspeed` topic. Measurements are copied as
//! they are; only the header is derived, via the host's time synchronization.

use std::sync::Arc;

use log::{debug, info};
use mavlink::MavHeader;

use crate::bus::{Advertise, Publisher};
use crate::msg::{Airspeed, AirspeedMs};
use crate::plugin::{Plugin, PluginContext, PluginError, Subscription, Subscriptions};
use crate::time_sync::TimeSync;

pub const DEFAULT_FRAME_ID: &str = "px4airspeed";
pub const TOPIC: &str = "airspeed";
pub const QUEUE_DEPTH: usize = 100;

pub struct Px4AirspeedPlugin {
    frame_id: String,
    time: Arc<dyn TimeSync>,
    airspeed_pub: Publisher<Airspeed>,
}

impl Px4AirspeedPlugin {
    pub fn frame_id(&self) -> &str {
        &self.frame_id
    }

    pub fn topic(&self) -> &str {
        self.airspeed_pub.topic()
    }

    pub fn on_airspeed_received(&self, _link: &MavHeader, airspeed_m_s: &AirspeedMs) {
        let header = self
            .time
            .synchronized_header(&self.frame_id, airspeed_m_s.time_usec);

        let msg = Airspeed {
            header,
            indicated_airspeed_m_s: airspeed_m_s.indicated_airspeed_m_s,
            true_airspeed_m_s: airspeed_m_s.true_airspeed_m_s,
            air_temperature_celsius: airspeed_m_s.air_temperature_celsius,
            confidence: airspeed_m_s.confidence,
        };
        debug!("publishing {}", msg);
        self.airspeed_pub.publish(msg);
    }
}

impl Plugin for Px4AirspeedPlugin {
    const NAME: &'static str = "px4airspeed";

    fn initialize<B: Advertise>(ctx: &PluginContext<'_, B>) -> Result<Self, PluginError> {
        let frame_id = ctx.params.get_or("frame_id", DEFAULT_FRAME_ID);
        let airspeed_pub = ctx.bus.advertise::<Airspeed>(TOPIC, QUEUE_DEPTH)?;
        info!("{}: publishing on '{}' in frame '{}'", Self::NAME, TOPIC, frame_id);

        Ok(Px4AirspeedPlugin {
            frame_id,
            time: ctx.time.clone(),
            airspeed_pub,
        })
    }

    fn subscriptions(self: Arc<Self>) -> Subscriptions {
        vec![Subscription::new(move |link: &MavHeader, msg: &AirspeedMs| {
            self.on_airspeed_received(link, msg)
        })]
    }
}
