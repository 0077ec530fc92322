//! Bridges PX4 `AIRSPEED_M_S` telemetry onto a publish/subscribe bus.
//!
//! The flight-link decoder, time synchronization and the bus are supplied by
//! the host through the traits in [`plugin`], [`time_sync`] and [`bus`].

pub mod bus;
pub mod msg;
pub mod params;
pub mod plugin;
pub mod px4airspeed;
pub mod time_sync;
