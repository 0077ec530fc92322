use std::process;
use std::sync::Arc;

use clap::{Arg, Command};
use futures::StreamExt;
use log::{debug, error, info};
use mavlink::MavHeader;

use px4airspeed_bridge::bus::ChannelBus;
use px4airspeed_bridge::msg::{Airspeed, AirspeedMs};
use px4airspeed_bridge::params::ParamStore;
use px4airspeed_bridge::plugin::{Plugin, PluginContext, Router, Telemetry};
use px4airspeed_bridge::px4airspeed::{Px4AirspeedPlugin, TOPIC};
use px4airspeed_bridge::time_sync::HostClock;

#[derive(Debug)]
pub struct Config {
    time_offset_ns: i64,
    samples: Vec<AirspeedMs>,
}

fn fail(msg: impl std::fmt::Display) -> ! {
    error!("{}", msg);
    process::exit(1);
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let matches = Command::new(env!("CARGO_PKG_NAME"))
        .version(env!("CARGO_PKG_VERSION"))
        .author(env!("CARGO_PKG_AUTHORS"))
        .about(env!("CARGO_PKG_DESCRIPTION"))
        .arg(
            Arg::new("frame-id")
                .short('f')
                .long("frame-id")
                .value_name("FRAME_ID")
                .takes_value(true)
                .help("Frame id of published messages, overrides px4airspeed/frame_id"),
        )
        .arg(
            Arg::new("param")
                .short('p')
                .long("param")
                .value_name("KEY=VALUE")
                .takes_value(true)
                .multiple_occurrences(true)
                .help("Sets a parameter, e.g. px4airspeed/frame_id=pitot"),
        )
        .arg(
            Arg::new("time-offset")
                .short('t')
                .long("time-offset-ns")
                .value_name("NANOSECONDS")
                .takes_value(true)
                .allow_hyphen_values(true)
                .default_value("0")
                .help("Device to host clock offset, 0 stamps with host time"),
        )
        .arg(
            Arg::new("sample")
                .short('s')
                .long("sample")
                .value_name("TIME_USEC,IAS,TAS,TEMP,CONFIDENCE")
                .takes_value(true)
                .multiple_occurrences(true)
                .help("AIRSPEED_M_S record to replay, at most 100 are kept before reading"),
        )
        .get_matches();

    let store = ParamStore::new();
    for param in matches.values_of("param").into_iter().flatten() {
        if let Err(e) = store.set_from_arg(param) {
            fail(e);
        }
    }
    if let Some(frame_id) = matches.value_of("frame-id") {
        store.set("px4airspeed/frame_id", frame_id);
    }

    let conf = Config {
        time_offset_ns: matches.value_of_t_or_exit("time-offset"),
        samples: matches
            .values_of("sample")
            .into_iter()
            .flatten()
            .map(|s| {
                s.parse::<AirspeedMs>()
                    .unwrap_or_else(|e| fail(format!("sample '{}': {}", s, e)))
            })
            .collect(),
    };
    debug!("{:?}", &conf);

    let bus = ChannelBus::new();
    let params = store.scoped(Px4AirspeedPlugin::NAME);
    let ctx = PluginContext {
        params: &params,
        bus: &bus,
        time: Arc::new(HostClock::with_offset(conf.time_offset_ns)),
    };
    let plugin = match Px4AirspeedPlugin::initialize(&ctx) {
        Ok(plugin) => Arc::new(plugin),
        Err(e) => fail(e),
    };
    let output = match bus.subscribe::<Airspeed>(TOPIC) {
        Ok(rx) => rx,
        Err(e) => fail(e),
    };

    let mut router = Router::new();
    router.attach(plugin);

    info!("replaying {} sample(s)", conf.samples.len());
    for (seq, sample) in conf.samples.iter().enumerate() {
        let link = MavHeader {
            system_id: 1,
            component_id: 1,
            sequence: seq as u8,
        };
        router.dispatch(&link, &Telemetry::from(*sample));
    }
    // closes the topic once the queue is drained
    drop(router);

    smol::block_on(output.for_each(|msg| async move {
        info!("{}: {}", TOPIC, msg);
    }));
}
