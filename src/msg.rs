use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Time since the UNIX epoch, as carried in a message header.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct Stamp(Duration);

impl Stamp {
    pub fn from_nanos(nanos: u64) -> Self {
        Stamp(Duration::from_nanos(nanos))
    }

    pub fn from_duration(since_epoch: Duration) -> Self {
        Stamp(since_epoch)
    }

    pub fn as_duration(&self) -> Duration {
        self.0
    }

    pub fn sec(&self) -> u64 {
        self.0.as_secs()
    }

    pub fn nsec(&self) -> u32 {
        self.0.subsec_nanos()
    }
}

impl fmt::Display for Stamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:09}", self.sec(), self.nsec())
    }
}

/// Timestamp and reference frame attached to every outgoing message.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Header {
    pub stamp: Stamp,
    pub frame_id: String,
}

/// `AIRSPEED_M_S` as handed over by the flight-link decoder.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct AirspeedMs {
    /// device-local time in microseconds
    pub time_usec: u64,
    pub indicated_airspeed_m_s: f32,
    pub true_airspeed_m_s: f32,
    pub air_temperature_celsius: f32,
    /// expected in `[0, 1]`, passed through unchecked
    pub confidence: f32,
}

/// Airspeed message as published on the bus.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Airspeed {
    pub header: Header,
    pub indicated_airspeed_m_s: f32,
    pub true_airspeed_m_s: f32,
    pub air_temperature_celsius: f32,
    pub confidence: f32,
}

impl fmt::Display for Airspeed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{} @ {}] ias: {} m/s, tas: {} m/s, temp: {} C, confidence: {}",
            self.header.frame_id,
            self.header.stamp,
            self.indicated_airspeed_m_s,
            self.true_airspeed_m_s,
            self.air_temperature_celsius,
            self.confidence
        )
    }
}

/// Parses `time_usec,ias,tas,temp,confidence`, the replay format of the CLI.
impl FromStr for AirspeedMs {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let fields: Vec<&str> = s.split(',').map(str::trim).collect();
        if fields.len() != 5 {
            return Err(format!(
                "expected 5 comma separated fields, found {}",
                fields.len()
            ));
        }

        let float = |idx: usize, name: &str| {
            fields[idx]
                .parse::<f32>()
                .map_err(|e| format!("invalid {}: {}", name, e))
        };

        Ok(AirspeedMs {
            time_usec: fields[0]
                .parse()
                .map_err(|e| format!("invalid time_usec: {}", e))?,
            indicated_airspeed_m_s: float(1, "indicated_airspeed_m_s")?,
            true_airspeed_m_s: float(2, "true_airspeed_m_s")?,
            air_temperature_celsius: float(3, "air_temperature_celsius")?,
            confidence: float(4, "confidence")?,
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn parse_sample() {
        let rec: AirspeedMs = "1000000, 12.5, 13.0, 20.0, 0.9".parse().unwrap();
        assert_eq!(rec.time_usec, 1_000_000);
        assert_eq!(rec.indicated_airspeed_m_s, 12.5);
        assert_eq!(rec.true_airspeed_m_s, 13.0);
        assert_eq!(rec.air_temperature_celsius, 20.0);
        assert_eq!(rec.confidence, 0.9);
    }

    #[test]
    fn parse_rejects_bad_samples() {
        assert!("1,2,3".parse::<AirspeedMs>().is_err());
        assert!("1,2,3,4,5,6".parse::<AirspeedMs>().is_err());
        assert!("-1,2,3,4,5".parse::<AirspeedMs>().is_err());
        let err = "1,fast,3,4,5".parse::<AirspeedMs>().unwrap_err();
        assert!(err.contains("indicated_airspeed_m_s"));
    }

    #[test]
    fn out_of_range_confidence_is_accepted() {
        let rec: AirspeedMs = "0,0,0,-40,1.5".parse().unwrap();
        assert_eq!(rec.confidence, 1.5);
    }

    #[test]
    fn stamp_display() {
        let stamp = Stamp::from_nanos(1_000_000_123);
        assert_eq!(stamp.sec(), 1);
        assert_eq!(stamp.nsec(), 123);
        assert_eq!(stamp.to_string(), "1.000000123");
    }
}
