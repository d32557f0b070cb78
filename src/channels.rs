use serde::Serialize;
use utoipa::ToSchema;

/// How often a channel's chart is redrawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum RefreshClass {
    /// Slow-moving environmental readings
    Standard,
    /// Channels sampled fast enough to need a dedicated redraw timer
    HighFrequency,
}

/// One logical sensor stream and how it is charted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Channel {
    /// Stable channel key, also the storage key
    pub key: &'static str,
    pub label: &'static str,
    pub unit: &'static str,
    /// Fixed y-axis range for the chart
    pub axis_min: f64,
    pub axis_max: f64,
    /// CSS colour of the chart line
    pub color: &'static str,
    /// Station feed topic this channel is published on
    pub topic: &'static str,
    pub refresh: RefreshClass,
}

/// Key of the vibration channel watched for seismic activity.
pub const SEISMIC_CHANNEL: &str = "vibrChart";

const REFERENCE_CHANNELS: [Channel; 6] = [
    Channel {
        key: "tempChart",
        label: "Temperature",
        unit: "°C",
        axis_min: 10.0,
        axis_max: 50.0,
        color: "rgba(255,99,71,0.95)",
        topic: "clima/temperatura",
        refresh: RefreshClass::Standard,
    },
    Channel {
        key: "presChart",
        label: "Pressure",
        unit: "hPa",
        axis_min: 0.0,
        axis_max: 1100.0,
        color: "rgba(54,162,235,0.95)",
        topic: "clima/presion",
        refresh: RefreshClass::Standard,
    },
    Channel {
        key: "humChart",
        label: "Humidity",
        unit: "%",
        axis_min: 0.0,
        axis_max: 85.0,
        color: "rgba(75,192,192,0.95)",
        topic: "clima/humedad",
        refresh: RefreshClass::Standard,
    },
    Channel {
        key: "soilChart",
        label: "Soil moisture",
        unit: "%",
        axis_min: 0.0,
        axis_max: 100.0,
        color: "rgba(153,102,255,0.95)",
        topic: "clima/humedad_suelo",
        refresh: RefreshClass::Standard,
    },
    Channel {
        key: "lightChart",
        label: "Light",
        unit: "lux",
        axis_min: 0.0,
        axis_max: 5000.0,
        color: "rgba(255,206,86,0.95)",
        topic: "clima/lux",
        refresh: RefreshClass::Standard,
    },
    Channel {
        key: SEISMIC_CHANNEL,
        label: "Vibration",
        unit: "Hz",
        axis_min: 0.0,
        axis_max: 2.0,
        color: "rgba(255,159,64,0.95)",
        topic: "clima/vibracion",
        refresh: RefreshClass::HighFrequency,
    },
];

/// The fixed set of channels a deployment knows about.
///
/// Data for keys outside the catalog is dropped at ingestion.
#[derive(Debug, Clone)]
pub struct ChannelCatalog {
    channels: Vec<Channel>,
}

impl ChannelCatalog {
    #[must_use]
    pub fn new(channels: Vec<Channel>) -> Self {
        Self { channels }
    }

    /// The six channels of the reference weather station.
    #[must_use]
    pub fn reference() -> Self {
        Self::new(REFERENCE_CHANNELS.to_vec())
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Channel> {
        self.channels.iter().find(|c| c.key == key)
    }

    #[must_use]
    pub fn is_known(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    #[must_use]
    pub fn by_topic(&self, topic: &str) -> Option<&Channel> {
        self.channels.iter().find(|c| c.topic == topic)
    }

    pub fn of_class(&self, class: RefreshClass) -> impl Iterator<Item = &Channel> {
        self.channels.iter().filter(move |c| c.refresh == class)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Channel> {
        self.channels.iter()
    }

    #[must_use]
    pub fn seismic_channel(&self) -> Option<&Channel> {
        self.get(SEISMIC_CHANNEL)
    }
}

impl Default for ChannelCatalog {
    fn default() -> Self {
        Self::reference()
    }
}
