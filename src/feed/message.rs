use serde::Deserialize;
use utoipa::ToSchema;

use crate::channels::ChannelCatalog;

/// One reading as emitted by the station feed.
#[derive(Debug, Clone, PartialEq, Deserialize, ToSchema)]
pub struct SensorEvent {
    /// Channel key, e.g. `tempChart`
    pub sensor_id: String,
    pub value: f64,
    /// Milliseconds since the Unix epoch
    pub timestamp: i64,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub unit: Option<String>,
    #[serde(default)]
    pub topic: Option<String>,
}

/// Raw broker message: a topic and its textual payload.
#[derive(Debug, Clone, PartialEq, Deserialize, ToSchema)]
pub struct TopicMessage {
    pub topic: String,
    pub payload: String,
}

/// Anything the feed endpoints accept.
#[derive(Debug, Clone, PartialEq, Deserialize, ToSchema)]
#[serde(untagged)]
pub enum FeedMessage {
    Event(SensorEvent),
    Topic(TopicMessage),
}

impl FeedMessage {
    /// # Errors
    ///
    /// Returns the JSON error if `raw` is neither a sensor event nor a topic message.
    pub fn decode(raw: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(raw)
    }

    /// Resolve to a sensor event.
    ///
    /// Topic messages are mapped to their channel through the catalog and
    /// stamped with `now_ms`. Unknown topics and payloads that are not a
    /// number resolve to `None`.
    #[must_use]
    pub fn into_event(self, catalog: &ChannelCatalog, now_ms: i64) -> Option<SensorEvent> {
        match self {
            Self::Event(event) => Some(event),
            Self::Topic(msg) => {
                let channel = catalog.by_topic(&msg.topic)?;
                let value = msg.payload.trim().parse::<f64>().ok()?;
                Some(SensorEvent {
                    sensor_id: channel.key.to_string(),
                    value,
                    timestamp: now_ms,
                    label: Some(channel.label.to_string()),
                    unit: Some(channel.unit.to_string()),
                    topic: Some(msg.topic),
                })
            }
        }
    }
}
