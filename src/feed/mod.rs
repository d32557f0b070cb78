//! Real-time sensor feed: message decoding, window ingestion and the
//! WebSocket endpoint the station publishes on.

mod ingest;
mod message;
mod socket;

pub use ingest::{ingest, ingest_message};
pub use message::{FeedMessage, SensorEvent, TopicMessage};
pub use socket::ingest_socket;
