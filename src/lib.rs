//! Meteo Dash - live sliding-window dashboard for an IoT weather station
//!
//! This library exposes the core modules for testing and reuse.

pub mod channels;
pub mod common;
pub mod config;
pub mod error;
pub mod events;
pub mod feed;
pub mod redraw;
pub mod routes;
pub mod session;
pub mod station;
pub mod storage;
pub mod window;
