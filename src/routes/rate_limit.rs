use axum::http::Request;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use tower_governor::{GovernorError, key_extractor::KeyExtractor};

/// Header a station may send to get its own rate-limit bucket.
pub const STATION_ID_HEADER: &str = "x-station-id";

/// Rate-limit key for feed publishers.
///
/// Stations that identify themselves with `X-Station-Id` get one bucket per
/// station, so several stations behind one gateway do not starve each other.
/// Anonymous publishers are keyed by client IP (proxy headers first, then the
/// peer address), falling back to a shared localhost bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeedKeyExtractor;

fn client_ip<T>(req: &Request<T>) -> IpAddr {
    if let Some(first_ip) = req
        .headers()
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|xff| xff.split(',').next())
        .and_then(|ip| ip.trim().parse::<IpAddr>().ok())
    {
        return first_ip;
    }

    if let Some(real_ip) = req
        .headers()
        .get("x-real-ip")
        .and_then(|v| v.to_str().ok())
        .and_then(|ip| ip.parse::<IpAddr>().ok())
    {
        return real_ip;
    }

    req.extensions()
        .get::<axum::extract::ConnectInfo<SocketAddr>>()
        .map_or(IpAddr::V4(Ipv4Addr::LOCALHOST), |info| info.0.ip())
}

impl KeyExtractor for FeedKeyExtractor {
    type Key = String;

    fn extract<T>(&self, req: &Request<T>) -> Result<Self::Key, GovernorError> {
        if let Some(station) = req
            .headers()
            .get(STATION_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|s| !s.is_empty())
        {
            return Ok(format!("station:{station}"));
        }

        Ok(format!("ip:{}", client_ip(req)))
    }
}
