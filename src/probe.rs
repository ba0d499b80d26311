//! Reachability checks
//!
//! A probe sends exactly one ICMP echo request and reports whether a reply
//! came back in time. Every failure mode (unresolvable name, missing socket
//! privileges, transport errors, timeouts) collapses into an unreachable
//! result; the reason is logged and kept in [`ProbeResult::detail`].

use std::net::IpAddr;
use std::time::Duration;

use async_trait::async_trait;
use surge_ping::{Client, Config, ICMP, PingIdentifier, PingSequence};
use tokio::net::lookup_host;
use tokio::time::{Instant, timeout_at};
use tracing::{debug, instrument, trace};

const PAYLOAD: [u8; 8] = [0; 8];

/// Result of a single probe
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeResult {
    /// Did a reply arrive within the timeout?
    pub reachable: bool,

    /// Round trip time or the reason the probe failed
    pub detail: Option<String>,
}

impl ProbeResult {
    pub fn reachable(detail: impl Into<String>) -> Self {
        Self {
            reachable: true,
            detail: Some(detail.into()),
        }
    }

    pub fn unreachable(detail: impl Into<String>) -> Self {
        Self {
            reachable: false,
            detail: Some(detail.into()),
        }
    }
}

/// Something that can check whether a target responds
///
/// Implementations must not retry internally; the monitor loop owns the
/// retry policy.
#[async_trait]
pub trait Prober: Send + Sync {
    async fn probe(&self, target: &str, timeout: Duration) -> ProbeResult;
}

/// Prober sending ICMP echo requests
///
/// Depending on the platform this needs either a raw socket (root or
/// `CAP_NET_RAW`) or permission for unprivileged ICMP sockets
/// (`net.ipv4.ping_group_range` on Linux). Lacking both simply makes every
/// probe fail.
#[derive(Debug, Clone, Copy, Default)]
pub struct IcmpProber;

impl IcmpProber {
    pub fn new() -> Self {
        Self
    }

    async fn resolve(target: &str, deadline: Instant) -> Result<IpAddr, String> {
        let target = target.trim();
        if target.is_empty() {
            return Err("no target configured".to_string());
        }

        if let Ok(ip) = target.parse::<IpAddr>() {
            return Ok(ip);
        }

        let mut addrs = timeout_at(deadline, lookup_host((target, 0)))
            .await
            .map_err(|_| format!("resolving {target} timed out"))?
            .map_err(|e| format!("could not resolve {target}: {e}"))?;

        addrs
            .next()
            .map(|addr| addr.ip())
            .ok_or_else(|| format!("{target} did not resolve to any address"))
    }

    async fn echo(ip: IpAddr, deadline: Instant) -> Result<Duration, String> {
        let limit = remaining(deadline).ok_or_else(|| format!("no time left to ping {ip}"))?;

        let config = match ip {
            IpAddr::V4(_) => Config::default(),
            IpAddr::V6(_) => Config::builder().kind(ICMP::V6).build(),
        };

        let client =
            Client::new(&config).map_err(|e| format!("failed to open ICMP socket: {e}"))?;

        let mut pinger = client
            .pinger(ip, PingIdentifier(std::process::id() as u16))
            .await;
        pinger.timeout(limit);

        let (_, rtt) = pinger
            .ping(PingSequence(0), &PAYLOAD)
            .await
            .map_err(|e| format!("no reply from {ip}: {e}"))?;

        Ok(rtt)
    }
}

/// Time left until `deadline`, `None` once it has passed
fn remaining(deadline: Instant) -> Option<Duration> {
    Some(deadline.saturating_duration_since(Instant::now())).filter(|left| !left.is_zero())
}

#[async_trait]
impl Prober for IcmpProber {
    #[instrument(skip(self))]
    async fn probe(&self, target: &str, timeout: Duration) -> ProbeResult {
        // resolution and the echo share one budget
        let deadline = Instant::now() + timeout;

        let ip = match Self::resolve(target, deadline).await {
            Ok(ip) => ip,
            Err(reason) => {
                debug!("{reason}");
                return ProbeResult::unreachable(reason);
            }
        };

        trace!("pinging {ip}");

        match Self::echo(ip, deadline).await {
            Ok(rtt) => {
                trace!("reply from {ip} after {rtt:?}");
                ProbeResult::reachable(format!("reply from {ip} in {rtt:?}"))
            }
            Err(reason) => {
                debug!("{reason}");
                ProbeResult::unreachable(reason)
            }
        }
    }
}
