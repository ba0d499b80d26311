//! The watchdog loop
//!
//! The monitor pings the target over and over and counts consecutive
//! failures. Once the count reaches the configured threshold the
//! remediation script runs, the count starts over and the loop pauses before
//! probing again.
//!
//! ```text
//!            success                 failure (n < threshold)
//!   ┌───────────────────┐      ┌───────────────────────────┐
//!   ▼                   │      ▼                           │
//! Healthy ──failure──► Degraded ──failure (n = threshold)──► Escalating
//!   ▲                                                          │
//!   └──────────────── script launched, counter reset ──────────┘
//! ```
//!
//! A script that cannot even be started leaves the counter untouched and the
//! next probe happens immediately.

use std::time::Duration;

use tracing::{debug, error, info, instrument, warn};

use crate::config::MonitorConfig;
use crate::probe::Prober;
use crate::remediation::{RemediationOutcome, Remediator};

/// Phase of the watchdog, derived from the failure counter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorPhase {
    /// No failures since the last success (or since startup)
    Healthy,

    /// Some failures, but fewer than the threshold
    Degraded,

    /// Threshold reached, remediation is due
    Escalating,
}

/// What a single probe result means for the watchdog
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeEvaluation {
    /// Target answered
    Healthy,

    /// Target did not answer, threshold not reached yet
    Failing,

    /// Target did not answer and the threshold is reached
    Escalate,
}

impl ProbeEvaluation {
    /// Evaluate a probe given the number of failures _including_ this probe.
    pub fn evaluate(reachable: bool, failures: u32, threshold: u32) -> ProbeEvaluation {
        if reachable {
            return ProbeEvaluation::Healthy;
        }

        if failures >= threshold {
            return ProbeEvaluation::Escalate;
        }

        ProbeEvaluation::Failing
    }
}

/// Consecutive failure counter
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MonitorState {
    failures: u32,
}

impl MonitorState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failures(&self) -> u32 {
        self.failures
    }

    pub fn phase(&self, threshold: u32) -> MonitorPhase {
        match self.failures {
            0 => MonitorPhase::Healthy,
            n if n < threshold => MonitorPhase::Degraded,
            _ => MonitorPhase::Escalating,
        }
    }

    /// Record a probe result and update the counter.
    pub fn observe(&mut self, reachable: bool, threshold: u32) -> ProbeEvaluation {
        if reachable {
            self.failures = 0;
        } else {
            self.failures = self.failures.saturating_add(1);
        }

        ProbeEvaluation::evaluate(reachable, self.failures, threshold)
    }

    pub fn reset(&mut self) {
        self.failures = 0;
    }
}

/// What happened during one iteration of the loop
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    /// The target answered
    Healthy,

    /// The target did not answer, `failures` out of `threshold`
    Failing { failures: u32, threshold: u32 },

    /// The script ran (successfully or not) and the counter was reset
    Remediated(RemediationOutcome),

    /// The script could not be started; the counter was kept
    RemediationLaunchFailed { error: String },
}

/// The watchdog itself
///
/// Owns the configuration, the failure counter and the two collaborators.
/// Everything runs sequentially: at most one probe or one script execution is
/// in flight at any time.
pub struct Monitor<P, R> {
    config: MonitorConfig,
    state: MonitorState,
    prober: P,
    remediator: R,
}

impl<P, R> Monitor<P, R>
where
    P: Prober,
    R: Remediator,
{
    pub fn new(config: MonitorConfig, prober: P, remediator: R) -> Self {
        Self {
            config,
            state: MonitorState::new(),
            prober,
            remediator,
        }
    }

    pub fn config(&self) -> &MonitorConfig {
        &self.config
    }

    pub fn state(&self) -> &MonitorState {
        &self.state
    }

    pub fn phase(&self) -> MonitorPhase {
        self.state.phase(self.config.failure_threshold)
    }

    /// Run forever.
    ///
    /// There is no way to stop the loop from the inside; the process is
    /// expected to be terminated externally.
    #[instrument(skip(self), fields(host = %self.config.target))]
    pub async fn run(mut self) {
        info!(
            "watching {} (threshold {}, interval {:?})",
            self.config.target, self.config.failure_threshold, self.config.healthy_interval
        );

        loop {
            let outcome = self.cycle().await;

            if let Some(pause) = self.pause_after(&outcome) {
                tokio::time::sleep(pause).await;
            }
        }
    }

    /// Probe once and react to the result, without sleeping afterwards.
    pub async fn cycle(&mut self) -> CycleOutcome {
        let MonitorConfig {
            target,
            failure_threshold: threshold,
            probe_timeout,
            healthy_interval,
            ..
        } = &self.config;
        let threshold = *threshold;

        let result = self.prober.probe(target, *probe_timeout).await;

        match self.state.observe(result.reachable, threshold) {
            ProbeEvaluation::Healthy => {
                info!("host {target} reachable, checking again in {healthy_interval:?}");
                CycleOutcome::Healthy
            }
            ProbeEvaluation::Failing => {
                warn!(
                    "ping failed ({}/{threshold}): {}",
                    self.state.failures(),
                    result.detail.as_deref().unwrap_or("no reply")
                );
                CycleOutcome::Failing {
                    failures: self.state.failures(),
                    threshold,
                }
            }
            ProbeEvaluation::Escalate => {
                warn!(
                    "ping failed ({}/{threshold}): {}",
                    self.state.failures(),
                    result.detail.as_deref().unwrap_or("no reply")
                );
                self.escalate().await
            }
        }
    }

    async fn escalate(&mut self) -> CycleOutcome {
        info!("host {} unreachable, running remediation", self.config.target);

        let outcome = self.remediator.remediate().await;

        if !outcome.launched() {
            let error = outcome.error().unwrap_or("unknown error").to_string();
            error!("remediation failed to start: {error}");
            return CycleOutcome::RemediationLaunchFailed { error };
        }

        match outcome.error() {
            None => info!("remediation finished"),
            Some(error) => warn!("remediation finished with an error: {error}"),
        }

        self.state.reset();
        debug!(
            "failure counter reset, resuming in {:?}",
            self.config.remediation_wait
        );
        CycleOutcome::Remediated(outcome)
    }

    /// How long to wait before the next cycle; `None` means probe again
    /// immediately.
    pub fn pause_after(&self, outcome: &CycleOutcome) -> Option<Duration> {
        match outcome {
            CycleOutcome::Healthy => Some(self.config.healthy_interval),
            CycleOutcome::Failing { .. } => Some(self.config.retry_delay),
            CycleOutcome::Remediated(_) => Some(self.config.remediation_wait),
            CycleOutcome::RemediationLaunchFailed { .. } => None,
        }
    }
}
