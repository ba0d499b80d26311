pub mod config;
pub mod duration;
pub mod error;
pub mod monitor;
pub mod probe;
pub mod remediation;

pub use config::MonitorConfig;
pub use monitor::{CycleOutcome, Monitor, MonitorPhase, MonitorState};
pub use probe::{IcmpProber, ProbeResult, Prober};
pub use remediation::{RemediationOutcome, Remediator, ScriptRemediator, ensure_executable};
