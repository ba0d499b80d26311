//! Failure counting and escalation, driven one cycle at a time
//!
//! These tests check the decisions of the monitor loop without sleeping:
//! - when remediation fires
//! - when the counter resets
//! - what happens when the script cannot be started

use ping_watchdog::{CycleOutcome, Monitor, MonitorPhase, RemediationOutcome};
use pretty_assertions::assert_eq;

use crate::helpers::*;

#[tokio::test]
async fn test_threshold_three_fires_on_third_failure() {
    let journal = Journal::new();
    let mut monitor = Monitor::new(
        create_test_config(3),
        ScriptedProber::always(false, &journal),
        RecordingRemediator::succeeding(&journal),
    );

    monitor.cycle().await;
    monitor.cycle().await;
    assert_eq!(journal.remediations(), 0, "must not fire on the 2nd failure");
    assert_eq!(monitor.phase(), MonitorPhase::Degraded);

    let outcome = monitor.cycle().await;
    assert_eq!(outcome, CycleOutcome::Remediated(RemediationOutcome::Succeeded));
    assert_eq!(
        journal.events(),
        vec![
            Event::Probe(false),
            Event::Probe(false),
            Event::Probe(false),
            Event::Remediation,
        ]
    );
}

#[tokio::test]
async fn test_fault_persisting_after_remediation_reaccumulates() {
    let journal = Journal::new();
    let mut monitor = Monitor::new(
        create_test_config(2),
        ScriptedProber::always(false, &journal),
        RecordingRemediator::succeeding(&journal),
    );

    // first escalation
    monitor.cycle().await;
    monitor.cycle().await;
    assert_eq!(journal.remediations(), 1);
    assert_eq!(monitor.state().failures(), 0);
    assert_eq!(monitor.phase(), MonitorPhase::Healthy);

    // the fault is still there, but the counter starts from zero again
    let outcome = monitor.cycle().await;
    assert_eq!(
        outcome,
        CycleOutcome::Failing {
            failures: 1,
            threshold: 2
        }
    );
    assert_eq!(journal.remediations(), 1);

    monitor.cycle().await;
    assert_eq!(journal.remediations(), 2);
}

#[tokio::test]
async fn test_single_success_resets_accumulated_failures() {
    let journal = Journal::new();
    let mut monitor = Monitor::new(
        create_test_config(4),
        ScriptedProber::new(&[false, false, false, true, false, false, false], false, &journal),
        RecordingRemediator::succeeding(&journal),
    );

    for _ in 0..3 {
        monitor.cycle().await;
    }
    assert_eq!(monitor.state().failures(), 3);

    assert_eq!(monitor.cycle().await, CycleOutcome::Healthy);
    assert_eq!(monitor.state().failures(), 0);

    for _ in 0..3 {
        monitor.cycle().await;
    }
    assert_eq!(monitor.state().failures(), 3);
    assert_eq!(journal.remediations(), 0);
}

#[tokio::test]
async fn test_always_reachable_never_remediates() {
    let journal = Journal::new();
    let mut monitor = Monitor::new(
        create_test_config(1),
        ScriptedProber::always(true, &journal),
        RecordingRemediator::succeeding(&journal),
    );

    for _ in 0..50 {
        assert_eq!(monitor.cycle().await, CycleOutcome::Healthy);
        assert_eq!(monitor.state().failures(), 0);
    }

    assert_eq!(journal.probes(), 50);
    assert_eq!(journal.remediations(), 0);
}

#[tokio::test]
async fn test_threshold_one_remediates_on_every_failure() {
    let journal = Journal::new();
    let mut monitor = Monitor::new(
        create_test_config(1),
        ScriptedProber::always(false, &journal),
        RecordingRemediator::succeeding(&journal),
    );

    for _ in 0..3 {
        monitor.cycle().await;
    }

    assert_eq!(journal.remediations(), 3);
}

#[tokio::test]
async fn test_unsuccessful_script_still_resets() {
    let journal = Journal::new();
    let failed = RemediationOutcome::Failed {
        error: "script exited with exit status: 1".to_string(),
    };
    let mut monitor = Monitor::new(
        create_test_config(2),
        ScriptedProber::always(false, &journal),
        RecordingRemediator::new(vec![], failed.clone(), &journal),
    );

    monitor.cycle().await;
    let outcome = monitor.cycle().await;

    assert_eq!(outcome, CycleOutcome::Remediated(failed));
    assert_eq!(monitor.state().failures(), 0);
    assert_eq!(
        monitor.pause_after(&outcome),
        Some(monitor.config().remediation_wait)
    );
}

#[tokio::test]
async fn test_launch_failure_keeps_escalating_without_pause() {
    let journal = Journal::new();
    let mut monitor = Monitor::new(
        create_test_config(2),
        ScriptedProber::always(false, &journal),
        RecordingRemediator::new(vec![launch_failed()], RemediationOutcome::Succeeded, &journal),
    );

    monitor.cycle().await;
    let outcome = monitor.cycle().await;

    assert_eq!(
        outcome,
        CycleOutcome::RemediationLaunchFailed {
            error: "running script: No such file or directory (os error 2)".to_string()
        }
    );
    assert_eq!(monitor.state().failures(), 2, "counter must be kept");
    assert_eq!(monitor.phase(), MonitorPhase::Escalating);
    assert_eq!(monitor.pause_after(&outcome), None);

    // the very next failure escalates again, and this time the script starts
    let outcome = monitor.cycle().await;
    assert_eq!(outcome, CycleOutcome::Remediated(RemediationOutcome::Succeeded));
    assert_eq!(monitor.state().failures(), 0);
    assert_eq!(
        journal.events(),
        vec![
            Event::Probe(false),
            Event::Probe(false),
            Event::Remediation,
            Event::Probe(false),
            Event::Remediation,
        ]
    );
}

#[tokio::test]
async fn test_recovery_after_launch_failure() {
    let journal = Journal::new();
    let mut monitor = Monitor::new(
        create_test_config(1),
        ScriptedProber::new(&[false, true], true, &journal),
        RecordingRemediator::new(vec![], launch_failed(), &journal),
    );

    monitor.cycle().await;
    assert_eq!(monitor.state().failures(), 1);

    assert_eq!(monitor.cycle().await, CycleOutcome::Healthy);
    assert_eq!(monitor.state().failures(), 0);
}
