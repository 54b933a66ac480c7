//! Lifecycle tests for the supervisor state machine
//!
//! All I/O is mocked; timings use short probe intervals.

use assert_matches::assert_matches;
use mockall::Sequence;
use shared::{HealthStatus, SupervisorState};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use ::supervisor::*;
use ::supervisor::traits::*;

mod common;
use common::{SupervisorBuilder, TestFixtures, TestHelpers};

#[tokio::test]
async fn test_port_conflict_fails_without_launching() {
    let mut port_checker = MockPortChecker::new();
    port_checker
        .expect_is_port_free()
        .withf(|host, port| host == TestFixtures::HOST && *port == TestFixtures::PORT)
        .times(1)
        .returning(|_, _| Ok(false));

    let mut launcher = MockProcessLauncher::new();
    launcher.expect_launch().times(0);

    let supervisor = SupervisorBuilder::new()
        .with_port_checker(port_checker)
        .with_launcher(launcher)
        .build();

    let err = supervisor.start().await.unwrap_err();

    assert_matches!(err, SupervisorError::PortConflict { port: TestFixtures::PORT, .. });
    assert_eq!(err.phase(), Some(StartupPhase::PortCheck));
    assert!(err.to_string().contains(&TestFixtures::PORT.to_string()));
    assert_eq!(supervisor.state(), SupervisorState::Failed);
    assert_eq!(supervisor.child_pid(), None);
}

#[tokio::test]
async fn test_ready_after_second_probe() {
    let mut health_check = MockHealthCheck::new();
    let mut seq = Sequence::new();
    health_check
        .expect_check()
        .times(1)
        .in_sequence(&mut seq)
        .returning(|_| Err(TestFixtures::probe_error()));
    health_check
        .expect_check()
        .withf(|url| url == "http://127.0.0.1:5999/health")
        .times(1)
        .in_sequence(&mut seq)
        .returning(|_| Ok(()));

    let supervisor = SupervisorBuilder::new()
        .with_child(TestFixtures::cooperative_child())
        .with_health_check(health_check)
        .build();

    supervisor.start().await.unwrap();

    assert_eq!(supervisor.state(), SupervisorState::Ready);
    assert!(supervisor.is_ready());
    assert_eq!(supervisor.health().status, HealthStatus::Healthy);
    assert_eq!(supervisor.health().attempts, 2);
    assert_eq!(supervisor.child_pid(), Some(TestFixtures::PID));
    assert!(supervisor.wait_ready().await);
}

#[tokio::test]
async fn test_probe_budget_exhausted_terminates_child() {
    let mut child = MockChildProcess::new();
    child.expect_pid().return_const(Some(TestFixtures::PID));
    child.expect_is_alive().returning(|| true);
    child
        .expect_terminate()
        .withf(|signal| *signal == TerminationSignal::Graceful)
        .times(1)
        .returning(|_| Ok(()));
    child
        .expect_wait_exit()
        .times(1)
        .returning(|_| Ok(ExitResult::Exited { code: None }));

    let supervisor = SupervisorBuilder::new()
        .with_probe(5, Duration::from_millis(200))
        .with_child(child)
        .with_health_check(TestHelpers::failing_health_check())
        .build();

    let started = Instant::now();
    let err = supervisor.start().await.unwrap_err();
    let elapsed = started.elapsed();

    assert_matches!(
        err,
        SupervisorError::HealthCheckTimeout {
            last_health: HealthStatus::TimedOut,
            attempts: 5,
            ..
        }
    );
    assert!(elapsed >= Duration::from_millis(800), "failed too early: {elapsed:?}");
    assert!(elapsed < Duration::from_secs(3), "failed too late: {elapsed:?}");
    assert_eq!(supervisor.state(), SupervisorState::Failed);
    assert_eq!(supervisor.child_pid(), None);
    assert!(!supervisor.wait_ready().await);
}

#[tokio::test]
async fn test_child_exit_during_probe_is_unhealthy() {
    let mut child = MockChildProcess::new();
    let mut seq = Sequence::new();
    child.expect_pid().return_const(Some(TestFixtures::PID));
    child
        .expect_is_alive()
        .times(1)
        .in_sequence(&mut seq)
        .returning(|| true);
    child
        .expect_is_alive()
        .times(1)
        .in_sequence(&mut seq)
        .returning(|| false);
    child.expect_terminate().returning(|_| Ok(()));
    child
        .expect_wait_exit()
        .returning(|_| Ok(ExitResult::Exited { code: Some(1) }));

    let supervisor = SupervisorBuilder::new()
        .with_child(child)
        .with_health_check(TestHelpers::failing_health_check())
        .build();

    let err = supervisor.start().await.unwrap_err();

    assert_eq!(err.last_health(), Some(HealthStatus::Unhealthy));
    assert_matches!(err, SupervisorError::HealthCheckTimeout { attempts: 1, .. });
    assert_eq!(supervisor.state(), SupervisorState::Failed);
}

#[tokio::test]
async fn test_spawn_failure_is_launch_phase() {
    let mut launcher = MockProcessLauncher::new();
    launcher
        .expect_launch()
        .times(1)
        .returning(|_| Err(TestFixtures::spawn_error()));

    let mut health_check = MockHealthCheck::new();
    health_check.expect_check().times(0);

    let supervisor = SupervisorBuilder::new()
        .with_launcher(launcher)
        .with_health_check(health_check)
        .build();

    let err = supervisor.start().await.unwrap_err();

    assert_eq!(err.phase(), Some(StartupPhase::Launch));
    assert_eq!(supervisor.state(), SupervisorState::Failed);
}

#[tokio::test]
async fn test_launch_spec_carries_bind_address() {
    let mut launcher = MockProcessLauncher::new();
    launcher
        .expect_launch()
        .withf(|spec| {
            spec.command.ends_with("backend-under-test")
                && spec.env.contains(&("BACKEND_PORT".to_string(), "5999".to_string()))
                && spec.env.contains(&("BACKEND_HOST".to_string(), "127.0.0.1".to_string()))
        })
        .times(1)
        .returning(|_| Ok(Box::new(TestFixtures::cooperative_child()) as Box<dyn ChildProcess>));

    let supervisor = SupervisorBuilder::new().with_launcher(launcher).build();
    supervisor.start().await.unwrap();
}

#[tokio::test]
async fn test_start_twice_is_invalid() {
    let supervisor = SupervisorBuilder::new().build();
    supervisor.start().await.unwrap();

    let err = supervisor.start().await.unwrap_err();
    assert_matches!(
        err,
        SupervisorError::InvalidState {
            operation: "start",
            state: SupervisorState::Ready
        }
    );
    assert_eq!(supervisor.state(), SupervisorState::Ready);
}

#[tokio::test]
async fn test_double_stop_terminates_once() {
    let mut child = MockChildProcess::new();
    child.expect_pid().return_const(Some(TestFixtures::PID));
    child.expect_is_alive().returning(|| true);
    child.expect_terminate().times(1).returning(|_| Ok(()));
    child
        .expect_wait_exit()
        .times(1)
        .returning(|_| Ok(ExitResult::Exited { code: Some(0) }));

    let supervisor = SupervisorBuilder::new().with_child(child).build();
    supervisor.start().await.unwrap();

    assert_eq!(supervisor.stop().await.unwrap(), StopOutcome::Graceful);
    assert_eq!(supervisor.stop().await.unwrap(), StopOutcome::AlreadyStopped);
    assert_eq!(supervisor.state(), SupervisorState::Stopped);
    assert_eq!(supervisor.child_pid(), None);
}

#[tokio::test]
async fn test_child_record_tracks_launch_and_exit() {
    let supervisor = SupervisorBuilder::new()
        .with_child(TestFixtures::cooperative_child())
        .build();
    assert_eq!(supervisor.child_record(), None);

    supervisor.start().await.unwrap();

    let record = supervisor.child_record().unwrap();
    assert_eq!(record.pid, Some(TestFixtures::PID));
    assert!(record.command.ends_with("backend-under-test"));
    assert!(record.env.iter().any(|(key, value)| key == "BACKEND_PORT" && value == "5999"));
    assert_eq!(record.state, ChildState::Running);

    supervisor.stop().await.unwrap();

    let record = supervisor.child_record().unwrap();
    assert_eq!(record.state, ChildState::Exited);
    assert_eq!(record.pid, Some(TestFixtures::PID));
    assert_eq!(supervisor.child_pid(), None);
}

#[tokio::test]
async fn test_stop_escalates_to_kill() {
    let mut child = MockChildProcess::new();
    let mut seq = Sequence::new();
    child.expect_pid().return_const(Some(TestFixtures::PID));
    child.expect_is_alive().returning(|| true);
    child
        .expect_terminate()
        .withf(|signal| *signal == TerminationSignal::Graceful)
        .times(1)
        .in_sequence(&mut seq)
        .returning(|_| Ok(()));
    child
        .expect_wait_exit()
        .times(1)
        .in_sequence(&mut seq)
        .returning(|_| Ok(ExitResult::TimedOut));
    child
        .expect_terminate()
        .withf(|signal| *signal == TerminationSignal::Forced)
        .times(1)
        .in_sequence(&mut seq)
        .returning(|_| Ok(()));
    child
        .expect_wait_exit()
        .times(1)
        .in_sequence(&mut seq)
        .returning(|_| Ok(ExitResult::Exited { code: None }));

    let supervisor = SupervisorBuilder::new().with_child(child).build();
    supervisor.start().await.unwrap();

    assert_eq!(supervisor.stop().await.unwrap(), StopOutcome::Killed);
    assert_eq!(supervisor.state(), SupervisorState::Stopped);
}

#[tokio::test]
async fn test_unkillable_child_fails_supervisor() {
    let mut child = MockChildProcess::new();
    child.expect_pid().return_const(Some(TestFixtures::PID));
    child.expect_is_alive().returning(|| true);
    child.expect_terminate().returning(|_| Ok(()));
    child
        .expect_wait_exit()
        .returning(|_| Ok(ExitResult::TimedOut));

    let supervisor = SupervisorBuilder::new().with_child(child).build();
    supervisor.start().await.unwrap();

    let err = supervisor.stop().await.unwrap_err();
    assert_matches!(err, SupervisorError::TerminationFailed { pid: TestFixtures::PID, .. });
    assert_eq!(supervisor.state(), SupervisorState::Failed);
}

#[tokio::test]
async fn test_stop_from_idle_is_terminal() {
    let mut launcher = MockProcessLauncher::new();
    launcher.expect_launch().times(0);

    let supervisor = SupervisorBuilder::new().with_launcher(launcher).build();

    assert_eq!(supervisor.stop().await.unwrap(), StopOutcome::NoChild);
    assert_eq!(supervisor.state(), SupervisorState::Stopped);

    let err = supervisor.start().await.unwrap_err();
    assert_matches!(
        err,
        SupervisorError::InvalidState {
            state: SupervisorState::Stopped,
            ..
        }
    );
}

#[tokio::test]
async fn test_stop_during_probe_cancels_startup() {
    let supervisor = Arc::new(
        SupervisorBuilder::new()
            .with_probe(1000, Duration::from_millis(20))
            .with_child(TestFixtures::cooperative_child())
            .with_health_check(TestHelpers::failing_health_check())
            .build(),
    );

    let starter = {
        let supervisor = Arc::clone(&supervisor);
        tokio::spawn(async move { supervisor.start().await })
    };

    TestHelpers::eventually(|| supervisor.child_pid().is_some()).await;
    assert_eq!(supervisor.state(), SupervisorState::Launching);

    let started = Instant::now();
    assert_eq!(supervisor.stop().await.unwrap(), StopOutcome::Graceful);
    assert!(started.elapsed() < Duration::from_secs(2));

    let result = starter.await.unwrap();
    assert_matches!(
        result,
        Err(SupervisorError::StartupCancelled {
            phase: StartupPhase::HealthProbe,
            ..
        })
    );
    assert_eq!(supervisor.state(), SupervisorState::Stopped);
    assert_eq!(supervisor.child_pid(), None);
}

#[tokio::test]
async fn test_ready_only_after_successful_probe() {
    let probed_healthy = Arc::new(AtomicBool::new(false));

    let mut health_check = MockHealthCheck::new();
    let mut seq = Sequence::new();
    health_check
        .expect_check()
        .times(2)
        .in_sequence(&mut seq)
        .returning(|_| Err(TestFixtures::probe_error()));
    let flag = Arc::clone(&probed_healthy);
    health_check
        .expect_check()
        .times(1)
        .in_sequence(&mut seq)
        .returning(move |_| {
            flag.store(true, Ordering::SeqCst);
            Ok(())
        });

    let supervisor = SupervisorBuilder::new()
        .with_health_check(health_check)
        .build();

    let mut states = supervisor.subscribe();
    let witness = Arc::clone(&probed_healthy);
    let watcher = tokio::spawn(async move {
        states
            .wait_for(|state| *state == SupervisorState::Ready)
            .await
            .unwrap();
        witness.load(Ordering::SeqCst)
    });

    supervisor.start().await.unwrap();
    assert!(watcher.await.unwrap(), "READY observed before a successful probe");
}

#[tokio::test]
async fn test_wait_ready_resolves_for_concurrent_observer() {
    let supervisor = Arc::new(SupervisorBuilder::new().build());

    let observer = {
        let supervisor = Arc::clone(&supervisor);
        tokio::spawn(async move { supervisor.wait_ready().await })
    };

    supervisor.start().await.unwrap();
    assert!(observer.await.unwrap());
}
