//! Integration tests for the credential watcher loop.
//!
//! The loop runs against a mutable fake environment with a short period so
//! violations and cancellation can be observed within a test timeout.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::time::{sleep, timeout};
use tokio_util::sync::CancellationToken;

use scorebook::watcher::{
    self, CredentialSnapshot, EnvSource, IntegrityViolation, Sha256Checksum, VAR_EXCLAIM,
    VAR_PASSWORD, VAR_USER, VAR_XPASSWORD,
};

const PERIOD: Duration = Duration::from_millis(20);
const TEST_TIMEOUT: Duration = Duration::from_secs(5);

// =============================================================================
// Test Utilities
// =============================================================================

/// Shared, mutable fake environment.
#[derive(Debug, Clone, Default)]
struct FakeEnv(Arc<Mutex<HashMap<String, String>>>);

impl FakeEnv {
    fn seeded() -> Self {
        let env = Self::default();
        env.set(VAR_USER, "u");
        env.set(VAR_PASSWORD, "p");
        env.set(VAR_EXCLAIM, "!");
        env.set(VAR_XPASSWORD, "xp");
        env
    }

    fn set(&self, key: &str, value: &str) {
        self.0
            .lock()
            .expect("env lock")
            .insert(key.to_string(), value.to_string());
    }

    fn remove(&self, key: &str) {
        self.0.lock().expect("env lock").remove(key);
    }
}

impl EnvSource for FakeEnv {
    fn var(&self, key: &str) -> Option<String> {
        self.0.lock().expect("env lock").get(key).cloned()
    }
}

fn spawn_watcher(
    env: &FakeEnv,
    cancel: &CancellationToken,
) -> tokio::task::JoinHandle<Result<(), IntegrityViolation>> {
    let env = env.clone();
    let cancel = cancel.clone();
    let snapshot =
        CredentialSnapshot::capture(&env, &Sha256Checksum).expect("snapshot");
    tokio::spawn(async move {
        watcher::watch(&env, &Sha256Checksum, &snapshot, PERIOD, cancel).await
    })
}

// =============================================================================
// Watcher behavior
// =============================================================================

#[tokio::test]
async fn stays_alive_while_the_environment_is_unchanged() {
    let env = FakeEnv::seeded();
    let cancel = CancellationToken::new();
    let handle = spawn_watcher(&env, &cancel);

    // several periods pass without a violation
    sleep(PERIOD * 5).await;
    assert!(!handle.is_finished());

    cancel.cancel();
    let result = timeout(TEST_TIMEOUT, handle).await.expect("join in time");
    assert_eq!(result.expect("task"), Ok(()));
}

#[tokio::test]
async fn user_change_terminates_the_loop() {
    let env = FakeEnv::seeded();
    let cancel = CancellationToken::new();
    let handle = spawn_watcher(&env, &cancel);

    sleep(PERIOD * 2).await;
    env.set(VAR_USER, "intruder");

    let result = timeout(TEST_TIMEOUT, handle).await.expect("join in time");
    match result.expect("task") {
        Err(IntegrityViolation::UserChanged { expected, observed }) => {
            assert_eq!(expected, "u");
            assert_eq!(observed, "intruder");
        }
        other => panic!("expected a user violation, got {other:?}"),
    }
}

#[tokio::test]
async fn password_change_terminates_the_loop() {
    let env = FakeEnv::seeded();
    let cancel = CancellationToken::new();
    let handle = spawn_watcher(&env, &cancel);

    sleep(PERIOD * 2).await;
    env.set(VAR_PASSWORD, "tampered");

    let result = timeout(TEST_TIMEOUT, handle).await.expect("join in time");
    assert!(matches!(
        result.expect("task"),
        Err(IntegrityViolation::PasswordChanged { .. })
    ));
}

#[tokio::test]
async fn removed_password_terminates_the_loop() {
    let env = FakeEnv::seeded();
    let cancel = CancellationToken::new();
    let handle = spawn_watcher(&env, &cancel);

    sleep(PERIOD * 2).await;
    env.remove(VAR_PASSWORD);

    let result = timeout(TEST_TIMEOUT, handle).await.expect("join in time");
    assert!(matches!(
        result.expect("task"),
        Err(IntegrityViolation::PasswordChanged { .. })
    ));
}

#[tokio::test]
async fn cancellation_wins_over_a_pending_tick() {
    let env = FakeEnv::seeded();
    let cancel = CancellationToken::new();
    let handle = spawn_watcher(&env, &cancel);

    cancel.cancel();
    let result = timeout(TEST_TIMEOUT, handle).await.expect("join in time");
    assert_eq!(result.expect("task"), Ok(()));
}
