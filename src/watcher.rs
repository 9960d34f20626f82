//! Credential snapshot and integrity loop.
//!
//! At startup the watcher captures the injected credentials from the
//! environment; afterwards it re-reads them on a fixed period and terminates
//! on any mismatch. The plaintext secret is never logged, only its checksum.
//!
//! The loop takes a [`CancellationToken`] so a host can shut it down
//! cleanly; cancellation returns `Ok` and is distinct from a violation.

use std::time::Duration;

use sha2::{Digest, Sha256};
use tokio::time;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Required environment variables, checked at capture time.
pub const VAR_USER: &str = "API_USER";
pub const VAR_PASSWORD: &str = "API_PASSWORD";
pub const VAR_EXCLAIM: &str = "EXCLAIM";
pub const VAR_XPASSWORD: &str = "XPASSWORD";
/// Optional variables.
pub const VAR_DISCLAIMER: &str = "DISCLAIMER";
pub const VAR_RELEASE: &str = "RELEASE";

/// Release name used when `RELEASE` is not injected.
pub const DEFAULT_RELEASE: &str = "scorebook";

/// Placeholder logged for a value that is absent at comparison time.
const UNSET: &str = "<unset>";

/// Read access to the environment, behind a trait so tests can drive the
/// loop with a mutable fake.
pub trait EnvSource: Send + Sync {
    fn var(&self, key: &str) -> Option<String>;
}

/// The real process environment.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessEnv;

impl EnvSource for ProcessEnv {
    fn var(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

/// Change-detection digest of a secret value. Not a security primitive;
/// kept behind a trait so the algorithm stays swappable.
pub trait Checksum: Send + Sync {
    fn digest(&self, value: &str) -> String;
}

/// SHA-256 hex digest.
#[derive(Debug, Clone, Copy, Default)]
pub struct Sha256Checksum;

impl Checksum for Sha256Checksum {
    fn digest(&self, value: &str) -> String {
        hex::encode(Sha256::digest(value.as_bytes()))
    }
}

/// A required variable was absent at capture time. Fatal, not retried.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("required environment variable {0} is not set")]
pub struct MissingVar(pub &'static str);

/// Detected mismatch between the captured credentials and a later re-read.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IntegrityViolation {
    #[error("API_USER changed from '{expected}' to '{observed}'")]
    UserChanged { expected: String, observed: String },

    #[error("API_PASSWORD checksum changed from {expected} to {observed}")]
    PasswordChanged { expected: String, observed: String },
}

/// Credentials captured once at startup and never mutated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CredentialSnapshot {
    pub user: String,
    pub password_checksum: String,
    pub exclaim: String,
    pub disclaimer: String,
    pub release: String,
}

impl CredentialSnapshot {
    /// Capture the snapshot from `env`, hashing the password with `hasher`.
    ///
    /// `XPASSWORD` must be present but is not retained.
    pub fn capture(env: &dyn EnvSource, hasher: &dyn Checksum) -> Result<Self, MissingVar> {
        let user = env.var(VAR_USER).ok_or(MissingVar(VAR_USER))?;
        let password = env.var(VAR_PASSWORD).ok_or(MissingVar(VAR_PASSWORD))?;
        let exclaim = env.var(VAR_EXCLAIM).ok_or(MissingVar(VAR_EXCLAIM))?;
        if env.var(VAR_XPASSWORD).is_none() {
            return Err(MissingVar(VAR_XPASSWORD));
        }

        let disclaimer = env.var(VAR_DISCLAIMER).unwrap_or_default();
        let release = env.var(VAR_RELEASE).unwrap_or_else(|| {
            warn!(name: "watcher.release.defaulted", default = DEFAULT_RELEASE, "RELEASE not set");
            DEFAULT_RELEASE.to_string()
        });

        Ok(Self {
            user,
            password_checksum: hasher.digest(&password),
            exclaim,
            disclaimer,
            release,
        })
    }
}

/// Compare one fresh read of the environment against the snapshot.
pub fn check(
    env: &dyn EnvSource,
    hasher: &dyn Checksum,
    snapshot: &CredentialSnapshot,
) -> Result<(), IntegrityViolation> {
    let observed_user = env.var(VAR_USER).unwrap_or_else(|| UNSET.to_string());
    if observed_user != snapshot.user {
        return Err(IntegrityViolation::UserChanged {
            expected: snapshot.user.clone(),
            observed: observed_user,
        });
    }

    let observed_checksum = env
        .var(VAR_PASSWORD)
        .map_or_else(|| UNSET.to_string(), |p| hasher.digest(&p));
    if observed_checksum != snapshot.password_checksum {
        return Err(IntegrityViolation::PasswordChanged {
            expected: snapshot.password_checksum.clone(),
            observed: observed_checksum,
        });
    }

    Ok(())
}

/// Re-check the environment every `period` until cancelled or violated.
///
/// Returns `Ok(())` on cancellation; the caller decides what a violation
/// means (the `envwatch` binary exits non-zero).
pub async fn watch(
    env: &dyn EnvSource,
    hasher: &dyn Checksum,
    snapshot: &CredentialSnapshot,
    period: Duration,
    cancel: CancellationToken,
) -> Result<(), IntegrityViolation> {
    let mut ticker = time::interval(period);
    // the first tick completes immediately; consume it so every check sits
    // one full period after the last
    ticker.tick().await;

    loop {
        tokio::select! {
            () = cancel.cancelled() => return Ok(()),
            _ = ticker.tick() => {}
        }

        check(env, hasher, snapshot)?;
        info!(
            name: "watcher.heartbeat",
            user = %snapshot.user,
            release = %snapshot.release,
            checksum = %snapshot.password_checksum,
            "credentials intact"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    #[derive(Debug, Default)]
    struct FakeEnv(Mutex<HashMap<String, String>>);

    impl FakeEnv {
        fn with(vars: &[(&str, &str)]) -> Self {
            let map = vars
                .iter()
                .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
                .collect();
            Self(Mutex::new(map))
        }

        fn set(&self, key: &str, value: &str) {
            self.0
                .lock()
                .expect("env lock")
                .insert(key.to_string(), value.to_string());
        }
    }

    impl EnvSource for FakeEnv {
        fn var(&self, key: &str) -> Option<String> {
            self.0.lock().expect("env lock").get(key).cloned()
        }
    }

    fn full_env() -> FakeEnv {
        FakeEnv::with(&[
            (VAR_USER, "u"),
            (VAR_PASSWORD, "p"),
            (VAR_EXCLAIM, "!"),
            (VAR_XPASSWORD, "xp"),
            (VAR_DISCLAIMER, "none"),
            (VAR_RELEASE, "test-release"),
        ])
    }

    #[test]
    fn capture_requires_every_mandatory_var() {
        let env = full_env();
        env.0.lock().expect("env lock").remove(VAR_XPASSWORD);
        let err = CredentialSnapshot::capture(&env, &Sha256Checksum).expect_err("missing var");
        assert_eq!(err, MissingVar(VAR_XPASSWORD));
    }

    #[test]
    fn capture_defaults_release() {
        let env = full_env();
        env.0.lock().expect("env lock").remove(VAR_RELEASE);
        let snapshot = CredentialSnapshot::capture(&env, &Sha256Checksum).expect("capture");
        assert_eq!(snapshot.release, DEFAULT_RELEASE);
    }

    #[test]
    fn checksum_is_stable_and_hex() {
        let digest = Sha256Checksum.digest("p");
        assert_eq!(digest, Sha256Checksum.digest("p"));
        assert_eq!(digest.len(), 64);
        assert!(digest.bytes().all(|b| b.is_ascii_hexdigit()));
    }

    #[test]
    fn unchanged_environment_passes_check() {
        let env = full_env();
        let snapshot = CredentialSnapshot::capture(&env, &Sha256Checksum).expect("capture");
        assert_eq!(check(&env, &Sha256Checksum, &snapshot), Ok(()));
    }

    #[test]
    fn changed_user_is_a_violation() {
        let env = full_env();
        let snapshot = CredentialSnapshot::capture(&env, &Sha256Checksum).expect("capture");
        env.set(VAR_USER, "intruder");
        let err = check(&env, &Sha256Checksum, &snapshot).expect_err("violation");
        assert!(matches!(err, IntegrityViolation::UserChanged { .. }));
    }

    #[test]
    fn removed_password_is_a_violation() {
        let env = full_env();
        let snapshot = CredentialSnapshot::capture(&env, &Sha256Checksum).expect("capture");
        env.0.lock().expect("env lock").remove(VAR_PASSWORD);
        let err = check(&env, &Sha256Checksum, &snapshot).expect_err("violation");
        assert!(matches!(err, IntegrityViolation::PasswordChanged { .. }));
    }

    #[test]
    fn violation_message_never_contains_the_secret() {
        let env = full_env();
        env.set(VAR_PASSWORD, "s3cret-original");
        let snapshot = CredentialSnapshot::capture(&env, &Sha256Checksum).expect("capture");
        env.set(VAR_PASSWORD, "hunter2");
        let err = check(&env, &Sha256Checksum, &snapshot).expect_err("violation");
        assert!(!err.to_string().contains("hunter2"));
        assert!(!err.to_string().contains("s3cret-original"));
    }
}
