//! Scoped system credentials.
//!
//! Directory lookups need elevated privileges. The listener logs in as the
//! system principal before processing a batch and logs out on every exit
//! path; [`PrivilegedScope`] ties the logout to drop.

use std::sync::atomic::{AtomicU64, Ordering};

use thiserror::Error;
use tracing::{debug, warn};

/// Failure to acquire system credentials.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("system login failed: {reason}")]
pub struct AuthError {
    pub reason: String,
}

impl AuthError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

/// A credential obtained from a [`PrivilegeElevator`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SystemCredential {
    /// Name of the principal the credential was issued to.
    pub principal: String,

    /// Opaque login token, used to pair login and logout.
    pub token: String,
}

/// Acquires and releases system credentials.
pub trait PrivilegeElevator: Send + Sync {
    fn login(&self) -> Result<SystemCredential, AuthError>;

    fn logout(&self, credential: &SystemCredential);
}

/// Holds a system credential and releases it when dropped.
pub struct PrivilegedScope<'a> {
    elevator: &'a dyn PrivilegeElevator,
    credential: SystemCredential,
}

impl<'a> PrivilegedScope<'a> {
    /// Logs in through `elevator`.
    pub fn enter(elevator: &'a dyn PrivilegeElevator) -> Result<Self, AuthError> {
        let credential = elevator.login()?;
        debug!(principal = %credential.principal, "Entered privileged scope");
        Ok(Self {
            elevator,
            credential,
        })
    }

    pub fn credential(&self) -> &SystemCredential {
        &self.credential
    }
}

impl Drop for PrivilegedScope<'_> {
    fn drop(&mut self) {
        self.elevator.logout(&self.credential);
        debug!(principal = %self.credential.principal, "Left privileged scope");
    }
}

/// Elevator for single-process hosts: every login succeeds as a fixed
/// system principal.
#[derive(Debug)]
pub struct StaticElevator {
    principal: String,
    issued: AtomicU64,
    active: AtomicU64,
}

impl StaticElevator {
    pub fn new(principal: impl Into<String>) -> Self {
        Self {
            principal: principal.into(),
            issued: AtomicU64::new(0),
            active: AtomicU64::new(0),
        }
    }

    /// Number of credentials currently held.
    pub fn active_logins(&self) -> u64 {
        self.active.load(Ordering::SeqCst)
    }

    /// Number of credentials issued since creation.
    pub fn total_logins(&self) -> u64 {
        self.issued.load(Ordering::SeqCst)
    }
}

impl Default for StaticElevator {
    fn default() -> Self {
        Self::new("system")
    }
}

impl PrivilegeElevator for StaticElevator {
    fn login(&self) -> Result<SystemCredential, AuthError> {
        let counter = self.issued.fetch_add(1, Ordering::SeqCst);
        self.active.fetch_add(1, Ordering::SeqCst);
        Ok(SystemCredential {
            principal: self.principal.clone(),
            token: format!("login_{:016x}", counter),
        })
    }

    fn logout(&self, credential: &SystemCredential) {
        let released = self
            .active
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
        if released.is_err() {
            warn!(token = %credential.token, "Logout without matching login");
        }
    }
}
