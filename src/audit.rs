use tracing::{info, warn};

/// Structured audit events on the `audit` tracing target.
///
/// Never pass secrets (tokens, passwords, credentials) to these methods.
#[derive(Debug, Clone, Default)]
pub struct AuditLogger;

impl AuditLogger {
    pub fn new() -> Self {
        Self
    }

    pub fn login_issued(&self, subject: &str) {
        info!(target: "audit", event = "login_issued", subject);
    }

    pub fn login_rejected(&self, username: &str) {
        warn!(target: "audit", event = "login_rejected", username);
    }

    pub fn credential_rejected(&self, reason: &str) {
        warn!(target: "audit", event = "credential_rejected", reason);
    }

    pub fn ownership_denied(&self, subject: &str, target_user: &str, operation: &str) {
        warn!(target: "audit", event = "ownership_denied", subject, target_user, operation);
    }

    pub fn token_accessed(&self, subject: &str, application: &str, purpose: &str) {
        info!(target: "audit", event = "token_accessed", subject, application, purpose);
    }

    pub fn token_stored(&self, subject: &str, method: &str) {
        info!(target: "audit", event = "token_stored", subject, method);
    }

    pub fn token_deleted(&self, subject: &str) {
        info!(target: "audit", event = "token_deleted", subject);
    }
}
