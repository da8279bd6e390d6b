//! Prometheus metrics exposition
//!
//! - `auth_logins_total` (counter): label `outcome`
//! - `auth_rotations_total` (counter): label `outcome`
//! - `auth_logouts_total` (counter)
//! - `auth_registrations_total` (counter): label `outcome`

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

/// Install the Prometheus recorder and return a handle for rendering metrics.
///
/// The handle's `render()` method produces the Prometheus text exposition
/// format suitable for serving on a `/metrics` endpoint.
pub fn install_recorder() -> PrometheusHandle {
    PrometheusBuilder::new()
        .install_recorder()
        .expect("failed to install Prometheus recorder")
}

/// Record a login attempt. `outcome` is "success" or "rejected".
pub fn record_login(outcome: &'static str) {
    metrics::counter!("auth_logins_total", "outcome" => outcome).increment(1);
}

/// Record a rotation attempt. `outcome` is "success" or "rejected".
pub fn record_rotation(outcome: &'static str) {
    metrics::counter!("auth_rotations_total", "outcome" => outcome).increment(1);
}

pub fn record_logout() {
    metrics::counter!("auth_logouts_total").increment(1);
}

/// Record a registration attempt. `outcome` is "success", "conflict",
/// or "error".
pub fn record_registration(outcome: &'static str) {
    metrics::counter!("auth_registrations_total", "outcome" => outcome).increment(1);
}
