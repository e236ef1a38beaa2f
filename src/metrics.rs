/// Metrics and telemetry for the Mahakim proxy
///
/// Provides Prometheus-compatible metrics for monitoring:
/// - Dossier lookups by source (cache, api, error)
/// - Upstream calls by endpoint and outcome
/// - Envelope decrypt failures
/// - Key rotations and cache size

use lazy_static::lazy_static;
use prometheus::{
    register_int_counter, register_int_counter_vec, register_int_gauge, Encoder, IntCounter,
    IntCounterVec, IntGauge, TextEncoder,
};

lazy_static! {
    // ========== Dossier Metrics ==========

    /// Dossier lookups by result source
    pub static ref DOSSIER_LOOKUPS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "dossier_lookups_total",
        "Total number of dossier lookups",
        &["source"]
    )
    .unwrap();

    // ========== Upstream Metrics ==========

    /// Upstream requests by endpoint and outcome
    pub static ref UPSTREAM_REQUESTS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "upstream_requests_total",
        "Total number of requests sent to the Mahakim middleware",
        &["endpoint", "outcome"]
    )
    .unwrap();

    /// Envelopes whose `data` field could not be decrypted
    pub static ref ENVELOPE_DECRYPT_FAILURES_TOTAL: IntCounter = register_int_counter!(
        "envelope_decrypt_failures_total",
        "Total number of response envelopes that failed to decrypt"
    )
    .unwrap();

    // ========== Key & Cache Metrics ==========

    /// Successful key rotations
    pub static ref KEY_ROTATIONS_TOTAL: IntCounter = register_int_counter!(
        "key_rotations_total",
        "Total number of encryption key rotations"
    )
    .unwrap();

    /// Cached dossiers (valid or not yet purged)
    pub static ref CACHE_ENTRIES: IntGauge = register_int_gauge!(
        "cache_entries",
        "Number of entries in the dossier cache"
    )
    .unwrap();
}

/// Render metrics in Prometheus text format
pub fn render_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::warn!(error = %e, "Failed to encode metrics");
    }
    String::from_utf8_lossy(&buffer).into_owned()
}

/// Record a dossier lookup
pub fn record_dossier_lookup(source: &str) {
    DOSSIER_LOOKUPS_TOTAL.with_label_values(&[source]).inc();
}

/// Record an upstream call
pub fn record_upstream_request(endpoint: &str, outcome: &str) {
    UPSTREAM_REQUESTS_TOTAL
        .with_label_values(&[endpoint, outcome])
        .inc();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_dossier_lookup() {
        record_dossier_lookup("cache");
        record_dossier_lookup("api");
        let metrics = render_metrics();
        assert!(metrics.contains("dossier_lookups_total"));
    }

    #[test]
    fn test_record_upstream_request() {
        record_upstream_request("CarteDossier", "ok");
        let metrics = render_metrics();
        assert!(metrics.contains("upstream_requests_total"));
        assert!(metrics.contains("CarteDossier"));
    }

    #[test]
    fn test_counters_render() {
        KEY_ROTATIONS_TOTAL.inc();
        ENVELOPE_DECRYPT_FAILURES_TOTAL.inc();
        CACHE_ENTRIES.set(3);

        let metrics = render_metrics();
        assert!(metrics.contains("# TYPE key_rotations_total counter"));
        assert!(metrics.contains("envelope_decrypt_failures_total"));
        assert!(metrics.contains("cache_entries"));
    }
}
