//! Prometheus metrics for the SSO gateway.

use once_cell::sync::Lazy;
use prometheus::{CounterVec, Encoder, TextEncoder, register_counter_vec};

/// Client registrations counter.
pub static CLIENTS_REGISTERED: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "sso_gateway_clients_registered_total",
        "Total number of client registrations",
        &["outcome"]
    )
    .expect("Failed to register clients_registered metric")
});

/// Tokens issued counter.
pub static TOKENS_ISSUED: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "sso_gateway_tokens_issued_total",
        "Total number of identity tokens issued",
        &["algorithm", "form"]
    )
    .expect("Failed to register tokens_issued metric")
});

/// Config store lookups counter.
pub static STORE_LOOKUPS: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "sso_gateway_store_lookups_total",
        "Total number of feature config lookups",
        &["namespace", "result"]
    )
    .expect("Failed to register store_lookups metric")
});

/// Payload fetch calls counter.
pub static FETCH_CALLS: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "sso_gateway_fetch_calls_total",
        "Total number of outbound payload fetch calls",
        &["outcome"]
    )
    .expect("Failed to register fetch_calls metric")
});

/// Record a registration attempt.
pub fn record_registration(outcome: &str) {
    CLIENTS_REGISTERED.with_label_values(&[outcome]).inc();
}

/// Record a token issuance.
pub fn record_token_issued(algorithm: &str, form: &str) {
    TOKENS_ISSUED.with_label_values(&[algorithm, form]).inc();
}

/// Record a store lookup. A wrong secret counts as a miss.
pub fn record_store_lookup(namespace: &str, hit: bool) {
    let result = if hit { "hit" } else { "miss" };
    STORE_LOOKUPS.with_label_values(&[namespace, result]).inc();
}

/// Record an outbound fetch call.
pub fn record_fetch(outcome: &str) {
    FETCH_CALLS.with_label_values(&[outcome]).inc();
}

/// Render all registered metrics in the Prometheus text format.
#[must_use]
pub fn render() -> String {
    let mut buffer = Vec::new();
    if TextEncoder::new()
        .encode(&prometheus::gather(), &mut buffer)
        .is_err()
    {
        return String::new();
    }
    String::from_utf8(buffer).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_token_issued() {
        record_token_issued("HS256", "signed");
        let value = TOKENS_ISSUED.with_label_values(&["HS256", "signed"]).get();
        assert!(value > 0.0);
    }

    #[test]
    fn test_record_store_lookup_miss() {
        record_store_lookup("config:jwt", false);
        let value = STORE_LOOKUPS.with_label_values(&["config:jwt", "miss"]).get();
        assert!(value > 0.0);
    }

    #[test]
    fn test_render_contains_metric() {
        record_fetch("ok");
        assert!(render().contains("sso_gateway_fetch_calls_total"));
    }
}
