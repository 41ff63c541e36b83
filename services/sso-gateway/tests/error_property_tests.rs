//! Property-based tests for error classification and what reaches callers.

use proptest::prelude::*;
use rust_common::PlatformError;
use sso_gateway::GatewayError;

fn arb_error_message() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9 .:']{1,100}"
}

/// Every error a service path can raise that is not the caller's fault.
fn server_errors(msg: &str) -> Vec<GatewayError> {
    vec![
        GatewayError::configuration(msg),
        GatewayError::transport(msg),
        GatewayError::token(msg),
        GatewayError::internal(msg),
        GatewayError::Storage(PlatformError::backend(msg)),
        GatewayError::PartialFailure {
            client_id: msg.to_string(),
            orphaned: 1,
        },
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Server-side detail never reaches the public message.
    #[test]
    fn prop_server_errors_are_opaque(msg in arb_error_message()) {
        for err in server_errors(&msg) {
            prop_assert!(!err.is_client_error());
            prop_assert_eq!(err.public_message(), "service unavailable");
            prop_assert!(err.to_string().contains(&msg));
        }
    }

    /// Validation messages are handed back verbatim.
    #[test]
    fn prop_validation_message_passes_through(msg in arb_error_message()) {
        let err = GatewayError::validation(msg.clone());
        prop_assert!(err.is_client_error());
        prop_assert_eq!(err.public_message(), msg);
    }
}

#[test]
fn test_integrity_and_not_found_share_a_message() {
    assert_eq!(
        GatewayError::Integrity.public_message(),
        GatewayError::NotFound.public_message()
    );
}
