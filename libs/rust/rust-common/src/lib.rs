//! Shared library for cross-cutting concerns in the SSO gateway.
//!
//! This crate provides centralized implementations for:
//! - Error types with retryability classification
//! - Outbound JSON client with registration header policy
//! - Key-value backend abstraction (in-memory and Redis)
//! - Tracing subscriber initialization

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod http;
pub mod kv;
pub mod tracing_config;

pub use error::PlatformError;
pub use http::{HttpConfig, RESERVED_HEADERS, build_http_client, extra_headers};
pub use kv::{KvBackend, KeyStream, MemoryKv, RedisKv};
pub use tracing_config::{TracingConfig, init_tracing};
