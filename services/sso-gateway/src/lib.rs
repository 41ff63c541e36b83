//! SSO gateway library.
//!
//! Registers client applications, keeps their per-feature configuration
//! encrypted under a client-held secret, and issues signed (optionally
//! encrypted) identity tokens at login.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod client;
pub mod clock;
pub mod codec;
pub mod config;
pub mod error;
pub mod factory;
pub mod feature;
pub mod fetch;
pub mod gateway;
pub mod http;
pub mod issuance;
pub mod jwt;
pub mod metrics;
pub mod payload;
pub mod registration;
pub mod storage;
pub mod sweep;

// Re-exports for convenience
pub use client::{ClientId, ClientSecret};
pub use config::Config;
pub use error::GatewayError;
pub use gateway::Gateway;
pub use issuance::{LoginContext, TokenIssuer};
pub use registration::{ClientRemover, Registrar, Registration, RemovalReport};
