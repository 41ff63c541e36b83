//! Client identity and lifecycle.

pub mod credentials;
pub mod lifecycle;

pub use credentials::{ClientId, ClientSecret};
pub use lifecycle::{ClientLifecycle, ClientRecord};
